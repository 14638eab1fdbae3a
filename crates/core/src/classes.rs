//! Class enumeration
//!
//! Labels are positive integer codes drawn from a set fixed before training.
//! The set is kept sorted by code, so the position of a code doubles as its
//! column/row index in vote tallies and confusion matrices.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// One enumerated class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDef {
    pub code: u32,
    pub name: String,
}

/// The fixed set of K classes known up front
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSet {
    classes: Vec<ClassDef>,
}

impl ClassSet {
    /// Build from `(code, name)` pairs. Codes must be positive and unique.
    pub fn new<S: Into<String>>(classes: impl IntoIterator<Item = (u32, S)>) -> Result<Self> {
        let mut classes: Vec<ClassDef> = classes
            .into_iter()
            .map(|(code, name)| ClassDef { code, name: name.into() })
            .collect();

        if classes.is_empty() {
            return Err(Error::InvalidParameter {
                name: "classes",
                value: "[]".into(),
                reason: "at least one class is required".into(),
            });
        }
        classes.sort_by_key(|c| c.code);
        if let Some(c) = classes.iter().find(|c| c.code == 0) {
            return Err(Error::InvalidParameter {
                name: "classes",
                value: c.name.clone(),
                reason: "class codes start at 1".into(),
            });
        }
        if let Some(w) = classes.windows(2).find(|w| w[0].code == w[1].code) {
            return Err(Error::InvalidParameter {
                name: "classes",
                value: w[0].code.to_string(),
                reason: "duplicate class code".into(),
            });
        }
        Ok(Self { classes })
    }

    /// Classes `1..=k` named `class 1`, `class 2`, ...
    pub fn sequential(k: u32) -> Result<Self> {
        Self::new((1..=k).map(|c| (c, format!("class {}", c))))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassDef> {
        self.classes.iter()
    }

    pub fn codes(&self) -> Vec<u32> {
        self.classes.iter().map(|c| c.code).collect()
    }

    pub fn contains(&self, code: u32) -> bool {
        self.index_of(code).is_some()
    }

    /// Position of `code` in ascending code order
    pub fn index_of(&self, code: u32) -> Option<usize> {
        self.classes.binary_search_by_key(&code, |c| c.code).ok()
    }

    pub fn code_at(&self, index: usize) -> Option<u32> {
        self.classes.get(index).map(|c| c.code)
    }

    pub fn name(&self, code: u32) -> Option<&str> {
        self.index_of(code).map(|i| self.classes[i].name.as_str())
    }
}
