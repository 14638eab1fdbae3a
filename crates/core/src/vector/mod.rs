//! Ground reference points
//!
//! Labeled point observations used to sample training data from a
//! feature stack. Geometry import is handled outside this crate; points
//! arrive here already projected into the raster CRS.

use geo_types::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Parse a raw text field, preferring integer then float interpretations
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            AttributeValue::Null
        } else if let Ok(i) = raw.parse::<i64>() {
            AttributeValue::Int(i)
        } else if let Ok(f) = raw.parse::<f64>() {
            AttributeValue::Float(f)
        } else {
            AttributeValue::String(raw.to_string())
        }
    }

    /// Interpret the value as a positive class code
    pub fn as_class_code(&self) -> Option<u32> {
        match self {
            AttributeValue::Int(i) if *i > 0 => u32::try_from(*i).ok(),
            AttributeValue::Float(f) if *f > 0.0 && f.fract() == 0.0 && *f <= u32::MAX as f64 => {
                Some(*f as u32)
            }
            AttributeValue::String(s) => s.trim().parse::<u32>().ok().filter(|c| *c > 0),
            _ => None,
        }
    }
}

/// A reference observation: a location plus attributes, one of which
/// carries the class code.
#[derive(Debug, Clone)]
pub struct GroundPoint {
    /// Point location in the raster CRS
    pub location: Point<f64>,
    /// Point attributes
    pub properties: HashMap<String, AttributeValue>,
    /// Optional point ID
    pub id: Option<String>,
}

impl GroundPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            location: Point::new(x, y),
            properties: HashMap::new(),
            id: None,
        }
    }

    pub fn x(&self) -> f64 {
        self.location.x()
    }

    pub fn y(&self) -> f64 {
        self.location.y()
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.set_property(key, value);
        self
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Class code stored under `field`
    pub fn label(&self, field: &str) -> Option<u32> {
        self.get_property(field).and_then(AttributeValue::as_class_code)
    }
}

/// Ordered collection of ground points
#[derive(Debug, Clone, Default)]
pub struct LabeledPointSet {
    pub points: Vec<GroundPoint>,
}

impl LabeledPointSet {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn push(&mut self, point: GroundPoint) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroundPoint> {
        self.points.iter()
    }

    /// Points whose `field` equals `code`, in input order
    pub fn with_label(&self, field: &str, code: u32) -> LabeledPointSet {
        self.points
            .iter()
            .filter(|p| p.label(field) == Some(code))
            .cloned()
            .collect()
    }

    /// Append all points of `other` after this set's points
    pub fn merge(mut self, other: LabeledPointSet) -> LabeledPointSet {
        self.points.extend(other.points);
        self
    }
}

impl FromIterator<GroundPoint> for LabeledPointSet {
    fn from_iter<I: IntoIterator<Item = GroundPoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for LabeledPointSet {
    type Item = GroundPoint;
    type IntoIter = std::vec::IntoIter<GroundPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_parse() {
        assert_eq!(AttributeValue::parse("3"), AttributeValue::Int(3));
        assert_eq!(AttributeValue::parse("2.5"), AttributeValue::Float(2.5));
        assert_eq!(AttributeValue::parse(" "), AttributeValue::Null);
        assert_eq!(
            AttributeValue::parse("Polluted Cropland"),
            AttributeValue::String("Polluted Cropland".into())
        );
    }

    #[test]
    fn test_class_code() {
        assert_eq!(AttributeValue::Int(4).as_class_code(), Some(4));
        assert_eq!(AttributeValue::Float(2.0).as_class_code(), Some(2));
        assert_eq!(AttributeValue::Float(2.5).as_class_code(), None);
        assert_eq!(AttributeValue::Int(0).as_class_code(), None);
        assert_eq!(AttributeValue::Null.as_class_code(), None);
    }

    #[test]
    fn test_filter_and_merge_keep_order() {
        let pts: LabeledPointSet = (0..6)
            .map(|i| {
                GroundPoint::new(i as f64, 0.0)
                    .with_property("Incident_C", AttributeValue::Int(i % 2 + 1))
            })
            .collect();

        let ones = pts.with_label("Incident_C", 1);
        let twos = pts.with_label("Incident_C", 2);
        assert_eq!(ones.len(), 3);
        let merged = ones.merge(twos);
        let xs: Vec<f64> = merged.iter().map(|p| p.x()).collect();
        assert_eq!(xs, vec![0.0, 2.0, 4.0, 1.0, 3.0, 5.0]);
    }
}
