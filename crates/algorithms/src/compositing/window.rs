//! Day-of-year time windows

use geofuse_core::RasterCollection;
use serde::{Deserialize, Serialize};

const MONTHS: [(&str, u32, u32); 12] = [
    ("jan", 1, 31),
    ("feb", 32, 59),
    ("mar", 60, 90),
    ("apr", 91, 120),
    ("may", 121, 151),
    ("jun", 152, 181),
    ("jul", 182, 212),
    ("aug", 213, 243),
    ("sep", 244, 273),
    ("oct", 274, 304),
    ("nov", 305, 335),
    ("dec", 336, 366),
];

/// Inclusive day-of-year range with an identifier used to tag bands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub id: String,
    pub first_day: u32,
    pub last_day: u32,
}

impl TimeWindow {
    pub fn new(id: impl Into<String>, first_day: u32, last_day: u32) -> Self {
        Self {
            id: id.into(),
            first_day,
            last_day,
        }
    }

    /// The whole year
    pub fn annual(id: impl Into<String>) -> Self {
        Self::new(id, 1, 366)
    }

    /// Twelve calendar months on non-leap day-of-year boundaries
    /// (`jan` = 1..=31, `feb` = 32..=59, ..., `dec` = 336..=366)
    pub fn monthly() -> Vec<TimeWindow> {
        MONTHS
            .iter()
            .map(|&(id, first, last)| Self::new(id, first, last))
            .collect()
    }

    /// Acquisitions of `collection` falling in this window
    pub fn select(&self, collection: &RasterCollection) -> RasterCollection {
        collection.filter_day_of_year(self.first_day, self.last_day)
    }
}
