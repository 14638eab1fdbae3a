//! Dated raster collections
//!
//! A [`RasterCollection`] is the already-filtered output of an acquisition
//! stage: a date-ordered sequence of stacks that share one band schema and
//! one grid. Compositing consumes it one time window at a time.

use crate::error::{Error, Result};
use crate::raster::{GridSpec, RasterStack};
use chrono::{Datelike, NaiveDate};

/// One acquisition in a collection
#[derive(Debug, Clone)]
pub struct Acquisition {
    pub date: NaiveDate,
    pub stack: RasterStack,
}

/// Date-ordered stacks sharing a band schema and grid.
#[derive(Debug, Clone)]
pub struct RasterCollection {
    schema: Vec<String>,
    grid: GridSpec,
    items: Vec<Acquisition>,
}

impl RasterCollection {
    /// Create an empty collection with the given band schema and grid
    pub fn new<S: Into<String>>(schema: impl IntoIterator<Item = S>, grid: GridSpec) -> Self {
        Self {
            schema: schema.into_iter().map(Into::into).collect(),
            grid,
            items: Vec::new(),
        }
    }

    /// Add an acquisition, keeping the collection ordered by date.
    ///
    /// Acquisitions on the same date keep their insertion order.
    pub fn push(&mut self, date: NaiveDate, stack: RasterStack) -> Result<()> {
        let label = date.to_string();
        if stack.band_names() != self.schema.as_slice() {
            return Err(Error::Alignment {
                source_name: label,
                reason: format!(
                    "bands [{}] do not match collection schema [{}]",
                    stack.band_names().join(", "),
                    self.schema.join(", ")
                ),
            });
        }
        self.grid.check_aligned(stack.grid(), &label)?;

        let at = self.items.partition_point(|a| a.date <= date);
        self.items.insert(at, Acquisition { date, stack });
        Ok(())
    }

    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Acquisition> {
        self.items.iter()
    }

    fn filtered<F: Fn(&Acquisition) -> bool>(&self, keep: F) -> RasterCollection {
        RasterCollection {
            schema: self.schema.clone(),
            grid: self.grid.clone(),
            items: self.items.iter().filter(|a| keep(a)).cloned().collect(),
        }
    }

    /// Acquisitions whose day of year lies in `first..=last`
    pub fn filter_day_of_year(&self, first: u32, last: u32) -> RasterCollection {
        self.filtered(|a| (first..=last).contains(&a.date.ordinal()))
    }

    /// Acquisitions dated within `start..=end`
    pub fn filter_dates(&self, start: NaiveDate, end: NaiveDate) -> RasterCollection {
        self.filtered(|a| a.date >= start && a.date <= end)
    }

    /// Collection restricted to `bands` in the requested order
    pub fn select<S: AsRef<str>>(&self, bands: &[S]) -> Result<RasterCollection> {
        for band in bands {
            if !self.schema.iter().any(|s| s == band.as_ref()) {
                return Err(Error::missing_band(band.as_ref(), &self.schema));
            }
        }
        let items = self
            .items
            .iter()
            .map(|a| {
                Ok(Acquisition {
                    date: a.date,
                    stack: a.stack.select(bands)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RasterCollection {
            schema: bands.iter().map(|b| b.as_ref().to_string()).collect(),
            grid: self.grid.clone(),
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{GeoTransform, Raster};

    fn grid() -> GridSpec {
        GridSpec::new(3, 3, GeoTransform::new(0.0, 30.0, 10.0, -10.0), None)
    }

    fn scene(vv: f64, vh: f64) -> RasterStack {
        let g = grid();
        RasterStack::new(g.clone())
            .with_band("VV", Raster::on_grid(&g, vv))
            .unwrap()
            .with_band("VH", Raster::on_grid(&g, vh))
            .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_push_keeps_date_order() {
        let mut c = RasterCollection::new(["VV", "VH"], grid());
        c.push(date(2022, 3, 1), scene(-10.0, -17.0)).unwrap();
        c.push(date(2022, 1, 5), scene(-11.0, -18.0)).unwrap();
        let dates: Vec<_> = c.iter().map(|a| a.date).collect();
        assert_eq!(dates, vec![date(2022, 1, 5), date(2022, 3, 1)]);
    }

    #[test]
    fn test_schema_mismatch_is_alignment_error() {
        let mut c = RasterCollection::new(["VH", "VV"], grid());
        let err = c.push(date(2022, 1, 1), scene(-10.0, -17.0)).unwrap_err();
        assert!(matches!(err, Error::Alignment { .. }));
    }

    #[test]
    fn test_filter_day_of_year() {
        let mut c = RasterCollection::new(["VV", "VH"], grid());
        c.push(date(2022, 1, 31), scene(-10.0, -17.0)).unwrap();
        c.push(date(2022, 2, 1), scene(-10.0, -17.0)).unwrap();
        assert_eq!(c.filter_day_of_year(1, 31).len(), 1);
        assert_eq!(c.filter_day_of_year(32, 59).len(), 1);
        assert!(c.filter_day_of_year(60, 90).is_empty());
    }

    #[test]
    fn test_filter_dates_is_inclusive() {
        let mut c = RasterCollection::new(["VV", "VH"], grid());
        for d in [date(2021, 12, 31), date(2022, 1, 1), date(2022, 12, 30), date(2022, 12, 31)] {
            c.push(d, scene(-10.0, -17.0)).unwrap();
        }
        let year = c.filter_dates(date(2022, 1, 1), date(2022, 12, 30));
        let dates: Vec<_> = year.iter().map(|a| a.date).collect();
        assert_eq!(dates, vec![date(2022, 1, 1), date(2022, 12, 30)]);
    }

    #[test]
    fn test_select() {
        let mut c = RasterCollection::new(["VV", "VH"], grid());
        c.push(date(2022, 1, 31), scene(-10.0, -17.0)).unwrap();
        let vh = c.select(&["VH"]).unwrap();
        assert_eq!(vh.schema(), &["VH".to_string()]);
        assert!(c.select(&["HH"]).is_err());
    }
}
