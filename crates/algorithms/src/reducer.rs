//! Pixel-stack reducers
//!
//! Reducers collapse the values observed for one pixel (across dates, across
//! bands, or across an extraction footprint) into a single value. No-data
//! entries are skipped; an all-no-data stack reduces to NaN.

use serde::{Deserialize, Serialize};

/// Order-independent reducer over a pixel stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    #[default]
    Median,
    Mean,
}

impl Reducer {
    /// Reduce `values` in place (the buffer may be reordered)
    pub fn reduce(self, values: &mut Vec<f64>) -> f64 {
        values.retain(|v| !v.is_nan());
        if values.is_empty() {
            return f64::NAN;
        }
        match self {
            Reducer::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Reducer::Median => {
                values.sort_by(f64::total_cmp);
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    (values[mid - 1] + values[mid]) / 2.0
                } else {
                    values[mid]
                }
            }
        }
    }

    /// Short name used in band tags
    pub fn name(self) -> &'static str {
        match self {
            Reducer::Median => "median",
            Reducer::Mean => "mean",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(Reducer::Median.reduce(&mut vec![3.0, 1.0, 2.0]), 2.0);
        assert_eq!(Reducer::Median.reduce(&mut vec![4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_nan_skipped() {
        assert_eq!(Reducer::Mean.reduce(&mut vec![f64::NAN, 2.0, 4.0]), 3.0);
        assert!(Reducer::Mean.reduce(&mut vec![f64::NAN]).is_nan());
        assert!(Reducer::Median.reduce(&mut Vec::new()).is_nan());
    }

    #[test]
    fn test_order_independent() {
        let a = Reducer::Median.reduce(&mut vec![5.0, -1.0, 7.0, 2.0]);
        let b = Reducer::Median.reduce(&mut vec![2.0, 7.0, 5.0, -1.0]);
        assert_eq!(a, b);
    }
}
