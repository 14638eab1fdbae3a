//! Cell value types

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// A value that can live in a raster cell.
///
/// Float cells treat NaN as no-data regardless of the declared value.
/// Integer cells are no-data only when they equal the declared value.
pub trait RasterElement:
    Copy + Debug + PartialOrd + NumCast + Zero + Send + Sync + 'static
{
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! integer_cells {
    ($($t:ty),*) => {$(
        impl RasterElement for $t {
            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }
        }
    )*};
}

macro_rules! float_cells {
    ($($t:ty),*) => {$(
        impl RasterElement for $t {
            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                self.is_nan() || nodata.is_some_and(|nd| (self - nd).abs() < <$t>::EPSILON * 100.0)
            }
        }
    )*};
}

integer_cells!(u8, u16, u32, i16, i32);
float_cells!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_nan_is_nodata() {
        assert!(f64::NAN.is_nodata(None));
        assert!(f32::NAN.is_nodata(Some(0.0)));
        assert!(!1.0f64.is_nodata(None));
        assert!((-9999.0f64).is_nodata(Some(-9999.0)));
    }

    #[test]
    fn test_integer_nodata_needs_declared_value() {
        assert!(!0u8.is_nodata(None));
        assert!(0u8.is_nodata(Some(0)));
        assert_eq!(7u16.to_f64(), Some(7.0));
    }
}
