//! Max-referenced decibel conversion.

use num_complex::Complex64;

use crate::error::{Error, Result};
use crate::matrix::Matrix;

/// Floor added to power before taking the logarithm.
pub const POWER_EPSILON: f64 = 1e-12;

/// Multiplier converting power ratios to decibels.
const DB_MULTIPLIER: f64 = 10.0;

/// Entries whose power (`|c|^2`) can be taken.
pub trait Power {
    fn power(&self) -> f64;
}

impl Power for Complex64 {
    fn power(&self) -> f64 {
        self.norm_sqr()
    }
}

impl Power for f64 {
    fn power(&self) -> f64 {
        self * self
    }
}

/// Convert magnitudes to decibels relative to the strongest entry.
///
/// Each entry becomes `10 log10(|c|^2 + 1e-12)` minus the maximum over all
/// finite entries, so the peak is exactly 0 dB and everything else is
/// negative. A matrix of zeros maps to all 0 dB.
pub fn to_decibel<T: Power>(matrix: &Matrix<T>) -> Result<Matrix<f64>> {
    power_to_decibel(&matrix.map(Power::power))
}

/// [`to_decibel`] for entries that already hold power.
pub fn power_to_decibel(power: &Matrix<f64>) -> Result<Matrix<f64>> {
    if power.is_empty() {
        return Err(Error::EmptyInput);
    }
    let mut db = power.map(|&p| DB_MULTIPLIER * (p + POWER_EPSILON).log10());
    let peak = db
        .as_slice()
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if !peak.is_finite() {
        return Err(Error::NumericDegeneracy(
            "no finite power values to reference".into(),
        ));
    }
    for r in 0..db.rows() {
        for v in db.row_mut(r) {
            *v -= peak;
        }
    }
    Ok(db)
}


#[cfg(all(feature = "internal-tests", test))]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn peak_is_always_zero(values in proptest::collection::vec(0.0f64..1e6, 1..64)) {
            let n = values.len();
            let db = power_to_decibel(&Matrix::new(1, n, values).unwrap()).unwrap();
            let peak = db.as_slice().iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert_eq!(peak, 0.0);
            prop_assert!(db.as_slice().iter().all(|&v| v <= 0.0 && v >= -200.0));
        }
    }
}
