//! Efficiency curves from pairs of counting histograms.

use serde::{Deserialize, Serialize};

use super::histogram::{Axis, Histogram1D};

/// Per-bin ratio of passed over total with binomial errors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyCurve {
    pub axis: Axis,
    pub passed: Vec<u64>,
    pub total: Vec<u64>,
    pub values: Vec<f64>,
    pub errors: Vec<f64>,
}

impl EfficiencyCurve {
    /// Divide `passed` by `total`; bins with no entries in `total` read zero
    pub fn from_histograms(passed: &Histogram1D, total: &Histogram1D) -> Self {
        let (values, errors) = passed
            .counts
            .iter()
            .zip(&total.counts)
            .map(|(&k, &n)| binomial(k, n))
            .unzip();

        Self {
            axis: total.axis,
            passed: passed.counts.clone(),
            total: total.counts.clone(),
            values,
            errors,
        }
    }

    /// Integrated efficiency over all bins
    pub fn overall(&self) -> (f64, f64) {
        binomial(self.passed.iter().sum(), self.total.iter().sum())
    }
}

/// Efficiency k/n and its binomial error sqrt(e(1-e)/n)
pub fn binomial(k: u64, n: u64) -> (f64, f64) {
    if n == 0 {
        return (0.0, 0.0);
    }
    let n = n as f64;
    let e = (k as f64 / n).min(1.0);
    (e, (e * (1.0 - e) / n).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(0, 0), (0.0, 0.0));
        let (e, err) = binomial(1, 4);
        assert!((e - 0.25).abs() < 1e-12);
        assert!((err - (0.25f64 * 0.75 / 4.0).sqrt()).abs() < 1e-12);
        // Full efficiency has zero binomial error
        assert_eq!(binomial(5, 5), (1.0, 0.0));
    }

    #[test]
    fn test_curve_per_bin() {
        let axis = Axis::new(2, 0.0, 2.0);
        let mut total = Histogram1D::new(axis);
        let mut passed = Histogram1D::new(axis);
        for v in [0.5, 0.5, 1.5, 1.5] {
            total.fill(v);
        }
        passed.fill(0.5);

        let curve = EfficiencyCurve::from_histograms(&passed, &total);
        assert_eq!(curve.values, vec![0.5, 0.0]);
        assert!((curve.errors[0] - 0.5 / 2f64.sqrt()).abs() < 1e-12);
        assert_eq!(curve.overall().0, 0.25);
    }
}
