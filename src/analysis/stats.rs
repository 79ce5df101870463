//! Descriptive statistics over `f64` slices
//!
//! Small numeric helpers shared by the detectors and trend tests. Percentiles
//! use linear interpolation between closest ranks, and the standard deviation
//! is the population form (ddof = 0). A NaN anywhere in the input makes
//! every percentile NaN.

/// Arithmetic mean, `None` for an empty slice
#[must_use]
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation, `None` for an empty slice
#[must_use]
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let m = mean(data)?;
    let var = data.iter().map(|v| (v - m).powi(2)).sum::<f64>() / data.len() as f64;
    Some(var.sqrt())
}

/// Copy of `data` sorted ascending in IEEE total order
#[must_use]
pub fn sorted(data: &[f64]) -> Vec<f64> {
    let mut values = data.to_vec();
    values.sort_by(f64::total_cmp);
    values
}

/// Percentile `q` in `[0, 100]` of already sorted data
#[must_use]
pub fn percentile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    if sorted.iter().any(|v| v.is_nan()) {
        return Some(f64::NAN);
    }
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Percentile `q` in `[0, 100]`
#[must_use]
pub fn percentile(data: &[f64], q: f64) -> Option<f64> {
    percentile_sorted(&sorted(data), q)
}

/// Median, `None` for an empty slice
#[must_use]
pub fn median(data: &[f64]) -> Option<f64> {
    percentile(data, 50.0)
}

/// Complementary error function (Chebyshev fit, fractional error < 1.2e-7)
#[must_use]
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let ans = t
        * (-z * z - 1.265_512_23
            + t * (1.000_023_68
                + t * (0.374_091_96
                    + t * (0.096_784_18
                        + t * (-0.186_288_06
                            + t * (0.278_868_07
                                + t * (-1.135_203_98
                                    + t * (1.488_515_87
                                        + t * (-0.822_152_23 + t * 0.170_872_77)))))))))
            .exp();
    if x >= 0.0 { ans } else { 2.0 - ans }
}

/// Standard normal cumulative distribution function
#[must_use]
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}
