//! Long-term climate trend analysis
//!
//! Non-parametric trend detection with the Mann-Kendall test and Sen's slope
//! estimator, plus a moving-average seasonal decomposition.

use serde::{Deserialize, Serialize};

use crate::analysis::stats;
use crate::error::{ClimateError, Result};
use crate::types::{TrendDirection, TrendMetrics};

/// Default significance level for the Mann-Kendall test
pub const DEFAULT_SIGNIFICANCE_LEVEL: f64 = 0.05;
/// Default seasonal period (monthly data)
pub const DEFAULT_PERIOD: usize = 12;

/// Fewest values a trend test accepts
pub const MIN_TREND_POINTS: usize = 3;

/// Result of a complete trend analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    /// Sen's slope per time step
    pub slope: f64,
    /// Median intercept of the Sen line
    pub intercept: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// Direction of the trend
    pub trend_direction: TrendDirection,
    /// Whether the trend is significant at the configured level
    pub is_significant: bool,
    /// Approximate 95% interval around the slope
    pub confidence_interval: (f64, f64),
}

impl TrendResult {
    /// Summary metrics without the intercept
    #[must_use]
    pub fn trend_metrics(&self) -> TrendMetrics {
        TrendMetrics {
            slope: self.slope,
            p_value: self.p_value,
            trend_direction: self.trend_direction,
            is_significant: self.is_significant,
            confidence_interval: self.confidence_interval,
        }
    }
}

/// Outcome of the Mann-Kendall test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MannKendall {
    /// Normalised test statistic
    pub z: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// Direction implied by the sign of `z`
    pub direction: TrendDirection,
}

/// Trend, seasonal and residual components of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalDecomposition {
    /// Centred moving average
    pub trend: Vec<f64>,
    /// Per-phase mean of the detrended series
    pub seasonal: Vec<f64>,
    /// What remains after removing trend and season
    pub residual: Vec<f64>,
}

/// Analyzer for long-term climate trends
#[derive(Debug, Clone)]
pub struct TrendAnalyzer {
    significance_level: f64,
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self {
            significance_level: DEFAULT_SIGNIFICANCE_LEVEL,
        }
    }
}

fn require_points(operation: &'static str, data: &[f64]) -> Result<()> {
    if data.len() < MIN_TREND_POINTS {
        return Err(ClimateError::insufficient(operation, MIN_TREND_POINTS, data.len()).into());
    }
    Ok(())
}

impl TrendAnalyzer {
    /// Create an analyzer; `significance_level` must lie in `(0, 1)`
    pub fn new(significance_level: f64) -> Result<Self> {
        if !(significance_level > 0.0 && significance_level < 1.0) {
            return Err(ClimateError::invalid_parameter(
                "significance_level",
                format!("must be in (0, 1), got {significance_level}"),
            )
            .into());
        }
        Ok(Self { significance_level })
    }

    /// Significance level used to judge `is_significant`
    #[must_use]
    pub const fn significance_level(&self) -> f64 {
        self.significance_level
    }

    /// Mann-Kendall monotonic trend test (no tie correction)
    pub fn mann_kendall_test(&self, data: &[f64]) -> Result<MannKendall> {
        require_points("mann_kendall_test", data)?;

        let n = data.len();
        let mut s: i64 = 0;
        for i in 0..n - 1 {
            for j in i + 1..n {
                let diff = data[j] - data[i];
                if diff > 0.0 {
                    s += 1;
                } else if diff < 0.0 {
                    s -= 1;
                }
            }
        }

        let nf = n as f64;
        let var_s = nf * (nf - 1.0) * (2.0 * nf + 5.0) / 18.0;
        let z = match s {
            s if s > 0 => (s - 1) as f64 / var_s.sqrt(),
            s if s < 0 => (s + 1) as f64 / var_s.sqrt(),
            _ => 0.0,
        };

        let p_value = 2.0 * (1.0 - stats::normal_cdf(z.abs()));
        let direction = if z > 0.0 {
            TrendDirection::Increasing
        } else if z < 0.0 {
            TrendDirection::Decreasing
        } else {
            TrendDirection::NoTrend
        };

        Ok(MannKendall {
            z,
            p_value,
            direction,
        })
    }

    /// Sen's slope: median of all pairwise slopes
    ///
    /// A NaN in `data` yields a NaN slope.
    pub fn sens_slope(&self, data: &[f64]) -> Result<f64> {
        require_points("sens_slope", data)?;

        let n = data.len();
        let mut slopes = Vec::with_capacity(n * (n - 1) / 2);
        for i in 0..n - 1 {
            for j in i + 1..n {
                slopes.push((data[j] - data[i]) / (j - i) as f64);
            }
        }

        stats::median(&slopes)
            .ok_or_else(|| ClimateError::insufficient("sens_slope", MIN_TREND_POINTS, n).into())
    }

    /// Full trend analysis of an evenly spaced series
    pub fn analyze(&self, data: &[f64]) -> Result<TrendResult> {
        let mk = self.mann_kendall_test(data)?;
        let slope = self.sens_slope(data)?;

        let n = data.len();
        let residuals: Vec<f64> = data
            .iter()
            .enumerate()
            .map(|(i, v)| v - slope * i as f64)
            .collect();
        let intercept = stats::median(&residuals).unwrap_or(0.0);

        let nf = n as f64;
        let se = slope * ((nf * (nf + 1.0) * (2.0 * nf + 1.0)) / (6.0 * nf * (nf - 1.0))).sqrt();
        let (lo, hi) = (slope - 1.96 * se, slope + 1.96 * se);

        Ok(TrendResult {
            slope,
            intercept,
            p_value: mk.p_value,
            trend_direction: mk.direction,
            is_significant: mk.p_value < self.significance_level,
            confidence_interval: (lo.min(hi), lo.max(hi)),
        })
    }

    /// Moving-average decomposition with the given seasonal `period`
    pub fn seasonal_decompose(&self, data: &[f64], period: usize) -> Result<SeasonalDecomposition> {
        if period == 0 {
            return Err(ClimateError::invalid_parameter("period", "must be positive").into());
        }
        if data.len() < period {
            return Err(ClimateError::insufficient("seasonal_decompose", period, data.len()).into());
        }

        let n = data.len();
        let weight = 1.0 / period as f64;
        let offset = (period - 1) / 2;

        // Same-length convolution with zero padding at both ends
        let trend: Vec<f64> = (0..n)
            .map(|i| {
                let k = i + offset;
                let lo = k.saturating_sub(period - 1);
                let hi = k.min(n - 1);
                (lo..=hi).map(|m| data[m] * weight).sum()
            })
            .collect();

        let detrended: Vec<f64> = data.iter().zip(&trend).map(|(d, t)| d - t).collect();
        let mut seasonal = vec![0.0; n];
        for phase in 0..period {
            let phase_values: Vec<f64> = detrended.iter().skip(phase).step_by(period).copied().collect();
            let phase_mean = stats::mean(&phase_values).unwrap_or(0.0);
            for slot in seasonal.iter_mut().skip(phase).step_by(period) {
                *slot = phase_mean;
            }
        }

        let residual = data
            .iter()
            .zip(&trend)
            .zip(&seasonal)
            .map(|((d, t), s)| d - t - s)
            .collect();

        Ok(SeasonalDecomposition {
            trend,
            seasonal,
            residual,
        })
    }
}
