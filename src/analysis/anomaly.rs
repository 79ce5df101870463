//! Statistical anomaly detection for climate series
//!
//! Three detectors are provided: the interquartile range rule, the z-score
//! rule and an isolation forest. All of them work on a plain `f64` slice and
//! report anomalies by position.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::analysis::stats;
use crate::error::{ClimateError, Result};

/// Method label for the IQR detector
pub const METHOD_IQR: &str = "IQR";
/// Method label for the z-score detector
pub const METHOD_ZSCORE: &str = "Z-score";
/// Method label for the isolation forest detector
pub const METHOD_ISOLATION_FOREST: &str = "IsolationForest";

/// Default share of points the isolation forest treats as anomalous
pub const DEFAULT_CONTAMINATION: f64 = 0.05;
/// Default IQR fence multiplier
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;
/// Default z-score threshold
pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 3.0;

const N_ESTIMATORS: usize = 100;
const MAX_SAMPLES: usize = 256;
const FOREST_SEED: u64 = 42;
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// A detected anomaly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    /// Position in the input series
    pub index: usize,
    /// Observed value
    pub value: f64,
    /// Detector-specific severity; larger is more anomalous
    pub score: f64,
    /// Detector that flagged the value
    pub method: String,
    /// Observation time, when known
    pub timestamp: Option<String>,
}

impl Anomaly {
    fn new(index: usize, value: f64, score: f64, method: &str) -> Self {
        Self {
            index,
            value,
            score,
            method: method.to_string(),
            timestamp: None,
        }
    }
}

/// Multi-method anomaly detector
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    contamination: f64,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self {
            contamination: DEFAULT_CONTAMINATION,
        }
    }
}

impl AnomalyDetector {
    /// Create a detector; `contamination` must lie in `(0, 0.5]`
    pub fn new(contamination: f64) -> Result<Self> {
        if !(contamination > 0.0 && contamination <= 0.5) {
            return Err(ClimateError::invalid_parameter(
                "contamination",
                format!("must be in (0, 0.5], got {contamination}"),
            )
            .into());
        }
        Ok(Self { contamination })
    }

    /// Expected share of anomalies used by the isolation forest
    #[must_use]
    pub const fn contamination(&self) -> f64 {
        self.contamination
    }

    /// Flag values outside `[q1 - m*iqr, q3 + m*iqr]`
    ///
    /// A NaN in `data` makes the quartiles NaN, so nothing is flagged.
    #[must_use]
    pub fn detect_iqr(&self, data: &[f64], multiplier: f64) -> Vec<Anomaly> {
        let sorted = stats::sorted(data);
        let (Some(q1), Some(q3), Some(median)) = (
            stats::percentile_sorted(&sorted, 25.0),
            stats::percentile_sorted(&sorted, 75.0),
            stats::percentile_sorted(&sorted, 50.0),
        ) else {
            return Vec::new();
        };

        let iqr = q3 - q1;
        let lower = q1 - multiplier * iqr;
        let upper = q3 + multiplier * iqr;

        data.iter()
            .enumerate()
            .filter(|(_, v)| **v < lower || **v > upper)
            .map(|(i, &v)| {
                let score = if iqr == 0.0 {
                    f64::INFINITY
                } else {
                    (v - median).abs() / iqr
                };
                Anomaly::new(i, v, score, METHOD_IQR)
            })
            .collect()
    }

    /// Flag values whose absolute z-score exceeds `threshold`
    #[must_use]
    pub fn detect_zscore(&self, data: &[f64], threshold: f64) -> Vec<Anomaly> {
        let (Some(mean), Some(std)) = (stats::mean(data), stats::std_dev(data)) else {
            return Vec::new();
        };
        if std == 0.0 {
            return Vec::new();
        }

        data.iter()
            .enumerate()
            .filter_map(|(i, &v)| {
                let z = (v - mean).abs() / std;
                (z > threshold).then(|| Anomaly::new(i, v, z, METHOD_ZSCORE))
            })
            .collect()
    }

    /// Flag the `contamination` share of values that isolate fastest
    ///
    /// Fails on NaN or infinite input.
    pub fn detect_isolation_forest(&self, data: &[f64]) -> Result<Vec<Anomaly>> {
        if let Some(bad) = data.iter().find(|v| !v.is_finite()) {
            return Err(ClimateError::invalid_parameter(
                "data",
                format!("isolation forest needs finite values, found {bad}"),
            )
            .into());
        }
        if data.len() < 2 {
            return Ok(Vec::new());
        }

        let forest = IsolationForest::fit(data, N_ESTIMATORS, MAX_SAMPLES, FOREST_SEED);
        let scores = forest.score_samples(data);
        let Some(offset) = stats::percentile(&scores, 100.0 * self.contamination) else {
            return Ok(Vec::new());
        };

        Ok(data
            .iter()
            .zip(&scores)
            .enumerate()
            .filter(|(_, (_, score))| **score < offset)
            .map(|(i, (&v, score))| Anomaly::new(i, v, score.abs(), METHOD_ISOLATION_FOREST))
            .collect())
    }

    /// Run every detector with its default parameters
    pub fn detect_all(&self, data: &[f64]) -> Result<BTreeMap<String, Vec<Anomaly>>> {
        let mut results = BTreeMap::new();
        results.insert(
            "iqr".to_string(),
            self.detect_iqr(data, DEFAULT_IQR_MULTIPLIER),
        );
        results.insert(
            "zscore".to_string(),
            self.detect_zscore(data, DEFAULT_ZSCORE_THRESHOLD),
        );
        results.insert(
            "isolation_forest".to_string(),
            self.detect_isolation_forest(data)?,
        );
        Ok(results)
    }
}

#[derive(Debug)]
enum Node {
    Internal {
        split: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    External {
        size: usize,
    },
}

impl Node {
    fn build(sample: &[f64], depth: usize, height_limit: usize, rng: &mut StdRng) -> Self {
        if depth >= height_limit || sample.len() <= 1 {
            return Self::External { size: sample.len() };
        }

        let (min, max) = sample
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if min >= max || !(max - min).is_finite() {
            return Self::External { size: sample.len() };
        }

        let split = rng.random_range(min..max);
        let (left, right): (Vec<f64>, Vec<f64>) = sample.iter().copied().partition(|&v| v < split);

        Self::Internal {
            split,
            left: Box::new(Self::build(&left, depth + 1, height_limit, rng)),
            right: Box::new(Self::build(&right, depth + 1, height_limit, rng)),
        }
    }

    fn path_length(&self, value: f64) -> f64 {
        let mut node = self;
        let mut depth = 0.0;
        loop {
            match node {
                Self::External { size } => return depth + average_path_length(*size),
                Self::Internal { split, left, right } => {
                    node = if value < *split { &**left } else { &**right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Isolation forest over one-dimensional data
#[derive(Debug)]
pub struct IsolationForest {
    trees: Vec<Node>,
    sample_size: usize,
}

impl IsolationForest {
    /// Grow `n_estimators` trees on random subsamples of at most `max_samples` points
    #[must_use]
    pub fn fit(data: &[f64], n_estimators: usize, max_samples: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let sample_size = max_samples.min(data.len()).max(1);
        let height_limit = (sample_size as f64).log2().ceil() as usize;

        let trees = (0..n_estimators)
            .map(|_| {
                let sample: Vec<f64> =
                    rand::seq::index::sample(&mut rng, data.len(), sample_size)
                        .into_iter()
                        .map(|i| data[i])
                        .collect();
                Node::build(&sample, 0, height_limit, &mut rng)
            })
            .collect();

        Self { trees, sample_size }
    }

    /// Negated anomaly scores; lower means more anomalous
    #[must_use]
    pub fn score_samples(&self, data: &[f64]) -> Vec<f64> {
        let normaliser = average_path_length(self.sample_size);
        data.iter()
            .map(|&v| {
                if self.trees.is_empty() || normaliser == 0.0 {
                    return -0.5;
                }
                let mean_depth = self.trees.iter().map(|t| t.path_length(v)).sum::<f64>()
                    / self.trees.len() as f64;
                -(2f64.powf(-mean_depth / normaliser))
            })
            .collect()
    }
}
