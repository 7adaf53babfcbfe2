//! Log-return construction and per-asset descriptive statistics.

use crate::errors::{RiskAnalysisError, RiskResult};
use crate::math_utils::{excess_kurtosis, mean, median, sample_variance, skewness};
use crate::series::{ReturnPanel, ReturnSeries, Timestamp};
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Build a log-return series from a price path. Each return is labeled
/// with the timestamp of its later price, so n prices yield n - 1
/// returns. Prices must be strictly positive.
pub fn log_returns(timestamps: &[Timestamp], prices: &[f64]) -> RiskResult<ReturnSeries> {
    if timestamps.len() != prices.len() {
        return Err(RiskAnalysisError::InvalidParameter {
            parameter: "timestamps".to_string(),
            value: timestamps.len() as f64,
            constraint: format!("same length as prices ({})", prices.len()),
        });
    }
    if prices.len() < 2 {
        return Err(RiskAnalysisError::InsufficientData {
            required: 2,
            actual: prices.len(),
        });
    }
    if let Some(&bad) = prices.iter().find(|&&p| !(p > 0.0) || !p.is_finite()) {
        return Err(RiskAnalysisError::InvalidParameter {
            parameter: "prices".to_string(),
            value: bad,
            constraint: "> 0 and finite".to_string(),
        });
    }
    let values: Vec<f64> = prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
    ReturnSeries::new(timestamps[1..].to_vec(), values)
}

/// Descriptive statistics of one return series.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DescriptiveStats {
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std_dev: f64,
    /// Third standardized moment
    pub skewness: f64,
    /// Fisher definition: 0 for a normal distribution
    pub excess_kurtosis: f64,
    /// Smallest observation
    pub min: f64,
    /// Largest observation
    pub max: f64,
    /// Sample median
    pub median: f64,
}

impl DescriptiveStats {
    /// Compute the statistics of a series. Needs at least 2 observations
    /// for the sample moments.
    pub fn compute(values: &[f64]) -> RiskResult<Self> {
        if values.len() < 2 {
            return Err(RiskAnalysisError::InsufficientData {
                required: 2,
                actual: values.len(),
            });
        }
        Ok(DescriptiveStats {
            mean: mean(values),
            std_dev: sample_variance(values).sqrt(),
            skewness: skewness(values),
            excess_kurtosis: excess_kurtosis(values),
            min: values.iter().cloned().fold(f64::INFINITY, f64::min),
            max: values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            median: median(values),
        })
    }
}

/// Statistics for every asset of a panel, keyed by asset identifier.
/// Assets too short for sample moments are omitted with a warning.
pub fn describe_panel(panel: &ReturnPanel) -> BTreeMap<String, DescriptiveStats> {
    let mut table = BTreeMap::new();
    for (asset, series) in panel.iter() {
        match DescriptiveStats::compute(series.values()) {
            Ok(stats) => {
                table.insert(asset.clone(), stats);
            }
            Err(e) => log::warn!("asset {}: descriptive statistics unavailable: {}", asset, e),
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn log_returns_drop_the_first_timestamp() {
        let series = log_returns(&[10, 20, 30], &[100.0, 110.0, 99.0]).unwrap();
        assert_eq!(series.timestamps(), &[20, 30]);
        assert_approx_eq!(series.values()[0], (110.0f64 / 100.0).ln(), 1e-12);
        assert_approx_eq!(series.values()[1], (99.0f64 / 110.0).ln(), 1e-12);
    }

    #[test]
    fn log_returns_reject_non_positive_prices() {
        assert!(log_returns(&[1, 2], &[100.0, 0.0]).is_err());
        assert!(log_returns(&[1, 2], &[100.0, -5.0]).is_err());
        assert!(log_returns(&[1], &[100.0]).is_err());
    }

    #[test]
    fn stats_match_hand_computed_values() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let stats = DescriptiveStats::compute(&values).unwrap();
        assert_approx_eq!(stats.mean, 3.0, 1e-12);
        assert_approx_eq!(stats.std_dev, 2.5f64.sqrt(), 1e-12);
        assert_approx_eq!(stats.skewness, 0.0, 1e-12);
        assert_approx_eq!(stats.median, 3.0, 1e-12);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
    }

    #[test]
    fn panel_table_skips_degenerate_assets() {
        let mut panel = ReturnPanel::new();
        panel.insert("OK", ReturnSeries::from_values(vec![0.1, -0.2, 0.3]).unwrap());
        panel.insert("SHORT", ReturnSeries::from_values(vec![0.1]).unwrap());
        let table = describe_panel(&panel);
        assert!(table.contains_key("OK"));
        assert!(!table.contains_key("SHORT"));
    }
}
