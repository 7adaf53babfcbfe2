//! Timestamp-aligned series containers for the return panel and the
//! residual matrix.
//!
//! Asset series in one panel may cover different valid ranges; alignment
//! between them is always by timestamp key, never by position. All
//! containers here are write-once: they are fully populated at
//! construction and expose read-only views afterwards.

use crate::errors::{validate_all_finite, RiskAnalysisError, RiskResult};
use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Timestamp key. Epoch-agnostic: callers may use Unix seconds, trading-day
/// ordinals or any other strictly increasing integer labeling.
pub type Timestamp = i64;

/// One asset's return observations, ordered by timestamp with gaps
/// permitted. Immutable once constructed.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReturnSeries {
    timestamps: Vec<Timestamp>,
    values: Vec<f64>,
}

impl ReturnSeries {
    /// Build a series from parallel timestamp/value vectors. Timestamps
    /// must be strictly increasing (no duplicates) and values finite;
    /// missing observations are simply absent rows, dropped by the caller
    /// before construction.
    pub fn new(timestamps: Vec<Timestamp>, values: Vec<f64>) -> RiskResult<Self> {
        if timestamps.len() != values.len() {
            return Err(RiskAnalysisError::InvalidParameter {
                parameter: "timestamps".to_string(),
                value: timestamps.len() as f64,
                constraint: format!("same length as values ({})", values.len()),
            });
        }
        if let Some(w) = timestamps.windows(2).find(|w| w[0] >= w[1]) {
            return Err(RiskAnalysisError::InvalidParameter {
                parameter: "timestamps".to_string(),
                value: w[1] as f64,
                constraint: "strictly increasing, no duplicates".to_string(),
            });
        }
        validate_all_finite(&values, "values")?;
        Ok(Self { timestamps, values })
    }

    /// Series with synthetic consecutive timestamps 0..n, convenient for
    /// data without a calendar.
    pub fn from_values(values: Vec<f64>) -> RiskResult<Self> {
        let timestamps = (0..values.len() as Timestamp).collect();
        Self::new(timestamps, values)
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the series holds no observations.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Observation values, in timestamp order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Timestamps, strictly increasing.
    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }
}

/// Multi-asset return panel keyed by asset identifier. BTreeMap keeps the
/// iteration order deterministic across runs.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReturnPanel {
    series: BTreeMap<String, ReturnSeries>,
}

impl ReturnPanel {
    /// Empty panel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace one asset's series. Returns true when the asset
    /// was new.
    pub fn insert(&mut self, asset: impl Into<String>, series: ReturnSeries) -> bool {
        self.series.insert(asset.into(), series).is_none()
    }

    /// Series for one asset.
    pub fn get(&self, asset: &str) -> Option<&ReturnSeries> {
        self.series.get(asset)
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// True when the panel holds no assets.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Iterate assets in deterministic (lexicographic) order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ReturnSeries)> {
        self.series.iter()
    }

    /// Asset identifiers in deterministic order.
    pub fn assets(&self) -> impl Iterator<Item = &String> {
        self.series.keys()
    }
}

/// Standardized residuals for one asset, aligned to the asset's own valid
/// timestamp range.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResidualSeries {
    timestamps: Vec<Timestamp>,
    values: Vec<f64>,
}

impl ResidualSeries {
    pub(crate) fn new(timestamps: Vec<Timestamp>, values: Vec<f64>) -> Self {
        debug_assert_eq!(timestamps.len(), values.len());
        Self { timestamps, values }
    }

    /// Residual values, in timestamp order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Timestamps of the residuals.
    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    /// Number of residuals.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no residuals are present.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One sparse-aligned row of the residual matrix: a timestamp and the
/// residual of every asset observed at that timestamp.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResidualRow {
    /// Row timestamp
    pub timestamp: Timestamp,
    /// Asset -> residual, only for assets observed at this timestamp
    pub residuals: BTreeMap<String, f64>,
}

/// Residual matrix: asset -> standardized residual series, sharing the
/// original timestamp index. Write-once per pipeline run.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResidualMatrix {
    columns: BTreeMap<String, ResidualSeries>,
}

impl ResidualMatrix {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, asset: String, series: ResidualSeries) {
        self.columns.insert(asset, series);
    }

    /// Residuals for one asset, if it was successfully fit.
    pub fn column(&self, asset: &str) -> Option<&ResidualSeries> {
        self.columns.get(asset)
    }

    /// Assets present in the matrix, deterministic order.
    pub fn assets(&self) -> impl Iterator<Item = &String> {
        self.columns.keys()
    }

    /// Iterate columns in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResidualSeries)> {
        self.columns.iter()
    }

    /// Number of asset columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when no asset produced residuals.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Materialize sparse-aligned rows over the union of all column
    /// timestamps, for external reporting collaborators. Assets without an
    /// observation at a given timestamp are simply absent from that row.
    pub fn rows(&self) -> Vec<ResidualRow> {
        let all_timestamps: BTreeSet<Timestamp> = self
            .columns
            .values()
            .flat_map(|col| col.timestamps().iter().copied())
            .collect();

        all_timestamps
            .into_iter()
            .map(|ts| {
                let mut residuals = BTreeMap::new();
                for (asset, col) in &self.columns {
                    if let Ok(idx) = col.timestamps().binary_search(&ts) {
                        residuals.insert(asset.clone(), col.values()[idx]);
                    }
                }
                ResidualRow {
                    timestamp: ts,
                    residuals,
                }
            })
            .collect()
    }
}
