//! Cross-asset risk summary table.

use crate::tail_risk::RiskRecord;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Ordered collection of per-asset risk rows. The row order follows the
/// order assets were processed in, one row per asset, whether or not its
/// tail could be estimated.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RiskSummary {
    records: Vec<RiskRecord>,
}

impl RiskSummary {
    /// Empty summary.
    pub fn new() -> Self {
        RiskSummary {
            records: Vec::new(),
        }
    }

    /// Append one asset row.
    pub fn push(&mut self, record: RiskRecord) {
        self.records.push(record);
    }

    /// All rows, in processing order.
    pub fn records(&self) -> &[RiskRecord] {
        &self.records
    }

    /// Row for a specific asset, if it was processed.
    pub fn record_for(&self, asset: &str) -> Option<&RiskRecord> {
        self.records.iter().find(|r| r.asset == asset)
    }

    /// Number of assets with a successful tail fit.
    pub fn fitted_count(&self) -> usize {
        self.records.iter().filter(|r| r.xi.is_some()).count()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no asset was processed.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:>12.6}", v),
        None => format!("{:>12}", "NaN"),
    }
}

impl fmt::Display for RiskSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>8}",
            "asset", "threshold", "xi", "beta", "VaR", "ES", "excess"
        )?;
        for r in &self.records {
            writeln!(
                f,
                "{:<12} {} {} {} {} {} {:>8}",
                r.asset,
                cell(r.threshold),
                cell(r.xi),
                cell(r.beta),
                cell(r.var),
                cell(r.es),
                r.num_exceedances
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "NaN".to_string()),
            )?;
        }
        Ok(())
    }
}
