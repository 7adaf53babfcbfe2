//! Two-stage tail risk analysis across a return panel.
//!
//! Stage A fits a conditional-volatility model per asset and extracts
//! standardized residuals; stage B runs peaks-over-threshold GPD
//! estimation on each residual series and produces the cross-asset risk
//! table. The partial-failure policy of stage A carries through: an
//! asset whose tail cannot be estimated still gets a row in the table,
//! with its measures left undefined.

use crate::config::{PipelineConfig, TailConfig, TailSide, ThresholdStrategy};
use crate::errors::{RiskAnalysisError, RiskResult};
use crate::gpd::{estimate_tail, GpdFitOutcome};
use crate::math_utils::quantile;
use crate::pipeline::{extract_residuals, FitSummary, SkippedAsset};
use crate::series::{ResidualMatrix, ReturnPanel};
use crate::summary::RiskSummary;
use crate::tail_risk::RiskRecord;
use std::collections::BTreeMap;

/// Complete output of one pipeline run.
#[derive(Debug)]
pub struct RiskAnalysisReport {
    /// One row per asset that survived the volatility stage, panel order
    pub fit_summaries: Vec<FitSummary>,
    /// Standardized residuals of the winning models
    pub residuals: ResidualMatrix,
    /// Cross-asset VaR/ES table, one row per panel asset
    pub risk_summary: RiskSummary,
    /// Detailed tail-fit outcome per asset with residuals, for
    /// goodness-of-fit inspection
    pub tail_fits: BTreeMap<String, GpdFitOutcome>,
    /// Assets skipped during the volatility stage, with reasons
    pub skipped: Vec<SkippedAsset>,
}

impl RiskAnalysisReport {
    /// Risk row for one asset, failing with
    /// [`RiskAnalysisError::AssetNotFound`] for assets outside the
    /// analyzed panel.
    pub fn record_for(&self, asset: &str) -> RiskResult<&RiskRecord> {
        self.risk_summary
            .record_for(asset)
            .ok_or_else(|| RiskAnalysisError::AssetNotFound {
                asset: asset.to_string(),
            })
    }
}

/// Orchestrator for the full volatility-then-EVT pipeline.
#[derive(Debug, Clone)]
pub struct TailRiskAnalyzer {
    config: PipelineConfig,
}

/// Residuals as seen by the tail stage: absolute values fold both tails
/// together, the upper side keeps the signed values.
fn transform_residuals(values: &[f64], side: TailSide) -> Vec<f64> {
    match side {
        TailSide::Absolute => values.iter().map(|v| v.abs()).collect(),
        TailSide::Upper => values.to_vec(),
    }
}

/// Resolve the threshold for one transformed residual series.
fn resolve_threshold(transformed: &[f64], strategy: ThresholdStrategy) -> f64 {
    match strategy {
        ThresholdStrategy::Quantile(level) => quantile(transformed, level),
        ThresholdStrategy::Fixed(u) => u,
    }
}

/// Stage B for one asset. Never fails the run: a threshold outside the
/// residual range, too few residuals, or a failed GPD fit all produce an
/// undefined row with a warning.
fn fit_asset_tail(
    asset: &str,
    residuals: &[f64],
    tail: &TailConfig,
) -> (RiskRecord, Option<GpdFitOutcome>) {
    if residuals.len() < tail.min_observations {
        log::warn!(
            "asset {}: {} residuals (tail stage requires {}), tail not estimated",
            asset,
            residuals.len(),
            tail.min_observations
        );
        return (RiskRecord::undefined(asset), None);
    }

    let transformed = transform_residuals(residuals, tail.side);
    let u = resolve_threshold(&transformed, tail.threshold);

    match estimate_tail(&transformed, u, tail.min_exceedances, tail.max_iterations) {
        Ok(outcome) => {
            let record = match &outcome {
                GpdFitOutcome::Fitted(fit) => RiskRecord::from_fit(asset, fit, tail.alpha),
                GpdFitOutcome::TooFewExceedances {
                    available,
                    required,
                } => {
                    log::warn!(
                        "asset {}: {} exceedances over threshold {} (minimum {}), tail not estimated",
                        asset,
                        available,
                        u,
                        required
                    );
                    RiskRecord {
                        threshold: Some(u),
                        num_exceedances: Some(*available),
                        ..RiskRecord::undefined(asset)
                    }
                }
                GpdFitOutcome::NotConverged { .. } => RiskRecord {
                    threshold: Some(u),
                    ..RiskRecord::undefined(asset)
                },
            };
            (record, Some(outcome))
        }
        Err(e) => {
            log::warn!("asset {}: tail estimation rejected: {}", asset, e);
            (RiskRecord::undefined(asset), None)
        }
    }
}

impl TailRiskAnalyzer {
    /// Analyzer with the given configuration.
    pub fn new(config: PipelineConfig) -> Self {
        TailRiskAnalyzer { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run both stages over the panel.
    ///
    /// Only an empty panel or an invalid configuration is fatal. Every
    /// panel asset gets a row in the risk table; assets skipped in the
    /// volatility stage and assets whose tail could not be fit appear
    /// with undefined measures.
    pub fn analyze(&self, panel: &ReturnPanel) -> RiskResult<RiskAnalysisReport> {
        let extraction = extract_residuals(panel, &self.config)?;
        let tail = &self.config.tail;

        let columns: Vec<(&String, &[f64])> = extraction
            .residuals
            .iter()
            .map(|(asset, series)| (asset, series.values()))
            .collect();

        #[cfg(feature = "parallel")]
        let fitted: Vec<(RiskRecord, Option<GpdFitOutcome>)> = {
            use rayon::prelude::*;
            columns
                .par_iter()
                .map(|(asset, values)| fit_asset_tail(asset, values, tail))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let fitted: Vec<(RiskRecord, Option<GpdFitOutcome>)> = columns
            .iter()
            .map(|(asset, values)| fit_asset_tail(asset, values, tail))
            .collect();

        let mut by_asset: BTreeMap<String, (RiskRecord, Option<GpdFitOutcome>)> = columns
            .iter()
            .map(|(asset, _)| (*asset).clone())
            .zip(fitted)
            .collect();

        let mut risk_summary = RiskSummary::new();
        let mut tail_fits = BTreeMap::new();
        for asset in panel.assets() {
            match by_asset.remove(asset) {
                Some((record, outcome)) => {
                    risk_summary.push(record);
                    if let Some(outcome) = outcome {
                        tail_fits.insert(asset.clone(), outcome);
                    }
                }
                // skipped in the volatility stage: row with no measures
                None => risk_summary.push(RiskRecord::undefined(asset)),
            }
        }

        Ok(RiskAnalysisReport {
            fit_summaries: extraction.fit_summaries,
            residuals: extraction.residuals,
            risk_summary,
            tail_fits,
            skipped: extraction.skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VolatilityFamily;
    use crate::generators::{simulate_garch, GarchProcess};
    use crate::series::ReturnSeries;

    fn garch_series(n: usize, seed: u64) -> ReturnSeries {
        let values = simulate_garch(
            &GarchProcess {
                mu: 0.0,
                omega: 0.1,
                alpha: 0.1,
                gamma: 0.0,
                beta: 0.8,
            },
            n,
            seed,
        );
        ReturnSeries::from_values(values).unwrap()
    }

    #[test]
    fn transform_folds_both_tails_for_absolute_side() {
        let values = vec![-2.0, 1.0, -0.5];
        assert_eq!(
            transform_residuals(&values, TailSide::Absolute),
            vec![2.0, 1.0, 0.5]
        );
        assert_eq!(transform_residuals(&values, TailSide::Upper), values);
    }

    #[test]
    fn quantile_threshold_sits_inside_sample_range() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let u = resolve_threshold(&values, ThresholdStrategy::Quantile(0.95));
        assert!(u > 90.0 && u < 99.0);
        let fixed = resolve_threshold(&values, ThresholdStrategy::Fixed(42.0));
        assert_eq!(fixed, 42.0);
    }

    #[test]
    fn every_panel_asset_gets_a_summary_row() {
        let mut panel = ReturnPanel::new();
        panel.insert("GOOD", garch_series(600, 21));
        // too short for the volatility stage
        panel.insert("TINY", ReturnSeries::from_values(vec![0.01; 10]).unwrap());

        let analyzer = TailRiskAnalyzer::new(PipelineConfig::for_family(VolatilityFamily::Garch));
        let report = analyzer.analyze(&panel).unwrap();

        assert_eq!(report.risk_summary.len(), 2);
        let tiny = report.risk_summary.record_for("TINY").unwrap();
        assert!(tiny.var.is_none() && tiny.xi.is_none());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].asset, "TINY");

        let good = report.risk_summary.record_for("GOOD").unwrap();
        assert!(good.threshold.is_some());
        assert!(good.num_exceedances.is_some());

        assert!(report.record_for("GOOD").is_ok());
        assert!(matches!(
            report.record_for("MISSING"),
            Err(crate::errors::RiskAnalysisError::AssetNotFound { .. })
        ));
    }

    #[test]
    fn out_of_range_fixed_threshold_is_partial_not_fatal() {
        let mut panel = ReturnPanel::new();
        panel.insert("A", garch_series(600, 9));

        let mut config = PipelineConfig::for_family(VolatilityFamily::Garch);
        config.tail.threshold = ThresholdStrategy::Fixed(1e9);
        let report = TailRiskAnalyzer::new(config).analyze(&panel).unwrap();

        let row = report.risk_summary.record_for("A").unwrap();
        assert!(row.var.is_none());
        // the volatility stage still succeeded
        assert_eq!(report.fit_summaries.len(), 1);
    }
}
