//! Residual extraction across a multi-asset return panel.
//!
//! Each asset is processed independently: order search, then extraction of
//! the winning model's standardized residuals aligned to the asset's own
//! timestamp range. A failing or too-short asset is skipped with a
//! warning and recorded in the output, never silently dropped and never
//! fatal for the remaining assets. Assets are independent units of work,
//! so the parallel path fans them out to a worker pool and merges the
//! per-asset outputs afterwards.

use crate::config::PipelineConfig;
use crate::errors::{RiskAnalysisError, RiskResult};
use crate::selection::{select_best_order, EvaluatedOrder};
use crate::series::{ResidualMatrix, ResidualSeries, ReturnPanel, ReturnSeries};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fit-summary row for one successfully modeled asset.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitSummary {
    /// Asset identifier
    pub asset: String,
    /// Winning order (p, o, q)
    pub best_order: (usize, usize, usize),
    /// AIC of the winning fit
    pub aic: f64,
    /// BIC of the winning fit
    pub bic: f64,
    /// Log-likelihood of the winning fit
    pub log_likelihood: f64,
    /// Observations used in the fit
    pub n_obs: usize,
}

/// Why an asset produced no residuals.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SkipReason {
    /// Series shorter than the configured minimum observation count.
    TooShort {
        /// Observations available
        available: usize,
        /// Observations required
        required: usize,
    },
    /// Every (p, q) combination failed to converge.
    NoConvergedFit {
        /// Outcome of each evaluated grid cell
        evaluated: Vec<EvaluatedOrder>,
    },
    /// Structural problem with the series itself.
    InvalidSeries {
        /// Error description
        reason: String,
    },
}

/// Record of one asset that was skipped, observable by the caller.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SkippedAsset {
    /// Asset identifier
    pub asset: String,
    /// Why it was skipped
    pub reason: SkipReason,
}

/// Output of the residual-extraction stage. Write-once: populated by
/// [`extract_residuals`] and read-only afterwards.
#[derive(Debug, Default)]
pub struct ResidualExtraction {
    /// Asset -> standardized residuals, timestamp-aligned
    pub residuals: ResidualMatrix,
    /// One summary row per successfully modeled asset, in panel order
    pub fit_summaries: Vec<FitSummary>,
    /// Assets that produced no residuals, with reasons, in panel order
    pub skipped: Vec<SkippedAsset>,
}

enum AssetOutcome {
    Fitted {
        summary: FitSummary,
        residuals: ResidualSeries,
    },
    Skipped(SkipReason),
}

fn process_asset(asset: &str, series: &ReturnSeries, config: &PipelineConfig) -> AssetOutcome {
    if series.len() < config.min_observations {
        log::warn!(
            "asset {}: only {} observations (minimum {}), skipping",
            asset,
            series.len(),
            config.min_observations
        );
        return AssetOutcome::Skipped(SkipReason::TooShort {
            available: series.len(),
            required: config.min_observations,
        });
    }

    let search = match select_best_order(series.values(), &config.order_search) {
        Ok(search) => search,
        Err(e) => {
            log::warn!("asset {}: order search rejected series: {}", asset, e);
            return AssetOutcome::Skipped(SkipReason::InvalidSeries {
                reason: e.to_string(),
            });
        }
    };

    match search.best {
        Some(fit) => {
            let summary = FitSummary {
                asset: asset.to_string(),
                best_order: fit.spec.order(),
                aic: fit.aic,
                bic: fit.bic,
                log_likelihood: fit.log_likelihood,
                n_obs: fit.n_obs(),
            };
            let residuals =
                ResidualSeries::new(series.timestamps().to_vec(), fit.std_residuals);
            AssetOutcome::Fitted { summary, residuals }
        }
        None => {
            log::warn!("asset {}: no (p, q) combination converged", asset);
            AssetOutcome::Skipped(SkipReason::NoConvergedFit {
                evaluated: search.evaluated,
            })
        }
    }
}

/// Run the order search on every asset of the panel and collect the
/// standardized residuals of each winning model.
///
/// Per-asset failures are partial: the failing asset appears in
/// `skipped` and is absent from the matrix and the fit summaries, while
/// the remaining assets proceed. Only an empty panel is fatal.
pub fn extract_residuals(
    panel: &ReturnPanel,
    config: &PipelineConfig,
) -> RiskResult<ResidualExtraction> {
    if panel.is_empty() {
        return Err(RiskAnalysisError::EmptyPanel);
    }
    config.validate()?;

    let assets: Vec<(&String, &ReturnSeries)> = panel.iter().collect();

    #[cfg(feature = "parallel")]
    let outcomes: Vec<AssetOutcome> = {
        use rayon::prelude::*;
        assets
            .par_iter()
            .map(|(asset, series)| process_asset(asset, series, config))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<AssetOutcome> = assets
        .iter()
        .map(|(asset, series)| process_asset(asset, series, config))
        .collect();

    let mut extraction = ResidualExtraction::default();
    for ((asset, _), outcome) in assets.into_iter().zip(outcomes) {
        match outcome {
            AssetOutcome::Fitted { summary, residuals } => {
                extraction.residuals.insert(asset.clone(), residuals);
                extraction.fit_summaries.push(summary);
            }
            AssetOutcome::Skipped(reason) => {
                extraction.skipped.push(SkippedAsset {
                    asset: asset.clone(),
                    reason,
                });
            }
        }
    }

    Ok(extraction)
}
