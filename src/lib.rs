//! # EVT Tail Risk Analysis
//!
//! Two-stage tail risk estimation for multi-asset return panels.
//!
//! Stage A fits a conditional-volatility model (GARCH, EGARCH or
//! GJR-GARCH with a constant mean and Gaussian innovations) to each
//! asset, selecting the (p, q) orders by information criterion over a
//! bounded grid, and extracts the winning model's standardized
//! residuals. Stage B applies extreme value theory to those residuals:
//! exceedances over a quantile (or fixed) threshold are fit with a
//! generalized Pareto distribution, from which Value-at-Risk and
//! Expected Shortfall follow in closed form.
//!
//! Per-asset failures are partial by design: a series too short to fit,
//! a grid with no converged cell, or a tail too thin for a stable GPD
//! estimate each produce an observable skip record or an undefined row
//! in the risk table, never an aborted run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use evt_risk::{PipelineConfig, ReturnPanel, ReturnSeries, TailRiskAnalyzer, VolatilityFamily};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut panel = ReturnPanel::new();
//!     let returns: Vec<f64> = load_returns();
//!     panel.insert("ASSET", ReturnSeries::from_values(returns)?);
//!
//!     let analyzer = TailRiskAnalyzer::new(PipelineConfig::for_family(VolatilityFamily::Garch));
//!     let report = analyzer.analyze(&panel)?;
//!
//!     for summary in &report.fit_summaries {
//!         println!("{}: best order {:?}, AIC = {:.2}", summary.asset, summary.best_order, summary.aic);
//!     }
//!     print!("{}", report.risk_summary);
//!     Ok(())
//! }
//!
//! fn load_returns() -> Vec<f64> {
//!     unimplemented!("read returns from your data source")
//! }
//! ```
//!
//! ## Architecture
//!
//! The crate is organized around the [`TailRiskAnalyzer`] which runs
//! both stages over a panel. Each stage is also usable on its own:
//! [`pipeline::extract_residuals`] for the volatility stage,
//! [`gpd::estimate_tail`] plus [`tail_risk`] for the EVT stage, and
//! [`mean_excess`] for threshold diagnostics.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod analyzer;
pub mod config;
pub mod errors;
pub mod math_utils;
pub mod series;

// Stage A: conditional volatility
pub mod pipeline;
pub mod selection;
pub mod volatility;

// Stage B: extreme value theory
pub mod gpd;
pub mod mean_excess;
pub mod summary;
pub mod tail_risk;

// Supporting modules
pub mod descriptive;
pub mod generators;

// Re-exports for convenience - main public API
pub use analyzer::{RiskAnalysisReport, TailRiskAnalyzer};
pub use config::{
    OrderSearchConfig, PipelineConfig, SelectionCriterion, TailConfig, TailSide,
    ThresholdStrategy, VolatilityFamily, VolatilitySpec,
};
pub use errors::{RiskAnalysisError, RiskResult};
pub use series::{
    ResidualMatrix, ResidualRow, ResidualSeries, ReturnPanel, ReturnSeries, Timestamp,
};

// Stage A exports
pub use pipeline::{extract_residuals, FitSummary, ResidualExtraction, SkipReason, SkippedAsset};
pub use selection::{select_best_order, EvaluatedOrder, OrderScore, OrderSearchResult};
pub use volatility::{fit_volatility_model, ModelFit, VolatilityParams};

// Stage B exports
pub use gpd::{
    empirical_survival, estimate_tail, exceedances, gpd_survival, validate_threshold, GpdFit,
    GpdFitOutcome, GpdParams,
};
pub use mean_excess::{
    default_mean_excess_function, mean_excess_at, mean_excess_function, MeanExcessFunction,
};
pub use summary::RiskSummary;
pub use tail_risk::{
    expected_shortfall, expected_shortfall_checked, value_at_risk, value_at_risk_checked,
    RiskRecord,
};

// Descriptive statistics exports
pub use descriptive::{describe_panel, log_returns, DescriptiveStats};
