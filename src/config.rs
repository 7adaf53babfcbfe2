//! Run configuration for the volatility and tail-estimation stages.
//!
//! Every process-wide constant of the analysis (order-search bounds,
//! selection criterion, threshold quantile, confidence level, tail side)
//! is an explicit parameter here rather than a hard-coded convention.

use crate::errors::{validate_parameter, RiskAnalysisError, RiskResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Conditional-variance model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VolatilityFamily {
    /// Symmetric GARCH(p, q)
    Garch,
    /// Exponential GARCH(p, q): log-variance recursion
    Egarch,
    /// GJR-GARCH(p, 1, q): asymmetric response to negative shocks
    GjrGarch,
}

impl VolatilityFamily {
    /// Asymmetry order implied by the family (o = 1 only for GJR-GARCH).
    pub fn asymmetry_order(&self) -> usize {
        match self {
            VolatilityFamily::GjrGarch => 1,
            _ => 0,
        }
    }
}

/// One concrete conditional-variance specification: family plus orders.
///
/// The conditional mean is always a single estimated constant and the
/// innovation distribution is standard normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VolatilitySpec {
    /// Model family
    pub family: VolatilityFamily,
    /// ARCH order (lags of squared shocks), p >= 1
    pub p: usize,
    /// Asymmetry order, 1 for GJR-GARCH and 0 otherwise
    pub o: usize,
    /// GARCH order (lags of conditional variance), q >= 1
    pub q: usize,
}

impl VolatilitySpec {
    /// Build a spec for the given family and (p, q) orders. The asymmetry
    /// order is derived from the family.
    pub fn new(family: VolatilityFamily, p: usize, q: usize) -> RiskResult<Self> {
        if p == 0 {
            return Err(RiskAnalysisError::InvalidParameter {
                parameter: "p".to_string(),
                value: 0.0,
                constraint: ">= 1".to_string(),
            });
        }
        if q == 0 {
            return Err(RiskAnalysisError::InvalidParameter {
                parameter: "q".to_string(),
                value: 0.0,
                constraint: ">= 1".to_string(),
            });
        }
        Ok(Self {
            family,
            p,
            o: family.asymmetry_order(),
            q,
        })
    }

    /// Number of free parameters: constant mean + omega + p ARCH terms
    /// + o asymmetry terms + q GARCH terms.
    pub fn num_parameters(&self) -> usize {
        2 + self.p + self.o + self.q
    }

    /// Order triple (p, o, q) as reported in fit summaries.
    pub fn order(&self) -> (usize, usize, usize) {
        (self.p, self.o, self.q)
    }
}

/// Criterion for scoring competing fits during order selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SelectionCriterion {
    /// Akaike information criterion (minimized)
    Aic,
    /// Bayesian information criterion (minimized)
    Bic,
    /// Raw log-likelihood (maximized)
    LogLikelihood,
}

impl SelectionCriterion {
    /// True when lower scores are better.
    pub fn minimizes(&self) -> bool {
        !matches!(self, SelectionCriterion::LogLikelihood)
    }

    /// Worst possible score, used to initialize the running best.
    pub fn worst_score(&self) -> f64 {
        if self.minimizes() {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        }
    }

    /// True when `candidate` strictly beats `incumbent`.
    pub fn improves(&self, candidate: f64, incumbent: f64) -> bool {
        if self.minimizes() {
            candidate < incumbent
        } else {
            candidate > incumbent
        }
    }
}

/// Configuration for the (p, q) order grid search.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderSearchConfig {
    /// Model family to search within
    pub family: VolatilityFamily,
    /// Inclusive upper bound for p (grid runs 1..=p_max)
    pub p_max: usize,
    /// Inclusive upper bound for q (grid runs 1..=q_max)
    pub q_max: usize,
    /// Information criterion used to rank fits
    pub criterion: SelectionCriterion,
    /// Iteration budget passed to the optimizer for each fit
    pub max_iterations: u64,
}

impl Default for OrderSearchConfig {
    fn default() -> Self {
        Self {
            family: VolatilityFamily::Garch,
            p_max: 3,
            q_max: 3,
            criterion: SelectionCriterion::Aic,
            max_iterations: 5000,
        }
    }
}

impl OrderSearchConfig {
    /// Validate grid bounds.
    pub fn validate(&self) -> RiskResult<()> {
        if self.p_max == 0 || self.q_max == 0 {
            return Err(RiskAnalysisError::InvalidParameter {
                parameter: "p_max/q_max".to_string(),
                value: self.p_max.min(self.q_max) as f64,
                constraint: ">= 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Which tail of the standardized residuals to analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TailSide {
    /// Two-sided risk: analyze |residual| so both large gains and large
    /// losses count as extremes.
    Absolute,
    /// One-sided risk: analyze the signed upper tail as-is.
    Upper,
}

/// How the POT threshold is chosen for each residual series.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ThresholdStrategy {
    /// Empirical quantile of the (possibly transformed) residuals.
    Quantile(f64),
    /// Externally supplied value, validated against the sample range
    /// before any fitting is attempted.
    Fixed(f64),
}

/// Configuration for the EVT stage.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TailConfig {
    /// Signed or absolute residuals
    pub side: TailSide,
    /// Threshold selection strategy
    pub threshold: ThresholdStrategy,
    /// Confidence level for VaR/ES, in (0, 1)
    pub alpha: f64,
    /// Minimum exceedance count for a stable GPD fit
    pub min_exceedances: usize,
    /// Minimum residual count before the tail stage is attempted
    pub min_observations: usize,
    /// Iteration budget for the GPD optimizer
    pub max_iterations: u64,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            side: TailSide::Absolute,
            threshold: ThresholdStrategy::Quantile(0.95),
            alpha: 0.99,
            min_exceedances: 5,
            min_observations: 30,
            max_iterations: 2000,
        }
    }
}

impl TailConfig {
    /// Validate quantile level and confidence level.
    pub fn validate(&self) -> RiskResult<()> {
        if let ThresholdStrategy::Quantile(level) = self.threshold {
            validate_parameter(level, 0.0, 1.0, "quantile_level")?;
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(RiskAnalysisError::InvalidParameter {
                parameter: "alpha".to_string(),
                value: self.alpha,
                constraint: "(0, 1) exclusive".to_string(),
            });
        }
        Ok(())
    }
}

/// Top-level configuration for a full pipeline run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PipelineConfig {
    /// Stage A: order search settings
    pub order_search: OrderSearchConfig,
    /// Minimum observations per asset before a fit is attempted;
    /// shorter series are skipped with a warning, not failed.
    pub min_observations: usize,
    /// Stage B: EVT settings
    pub tail: TailConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::for_family(VolatilityFamily::Garch)
    }
}

impl PipelineConfig {
    /// Default configuration with the given family.
    pub fn for_family(family: VolatilityFamily) -> Self {
        Self {
            order_search: OrderSearchConfig {
                family,
                ..OrderSearchConfig::default()
            },
            min_observations: 50,
            tail: TailConfig::default(),
        }
    }

    /// Validate all nested settings.
    pub fn validate(&self) -> RiskResult<()> {
        self.order_search.validate()?;
        self.tail.validate()
    }
}
