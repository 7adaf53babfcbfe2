//! Closed-form tail risk measures from a fitted GPD tail.
//!
//! Both measures come from the peaks-over-threshold identity
//! S(x) = (nu/n) * S_gpd(x - u). Each formula checks its own
//! preconditions and yields `None` when the fitted shape makes the
//! measure undefined, so a report can show the gap instead of a
//! fabricated number.

use crate::errors::{RiskAnalysisError, RiskResult};
use crate::gpd::GpdFit;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Value-at-Risk at level `alpha` from a fitted tail:
///
/// VaR_α = u + (β/ξ) * [ ((n/nu) * (1 - α))^(-ξ) - 1 ]
///
/// Undefined (`None`) when there are no exceedances, when α is not in
/// (0, 1), or when ξ = 0 (the formula divides by the shape).
pub fn value_at_risk(fit: &GpdFit, alpha: f64) -> Option<f64> {
    if fit.n_exceedances == 0 || !(0.0 < alpha && alpha < 1.0) {
        return None;
    }
    let xi = fit.params.xi;
    if xi == 0.0 {
        return None;
    }
    let beta = fit.params.beta;
    let ratio = fit.n_total as f64 / fit.n_exceedances as f64;
    let var = fit.threshold + (beta / xi) * ((ratio * (1.0 - alpha)).powf(-xi) - 1.0);
    var.is_finite().then_some(var)
}

/// Expected Shortfall at level `alpha`:
///
/// ES_α = (VaR_α + β - ξ*u) / (1 - ξ)
///
/// Requires a defined VaR and ξ < 1; at ξ >= 1 the fitted tail has an
/// infinite mean and the measure does not exist.
pub fn expected_shortfall(fit: &GpdFit, alpha: f64) -> Option<f64> {
    let xi = fit.params.xi;
    if xi >= 1.0 {
        return None;
    }
    let var = value_at_risk(fit, alpha)?;
    let es = (var + fit.params.beta - xi * fit.threshold) / (1.0 - xi);
    es.is_finite().then_some(es)
}

/// [`value_at_risk`] for callers that need the failure reason rather
/// than a gap in a table.
pub fn value_at_risk_checked(fit: &GpdFit, alpha: f64) -> RiskResult<f64> {
    if fit.params.xi == 0.0 {
        return Err(RiskAnalysisError::DegenerateShape {
            xi: 0.0,
            reason: "the VaR closed form divides by the shape".to_string(),
        });
    }
    value_at_risk(fit, alpha).ok_or_else(|| RiskAnalysisError::InvalidParameter {
        parameter: "alpha".to_string(),
        value: alpha,
        constraint: "(0, 1) exclusive, with at least one exceedance".to_string(),
    })
}

/// [`expected_shortfall`] with the undefined cases surfaced as errors.
pub fn expected_shortfall_checked(fit: &GpdFit, alpha: f64) -> RiskResult<f64> {
    if fit.params.xi >= 1.0 {
        return Err(RiskAnalysisError::DegenerateShape {
            xi: fit.params.xi,
            reason: "the fitted tail has an infinite mean".to_string(),
        });
    }
    let var = value_at_risk_checked(fit, alpha)?;
    Ok((var + fit.params.beta - fit.params.xi * fit.threshold) / (1.0 - fit.params.xi))
}

/// One row of the final risk table. Every measure that could not be
/// produced for this asset is `None`; the row itself is always present.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RiskRecord {
    /// Asset identifier
    pub asset: String,
    /// Threshold used for the exceedance extraction
    pub threshold: Option<f64>,
    /// Fitted GPD shape
    pub xi: Option<f64>,
    /// Fitted GPD scale
    pub beta: Option<f64>,
    /// Value-at-Risk at the configured level
    pub var: Option<f64>,
    /// Expected Shortfall at the configured level
    pub es: Option<f64>,
    /// Number of exceedances used in the fit
    pub num_exceedances: Option<usize>,
}

impl RiskRecord {
    /// A row for an asset whose tail could not be estimated at all.
    pub fn undefined(asset: &str) -> Self {
        RiskRecord {
            asset: asset.to_string(),
            threshold: None,
            xi: None,
            beta: None,
            var: None,
            es: None,
            num_exceedances: None,
        }
    }

    /// Build a row from a successful fit at level `alpha`. VaR and ES
    /// may still be individually undefined.
    pub fn from_fit(asset: &str, fit: &GpdFit, alpha: f64) -> Self {
        RiskRecord {
            asset: asset.to_string(),
            threshold: Some(fit.threshold),
            xi: Some(fit.params.xi),
            beta: Some(fit.params.beta),
            var: value_at_risk(fit, alpha),
            es: expected_shortfall(fit, alpha),
            num_exceedances: Some(fit.n_exceedances),
        }
    }
}
