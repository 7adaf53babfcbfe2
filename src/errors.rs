//! Error types and validation functions for the tail-risk pipeline.
//!
//! Per-asset and per-grid-cell failures are deliberately *not* represented
//! here: they are captured as explicit outcome variants at their own
//! boundary (see [`crate::selection`] and [`crate::pipeline`]) so a single
//! misbehaving series never aborts a whole run. The errors below cover
//! structural problems and precondition violations that a caller must see.

use thiserror::Error;

/// Error types for volatility fitting and extreme-value estimation.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum RiskAnalysisError {
    /// Insufficient data for the requested operation.
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData {
        /// Minimum required data points
        required: usize,
        /// Actual number of data points provided
        actual: usize,
    },

    /// Invalid parameter value for a model or pipeline configuration.
    #[error("Invalid parameter: {parameter} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value provided
        value: f64,
        /// Valid range or constraint description
        constraint: String,
    },

    /// The numerical optimizer failed to reach a local maximum within its
    /// iteration budget, or converged to an inadmissible parameter vector.
    #[error("Optimizer did not converge: {reason}")]
    ConvergenceError {
        /// Detailed reason for the failure
        reason: String,
    },

    /// An externally supplied threshold lies outside the sample range.
    #[error("Threshold {threshold} outside sample range [{min}, {max}]")]
    ThresholdOutOfRange {
        /// Rejected threshold
        threshold: f64,
        /// Sample minimum
        min: f64,
        /// Sample maximum
        max: f64,
    },

    /// A GPD shape parameter makes the requested tail measure undefined
    /// (ξ = 0 for the VaR closed form, ξ ≥ 1 for expected shortfall).
    #[error("Degenerate shape parameter xi = {xi}: {reason}")]
    DegenerateShape {
        /// Offending shape estimate
        xi: f64,
        /// Which precondition failed
        reason: String,
    },

    /// The input panel contains no asset series at all. This is the only
    /// failure that aborts a pipeline run.
    #[error("Empty return panel: nothing to analyze")]
    EmptyPanel,

    /// A requested asset does not exist in the panel or result set.
    #[error("Asset not found: {asset}")]
    AssetNotFound {
        /// Asset identifier that was not found
        asset: String,
    },
}

/// Result type for tail-risk operations.
pub type RiskResult<T> = Result<T, RiskAnalysisError>;

/// Validates that a series has sufficient length for an operation.
///
/// # Example
/// ```rust
/// use evt_risk::errors::validate_data_length;
///
/// let data = vec![1.0, 2.0, 3.0];
/// assert!(validate_data_length(&data, 2).is_ok());
/// assert!(validate_data_length(&data, 5).is_err());
/// ```
pub fn validate_data_length(data: &[f64], min_required: usize) -> RiskResult<()> {
    if data.len() < min_required {
        Err(RiskAnalysisError::InsufficientData {
            required: min_required,
            actual: data.len(),
        })
    } else {
        Ok(())
    }
}

/// Validates that a parameter lies within inclusive bounds.
///
/// # Example
/// ```rust
/// use evt_risk::errors::validate_parameter;
///
/// assert!(validate_parameter(0.99, 0.0, 1.0, "alpha").is_ok());
/// assert!(validate_parameter(1.5, 0.0, 1.0, "alpha").is_err());
/// ```
pub fn validate_parameter(value: f64, min: f64, max: f64, name: &str) -> RiskResult<()> {
    if value.is_nan() {
        return Err(RiskAnalysisError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: "must not be NaN".to_string(),
        });
    }

    if value < min || value > max {
        Err(RiskAnalysisError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: format!("[{}, {}]", min, max),
        })
    } else {
        Ok(())
    }
}

/// Validates that all values in a slice are finite.
///
/// Returns on the first non-finite value; market data with NaN gaps must
/// be dropped before a series reaches the fitting stage.
pub fn validate_all_finite(data: &[f64], name: &str) -> RiskResult<()> {
    if let Some((i, &value)) = data.iter().enumerate().find(|(_, &v)| !v.is_finite()) {
        return Err(RiskAnalysisError::InvalidParameter {
            parameter: format!("{}[{}]", name, i),
            value,
            constraint: "all values must be finite".to_string(),
        });
    }
    Ok(())
}
