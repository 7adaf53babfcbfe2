//! Empirical mean-excess function over a grid of candidate thresholds.
//!
//! The mean excess e(u) = E[X - u | X > u] computed on a residual series
//! supports threshold choice for the peaks-over-threshold stage: a
//! roughly linear region of the plot signals a Generalized-Pareto
//! compatible tail. Whether the input is signed or absolute residuals is
//! the caller's choice (see [`crate::config::TailSide`]).

use crate::errors::{validate_data_length, validate_parameter, RiskAnalysisError, RiskResult};
use crate::math_utils::{float_total_cmp, quantile_of_sorted};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default lower percentile of the threshold window.
pub const DEFAULT_P_LOW: f64 = 0.95;
/// Default upper percentile of the threshold window.
pub const DEFAULT_P_HIGH: f64 = 0.995;
/// Default number of grid points.
pub const DEFAULT_GRID_SIZE: usize = 100;

/// Parallel threshold / mean-excess sequences. A `None` mean excess marks
/// a grid point with no exceedances, reported instead of an error so the
/// upper end of the grid stays inspectable.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeanExcessFunction {
    /// Candidate thresholds, equally spaced and ascending
    pub thresholds: Vec<f64>,
    /// e(u) per threshold, None where no observation exceeds u
    pub mean_excesses: Vec<Option<f64>>,
}

impl MeanExcessFunction {
    /// (threshold, e(u)) pairs for the grid points where e(u) is defined.
    pub fn defined_points(&self) -> Vec<(f64, f64)> {
        self.thresholds
            .iter()
            .zip(&self.mean_excesses)
            .filter_map(|(&u, e)| e.map(|e| (u, e)))
            .collect()
    }
}

/// Mean excess over all observations strictly above `u`, or `None` when
/// nothing exceeds `u`.
pub fn mean_excess_at(series: &[f64], u: f64) -> Option<f64> {
    let mut count = 0usize;
    let mut sum = 0.0;
    for &x in series {
        if x > u {
            sum += x - u;
            count += 1;
        }
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Compute the empirical mean-excess function on `grid_size` equally
/// spaced thresholds between the `p_low` and `p_high` empirical
/// percentiles of the series (fractions in [0, 1], `p_low < p_high`).
pub fn mean_excess_function(
    series: &[f64],
    p_low: f64,
    p_high: f64,
    grid_size: usize,
) -> RiskResult<MeanExcessFunction> {
    validate_data_length(series, 2)?;
    validate_parameter(p_low, 0.0, 1.0, "p_low")?;
    validate_parameter(p_high, 0.0, 1.0, "p_high")?;
    if p_low >= p_high {
        return Err(RiskAnalysisError::InvalidParameter {
            parameter: "p_low".to_string(),
            value: p_low,
            constraint: format!("< p_high ({})", p_high),
        });
    }
    if grid_size < 2 {
        return Err(RiskAnalysisError::InvalidParameter {
            parameter: "grid_size".to_string(),
            value: grid_size as f64,
            constraint: ">= 2".to_string(),
        });
    }

    let mut sorted = series.to_vec();
    sorted.sort_by(float_total_cmp);
    let lo = quantile_of_sorted(&sorted, p_low);
    let hi = quantile_of_sorted(&sorted, p_high);

    let step = (hi - lo) / (grid_size - 1) as f64;
    let thresholds: Vec<f64> = (0..grid_size).map(|i| lo + step * i as f64).collect();
    let mean_excesses = thresholds
        .iter()
        .map(|&u| mean_excess_at(series, u))
        .collect();

    Ok(MeanExcessFunction {
        thresholds,
        mean_excesses,
    })
}

/// [`mean_excess_function`] over the default window: 100 thresholds
/// between the 95th and 99.5th percentiles.
pub fn default_mean_excess_function(series: &[f64]) -> RiskResult<MeanExcessFunction> {
    mean_excess_function(series, DEFAULT_P_LOW, DEFAULT_P_HIGH, DEFAULT_GRID_SIZE)
}
