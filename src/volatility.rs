//! Conditional-volatility model fitting by Gaussian maximum likelihood.
//!
//! Implements the three supported families with a constant conditional
//! mean and normal innovations:
//!
//! ```text
//! r_t = mu + eps_t,  eps_t = sigma_t * z_t,  z_t ~ N(0, 1)
//!
//! GARCH(p,q)      sigma2_t = omega + sum_i alpha_i eps2_{t-i} + sum_j beta_j sigma2_{t-j}
//! GJR-GARCH(p,1,q) adds     gamma * eps2_{t-1} * 1[eps_{t-1} < 0]
//! EGARCH(p,q)  ln sigma2_t = omega + sum_i alpha_i (|z_{t-i}| - sqrt(2/pi))
//!                                  + sum_j beta_j ln sigma2_{t-j}
//! ```
//!
//! The likelihood is maximized with a derivative-free Nelder-Mead search
//! under a bounded iteration budget; inadmissible parameter vectors are
//! rejected inside the objective with a large finite penalty so the
//! simplex contracts back into the feasible region. Non-convergence is
//! reported as [`RiskAnalysisError::ConvergenceError`], which callers
//! treat as "no result" for that specification.

use crate::config::{VolatilityFamily, VolatilitySpec};
use crate::errors::{validate_all_finite, validate_data_length, RiskAnalysisError, RiskResult};
use crate::math_utils::{mean, sample_variance};
use argmin::core::{CostFunction, Error, Executor, State};
use argmin::solver::neldermead::NelderMead;
use statrs::distribution::{Continuous, Normal};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Finite penalty returned by the objective for inadmissible parameters.
const PENALTY: f64 = 1e12;
/// Variance floor protecting the log-likelihood from degenerate series.
const MIN_VARIANCE: f64 = 1e-12;
/// Cap on |ln sigma2| in the EGARCH recursion before the fit is rejected.
const MAX_LOG_VARIANCE: f64 = 50.0;
/// E|z| for standard normal z, the centering constant of the EGARCH shock.
const ABS_NORMAL_MEAN: f64 = 0.7978845608028654; // sqrt(2/pi)

fn standard_normal() -> Normal {
    Normal::new(0.0, 1.0).expect("standard normal parameters are valid")
}

/// Estimated coefficients of one conditional-variance model.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VolatilityParams {
    /// Constant conditional mean
    pub mu: f64,
    /// Variance intercept (log-variance intercept for EGARCH)
    pub omega: f64,
    /// ARCH coefficients, length p
    pub alpha: Vec<f64>,
    /// Asymmetry coefficients, length o (1 for GJR-GARCH, 0 otherwise)
    pub gamma: Vec<f64>,
    /// GARCH coefficients, length q
    pub beta: Vec<f64>,
}

impl VolatilityParams {
    fn from_theta(spec: &VolatilitySpec, theta: &[f64]) -> Self {
        let (p, o, q) = spec.order();
        Self {
            mu: theta[0],
            omega: theta[1],
            alpha: theta[2..2 + p].to_vec(),
            gamma: theta[2 + p..2 + p + o].to_vec(),
            beta: theta[2 + p + o..2 + p + o + q].to_vec(),
        }
    }

    /// Persistence of the variance recursion. For GARCH and GJR this is
    /// `sum(alpha) + 0.5*sum(gamma) + sum(beta)` and must be below one;
    /// for EGARCH only `sum(beta)` enters.
    pub fn persistence(&self, family: VolatilityFamily) -> f64 {
        match family {
            VolatilityFamily::Egarch => self.beta.iter().sum(),
            _ => {
                self.alpha.iter().sum::<f64>()
                    + 0.5 * self.gamma.iter().sum::<f64>()
                    + self.beta.iter().sum::<f64>()
            }
        }
    }

    fn admissible(&self, family: VolatilityFamily) -> bool {
        match family {
            VolatilityFamily::Egarch => self.persistence(family).abs() < 1.0,
            _ => {
                self.omega > 0.0
                    && self.alpha.iter().all(|&a| a >= 0.0)
                    && self.gamma.iter().all(|&g| g >= 0.0)
                    && self.beta.iter().all(|&b| b >= 0.0)
                    && self.persistence(family) < 1.0
            }
        }
    }
}

/// Result of one successful maximum-likelihood fit. Exists only after the
/// optimizer converged to an admissible parameter vector.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModelFit {
    /// Fitted specification
    pub spec: VolatilitySpec,
    /// Estimated coefficients
    pub params: VolatilityParams,
    /// Maximized Gaussian log-likelihood
    pub log_likelihood: f64,
    /// Akaike information criterion, 2k - 2*logL
    pub aic: f64,
    /// Bayesian information criterion, k*ln(n) - 2*logL
    pub bic: f64,
    /// Conditional standard deviations, one per observation
    pub conditional_sigma: Vec<f64>,
    /// Standardized residuals (r_t - mu) / sigma_t, aligned to the input
    pub std_residuals: Vec<f64>,
}

impl ModelFit {
    /// Number of observations used in the fit.
    pub fn n_obs(&self) -> usize {
        self.std_residuals.len()
    }
}

/// Conditional variance recursion. Returns `None` when the parameter
/// vector is inadmissible or the recursion degenerates, so the objective
/// can penalize the vector without panicking.
fn conditional_variances(
    spec: &VolatilitySpec,
    params: &VolatilityParams,
    returns: &[f64],
    presample_variance: f64,
) -> Option<Vec<f64>> {
    if !params.admissible(spec.family) {
        return None;
    }

    let n = returns.len();
    let (p, o, q) = spec.order();
    let warmup = p.max(q).max(o);
    let eps: Vec<f64> = returns.iter().map(|r| r - params.mu).collect();
    let v0 = presample_variance.max(MIN_VARIANCE);

    let mut sigma2 = vec![0.0; n];

    match spec.family {
        VolatilityFamily::Garch | VolatilityFamily::GjrGarch => {
            for t in 0..n {
                if t < warmup {
                    sigma2[t] = v0;
                    continue;
                }
                let mut acc = params.omega;
                for (i, &a) in params.alpha.iter().enumerate() {
                    acc += a * eps[t - 1 - i] * eps[t - 1 - i];
                }
                for (i, &g) in params.gamma.iter().enumerate() {
                    let shock = eps[t - 1 - i];
                    if shock < 0.0 {
                        acc += g * shock * shock;
                    }
                }
                for (j, &b) in params.beta.iter().enumerate() {
                    acc += b * sigma2[t - 1 - j];
                }
                if !acc.is_finite() || acc <= 0.0 {
                    return None;
                }
                sigma2[t] = acc.max(MIN_VARIANCE);
            }
        }
        VolatilityFamily::Egarch => {
            let mut log_sigma2 = vec![0.0; n];
            let log_v0 = v0.ln();
            for t in 0..n {
                if t < warmup {
                    log_sigma2[t] = log_v0;
                    sigma2[t] = v0;
                    continue;
                }
                let mut acc = params.omega;
                for (i, &a) in params.alpha.iter().enumerate() {
                    let z = eps[t - 1 - i] / sigma2[t - 1 - i].sqrt();
                    acc += a * (z.abs() - ABS_NORMAL_MEAN);
                }
                for (j, &b) in params.beta.iter().enumerate() {
                    acc += b * log_sigma2[t - 1 - j];
                }
                if !acc.is_finite() || acc.abs() > MAX_LOG_VARIANCE {
                    return None;
                }
                log_sigma2[t] = acc;
                sigma2[t] = acc.exp();
            }
        }
    }

    Some(sigma2)
}

/// Gaussian negative log-likelihood of the returns under one parameter
/// vector, or the penalty for inadmissible vectors.
fn negative_log_likelihood(
    spec: &VolatilitySpec,
    theta: &[f64],
    returns: &[f64],
    presample_variance: f64,
) -> f64 {
    let params = VolatilityParams::from_theta(spec, theta);
    let sigma2 = match conditional_variances(spec, &params, returns, presample_variance) {
        Some(s) => s,
        None => return PENALTY,
    };

    let normal = standard_normal();
    let mut nll = 0.0;
    for (t, &r) in returns.iter().enumerate() {
        let sigma = sigma2[t].sqrt();
        let z = (r - params.mu) / sigma;
        nll -= normal.ln_pdf(z) - sigma.ln();
    }
    if nll.is_finite() {
        nll
    } else {
        PENALTY
    }
}

struct VolatilityObjective<'a> {
    spec: VolatilitySpec,
    returns: &'a [f64],
    presample_variance: f64,
}

impl CostFunction for VolatilityObjective<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        Ok(negative_log_likelihood(
            &self.spec,
            theta,
            self.returns,
            self.presample_variance,
        ))
    }
}

/// Starting point in the interior of the admissible region. Persistence
/// mass is split evenly across lags so higher orders start feasible.
fn initial_theta(spec: &VolatilitySpec, mu0: f64, v0: f64) -> Vec<f64> {
    let (p, o, q) = spec.order();
    let mut theta = Vec::with_capacity(spec.num_parameters());
    theta.push(mu0);
    match spec.family {
        VolatilityFamily::Egarch => {
            theta.push(0.1 * v0.ln());
            theta.extend(std::iter::repeat(0.1 / p as f64).take(p));
            theta.extend(std::iter::repeat(0.9 / q as f64).take(q));
        }
        _ => {
            theta.push(0.1 * v0);
            theta.extend(std::iter::repeat(0.05 / p as f64).take(p));
            theta.extend(std::iter::repeat(0.05).take(o));
            theta.extend(std::iter::repeat(0.85 / q as f64).take(q));
        }
    }
    theta
}

/// Initial simplex: the start plus one vertex per coordinate, nudged by a
/// scale-proportional step that keeps GARCH vertices inside the
/// stationarity region.
fn initial_simplex(theta0: &[f64]) -> Vec<Vec<f64>> {
    let mut simplex = vec![theta0.to_vec()];
    for i in 0..theta0.len() {
        let mut vertex = theta0.to_vec();
        vertex[i] += 0.05 * theta0[i].abs() + 1e-3;
        simplex.push(vertex);
    }
    simplex
}

/// Fit one volatility specification to a return series by maximum
/// likelihood.
///
/// Fails with [`RiskAnalysisError::ConvergenceError`] when the optimizer
/// exhausts its budget without an admissible local maximum; callers in the
/// order search treat that as "no result" for the grid cell rather than
/// an abort.
pub fn fit_volatility_model(
    returns: &[f64],
    spec: &VolatilitySpec,
    max_iterations: u64,
) -> RiskResult<ModelFit> {
    validate_data_length(returns, spec.num_parameters() + 2)?;
    validate_all_finite(returns, "returns")?;

    let mu0 = mean(returns);
    let v0 = sample_variance(returns).max(MIN_VARIANCE);
    let theta0 = initial_theta(spec, mu0, v0);

    let objective = VolatilityObjective {
        spec: *spec,
        returns,
        presample_variance: v0,
    };
    let solver = NelderMead::new(initial_simplex(&theta0))
        .with_sd_tolerance(1e-8)
        .map_err(|e| RiskAnalysisError::ConvergenceError {
            reason: format!("solver setup failed: {}", e),
        })?;

    let result = Executor::new(objective, solver)
        .configure(|state| state.max_iters(max_iterations))
        .run()
        .map_err(|e| RiskAnalysisError::ConvergenceError {
            reason: format!("{}", e),
        })?;

    let theta_hat = result
        .state()
        .get_best_param()
        .cloned()
        .ok_or_else(|| RiskAnalysisError::ConvergenceError {
            reason: "optimizer produced no parameter estimate".to_string(),
        })?;
    let nll = result.state().get_best_cost();

    if !nll.is_finite() || nll >= PENALTY {
        return Err(RiskAnalysisError::ConvergenceError {
            reason: "objective stayed at the infeasibility penalty".to_string(),
        });
    }

    let params = VolatilityParams::from_theta(spec, &theta_hat);
    let sigma2 = conditional_variances(spec, &params, returns, v0).ok_or_else(|| {
        RiskAnalysisError::ConvergenceError {
            reason: format!(
                "optimizer returned inadmissible parameters (persistence {:.4})",
                params.persistence(spec.family)
            ),
        }
    })?;

    let conditional_sigma: Vec<f64> = sigma2.iter().map(|s| s.sqrt()).collect();
    let std_residuals: Vec<f64> = returns
        .iter()
        .zip(&conditional_sigma)
        .map(|(r, s)| (r - params.mu) / s)
        .collect();

    let log_likelihood = -nll;
    let k = spec.num_parameters() as f64;
    let n = returns.len() as f64;

    Ok(ModelFit {
        spec: *spec,
        params,
        log_likelihood,
        aic: 2.0 * k - 2.0 * log_likelihood,
        bic: k * n.ln() - 2.0 * log_likelihood,
        conditional_sigma,
        std_residuals,
    })
}
