//! Exhaustive (p, q) order selection for one return series.
//!
//! Every grid cell is fit independently and scored by the configured
//! criterion. Cells whose optimizer fails to converge are skipped without
//! aborting the search, but the failure is recorded in the result so
//! callers and tests can observe exactly which combinations were tried.
//! Ties keep the first-found order; the grid iterates p outer, q inner,
//! both ascending, and the parallel path reduces in that same order so the
//! tie-break is identical under both features.

use crate::config::{OrderSearchConfig, VolatilitySpec};
use crate::errors::RiskResult;
use crate::volatility::{fit_volatility_model, ModelFit};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Outcome of one evaluated grid cell.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrderScore {
    /// The fit converged and was scored.
    Scored {
        /// Criterion value for this cell
        score: f64,
    },
    /// The optimizer did not converge for this cell; the search went on.
    Failed {
        /// Human-readable failure reason
        reason: String,
    },
}

/// One grid cell of the order search, with its outcome.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EvaluatedOrder {
    /// Order triple (p, o, q) of the cell
    pub order: (usize, usize, usize),
    /// Score or recorded failure
    pub outcome: OrderScore,
}

/// Result of an exhaustive order search.
#[derive(Debug)]
pub struct OrderSearchResult {
    /// Best fit found, None when every combination failed to converge
    pub best: Option<ModelFit>,
    /// Criterion value of the best fit
    pub best_score: Option<f64>,
    /// Every evaluated cell in grid order (p outer, q inner, ascending)
    pub evaluated: Vec<EvaluatedOrder>,
}

impl OrderSearchResult {
    /// Order triple of the best fit, if any combination converged.
    pub fn best_order(&self) -> Option<(usize, usize, usize)> {
        self.best.as_ref().map(|fit| fit.spec.order())
    }
}

fn criterion_score(config: &OrderSearchConfig, fit: &ModelFit) -> f64 {
    use crate::config::SelectionCriterion::*;
    match config.criterion {
        Aic => fit.aic,
        Bic => fit.bic,
        LogLikelihood => fit.log_likelihood,
    }
}

fn fit_cell(
    returns: &[f64],
    config: &OrderSearchConfig,
    p: usize,
    q: usize,
) -> (VolatilitySpec, Result<ModelFit, String>) {
    // Spec construction only fails for zero orders, which the grid never
    // produces; surface any other failure as a non-converged cell.
    match VolatilitySpec::new(config.family, p, q) {
        Ok(spec) => {
            let fit = fit_volatility_model(returns, &spec, config.max_iterations)
                .map_err(|e| e.to_string());
            (spec, fit)
        }
        Err(e) => (
            VolatilitySpec {
                family: config.family,
                p,
                o: config.family.asymmetry_order(),
                q,
            },
            Err(e.to_string()),
        ),
    }
}

/// Evaluate every grid cell, in grid order. Each cell is independent, so
/// the parallel path fans the cells out to a worker pool and merges by
/// index.
fn evaluate_grid(
    returns: &[f64],
    config: &OrderSearchConfig,
) -> Vec<(VolatilitySpec, Result<ModelFit, String>)> {
    let cells: Vec<(usize, usize)> = (1..=config.p_max)
        .flat_map(|p| (1..=config.q_max).map(move |q| (p, q)))
        .collect();

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        cells
            .par_iter()
            .map(|&(p, q)| fit_cell(returns, config, p, q))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        cells
            .iter()
            .map(|&(p, q)| fit_cell(returns, config, p, q))
            .collect()
    }
}

/// Exhaustive grid search over (p, q) orders for one series.
///
/// Returns the best-scoring converged fit together with the outcome of
/// every evaluated cell. `best` is `None` when no combination converged;
/// that is an observable per-asset condition, not an error.
pub fn select_best_order(
    returns: &[f64],
    config: &OrderSearchConfig,
) -> RiskResult<OrderSearchResult> {
    config.validate()?;

    let outcomes = evaluate_grid(returns, config);

    let mut best: Option<ModelFit> = None;
    let mut best_score = config.criterion.worst_score();
    let mut evaluated = Vec::with_capacity(outcomes.len());

    // Sequential reduction in grid order keeps the first-found tie rule.
    for (spec, outcome) in outcomes {
        match outcome {
            Ok(fit) => {
                let score = criterion_score(config, &fit);
                evaluated.push(EvaluatedOrder {
                    order: spec.order(),
                    outcome: OrderScore::Scored { score },
                });
                if config.criterion.improves(score, best_score) {
                    best_score = score;
                    best = Some(fit);
                }
            }
            Err(reason) => {
                log::debug!(
                    "order {:?} skipped: {}",
                    spec.order(),
                    reason
                );
                evaluated.push(EvaluatedOrder {
                    order: spec.order(),
                    outcome: OrderScore::Failed { reason },
                });
            }
        }
    }

    let best_score = best.as_ref().map(|_| best_score);
    Ok(OrderSearchResult {
        best,
        best_score,
        evaluated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SelectionCriterion, VolatilityFamily};
    use crate::generators::{simulate_garch, GarchProcess};

    fn search_config(criterion: SelectionCriterion) -> OrderSearchConfig {
        OrderSearchConfig {
            family: VolatilityFamily::Garch,
            p_max: 2,
            q_max: 2,
            criterion,
            max_iterations: 3000,
        }
    }

    fn test_returns() -> Vec<f64> {
        simulate_garch(
            &GarchProcess {
                mu: 0.0,
                omega: 0.1,
                alpha: 0.1,
                gamma: 0.0,
                beta: 0.8,
            },
            500,
            41,
        )
    }

    #[test]
    fn best_order_stays_inside_requested_grid() {
        let returns = test_returns();
        let config = search_config(SelectionCriterion::Aic);
        let result = select_best_order(&returns, &config).unwrap();

        let (p, o, q) = result.best_order().expect("at least one cell converges");
        assert!(p >= 1 && p <= config.p_max);
        assert!(q >= 1 && q <= config.q_max);
        assert_eq!(o, 0);
        assert_eq!(result.evaluated.len(), 4);
    }

    #[test]
    fn best_score_dominates_every_evaluated_score() {
        let returns = test_returns();
        for criterion in [
            SelectionCriterion::Aic,
            SelectionCriterion::Bic,
            SelectionCriterion::LogLikelihood,
        ] {
            let config = search_config(criterion);
            let result = select_best_order(&returns, &config).unwrap();
            let best_score = result.best_score.expect("some cell converges");

            for cell in &result.evaluated {
                if let OrderScore::Scored { score } = cell.outcome {
                    if criterion.minimizes() {
                        assert!(best_score <= score, "{:?}: {} > {}", criterion, best_score, score);
                    } else {
                        assert!(best_score >= score, "{:?}: {} < {}", criterion, best_score, score);
                    }
                }
            }
        }
    }

    #[test]
    fn grid_iterates_p_outer_q_inner() {
        let returns = test_returns();
        let config = search_config(SelectionCriterion::Aic);
        let result = select_best_order(&returns, &config).unwrap();
        let orders: Vec<(usize, usize, usize)> =
            result.evaluated.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![(1, 0, 1), (1, 0, 2), (2, 0, 1), (2, 0, 2)]);
    }

    #[test]
    fn failed_cells_are_recorded_not_fatal() {
        // Three observations cannot support any cell of the grid: every
        // fit fails, the search itself still succeeds with an empty best.
        let short = vec![0.01, -0.02, 0.005];
        let config = search_config(SelectionCriterion::Aic);
        let result = select_best_order(&short, &config).unwrap();
        assert!(result.best.is_none());
        assert!(result
            .evaluated
            .iter()
            .all(|c| matches!(c.outcome, OrderScore::Failed { .. })));
    }

    #[test]
    fn gjr_search_reports_asymmetry_order() {
        let returns = test_returns();
        let config = OrderSearchConfig {
            family: VolatilityFamily::GjrGarch,
            p_max: 1,
            q_max: 1,
            criterion: SelectionCriterion::Bic,
            max_iterations: 3000,
        };
        let result = select_best_order(&returns, &config).unwrap();
        assert_eq!(result.best_order(), Some((1, 1, 1)));
    }
}
