//! Integration tests for full pipeline scenarios
//!
//! These tests validate end-to-end behavior of the TailRiskAnalyzer
//! across multi-asset panels: order selection, residual extraction,
//! partial failures and the final risk table.

use evt_risk::generators::{simulate_garch, GarchProcess};
use evt_risk::math_utils::{mean, sample_variance};
use evt_risk::{
    PipelineConfig, ReturnPanel, ReturnSeries, RiskAnalysisError, TailRiskAnalyzer,
    VolatilityFamily,
};

fn garch_returns(n: usize, seed: u64) -> Vec<f64> {
    simulate_garch(
        &GarchProcess {
            mu: 0.0,
            omega: 0.05,
            alpha: 0.1,
            gamma: 0.0,
            beta: 0.85,
        },
        n,
        seed,
    )
}

/// Scenario: an analyst runs the default pipeline over a three-asset
/// panel of clean simulated returns. Every asset must produce a fit
/// summary, a residual column and a risk table row.
#[test]
fn test_complete_panel_workflow() {
    let mut panel = ReturnPanel::new();
    for (asset, seed) in [("AAA", 11u64), ("BBB", 12), ("CCC", 13)] {
        panel.insert(asset, ReturnSeries::from_values(garch_returns(800, seed)).unwrap());
    }

    let analyzer = TailRiskAnalyzer::new(PipelineConfig::for_family(VolatilityFamily::Garch));
    let report = analyzer.analyze(&panel).expect("clean panel must analyze");

    assert_eq!(report.fit_summaries.len(), 3);
    assert_eq!(report.residuals.len(), 3);
    assert_eq!(report.risk_summary.len(), 3);
    assert!(report.skipped.is_empty());

    let config = analyzer.config();
    for summary in &report.fit_summaries {
        let (p, _, q) = summary.best_order;
        assert!(
            p >= 1 && p <= config.order_search.p_max,
            "asset {}: p = {} outside grid",
            summary.asset,
            p
        );
        assert!(q >= 1 && q <= config.order_search.q_max);
        assert!(summary.log_likelihood.is_finite());
        assert!(summary.aic.is_finite() && summary.bic.is_finite());
    }
}

/// Standardized residuals of a well-specified model must look roughly
/// like unit-variance white noise.
#[test]
fn test_residuals_are_approximately_standardized() {
    let mut panel = ReturnPanel::new();
    panel.insert("X", ReturnSeries::from_values(garch_returns(2000, 7)).unwrap());

    let analyzer = TailRiskAnalyzer::new(PipelineConfig::for_family(VolatilityFamily::Garch));
    let report = analyzer.analyze(&panel).unwrap();

    let residuals = report.residuals.column("X").expect("column present");
    assert_eq!(residuals.len(), 2000);
    let m = mean(residuals.values());
    let v = sample_variance(residuals.values());
    assert!(m.abs() < 0.1, "residual mean = {}", m);
    assert!((v - 1.0).abs() < 0.25, "residual variance = {}", v);
}

/// One unusable asset must not poison the rest of the panel.
#[test]
fn test_partial_failure_is_observable_not_fatal() {
    let mut panel = ReturnPanel::new();
    panel.insert("GOOD", ReturnSeries::from_values(garch_returns(600, 3)).unwrap());
    panel.insert(
        "SHORT",
        ReturnSeries::from_values(vec![0.01, -0.02, 0.005]).unwrap(),
    );

    let analyzer = TailRiskAnalyzer::new(PipelineConfig::for_family(VolatilityFamily::Garch));
    let report = analyzer.analyze(&panel).unwrap();

    assert_eq!(report.fit_summaries.len(), 1);
    assert_eq!(report.fit_summaries[0].asset, "GOOD");
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].asset, "SHORT");

    // the skipped asset still has a (fully undefined) risk row
    let row = report.risk_summary.record_for("SHORT").unwrap();
    assert!(row.xi.is_none() && row.var.is_none() && row.es.is_none());
    assert_eq!(report.risk_summary.len(), 2);
}

/// An empty panel is the one fatal input.
#[test]
fn test_empty_panel_is_rejected() {
    let analyzer = TailRiskAnalyzer::new(PipelineConfig::default());
    let result = analyzer.analyze(&ReturnPanel::new());
    assert!(matches!(result, Err(RiskAnalysisError::EmptyPanel)));
}

/// Residuals stay aligned to the asset's own timestamps, gaps included.
#[test]
fn test_residual_timestamps_follow_the_input_calendar() {
    // trading-day style calendar with weekend gaps
    let values = garch_returns(400, 19);
    let timestamps: Vec<i64> = (0..400).map(|i| i * 7 / 5 + 100).collect();
    let series = ReturnSeries::new(timestamps.clone(), values).unwrap();

    let mut panel = ReturnPanel::new();
    panel.insert("GAPPED", series);

    let analyzer = TailRiskAnalyzer::new(PipelineConfig::for_family(VolatilityFamily::Garch));
    let report = analyzer.analyze(&panel).unwrap();

    let column = report.residuals.column("GAPPED").unwrap();
    assert_eq!(column.timestamps(), timestamps.as_slice());
}

/// Two runs over the same panel must agree exactly.
#[test]
fn test_analysis_is_deterministic() {
    let mut panel = ReturnPanel::new();
    panel.insert("A", ReturnSeries::from_values(garch_returns(500, 31)).unwrap());
    panel.insert("B", ReturnSeries::from_values(garch_returns(500, 32)).unwrap());

    let analyzer = TailRiskAnalyzer::new(PipelineConfig::for_family(VolatilityFamily::Garch));
    let first = analyzer.analyze(&panel).unwrap();
    let second = analyzer.analyze(&panel).unwrap();

    for (a, b) in first.fit_summaries.iter().zip(&second.fit_summaries) {
        assert_eq!(a.asset, b.asset);
        assert_eq!(a.best_order, b.best_order);
        assert_eq!(a.aic, b.aic);
    }
    for (a, b) in first
        .risk_summary
        .records()
        .iter()
        .zip(second.risk_summary.records())
    {
        assert_eq!(a, b);
    }
}

/// The GJR family reports a nonzero asymmetry order in its summaries.
#[test]
fn test_gjr_family_reports_asymmetry_order() {
    let returns = simulate_garch(
        &GarchProcess {
            mu: 0.0,
            omega: 0.05,
            alpha: 0.05,
            gamma: 0.1,
            beta: 0.8,
        },
        800,
        77,
    );
    let mut panel = ReturnPanel::new();
    panel.insert("GJR", ReturnSeries::from_values(returns).unwrap());

    let analyzer = TailRiskAnalyzer::new(PipelineConfig::for_family(VolatilityFamily::GjrGarch));
    let report = analyzer.analyze(&panel).unwrap();
    let (_, o, _) = report.fit_summaries[0].best_order;
    assert_eq!(o, 1);
}
