//! Per-trial and per-phase report aggregation (component F/H).

use super::portfolio::PortfolioReport;
use super::tradereport::TradeReport;
use crate::dealer::EquitySeries;
use crate::paramset::{ParamMap, ParamSet};

/// The full report for a single parameter-set trial: trade-level
/// analytics, curve-level analytics, the raw equity curve, and the
/// parameters that produced it.
#[derive(Debug, Clone)]
pub struct PerformanceReport {
    pub trade_report: TradeReport,
    pub portfolio_report: PortfolioReport,
    pub equity_curve: EquitySeries,
    pub properties: ParamMap,
}

/// One side (Training or Validation) of a study: every trial's report
/// plus the arithmetic-mean summary across them. `subject` is the
/// `ParamSet` this phase report belongs to — the invariant the study
/// orchestrator holds is that `subject.id` always equals the key this
/// report is stored under in `Study::training_results` /
/// `Study::validation_results`.
#[derive(Debug, Clone, Default)]
pub struct PhaseReport {
    pub subject: ParamSet,
    pub prr: f64,
    pub mdd: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub calmar: f64,
    pub sample_count: usize,
    pub round_turn_count: u32,
    pub trials: Vec<PerformanceReport>,
}

/// Fills in a `PhaseReport`'s summary fields from its `trials`:
/// arithmetic means of PRR/MDD/CAGR/Sharpe/Calmar, `SampleCount` as
/// the trial count, and `RoundTurnCount` as the sum of each trial's
/// `TradeReport::trade_count` (the fill count, not the round-turn
/// count — trials are ranked by how much trading happened, not how
/// many positions were opened).
pub fn summarize(mut phase: PhaseReport) -> PhaseReport {
    let n = phase.trials.len();
    phase.sample_count = n;
    if n == 0 {
        return phase;
    }

    let n_f = n as f64;
    phase.prr = phase.trials.iter().map(|t| t.trade_report.prr).sum::<f64>() / n_f;
    phase.mdd = phase.trials.iter().map(|t| t.portfolio_report.max_drawdown).sum::<f64>() / n_f;
    phase.cagr = phase.trials.iter().map(|t| t.portfolio_report.cagr).sum::<f64>() / n_f;
    phase.sharpe = phase.trials.iter().map(|t| t.portfolio_report.sharpe).sum::<f64>() / n_f;
    phase.calmar = phase.trials.iter().map(|t| t.portfolio_report.calmar).sum::<f64>() / n_f;
    phase.round_turn_count = phase.trials.iter().map(|t| t.trade_report.trade_count).sum();

    phase
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial(prr: f64, trade_count: u32, mdd: f64, cagr: f64, sharpe: f64, calmar: f64) -> PerformanceReport {
        let mut trade_report = TradeReport::new(&[], 0);
        trade_report.prr = prr;
        trade_report.trade_count = trade_count;
        PerformanceReport {
            trade_report,
            portfolio_report: PortfolioReport {
                max_drawdown: mdd,
                cagr,
                sharpe,
                calmar,
                hist_vol_ann: 0.0,
            },
            equity_curve: EquitySeries::new(),
            properties: ParamMap::new(),
        }
    }

    #[test]
    fn summarize_averages_across_trials() {
        let phase = PhaseReport {
            trials: vec![
                trial(2.0, 5, 0.3, 0.8, 1.0, 2.0),
                trial(4.0, 10, 0.2, 1.5, 2.0, 2.0),
            ],
            ..Default::default()
        };

        let summary = summarize(phase);
        assert_eq!(summary.prr, 3.0);
        assert_eq!(summary.mdd, 0.25);
        assert_eq!(summary.cagr, 1.15);
        assert_eq!(summary.sharpe, 1.5);
        assert_eq!(summary.calmar, 2.0);
        assert_eq!(summary.sample_count, 2);
        assert_eq!(summary.round_turn_count, 15);
    }

    #[test]
    fn summarize_empty_phase_is_zeroed() {
        let summary = summarize(PhaseReport::default());
        assert_eq!(summary.sample_count, 0);
        assert_eq!(summary.prr, 0.0);
    }
}
