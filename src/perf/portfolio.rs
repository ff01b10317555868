//! Equity-curve-level analytics (component F).

use rust_decimal::prelude::ToPrimitive;

use super::drawdown::{drawdowns, max_drawdown};
use super::stats::{cagr, hist_vol_ann, sharpe_ratio, SHARPE_DEFAULT_ANNUAL_RISK_FREE_RATE};
use crate::dealer::EquitySeries;

#[derive(Debug, Clone, Copy, Default)]
pub struct PortfolioReport {
    pub max_drawdown: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub calmar: f64,
    pub hist_vol_ann: f64,
}

impl PortfolioReport {
    /// Builds a report from a sparse equity curve. Returns the
    /// zero-valued report for a curve with fewer than two points —
    /// there is nothing to annualize or draw down from.
    pub fn new(equity: &EquitySeries) -> Self {
        if equity.len() < 2 {
            return Self::default();
        }

        let points: Vec<(chrono::DateTime<chrono::Utc>, f64)> = equity
            .iter()
            .map(|(t, v)| (*t, v.to_f64().unwrap_or(0.0)))
            .collect();

        let returns: Vec<f64> = points
            .windows(2)
            .map(|w| {
                let (_, prev) = w[0];
                let (_, cur) = w[1];
                if prev == 0.0 {
                    0.0
                } else {
                    (cur - prev) / prev
                }
            })
            .collect();

        let first = points.first().expect("len >= 2");
        let last = points.last().expect("len >= 2");
        let days = (last.0 - first.0).num_days().max(1);
        let cagr_value = cagr(first.1, last.1, days);

        let dds = drawdowns(equity);
        let mdd = max_drawdown(&dds).pct;

        let sharpe = sharpe_ratio(&returns, SHARPE_DEFAULT_ANNUAL_RISK_FREE_RATE);
        let calmar = if mdd == 0.0 { 0.0 } else { cagr_value / mdd };

        Self {
            max_drawdown: mdd,
            cagr: cagr_value,
            sharpe,
            calmar,
            hist_vol_ann: hist_vol_ann(&returns),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use rust_decimal_macros::dec;

    fn series(points: &[(i64, rust_decimal::Decimal)]) -> EquitySeries {
        points
            .iter()
            .map(|(d, v)| (DateTime::<Utc>::UNIX_EPOCH + Duration::days(*d), *v))
            .collect()
    }

    #[test]
    fn empty_or_single_point_curve_is_zero_report() {
        assert_eq!(PortfolioReport::new(&EquitySeries::new()).cagr, 0.0);
        let one = series(&[(0, dec!(1000))]);
        assert_eq!(PortfolioReport::new(&one).sharpe, 0.0);
    }

    #[test]
    fn growing_curve_has_positive_cagr_and_no_drawdown() {
        let curve = series(&[(0, dec!(1000)), (30, dec!(1100)), (60, dec!(1300))]);
        let report = PortfolioReport::new(&curve);
        assert!(report.cagr > 0.0);
        assert_eq!(report.max_drawdown, 0.0);
        assert_eq!(report.calmar, 0.0);
    }

    #[test]
    fn curve_with_drawdown_has_nonzero_calmar() {
        let curve = series(&[(0, dec!(1000)), (30, dec!(800)), (60, dec!(1200))]);
        let report = PortfolioReport::new(&curve);
        assert!(report.max_drawdown > 0.0);
        assert!(report.calmar != 0.0);
    }
}
