//! Trade-level analytics (component F): aggregates a sample's closed
//! round-turns into the scalar statistics used to rank and compare
//! parameter trials.

use rust_decimal::prelude::ToPrimitive;

use super::stats::{kelly_criterion, optimal_f, prr};
use crate::position::RoundTurn;

#[derive(Debug, Clone)]
pub struct TradeReport {
    pub round_turn_count: usize,
    pub trade_count: u32,
    pub total_net_profit: f64,
    pub avg_net_profit: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub profit_factor: f64,
    pub prr: f64,
    pub percent_profitable: f64,
    pub max_profit: f64,
    pub max_loss: f64,
    pub avg_profit: f64,
    pub avg_loss: f64,
    pub max_loss_streak: u32,
    pub kelly: f64,
    pub optimal_f: f64,
    pub total_time_in_market_sec: i64,
    pub avg_hold_sec: i64,
    /// Size of the sample `round_turns` was drawn from (bar count),
    /// supplied by the caller — not a figure derivable from the round
    /// turns themselves.
    pub stat_n: usize,
    winning_count: u32,
    winning_pct: f64,
    losing_count: u32,
    losing_pct: f64,
    pub round_turns: Vec<RoundTurn>,
}

impl TradeReport {
    pub fn new(round_turns: &[RoundTurn], stat_n: usize) -> Self {
        if round_turns.is_empty() {
            return Self {
                round_turn_count: 0,
                trade_count: 0,
                total_net_profit: 0.0,
                avg_net_profit: 0.0,
                gross_profit: 0.0,
                gross_loss: 0.0,
                profit_factor: 0.0,
                prr: 0.0,
                percent_profitable: 0.0,
                max_profit: 0.0,
                max_loss: 0.0,
                avg_profit: 0.0,
                avg_loss: 0.0,
                max_loss_streak: 0,
                kelly: 0.0,
                optimal_f: 0.0,
                total_time_in_market_sec: 0,
                avg_hold_sec: 0,
                stat_n,
                winning_count: 0,
                winning_pct: 0.0,
                losing_count: 0,
                losing_pct: 0.0,
                round_turns: Vec::new(),
            };
        }

        let profits: Vec<f64> = round_turns
            .iter()
            .map(|rt| rt.profit.to_f64().unwrap_or(0.0))
            .collect();

        let round_turn_count = round_turns.len();
        let trade_count: u32 = round_turns.iter().map(|rt| rt.trade_count).sum();
        let total_net_profit: f64 = profits.iter().sum();
        let avg_net_profit = total_net_profit / round_turn_count as f64;

        let wins: Vec<f64> = profits.iter().copied().filter(|&p| p > 0.0).collect();
        let losses: Vec<f64> = profits.iter().copied().filter(|&p| p < 0.0).map(f64::abs).collect();

        let gross_profit: f64 = wins.iter().sum();
        let gross_loss: f64 = losses.iter().sum();
        let profit_factor = if gross_loss == 0.0 { gross_profit } else { gross_profit / gross_loss };

        let winning_count = wins.len() as u32;
        let losing_count = losses.len() as u32;
        let percent_profitable = winning_count as f64 / round_turn_count as f64;
        let winning_pct = percent_profitable;
        let losing_pct = losing_count as f64 / round_turn_count as f64;

        let max_profit = wins.iter().cloned().fold(0.0, f64::max);
        let max_loss = losses.iter().cloned().fold(0.0, f64::max);
        let avg_profit = if wins.is_empty() { 0.0 } else { gross_profit / wins.len() as f64 };
        let avg_loss = if losses.is_empty() { 0.0 } else { gross_loss / losses.len() as f64 };

        let mut max_loss_streak = 0;
        let mut streak = 0;
        for &p in &profits {
            if p < 0.0 {
                streak += 1;
                max_loss_streak = max_loss_streak.max(streak);
            } else {
                streak = 0;
            }
        }

        let kelly = kelly_criterion(profit_factor, percent_profitable);
        let opt_f = optimal_f(&profits);
        let prr_value = prr(winning_count, losing_count, avg_profit, avg_loss);

        let total_time_in_market_sec: i64 = round_turns.iter().map(|rt| rt.hold_period.num_seconds()).sum();
        let avg_hold_sec = total_time_in_market_sec / round_turn_count as i64;

        Self {
            round_turn_count,
            trade_count,
            total_net_profit,
            avg_net_profit,
            gross_profit,
            gross_loss,
            profit_factor,
            prr: prr_value,
            percent_profitable,
            max_profit,
            max_loss,
            avg_profit,
            avg_loss,
            max_loss_streak,
            kelly,
            optimal_f: opt_f,
            total_time_in_market_sec,
            avg_hold_sec,
            stat_n,
            winning_count,
            winning_pct,
            losing_count,
            losing_pct,
            round_turns: round_turns.to_vec(),
        }
    }

    pub fn winning_count(&self) -> u32 {
        self.winning_count
    }

    pub fn winning_pct(&self) -> f64 {
        self.winning_pct
    }

    pub fn losing_count(&self) -> u32 {
        self.losing_count
    }

    pub fn losing_pct(&self) -> f64 {
        self.losing_pct
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Side;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn rt(side: Side, profit: rust_decimal::Decimal, hold_hours: i64, trade_count: u32) -> RoundTurn {
        RoundTurn {
            side,
            entry_price: rust_decimal::Decimal::ZERO,
            exit_price: rust_decimal::Decimal::ZERO,
            size: rust_decimal::Decimal::ZERO,
            profit,
            hold_period: Duration::hours(hold_hours),
            trade_count,
        }
    }

    fn fixture() -> Vec<RoundTurn> {
        vec![
            rt(Side::Buy, dec!(-10), 96, 2),
            rt(Side::Buy, dec!(-20), 24, 4),
            rt(Side::Sell, dec!(100), 192, 1),
            rt(Side::Sell, dec!(10), 48, 1),
        ]
    }

    #[test]
    fn trade_report_matches_reference_fixture() {
        let report = TradeReport::new(&fixture(), 120);

        assert_eq!(report.round_turn_count, 4);
        assert_eq!(report.trade_count, 8);
        assert_eq!(report.total_net_profit, 80.0);
        assert_eq!(report.avg_net_profit, 20.0);
        assert_eq!(report.gross_profit, 110.0);
        assert_eq!(report.gross_loss, 30.0);
        assert!((report.profit_factor - 3.6666666666666665).abs() < 1e-9);
        assert!((report.prr - 0.6291005425973029).abs() < 1e-9);
        assert_eq!(report.percent_profitable, 0.5);
        assert_eq!(report.max_profit, 100.0);
        assert_eq!(report.max_loss, 20.0);
        assert_eq!(report.avg_profit, 55.0);
        assert_eq!(report.avg_loss, 15.0);
        assert_eq!(report.max_loss_streak, 2);
        assert!((report.kelly - 0.36363636363636365).abs() < 1e-9);
        assert_eq!(report.total_time_in_market_sec, 1_296_000);
        assert_eq!(report.avg_hold_sec, 324_000);
        assert_eq!(report.winning_count(), 2);
        assert_eq!(report.losing_count(), 2);
        assert_eq!(report.stat_n, 120);
    }

    #[test]
    fn empty_round_turns_report_is_all_zero() {
        let report = TradeReport::new(&[], 0);
        assert_eq!(report.round_turn_count, 0);
        assert_eq!(report.profit_factor, 0.0);
    }
}
