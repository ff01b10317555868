//! Position and round-turn entities (component C / D).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;
use crate::order::{OrderId, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    Pending,
    Open,
    Closed,
}

/// Identity for a position record, derived the same way as `OrderId`:
/// the id of the order whose fill opened the position.
pub type PositionId = OrderId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: Option<PositionId>,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub side: Side,
    /// Volume-weighted average entry price.
    pub price: Decimal,
    pub size: Decimal,
    pub liquidation_price: Decimal,
    pub profit_and_loss: Decimal,
}

impl Position {
    /// An empty, not-yet-opened position. `side` is a placeholder
    /// until the first fill sets it.
    pub fn pending() -> Self {
        Self {
            id: None,
            opened_at: None,
            closed_at: None,
            side: Side::Buy,
            price: Decimal::ZERO,
            size: Decimal::ZERO,
            liquidation_price: Decimal::ZERO,
            profit_and_loss: Decimal::ZERO,
        }
    }

    pub fn state(&self) -> PositionState {
        if self.closed_at.is_some() {
            PositionState::Closed
        } else if self.opened_at.is_some() {
            PositionState::Open
        } else {
            PositionState::Pending
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == PositionState::Open
    }
}

/// Signed P/L for a fill or liquidation at `exit`, relative to
/// `entry`: `size * (exit - entry)` for Buy, `size * (entry - exit)`
/// for Sell.
pub fn profit(side: Side, entry: Decimal, exit: Decimal, size: Decimal) -> Decimal {
    match side {
        Side::Buy => size * (exit - entry),
        Side::Sell => size * (entry - exit),
    }
}

/// A closed position projected for analysis: the unit of trade-level
/// analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundTurn {
    pub side: Side,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub size: Decimal,
    /// Signed: positive for a winner, negative for a loser.
    pub profit: Decimal,
    pub hold_period: Duration,
    /// Number of fills that composed this round-turn.
    pub trade_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn profit_on_long_winner() {
        assert_eq!(profit(Side::Buy, dec!(10), dec!(20), dec!(2)), dec!(20));
    }

    #[test]
    fn profit_on_short_winner() {
        assert_eq!(profit(Side::Sell, dec!(100), dec!(50), dec!(2)), dec!(100));
    }

    #[test]
    fn profit_on_long_loser() {
        assert_eq!(profit(Side::Buy, dec!(10), dec!(5), dec!(2)), dec!(-10));
    }

    #[test]
    fn profit_on_short_loser() {
        assert_eq!(profit(Side::Sell, dec!(10), dec!(20), dec!(2)), dec!(-20));
    }

    #[test]
    fn pending_position_has_no_state() {
        assert_eq!(Position::pending().state(), PositionState::Pending);
    }
}
