//! Order entity and its derived state machine (component C).
//!
//! Order state is *derived* from which timestamps are set rather than
//! stored as an explicit enum — the same record doubles as an audit
//! log and live state. Every state-querying call site goes through
//! `Order::state()` so the derivation rule lives in exactly one place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    Pending,
    Open,
    Filled,
    Closed,
}

/// A sortable identity embedding its creation timestamp: the
/// nanosecond instant returned by `Clock::now()` at submission.
/// Because `Clock::now()` is strictly increasing, comparing `OrderId`s
/// is a total order consistent with submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(i64);

impl OrderId {
    pub fn from_clock(clock: &mut Clock) -> Self {
        Self(clock.now().timestamp_nanos_opt().unwrap_or(i64::MIN))
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub opened_at: Option<DateTime<Utc>>,
    pub filled_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,

    pub side: Side,
    pub order_type: OrderType,
    pub size: Decimal,
    pub limit_price: Option<Decimal>,
    pub reduce_only: bool,

    pub filled_size: Decimal,
    pub filled_price: Decimal,
}

impl Order {
    pub fn new(
        id: OrderId,
        created_at: DateTime<Utc>,
        side: Side,
        order_type: OrderType,
        size: Decimal,
        limit_price: Option<Decimal>,
    ) -> Self {
        Self {
            id,
            created_at,
            opened_at: None,
            filled_at: None,
            closed_at: None,
            side,
            order_type,
            size,
            limit_price,
            reduce_only: false,
            filled_size: Decimal::ZERO,
            filled_price: Decimal::ZERO,
        }
    }

    /// Derives state from which of {created_at, opened_at, filled_at,
    /// closed_at} are set. `created_at` is always set once the order
    /// exists, so absence of the later three means `Pending`.
    pub fn state(&self) -> OrderState {
        if self.closed_at.is_some() {
            OrderState::Closed
        } else if self.filled_at.is_some() {
            OrderState::Filled
        } else if self.opened_at.is_some() {
            OrderState::Open
        } else {
            OrderState::Pending
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state() == OrderState::Pending
    }

    pub fn is_terminal(&self) -> bool {
        self.state() == OrderState::Closed
    }
}
