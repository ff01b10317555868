//! Simulated dealer / matching engine (component D).
//!
//! A deterministic in-process broker: accepts orders, matches them
//! against incoming bars, maintains a single running position, and
//! samples equity after every bar. Dealer, strategy and analytics are
//! strictly single-threaded and hold no shared state — a fresh
//! `Dealer` is built per study-orchestrator job (§5).

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::decimal::Decimal;
use crate::error::CoreError;
use crate::kline::{close_time, Kline};
use crate::order::{Order, OrderId, OrderState, OrderType, Side};
use crate::position::{profit, Position, PositionState, RoundTurn};

/// Sparse mapping from instant to account equity. Keys are strictly
/// increasing when iterated; `BTreeMap` gives us that for free instead
/// of the manual `SortKeys()` the original implementation needed.
pub type EquitySeries = BTreeMap<DateTime<Utc>, Decimal>;

/// Computes the liquidation price for a newly opened position.
/// Leverage and margin formulas are an Open Question in spec.md — this
/// trait lets a caller plug in a real one; the default is the
/// unleveraged identity the test suite fixes (any adverse move equals
/// full loss of the position).
pub trait LiquidationPolicy: Send + Sync {
    fn liquidation_price(
        &self,
        side: Side,
        entry: Decimal,
        size: Decimal,
        capital: Decimal,
    ) -> Decimal;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UnleveragedLiquidation;

impl LiquidationPolicy for UnleveragedLiquidation {
    fn liquidation_price(&self, _side: Side, entry: Decimal, _size: Decimal, _capital: Decimal) -> Decimal {
        entry
    }
}

/// Periodic funding/carry charge against an open position. Default is
/// no funding at all.
pub trait FundingPolicy: Send + Sync {
    fn funding_charge(&self, position: &Position, elapsed: Duration) -> Decimal;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoFunding;

impl FundingPolicy for NoFunding {
    fn funding_charge(&self, _position: &Position, _elapsed: Duration) -> Decimal {
        Decimal::ZERO
    }
}

pub struct Dealer {
    clock: Clock,
    orders: BTreeMap<OrderId, Order>,
    position: Position,
    round_turns: Vec<RoundTurn>,
    equity: EquitySeries,
    initial_capital: Decimal,
    realized_pnl: Decimal,
    funding_charged: Decimal,
    prev_bar_start: Option<DateTime<Utc>>,
    started: bool,
    liquidation_policy: Box<dyn LiquidationPolicy>,
    funding_policy: Box<dyn FundingPolicy>,
}

impl Default for Dealer {
    fn default() -> Self {
        Self::new()
    }
}

impl Dealer {
    pub fn new() -> Self {
        Self {
            clock: Clock::new(),
            orders: BTreeMap::new(),
            position: Position::pending(),
            round_turns: Vec::new(),
            equity: EquitySeries::new(),
            initial_capital: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            funding_charged: Decimal::ZERO,
            prev_bar_start: None,
            started: false,
            liquidation_policy: Box::new(UnleveragedLiquidation),
            funding_policy: Box::new(NoFunding),
        }
    }

    pub fn with_policies(
        liquidation_policy: impl LiquidationPolicy + 'static,
        funding_policy: impl FundingPolicy + 'static,
    ) -> Self {
        Self {
            liquidation_policy: Box::new(liquidation_policy),
            funding_policy: Box::new(funding_policy),
            ..Self::new()
        }
    }

    pub fn set_initial_capital(&mut self, capital: Decimal) {
        self.initial_capital = capital;
    }

    /// Validates and accepts an order. On success the order is stored
    /// already Open (there is nothing left to reject between
    /// acceptance and matching), with `CreatedAt` set from the
    /// simulation clock.
    pub fn place_order(&mut self, mut order: Order) -> Result<Order, CoreError> {
        if !order.is_pending() {
            return Err(CoreError::InvalidOrderState(
                "order must be submitted in the Pending state".into(),
            ));
        }
        if order.size <= Decimal::ZERO {
            return Err(CoreError::InvalidOrderState("size must be > 0".into()));
        }
        match order.order_type {
            OrderType::Limit if order.limit_price.is_none() => {
                return Err(CoreError::InvalidOrderState(
                    "limit order requires a limit price".into(),
                ))
            }
            _ => {}
        }

        let now = self.clock.now();
        order.id = OrderId::from_clock(&mut self.clock);
        order.created_at = now;
        order.opened_at = Some(now);

        debug!(order_id = %order.id, side = ?order.side, "order accepted");
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    /// Transitions an Open order to Closed with `FilledSize = 0`.
    /// A no-op on an already-terminal order.
    pub fn cancel_order(&mut self, id: OrderId) {
        if let Some(order) = self.orders.get_mut(&id) {
            if order.state() == OrderState::Open {
                order.closed_at = Some(self.clock.now());
            }
        }
    }

    /// Advances the clock to `bar.start`, matches every non-closed
    /// order against the bar in ID-ascending (submission) order,
    /// settles funding, checks liquidation, and appends an equity
    /// sample.
    pub fn receive_price(&mut self, bar: Kline) {
        self.clock.advance(bar.start);

        let pending_ids: Vec<OrderId> = self
            .orders
            .iter()
            .filter(|(_, o)| o.state() != OrderState::Closed)
            .map(|(id, _)| *id)
            .collect();

        for id in pending_ids {
            self.process_order(id, bar);
        }

        self.settle_funding();
        self.check_liquidation(bar);

        let key = close_time(self.prev_bar_start.unwrap_or(DateTime::<Utc>::UNIX_EPOCH), bar.start);
        let equity = self.compute_equity(bar);
        self.equity.insert(key, equity);
        self.prev_bar_start = Some(bar.start);
        self.started = true;
    }

    fn process_order(&mut self, id: OrderId, bar: Kline) {
        let order = self.orders.get(&id).cloned().expect("order exists");
        let Some(price) = Self::match_order(&order, &bar) else {
            return;
        };

        let filled_at = self.clock.now();
        let closed_at = self.clock.now();

        if let Some(order) = self.orders.get_mut(&id) {
            order.filled_at = Some(filled_at);
            order.filled_price = price;
            order.filled_size = order.size;
            order.closed_at = Some(closed_at);
        }

        let round_turn = self.apply_fill(order.side, price, order.size);
        if let Some(rt) = round_turn {
            self.realized_pnl += rt.profit;
            self.round_turns.push(rt);
        }
    }

    /// Pure matching rule: Market always matches at the bar's close;
    /// Limit matches iff its price falls in the bar's inclusive
    /// `[L, H]` range, filling at the limit price itself.
    pub fn match_order(order: &Order, bar: &Kline) -> Option<Decimal> {
        match order.order_type {
            OrderType::Market => Some(bar.close),
            OrderType::Limit => {
                let limit = order.limit_price?;
                if limit >= bar.low && limit <= bar.high {
                    Some(limit)
                } else {
                    None
                }
            }
        }
    }

    /// Applies a fill to the dealer's single running position,
    /// returning a `RoundTurn` if the fill fully closes (or reverses)
    /// it. Reversal (a fill larger than the open size) splits into a
    /// close of the existing position plus a fresh position on the
    /// remainder, per spec.md's "position reversal via split" note —
    /// this keeps round-turn semantics clean instead of sign-flipping
    /// a single record in place.
    fn apply_fill(&mut self, fill_side: Side, fill_price: Decimal, fill_size: Decimal) -> Option<RoundTurn> {
        if self.position.state() == PositionState::Pending {
            self.open_position(fill_side, fill_price, fill_size);
            return None;
        }

        if fill_side == self.position.side {
            self.add_to_position(fill_price, fill_size);
            return None;
        }

        // Opposite side: reduce, close, or reverse.
        let new_size = self.position.size - fill_size;
        if new_size > Decimal::ZERO {
            self.position.size = new_size;
            return None;
        }

        let rt = self.close_position(fill_price, self.position.size, self.clock.now());

        if new_size < Decimal::ZERO {
            let remainder = -new_size;
            self.open_position(fill_side, fill_price, remainder);
        }

        Some(rt)
    }

    fn open_position(&mut self, side: Side, price: Decimal, size: Decimal) {
        let liquidation_price = self
            .liquidation_policy
            .liquidation_price(side, price, size, self.initial_capital);
        self.position = Position {
            id: Some(OrderId::from_clock(&mut self.clock)),
            opened_at: Some(self.clock.now()),
            closed_at: None,
            side,
            price,
            size,
            liquidation_price,
            profit_and_loss: Decimal::ZERO,
        };
    }

    fn add_to_position(&mut self, fill_price: Decimal, fill_size: Decimal) {
        let total_size = self.position.size + fill_size;
        let weighted = self.position.price * self.position.size + fill_price * fill_size;
        self.position.price = weighted / total_size;
        self.position.size = total_size;
        self.position.liquidation_price = self.liquidation_policy.liquidation_price(
            self.position.side,
            self.position.price,
            self.position.size,
            self.initial_capital,
        );
    }

    fn close_position(&mut self, exit_price: Decimal, size: Decimal, now: DateTime<Utc>) -> RoundTurn {
        let realized = profit(self.position.side, self.position.price, exit_price, size);
        let hold_period = self
            .position
            .opened_at
            .map(|t| now - t)
            .unwrap_or_else(Duration::zero);

        self.position.closed_at = Some(now);
        self.position.profit_and_loss = realized;

        let rt = RoundTurn {
            side: self.position.side,
            entry_price: self.position.price,
            exit_price,
            size,
            profit: realized,
            hold_period,
            trade_count: 1,
        };

        self.position = Position::pending();
        rt
    }

    fn check_liquidation(&mut self, bar: Kline) {
        if self.position.state() != PositionState::Open {
            return;
        }
        let liquidated = match self.position.side {
            Side::Buy => bar.low <= self.position.liquidation_price,
            Side::Sell => bar.high >= self.position.liquidation_price,
        };
        if !liquidated {
            return;
        }
        warn!(price = %self.position.liquidation_price, "position liquidated");
        let now = self.clock.now();
        let size = self.position.size;
        let rt = self.close_position(self.position.liquidation_price, size, now);
        self.realized_pnl += rt.profit;
        self.round_turns.push(rt);
    }

    fn settle_funding(&mut self) {
        if self.position.state() != PositionState::Open {
            return;
        }
        let elapsed = self.clock.elapsed();
        let charge = self.funding_policy.funding_charge(&self.position, elapsed);
        self.funding_charged += charge;
    }

    fn compute_equity(&self, bar: Kline) -> Decimal {
        let unrealized = if self.position.state() == PositionState::Open {
            profit(self.position.side, self.position.price, bar.close, self.position.size)
        } else {
            Decimal::ZERO
        };
        self.initial_capital + self.realized_pnl + unrealized - self.funding_charged
    }

    pub fn list_trades(&self) -> &[RoundTurn] {
        &self.round_turns
    }

    pub fn list_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    pub fn equity_history(&self) -> &EquitySeries {
        &self.equity
    }

    pub fn open_position_snapshot(&self) -> Option<&Position> {
        self.position.is_open().then_some(&self.position)
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    /// Force-closes any open position at the given price, as a bot's
    /// `close()` does before final reporting (§4.G).
    pub fn liquidate_all(&mut self, price: Decimal) {
        if self.position.state() != PositionState::Open {
            return;
        }
        let now = self.clock.now();
        let size = self.position.size;
        let rt = self.close_position(price, size, now);
        self.realized_pnl += rt.profit;
        self.round_turns.push(rt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderId;
    use rust_decimal_macros::dec;

    fn bar(o: Decimal, h: Decimal, l: Decimal, c: Decimal) -> Kline {
        Kline::new(DateTime::<Utc>::UNIX_EPOCH + Duration::hours(1), o, h, l, c, 0.0)
    }

    fn market_order(side: Side, size: Decimal) -> Order {
        Order::new(OrderId::from_clock(&mut Clock::new()), DateTime::<Utc>::UNIX_EPOCH, side, OrderType::Market, size, None)
    }

    fn limit_order(side: Side, size: Decimal, limit: Decimal) -> Order {
        Order::new(
            OrderId::from_clock(&mut Clock::new()),
            DateTime::<Utc>::UNIX_EPOCH,
            side,
            OrderType::Limit,
            size,
            Some(limit),
        )
    }

    #[test]
    fn market_order_fills_at_close() {
        let k = bar(dec!(8), dec!(15), dec!(5), dec!(10));
        let order = market_order(Side::Buy, dec!(1));
        assert_eq!(Dealer::match_order(&order, &k), Some(dec!(10)));
    }

    #[test]
    fn limit_matches_within_inclusive_bounds() {
        let k = bar(dec!(8), dec!(15), dec!(5), dec!(10));
        assert_eq!(Dealer::match_order(&limit_order(Side::Buy, dec!(1), dec!(12)), &k), Some(dec!(12)));
        assert_eq!(Dealer::match_order(&limit_order(Side::Buy, dec!(1), dec!(5)), &k), Some(dec!(5)));
        assert_eq!(Dealer::match_order(&limit_order(Side::Buy, dec!(1), dec!(15)), &k), Some(dec!(15)));
    }

    #[test]
    fn limit_does_not_match_outside_bounds() {
        let k = bar(dec!(8), dec!(15), dec!(5), dec!(10));
        assert_eq!(Dealer::match_order(&limit_order(Side::Buy, dec!(1), dec!(2)), &k), None);
        assert_eq!(Dealer::match_order(&limit_order(Side::Buy, dec!(1), dec!(100)), &k), None);
    }

    #[test]
    fn place_order_rejects_invalid_size() {
        let mut dealer = Dealer::new();
        let order = market_order(Side::Buy, dec!(0));
        let err = dealer.place_order(order).unwrap_err();
        assert_eq!(err, CoreError::InvalidOrderState("size must be > 0".into()));
    }

    #[test]
    fn place_order_rejects_non_pending_state() {
        let mut dealer = Dealer::new();
        let mut order = market_order(Side::Buy, dec!(1));
        order.opened_at = Some(DateTime::<Utc>::UNIX_EPOCH);
        let err = dealer.place_order(order).unwrap_err();
        assert!(matches!(err, CoreError::InvalidOrderState(_)));
    }

    #[test]
    fn market_order_closes_after_one_bar() {
        let mut dealer = Dealer::new();
        dealer.set_initial_capital(dec!(1000));
        let order = market_order(Side::Buy, dec!(1));
        dealer.place_order(order).unwrap();
        dealer.receive_price(bar(dec!(8), dec!(15), dec!(5), dec!(10)));

        let orders: Vec<_> = dealer.list_orders().collect();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].state(), OrderState::Closed);
        assert_eq!(orders[0].filled_price, dec!(10));
    }

    #[test]
    fn limit_below_low_does_not_fill() {
        let mut dealer = Dealer::new();
        let order = limit_order(Side::Buy, dec!(1), dec!(2));
        dealer.place_order(order).unwrap();
        dealer.receive_price(bar(dec!(8), dec!(15), dec!(5), dec!(10)));

        let orders: Vec<_> = dealer.list_orders().collect();
        assert_eq!(orders[0].state(), OrderState::Open);
        assert_eq!(orders[0].filled_size, Decimal::ZERO);
    }

    #[test]
    fn three_limit_orders_close_in_submission_order() {
        let mut dealer = Dealer::new();
        dealer.place_order(limit_order(Side::Buy, dec!(1), dec!(15))).unwrap();
        dealer.place_order(limit_order(Side::Sell, dec!(1), dec!(15))).unwrap();
        dealer.place_order(limit_order(Side::Buy, dec!(1), dec!(10))).unwrap();

        dealer.receive_price(bar(dec!(8), dec!(15), dec!(5), dec!(10)));

        let mut orders: Vec<_> = dealer.list_orders().cloned().collect();
        orders.sort_by_key(|o| o.id);
        assert_eq!(orders.len(), 3);
        assert!(orders.iter().all(|o| o.state() == OrderState::Closed));
        assert!(orders[0].closed_at.unwrap() < orders[1].closed_at.unwrap());
        assert!(orders[1].closed_at.unwrap() < orders[2].closed_at.unwrap());
    }

    #[test]
    fn opposite_fill_closes_position_and_records_round_turn() {
        let mut dealer = Dealer::new();
        dealer.set_initial_capital(dec!(1000));
        dealer.place_order(market_order(Side::Buy, dec!(2))).unwrap();
        dealer.receive_price(bar(dec!(10), dec!(10), dec!(10), dec!(10)));

        dealer.place_order(market_order(Side::Sell, dec!(2))).unwrap();
        dealer.receive_price(bar(dec!(20), dec!(20), dec!(20), dec!(20)));

        let trades = dealer.list_trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].profit, dec!(20));
        assert_eq!(trades[0].side, Side::Buy);
    }

    #[test]
    fn reversal_splits_into_close_and_new_position() {
        let mut dealer = Dealer::new();
        dealer.set_initial_capital(dec!(1000));
        dealer.place_order(market_order(Side::Buy, dec!(2))).unwrap();
        dealer.receive_price(bar(dec!(10), dec!(10), dec!(10), dec!(10)));

        dealer.place_order(market_order(Side::Sell, dec!(5))).unwrap();
        dealer.receive_price(bar(dec!(12), dec!(12), dec!(12), dec!(12)));

        assert_eq!(dealer.list_trades().len(), 1);
        let open = dealer.open_position_snapshot().expect("reversal opens a new position");
        assert_eq!(open.side, Side::Sell);
        assert_eq!(open.size, dec!(3));
        assert_eq!(open.price, dec!(12));
    }

    #[test]
    fn unleveraged_liquidation_equals_entry_price() {
        let policy = UnleveragedLiquidation;
        assert_eq!(policy.liquidation_price(Side::Buy, dec!(100), dec!(1), dec!(1000)), dec!(100));
    }

    #[test]
    fn equity_sample_tracks_unrealized_and_realized_pnl() {
        let mut dealer = Dealer::new();
        dealer.set_initial_capital(dec!(1000));
        dealer.place_order(market_order(Side::Buy, dec!(1))).unwrap();
        dealer.receive_price(bar(dec!(10), dec!(10), dec!(10), dec!(10)));

        dealer.receive_price(bar(dec!(12), dec!(12), dec!(12), dec!(12)));
        let equity: Vec<_> = dealer.equity_history().values().copied().collect();
        assert_eq!(*equity.last().unwrap(), dec!(1002));
    }
}
