//! Strategy contract (component E).
//!
//! A strategy is anything that can be configured from a `ParamMap`,
//! warmed up on history, and then asked to react to each new bar. The
//! dealer and clock are handed to it rather than owned by it, so the
//! same strategy type can run inside the optimizer's worker pool
//! without any shared mutable state between workers.

use std::sync::Arc;

use crate::dealer::Dealer;
use crate::error::CoreError;
use crate::kline::Kline;

pub use crate::paramset::{ParamMap, ParamValue};

/// Implemented by a trading strategy under test. `configure` runs once
/// per trial before `warmup`; `receive_price` runs once per bar in the
/// sample after warmup; `close` runs once after the last bar so the
/// strategy can flatten any open position before final reporting.
pub trait Strategy: Send {
    fn configure(&mut self, params: &ParamMap) -> Result<(), CoreError>;
    fn warmup(&mut self, history: &[Kline]) -> Result<(), CoreError>;
    fn receive_price(&mut self, dealer: &mut Dealer, bar: Kline) -> Result<(), CoreError>;
    fn close(&mut self, dealer: &mut Dealer) -> Result<(), CoreError>;
}

/// Factory for a fresh `Strategy` instance. `Arc` (rather than `Box`)
/// because the study orchestrator's worker pool shares one factory
/// across every training/validation job running concurrently.
pub type MakeBot = Arc<dyn Fn() -> Box<dyn Strategy> + Send + Sync>;
