pub mod clock;
pub mod dealer;
pub mod decimal;
pub mod error;
pub mod kline;
pub mod order;
pub mod paramset;
pub mod perf;
pub mod position;
pub mod strategy;
pub mod study;

pub use clock::Clock;
pub use dealer::Dealer;
pub use decimal::Decimal;
pub use error::CoreError;
pub use kline::Kline;
pub use order::{Order, OrderId, OrderType, Side};
pub use paramset::{cartesian_product, ParamGrid, ParamMap, ParamSet, ParamSetId, ParamValue};
pub use position::{Position, PositionId, RoundTurn};
pub use strategy::{MakeBot, Strategy};
pub use study::{
    sharpe_ranker, split_sample, BruteOptimizer, CancellationToken, MakeDealer, ObjectiveRanker,
    OptimizerStep, Phase, Study,
};
