//! Study orchestrator (component F): enumerates a parameter grid,
//! fans training and validation trials out to a bounded worker pool,
//! and selects an optimum under a pluggable ranking function.

pub mod optimizer;

pub use optimizer::{
    sharpe_ranker, split_sample, BruteOptimizer, CancellationToken, MakeDealer, ObjectiveRanker,
    OptimizerStep, Phase, Study,
};
