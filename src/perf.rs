//! Performance analytics (component E): drawdown extraction, scalar
//! return statistics, and trade/portfolio report aggregation.

pub mod drawdown;
pub mod portfolio;
pub mod report;
pub mod stats;
pub mod tradereport;

pub use drawdown::{drawdowns, max_drawdown, Drawdown};
pub use portfolio::PortfolioReport;
pub use report::{summarize, PerformanceReport, PhaseReport};
pub use stats::{cagr, hist_vol_ann, kelly_criterion, optimal_f, prr, sharpe_ratio};
pub use tradereport::TradeReport;
