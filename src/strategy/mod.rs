//! Strategy execution
//!
//! - `sizing`: turns available cash and the best bid into a limit order
//! - `executor`: resolves a request and runs the order on a worker task
//! - `tracker`: per-request execution records with bounded waits
//! - `transfer`: guarded cash moves between portfolios

pub mod executor;
pub mod sizing;
pub mod tracker;
pub mod transfer;

pub use executor::{ExecuteStrategyRequest, ExecutorSettings, StrategyExecutor};
pub use sizing::{compute_order_config, ensure_tradable, COMMISSION_RATE, ORDER_TTL_SECS};
pub use tracker::{ExecutionGuard, ExecutionRecord, ExecutionStatus, ExecutionTracker};
pub use transfer::transfer_funds;
