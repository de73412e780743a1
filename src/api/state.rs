use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::exchange::BrokerageGateway;
use crate::strategy::{ExecutionTracker, StrategyExecutor};

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn BrokerageGateway>,
    pub executor: StrategyExecutor,
    /// Quote currency when a breakdown does not report one
    pub fiat_currency: String,
    /// Upper bound for `GET /executions/:id?wait=true`
    pub wait_timeout: Duration,
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        gateway: Arc<dyn BrokerageGateway>,
        executor: StrategyExecutor,
        fiat_currency: impl Into<String>,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            executor,
            fiat_currency: fiat_currency.into(),
            wait_timeout,
            start_time: Utc::now(),
        }
    }

    pub fn tracker(&self) -> &ExecutionTracker {
        self.executor.tracker()
    }

    /// Get service uptime in seconds
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.start_time).num_seconds()
    }
}
