//! Execution records for accepted strategy requests.
//!
//! Each record lives behind its own `watch` channel. The worker holds an
//! `ExecutionGuard`; finishing it (or dropping it, e.g. on panic) moves the
//! record to a terminal status exactly once.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{StrategyName, SupportedCurrency};
use crate::error::{HodlError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Accepted,
    Submitted,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub portfolio: String,
    pub strategy: StrategyName,
    pub currency: SupportedCurrency,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

type Channel = Arc<watch::Sender<ExecutionRecord>>;

/// Finished records are kept this long for `GET /executions/:id`
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

/// Hard cap on retained records; the oldest finished ones go first
pub const DEFAULT_MAX_RECORDS: usize = 10_000;

#[derive(Clone)]
pub struct ExecutionTracker {
    records: Arc<RwLock<HashMap<Uuid, Channel>>>,
    retention: chrono::Duration,
    max_records: usize,
}

impl Default for ExecutionTracker {
    fn default() -> Self {
        Self::with_limits(DEFAULT_RETENTION, DEFAULT_MAX_RECORDS)
    }
}

impl ExecutionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(retention: Duration, max_records: usize) -> Self {
        Self {
            records: Arc::default(),
            retention: chrono::Duration::from_std(retention)
                .unwrap_or_else(|_| chrono::Duration::days(36_500)),
            max_records: max_records.max(1),
        }
    }

    /// Start a record in `Accepted`
    pub fn register(
        &self,
        portfolio: &str,
        strategy: StrategyName,
        currency: SupportedCurrency,
    ) -> ExecutionGuard {
        let now = Utc::now();
        let record = ExecutionRecord {
            id: Uuid::new_v4(),
            portfolio: portfolio.to_string(),
            strategy,
            currency,
            status: ExecutionStatus::Accepted,
            client_order_id: None,
            order_id: None,
            error: None,
            created_at: now,
            updated_at: now,
        };
        let id = record.id;
        let (tx, _rx) = watch::channel(record);
        let tx = Arc::new(tx);

        {
            let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
            self.prune(&mut records, now);
            records.insert(id, tx.clone());
        }

        debug!(execution_id = %id, portfolio, "execution registered");
        ExecutionGuard {
            id,
            tx,
            finished: false,
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<ExecutionRecord> {
        self.channel(id).map(|tx| tx.borrow().clone())
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until the record reaches a terminal status, at most `timeout`
    pub async fn wait(&self, id: &Uuid, timeout: Duration) -> Result<ExecutionRecord> {
        let tx = self
            .channel(id)
            .ok_or_else(|| HodlError::ExecutionNotFound(id.to_string()))?;
        let mut rx = tx.subscribe();

        let waited = tokio::time::timeout(timeout, rx.wait_for(|r| r.status.is_terminal())).await;
        match waited {
            Ok(Ok(record)) => Ok(record.clone()),
            // `tx` is held above, so the sender outlives `rx`
            Ok(Err(_)) => Err(HodlError::Internal(format!("execution {} channel closed", id))),
            Err(_) => Err(HodlError::Timeout(format!(
                "execution {} did not finish within {:?}",
                id, timeout
            ))),
        }
    }

    /// Drop finished records past retention, then the oldest finished ones
    /// while the map is full. Running executions are never dropped.
    fn prune(&self, records: &mut HashMap<Uuid, Channel>, now: DateTime<Utc>) {
        let cutoff = now - self.retention;
        records.retain(|_, tx| {
            let r = tx.borrow();
            !(r.status.is_terminal() && r.updated_at <= cutoff)
        });

        if records.len() < self.max_records {
            return;
        }

        let mut finished: Vec<(DateTime<Utc>, Uuid)> = records
            .iter()
            .filter_map(|(id, tx)| {
                let r = tx.borrow();
                r.status.is_terminal().then_some((r.updated_at, *id))
            })
            .collect();
        finished.sort();

        let excess = records.len() + 1 - self.max_records;
        for (_, id) in finished.into_iter().take(excess) {
            records.remove(&id);
        }
        debug!(retained = records.len(), "execution records pruned");
    }

    fn channel(&self, id: &Uuid) -> Option<Channel> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }
}

/// Owned by whoever drives an execution to its end
pub struct ExecutionGuard {
    id: Uuid,
    tx: Channel,
    finished: bool,
}

impl ExecutionGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mark_submitted(&self, client_order_id: &str) {
        self.tx.send_modify(|r| {
            r.status = ExecutionStatus::Submitted;
            r.client_order_id = Some(client_order_id.to_string());
            r.updated_at = Utc::now();
        });
    }

    /// The brokerage accepted the order; kept even if the run later fails
    pub fn record_order(&self, order_id: &str) {
        self.tx.send_modify(|r| {
            r.order_id = Some(order_id.to_string());
            r.updated_at = Utc::now();
        });
    }

    pub fn complete(mut self, order_id: Option<String>) {
        self.finish(ExecutionStatus::Completed, order_id, None);
    }

    pub fn fail(mut self, error: &HodlError) {
        self.finish(ExecutionStatus::Failed, None, Some(error.to_string()));
    }

    fn finish(&mut self, status: ExecutionStatus, order_id: Option<String>, error: Option<String>) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.tx.send_modify(|r| {
            r.status = status;
            if order_id.is_some() {
                r.order_id = order_id;
            }
            r.error = error;
            r.updated_at = Utc::now();
        });
    }
}

impl Drop for ExecutionGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!(execution_id = %self.id, "execution ended without a result");
            self.finish(
                ExecutionStatus::Failed,
                None,
                Some("execution aborted before completion".to_string()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(tracker: &ExecutionTracker) -> ExecutionGuard {
        tracker.register("test", StrategyName::Hodl, SupportedCurrency::Eth)
    }

    #[tokio::test]
    async fn record_moves_through_submitted_to_completed() {
        let tracker = ExecutionTracker::new();
        let guard = register(&tracker);
        let id = guard.id();

        assert_eq!(tracker.get(&id).unwrap().status, ExecutionStatus::Accepted);
        guard.mark_submitted("client-1");
        assert_eq!(tracker.get(&id).unwrap().status, ExecutionStatus::Submitted);

        let waiter = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.wait(&id, Duration::from_secs(5)).await })
        };
        guard.complete(Some("order-1".into()));

        let record = waiter.await.unwrap().unwrap();
        assert_eq!(record.status, ExecutionStatus::Completed);
        assert_eq!(record.client_order_id.as_deref(), Some("client-1"));
        assert_eq!(record.order_id.as_deref(), Some("order-1"));
        assert!(record.error.is_none());
    }

    #[tokio::test]
    async fn dropped_guard_fails_the_record() {
        let tracker = ExecutionTracker::new();
        let id = {
            let guard = register(&tracker);
            guard.id()
        };

        let record = tracker.wait(&id, Duration::from_millis(50)).await.unwrap();
        assert_eq!(record.status, ExecutionStatus::Failed);
        assert!(record.error.unwrap().contains("aborted"));
    }

    #[tokio::test]
    async fn panicking_worker_still_signals_completion() {
        let tracker = ExecutionTracker::new();
        let guard = register(&tracker);
        let id = guard.id();

        let task = tokio::spawn(async move {
            let _guard = guard;
            panic!("worker blew up");
        });
        assert!(task.await.is_err());

        let record = tracker.wait(&id, Duration::from_secs(1)).await.unwrap();
        assert_eq!(record.status, ExecutionStatus::Failed);
    }

    #[tokio::test]
    async fn wait_is_time_bounded() {
        let tracker = ExecutionTracker::new();
        let guard = register(&tracker);

        let err = tracker
            .wait(&guard.id(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, HodlError::Timeout(_)));
        guard.fail(&HodlError::Validation("late".into()));
    }

    #[tokio::test]
    async fn unknown_execution_is_not_found() {
        let tracker = ExecutionTracker::new();
        let err = tracker
            .wait(&Uuid::new_v4(), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, HodlError::ExecutionNotFound(_)));
        assert!(tracker.is_empty());
    }

    #[test]
    fn finished_records_past_retention_are_evicted() {
        let tracker = ExecutionTracker::with_limits(Duration::ZERO, 100);
        for _ in 0..1_000 {
            register(&tracker).fail(&HodlError::PortfolioNotFound("nope".into()));
        }

        // each registration drops everything already finished
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn cap_drops_oldest_finished_and_keeps_running_records() {
        let tracker = ExecutionTracker::with_limits(Duration::from_secs(3600), 3);
        let running = register(&tracker);
        let oldest = register(&tracker);
        let oldest_id = oldest.id();
        oldest.fail(&HodlError::Validation("first".into()));
        let newer = register(&tracker);
        let newer_id = newer.id();
        newer.complete(None);

        let latest = register(&tracker);

        assert_eq!(tracker.len(), 3);
        assert!(tracker.get(&oldest_id).is_none());
        assert!(tracker.get(&newer_id).is_some());
        assert!(tracker.get(&running.id()).is_some());
        assert!(tracker.get(&latest.id()).is_some());
    }

    #[test]
    fn running_records_survive_a_full_map() {
        let tracker = ExecutionTracker::with_limits(Duration::ZERO, 2);
        let guards: Vec<_> = (0..5).map(|_| register(&tracker)).collect();

        assert_eq!(tracker.len(), 5);
        for guard in &guards {
            assert!(tracker.get(&guard.id()).is_some());
        }
    }

    #[test]
    fn failed_record_keeps_error_text() {
        let tracker = ExecutionTracker::new();
        let guard = register(&tracker);
        let id = guard.id();
        guard.fail(&HodlError::PortfolioNotFound("nope".into()));

        let record = tracker.get(&id).unwrap();
        assert_eq!(record.status, ExecutionStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("Portfolio not found: nope"));
        assert_eq!(tracker.len(), 1);
    }
}
