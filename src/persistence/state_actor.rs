//! Single writer for the state document.
//!
//! Every read-modify-write cycle is a message to one task, so concurrent
//! executions are applied one after another instead of overwriting each
//! other's portfolios.

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use super::FileStateStore;
use crate::domain::State;
use crate::error::{HodlError, Result};

type Mutation = Box<dyn FnOnce(&mut State) + Send>;

enum StateCommand {
    Update {
        apply: Mutation,
        reply: oneshot::Sender<Result<State>>,
    },
    Snapshot {
        reply: oneshot::Sender<Result<State>>,
    },
}

pub struct StateActor {
    store: FileStateStore,
    rx: mpsc::Receiver<StateCommand>,
}

/// Cloneable sender side of the actor
#[derive(Clone)]
pub struct StateHandle {
    tx: mpsc::Sender<StateCommand>,
}

impl StateActor {
    pub fn new(store: FileStateStore) -> (Self, StateHandle) {
        let (tx, rx) = mpsc::channel(64);
        (Self { store, rx }, StateHandle { tx })
    }

    /// Spawn the actor on the current runtime
    pub fn spawn(store: FileStateStore) -> StateHandle {
        let (actor, handle) = Self::new(store);
        tokio::spawn(actor.run());
        handle
    }

    pub async fn run(mut self) {
        info!(path = %self.store.path().display(), "state actor started");

        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                StateCommand::Update { apply, reply } => {
                    let result = self.apply(apply).await;
                    if let Err(e) = &result {
                        error!(error = %e, "state update failed");
                    }
                    let _ = reply.send(result);
                }
                StateCommand::Snapshot { reply } => {
                    let _ = reply.send(self.store.load_or_init().await);
                }
            }
        }

        debug!("state actor stopped");
    }

    async fn apply(&self, apply: Mutation) -> Result<State> {
        let mut state = self.store.load_or_init().await?;
        apply(&mut state);
        state.last_updated = Utc::now();
        self.store.save(&state).await?;
        Ok(state)
    }
}

impl StateHandle {
    /// Load-or-init, mutate, save as one serialized step; returns the saved document
    pub async fn update<F>(&self, f: F) -> Result<State>
    where
        F: FnOnce(&mut State) + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        self.send(StateCommand::Update {
            apply: Box::new(f),
            reply,
        })
        .await?;
        rx.await.map_err(|_| actor_gone())?
    }

    pub async fn snapshot(&self) -> Result<State> {
        let (reply, rx) = oneshot::channel();
        self.send(StateCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| actor_gone())?
    }

    async fn send(&self, cmd: StateCommand) -> Result<()> {
        self.tx.send(cmd).await.map_err(|_| actor_gone())
    }
}

fn actor_gone() -> HodlError {
    HodlError::Persistence("state actor is not running".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Portfolio, Strategy, StrategyName, SupportedCurrency};

    #[tokio::test]
    async fn concurrent_updates_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state.json"));
        let handle = StateActor::spawn(store.clone());

        let mut tasks = Vec::new();
        for i in 0..16 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                let portfolio = Portfolio::new(format!("p{i}"), format!("uuid-{i}"), "DEFAULT");
                handle
                    .update(move |state| {
                        state.set_current_strategy(
                            &portfolio,
                            Strategy::new(StrategyName::Hodl, SupportedCurrency::Eth),
                            Utc::now(),
                        )
                    })
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let on_disk = store.load().await.unwrap();
        assert_eq!(on_disk.portfolios.len(), 16);
        assert_eq!(handle.snapshot().await.unwrap(), on_disk);
    }

    #[tokio::test]
    async fn snapshot_of_missing_file_is_empty_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let handle = StateActor::spawn(FileStateStore::new(&path));

        let state = handle.snapshot().await.unwrap();
        assert!(state.portfolios.is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn dropped_actor_reports_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let (actor, handle) = StateActor::new(FileStateStore::new(dir.path().join("s.json")));
        drop(actor);

        assert!(matches!(handle.snapshot().await, Err(HodlError::Persistence(_))));
    }
}
