//! JSON file persistence for the state document

use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::State;
use crate::error::{HodlError, Result};

/// Whole-document store. Each `save` overwrites the file; two concurrent
/// writers race with last-writer-wins, so mutate through `StateHandle`.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document; a missing file is `HodlError::StateNotFound`
    pub async fn load(&self) -> Result<State> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(HodlError::StateNotFound(self.path.display().to_string()));
            }
            Err(e) => {
                return Err(HodlError::Persistence(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        serde_json::from_str(&raw).map_err(|e| {
            HodlError::Persistence(format!("failed to parse {}: {}", self.path.display(), e))
        })
    }

    pub async fn save(&self, state: &State) -> Result<()> {
        let payload = serde_json::to_vec_pretty(state)
            .map_err(|e| HodlError::Persistence(format!("failed to serialize state: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    HodlError::Persistence(format!("failed to create state dir: {}", e))
                })?;
            }
        }

        tokio::fs::write(&self.path, payload).await.map_err(|e| {
            HodlError::Persistence(format!(
                "failed to write {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!(path = %self.path.display(), portfolios = state.portfolios.len(), "state saved");
        Ok(())
    }

    /// Load the document, or start an empty one when none exists yet
    pub async fn load_or_init(&self) -> Result<State> {
        match self.load().await {
            Ok(state) => Ok(state),
            Err(HodlError::StateNotFound(_)) => Ok(State::empty(Utc::now())),
            Err(e) => Err(e),
        }
    }
}
