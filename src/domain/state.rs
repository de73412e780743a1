use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{null_as_default, Portfolio, Strategy};

/// Root state document; exactly one per deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub last_updated: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub portfolios: Vec<Portfolio>,
}

impl State {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            last_updated: now,
            portfolios: Vec::new(),
        }
    }

    pub fn portfolio(&self, uuid: &str) -> Option<&Portfolio> {
        self.portfolios.iter().find(|p| p.uuid == uuid)
    }

    /// Replace the entry for `portfolio.uuid` with one whose current strategy
    /// is `strategy`. Earlier previous strategies are kept; the entry is
    /// appended when the portfolio was not known yet.
    pub fn set_current_strategy(&mut self, portfolio: &Portfolio, strategy: Strategy, now: DateTime<Utc>) {
        let mut entry = portfolio.identity();
        entry.current_strategy = Some(strategy);

        match self.portfolios.iter_mut().find(|p| p.uuid == portfolio.uuid) {
            Some(existing) => {
                entry.previous_strategies = std::mem::take(&mut existing.previous_strategies);
                *existing = entry;
            }
            None => self.portfolios.push(entry),
        }

        self.last_updated = now;
    }
}
