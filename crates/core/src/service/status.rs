//! Observable cache status.
//!
//! The current [`CacheStatus`] lives in a `tokio::sync::watch` channel owned by
//! the service. Every transition replaces the snapshot under the channel lock,
//! so a reader never sees `state` from one transition paired with `source`
//! from another.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    #[default]
    Idle,
    Checking,
    Loading,
    Ready,
    Error,
}

/// Where the most recently delivered payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Cache,
    Network,
}

/// Snapshot of the service state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatus {
    pub state: CacheState,
    /// `stored_at` of the most recently delivered payload.
    pub last_timestamp: Option<i64>,
    /// The delivered payload is a stored entry served because the fetch failed.
    pub is_stale: bool,
    pub source: Option<DataSource>,
    /// Message of the failure that put the service into `error`.
    pub last_error: Option<String>,
}

impl CacheStatus {
    pub(crate) fn delivered(&mut self, source: DataSource, stored_at: i64, is_stale: bool) {
        self.state = CacheState::Ready;
        self.source = Some(source);
        self.last_timestamp = Some(stored_at);
        self.is_stale = is_stale;
        self.last_error = None;
    }
}

/// Read-only subscription to status changes.
///
/// Dropping the observer unsubscribes it.
#[derive(Debug, Clone)]
pub struct StatusObserver {
    rx: watch::Receiver<CacheStatus>,
}

impl StatusObserver {
    pub(crate) fn new(rx: watch::Receiver<CacheStatus>) -> Self {
        Self { rx }
    }

    pub fn current(&self) -> CacheStatus {
        self.rx.borrow().clone()
    }

    /// Wait for the next transition and return the snapshot it produced.
    ///
    /// Returns `None` once the service has been dropped.
    pub async fn changed(&mut self) -> Option<CacheStatus> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}
