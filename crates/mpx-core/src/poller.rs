//! Single-flight refresh scheduling for status snapshots.
//!
//! The poller lives on the dashboard's event loop. A refresh spawns one fetch
//! task whose result comes back as a [`FetchCompletion`] over an mpsc channel;
//! the loop hands it to [`SnapshotPoller::complete`]. While a fetch is in
//! flight every further refresh request is dropped, so completions can never
//! arrive out of order.

use crate::{ErrorKind, FetchError, Snapshot, SnapshotSource};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub period: Duration,
    pub auto_refresh: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_REFRESH_PERIOD,
            auto_refresh: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollError {
    pub kind: ErrorKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Issued when a fetch starts; only the matching completion is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    seq: u64,
}

#[derive(Debug)]
pub struct FetchCompletion {
    pub ticket: RefreshTicket,
    pub result: Result<Snapshot, FetchError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// A new snapshot was published.
    Updated(Arc<Snapshot>),
    /// The fetch failed; the previous snapshot stays published.
    Failed(ErrorKind),
    /// The completion did not belong to the current fetch, or the poller was shut down.
    Discarded,
}

#[derive(Debug, Clone, Default)]
pub struct PollState {
    pub last_snapshot: Option<Arc<Snapshot>>,
    pub in_flight: bool,
    pub last_error: Option<PollError>,
    /// Logical clock: bumped every time a fetch is issued.
    pub trigger_at: u64,
    pub last_success_at: Option<DateTime<Utc>>,
}

impl PollState {
    /// Marks a fetch as started, or returns `None` when one is already running.
    pub fn begin_refresh(&mut self) -> Option<RefreshTicket> {
        if self.in_flight {
            return None;
        }
        self.in_flight = true;
        self.trigger_at += 1;
        Some(RefreshTicket {
            seq: self.trigger_at,
        })
    }

    pub fn finish(&mut self, completion: FetchCompletion) -> PollOutcome {
        if !self.in_flight || completion.ticket.seq != self.trigger_at {
            return PollOutcome::Discarded;
        }
        self.in_flight = false;

        match completion.result {
            Ok(snapshot) => {
                if self.last_error.take().is_some() {
                    info!("status_recovered: servers={}", snapshot.servers.len());
                }
                let snapshot = Arc::new(snapshot);
                self.last_snapshot = Some(Arc::clone(&snapshot));
                self.last_success_at = Some(Utc::now());
                PollOutcome::Updated(snapshot)
            }
            Err(err) => {
                let kind = err.kind();
                if self.last_error.is_none() {
                    warn!("status_fetch_failed: {err}");
                } else {
                    debug!("status_fetch_failed: {err}");
                }
                self.last_error = Some(PollError {
                    kind,
                    message: err.to_string(),
                    at: Utc::now(),
                });
                PollOutcome::Failed(kind)
            }
        }
    }

    pub fn is_online(&self) -> bool {
        self.last_error.is_none()
    }
}

pub struct SnapshotPoller {
    source: Arc<dyn SnapshotSource>,
    completions: mpsc::UnboundedSender<FetchCompletion>,
    state: PollState,
    config: PollerConfig,
    visible: bool,
    shut_down: bool,
}

impl SnapshotPoller {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        completions: mpsc::UnboundedSender<FetchCompletion>,
        config: PollerConfig,
    ) -> Self {
        Self {
            source,
            completions,
            state: PollState::default(),
            config,
            visible: true,
            shut_down: false,
        }
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.state.last_snapshot.as_ref()
    }

    pub fn period(&self) -> Duration {
        self.config.period
    }

    pub fn auto_refresh(&self) -> bool {
        self.config.auto_refresh
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_auto_refresh(&mut self, enabled: bool) {
        self.config.auto_refresh = enabled;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Starts a fetch unless one is in flight. Returns whether a fetch was issued.
    ///
    /// Must be called from within a tokio runtime.
    pub fn request_refresh(&mut self) -> bool {
        if self.shut_down {
            return false;
        }
        let Some(ticket) = self.state.begin_refresh() else {
            debug!("status_refresh_skipped: fetch in flight");
            return false;
        };

        let source = Arc::clone(&self.source);
        let guard = CompletionGuard {
            ticket,
            completions: self.completions.clone(),
            sent: false,
        };
        tokio::spawn(async move {
            let result = source.fetch_snapshot().await;
            guard.send(result);
        });
        true
    }

    /// Timer entry point: a refresh gated by auto-refresh and visibility.
    pub fn tick(&mut self) -> bool {
        if !self.config.auto_refresh || !self.visible {
            return false;
        }
        self.request_refresh()
    }

    pub fn complete(&mut self, completion: FetchCompletion) -> PollOutcome {
        if self.shut_down {
            return PollOutcome::Discarded;
        }
        self.state.finish(completion)
    }

    /// Stops scheduling. A fetch already in flight is left to finish and its
    /// result is discarded.
    pub fn shutdown(&mut self) {
        self.shut_down = true;
    }
}

/// Delivers the completion for one ticket exactly once. A fetch task that
/// unwinds or is cancelled still reports, so `in_flight` is always released.
struct CompletionGuard {
    ticket: RefreshTicket,
    completions: mpsc::UnboundedSender<FetchCompletion>,
    sent: bool,
}

impl CompletionGuard {
    fn send(mut self, result: Result<Snapshot, FetchError>) {
        self.sent = true;
        // The receiver is gone once the dashboard exits.
        let _ = self.completions.send(FetchCompletion {
            ticket: self.ticket,
            result,
        });
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if !self.sent {
            let _ = self.completions.send(FetchCompletion {
                ticket: self.ticket,
                result: Err(FetchError::Aborted),
            });
        }
    }
}
