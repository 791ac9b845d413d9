//! Live scan sessions
//!
//! A dashboard that asked for a console command opens a socket and registers
//! the scan id it is waiting on. Chunked uploads accumulate issues under the
//! same id. When a report is produced for the id, a `scan_complete` event is
//! pushed to the registered listener and the session is discarded.
//!
//! Every entry carries a deadline. Expired entries are dropped lazily on
//! access and by `sweep`; dropping an entry drops its listener, which closes
//! the socket on the other end.

use crate::model::Issue;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Default lifetime of a session without activity
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(5 * 60);

/// Event pushed to a live listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    ScanComplete {
        #[serde(rename = "reportId")]
        report_id: String,
    },
}

pub type Listener = mpsc::UnboundedSender<SessionEvent>;

/// Published by ingestion once a report exists for a scan id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCompleted {
    pub scan_id: String,
    pub report_id: String,
}

/// What happened to a completion event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The listener's socket was already gone
    ChannelClosed,
    /// Session existed (chunked upload) but nobody was listening
    NoListener,
    /// Unknown or expired scan id
    NoSession,
}

struct LiveSession {
    connection: Option<Uuid>,
    listener: Option<Listener>,
    issues: Vec<Issue>,
    chunks: u32,
    deadline: Instant,
}

impl LiveSession {
    fn new(deadline: Instant) -> Self {
        Self {
            connection: None,
            listener: None,
            issues: Vec::new(),
            chunks: 0,
            deadline,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

/// A session removed from the table for completion
#[derive(Debug)]
pub struct PendingScan {
    pub scan_id: String,
    pub issues: Vec<Issue>,
    pub chunks: u32,
    listener: Option<Listener>,
}

impl PendingScan {
    /// Push `scan_complete` to the listener, if any. Best effort: a closed
    /// channel is skipped.
    pub fn notify(self, report_id: &str) -> Delivery {
        deliver(&self.scan_id, self.listener, report_id)
    }
}

fn deliver(scan_id: &str, listener: Option<Listener>, report_id: &str) -> Delivery {
    let Some(listener) = listener else {
        return Delivery::NoListener;
    };

    let event = SessionEvent::ScanComplete {
        report_id: report_id.to_string(),
    };
    match listener.send(event) {
        Ok(()) => {
            debug!(scan_id, report_id, "scan_complete delivered");
            Delivery::Delivered
        }
        Err(_) => {
            debug!(scan_id, report_id, "listener closed before scan_complete");
            Delivery::ChannelClosed
        }
    }
}

/// Expiring table of live sessions keyed by scan id
pub struct SessionTable {
    ttl: Duration,
    sessions: Mutex<HashMap<String, LiveSession>>,
}

impl SessionTable {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Attach a listener to `scan_id`. Issues already uploaded for the id are
    /// kept; a previous listener is replaced and thereby closed.
    pub fn register(&self, scan_id: &str, connection: Uuid, listener: Listener) {
        self.register_at(scan_id, connection, listener, Instant::now());
    }

    fn register_at(&self, scan_id: &str, connection: Uuid, listener: Listener, now: Instant) {
        let deadline = now + self.ttl;
        let mut sessions = self.sessions.lock();
        let session = sessions
            .entry(scan_id.to_string())
            .and_modify(|session| {
                if session.is_expired(now) {
                    *session = LiveSession::new(deadline);
                }
            })
            .or_insert_with(|| LiveSession::new(deadline));

        session.connection = Some(connection);
        session.listener = Some(listener);
        session.deadline = deadline;
    }

    /// Append one chunk of issues in arrival order, creating the session if
    /// needed. Returns the number of issues accumulated so far.
    ///
    /// A chunk only extends the deadline of a session nobody listens on; a
    /// registered session keeps the deadline it got at registration.
    pub fn append_chunk(&self, scan_id: &str, issues: Vec<Issue>) -> usize {
        self.append_chunk_at(scan_id, issues, Instant::now())
    }

    fn append_chunk_at(&self, scan_id: &str, issues: Vec<Issue>, now: Instant) -> usize {
        let deadline = now + self.ttl;
        let mut sessions = self.sessions.lock();
        let session = sessions
            .entry(scan_id.to_string())
            .and_modify(|session| {
                if session.is_expired(now) {
                    *session = LiveSession::new(deadline);
                }
            })
            .or_insert_with(|| LiveSession::new(deadline));

        session.issues.extend(issues);
        session.chunks += 1;
        if session.listener.is_none() {
            session.deadline = deadline;
        }
        session.issues.len()
    }

    /// Remove a live session for completion. Expired sessions count as absent.
    pub fn take(&self, scan_id: &str) -> Option<PendingScan> {
        self.take_at(scan_id, Instant::now())
    }

    fn take_at(&self, scan_id: &str, now: Instant) -> Option<PendingScan> {
        let session = self.sessions.lock().remove(scan_id)?;
        if session.is_expired(now) {
            debug!(scan_id, "session expired before completion");
            return None;
        }
        Some(PendingScan {
            scan_id: scan_id.to_string(),
            issues: session.issues,
            chunks: session.chunks,
            listener: session.listener,
        })
    }

    /// Deliver a completion to whoever waits on its scan id and discard the
    /// session. Ingestion does not depend on a session existing.
    pub fn publish(&self, event: ScanCompleted) -> Delivery {
        self.publish_at(event, Instant::now())
    }

    fn publish_at(&self, event: ScanCompleted, now: Instant) -> Delivery {
        match self.take_at(&event.scan_id, now) {
            Some(pending) => pending.notify(&event.report_id),
            None => Delivery::NoSession,
        }
    }

    /// Drop every session registered by a closed socket. Returns how many.
    pub fn disconnect(&self, connection: Uuid) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, session| session.connection != Some(connection));
        before - sessions.len()
    }

    /// Drop expired sessions, returning their scan ids
    pub fn sweep(&self) -> Vec<String> {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> Vec<String> {
        let mut sessions = self.sessions.lock();
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, session)| session.is_expired(now))
            .map(|(scan_id, _)| scan_id.clone())
            .collect();
        for scan_id in &expired {
            sessions.remove(scan_id);
        }
        expired
    }

    pub fn contains(&self, scan_id: &str) -> bool {
        let now = Instant::now();
        self.sessions
            .lock()
            .get(scan_id)
            .map(|session| !session.is_expired(now))
            .unwrap_or(false)
    }

    /// Number of entries, including ones not yet swept
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}
