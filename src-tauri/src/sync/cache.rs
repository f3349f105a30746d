use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::FetchError;
use crate::models::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryStatus {
    /// Nothing requested yet.
    Idle,
    /// First fetch in flight, no data yet.
    Loading,
    /// Last settled fetch succeeded.
    Ready,
    /// Last settled fetch failed. `data` still holds the last good record, if any.
    Error,
}

/// Latest known server state for one key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub status: EntryStatus,
    pub data: Option<Resource>,
    pub error: Option<FetchError>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// A request for this key has been issued and not yet settled.
    pub validating: bool,
}

impl Default for CacheEntry {
    fn default() -> Self {
        Self {
            status: EntryStatus::Idle,
            data: None,
            error: None,
            last_fetched_at: None,
            validating: false,
        }
    }
}

impl CacheEntry {
    pub fn is_loading(&self) -> bool {
        self.status == EntryStatus::Loading
    }

    pub(crate) fn begin_fetch(&mut self) {
        self.validating = true;
        if self.status == EntryStatus::Idle {
            self.status = EntryStatus::Loading;
        }
    }

    /// Applies a settled response. Errors never clear previously good data.
    pub(crate) fn settle(&mut self, result: Result<Resource, FetchError>, at: DateTime<Utc>, latest: bool) {
        match result {
            Ok(data) => {
                self.status = EntryStatus::Ready;
                self.data = Some(data);
                self.error = None;
                self.last_fetched_at = Some(at);
            }
            Err(err) => {
                self.status = EntryStatus::Error;
                self.error = Some(err);
            }
        }
        if latest {
            self.validating = false;
        }
    }

    /// The pending request will never be applied; drop the in-progress markers.
    pub(crate) fn abandon(&mut self) {
        self.validating = false;
        if self.status == EntryStatus::Loading {
            self.status = EntryStatus::Idle;
        }
    }
}

/// Identity of one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
    pub seq: u64,
    /// Set only for scheduled fetches, which belong to one subscription run.
    pub generation: Option<u64>,
}

/// Enforces last-issued-wins per key. A generation spans one run of
/// subscriptions; scheduled responses from a retired generation are dropped.
/// On-demand fetches are not scoped and always land in the entry.
#[derive(Debug, Default)]
pub(crate) struct Sequencer {
    issued: u64,
    applied: u64,
    generation: u64,
}

impl Sequencer {
    pub fn issue(&mut self) -> Ticket {
        self.issued += 1;
        Ticket {
            seq: self.issued,
            generation: None,
        }
    }

    pub fn issue_scheduled(&mut self) -> Ticket {
        Ticket {
            generation: Some(self.generation),
            ..self.issue()
        }
    }

    /// False for a scheduled ticket whose subscription run has ended.
    pub fn in_scope(&self, ticket: Ticket) -> bool {
        ticket.generation.map_or(true, |g| g == self.generation)
    }

    /// True if a response for `ticket` may be written to the entry.
    pub fn accept(&mut self, ticket: Ticket) -> bool {
        if !self.in_scope(ticket) || ticket.seq <= self.applied {
            return false;
        }
        self.applied = ticket.seq;
        true
    }

    pub fn is_latest(&self, ticket: Ticket) -> bool {
        ticket.seq == self.issued
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn retire(&mut self) {
        self.generation += 1;
    }
}
