//! Self-echo suppression.
//!
//! When the local actor submits an incident or posts a status update, the
//! store broadcasts the change to every client, including the one that made
//! it. The originating client marks the change id before the write; when
//! the echo arrives, [`SelfEchoTracker::consume`] reports it once so the
//! caller can skip the notification and re-render.
//!
//! Suppression is at-most-once per mark. A duplicate delivery of the same
//! echo after it was consumed is treated as a fresh event.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use urban_guardian_incident_models::IncidentId;

/// Default number of pending marks kept.
pub const DEFAULT_ECHO_CAPACITY: usize = 16;

/// Default lifetime of a pending mark, in seconds.
pub const DEFAULT_ECHO_TTL_SECS: i64 = 30;

/// Identifier of a self-originated change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ChangeId {
    /// A newly submitted incident.
    Incident(IncidentId),
    /// A status update posted to an incident.
    Update(IncidentId),
}

impl std::fmt::Display for ChangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incident(id) => write!(f, "incident:{id}"),
            Self::Update(id) => write!(f, "update:{id}"),
        }
    }
}

/// Bounded set of pending self-originated change ids with a TTL.
#[derive(Debug, Clone)]
pub struct SelfEchoTracker {
    pending: VecDeque<(ChangeId, DateTime<Utc>)>,
    capacity: usize,
    ttl: Duration,
}

impl Default for SelfEchoTracker {
    fn default() -> Self {
        Self::new(DEFAULT_ECHO_CAPACITY, Duration::seconds(DEFAULT_ECHO_TTL_SECS))
    }
}

impl SelfEchoTracker {
    /// Creates a tracker holding at most `capacity` marks (minimum 1), each
    /// valid for `ttl`.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            pending: VecDeque::with_capacity(capacity),
            capacity,
            ttl,
        }
    }

    /// Records a change the local actor is about to make.
    ///
    /// Marking an id that is already pending refreshes its timestamp. When
    /// the tracker is full the oldest mark is evicted.
    pub fn mark(&mut self, id: ChangeId, now: DateTime<Utc>) {
        self.prune(now);
        if let Some(entry) = self.pending.iter_mut().find(|(pending, _)| *pending == id) {
            entry.1 = now;
            return;
        }
        if self.pending.len() == self.capacity
            && let Some((evicted, _)) = self.pending.pop_front()
        {
            log::debug!("Self-echo tracker full, evicting {evicted}");
        }
        self.pending.push_back((id, now));
    }

    /// Returns `true` exactly once for a pending, unexpired mark, removing
    /// it.
    pub fn consume(&mut self, id: ChangeId, now: DateTime<Utc>) -> bool {
        self.prune(now);
        if let Some(index) = self.pending.iter().position(|(pending, _)| *pending == id) {
            self.pending.remove(index);
            log::trace!("Suppressing self-echo {id}");
            true
        } else {
            false
        }
    }

    /// Returns `true` if `id` has an unexpired mark, without consuming it.
    #[must_use]
    pub fn is_pending(&self, id: ChangeId, now: DateTime<Utc>) -> bool {
        self.pending
            .iter()
            .any(|(pending, at)| *pending == id && !self.is_expired(*at, now))
    }

    /// Number of marks currently held (expired marks included until the
    /// next mutation).
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if no marks are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn is_expired(&self, marked_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(marked_at) > self.ttl
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.pending
            .retain(|(_, at)| now.signed_duration_since(*at) <= ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn suppresses_exactly_once() {
        let mut tracker = SelfEchoTracker::default();
        tracker.mark(ChangeId::Incident(5), t0());
        assert!(tracker.consume(ChangeId::Incident(5), t0()));
        assert!(!tracker.consume(ChangeId::Incident(5), t0()));
    }

    #[test]
    fn kinds_are_distinct() {
        let mut tracker = SelfEchoTracker::default();
        tracker.mark(ChangeId::Update(5), t0());
        assert!(!tracker.consume(ChangeId::Incident(5), t0()));
        assert!(tracker.consume(ChangeId::Update(5), t0()));
    }

    #[test]
    fn tracks_several_in_flight_changes() {
        let mut tracker = SelfEchoTracker::default();
        tracker.mark(ChangeId::Incident(1), t0());
        tracker.mark(ChangeId::Update(1), t0());
        tracker.mark(ChangeId::Incident(2), t0());
        assert_eq!(tracker.len(), 3);
        assert!(tracker.consume(ChangeId::Incident(2), t0()));
        assert!(tracker.consume(ChangeId::Incident(1), t0()));
        assert!(tracker.consume(ChangeId::Update(1), t0()));
        assert!(tracker.is_empty());
    }

    #[test]
    fn expired_marks_are_not_honored() {
        let mut tracker = SelfEchoTracker::new(4, Duration::seconds(10));
        tracker.mark(ChangeId::Incident(1), t0());
        assert!(tracker.is_pending(ChangeId::Incident(1), t0() + Duration::seconds(10)));
        assert!(!tracker.is_pending(ChangeId::Incident(1), t0() + Duration::seconds(11)));
        assert!(!tracker.consume(ChangeId::Incident(1), t0() + Duration::seconds(11)));
        assert!(tracker.is_empty());
    }

    #[test]
    fn remarking_refreshes_ttl() {
        let mut tracker = SelfEchoTracker::new(4, Duration::seconds(10));
        tracker.mark(ChangeId::Incident(1), t0());
        tracker.mark(ChangeId::Incident(1), t0() + Duration::seconds(8));
        assert_eq!(tracker.len(), 1);
        assert!(tracker.consume(ChangeId::Incident(1), t0() + Duration::seconds(15)));
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut tracker = SelfEchoTracker::new(2, Duration::seconds(30));
        tracker.mark(ChangeId::Incident(1), t0());
        tracker.mark(ChangeId::Incident(2), t0());
        tracker.mark(ChangeId::Incident(3), t0());
        assert_eq!(tracker.len(), 2);
        assert!(!tracker.consume(ChangeId::Incident(1), t0()));
        assert!(tracker.consume(ChangeId::Incident(2), t0()));
        assert!(tracker.consume(ChangeId::Incident(3), t0()));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut tracker = SelfEchoTracker::new(0, Duration::seconds(30));
        tracker.mark(ChangeId::Incident(1), t0());
        assert!(tracker.consume(ChangeId::Incident(1), t0()));
    }
}
