//! Time-ordered event calendar with lazy cancellation.
//!
//! Events are kept in an indexed binary min-heap ordered by
//! `(time, kind rank, sequence number)`. Two side tables make targeted
//! operations cheap:
//!
//! - a key index from `(time, kind, agent)` to sequence number, holding
//!   live events only;
//! - a position map from sequence number to heap slot, holding every
//!   resident entry.
//!
//! [`EventCalendar::cancel`] marks an event [`EventKind::Cancelled`] and
//! drops its key; the entry stays resident until it reaches the top and is
//! discarded by [`EventCalendar::pop_next`]. [`EventCalendar::reschedule`]
//! changes an event's time in place and sifts it back into heap order.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use symbiosis_types::{AgentId, EventKind};

/// Errors raised by calendar operations.
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    /// No live event has this key.
    #[error("no pending {kind} event for agent {agent:?} at t={time}")]
    UnknownEvent {
        /// Event time.
        time: f64,
        /// Event kind.
        kind: EventKind,
        /// Owning agent.
        agent: Option<AgentId>,
    },

    /// Event times must be comparable.
    #[error("event time {time} is not a number")]
    InvalidTime {
        /// The offending time.
        time: f64,
    },

    /// A live event with this key already exists.
    #[error("a {kind} event for agent {agent:?} at t={time} is already pending")]
    DuplicateEvent {
        /// Event time.
        time: f64,
        /// Event kind.
        kind: EventKind,
        /// Owning agent.
        agent: Option<AgentId>,
    },

    /// The cancelled sentinel cannot be scheduled.
    #[error("cancelled events cannot be scheduled")]
    CancelledKind,
}

/// A scheduled event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    /// Simulated time in days.
    pub time: f64,
    /// What happens; [`EventKind::Cancelled`] once cancelled.
    pub kind: EventKind,
    /// The agent the event belongs to (`None` for arrivals).
    pub agent: Option<AgentId>,
    /// Insertion order, unique per calendar.
    pub seq: u64,
}

impl Event {
    fn order(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.kind.rank().cmp(&other.kind.rank()))
            .then_with(|| self.seq.cmp(&other.seq))
    }

    fn key(&self) -> EventKey {
        EventKey::new(self.time, self.kind, self.agent)
    }
}

/// Lookup key of a live event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EventKey {
    time_bits: u64,
    kind: EventKind,
    agent: Option<AgentId>,
}

impl EventKey {
    fn new(time: f64, kind: EventKind, agent: Option<AgentId>) -> Self {
        Self {
            time_bits: time.to_bits(),
            kind,
            agent,
        }
    }
}

/// The pending-event queue.
#[derive(Debug, Default)]
pub struct EventCalendar {
    heap: Vec<Event>,
    positions: BTreeMap<u64, usize>,
    index: BTreeMap<EventKey, u64>,
    next_seq: u64,
}

impl EventCalendar {
    /// Create an empty calendar.
    pub const fn new() -> Self {
        Self {
            heap: Vec::new(),
            positions: BTreeMap::new(),
            index: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Resident entries, including cancelled ones not yet discarded.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Live (non-cancelled) entries.
    pub fn pending(&self) -> usize {
        self.index.len()
    }

    /// Whether no live event remains.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Whether a live event with this key exists.
    pub fn contains(&self, time: f64, kind: EventKind, agent: Option<AgentId>) -> bool {
        self.index.contains_key(&EventKey::new(time, kind, agent))
    }

    /// Schedule an event and return its sequence number.
    ///
    /// # Errors
    ///
    /// Rejects NaN times, the cancelled sentinel, and keys that are already
    /// pending.
    pub fn insert(
        &mut self,
        time: f64,
        kind: EventKind,
        agent: Option<AgentId>,
    ) -> Result<u64, CalendarError> {
        if time.is_nan() {
            return Err(CalendarError::InvalidTime { time });
        }
        if kind == EventKind::Cancelled {
            return Err(CalendarError::CancelledKind);
        }
        let key = EventKey::new(time, kind, agent);
        if self.index.contains_key(&key) {
            return Err(CalendarError::DuplicateEvent { time, kind, agent });
        }

        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);

        let slot = self.heap.len();
        self.heap.push(Event {
            time,
            kind,
            agent,
            seq,
        });
        self.positions.insert(seq, slot);
        self.index.insert(key, seq);
        self.sift_up(slot);
        Ok(seq)
    }

    /// Remove and return the earliest live event.
    pub fn pop_next(&mut self) -> Option<Event> {
        while let Some(event) = self.pop_root() {
            if event.kind != EventKind::Cancelled {
                self.index.remove(&event.key());
                return Some(event);
            }
        }
        None
    }

    /// Time of the earliest live event, discarding cancelled entries on top.
    pub fn peek_time(&mut self) -> Option<f64> {
        while let Some(top) = self.heap.first() {
            if top.kind != EventKind::Cancelled {
                return Some(top.time);
            }
            self.pop_root();
        }
        None
    }

    /// Cancel a pending event. Its entry is discarded lazily.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::UnknownEvent`] if no live event has the key.
    pub fn cancel(
        &mut self,
        time: f64,
        kind: EventKind,
        agent: Option<AgentId>,
    ) -> Result<(), CalendarError> {
        let seq = self
            .index
            .remove(&EventKey::new(time, kind, agent))
            .ok_or(CalendarError::UnknownEvent { time, kind, agent })?;
        let slot = self.slot_of(seq, time, kind, agent)?;
        if let Some(event) = self.heap.get_mut(slot) {
            event.kind = EventKind::Cancelled;
        }
        // The cancelled rank sorts after every live kind at the same time.
        self.sift_down(slot);
        Ok(())
    }

    /// Move a pending event from `old_time` to `new_time`, keeping its kind
    /// and sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::UnknownEvent`] if no live event has the old
    /// key, [`CalendarError::InvalidTime`] for a NaN time, and
    /// [`CalendarError::DuplicateEvent`] if the new key is already taken.
    pub fn reschedule(
        &mut self,
        old_time: f64,
        new_time: f64,
        kind: EventKind,
        agent: Option<AgentId>,
    ) -> Result<(), CalendarError> {
        if new_time.is_nan() {
            return Err(CalendarError::InvalidTime { time: new_time });
        }
        let old_key = EventKey::new(old_time, kind, agent);
        let new_key = EventKey::new(new_time, kind, agent);
        if old_key == new_key {
            return if self.index.contains_key(&old_key) {
                Ok(())
            } else {
                Err(CalendarError::UnknownEvent {
                    time: old_time,
                    kind,
                    agent,
                })
            };
        }
        if self.index.contains_key(&new_key) {
            return Err(CalendarError::DuplicateEvent {
                time: new_time,
                kind,
                agent,
            });
        }
        let seq = self.index.remove(&old_key).ok_or(CalendarError::UnknownEvent {
            time: old_time,
            kind,
            agent,
        })?;
        let slot = self.slot_of(seq, old_time, kind, agent)?;
        if let Some(event) = self.heap.get_mut(slot) {
            event.time = new_time;
        }
        self.index.insert(new_key, seq);

        if new_time < old_time {
            self.sift_up(slot);
        } else {
            self.sift_down(slot);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Heap maintenance
    // -----------------------------------------------------------------------

    fn slot_of(
        &self,
        seq: u64,
        time: f64,
        kind: EventKind,
        agent: Option<AgentId>,
    ) -> Result<usize, CalendarError> {
        self.positions
            .get(&seq)
            .copied()
            .ok_or(CalendarError::UnknownEvent { time, kind, agent })
    }

    fn pop_root(&mut self) -> Option<Event> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len().saturating_sub(1);
        self.swap(0, last);
        let event = self.heap.pop()?;
        self.positions.remove(&event.seq);
        self.sift_down(0);
        Some(event)
    }

    fn less(&self, a: usize, b: usize) -> bool {
        match (self.heap.get(a), self.heap.get(b)) {
            (Some(x), Some(y)) => x.order(y) == Ordering::Less,
            _ => false,
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b || a >= self.heap.len() || b >= self.heap.len() {
            return;
        }
        self.heap.swap(a, b);
        for slot in [a, b] {
            if let Some(event) = self.heap.get(slot) {
                self.positions.insert(event.seq, slot);
            }
        }
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = slot.saturating_sub(1) / 2;
            if !self.less(slot, parent) {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        let len = self.heap.len();
        loop {
            let left = slot.saturating_mul(2).saturating_add(1);
            if left >= len {
                break;
            }
            let right = left.saturating_add(1);
            let child = if right < len && self.less(right, left) {
                right
            } else {
                left
            };
            if !self.less(child, slot) {
                break;
            }
            self.swap(slot, child);
            slot = child;
        }
    }
}
