//! Last-observed-state cache.

use aerolink_catalog::{Event, EventPattern, MessageDescriptor};
use aerolink_expect::StateLookup;
use aerolink_types::{MessageId, ParamValue};
use std::collections::HashMap;

/// Per-message slot. Map-like events keep one entry per key value so
/// `SensorStates(sensor=imu, ...)` does not clobber
/// `SensorStates(sensor=gps, ...)`.
#[derive(Debug, Clone)]
enum Slot {
    Single(Event),
    Keyed(Vec<(ParamValue, Event)>),
}

/// Remembers the last event observed for every message, unconditionally.
///
/// `check` and `check_wait` expectations are answered from here, and
/// the read-state API queries it directly. Float key values compare
/// within the configured tolerance, like everything else in matching.
#[derive(Debug, Clone)]
pub struct StateCache {
    slots: HashMap<MessageId, Slot>,
    float_tol: f64,
}

impl StateCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(float_tol: f64) -> Self {
        Self {
            slots: HashMap::new(),
            float_tol,
        }
    }

    /// Records one observed event.
    ///
    /// The schema decides the slot shape: with a key field, the event
    /// updates the entry for its key value; without one, it replaces
    /// the previous observation.
    pub fn update(&mut self, descriptor: &MessageDescriptor, event: Event) {
        let key = descriptor.key().and_then(|k| event.get(k)).cloned();
        match key {
            None => {
                self.slots.insert(event.id(), Slot::Single(event));
            }
            Some(key) => {
                let slot = self
                    .slots
                    .entry(event.id())
                    .or_insert_with(|| Slot::Keyed(Vec::new()));
                // A schema change between Single and Keyed should not
                // happen, but an old Single slot is simply replaced.
                let Slot::Keyed(entries) = slot else {
                    *slot = Slot::Keyed(vec![(key, event)]);
                    return;
                };
                match entries
                    .iter_mut()
                    .find(|(k, _)| k.matches(&key, self.float_tol))
                {
                    Some((_, stored)) => *stored = event,
                    None => entries.push((key, event)),
                }
            }
        }
    }

    /// Returns the cached event matching the pattern, if any.
    ///
    /// For keyed slots, a pattern that pins the key field consults only
    /// the entry for that key; otherwise entries are scanned in first
    /// observation order.
    #[must_use]
    pub fn get(&self, pattern: &EventPattern) -> Option<Event> {
        match self.slots.get(&pattern.descriptor().id())? {
            Slot::Single(event) => {
                pattern.matches(event, self.float_tol).then(|| event.clone())
            }
            Slot::Keyed(entries) => match pattern.key_value() {
                Some(key) => entries
                    .iter()
                    .find(|(k, _)| k.matches(key, self.float_tol))
                    .filter(|(_, ev)| pattern.matches(ev, self.float_tol))
                    .map(|(_, ev)| ev.clone()),
                None => entries
                    .iter()
                    .map(|(_, ev)| ev)
                    .find(|ev| pattern.matches(ev, self.float_tol))
                    .cloned(),
            },
        }
    }

    /// Drops every observation. Called when the link is re-established,
    /// since the peer's state must be relearned.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Returns the number of messages with at least one observation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` when nothing has been observed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl StateLookup for StateCache {
    fn lookup(&self, pattern: &EventPattern, _float_tol: f64) -> Option<Event> {
        // The cache was built with the session's tolerance already.
        self.get(pattern)
    }
}
