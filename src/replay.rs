use std::mem;

use crate::event::RawEvent;

/// Moves held back from the host while a detection window is open.
///
/// Events leave the buffer oldest-first and exactly once, either through
/// [`take`](Self::take) for delivery or [`discard`](Self::discard) when the
/// host is abandoning the sequence anyway.
#[derive(Clone, Debug, Default)]
pub struct EventReplayBuffer {
    events: Vec<RawEvent>,
}

impl EventReplayBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hold(&mut self, event: RawEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Empties the buffer, returning the held events in arrival order.
    pub fn take(&mut self) -> Vec<RawEvent> {
        mem::take(&mut self.events)
    }

    /// Drops everything held and returns how many events were dropped.
    pub fn discard(&mut self) -> usize {
        let dropped = self.events.len();
        self.events.clear();
        dropped
    }
}
