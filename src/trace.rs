use crate::{dispatch::GestureKind, event::PointerId};

pub const DECISION_LOG_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
#[repr(u8)]
pub enum EngineStateId {
    #[default]
    Idle = 0,
    Tracking = 1,
    Claimed = 2,
    Draining = 3,
    /// The host refused a begin after its cancel; still classifying.
    Refused = 4,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum Decision {
    #[default]
    None,
    /// Forwarded to the host live.
    Pass,
    /// Held in the replay buffer.
    Hold,
    Suppress,
    /// Held events delivered to the host.
    Replay { count: u16 },
    /// Held events dropped because the host abandoned the sequence.
    Discard { count: u16 },
    RejectedTool,
    Baseline,
    WindowOpened,
    WindowClosed,
    /// A gesture callback fired and, where it can refuse, was accepted.
    Gesture(GestureKind),
    Refused(GestureKind),
    /// A second contact ended tracking and returned the stream to the host.
    Abandoned,
    Superseded,
    StaleTimer,
    ConfigApplied,
    ConfigDeferred,
    Reset,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DecisionRecord {
    pub t_ms: u64,
    pub pointer: Option<PointerId>,
    pub decision: Decision,
}

/// Most recent decisions, oldest dropped first once full.
#[derive(Clone, Debug, Default)]
pub struct DecisionLog {
    overflow: bool,
    records: heapless::Vec<DecisionRecord, DECISION_LOG_CAPACITY>,
}

impl DecisionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: DecisionRecord) {
        if self.records.push(record).is_err() {
            self.overflow = true;
            let _ = self.records.remove(0);
            let _ = self.records.push(record);
        }
    }

    pub fn records(&self) -> &[DecisionRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&DecisionRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn overflowed(&self) -> bool {
        self.overflow
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.overflow = false;
    }

    pub fn contains(&self, decision: Decision) -> bool {
        self.records.iter().any(|record| record.decision == decision)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineTraceSample {
    pub t_ms: u64,
    pub state_id: EngineStateId,
    pub last_decision: Decision,
    pub pointer_count: u8,
    pub owner: Option<PointerId>,
    pub replay_len: u16,
    pub stale_timer_count: u32,
}
