use crate::{
    event::{PointerId, PointerSample, ToolType},
    threshold::Thresholds,
    timer::{TimerKind, TimerToken},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerPhase {
    WindowClosed,
    WindowOpen,
    ForceActive,
}

/// Outstanding deadlines for one pointer, at most one per kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointerTimers {
    pub window_open: Option<TimerToken>,
    pub window_close: Option<TimerToken>,
    pub long_press: Option<TimerToken>,
}

impl PointerTimers {
    pub fn slot_mut(&mut self, kind: TimerKind) -> &mut Option<TimerToken> {
        match kind {
            TimerKind::WindowOpen => &mut self.window_open,
            TimerKind::WindowClose => &mut self.window_close,
            TimerKind::LongPress => &mut self.long_press,
        }
    }

    /// Clears the slot if it holds exactly `token`.
    pub fn take_matching(&mut self, token: TimerToken) -> bool {
        let slot = self.slot_mut(token.kind);
        if *slot == Some(token) {
            *slot = None;
            true
        } else {
            false
        }
    }

    pub fn take_all(&mut self) -> [Option<TimerToken>; 3] {
        [
            self.window_open.take(),
            self.window_close.take(),
            self.long_press.take(),
        ]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PointerState {
    pub id: PointerId,
    pub tool: ToolType,
    pub origin: (f32, f32),
    pub last: (f32, f32),
    pub down_ms: u64,
    /// Fixed by the first sample seen with the window open.
    pub thresholds: Option<Thresholds>,
    pub window_open: bool,
    pub force_active: bool,
    pub in_tap_region: bool,
    pub drag_blocked: bool,
    /// Set after the host refused this contact's begin; cleared once the
    /// sample falls back across the release threshold.
    pub awaiting_release: bool,
    pub timers: PointerTimers,
}

impl PointerState {
    pub fn new(sample: &PointerSample, down_ms: u64) -> Self {
        Self {
            id: sample.id,
            tool: sample.tool,
            origin: sample.position(),
            last: sample.position(),
            down_ms,
            thresholds: None,
            window_open: false,
            force_active: false,
            in_tap_region: true,
            drag_blocked: false,
            awaiting_release: false,
            timers: PointerTimers::default(),
        }
    }

    pub fn phase(&self) -> PointerPhase {
        if self.force_active {
            PointerPhase::ForceActive
        } else if self.window_open {
            PointerPhase::WindowOpen
        } else {
            PointerPhase::WindowClosed
        }
    }

    /// Activation is possible only with an open window, a fixed band, no
    /// drag block and no refusal still waiting for a release.
    pub fn can_activate(&self) -> bool {
        self.window_open
            && !self.force_active
            && !self.drag_blocked
            && !self.awaiting_release
            && self.thresholds.is_some()
    }
}
