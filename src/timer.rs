use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use crate::{config::WindowConfig, event::PointerId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    WindowOpen,
    WindowClose,
    LongPress,
}

/// Identity of one scheduled deadline.
///
/// Generations are handed out monotonically for the lifetime of an engine, so
/// a token from a cancelled or reset touch can never match live state again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerToken {
    pub pointer: PointerId,
    pub kind: TimerKind,
    pub generation: u64,
}

/// Host-side scheduler the engine hands its deadlines to.
///
/// Deadlines are absolute milliseconds on the same clock as
/// [`RawEvent::event_ms`](crate::RawEvent). When a deadline passes the host
/// calls [`GestureEngine::on_timer`](crate::GestureEngine::on_timer) with the
/// token. Cancelling a token that already fired or was never scheduled must
/// be a no-op.
pub trait TimerService {
    fn schedule(&mut self, token: TimerToken, deadline_ms: u64);
    fn cancel(&mut self, token: TimerToken);
}

#[derive(Default)]
struct QueueState {
    pending: BTreeMap<(u64, u64), TimerToken>,
}

/// Deterministic in-process [`TimerService`].
///
/// Clones share one queue, so the host can keep a handle for polling while
/// the engine owns another for scheduling.
#[derive(Clone, Default)]
pub struct TimerQueue {
    inner: Rc<RefCell<QueueState>>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns the earliest token due at `now_ms`, if any.
    pub fn pop_due(&self, now_ms: u64) -> Option<(TimerToken, u64)> {
        let mut state = self.inner.borrow_mut();
        let (&(deadline_ms, generation), _) = state.pending.first_key_value()?;
        if deadline_ms > now_ms {
            return None;
        }
        state
            .pending
            .remove(&(deadline_ms, generation))
            .map(|token| (token, deadline_ms))
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.inner
            .borrow()
            .pending
            .first_key_value()
            .map(|(&(deadline_ms, _), _)| deadline_ms)
    }

    pub fn pending(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.inner
            .borrow()
            .pending
            .values()
            .any(|pending| *pending == token)
    }
}

impl TimerService for TimerQueue {
    fn schedule(&mut self, token: TimerToken, deadline_ms: u64) {
        self.inner
            .borrow_mut()
            .pending
            .insert((deadline_ms, token.generation), token);
    }

    fn cancel(&mut self, token: TimerToken) {
        self.inner
            .borrow_mut()
            .pending
            .retain(|_, pending| *pending != token);
    }
}

/// How a new pointer's detection window starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowPlan {
    OpenNow { close_after_ms: Option<u64> },
    OpenAfter(u64),
}

pub fn window_plan(window: &WindowConfig) -> WindowPlan {
    if window.delay_ms > 0 {
        WindowPlan::OpenAfter(window.delay_ms as u64)
    } else {
        WindowPlan::OpenNow {
            close_after_ms: close_after_ms(window),
        }
    }
}

/// Time-limited windows only; `0` and negative durations close on release or
/// touch end instead.
pub fn close_after_ms(window: &WindowConfig) -> Option<u64> {
    (window.time_ms > 0).then_some(window.time_ms as u64)
}
