use log::{trace, warn};

use super::*;
use crate::timer::close_after_ms;

impl GestureHsm {
    fn next_token(&mut self, pointer: PointerId, kind: TimerKind) -> TimerToken {
        self.next_generation += 1;
        TimerToken {
            pointer,
            kind,
            generation: self.next_generation,
        }
    }

    /// Schedules `kind` for `id`, replacing any deadline of the same kind.
    pub(in super::super) fn schedule(
        &mut self,
        context: &mut DispatchContext,
        id: PointerId,
        kind: TimerKind,
        deadline_ms: u64,
    ) {
        if !self.pointers.contains_key(&id) {
            return;
        }
        let token = self.next_token(id, kind);
        if let Some(pointer) = self.pointers.get_mut(&id) {
            if let Some(previous) = pointer.timers.slot_mut(kind).replace(token) {
                context.timers.cancel(previous);
            }
        }
        context.timers.schedule(token, deadline_ms);
        trace!("schedule {kind:?} for pointer {id} at {deadline_ms}ms");
    }

    pub(in super::super) fn cancel_timer(
        &mut self,
        context: &mut DispatchContext,
        id: PointerId,
        kind: TimerKind,
    ) {
        let token = self
            .pointers
            .get_mut(&id)
            .and_then(|pointer| pointer.timers.slot_mut(kind).take());
        if let Some(token) = token {
            context.timers.cancel(token);
            trace!("cancel {kind:?} for pointer {id}");
        }
    }

    pub(in super::super) fn cancel_long_presses(&mut self, context: &mut DispatchContext) {
        for pointer in self.pointers.values_mut() {
            if let Some(token) = pointer.timers.long_press.take() {
                context.timers.cancel(token);
            }
        }
    }

    pub(in super::super) fn open_window(
        &mut self,
        context: &mut DispatchContext,
        id: PointerId,
        now_ms: u64,
    ) {
        match self.pointers.get_mut(&id) {
            Some(pointer) => pointer.window_open = true,
            None => return,
        }
        self.cancel_timer(context, id, TimerKind::WindowOpen);
        if let Some(after_ms) = close_after_ms(&self.config.window) {
            self.schedule(context, id, TimerKind::WindowClose, now_ms + after_ms);
        }
        self.record(Some(id), Decision::WindowOpened);
    }

    pub(in super::super) fn close_window(
        &mut self,
        context: &mut DispatchContext,
        id: PointerId,
    ) {
        match self.pointers.get_mut(&id) {
            Some(pointer) if pointer.window_open => pointer.window_open = false,
            _ => return,
        }
        self.cancel_timer(context, id, TimerKind::WindowClose);
        self.record(Some(id), Decision::WindowClosed);
        if !self.any_window_open() {
            // Nothing can claim the held moves any more.
            self.flush_replay(context);
        }
    }

    pub(in super::super) fn window_timer(
        &mut self,
        context: &mut DispatchContext,
        token: TimerToken,
        now_ms: u64,
    ) {
        match token.kind {
            TimerKind::WindowOpen => self.open_window(context, token.pointer, now_ms),
            TimerKind::WindowClose => self.close_window(context, token.pointer),
            TimerKind::LongPress => {}
        }
    }

    /// Accepts `token` only if it is the one currently stored for its
    /// pointer, consuming it.
    pub(in super::super) fn take_live_timer(&mut self, token: TimerToken) -> bool {
        self.pointers
            .get_mut(&token.pointer)
            .is_some_and(|pointer| pointer.timers.take_matching(token))
    }

    pub(in super::super) fn stale_timer(&mut self, token: TimerToken, now_ms: u64) {
        self.stale_timer_count = self.stale_timer_count.saturating_add(1);
        self.record(Some(token.pointer), Decision::StaleTimer);
        if self.pointers.contains_key(&token.pointer) {
            warn!(
                "dropping stale {:?} timer for live pointer {} (generation {}) at {now_ms}ms",
                token.kind, token.pointer, token.generation
            );
        } else {
            trace!(
                "dropping {:?} timer for gone pointer {} at {now_ms}ms",
                token.kind,
                token.pointer
            );
        }
    }
}
