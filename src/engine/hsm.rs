use std::collections::BTreeMap;

use log::debug;
use statig::prelude::*;

use super::utils::{action_pointer_id, saturating_u16, squared_distance};
use super::*;
use crate::{
    dispatch::GestureKind,
    event::MotionAction,
    replay::EventReplayBuffer,
    timer::TimerKind,
    trace::{Decision, DecisionRecord},
};

mod core;

pub(super) struct GestureHsm {
    config: GestureConfig,
    pending_config: Option<GestureConfig>,
    slop_sq_px: f32,
    pointers: BTreeMap<PointerId, PointerState>,
    owner: Option<PointerId>,
    claim: Option<ClaimKind>,
    replay: EventReplayBuffer,
    last_event: Option<RawEvent>,
    last_ms: u64,
    next_generation: u64,
    state_id: EngineStateId,
    last_decision: Decision,
    stale_timer_count: u32,
    decisions: DecisionLog,
}

#[state_machine(initial = "State::idle()")]
impl GestureHsm {
    #[state]
    fn idle(&mut self, context: &mut DispatchContext, event: &GestureHsmEvent) -> Outcome<State> {
        match event {
            GestureHsmEvent::Motion(raw) => {
                self.last_ms = raw.event_ms;
                match raw.action {
                    MotionAction::Down => self.begin_sequence(context, raw),
                    _ => {
                        self.pass(context, raw);
                        Handled
                    }
                }
            }
            GestureHsmEvent::Timer { token, now_ms } => {
                self.stale_timer(*token, *now_ms);
                Handled
            }
            GestureHsmEvent::Configure(config) => {
                self.apply_config(*config);
                Handled
            }
            GestureHsmEvent::Reset => {
                self.record(None, Decision::Reset);
                Handled
            }
        }
    }

    #[state(superstate = "live")]
    fn tracking(
        &mut self,
        context: &mut DispatchContext,
        event: &GestureHsmEvent,
    ) -> Outcome<State> {
        match event {
            GestureHsmEvent::Motion(raw) => {
                self.last_ms = raw.event_ms;
                self.last_event = Some(raw.clone());
                match raw.action {
                    MotionAction::Down => Super,
                    MotionAction::PointerDown => self.tracking_pointer_down(context, raw),
                    MotionAction::Move => self.tracking_move(context, raw),
                    MotionAction::PointerUp => {
                        if let Some(id) = action_pointer_id(raw) {
                            self.drop_pointer(context, id);
                        }
                        self.pass(context, raw);
                        Handled
                    }
                    MotionAction::Up => self.tracking_up(context, raw),
                    MotionAction::Cancel => {
                        self.discard_replay();
                        context.forward(raw);
                        self.record(action_pointer_id(raw), Decision::Pass);
                        self.end_sequence(context);
                        self.to_idle()
                    }
                }
            }
            GestureHsmEvent::Timer { token, now_ms } => {
                self.last_ms = *now_ms;
                if !self.take_live_timer(*token) {
                    self.stale_timer(*token, *now_ms);
                    return Handled;
                }
                match token.kind {
                    TimerKind::WindowOpen | TimerKind::WindowClose => {
                        self.window_timer(context, *token, *now_ms);
                        Handled
                    }
                    TimerKind::LongPress => self.long_press(context, token.pointer),
                }
            }
            _ => Super,
        }
    }

    #[state(superstate = "live")]
    fn claimed(&mut self, context: &mut DispatchContext, event: &GestureHsmEvent) -> Outcome<State> {
        match event {
            GestureHsmEvent::Motion(raw) => {
                self.last_ms = raw.event_ms;
                match raw.action {
                    MotionAction::Down => Super,
                    MotionAction::PointerDown => self.claimed_pointer_down(context, raw),
                    MotionAction::Move => {
                        if self.claim == Some(ClaimKind::Force) {
                            self.claimed_move(context, raw);
                        }
                        self.suppress(context, raw);
                        Handled
                    }
                    MotionAction::PointerUp => self.claimed_pointer_up(context, raw),
                    MotionAction::Up => {
                        if self.claim == Some(ClaimKind::Force) {
                            let (x, y) = raw.action_pointer().map_or_else(
                                || self.owner_position(),
                                |pointer| pointer.position(),
                            );
                            let _ = context.callback.on_gesture_finish(x, y);
                            self.record(self.owner, Decision::Gesture(GestureKind::Finish));
                            debug!("force gesture finished x={x} y={y}");
                        }
                        self.suppress(context, raw);
                        self.end_sequence(context);
                        self.to_idle()
                    }
                    MotionAction::Cancel => {
                        self.cancel_gesture(context);
                        self.suppress(context, raw);
                        self.end_sequence(context);
                        self.to_idle()
                    }
                }
            }
            GestureHsmEvent::Timer { token, now_ms } => {
                self.last_ms = *now_ms;
                if token.kind != TimerKind::LongPress && self.take_live_timer(*token) {
                    self.window_timer(context, *token, *now_ms);
                } else {
                    self.stale_timer(*token, *now_ms);
                }
                Handled
            }
            _ => Super,
        }
    }

    /// Ownership is gone but the host was already cancelled, so everything
    /// up to the end of the touch is swallowed.
    #[state(superstate = "live")]
    fn draining(
        &mut self,
        context: &mut DispatchContext,
        event: &GestureHsmEvent,
    ) -> Outcome<State> {
        match event {
            GestureHsmEvent::Motion(raw) => {
                self.last_ms = raw.event_ms;
                match raw.action {
                    MotionAction::Down => Super,
                    MotionAction::Up | MotionAction::Cancel => {
                        self.suppress(context, raw);
                        self.end_sequence(context);
                        self.to_idle()
                    }
                    _ => {
                        self.suppress(context, raw);
                        Handled
                    }
                }
            }
            GestureHsmEvent::Timer { token, now_ms } => {
                self.stale_timer(*token, *now_ms);
                Handled
            }
            _ => Super,
        }
    }

    /// The host refused a begin after it was already cancelled. Events stay
    /// suppressed while contacts keep being classified for another begin.
    #[state(superstate = "live")]
    fn refused(
        &mut self,
        context: &mut DispatchContext,
        event: &GestureHsmEvent,
    ) -> Outcome<State> {
        match event {
            GestureHsmEvent::Motion(raw) => {
                self.last_ms = raw.event_ms;
                self.last_event = Some(raw.clone());
                match raw.action {
                    MotionAction::Down => Super,
                    MotionAction::PointerDown => self.refused_pointer_down(context, raw),
                    MotionAction::Move => self.refused_move(context, raw),
                    MotionAction::PointerUp => {
                        if let Some(id) = action_pointer_id(raw) {
                            self.drop_pointer(context, id);
                        }
                        self.suppress(context, raw);
                        Handled
                    }
                    MotionAction::Up | MotionAction::Cancel => {
                        self.suppress(context, raw);
                        self.end_sequence(context);
                        self.to_idle()
                    }
                }
            }
            GestureHsmEvent::Timer { token, now_ms } => {
                self.last_ms = *now_ms;
                if token.kind != TimerKind::LongPress && self.take_live_timer(*token) {
                    self.window_timer(context, *token, *now_ms);
                } else {
                    self.stale_timer(*token, *now_ms);
                }
                Handled
            }
            _ => Super,
        }
    }

    #[superstate]
    fn live(&mut self, context: &mut DispatchContext, event: &GestureHsmEvent) -> Outcome<State> {
        match event {
            GestureHsmEvent::Motion(raw) if raw.action == MotionAction::Down => {
                // A fresh Down while a sequence is live means the host lost
                // the previous Up; start over from this one.
                self.cancel_gesture(context);
                self.discard_replay();
                self.record(self.owner, Decision::Superseded);
                debug!("sequence superseded by new down at {}ms", raw.event_ms);
                self.end_sequence(context);
                self.begin_sequence(context, raw)
            }
            GestureHsmEvent::Configure(config) => {
                self.pending_config = Some(*config);
                self.record(None, Decision::ConfigDeferred);
                Handled
            }
            GestureHsmEvent::Reset => {
                self.cancel_gesture(context);
                self.discard_replay();
                self.end_sequence(context);
                self.record(None, Decision::Reset);
                debug!("engine reset mid-sequence");
                self.to_idle()
            }
            _ => Handled,
        }
    }
}
