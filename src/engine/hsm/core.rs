use log::trace;

use super::*;
use crate::{
    event::PointerSample,
    timer::{window_plan, WindowPlan},
};

mod force;
mod timers;

impl GestureHsm {
    pub(crate) fn new(config: GestureConfig) -> Self {
        Self {
            config,
            pending_config: None,
            slop_sq_px: config.slop_sq_px(),
            pointers: BTreeMap::new(),
            owner: None,
            claim: None,
            replay: EventReplayBuffer::new(),
            last_event: None,
            last_ms: 0,
            next_generation: 0,
            state_id: EngineStateId::Idle,
            last_decision: Decision::None,
            stale_timer_count: 0,
            decisions: DecisionLog::new(),
        }
    }

    pub(in super::super) fn state_id(&self) -> EngineStateId {
        self.state_id
    }

    pub(in super::super) fn owner(&self) -> Option<PointerId> {
        self.owner
    }

    pub(in super::super) fn claim(&self) -> Option<ClaimKind> {
        self.claim
    }

    pub(in super::super) fn pointer(&self, id: PointerId) -> Option<&PointerState> {
        self.pointers.get(&id)
    }

    pub(in super::super) fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    pub(in super::super) fn replay_len(&self) -> usize {
        self.replay.len()
    }

    pub(in super::super) fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub(in super::super) fn decisions(&self) -> &DecisionLog {
        &self.decisions
    }

    pub(in super::super) fn trace_sample(&self) -> EngineTraceSample {
        EngineTraceSample {
            t_ms: self.last_ms,
            state_id: self.state_id,
            last_decision: self.last_decision,
            pointer_count: self.pointers.len().min(u8::MAX as usize) as u8,
            owner: self.owner,
            replay_len: saturating_u16(self.replay.len()),
            stale_timer_count: self.stale_timer_count,
        }
    }

    pub(super) fn record(&mut self, pointer: Option<PointerId>, decision: Decision) {
        self.last_decision = decision;
        self.decisions.push(DecisionRecord {
            t_ms: self.last_ms,
            pointer,
            decision,
        });
    }

    pub(super) fn to_idle(&mut self) -> Outcome<State> {
        self.state_id = EngineStateId::Idle;
        Transition(State::idle())
    }

    pub(super) fn to_tracking(&mut self) -> Outcome<State> {
        self.state_id = EngineStateId::Tracking;
        Transition(State::tracking())
    }

    pub(super) fn to_claimed(&mut self) -> Outcome<State> {
        self.state_id = EngineStateId::Claimed;
        Transition(State::claimed())
    }

    pub(super) fn to_draining(&mut self) -> Outcome<State> {
        self.state_id = EngineStateId::Draining;
        Transition(State::draining())
    }

    pub(super) fn to_refused(&mut self) -> Outcome<State> {
        self.state_id = EngineStateId::Refused;
        Transition(State::refused())
    }

    pub(super) fn apply_config(&mut self, config: GestureConfig) {
        self.config = config;
        self.slop_sq_px = config.slop_sq_px();
        self.record(None, Decision::ConfigApplied);
    }

    pub(super) fn owner_position(&self) -> (f32, f32) {
        self.owner
            .and_then(|id| self.pointers.get(&id))
            .map_or((0.0, 0.0), |pointer| pointer.last)
    }

    fn any_window_open(&self) -> bool {
        self.pointers.values().any(|pointer| pointer.window_open)
    }

    /// Moves are held only while nothing is claimed and a window could
    /// still turn the touch into a force gesture.
    fn holding(&self) -> bool {
        self.config.policy.rewind && self.claim.is_none() && self.any_window_open()
    }

    /// Forwards the current event live, after anything still held.
    pub(super) fn pass(&mut self, context: &mut DispatchContext, raw: &RawEvent) {
        self.flush_replay(context);
        context.forward(raw);
        self.record(action_pointer_id(raw), Decision::Pass);
        trace!("pass {:?} at {}ms", raw.action, raw.event_ms);
    }

    pub(super) fn hold_or_pass(&mut self, context: &mut DispatchContext, raw: &RawEvent) {
        if self.holding() {
            self.replay.hold(raw.clone());
            context.suppress();
            self.record(action_pointer_id(raw), Decision::Hold);
            trace!("hold {:?} at {}ms ({} held)", raw.action, raw.event_ms, self.replay.len());
        } else {
            self.pass(context, raw);
        }
    }

    pub(super) fn suppress(&mut self, context: &mut DispatchContext, raw: &RawEvent) {
        context.suppress();
        self.record(action_pointer_id(raw), Decision::Suppress);
    }

    pub(super) fn flush_replay(&mut self, context: &mut DispatchContext) {
        if self.replay.is_empty() {
            return;
        }
        let held = self.replay.take();
        for event in &held {
            context.inject(event);
        }
        self.record(
            None,
            Decision::Replay {
                count: saturating_u16(held.len()),
            },
        );
        trace!("replayed {} held events", held.len());
    }

    pub(super) fn discard_replay(&mut self) {
        let count = self.replay.discard();
        if count > 0 {
            self.record(
                None,
                Decision::Discard {
                    count: saturating_u16(count),
                },
            );
        }
    }

    /// Flushes what the host has not seen yet, then cancels the host's view
    /// of the sequence with a synthetic event built from `source`.
    pub(super) fn hand_off(&mut self, context: &mut DispatchContext, source: &RawEvent) {
        self.flush_replay(context);
        context.inject(&source.cancel_from());
        context.suppress();
    }

    pub(super) fn begin_sequence(
        &mut self,
        context: &mut DispatchContext,
        raw: &RawEvent,
    ) -> Outcome<State> {
        let Some(sample) = raw.action_pointer() else {
            self.pass(context, raw);
            return self.to_idle();
        };
        if !self.config.policy.accepts_tool(sample.tool) {
            debug!("ignoring {:?} down for pointer {}", sample.tool, sample.id);
            self.record(Some(sample.id), Decision::RejectedTool);
            self.pass(context, raw);
            return self.to_idle();
        }

        self.last_event = Some(raw.clone());
        let _ = self.track_pointer(context, raw, raw.action_index, true);
        self.pass(context, raw);
        self.to_tracking()
    }

    /// Starts tracking the pointer at `index`. Returns `false` when the tool
    /// is not accepted.
    pub(super) fn track_pointer(
        &mut self,
        context: &mut DispatchContext,
        raw: &RawEvent,
        index: usize,
        with_long_press: bool,
    ) -> bool {
        let Some(sample) = raw.pointers.get(index) else {
            return false;
        };
        if !self.config.policy.accepts_tool(sample.tool) {
            self.record(Some(sample.id), Decision::RejectedTool);
            return false;
        }

        let id = sample.id;
        let down_ms = raw.event_ms;
        // A repeated down for a live id starts it over.
        self.drop_pointer(context, id);
        self.pointers.insert(id, PointerState::new(sample, down_ms));

        match window_plan(&self.config.window) {
            WindowPlan::OpenAfter(delay_ms) => {
                self.schedule(context, id, TimerKind::WindowOpen, down_ms + delay_ms);
            }
            WindowPlan::OpenNow { .. } => {
                self.open_window(context, id, down_ms);
                let intensity =
                    context
                        .callback
                        .sample_intensity(raw, index, self.config.intensity_source);
                let _ = self.capture_baseline(id, intensity);
            }
        }

        if with_long_press && self.config.long_press.enabled {
            let deadline_ms = down_ms + self.config.long_press.delay_ms();
            self.schedule(context, id, TimerKind::LongPress, deadline_ms);
        }
        true
    }

    pub(super) fn drop_pointer(&mut self, context: &mut DispatchContext, id: PointerId) {
        if let Some(mut pointer) = self.pointers.remove(&id) {
            for token in pointer.timers.take_all().into_iter().flatten() {
                context.timers.cancel(token);
            }
        }
    }

    pub(super) fn cancel_all_timers(&mut self, context: &mut DispatchContext) {
        for pointer in self.pointers.values_mut() {
            for token in pointer.timers.take_all().into_iter().flatten() {
                context.timers.cancel(token);
            }
        }
    }

    /// Clears all per-sequence state. Held events must already be flushed or
    /// discarded.
    pub(super) fn end_sequence(&mut self, context: &mut DispatchContext) {
        self.cancel_all_timers(context);
        self.pointers.clear();
        self.owner = None;
        self.claim = None;
        self.last_event = None;
        let _ = self.replay.discard();
        if let Some(config) = self.pending_config.take() {
            self.apply_config(config);
        }
    }

    /// Tells the host a force gesture in progress will not finish.
    pub(super) fn cancel_gesture(&mut self, context: &mut DispatchContext) {
        if self.claim != Some(ClaimKind::Force) {
            return;
        }
        let (x, y) = self.owner_position();
        let _ = context.callback.on_gesture_cancel(x, y);
        self.record(self.owner, Decision::Gesture(GestureKind::Cancel));
        debug!("force gesture cancelled x={x} y={y}");
    }

    pub(super) fn release_ownership(&mut self) {
        self.owner = None;
        self.claim = None;
    }

    pub(super) fn tracking_up(
        &mut self,
        context: &mut DispatchContext,
        raw: &RawEvent,
    ) -> Outcome<State> {
        let sample = raw.action_pointer();
        if let Some(sample) = sample {
            let _ = self.observe_position(context, sample.id, sample.position());
        }
        let tap_candidate = sample.and_then(|sample| {
            self.pointers
                .get(&sample.id)
                .filter(|pointer| pointer.in_tap_region && !pointer.force_active)
                .map(|_| (sample.id, sample.position()))
        });

        if let Some((id, (x, y))) = tap_candidate {
            if context.callback.on_tap(x, y) {
                self.owner = Some(id);
                self.claim = Some(ClaimKind::Tap);
                self.hand_off(context, raw);
                self.record(Some(id), Decision::Gesture(GestureKind::Tap));
                debug!("tap claimed pointer={id} x={x} y={y}");
                self.end_sequence(context);
                return self.to_idle();
            }
            self.record(Some(id), Decision::Refused(GestureKind::Tap));
        }

        self.pass(context, raw);
        self.end_sequence(context);
        self.to_idle()
    }

    pub(super) fn long_press(
        &mut self,
        context: &mut DispatchContext,
        id: PointerId,
    ) -> Outcome<State> {
        let Some((x, y)) = self
            .pointers
            .get(&id)
            .filter(|pointer| pointer.in_tap_region && !pointer.force_active)
            .map(|pointer| pointer.last)
        else {
            return Handled;
        };

        if !context.callback.on_long_press(x, y) {
            self.record(Some(id), Decision::Refused(GestureKind::LongPress));
            return Handled;
        }

        self.owner = Some(id);
        self.claim = Some(ClaimKind::LongPress);
        self.cancel_long_presses(context);
        let source = self.last_event.clone().unwrap_or_else(|| {
            RawEvent::new(
                MotionAction::Move,
                self.last_ms,
                vec![PointerSample::finger(id, x, y, 0.0)],
            )
        });
        self.hand_off(context, &source);
        self.record(Some(id), Decision::Gesture(GestureKind::LongPress));
        debug!("long press claimed pointer={id} x={x} y={y}");
        self.to_claimed()
    }
}
