use statig::blocking::IntoStateMachineExt as _;

mod hsm;
mod utils;

use hsm::GestureHsm;

use crate::{
    config::GestureConfig,
    dispatch::DispatchCallback,
    error::Result,
    event::{PointerId, RawEvent},
    pointer::PointerState,
    timer::{TimerService, TimerToken},
    trace::{DecisionLog, EngineStateId, EngineTraceSample},
};

/// How the current sequence was taken away from the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimKind {
    Force,
    LongPress,
    Tap,
}

#[derive(Clone, Debug)]
enum GestureHsmEvent {
    Motion(RawEvent),
    Timer { token: TimerToken, now_ms: u64 },
    Configure(GestureConfig),
    Reset,
}

struct DispatchContext {
    callback: Box<dyn DispatchCallback>,
    timers: Box<dyn TimerService>,
    consumed: bool,
}

impl DispatchContext {
    /// Delivers the event being handled; the host's answer becomes the
    /// engine's return value.
    fn forward(&mut self, event: &RawEvent) {
        self.consumed = self.callback.deliver_to_host(event);
    }

    /// Delivers an event on the engine's behalf (replayed or synthetic).
    fn inject(&mut self, event: &RawEvent) {
        let _ = self.callback.deliver_to_host(event);
    }

    fn suppress(&mut self) {
        self.consumed = true;
    }
}

/// Classifies one raw touch stream into force gestures, long presses and
/// taps, and decides which events the host still gets to see.
pub struct GestureEngine {
    machine: statig::blocking::StateMachine<GestureHsm>,
    context: DispatchContext,
}

impl GestureEngine {
    pub fn new(
        config: GestureConfig,
        callback: impl DispatchCallback + 'static,
        timers: impl TimerService + 'static,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            machine: GestureHsm::new(config).state_machine(),
            context: DispatchContext {
                callback: Box::new(callback),
                timers: Box::new(timers),
                consumed: false,
            },
        })
    }

    /// Feeds one raw event. Returns `true` when the event was suppressed or
    /// held, otherwise whatever the host returned from `deliver_to_host`.
    pub fn on_touch_event(&mut self, event: RawEvent) -> bool {
        self.dispatch(GestureHsmEvent::Motion(event))
    }

    /// Called by the host when a scheduled deadline passes.
    pub fn on_timer(&mut self, token: TimerToken, now_ms: u64) {
        let _ = self.dispatch(GestureHsmEvent::Timer { token, now_ms });
    }

    /// Drops the current sequence without delivering anything to the host.
    pub fn reset(&mut self) {
        let _ = self.dispatch(GestureHsmEvent::Reset);
    }

    /// Takes effect immediately when idle, otherwise once the current
    /// sequence ends.
    pub fn update_config(&mut self, config: GestureConfig) -> Result<()> {
        config.validate()?;
        let _ = self.dispatch(GestureHsmEvent::Configure(config));
        Ok(())
    }

    pub fn state_id(&self) -> EngineStateId {
        self.machine.inner().state_id()
    }

    /// True while a claimed gesture owns the stream.
    pub fn is_handled(&self) -> bool {
        self.state_id() == EngineStateId::Claimed
    }

    pub fn active_pointer(&self) -> Option<PointerId> {
        self.machine.inner().owner()
    }

    pub fn claim(&self) -> Option<ClaimKind> {
        self.machine.inner().claim()
    }

    pub fn pointer(&self, id: PointerId) -> Option<&PointerState> {
        self.machine.inner().pointer(id)
    }

    pub fn pointer_count(&self) -> usize {
        self.machine.inner().pointer_count()
    }

    pub fn replay_len(&self) -> usize {
        self.machine.inner().replay_len()
    }

    /// Config the current sequence runs with; a deferred update is not
    /// visible here until it applies.
    pub fn config(&self) -> &GestureConfig {
        self.machine.inner().config()
    }

    pub fn trace(&self) -> EngineTraceSample {
        self.machine.inner().trace_sample()
    }

    pub fn decisions(&self) -> &DecisionLog {
        self.machine.inner().decisions()
    }

    fn dispatch(&mut self, event: GestureHsmEvent) -> bool {
        self.context.consumed = false;
        self.machine.handle_with_context(&event, &mut self.context);
        self.context.consumed
    }
}
