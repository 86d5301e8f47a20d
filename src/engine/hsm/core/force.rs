use super::*;
use crate::threshold::Thresholds;

impl GestureHsm {
    /// Fixes the pointer's band from its first windowed sample. Returns
    /// `true` when this sample became the baseline.
    pub(in super::super) fn capture_baseline(&mut self, id: PointerId, intensity: f32) -> bool {
        let config = self.config;
        let Some(pointer) = self.pointers.get_mut(&id) else {
            return false;
        };
        if !pointer.window_open || pointer.thresholds.is_some() {
            return false;
        }
        let baseline = config.baseline.resolve(intensity);
        pointer.thresholds = Some(Thresholds::from_baseline(
            baseline,
            config.magnification,
            config.mode,
        ));
        self.record(Some(id), Decision::Baseline);
        true
    }

    /// Updates the pointer's position and tap region. Returns `None` for
    /// pointers the engine does not track.
    pub(in super::super) fn observe_position(
        &mut self,
        context: &mut DispatchContext,
        id: PointerId,
        position: (f32, f32),
    ) -> Option<()> {
        let block_dragging = self.config.policy.block_dragging;
        let slop_sq_px = self.slop_sq_px;
        let pointer = self.pointers.get_mut(&id)?;
        pointer.last = position;
        if !pointer.in_tap_region || squared_distance(pointer.origin, position) <= slop_sq_px {
            return Some(());
        }

        pointer.in_tap_region = false;
        pointer.drag_blocked |= block_dragging;
        self.cancel_timer(context, id, TimerKind::LongPress);
        debug!("pointer {id} left tap region");
        Some(())
    }

    fn thresholds_of(&self, id: PointerId) -> Option<Thresholds> {
        self.pointers.get(&id).and_then(|pointer| pointer.thresholds)
    }

    pub(in super::super) fn tracking_move(
        &mut self,
        context: &mut DispatchContext,
        raw: &RawEvent,
    ) -> Outcome<State> {
        let source = self.config.intensity_source;
        let mut claimant = None;
        for (index, sample) in raw.pointers.iter().enumerate() {
            let id = sample.id;
            let tracked = self.observe_position(context, id, sample.position()).is_some();
            // Later contacts still get their positions once one has claimed.
            if !tracked || claimant.is_some() {
                continue;
            }
            if !self.pointers.get(&id).is_some_and(|pointer| pointer.window_open) {
                continue;
            }

            let intensity = context.callback.sample_intensity(raw, index, source);
            if self.capture_baseline(id, intensity) {
                continue;
            }
            let can_activate = self
                .pointers
                .get(&id)
                .is_some_and(|pointer| pointer.can_activate());
            if can_activate
                && self
                    .thresholds_of(id)
                    .is_some_and(|thresholds| thresholds.is_triggered(intensity))
            {
                claimant = Some(id);
            }
        }

        match claimant {
            Some(id) => self.claim_force(context, raw, id),
            None => {
                self.hold_or_pass(context, raw);
                Handled
            }
        }
    }

    fn claim_force(
        &mut self,
        context: &mut DispatchContext,
        raw: &RawEvent,
        id: PointerId,
    ) -> Outcome<State> {
        self.cancel_long_presses(context);
        self.hand_off(context, raw);
        if self.offer_begin(context, id) {
            self.to_claimed()
        } else {
            self.to_refused()
        }
    }

    /// Asks the host to start a force gesture for `id`. The host has already
    /// been cancelled, so a refusal leaves the touch suppressed but still
    /// classified; the contact must release before it can ask again.
    fn offer_begin(&mut self, context: &mut DispatchContext, id: PointerId) -> bool {
        let Some((x, y)) = self.pointers.get(&id).map(|pointer| pointer.last) else {
            return false;
        };
        let accepted = context.callback.on_gesture_begin(x, y, id);
        let Some(pointer) = self.pointers.get_mut(&id) else {
            return false;
        };
        if accepted {
            pointer.force_active = true;
            self.owner = Some(id);
            self.claim = Some(ClaimKind::Force);
            self.record(Some(id), Decision::Gesture(GestureKind::Begin));
            debug!("force gesture claimed pointer={id} x={x} y={y}");
        } else {
            pointer.awaiting_release = true;
            self.record(Some(id), Decision::Refused(GestureKind::Begin));
            debug!("force gesture refused pointer={id}");
        }
        accepted
    }

    /// Classifies moves after a refused begin. Nothing reaches the host; the
    /// first contact to cross its activation threshold again offers a new
    /// begin.
    pub(in super::super) fn refused_move(
        &mut self,
        context: &mut DispatchContext,
        raw: &RawEvent,
    ) -> Outcome<State> {
        let source = self.config.intensity_source;
        let mut claimant = None;
        for (index, sample) in raw.pointers.iter().enumerate() {
            let id = sample.id;
            if self.observe_position(context, id, sample.position()).is_none() {
                continue;
            }
            if !self.pointers.get(&id).is_some_and(|pointer| pointer.window_open) {
                continue;
            }

            let intensity = context.callback.sample_intensity(raw, index, source);
            if self.capture_baseline(id, intensity) {
                continue;
            }
            let Some(thresholds) = self.thresholds_of(id) else {
                continue;
            };
            let Some(pointer) = self.pointers.get_mut(&id) else {
                continue;
            };
            if pointer.awaiting_release {
                if thresholds.is_released(intensity) {
                    pointer.awaiting_release = false;
                    trace!("pointer {id} rearmed after refusal");
                }
                continue;
            }
            if claimant.is_none() && pointer.can_activate() && thresholds.is_triggered(intensity) {
                claimant = Some(id);
            }
        }

        self.suppress(context, raw);
        match claimant {
            Some(id) if self.offer_begin(context, id) => self.to_claimed(),
            _ => Handled,
        }
    }

    pub(in super::super) fn refused_pointer_down(
        &mut self,
        context: &mut DispatchContext,
        raw: &RawEvent,
    ) -> Outcome<State> {
        self.suppress(context, raw);
        if self.config.policy.cancel_on_multi_touch {
            self.record(action_pointer_id(raw), Decision::Abandoned);
            self.cancel_all_timers(context);
            return self.to_draining();
        }
        let _ = self.track_pointer(context, raw, raw.action_index, false);
        Handled
    }

    pub(in super::super) fn claimed_move(&mut self, context: &mut DispatchContext, raw: &RawEvent) {
        let source = self.config.intensity_source;
        let allow_release = self.config.policy.allow_release;
        for (index, sample) in raw.pointers.iter().enumerate() {
            let id = sample.id;
            if self.observe_position(context, id, sample.position()).is_none() {
                continue;
            }
            let Some((window_open, force_active)) = self
                .pointers
                .get(&id)
                .map(|pointer| (pointer.window_open, pointer.force_active))
            else {
                continue;
            };
            if !window_open && !force_active {
                continue;
            }

            let intensity = context.callback.sample_intensity(raw, index, source);
            if self.capture_baseline(id, intensity) {
                continue;
            }
            let Some(thresholds) = self.thresholds_of(id) else {
                continue;
            };

            if force_active {
                if allow_release && thresholds.is_released(intensity) {
                    self.release_force(context, id);
                }
            } else if thresholds.is_triggered(intensity)
                && self
                    .pointers
                    .get(&id)
                    .is_some_and(|pointer| pointer.can_activate())
            {
                self.activate_in_claim(context, id);
            }
        }
    }

    fn release_force(&mut self, context: &mut DispatchContext, id: PointerId) {
        let Some((x, y)) = self.pointers.get_mut(&id).map(|pointer| {
            pointer.force_active = false;
            pointer.last
        }) else {
            return;
        };
        let _ = context.callback.on_gesture_end(x, y, id);
        self.record(Some(id), Decision::Gesture(GestureKind::End));
        debug!("force contact released pointer={id} x={x} y={y}");
        if self.config.window.time_ms == 0 {
            self.close_window(context, id);
        }
    }

    /// The owner pressing again restarts its gesture; any other contact can
    /// only join when multi-force touch is on.
    fn activate_in_claim(&mut self, context: &mut DispatchContext, id: PointerId) {
        let Some((x, y)) = self.pointers.get(&id).map(|pointer| pointer.last) else {
            return;
        };
        let kind = if self.owner == Some(id) {
            GestureKind::Begin
        } else if self.config.policy.multi_force_touch {
            GestureKind::Additional
        } else {
            return;
        };

        let accepted = match kind {
            GestureKind::Begin => context.callback.on_gesture_begin(x, y, id),
            _ => context.callback.on_gesture_additional(x, y, id),
        };
        if !accepted {
            self.record(Some(id), Decision::Refused(kind));
            return;
        }
        if let Some(pointer) = self.pointers.get_mut(&id) {
            pointer.force_active = true;
        }
        self.record(Some(id), Decision::Gesture(kind));
        debug!("force contact {} pointer={id} x={x} y={y}", kind.as_str());
    }

    pub(in super::super) fn tracking_pointer_down(
        &mut self,
        context: &mut DispatchContext,
        raw: &RawEvent,
    ) -> Outcome<State> {
        if self.config.policy.cancel_on_multi_touch {
            self.pass(context, raw);
            self.record(action_pointer_id(raw), Decision::Abandoned);
            debug!("second contact abandoned force tracking");
            self.end_sequence(context);
            return self.to_idle();
        }
        let _ = self.track_pointer(context, raw, raw.action_index, false);
        self.pass(context, raw);
        Handled
    }

    pub(in super::super) fn claimed_pointer_down(
        &mut self,
        context: &mut DispatchContext,
        raw: &RawEvent,
    ) -> Outcome<State> {
        let policy = self.config.policy;
        if policy.multi_force_touch {
            let _ = self.track_pointer(context, raw, raw.action_index, false);
            self.suppress(context, raw);
            return Handled;
        }
        if policy.cancel_on_multi_touch {
            self.cancel_gesture(context);
            self.suppress(context, raw);
            self.release_ownership();
            self.cancel_all_timers(context);
            return self.to_draining();
        }
        self.suppress(context, raw);
        Handled
    }

    pub(in super::super) fn claimed_pointer_up(
        &mut self,
        context: &mut DispatchContext,
        raw: &RawEvent,
    ) -> Outcome<State> {
        let Some(sample) = raw.action_pointer() else {
            self.suppress(context, raw);
            return Handled;
        };
        let id = sample.id;
        let (x, y) = sample.position();

        if self.owner == Some(id) {
            if self.claim == Some(ClaimKind::Force) {
                let _ = context.callback.on_gesture_finish(x, y);
                self.record(Some(id), Decision::Gesture(GestureKind::Finish));
                debug!("force gesture finished by owner lift x={x} y={y}");
            }
            self.drop_pointer(context, id);
            self.suppress(context, raw);
            self.release_ownership();
            self.cancel_all_timers(context);
            return self.to_draining();
        }

        if self.pointers.get(&id).is_some_and(|pointer| pointer.force_active) {
            let _ = context.callback.on_gesture_end(x, y, id);
            self.record(Some(id), Decision::Gesture(GestureKind::End));
        }
        self.drop_pointer(context, id);
        self.suppress(context, raw);
        Handled
    }
}
