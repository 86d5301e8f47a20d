use std::{cell::RefCell, rc::Rc};

use forcetouch::{
    DispatchCallback, EngineStateId, GestureConfig, GestureEngine, MotionAction, PointerId,
    PointerSample, RawEvent, ThresholdMode, Thresholds, TimerKind, TimerQueue, TimerService,
    TimerToken,
};
use proptest::prelude::*;

#[derive(Clone, Debug, PartialEq)]
enum Seen {
    Host(MotionAction, u64),
    Begin(PointerId),
    Additional(PointerId),
    End(PointerId),
    LongPress,
    Tap,
}

#[derive(Clone, Default)]
struct Recorder {
    log: Rc<RefCell<Vec<Seen>>>,
    accept_gestures: bool,
}

impl Recorder {
    fn seen(&self) -> Vec<Seen> {
        self.log.borrow().clone()
    }

    fn host(&self) -> Vec<(MotionAction, u64)> {
        self.seen()
            .into_iter()
            .filter_map(|seen| match seen {
                Seen::Host(action, ms) => Some((action, ms)),
                _ => None,
            })
            .collect()
    }
}

impl DispatchCallback for Recorder {
    fn deliver_to_host(&mut self, event: &RawEvent) -> bool {
        self.log
            .borrow_mut()
            .push(Seen::Host(event.action, event.event_ms));
        false
    }

    fn on_gesture_begin(&mut self, _x: f32, _y: f32, pointer: PointerId) -> bool {
        self.log.borrow_mut().push(Seen::Begin(pointer));
        true
    }

    fn on_gesture_additional(&mut self, _x: f32, _y: f32, pointer: PointerId) -> bool {
        self.log.borrow_mut().push(Seen::Additional(pointer));
        true
    }

    fn on_gesture_end(&mut self, _x: f32, _y: f32, pointer: PointerId) -> bool {
        self.log.borrow_mut().push(Seen::End(pointer));
        true
    }

    fn on_long_press(&mut self, _x: f32, _y: f32) -> bool {
        if self.accept_gestures {
            self.log.borrow_mut().push(Seen::LongPress);
        }
        self.accept_gestures
    }

    fn on_tap(&mut self, _x: f32, _y: f32) -> bool {
        if self.accept_gestures {
            self.log.borrow_mut().push(Seen::Tap);
        }
        self.accept_gestures
    }
}

fn engine_with(config: GestureConfig, recorder: &Recorder) -> (GestureEngine, TimerQueue) {
    let timers = TimerQueue::new();
    let engine =
        GestureEngine::new(config, recorder.clone(), timers.clone()).expect("valid config");
    (engine, timers)
}

fn advance(engine: &mut GestureEngine, timers: &TimerQueue, now_ms: u64) {
    while let Some((token, deadline_ms)) = timers.pop_due(now_ms) {
        engine.on_timer(token, deadline_ms);
    }
}

fn finger(id: PointerId, pressure: f32) -> PointerSample {
    let offset = id as f32 * 200.0;
    PointerSample::finger(id, 100.0 + offset, 100.0 + offset, pressure)
}

proptest! {
    #[test]
    fn force_state_follows_hysteresis_band(
        baseline in 0.2f32..2.0,
        ratios in prop::collection::vec(0.3f32..2.5, 1..40),
    ) {
        let recorder = Recorder::default();
        let (mut engine, _timers) = engine_with(GestureConfig::default(), &recorder);
        let thresholds = Thresholds::from_baseline(baseline, 1.7, ThresholdMode::Wiggle);

        engine.on_touch_event(RawEvent::down(0, finger(0, baseline)));
        let mut active = false;
        let mut expected = Vec::new();
        for (step, ratio) in ratios.iter().enumerate() {
            let pressure = baseline * ratio;
            engine.on_touch_event(RawEvent::moved(10 * (step as u64 + 1), vec![finger(0, pressure)]));
            if !active && thresholds.is_triggered(pressure) {
                active = true;
                expected.push(Seen::Begin(0));
            } else if active && thresholds.is_released(pressure) {
                active = false;
                expected.push(Seen::End(0));
            }
        }

        let gestures: Vec<Seen> = recorder
            .seen()
            .into_iter()
            .filter(|seen| matches!(seen, Seen::Begin(_) | Seen::End(_)))
            .collect();
        prop_assert_eq!(gestures, expected);
    }

    #[test]
    fn every_event_reaches_host_at_most_once(
        rewind in any::<bool>(),
        pressures in prop::collection::vec(0.5f32..3.0, 1..30),
    ) {
        let recorder = Recorder::default();
        let mut config = GestureConfig::default();
        config.policy.rewind = rewind;
        let (mut engine, _timers) = engine_with(config, &recorder);
        let thresholds = Thresholds::from_baseline(1.0, 1.7, ThresholdMode::Wiggle);

        engine.on_touch_event(RawEvent::down(0, finger(0, 1.0)));
        let mut times = Vec::new();
        for (step, pressure) in pressures.iter().enumerate() {
            let ms = 10 * (step as u64 + 1);
            times.push(ms);
            engine.on_touch_event(RawEvent::moved(ms, vec![finger(0, *pressure)]));
        }
        let up_ms = 10 * (pressures.len() as u64 + 1);
        engine.on_touch_event(RawEvent::up(up_ms, finger(0, 1.0)));

        let claim_at = pressures
            .iter()
            .position(|pressure| thresholds.is_triggered(*pressure));
        let mut expected = vec![(MotionAction::Down, 0)];
        match claim_at {
            Some(index) => {
                expected.extend(times[..index].iter().map(|ms| (MotionAction::Move, *ms)));
                expected.push((MotionAction::Cancel, times[index]));
            }
            None => {
                expected.extend(times.iter().map(|ms| (MotionAction::Move, *ms)));
                expected.push((MotionAction::Up, up_ms));
            }
        }
        prop_assert_eq!(recorder.host(), expected);
        prop_assert_eq!(engine.state_id(), EngineStateId::Idle);
        prop_assert_eq!(engine.replay_len(), 0);
    }

    #[test]
    fn only_one_owner_per_sequence(
        first in prop::collection::vec(0.5f32..3.0, 1..20),
        second in prop::collection::vec(0.5f32..3.0, 1..20),
    ) {
        let recorder = Recorder::default();
        let mut config = GestureConfig::default();
        config.policy.multi_force_touch = true;
        let (mut engine, _timers) = engine_with(config, &recorder);
        let mut owner: Option<PointerId> = None;
        let mut check_owner = |engine: &GestureEngine| -> Result<(), TestCaseError> {
            if let Some(active) = engine.active_pointer() {
                match owner {
                    Some(previous) => prop_assert_eq!(previous, active),
                    None => owner = Some(active),
                }
            }
            Ok(())
        };

        engine.on_touch_event(RawEvent::down(0, finger(0, 1.0)));
        let mut ms = 0;
        for pressure in &first {
            ms += 10;
            engine.on_touch_event(RawEvent::moved(ms, vec![finger(0, *pressure)]));
            check_owner(&engine)?;
        }
        ms += 10;
        engine.on_touch_event(
            RawEvent::new(MotionAction::PointerDown, ms, vec![finger(0, 1.0), finger(1, 1.0)])
                .with_action_index(1),
        );
        for (p0, p1) in first.iter().zip(second.iter().cycle()) {
            ms += 10;
            engine.on_touch_event(RawEvent::moved(ms, vec![finger(0, *p0), finger(1, *p1)]));
            check_owner(&engine)?;
        }

        let seen = recorder.seen();
        let begins: Vec<PointerId> = seen
            .iter()
            .filter_map(|seen| match seen {
                Seen::Begin(pointer) => Some(*pointer),
                _ => None,
            })
            .collect();
        prop_assert!(begins.windows(2).all(|pair| pair[0] == pair[1]));
        if let Some(owner) = begins.first() {
            prop_assert!(!seen.contains(&Seen::Additional(*owner)));
        }
    }

    #[test]
    fn claims_are_mutually_exclusive(
        steps in prop::collection::vec((0.5f32..3.0, 0u64..300), 0..12),
        drift in 0.0f32..30.0,
    ) {
        let recorder = Recorder {
            accept_gestures: true,
            ..Recorder::default()
        };
        let (mut engine, timers) = engine_with(GestureConfig::default(), &recorder);

        engine.on_touch_event(RawEvent::down(0, finger(0, 1.0)));
        let mut ms = 0;
        for (step, (pressure, wait_ms)) in steps.iter().enumerate() {
            ms += wait_ms + 1;
            advance(&mut engine, &timers, ms);
            let x = 100.0 + drift * step as f32 / steps.len() as f32;
            engine.on_touch_event(RawEvent::moved(
                ms,
                vec![PointerSample::finger(0, x, 100.0, *pressure)],
            ));
        }
        ms += 1;
        advance(&mut engine, &timers, ms);
        engine.on_touch_event(RawEvent::up(ms, finger(0, 1.0)));

        let seen = recorder.seen();
        let begun = seen.contains(&Seen::Begin(0));
        let long_pressed = seen.contains(&Seen::LongPress);
        let tapped = seen.contains(&Seen::Tap);
        prop_assert!(
            u8::from(begun) + u8::from(long_pressed) + u8::from(tapped) <= 1,
            "more than one claim: {seen:?}"
        );
        let cancels = seen
            .iter()
            .filter(|seen| matches!(seen, Seen::Host(MotionAction::Cancel, _)))
            .count();
        prop_assert!(cancels <= 1);
    }

    #[test]
    fn host_cancel_resets_everything(
        rewind in any::<bool>(),
        pressures in prop::collection::vec(0.5f32..3.0, 0..15),
    ) {
        let recorder = Recorder::default();
        let mut config = GestureConfig::default();
        config.policy.rewind = rewind;
        config.window.time_ms = 200;
        let (mut engine, timers) = engine_with(config, &recorder);

        engine.on_touch_event(RawEvent::down(0, finger(0, 1.0)));
        let mut ms = 0;
        for pressure in &pressures {
            ms += 10;
            engine.on_touch_event(RawEvent::moved(ms, vec![finger(0, *pressure)]));
        }
        engine.on_touch_event(RawEvent::new(MotionAction::Cancel, ms + 10, vec![finger(0, 1.0)]));

        prop_assert_eq!(engine.state_id(), EngineStateId::Idle);
        prop_assert_eq!(engine.pointer_count(), 0);
        prop_assert_eq!(engine.active_pointer(), None);
        prop_assert_eq!(engine.replay_len(), 0);
        prop_assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn closed_window_never_activates(
        delay_ms in 20i32..200,
        pressures in prop::collection::vec(1.8f32..5.0, 1..10),
    ) {
        let recorder = Recorder::default();
        let mut config = GestureConfig::default();
        config.window.delay_ms = delay_ms;
        let (mut engine, timers) = engine_with(config, &recorder);

        engine.on_touch_event(RawEvent::down(0, finger(0, 1.0)));
        let step_ms = (delay_ms as u64 - 1) / pressures.len() as u64;
        for (step, pressure) in pressures.iter().enumerate() {
            let ms = step_ms * step as u64 + 1;
            advance(&mut engine, &timers, ms);
            engine.on_touch_event(RawEvent::moved(ms, vec![finger(0, *pressure)]));
        }
        prop_assert!(!engine.is_handled());

        advance(&mut engine, &timers, delay_ms as u64);
        prop_assert_eq!(engine.pointer(0).map(|pointer| pointer.window_open), Some(true));

        // With a negative window time nothing ever closes it.
        let late_ms = delay_ms as u64 + 100_000;
        advance(&mut engine, &timers, late_ms);
        prop_assert_eq!(timers.pending(), 0);
        prop_assert_eq!(engine.pointer(0).map(|pointer| pointer.window_open), Some(true));

        engine.on_touch_event(RawEvent::moved(late_ms + 1, vec![finger(0, 1.0)]));
        engine.on_touch_event(RawEvent::moved(late_ms + 2, vec![finger(0, 1.8)]));
        prop_assert!(engine.is_handled());
    }

    #[test]
    fn cancelling_timers_twice_is_harmless(
        deadlines in prop::collection::vec(0u64..1_000, 1..20),
        cancel_mask in prop::collection::vec(any::<bool>(), 20),
    ) {
        let mut queue = TimerQueue::new();
        let tokens: Vec<TimerToken> = deadlines
            .iter()
            .enumerate()
            .map(|(index, deadline_ms)| {
                let token = TimerToken {
                    pointer: 0,
                    kind: TimerKind::LongPress,
                    generation: index as u64 + 1,
                };
                queue.schedule(token, *deadline_ms);
                token
            })
            .collect();

        let mut kept = tokens.len();
        for (token, cancel) in tokens.iter().zip(&cancel_mask) {
            if *cancel {
                queue.cancel(*token);
                queue.cancel(*token);
                kept -= 1;
            }
        }
        prop_assert_eq!(queue.pending(), kept);

        let mut last_deadline = 0;
        while let Some((_, deadline_ms)) = queue.pop_due(u64::MAX) {
            prop_assert!(deadline_ms >= last_deadline);
            last_deadline = deadline_ms;
        }
    }
}
