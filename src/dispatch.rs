use crate::event::{IntensitySource, PointerId, RawEvent};

/// Which host callback a classification went to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Begin,
    Additional,
    End,
    Finish,
    Cancel,
    LongPress,
    Tap,
}

impl GestureKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::Additional => "additional",
            Self::End => "end",
            Self::Finish => "finish",
            Self::Cancel => "cancel",
            Self::LongPress => "long_press",
            Self::Tap => "tap",
        }
    }
}

/// Host side of the engine.
///
/// Methods returning `bool` fall in two groups. `on_gesture_begin`,
/// `on_gesture_additional`, `on_long_press` and `on_tap` may refuse, and a
/// refusal changes what the engine does next. The remaining notifications
/// have their return value ignored.
///
/// Coordinates are the pointer's last known position in the units of the
/// raw events.
pub trait DispatchCallback {
    /// Intensity used for classification; override to smooth or rescale.
    fn sample_intensity(
        &mut self,
        event: &RawEvent,
        pointer_index: usize,
        source: IntensitySource,
    ) -> f32 {
        event.latest_intensity(pointer_index, source)
    }

    /// Hands a raw event back to the host's normal pipeline. Returns whether
    /// the host consumed it.
    fn deliver_to_host(&mut self, event: &RawEvent) -> bool;

    fn on_gesture_begin(&mut self, x: f32, y: f32, pointer: PointerId) -> bool;

    fn on_gesture_additional(&mut self, x: f32, y: f32, pointer: PointerId) -> bool {
        let _ = (x, y, pointer);
        true
    }

    fn on_gesture_end(&mut self, x: f32, y: f32, pointer: PointerId) -> bool {
        let _ = (x, y, pointer);
        true
    }

    fn on_gesture_finish(&mut self, x: f32, y: f32) -> bool {
        let _ = (x, y);
        true
    }

    fn on_gesture_cancel(&mut self, x: f32, y: f32) -> bool {
        let _ = (x, y);
        true
    }

    fn on_long_press(&mut self, x: f32, y: f32) -> bool {
        let _ = (x, y);
        false
    }

    fn on_tap(&mut self, x: f32, y: f32) -> bool {
        let _ = (x, y);
        false
    }
}
