use serde::{Deserialize, Serialize};

pub type PointerId = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolType {
    Finger,
    Stylus,
    Mouse,
    Eraser,
    Unknown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensitySource {
    #[default]
    Pressure,
    Size,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct IntensitySample {
    pub pressure: f32,
    pub size: f32,
}

impl IntensitySample {
    pub fn value(&self, source: IntensitySource) -> f32 {
        match source {
            IntensitySource::Pressure => self.pressure,
            IntensitySource::Size => self.size,
        }
    }
}

/// One contact inside a [`RawEvent`].
///
/// `history` carries the coalesced samples the platform batched since the
/// previous event, oldest first.
#[derive(Clone, Debug, PartialEq)]
pub struct PointerSample {
    pub id: PointerId,
    pub tool: ToolType,
    pub x: f32,
    pub y: f32,
    pub pressure: f32,
    pub size: f32,
    pub history: Vec<IntensitySample>,
}

impl PointerSample {
    pub fn finger(id: PointerId, x: f32, y: f32, pressure: f32) -> Self {
        Self {
            id,
            tool: ToolType::Finger,
            x,
            y,
            pressure,
            size: 0.0,
            history: Vec::new(),
        }
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn with_tool(mut self, tool: ToolType) -> Self {
        self.tool = tool;
        self
    }

    pub fn with_history(mut self, history: Vec<IntensitySample>) -> Self {
        self.history = history;
        self
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Last coalesced value if the platform batched any, else the immediate one.
    ///
    /// Peaks between two deliveries only show up in the history, so the
    /// newest historical entry wins over the immediate sample.
    pub fn latest_intensity(&self, source: IntensitySource) -> f32 {
        match self.history.last() {
            Some(sample) => sample.value(source),
            None => IntensitySample {
                pressure: self.pressure,
                size: self.size,
            }
            .value(source),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionAction {
    Down,
    PointerDown,
    Move,
    PointerUp,
    Up,
    Cancel,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawEvent {
    pub action: MotionAction,
    /// Index into `pointers` of the contact the action applies to.
    pub action_index: usize,
    pub event_ms: u64,
    pub pointers: Vec<PointerSample>,
}

impl RawEvent {
    pub fn new(action: MotionAction, event_ms: u64, pointers: Vec<PointerSample>) -> Self {
        Self {
            action,
            action_index: 0,
            event_ms,
            pointers,
        }
    }

    pub fn with_action_index(mut self, index: usize) -> Self {
        self.action_index = index;
        self
    }

    pub fn down(event_ms: u64, pointer: PointerSample) -> Self {
        Self::new(MotionAction::Down, event_ms, vec![pointer])
    }

    pub fn up(event_ms: u64, pointer: PointerSample) -> Self {
        Self::new(MotionAction::Up, event_ms, vec![pointer])
    }

    pub fn moved(event_ms: u64, pointers: Vec<PointerSample>) -> Self {
        Self::new(MotionAction::Move, event_ms, pointers)
    }

    /// The synthetic cancel handed to the host when a gesture is claimed.
    pub fn cancel_from(&self) -> Self {
        Self {
            action: MotionAction::Cancel,
            action_index: 0,
            event_ms: self.event_ms,
            pointers: self.pointers.clone(),
        }
    }

    pub fn action_pointer(&self) -> Option<&PointerSample> {
        self.pointers.get(self.action_index)
    }

    pub fn latest_intensity(&self, index: usize, source: IntensitySource) -> f32 {
        self.pointers
            .get(index)
            .map_or(0.0, |pointer| pointer.latest_intensity(source))
    }

    pub fn index_of(&self, id: PointerId) -> Option<usize> {
        self.pointers.iter().position(|pointer| pointer.id == id)
    }
}
