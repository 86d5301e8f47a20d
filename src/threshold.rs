use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Intensity rises to trigger (pressing harder, rolling onto the pad).
    #[default]
    Wiggle,
    /// Intensity falls to trigger (lifting toward the fingertip).
    Scratch,
}

/// Where the reference intensity for a touch comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Baseline {
    /// Relative detection: the first sample seen while the window is open.
    #[default]
    FirstSample,
    /// Absolute detection against a configured reference value.
    Fixed(f32),
}

impl Baseline {
    pub fn resolve(self, sample: f32) -> f32 {
        match self {
            Self::FirstSample => sample,
            Self::Fixed(value) => value,
        }
    }
}

/// Activation/release pair for one touch.
///
/// `release` always lies between the baseline and `activation`, so a sample
/// must travel back across the band before the contact counts as released.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    pub mode: ThresholdMode,
    pub activation: f32,
    pub release: f32,
}

impl Thresholds {
    pub fn from_baseline(baseline: f32, magnification: f32, mode: ThresholdMode) -> Self {
        let half = 1.0 + (magnification - 1.0) / 2.0;
        let (activation, release) = match mode {
            ThresholdMode::Wiggle => (baseline * magnification, baseline * half),
            ThresholdMode::Scratch => (baseline / magnification, baseline / half),
        };
        Self {
            mode,
            activation,
            release,
        }
    }

    pub fn is_triggered(&self, sample: f32) -> bool {
        match self.mode {
            ThresholdMode::Wiggle => sample > self.activation,
            ThresholdMode::Scratch => sample < self.activation,
        }
    }

    pub fn is_released(&self, sample: f32) -> bool {
        match self.mode {
            ThresholdMode::Wiggle => sample < self.release,
            ThresholdMode::Scratch => sample > self.release,
        }
    }
}
