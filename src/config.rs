use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    event::{IntensitySource, ToolType},
    threshold::{Baseline, ThresholdMode},
};

pub const DEFAULT_SENSITIVITY_DP: u32 = 12;
pub const DEFAULT_MAGNIFICATION: f32 = 1.7;
// Matches the platform default long-press timeout.
pub const DEFAULT_LONG_PRESS_TIMEOUT_MS: u32 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    /// Delay after touch-down before samples are considered.
    pub delay_ms: i32,
    /// Window length; `0` closes on the first release, negative never
    /// closes on time alone.
    pub time_ms: i32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            delay_ms: 0,
            time_ms: -1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LongPressConfig {
    pub enabled: bool,
    pub timeout_ms: u32,
    /// Added on top of `timeout_ms`; the sum is floored at zero.
    pub extra_delay_ms: i32,
}

impl LongPressConfig {
    pub fn delay_ms(&self) -> u64 {
        (i64::from(self.timeout_ms) + i64::from(self.extra_delay_ms)).max(0) as u64
    }
}

impl Default for LongPressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: DEFAULT_LONG_PRESS_TIMEOUT_MS,
            extra_delay_ms: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Policy {
    /// Pointers that leave the tap region can no longer activate.
    pub block_dragging: bool,
    /// Further contacts may join a claimed force gesture.
    pub multi_force_touch: bool,
    /// A second finger abandons the current sequence.
    pub cancel_on_multi_touch: bool,
    /// Hold moves while a window is open and replay them on claim.
    pub rewind: bool,
    pub accept_unknown_tool_type: bool,
    /// Force contacts may be released mid-touch.
    pub allow_release: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            block_dragging: false,
            multi_force_touch: false,
            cancel_on_multi_touch: false,
            rewind: false,
            accept_unknown_tool_type: false,
            allow_release: true,
        }
    }
}

impl Policy {
    pub fn accepts_tool(&self, tool: ToolType) -> bool {
        match tool {
            ToolType::Finger => true,
            ToolType::Unknown => self.accept_unknown_tool_type,
            ToolType::Stylus | ToolType::Mouse | ToolType::Eraser => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GestureConfig {
    /// Tap slop radius in device-independent units.
    pub sensitivity: u32,
    /// Pixels per device-independent unit.
    pub density: f32,
    pub magnification: f32,
    pub mode: ThresholdMode,
    pub intensity_source: IntensitySource,
    pub baseline: Baseline,
    pub window: WindowConfig,
    pub long_press: LongPressConfig,
    pub policy: Policy,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY_DP,
            density: 1.0,
            magnification: DEFAULT_MAGNIFICATION,
            mode: ThresholdMode::Wiggle,
            intensity_source: IntensitySource::Pressure,
            baseline: Baseline::FirstSample,
            window: WindowConfig::default(),
            long_press: LongPressConfig::default(),
            policy: Policy::default(),
        }
    }
}

impl GestureConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.magnification.is_finite() || self.magnification < 1.0 {
            return Err(ConfigError::Validation(
                "magnification must be >= 1.0".into(),
            ));
        }
        if !self.density.is_finite() || self.density <= 0.0 {
            return Err(ConfigError::Validation("density must be > 0".into()));
        }
        if let Baseline::Fixed(value) = self.baseline {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Validation(
                    "baseline.fixed must be > 0".into(),
                ));
            }
        }
        if self.long_press.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "long_press.timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Squared tap slop in pixels, computed once per config.
    pub fn slop_sq_px(&self) -> f32 {
        let slop = self.sensitivity as f32 * self.density;
        slop * slop
    }
}
