//! Force and relative touch gesture classification.
//!
//! [`GestureEngine`] sits between a platform's raw multi-touch stream and
//! the host's normal event pipeline. It watches each contact's pressure (or
//! contact size), decides whether a touch turns into a force gesture, a long
//! press or a tap, and hands the stream over to the host or takes it away
//! without ever delivering an event twice.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod event;
pub mod pointer;
pub mod replay;
pub mod threshold;
pub mod timer;
pub mod trace;

pub use config::{GestureConfig, LongPressConfig, Policy, WindowConfig};
pub use dispatch::{DispatchCallback, GestureKind};
pub use engine::{ClaimKind, GestureEngine};
pub use error::ConfigError;
pub use event::{
    IntensitySample, IntensitySource, MotionAction, PointerId, PointerSample, RawEvent, ToolType,
};
pub use pointer::{PointerPhase, PointerState};
pub use threshold::{Baseline, ThresholdMode, Thresholds};
pub use timer::{TimerKind, TimerQueue, TimerService, TimerToken};
pub use trace::{Decision, DecisionLog, DecisionRecord, EngineStateId, EngineTraceSample};
