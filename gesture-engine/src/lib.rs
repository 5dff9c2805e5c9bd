//! Gesture interaction engine.
//!
//! Turns per-frame hand landmarks from an external detector into host
//! actions: page navigation, bookmark launch, screenshots, a pinch-click
//! cursor, scrolling, and a dwell-to-type keyboard.

pub mod bookmarks;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod gesture;
pub mod host;
pub mod keyboard;
pub mod landmarks;
pub mod pointer;
pub mod replay;
pub mod scroll;
pub mod smoothing;
pub mod wire;

pub use config::EngineConfig;
pub use engine::{Detector, DetectorLease, Engine, Mode};
pub use host::{HostActions, Page};
pub use landmarks::{Frame, HandFrame, Handedness, Point};
