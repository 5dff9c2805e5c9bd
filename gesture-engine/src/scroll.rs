//! Vertical scrolling from frame-to-frame fingertip displacement.

use tracing::debug;

use crate::host::HostActions;
use crate::landmarks::Handedness;

/// Configuration for the scroll controller.
#[derive(Debug, Clone)]
pub struct ScrollConfig {
    /// Minimum milliseconds between scroll commands.
    pub cooldown_ms: f64,
    /// Ignore vertical motion at or below this (normalized units).
    pub deadband: f32,
    /// Pixels per normalized unit of motion.
    pub sensitivity: f32,
    /// Sensitivity used when the controlling hand is the right hand.
    pub right_hand_sensitivity: f32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 80.0,
            deadband: 0.01,
            sensitivity: 400.0,
            right_hand_sensitivity: 400.0,
        }
    }
}

impl ScrollConfig {
    pub fn sensitivity_for(&self, hand: Handedness) -> f32 {
        match hand {
            Handedness::Right => self.right_hand_sensitivity,
            Handedness::Left => self.sensitivity,
        }
    }
}

/// Scroll controller state.
#[derive(Debug, Default)]
pub struct ScrollController {
    previous_y: Option<f32>,
    last_scroll_ms: Option<f64>,
}

impl ScrollController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the controlling fingertip's y and emit a scroll when warranted.
    ///
    /// Within the cooldown the frame is ignored entirely.  Once it has
    /// elapsed, the current y always becomes the new reference, so small
    /// motions never block detection of a later larger one.
    pub fn update(
        &mut self,
        now_ms: f64,
        y: f32,
        hand: Handedness,
        config: &ScrollConfig,
        host: &mut dyn HostActions,
    ) -> Option<f32> {
        if let Some(last) = self.last_scroll_ms {
            if now_ms - last <= config.cooldown_ms {
                return None;
            }
        }

        let mut emitted = None;
        if let Some(prev) = self.previous_y {
            let dy = y - prev;
            if dy.abs() > config.deadband {
                let delta = dy * config.sensitivity_for(hand);
                debug!("Scroll by {:.1}px ({} hand)", delta, hand.as_str());
                host.scroll_by(delta);
                self.last_scroll_ms = Some(now_ms);
                emitted = Some(delta);
            }
        }
        self.previous_y = Some(y);
        emitted
    }

    /// Forget the reference position (hand lost).  The cooldown clock is kept.
    pub fn reset(&mut self) {
        self.previous_y = None;
    }

    pub fn previous_y(&self) -> Option<f32> {
        self.previous_y
    }
}
