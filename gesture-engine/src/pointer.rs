//! Fingertip cursor and pinch-click synthesis.
//!
//! The index fingertip of the controlling hand is mirrored and scaled to
//! viewport pixels every frame.  A pinch fires one click on its rising
//! edge; it must release before the next click can fire.

use tracing::debug;

use crate::gesture::is_pinching;
use crate::host::HostActions;
use crate::landmarks::HandFrame;

/// Configuration for cursor mapping.
#[derive(Debug, Clone)]
pub struct PointerConfig {
    /// Viewport width in pixels.
    pub viewport_width: f32,
    /// Viewport height in pixels.
    pub viewport_height: f32,
    /// Maximum thumb-tip to index-tip distance for a pinch.
    pub pinch_threshold: f32,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1920.0,
            viewport_height: 1080.0,
            pinch_threshold: 0.04,
        }
    }
}

/// Cursor position in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorPosition {
    pub x: f32,
    pub y: f32,
}

/// Pointer state: the current cursor and the pinch latch.
#[derive(Debug, Default)]
pub struct PointerState {
    cursor: Option<CursorPosition>,
    is_clicking: bool,
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map the hand to a cursor and fire a click on a pinch rising edge.
    ///
    /// Returns the click position when one fired.
    pub fn update(
        &mut self,
        hand: &HandFrame,
        config: &PointerConfig,
        host: &mut dyn HostActions,
    ) -> Option<CursorPosition> {
        let tip = hand.index_tip().mirrored();
        let cursor = CursorPosition {
            x: tip.x * config.viewport_width,
            y: tip.y * config.viewport_height,
        };
        self.cursor = Some(cursor);

        let pinching = is_pinching(hand, config.pinch_threshold);
        let rising = pinching && !self.is_clicking;
        self.is_clicking = pinching;

        if rising {
            debug!("Pinch click at ({:.0}, {:.0})", cursor.x, cursor.y);
            host.click_at(cursor.x, cursor.y);
            Some(cursor)
        } else {
            None
        }
    }

    /// No hand this frame: cursor absent, latch released.
    pub fn clear(&mut self) {
        self.cursor = None;
        self.is_clicking = false;
    }

    pub fn cursor(&self) -> Option<CursorPosition> {
        self.cursor
    }

    pub fn is_clicking(&self) -> bool {
        self.is_clicking
    }

    /// Generate s-expression for status reporting.
    pub fn status_sexp(&self) -> String {
        match self.cursor {
            Some(c) => format!(
                "(:cursor (:x {:.1} :y {:.1}) :clicking {})",
                c.x,
                c.y,
                if self.is_clicking { "t" } else { "nil" },
            ),
            None => "(:cursor nil :clicking nil)".to_string(),
        }
    }
}
