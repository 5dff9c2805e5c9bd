//! Gesture recognition from hand landmarks.
//!
//! Detects open palm, swipe, finger-count bookmarks, fist (screenshot),
//! and pinch from a single hand's 21 landmarks.  All classifiers are pure
//! except swipe, whose previous wrist position lives in an explicit
//! [`SwipeState`] owned by the caller.

use std::fmt;

use tracing::debug;

use crate::landmarks::{
    HandFrame, Handedness, Point, FINGERTIPS, FINGER_TIP_PIP, INDEX_TIP, THUMB_IP, THUMB_TIP,
};

// ── Gesture types ──────────────────────────────────────────

/// Direction of a swipe gesture (image coordinates, y grows down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwipeDirection {
    Left,
    Right,
    Up,
    Down,
}

impl SwipeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// Discrete gesture labels consumed by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureLabel {
    /// All four fingers extended upward.
    PalmOpen,
    /// Wrist moved past the swipe threshold between two frames.
    Swipe(SwipeDirection),
    /// N extended digits (1-5) selecting the N-th bookmark.
    Bookmark(u8),
    /// All fingertips clustered together.
    Screenshot,
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PalmOpen => f.write_str("palm-open"),
            Self::Swipe(dir) => write!(f, "swipe-{}", dir.as_str()),
            Self::Bookmark(n) => write!(f, "bookmark-{}", n),
            Self::Screenshot => f.write_str("screenshot"),
        }
    }
}

/// A recognized gesture with the frame time it was seen at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureEvent {
    pub label: GestureLabel,
    pub timestamp_ms: f64,
}

// ── Config ─────────────────────────────────────────────────

/// Configuration for gesture recognition thresholds (normalized units).
#[derive(Debug, Clone)]
pub struct GestureConfig {
    /// Minimum wrist displacement between frames for a swipe.
    pub swipe_threshold: f32,
    /// Maximum distance between neighbouring fingertips for a fist.
    pub fist_threshold: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            swipe_threshold: 0.08,
            fist_threshold: 0.06,
        }
    }
}

impl GestureConfig {
    /// Generate s-expression for config reporting.
    pub fn config_sexp(&self) -> String {
        format!(
            "(:swipe-threshold {:.3} :fist-threshold {:.3})",
            self.swipe_threshold, self.fist_threshold,
        )
    }
}

// ── Static classifiers ─────────────────────────────────────

/// Open palm: every non-thumb fingertip is above its PIP joint.
pub fn is_palm_open(hand: &HandFrame) -> bool {
    FINGER_TIP_PIP
        .iter()
        .all(|&(tip, pip)| hand.landmark(tip).y < hand.landmark(pip).y)
}

/// Number of extended digits, thumb included.
///
/// The thumb counts as open when its tip lies left of its IP joint in
/// image space.  This is not mirrored per handedness.
pub fn count_extended_fingers(hand: &HandFrame) -> usize {
    let thumb_open = hand.landmark(THUMB_TIP).x < hand.landmark(THUMB_IP).x;
    let fingers = FINGER_TIP_PIP
        .iter()
        .filter(|&&(tip, pip)| hand.landmark(tip).y < hand.landmark(pip).y)
        .count();
    fingers + usize::from(thumb_open)
}

/// Finger-count bookmark selection: `Some(1..=5)`, or `None` for a closed hand.
pub fn detect_bookmark(hand: &HandFrame) -> Option<u8> {
    match count_extended_fingers(hand) {
        n @ 1..=5 => Some(n as u8),
        _ => None,
    }
}

/// Fist: each neighbouring fingertip pair is closer than `threshold`.
pub fn is_fist_closed(hand: &HandFrame, threshold: f32) -> bool {
    FINGERTIPS
        .windows(2)
        .all(|pair| hand.distance(pair[0], pair[1]) < threshold)
}

/// Pinch: thumb tip and index tip closer than `threshold`.
pub fn is_pinching(hand: &HandFrame, threshold: f32) -> bool {
    hand.distance(THUMB_TIP, INDEX_TIP) < threshold
}

// ── Swipe ──────────────────────────────────────────────────

/// Cross-frame memory for swipe detection: the previous wrist position.
#[derive(Debug, Clone, Default)]
pub struct SwipeState {
    previous: Option<Point>,
}

impl SwipeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare the wrist against the previous call and store it.
    ///
    /// The horizontal axis wins when it dominates; otherwise the vertical
    /// axis is checked.  The first call after construction or reset never
    /// emits.
    pub fn detect(&mut self, hand: &HandFrame, threshold: f32) -> Option<SwipeDirection> {
        let center = hand.wrist();
        let previous = self.previous.replace(center)?;

        let dx = center.x - previous.x;
        let dy = center.y - previous.y;

        let direction = if dx.abs() > dy.abs() {
            if dx > threshold {
                Some(SwipeDirection::Right)
            } else if dx < -threshold {
                Some(SwipeDirection::Left)
            } else {
                None
            }
        } else if dy > threshold {
            Some(SwipeDirection::Down)
        } else if dy < -threshold {
            Some(SwipeDirection::Up)
        } else {
            None
        };

        if let Some(dir) = direction {
            debug!("Swipe detected: {:?} (dx={:.3}, dy={:.3})", dir, dx, dy);
        }
        direction
    }

    /// The stored wrist position, if any.
    pub fn previous(&self) -> Option<Point> {
        self.previous
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

// ── Handedness routing ─────────────────────────────────────

/// Classify one hand's navigation gesture for this frame.
///
/// Right hand: open palm, else swipe.  An open palm short-circuits the
/// swipe check, leaving `swipe` untouched this frame.
/// Left hand: fist (screenshot), else finger-count bookmark.
pub fn classify_hand(
    hand: &HandFrame,
    swipe: &mut SwipeState,
    config: &GestureConfig,
) -> Option<GestureLabel> {
    match hand.handedness {
        Handedness::Right => {
            if is_palm_open(hand) {
                return Some(GestureLabel::PalmOpen);
            }
            swipe
                .detect(hand, config.swipe_threshold)
                .map(GestureLabel::Swipe)
        }
        Handedness::Left => {
            if is_fist_closed(hand, config.fist_threshold) {
                return Some(GestureLabel::Screenshot);
            }
            detect_bookmark(hand).map(GestureLabel::Bookmark)
        }
    }
}

// ── Tests ──────────────────────────────────────────────────
