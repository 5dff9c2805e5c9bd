//! Hand landmark data structures.
//!
//! Models the 21 normalized 2D landmarks per hand delivered by the
//! external detector, plus handedness and per-frame grouping.

use tracing::debug;

// ── Landmark indices ───────────────────────────────────────

/// Number of landmarks per hand.
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// (tip, PIP) pairs for the four non-thumb fingers.
pub const FINGER_TIP_PIP: [(usize, usize); 4] = [
    (INDEX_TIP, INDEX_PIP),
    (MIDDLE_TIP, MIDDLE_PIP),
    (RING_TIP, RING_PIP),
    (PINKY_TIP, PINKY_PIP),
];

/// Fingertips in anatomical order, thumb first.
pub const FINGERTIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

// ── Point ──────────────────────────────────────────────────

/// A point in normalized camera space (both axes in [0, 1], y grows down).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Horizontal flip for a front-facing camera.
    pub fn mirrored(&self) -> Point {
        Point::new(1.0 - self.x, self.y)
    }
}

// ── Handedness ─────────────────────────────────────────────

/// Which hand, as labelled by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Parse a detector label ("Left"/"Right", any case).
    pub fn from_label(label: &str) -> Option<Self> {
        if label.eq_ignore_ascii_case("left") {
            Some(Self::Left)
        } else if label.eq_ignore_ascii_case("right") {
            Some(Self::Right)
        } else {
            None
        }
    }
}

// ── Hand frame ─────────────────────────────────────────────

/// One detected hand in one camera frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HandFrame {
    pub handedness: Handedness,
    pub landmarks: [Point; LANDMARK_COUNT],
}

impl HandFrame {
    pub fn new(handedness: Handedness, landmarks: [Point; LANDMARK_COUNT]) -> Self {
        Self {
            handedness,
            landmarks,
        }
    }

    /// Build a hand from a detector-supplied point list.
    ///
    /// Returns `None` unless exactly 21 finite points are present; a partial
    /// hand is treated as absent rather than guessed at.
    pub fn from_points(handedness: Handedness, points: &[Point]) -> Option<Self> {
        if points.len() != LANDMARK_COUNT {
            debug!(
                "Dropping {} hand: expected {} landmarks, got {}",
                handedness.as_str(),
                LANDMARK_COUNT,
                points.len(),
            );
            return None;
        }
        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            debug!("Dropping {} hand: non-finite landmark", handedness.as_str());
            return None;
        }
        let mut landmarks = [Point::default(); LANDMARK_COUNT];
        landmarks.copy_from_slice(points);
        Some(Self::new(handedness, landmarks))
    }

    pub fn landmark(&self, index: usize) -> Point {
        self.landmarks[index]
    }

    /// Distance between two landmarks of this hand.
    pub fn distance(&self, a: usize, b: usize) -> f32 {
        self.landmarks[a].distance(&self.landmarks[b])
    }

    pub fn index_tip(&self) -> Point {
        self.landmarks[INDEX_TIP]
    }

    pub fn wrist(&self) -> Point {
        self.landmarks[WRIST]
    }
}

// ── Frame ──────────────────────────────────────────────────

/// Everything the detector reported for one camera frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    /// Wall-clock timestamp in milliseconds.
    pub timestamp_ms: f64,
    /// Zero or more hands; empty is a valid frame.
    pub hands: Vec<HandFrame>,
}

impl Frame {
    pub fn new(timestamp_ms: f64, hands: Vec<HandFrame>) -> Self {
        Self { timestamp_ms, hands }
    }

    pub fn empty(timestamp_ms: f64) -> Self {
        Self::new(timestamp_ms, Vec::new())
    }

    pub fn has_hands(&self) -> bool {
        !self.hands.is_empty()
    }

    /// The hand that drives cursor, click and scroll this frame:
    /// the first Right hand if present, else the first hand.
    pub fn controlling_hand(&self) -> Option<&HandFrame> {
        self.hands
            .iter()
            .find(|h| h.handedness == Handedness::Right)
            .or_else(|| self.hands.first())
    }
}

// ── Test helpers ───────────────────────────────────────────

/// A neutral hand: fingers curled (tips below their PIPs), thumb tucked
/// (tip right of IP), fingertips spread so no fist or pinch registers.
#[cfg(test)]
pub(crate) fn make_hand(handedness: Handedness) -> HandFrame {
    let mut landmarks = [Point::new(0.5, 0.5); LANDMARK_COUNT];
    landmarks[WRIST] = Point::new(0.5, 0.8);
    landmarks[THUMB_CMC] = Point::new(0.45, 0.75);
    landmarks[THUMB_MCP] = Point::new(0.42, 0.7);
    landmarks[THUMB_IP] = Point::new(0.40, 0.65);
    landmarks[THUMB_TIP] = Point::new(0.45, 0.62);
    for (finger, (tip, pip)) in FINGER_TIP_PIP.iter().enumerate() {
        let x = 0.35 + finger as f32 * 0.1;
        landmarks[pip - 1] = Point::new(x, 0.6);
        landmarks[*pip] = Point::new(x, 0.5);
        landmarks[pip + 1] = Point::new(x, 0.52);
        landmarks[*tip] = Point::new(x, 0.55);
    }
    HandFrame::new(handedness, landmarks)
}

/// Extend a finger by moving its tip above its PIP.
#[cfg(test)]
pub(crate) fn extend_finger(hand: &mut HandFrame, tip: usize, pip: usize) {
    let pip_pos = hand.landmarks[pip];
    hand.landmarks[tip] = Point::new(pip_pos.x, pip_pos.y - 0.1);
}

#[cfg(test)]
pub(crate) fn set_landmark(hand: &mut HandFrame, index: usize, x: f32, y: f32) {
    hand.landmarks[index] = Point::new(x, y);
}

// ── Tests ──────────────────────────────────────────────────
