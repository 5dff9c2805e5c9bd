//! Dwell-to-type virtual keyboard.
//!
//! A grid of key boxes tiles the unit square.  The tracked fingertip is
//! hit-tested against the grid every frame; holding it over one key for
//! that key's dwell time presses it.  ENTER uses a much shorter dwell and
//! ignores the shared press cooldown.

use std::fmt;

use tracing::debug;

use crate::host::HostActions;
use crate::landmarks::Point;

// ── Keys ───────────────────────────────────────────────────

/// One key on the dwell keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable single-character key; the label is what gets typed.
    Char(char),
    Space,
    Backspace,
    Enter,
}

impl Key {
    /// Parse a layout label.  `SPACE`, `BACKSPACE` and `ENTER` are special;
    /// anything else must be a single character.
    pub fn from_label(label: &str) -> Result<Self, String> {
        match label {
            "SPACE" => Ok(Self::Space),
            "BACKSPACE" => Ok(Self::Backspace),
            "ENTER" => Ok(Self::Enter),
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Self::Char(c)),
                    _ => Err(format!("unknown key label: {:?}", other)),
                }
            }
        }
    }

    pub fn is_enter(&self) -> bool {
        matches!(self, Self::Enter)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(c) => write!(f, "{}", c),
            Self::Space => f.write_str("SPACE"),
            Self::Backspace => f.write_str("BACKSPACE"),
            Self::Enter => f.write_str("ENTER"),
        }
    }
}

// ── Layout ─────────────────────────────────────────────────

/// Default key rows.
pub const DEFAULT_ROWS: [&[&str]; 4] = [
    &["Q", "W", "E", "R", "T", "Y", "U", "I", "O", "P"],
    &["A", "S", "D", "F", "G", "H", "J", "K", "L"],
    &["Z", "X", "C", "V", "B", "N", "M"],
    &["SPACE", "BACKSPACE", "ENTER"],
];

/// Rows of keys, top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyboardLayout {
    rows: Vec<Vec<Key>>,
}

impl KeyboardLayout {
    /// Build a layout from label rows.
    ///
    /// Returns `Err` for an empty layout, an empty row, or an unknown label.
    pub fn from_rows<R, S>(rows: &[R]) -> Result<Self, String>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        if rows.is_empty() {
            return Err("keyboard layout has no rows".to_string());
        }
        let mut parsed = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.is_empty() {
                return Err(format!("keyboard row {} is empty", i));
            }
            let keys = row
                .iter()
                .map(|label| Key::from_label(label.as_ref()))
                .collect::<Result<Vec<_>, _>>()?;
            parsed.push(keys);
        }
        Ok(Self { rows: parsed })
    }

    pub fn rows(&self) -> &[Vec<Key>] {
        &self.rows
    }

    pub fn key_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}

impl Default for KeyboardLayout {
    fn default() -> Self {
        let rows = DEFAULT_ROWS
            .iter()
            .map(|row| {
                row.iter()
                    .filter_map(|label| Key::from_label(label).ok())
                    .collect()
            })
            .collect();
        Self { rows }
    }
}

// ── Key boxes ──────────────────────────────────────────────

/// Rectangular region of the unit square owned by one key.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyBox {
    pub key: Key,
    pub x1: f32,
    pub x2: f32,
    pub y1: f32,
    pub y2: f32,
}

impl KeyBox {
    /// Inclusive on every edge.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x1 && p.x <= self.x2 && p.y >= self.y1 && p.y <= self.y2
    }
}

/// Tile the unit square: rows split y evenly, keys split their row's x evenly.
///
/// Boxes are produced in row-major order, which is also hit-test order.
pub fn generate_key_boxes(layout: &KeyboardLayout) -> Vec<KeyBox> {
    let row_count = layout.rows.len() as f32;
    let mut boxes = Vec::with_capacity(layout.key_count());

    for (row_idx, row) in layout.rows.iter().enumerate() {
        let y1 = row_idx as f32 / row_count;
        let y2 = (row_idx + 1) as f32 / row_count;
        let key_count = row.len() as f32;

        for (col_idx, key) in row.iter().enumerate() {
            boxes.push(KeyBox {
                key: key.clone(),
                x1: col_idx as f32 / key_count,
                x2: (col_idx + 1) as f32 / key_count,
                y1,
                y2,
            });
        }
    }

    boxes
}

/// First box containing `p`.  Shared edges resolve to the earlier box.
pub fn hit_test(boxes: &[KeyBox], p: Point) -> Option<&KeyBox> {
    boxes.iter().find(|b| b.contains(p))
}

// ── Config ─────────────────────────────────────────────────

/// Dwell timing for the keyboard.
#[derive(Debug, Clone)]
pub struct DwellConfig {
    /// Hover time (ms) to press a normal key.
    pub hold_ms: f64,
    /// Hover time (ms) to press ENTER.
    pub enter_hold_ms: f64,
    /// Minimum ms between presses of non-ENTER keys.
    pub press_cooldown_ms: f64,
    /// How long (ms) a pressed key shows as active.
    pub active_highlight_ms: f64,
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self {
            hold_ms: 900.0,
            enter_hold_ms: 100.0,
            press_cooldown_ms: 800.0,
            active_highlight_ms: 200.0,
        }
    }
}

impl DwellConfig {
    pub fn hold_for(&self, key: &Key) -> f64 {
        if key.is_enter() {
            self.enter_hold_ms
        } else {
            self.hold_ms
        }
    }

    /// Generate s-expression for config reporting.
    pub fn config_sexp(&self) -> String {
        format!(
            "(:hold-ms {:.0} :enter-hold-ms {:.0} :press-cooldown-ms {:.0} :active-highlight-ms {:.0})",
            self.hold_ms, self.enter_hold_ms, self.press_cooldown_ms, self.active_highlight_ms,
        )
    }
}

// ── State ──────────────────────────────────────────────────

/// Hover state of the dwell machine.
#[derive(Debug, Clone, PartialEq)]
pub enum DwellPhase {
    /// No key under the fingertip.
    Idle,
    /// Fingertip continuously over `key` since `since_ms`.
    Hovering { key: Key, since_ms: f64 },
}

/// How a key should be drawn this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyVisual {
    Normal,
    Hovered,
    Active,
}

/// Dwell keyboard state: hover machine plus the typed text.
pub struct DwellKeyboard {
    pub config: DwellConfig,
    boxes: Vec<KeyBox>,
    phase: DwellPhase,
    last_press_ms: Option<f64>,
    /// Recently pressed key and the time its highlight ends.
    active: Option<(Key, f64)>,
    buffer: String,
}

impl DwellKeyboard {
    pub fn new(config: DwellConfig, layout: &KeyboardLayout) -> Self {
        Self {
            config,
            boxes: generate_key_boxes(layout),
            phase: DwellPhase::Idle,
            last_press_ms: None,
            active: None,
            buffer: String::new(),
        }
    }

    /// Advance the hover machine by one frame.
    ///
    /// `fingertip` is in keyboard space (already smoothed and mirrored);
    /// `None` means no hand.  Returns the key pressed this frame, if any.
    pub fn update(&mut self, now_ms: f64, fingertip: Option<Point>) -> Option<Key> {
        let key = match fingertip.and_then(|p| hit_test(&self.boxes, p)) {
            Some(b) => b.key.clone(),
            None => {
                self.reset();
                return None;
            }
        };

        let since_ms = match &self.phase {
            DwellPhase::Hovering { key: hovered, since_ms } if *hovered == key => *since_ms,
            _ => {
                debug!("Hovering key {}", key);
                self.phase = DwellPhase::Hovering { key, since_ms: now_ms };
                self.active = None;
                return None;
            }
        };

        let held_long_enough = now_ms - since_ms > self.config.hold_for(&key);
        let cooled_down = key.is_enter()
            || self
                .last_press_ms
                .map_or(true, |last| now_ms - last > self.config.press_cooldown_ms);
        if !(held_long_enough && cooled_down) {
            return None;
        }

        debug!("Dwell press: {} after {:.0}ms", key, now_ms - since_ms);
        self.last_press_ms = Some(now_ms);
        self.active = Some((key.clone(), now_ms + self.config.active_highlight_ms));
        Some(key)
    }

    /// Apply a pressed key to the text buffer and notify the host.
    ///
    /// ENTER submits the trimmed buffer as a search (skipped when empty)
    /// and leaves the buffer unchanged.
    pub fn apply_key(&mut self, key: &Key, host: &mut dyn HostActions) {
        match key {
            Key::Char(c) => self.buffer.push(*c),
            Key::Space => self.buffer.push(' '),
            Key::Backspace => {
                self.buffer.pop();
            }
            Key::Enter => {
                let query = self.buffer.trim();
                if query.is_empty() {
                    debug!("ENTER with empty buffer, no search");
                } else {
                    host.submit_search(query);
                }
            }
        }
        host.key_pressed(key, &self.buffer);
    }

    /// Drop hover state (no hand or no key under the fingertip).
    pub fn reset(&mut self) {
        self.phase = DwellPhase::Idle;
        self.active = None;
    }

    pub fn phase(&self) -> &DwellPhase {
        &self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == DwellPhase::Idle
    }

    pub fn hovered_key(&self) -> Option<&Key> {
        match &self.phase {
            DwellPhase::Hovering { key, .. } => Some(key),
            DwellPhase::Idle => None,
        }
    }

    /// Visual state of `key` at `now_ms`.
    pub fn visual(&self, key: &Key, now_ms: f64) -> KeyVisual {
        if let Some((active, until)) = &self.active {
            if active == key && now_ms < *until {
                return KeyVisual::Active;
            }
        }
        if self.hovered_key() == Some(key) {
            KeyVisual::Hovered
        } else {
            KeyVisual::Normal
        }
    }

    pub fn boxes(&self) -> &[KeyBox] {
        &self.boxes
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Generate s-expression for status reporting.
    pub fn status_sexp(&self) -> String {
        let hovered = self
            .hovered_key()
            .map(|k| format!("\"{}\"", k))
            .unwrap_or_else(|| "nil".to_string());
        format!(
            "(:hovered {} :key-count {} :buffer \"{}\")",
            hovered,
            self.boxes.len(),
            crate::wire::escape_string(&self.buffer),
        )
    }
}

// ── Tests ──────────────────────────────────────────────────
