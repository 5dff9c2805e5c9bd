//! Line-oriented s-expression wire format.
//!
//! Inbound: one plist per line carrying detector frames, mode switches,
//! and bookmark edits.  Outbound: host actions written as event plists by
//! [`SexpHost`].

use std::io::Write;

use lexpr::Value;
use tracing::{debug, warn};

use crate::engine::Mode;
use crate::host::{HostActions, Page};
use crate::keyboard::Key;
use crate::landmarks::{Frame, HandFrame, Handedness, Point, LANDMARK_COUNT};

// ── Messages ───────────────────────────────────────────────

/// One decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    Frame(Frame),
    Mode(Mode),
    BookmarkAdd { label: String, url: String },
    BookmarkRemove { index: usize },
    Status,
}

/// Decode one line.  Malformed hands inside a frame are dropped with a
/// warning; anything else malformed rejects the whole message.
pub fn parse_message(raw: &str) -> Result<WireMessage, String> {
    let value = lexpr::from_str(raw).map_err(|e| format!("malformed s-expression: {e}"))?;

    match get_keyword(&value, "type").as_deref() {
        Some("frame") => decode_frame(&value).map(WireMessage::Frame),
        Some("mode") => match get_keyword(&value, "mode").as_deref() {
            Some("navigation") => Ok(WireMessage::Mode(Mode::Navigation)),
            Some("keyboard") => Ok(WireMessage::Mode(Mode::Keyboard)),
            Some(other) => Err(format!("unknown :mode {other}")),
            None => Err("missing :mode".to_string()),
        },
        Some("bookmark-add") => {
            let label = get_string(&value, "label").ok_or("missing :label")?;
            let url = get_string(&value, "url").ok_or("missing :url")?;
            Ok(WireMessage::BookmarkAdd { label, url })
        }
        Some("bookmark-remove") => match get_int(&value, "index") {
            Some(i) if i >= 1 => Ok(WireMessage::BookmarkRemove { index: i as usize }),
            _ => Err("invalid :index (must be >= 1)".to_string()),
        },
        Some("status") => Ok(WireMessage::Status),
        Some(other) => Err(format!("unknown message type: {other}")),
        None => Err("missing :type field".to_string()),
    }
}

fn decode_frame(value: &Value) -> Result<Frame, String> {
    let t = get_float(value, "t").ok_or("missing or invalid :t")?;
    if !t.is_finite() {
        return Err(format!("non-finite :t {t}"));
    }

    let hands = match get_value(value, "hands") {
        Some(list) => list_items(list)
            .into_iter()
            .enumerate()
            .filter_map(|(i, hand)| match decode_hand(hand) {
                Ok(h) => Some(h),
                Err(e) => {
                    warn!(t, hand = i, "dropping hand: {}", e);
                    None
                }
            })
            .collect(),
        None => Vec::new(),
    };

    Ok(Frame::new(t, hands))
}

fn decode_hand(value: &Value) -> Result<HandFrame, String> {
    let label = get_keyword(value, "handedness").ok_or("missing :handedness")?;
    let handedness =
        Handedness::from_label(&label).ok_or_else(|| format!("unknown handedness {label}"))?;

    let coords = get_value(value, "points")
        .map(list_items)
        .ok_or("missing :points")?
        .into_iter()
        .map(|v| number(v).map(|n| n as f32))
        .collect::<Option<Vec<f32>>>()
        .ok_or("non-numeric landmark coordinate")?;

    // x y pairs, or x y z triples with z ignored
    let stride = match coords.len() {
        n if n == LANDMARK_COUNT * 2 => 2,
        n if n == LANDMARK_COUNT * 3 => 3,
        n => {
            return Err(format!(
                "expected {} or {} coordinates, got {}",
                LANDMARK_COUNT * 2,
                LANDMARK_COUNT * 3,
                n
            ))
        }
    };
    let points: Vec<Point> = coords
        .chunks_exact(stride)
        .map(|c| Point::new(c[0], c[1]))
        .collect();

    HandFrame::from_points(handedness, &points).ok_or_else(|| "non-finite landmark".to_string())
}

// ── Outbound events ────────────────────────────────────────

/// Host that serializes every action as an event line on `out`.
pub struct SexpHost<W: Write> {
    out: W,
    written: u64,
}

impl<W: Write> SexpHost<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    pub fn events_written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, event: String) {
        match writeln!(self.out, "{}", event).and_then(|_| self.out.flush()) {
            Ok(()) => {
                self.written += 1;
                debug!("event: {}", event);
            }
            Err(e) => warn!("failed to write event: {}", e),
        }
    }
}

impl<W: Write> HostActions for SexpHost<W> {
    fn navigate(&mut self, page: Page) {
        self.emit(format_event("navigate", &[("page", &quoted(page.as_str()))]));
    }

    fn open_url(&mut self, url: &str) {
        self.emit(format_event("open-url", &[("url", &quoted(url))]));
    }

    fn capture_screenshot(&mut self) {
        self.emit(format_event("screenshot", &[]));
    }

    fn click_at(&mut self, x: f32, y: f32) {
        self.emit(format_event(
            "click",
            &[("x", &format!("{:.1}", x)), ("y", &format!("{:.1}", y))],
        ));
    }

    fn scroll_by(&mut self, dy: f32) {
        self.emit(format_event("scroll", &[("dy", &format!("{:.1}", dy))]));
    }

    fn submit_search(&mut self, query: &str) {
        self.emit(format_event("search", &[("query", &quoted(query))]));
    }

    fn key_pressed(&mut self, key: &Key, buffer: &str) {
        self.emit(format_event(
            "key",
            &[
                ("key", &quoted(&key.to_string())),
                ("buffer", &quoted(buffer)),
            ],
        ));
    }
}

// ── Helpers ────────────────────────────────────────────────

pub fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn quoted(s: &str) -> String {
    format!("\"{}\"", escape_string(s))
}

/// Format an event s-expression.
pub fn format_event(event_type: &str, fields: &[(&str, &str)]) -> String {
    let mut s = format!("(:type :event :event :{}", event_type);
    for (key, val) in fields {
        s.push_str(&format!(" :{} {}", key, val));
    }
    s.push(')');
    s
}

/// Find the raw value following `:key` in a plist.
/// Handles both `Value::Keyword("key")` and `Value::Symbol(":key")` forms.
pub fn get_value<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let prefixed = format!(":{}", key);
    let mut current = value;
    while let Value::Cons(pair) = current {
        let is_key = match pair.car() {
            Value::Keyword(k) => k.as_ref() == key,
            Value::Symbol(s) => s.as_ref() == prefixed,
            _ => false,
        };
        match pair.cdr() {
            Value::Cons(next) if is_key => return Some(next.car()),
            // Skip the value slot: only even positions are keys
            Value::Cons(next) => current = next.cdr(),
            _ => break,
        }
    }
    None
}

/// Plist value as a string: keywords lose their colon, `nil` for empty.
pub fn get_keyword(value: &Value, key: &str) -> Option<String> {
    let val = get_value(value, key)?;
    Some(match val {
        Value::Keyword(v) => v.to_string(),
        Value::Symbol(v) => {
            let s: &str = v.as_ref();
            s.strip_prefix(':').unwrap_or(s).to_string()
        }
        Value::String(v) => v.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => (if *b { "t" } else { "nil" }).to_string(),
        Value::Null | Value::Nil => "nil".to_string(),
        _ => val.to_string(),
    })
}

pub fn get_int(value: &Value, key: &str) -> Option<i64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

pub fn get_float(value: &Value, key: &str) -> Option<f64> {
    get_value(value, key).and_then(number)
}

pub fn get_string(value: &Value, key: &str) -> Option<String> {
    get_keyword(value, key)
}

/// Elements of a proper list (stops at the first non-cons tail).
pub fn list_items(value: &Value) -> Vec<&Value> {
    let mut items = Vec::new();
    let mut current = value;
    while let Value::Cons(pair) = current {
        items.push(pair.car());
        current = pair.cdr();
    }
    items
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

// ── Tests ──────────────────────────────────────────────────
