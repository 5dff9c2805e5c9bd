//! Gesture event dispatch: global cooldown, action binding, action log.

use std::collections::VecDeque;

use tracing::debug;

use crate::bookmarks::BookmarkList;
use crate::gesture::{GestureEvent, GestureLabel, SwipeDirection};
use crate::host::{HostActions, Page};

// ── Config ─────────────────────────────────────────────────

/// Configuration for the event dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Minimum milliseconds between two accepted actions (any labels).
    pub cooldown_ms: f64,
    /// Number of log entries retained, newest first.
    pub log_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 800.0,
            log_capacity: 100,
        }
    }
}

// ── State ──────────────────────────────────────────────────

/// One accepted action.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp_ms: f64,
    pub label: GestureLabel,
}

/// Dispatcher state: single instance per session, shared by both hands.
pub struct Dispatcher {
    pub config: DispatchConfig,
    pub bookmarks: BookmarkList,
    last_action_ms: Option<f64>,
    last_label: Option<GestureLabel>,
    log: VecDeque<LogEntry>,
    /// Events rejected by the cooldown.
    throttled: u64,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig, bookmarks: BookmarkList) -> Self {
        Self {
            config,
            bookmarks,
            last_action_ms: None,
            last_label: None,
            log: VecDeque::new(),
            throttled: 0,
        }
    }

    /// Dispatch a gesture event, returning whether it was accepted.
    ///
    /// Events arriving within the cooldown of the last accepted one are
    /// dropped, not queued.
    pub fn dispatch(&mut self, event: GestureEvent, host: &mut dyn HostActions) -> bool {
        if let Some(last) = self.last_action_ms {
            if event.timestamp_ms - last < self.config.cooldown_ms {
                self.throttled += 1;
                return false;
            }
        }

        self.last_action_ms = Some(event.timestamp_ms);
        self.last_label = Some(event.label);
        self.log.push_front(LogEntry {
            timestamp_ms: event.timestamp_ms,
            label: event.label,
        });
        self.log.truncate(self.config.log_capacity);
        debug!("Gesture dispatched: {} at {:.0}ms", event.label, event.timestamp_ms);

        match event.label {
            GestureLabel::Bookmark(n) => match self.bookmarks.get(usize::from(n)) {
                Some(bookmark) => host.open_url(&bookmark.url),
                None => debug!("No bookmark at position {}", n),
            },
            GestureLabel::Screenshot => host.capture_screenshot(),
            GestureLabel::PalmOpen => host.navigate(Page::Home),
            GestureLabel::Swipe(dir) => host.navigate(page_for_swipe(dir)),
        }
        true
    }

    pub fn last_label(&self) -> Option<GestureLabel> {
        self.last_label
    }

    pub fn last_action_ms(&self) -> Option<f64> {
        self.last_action_ms
    }

    /// Accepted actions, newest first.
    pub fn log(&self) -> impl Iterator<Item = &LogEntry> {
        self.log.iter()
    }

    pub fn throttled_count(&self) -> u64 {
        self.throttled
    }

    /// Generate s-expression for status reporting.
    pub fn status_sexp(&self) -> String {
        let last = self
            .last_label
            .map(|l| format!("\"{}\"", l))
            .unwrap_or_else(|| "nil".to_string());
        format!(
            "(:last-gesture {} :log-len {} :throttled {} :bookmarks {})",
            last,
            self.log.len(),
            self.throttled,
            self.bookmarks.len(),
        )
    }
}

/// Fixed page per swipe direction.
pub fn page_for_swipe(dir: SwipeDirection) -> Page {
    match dir {
        SwipeDirection::Left => Page::AboutProject,
        SwipeDirection::Right => Page::Contact,
        SwipeDirection::Up => Page::AboutMe,
        SwipeDirection::Down => Page::Login,
    }
}

// ── Tests ──────────────────────────────────────────────────
