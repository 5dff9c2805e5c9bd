//! Host application boundary.
//!
//! The engine never renders, opens URLs, or captures the screen itself.
//! It calls into a [`HostActions`] implementation supplied by the
//! embedding application once per decided action.

use crate::keyboard::Key;

// ── Pages ──────────────────────────────────────────────────

/// Pages of the host interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Home,
    AboutProject,
    AboutMe,
    Learn,
    HowToUse,
    Contact,
    Login,
}

impl Page {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::AboutProject => "about-project",
            Self::AboutMe => "about-me",
            Self::Learn => "learn",
            Self::HowToUse => "how-to-use",
            Self::Contact => "contact",
            Self::Login => "login",
        }
    }
}

// ── Actions ────────────────────────────────────────────────

/// Synchronous calls from the engine into the host.
///
/// Return values are not consumed; a host that fails to carry out an
/// action reports it through its own channels.
pub trait HostActions {
    /// Switch the active page.
    fn navigate(&mut self, page: Page);
    /// Open a URL in a new browsing context.
    fn open_url(&mut self, url: &str);
    /// Capture the full page.
    fn capture_screenshot(&mut self);
    /// Activate the topmost interactive element at screen pixels.
    fn click_at(&mut self, x: f32, y: f32);
    /// Smoothly scroll by `dy` pixels (positive scrolls down).
    fn scroll_by(&mut self, dy: f32);
    /// Submit a search query typed on the dwell keyboard.
    fn submit_search(&mut self, query: &str);
    /// A dwell key fired; `buffer` is the text after applying it.
    fn key_pressed(&mut self, _key: &Key, _buffer: &str) {}
}

/// One recorded host call.
#[derive(Debug, Clone, PartialEq)]
pub enum HostAction {
    Navigate(Page),
    OpenUrl(String),
    Screenshot,
    Click { x: f32, y: f32 },
    Scroll { dy: f32 },
    Search(String),
    KeyPressed { key: Key, buffer: String },
}

/// Host that records every call, for tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub actions: Vec<HostAction>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain recorded actions.
    pub fn take(&mut self) -> Vec<HostAction> {
        std::mem::take(&mut self.actions)
    }

    pub fn clicks(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, HostAction::Click { .. }))
            .count()
    }
}

impl HostActions for RecordingHost {
    fn navigate(&mut self, page: Page) {
        self.actions.push(HostAction::Navigate(page));
    }

    fn open_url(&mut self, url: &str) {
        self.actions.push(HostAction::OpenUrl(url.to_string()));
    }

    fn capture_screenshot(&mut self) {
        self.actions.push(HostAction::Screenshot);
    }

    fn click_at(&mut self, x: f32, y: f32) {
        self.actions.push(HostAction::Click { x, y });
    }

    fn scroll_by(&mut self, dy: f32) {
        self.actions.push(HostAction::Scroll { dy });
    }

    fn submit_search(&mut self, query: &str) {
        self.actions.push(HostAction::Search(query.to_string()));
    }

    fn key_pressed(&mut self, key: &Key, buffer: &str) {
        self.actions.push(HostAction::KeyPressed {
            key: key.clone(),
            buffer: buffer.to_string(),
        });
    }
}
