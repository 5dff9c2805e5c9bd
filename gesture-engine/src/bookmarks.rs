//! Bookmark list addressed by the finger-count gesture.

use tracing::debug;

/// Maximum number of bookmarks (one per countable digit).
pub const MAX_BOOKMARKS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub label: String,
    pub url: String,
}

impl Bookmark {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// Ordered bookmarks, 1-based from the gesture's point of view.
#[derive(Debug, Clone, Default)]
pub struct BookmarkList {
    entries: Vec<Bookmark>,
}

impl BookmarkList {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock set shipped with the interface.
    pub fn with_defaults() -> Self {
        Self {
            entries: vec![
                Bookmark::new("Google", "https://www.google.com"),
                Bookmark::new("YouTube", "https://www.youtube.com"),
                Bookmark::new("GitHub", "https://github.com"),
                Bookmark::new("LinkedIn", "https://www.linkedin.com"),
                Bookmark::new("VIPS-TC", "https://vipstc.edu.in"),
            ],
        }
    }

    /// Append a bookmark.
    ///
    /// Returns `Err` when the list is full or either field is blank.
    pub fn add(&mut self, label: &str, url: &str) -> Result<(), String> {
        let label = label.trim();
        let url = url.trim();
        if label.is_empty() || url.is_empty() {
            return Err("bookmark label and url are required".to_string());
        }
        if self.entries.len() >= MAX_BOOKMARKS {
            return Err(format!("at most {} bookmarks allowed", MAX_BOOKMARKS));
        }
        self.entries.push(Bookmark::new(label, url));
        debug!("Bookmark added: {} -> {}", label, url);
        Ok(())
    }

    /// Remove the bookmark at 1-based `position`, returning it.
    pub fn remove(&mut self, position: usize) -> Option<Bookmark> {
        if position == 0 || position > self.entries.len() {
            return None;
        }
        let removed = self.entries.remove(position - 1);
        debug!("Bookmark removed: {}", removed.label);
        Some(removed)
    }

    /// Look up by 1-based position.
    pub fn get(&self, position: usize) -> Option<&Bookmark> {
        position.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bookmark> {
        self.entries.iter()
    }

    /// Generate s-expression listing all bookmarks.
    pub fn bookmarks_sexp(&self) -> String {
        if self.entries.is_empty() {
            return "nil".to_string();
        }
        let items: Vec<String> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, b)| {
                format!(
                    "(:position {} :label \"{}\" :url \"{}\")",
                    i + 1,
                    crate::wire::escape_string(&b.label),
                    crate::wire::escape_string(&b.url),
                )
            })
            .collect();
        format!("({})", items.join(" "))
    }
}
