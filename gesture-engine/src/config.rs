//! Engine configuration: per-subsystem tunables and plist loading.

use std::path::Path;

use anyhow::{bail, Context};
use lexpr::Value;
use tracing::info;

use crate::dispatcher::DispatchConfig;
use crate::gesture::GestureConfig;
use crate::keyboard::{DwellConfig, KeyboardLayout};
use crate::pointer::PointerConfig;
use crate::scroll::ScrollConfig;
use crate::smoothing::DEFAULT_WINDOW;
use crate::wire::{get_keyword, get_value, list_items};

/// All engine tunables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub gesture: GestureConfig,
    pub dispatch: DispatchConfig,
    pub pointer: PointerConfig,
    pub scroll: ScrollConfig,
    pub dwell: DwellConfig,
    /// Fingertip smoothing window (frames) in keyboard mode.
    pub smoothing_window: usize,
    pub layout: KeyboardLayout,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gesture: GestureConfig::default(),
            dispatch: DispatchConfig::default(),
            pointer: PointerConfig::default(),
            scroll: ScrollConfig::default(),
            dwell: DwellConfig::default(),
            smoothing_window: DEFAULT_WINDOW,
            layout: KeyboardLayout::default(),
        }
    }
}

impl EngineConfig {
    /// Read a plist config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config =
            Self::from_sexp(&text).with_context(|| format!("parsing config {}", path.display()))?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse a plist such as `(:swipe-threshold 0.1 :action-cooldown-ms 600)`.
    ///
    /// Keys not present keep their defaults; unknown keys are ignored.
    pub fn from_sexp(text: &str) -> anyhow::Result<Self> {
        let value = lexpr::from_str(text).context("malformed s-expression")?;
        let mut config = Self::default();

        if let Some(v) = positive(&value, "swipe-threshold")? {
            config.gesture.swipe_threshold = v as f32;
        }
        if let Some(v) = positive(&value, "pinch-threshold")? {
            config.pointer.pinch_threshold = v as f32;
        }
        if let Some(v) = positive(&value, "fist-threshold")? {
            config.gesture.fist_threshold = v as f32;
        }

        if let Some(v) = non_negative(&value, "action-cooldown-ms")? {
            config.dispatch.cooldown_ms = v;
        }
        if let Some(v) = positive(&value, "log-capacity")? {
            config.dispatch.log_capacity = v as usize;
        }

        if let Some(v) = positive(&value, "viewport-width")? {
            config.pointer.viewport_width = v as f32;
        }
        if let Some(v) = positive(&value, "viewport-height")? {
            config.pointer.viewport_height = v as f32;
        }

        if let Some(v) = non_negative(&value, "scroll-cooldown-ms")? {
            config.scroll.cooldown_ms = v;
        }
        if let Some(v) = non_negative(&value, "scroll-deadband")? {
            config.scroll.deadband = v as f32;
        }
        if let Some(v) = positive(&value, "scroll-sensitivity")? {
            config.scroll.sensitivity = v as f32;
        }
        if let Some(v) = positive(&value, "scroll-right-hand-sensitivity")? {
            config.scroll.right_hand_sensitivity = v as f32;
        }

        if let Some(v) = non_negative(&value, "hold-ms")? {
            config.dwell.hold_ms = v;
        }
        if let Some(v) = non_negative(&value, "enter-hold-ms")? {
            config.dwell.enter_hold_ms = v;
        }
        if let Some(v) = non_negative(&value, "press-cooldown-ms")? {
            config.dwell.press_cooldown_ms = v;
        }
        if let Some(v) = non_negative(&value, "active-highlight-ms")? {
            config.dwell.active_highlight_ms = v;
        }

        if let Some(v) = positive(&value, "smoothing-window")? {
            config.smoothing_window = v as usize;
        }

        if let Some(rows) = get_value(&value, "layout") {
            config.layout = parse_layout(rows)?;
        }

        Ok(config)
    }

    /// Set the viewport from a `WIDTHxHEIGHT` string.
    pub fn set_viewport(&mut self, resolution: &str) -> anyhow::Result<()> {
        let (w, h) = parse_resolution(resolution)?;
        self.pointer.viewport_width = w as f32;
        self.pointer.viewport_height = h as f32;
        Ok(())
    }

    /// Generate s-expression for config reporting.
    pub fn config_sexp(&self) -> String {
        format!(
            "(:gesture {} :pinch-threshold {:.3} :action-cooldown-ms {:.0} :log-capacity {} :viewport \"{}x{}\" \
             :scroll (:cooldown-ms {:.0} :deadband {:.3} :sensitivity {:.0} :right-hand-sensitivity {:.0}) \
             :dwell {} :smoothing-window {} :keys {})",
            self.gesture.config_sexp(),
            self.pointer.pinch_threshold,
            self.dispatch.cooldown_ms,
            self.dispatch.log_capacity,
            self.pointer.viewport_width,
            self.pointer.viewport_height,
            self.scroll.cooldown_ms,
            self.scroll.deadband,
            self.scroll.sensitivity,
            self.scroll.right_hand_sensitivity,
            self.dwell.config_sexp(),
            self.smoothing_window,
            self.layout.key_count(),
        )
    }
}

/// Parse a `WIDTHxHEIGHT` string such as `"1920x1080"`.
pub fn parse_resolution(s: &str) -> anyhow::Result<(u32, u32)> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        bail!("invalid resolution '{}', expected WIDTHxHEIGHT", s);
    }
    let w: u32 = parts[0]
        .parse()
        .with_context(|| format!("invalid width in '{}'", s))?;
    let h: u32 = parts[1]
        .parse()
        .with_context(|| format!("invalid height in '{}'", s))?;
    if w == 0 || h == 0 || w > 7680 || h > 4320 {
        bail!("resolution {}x{} out of range (max 7680x4320)", w, h);
    }
    Ok((w, h))
}

/// Layout rows as a list of strings of space-separated labels:
/// `("Q W E R" "A S D F" "SPACE ENTER")`.
fn parse_layout(rows: &Value) -> anyhow::Result<KeyboardLayout> {
    let rows = list_items(rows)
        .into_iter()
        .map(|row| match row {
            Value::String(s) => Ok(s.split_whitespace().collect::<Vec<_>>()),
            other => bail!(":layout rows must be strings, got {}", other),
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    KeyboardLayout::from_rows(&rows).map_err(|e| anyhow::anyhow!("invalid :layout: {}", e))
}

fn number(value: &Value, key: &str) -> anyhow::Result<Option<f64>> {
    match get_keyword(value, key) {
        None => Ok(None),
        Some(raw) => match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => bail!("invalid :{} {:?}, expected a number", key, raw),
        },
    }
}

fn positive(value: &Value, key: &str) -> anyhow::Result<Option<f64>> {
    match number(value, key)? {
        Some(v) if v <= 0.0 => bail!(":{} must be positive, got {}", key, v),
        other => Ok(other),
    }
}

fn non_negative(value: &Value, key: &str) -> anyhow::Result<Option<f64>> {
    match number(value, key)? {
        Some(v) if v < 0.0 => bail!(":{} must not be negative, got {}", key, v),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::Key;

    #[test]
    fn test_empty_plist_gives_defaults() {
        let config = EngineConfig::from_sexp("()").unwrap();
        assert_eq!(config.dispatch.cooldown_ms, 800.0);
        assert_eq!(config.smoothing_window, 6);
        assert_eq!(config.layout, KeyboardLayout::default());
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_sexp(
            "(:swipe-threshold 0.1 :action-cooldown-ms 600 :pinch-threshold 0.05 \
             :hold-ms 700 :smoothing-window 4 :viewport-width 1280 :unknown-key 9)",
        )
        .unwrap();
        assert!((config.gesture.swipe_threshold - 0.1).abs() < 1e-6);
        assert_eq!(config.dispatch.cooldown_ms, 600.0);
        assert!((config.pointer.pinch_threshold - 0.05).abs() < 1e-6);
        assert_eq!(config.dwell.hold_ms, 700.0);
        assert_eq!(config.smoothing_window, 4);
        assert_eq!(config.pointer.viewport_width, 1280.0);
        assert_eq!(config.pointer.viewport_height, 1080.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(EngineConfig::from_sexp("(:swipe-threshold -0.1)").is_err());
        assert!(EngineConfig::from_sexp("(:smoothing-window 0)").is_err());
        assert!(EngineConfig::from_sexp("(:hold-ms \"soon\")").is_err());
        assert!(EngineConfig::from_sexp("(:scroll-cooldown-ms -5)").is_err());
        assert!(EngineConfig::from_sexp("(:swipe-threshold").is_err());
    }

    #[test]
    fn test_zero_cooldown_allowed() {
        let config = EngineConfig::from_sexp("(:action-cooldown-ms 0)").unwrap();
        assert_eq!(config.dispatch.cooldown_ms, 0.0);
    }

    #[test]
    fn test_custom_layout() {
        let config =
            EngineConfig::from_sexp("(:layout (\"1 2 3\" \"BACKSPACE ENTER\"))").unwrap();
        assert_eq!(config.layout.key_count(), 5);
        assert_eq!(config.layout.rows()[1], vec![Key::Backspace, Key::Enter]);

        assert!(EngineConfig::from_sexp("(:layout (\"A SHIFT\"))").is_err());
        assert!(EngineConfig::from_sexp("(:layout (\"A\" \"\"))").is_err());
        assert!(EngineConfig::from_sexp("(:layout (1 2))").is_err());
    }

    #[test]
    fn test_parse_resolution() {
        assert_eq!(parse_resolution("1920x1080").unwrap(), (1920, 1080));
        assert!(parse_resolution("1920").is_err());
        assert!(parse_resolution("0x100").is_err());
        assert!(parse_resolution("axb").is_err());
    }

    #[test]
    fn test_set_viewport() {
        let mut config = EngineConfig::default();
        config.set_viewport("800x600").unwrap();
        assert_eq!(config.pointer.viewport_width, 800.0);
        assert_eq!(config.pointer.viewport_height, 600.0);
    }

    #[test]
    fn test_config_sexp() {
        let sexp = EngineConfig::default().config_sexp();
        assert!(sexp.contains(":action-cooldown-ms 800"));
        assert!(sexp.contains(":viewport \"1920x1080\""));
        assert!(sexp.contains(":smoothing-window 6"));
        assert!(sexp.contains(":keys 29"));
        assert!(sexp.contains(":pinch-threshold 0.040"));
        assert!(sexp.contains(":sensitivity 400 :right-hand-sensitivity 400"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load(Path::new("/nonexistent/gesture.sexp")).unwrap_err();
        assert!(format!("{:#}", err).contains("reading config"));
    }
}
