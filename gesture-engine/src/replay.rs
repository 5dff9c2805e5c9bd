//! Scripted replay driver.
//!
//! A reader thread feeds wire lines through a bounded calloop channel into
//! a single-threaded event loop, which decodes each line and drives the
//! engine.  At most one line is buffered, so frames stay serialized.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Context};
use calloop::channel::{sync_channel, Event};
use calloop::EventLoop;
use tracing::{debug, info, warn};

use crate::engine::{Detector, Engine, Mode};
use crate::host::HostActions;
use crate::wire::{parse_message, WireMessage};

/// Global flag set by SIGTERM/SIGINT handlers.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Install signal handlers for graceful shutdown (SIGTERM, SIGINT).
pub fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGTERM, signal_handler as libc::sighandler_t);
        libc::signal(libc::SIGINT, signal_handler as libc::sighandler_t);
    }
}

extern "C" fn signal_handler(_sig: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

// ── Detector ───────────────────────────────────────────────

/// Detector stand-in for recorded input: frames already exist in the
/// script, so acquiring only tracks which mode the script is feeding.
#[derive(Debug, Default)]
pub struct ScriptDetector {
    mode: Option<Mode>,
}

impl ScriptDetector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Detector for ScriptDetector {
    fn name(&self) -> &str {
        "script"
    }

    fn acquire(&mut self, mode: Mode) -> anyhow::Result<()> {
        debug!(max_hands = mode.max_hands(), "script detector configured for {}", mode);
        self.mode = Some(mode);
        Ok(())
    }

    fn release(&mut self) {
        self.mode = None;
    }
}

// ── Replay ─────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    pub lines: u64,
    pub frames: u64,
    pub rejected: u64,
}

/// Result of a finished replay; dropping `engine` releases its detector.
pub struct Replay<H> {
    pub engine: Engine,
    pub host: H,
    pub stats: ReplayStats,
}

struct ReplayState<H> {
    engine: Engine,
    host: H,
    stats: ReplayStats,
    ipc_trace: bool,
    running: bool,
}

impl<H: HostActions> ReplayState<H> {
    fn handle_line(&mut self, line: &str) {
        self.stats.lines += 1;
        if self.ipc_trace {
            info!("<- {}", line);
        }

        let message = match parse_message(line) {
            Ok(m) => m,
            Err(e) => {
                warn!(line = self.stats.lines, "skipping message: {}", e);
                self.stats.rejected += 1;
                return;
            }
        };

        match message {
            WireMessage::Frame(frame) => {
                self.stats.frames += 1;
                self.engine.process_frame(&frame, &mut self.host);
            }
            WireMessage::Mode(mode) => {
                if let Err(e) = self
                    .engine
                    .switch_mode(mode, Box::new(ScriptDetector::new()))
                {
                    warn!("mode switch to {} failed: {:#}", mode, e);
                }
            }
            WireMessage::BookmarkAdd { label, url } => {
                if let Err(e) = self.engine.bookmarks_mut().add(&label, &url) {
                    warn!("bookmark-add rejected: {}", e);
                }
            }
            WireMessage::BookmarkRemove { index } => {
                if self.engine.bookmarks_mut().remove(index).is_none() {
                    warn!("bookmark-remove: no bookmark at {}", index);
                }
            }
            WireMessage::Status => {
                info!("status: {}", self.engine.status_sexp());
                info!("bookmarks: {}", self.engine.bookmarks().bookmarks_sexp());
            }
        }
    }
}

/// Replay every line of `input` through `engine`, writing actions to `host`.
///
/// Returns when the input is exhausted or a shutdown signal arrives.
pub fn replay<H, R>(engine: Engine, input: R, host: H, ipc_trace: bool) -> anyhow::Result<Replay<H>>
where
    H: HostActions,
    R: BufRead + Send + 'static,
{
    let mut event_loop = EventLoop::<ReplayState<H>>::try_new()?;
    let (tx, rx) = sync_channel::<String>(1);

    event_loop
        .handle()
        .insert_source(rx, |event, _, state| match event {
            Event::Msg(line) => state.handle_line(&line),
            Event::Closed => {
                debug!("script exhausted");
                state.running = false;
            }
        })
        .map_err(|e| anyhow!("failed to insert frame channel: {}", e.error))?;

    let reader = std::thread::Builder::new()
        .name("script-reader".into())
        .spawn(move || -> anyhow::Result<()> {
            for line in input.lines() {
                let line = line.context("reading script")?;
                let line = line.trim();
                if line.is_empty() || line.starts_with(';') {
                    continue;
                }
                if tx.send(line.to_string()).is_err() {
                    // Event loop gone
                    break;
                }
            }
            Ok(())
        })
        .context("spawning script reader")?;

    let mut state = ReplayState {
        engine,
        host,
        stats: ReplayStats::default(),
        ipc_trace,
        running: true,
    };

    let poll_interval = Duration::from_millis(100);
    let mut interrupted = false;
    while state.running {
        if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            info!("Shutdown signal received, exiting");
            interrupted = true;
            break;
        }
        event_loop.dispatch(Some(poll_interval), &mut state)?;
    }

    // A reader blocked on stdin would never join after a signal
    if !interrupted {
        match reader.join() {
            Ok(result) => result?,
            Err(_) => warn!("script reader panicked"),
        }
    }

    info!(
        lines = state.stats.lines,
        frames = state.stats.frames,
        rejected = state.stats.rejected,
        "replay finished"
    );
    Ok(Replay {
        engine: state.engine,
        host: state.host,
        stats: state.stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use crate::bookmarks::BookmarkList;
    use crate::config::EngineConfig;
    use crate::host::{HostAction, RecordingHost};
    use crate::keyboard::Key;

    /// A right hand, curled, with the wrist and index tip placed.
    fn hand_line(wrist_x: f32, tip_x: f32, tip_y: f32) -> String {
        let mut coords = Vec::new();
        for i in 0..21 {
            let (x, y) = match i {
                0 => (wrist_x, 0.8),
                4 => (0.45, 0.62),
                3 => (0.40, 0.65),
                8 => (tip_x, tip_y),
                6 | 10 | 14 | 18 => (0.3 + i as f32 * 0.01, 0.2),
                _ => (0.3 + i as f32 * 0.01, 0.6),
            };
            coords.push(format!("{x} {y}"));
        }
        format!("(:handedness :right :points ({}))", coords.join(" "))
    }

    fn frame_line(t: f64, hands: &[String]) -> String {
        format!("(:type :frame :t {} :hands ({}))", t, hands.join(" "))
    }

    fn run(script: String, engine: Engine) -> Replay<RecordingHost> {
        replay(engine, Cursor::new(script), RecordingHost::new(), false).unwrap()
    }

    fn engine() -> Engine {
        Engine::new(EngineConfig::default(), BookmarkList::with_defaults())
    }

    #[test]
    fn test_replay_requires_mode() {
        let script = frame_line(0.0, &[hand_line(0.5, 0.5, 0.5)]);
        let result = run(script, engine());
        assert_eq!(result.stats.frames, 1);
        assert_eq!(result.engine.frames_processed(), 0);
    }

    #[test]
    fn test_replay_swipe_and_skip_malformed() {
        let script = [
            "; navigation demo".to_string(),
            "(:type :mode :mode :navigation)".to_string(),
            frame_line(0.0, &[hand_line(0.5, 0.5, 0.5)]),
            "(:type :frame".to_string(),
            String::new(),
            frame_line(33.0, &[hand_line(0.7, 0.5, 0.5)]),
        ]
        .join("\n");
        let result = run(script, engine());

        assert_eq!(result.stats.lines, 4);
        assert_eq!(result.stats.frames, 2);
        assert_eq!(result.stats.rejected, 1);
        assert!(result
            .host
            .actions
            .contains(&HostAction::Navigate(crate::host::Page::Contact)));
    }

    #[test]
    fn test_replay_keyboard_typing() {
        let mut lines = vec!["(:type :mode :mode :keyboard)".to_string()];
        let mut t = 0.0;
        while t < 1000.0 {
            lines.push(frame_line(t, &[hand_line(0.5, 0.95, 0.3)]));
            t += 33.0;
        }
        let result = run(lines.join("\n"), engine());
        assert_eq!(result.engine.mode(), Some(Mode::Keyboard));
        assert_eq!(
            result.host.actions,
            vec![HostAction::KeyPressed {
                key: Key::Char('A'),
                buffer: "A".to_string(),
            }]
        );
    }

    #[test]
    fn test_replay_bookmark_edits() {
        let script = [
            "(:type :bookmark-remove :index 5)",
            "(:type :bookmark-add :label \"Docs\" :url \"https://docs.rs\")",
            "(:type :bookmark-add :label \"Full\" :url \"https://example.com\")",
            "(:type :bookmark-remove :index 9)",
        ]
        .join("\n");
        let mut result = run(script, engine());
        let bookmarks = result.engine.bookmarks_mut();
        assert_eq!(bookmarks.len(), 5);
        assert_eq!(bookmarks.get(5).map(|b| b.url.as_str()), Some("https://docs.rs"));
    }

    #[test]
    fn test_script_detector_tracks_mode() {
        let mut detector = ScriptDetector::new();
        detector.acquire(Mode::Keyboard).unwrap();
        assert_eq!(detector.mode, Some(Mode::Keyboard));
        detector.release();
        assert_eq!(detector.mode, None);
    }
}
