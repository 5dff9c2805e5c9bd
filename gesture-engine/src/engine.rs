//! Interaction engine: mode sessions, detector leases, frame routing.
//!
//! One [`Engine`] lives for the whole process.  It owns the dispatcher
//! (so the action cooldown survives mode switches) and at most one active
//! mode, which pairs fresh per-mode state with a [`DetectorLease`] on the
//! hand detector configured for that mode.

use std::fmt;

use anyhow::Context;
use tracing::{debug, info};

use crate::bookmarks::BookmarkList;
use crate::config::EngineConfig;
use crate::dispatcher::Dispatcher;
use crate::gesture::{classify_hand, GestureEvent, SwipeState};
use crate::host::HostActions;
use crate::keyboard::DwellKeyboard;
use crate::landmarks::Frame;
use crate::pointer::PointerState;
use crate::scroll::ScrollController;
use crate::smoothing::SmoothingHistory;

// ── Mode ───────────────────────────────────────────────────

/// Mutually exclusive interaction modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Gestures, cursor, click and scroll.
    Navigation,
    /// Dwell-to-type keyboard.
    Keyboard,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Keyboard => "keyboard",
        }
    }

    /// Hands the detector should track in this mode.
    pub fn max_hands(&self) -> usize {
        match self {
            Self::Navigation => 2,
            Self::Keyboard => 1,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Detector lease ─────────────────────────────────────────

/// External hand-landmark detector (camera plus model).
pub trait Detector {
    fn name(&self) -> &str;
    /// Start delivering frames configured for `mode`.
    fn acquire(&mut self, mode: Mode) -> anyhow::Result<()>;
    /// Stop delivering frames and free the device.
    fn release(&mut self);
}

/// Scoped ownership of an acquired detector.  Dropping the lease releases it.
pub struct DetectorLease {
    detector: Box<dyn Detector>,
    mode: Mode,
}

impl DetectorLease {
    pub fn acquire(mut detector: Box<dyn Detector>, mode: Mode) -> anyhow::Result<Self> {
        detector
            .acquire(mode)
            .with_context(|| format!("acquiring detector {} for {} mode", detector.name(), mode))?;
        info!(detector = detector.name(), %mode, "detector acquired");
        Ok(Self { detector, mode })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}

impl Drop for DetectorLease {
    fn drop(&mut self) {
        self.detector.release();
        info!(detector = self.detector.name(), mode = %self.mode, "detector released");
    }
}

// ── Sessions ───────────────────────────────────────────────

/// Per-entry navigation state.
pub struct NavigationSession {
    pub swipe: SwipeState,
    pub pointer: PointerState,
    pub scroll: ScrollController,
}

impl NavigationSession {
    fn new() -> Self {
        Self {
            swipe: SwipeState::new(),
            pointer: PointerState::new(),
            scroll: ScrollController::new(),
        }
    }

    /// No hands: drop cursor, click latch, scroll reference and swipe memory.
    fn reset(&mut self) {
        self.pointer.clear();
        self.scroll.reset();
        self.swipe.reset();
    }
}

/// Per-entry keyboard state.
pub struct KeyboardSession {
    pub smoothing: SmoothingHistory,
    pub keyboard: DwellKeyboard,
}

pub enum Session {
    Navigation(NavigationSession),
    Keyboard(KeyboardSession),
}

struct ActiveMode {
    session: Session,
    // Declared last so session state is gone before the detector is released
    lease: DetectorLease,
}

// ── Engine ─────────────────────────────────────────────────

pub struct Engine {
    pub config: EngineConfig,
    dispatcher: Dispatcher,
    active: Option<ActiveMode>,
    frames_processed: u64,
}

impl Engine {
    pub fn new(config: EngineConfig, bookmarks: BookmarkList) -> Self {
        let dispatcher = Dispatcher::new(config.dispatch.clone(), bookmarks);
        Self {
            config,
            dispatcher,
            active: None,
            frames_processed: 0,
        }
    }

    /// Enter `mode` using `detector`.
    ///
    /// The outgoing mode's detector is released before the incoming one is
    /// acquired.  On failure the engine is left with no active mode.
    pub fn switch_mode(&mut self, mode: Mode, detector: Box<dyn Detector>) -> anyhow::Result<()> {
        if let Some(old) = self.active.take() {
            info!(from = %old.lease.mode(), to = %mode, "switching mode");
            drop(old);
        }

        let lease = DetectorLease::acquire(detector, mode)?;
        let session = match mode {
            Mode::Navigation => Session::Navigation(NavigationSession::new()),
            Mode::Keyboard => Session::Keyboard(KeyboardSession {
                smoothing: SmoothingHistory::new(self.config.smoothing_window),
                keyboard: DwellKeyboard::new(self.config.dwell.clone(), &self.config.layout),
            }),
        };
        self.active = Some(ActiveMode { session, lease });
        Ok(())
    }

    /// Leave the active mode, releasing its detector.
    pub fn deactivate(&mut self) {
        if let Some(old) = self.active.take() {
            info!(mode = %old.lease.mode(), "deactivating");
        }
    }

    pub fn mode(&self) -> Option<Mode> {
        self.active.as_ref().map(|a| a.lease.mode())
    }

    pub fn session(&self) -> Option<&Session> {
        self.active.as_ref().map(|a| &a.session)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn bookmarks(&self) -> &BookmarkList {
        &self.dispatcher.bookmarks
    }

    pub fn bookmarks_mut(&mut self) -> &mut BookmarkList {
        &mut self.dispatcher.bookmarks
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Route one detector frame through the active mode.
    pub fn process_frame(&mut self, frame: &Frame, host: &mut dyn HostActions) {
        let Some(active) = self.active.as_mut() else {
            debug!("frame at {:.0}ms ignored, no active mode", frame.timestamp_ms);
            return;
        };
        self.frames_processed += 1;

        match &mut active.session {
            Session::Navigation(nav) => {
                process_navigation(&self.config, &mut self.dispatcher, nav, frame, host)
            }
            Session::Keyboard(kb) => process_keyboard(kb, frame, host),
        }
    }

    /// Generate s-expression for status reporting.
    pub fn status_sexp(&self) -> String {
        let mode = self
            .mode()
            .map(|m| format!(":{}", m.as_str()))
            .unwrap_or_else(|| "nil".to_string());
        let session = match self.session() {
            Some(Session::Navigation(nav)) => nav.pointer.status_sexp(),
            Some(Session::Keyboard(kb)) => kb.keyboard.status_sexp(),
            None => "nil".to_string(),
        };
        format!(
            "(:mode {} :frames {} :dispatcher {} :session {})",
            mode,
            self.frames_processed,
            self.dispatcher.status_sexp(),
            session,
        )
    }
}

fn process_navigation(
    config: &EngineConfig,
    dispatcher: &mut Dispatcher,
    nav: &mut NavigationSession,
    frame: &Frame,
    host: &mut dyn HostActions,
) {
    let Some(controlling) = frame.controlling_hand() else {
        nav.reset();
        return;
    };

    for hand in &frame.hands {
        if let Some(label) = classify_hand(hand, &mut nav.swipe, &config.gesture) {
            let event = GestureEvent {
                label,
                timestamp_ms: frame.timestamp_ms,
            };
            if !dispatcher.dispatch(event, host) {
                debug!("{} throttled at {:.0}ms", label, frame.timestamp_ms);
            }
        }
    }

    nav.pointer.update(controlling, &config.pointer, host);
    nav.scroll.update(
        frame.timestamp_ms,
        controlling.index_tip().y,
        controlling.handedness,
        &config.scroll,
        host,
    );
}

fn process_keyboard(kb: &mut KeyboardSession, frame: &Frame, host: &mut dyn HostActions) {
    let fingertip = frame
        .controlling_hand()
        .map(|hand| kb.smoothing.smooth(hand.index_tip()).mirrored());

    if let Some(key) = kb.keyboard.update(frame.timestamp_ms, fingertip) {
        kb.keyboard.apply_key(&key, host);
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::dispatcher::DispatchConfig;
    use crate::gesture::GestureLabel;
    use crate::host::{HostAction, Page, RecordingHost};
    use crate::keyboard::Key;
    use crate::landmarks::{
        extend_finger, make_hand, set_landmark, HandFrame, Handedness, INDEX_PIP, INDEX_TIP,
        THUMB_TIP, WRIST,
    };

    type Journal = Rc<RefCell<Vec<String>>>;

    struct FakeDetector {
        name: &'static str,
        journal: Journal,
        fail: bool,
    }

    impl FakeDetector {
        fn boxed(name: &'static str, journal: &Journal) -> Box<dyn Detector> {
            Box::new(Self {
                name,
                journal: journal.clone(),
                fail: false,
            })
        }
    }

    impl Detector for FakeDetector {
        fn name(&self) -> &str {
            self.name
        }

        fn acquire(&mut self, mode: Mode) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("camera busy");
            }
            self.journal
                .borrow_mut()
                .push(format!("acquire {} {}", self.name, mode));
            Ok(())
        }

        fn release(&mut self) {
            self.journal.borrow_mut().push(format!("release {}", self.name));
        }
    }

    fn engine_in(mode: Mode) -> (Engine, Journal) {
        let journal = Journal::default();
        let mut engine = Engine::new(EngineConfig::default(), BookmarkList::with_defaults());
        engine
            .switch_mode(mode, FakeDetector::boxed("cam", &journal))
            .unwrap();
        (engine, journal)
    }

    fn frame(t: f64, hands: Vec<HandFrame>) -> Frame {
        Frame::new(t, hands)
    }

    /// Right hand with the index tip at `(x, y)` in camera space.
    fn pointing(x: f32, y: f32) -> HandFrame {
        let mut hand = make_hand(Handedness::Right);
        set_landmark(&mut hand, INDEX_TIP, x, y);
        hand
    }

    #[test]
    fn test_no_mode_ignores_frames() {
        let mut engine = Engine::new(EngineConfig::default(), BookmarkList::new());
        let mut host = RecordingHost::new();
        engine.process_frame(&frame(0.0, vec![pointing(0.5, 0.5)]), &mut host);
        assert!(host.actions.is_empty());
        assert_eq!(engine.frames_processed(), 0);
    }

    #[test]
    fn test_switch_releases_before_acquire() {
        let journal = Journal::default();
        let mut engine = Engine::new(EngineConfig::default(), BookmarkList::new());
        engine
            .switch_mode(Mode::Navigation, FakeDetector::boxed("nav", &journal))
            .unwrap();
        engine
            .switch_mode(Mode::Keyboard, FakeDetector::boxed("kbd", &journal))
            .unwrap();
        assert_eq!(
            *journal.borrow(),
            vec![
                "acquire nav navigation".to_string(),
                "release nav".to_string(),
                "acquire kbd keyboard".to_string(),
            ]
        );
        assert_eq!(engine.mode(), Some(Mode::Keyboard));
    }

    #[test]
    fn test_drop_releases_detector() {
        let (engine, journal) = engine_in(Mode::Keyboard);
        drop(engine);
        assert_eq!(journal.borrow().last().map(String::as_str), Some("release cam"));
    }

    #[test]
    fn test_deactivate_releases_detector() {
        let (mut engine, journal) = engine_in(Mode::Navigation);
        engine.deactivate();
        assert_eq!(engine.mode(), None);
        assert_eq!(journal.borrow().len(), 2);
    }

    #[test]
    fn test_failed_acquire_leaves_no_mode() {
        let (mut engine, journal) = engine_in(Mode::Navigation);
        let failing = Box::new(FakeDetector {
            name: "broken",
            journal: journal.clone(),
            fail: true,
        });
        let err = engine.switch_mode(Mode::Keyboard, failing).unwrap_err();
        assert!(format!("{:#}", err).contains("camera busy"));
        assert_eq!(engine.mode(), None);
        // Old lease released, failed detector never acquired
        assert_eq!(journal.borrow().last().map(String::as_str), Some("release cam"));
    }

    #[test]
    fn test_cursor_follows_controlling_hand() {
        let (mut engine, _journal) = engine_in(Mode::Navigation);
        let mut host = RecordingHost::new();
        let left = make_hand(Handedness::Left);
        engine.process_frame(&frame(0.0, vec![left, pointing(0.25, 0.5)]), &mut host);

        let Some(Session::Navigation(nav)) = engine.session() else {
            panic!("expected navigation session");
        };
        let cursor = nav.pointer.cursor().unwrap();
        assert!((cursor.x - 1440.0).abs() < 1e-2, "x = {}", cursor.x);
        assert!((cursor.y - 540.0).abs() < 1e-2, "y = {}", cursor.y);
    }

    #[test]
    fn test_two_hands_pinching_click_once() {
        let (mut engine, _journal) = engine_in(Mode::Navigation);
        let mut host = RecordingHost::new();
        let mut left = make_hand(Handedness::Left);
        set_landmark(&mut left, INDEX_TIP, 0.6, 0.4);
        set_landmark(&mut left, THUMB_TIP, 0.61, 0.41);
        let mut right = pointing(0.25, 0.5);
        set_landmark(&mut right, THUMB_TIP, 0.26, 0.51);

        engine.process_frame(&frame(0.0, vec![left.clone(), right.clone()]), &mut host);
        assert_eq!(host.clicks(), 1, "actions: {:?}", host.actions);
        let click = host
            .actions
            .iter()
            .find_map(|a| match a {
                HostAction::Click { x, y } => Some((*x, *y)),
                _ => None,
            })
            .unwrap();
        assert!((click.0 - 1440.0).abs() < 1e-2, "x = {}", click.0);
        assert!((click.1 - 540.0).abs() < 1e-2, "y = {}", click.1);

        // Both pinches held: still a single click
        engine.process_frame(&frame(33.0, vec![left, right]), &mut host);
        assert_eq!(host.clicks(), 1);
    }

    #[test]
    fn test_no_hands_resets_navigation_state() {
        let (mut engine, _journal) = engine_in(Mode::Navigation);
        let mut host = RecordingHost::new();
        let mut pinch = pointing(0.3, 0.5);
        set_landmark(&mut pinch, THUMB_TIP, 0.31, 0.51);
        engine.process_frame(&frame(0.0, vec![pinch.clone()]), &mut host);
        assert_eq!(host.clicks(), 1);

        for i in 1..5 {
            engine.process_frame(&frame(i as f64 * 33.0, vec![]), &mut host);
        }
        let Some(Session::Navigation(nav)) = engine.session() else {
            panic!("expected navigation session");
        };
        assert!(nav.pointer.cursor().is_none());
        assert!(!nav.pointer.is_clicking());
        assert!(nav.scroll.previous_y().is_none());
        assert!(nav.swipe.previous().is_none());
        assert_eq!(host.actions.len(), 1, "no-hand frames emit nothing");

        // Latch was released, so the held pinch clicks again on return
        engine.process_frame(&frame(200.0, vec![pinch]), &mut host);
        assert_eq!(host.clicks(), 2);
    }

    #[test]
    fn test_swipe_navigates_once_per_cooldown() {
        let (mut engine, _journal) = engine_in(Mode::Navigation);
        let mut host = RecordingHost::new();
        let mut hand = make_hand(Handedness::Right);

        let wrist_x = [0.5, 0.7, 0.5, 0.7];
        for (i, x) in wrist_x.into_iter().enumerate() {
            set_landmark(&mut hand, WRIST, x, 0.8);
            engine.process_frame(&frame(i as f64 * 100.0, vec![hand.clone()]), &mut host);
        }

        let navigations: Vec<_> = host
            .actions
            .iter()
            .filter(|a| matches!(a, HostAction::Navigate(_)))
            .collect();
        assert_eq!(navigations, vec![&HostAction::Navigate(Page::Contact)]);
        assert_eq!(engine.dispatcher().throttled_count(), 2);
    }

    #[test]
    fn test_left_bookmark_opens_url() {
        let (mut engine, _journal) = engine_in(Mode::Navigation);
        let mut host = RecordingHost::new();
        let mut hand = make_hand(Handedness::Left);
        set_landmark(&mut hand, THUMB_TIP, 0.30, 0.62);
        extend_finger(&mut hand, INDEX_TIP, INDEX_PIP);
        engine.process_frame(&frame(0.0, vec![hand]), &mut host);

        assert!(host
            .actions
            .contains(&HostAction::OpenUrl("https://www.youtube.com".to_string())));
        assert_eq!(
            engine.dispatcher().last_label(),
            Some(GestureLabel::Bookmark(2))
        );
    }

    #[test]
    fn test_cooldown_survives_mode_switch() {
        let journal = Journal::default();
        let mut config = EngineConfig::default();
        config.dispatch = DispatchConfig {
            cooldown_ms: 800.0,
            log_capacity: 10,
        };
        let mut engine = Engine::new(config, BookmarkList::with_defaults());
        let mut host = RecordingHost::new();

        let mut hand = make_hand(Handedness::Left);
        extend_finger(&mut hand, INDEX_TIP, INDEX_PIP);

        engine
            .switch_mode(Mode::Navigation, FakeDetector::boxed("a", &journal))
            .unwrap();
        engine.process_frame(&frame(0.0, vec![hand.clone()]), &mut host);
        engine
            .switch_mode(Mode::Keyboard, FakeDetector::boxed("b", &journal))
            .unwrap();
        engine
            .switch_mode(Mode::Navigation, FakeDetector::boxed("c", &journal))
            .unwrap();
        engine.process_frame(&frame(400.0, vec![hand]), &mut host);

        assert_eq!(engine.dispatcher().log().count(), 1);
        assert_eq!(engine.dispatcher().throttled_count(), 1);
    }

    #[test]
    fn test_keyboard_dwell_types_key() {
        let (mut engine, _journal) = engine_in(Mode::Keyboard);
        let mut host = RecordingHost::new();

        // Mirrored x 0.95 -> keyboard x 0.05, y 0.3: the "A" key
        let hand = pointing(0.95, 0.3);
        let mut t = 0.0;
        while t < 1000.0 {
            engine.process_frame(&frame(t, vec![hand.clone()]), &mut host);
            t += 33.0;
        }

        assert_eq!(
            host.actions,
            vec![HostAction::KeyPressed {
                key: Key::Char('A'),
                buffer: "A".to_string(),
            }]
        );
    }

    #[test]
    fn test_keyboard_no_hand_goes_idle() {
        let (mut engine, _journal) = engine_in(Mode::Keyboard);
        let mut host = RecordingHost::new();
        engine.process_frame(&frame(0.0, vec![pointing(0.95, 0.3)]), &mut host);
        engine.process_frame(&frame(33.0, vec![]), &mut host);
        let Some(Session::Keyboard(kb)) = engine.session() else {
            panic!("expected keyboard session");
        };
        assert!(kb.keyboard.is_idle());
        assert!(host.actions.is_empty());
    }

    #[test]
    fn test_keyboard_state_fresh_on_reentry() {
        let (mut engine, journal) = engine_in(Mode::Keyboard);
        let mut host = RecordingHost::new();
        engine.process_frame(&frame(0.0, vec![pointing(0.95, 0.3)]), &mut host);
        engine
            .switch_mode(Mode::Navigation, FakeDetector::boxed("n", &journal))
            .unwrap();
        engine
            .switch_mode(Mode::Keyboard, FakeDetector::boxed("k", &journal))
            .unwrap();
        let Some(Session::Keyboard(kb)) = engine.session() else {
            panic!("expected keyboard session");
        };
        assert!(kb.keyboard.is_idle());
        assert!(kb.smoothing.is_empty());
    }

    #[test]
    fn test_status_sexp() {
        let (mut engine, _journal) = engine_in(Mode::Navigation);
        engine.process_frame(&frame(0.0, vec![]), &mut RecordingHost::new());
        let sexp = engine.status_sexp();
        assert!(sexp.contains(":mode :navigation"));
        assert!(sexp.contains(":frames 1"));
        assert!(sexp.contains(":cursor nil"));
    }
}
