//! Top-level application state.
//!
//! `AppState` owns the `GestureArbiter`, the `Player` it commands and the
//! preference file.  Settings keys rewrite the file and re-apply it to the
//! arbiter, the way a preference change listener would.  Manual transport
//! keys go to the same sink as gestures, so they keep working when gesture
//! control is off or failed to arm.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use parking_lot::Mutex;
use tracing::{info, warn};

use wave_gesture::source::ChannelMotionSource;
use wave_gesture::{
    classify, CommandSink, DetectorMode, GestureArbiter, GestureEvent, GestureMode,
    GestureSettings, HandSource, JsonPreferences, MotionSource, MotionThresholds,
};

use crate::player::{Player, PlayerSink, PlayerStatus, Track};
use crate::sim::{SimKey, SimRig, Telemetry};
use crate::visualizer::{DeckView, Visualizer};

/// How long the last delivered gesture stays highlighted.
const FLASH: Duration = Duration::from_millis(900);

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for the full application.
pub struct AppConfig {
    pub prefs_path:    PathBuf,
    pub playlist:      Vec<Track>,
    pub start_index:   usize,
    /// Use this mode for the session instead of the stored one.
    pub mode_override: Option<GestureMode>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            prefs_path:    PathBuf::from("wave_deck.json"),
            playlist:      demo_playlist(),
            start_index:   0,
            mode_override: None,
        }
    }
}

pub fn demo_playlist() -> Vec<Track> {
    vec![
        Track::new("Low Tide",        "Harbor Lights",  214_000),
        Track::new("Paper Satellites","Nine Rivers",    187_000),
        Track::new("Glasshouse",      "Mira Vale",      243_000),
        Track::new("Northbound",      "The Long Field", 199_000),
        Track::new("Slow Machines",   "Copperleaf",     276_000),
        Track::new("Afterimage",      "Harbor Lights",  162_000),
    ]
}

// ════════════════════════════════════════════════════════════════════════════
// DeckAction — what a key press means
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DeckAction {
    Quit,
    /// Forwarded to the simulated sensors.
    Sim(SimKey),
    SetMode(GestureMode),
    CycleSensitivity,
    ToggleReversed,
    /// Manual transport, bypassing gesture detection.
    Transport(GestureEvent),
    ToggleShuffle,
    CycleRepeat,
}

// ════════════════════════════════════════════════════════════════════════════
// DeckSink — player sink that remembers the last delivery
// ════════════════════════════════════════════════════════════════════════════

type LastGesture = Arc<Mutex<Option<(GestureEvent, Instant)>>>;

struct DeckSink {
    player: PlayerSink,
    last:   LastGesture,
}

impl DeckSink {
    fn note(&self, event: GestureEvent) {
        *self.last.lock() = Some((event, Instant::now()));
    }
}

impl CommandSink for DeckSink {
    fn next(&mut self)              { self.note(GestureEvent::Next);            self.player.next() }
    fn previous(&mut self)          { self.note(GestureEvent::Previous);        self.player.previous() }
    fn play(&mut self)              { self.note(GestureEvent::Play);            self.player.play() }
    fn pause(&mut self)             { self.note(GestureEvent::Pause);           self.player.pause() }
    fn toggle_play_pause(&mut self) { self.note(GestureEvent::PlayPauseToggle); self.player.toggle_play_pause() }
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    // ── gesture control ──────────────────────────────────────────────────
    arbiter:  GestureArbiter,
    settings: GestureSettings,
    prefs:    JsonPreferences,

    // ── playback ─────────────────────────────────────────────────────────
    player:        Player,
    player_status: PlayerStatus,
    last_gesture:  LastGesture,

    // ── status message ───────────────────────────────────────────────────
    pub status: String,
}

impl AppState {
    pub fn new(
        cfg:    AppConfig,
        motion: Box<dyn MotionSource>,
        hand:   Box<dyn HandSource>,
    ) -> Self {
        let prefs = JsonPreferences::load_or_default(cfg.prefs_path);
        let mut settings = GestureSettings::from_store(&prefs);
        if let Some(mode) = cfg.mode_override {
            settings.mode = mode;
        }

        let player = Player::spawn();
        player.set_playlist(cfg.playlist, cfg.start_index);

        let last_gesture = LastGesture::default();
        let sink = DeckSink { player: player.sink(), last: Arc::clone(&last_gesture) };
        let arbiter = GestureArbiter::new(motion, hand, Box::new(sink), &settings);

        let mut app = AppState {
            arbiter,
            settings,
            prefs,
            player,
            player_status: PlayerStatus::default(),
            last_gesture,
            status: String::new(),
        };
        app.apply_settings();
        app
    }

    // ── process one DeckAction ───────────────────────────────────────────

    pub fn handle_action(&mut self, action: DeckAction) {
        match action {
            DeckAction::SetMode(mode) => {
                self.settings.mode = mode;
                self.settings_changed();
            }
            DeckAction::CycleSensitivity => {
                self.settings.sensitivity = self.settings.sensitivity.cycle();
                self.settings_changed();
            }
            DeckAction::ToggleReversed => {
                self.settings.reversed = !self.settings.reversed;
                self.settings_changed();
            }
            DeckAction::Transport(event) => {
                self.arbiter.sink_mut().dispatch(event);
                self.status = format!("Manual {}", event);
            }
            DeckAction::ToggleShuffle => self.player.toggle_shuffle(),
            DeckAction::CycleRepeat   => self.player.cycle_repeat(),
            // Handled by the run loop.
            DeckAction::Quit | DeckAction::Sim(_) => {}
        }
    }

    fn settings_changed(&mut self) {
        self.settings.write_to(&mut self.prefs);
        if let Err(e) = self.prefs.save() {
            warn!(path = %self.prefs.path().display(), error = %e, "could not save preferences");
        }
        self.apply_settings();
    }

    fn apply_settings(&mut self) {
        match self.arbiter.apply(&self.settings) {
            Ok(()) => {
                self.status = format!(
                    "Gestures: {}  sensitivity {}  {}",
                    self.settings.mode,
                    self.settings.sensitivity,
                    if self.settings.reversed { "reversed" } else { "normal" },
                );
            }
            Err(e) => {
                warn!(error = %e, mode = %self.settings.mode, "gesture control unavailable");
                self.status = format!("Gesture control unavailable: {}", e);
            }
        }
    }

    // ── Per-frame tick ────────────────────────────────────────────────────

    pub fn tick(&mut self) {
        self.arbiter.pump();
        if let Some(status) = self.player.latest_status() {
            self.player_status = status;
        }
    }

    /// Snapshot everything the visualizer draws.
    pub fn view<'a>(&'a self, telemetry: &Telemetry) -> DeckView<'a> {
        let frame = telemetry.frame();
        let last_gesture = (*self.last_gesture.lock()).and_then(|(event, at)| {
            let age = at.elapsed();
            (age < FLASH).then(|| (event, 1.0 - age.as_secs_f32() / FLASH.as_secs_f32()))
        });
        DeckView {
            settings:     self.settings,
            mode:         self.arbiter.mode(),
            motion:       MotionThresholds::from_settings(&self.settings),
            sample:       telemetry.sample(),
            pose:         classify(frame.as_ref()),
            frame,
            player:       &self.player_status,
            last_gesture,
            status:       &self.status,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn settings(&self) -> &GestureSettings    { &self.settings }
    pub fn mode(&self) -> DetectorMode             { self.arbiter.mode() }
    pub fn player_status(&self) -> &PlayerStatus   { &self.player_status }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// Creates the simulated sensors (or, with `--features leap`, a LeapMotion
/// hand source), the window and the app state, then drives the
/// input/pump/render loop at ~60 fps until the window closes.
pub fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let motion_src = ChannelMotionSource::default();
    let motion_feeder = motion_src.feeder();

    #[cfg(not(feature = "leap"))]
    let (hand_src, rig): (Box<dyn HandSource>, SimRig) = {
        let src = wave_gesture::source::SlotHandSource::new();
        let rig = SimRig::start(motion_feeder, Some(src.feeder()));
        (Box::new(src), rig)
    };

    #[cfg(feature = "leap")]
    let (hand_src, rig): (Box<dyn HandSource>, SimRig) = {
        let rig = SimRig::start(motion_feeder, None);
        let src = crate::leap::LeapHandSource::new(Arc::clone(&rig.telemetry));
        (Box::new(src), rig)
    };

    let mut vis = Visualizer::new().context("opening the deck window")?;
    let mut app = AppState::new(cfg, Box::new(motion_src), hand_src);
    info!(mode = %app.settings().mode, "deck ready");

    while vis.is_open() {
        for action in vis.poll_input() {
            match action {
                DeckAction::Quit   => return Ok(()),
                DeckAction::Sim(k) => rig.send(k),
                other              => app.handle_action(other),
            }
        }

        app.tick();
        vis.render(&app.view(&rig.telemetry));
    }

    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
