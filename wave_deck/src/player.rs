//! Simulated playback thread, used as the deck's command sink.
//!
//! Transport state lives in [`Transport`], a plain value the tests drive
//! directly.  [`Player`] runs it on its own thread, advancing the play
//! position in real time and reporting a [`PlayerStatus`] snapshot back
//! to the render loop after every change.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use tracing::{debug, info};

use wave_gesture::{CommandSink, GestureEvent};

/// Within this many ms of a track's start, `previous` moves to the prior
/// track; past it, `previous` restarts the current one.
pub const PREVIOUS_RESTART_MS: u64 = 3_000;

const TICK: Duration = Duration::from_millis(50);
const STATUS_EVERY: Duration = Duration::from_millis(250);

// ════════════════════════════════════════════════════════════════════════════
// Track / RepeatMode
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub title:       String,
    pub artist:      String,
    pub duration_ms: u64,
}

impl Track {
    pub fn new(title: &str, artist: &str, duration_ms: u64) -> Self {
        Track { title: title.to_string(), artist: artist.to_string(), duration_ms }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RepeatMode {
    #[default]
    Off,
    One,
    All,
}

impl RepeatMode {
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::One => "one",
            RepeatMode::All => "all",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Transport — playlist cursor + play state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default)]
pub struct Transport {
    playlist:    Vec<Track>,
    /// Play order over `playlist` indices; identity unless shuffled.
    order:       Vec<usize>,
    cursor:      usize,
    position_ms: u64,
    playing:     bool,
    shuffle:     bool,
    repeat:      RepeatMode,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the playlist and queue `start` (clamped).  Playback state is
    /// kept; an empty playlist stops playback.
    pub fn set_playlist(&mut self, tracks: Vec<Track>, start: usize) {
        self.playlist = tracks;
        self.position_ms = 0;
        if self.playlist.is_empty() {
            self.order.clear();
            self.cursor = 0;
            self.playing = false;
            return;
        }
        let start = start.min(self.playlist.len() - 1);
        self.rebuild_order(start);
        info!(tracks = self.playlist.len(), start, "playlist loaded");
    }

    pub fn play(&mut self) {
        if self.ready() { self.playing = true; }
    }

    pub fn pause(&mut self) {
        if self.ready() { self.playing = false; }
    }

    /// Play if paused, pause if playing.
    pub fn toggle_play_pause(&mut self) {
        if self.ready() { self.playing = !self.playing; }
    }

    /// Advance to the next item.  `RepeatMode::One` navigates like `Off`;
    /// `All` wraps past the end.  At the end with nothing to wrap to this
    /// does nothing.
    pub fn next(&mut self) {
        if !self.ready() { return; }
        if self.cursor + 1 < self.order.len() {
            self.jump(self.cursor + 1);
        } else if self.repeat == RepeatMode::All {
            self.jump(0);
        }
    }

    /// Restart the current item if past [`PREVIOUS_RESTART_MS`], else go to
    /// the prior item (wrapping under `RepeatMode::All`).
    pub fn previous(&mut self) {
        if !self.ready() { return; }
        if self.position_ms > PREVIOUS_RESTART_MS {
            self.position_ms = 0;
        } else if self.cursor > 0 {
            self.jump(self.cursor - 1);
        } else if self.repeat == RepeatMode::All {
            self.jump(self.order.len() - 1);
        } else {
            self.position_ms = 0;
        }
    }

    pub fn toggle_shuffle(&mut self) {
        if !self.ready() { return; }
        self.shuffle = !self.shuffle;
        let current = self.order[self.cursor];
        self.rebuild_order(current);
    }

    pub fn cycle_repeat(&mut self) {
        self.repeat = self.repeat.cycle();
    }

    /// Move the play head forward by `elapsed_ms`, rolling over into the
    /// following items as they finish.
    pub fn advance(&mut self, elapsed_ms: u64) {
        if !self.playing || self.playlist.is_empty() { return; }
        self.position_ms += elapsed_ms;
        while let Some(duration) = self.current().map(|t| t.duration_ms.max(1)) {
            if self.position_ms < duration { break; }
            let overflow = self.position_ms - duration;
            match self.repeat {
                RepeatMode::One => self.position_ms = overflow,
                _ if self.cursor + 1 < self.order.len() => {
                    self.jump(self.cursor + 1);
                    self.position_ms = overflow;
                }
                RepeatMode::All => {
                    self.jump(0);
                    self.position_ms = overflow;
                }
                RepeatMode::Off => {
                    self.position_ms = duration;
                    self.playing = false;
                    break;
                }
            }
        }
    }

    fn jump(&mut self, cursor: usize) {
        self.cursor = cursor;
        self.position_ms = 0;
        if let Some(t) = self.current() {
            debug!(title = %t.title, "now on");
        }
    }

    /// Rebuild `order` so that playlist index `current` sits at the cursor.
    fn rebuild_order(&mut self, current: usize) {
        self.order = (0..self.playlist.len()).collect();
        if self.shuffle {
            self.order.retain(|&i| i != current);
            self.order.shuffle(&mut rand::thread_rng());
            self.order.insert(0, current);
            self.cursor = 0;
        } else {
            self.cursor = current;
        }
    }

    fn ready(&self) -> bool {
        if self.playlist.is_empty() {
            debug!("no playlist loaded, ignoring transport command");
            return false;
        }
        true
    }

    // ── accessors ────────────────────────────────────────────────────────

    pub fn current(&self) -> Option<&Track> {
        self.order.get(self.cursor).and_then(|&i| self.playlist.get(i))
    }

    /// Playlist index of the current item.
    pub fn current_index(&self) -> Option<usize> {
        self.order.get(self.cursor).copied()
    }

    pub fn is_playing(&self) -> bool    { self.playing }
    pub fn position_ms(&self) -> u64    { self.position_ms }
    pub fn shuffle(&self) -> bool       { self.shuffle }
    pub fn repeat(&self) -> RepeatMode  { self.repeat }
    pub fn len(&self) -> usize          { self.playlist.len() }
    pub fn is_empty(&self) -> bool      { self.playlist.is_empty() }

    pub fn status(&self) -> PlayerStatus {
        PlayerStatus {
            index:       self.current_index(),
            track:       self.current().cloned(),
            position_ms: self.position_ms,
            playing:     self.playing,
            shuffle:     self.shuffle,
            repeat:      self.repeat,
            tracks:      self.playlist.len(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PlayerCommand / PlayerStatus
// ════════════════════════════════════════════════════════════════════════════

pub enum PlayerCommand {
    SetPlaylist(Vec<Track>, usize),
    Next,
    Previous,
    Play,
    Pause,
    TogglePlayPause,
    ToggleShuffle,
    CycleRepeat,
    /// Terminate the thread.
    Quit,
}

impl From<GestureEvent> for PlayerCommand {
    fn from(event: GestureEvent) -> Self {
        match event {
            GestureEvent::Next            => PlayerCommand::Next,
            GestureEvent::Previous        => PlayerCommand::Previous,
            GestureEvent::Play            => PlayerCommand::Play,
            GestureEvent::Pause           => PlayerCommand::Pause,
            GestureEvent::PlayPauseToggle => PlayerCommand::TogglePlayPause,
        }
    }
}

/// Snapshot sent back to the render loop.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerStatus {
    pub index:       Option<usize>,
    pub track:       Option<Track>,
    pub position_ms: u64,
    pub playing:     bool,
    pub shuffle:     bool,
    pub repeat:      RepeatMode,
    pub tracks:      usize,
}

impl PlayerStatus {
    /// Fraction of the current track played, 0.0–1.0.
    pub fn progress(&self) -> f32 {
        match &self.track {
            Some(t) if t.duration_ms > 0 => (self.position_ms as f32 / t.duration_ms as f32).min(1.0),
            _ => 0.0,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Player — the playback thread
// ════════════════════════════════════════════════════════════════════════════

/// Handle to the playback thread.
pub struct Player {
    pub cmd_tx:    Sender<PlayerCommand>,
    pub status_rx: Receiver<PlayerStatus>,
}

impl Player {
    pub fn spawn() -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<PlayerCommand>();
        let (status_tx, status_rx) = mpsc::channel::<PlayerStatus>();

        thread::spawn(move || player_thread(cmd_rx, status_tx));

        Player { cmd_tx, status_rx }
    }

    pub fn set_playlist(&self, tracks: Vec<Track>, start: usize) {
        let _ = self.cmd_tx.send(PlayerCommand::SetPlaylist(tracks, start));
    }
    pub fn toggle_shuffle(&self) { let _ = self.cmd_tx.send(PlayerCommand::ToggleShuffle); }
    pub fn cycle_repeat(&self)   { let _ = self.cmd_tx.send(PlayerCommand::CycleRepeat);   }
    pub fn quit(&self)           { let _ = self.cmd_tx.send(PlayerCommand::Quit);          }

    /// A command sink feeding this player.
    pub fn sink(&self) -> PlayerSink {
        PlayerSink { cmd_tx: self.cmd_tx.clone() }
    }

    /// Most recent status, if any arrived since the last call (non-blocking).
    pub fn latest_status(&self) -> Option<PlayerStatus> {
        self.status_rx.try_iter().last()
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.quit();
    }
}

fn player_thread(cmd_rx: Receiver<PlayerCommand>, status_tx: Sender<PlayerStatus>) {
    let mut transport = Transport::new();
    let mut last_tick = Instant::now();
    let mut last_report = Instant::now();

    loop {
        let changed = match cmd_rx.recv_timeout(TICK) {
            Ok(PlayerCommand::Quit) | Err(RecvTimeoutError::Disconnected) => return,
            Ok(cmd) => {
                apply(&mut transport, cmd);
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
        };

        let now = Instant::now();
        transport.advance(now.duration_since(last_tick).as_millis() as u64);
        last_tick = now;

        let due = transport.is_playing() && last_report.elapsed() >= STATUS_EVERY;
        if changed || due {
            last_report = now;
            if status_tx.send(transport.status()).is_err() {
                return;
            }
        }
    }
}

fn apply(transport: &mut Transport, cmd: PlayerCommand) {
    match cmd {
        PlayerCommand::SetPlaylist(tracks, start) => transport.set_playlist(tracks, start),
        PlayerCommand::Next            => transport.next(),
        PlayerCommand::Previous        => transport.previous(),
        PlayerCommand::Play            => transport.play(),
        PlayerCommand::Pause           => transport.pause(),
        PlayerCommand::TogglePlayPause => transport.toggle_play_pause(),
        PlayerCommand::ToggleShuffle   => transport.toggle_shuffle(),
        PlayerCommand::CycleRepeat     => transport.cycle_repeat(),
        PlayerCommand::Quit            => {}
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PlayerSink — CommandSink over the command channel
// ════════════════════════════════════════════════════════════════════════════

pub struct PlayerSink {
    cmd_tx: Sender<PlayerCommand>,
}

impl PlayerSink {
    fn send(&self, cmd: PlayerCommand) {
        let _ = self.cmd_tx.send(cmd);
    }
}

impl CommandSink for PlayerSink {
    fn next(&mut self)              { self.send(PlayerCommand::Next) }
    fn previous(&mut self)          { self.send(PlayerCommand::Previous) }
    fn play(&mut self)              { self.send(PlayerCommand::Play) }
    fn pause(&mut self)             { self.send(PlayerCommand::Pause) }
    fn toggle_play_pause(&mut self) { self.send(PlayerCommand::TogglePlayPause) }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks(n: usize) -> Vec<Track> {
        (0..n).map(|i| Track::new(&format!("t{}", i), "a", 10_000)).collect()
    }

    fn loaded(n: usize, start: usize) -> Transport {
        let mut t = Transport::new();
        t.set_playlist(tracks(n), start);
        t
    }

    #[test]
    fn commands_ignored_without_playlist() {
        let mut t = Transport::new();
        t.play();
        t.next();
        t.toggle_play_pause();
        assert!(!t.is_playing());
        assert_eq!(t.current_index(), None);
    }

    #[test]
    fn toggle_follows_playing_state() {
        let mut t = loaded(3, 0);
        t.toggle_play_pause();
        assert!(t.is_playing());
        t.toggle_play_pause();
        assert!(!t.is_playing());
    }

    #[test]
    fn play_and_pause_are_idempotent() {
        let mut t = loaded(3, 0);
        t.play();
        t.play();
        assert!(t.is_playing());
        t.pause();
        t.pause();
        assert!(!t.is_playing());
    }

    #[test]
    fn start_index_is_clamped() {
        let t = loaded(3, 9);
        assert_eq!(t.current_index(), Some(2));
    }

    #[test]
    fn next_stops_at_end_without_repeat() {
        let mut t = loaded(3, 2);
        t.next();
        assert_eq!(t.current_index(), Some(2));
    }

    #[test]
    fn next_wraps_with_repeat_all() {
        let mut t = loaded(3, 2);
        t.cycle_repeat();
        assert_eq!(t.repeat(), RepeatMode::All);
        t.next();
        assert_eq!(t.current_index(), Some(0));
    }

    #[test]
    fn repeat_one_still_navigates() {
        let mut t = loaded(3, 0);
        t.cycle_repeat();
        t.cycle_repeat();
        assert_eq!(t.repeat(), RepeatMode::One);
        t.next();
        assert_eq!(t.current_index(), Some(1));
    }

    #[test]
    fn previous_restarts_after_threshold() {
        let mut t = loaded(3, 1);
        t.play();
        t.advance(PREVIOUS_RESTART_MS + 1);
        t.previous();
        assert_eq!(t.current_index(), Some(1));
        assert_eq!(t.position_ms(), 0);
        t.previous();
        assert_eq!(t.current_index(), Some(0));
    }

    #[test]
    fn advance_rolls_into_next_track() {
        let mut t = loaded(2, 0);
        t.play();
        t.advance(10_500);
        assert_eq!(t.current_index(), Some(1));
        assert_eq!(t.position_ms(), 500);
    }

    #[test]
    fn playback_stops_at_end_of_list() {
        let mut t = loaded(1, 0);
        t.play();
        t.advance(20_000);
        assert!(!t.is_playing());
        assert_eq!(t.current_index(), Some(0));
    }

    #[test]
    fn repeat_one_loops_current_track() {
        let mut t = loaded(2, 0);
        t.cycle_repeat();
        t.cycle_repeat();
        t.play();
        t.advance(25_000);
        assert_eq!(t.current_index(), Some(0));
        assert_eq!(t.position_ms(), 5_000);
    }

    #[test]
    fn paused_transport_does_not_advance() {
        let mut t = loaded(2, 0);
        t.advance(5_000);
        assert_eq!(t.position_ms(), 0);
    }

    #[test]
    fn shuffle_keeps_current_track_and_covers_all() {
        let mut t = loaded(6, 4);
        t.toggle_shuffle();
        assert!(t.shuffle());
        assert_eq!(t.current_index(), Some(4));

        let mut seen = vec![4];
        for _ in 0..5 {
            t.next();
            seen.push(t.current_index().unwrap());
        }
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);

        let here = t.current_index();
        t.toggle_shuffle();
        assert_eq!(t.current_index(), here);
    }

    #[test]
    fn sink_drives_player_thread() {
        let player = Player::spawn();
        player.set_playlist(tracks(3), 0);
        let mut sink = player.sink();
        sink.dispatch(GestureEvent::Next);
        sink.dispatch(GestureEvent::PlayPauseToggle);

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut last = PlayerStatus::default();
        while Instant::now() < deadline {
            if let Ok(s) = player.status_rx.recv_timeout(Duration::from_millis(100)) {
                last = s;
                if last.playing && last.index == Some(1) { break; }
            }
        }
        assert_eq!(last.index, Some(1));
        assert!(last.playing);
        assert_eq!(last.tracks, 3);
    }

    #[test]
    fn progress_fraction() {
        let s = PlayerStatus {
            track: Some(Track::new("x", "y", 4_000)),
            position_ms: 1_000,
            ..Default::default()
        };
        assert!((s.progress() - 0.25).abs() < 1e-6);
        assert_eq!(PlayerStatus::default().progress(), 0.0);
    }
}
