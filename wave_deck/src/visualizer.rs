//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  header: mode · sensitivity · direction                              │
//! ├──────────────────────┬──────────────────────┬────────────────────────┤
//! │  CAMERA              │  ACCELEROMETER       │  PLAYER                │
//! │  hand skeleton       │  x / y / z bars with │  track, state,         │
//! │  + classified pose   │  threshold markers   │  progress, shuffle/rep │
//! │                      │                      │  last gesture flash    │
//! ├──────────────────────┴──────────────────────┴────────────────────────┤
//! │  status bar                                                          │
//! │  key legend                                                          │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

use minifb::{Key, KeyRepeat, Window, WindowOptions};

use wave_gesture::landmarks::BONES;
use wave_gesture::{
    AccelerationSample, DetectorMode, GestureEvent, GestureMode, GestureSettings, HandFrame,
    HandPose, MotionThresholds,
};

use crate::app::DeckAction;
use crate::player::PlayerStatus;
use crate::sim::{SimKey, SimPose};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:       usize = 960;
pub const WIN_H:       usize = 540;
const HEADER_H:        usize = 32;
const PANEL_Y:         usize = 48;
const PANEL_H:         usize = 380;
const CAMERA_X:        usize = 16;
const CAMERA_W:        usize = 300;
const ACCEL_X:         usize = 332;
const ACCEL_W:         usize = 280;
const PLAYER_X:        usize = 628;
const PLAYER_W:        usize = WIN_W - PLAYER_X - 16;
const STATUS_Y:        usize = WIN_H - 52;
const ACCEL_RANGE:     f32   = 30.0;   // m/s² at the bar ends

const BG_COLOR:        u32   = 0xFF1A1A2E;
const PANEL_BG:        u32   = 0xFF16213E;
const TEXT_BG:         u32   = 0xFF0F3460;
const ARMED_COLOR:     u32   = 0xFF4ADE80;
const IDLE_COLOR:      u32   = 0xFF3A3A5A;
const BONE_COLOR:      u32   = 0xFFAADDFF;
const JOINT_COLOR:     u32   = 0xFFFFFFFF;
const THRESH_COLOR:    u32   = 0xFFFFD700;
const BAR_COLOR:       u32   = 0xFF5DADE2;
const FLASH_COLOR:     u32   = 0xFFFFD700;

// ════════════════════════════════════════════════════════════════════════════
// DeckView — one frame's worth of state
// ════════════════════════════════════════════════════════════════════════════

pub struct DeckView<'a> {
    pub settings:     GestureSettings,
    pub mode:         DetectorMode,
    pub motion:       MotionThresholds,
    pub sample:       AccelerationSample,
    pub frame:        Option<HandFrame>,
    pub pose:         HandPose,
    pub player:       &'a PlayerStatus,
    /// Last delivered command and its remaining highlight, 1.0 → 0.0.
    pub last_gesture: Option<(GestureEvent, f32)>,
    pub status:       &'a str,
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    buf:    Vec<u32>,
}

impl Visualizer {
    pub fn new() -> Result<Self, minifb::Error> {
        let mut window = Window::new(
            "Wave Deck - gesture playback",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            buf: vec![BG_COLOR; WIN_W * WIN_H],
        })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Poll keyboard inputs and translate them to actions.
    pub fn poll_input(&mut self) -> Vec<DeckAction> {
        let mut out = Vec::new();
        if !self.window.is_open() { return out; }

        let shift = self.window.is_key_down(Key::LeftShift)
                 || self.window.is_key_down(Key::RightShift);

        let pressed = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);

        if pressed(Key::Q) || pressed(Key::Escape) {
            out.push(DeckAction::Quit);
            return out;
        }

        // ── simulated accelerometer ───────────────────────────────────────
        if pressed(Key::Right) {
            out.push(DeckAction::Sim(if shift { SimKey::SwipeRightHard } else { SimKey::SwipeRight }));
        }
        if pressed(Key::Left) {
            out.push(DeckAction::Sim(if shift { SimKey::SwipeLeftHard } else { SimKey::SwipeLeft }));
        }
        if pressed(Key::Down) {
            out.push(DeckAction::Sim(SimKey::Drop));
        }

        // ── simulated camera ──────────────────────────────────────────────
        let poses = [
            (Key::Key1, SimPose::OneFinger),
            (Key::Key2, SimPose::TwoFingers),
            (Key::Key3, SimPose::ThreeFingers),
            (Key::Key4, SimPose::Fist),
            (Key::Key5, SimPose::Palm),
        ];
        for (key, pose) in poses {
            if pressed(key) {
                out.push(DeckAction::Sim(SimKey::Pose(pose)));
            }
        }
        if pressed(Key::Key0) {
            out.push(DeckAction::Sim(SimKey::NoHand));
        }

        // ── settings ──────────────────────────────────────────────────────
        if pressed(Key::M) { out.push(DeckAction::SetMode(GestureMode::Motion)); }
        if pressed(Key::H) { out.push(DeckAction::SetMode(GestureMode::Hand));   }
        if pressed(Key::O) { out.push(DeckAction::SetMode(GestureMode::Off));    }
        if pressed(Key::S) { out.push(DeckAction::CycleSensitivity); }
        if pressed(Key::R) { out.push(DeckAction::ToggleReversed);   }

        // ── manual transport ──────────────────────────────────────────────
        if pressed(Key::Space) { out.push(DeckAction::Transport(GestureEvent::PlayPauseToggle)); }
        if pressed(Key::N)     { out.push(DeckAction::Transport(GestureEvent::Next));            }
        if pressed(Key::B)     { out.push(DeckAction::Transport(GestureEvent::Previous));        }
        if pressed(Key::Z)     { out.push(DeckAction::ToggleShuffle); }
        if pressed(Key::X)     { out.push(DeckAction::CycleRepeat);   }

        out
    }

    /// Render one frame.
    pub fn render(&mut self, view: &DeckView<'_>) {
        self.buf.fill(BG_COLOR);

        self.draw_header(view);
        self.draw_camera(view);
        self.draw_accel(view);
        self.draw_player(view);

        // ── Status bar ────────────────────────────────────────────────────
        self.fill_rect(0, STATUS_Y, WIN_W, WIN_H - STATUS_Y, TEXT_BG);
        self.draw_text(view.status, 10, STATUS_Y + 8, 2, 0xFFEEEEEE);

        // ── Key legend ────────────────────────────────────────────────────
        self.draw_label(
            "M/H/O=mode  S=sensitivity  R=reverse  LEFT/RIGHT=swipe (shift=hard)  DOWN=drop  \
             1-5=pose  0=no hand  SPACE/N/B=transport  Z=shuffle  X=repeat  Q=quit",
            10, WIN_H - 14, 0xFF888888,
        );

        self.window.update_with_buffer(&self.buf, WIN_W, WIN_H).ok();
    }

    // ── Header ────────────────────────────────────────────────────────────

    fn draw_header(&mut self, view: &DeckView<'_>) {
        self.fill_rect(0, 0, WIN_W, HEADER_H, TEXT_BG);
        let wanted = view.settings.mode;
        let armed = match view.mode {
            DetectorMode::Off => wanted == GestureMode::Off,
            _ => true,
        };
        let header = format!(
            "WAVE DECK   MODE: {}{}   SENSITIVITY: {}   DIRECTION: {}",
            wanted,
            if armed { "" } else { " (UNAVAILABLE)" },
            view.settings.sensitivity,
            if view.settings.reversed { "REVERSED" } else { "NORMAL" },
        );
        self.draw_text(&header, 10, 11, 2, 0xFFEEEEEE);
    }

    // ── Camera panel ──────────────────────────────────────────────────────

    fn draw_camera(&mut self, view: &DeckView<'_>) {
        let armed = view.mode == DetectorMode::Hand;
        self.draw_panel(CAMERA_X, CAMERA_W, "CAMERA", armed);

        let box_x = CAMERA_X + 10;
        let box_y = PANEL_Y + 24;
        let side  = CAMERA_W - 20;

        if let Some(frame) = &view.frame {
            let to_px = |i: usize| {
                let p = frame.point(i);
                (
                    box_x as f32 + p.x.clamp(0.0, 1.0) * side as f32,
                    box_y as f32 + p.y.clamp(0.0, 1.0) * side as f32,
                )
            };
            for &(a, b) in BONES.iter() {
                let (x0, y0) = to_px(a);
                let (x1, y1) = to_px(b);
                self.draw_line(x0 as isize, y0 as isize, x1 as isize, y1 as isize, BONE_COLOR);
            }
            for i in 0..frame.points().len() {
                let (x, y) = to_px(i);
                self.fill_rect((x as usize).saturating_sub(2), (y as usize).saturating_sub(2), 5, 5, JOINT_COLOR);
            }
        } else {
            self.draw_text("NO HAND", box_x + side / 2 - 40, box_y + side / 2, 3, 0xFF888888);
        }

        let pose = format!("POSE: {}", view.pose.name());
        self.draw_text(&pose, CAMERA_X + 10, PANEL_Y + PANEL_H - 20, 2, 0xFFEEEEEE);
    }

    // ── Accelerometer panel ───────────────────────────────────────────────

    fn draw_accel(&mut self, view: &DeckView<'_>) {
        let armed = view.mode == DetectorMode::Motion;
        self.draw_panel(ACCEL_X, ACCEL_W, "ACCELEROMETER", armed);

        let t = &view.motion;
        let s = view.sample;
        let rows: [(&str, f32, &[f32]); 3] = [
            ("X", s.x, &[t.swipe, -t.swipe]),
            ("Y", s.y, &[t.drop]),
            ("Z", s.z, &[]),
        ];

        let bar_x = ACCEL_X + 30;
        let bar_w = ACCEL_W - 50;
        for (row, (name, value, marks)) in rows.iter().enumerate() {
            let y = PANEL_Y + 50 + row * 90;
            self.draw_text(name, ACCEL_X + 10, y + 10, 3, 0xFFEEEEEE);
            self.fill_rect(bar_x, y, bar_w, 36, TEXT_BG);

            let mid = bar_x + bar_w / 2;
            let span = (value.abs() / ACCEL_RANGE).min(1.0) * (bar_w / 2) as f32;
            if *value >= 0.0 {
                self.fill_rect(mid, y + 4, span as usize, 28, BAR_COLOR);
            } else {
                self.fill_rect(mid - span as usize, y + 4, span as usize, 28, BAR_COLOR);
            }
            self.fill_rect(mid, y, 1, 36, 0xFF888888);

            for &m in marks.iter() {
                let off = (m.abs() / ACCEL_RANGE).min(1.0) * (bar_w / 2) as f32;
                let mx = if m >= 0.0 { mid + off as usize } else { mid - off as usize };
                self.fill_rect(mx.saturating_sub(1), y.saturating_sub(4), 3, 44, THRESH_COLOR);
            }

            let reading = format!("{:.1}", value);
            self.draw_label(&reading, bar_x, y + 42, 0xFFAAAAAA);
        }
    }

    // ── Player panel ──────────────────────────────────────────────────────

    fn draw_player(&mut self, view: &DeckView<'_>) {
        self.draw_panel(PLAYER_X, PLAYER_W, "PLAYER", true);
        let p = view.player;
        let x = PLAYER_X + 10;
        let mut y = PANEL_Y + 30;

        match &p.track {
            Some(track) => {
                self.draw_text(&track.title, x, y, 3, 0xFFEEEEEE);
                y += 24;
                self.draw_text(&track.artist, x, y, 2, 0xFFAAAAAA);
            }
            None => self.draw_text("NO PLAYLIST", x, y, 3, 0xFF888888),
        }
        y += 30;

        let state = if p.playing { "PLAYING" } else { "PAUSED" };
        let color = if p.playing { ARMED_COLOR } else { 0xFFAAAAAA };
        self.draw_text(state, x, y, 3, color);
        y += 30;

        // Progress bar
        let bar_w = PLAYER_W - 20;
        self.fill_rect(x, y, bar_w, 10, TEXT_BG);
        self.fill_rect(x, y, (bar_w as f32 * p.progress()) as usize, 10, BAR_COLOR);
        y += 20;

        let secs = p.position_ms / 1000;
        let track_no = p.index.map(|i| i + 1).unwrap_or(0);
        let line = format!("{}:{:02}   TRACK {}/{}", secs / 60, secs % 60, track_no, p.tracks);
        self.draw_text(&line, x, y, 2, 0xFFAAAAAA);
        y += 20;
        let line = format!(
            "SHUFFLE {}   REPEAT {}",
            if p.shuffle { "ON" } else { "OFF" },
            p.repeat.name(),
        );
        self.draw_text(&line, x, y, 2, 0xFFAAAAAA);

        // Last gesture flash
        if let Some((event, strength)) = view.last_gesture {
            let fy = PANEL_Y + PANEL_H - 70;
            let bg = blend(PANEL_BG, FLASH_COLOR, 0.6 * strength);
            self.fill_rect(PLAYER_X + 4, fy, PLAYER_W - 8, 50, bg);
            self.draw_text(event.as_str(), x + 10, fy + 14, 4, 0xFF000000);
        }
    }

    fn draw_panel(&mut self, x: usize, w: usize, title: &str, armed: bool) {
        self.fill_rect(x, PANEL_Y, w, PANEL_H, PANEL_BG);
        let border = if armed { ARMED_COLOR } else { IDLE_COLOR };
        self.draw_border(x, PANEL_Y, w, PANEL_H, border);
        self.draw_border(x + 1, PANEL_Y + 1, w - 2, PANEL_H - 2, border);
        self.draw_text(title, x + 10, PANEL_Y + 8, 2, 0xFFFFD700);
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y+h).min(WIN_H) {
            for col in x..(x+w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 { return; }
        for col in x..(x+w).min(WIN_W) {
            if y < WIN_H           { self.buf[y           * WIN_W + col] = color; }
            if y+h-1 < WIN_H       { self.buf[(y+h-1)     * WIN_W + col] = color; }
        }
        for row in y..(y+h).min(WIN_H) {
            if x < WIN_W           { self.buf[row * WIN_W + x    ] = color; }
            if x+w-1 < WIN_W       { self.buf[row * WIN_W + x+w-1] = color; }
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < WIN_W && y < WIN_H {
            self.buf[y * WIN_W + x] = color;
        }
    }

    /// Two-pixel-wide Bresenham line.
    fn draw_line(&mut self, x0: isize, y0: isize, x1: isize, y1: isize, color: u32) {
        let dx =  (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            if x >= 0 && y >= 0 {
                self.set_pixel(x as usize,     y as usize, color);
                self.set_pixel(x as usize + 1, y as usize, color);
            }
            if x == x1 && y == y1 { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x += sx; }
            if e2 <= dx { err += dx; y += sy; }
        }
    }

    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        self.draw_text(text, x, y, 1, color);
    }

    /// Minimal bitmap font: 3×5 characters, each pixel drawn `scale`×`scale`.
    fn draw_text(&mut self, text: &str, x: usize, y: usize, scale: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(cx + col * scale, y + row * scale, scale, scale, color);
                    }
                }
            }
            cx += 4 * scale; // 3 wide + 1 gap
            if cx + 4 * scale > WIN_W { break; }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '(' => [0b010, 0b100, 0b100, 0b100, 0b010],
        ')' => [0b010, 0b001, 0b001, 0b001, 0b010],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

/// Alpha-blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0-t) + cb as f32 * t) as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF000000 | (lerp(ar,br) << 16) | (lerp(ag,bg) << 8) | lerp(ab,bb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(0xFF102030, 0xFFFFFFFF, 0.0), 0xFF102030);
        assert_eq!(blend(0xFF102030, 0xFFFFFFFF, 1.0), 0xFFFFFFFF);
    }

    #[test]
    fn glyphs_cover_labels_drawn_on_screen() {
        let fallback = char_glyph('\u{7f}');
        for text in ["WAVE DECK", "MODE: shake (UNAVAILABLE)", "play-pause", "REPEAT one"] {
            for c in text.chars().filter(|c| *c != ' ') {
                assert_ne!(char_glyph(c), fallback, "missing glyph for {:?}", c);
            }
        }
    }
}
