/// Keyboard state for the terminal demo.
///
/// Terminals report key presses, not key state, so "held" is derived:
///   - a key is held from its Press until its Release, when the terminal
///     reports releases (keyboard enhancement)
///   - otherwise until no Press/Repeat arrived for `HOLD_TIMEOUT`
///
/// Movement and guard read the held state; attack, shoot and interact
/// fire once per fresh press.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::geometry::Direction;
use crate::sim::step::FrameInput;

const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

// ── Bindings ──

const UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w')];
const DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s')];
const LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a')];
const RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d')];
const ATTACK: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char('j')];
const SHOOT: &[KeyCode] = &[KeyCode::Char('f'), KeyCode::Char('k')];
const GUARD: &[KeyCode] = &[KeyCode::Char(' '), KeyCode::Char('l')];
const INTERACT: &[KeyCode] = &[KeyCode::Char('e')];
const QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q')];

pub struct InputState {
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from released to held during the last drain.
    fresh_presses: Vec<KeyCode>,
    raw_events: Vec<KeyEvent>,
    /// Trust Release events; only set once keyboard enhancement is on.
    pub honor_release: bool,
}

impl Default for InputState {
    fn default() -> Self {
        InputState::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Read every pending terminal event without blocking.
    /// Call once per frame, before the tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while event::poll(Duration::ZERO).unwrap_or(false) {
            let Ok(Event::Key(key)) = event::read() else { continue };
            self.raw_events.push(key);
            match key.kind {
                KeyEventKind::Release if self.honor_release => {
                    self.last_active.remove(&key.code);
                }
                KeyEventKind::Release => {}
                _ => {
                    if !self.is_held(key.code) {
                        self.fresh_presses.push(key.code);
                    }
                    self.last_active.insert(key.code, Instant::now());
                }
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.get(&code).map_or(false, |t| t.elapsed() < HOLD_TIMEOUT)
    }

    fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Intents for this frame. The most recently pressed direction wins
    /// when several are held.
    pub fn frame_input(&self) -> FrameInput {
        let held = [
            (Direction::Up, UP),
            (Direction::Down, DOWN),
            (Direction::Left, LEFT),
            (Direction::Right, RIGHT),
        ];
        let movement = held.iter()
            .filter_map(|(dir, keys)| {
                keys.iter()
                    .filter_map(|k| self.last_active.get(k).filter(|_| self.is_held(*k)))
                    .max()
                    .map(|t| (*t, *dir))
            })
            .max_by_key(|(t, _)| *t)
            .map(|(_, dir)| dir);

        FrameInput {
            movement,
            attack: self.any_pressed(ATTACK),
            shoot: self.any_pressed(SHOOT),
            guard: self.any_held(GUARD),
            interact: self.any_pressed(INTERACT),
        }
    }

    /// Esc, q or Ctrl+C this frame.
    pub fn quit_requested(&self) -> bool {
        self.any_pressed(QUIT) || self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
        })
    }

    /// Digit keys 1-4 pressed this frame, for the save slots.
    pub fn slot_pressed(&self) -> Option<u8> {
        (1..=4u8).find(|n| self.fresh_presses.contains(&KeyCode::Char(char::from(b'0' + n))))
    }

    #[cfg(test)]
    fn press(&mut self, code: KeyCode) {
        self.fresh_presses.push(code);
        self.last_active.insert(code, Instant::now());
    }
}
