//! Terminal key events to sampler transitions

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::trace;

use crate::game::InputSampler;

/// What the session should do after a key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Quit,
}

/// Browser-style key name for a terminal key code
pub fn key_name(code: KeyCode) -> Option<String> {
    let name = match code {
        KeyCode::Up => "ArrowUp".to_string(),
        KeyCode::Down => "ArrowDown".to_string(),
        KeyCode::Left => "ArrowLeft".to_string(),
        KeyCode::Right => "ArrowRight".to_string(),
        KeyCode::Char(c) => c.to_string(),
        _ => return None,
    };
    Some(name)
}

fn is_quit(event: &KeyEvent) -> bool {
    match event.code {
        KeyCode::Esc | KeyCode::Char('q') => true,
        KeyCode::Char('c') => event.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Keys currently considered held on terminals that only report presses.
/// A key is released once no press or repeat has arrived for `hold`.
#[derive(Debug)]
pub struct HeldKeys {
    hold: Duration,
    last_seen: HashMap<String, Instant>,
}

impl HeldKeys {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            last_seen: HashMap::new(),
        }
    }

    /// Record a press; true when the key was not already held
    pub fn press(&mut self, key: &str, now: Instant) -> bool {
        self.last_seen.insert(key.to_string(), now).is_none()
    }

    /// Remove and return keys whose hold has run out
    pub fn expire(&mut self, now: Instant) -> Vec<String> {
        let hold = self.hold;
        let mut expired: Vec<String> = self
            .last_seen
            .iter()
            .filter(|(_, seen)| now.duration_since(**seen) >= hold)
            .map(|(key, _)| key.clone())
            .collect();
        expired.sort();
        for key in &expired {
            self.last_seen.remove(key);
        }
        expired
    }
}

/// Feeds terminal key events into the input sampler
#[derive(Debug)]
pub struct Keyboard {
    release_events: bool,
    held: HeldKeys,
}

impl Keyboard {
    pub fn new(release_events: bool, hold: Duration) -> Self {
        Self {
            release_events,
            held: HeldKeys::new(hold),
        }
    }

    pub fn handle(&mut self, event: KeyEvent, now: Instant, sampler: &mut InputSampler) -> KeyOutcome {
        if event.kind != KeyEventKind::Release && is_quit(&event) {
            return KeyOutcome::Quit;
        }
        let Some(key) = key_name(event.code) else {
            return KeyOutcome::Continue;
        };

        if self.release_events {
            match event.kind {
                KeyEventKind::Press => {
                    sampler.key_down(&key);
                }
                KeyEventKind::Release => {
                    sampler.key_up(&key);
                }
                KeyEventKind::Repeat => {}
            }
        } else if self.held.press(&key, now) {
            trace!(key = %key, "Key held");
            sampler.key_down(&key);
        }

        KeyOutcome::Continue
    }

    /// Synthesize releases for keys whose hold ran out
    pub fn tick(&mut self, now: Instant, sampler: &mut InputSampler) {
        if self.release_events {
            return;
        }
        for key in self.held.expire(now) {
            trace!(key = %key, "Key hold expired");
            sampler.key_up(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn event(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn key_names_follow_browser_values() {
        assert_eq!(key_name(KeyCode::Right).as_deref(), Some("ArrowRight"));
        assert_eq!(key_name(KeyCode::Char(' ')).as_deref(), Some(" "));
        assert_eq!(key_name(KeyCode::Char('w')).as_deref(), Some("w"));
        assert_eq!(key_name(KeyCode::Enter), None);
    }

    #[test]
    fn release_events_drive_key_up() {
        let mut keyboard = Keyboard::new(true, Duration::from_millis(150));
        let mut sampler = InputSampler::new();
        let now = Instant::now();

        keyboard.handle(event(KeyCode::Right, KeyEventKind::Press), now, &mut sampler);
        keyboard.handle(event(KeyCode::Right, KeyEventKind::Repeat), now, &mut sampler);
        assert!(sampler.current().east);

        keyboard.tick(now + Duration::from_secs(5), &mut sampler);
        assert!(sampler.current().east);

        keyboard.handle(event(KeyCode::Right, KeyEventKind::Release), now, &mut sampler);
        assert!(!sampler.current().east);
    }

    #[test]
    fn press_only_terminals_release_after_hold() {
        let mut keyboard = Keyboard::new(false, Duration::from_millis(150));
        let mut sampler = InputSampler::new();
        let start = Instant::now();

        keyboard.handle(event(KeyCode::Char('a'), KeyEventKind::Press), start, &mut sampler);
        assert!(sampler.take_dirty());

        // auto-repeat keeps the key held
        let repeat = start + Duration::from_millis(100);
        keyboard.handle(event(KeyCode::Char('a'), KeyEventKind::Press), repeat, &mut sampler);
        keyboard.tick(start + Duration::from_millis(200), &mut sampler);
        assert!(sampler.current().west);
        assert!(!sampler.is_dirty());

        keyboard.tick(repeat + Duration::from_millis(150), &mut sampler);
        assert!(!sampler.current().west);
        assert!(sampler.take_dirty());
    }

    #[test]
    fn default_hold_bridges_the_auto_repeat_delay() {
        use crate::util::time::DEFAULT_KEY_HOLD_MS;

        let mut keyboard = Keyboard::new(false, Duration::from_millis(DEFAULT_KEY_HOLD_MS));
        let mut sampler = InputSampler::new();
        let start = Instant::now();

        keyboard.handle(event(KeyCode::Right, KeyEventKind::Press), start, &mut sampler);
        assert!(sampler.take_dirty());

        // first repeat after a 400ms auto-repeat delay, then every 33ms
        keyboard.tick(start + Duration::from_millis(399), &mut sampler);
        let mut at = start + Duration::from_millis(400);
        for _ in 0..5 {
            keyboard.handle(event(KeyCode::Right, KeyEventKind::Press), at, &mut sampler);
            keyboard.tick(at, &mut sampler);
            at += Duration::from_millis(33);
        }

        assert!(sampler.current().east);
        assert!(!sampler.take_dirty());
    }

    #[test]
    fn quit_keys_never_reach_sampler() {
        let mut keyboard = Keyboard::new(false, Duration::from_millis(150));
        let mut sampler = InputSampler::new();
        let now = Instant::now();

        assert_eq!(
            keyboard.handle(event(KeyCode::Esc, KeyEventKind::Press), now, &mut sampler),
            KeyOutcome::Quit
        );
        let ctrl_c = KeyEvent {
            modifiers: KeyModifiers::CONTROL,
            ..event(KeyCode::Char('c'), KeyEventKind::Press)
        };
        assert_eq!(keyboard.handle(ctrl_c, now, &mut sampler), KeyOutcome::Quit);
        assert_eq!(
            keyboard.handle(event(KeyCode::Char('c'), KeyEventKind::Press), now, &mut sampler),
            KeyOutcome::Continue
        );
        assert!(!sampler.is_dirty());
    }

    #[test]
    fn expire_returns_only_stale_keys() {
        let mut held = HeldKeys::new(Duration::from_millis(100));
        let start = Instant::now();
        assert!(held.press("w", start));
        assert!(held.press("d", start + Duration::from_millis(80)));
        assert!(!held.press("w", start + Duration::from_millis(10)));

        assert_eq!(held.expire(start + Duration::from_millis(120)), vec!["w".to_string()]);
        assert_eq!(held.expire(start + Duration::from_millis(200)), vec!["d".to_string()]);
        assert!(held.expire(start + Duration::from_secs(1)).is_empty());
    }
}
