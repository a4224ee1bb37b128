//! Directional intent sampled from key transitions

use serde::{Deserialize, Serialize};

/// The intent vector sent to the server. The whole message body is this struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputVector {
    pub north: bool,
    pub east: bool,
    pub south: bool,
    pub west: bool,
    pub interact: bool,
}

/// A slot in the input vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    North,
    East,
    South,
    West,
    Interact,
}

impl Command {
    /// Static key table. Key names follow browser `KeyboardEvent.key` values.
    pub fn for_key(key: &str) -> Option<Self> {
        let command = match key {
            "ArrowUp" | "Up" | "w" => Command::North,
            "ArrowRight" | "Right" | "d" => Command::East,
            "ArrowDown" | "Down" | "s" => Command::South,
            "ArrowLeft" | "Left" | "a" => Command::West,
            " " => Command::Interact,
            _ => return None,
        };
        Some(command)
    }
}

impl InputVector {
    fn slot(&mut self, command: Command) -> &mut bool {
        match command {
            Command::North => &mut self.north,
            Command::East => &mut self.east,
            Command::South => &mut self.south,
            Command::West => &mut self.west,
            Command::Interact => &mut self.interact,
        }
    }
}

/// Tracks held commands and whether they changed since the last flush
#[derive(Debug, Default)]
pub struct InputSampler {
    current: InputVector,
    dirty: bool,
}

impl InputSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> InputVector {
        self.current
    }

    #[cfg(test)]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns true if the key changed the vector
    pub fn key_down(&mut self, key: &str) -> bool {
        self.transition(key, true)
    }

    /// Returns true if the key changed the vector
    pub fn key_up(&mut self, key: &str) -> bool {
        self.transition(key, false)
    }

    fn transition(&mut self, key: &str, pressed: bool) -> bool {
        let Some(command) = Command::for_key(key) else {
            return false;
        };
        let slot = self.current.slot(command);
        if *slot == pressed {
            return false;
        }
        *slot = pressed;
        self.dirty = true;
        true
    }

    /// Read and clear the dirty flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Force the next flush, e.g. after the server lost our state
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
