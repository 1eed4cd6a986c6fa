//! Contract between the host loop and the presentation/input/audio layer

use std::error::Error;

use emu_core::CoreError;

/// How long an overlay message stays on screen
pub const MESSAGE_LIFETIME_MS: u64 = 1000;

/// Controller buttons known to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    A,
    B,
    Select,
    Start,
    Up,
    Down,
    Left,
    Right,
    L,
    R,
    Y,
}

impl Button {
    pub const ALL: [Button; 11] = [
        Button::A,
        Button::B,
        Button::Select,
        Button::Start,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::L,
        Button::R,
        Button::Y,
    ];

    /// Joypad bit forwarded to the core, if the button exists on the console
    pub fn joypad_bit(self) -> Option<u8> {
        use emu_core::joypad;
        match self {
            Button::A => Some(joypad::A),
            Button::B => Some(joypad::B),
            Button::Select => Some(joypad::SELECT),
            Button::Start => Some(joypad::START),
            Button::Up => Some(joypad::UP),
            Button::Down => Some(joypad::DOWN),
            Button::Left => Some(joypad::LEFT),
            Button::Right => Some(joypad::RIGHT),
            Button::L | Button::R | Button::Y => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Pressed(Button),
    Released(Button),
    /// Window closed
    Quit,
}

/// Everything the host loop needs from the outside world while a title runs.
pub trait Frontend {
    /// Next pending input event; `None` once the queue is drained
    fn poll_event(&mut self) -> Option<InputEvent>;

    /// Show a finished RGB555 frame with an optional overlay line
    fn present(&mut self, framebuffer: &[u16], overlay: Option<&str>)
        -> Result<(), Box<dyn Error>>;

    /// Hand generated audio to the output device
    fn queue_audio(&mut self, _samples: &[i16]) {}

    /// Stop the audio callback from running
    fn pause_audio(&mut self);

    /// Let the audio callback run again
    fn resume_audio(&mut self);

    /// Ask the operator whether to keep going after a fatal core error
    fn confirm_continue(&mut self, err: &CoreError) -> bool;
}

/// Run `f` with audio paused so the audio thread never sees a half-written
/// cartridge RAM flush.
pub fn with_audio_paused<T>(frontend: &mut dyn Frontend, f: impl FnOnce() -> T) -> T {
    frontend.pause_audio();
    let result = f();
    frontend.resume_audio();
    result
}

/// Short-lived overlay text
#[derive(Debug, Clone, Default)]
pub struct OverlayMessage {
    text: String,
    shown_at_ms: u64,
}

impl OverlayMessage {
    pub fn show(&mut self, text: impl Into<String>, now_ms: u64) {
        self.text = text.into();
        self.shown_at_ms = now_ms;
    }

    /// Current text, cleared once it has been visible for a second
    pub fn current(&mut self, now_ms: u64) -> Option<&str> {
        if now_ms.saturating_sub(self.shown_at_ms) > MESSAGE_LIFETIME_MS {
            self.text.clear();
        }
        if self.text.is_empty() {
            None
        } else {
            Some(&self.text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_expires() {
        let mut overlay = OverlayMessage::default();
        assert_eq!(overlay.current(0), None);

        overlay.show("SPEED 2", 100);
        assert_eq!(overlay.current(600), Some("SPEED 2"));
        assert_eq!(overlay.current(1100), Some("SPEED 2"));
        assert_eq!(overlay.current(1101), None);
        // Stays cleared
        assert_eq!(overlay.current(50), None);
    }

    #[test]
    fn test_joypad_bits() {
        assert_eq!(Button::Start.joypad_bit(), Some(0x80));
        assert_eq!(Button::Right.joypad_bit(), Some(0x01));
        assert_eq!(Button::L.joypad_bit(), None);
        let all: u8 = Button::ALL
            .iter()
            .filter_map(|b| b.joypad_bit())
            .fold(0, |acc, bit| acc | bit);
        assert_eq!(all, 0xFF);
    }
}
