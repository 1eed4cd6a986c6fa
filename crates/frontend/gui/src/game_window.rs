//! Game window: LCD output, keyboard input, overlay text and audio control

use std::collections::{HashSet, VecDeque};
use std::error::Error;
use std::io::{self, BufRead, Write};

use emu_core::{CoreError, LCD_HEIGHT, LCD_WIDTH};
use emu_host::{Button, Frontend, InputEvent, Settings};
use minifb::{Key, Scale, ScaleMode, Window, WindowOptions};

use crate::audio::AudioOutput;
use crate::keys::KeyBindings;
use crate::ui_render::Canvas;

/// Expand a 15-bit RGB555 colour to opaque ARGB8888
#[inline]
pub fn rgb555_to_argb(pixel: u16) -> u32 {
    let expand = |c: u16| -> u32 {
        let c = (c & 0x1F) as u32;
        (c << 3) | (c >> 2)
    };
    0xFF00_0000 | expand(pixel >> 10) << 16 | expand(pixel >> 5) << 8 | expand(pixel)
}

fn window_scale(scale: u8) -> Scale {
    match scale {
        1 => Scale::X1,
        2 => Scale::X2,
        4 => Scale::X4,
        8 => Scale::X8,
        _ => Scale::X4,
    }
}

pub struct GameWindow<'a> {
    window: Window,
    buffer: Vec<u32>,
    bindings: KeyBindings,
    held: HashSet<Button>,
    pending: VecDeque<InputEvent>,
    polled: bool,
    audio: Option<&'a AudioOutput>,
}

impl<'a> GameWindow<'a> {
    pub fn open(
        settings: &Settings,
        title: &str,
        audio: Option<&'a AudioOutput>,
    ) -> Result<Self, minifb::Error> {
        let window = Window::new(
            &format!("gbhost - {}", title),
            LCD_WIDTH,
            LCD_HEIGHT,
            WindowOptions {
                resize: true,
                scale: window_scale(settings.scale),
                scale_mode: ScaleMode::AspectRatioStretch,
                ..WindowOptions::default()
            },
        )?;
        Ok(Self {
            window,
            buffer: vec![0; LCD_WIDTH * LCD_HEIGHT],
            bindings: KeyBindings::from_mapping(&settings.keyboard),
            held: HashSet::new(),
            pending: VecDeque::new(),
            polled: false,
            audio,
        })
    }

    /// Diff the keyboard against the buttons held last time
    fn collect_events(&mut self) {
        if !self.window.is_open() || self.window.is_key_down(Key::Escape) {
            self.pending.push_back(InputEvent::Quit);
            return;
        }
        for &(key, button) in self.bindings.pairs() {
            let down = self.window.is_key_down(key);
            if down && self.held.insert(button) {
                self.pending.push_back(InputEvent::Pressed(button));
            } else if !down && self.held.remove(&button) {
                self.pending.push_back(InputEvent::Released(button));
            }
        }
    }
}

impl Frontend for GameWindow<'_> {
    fn poll_event(&mut self) -> Option<InputEvent> {
        if !self.polled {
            self.polled = true;
            self.collect_events();
        }
        let event = self.pending.pop_front();
        if event.is_none() {
            self.polled = false;
        }
        event
    }

    fn present(
        &mut self,
        framebuffer: &[u16],
        overlay: Option<&str>,
    ) -> Result<(), Box<dyn Error>> {
        for (out, &pixel) in self.buffer.iter_mut().zip(framebuffer) {
            *out = rgb555_to_argb(pixel);
        }
        if let Some(text) = overlay {
            let mut canvas = Canvas {
                buffer: &mut self.buffer,
                width: LCD_WIDTH,
                height: LCD_HEIGHT,
            };
            canvas.draw_message(text, 0, 0);
        }
        self.window
            .update_with_buffer(&self.buffer, LCD_WIDTH, LCD_HEIGHT)?;
        Ok(())
    }

    fn queue_audio(&mut self, samples: &[i16]) {
        if let Some(audio) = self.audio {
            audio.queue(samples);
        }
    }

    fn pause_audio(&mut self) {
        if let Some(audio) = self.audio {
            audio.pause();
        }
    }

    fn resume_audio(&mut self) {
        if let Some(audio) = self.audio {
            audio.resume();
        }
    }

    fn confirm_continue(&mut self, err: &CoreError) -> bool {
        eprint!("{}. Press q to exit, or any other key to continue. ", err);
        let _ = io::stderr().flush();
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            // No terminal to ask: stop rather than run a broken title
            Ok(0) | Err(_) => false,
            Ok(_) => !line.trim_start().starts_with('q'),
        }
    }
}
