//! ROM picker window. The window lives exactly as long as one selection.

use emu_host::browser::{BrowserError, BrowserInput, BrowserSurface, BrowserView, Viewport};
use emu_host::{Button, Settings};
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::keys::KeyBindings;
use crate::ui_render::{self, Canvas, BROWSER_CHROME_ROWS, ROW_HEIGHT};

pub struct BrowserWindow {
    window: Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
    bindings: KeyBindings,
}

impl BrowserWindow {
    pub fn open(settings: &Settings) -> Result<Self, minifb::Error> {
        let (width, height) = (settings.browser_width, settings.browser_height);
        let mut window = Window::new(
            "gbhost - select a ROM",
            width,
            height,
            WindowOptions::default(),
        )?;
        window.set_target_fps(60);
        Ok(Self {
            window,
            buffer: vec![ui_render::BACKGROUND; width * height],
            width,
            height,
            bindings: KeyBindings::from_mapping(&settings.keyboard),
        })
    }

    fn to_input(button: Button) -> Option<BrowserInput> {
        match button {
            Button::Up => Some(BrowserInput::Up),
            Button::Down => Some(BrowserInput::Down),
            Button::Left => Some(BrowserInput::Left),
            Button::Right => Some(BrowserInput::Right),
            Button::L => Some(BrowserInput::ShoulderLeft),
            Button::R => Some(BrowserInput::ShoulderRight),
            Button::A | Button::Start => Some(BrowserInput::Confirm),
            Button::B | Button::Select | Button::Y => None,
        }
    }
}

impl BrowserSurface for BrowserWindow {
    fn viewport(&self) -> Viewport {
        Viewport {
            height: self.height,
            reserved_height: BROWSER_CHROME_ROWS * ROW_HEIGHT,
            row_height: ROW_HEIGHT,
        }
    }

    fn render(&mut self, view: &BrowserView<'_>) -> Result<(), BrowserError> {
        let mut canvas = Canvas {
            buffer: &mut self.buffer,
            width: self.width,
            height: self.height,
        };
        ui_render::draw_browser_page(&mut canvas, view);
        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .map_err(|e| BrowserError::Surface(e.to_string()))
    }

    fn poll_input(&mut self) -> Result<Vec<BrowserInput>, BrowserError> {
        self.window.update();
        if !self.window.is_open() || self.window.is_key_down(Key::Escape) {
            return Err(BrowserError::Cancelled);
        }

        Ok(self
            .window
            .get_keys_pressed(KeyRepeat::Yes)
            .into_iter()
            .filter_map(|key| self.bindings.button(key))
            .filter_map(Self::to_input)
            .collect())
    }
}
