//! One loaded title and the real-time loop that plays it
//!
//! A [`CartridgeSession`] owns the ROM, the battery-backed cartridge RAM and
//! the LCD framebuffer for as long as a title is loaded. [`CartridgeSession::run`]
//! is the host loop: it drains input, runs one frame on the core, ticks the
//! RTC, presents (subject to frame skip), paces to the vertical sync rate and
//! flushes cartridge RAM on a fixed cadence and once more on the way out.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local, Timelike};
use emu_core::cartridge::HEADER_END;
use emu_core::{
    CartridgeError, CartridgeHeader, CoreError, CoreHost, EmulatorCore, ErrorAction, RtcTime,
    LCD_HEIGHT, LCD_WIDTH,
};

use crate::clock::Clock;
use crate::frontend::{with_audio_paused, Button, Frontend, InputEvent, OverlayMessage};
use crate::palette::{self, Palette, PaletteSelector};
use crate::persistence::{self, SaveCadence, ERASED_FILL};
use crate::scheduler::FrameScheduler;
use crate::screenshot::ScreenshotWriter;
use crate::settings::Settings;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("failed to read ROM {path}: {source}")]
    ReadRom { path: PathBuf, source: io::Error },
    #[error("cannot load {path}: {source}")]
    Cartridge {
        path: PathBuf,
        source: CartridgeError,
    },
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Select+Start: pick another title
    ReturnToBrowser,
    /// Window closed or frame limit reached
    Quit,
    /// The core halted on a fatal error
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    /// Frames emulated
    pub frames: u64,
    /// Frames shown on the frontend
    pub presented: u64,
}

/// Tunables for one run of the host loop
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub save_interval_ms: u64,
    pub recovery_save_path: PathBuf,
    pub frame_skip: bool,
    pub speed: u32,
    /// Stop after this many emulated frames
    pub max_frames: Option<u64>,
}

impl RunOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            save_interval_ms: settings.save_interval_ms(),
            recovery_save_path: settings.recovery_save_path.clone(),
            frame_skip: settings.frame_skip,
            speed: 1,
            max_frames: None,
        }
    }
}

/// Current local time as a cartridge RTC value
pub fn local_rtc() -> RtcTime {
    let now = Local::now();
    RtcTime {
        seconds: now.second() as u8,
        minutes: now.minute() as u8,
        hours: now.hour() as u8,
        days: now.ordinal0() as u16,
    }
}

/// Host callbacks available while the core reads the cartridge header.
/// There is no cartridge RAM yet and nothing to draw.
struct LoadingHost<'a> {
    rom: &'a [u8],
}

impl CoreHost for LoadingHost<'_> {
    fn rom_read(&self, addr: usize) -> u8 {
        self.rom.get(addr).copied().unwrap_or(ERASED_FILL)
    }

    fn cart_ram_read(&self, _addr: usize) -> u8 {
        ERASED_FILL
    }

    fn cart_ram_write(&mut self, _addr: usize, _val: u8) {}

    fn draw_line(&mut self, _pixels: &[u8; LCD_WIDTH], _line: usize) {}

    fn error(&mut self, err: CoreError) -> ErrorAction {
        log::error!("Core error during initialisation: {}", err);
        ErrorAction::Halt
    }
}

/// Host callbacks for one `run_frame` call
struct HostContext<'a> {
    rom: &'a [u8],
    cart_ram: &'a mut [u8],
    framebuffer: &'a mut [u16],
    palette: &'a Palette,
    frontend: &'a mut dyn Frontend,
    recovery_path: &'a Path,
    /// Set once cartridge RAM went to the recovery file
    recovered: bool,
}

impl CoreHost for HostContext<'_> {
    fn rom_read(&self, addr: usize) -> u8 {
        self.rom.get(addr).copied().unwrap_or(ERASED_FILL)
    }

    fn cart_ram_read(&self, addr: usize) -> u8 {
        self.cart_ram.get(addr).copied().unwrap_or(ERASED_FILL)
    }

    fn cart_ram_write(&mut self, addr: usize, val: u8) {
        if let Some(byte) = self.cart_ram.get_mut(addr) {
            *byte = val;
        }
    }

    fn draw_line(&mut self, pixels: &[u8; LCD_WIDTH], line: usize) {
        if line >= LCD_HEIGHT {
            return;
        }
        let row = &mut self.framebuffer[line * LCD_WIDTH..(line + 1) * LCD_WIDTH];
        for (out, &pixel) in row.iter_mut().zip(pixels.iter()) {
            *out = palette::lookup(self.palette, pixel);
        }
    }

    fn error(&mut self, err: CoreError) -> ErrorAction {
        if !err.is_fatal() {
            log::trace!("Ignoring core error: {}", err);
            return ErrorAction::Continue;
        }

        log::error!("{}", err);
        if self.frontend.confirm_continue(&err) {
            log::warn!("Continuing after core error");
            return ErrorAction::Continue;
        }

        let ram: &[u8] = self.cart_ram;
        let path = self.recovery_path;
        match with_audio_paused(&mut *self.frontend, || persistence::save(path, ram)) {
            Ok(()) => log::info!("Cartridge RAM written to {}", path.display()),
            Err(e) => log::error!("Recovery save failed: {}", e),
        }
        self.recovered = true;
        ErrorAction::Halt
    }
}

/// Host-level actions bound to controller input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    NextPalette,
    PrevPalette,
    AutoPalette,
    SpeedDown,
    SpeedUp,
    ToggleFrameSkip,
    Screenshot,
    ReturnToBrowser,
    Quit,
}

/// Joypad state plus the Select-modified shortcuts
#[derive(Debug, Clone, Default)]
pub struct Controls {
    joypad: u8,
    select_held: bool,
}

impl Controls {
    /// Buttons currently held, as joypad bits
    pub fn joypad(&self) -> u8 {
        self.joypad
    }

    /// Update the joypad and decode any host command. Console buttons always
    /// reach the core, even when they also trigger a command.
    pub fn handle(&mut self, event: InputEvent) -> Option<Command> {
        let (button, pressed) = match event {
            InputEvent::Quit => return Some(Command::Quit),
            InputEvent::Pressed(button) => (button, true),
            InputEvent::Released(button) => (button, false),
        };

        if let Some(bit) = button.joypad_bit() {
            if pressed {
                self.joypad |= bit;
            } else {
                self.joypad &= !bit;
            }
        }
        if button == Button::Select {
            self.select_held = pressed;
            return None;
        }
        if !pressed {
            return None;
        }

        match (button, self.select_held) {
            (Button::Up, true) => Some(Command::NextPalette),
            (Button::Down, true) => Some(Command::PrevPalette),
            (Button::Left | Button::Right, true) => Some(Command::AutoPalette),
            (Button::Start, true) => Some(Command::ReturnToBrowser),
            (Button::Y, true) => Some(Command::Screenshot),
            (Button::Y, false) => Some(Command::ToggleFrameSkip),
            (Button::L, _) => Some(Command::SpeedDown),
            (Button::R, _) => Some(Command::SpeedUp),
            _ => None,
        }
    }
}

/// Mutable state of one host loop run
struct LoopState {
    scheduler: FrameScheduler,
    overlay: OverlayMessage,
    frame_skip: bool,
    screenshot_pending: bool,
}

/// Everything owned for one loaded title
pub struct CartridgeSession {
    file_name: String,
    rom: Vec<u8>,
    cart_ram: Vec<u8>,
    header: CartridgeHeader,
    save_path: PathBuf,
    palette: PaletteSelector,
    framebuffer: Vec<u16>,
    audio: Vec<i16>,
}

impl CartridgeSession {
    /// Read the ROM, initialise the core against it and load cartridge RAM
    /// from `save_dir`.
    pub fn open(
        rom_path: &Path,
        core: &mut dyn EmulatorCore,
        save_dir: &Path,
    ) -> Result<Self, SessionError> {
        let rom = fs::read(rom_path).map_err(|source| SessionError::ReadRom {
            path: rom_path.to_path_buf(),
            source,
        })?;
        let file_name = rom_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_rom(file_name, rom, core, save_dir).map_err(|source| {
            SessionError::Cartridge {
                path: rom_path.to_path_buf(),
                source,
            }
        })
    }

    /// Like [`open`](Self::open) for a ROM already in memory
    pub fn from_rom(
        file_name: String,
        rom: Vec<u8>,
        core: &mut dyn EmulatorCore,
        save_dir: &Path,
    ) -> Result<Self, CartridgeError> {
        if rom.len() < HEADER_END {
            return Err(CartridgeError::TooSmall(rom.len()));
        }
        let header = core.init(&mut LoadingHost { rom: &rom })?;
        let save_path = persistence::save_path(save_dir, &header.title, header.header_checksum);
        let cart_ram = persistence::load(&save_path, core.save_size());
        let palette = PaletteSelector::new(core.colour_hash());

        log::info!(
            "Loaded {} ({:?}, {} bytes ROM, {} bytes RAM)",
            header.title,
            header.controller,
            rom.len(),
            cart_ram.len()
        );

        Ok(Self {
            file_name,
            rom,
            cart_ram,
            header,
            save_path,
            palette,
            framebuffer: vec![0; LCD_WIDTH * LCD_HEIGHT],
            audio: Vec::new(),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn header(&self) -> &CartridgeHeader {
        &self.header
    }

    pub fn cart_ram(&self) -> &[u8] {
        &self.cart_ram
    }

    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    pub fn palette(&self) -> &PaletteSelector {
        &self.palette
    }

    /// RGB555 pixels, row-major
    pub fn framebuffer(&self) -> &[u16] {
        &self.framebuffer
    }

    /// Write cartridge RAM to its save file with audio held off
    pub fn flush(&self, frontend: &mut dyn Frontend) {
        let path = &self.save_path;
        let ram = &self.cart_ram;
        if let Err(e) = with_audio_paused(frontend, || persistence::save(path, ram)) {
            log::warn!("{}", e);
        }
    }

    fn apply_command(
        &mut self,
        command: Command,
        core: &mut dyn EmulatorCore,
        state: &mut LoopState,
        now_ms: u64,
    ) {
        let overlay = &mut state.overlay;
        match command {
            Command::NextPalette => {
                let preset = self.palette.next();
                overlay.show(format!("PALETTE {}", preset), now_ms);
            }
            Command::PrevPalette => {
                let preset = self.palette.prev();
                overlay.show(format!("PALETTE {}", preset), now_ms);
            }
            Command::AutoPalette => {
                self.palette.reset_auto(core.colour_hash());
                overlay.show("ASSIGN AUTO PALETTE", now_ms);
            }
            Command::SpeedDown => {
                let speed = state.scheduler.slow_down();
                overlay.show(format!("SPEED {}", speed), now_ms);
            }
            Command::SpeedUp => {
                let speed = state.scheduler.speed_up();
                overlay.show(format!("SPEED {}", speed), now_ms);
            }
            Command::ToggleFrameSkip => {
                state.frame_skip = !state.frame_skip;
                core.set_frame_skip(state.frame_skip);
                let text = if state.frame_skip {
                    "FRAMESKIP ON"
                } else {
                    "FRAMESKIP OFF"
                };
                overlay.show(text, now_ms);
            }
            Command::Screenshot => state.screenshot_pending = true,
            Command::ReturnToBrowser | Command::Quit => {}
        }
    }

    /// Play until the user leaves, the core halts or the frame limit is hit.
    /// Cartridge RAM is flushed exactly once on the way out, unless it
    /// already went to the recovery file.
    pub fn run(
        &mut self,
        core: &mut dyn EmulatorCore,
        frontend: &mut dyn Frontend,
        clock: &mut dyn Clock,
        screenshots: &mut ScreenshotWriter,
        options: &RunOptions,
    ) -> SessionReport {
        let mut state = LoopState {
            scheduler: FrameScheduler::default(),
            overlay: OverlayMessage::default(),
            frame_skip: options.frame_skip,
            screenshot_pending: false,
        };
        state.scheduler.set_speed(options.speed);
        let mut cadence = SaveCadence::new(options.save_interval_ms, clock.now_ms());
        let mut controls = Controls::default();
        let mut frames = 0u64;
        let mut presented = 0u64;
        let mut recovered = false;

        core.set_frame_skip(state.frame_skip);
        state
            .overlay
            .show(format!("STARTING {}", self.file_name), clock.now_ms());
        log::info!("Session started: {}", self.file_name);

        let outcome = 'run: loop {
            if options.max_frames.is_some_and(|max| frames >= max) {
                break SessionOutcome::Quit;
            }
            let frame_start = clock.now_ms();

            while let Some(event) = frontend.poll_event() {
                let Some(command) = controls.handle(event) else {
                    continue;
                };
                match command {
                    Command::Quit => break 'run SessionOutcome::Quit,
                    Command::ReturnToBrowser => break 'run SessionOutcome::ReturnToBrowser,
                    _ => self.apply_command(command, core, &mut state, frame_start),
                }
            }
            core.set_joypad(controls.joypad());

            let mut ctx = HostContext {
                rom: &self.rom,
                cart_ram: &mut self.cart_ram,
                framebuffer: &mut self.framebuffer,
                palette: self.palette.active(),
                frontend: &mut *frontend,
                recovery_path: &options.recovery_save_path,
                recovered: false,
            };
            let action = core.run_frame(&mut ctx);
            recovered = ctx.recovered;
            frames += 1;
            if action == ErrorAction::Halt {
                break SessionOutcome::Aborted;
            }

            if state.scheduler.advance_rtc() {
                core.tick_rtc();
            }

            core.drain_audio(&mut self.audio);
            if !self.audio.is_empty() {
                frontend.queue_audio(&self.audio);
                self.audio.clear();
            }

            if !state.scheduler.should_present() {
                continue;
            }

            let now = clock.now_ms();
            if let Err(e) = frontend.present(&self.framebuffer, state.overlay.current(now)) {
                log::error!("Failed to present frame: {}", e);
                break SessionOutcome::Quit;
            }
            presented += 1;

            if state.screenshot_pending {
                state.screenshot_pending = false;
                state.overlay.show("SAVING SCREENSHOT...", now);
                if let Err(e) = screenshots.save(&self.header.title, &self.framebuffer) {
                    log::warn!("{}", e);
                }
            }

            let delay = state.scheduler.pace(clock, frame_start);
            log::trace!("Frame {} paced with {} ms delay", frames, delay);

            let now = clock.now_ms();
            if cadence.due(now) {
                log::debug!("Periodic save of {}", self.save_path.display());
                self.flush(frontend);
                cadence.mark(now);
            }
        };

        if !recovered {
            self.flush(frontend);
        }
        log::info!(
            "Session ended: {:?} after {} frames ({} presented)",
            outcome,
            frames,
            presented
        );
        SessionReport {
            outcome,
            frames,
            presented,
        }
    }
}
