//! Header-only core
//!
//! `BlankCore` validates the cartridge, answers the header queries and keeps
//! the real-time clock, but executes no instructions: every frame is a blank
//! background. The host runtime can be exercised end to end with it until a CPU
//! core is linked.

use crate::{
    CartridgeError, CartridgeHeader, CoreError, CoreHost, EmulatorCore, ErrorAction, RtcTime,
    LCD_HEIGHT, LCD_WIDTH,
};

/// Background palette row, colour 0
const BLANK_PIXEL: u8 = 0x20;

#[derive(Debug, Default)]
pub struct BlankCore {
    header: Option<CartridgeHeader>,
    rtc: RtcTime,
    joypad: u8,
    frame_skip: bool,
    frames: u64,
}

impl BlankCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current real-time clock value
    pub fn rtc(&self) -> RtcTime {
        self.rtc
    }

    /// Buttons last set by the host
    pub fn joypad(&self) -> u8 {
        self.joypad
    }

    /// Number of frames run since init
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl EmulatorCore for BlankCore {
    fn init(&mut self, host: &mut dyn CoreHost) -> Result<CartridgeHeader, CartridgeError> {
        let header = CartridgeHeader::read_from(host)?;
        self.header = Some(header.clone());
        self.frames = 0;
        Ok(header)
    }

    fn run_frame(&mut self, host: &mut dyn CoreHost) -> ErrorAction {
        if self.header.is_none() {
            return host.error(CoreError::Unknown(0));
        }

        self.frames += 1;
        // With frame skip on, only every other frame reaches the LCD
        if self.frame_skip && self.frames % 2 == 0 {
            return ErrorAction::Continue;
        }

        let line = [BLANK_PIXEL; LCD_WIDTH];
        for y in 0..LCD_HEIGHT {
            host.draw_line(&line, y);
        }
        ErrorAction::Continue
    }

    fn tick_rtc(&mut self) {
        let rtc = &mut self.rtc;
        rtc.seconds += 1;
        if rtc.seconds < 60 {
            return;
        }
        rtc.seconds = 0;
        rtc.minutes += 1;
        if rtc.minutes < 60 {
            return;
        }
        rtc.minutes = 0;
        rtc.hours += 1;
        if rtc.hours < 24 {
            return;
        }
        rtc.hours = 0;
        // Day counter is 9 bits on MBC3
        rtc.days = (rtc.days + 1) & 0x1FF;
    }

    fn set_rtc(&mut self, time: RtcTime) {
        self.rtc = time;
    }

    fn set_joypad(&mut self, buttons: u8) {
        self.joypad = buttons;
    }

    fn set_frame_skip(&mut self, enabled: bool) {
        self.frame_skip = enabled;
    }

    fn save_size(&self) -> usize {
        self.header.as_ref().map_or(0, CartridgeHeader::save_size)
    }

    fn rom_name(&self) -> String {
        self.header
            .as_ref()
            .map(|h| h.title.clone())
            .unwrap_or_default()
    }

    fn colour_hash(&self) -> u8 {
        self.header.as_ref().map_or(0, |h| h.colour_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::tests::make_rom;

    struct TestHost {
        rom: Vec<u8>,
        lines: usize,
        errors: Vec<CoreError>,
    }

    impl CoreHost for TestHost {
        fn rom_read(&self, addr: usize) -> u8 {
            self.rom[addr]
        }

        fn cart_ram_read(&self, _addr: usize) -> u8 {
            0xFF
        }

        fn cart_ram_write(&mut self, _addr: usize, _val: u8) {}

        fn draw_line(&mut self, _pixels: &[u8; LCD_WIDTH], _line: usize) {
            self.lines += 1;
        }

        fn error(&mut self, err: CoreError) -> ErrorAction {
            self.errors.push(err);
            ErrorAction::Halt
        }
    }

    fn host_for(rom: Vec<u8>) -> TestHost {
        TestHost {
            rom,
            lines: 0,
            errors: Vec::new(),
        }
    }

    #[test]
    fn test_init_reports_header() {
        let mut host = host_for(make_rom("KIRBY", 0x03, 0x02));
        let mut core = BlankCore::new();
        let header = core.init(&mut host).unwrap();
        assert_eq!(header.title, "KIRBY");
        assert_eq!(core.rom_name(), "KIRBY");
        assert_eq!(core.save_size(), 0x2000);
    }

    #[test]
    fn test_run_without_init_reports_error() {
        let mut host = host_for(make_rom("KIRBY", 0x00, 0x00));
        let mut core = BlankCore::new();
        assert_eq!(core.run_frame(&mut host), ErrorAction::Halt);
        assert_eq!(host.errors, vec![CoreError::Unknown(0)]);
    }

    #[test]
    fn test_frame_skip_draws_every_other_frame() {
        let mut host = host_for(make_rom("KIRBY", 0x00, 0x00));
        let mut core = BlankCore::new();
        core.init(&mut host).unwrap();
        core.set_frame_skip(true);
        for _ in 0..4 {
            core.run_frame(&mut host);
        }
        assert_eq!(host.lines, 2 * LCD_HEIGHT);
    }

    #[test]
    fn test_rtc_rollover() {
        let mut core = BlankCore::new();
        core.set_rtc(RtcTime {
            seconds: 59,
            minutes: 59,
            hours: 23,
            days: 0x1FF,
        });
        core.tick_rtc();
        assert_eq!(core.rtc(), RtcTime::default());
    }
}
