//! Core emulator interface consumed by the host runtime.
//!
//! The emulation core itself (CPU, PPU, memory-mapped I/O) lives behind the
//! [`EmulatorCore`] trait. The host hands the core a [`CoreHost`] on every call
//! that needs cartridge memory, scanline output or error decisions, mirroring a
//! callback-style C interface without global state.

pub mod blank;
pub mod cartridge;

pub use cartridge::{CartridgeError, CartridgeHeader};

/// LCD width in pixels
pub const LCD_WIDTH: usize = 160;
/// LCD height in pixels
pub const LCD_HEIGHT: usize = 144;

/// Master clock of the DMG in Hz
pub const DMG_CLOCK_FREQ: f64 = 4_194_304.0;
/// Clock cycles needed to draw one full screen
pub const SCREEN_REFRESH_CYCLES: f64 = 70_224.0;
/// Vertical sync rate, ~59.7275 Hz
pub const VERTICAL_SYNC: f64 = DMG_CLOCK_FREQ / SCREEN_REFRESH_CYCLES;

/// Pixel palette selector bits pushed by the core in each scanline byte.
/// Bits 0-1 are the colour index, bits 4-5 select the palette row.
pub const LCD_COLOUR: u8 = 0x03;
pub const LCD_PALETTE_ALL: u8 = 0x30;

pub mod joypad {
    //! Button bits for [`EmulatorCore::set_joypad`](super::EmulatorCore::set_joypad).
    //! Bits: 0=Right, 1=Left, 2=Up, 3=Down, 4=A, 5=B, 6=Select, 7=Start.
    //! A set bit means the button is held.
    pub const RIGHT: u8 = 1 << 0;
    pub const LEFT: u8 = 1 << 1;
    pub const UP: u8 = 1 << 2;
    pub const DOWN: u8 = 1 << 3;
    pub const A: u8 = 1 << 4;
    pub const B: u8 = 1 << 5;
    pub const SELECT: u8 = 1 << 6;
    pub const START: u8 = 1 << 7;
}

/// Wall-clock value used to seed the cartridge real-time clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RtcTime {
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    /// Day of the year, 0-based
    pub days: u16,
}

/// Errors reported by the core while running a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// An undefined opcode was fetched. `pc` already points at the opcode.
    InvalidOpcode { opcode: u8, pc: u16, sp: u16 },
    /// A read from an unmapped address
    InvalidRead(u16),
    /// A write to an unmapped address
    InvalidWrite(u16),
    /// Anything the core could not classify
    Unknown(u16),
}

impl CoreError {
    /// Invalid reads and writes happen routinely in commercial titles and do not
    /// stop emulation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CoreError::InvalidOpcode { .. } | CoreError::Unknown(_))
    }
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CoreError::InvalidOpcode { opcode, pc, sp } => write!(
                f,
                "Invalid opcode {:#04x} at PC: {:#06x}, SP: {:#06x}",
                opcode, pc, sp
            ),
            CoreError::InvalidRead(addr) => write!(f, "Invalid read at {:#06x}", addr),
            CoreError::InvalidWrite(addr) => write!(f, "Invalid write at {:#06x}", addr),
            CoreError::Unknown(val) => write!(f, "Unknown error ({:#06x})", val),
        }
    }
}

/// What the core should do after reporting an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    Continue,
    Halt,
}

/// Callbacks the core uses to reach host-owned memory and output.
pub trait CoreHost {
    /// Read a byte of the cartridge ROM
    fn rom_read(&self, addr: usize) -> u8;

    /// Read a byte of battery-backed cartridge RAM
    fn cart_ram_read(&self, addr: usize) -> u8;

    /// Write a byte of battery-backed cartridge RAM
    fn cart_ram_write(&mut self, addr: usize, val: u8);

    /// Push one finished scanline. Each byte carries palette and colour bits
    /// (see [`LCD_PALETTE_ALL`] and [`LCD_COLOUR`]).
    fn draw_line(&mut self, pixels: &[u8; LCD_WIDTH], line: usize);

    /// Report an error and ask whether emulation may continue
    fn error(&mut self, err: CoreError) -> ErrorAction;
}

/// An emulation core driven one displayable frame at a time.
pub trait EmulatorCore {
    /// Initialise the core against the ROM reachable through `host`.
    /// Fails for unsupported or corrupt cartridges.
    fn init(&mut self, host: &mut dyn CoreHost) -> Result<CartridgeHeader, CartridgeError>;

    /// Execute CPU cycles until the screen has to be redrawn.
    /// Returns [`ErrorAction::Halt`] if the host asked to stop mid-frame.
    fn run_frame(&mut self, host: &mut dyn CoreHost) -> ErrorAction;

    /// Advance the cartridge real-time clock by one second
    fn tick_rtc(&mut self);

    /// Seed the cartridge real-time clock
    fn set_rtc(&mut self, time: RtcTime);

    /// Set held buttons (see [`joypad`])
    fn set_joypad(&mut self, buttons: u8);

    /// Enable or disable the core's internal frame skip (render every other frame)
    fn set_frame_skip(&mut self, enabled: bool);

    /// Size of battery-backed cartridge RAM in bytes, 0 if none
    fn save_size(&self) -> usize;

    /// Cartridge title, at most 16 characters
    fn rom_name(&self) -> String;

    /// Hash of the title bytes used for palette lookup
    fn colour_hash(&self) -> u8;

    /// Audio samples produced since the last call. Cores without sound output
    /// return nothing.
    fn drain_audio(&mut self, _out: &mut Vec<i16>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_sync_rate() {
        assert!((VERTICAL_SYNC - 59.7275).abs() < 0.0001);
    }

    #[test]
    fn fatal_error_classification() {
        assert!(CoreError::InvalidOpcode {
            opcode: 0xD3,
            pc: 0x150,
            sp: 0xFFFE
        }
        .is_fatal());
        assert!(CoreError::Unknown(0).is_fatal());
        assert!(!CoreError::InvalidRead(0xFEA0).is_fatal());
        assert!(!CoreError::InvalidWrite(0xFEA0).is_fatal());
    }

    #[test]
    fn invalid_opcode_display() {
        let err = CoreError::InvalidOpcode {
            opcode: 0xDD,
            pc: 0x0150,
            sp: 0xFFFE,
        };
        assert_eq!(
            err.to_string(),
            "Invalid opcode 0xdd at PC: 0x0150, SP: 0xfffe"
        );
    }
}
