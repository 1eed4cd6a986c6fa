//! Cartridge header parsing
//!
//! Everything the host needs to know about a title before running it lives in
//! the 0x100..0x150 header: the title string, the memory controller, the size of
//! battery-backed RAM and a checksum guarding the header bytes.

use serde::Serialize;

use crate::CoreHost;

/// Minimum ROM length that contains a full header
pub const HEADER_END: usize = 0x150;

const TITLE_START: usize = 0x0134;
const TITLE_END: usize = 0x0143;
const CART_TYPE: usize = 0x0147;
const RAM_SIZE: usize = 0x0149;
const HEADER_CHECKSUM: usize = 0x014D;

/// Cartridge RAM sizes indexed by the RAM size code at 0x149
const RAM_SIZES: [usize; 6] = [0x00, 0x800, 0x2000, 0x8000, 0x20000, 0x10000];

/// MBC2 carries 512 half-bytes of internal RAM regardless of the header
const MBC2_RAM_SIZE: usize = 0x200;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartridgeError {
    #[error("ROM too small: {0} bytes, header needs 0x150")]
    TooSmall(usize),
    #[error("Unsupported cartridge type {0:#04x}")]
    Unsupported(u8),
    #[error("Invalid ROM: checksum failure (header {expected:#04x}, computed {computed:#04x})")]
    InvalidChecksum { expected: u8, computed: u8 },
}

/// Memory bank controller family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Controller {
    RomOnly,
    Mbc1,
    Mbc2,
    Mbc3,
    Mbc5,
}

impl Controller {
    /// Map the cartridge type byte at 0x147 to a supported controller
    pub fn from_cart_type(cart_type: u8) -> Option<Self> {
        match cart_type {
            0x00 | 0x08 | 0x09 => Some(Controller::RomOnly), // ROM (+RAM +BATTERY)
            0x01..=0x03 => Some(Controller::Mbc1),
            0x05 | 0x06 => Some(Controller::Mbc2),
            0x0F..=0x13 => Some(Controller::Mbc3), // includes TIMER variants
            0x19..=0x1E => Some(Controller::Mbc5), // includes RUMBLE variants
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartridgeHeader {
    pub title: String,
    pub cart_type: u8,
    pub controller: Controller,
    pub ram_size_code: u8,
    pub header_checksum: u8,
    pub colour_hash: u8,
}

impl CartridgeHeader {
    /// Parse and validate the header of a ROM image
    pub fn parse(rom: &[u8]) -> Result<Self, CartridgeError> {
        if rom.len() < HEADER_END {
            return Err(CartridgeError::TooSmall(rom.len()));
        }

        let computed = header_checksum(rom);
        let expected = rom[HEADER_CHECKSUM];
        if computed != expected {
            return Err(CartridgeError::InvalidChecksum { expected, computed });
        }

        let cart_type = rom[CART_TYPE];
        let controller =
            Controller::from_cart_type(cart_type).ok_or(CartridgeError::Unsupported(cart_type))?;

        Ok(Self {
            title: rom_title(rom),
            cart_type,
            controller,
            ram_size_code: rom[RAM_SIZE],
            header_checksum: expected,
            colour_hash: colour_hash(rom),
        })
    }

    /// Parse the header by reading it byte-by-byte through the host callbacks
    pub fn read_from(host: &dyn CoreHost) -> Result<Self, CartridgeError> {
        let header: Vec<u8> = (0..HEADER_END).map(|addr| host.rom_read(addr)).collect();
        Self::parse(&header)
    }

    /// Size of battery-backed RAM in bytes. Unknown RAM codes report none.
    pub fn save_size(&self) -> usize {
        if self.controller == Controller::Mbc2 {
            return MBC2_RAM_SIZE;
        }
        RAM_SIZES
            .get(self.ram_size_code as usize)
            .copied()
            .unwrap_or(0)
    }
}

/// Header checksum over 0x134..=0x14C as computed by the boot ROM
pub fn header_checksum(rom: &[u8]) -> u8 {
    rom[TITLE_START..HEADER_CHECKSUM]
        .iter()
        .fold(0u8, |x, &b| x.wrapping_sub(b).wrapping_sub(1))
}

/// Wrapping sum of the sixteen title bytes
pub fn colour_hash(rom: &[u8]) -> u8 {
    rom[TITLE_START..=TITLE_END]
        .iter()
        .fold(0u8, |x, &b| x.wrapping_add(b))
}

fn rom_title(rom: &[u8]) -> String {
    rom[TITLE_START..=TITLE_END]
        .iter()
        .take_while(|&&b| b != 0)
        .filter(|b| b.is_ascii_graphic() || **b == b' ')
        .map(|&b| b as char)
        .collect()
}
