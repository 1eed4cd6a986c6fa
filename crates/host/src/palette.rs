//! Colour palettes for monochrome titles
//!
//! A palette is three rows of four RGB555 colours. Row 0 and 1 colour the two
//! object palettes, row 2 the background. Titles are matched by the hash of
//! their header title; anything unknown falls back to greyscale.

use emu_core::{LCD_COLOUR, LCD_PALETTE_ALL};

/// Three rows (OBJ0, OBJ1, BG) of four RGB555 colours
pub type Palette = [[u16; 4]; 3];

pub const OBJ0: usize = 0;
pub const OBJ1: usize = 1;
pub const BG: usize = 2;

const fn uniform(row: [u16; 4]) -> Palette {
    [row, row, row]
}

/// DMG greyscale
pub const GREYSCALE: Palette = uniform([0x7FFF, 0x5294, 0x294A, 0x0000]);

const BALLOON_KID: Palette = uniform([0x7FFF, 0x7E60, 0x7C00, 0x0000]);
const TETRIS: Palette = uniform([0x7FFF, 0x7FE0, 0x7C00, 0x0000]);

pub const DONKEY_KONG: Palette = [
    [0x7FFF, 0x7E10, 0x48E7, 0x0000],
    [0x7FFF, 0x7E10, 0x48E7, 0x0000],
    [0x7FFF, 0x7E60, 0x7C00, 0x0000],
];

const POKEMON_BLUE: Palette = [
    [0x7FFF, 0x7E10, 0x48E7, 0x0000],
    [0x7FFF, 0x329F, 0x001F, 0x0000],
    [0x7FFF, 0x329F, 0x001F, 0x0000],
];

const POKEMON_RED: Palette = [
    [0x7FFF, 0x3FE6, 0x0200, 0x0000],
    [0x7FFF, 0x7E10, 0x48E7, 0x0000],
    [0x7FFF, 0x7E10, 0x48E7, 0x0000],
];

const POKEMON_RED_STAR: Palette = [
    [0x7FFF, 0x7E10, 0x48E7, 0x0000],
    [0x7FFF, 0x329F, 0x001F, 0x0000],
    [0x7FFF, 0x3FE6, 0x0200, 0x0000],
];

const KIRBY: Palette = [
    [0x7D8A, 0x6800, 0x3000, 0x0000],
    [0x001F, 0x7FFF, 0x7FEF, 0x021F],
    [0x527F, 0x7FE0, 0x0180, 0x0000],
];

const DONKEY_KONG_LAND: Palette = [
    [0x7F08, 0x7F40, 0x48E0, 0x2400],
    [0x7FFF, 0x2EFF, 0x7C00, 0x001F],
    [0x7FFF, 0x463B, 0x2951, 0x0000],
];

const LINKS_AWAKENING: Palette = [
    [0x7FFF, 0x03E0, 0x1A00, 0x0120],
    [0x7FFF, 0x329F, 0x001F, 0x001F],
    [0x7FFF, 0x7E10, 0x48E7, 0x0000],
];

const MEGA_MAN: Palette = [
    [0x7FFF, 0x329F, 0x001F, 0x0000],
    [0x7FFF, 0x3FE6, 0x0200, 0x0000],
    [0x7FFF, 0x7EAC, 0x40C0, 0x0000],
];

/// Title hash → palette
const AUTO_PALETTES: &[(u8, Palette)] = &[
    // Balloon Kid, Tetris Blast
    (0x71, BALLOON_KID),
    (0xFF, BALLOON_KID),
    // Pokemon Yellow, Tetris (0x95 unofficial)
    (0x15, TETRIS),
    (0xDB, TETRIS),
    (0x95, TETRIS),
    (0x19, DONKEY_KONG),
    // Pokemon Blue, Pokemon Blue Star
    (0x61, POKEMON_BLUE),
    (0x45, POKEMON_BLUE),
    (0xD8, POKEMON_BLUE),
    (0x14, POKEMON_RED),
    (0x8B, POKEMON_RED_STAR),
    (0x27, KIRBY),
    (0x49, KIRBY),
    (0x5C, KIRBY),
    (0xB3, KIRBY),
    // Donkey Kong Land 1/2/III
    (0x18, DONKEY_KONG_LAND),
    (0x6A, DONKEY_KONG_LAND),
    (0x4B, DONKEY_KONG_LAND),
    (0x6B, DONKEY_KONG_LAND),
    (0x70, LINKS_AWAKENING),
    // Mega Man 1/2/3 and others
    (0x01, MEGA_MAN),
    (0x10, MEGA_MAN),
    (0x29, MEGA_MAN),
    (0x52, MEGA_MAN),
    (0x5D, MEGA_MAN),
    (0x68, MEGA_MAN),
    (0x6D, MEGA_MAN),
    (0xF6, MEGA_MAN),
];

/// Manual presets, commented with the boot ROM button combination that picks
/// the same colours on hardware.
pub const PRESETS: [Palette; 12] = [
    // Right
    uniform([0x7FFF, 0x2BE0, 0x7D00, 0x0000]),
    // A + Down
    uniform([0x7FFF, 0x7FE0, 0x7C00, 0x0000]),
    // Up
    uniform([0x7FFF, 0x7EAC, 0x40C0, 0x0000]),
    // B + Right
    uniform([0x0000, 0x0210, 0x7F60, 0x7FFF]),
    // B + Left
    GREYSCALE,
    // Down
    uniform([0x7FF4, 0x7E52, 0x4A5F, 0x0000]),
    // B + Up
    [
        [0x7FFF, 0x7EAC, 0x40C0, 0x0000],
        [0x7FFF, 0x7EAC, 0x40C0, 0x0000],
        [0x7F98, 0x6670, 0x41A5, 0x2CC1],
    ],
    // A + Right
    [
        [0x7FFF, 0x7E10, 0x48E7, 0x0000],
        [0x7FFF, 0x7E10, 0x48E7, 0x0000],
        [0x7FFF, 0x3FE6, 0x0198, 0x0000],
    ],
    // A + Left
    [
        [0x7FFF, 0x7E10, 0x48E7, 0x0000],
        [0x7FFF, 0x7EAC, 0x40C0, 0x0000],
        [0x7FFF, 0x463B, 0x2951, 0x0000],
    ],
    // A + Up
    [
        [0x7FFF, 0x3FE6, 0x0200, 0x0000],
        [0x7FFF, 0x329F, 0x001F, 0x0000],
        [0x7FFF, 0x7E10, 0x48E7, 0x0000],
    ],
    // Left
    [
        [0x7FFF, 0x7E10, 0x48E7, 0x0000],
        [0x7FFF, 0x3FE6, 0x0200, 0x0000],
        [0x7FFF, 0x329F, 0x001F, 0x0000],
    ],
    // B + Down
    [
        [0x7FFF, 0x329F, 0x001F, 0x0000],
        [0x7FFF, 0x3FE6, 0x0200, 0x0000],
        [0x7FFF, 0x7FE0, 0x3D20, 0x0000],
    ],
];

/// Index of the preset a session starts from when cycling manually
pub const DEFAULT_PRESET: usize = 3;

/// Look up the palette for a title hash. Unknown titles get greyscale.
pub fn auto_assign(checksum: u8) -> Palette {
    match AUTO_PALETTES.iter().find(|(hash, _)| *hash == checksum) {
        Some((_, palette)) => *palette,
        None => {
            log::debug!("No palette found for 0x{:02X}", checksum);
            GREYSCALE
        }
    }
}

/// Pick a manual preset, wrapping out-of-range indices
pub fn manual_assign(index: usize) -> Palette {
    PRESETS[index % PRESETS.len()]
}

/// Translate a scanline pixel (palette bits + colour bits) to RGB555
#[inline]
pub fn lookup(palette: &Palette, pixel: u8) -> u16 {
    palette[((pixel & LCD_PALETTE_ALL) >> 4) as usize % 3][(pixel & LCD_COLOUR) as usize]
}

/// Active palette plus the manual cycling position
#[derive(Debug, Clone)]
pub struct PaletteSelector {
    active: Palette,
    preset: usize,
}

impl PaletteSelector {
    /// Start in auto mode for the given title hash
    pub fn new(checksum: u8) -> Self {
        Self {
            active: auto_assign(checksum),
            preset: DEFAULT_PRESET,
        }
    }

    pub fn active(&self) -> &Palette {
        &self.active
    }

    pub fn preset(&self) -> usize {
        self.preset
    }

    /// Cycle forward through the presets, returns the new preset index
    pub fn next(&mut self) -> usize {
        self.preset = (self.preset + 1) % PRESETS.len();
        self.active = manual_assign(self.preset);
        self.preset
    }

    /// Cycle backward through the presets, returns the new preset index
    pub fn prev(&mut self) -> usize {
        self.preset = (self.preset + PRESETS.len() - 1) % PRESETS.len();
        self.active = manual_assign(self.preset);
        self.preset
    }

    /// Return to the title's automatic palette
    pub fn reset_auto(&mut self, checksum: u8) {
        self.active = auto_assign(checksum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_assign_donkey_kong() {
        assert_eq!(auto_assign(0x19), DONKEY_KONG);
    }

    #[test]
    fn test_auto_assign_unknown_is_greyscale() {
        assert_eq!(auto_assign(0x00), GREYSCALE);
        assert_eq!(auto_assign(0x42), GREYSCALE);
    }

    #[test]
    fn test_auto_assign_shared_tables() {
        assert_eq!(auto_assign(0x27), auto_assign(0xB3));
        assert_eq!(auto_assign(0x71), auto_assign(0xFF));
        assert_eq!(auto_assign(0x14)[OBJ0], [0x7FFF, 0x3FE6, 0x0200, 0x0000]);
    }

    #[test]
    fn test_manual_assign_wraps() {
        assert_eq!(manual_assign(4), GREYSCALE);
        assert_eq!(manual_assign(4 + PRESETS.len()), GREYSCALE);
        assert_eq!(manual_assign(0), manual_assign(12));
    }

    #[test]
    fn test_cycle_order_twelve() {
        let mut selector = PaletteSelector::new(0x00);
        assert_eq!(selector.preset(), 3);

        for _ in 0..12 {
            selector.next();
        }
        assert_eq!(selector.preset(), 3);
        assert_eq!(*selector.active(), PRESETS[3]);

        // Eleven steps forward land where one step back does
        for _ in 0..11 {
            selector.next();
        }
        let forward = selector.preset();
        let mut other = PaletteSelector::new(0x00);
        assert_eq!(other.prev(), forward);
        assert_eq!(forward, 2);
    }

    #[test]
    fn test_prev_wraps_at_zero() {
        let mut selector = PaletteSelector::new(0x00);
        for _ in 0..4 {
            selector.prev();
        }
        assert_eq!(selector.preset(), 11);
    }

    #[test]
    fn test_reset_auto() {
        let mut selector = PaletteSelector::new(0x19);
        selector.next();
        assert_ne!(*selector.active(), DONKEY_KONG);
        selector.reset_auto(0x19);
        assert_eq!(*selector.active(), DONKEY_KONG);
    }

    #[test]
    fn test_lookup_rows() {
        // BG row, colour 3
        assert_eq!(lookup(&DONKEY_KONG, 0x23), 0x0000);
        // BG row, colour 1
        assert_eq!(lookup(&DONKEY_KONG, 0x21), 0x7E60);
        // OBJ0 row, colour 2
        assert_eq!(lookup(&DONKEY_KONG, 0x02), 0x48E7);
    }
}
