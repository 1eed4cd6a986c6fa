//! LCD screenshots as 15-bit BMP files

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use emu_core::{LCD_HEIGHT, LCD_WIDTH};

/// BITMAPINFOHEADER for a top-down 160x144 image with 16 bits per pixel
/// (RGB555, no compression). Pixel data follows directly at offset 54.
const BMP_HEADER_RGB555: [u8; 54] = [
    0x42, 0x4d, 0x36, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x36, 0x00, 0x00, 0x00, 0x28, 0x00, 0x00, 0x00, 0xa0, 0x00, //
    0x00, 0x00, 0x70, 0xff, 0xff, 0xff, 0x01, 0x00, 0x10, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0xb4, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00,
];

#[derive(thiserror::Error, Debug)]
pub enum ScreenshotError {
    #[error("framebuffer has {0} pixels, expected 160x144")]
    BadFramebuffer(usize),
    #[error("failed to write screenshot {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Encode a framebuffer as a complete BMP file
pub fn encode_bmp(framebuffer: &[u16]) -> Result<Vec<u8>, ScreenshotError> {
    if framebuffer.len() != LCD_WIDTH * LCD_HEIGHT {
        return Err(ScreenshotError::BadFramebuffer(framebuffer.len()));
    }
    let mut out = Vec::with_capacity(BMP_HEADER_RGB555.len() + framebuffer.len() * 2);
    out.extend_from_slice(&BMP_HEADER_RGB555);
    for pixel in framebuffer {
        out.extend_from_slice(&pixel.to_le_bytes());
    }
    Ok(out)
}

/// Numbers screenshots across every title played in this process
#[derive(Debug, Clone)]
pub struct ScreenshotWriter {
    dir: PathBuf,
    counter: u64,
}

impl ScreenshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            counter: 0,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the frame as `<title>_<counter>.bmp`; the counter only advances
    /// when the file was written.
    pub fn save(&mut self, title: &str, framebuffer: &[u16]) -> Result<PathBuf, ScreenshotError> {
        let data = encode_bmp(framebuffer)?;
        let path = self.dir.join(format!("{}_{:010}.bmp", title, self.counter));

        let write = || -> io::Result<()> {
            if !self.dir.as_os_str().is_empty() {
                fs::create_dir_all(&self.dir)?;
            }
            fs::write(&path, &data)
        };
        write().map_err(|source| ScreenshotError::Write {
            path: path.clone(),
            source,
        })?;

        self.counter += 1;
        log::info!("Screenshot saved to {}", path.display());
        Ok(path)
    }
}
