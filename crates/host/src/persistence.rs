//! Battery-backed cartridge RAM on disk
//!
//! Save files are a raw dump of cartridge RAM with no header, named after the
//! title and its header checksum so two revisions of a title never share one.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Erased flash/SRAM reads back as 0xFF
pub const ERASED_FILL: u8 = 0xFF;

#[derive(thiserror::Error, Debug)]
pub enum PersistError {
    #[error("failed to create save directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to write save file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Path of the save file for a title
pub fn save_path(save_dir: &Path, title: &str, header_checksum: u8) -> PathBuf {
    save_dir.join(format!("{}_{:02x}.sav", title, header_checksum))
}

/// Load cartridge RAM of exactly `len` bytes.
///
/// A missing or unreadable file is not an error: the buffer starts erased and
/// the file gets created on the next save. Short files fill only the front of
/// the buffer.
pub fn load(path: &Path, len: usize) -> Vec<u8> {
    if len == 0 {
        return Vec::new();
    }

    let mut ram = vec![ERASED_FILL; len];
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::info!("No save file at {}, starting blank", path.display());
            return ram;
        }
        Err(e) => {
            log::warn!("Unable to open save file {}: {}", path.display(), e);
            return ram;
        }
    };

    let mut filled = 0;
    while filled < len {
        match file.read(&mut ram[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::warn!("Error reading save file {}: {}", path.display(), e);
                break;
            }
        }
    }

    if filled < len {
        log::debug!(
            "Save file {} is short: {} of {} bytes",
            path.display(),
            filled,
            len
        );
    }
    ram
}

/// Write cartridge RAM to disk, replacing any previous file.
/// Nothing is written for titles without battery memory.
pub fn save(path: &Path, ram: &[u8]) -> Result<(), PersistError> {
    if ram.is_empty() {
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| PersistError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    fs::write(path, ram).map_err(|source| PersistError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Saved {} bytes to {}", ram.len(), path.display());
    Ok(())
}

/// Timer deciding when cartridge RAM is flushed during play
#[derive(Debug, Clone)]
pub struct SaveCadence {
    interval_ms: u64,
    last_ms: u64,
}

impl SaveCadence {
    pub fn new(interval_ms: u64, now_ms: u64) -> Self {
        Self {
            interval_ms,
            last_ms: now_ms,
        }
    }

    /// True once more than the interval has passed since the last save
    pub fn due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_ms) > self.interval_ms
    }

    /// Restart the interval
    pub fn mark(&mut self, now_ms: u64) {
        self.last_ms = now_ms;
    }
}
