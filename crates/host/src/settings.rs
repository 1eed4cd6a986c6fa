use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::browser::MAX_ITEMS;

/// Key names per button, as understood by the windowing frontend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyMapping {
    pub a: String,
    pub b: String,
    pub select: String,
    pub start: String,
    pub up: String,
    pub down: String,
    pub left: String,
    pub right: String,
    pub l: String,
    pub r: String,
    pub y: String,
}

impl Default for KeyMapping {
    fn default() -> Self {
        Self {
            a: "Z".to_string(),
            b: "X".to_string(),
            select: "Backspace".to_string(),
            start: "Enter".to_string(),
            up: "Up".to_string(),
            down: "Down".to_string(),
            left: "Left".to_string(),
            right: "Right".to_string(),
            l: "A".to_string(),
            r: "S".to_string(),
            y: "Space".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub keyboard: KeyMapping,
    pub rom_dir: PathBuf,
    pub save_dir: PathBuf,
    pub screenshot_dir: PathBuf,
    /// Where cartridge RAM goes when the operator abandons a crashed title
    pub recovery_save_path: PathBuf,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,
    /// File extensions shown in the browser, empty shows everything
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default = "default_save_interval")]
    pub save_interval_secs: u64,
    pub browser_width: usize,
    pub browser_height: usize,
    pub scale: u8,
    #[serde(default)]
    pub frame_skip: bool,
}

fn default_max_items() -> usize {
    MAX_ITEMS
}

fn default_max_name_len() -> usize {
    256
}

fn default_save_interval() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            keyboard: KeyMapping::default(),
            rom_dir: PathBuf::from("roms"),
            save_dir: PathBuf::from("saves"),
            screenshot_dir: PathBuf::from("screenshots"),
            recovery_save_path: PathBuf::from("saves").join("recovery.sav"),
            max_items: default_max_items(),
            max_name_len: default_max_name_len(),
            extensions: vec!["gb".to_string(), "gbc".to_string()],
            save_interval_secs: default_save_interval(),
            browser_width: 640,
            browser_height: 480,
            scale: 3,
            frame_skip: false,
        }
    }
}

impl Settings {
    /// Get the config file path relative to the executable
    pub fn config_path() -> PathBuf {
        let mut path = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));
        path.push("config.json");
        path
    }

    /// Load settings from config.json, falling back to defaults on error.
    /// A missing file is created with the defaults so it can be edited.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!(
                        "Failed to parse {}: {}. Using defaults.",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let settings = Self::default();
                match settings.save_to(path) {
                    Ok(()) => log::info!("Wrote default settings to {}", path.display()),
                    Err(e) => log::warn!("Failed to write {}: {}", path.display(), e),
                }
                settings
            }
            Err(_) => {
                // Unreadable file, use defaults and leave it alone
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Milliseconds between cartridge RAM flushes during play
    pub fn save_interval_ms(&self) -> u64 {
        self.save_interval_secs.saturating_mul(1000)
    }

    /// Create the output directories so the first save does not have to
    pub fn create_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.save_dir)?;
        fs::create_dir_all(&self.screenshot_dir)?;
        if let Some(parent) = self.recovery_save_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.keyboard.a, "Z");
        assert_eq!(settings.keyboard.b, "X");
        assert_eq!(settings.max_items, 2048);
        assert_eq!(settings.save_interval_ms(), 10_000);
        assert_eq!(settings.browser_width, 640);
        assert_eq!(settings.browser_height, 480);
    }

    #[test]
    fn test_settings_serialization() {
        let settings = Settings::default();
        let json = serde_json::to_string(&settings).expect("Failed to serialize");
        let deserialized: Settings = serde_json::from_str(&json).expect("Failed to deserialize");
        assert_eq!(deserialized.keyboard.a, settings.keyboard.a);
        assert_eq!(deserialized.rom_dir, settings.rom_dir);
        assert_eq!(deserialized.extensions, settings.extensions);
    }

    #[test]
    fn test_missing_optional_fields_use_defaults() {
        let json = r#"{
            "keyboard": {
                "a": "K", "b": "J", "select": "Backspace", "start": "Enter",
                "up": "W", "down": "S", "left": "A", "right": "D",
                "l": "Q", "r": "E", "y": "Space"
            },
            "rom_dir": "/roms",
            "save_dir": "/saves",
            "screenshot_dir": "/shots",
            "recovery_save_path": "/saves/recovery.sav",
            "browser_width": 320,
            "browser_height": 240,
            "scale": 2
        }"#;
        let settings: Settings = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(settings.keyboard.a, "K");
        assert_eq!(settings.max_items, 2048);
        assert_eq!(settings.max_name_len, 256);
        assert_eq!(settings.save_interval_secs, 10);
        assert!(settings.extensions.is_empty());
        assert!(!settings.frame_skip);
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join("emu_host_settings");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let missing = Settings::load_from(&dir.join("missing.json"));
        assert_eq!(missing.browser_width, 640);

        let broken = dir.join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&broken).scale, 3);
        // A file the user broke is never overwritten
        assert_eq!(fs::read_to_string(&broken).unwrap(), "{ not json");

        let good = dir.join("config.json");
        let mut settings = Settings::default();
        settings.scale = 5;
        settings.save_to(&good).unwrap();
        assert_eq!(Settings::load_from(&good).scale, 5);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_first_load_writes_defaults() {
        let dir = std::env::temp_dir().join("emu_host_settings_first_run");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        let settings = Settings::load_from(&path);
        assert!(path.exists());
        let written: Settings =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.keyboard.a, settings.keyboard.a);
        assert_eq!(written.save_interval_secs, 10);

        // Later loads read the file back
        let mut edited = written;
        edited.scale = 2;
        edited.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).scale, 2);

        fs::remove_dir_all(&dir).unwrap();
    }
}
