mod audio;
mod browser_window;
mod game_window;
mod keys;
mod ui_render;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use emu_core::blank::BlankCore;
use emu_core::EmulatorCore;
use emu_host::browser::{Browser, BrowserError, FsLister};
use emu_host::screenshot::ScreenshotWriter;
use emu_host::session::local_rtc;
use emu_host::{CartridgeSession, RunOptions, SessionOutcome, Settings, SystemClock};

use audio::AudioOutput;
use browser_window::BrowserWindow;
use game_window::GameWindow;

/// Show the browser until a ROM is picked. `Ok(None)` means the user closed it.
fn pick_rom(settings: &Settings) -> Result<Option<PathBuf>, BrowserError> {
    let browser = Browser {
        directory: settings.rom_dir.clone(),
        extensions: settings.extensions.clone(),
        max_items: settings.max_items,
        max_name_len: settings.max_name_len,
    };
    let mut window = BrowserWindow::open(settings)
        .map_err(|e| BrowserError::Surface(e.to_string()))?;

    match browser.select(&FsLister, &mut window) {
        Ok(name) => Ok(Some(settings.rom_dir.join(name))),
        Err(BrowserError::Cancelled) => Ok(None),
        Err(e) => Err(e),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load();
    if let Err(e) = settings.create_dirs() {
        log::error!("Failed to create output directories: {}", e);
        return ExitCode::FAILURE;
    }
    log::warn!("No CPU core linked, titles run on the blank core");

    let audio = AudioOutput::open();
    let mut screenshots = ScreenshotWriter::new(&settings.screenshot_dir);
    let options = RunOptions::from_settings(&settings);

    // A ROM on the command line skips the first trip through the browser
    let mut next_rom = env::args().nth(1).map(PathBuf::from);

    loop {
        let rom_path = match next_rom.take() {
            Some(path) => path,
            None => match pick_rom(&settings) {
                Ok(Some(path)) => path,
                Ok(None) => break,
                Err(e) => {
                    log::error!("{}", e);
                    return ExitCode::FAILURE;
                }
            },
        };

        let mut core = BlankCore::new();
        let mut session = match CartridgeSession::open(&rom_path, &mut core, &settings.save_dir) {
            Ok(session) => session,
            Err(e) => {
                log::error!("{}", e);
                continue;
            }
        };
        core.set_rtc(local_rtc());

        let mut window = match GameWindow::open(&settings, &core.rom_name(), audio.as_ref()) {
            Ok(window) => window,
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                return ExitCode::FAILURE;
            }
        };

        let report = session.run(
            &mut core,
            &mut window,
            &mut SystemClock::new(),
            &mut screenshots,
            &options,
        );
        match report.outcome {
            SessionOutcome::ReturnToBrowser => continue,
            SessionOutcome::Quit => break,
            SessionOutcome::Aborted => return ExitCode::FAILURE,
        }
    }

    ExitCode::SUCCESS
}
