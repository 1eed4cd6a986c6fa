use std::error::Error;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use emu_core::blank::BlankCore;
use emu_core::{CoreError, EmulatorCore};
use emu_host::screenshot::ScreenshotWriter;
use emu_host::session::local_rtc;
use emu_host::{
    CartridgeSession, Clock, Frontend, InputEvent, RunOptions, SessionOutcome, SystemClock,
    VirtualClock,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OnError {
    Continue,
    Quit,
}

#[derive(Parser)]
struct Args {
    /// Path to a ROM file
    rom: PathBuf,

    /// Number of frames to run
    #[arg(long, default_value_t = 60)]
    frames: u64,

    /// Directory holding cartridge RAM save files
    #[arg(long, default_value = "saves")]
    save_dir: PathBuf,

    /// Write a screenshot of the last frame
    #[arg(long, default_value_t = false)]
    screenshot: bool,

    /// Directory for --screenshot output
    #[arg(long, default_value = "screenshots")]
    screenshot_dir: PathBuf,

    /// Run as fast as possible on simulated time instead of the wall clock
    #[arg(long, default_value_t = false)]
    unpaced: bool,

    /// What to do when the core reports a fatal error
    #[arg(long, value_enum, default_value_t = OnError::Quit)]
    on_error: OnError,

    /// Playback speed multiplier (1-8)
    #[arg(long, default_value_t = 1)]
    speed: u32,
}

/// Frontend without a window: no input, frames are dropped
struct Headless {
    on_error: OnError,
}

impl Frontend for Headless {
    fn poll_event(&mut self) -> Option<InputEvent> {
        None
    }

    fn present(&mut self, _framebuffer: &[u16], overlay: Option<&str>) -> Result<(), Box<dyn Error>> {
        if let Some(text) = overlay {
            log::trace!("Overlay: {}", text);
        }
        Ok(())
    }

    fn pause_audio(&mut self) {}

    fn resume_audio(&mut self) {}

    fn confirm_continue(&mut self, err: &CoreError) -> bool {
        log::warn!("Core error: {} ({:?})", err, self.on_error);
        self.on_error == OnError::Continue
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut core = BlankCore::new();
    let mut session = CartridgeSession::open(&args.rom, &mut core, &args.save_dir)
        .with_context(|| format!("failed to open {}", args.rom.display()))?;
    core.set_rtc(local_rtc());

    let options = RunOptions {
        save_interval_ms: 10_000,
        recovery_save_path: args.save_dir.join("recovery.sav"),
        frame_skip: false,
        speed: args.speed,
        max_frames: Some(args.frames),
    };
    let mut frontend = Headless {
        on_error: args.on_error,
    };
    let mut clock: Box<dyn Clock> = if args.unpaced {
        Box::new(VirtualClock::new())
    } else {
        Box::new(SystemClock::new())
    };
    let mut screenshots = ScreenshotWriter::new(&args.screenshot_dir);

    let report = session.run(
        &mut core,
        &mut frontend,
        clock.as_mut(),
        &mut screenshots,
        &options,
    );

    let screenshot = if args.screenshot {
        let path = screenshots
            .save(&session.header().title, session.framebuffer())
            .context("failed to write screenshot")?;
        Some(path.display().to_string())
    } else {
        None
    };

    let summary = serde_json::json!({
        "header": session.header(),
        "save_size": session.cart_ram().len(),
        "save_path": session.save_path().display().to_string(),
        "frames": report.frames,
        "presented": report.presented,
        "outcome": format!("{:?}", report.outcome),
        "screenshot": screenshot,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if report.outcome == SessionOutcome::Aborted {
        anyhow::bail!("emulation aborted after {} frames", report.frames);
    }
    Ok(())
}
