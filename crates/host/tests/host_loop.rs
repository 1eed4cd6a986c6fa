use std::collections::VecDeque;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

use emu_core::cartridge::header_checksum;
use emu_core::{
    CartridgeError, CartridgeHeader, CoreError, CoreHost, EmulatorCore, ErrorAction, RtcTime,
    LCD_HEIGHT, LCD_WIDTH,
};
use emu_host::screenshot::ScreenshotWriter;
use emu_host::{
    Button, CartridgeSession, Frontend, InputEvent, RunOptions, SessionError, SessionOutcome,
    VirtualClock,
};

const MBC1_RAM_BATTERY: u8 = 0x03;
const RAM_8K: u8 = 0x02;
/// BG palette row, colour 1
const PIXEL: u8 = 0x21;

fn test_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("emu_host_loop_{}", name));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn make_rom(title: &str) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    rom[0x134..0x134 + title.len()].copy_from_slice(title.as_bytes());
    rom[0x147] = MBC1_RAM_BATTERY;
    rom[0x149] = RAM_8K;
    rom[0x14D] = header_checksum(&rom);
    rom
}

/// Writes the frame number to cartridge RAM byte 0 and fills the LCD with
/// one pixel value.
#[derive(Default)]
struct ScriptedCore {
    header: Option<CartridgeHeader>,
    frames: u64,
    rtc_ticks: u32,
    fail_at: Option<u64>,
}

impl EmulatorCore for ScriptedCore {
    fn init(&mut self, host: &mut dyn CoreHost) -> Result<CartridgeHeader, CartridgeError> {
        let header = CartridgeHeader::read_from(host)?;
        self.header = Some(header.clone());
        Ok(header)
    }

    fn run_frame(&mut self, host: &mut dyn CoreHost) -> ErrorAction {
        self.frames += 1;
        host.cart_ram_write(0, self.frames as u8);

        if self.fail_at == Some(self.frames) {
            // Non-fatal errors never reach the operator
            assert_eq!(host.error(CoreError::InvalidWrite(0xFEA0)), ErrorAction::Continue);
            let action = host.error(CoreError::InvalidOpcode {
                opcode: 0xDD,
                pc: 0x0150,
                sp: 0xFFFE,
            });
            if action == ErrorAction::Halt {
                return ErrorAction::Halt;
            }
        }

        let line = [PIXEL; LCD_WIDTH];
        for y in 0..LCD_HEIGHT {
            host.draw_line(&line, y);
        }
        ErrorAction::Continue
    }

    fn tick_rtc(&mut self) {
        self.rtc_ticks += 1;
    }

    fn set_rtc(&mut self, _time: RtcTime) {}

    fn set_joypad(&mut self, _buttons: u8) {}

    fn set_frame_skip(&mut self, _enabled: bool) {}

    fn save_size(&self) -> usize {
        self.header.as_ref().map_or(0, |h| h.save_size())
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

/// Hands out one batch of input events per loop iteration
#[derive(Default)]
struct ScriptedFrontend {
    batches: VecDeque<Vec<InputEvent>>,
    pending: VecDeque<InputEvent>,
    draining: bool,
    presented: Vec<(u16, Option<String>)>,
    pauses: usize,
    resumes: usize,
    continue_on_error: bool,
    prompts: usize,
}

impl ScriptedFrontend {
    fn with_inputs(batches: Vec<Vec<InputEvent>>) -> Self {
        Self {
            batches: batches.into(),
            ..Self::default()
        }
    }
}

impl Frontend for ScriptedFrontend {
    fn poll_event(&mut self) -> Option<InputEvent> {
        if !self.draining {
            self.draining = true;
            self.pending = self.batches.pop_front().unwrap_or_default().into();
        }
        let event = self.pending.pop_front();
        if event.is_none() {
            self.draining = false;
        }
        event
    }

    fn present(
        &mut self,
        framebuffer: &[u16],
        overlay: Option<&str>,
    ) -> Result<(), Box<dyn Error>> {
        self.presented
            .push((framebuffer[0], overlay.map(str::to_string)));
        Ok(())
    }

    fn pause_audio(&mut self) {
        self.pauses += 1;
    }

    fn resume_audio(&mut self) {
        self.resumes += 1;
    }

    fn confirm_continue(&mut self, _err: &CoreError) -> bool {
        self.prompts += 1;
        self.continue_on_error
    }
}

struct Fixture {
    dir: PathBuf,
    core: ScriptedCore,
    session: CartridgeSession,
    options: RunOptions,
    screenshots: ScreenshotWriter,
}

impl Fixture {
    fn new(name: &str, title: &str) -> Self {
        let dir = test_dir(name);
        let rom_path = dir.join("game.gb");
        fs::write(&rom_path, make_rom(title)).unwrap();

        let mut core = ScriptedCore::default();
        let session = CartridgeSession::open(&rom_path, &mut core, &dir.join("saves")).unwrap();
        let options = RunOptions {
            save_interval_ms: 10_000,
            recovery_save_path: dir.join("recovery.sav"),
            frame_skip: false,
            speed: 1,
            max_frames: None,
        };
        let screenshots = ScreenshotWriter::new(dir.join("shots"));
        Self {
            dir,
            core,
            session,
            options,
            screenshots,
        }
    }

    fn run(&mut self, frontend: &mut ScriptedFrontend) -> emu_host::SessionReport {
        let mut clock = VirtualClock::new();
        self.session.run(
            &mut self.core,
            frontend,
            &mut clock,
            &mut self.screenshots,
            &self.options,
        )
    }

    fn saved(&self) -> Option<Vec<u8>> {
        fs::read(self.session.save_path()).ok()
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

#[test]
fn test_open_sizes_cart_ram_from_core() {
    let fixture = Fixture::new("open", "TEST");
    assert_eq!(fixture.session.cart_ram().len(), 0x2000);
    assert_eq!(fixture.session.cart_ram().len(), fixture.core.save_size());
    assert!(fixture.session.cart_ram().iter().all(|&b| b == 0xFF));
    assert_eq!(
        fixture.session.save_path().file_name().unwrap(),
        format!("TEST_{:02x}.sav", fixture.session.header().header_checksum).as_str()
    );
}

#[test]
fn test_open_loads_existing_save() {
    let dir = test_dir("existing");
    let rom = make_rom("POKEMON");
    let checksum = rom[0x14D];
    let save_dir = dir.join("saves");
    fs::create_dir_all(&save_dir).unwrap();
    fs::write(save_dir.join(format!("POKEMON_{:02x}.sav", checksum)), [0xAA; 0x2000]).unwrap();

    let mut core = ScriptedCore::default();
    let session =
        CartridgeSession::from_rom("pokemon.gb".to_string(), rom, &mut core, &save_dir).unwrap();
    assert!(session.cart_ram().iter().all(|&b| b == 0xAA));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_open_errors() {
    let dir = test_dir("open_errors");
    let mut core = ScriptedCore::default();

    let missing = CartridgeSession::open(&dir.join("missing.gb"), &mut core, &dir);
    assert!(matches!(missing, Err(SessionError::ReadRom { .. })));

    let mut rom = make_rom("BROKEN");
    rom[0x14D] ^= 0xFF;
    let corrupt = dir.join("corrupt.gb");
    fs::write(&corrupt, rom).unwrap();
    assert!(matches!(
        CartridgeSession::open(&corrupt, &mut core, &dir),
        Err(SessionError::Cartridge {
            source: CartridgeError::InvalidChecksum { .. },
            ..
        })
    ));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_open_rejects_rom_shorter_than_header() {
    let dir = test_dir("too_small");
    let mut core = ScriptedCore::default();

    // Valid checksum, but the header runs past the end of the file
    let mut rom = make_rom("TINY");
    rom.truncate(0x14E);
    let tiny = CartridgeSession::from_rom("tiny.gb".to_string(), rom, &mut core, &dir);
    assert!(matches!(tiny, Err(CartridgeError::TooSmall(0x14E))));

    let empty = CartridgeSession::from_rom("empty.gb".to_string(), Vec::new(), &mut core, &dir);
    assert!(matches!(empty, Err(CartridgeError::TooSmall(0))));

    let short_file = dir.join("short.gb");
    fs::write(&short_file, [0u8; 0x100]).unwrap();
    assert!(matches!(
        CartridgeSession::open(&short_file, &mut core, &dir),
        Err(SessionError::Cartridge {
            source: CartridgeError::TooSmall(0x100),
            ..
        })
    ));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_failed_saves_keep_running_and_retry() {
    let mut fixture = Fixture::new("save_blocked", "TEST");
    // A directory where the save file belongs makes every write fail
    fs::create_dir_all(fixture.session.save_path()).unwrap();
    fixture.options.max_frames = Some(1300);
    let mut frontend = ScriptedFrontend::default();

    let report = fixture.run(&mut frontend);
    assert_eq!(report.outcome, SessionOutcome::Quit);
    assert_eq!(report.frames, 1300);

    // ~21.8 s of play: periodic attempts after 10 s and 20 s, then the
    // shutdown flush
    assert_eq!(frontend.pauses, 3);
    assert_eq!(frontend.resumes, 3);
    assert!(fixture.session.save_path().is_dir());

    // The buffer survives the failures and lands once the path is writable
    assert_eq!(fixture.session.cart_ram()[0], 1300u64 as u8);
    fs::remove_dir(fixture.session.save_path()).unwrap();
    fixture.session.flush(&mut frontend);
    assert_eq!(fixture.saved().unwrap()[0], 1300u64 as u8);
}

#[test]
fn test_periodic_and_shutdown_saves() {
    let mut fixture = Fixture::new("cadence", "TEST");
    fixture.options.max_frames = Some(1000);
    let mut frontend = ScriptedFrontend::default();

    let report = fixture.run(&mut frontend);
    assert_eq!(report.outcome, SessionOutcome::Quit);
    assert_eq!(report.frames, 1000);

    // ~16.7 s of play: one periodic save after 10 s plus the shutdown flush,
    // each with audio held off
    assert_eq!(frontend.pauses, 2);
    assert_eq!(frontend.resumes, 2);
    let saved = fixture.saved().unwrap();
    assert_eq!(saved.len(), 0x2000);
    assert_eq!(saved[0], 1000u64 as u8);
}

#[test]
fn test_quit_flushes_once() {
    let mut fixture = Fixture::new("quit", "TEST");
    let mut frontend = ScriptedFrontend::with_inputs(vec![vec![], vec![], vec![InputEvent::Quit]]);

    let report = fixture.run(&mut frontend);
    assert_eq!(report.outcome, SessionOutcome::Quit);
    assert_eq!(report.frames, 2);
    assert_eq!(frontend.pauses, 1);
    assert_eq!(fixture.saved().unwrap()[0], 2);
}

#[test]
fn test_select_start_returns_to_browser() {
    let mut fixture = Fixture::new("browser", "TEST");
    let mut frontend = ScriptedFrontend::with_inputs(vec![
        vec![],
        vec![
            InputEvent::Pressed(Button::Select),
            InputEvent::Pressed(Button::Start),
        ],
    ]);

    let report = fixture.run(&mut frontend);
    assert_eq!(report.outcome, SessionOutcome::ReturnToBrowser);
    assert_eq!(report.frames, 1);
    assert_eq!(fixture.saved().unwrap()[0], 1);
}

#[test]
fn test_fatal_error_declined_writes_recovery() {
    let mut fixture = Fixture::new("recovery", "TEST");
    fixture.core.fail_at = Some(5);
    let mut frontend = ScriptedFrontend::default();

    let report = fixture.run(&mut frontend);
    assert_eq!(report.outcome, SessionOutcome::Aborted);
    assert_eq!(report.frames, 5);
    assert_eq!(frontend.prompts, 1);

    let recovery = fs::read(fixture.dir.join("recovery.sav")).unwrap();
    assert_eq!(recovery.len(), 0x2000);
    assert_eq!(recovery[0], 5);
    // The recovery write replaces the shutdown flush
    assert_eq!(frontend.pauses, 1);
    assert!(fixture.saved().is_none());
}

#[test]
fn test_fatal_error_accepted_keeps_running() {
    let mut fixture = Fixture::new("continue", "TEST");
    fixture.core.fail_at = Some(3);
    fixture.options.max_frames = Some(10);
    let mut frontend = ScriptedFrontend {
        continue_on_error: true,
        ..ScriptedFrontend::default()
    };

    let report = fixture.run(&mut frontend);
    assert_eq!(report.outcome, SessionOutcome::Quit);
    assert_eq!(report.frames, 10);
    assert_eq!(frontend.prompts, 1);
    assert!(!fixture.dir.join("recovery.sav").exists());
    assert_eq!(fixture.saved().unwrap()[0], 10);
}

#[test]
fn test_palette_controls() {
    // "TEST" has no palette of its own and starts in greyscale
    let mut fixture = Fixture::new("palette", "TEST");
    fixture.options.max_frames = Some(3);
    let mut frontend = ScriptedFrontend::with_inputs(vec![
        vec![],
        vec![
            InputEvent::Pressed(Button::Select),
            InputEvent::Pressed(Button::Down),
        ],
        vec![InputEvent::Pressed(Button::Left)],
    ]);

    fixture.run(&mut frontend);
    let presented = &frontend.presented;
    assert_eq!(presented.len(), 3);
    assert_eq!(presented[0], (0x5294, Some("STARTING game.gb".to_string())));
    assert_eq!(presented[1], (0x7EAC, Some("PALETTE 2".to_string())));
    assert_eq!(
        presented[2],
        (0x5294, Some("ASSIGN AUTO PALETTE".to_string()))
    );
    assert_eq!(fixture.session.palette().preset(), 2);
}

#[test]
fn test_speed_up_skips_presentation() {
    let mut fixture = Fixture::new("speed", "TEST");
    fixture.options.max_frames = Some(30);
    let mut frontend = ScriptedFrontend::with_inputs(vec![
        vec![InputEvent::Pressed(Button::R)],
        vec![InputEvent::Pressed(Button::R)],
    ]);

    let report = fixture.run(&mut frontend);
    assert_eq!(report.frames, 30);
    // Frame 1 at speed 2, then one in three from frame 3 on
    assert_eq!(report.presented, 11);
    assert_eq!(frontend.presented[1].1.as_deref(), Some("SPEED 3"));
}

#[test]
fn test_rtc_ticks_every_second_of_play() {
    let mut fixture = Fixture::new("rtc", "TEST");
    fixture.options.max_frames = Some(180);
    let mut frontend = ScriptedFrontend::default();

    fixture.run(&mut frontend);
    assert_eq!(fixture.core.rtc_ticks, 3);
}

#[test]
fn test_screenshot_on_select_y() {
    let mut fixture = Fixture::new("screenshot", "TEST");
    fixture.options.max_frames = Some(2);
    let mut frontend = ScriptedFrontend::with_inputs(vec![vec![
        InputEvent::Pressed(Button::Select),
        InputEvent::Pressed(Button::Y),
    ]]);

    fixture.run(&mut frontend);
    let shot = fixture.dir.join("shots").join("TEST_0000000000.bmp");
    let data = fs::read(shot).unwrap();
    assert_eq!(data.len(), 54 + LCD_WIDTH * LCD_HEIGHT * 2);
    assert_eq!(&data[54..56], &0x5294u16.to_le_bytes());
    assert_eq!(
        frontend.presented[1].1.as_deref(),
        Some("SAVING SCREENSHOT...")
    );
}
