//! Host runtime for a Game Boy emulation core: frame pacing, cartridge RAM
//! persistence, palette selection, the file browser and the session loop
//! that ties them together. Windowing and audio live in the frontends.

pub mod browser;
pub mod clock;
pub mod frontend;
pub mod palette;
pub mod persistence;
pub mod scheduler;
pub mod screenshot;
pub mod session;
pub mod settings;

pub use browser::{Browser, BrowserError, BrowserSurface, FsLister};
pub use clock::{Clock, SystemClock, VirtualClock};
pub use frontend::{Button, Frontend, InputEvent};
pub use session::{CartridgeSession, RunOptions, SessionError, SessionOutcome, SessionReport};
pub use settings::Settings;
