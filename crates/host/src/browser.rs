//! Paginated file picker
//!
//! The browser goes through three states: the directory is listed and sorted
//! once, the user browses page by page, and a confirm ends it with the name
//! of the entry under the cursor. Drawing and input are left to a
//! [`BrowserSurface`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default cap on the number of listed entries
pub const MAX_ITEMS: usize = 2048;

#[derive(thiserror::Error, Debug)]
pub enum BrowserError {
    #[error("cannot open directory {path}: {source}")]
    OpenDir { path: PathBuf, source: io::Error },
    #[error("no files to choose from in {0}")]
    Empty(PathBuf),
    #[error("browser closed without a selection")]
    Cancelled,
    #[error("browser surface failed: {0}")]
    Surface(String),
}

/// One raw directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// Directory listing query. Order of the returned entries is unspecified.
pub trait DirectoryLister {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntry>>;
}

/// Lists the real filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLister;

impl DirectoryLister for FsLister {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            // Non UTF-8 names cannot be shown with the bitmap font
            let Ok(name) = entry.file_name().into_string() else {
                log::debug!("Skipping non UTF-8 entry in {}", dir.display());
                continue;
            };
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            entries.push(DirEntry { name, is_dir });
        }
        Ok(entries)
    }
}

/// Navigation input understood by the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserInput {
    Up,
    Down,
    Left,
    Right,
    ShoulderLeft,
    ShoulderRight,
    Confirm,
}

/// Pixel geometry the page size is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub height: usize,
    /// Space taken by the header and footer
    pub reserved_height: usize,
    pub row_height: usize,
}

impl Viewport {
    /// Rows that fit on one page, keeping one row spare. Never zero.
    pub fn rows_per_page(&self) -> usize {
        if self.row_height == 0 {
            return 1;
        }
        let rows = self.height.saturating_sub(self.reserved_height) / self.row_height;
        rows.saturating_sub(1).max(1)
    }
}

/// What the surface needs to draw one page
#[derive(Debug, Clone, Copy)]
pub struct BrowserView<'a> {
    pub directory: &'a Path,
    /// Entries of the current page only
    pub entries: &'a [String],
    pub cursor: usize,
    pub page: usize,
    pub page_count: usize,
}

/// Presentation and input source for the browser
pub trait BrowserSurface {
    fn viewport(&self) -> Viewport;

    fn render(&mut self, view: &BrowserView<'_>) -> Result<(), BrowserError>;

    /// Pump events and return navigation input received since the last call.
    /// Returns `Cancelled` once the user closes the surface.
    fn poll_input(&mut self) -> Result<Vec<BrowserInput>, BrowserError>;
}

/// Result of applying one input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    CursorMoved,
    PageChanged,
    Selected,
}

/// Page and cursor position over a sorted entry set
#[derive(Debug, Clone)]
pub struct BrowserState {
    entries: Vec<String>,
    rows_per_page: usize,
    max_page: usize,
    page: usize,
    cursor: usize,
    selected: bool,
}

impl BrowserState {
    /// `entries` must already be sorted. Returns `None` for an empty set.
    pub fn new(entries: Vec<String>, rows_per_page: usize) -> Option<Self> {
        if entries.is_empty() {
            return None;
        }
        let rows_per_page = rows_per_page.max(1);
        let max_page = (entries.len() - 1) / rows_per_page;
        Some(Self {
            entries,
            rows_per_page,
            max_page,
            page: 0,
            cursor: 0,
            selected: false,
        })
    }

    pub fn rows_per_page(&self) -> usize {
        self.rows_per_page
    }

    /// Highest valid page index
    pub fn max_page(&self) -> usize {
        self.max_page
    }

    pub fn page_count(&self) -> usize {
        self.max_page + 1
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Index of the entry under the cursor
    pub fn index(&self) -> usize {
        self.page * self.rows_per_page + self.cursor
    }

    /// Last occupied row of the current page
    fn last_row(&self) -> usize {
        let first = self.page * self.rows_per_page;
        (self.entries.len() - 1 - first).min(self.rows_per_page - 1)
    }

    pub fn page_entries(&self) -> &[String] {
        let first = self.page * self.rows_per_page;
        let end = (first + self.rows_per_page).min(self.entries.len());
        &self.entries[first..end]
    }

    pub fn selection(&self) -> Option<&str> {
        if self.selected {
            Some(&self.entries[self.index()])
        } else {
            None
        }
    }

    /// Shoulder step: a tenth of the highest page index, at least one page
    fn shoulder_step(&self) -> usize {
        (self.max_page / 10).max(1)
    }

    fn jump_pages(&mut self, forward: bool, step: usize) {
        let count = self.page_count();
        let step = step % count;
        self.page = if forward {
            (self.page + step) % count
        } else {
            (self.page + count - step) % count
        };
        self.cursor = 0;
    }

    /// Apply one input. Inputs after a selection are ignored.
    pub fn apply(&mut self, input: BrowserInput) -> Option<Transition> {
        if self.selected {
            return None;
        }
        let transition = match input {
            BrowserInput::Up => {
                self.cursor = if self.cursor == 0 {
                    self.last_row()
                } else {
                    self.cursor - 1
                };
                Transition::CursorMoved
            }
            BrowserInput::Down => {
                self.cursor = if self.cursor >= self.last_row() {
                    0
                } else {
                    self.cursor + 1
                };
                Transition::CursorMoved
            }
            BrowserInput::Left => {
                self.jump_pages(false, 1);
                Transition::PageChanged
            }
            BrowserInput::Right => {
                self.jump_pages(true, 1);
                Transition::PageChanged
            }
            BrowserInput::ShoulderLeft => {
                self.jump_pages(false, self.shoulder_step());
                Transition::PageChanged
            }
            BrowserInput::ShoulderRight => {
                self.jump_pages(true, self.shoulder_step());
                Transition::PageChanged
            }
            BrowserInput::Confirm => {
                self.selected = true;
                Transition::Selected
            }
        };
        Some(transition)
    }
}

/// Copy `name` into at most `capacity` bytes without splitting a character
pub fn truncate_name(name: &str, capacity: usize) -> String {
    if name.len() <= capacity {
        return name.to_string();
    }
    let mut end = capacity;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}

fn matches_extension(name: &str, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    let Some(ext) = Path::new(name).extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions.iter().any(|want| want.eq_ignore_ascii_case(ext))
}

/// Browser configuration for one directory
#[derive(Debug, Clone)]
pub struct Browser {
    pub directory: PathBuf,
    /// Accepted file extensions without the dot; empty accepts everything
    pub extensions: Vec<String>,
    pub max_items: usize,
    pub max_name_len: usize,
}

impl Browser {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            extensions: Vec::new(),
            max_items: MAX_ITEMS,
            max_name_len: 256,
        }
    }

    /// Collect and sort the entry set. Sorting is case-sensitive and happens
    /// once, after the whole listing is in.
    pub fn collect(&self, lister: &dyn DirectoryLister) -> Result<Vec<String>, BrowserError> {
        let listing = lister
            .list(&self.directory)
            .map_err(|source| BrowserError::OpenDir {
                path: self.directory.clone(),
                source,
            })?;

        let mut names: Vec<String> = listing
            .into_iter()
            .filter(|entry| !entry.is_dir)
            .filter(|entry| matches_extension(&entry.name, &self.extensions))
            .map(|entry| entry.name)
            .take(self.max_items)
            .collect();

        if names.is_empty() {
            return Err(BrowserError::Empty(self.directory.clone()));
        }

        names.sort();
        log::debug!(
            "Listed {} entries in {}",
            names.len(),
            self.directory.display()
        );
        Ok(names)
    }

    /// Run the picker until the user confirms an entry
    pub fn select(
        &self,
        lister: &dyn DirectoryLister,
        surface: &mut dyn BrowserSurface,
    ) -> Result<String, BrowserError> {
        let entries = self.collect(lister)?;
        let Some(mut state) = BrowserState::new(entries, surface.viewport().rows_per_page())
        else {
            return Err(BrowserError::Empty(self.directory.clone()));
        };
        log::info!(
            "Browsing {} ({} pages of {} rows)",
            self.directory.display(),
            state.page_count(),
            state.rows_per_page()
        );

        self.render(&state, surface)?;
        loop {
            let mut dirty = false;
            for input in surface.poll_input()? {
                match state.apply(input) {
                    Some(Transition::Selected) => {
                        let name = state.selection().unwrap_or_default();
                        let name = truncate_name(name, self.max_name_len);
                        log::info!("Selected {}", name);
                        return Ok(name);
                    }
                    Some(_) => dirty = true,
                    None => {}
                }
            }
            if dirty {
                self.render(&state, surface)?;
            }
        }
    }

    fn render(
        &self,
        state: &BrowserState,
        surface: &mut dyn BrowserSurface,
    ) -> Result<(), BrowserError> {
        surface.render(&BrowserView {
            directory: &self.directory,
            entries: state.page_entries(),
            cursor: state.cursor(),
            page: state.page(),
            page_count: state.page_count(),
        })
    }
}
