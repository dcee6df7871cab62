use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::state::{AppState, WindowBounds, ZoomStep};

/// Persisted window geometry, open tabs and zoom step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionRecord {
    pub version: u32,
    pub window_width: f64,
    pub window_height: f64,
    pub window_left: f64,
    pub window_top: f64,
    pub is_maximized: bool,
    pub open_tabs: Vec<PathBuf>,
    pub active_tab_index: i64,
    pub zoom_step_percent: i64,
}

impl SessionRecord {
    pub const CURRENT_VERSION: u32 = 2;

    /// Snapshot of `state`; no selection is saved as index 0
    pub fn from_state(state: &AppState) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            window_width: state.window.width,
            window_height: state.window.height,
            window_left: state.window.left,
            window_top: state.window.top,
            is_maximized: state.maximized,
            open_tabs: state.tabs().iter().map(|t| t.path().to_path_buf()).collect(),
            active_tab_index: state.selected_index().map_or(0, |i| i as i64),
            zoom_step_percent: i64::from(state.zoom_step.percent()),
        }
    }

    pub fn window(&self) -> WindowBounds {
        WindowBounds {
            width: self.window_width,
            height: self.window_height,
            left: self.window_left,
            top: self.window_top,
        }
    }

    pub fn zoom_step(&self) -> ZoomStep {
        ZoomStep::from_percent(self.zoom_step_percent)
    }

    /// Active index if it points at one of the open tabs
    pub fn active_index(&self) -> Option<usize> {
        usize::try_from(self.active_tab_index)
            .ok()
            .filter(|&i| i < self.open_tabs.len())
    }

    /// Drop tabs that no longer exist and pull every field into range
    pub fn normalized(mut self) -> Self {
        self.open_tabs.retain(|path| path.is_file());
        self.zoom_step_percent = i64::from(self.zoom_step().percent());
        let last = self.open_tabs.len().saturating_sub(1) as i64;
        self.active_tab_index = self.active_tab_index.clamp(0, last);
        let window = self.window().validated();
        self.window_width = window.width;
        self.window_height = window.height;
        self.window_left = window.left;
        self.window_top = window.top;
        self
    }
}

impl Default for SessionRecord {
    fn default() -> Self {
        let window = WindowBounds::default();
        Self {
            version: Self::CURRENT_VERSION,
            window_width: window.width,
            window_height: window.height,
            window_left: window.left,
            window_top: window.top,
            is_maximized: false,
            open_tabs: Vec::new(),
            active_tab_index: 0,
            zoom_step_percent: i64::from(ZoomStep::default().percent()),
        }
    }
}

/// Session persistence capability
pub trait SessionStore: Send + Sync {
    /// Load the saved session. Implementations return a default record when
    /// nothing was saved.
    fn load(&self) -> Result<SessionRecord, SessionError>;
    fn save(&self, record: &SessionRecord) -> Result<(), SessionError>;
    fn exists(&self) -> bool;
    fn clear(&self) -> Result<(), SessionError>;
}

/// JSON session file
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<SessionRecord, SessionError> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SessionRecord::default()),
            Err(e) => return Err(e.into()),
        };

        // Invalid UTF-8 surfaces as a parse error like any other garbage
        match serde_json::from_slice::<SessionRecord>(&content) {
            Ok(record) => Ok(record.normalized()),
            Err(source) => {
                // A corrupt file starts a fresh session instead of failing startup
                let err = SessionError::Corrupt {
                    path: self.path.clone(),
                    source,
                };
                log::warn!("{err}; starting with a default session");
                Ok(SessionRecord::default())
            }
        }
    }

    fn save(&self, record: &SessionRecord) -> Result<(), SessionError> {
        let mut record = record.clone();
        record.zoom_step_percent = i64::from(record.zoom_step().percent());
        record.version = SessionRecord::CURRENT_VERSION;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&record).map_err(SessionError::Encode)?;

        // Write next to the target and rename so readers never see a partial file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        log::debug!("session saved to {:?} ({} tabs)", self.path, record.open_tabs.len());
        Ok(())
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
