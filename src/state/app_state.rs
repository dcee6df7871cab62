use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::selection;
use crate::decoder::DecodedImage;
use crate::paths::display_name;

/// Allowed zoom step percentages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum ZoomStep {
    #[default]
    Four,
    Ten,
    Twenty,
    Fifty,
}

impl ZoomStep {
    pub const ALL: [ZoomStep; 4] = [ZoomStep::Four, ZoomStep::Ten, ZoomStep::Twenty, ZoomStep::Fifty];

    /// Map any percentage onto the allowed set; unknown values become 4
    pub fn from_percent(percent: i64) -> Self {
        match percent {
            10 => ZoomStep::Ten,
            20 => ZoomStep::Twenty,
            50 => ZoomStep::Fifty,
            _ => ZoomStep::Four,
        }
    }

    pub fn percent(self) -> u32 {
        match self {
            ZoomStep::Four => 4,
            ZoomStep::Ten => 10,
            ZoomStep::Twenty => 20,
            ZoomStep::Fifty => 50,
        }
    }

    /// The next step in the set, wrapping to the smallest
    pub fn cycle(self) -> Self {
        match self {
            ZoomStep::Four => ZoomStep::Ten,
            ZoomStep::Ten => ZoomStep::Twenty,
            ZoomStep::Twenty => ZoomStep::Fifty,
            ZoomStep::Fifty => ZoomStep::Four,
        }
    }
}

impl From<u32> for ZoomStep {
    fn from(percent: u32) -> Self {
        Self::from_percent(i64::from(percent))
    }
}

impl From<ZoomStep> for u32 {
    fn from(step: ZoomStep) -> Self {
        step.percent()
    }
}

/// Window geometry reported by the presentation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub top: f64,
}

impl WindowBounds {
    pub const MIN_SIZE: f64 = 200.0;

    /// Replace non-finite values with defaults and clamp into sane ranges
    pub fn validated(self) -> Self {
        let defaults = Self::default();
        let finite_or = |value: f64, fallback: f64| if value.is_finite() { value } else { fallback };
        Self {
            width: finite_or(self.width, defaults.width).max(Self::MIN_SIZE),
            height: finite_or(self.height, defaults.height).max(Self::MIN_SIZE),
            left: finite_or(self.left, defaults.left).max(0.0),
            top: finite_or(self.top, defaults.top).max(0.0),
        }
    }
}

impl Default for WindowBounds {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 450.0,
            left: 100.0,
            top: 100.0,
        }
    }
}

/// Image load progress of a tab
#[derive(Clone)]
pub enum LoadStatus {
    Loading,
    Loaded(Arc<DecodedImage>),
    Failed(String),
}

impl LoadStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadStatus::Loading)
    }

    pub fn image(&self) -> Option<&Arc<DecodedImage>> {
        match self {
            LoadStatus::Loaded(image) => Some(image),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadStatus::Failed(message) => Some(message),
            _ => None,
        }
    }
}

// Bitmaps compare by identity; two decodes of the same file are different values
impl PartialEq for LoadStatus {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LoadStatus::Loading, LoadStatus::Loading) => true,
            (LoadStatus::Loaded(a), LoadStatus::Loaded(b)) => Arc::ptr_eq(a, b),
            (LoadStatus::Failed(a), LoadStatus::Failed(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::Loading => f.write_str("Loading"),
            LoadStatus::Loaded(image) => write!(f, "Loaded({}x{})", image.width, image.height),
            LoadStatus::Failed(message) => f.debug_tuple("Failed").field(message).finish(),
        }
    }
}

/// One open tab. Never mutated; a status change replaces the record.
#[derive(Debug, Clone, PartialEq)]
pub struct TabRecord {
    path: PathBuf,
    file_name: String,
    status: LoadStatus,
}

impl TabRecord {
    /// Create a record for an already normalized path
    pub fn new(path: PathBuf) -> Self {
        let file_name = display_name(&path);
        Self {
            path,
            file_name,
            status: LoadStatus::Loading,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    /// A copy of this record with a different load status
    pub fn with_status(&self, status: LoadStatus) -> Self {
        Self {
            path: self.path.clone(),
            file_name: self.file_name.clone(),
            status,
        }
    }
}

/// Immutable application state snapshot
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    tabs: Arc<Vec<TabRecord>>,
    selected: Option<usize>,
    pub window: WindowBounds,
    pub maximized: bool,
    pub zoom_step: ZoomStep,
}

impl AppState {
    pub fn tabs(&self) -> &[TabRecord] {
        &self.tabs
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_tab(&self) -> Option<&TabRecord> {
        self.selected.and_then(|i| self.tabs.get(i))
    }

    pub fn selected_path(&self) -> Option<&Path> {
        self.selected_tab().map(TabRecord::path)
    }

    pub fn index_of(&self, path: &Path) -> Option<usize> {
        self.tabs.iter().position(|t| t.path == path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.index_of(path).is_some()
    }

    /// Whether two snapshots share the same tab list allocation
    pub fn shares_tabs_with(&self, other: &AppState) -> bool {
        Arc::ptr_eq(&self.tabs, &other.tabs)
    }

    /// Append `tab` unless its path is already open. Existing tabs are only
    /// selected when `select` is set.
    pub fn with_tab(&self, tab: TabRecord, select: bool) -> Self {
        if let Some(existing) = self.index_of(&tab.path) {
            return if select {
                self.with_selection(existing)
            } else {
                self.clone()
            };
        }

        let mut next = self.clone();
        Arc::make_mut(&mut next.tabs).push(tab);
        if select {
            next.selected = Some(next.tabs.len() - 1);
        }
        next
    }

    /// Replace the record with the same path, if it is still open
    pub fn with_tab_replaced(&self, tab: TabRecord) -> Self {
        let Some(index) = self.index_of(&tab.path) else {
            return self.clone();
        };
        if self.tabs[index] == tab {
            return self.clone();
        }
        let mut next = self.clone();
        Arc::make_mut(&mut next.tabs)[index] = tab;
        next
    }

    pub fn with_selection(&self, index: usize) -> Self {
        if index >= self.tabs.len() || self.selected == Some(index) {
            return self.clone();
        }
        Self {
            selected: Some(index),
            ..self.clone()
        }
    }

    /// Move the selection by `offset`, wrapping around the list
    pub fn with_relative_selection(&self, offset: isize) -> Self {
        match selection::relative(self.selected, self.tabs.len(), offset) {
            Some(index) => self.with_selection(index),
            None => self.clone(),
        }
    }

    pub fn with_tab_removed(&self, index: usize) -> Self {
        if index >= self.tabs.len() {
            return self.clone();
        }
        let mut tabs = (*self.tabs).clone();
        tabs.remove(index);
        self.with_tabs(tabs)
    }

    pub fn with_tab_moved(&self, from: usize, to: usize) -> Self {
        let count = self.tabs.len();
        if from >= count {
            return self.clone();
        }
        let destination = to.min(count - 1);
        if from == destination {
            return self.clone();
        }
        let mut tabs = (*self.tabs).clone();
        let tab = tabs.remove(from);
        tabs.insert(destination, tab);
        self.with_tabs(tabs)
    }

    /// Keep tabs `0..=index`. No-op unless something lies to the right.
    pub fn with_tabs_closed_to_right(&self, index: usize) -> Self {
        if index + 1 >= self.tabs.len() {
            return self.clone();
        }
        let tabs = self.tabs[..=index].to_vec();
        self.with_tabs(tabs)
    }

    pub fn with_only_tab(&self, index: usize) -> Self {
        let Some(tab) = self.tabs.get(index) else {
            return self.clone();
        };
        if self.tabs.len() == 1 && self.selected == Some(0) {
            return self.clone();
        }
        Self {
            tabs: Arc::new(vec![tab.clone()]),
            selected: Some(0),
            ..self.clone()
        }
    }

    pub fn with_zoom_step(&self, zoom_step: ZoomStep) -> Self {
        Self {
            zoom_step,
            ..self.clone()
        }
    }

    pub fn with_window(&self, window: WindowBounds, maximized: bool) -> Self {
        Self {
            window: window.validated(),
            maximized,
            ..self.clone()
        }
    }

    // Swap in a new ordering and let the selection follow the same tab
    fn with_tabs(&self, tabs: Vec<TabRecord>) -> Self {
        let selected = selection::reselect(&self.tabs, &tabs, self.selected);
        Self {
            tabs: Arc::new(tabs),
            selected,
            ..self.clone()
        }
    }
}
