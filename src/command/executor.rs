use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{Command, CommandOutcome, CommandSource};
use crate::decoder::ImageDecoder;
use crate::error::CommandError;
use crate::paths::normalize_path;
use crate::session::{SessionRecord, SessionStore};
use crate::state::{LoadStatus, StateStore, TabRecord, ZoomStep};

/// Callback asking the presentation to bring its window forward
pub type WindowActivator = Arc<dyn Fn() + Send + Sync>;

/// Carries out commands against the store and the collaborators.
///
/// Reducers passed to the store are pure; decoding and session I/O happen
/// here, between reducer calls.
pub struct CommandExecutor {
    store: StateStore,
    decoder: Arc<dyn ImageDecoder>,
    sessions: Arc<dyn SessionStore>,
    activator: Option<WindowActivator>,
    decode_max_width: Option<u32>,
}

impl CommandExecutor {
    pub fn new(
        store: StateStore,
        decoder: Arc<dyn ImageDecoder>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            store,
            decoder,
            sessions,
            activator: None,
            decode_max_width: None,
        }
    }

    pub fn with_activator(mut self, activator: WindowActivator) -> Self {
        self.activator = Some(activator);
        self
    }

    pub fn with_decode_max_width(mut self, max_width: Option<u32>) -> Self {
        self.decode_max_width = max_width;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run one command to completion
    pub async fn execute(
        &self,
        command: Command,
        cancel: &CancellationToken,
    ) -> Result<CommandOutcome, CommandError> {
        match command {
            Command::OpenFiles { paths, source } => Ok(self.open_files(paths, source, cancel).await),
            Command::SelectTab(index) => {
                self.store.apply(|s| s.with_selection(index));
                Ok(CommandOutcome::Completed)
            }
            Command::SelectTabByPath(path) => {
                self.store.apply(|s| match s.index_of(&path) {
                    Some(index) => s.with_selection(index),
                    None => s.clone(),
                });
                Ok(CommandOutcome::Completed)
            }
            Command::SelectRelative(offset) => {
                self.store.apply(|s| s.with_relative_selection(offset));
                Ok(CommandOutcome::Completed)
            }
            Command::MoveTab { from, to } => {
                self.store.apply(|s| s.with_tab_moved(from, to));
                Ok(CommandOutcome::Completed)
            }
            Command::CloseTab(index) => {
                self.store.apply(|s| s.with_tab_removed(index));
                Ok(CommandOutcome::Completed)
            }
            Command::CloseTabsToRight(index) => {
                self.store.apply(|s| s.with_tabs_closed_to_right(index));
                Ok(CommandOutcome::Completed)
            }
            Command::CloseOtherTabs(index) => {
                self.store.apply(|s| s.with_only_tab(index));
                Ok(CommandOutcome::Completed)
            }
            Command::SetZoomStep(percent) => {
                let step = ZoomStep::from(percent);
                self.store.apply(|s| s.with_zoom_step(step));
                Ok(CommandOutcome::Completed)
            }
            Command::UpdateWindow { bounds, maximized } => {
                self.store.apply(|s| s.with_window(bounds, maximized));
                Ok(CommandOutcome::Completed)
            }
            Command::RestoreSession => self.restore_session(cancel).await,
            Command::SaveSession => self.save_session().await,
            Command::ActivateWindow => {
                if let Some(activate) = &self.activator {
                    activate();
                }
                Ok(CommandOutcome::Completed)
            }
        }
    }

    async fn open_files(
        &self,
        paths: Vec<PathBuf>,
        source: CommandSource,
        cancel: &CancellationToken,
    ) -> CommandOutcome {
        let restoring = source == CommandSource::SessionRestore;
        let mut last_opened: Option<PathBuf> = None;

        for raw in paths {
            if cancel.is_cancelled() {
                return CommandOutcome::Cancelled;
            }

            let path = normalize_path(&raw);
            if !path.is_file() {
                log::info!("skipping missing file {}", path.display());
                continue;
            }
            if !self.decoder.is_supported_format(&path) {
                log::info!("skipping unsupported file {}", path.display());
                continue;
            }
            if self.store.state().contains(&path) {
                log::debug!("already open: {}", path.display());
                last_opened = Some(path);
                continue;
            }

            let tab = TabRecord::new(path.clone());
            self.store.apply_with(restoring, move |s| s.with_tab(tab, false));
            last_opened = Some(path.clone());

            // One decode at a time; the next file waits for this one
            if self.load_image(&path, restoring, cancel).await == CommandOutcome::Cancelled {
                return CommandOutcome::Cancelled;
            }
        }

        if !restoring {
            if let Some(path) = last_opened {
                self.store.apply(|s| match s.index_of(&path) {
                    Some(index) => s.with_selection(index),
                    None => s.clone(),
                });
            }
        }
        CommandOutcome::Completed
    }

    async fn load_image(&self, path: &Path, restoring: bool, cancel: &CancellationToken) -> CommandOutcome {
        let decoder = Arc::clone(&self.decoder);
        let target = path.to_path_buf();
        let max_width = self.decode_max_width;
        let decode = tokio::task::spawn_blocking(move || decoder.decode(&target, max_width));

        // A cancelled decode keeps running on its worker; its result is dropped
        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return CommandOutcome::Cancelled,
            joined = decode => match joined {
                Ok(Ok(image)) => {
                    log::debug!("decoded {} ({}x{})", path.display(), image.width, image.height);
                    LoadStatus::Loaded(Arc::new(image))
                }
                Ok(Err(e)) => {
                    log::warn!("{e}");
                    LoadStatus::Failed(e.to_string())
                }
                Err(e) => {
                    log::error!("decoder task for {} failed: {e}", path.display());
                    LoadStatus::Failed(format!("decoder failed: {e}"))
                }
            },
        };

        self.store.apply_with(restoring, |s| match s.index_of(path) {
            Some(index) => s.with_tab_replaced(s.tabs()[index].with_status(status)),
            None => s.clone(),
        });
        CommandOutcome::Completed
    }

    async fn restore_session(&self, cancel: &CancellationToken) -> Result<CommandOutcome, CommandError> {
        let sessions = Arc::clone(&self.sessions);
        let record = tokio::task::spawn_blocking(move || sessions.load())
            .await
            .map_err(|e| CommandError::Task(e.to_string()))??;
        log::info!(
            "restoring session: {} tabs, active index {}",
            record.open_tabs.len(),
            record.active_tab_index
        );

        let window = record.window();
        let zoom_step = record.zoom_step();
        self.store.apply_with(true, |s| {
            s.with_window(window, record.is_maximized)
                .with_zoom_step(zoom_step)
        });

        if record.open_tabs.is_empty() {
            return Ok(CommandOutcome::Completed);
        }
        let outcome = self
            .open_files(record.open_tabs.clone(), CommandSource::SessionRestore, cancel)
            .await;
        if outcome == CommandOutcome::Cancelled {
            return Ok(outcome);
        }

        // Out-of-range indexes (e.g. files skipped while opening) are ignored
        if let Ok(active) = usize::try_from(record.active_tab_index) {
            self.store.apply_with(true, |s| s.with_selection(active));
        }
        Ok(CommandOutcome::Completed)
    }

    async fn save_session(&self) -> Result<CommandOutcome, CommandError> {
        let record = SessionRecord::from_state(&self.store.state());
        log::info!(
            "saving session: {} tabs, active index {}",
            record.open_tabs.len(),
            record.active_tab_index
        );
        let sessions = Arc::clone(&self.sessions);
        tokio::task::spawn_blocking(move || sessions.save(&record))
            .await
            .map_err(|e| CommandError::Task(e.to_string()))??;
        Ok(CommandOutcome::Completed)
    }
}
