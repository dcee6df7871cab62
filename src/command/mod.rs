//! Commands and the serialized queue that executes them.
//!
//! Every mutation of [`AppState`](crate::state::AppState) is expressed as a
//! [`Command`] and executed by the single consumer of a [`CommandQueue`].

mod executor;
mod queue;
#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::path::PathBuf;

use crate::state::WindowBounds;

pub use executor::{CommandExecutor, WindowActivator};
pub use queue::{CommandQueue, CommandSender};

/// Where an `OpenFiles` request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSource {
    UserAction,
    ExternalRequest,
    SessionRestore,
    Programmatic,
}

/// One requested state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    OpenFiles {
        paths: Vec<PathBuf>,
        source: CommandSource,
    },
    SelectTab(usize),
    SelectTabByPath(PathBuf),
    SelectRelative(isize),
    MoveTab {
        from: usize,
        to: usize,
    },
    CloseTab(usize),
    CloseTabsToRight(usize),
    CloseOtherTabs(usize),
    SetZoomStep(u32),
    UpdateWindow {
        bounds: WindowBounds,
        maximized: bool,
    },
    RestoreSession,
    SaveSession,
    ActivateWindow,
}

impl Command {
    pub fn open_files(paths: impl IntoIterator<Item = impl Into<PathBuf>>, source: CommandSource) -> Self {
        Command::OpenFiles {
            paths: paths.into_iter().map(Into::into).collect(),
            source,
        }
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::OpenFiles { .. } => "OpenFiles",
            Command::SelectTab(_) => "SelectTab",
            Command::SelectTabByPath(_) => "SelectTabByPath",
            Command::SelectRelative(_) => "SelectRelative",
            Command::MoveTab { .. } => "MoveTab",
            Command::CloseTab(_) => "CloseTab",
            Command::CloseTabsToRight(_) => "CloseTabsToRight",
            Command::CloseOtherTabs(_) => "CloseOtherTabs",
            Command::SetZoomStep(_) => "SetZoomStep",
            Command::UpdateWindow { .. } => "UpdateWindow",
            Command::RestoreSession => "RestoreSession",
            Command::SaveSession => "SaveSession",
            Command::ActivateWindow => "ActivateWindow",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::OpenFiles { paths, source } => {
                write!(f, "OpenFiles({} paths, {source:?})", paths.len())
            }
            Command::SelectTab(i) => write!(f, "SelectTab({i})"),
            Command::SelectTabByPath(p) => write!(f, "SelectTabByPath({})", p.display()),
            Command::SelectRelative(o) => write!(f, "SelectRelative({o})"),
            Command::MoveTab { from, to } => write!(f, "MoveTab({from} -> {to})"),
            Command::CloseTab(i) => write!(f, "CloseTab({i})"),
            Command::CloseTabsToRight(i) => write!(f, "CloseTabsToRight({i})"),
            Command::CloseOtherTabs(i) => write!(f, "CloseOtherTabs({i})"),
            Command::SetZoomStep(p) => write!(f, "SetZoomStep({p})"),
            Command::UpdateWindow { bounds, maximized } => write!(
                f,
                "UpdateWindow({}x{} at {},{}, maximized={maximized})",
                bounds.width, bounds.height, bounds.left, bounds.top
            ),
            other => f.write_str(other.name()),
        }
    }
}

/// Terminal status of one executed command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Completed,
    /// The queue was cancelled while the command ran
    Cancelled,
}
