//! pictab: a single-instance tabbed image viewer for the terminal.
//!
//! Every launch after the first forwards its file arguments to the running
//! instance. All tab state lives in a [`state::StateStore`] and is only
//! changed by commands drained one at a time from a
//! [`command::CommandQueue`].

pub mod app;
pub mod command;
pub mod config;
pub mod decoder;
pub mod error;
pub mod input;
pub mod instance;
pub mod paths;
pub mod session;
pub mod state;
pub mod theme;
pub mod ui;
