use crate::command::{Command, CommandSender};
use crate::input::{map_key_event, map_mouse_event, AppEvent, MouseAction};
use crate::state::{AppState, StateChangeEvent, StateStore, SubscriptionId};
use crate::theme::Theme;
use crate::ui;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::{execute, terminal::SetTitle};
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::time::{Duration, Instant};

/// How long a notice stays in the status bar
const NOTICE_DURATION: Duration = Duration::from_secs(3);

/// Messages marshaled from core threads onto the UI thread
#[derive(Debug)]
pub enum UiEvent {
    StateChanged {
        state: AppState,
        is_session_restore: bool,
    },
    /// Another launch asked for this window
    Activate,
}

/// Forward store notifications to the UI thread. The subscriber only sends;
/// all rendering happens in [`App::run`].
pub fn forward_state_changes(store: &StateStore, tx: Sender<UiEvent>) -> SubscriptionId {
    store.subscribe(move |event: &StateChangeEvent| {
        let _ = tx.send(UiEvent::StateChanged {
            state: event.next.clone(),
            is_session_restore: event.is_session_restore,
        });
    })
}

/// The terminal presentation
pub struct App {
    /// Whether the application should quit
    pub should_quit: bool,
    /// The color theme
    pub theme: Theme,
    /// Latest snapshot received from the store
    pub state: AppState,
    /// Whether the selected image is drawn
    pub show_preview: bool,
    /// Transient message shown in the status bar
    pub notice: Option<(String, Instant)>,
    /// Tab positions for click detection (start_x, end_x, tab_index)
    pub tab_positions: Vec<(u16, u16, usize)>,
    /// Row occupied by the tab bar
    pub tab_bar_row: u16,
    commands: CommandSender,
    events: Receiver<UiEvent>,
}

impl App {
    pub fn new(
        commands: CommandSender,
        events: Receiver<UiEvent>,
        state: AppState,
        show_preview: bool,
    ) -> Self {
        Self {
            should_quit: false,
            theme: Theme::dark(),
            state,
            show_preview,
            notice: None,
            tab_positions: Vec::new(),
            tab_bar_row: 0,
            commands,
            events,
        }
    }

    /// Main loop. Returns when the user quits or the core goes away.
    pub fn run(&mut self, terminal: &mut Terminal<impl Backend>) -> Result<()> {
        self.update_title();
        while !self.should_quit {
            self.drain_events();

            terminal.draw(|frame| ui::draw(frame, self))?;

            // Handle events with a small timeout for responsiveness
            if event::poll(Duration::from_millis(16))? {
                let event = event::read()?;
                self.handle_event(event);
            }
        }
        Ok(())
    }

    /// Current notice, if it has not expired
    pub fn active_notice(&self) -> Option<&str> {
        self.notice
            .as_ref()
            .filter(|(_, at)| at.elapsed() < NOTICE_DURATION)
            .map(|(text, _)| text.as_str())
    }

    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.apply_ui_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::warn!("state channel closed; leaving the UI");
                    self.should_quit = true;
                    break;
                }
            }
        }
    }

    fn apply_ui_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::StateChanged {
                state,
                is_session_restore,
            } => {
                let title_changed = state.selected_path() != self.state.selected_path();
                self.state = state;
                if is_session_restore {
                    self.set_notice("Session restored");
                }
                if title_changed {
                    self.update_title();
                }
            }
            UiEvent::Activate => {
                self.set_notice("Opened from another launch");
                self.update_title();
            }
        }
    }

    fn set_notice(&mut self, text: &str) {
        self.notice = Some((text.to_string(), Instant::now()));
    }

    fn update_title(&self) {
        let title = match self.state.selected_tab() {
            Some(tab) => format!("{} - pictab", tab.file_name()),
            None => "pictab".to_string(),
        };
        if let Err(e) = execute!(stdout(), SetTitle(title)) {
            log::debug!("could not set terminal title: {e}");
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if let Some(action) = map_key_event(key) {
                    self.handle_app_event(action);
                }
            }
            Event::Mouse(mouse) => {
                if let Some(action) = map_mouse_event(mouse) {
                    self.handle_mouse_action(action);
                }
            }
            // Resize is handled by ratatui on the next draw
            _ => {}
        }
    }

    /// Translate a user action into commands
    pub fn handle_app_event(&mut self, event: AppEvent) {
        let selected = self.state.selected_index();
        match event {
            AppEvent::Quit => self.should_quit = true,
            AppEvent::NextTab => self.send(Command::SelectRelative(1)),
            AppEvent::PreviousTab => self.send(Command::SelectRelative(-1)),
            AppEvent::GoToTab(n) => {
                if n > 0 {
                    self.send(Command::SelectTab(usize::from(n) - 1));
                }
            }
            AppEvent::MoveTabLeft => {
                if let Some(index) = selected.filter(|&i| i > 0) {
                    self.send(Command::MoveTab {
                        from: index,
                        to: index - 1,
                    });
                }
            }
            AppEvent::MoveTabRight => {
                if let Some(index) = selected {
                    self.send(Command::MoveTab {
                        from: index,
                        to: index + 1,
                    });
                }
            }
            AppEvent::CloseTab => {
                if let Some(index) = selected {
                    self.send(Command::CloseTab(index));
                }
            }
            AppEvent::CloseTabsToRight => {
                if let Some(index) = selected {
                    self.send(Command::CloseTabsToRight(index));
                }
            }
            AppEvent::CloseOtherTabs => {
                if let Some(index) = selected {
                    self.send(Command::CloseOtherTabs(index));
                }
            }
            AppEvent::CycleZoomStep => {
                let next = self.state.zoom_step.cycle();
                self.send(Command::SetZoomStep(next.percent()));
            }
            AppEvent::TogglePreview => self.show_preview = !self.show_preview,
        }
    }

    fn handle_mouse_action(&mut self, action: MouseAction) {
        match action {
            MouseAction::Click { x, y } => {
                if let Some(index) = self.tab_at(x, y) {
                    self.send(Command::SelectTab(index));
                }
            }
            MouseAction::MiddleClick { x, y } => {
                if let Some(index) = self.tab_at(x, y) {
                    self.send(Command::CloseTab(index));
                }
            }
            MouseAction::ScrollUp => self.send(Command::SelectRelative(-1)),
            MouseAction::ScrollDown => self.send(Command::SelectRelative(1)),
        }
    }

    fn tab_at(&self, x: u16, y: u16) -> Option<usize> {
        if y != self.tab_bar_row {
            return None;
        }
        self.tab_positions
            .iter()
            .find(|(start, end, _)| x >= *start && x < *end)
            .map(|(_, _, index)| *index)
    }

    fn send(&self, command: Command) {
        if !self.commands.enqueue(command) {
            log::warn!("command queue is closed; input ignored");
        }
    }
}
