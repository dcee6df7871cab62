mod status_bar;
mod tab_bar;
mod viewer;

use crate::app::App;
use ratatui::prelude::*;

pub use tab_bar::{tab_label, visible_tabs};
pub use viewer::preview_lines;

/// Draw the entire UI
pub fn draw(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Check minimum size
    if area.width < 20 || area.height < 4 {
        draw_size_warning(frame, area);
        return;
    }

    // Main layout: tab bar, image, status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Tab bar
            Constraint::Min(1),    // Viewer
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    tab_bar::draw(frame, app, chunks[0]);
    viewer::draw(frame, app, chunks[1]);
    status_bar::draw(frame, app, chunks[2]);
}

/// Draw a warning when terminal is too small
fn draw_size_warning(frame: &mut Frame, area: Rect) {
    use ratatui::widgets::Paragraph;

    let warning = Paragraph::new("Terminal too small").alignment(Alignment::Center);
    frame.render_widget(warning, area);
}
