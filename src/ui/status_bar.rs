use crate::app::App;
use crate::state::LoadStatus;
use ratatui::{prelude::*, widgets::Paragraph};
use unicode_width::UnicodeWidthStr;

/// Draw the status bar at the bottom of the screen
pub fn draw(frame: &mut Frame, app: &App, area: Rect) {
    let style = Style::default()
        .fg(app.theme.statusbar_fg)
        .bg(app.theme.statusbar_bg);

    let state = &app.state;
    let position = match state.selected_index() {
        Some(index) => format!("{}/{}", index + 1, state.tab_count()),
        None => format!("-/{}", state.tab_count()),
    };

    let detail = match state.selected_tab().map(|t| t.status()) {
        Some(LoadStatus::Loaded(image)) => format!("{}x{}", image.width, image.height),
        Some(LoadStatus::Loading) => "loading".to_string(),
        Some(LoadStatus::Failed(_)) => "failed".to_string(),
        None => "empty".to_string(),
    };

    let left_status = format!(
        " {} | {} | zoom step: {}% ",
        position,
        detail,
        state.zoom_step.percent()
    );

    let right_status = match app.active_notice() {
        Some(notice) => format!(" {} ", notice),
        None => " Ctrl+Q quit | ←/→ tabs | Ctrl+W close | z zoom step ".to_string(),
    };

    // Calculate padding
    let total_len = left_status.width() + right_status.width();
    let padding = (area.width as usize).saturating_sub(total_len);

    let full_text = format!("{}{}{}", left_status, " ".repeat(padding), right_status);

    let status = Paragraph::new(full_text).style(style);
    frame.render_widget(status, area);
}
