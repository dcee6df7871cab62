use crate::app::App;
use crate::state::{LoadStatus, TabRecord};
use ratatui::{prelude::*, widgets::Paragraph};
use std::ops::Range;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Widest file name shown before truncation
const MAX_NAME_WIDTH: usize = 24;

/// Draw the tab bar showing open images
pub fn draw(frame: &mut Frame, app: &mut App, area: Rect) {
    let bg_style = Style::default()
        .fg(app.theme.tab_inactive_fg)
        .bg(app.theme.tabbar_bg);

    let active_style = Style::default()
        .fg(app.theme.tab_active_fg)
        .bg(app.theme.tab_active_bg)
        .add_modifier(Modifier::BOLD);

    let inactive_style = Style::default()
        .fg(app.theme.tab_inactive_fg)
        .bg(app.theme.tab_inactive_bg);

    let loading_style = Style::default()
        .fg(app.theme.tab_loading_fg)
        .bg(app.theme.tab_inactive_bg);

    let state = app.state.clone();
    let labels: Vec<String> = state.tabs().iter().map(tab_label).collect();
    // +1 for separator
    let widths: Vec<u16> = labels.iter().map(|l| l.width() as u16 + 1).collect();
    let range = visible_tabs(&widths, state.selected_index(), area.width);

    app.tab_bar_row = area.y;
    app.tab_positions.clear();

    let mut spans: Vec<Span> = Vec::new();
    let mut x = area.x;
    let right = area.x.saturating_add(area.width);
    for index in range {
        let tab = &state.tabs()[index];
        let style = if state.selected_index() == Some(index) {
            active_style
        } else if tab.status().is_loading() {
            loading_style
        } else {
            inactive_style
        };

        spans.push(Span::styled(labels[index].clone(), style));
        spans.push(Span::styled("│", bg_style));

        let end = x.saturating_add(widths[index]).min(right);
        app.tab_positions.push((x, end, index));
        x = end;
    }

    // Fill the rest with background
    let used = x - area.x;
    let remaining = area.width.saturating_sub(used);
    if remaining > 0 {
        spans.push(Span::styled(" ".repeat(remaining as usize), bg_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Text for one tab: ` name ` with a status marker
pub fn tab_label(tab: &TabRecord) -> String {
    let marker = match tab.status() {
        LoadStatus::Loading => " …",
        LoadStatus::Failed(_) => " !",
        LoadStatus::Loaded(_) => "",
    };
    format!(" {}{} ", truncate(tab.file_name(), MAX_NAME_WIDTH), marker)
}

/// The run of tabs that fits in `available` columns while keeping the
/// selected tab visible
pub fn visible_tabs(widths: &[u16], selected: Option<usize>, available: u16) -> Range<usize> {
    let selected = selected.unwrap_or(0).min(widths.len().saturating_sub(1));

    // Scroll right until the selected tab fits
    let mut start = 0;
    while start < selected && span_width(&widths[start..=selected]) > available {
        start += 1;
    }

    let mut end = start;
    let mut used = 0u32;
    while end < widths.len() && used + u32::from(widths[end]) <= u32::from(available) {
        used += u32::from(widths[end]);
        end += 1;
    }
    // A selected tab wider than the bar is still drawn, clipped at the edge
    if !widths.is_empty() && end <= selected {
        end = selected + 1;
    }
    start..end
}

fn span_width(widths: &[u16]) -> u16 {
    widths.iter().fold(0u16, |acc, w| acc.saturating_add(*w))
}

fn truncate(name: &str, max_width: usize) -> String {
    if name.width() <= max_width {
        return name.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in name.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}
