use crate::app::App;
use crate::state::LoadStatus;
use image::RgbaImage;
use ratatui::{
    prelude::*,
    widgets::{Block, Paragraph, Wrap},
};

/// Draw the selected image, or a placeholder describing why there is none
pub fn draw(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default().style(Style::default().bg(app.theme.viewer_bg));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(tab) = app.state.selected_tab() else {
        let hint = if app.state.tab_count() == 0 {
            "No images open. Run pictab with image paths, even while this window is open."
        } else {
            "No tab selected"
        };
        draw_message(frame, inner, hint, app.theme.muted_fg);
        return;
    };

    match tab.status() {
        LoadStatus::Loading => {
            let text = format!("Loading {}…", tab.file_name());
            draw_message(frame, inner, &text, app.theme.muted_fg);
        }
        LoadStatus::Failed(reason) => {
            let text = format!("Could not load {}\n{}", tab.file_name(), reason);
            draw_message(frame, inner, &text, app.theme.error_fg);
        }
        LoadStatus::Loaded(image) => {
            if !app.show_preview {
                let text = format!("{} ({}x{})", tab.file_name(), image.width, image.height);
                draw_message(frame, inner, &text, app.theme.muted_fg);
                return;
            }
            let lines = preview_lines(&image.pixels, inner.width, inner.height, app.theme.viewer_bg);
            let top = inner.height.saturating_sub(lines.len() as u16) / 2;
            let target = Rect::new(inner.x, inner.y + top, inner.width, inner.height - top);
            frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), target);
        }
    }
}

fn draw_message(frame: &mut Frame, area: Rect, text: &str, color: Color) {
    let top = area.height.saturating_sub(2) / 2;
    let target = Rect::new(area.x, area.y + top, area.width, area.height - top);
    let message = Paragraph::new(text.to_string())
        .style(Style::default().fg(color))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(message, target);
}

/// Render `image` as rows of `▀` cells, two pixel rows per cell, scaled to
/// fit `cols` x `rows` without enlarging it. Transparent pixels blend into
/// `background`.
pub fn preview_lines(image: &RgbaImage, cols: u16, rows: u16, background: Color) -> Vec<Line<'static>> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || cols == 0 || rows == 0 {
        return Vec::new();
    }

    let scale = f64::min(
        f64::from(cols) / f64::from(width),
        f64::from(rows) * 2.0 / f64::from(height),
    )
    .min(1.0);
    let out_w = ((f64::from(width) * scale).round() as u32).max(1);
    let out_h = ((f64::from(height) * scale).round() as u32).max(1);

    let bg = match background {
        Color::Rgb(r, g, b) => [r, g, b],
        _ => [0, 0, 0],
    };
    let sample = |x: u32, y: u32| -> Color {
        let sx = (x * width / out_w).min(width - 1);
        let sy = (y * height / out_h).min(height - 1);
        let [r, g, b, a] = image.get_pixel(sx, sy).0;
        let blend = |c: u8, base: u8| ((u16::from(c) * u16::from(a) + u16::from(base) * (255 - u16::from(a))) / 255) as u8;
        Color::Rgb(blend(r, bg[0]), blend(g, bg[1]), blend(b, bg[2]))
    };

    (0..out_h.div_ceil(2))
        .map(|row| {
            let spans: Vec<Span<'static>> = (0..out_w)
                .map(|x| {
                    let upper = sample(x, row * 2);
                    let lower = if row * 2 + 1 < out_h {
                        sample(x, row * 2 + 1)
                    } else {
                        background
                    };
                    Span::styled("▀", Style::default().fg(upper).bg(lower))
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const BG: Color = Color::Rgb(0, 0, 0);

    #[test]
    fn test_small_image_is_not_enlarged() {
        let image = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let lines = preview_lines(&image, 80, 24, BG);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].spans.len(), 4);
        assert_eq!(lines[0].spans[0].style.fg, Some(Color::Rgb(255, 0, 0)));
    }

    #[test]
    fn test_large_image_fits_area() {
        let image = RgbaImage::new(400, 100);
        let lines = preview_lines(&image, 40, 20, BG);
        assert_eq!(lines[0].spans.len(), 40);
        // 400x100 scaled by 0.1 is 40x10 pixels, five cell rows
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_odd_height_pads_with_background() {
        let image = RgbaImage::from_pixel(1, 3, Rgba([10, 20, 30, 255]));
        let lines = preview_lines(&image, 10, 10, Color::Rgb(1, 2, 3));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].spans[0].style.bg, Some(Color::Rgb(1, 2, 3)));
    }

    #[test]
    fn test_transparency_blends_into_background() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 0]));
        let lines = preview_lines(&image, 10, 10, Color::Rgb(30, 30, 30));
        assert_eq!(lines[0].spans[0].style.fg, Some(Color::Rgb(30, 30, 30)));
    }

    #[test]
    fn test_empty_area_renders_nothing() {
        let image = RgbaImage::new(2, 2);
        assert!(preview_lines(&image, 0, 10, BG).is_empty());
    }
}
