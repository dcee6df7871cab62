use ratatui::style::Color;

/// Color theme for the application
#[derive(Debug, Clone)]
pub struct Theme {
    /// Foreground (text) color
    pub fg: Color,
    /// Background behind the image preview
    pub viewer_bg: Color,
    /// Dimmed text (placeholders, hints)
    pub muted_fg: Color,
    /// Text for images that failed to load
    pub error_fg: Color,
    /// Background for the status bar
    pub statusbar_bg: Color,
    /// Foreground for the status bar
    pub statusbar_fg: Color,
    /// Background for the tab bar
    pub tabbar_bg: Color,
    /// Active tab background
    pub tab_active_bg: Color,
    /// Active tab foreground
    pub tab_active_fg: Color,
    /// Inactive tab background
    pub tab_inactive_bg: Color,
    /// Inactive tab foreground
    pub tab_inactive_fg: Color,
    /// Marker for tabs still loading
    pub tab_loading_fg: Color,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            fg: Color::Rgb(212, 212, 212),
            viewer_bg: Color::Rgb(30, 30, 30),
            muted_fg: Color::Rgb(133, 133, 133),
            error_fg: Color::Rgb(244, 135, 113),
            statusbar_bg: Color::Rgb(0, 122, 204),
            statusbar_fg: Color::Rgb(255, 255, 255),
            tabbar_bg: Color::Rgb(45, 45, 45),
            tab_active_bg: Color::Rgb(30, 30, 30),
            tab_active_fg: Color::Rgb(255, 255, 255),
            tab_inactive_bg: Color::Rgb(45, 45, 45),
            tab_inactive_fg: Color::Rgb(150, 150, 150),
            tab_loading_fg: Color::Rgb(255, 200, 100),
        }
    }
}
