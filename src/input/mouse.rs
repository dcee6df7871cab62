use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};

/// Represents a processed mouse action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MouseAction {
    /// Left click at position (select tab)
    Click { x: u16, y: u16 },
    /// Middle click at position (close tab)
    MiddleClick { x: u16, y: u16 },
    /// Scroll up (previous tab)
    ScrollUp,
    /// Scroll down (next tab)
    ScrollDown,
}

/// Maps a raw mouse event to a mouse action
pub fn map_mouse_event(event: MouseEvent) -> Option<MouseAction> {
    let x = event.column;
    let y = event.row;

    match event.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(MouseAction::Click { x, y }),
        MouseEventKind::Down(MouseButton::Middle) => Some(MouseAction::MiddleClick { x, y }),
        MouseEventKind::ScrollUp => Some(MouseAction::ScrollUp),
        MouseEventKind::ScrollDown => Some(MouseAction::ScrollDown),
        _ => None,
    }
}
