use super::AppEvent;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Maps keyboard events to application events
pub fn map_key_event(key: KeyEvent) -> Option<AppEvent> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    match key.code {
        // Quit: Ctrl+Q or Ctrl+C
        KeyCode::Char('q') | KeyCode::Char('c') if ctrl => Some(AppEvent::Quit),

        // Closing
        KeyCode::Char('w') if ctrl && !shift => Some(AppEvent::CloseTab),
        KeyCode::Char('w') | KeyCode::Char('W') if ctrl && shift => Some(AppEvent::CloseOtherTabs),
        KeyCode::Char('k') if ctrl => Some(AppEvent::CloseTabsToRight),

        // Moving tabs
        KeyCode::Left if alt => Some(AppEvent::MoveTabLeft),
        KeyCode::Right if alt => Some(AppEvent::MoveTabRight),

        // Navigation
        KeyCode::PageDown if ctrl => Some(AppEvent::NextTab),
        KeyCode::PageUp if ctrl => Some(AppEvent::PreviousTab),
        KeyCode::Right if !ctrl => Some(AppEvent::NextTab),
        KeyCode::Left if !ctrl => Some(AppEvent::PreviousTab),

        // Tab switching with Alt+1-9
        KeyCode::Char(c @ '1'..='9') if alt => c.to_digit(10).map(|d| AppEvent::GoToTab(d as u8)),

        // View
        KeyCode::Char('z') if !ctrl && !alt => Some(AppEvent::CycleZoomStep),
        KeyCode::Char('p') if !ctrl && !alt => Some(AppEvent::TogglePreview),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_quit_keys() {
        assert_eq!(
            map_key_event(key(KeyCode::Char('q'), KeyModifiers::CONTROL)),
            Some(AppEvent::Quit)
        );
        assert_eq!(
            map_key_event(key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(AppEvent::Quit)
        );
        assert_eq!(map_key_event(key(KeyCode::Char('q'), KeyModifiers::NONE)), None);
    }

    #[test]
    fn test_close_variants() {
        assert_eq!(
            map_key_event(key(KeyCode::Char('w'), KeyModifiers::CONTROL)),
            Some(AppEvent::CloseTab)
        );
        assert_eq!(
            map_key_event(key(
                KeyCode::Char('W'),
                KeyModifiers::CONTROL | KeyModifiers::SHIFT
            )),
            Some(AppEvent::CloseOtherTabs)
        );
        assert_eq!(
            map_key_event(key(KeyCode::Char('k'), KeyModifiers::CONTROL)),
            Some(AppEvent::CloseTabsToRight)
        );
    }

    #[test]
    fn test_arrows_select_and_alt_arrows_move() {
        assert_eq!(
            map_key_event(key(KeyCode::Right, KeyModifiers::NONE)),
            Some(AppEvent::NextTab)
        );
        assert_eq!(
            map_key_event(key(KeyCode::Left, KeyModifiers::ALT)),
            Some(AppEvent::MoveTabLeft)
        );
        assert_eq!(
            map_key_event(key(KeyCode::PageUp, KeyModifiers::CONTROL)),
            Some(AppEvent::PreviousTab)
        );
    }

    #[test]
    fn test_alt_digit_goes_to_tab() {
        assert_eq!(
            map_key_event(key(KeyCode::Char('3'), KeyModifiers::ALT)),
            Some(AppEvent::GoToTab(3))
        );
        assert_eq!(map_key_event(key(KeyCode::Char('0'), KeyModifiers::ALT)), None);
    }
}
