/// Application-level events (user actions)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    // App control
    Quit,

    // Tab navigation
    NextTab,
    PreviousTab,
    GoToTab(u8),
    MoveTabLeft,
    MoveTabRight,

    // Closing
    CloseTab,
    CloseTabsToRight,
    CloseOtherTabs,

    // View
    CycleZoomStep,
    TogglePreview,
}
