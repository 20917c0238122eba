use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    DismissNotification,
    MoveUp,
    MoveDown,
    PageDown,
    PageUp,
    Select,
    SwitchSection,
    CycleFilter,
    StartSearch,
    SearchInput(char),
    SearchBackspace,
    FinishSearch,
    CancelSearch,
    RefreshStats,
    NextAnalysis,
    PrevAnalysis,
    Feedback(bool),
    CreateDemo,
    DeleteAll,
    Confirm,
    Cancel,
    ToggleTheme,
    None,
}

/// Captures the UI state needed to interpret a key press.
#[derive(Debug, Clone, Default)]
pub struct InputContext {
    pub has_notification: bool,
    pub confirming: bool,
    pub searching: bool,
}

pub fn map_key(key: KeyEvent, ctx: &InputContext) -> Action {
    if key.kind != KeyEventKind::Press {
        return Action::None;
    }

    // Ctrl+C always quits
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    if ctx.confirming {
        return match key.code {
            KeyCode::Char('y' | 'Y') => Action::Confirm,
            KeyCode::Char('n' | 'N' | 'q') | KeyCode::Esc => Action::Cancel,
            _ => Action::None,
        };
    }

    if ctx.searching {
        return match key.code {
            KeyCode::Enter => Action::FinishSearch,
            KeyCode::Esc => Action::CancelSearch,
            KeyCode::Backspace => Action::SearchBackspace,
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                Action::SearchInput(c)
            }
            _ => Action::None,
        };
    }

    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Esc => {
            if ctx.has_notification {
                Action::DismissNotification
            } else {
                Action::Quit
            }
        }
        KeyCode::Up | KeyCode::Char('k') => Action::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => Action::MoveDown,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Enter => Action::Select,
        KeyCode::Tab | KeyCode::BackTab => Action::SwitchSection,
        KeyCode::Char('f') => Action::CycleFilter,
        KeyCode::Char('/') => Action::StartSearch,
        KeyCode::Char('r') => Action::RefreshStats,
        KeyCode::Char(']') => Action::NextAnalysis,
        KeyCode::Char('[') => Action::PrevAnalysis,
        KeyCode::Char('+') => Action::Feedback(true),
        KeyCode::Char('-') => Action::Feedback(false),
        KeyCode::Char('n') => Action::CreateDemo,
        KeyCode::Char('D') => Action::DeleteAll,
        KeyCode::Char('t') => Action::ToggleTheme,
        _ => Action::None,
    }
}
