//! Keyboard input handling for the interactive checker.
//!
//! Decodes crossterm key events into UI-level actions. Input is modal:
//! normally keys act as hotkeys, but while the user is typing a file
//! path every printable character goes into the path buffer instead.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// What keyboard input currently controls.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Keys act as hotkeys
    #[default]
    Keys,
    /// Typing a file path; holds the text entered so far
    PathEntry(String),
}

/// UI-level action decoded from a key event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    /// Exit the application
    Quit,
    /// Start the live camera preview
    StartCamera,
    /// Stop the live camera preview
    StopCamera,
    /// Take a still from the live preview
    Capture,
    /// Path entry mode was opened
    BeginPathEntry,
    /// The path buffer changed (redraw needed)
    PathEdited,
    /// Path entry finished with this path
    SubmitPath(String),
    /// Path entry was abandoned
    CancelPathEntry,
    /// Close the info overlay or dismiss the error banner
    Dismiss,
    /// Show or hide the info overlay
    ToggleInfo,
    /// Switch to the next preview character set
    CycleCharset,
    /// Flip the brightness ramp (for light terminals)
    ToggleInvert,
    /// Show or hide the bottom status bar
    ToggleStatusBar,
    /// Key not bound to anything
    None,
}

/// Handle a key event, updating the input mode in place.
///
/// Hotkeys in `Keys` mode:
/// - q / Ctrl+C: quit
/// - c: start camera, s: stop camera, Space: capture
/// - u: enter a file path to check
/// - i: info overlay, Esc: dismiss overlay or error
/// - t: cycle charset, v: invert ramp, b: toggle status bar
pub fn handle_key_event(event: KeyEvent, mode: &mut InputMode) -> UiAction {
    let KeyEvent {
        code, modifiers, ..
    } = event;

    // Ctrl+C quits from either mode
    if modifiers.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
        return UiAction::Quit;
    }

    match mode {
        InputMode::Keys => match code {
            KeyCode::Char('q') | KeyCode::Char('Q') => UiAction::Quit,
            KeyCode::Char('c') | KeyCode::Char('C') => UiAction::StartCamera,
            KeyCode::Char('s') | KeyCode::Char('S') => UiAction::StopCamera,
            KeyCode::Char(' ') | KeyCode::Enter => UiAction::Capture,
            KeyCode::Char('u') | KeyCode::Char('U') => {
                *mode = InputMode::PathEntry(String::new());
                UiAction::BeginPathEntry
            }
            KeyCode::Char('i') | KeyCode::Char('I') => UiAction::ToggleInfo,
            KeyCode::Char('t') | KeyCode::Char('T') => UiAction::CycleCharset,
            KeyCode::Char('v') | KeyCode::Char('V') => UiAction::ToggleInvert,
            KeyCode::Char('b') | KeyCode::Char('B') => UiAction::ToggleStatusBar,
            KeyCode::Esc => UiAction::Dismiss,
            _ => UiAction::None,
        },
        InputMode::PathEntry(buffer) => match code {
            KeyCode::Esc => {
                *mode = InputMode::Keys;
                UiAction::CancelPathEntry
            }
            KeyCode::Enter => {
                let path = std::mem::take(buffer);
                *mode = InputMode::Keys;
                if path.trim().is_empty() {
                    UiAction::CancelPathEntry
                } else {
                    UiAction::SubmitPath(path.trim().to_string())
                }
            }
            KeyCode::Backspace => {
                buffer.pop();
                UiAction::PathEdited
            }
            KeyCode::Char(c) => {
                buffer.push(c);
                UiAction::PathEdited
            }
            _ => UiAction::None,
        },
    }
}
