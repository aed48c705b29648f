//! Terminal management module - raw mode, TUI wrapper, and screen rendering.

mod tui;
pub mod view;

pub use tui::Tui;
pub use view::ViewState;
