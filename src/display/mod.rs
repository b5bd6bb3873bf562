// src/display/mod.rs
//! Display modules for the command line interface

pub mod terminal;

pub use terminal::TerminalDisplay;

use crossterm::tty::IsTty;

/// Check if colored terminal output should be used
pub fn should_use_color() -> bool {
    std::io::stdout().is_tty() && std::env::var_os("NO_COLOR").is_none()
}
