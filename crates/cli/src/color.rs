// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::builder::styling::{Ansi256Color, Color, Style, Styles};
use std::io::IsTerminal;

pub mod codes {
    /// Section headers: steel blue
    pub const HEADER: u8 = 74;
    /// Commands and literals: light grey
    pub const LITERAL: u8 = 250;
    /// Placeholders and context: medium grey
    pub const CONTEXT: u8 = 245;
}

const RED: &str = "\x1b[1;31m";
const RESET: &str = "\x1b[0m";

/// Priority: `NO_COLOR=1` disables → `COLOR=1` forces → TTY check.
fn enabled(is_terminal: bool) -> bool {
    if crate::env::no_color() {
        return false;
    }
    if crate::env::force_color() {
        return true;
    }
    is_terminal
}

/// Whether help and other stdout output is colored.
pub fn should_colorize() -> bool {
    enabled(std::io::stdout().is_terminal())
}

/// Whether diagnostics on stderr are colored.
pub fn should_colorize_stderr() -> bool {
    enabled(std::io::stderr().is_terminal())
}

fn fg256(code: u8) -> Style {
    Style::new().fg_color(Some(Color::Ansi256(Ansi256Color(code))))
}

/// Clap help palette.
pub fn styles() -> Styles {
    if !should_colorize() {
        return Styles::plain();
    }
    Styles::styled()
        .header(fg256(codes::HEADER))
        .usage(fg256(codes::HEADER))
        .literal(fg256(codes::LITERAL))
        .placeholder(fg256(codes::CONTEXT))
}

/// Bold red for failure banners on stderr.
pub fn failure(text: &str) -> String {
    if should_colorize_stderr() {
        format!("{RED}{text}{RESET}")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
#[path = "color_tests.rs"]
mod tests;
