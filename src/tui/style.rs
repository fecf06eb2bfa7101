//! Color scheme and styles.

use ratatui::style::{Color, Modifier, Style};

/// Dashboard color palette.
pub struct Theme;

impl Theme {
    pub const HEADER_BG: Color = Color::Blue;
    pub const HEADER_FG: Color = Color::White;

    pub const FG: Color = Color::White;
    pub const FG_DIM: Color = Color::DarkGray;

    pub const FOCUSED: Color = Color::Green;
    pub const BACKGROUND: Color = Color::Yellow;
    pub const ERROR: Color = Color::Red;
    pub const VALUE: Color = Color::Cyan;
}

/// Pre-defined styles.
pub struct Styles;

impl Styles {
    /// Header bar style.
    pub fn header() -> Style {
        Style::default()
            .fg(Theme::HEADER_FG)
            .bg(Theme::HEADER_BG)
            .add_modifier(Modifier::BOLD)
    }

    /// Focus indicator in the header.
    pub fn focus(focused: bool) -> Style {
        let color = if focused {
            Theme::FOCUSED
        } else {
            Theme::BACKGROUND
        };
        Style::default()
            .fg(color)
            .bg(Theme::HEADER_BG)
            .add_modifier(Modifier::BOLD)
    }

    /// Metric label.
    pub fn label() -> Style {
        Style::default().fg(Theme::FG_DIM)
    }

    /// Metric value.
    pub fn value() -> Style {
        Style::default().fg(Theme::VALUE).add_modifier(Modifier::BOLD)
    }

    /// Error text.
    pub fn error() -> Style {
        Style::default().fg(Theme::ERROR)
    }

    /// Stream progress gauge.
    pub fn gauge(focused: bool) -> Style {
        Style::default().fg(if focused {
            Theme::FOCUSED
        } else {
            Theme::BACKGROUND
        })
    }

    /// Help text style.
    pub fn help() -> Style {
        Style::default().fg(Theme::FG_DIM)
    }

    /// Help key style (highlighted keys in help line).
    pub fn help_key() -> Style {
        Style::default().fg(Theme::FG).add_modifier(Modifier::BOLD)
    }
}
