//! Colours for the two themes.

use crate::app::NotificationLevel;
use crate::live::ChannelState;
use crate::model::RecordStatus;
use crate::selection::Theme;
use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub text: Color,
    pub dim: Color,
    pub accent: Color,
    pub key: Color,
    pub border: Color,
    pub title: Color,
    pub warn: Color,
    pub ok: Color,
    pub error: Color,
    pub overlay_bg: Color,
}

pub static DARK: Palette = Palette {
    text: Color::White,
    dim: Color::DarkGray,
    accent: Color::Cyan,
    key: Color::Cyan,
    border: Color::DarkGray,
    title: Color::Cyan,
    warn: Color::Yellow,
    ok: Color::Green,
    error: Color::Red,
    overlay_bg: Color::Black,
};

pub static LIGHT: Palette = Palette {
    text: Color::Black,
    dim: Color::Gray,
    accent: Color::Blue,
    key: Color::Blue,
    border: Color::Gray,
    title: Color::Blue,
    warn: Color::Rgb(176, 112, 0),
    ok: Color::Rgb(0, 128, 0),
    error: Color::Rgb(192, 0, 0),
    overlay_bg: Color::White,
};

impl Palette {
    pub fn for_theme(theme: Theme) -> &'static Palette {
        match theme {
            Theme::Dark => &DARK,
            Theme::Light => &LIGHT,
        }
    }

    pub fn status(&self, status: RecordStatus) -> (&'static str, Color) {
        match status {
            RecordStatus::Passed => ("✓", self.ok),
            RecordStatus::Failed => ("✗", self.error),
            RecordStatus::Broken => ("!", self.error),
            RecordStatus::Skipped => ("⊘", self.warn),
            RecordStatus::Unknown => ("·", self.dim),
        }
    }

    pub fn channel(&self, state: ChannelState) -> Color {
        match state {
            ChannelState::Connected => self.ok,
            ChannelState::Connecting => self.warn,
            ChannelState::Disconnected => self.error,
        }
    }

    pub fn notification(&self, level: NotificationLevel) -> (&'static str, Color) {
        match level {
            NotificationLevel::Info => ("★ ", self.warn),
            NotificationLevel::Success => ("✓ ", self.ok),
            NotificationLevel::Error => ("✗ ", self.error),
        }
    }

    pub fn selected(&self) -> Style {
        Style::default().add_modifier(Modifier::REVERSED)
    }

    pub fn label(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }
}
