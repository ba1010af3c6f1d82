use ratatui::{
    prelude::*,
    style::Style,
    widgets::{Paragraph, Widget, Wrap},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusKind {
    #[default]
    Info,
    Warning,
    Error,
}

/// One line of feedback at the bottom of the screen.
#[derive(Clone, Debug, Default)]
pub struct StatusLine {
    message: String,
    kind: StatusKind,
}

impl StatusLine {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            message: String::new(),
            kind: StatusKind::Info,
        }
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.set(StatusKind::Info, message);
    }

    pub fn set_warning(&mut self, message: impl Into<String>) {
        self.set(StatusKind::Warning, message);
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.set(StatusKind::Error, message);
    }

    fn set(&mut self, kind: StatusKind, message: impl Into<String>) {
        self.kind = kind;
        self.message = message.into();
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub const fn kind(&self) -> StatusKind {
        self.kind
    }

    pub fn clear(&mut self) {
        self.message.clear();
        self.kind = StatusKind::Info;
    }
}

impl Widget for &StatusLine {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let style = match self.kind {
            StatusKind::Info => Style::default(),
            StatusKind::Warning => Style::default().fg(Color::Yellow),
            StatusKind::Error => Style::default().fg(Color::Red),
        };

        Paragraph::new(self.message.as_str())
            .style(style)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}
