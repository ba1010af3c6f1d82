use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};

/// Single-line text input. The cursor counts characters, not bytes, so
/// multi-byte input (CJK table comments, accents) edits cleanly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    text: String,
    cursor: usize,
}

impl TextInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a `TextInput` with initial text and cursor at the end
    #[must_use]
    pub fn with_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn cursor_position(&self) -> usize {
        self.cursor
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = self.text.chars().count();
    }

    fn byte_index(&self) -> usize {
        self.text
            .char_indices()
            .nth(self.cursor)
            .map_or(self.text.len(), |(i, _)| i)
    }

    pub fn add_char(&mut self, ch: char) {
        let at = self.byte_index();
        self.text.insert(at, ch);
        self.cursor += 1;
    }

    /// Backspace
    pub fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index();
        self.text.remove(at);
    }

    /// Delete
    pub fn delete_char_forward(&mut self) {
        if self.cursor < self.text.chars().count() {
            let at = self.byte_index();
            self.text.remove(at);
        }
    }

    pub const fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor < self.text.chars().count() {
            self.cursor += 1;
        }
    }

    pub const fn move_cursor_to_start(&mut self) {
        self.cursor = 0;
    }

    pub fn move_cursor_to_end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Text before and after the cursor, for rendering.
    #[must_use]
    pub fn split_at_cursor(&self) -> (&str, &str) {
        self.text.split_at(self.byte_index())
    }

    /// The text with the character under the cursor reversed.
    #[must_use]
    pub fn cursor_line(&self) -> Line<'_> {
        let (before, after) = self.split_at_cursor();
        let mut chars = after.chars();
        let under_cursor = chars.next().map_or_else(|| " ".to_string(), String::from);
        Line::from(vec![
            Span::raw(before),
            Span::styled(under_cursor, Style::default().add_modifier(Modifier::REVERSED)),
            Span::raw(chars.as_str()),
        ])
    }

    /// Apply an editing key. Returns `false` for keys this input ignores.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('u')) => self.clear(),
            (m, KeyCode::Char(c)) if !m.contains(KeyModifiers::CONTROL) => {
                self.add_char(c);
            }
            (_, KeyCode::Backspace) => self.delete_char(),
            (_, KeyCode::Delete) => self.delete_char_forward(),
            (_, KeyCode::Left) => self.move_cursor_left(),
            (_, KeyCode::Right) => self.move_cursor_right(),
            (_, KeyCode::Home) => self.move_cursor_to_start(),
            (_, KeyCode::End) => self.move_cursor_to_end(),
            _ => return false,
        }
        true
    }
}
