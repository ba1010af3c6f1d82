use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use super::text_input::TextInput;

/// Filter being typed into the bar.
#[derive(Debug, Clone, Copy)]
pub struct FilterEdit<'a> {
    pub label: &'a str,
    pub input: &'a TextInput,
}

/// Current tree filters, or an input while one is being edited.
#[derive(Debug, Clone, Copy)]
pub struct FilterBar<'a> {
    pub table_filter: &'a str,
    pub column_filter: &'a str,
    pub editing: Option<FilterEdit<'a>>,
}

impl FilterBar<'_> {
    /// Rows the bar needs in the current state.
    #[must_use]
    pub const fn height(&self) -> u16 {
        if self.editing.is_some() { 3 } else { 1 }
    }
}

impl Widget for FilterBar<'_> {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let Some(edit) = self.editing else {
            let dim = Style::default().fg(Color::DarkGray);
            let value = |v: &str| {
                if v.is_empty() {
                    Span::styled("-", dim)
                } else {
                    Span::styled(v.to_string(), Style::default().fg(Color::Yellow))
                }
            };
            Line::from(vec![
                Span::styled("tables: ", dim),
                value(self.table_filter),
                Span::styled("  columns: ", dim),
                value(self.column_filter),
            ])
            .render(area, buf);
            return;
        };

        let block = Block::new()
            .borders(Borders::ALL)
            .title(format!(" {} (Enter to apply, Esc to cancel) ", edit.label))
            .title_alignment(Alignment::Left);
        let inner = block.inner(area);
        block.render(area, buf);

        Paragraph::new(edit.input.cursor_line())
            .style(Style::default().fg(Color::White))
            .render(inner, buf);
    }
}
