use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph, Widget},
};

/// Read-only scrollable text, used for structure reports and generated SQL.
pub struct DocumentView<'a> {
    pub title: &'a str,
    pub text: &'a str,
    pub scroll: u16,
    pub focused: bool,
}

impl Widget for DocumentView<'_> {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let border = if self.focused { Color::Cyan } else { Color::DarkGray };
        Paragraph::new(self.text)
            .block(
                Block::new()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border))
                    .title(format!(" {} ", self.title)),
            )
            .scroll((self.scroll, 0))
            .render(area, buf);
    }
}
