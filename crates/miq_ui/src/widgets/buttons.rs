use ratatui::{
    prelude::{Buffer, Rect, Widget},
    style::{Color, Style},
    text::{Line, Span},
};

/// A centered row of buttons with one highlighted.
pub struct Buttons<'a> {
    pub buttons: Vec<&'a str>,
    pub selected: usize,
}

impl Widget for Buttons<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut spans = vec![];
        for (i, button) in self.buttons.iter().enumerate() {
            let bg = if i == self.selected {
                Color::Blue
            } else {
                Color::DarkGray
            };
            spans.push(Span::styled(
                format!(" {button} "),
                Style::default().fg(Color::White).bg(bg),
            ));
            spans.push(Span::raw(" "));
        }
        Line::from(spans).centered().render(area, buf);
    }
}
