use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, HighlightSpacing, List, ListItem, ListState, StatefulWidget},
};

/// Whether a tree row can be expanded, and whether it currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Collapsible {
    #[default]
    None,
    Collapsed,
    Expanded,
}

/// One visible line of the sidebar tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeRow {
    pub depth: usize,
    pub label: String,
    pub detail: String,
    pub icon: &'static str,
    pub state: Collapsible,
    pub is_error: bool,
}

pub struct TreeView<'a> {
    pub rows: &'a [TreeRow],
    pub title: &'a str,
    pub focused: bool,
}

impl StatefulWidget for TreeView<'_> {
    type State = ListState;

    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer, state: &mut Self::State) {
        let items = self.rows.iter().map(|row| {
            let marker = match row.state {
                Collapsible::None => "  ",
                Collapsible::Collapsed => "▸ ",
                Collapsible::Expanded => "▾ ",
            };
            let label_style = if row.is_error {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            let mut spans = vec![
                Span::raw("  ".repeat(row.depth)),
                Span::raw(marker),
                Span::raw(format!("{} ", row.icon)),
                Span::styled(row.label.clone(), label_style),
            ];
            if !row.detail.is_empty() {
                spans.push(Span::styled(
                    format!("  {}", row.detail),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            ListItem::new(Line::from(spans))
        });

        let border = if self.focused { Color::Cyan } else { Color::DarkGray };
        let list = List::new(items)
            .block(
                Block::new()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border))
                    .title(format!(" {} ", self.title)),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_spacing(HighlightSpacing::Always);

        StatefulWidget::render(list, area, buf, state);
    }
}
