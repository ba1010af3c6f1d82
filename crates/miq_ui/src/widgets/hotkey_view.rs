use ratatui::{
    prelude::{Buffer, Rect, Widget},
    style::{Color, Style},
    text::{Line, Span},
};

use super::hotkey::Hotkey;

/// Hotkeys laid out in columns, top to bottom then left to right.
pub struct HotkeyView<'a> {
    pub hotkeys: &'a [Hotkey<'a>],
}

impl Widget for HotkeyView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        const COLUMN_WIDTH: u16 = 24;

        let mut x = area.x;
        let mut y = area.y;
        let max_y = area.y.saturating_add(area.height);
        let max_x = area.x.saturating_add(area.width);

        for hotkey in self.hotkeys {
            if y >= max_y {
                x = x.saturating_add(COLUMN_WIDTH);
                y = area.y;
            }
            if x >= max_x {
                break;
            }
            let width = COLUMN_WIDTH.min(max_x - x);
            Line::from(vec![
                Span::styled(format!("<{hotkey}> "), Style::default().fg(Color::Cyan)),
                Span::raw(hotkey.description),
            ])
            .render(Rect::new(x, y, width, 1), buf);
            y += 1;
        }
    }
}
