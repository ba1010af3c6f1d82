use ratatui::{
    prelude::{Alignment, Buffer, Constraint, Layout, Rect, Widget},
    style::{Color, Style},
    widgets::Paragraph,
};

use super::{hotkey::Hotkey, hotkey_view::HotkeyView};

/// Active connection on the left, hotkeys for the focused pane in the
/// middle, app name on the right.
pub struct TopBarView<'a> {
    pub session: &'a str,
    pub hotkeys: &'a [Hotkey<'a>],
    pub app_name: &'a str,
}

impl Widget for TopBarView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [left, middle, right] = Layout::horizontal([
            Constraint::Percentage(25),
            Constraint::Percentage(60),
            Constraint::Percentage(15),
        ])
        .spacing(1)
        .areas(area);

        Paragraph::new(self.session)
            .style(Style::default().fg(Color::Green))
            .render(left, buf);
        HotkeyView {
            hotkeys: self.hotkeys,
        }
        .render(middle, buf);
        Paragraph::new(self.app_name.trim_start())
            .alignment(Alignment::Right)
            .render(right, buf);
    }
}
