use miq_ui::{
    DocumentView, FilterBar, FilterEdit, ResultGridView, TopBarView, TreeView,
    hotkey::{EDITOR_HOTKEYS, HELP_HOTKEYS, Hotkey, RESULT_HOTKEYS, TREE_HOTKEYS},
    hotkey_view::HotkeyView,
};
use ratatui::{
    Frame,
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::{
    app::{APP_NAME, App, Output, TOPBAR_HEIGHT},
    app_state::Focus,
};

const FOCUSED: Color = Color::Cyan;
const EMPTY_HINT: &str = "Pick a table and press t, or write SQL above and press F5.";

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let color = if focused { FOCUSED } else { Color::DarkGray };
    Block::new()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title)
        .title_alignment(Alignment::Left)
}

impl App<'_> {
    const fn hotkeys(&self) -> &'static [Hotkey<'static>] {
        match self.focus {
            Focus::Tree => &TREE_HOTKEYS,
            Focus::Editor => &EDITOR_HOTKEYS,
            Focus::Results => &RESULT_HOTKEYS,
        }
    }

    /// Top bar, filter bar, the tree beside the editor and output, then the
    /// status line. Modals and help draw over everything.
    pub fn render(&mut self, frame: &mut Frame) {
        let filter_bar = FilterBar {
            table_filter: self.filters.table_filter(),
            column_filter: self.filters.column_filter(),
            editing: self.filter_edit.as_ref().map(|(target, input)| FilterEdit {
                label: target.label(),
                input,
            }),
        };

        let mut constraints = vec![
            Constraint::Length(TOPBAR_HEIGHT),
            Constraint::Length(filter_bar.height()),
            Constraint::Min(0),
        ];
        if !self.status_line.message().is_empty() {
            constraints.push(Constraint::Length(1));
        }
        let layout = Layout::vertical(constraints).split(frame.area());
        let top = layout.first().copied().unwrap_or_default();
        let filters = layout.get(1).copied().unwrap_or_default();
        let main = layout.get(2).copied().unwrap_or_else(|| frame.area());

        let session = self.session.label();
        frame.render_widget(
            TopBarView {
                session: &session,
                hotkeys: self.hotkeys(),
                app_name: APP_NAME,
            },
            top,
        );
        frame.render_widget(filter_bar, filters);

        let [tree_area, right] =
            Layout::horizontal([Constraint::Percentage(30), Constraint::Percentage(70)])
                .areas(main);
        let [editor_area, output_area] =
            Layout::vertical([Constraint::Percentage(35), Constraint::Percentage(65)])
                .areas(right);

        let rows = self.explorer.rows();
        frame.render_stateful_widget(
            TreeView {
                rows: &rows,
                title: " Connections ",
                focused: self.focus == Focus::Tree,
            },
            tree_area,
            &mut self.explorer.state,
        );

        self.editor.set_block(pane_block(
            format!(" Query: {session} "),
            self.focus == Focus::Editor,
        ));
        frame.render_widget(&self.editor, editor_area);

        self.render_output(frame, output_area);

        if let Some(status) = layout.get(3) {
            frame.render_widget(&self.status_line, *status);
        }

        if let Some((modal, _)) = &self.modal {
            frame.render_widget(modal, frame.area());
        }
        if self.show_help {
            render_help(frame);
        }
    }

    fn render_output(&mut self, frame: &mut Frame, area: Rect) {
        let focused = self.focus == Focus::Results;
        match &mut self.output {
            Output::Empty => {
                frame.render_widget(
                    Paragraph::new(EMPTY_HINT)
                        .style(Style::default().fg(Color::DarkGray))
                        .block(pane_block(" Results ".to_string(), focused)),
                    area,
                );
            }
            Output::Results(panel) => {
                panel.scroll_to_selection(area.width.saturating_sub(2));
                frame.render_widget(
                    ResultGridView {
                        panel: &*panel,
                        focused,
                    },
                    area,
                );
            }
            Output::Document {
                title,
                text,
                scroll,
            } => {
                frame.render_widget(
                    DocumentView {
                        title: title.as_str(),
                        text: text.as_str(),
                        scroll: *scroll,
                        focused,
                    },
                    area,
                );
            }
        }
    }
}

fn render_help(frame: &mut Frame) {
    let area = frame.area();
    let width = area.width.saturating_sub(8).min(80);
    let height = area.height.saturating_sub(4).min(12);
    let popup = Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    );
    let block = Block::new()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(FOCUSED))
        .title(" Keys (any key to close) ")
        .title_alignment(Alignment::Center);
    let inner = block.inner(popup);
    frame.render_widget(Clear, popup);
    frame.render_widget(block, popup);
    frame.render_widget(
        HotkeyView {
            hotkeys: &HELP_HOTKEYS,
        },
        inner,
    );
}
