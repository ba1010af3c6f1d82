use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    prelude::{Alignment, Buffer, Constraint, Layout, Rect, Widget},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use super::{buttons::Buttons, text_input::TextInput};
use crate::display::display_width;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalAction {
    None,
    Submit,
    Cancel,
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn frame(area: Rect, buf: &mut Buffer, title: &str, color: Color) -> Rect {
    let block = Block::default()
        .title(format!(" {title} "))
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .style(Style::default().bg(Color::Black));
    let inner = block.inner(area);
    Clear.render(area, buf);
    block.render(area, buf);
    inner
}

/// Yes/No question. `y` and `n` answer directly.
#[derive(Debug, Clone, Default)]
pub struct ConfirmationModal {
    pub title: String,
    pub message: String,
    pub selected_button: usize,
}

impl ConfirmationModal {
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            selected_button: 0,
        }
    }

    pub const fn toggle_button(&mut self) {
        self.selected_button = (self.selected_button + 1) % 2;
    }

    pub const fn handle_key(&mut self, key: KeyEvent) -> ModalAction {
        match (key.modifiers, key.code) {
            (_, KeyCode::Left | KeyCode::Right | KeyCode::Tab) => {
                self.toggle_button();
                ModalAction::None
            }
            (_, KeyCode::Char('y' | 'Y')) => ModalAction::Submit,
            (_, KeyCode::Char('n' | 'N') | KeyCode::Esc) => ModalAction::Cancel,
            (_, KeyCode::Enter) => {
                if self.selected_button == 0 {
                    ModalAction::Submit
                } else {
                    ModalAction::Cancel
                }
            }
            _ => ModalAction::None,
        }
    }

    fn render(&self, area: Rect, buf: &mut Buffer) {
        let modal_area = centered(area, 60, 8);
        let inner = frame(modal_area, buf, &self.title, Color::Red);
        let [message, buttons] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(inner);

        Paragraph::new(self.message.as_str())
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(message, buf);
        Buttons {
            buttons: vec!["Yes", "No"],
            selected: self.selected_button,
        }
        .render(buttons, buf);
    }
}

/// Full text of one cell, scrollable.
#[derive(Debug, Clone, Default)]
pub struct CellValueModal {
    pub column_name: String,
    pub cell_value: String,
    scroll: u16,
}

impl CellValueModal {
    #[must_use]
    pub fn new(column_name: impl Into<String>, cell_value: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            cell_value: cell_value.into(),
            scroll: 0,
        }
    }

    pub const fn handle_key(&mut self, key: KeyEvent) -> ModalAction {
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) => ModalAction::Cancel,
            (_, KeyCode::Down | KeyCode::Char('j')) => {
                self.scroll = self.scroll.saturating_add(1);
                ModalAction::None
            }
            (_, KeyCode::Up | KeyCode::Char('k')) => {
                self.scroll = self.scroll.saturating_sub(1);
                ModalAction::None
            }
            _ => ModalAction::None,
        }
    }

    fn render(&self, area: Rect, buf: &mut Buffer) {
        let max_width = area.width.saturating_sub(4).max(20);
        let value_width = self
            .cell_value
            .lines()
            .map(display_width)
            .max()
            .unwrap_or(0);
        let width = u16::try_from(value_width + 4)
            .unwrap_or(u16::MAX)
            .clamp(40, max_width);
        let content_width = usize::from(width.saturating_sub(4)).max(1);
        let lines: usize = self
            .cell_value
            .lines()
            .map(|l| display_width(l).div_ceil(content_width).max(1))
            .sum();
        let height = u16::try_from(lines + 4)
            .unwrap_or(u16::MAX)
            .clamp(6, area.height.saturating_sub(2).max(6));

        let modal_area = centered(area, width, height);
        let inner = frame(modal_area, buf, &self.column_name, Color::Cyan);
        let [value, button] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(inner);

        Paragraph::new(self.cell_value.as_str())
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0))
            .render(value, buf);
        Buttons {
            buttons: vec!["OK"],
            selected: 0,
        }
        .render(button, buf);
    }
}

/// One line of free text. Used for every prompt in a sequence.
#[derive(Debug, Clone, Default)]
pub struct InputModal {
    pub title: String,
    pub prompt: String,
    pub input: TextInput,
    pub masked: bool,
    pub required: bool,
    error: Option<String>,
}

impl InputModal {
    #[must_use]
    pub fn new(title: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.input.set_text(value);
        self
    }

    #[must_use]
    pub const fn masked(mut self) -> Self {
        self.masked = true;
        self
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn value(&self) -> &str {
        self.input.text()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ModalAction {
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc) => ModalAction::Cancel,
            (_, KeyCode::Enter) => {
                if self.required && self.input.text().trim().is_empty() {
                    self.error = Some(format!("{} is required", self.prompt));
                    ModalAction::None
                } else {
                    ModalAction::Submit
                }
            }
            _ => {
                if self.input.handle_key(key) {
                    self.error = None;
                }
                ModalAction::None
            }
        }
    }

    fn render(&self, area: Rect, buf: &mut Buffer) {
        let modal_area = centered(area, 64, 8);
        let inner = frame(modal_area, buf, &self.title, Color::Yellow);
        let [prompt, input, error, hint] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .spacing(0)
        .areas(inner);

        Paragraph::new(self.prompt.as_str()).render(prompt, buf);

        let (before, after) = self.input.split_at_cursor();
        let mask = |s: &str| "•".repeat(s.chars().count());
        let (before, after) = if self.masked {
            (mask(before), mask(after))
        } else {
            (before.to_string(), after.to_string())
        };
        let mut rest = after.chars();
        let cursor = rest.next().map_or_else(|| " ".to_string(), String::from);
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Yellow)),
            Span::raw(before),
            Span::styled(cursor, Style::default().add_modifier(Modifier::REVERSED)),
            Span::raw(rest.as_str().to_string()),
        ])
        .render(input, buf);

        if let Some(message) = &self.error {
            Paragraph::new(message.as_str())
                .style(Style::default().fg(Color::Red))
                .render(error, buf);
        }
        Paragraph::new("Enter to confirm, Esc to cancel")
            .style(Style::default().fg(Color::DarkGray))
            .render(hint, buf);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickerItem {
    pub label: String,
    pub detail: String,
}

/// Filterable list. Typing narrows by label or detail, case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct PickerModal {
    pub title: String,
    pub items: Vec<PickerItem>,
    pub query: TextInput,
    selected: usize,
}

impl PickerModal {
    #[must_use]
    pub fn new(title: impl Into<String>, items: Vec<PickerItem>) -> Self {
        Self {
            title: title.into(),
            items,
            query: TextInput::new(),
            selected: 0,
        }
    }

    /// Indices into `items` that match the query.
    #[must_use]
    pub fn matches(&self) -> Vec<usize> {
        let query = self.query.text().trim().to_lowercase();
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| {
                query.is_empty()
                    || item.label.to_lowercase().contains(&query)
                    || item.detail.to_lowercase().contains(&query)
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Index into `items` of the highlighted match.
    #[must_use]
    pub fn selected_item(&self) -> Option<usize> {
        self.matches().get(self.selected).copied()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ModalAction {
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc) => ModalAction::Cancel,
            (_, KeyCode::Enter) => {
                if self.selected_item().is_some() {
                    ModalAction::Submit
                } else {
                    ModalAction::None
                }
            }
            (_, KeyCode::Down) => {
                if self.selected + 1 < self.matches().len() {
                    self.selected += 1;
                }
                ModalAction::None
            }
            (_, KeyCode::Up) => {
                self.selected = self.selected.saturating_sub(1);
                ModalAction::None
            }
            _ => {
                if self.query.handle_key(key) {
                    self.selected = 0;
                }
                ModalAction::None
            }
        }
    }

    fn render(&self, area: Rect, buf: &mut Buffer) {
        let height = area.height.saturating_sub(4).clamp(8, 24);
        let modal_area = centered(area, 80, height);
        let inner = frame(modal_area, buf, &self.title, Color::Cyan);
        let [query, list] =
            Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(inner);

        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Cyan)),
            Span::raw(self.query.text()),
            Span::styled(" ", Style::default().add_modifier(Modifier::REVERSED)),
        ])
        .render(query, buf);

        let visible = usize::from(list.height);
        let matches = self.matches();
        let offset = self.selected.saturating_sub(visible.saturating_sub(1));
        let lines: Vec<Line> = matches
            .iter()
            .enumerate()
            .skip(offset)
            .take(visible)
            .filter_map(|(pos, &i)| {
                let item = self.items.get(i)?;
                let style = if pos == self.selected {
                    Style::default().add_modifier(Modifier::REVERSED)
                } else {
                    Style::default()
                };
                Some(Line::from(vec![
                    Span::styled(item.label.clone(), style),
                    Span::styled(format!("  {}", item.detail), Style::default().fg(Color::DarkGray)),
                ]))
            })
            .collect();
        Paragraph::new(lines).render(list, buf);
    }
}

/// Whichever dialog is currently on top.
#[derive(Debug, Clone)]
pub enum Modal {
    Confirm(ConfirmationModal),
    CellValue(CellValueModal),
    Input(InputModal),
    Picker(PickerModal),
}

impl Modal {
    pub fn handle_key(&mut self, key: KeyEvent) -> ModalAction {
        match self {
            Self::Confirm(m) => m.handle_key(key),
            Self::CellValue(m) => m.handle_key(key),
            Self::Input(m) => m.handle_key(key),
            Self::Picker(m) => m.handle_key(key),
        }
    }
}

impl Widget for &Modal {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self {
            Modal::Confirm(m) => m.render(area, buf),
            Modal::CellValue(m) => m.render(area, buf),
            Modal::Input(m) => m.render(area, buf),
            Modal::Picker(m) => m.render(area, buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::from(code)
    }

    #[test]
    fn confirmation_answers() {
        let mut modal = ConfirmationModal::new("Drop", "Drop table?");
        assert_eq!(modal.handle_key(key(KeyCode::Enter)), ModalAction::Submit);
        modal.toggle_button();
        assert_eq!(modal.handle_key(key(KeyCode::Enter)), ModalAction::Cancel);
        assert_eq!(modal.handle_key(key(KeyCode::Char('y'))), ModalAction::Submit);
        assert_eq!(modal.handle_key(key(KeyCode::Esc)), ModalAction::Cancel);
    }

    #[test]
    fn required_input_blocks_empty_submit() {
        let mut modal = InputModal::new("Add Connection", "Host").required();
        assert_eq!(modal.handle_key(key(KeyCode::Enter)), ModalAction::None);
        assert!(modal.error().is_some());

        modal.handle_key(key(KeyCode::Char('h')));
        assert!(modal.error().is_none());
        assert_eq!(modal.handle_key(key(KeyCode::Enter)), ModalAction::Submit);
        assert_eq!(modal.value(), "h");
    }

    #[test]
    fn picker_filters_by_label_or_detail() {
        let mut picker = PickerModal::new(
            "Open Table",
            vec![
                PickerItem {
                    label: "orders".to_string(),
                    detail: "customer orders".to_string(),
                },
                PickerItem {
                    label: "users".to_string(),
                    detail: "accounts".to_string(),
                },
                PickerItem {
                    label: "audit".to_string(),
                    detail: "User actions".to_string(),
                },
            ],
        );
        assert_eq!(picker.matches(), vec![0, 1, 2]);

        for c in "user".chars() {
            picker.handle_key(key(KeyCode::Char(c)));
        }
        assert_eq!(picker.matches(), vec![1, 2]);
        picker.handle_key(key(KeyCode::Down));
        assert_eq!(picker.selected_item(), Some(2));
        assert_eq!(picker.handle_key(key(KeyCode::Enter)), ModalAction::Submit);

        for c in "zzz".chars() {
            picker.handle_key(key(KeyCode::Char(c)));
        }
        assert_eq!(picker.handle_key(key(KeyCode::Enter)), ModalAction::None);
    }
}
