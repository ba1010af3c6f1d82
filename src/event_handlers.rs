use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use miq_ui::{CellValueModal, InputModal, Modal, ModalAction, ResultPanel};
use ratatui_textarea::Input;

use crate::{
    app::{App, Output},
    app_state::Focus,
    commands::{Command, PanelMessage, Prompt},
};

const PAGE_SCROLL: u16 = 10;

impl App<'_> {
    /// Reads the crossterm events and updates the state of [`App`].
    pub async fn handle_crossterm_events(&mut self) -> Result<()> {
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                self.on_key_event(key).await?;
            }
            Event::Paste(text) => {
                if self.focus == Focus::Editor && self.modal.is_none() {
                    self.editor.insert_str(&text);
                }
            }
            Event::Key(_) => {} // Ignore non-press key events
            Event::FocusGained => {}
            Event::FocusLost => {}
            Event::Mouse(_) => {}
            Event::Resize(_, _) => {} // Terminal resize is handled automatically by ratatui
        }

        Ok(())
    }

    /// Handles the key events and updates the state of [`App`].
    pub async fn on_key_event(&mut self, key: KeyEvent) -> Result<()> {
        // Modals swallow every key until answered
        if let Some((mut modal, prompt)) = self.modal.take() {
            match modal.handle_key(key) {
                ModalAction::None => self.modal = Some((modal, prompt)),
                ModalAction::Cancel => {}
                ModalAction::Submit => self.submit_prompt(modal, prompt).await,
            }
            return Ok(());
        }

        if let Some((target, mut input)) = self.filter_edit.take() {
            match (key.modifiers, key.code) {
                (_, KeyCode::Esc) => {}
                (_, KeyCode::Enter) => {
                    if target.apply(&mut self.filters, input.text()) {
                        self.refresh_tree().await;
                    }
                }
                _ => {
                    input.handle_key(key);
                    self.filter_edit = Some((target, input));
                }
            }
            return Ok(());
        }

        if self.show_help {
            self.show_help = false;
            return Ok(());
        }

        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                self.quit();
                return Ok(());
            }
            (_, KeyCode::Tab) => {
                self.focus = self.focus.next();
                return Ok(());
            }
            _ => {}
        }

        match self.focus {
            Focus::Tree => self.on_tree_key(key).await,
            Focus::Editor => self.on_editor_key(key).await,
            Focus::Results => self.on_output_key(key).await,
        }
        Ok(())
    }

    fn selected_context(&self) -> &'static str {
        self.explorer
            .selected()
            .map_or("", |entry| entry.item.context)
    }

    async fn on_tree_key(&mut self, key: KeyEvent) {
        let context = self.selected_context();
        let command = match (key.modifiers, key.code) {
            (_, KeyCode::Char('q')) => {
                self.quit();
                None
            }
            (_, KeyCode::Char('j') | KeyCode::Down) => {
                self.explorer.select_next();
                None
            }
            (_, KeyCode::Char('k') | KeyCode::Up) => {
                self.explorer.select_previous();
                None
            }
            (_, KeyCode::Char('g') | KeyCode::Home) => {
                self.explorer.select_first();
                None
            }
            (_, KeyCode::Char('G') | KeyCode::End) => {
                self.explorer.select_last();
                None
            }
            (_, KeyCode::Char('l') | KeyCode::Right) => {
                self.expand_selected().await;
                None
            }
            (_, KeyCode::Char('h') | KeyCode::Left) => {
                self.explorer.collapse_selected();
                None
            }
            (_, KeyCode::Enter) => {
                self.toggle_selected().await;
                None
            }
            (_, KeyCode::Char('?')) => {
                self.show_help = true;
                None
            }
            (_, KeyCode::Char('a')) => Some(Command::AddConnection),
            (_, KeyCode::Char('e')) => Some(Command::RenameConnection),
            (_, KeyCode::Char('D')) => Some(match context {
                "connection" => Command::DeleteConnection,
                "column" => Command::DropColumn,
                _ => Command::DropTable,
            }),
            (_, KeyCode::Char('n')) => Some(Command::NewQuery),
            (_, KeyCode::Char('s')) => Some(Command::SelectDatabase),
            (_, KeyCode::Char('t')) => Some(if context == "column" {
                Command::SelectColumn
            } else {
                Command::SelectTopRows
            }),
            (_, KeyCode::Char('f')) => Some(Command::FilterByColumnValue),
            (_, KeyCode::Char('y')) => Some(if context == "column" {
                Command::CopyColumnName
            } else {
                Command::CopyTableName
            }),
            (_, KeyCode::Char('I')) => Some(Command::InsertColumnName),
            (_, KeyCode::Char('i')) => Some(Command::ShowTableStructure),
            (_, KeyCode::Char('o')) => Some(Command::OpenTable),
            (_, KeyCode::Char('C')) => Some(Command::CountTable),
            (_, KeyCode::Char('p')) => Some(if context == "pinnedTable" {
                Command::UnpinTable
            } else {
                Command::PinTable
            }),
            (_, KeyCode::Char('b')) => Some(Command::BackupTable),
            (_, KeyCode::Char('A')) => Some(Command::AddColumn),
            (_, KeyCode::Char('E')) => Some(Command::ExpandAll),
            (_, KeyCode::Char('W')) => Some(Command::CollapseAll),
            (_, KeyCode::Char('/')) => Some(Command::SetTableFilter),
            (_, KeyCode::Char(':')) => Some(Command::SetColumnFilter),
            (_, KeyCode::Char('x')) => Some(Command::ClearFilters),
            (_, KeyCode::Char('r')) => Some(Command::Refresh),
            _ => None,
        };
        if let Some(command) = command {
            self.dispatch(command).await;
        }
    }

    async fn on_editor_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc) => self.focus = Focus::Tree,
            (_, KeyCode::F(5)) => self.dispatch(Command::RunQuery).await,
            (_, KeyCode::F(6)) => self.dispatch(Command::RunAll).await,
            (_, KeyCode::F(4)) => self.dispatch(Command::ShowStructureAtCursor).await,
            _ => {
                self.editor.input(Input::from(key));
            }
        }
    }

    const fn panel(&self) -> Option<&ResultPanel> {
        match &self.output {
            Output::Results(panel) => Some(panel),
            Output::Empty | Output::Document { .. } => None,
        }
    }

    async fn on_output_key(&mut self, key: KeyEvent) {
        if self.panel().is_some_and(|panel| panel.sql_input().is_some()) {
            self.on_panel_sql_key(key).await;
            return;
        }
        if key.code == KeyCode::Esc {
            self.focus = Focus::Tree;
            return;
        }
        if self.panel().is_some() {
            self.on_results_key(key).await;
            return;
        }
        if let Output::Document { scroll, .. } = &mut self.output {
            match (key.modifiers, key.code) {
                (_, KeyCode::Char('j') | KeyCode::Down) => *scroll = scroll.saturating_add(1),
                (_, KeyCode::Char('k') | KeyCode::Up) => *scroll = scroll.saturating_sub(1),
                (_, KeyCode::PageDown | KeyCode::Char(' ')) => {
                    *scroll = scroll.saturating_add(PAGE_SCROLL);
                }
                (_, KeyCode::PageUp) => *scroll = scroll.saturating_sub(PAGE_SCROLL),
                (_, KeyCode::Char('g') | KeyCode::Home) => *scroll = 0,
                _ => {}
            }
        }
    }

    /// Typing into the result panel's own SQL line.
    async fn on_panel_sql_key(&mut self, key: KeyEvent) {
        let Output::Results(panel) = &mut self.output else {
            return;
        };
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc) => {
                panel.finish_sql_edit();
            }
            (_, KeyCode::Enter) => {
                if let Some(sql) = panel.finish_sql_edit() {
                    self.dispatch(Command::Panel(PanelMessage::RunQuery(sql))).await;
                }
            }
            _ => {
                if let Some(input) = panel.sql_input_mut() {
                    input.handle_key(key);
                }
            }
        }
    }

    async fn on_results_key(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (_, KeyCode::Char('/')) => {
                let Some(panel) = self.panel() else { return };
                let column = panel.selected_column();
                let Some(header) = panel.selected_header().map(str::to_string) else {
                    return;
                };
                let modal = InputModal::new(
                    "Filter Column",
                    format!("Show rows where '{header}' contains"),
                )
                .with_value(panel.filter(column).unwrap_or_default());
                self.open_modal(Modal::Input(modal), Prompt::ResultFilter { column });
            }
            (_, KeyCode::Enter) => {
                let Some((column, value)) = self
                    .panel()
                    .and_then(ResultPanel::selected_value)
                    .map(|(c, v)| (c.to_string(), v.to_string()))
                else {
                    return;
                };
                self.open_modal(
                    Modal::CellValue(CellValueModal::new(column, value)),
                    Prompt::Dismiss,
                );
            }
            (_, KeyCode::Char('y')) => {
                if let Some(header) = self
                    .panel()
                    .and_then(ResultPanel::selected_header)
                    .map(str::to_string)
                {
                    self.copy_to_clipboard(&header);
                }
            }
            (_, KeyCode::Char('i')) => {
                if let Some(header) = self
                    .panel()
                    .and_then(ResultPanel::selected_header)
                    .map(str::to_string)
                {
                    self.dispatch(Command::Panel(PanelMessage::InsertText(header)))
                        .await;
                }
            }
            (_, KeyCode::Char('x')) => {
                self.dispatch(Command::Panel(PanelMessage::ClearFilter)).await;
            }
            (_, KeyCode::Char('r')) => {
                if let Some(sql) = self.panel().map(|panel| panel.sql.clone()) {
                    self.dispatch(Command::Panel(PanelMessage::RunQuery(sql))).await;
                }
            }
            (_, KeyCode::Char('e')) => {
                if let Output::Results(panel) = &mut self.output {
                    panel.start_sql_edit();
                }
            }
            _ => {
                if let Output::Results(panel) = &mut self.output {
                    navigate(panel, key);
                }
            }
        }
    }
}

/// Keys that only move around inside the grid.
fn navigate(panel: &mut ResultPanel, key: KeyEvent) {
    match (key.modifiers, key.code) {
        (_, KeyCode::Char('j') | KeyCode::Down) => panel.move_down(),
        (_, KeyCode::Char('k') | KeyCode::Up) => panel.move_up(),
        (_, KeyCode::Char('h') | KeyCode::Left) => panel.move_left(),
        (_, KeyCode::Char('l') | KeyCode::Right) => panel.move_right(),
        (_, KeyCode::Char(']') | KeyCode::PageDown) => panel.next_page(),
        (_, KeyCode::Char('[') | KeyCode::PageUp) => panel.prev_page(),
        (_, KeyCode::Char('}')) => panel.next_set(),
        (_, KeyCode::Char('{')) => panel.prev_set(),
        _ => {}
    }
}
