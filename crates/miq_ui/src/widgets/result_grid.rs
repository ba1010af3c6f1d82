use miq_db::{QueryOutput, ResultSet, StatementResult};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Widget, Wrap},
};

use super::text_input::TextInput;
use crate::display::{MAX_CELL_WIDTH, display_width, truncate_display};

const NULL_TEXT: &str = "NULL";

/// State of the result panel: the SQL that produced it, every row set,
/// per-column filters, pagination and the selected cell.
#[derive(Debug, Clone, Default)]
pub struct ResultPanel {
    pub sql: String,
    /// Database and table the SQL was resolved against; re-runs reuse them.
    pub database: Option<String>,
    pub table: Option<String>,
    pub total: Option<u64>,
    pub error: Option<String>,
    /// SQL being edited in the panel's own input line
    sql_input: Option<TextInput>,
    sets: Vec<ResultSet>,
    messages: Vec<String>,
    active_set: usize,
    filters: Vec<String>,
    page: usize,
    page_size: usize,
    selected_row: usize,
    selected_col: usize,
    column_offset: usize,
}

impl ResultPanel {
    #[must_use]
    pub fn new(sql: impl Into<String>, page_size: usize) -> Self {
        Self {
            sql: sql.into(),
            page_size: page_size.max(1),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_context(mut self, database: Option<String>, table: Option<String>) -> Self {
        self.database = database;
        self.table = table;
        self
    }

    /// Replace the contents with a new execution, keeping the panel itself.
    pub fn set_output(&mut self, output: QueryOutput, total: Option<u64>) {
        self.sets.clear();
        self.messages.clear();
        for statement in output.statements {
            match statement {
                StatementResult::Rows(set) => self.sets.push(set),
                StatementResult::Affected {
                    rows_affected,
                    last_insert_id,
                } => {
                    let mut message = format!("{rows_affected} row(s) affected");
                    if last_insert_id > 0 {
                        message.push_str(&format!(", last insert id {last_insert_id}"));
                    }
                    self.messages.push(message);
                }
            }
        }
        self.error = output.error;
        self.total = total;
        self.active_set = 0;
        self.reset_view();
    }

    fn reset_view(&mut self) {
        self.filters = vec![String::new(); self.columns().len()];
        self.page = 0;
        self.selected_row = 0;
        self.selected_col = 0;
        self.column_offset = 0;
    }

    #[must_use]
    pub fn active_set(&self) -> Option<&ResultSet> {
        self.sets.get(self.active_set)
    }

    #[must_use]
    pub const fn active_set_index(&self) -> usize {
        self.active_set
    }

    #[must_use]
    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn next_set(&mut self) {
        if self.active_set + 1 < self.sets.len() {
            self.active_set += 1;
            self.reset_view();
        }
    }

    pub fn prev_set(&mut self) {
        if self.active_set > 0 {
            self.active_set -= 1;
            self.reset_view();
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        self.active_set().map_or(&[], |s| s.columns.as_slice())
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 0;
        self.selected_row = 0;
    }

    /// Filter one column by case-insensitive substring. Empty clears it.
    pub fn set_filter(&mut self, column: usize, value: &str) {
        if let Some(filter) = self.filters.get_mut(column) {
            *filter = value.trim().to_string();
        }
        self.page = 0;
        self.selected_row = 0;
    }

    pub fn clear_filters(&mut self) {
        self.filters.iter_mut().for_each(String::clear);
        self.page = 0;
        self.selected_row = 0;
    }

    #[must_use]
    pub fn filter(&self, column: usize) -> Option<&str> {
        self.filters.get(column).map(String::as_str)
    }

    #[must_use]
    pub fn has_filters(&self) -> bool {
        self.filters.iter().any(|f| !f.is_empty())
    }

    /// Rows of the active set passing every column filter.
    #[must_use]
    pub fn filtered_rows(&self) -> Vec<&[Option<String>]> {
        let Some(set) = self.active_set() else {
            return Vec::new();
        };
        let filters: Vec<(usize, String)> = self
            .filters
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.is_empty())
            .map(|(i, f)| (i, f.to_lowercase()))
            .collect();
        set.rows
            .iter()
            .filter(|row| {
                filters.iter().all(|(i, needle)| {
                    let value = row.get(*i).and_then(Option::as_deref).unwrap_or(NULL_TEXT);
                    value.to_lowercase().contains(needle)
                })
            })
            .map(Vec::as_slice)
            .collect()
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.filtered_rows().len().div_ceil(self.page_size).max(1)
    }

    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    #[must_use]
    pub fn page_rows(&self) -> Vec<&[Option<String>]> {
        self.filtered_rows()
            .into_iter()
            .skip(self.page * self.page_size)
            .take(self.page_size)
            .collect()
    }

    pub fn next_page(&mut self) {
        if self.page + 1 < self.page_count() {
            self.page += 1;
            self.selected_row = 0;
        }
    }

    pub fn prev_page(&mut self) {
        if self.page > 0 {
            self.page -= 1;
            self.selected_row = 0;
        }
    }

    pub fn move_down(&mut self) {
        if self.selected_row + 1 < self.page_rows().len() {
            self.selected_row += 1;
        }
    }

    pub const fn move_up(&mut self) {
        self.selected_row = self.selected_row.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.selected_col + 1 < self.columns().len() {
            self.selected_col += 1;
        }
    }

    pub const fn move_left(&mut self) {
        self.selected_col = self.selected_col.saturating_sub(1);
    }

    #[must_use]
    pub const fn selected(&self) -> (usize, usize) {
        (self.selected_row, self.selected_col)
    }

    #[must_use]
    pub const fn selected_column(&self) -> usize {
        self.selected_col
    }

    #[must_use]
    pub fn selected_header(&self) -> Option<&str> {
        self.columns().get(self.selected_col).map(String::as_str)
    }

    /// Column name and untruncated value of the selected cell.
    #[must_use]
    pub fn selected_value(&self) -> Option<(&str, &str)> {
        let header = self.selected_header()?;
        let rows = self.page_rows();
        let value = rows
            .get(self.selected_row)?
            .get(self.selected_col)?
            .as_deref()
            .unwrap_or(NULL_TEXT);
        Some((header, value))
    }

    /// Open the SQL line for editing, starting from the current SQL.
    pub fn start_sql_edit(&mut self) {
        self.sql_input = Some(TextInput::with_text(self.sql.trim()));
    }

    #[must_use]
    pub const fn sql_input(&self) -> Option<&TextInput> {
        self.sql_input.as_ref()
    }

    pub const fn sql_input_mut(&mut self) -> Option<&mut TextInput> {
        self.sql_input.as_mut()
    }

    /// Close the SQL line and hand back what was typed.
    pub fn finish_sql_edit(&mut self) -> Option<String> {
        self.sql_input.take().map(|input| input.text().to_string())
    }

    /// `sql  (total N rows)` when a count is known.
    #[must_use]
    pub fn header_line(&self) -> String {
        match self.total {
            Some(total) => format!("{}  (total {total} rows)", self.sql.trim()),
            None => self.sql.trim().to_string(),
        }
    }

    /// Display width of every column of the active set, capped.
    fn column_widths(&self) -> Vec<u16> {
        let columns = self.columns();
        let mut widths: Vec<usize> = columns.iter().map(|c| display_width(c)).collect();
        for row in self.page_rows() {
            for (width, value) in widths.iter_mut().zip(row) {
                let w = display_width(value.as_deref().unwrap_or(NULL_TEXT));
                *width = (*width).max(w);
            }
        }
        widths
            .into_iter()
            .map(|w| u16::try_from(w.min(MAX_CELL_WIDTH)).unwrap_or(0))
            .collect()
    }

    /// Keep the selected column within the horizontally visible window.
    fn visible_columns(&self, widths: &[u16], area_width: u16) -> Vec<usize> {
        let fits = |offset: usize| {
            let mut used = 0u16;
            let mut visible = Vec::new();
            for (idx, &len) in widths.iter().enumerate().skip(offset) {
                let w = len.saturating_add(1);
                if used.saturating_add(w) > area_width && !visible.is_empty() {
                    break;
                }
                used = used.saturating_add(w);
                visible.push(idx);
            }
            visible
        };

        let mut offset = self.column_offset.min(self.selected_col);
        let mut visible = fits(offset);
        while !visible.contains(&self.selected_col) && offset < self.selected_col {
            offset += 1;
            visible = fits(offset);
        }
        visible
    }

    pub fn scroll_to_selection(&mut self, area_width: u16) {
        let widths = self.column_widths();
        if let Some(&first) = self.visible_columns(&widths, area_width).first() {
            self.column_offset = first;
        }
    }
}

/// Renders a [`ResultPanel`].
pub struct ResultGridView<'a> {
    pub panel: &'a ResultPanel,
    pub focused: bool,
}

impl Widget for ResultGridView<'_> {
    fn render(self, area: Rect, buf: &mut ratatui::buffer::Buffer) {
        let panel = self.panel;
        let border = if self.focused { Color::Cyan } else { Color::DarkGray };
        let block = Block::new()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(" Results ");
        let inner = block.inner(area);
        block.render(area, buf);

        let [header, filters, body, footer] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .areas(inner);

        match panel.sql_input() {
            Some(input) => {
                let mut line = input.cursor_line();
                line.spans.insert(0, Span::styled("SQL> ", Style::default().fg(Color::Cyan)));
                Paragraph::new(line).render(header, buf);
            }
            None => Paragraph::new(panel.header_line())
                .style(Style::default().fg(Color::Green))
                .render(header, buf),
        }

        let active_filters: Vec<Span> = panel
            .columns()
            .iter()
            .enumerate()
            .filter_map(|(i, c)| {
                let f = panel.filter(i).filter(|f| !f.is_empty())?;
                Some(Span::styled(format!("{c} ~ {f}  "), Style::default().fg(Color::Yellow)))
            })
            .collect();
        Line::from(active_filters).render(filters, buf);

        if panel.active_set().is_none() {
            let mut lines: Vec<Line> = panel
                .messages()
                .iter()
                .map(|m| Line::from(m.as_str()))
                .collect();
            if let Some(error) = &panel.error {
                lines.push(Line::styled(error.as_str(), Style::default().fg(Color::Red)));
            }
            if lines.is_empty() {
                lines.push(Line::from("No rows returned"));
            }
            Paragraph::new(lines).wrap(Wrap { trim: false }).render(body, buf);
            return;
        }

        let widths = panel.column_widths();
        let visible = panel.visible_columns(&widths, body.width);
        let (selected_row, selected_col) = panel.selected();
        let columns = panel.columns();

        let header_row = visible
            .iter()
            .map(|&i| {
                let name = columns.get(i).map_or("", String::as_str);
                let style = if i == selected_col {
                    Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
                } else {
                    Style::default().add_modifier(Modifier::BOLD)
                };
                Cell::from(truncate_display(name)).style(style)
            })
            .collect::<Row>();

        let page_rows = panel.page_rows();
        let rows = page_rows.iter().enumerate().map(|(r, row)| {
            visible
                .iter()
                .map(|&i| {
                    let value = row.get(i).and_then(Option::as_deref);
                    let text = truncate_display(value.unwrap_or(NULL_TEXT));
                    let mut style = if value.is_none() {
                        Style::default().fg(Color::DarkGray)
                    } else {
                        Style::default()
                    };
                    if self.focused && r == selected_row && i == selected_col {
                        style = style.add_modifier(Modifier::REVERSED);
                    } else if r == selected_row {
                        style = style.bg(Color::Rgb(40, 40, 40));
                    }
                    Cell::from(text).style(style)
                })
                .collect::<Row>()
        });

        let constraints = visible
            .iter()
            .map(|&i| Constraint::Length(widths.get(i).copied().unwrap_or(1).max(1)));
        Table::new(rows, constraints)
            .header(header_row)
            .column_spacing(1)
            .render(body, buf);

        let filtered = panel.filtered_rows().len();
        let first = panel.page() * panel.page_size();
        let mut status = format!(
            "page {}/{}  rows {}-{} of {}",
            panel.page() + 1,
            panel.page_count(),
            if filtered == 0 { 0 } else { first + 1 },
            (first + page_rows.len()),
            filtered
        );
        if panel.set_count() > 1 {
            status.push_str(&format!(
                "  result {}/{}",
                panel.active_set_index() + 1,
                panel.set_count()
            ));
        }
        if let Some(error) = &panel.error {
            status.push_str(&format!("  error: {error}"));
        }
        Paragraph::new(status)
            .style(Style::default().fg(Color::DarkGray))
            .render(footer, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(rows: usize) -> QueryOutput {
        QueryOutput {
            statements: vec![StatementResult::Rows(ResultSet {
                columns: vec!["id".to_string(), "name".to_string()],
                rows: (0..rows)
                    .map(|i| {
                        vec![
                            Some(i.to_string()),
                            if i % 2 == 0 { Some(format!("User{i}")) } else { None },
                        ]
                    })
                    .collect(),
            })],
            error: None,
        }
    }

    #[test]
    fn sql_line_edits_a_copy_of_the_sql() {
        let mut panel = ResultPanel::new("SELECT * FROM t ", 10);
        assert!(panel.sql_input().is_none());

        panel.start_sql_edit();
        let input = panel.sql_input_mut().unwrap();
        assert_eq!(input.text(), "SELECT * FROM t");
        input.delete_char();
        input.add_char('u');

        assert_eq!(panel.sql, "SELECT * FROM t ");
        assert_eq!(panel.finish_sql_edit().as_deref(), Some("SELECT * FROM u"));
        assert!(panel.sql_input().is_none());
        assert_eq!(panel.finish_sql_edit(), None);
    }

    #[test]
    fn paginates_by_page_size() {
        let mut panel = ResultPanel::new("SELECT * FROM t", 10);
        panel.set_output(output(25), Some(1000));

        assert_eq!(panel.page_count(), 3);
        assert_eq!(panel.page_rows().len(), 10);
        panel.next_page();
        panel.next_page();
        assert_eq!(panel.page_rows().len(), 5);
        panel.next_page();
        assert_eq!(panel.page(), 2);
        assert_eq!(panel.header_line(), "SELECT * FROM t  (total 1000 rows)");
    }

    #[test]
    fn column_filters_are_case_insensitive_and_combine() {
        let mut panel = ResultPanel::new("SELECT * FROM t", 100);
        panel.set_output(output(20), None);

        panel.set_filter(1, "user1");
        let names: Vec<_> = panel
            .filtered_rows()
            .iter()
            .filter_map(|r| r.get(1).cloned().flatten())
            .collect();
        assert_eq!(names, vec!["User10", "User12", "User14", "User16", "User18"]);

        panel.set_filter(0, "4");
        assert_eq!(panel.filtered_rows().len(), 1);

        panel.set_filter(1, "null");
        panel.set_filter(0, "");
        assert_eq!(panel.filtered_rows().len(), 10);

        panel.clear_filters();
        assert!(!panel.has_filters());
        assert_eq!(panel.filtered_rows().len(), 20);
    }

    #[test]
    fn selected_value_is_untruncated() {
        let long = "x".repeat(80);
        let mut panel = ResultPanel::new("SELECT note FROM t", 100);
        panel.set_output(
            QueryOutput {
                statements: vec![StatementResult::Rows(ResultSet {
                    columns: vec!["note".to_string()],
                    rows: vec![vec![Some(long.clone())]],
                })],
                error: None,
            },
            None,
        );
        assert_eq!(panel.selected_value(), Some(("note", long.as_str())));
        assert_eq!(panel.selected_header(), Some("note"));
    }

    #[test]
    fn multiple_sets_and_messages() {
        let mut panel = ResultPanel::new("UPDATE t SET a = 1; SELECT 1; SELECT 2", 100);
        panel.set_output(
            QueryOutput {
                statements: vec![
                    StatementResult::Affected {
                        rows_affected: 3,
                        last_insert_id: 0,
                    },
                    StatementResult::Rows(ResultSet {
                        columns: vec!["1".to_string()],
                        rows: vec![vec![Some("1".to_string())]],
                    }),
                    StatementResult::Rows(ResultSet {
                        columns: vec!["2".to_string(), "x".to_string()],
                        rows: vec![],
                    }),
                ],
                error: Some("boom".to_string()),
            },
            None,
        );
        assert_eq!(panel.messages(), ["3 row(s) affected"]);
        assert_eq!(panel.set_count(), 2);
        panel.next_set();
        assert_eq!(panel.columns().len(), 2);
        panel.next_set();
        assert_eq!(panel.active_set_index(), 1);
        panel.prev_set();
        assert_eq!(panel.active_set_index(), 0);
        assert_eq!(panel.error.as_deref(), Some("boom"));
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut panel = ResultPanel::new("SELECT * FROM t", 2);
        panel.set_output(output(3), None);
        panel.move_down();
        panel.move_down();
        assert_eq!(panel.selected(), (1, 0));
        panel.move_right();
        panel.move_right();
        assert_eq!(panel.selected(), (1, 1));
        panel.next_page();
        assert_eq!(panel.selected(), (0, 1));
        assert_eq!(panel.selected_value(), Some(("name", "User2")));
    }

    #[test]
    fn horizontal_window_follows_selection() {
        let mut panel = ResultPanel::new("SELECT", 10);
        panel.set_output(
            QueryOutput {
                statements: vec![StatementResult::Rows(ResultSet {
                    columns: (0..6).map(|i| format!("column_{i:02}")).collect(),
                    rows: vec![],
                })],
                error: None,
            },
            None,
        );
        for _ in 0..5 {
            panel.move_right();
        }
        let widths = panel.column_widths();
        let visible = panel.visible_columns(&widths, 30);
        assert!(visible.contains(&5));
        assert!(!visible.contains(&0));
    }
}
