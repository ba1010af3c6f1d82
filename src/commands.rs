//! Everything the user can ask for, and the prompts some commands need
//! before they can run.

use chrono::Local;
use miq_db::{ConnectionOptions, NewConnection, Table, metadata, sql};
use miq_ui::{ConfirmationModal, InputModal, Modal, PickerItem, PickerModal, report};

use crate::{
    app::{App, Output},
    app_state::Focus,
    filter_state::FilterState,
    query_runner::{self, QueryRun, RunError},
    tree::TreeNode,
};

const EXPAND_WARNING: &str = "Expanding or collapsing every node re-queries the whole tree \
     and can be slow when no filter is set. Continue?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddConnection,
    DeleteConnection,
    RenameConnection,
    NewQuery,
    /// Run the editor selection, or the whole editor, as a browsing query
    RunQuery,
    /// Run the whole editor as a script
    RunAll,
    SelectDatabase,
    Refresh,
    SelectTopRows,
    SelectColumn,
    FilterByColumnValue,
    CopyTableName,
    CopyColumnName,
    InsertColumnName,
    ShowTableStructure,
    ShowStructureAtCursor,
    OpenTable,
    CountTable,
    PinTable,
    UnpinTable,
    DropTable,
    BackupTable,
    AddColumn,
    DropColumn,
    ExpandAll,
    CollapseAll,
    SetTableFilter,
    SetColumnFilter,
    ClearFilters,
    Panel(PanelMessage),
}

/// Requests coming from the result panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelMessage {
    UpdateFilter { column: usize, value: String },
    ClearFilter,
    /// Run this SQL again in the same panel, usually edited in the panel's own line
    RunQuery(String),
    InsertText(String),
}

/// Steps of the add-connection prompt sequence, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddStep {
    DisplayName,
    Host,
    User,
    Password,
    Port,
    CertPath,
}

impl AddStep {
    const fn next(self) -> Option<Self> {
        match self {
            Self::DisplayName => Some(Self::Host),
            Self::Host => Some(Self::User),
            Self::User => Some(Self::Password),
            Self::Password => Some(Self::Port),
            Self::Port => Some(Self::CertPath),
            Self::CertPath => None,
        }
    }

    const fn position(self) -> usize {
        match self {
            Self::DisplayName => 1,
            Self::Host => 2,
            Self::User => 3,
            Self::Password => 4,
            Self::Port => 5,
            Self::CertPath => 6,
        }
    }

    fn modal(self, draft: &NewConnection) -> InputModal {
        let title = format!("Add Connection ({}/6)", self.position());
        match self {
            Self::DisplayName => InputModal::new(title, "Display name (optional)")
                .with_value(draft.display_name.clone()),
            Self::Host => InputModal::new(title, "Host")
                .with_value(if draft.host.is_empty() { "127.0.0.1" } else { draft.host.as_str() })
                .required(),
            Self::User => InputModal::new(title, "User")
                .with_value(if draft.user.is_empty() { "root" } else { draft.user.as_str() })
                .required(),
            Self::Password => InputModal::new(title, "Password").masked(),
            Self::Port => InputModal::new(title, "Port").with_value(if draft.port.is_empty() {
                miq_db::DEFAULT_PORT.to_string()
            } else {
                draft.port.clone()
            }),
            Self::CertPath => InputModal::new(title, "CA certificate path (optional)")
                .with_value(draft.cert_path.clone()),
        }
    }

    fn store(self, draft: &mut NewConnection, value: &str) {
        let slot = match self {
            Self::DisplayName => &mut draft.display_name,
            Self::Host => &mut draft.host,
            Self::User => &mut draft.user,
            Self::Password => &mut draft.password,
            Self::Port => &mut draft.port,
            Self::CertPath => &mut draft.cert_path,
        };
        if self == Self::Password {
            value.clone_into(slot);
        } else {
            value.trim().clone_into(slot);
        }
    }
}

/// What to do once the open modal is answered.
#[derive(Debug, Clone)]
pub enum Prompt {
    AddConnection { draft: NewConnection, step: AddStep },
    DeleteConnection { id: String, label: String },
    RenameConnection { id: String },
    FilterByValue { node: TreeNode },
    DropTable { node: TreeNode },
    AddColumn {
        node: TreeNode,
        name: Option<String>,
        definition: Option<String>,
    },
    SetAllExpanded(bool),
    OpenTable {
        options: ConnectionOptions,
        database: String,
        tables: Vec<Table>,
    },
    ResultFilter { column: usize },
    /// Informational modal, nothing to do on close
    Dismiss,
}

/// Which tree filter the filter bar is editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTarget {
    Tables,
    Columns,
}

impl FilterTarget {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Tables => "Table filter",
            Self::Columns => "Column filter",
        }
    }

    /// Returns whether the filter changed.
    pub fn apply(self, filters: &mut FilterState, value: &str) -> bool {
        match self {
            Self::Tables => filters.set_table_filter(value),
            Self::Columns => filters.set_column_filter(value),
        }
    }

    #[must_use]
    pub fn current(self, filters: &FilterState) -> &str {
        match self {
            Self::Tables => filters.table_filter(),
            Self::Columns => filters.column_filter(),
        }
    }
}

/// Text of an editor selection, given as `(row, col)` char positions with
/// the end exclusive.
#[must_use]
pub fn selected_text(lines: &[String], start: (usize, usize), end: (usize, usize)) -> String {
    let (start, end) = if start <= end { (start, end) } else { (end, start) };
    let mut out = String::new();
    for (row, line) in lines.iter().enumerate().skip(start.0).take(end.0 + 1 - start.0) {
        let from = if row == start.0 { start.1 } else { 0 };
        let to = if row == end.0 { end.1 } else { usize::MAX };
        if row > start.0 {
            out.push('\n');
        }
        out.extend(line.chars().skip(from).take(to.saturating_sub(from)));
    }
    out
}

/// The `db.table`-like word around char position `col`.
#[must_use]
pub fn word_at(line: &str, col: usize) -> Option<String> {
    let is_word = |c: char| c.is_alphanumeric() || matches!(c, '_' | '.' | '`');
    let chars: Vec<char> = line.chars().collect();
    let col = col.min(chars.len());
    let start = chars
        .get(..col)?
        .iter()
        .rposition(|c| !is_word(*c))
        .map_or(0, |i| i + 1);
    let end = chars
        .get(col..)?
        .iter()
        .position(|c| !is_word(*c))
        .map_or(chars.len(), |i| col + i);
    let word: String = chars.get(start..end)?.iter().collect();
    (!word.trim_matches(['.', '`']).is_empty()).then_some(word)
}

/// Split `db.table` or `table` after removing backticks.
#[must_use]
pub fn split_table_name(text: &str) -> (Option<String>, String) {
    let name = text.trim().replace('`', "");
    match name.split_once('.') {
        Some((database, table)) => (Some(database.to_string()), table.to_string()),
        None => (None, name),
    }
}

impl App<'_> {
    pub async fn dispatch(&mut self, command: Command) {
        tracing::debug!(?command, "dispatch");
        match command {
            Command::AddConnection => {
                let draft = NewConnection::default();
                let step = AddStep::DisplayName;
                self.open_modal(Modal::Input(step.modal(&draft)), Prompt::AddConnection { draft, step });
            }
            Command::DeleteConnection => self.delete_connection(),
            Command::RenameConnection => self.rename_connection(),
            Command::NewQuery => self.new_query(),
            Command::RunQuery => self.run_editor().await,
            Command::RunAll => self.run_editor_script().await,
            Command::SelectDatabase => self.select_database(),
            Command::Refresh => {
                self.refresh_tree().await;
                self.status_line.set_message("Refreshed");
            }
            Command::SelectTopRows => self.select_top_rows().await,
            Command::SelectColumn => self.select_column().await,
            Command::FilterByColumnValue => {
                if let Some(node) = self.require_column() {
                    if let TreeNode::Column { column, .. } = &node {
                        let modal = InputModal::new(
                            "Filter",
                            format!(
                                "Enter filter value for column '{}' (type: {})",
                                column.name, column.column_type
                            ),
                        );
                        self.open_modal(Modal::Input(modal), Prompt::FilterByValue { node });
                    }
                }
            }
            Command::CopyTableName => {
                if let Some(table) = self.require_table().and_then(|n| n.table().map(str::to_string)) {
                    self.copy_to_clipboard(&table);
                }
            }
            Command::CopyColumnName => {
                if let Some(TreeNode::Column { column, .. }) = self.require_column() {
                    self.copy_to_clipboard(&column.name);
                }
            }
            Command::InsertColumnName => {
                if let Some(TreeNode::Column { column, .. }) = self.require_column() {
                    self.insert_into_editor(&column.name);
                }
            }
            Command::ShowTableStructure => {
                if let Some(node) = self.require_table()
                    && let (Some(options), Some(database), Some(table)) =
                        (node.options(), node.database(), node.table())
                {
                    self.show_structure(&options, database, table).await;
                }
            }
            Command::ShowStructureAtCursor => self.structure_at_cursor().await,
            Command::OpenTable => self.open_table_picker().await,
            Command::CountTable => self.count_table().await,
            Command::PinTable => self.set_pinned(true).await,
            Command::UnpinTable => self.set_pinned(false).await,
            Command::DropTable => {
                if let Some(node) = self.require_table()
                    && let (Some(database), Some(table)) = (node.database(), node.table())
                {
                    let message = format!(
                        "Are you sure you want to drop table `{database}`.`{table}`? This action cannot be undone."
                    );
                    self.open_modal(
                        Modal::Confirm(ConfirmationModal::new("Drop Table", message)),
                        Prompt::DropTable { node },
                    );
                }
            }
            Command::BackupTable => self.backup_table().await,
            Command::AddColumn => {
                if let Some(node) = self.require_table() {
                    let modal = InputModal::new("Add Column (1/3)", "Column name").required();
                    self.open_modal(
                        Modal::Input(modal),
                        Prompt::AddColumn {
                            node,
                            name: None,
                            definition: None,
                        },
                    );
                }
            }
            Command::DropColumn => self.drop_column(),
            Command::ExpandAll | Command::CollapseAll => {
                let expand = command == Command::ExpandAll;
                let title = if expand { "Expand All" } else { "Collapse All" };
                self.open_modal(
                    Modal::Confirm(ConfirmationModal::new(title, EXPAND_WARNING)),
                    Prompt::SetAllExpanded(expand),
                );
            }
            Command::SetTableFilter => self.start_filter_edit(FilterTarget::Tables),
            Command::SetColumnFilter => self.start_filter_edit(FilterTarget::Columns),
            Command::ClearFilters => {
                if self.filters.clear() {
                    self.refresh_tree().await;
                }
                self.status_line.set_message("Filters cleared");
            }
            Command::Panel(message) => self.on_panel_message(message).await,
        }
    }

    /// Act on an answered modal. Cancelling never reaches this.
    pub(crate) async fn submit_prompt(&mut self, modal: Modal, prompt: Prompt) {
        let value = match &modal {
            Modal::Input(input) => input.value().to_string(),
            Modal::Confirm(_) | Modal::CellValue(_) | Modal::Picker(_) => String::new(),
        };

        match prompt {
            Prompt::AddConnection { mut draft, step } => {
                step.store(&mut draft, &value);
                if let Some(next) = step.next() {
                    self.open_modal(
                        Modal::Input(next.modal(&draft)),
                        Prompt::AddConnection { draft, step: next },
                    );
                    return;
                }
                match self.registry.add(&draft) {
                    Ok(profile) => {
                        self.status_line
                            .set_message(format!("Added connection {}", profile.label()));
                        self.refresh_tree().await;
                    }
                    Err(e) => self.status_line.set_error(e.to_string()),
                }
            }
            Prompt::DeleteConnection { id, label } => match self.registry.delete(&id) {
                Ok(()) => {
                    self.status_line.set_message(format!("Deleted connection {label}"));
                    self.refresh_tree().await;
                }
                Err(e) => {
                    tracing::error!(id, error = %e, "failed to delete connection");
                    self.status_line.set_error(e.to_string());
                }
            },
            Prompt::RenameConnection { id } => match self.registry.rename(&id, &value) {
                Ok(()) => self.refresh_tree().await,
                Err(e) => self.status_line.set_error(e.to_string()),
            },
            Prompt::FilterByValue { node } => {
                if let TreeNode::Column {
                    database,
                    table,
                    column,
                    ..
                } = &node
                {
                    let built = sql::select_where(
                        database,
                        table,
                        &column.name,
                        &column.column_type,
                        &value,
                        self.config.default_limit,
                    );
                    self.run_for_node(&node, built).await;
                }
            }
            Prompt::DropTable { node } => self.drop_table(&node).await,
            Prompt::AddColumn {
                node,
                name,
                definition,
            } => self.add_column_step(node, name, definition, value).await,
            Prompt::SetAllExpanded(expanded) => {
                self.filters.set_all_expanded(expanded);
                self.refresh_tree().await;
            }
            Prompt::OpenTable {
                options,
                database,
                tables,
            } => {
                let picked = match &modal {
                    Modal::Picker(picker) => picker.selected_item().and_then(|i| tables.get(i)),
                    Modal::Confirm(_) | Modal::CellValue(_) | Modal::Input(_) => None,
                };
                if let Some(table) = picked {
                    self.show_structure(&options, &database, &table.name).await;
                }
            }
            Prompt::ResultFilter { column } => {
                self.on_panel_message(PanelMessage::UpdateFilter { column, value })
                    .await;
            }
            Prompt::Dismiss => {}
        }
    }

    pub(crate) async fn on_panel_message(&mut self, message: PanelMessage) {
        match message {
            PanelMessage::UpdateFilter { column, value } => {
                if let Output::Results(panel) = &mut self.output {
                    panel.set_filter(column, &value);
                }
            }
            PanelMessage::ClearFilter => {
                if let Output::Results(panel) = &mut self.output {
                    panel.clear_filters();
                }
            }
            PanelMessage::RunQuery(sql) => {
                let Output::Results(panel) = &self.output else {
                    return;
                };
                let (database, table) = (panel.database.clone(), panel.table.clone());
                let result = query_runner::run_query_with_total(
                    &*self.executor,
                    self.session.get(),
                    &sql,
                    database.as_deref(),
                    table.as_deref(),
                    self.settings,
                )
                .await;
                self.present(result, true);
            }
            PanelMessage::InsertText(text) => self.insert_into_editor(&text),
        }
    }

    fn delete_connection(&mut self) {
        let Some(TreeNode::Connection(profile)) =
            self.explorer.selected_connection().map(|e| e.node.clone())
        else {
            self.status_line.set_warning("Select a connection first");
            return;
        };
        let message = format!(
            "Are you sure you want to delete\nthe connection '{}'?\n\nThis action cannot be undone.",
            profile.label()
        );
        self.open_modal(
            Modal::Confirm(ConfirmationModal::new("Delete Connection", message)),
            Prompt::DeleteConnection {
                id: profile.id.clone(),
                label: profile.label().to_string(),
            },
        );
    }

    fn rename_connection(&mut self) {
        let Some(TreeNode::Connection(profile)) =
            self.explorer.selected_connection().map(|e| e.node.clone())
        else {
            self.status_line.set_warning("Select a connection first");
            return;
        };
        let modal = InputModal::new("Rename Connection", "Edit display name for this connection")
            .with_value(profile.display_name.clone().unwrap_or_default());
        self.open_modal(Modal::Input(modal), Prompt::RenameConnection { id: profile.id });
    }

    /// Connection options for the selected row, database included when the
    /// row sits below a database.
    fn selected_options(&mut self) -> Option<ConnectionOptions> {
        let node = self.explorer.selected().map(|e| e.node.clone())?;
        match node {
            TreeNode::Connection(profile) => match self.registry.options(&profile) {
                Ok(options) => Some(options),
                Err(e) => {
                    self.status_line.set_error(e.to_string());
                    None
                }
            },
            TreeNode::Database { .. } | TreeNode::Table { .. } | TreeNode::Column { .. } => {
                node.options()
            }
            TreeNode::Info { .. } => None,
        }
    }

    fn new_query(&mut self) {
        let Some(options) = self.selected_options() else {
            self.status_line.set_warning("Select a connection or database first");
            return;
        };
        self.session.set(options);
        self.set_editor_text("");
        self.focus = Focus::Editor;
        self.status_line
            .set_message(format!("New query on {}", self.session.label()));
    }

    fn select_database(&mut self) {
        let Some(node) = self.explorer.selected().map(|e| e.node.clone()) else {
            return;
        };
        match (node.options(), node.database()) {
            (Some(options), Some(database)) => {
                let message = format!("Database selected: {database}");
                self.session.set(options);
                self.status_line.set_message(message);
            }
            _ => self.status_line.set_warning("Select a database first"),
        }
    }

    fn editor_sql(&self) -> String {
        let lines = self.editor.lines();
        match self.editor.selection_range() {
            Some((start, end)) if start != end => selected_text(lines, start, end),
            _ => lines.join("\n"),
        }
    }

    async fn run_editor(&mut self) {
        let sql = self.editor_sql();
        let database = self.session.database().map(str::to_string);
        let result = query_runner::run_query_with_total(
            &*self.executor,
            self.session.get(),
            &sql,
            database.as_deref(),
            None,
            self.settings,
        )
        .await;
        self.present(result, false);
    }

    async fn run_editor_script(&mut self) {
        let sql = self.editor.lines().join("\n");
        let result =
            query_runner::run_query(&*self.executor, self.session.get(), &sql, self.settings).await;
        self.present(result, false);
    }

    async fn select_top_rows(&mut self) {
        let Some(node) = self.require_table() else {
            return;
        };
        let (Some(options), Some(database), Some(table)) =
            (node.options(), node.database(), node.table())
        else {
            return;
        };
        let sql = match sql::select_top(database, table, self.config.default_limit) {
            Ok(sql) => sql,
            Err(e) => {
                self.status_line.set_error(e.to_string());
                return;
            }
        };
        self.session.set(options);
        self.set_editor_text(&sql);
        let result = query_runner::run_query_with_total(
            &*self.executor,
            self.session.get(),
            &sql,
            Some(database),
            Some(table),
            self.settings,
        )
        .await;
        self.present(result, false);
    }

    async fn select_column(&mut self) {
        let Some(node) = self.require_column() else {
            return;
        };
        if let TreeNode::Column {
            database,
            table,
            column,
            ..
        } = &node
        {
            let built = sql::select_column(database, table, &column.name, self.config.default_limit);
            self.run_for_node(&node, built).await;
        }
    }

    /// Run generated SQL against the node's own connection.
    async fn run_for_node(&mut self, node: &TreeNode, built: miq_db::Result<String>) {
        let sql = match built {
            Ok(sql) => sql,
            Err(e) => {
                self.status_line.set_error(e.to_string());
                return;
            }
        };
        let options = node.options();
        let result =
            query_runner::run_query(&*self.executor, options.as_ref(), &sql, self.settings).await;
        self.present(result, false);
    }

    async fn structure_at_cursor(&mut self) {
        let text = match self.editor.selection_range() {
            Some((start, end)) if start != end => Some(selected_text(self.editor.lines(), start, end)),
            _ => {
                let (row, col) = self.editor.cursor();
                self.editor
                    .lines()
                    .get(row)
                    .and_then(|line| word_at(line, col))
            }
        };
        let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
            self.status_line.set_warning("Please select a table name");
            return;
        };
        let Some(options) = self.session.get().cloned() else {
            self.status_line
                .set_warning("No MySQL connection. Please select a database first.");
            return;
        };
        let (database, table) = split_table_name(&text);
        let Some(database) = database.or_else(|| options.database.clone()) else {
            self.status_line.set_warning(
                "Cannot determine database. Please select a database first or use format: database.table",
            );
            return;
        };
        let options = options.with_database(&database);
        self.show_structure(&options, &database, &table).await;
    }

    pub(crate) async fn show_structure(&mut self, options: &ConnectionOptions, database: &str, table: &str) {
        match metadata::table_structure(
            &*self.executor,
            options,
            database,
            table,
            self.config.sample_rows,
        )
        .await
        {
            Ok(structure) => {
                self.output = Output::Document {
                    title: format!("{database}.{table}"),
                    text: report::render_structure(&structure, self.config.sample_rows),
                    scroll: 0,
                };
                self.focus = Focus::Results;
            }
            Err(e) => {
                tracing::warn!(database, table, error = %e, "table structure failed");
                self.status_line.set_error(format!("Error: {e}"));
            }
        }
    }

    async fn open_table_picker(&mut self) {
        let Some(options) = self.session.get().cloned() else {
            self.status_line
                .set_warning("No MySQL database selected. Please select a database first.");
            return;
        };
        let Some(database) = options.database.clone() else {
            self.status_line
                .set_warning("No MySQL database selected. Please select a database first.");
            return;
        };
        match metadata::list_all_tables(&*self.executor, &options, &database).await {
            Ok(tables) if tables.is_empty() => {
                self.status_line.set_message("No tables found in current database.");
            }
            Ok(tables) => {
                let items = tables
                    .iter()
                    .map(|t| PickerItem {
                        label: t.name.clone(),
                        detail: t.comment.clone(),
                    })
                    .collect();
                self.open_modal(
                    Modal::Picker(PickerModal::new(format!("Open Table ({database})"), items)),
                    Prompt::OpenTable {
                        options,
                        database,
                        tables,
                    },
                );
            }
            Err(e) => self.status_line.set_error(format!("Error: {e}")),
        }
    }

    async fn count_table(&mut self) {
        let Some(node) = self.require_table() else {
            return;
        };
        let (Some(options), Some(database), Some(table)) =
            (node.options(), node.database(), node.table())
        else {
            return;
        };
        match metadata::count_rows(&*self.executor, &options, database, table).await {
            Ok(total) => self
                .status_line
                .set_message(format!("`{database}`.`{table}` has {total} rows")),
            Err(e) => self.status_line.set_error(format!("Error: {e}")),
        }
    }

    async fn set_pinned(&mut self, pin: bool) {
        let Some(key) = self.require_table().and_then(|node| node.table_key()) else {
            return;
        };
        let result = if pin {
            self.registry.pin_table(&key)
        } else {
            self.registry.unpin_table(&key)
        };
        match result {
            Ok(_) => {
                let verb = if pin { "Pinned" } else { "Unpinned" };
                self.status_line.set_message(format!("{verb} {}", key.table));
                self.refresh_tree().await;
            }
            Err(e) => self.status_line.set_error(e.to_string()),
        }
    }

    async fn drop_table(&mut self, node: &TreeNode) {
        let (Some(options), Some(database), Some(table)) =
            (node.options(), node.database(), node.table())
        else {
            return;
        };
        let result = match sql::drop_table(database, table) {
            Ok(statement) => self.executor.query(&options, &statement).await.map(|_| ()),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                tracing::info!(database, table, "dropped table");
                self.status_line
                    .set_message(format!("Table `{table}` dropped successfully."));
                self.refresh_tree().await;
            }
            Err(e) => self
                .status_line
                .set_error(format!("Error dropping table: {e}")),
        }
    }

    async fn backup_table(&mut self) {
        let Some(node) = self.require_table() else {
            return;
        };
        let (Some(options), Some(database), Some(table)) =
            (node.options(), node.database(), node.table())
        else {
            return;
        };
        let backup = sql::backup_table_name(table, Local::now().naive_local());
        let result = async {
            for statement in sql::backup_table(database, table, &backup)? {
                self.executor.query(&options, &statement).await?;
            }
            Ok::<_, miq_db::DbError>(())
        }
        .await;
        match result {
            Ok(()) => {
                self.status_line
                    .set_message(format!("Table backed up as `{backup}`"));
                self.refresh_tree().await;
            }
            Err(e) => self
                .status_line
                .set_error(format!("Error backing up table: {e}")),
        }
    }

    async fn add_column_step(
        &mut self,
        node: TreeNode,
        name: Option<String>,
        definition: Option<String>,
        value: String,
    ) {
        let (name, definition, comment) = match (name, definition) {
            (None, _) => {
                let modal = InputModal::new(
                    "Add Column (2/3)",
                    "Definition, e.g. VARCHAR(64) NOT NULL DEFAULT ''",
                )
                .required();
                self.open_modal(
                    Modal::Input(modal),
                    Prompt::AddColumn {
                        node,
                        name: Some(value.trim().to_string()),
                        definition: None,
                    },
                );
                return;
            }
            (Some(name), None) => {
                let modal = InputModal::new("Add Column (3/3)", "Comment (optional)");
                self.open_modal(
                    Modal::Input(modal),
                    Prompt::AddColumn {
                        node,
                        name: Some(name),
                        definition: Some(value),
                    },
                );
                return;
            }
            (Some(name), Some(definition)) => (name, definition, value),
        };

        let (Some(options), Some(database), Some(table)) =
            (node.options(), node.database(), node.table())
        else {
            return;
        };
        let comment = Some(comment.trim()).filter(|c| !c.is_empty());
        let result = match sql::add_column(database, table, &name, &definition, comment) {
            Ok(statement) => self.executor.query(&options, &statement).await.map(|_| ()),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                self.status_line
                    .set_message(format!("Column `{name}` added to `{table}`"));
                self.refresh_tree().await;
            }
            Err(e) => self.status_line.set_error(format!("Error adding column: {e}")),
        }
    }

    /// Put the `DROP COLUMN` statement in the editor for review. Nothing runs.
    fn drop_column(&mut self) {
        let Some(TreeNode::Column {
            database,
            table,
            column,
            ..
        }) = self.require_column()
        else {
            return;
        };
        match sql::drop_column(&database, &table, &column.name) {
            Ok(statement) => {
                self.set_editor_text(&statement);
                self.focus = Focus::Editor;
                self.status_line
                    .set_message("Review the statement and press F6 to run it");
            }
            Err(e) => self.status_line.set_error(e.to_string()),
        }
    }

    pub(crate) fn present(&mut self, result: Result<QueryRun, RunError>, in_place: bool) {
        match result {
            Ok(run) => {
                if let Some(error) = &run.output.error {
                    self.status_line.set_error(format!("Error: {error}"));
                } else {
                    self.status_line.clear();
                }
                let has_rows = !run.output.result_sets().is_empty();
                if in_place && let Output::Results(panel) = &mut self.output {
                    panel.sql = run.sql;
                    panel.database = run.database;
                    panel.table = run.table;
                    panel.set_output(run.output, run.total);
                } else {
                    let mut panel = miq_ui::ResultPanel::new(run.sql, self.config.page_size)
                        .with_context(run.database, run.table);
                    panel.set_output(run.output, run.total);
                    self.output = Output::Results(panel);
                }
                if has_rows {
                    self.focus = Focus::Results;
                }
            }
            Err(e) if e.is_warning() => self.status_line.set_warning(e.to_string()),
            Err(e) => {
                tracing::error!(error = %e, "query failed");
                self.status_line.set_error(e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use miq_auth::{MemoryStore, SecretStore};
    use miq_db::{ConnectionRegistry, testing::ScriptedExecutor};

    use super::*;
    use crate::config::Config;

    fn executor() -> Arc<ScriptedExecutor> {
        Arc::new(
            ScriptedExecutor::new()
                .on_rows("SHOW DATABASES", &["Database"], &[&[Some("shop")]])
                .on_rows("COUNT(*)", &["total"], &[&[Some("42")]])
                .on_rows(
                    "information_schema.TABLES",
                    &["name", "comment"],
                    &[&[Some("orders"), Some("customer orders")]],
                )
                .on_rows(
                    "information_schema.COLUMNS",
                    &["name", "column_type", "nullable", "default_value", "column_key", "extra", "comment"],
                    &[
                        &[Some("id"), Some("int"), Some("NO"), None, Some("PRI"), Some(""), Some("")],
                        &[Some("note"), Some("text"), Some("YES"), None, Some(""), Some(""), Some("")],
                    ],
                )
                .on_rows("FROM `shop`.`orders`", &["id"], &[&[Some("1")], &[Some("2")]]),
        )
    }

    async fn app_with(executor: &Arc<ScriptedExecutor>) -> App<'static> {
        let store: Box<dyn SecretStore> = Box::new(MemoryStore::new());
        let mut registry = ConnectionRegistry::in_memory(store).unwrap();
        registry
            .add(&NewConnection {
                host: "db.local".to_string(),
                user: "root".to_string(),
                password: "pw".to_string(),
                ..NewConnection::default()
            })
            .unwrap();
        let mut app = App::new(Config::default(), registry, Box::new(Arc::clone(executor)));
        app.refresh_tree().await;
        app
    }

    async fn select(app: &mut App<'_>, label: &str) {
        loop {
            if let Some(index) = app
                .explorer
                .entries()
                .iter()
                .position(|e| e.item.label == label)
            {
                app.explorer.state.select(Some(index));
                return;
            }
            let next = app
                .explorer
                .entries()
                .iter()
                .position(|e| !e.expanded && e.item.state != miq_ui::Collapsible::None)
                .unwrap();
            app.explorer.state.select(Some(next));
            app.toggle_selected().await;
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn type_and_submit(app: &mut App<'_>, text: &str) {
        for ch in text.chars() {
            app.on_key_event(key(KeyCode::Char(ch))).await.unwrap();
        }
        app.on_key_event(key(KeyCode::Enter)).await.unwrap();
    }

    fn results<'a>(app: &'a App<'_>) -> &'a miq_ui::ResultPanel {
        match &app.output {
            Output::Results(panel) => panel,
            Output::Empty | Output::Document { .. } => panic!("no result panel"),
        }
    }

    #[tokio::test]
    async fn select_top_rows_sets_session_and_shows_total() {
        let executor = executor();
        let mut app = app_with(&executor).await;
        select(&mut app, "orders").await;

        app.dispatch(Command::SelectTopRows).await;

        assert_eq!(app.session.database(), Some("shop"));
        assert_eq!(app.editor.lines().join("\n"), "SELECT * FROM `shop`.`orders` LIMIT 100;");
        let panel = results(&app);
        assert_eq!(panel.total, Some(42));
        assert_eq!(panel.table.as_deref(), Some("orders"));
        assert_eq!(panel.active_set().map(miq_db::ResultSet::len), Some(2));
        assert_eq!(app.focus, Focus::Results);
    }

    #[tokio::test]
    async fn run_without_session_warns() {
        let executor = executor();
        let mut app = app_with(&executor).await;
        app.set_editor_text("SELECT 1");

        app.dispatch(Command::RunQuery).await;

        assert_eq!(app.status_line.message(), "No MySQL Server or Database selected");
        assert!(matches!(app.output, Output::Empty));
    }

    #[tokio::test]
    async fn drop_table_needs_confirmation() {
        let executor = executor();
        let mut app = app_with(&executor).await;
        select(&mut app, "orders").await;

        app.dispatch(Command::DropTable).await;
        app.on_key_event(key(KeyCode::Char('n'))).await.unwrap();
        assert!(app.modal.is_none());
        assert!(!executor.executed_sql().iter().any(|s| s.starts_with("DROP")));

        app.dispatch(Command::DropTable).await;
        app.on_key_event(key(KeyCode::Char('y'))).await.unwrap();
        assert!(executor
            .executed_sql()
            .contains(&"DROP TABLE `shop`.`orders`;".to_string()));
        assert_eq!(app.status_line.message(), "Table `orders` dropped successfully.");
    }

    #[tokio::test]
    async fn add_connection_walks_every_prompt() {
        let executor = executor();
        let mut app = app_with(&executor).await;

        app.dispatch(Command::AddConnection).await;
        type_and_submit(&mut app, "Staging").await;
        // host and user keep their prefilled defaults
        type_and_submit(&mut app, "").await;
        type_and_submit(&mut app, "").await;
        type_and_submit(&mut app, "secret").await;
        type_and_submit(&mut app, "").await;
        type_and_submit(&mut app, "").await;

        assert!(app.modal.is_none());
        let profiles = app.registry.list().unwrap();
        let added = profiles.last().unwrap();
        assert_eq!(added.label(), "Staging");
        assert_eq!(added.host, "127.0.0.1");
        assert_eq!(added.port, 3306);
        assert_eq!(app.registry.password(&added.id).unwrap().as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn cancelled_prompt_is_a_no_op() {
        let executor = executor();
        let mut app = app_with(&executor).await;

        app.dispatch(Command::AddConnection).await;
        type_and_submit(&mut app, "Half").await;
        app.on_key_event(key(KeyCode::Esc)).await.unwrap();

        assert!(app.modal.is_none());
        assert_eq!(app.registry.list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn drop_column_only_writes_the_statement() {
        let executor = executor();
        let mut app = app_with(&executor).await;
        select(&mut app, "note : text").await;
        let before = executor.executed_sql().len();

        app.dispatch(Command::DropColumn).await;

        assert_eq!(
            app.editor.lines().join("\n"),
            "ALTER TABLE `shop`.`orders`\nDROP COLUMN `note`;"
        );
        assert_eq!(executor.executed_sql().len(), before);
        assert_eq!(app.focus, Focus::Editor);
    }

    #[tokio::test]
    async fn expand_all_asks_first() {
        let executor = executor();
        let mut app = app_with(&executor).await;

        app.dispatch(Command::ExpandAll).await;
        assert!(!app.filters.all_expanded());
        app.on_key_event(key(KeyCode::Enter)).await.unwrap();

        assert!(app.filters.all_expanded());
        assert!(app.explorer.entries().iter().any(|e| e.item.label == "id : int"));
    }

    #[tokio::test]
    async fn structure_at_cursor_uses_session_database() {
        let executor = executor();
        let mut app = app_with(&executor).await;
        select(&mut app, "shop").await;
        app.dispatch(Command::SelectDatabase).await;
        app.set_editor_text("select * from orders");

        app.dispatch(Command::ShowStructureAtCursor).await;

        match &app.output {
            Output::Document { title, text, .. } => {
                assert_eq!(title, "shop.orders");
                assert!(text.starts_with("Table: shop.orders"));
            }
            Output::Empty | Output::Results(_) => panic!("no structure document"),
        }
    }

    #[tokio::test]
    async fn backup_runs_create_then_insert() {
        let executor = executor();
        let mut app = app_with(&executor).await;
        select(&mut app, "orders").await;

        app.dispatch(Command::BackupTable).await;

        let sql = executor.executed_sql();
        let create = sql.iter().position(|s| s.starts_with("CREATE TABLE `shop`.`orders_")).unwrap();
        let insert = sql.iter().position(|s| s.starts_with("INSERT INTO `shop`.`orders_")).unwrap();
        assert!(create < insert);
        assert!(app.status_line.message().starts_with("Table backed up as `orders_"));
    }

    #[tokio::test]
    async fn panel_messages_update_filters_and_editor() {
        let executor = executor();
        let mut app = app_with(&executor).await;
        select(&mut app, "orders").await;
        app.dispatch(Command::SelectTopRows).await;

        app.dispatch(Command::Panel(PanelMessage::UpdateFilter {
            column: 0,
            value: "2".to_string(),
        }))
        .await;
        assert_eq!(results(&app).filtered_rows().len(), 1);

        app.dispatch(Command::Panel(PanelMessage::ClearFilter)).await;
        assert_eq!(results(&app).filtered_rows().len(), 2);

        app.set_editor_text("");
        app.dispatch(Command::Panel(PanelMessage::InsertText("id".to_string())))
            .await;
        assert_eq!(app.editor.lines().join("\n"), "id");
    }

    #[tokio::test]
    async fn rerun_refreshes_the_same_panel() {
        let executor = executor();
        let mut app = app_with(&executor).await;
        select(&mut app, "orders").await;
        app.dispatch(Command::SelectTopRows).await;
        app.set_editor_text("SELECT 1");

        let sql = results(&app).sql.clone();
        app.dispatch(Command::Panel(PanelMessage::RunQuery(sql))).await;

        let panel = results(&app);
        assert_eq!(panel.table.as_deref(), Some("orders"));
        assert_eq!(panel.total, Some(42));
        assert_eq!(
            executor.executed_sql().last().map(String::as_str),
            Some("SELECT * FROM `shop`.`orders` LIMIT 100;")
        );
    }

    #[tokio::test]
    async fn edited_panel_sql_reruns_in_the_same_panel() {
        let executor = executor();
        let mut app = app_with(&executor).await;
        select(&mut app, "orders").await;
        app.dispatch(Command::SelectTopRows).await;
        assert_eq!(app.focus, Focus::Results);

        app.on_key_event(key(KeyCode::Char('e'))).await.unwrap();
        app.on_key_event(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL))
            .await
            .unwrap();
        type_and_submit(&mut app, "SELECT id FROM `shop`.`orders` WHERE id = 2").await;

        let panel = results(&app);
        assert!(panel.sql_input().is_none());
        assert_eq!(panel.sql, "SELECT id FROM `shop`.`orders` WHERE id = 2 LIMIT 100");
        assert_eq!(panel.table.as_deref(), Some("orders"));
        assert_eq!(panel.total, Some(42));
        assert_eq!(
            executor.executed_sql().last().map(String::as_str),
            Some("SELECT id FROM `shop`.`orders` WHERE id = 2 LIMIT 100")
        );
    }

    #[tokio::test]
    async fn escape_closes_the_panel_sql_line_without_running() {
        let executor = executor();
        let mut app = app_with(&executor).await;
        select(&mut app, "orders").await;
        app.dispatch(Command::SelectTopRows).await;
        let before = executor.executed_sql().len();

        app.on_key_event(key(KeyCode::Char('e'))).await.unwrap();
        app.on_key_event(key(KeyCode::Char('x'))).await.unwrap();
        app.on_key_event(key(KeyCode::Esc)).await.unwrap();

        assert!(results(&app).sql_input().is_none());
        assert_eq!(app.focus, Focus::Results);
        assert_eq!(executor.executed_sql().len(), before);
    }

    #[test]
    fn selection_and_word_helpers() {
        let lines = vec!["select *".to_string(), "from shop.orders".to_string()];
        assert_eq!(selected_text(&lines, (0, 7), (1, 4)), "*\nfrom");
        assert_eq!(selected_text(&lines, (1, 5), (1, 9)), "shop");

        assert_eq!(word_at("from `shop`.`orders` x", 8).as_deref(), Some("`shop`.`orders`"));
        assert_eq!(word_at("a  b", 2), None);
        assert_eq!(
            split_table_name("`shop`.`orders`"),
            (Some("shop".to_string()), "orders".to_string())
        );
        assert_eq!(split_table_name(" orders "), (None, "orders".to_string()));
    }
}
