use color_eyre::Result;
use crossterm::{clipboard::CopyToClipboard, execute};
use miq_auth::SecretStore;
use miq_db::{ConnectionRegistry, Executor};
use miq_ui::{Modal, StatusLine, TextInput};
use ratatui::DefaultTerminal;
use ratatui_textarea::{CursorMove, TextArea};

use crate::{
    app_state::{Focus, Session},
    commands::{FilterTarget, Prompt},
    config::Config,
    explorer::Explorer,
    filter_state::FilterState,
    query_runner::QuerySettings,
    tree::{TreeContext, TreeNode},
};

pub const APP_NAME: &str = r"
           _
 _ __ ___ (_) __ _
| '_ ` _ \| |/ _` |
| | | | | | | (_| |
|_| |_| |_|_|\__, |
                |_|
";

pub const TOPBAR_HEIGHT: u16 = 7;

/// What the lower right pane shows.
#[derive(Debug, Default)]
pub enum Output {
    #[default]
    Empty,
    Results(miq_ui::ResultPanel),
    /// Read-only text such as a table structure report
    Document {
        title: String,
        text: String,
        scroll: u16,
    },
}

/// The main application which holds the state and logic of the application.
pub struct App<'a> {
    /// Is the application running?
    pub(crate) running: bool,
    pub(crate) config: Config,
    pub(crate) settings: QuerySettings,
    pub(crate) registry: ConnectionRegistry<Box<dyn SecretStore>>,
    pub(crate) executor: Box<dyn Executor>,
    /// Connection the editor runs against
    pub(crate) session: Session,
    pub(crate) filters: FilterState,
    pub(crate) explorer: Explorer,
    pub(crate) editor: TextArea<'a>,
    pub(crate) output: Output,
    pub(crate) focus: Focus,
    /// Open dialog and what to do with its answer
    pub(crate) modal: Option<(Modal, Prompt)>,
    pub(crate) filter_edit: Option<(FilterTarget, TextInput)>,
    pub(crate) status_line: StatusLine,
    pub(crate) show_help: bool,
}

impl App<'_> {
    #[must_use]
    pub fn new(
        config: Config,
        registry: ConnectionRegistry<Box<dyn SecretStore>>,
        executor: Box<dyn Executor>,
    ) -> Self {
        Self {
            running: false,
            settings: QuerySettings::from(&config),
            config,
            registry,
            executor,
            session: Session::default(),
            filters: FilterState::new(),
            explorer: Explorer::default(),
            editor: TextArea::default(),
            output: Output::Empty,
            focus: Focus::Tree,
            modal: None,
            filter_edit: None,
            status_line: StatusLine::new(),
            show_help: false,
        }
    }

    /// Run the application's main loop.
    pub async fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        self.running = true;
        self.refresh_tree().await;
        self.explorer.select_first();
        while self.running {
            terminal.draw(|frame| self.render(frame))?;
            self.handle_crossterm_events().await?;
        }
        tracing::info!("shutting down");
        Ok(())
    }

    /// Set running to false to quit the application.
    pub(crate) const fn quit(&mut self) {
        self.running = false;
    }

    /// Reload every visible node from the servers.
    pub(crate) async fn refresh_tree(&mut self) {
        let ctx = TreeContext {
            executor: &*self.executor,
            registry: &self.registry,
            filters: &self.filters,
            max_table_count: self.config.max_table_count,
        };
        self.explorer.refresh(&ctx).await;
    }

    pub(crate) async fn toggle_selected(&mut self) {
        let ctx = TreeContext {
            executor: &*self.executor,
            registry: &self.registry,
            filters: &self.filters,
            max_table_count: self.config.max_table_count,
        };
        let children = self.explorer.toggle_selected(&ctx).await;
        self.adopt_first_connection(&children);
    }

    pub(crate) async fn expand_selected(&mut self) {
        let ctx = TreeContext {
            executor: &*self.executor,
            registry: &self.registry,
            filters: &self.filters,
            max_table_count: self.config.max_table_count,
        };
        let children = self.explorer.expand_selected(&ctx).await;
        self.adopt_first_connection(&children);
    }

    /// The first server that lists its databases becomes the session when
    /// nothing was picked yet.
    fn adopt_first_connection(&mut self, children: &[TreeNode]) {
        let scope = children.iter().find_map(|node| {
            if let TreeNode::Database { scope, .. } = node {
                Some(scope)
            } else {
                None
            }
        });
        if let Some(scope) = scope {
            self.session.set_if_empty(&scope.options);
        }
    }

    pub(crate) fn open_modal(&mut self, modal: Modal, prompt: Prompt) {
        self.modal = Some((modal, prompt));
    }

    pub(crate) fn start_filter_edit(&mut self, target: FilterTarget) {
        let input = TextInput::with_text(target.current(&self.filters));
        self.filter_edit = Some((target, input));
    }

    /// The selected table or column row, or a warning when another kind of
    /// row is selected.
    pub(crate) fn require_table(&mut self) -> Option<TreeNode> {
        let node = self
            .explorer
            .selected()
            .map(|entry| entry.node.clone())
            .filter(|node| matches!(node, TreeNode::Table { .. } | TreeNode::Column { .. }));
        if node.is_none() {
            self.status_line.set_warning("Select a table first");
        }
        node
    }

    pub(crate) fn require_column(&mut self) -> Option<TreeNode> {
        let node = self
            .explorer
            .selected()
            .map(|entry| entry.node.clone())
            .filter(|node| matches!(node, TreeNode::Column { .. }));
        if node.is_none() {
            self.status_line.set_warning("Select a column first");
        }
        node
    }

    pub(crate) fn set_editor_text(&mut self, text: &str) {
        self.editor = TextArea::new(text.lines().map(str::to_string).collect());
        self.editor.move_cursor(CursorMove::Bottom);
        self.editor.move_cursor(CursorMove::End);
    }

    /// Insert at the cursor, replacing the selection.
    pub(crate) fn insert_into_editor(&mut self, text: &str) {
        if self.editor.selection_range().is_some() {
            self.editor.cut();
        }
        self.editor.insert_str(text);
        self.focus = Focus::Editor;
    }

    /// Copy through the terminal with OSC 52, which also works over ssh.
    pub(crate) fn copy_to_clipboard(&mut self, text: &str) {
        match execute!(std::io::stdout(), CopyToClipboard::to_clipboard_from(text)) {
            Ok(()) => self.status_line.set_message(format!("Copied: {text}")),
            Err(e) => {
                tracing::warn!(error = %e, "clipboard write failed");
                self.status_line.set_error(format!("Copy failed: {e}"));
            }
        }
    }
}
