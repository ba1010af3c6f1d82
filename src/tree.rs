//! Lazily loaded server → database → table → column tree.
//!
//! Nodes never cache their children; every expand asks the server again.

use std::cmp::Ordering;

use miq_auth::SecretStore;
use miq_db::{
    Column, ConnectionOptions, ConnectionProfile, ConnectionRegistry, Executor, Table, TableKey,
    metadata,
};
use miq_ui::Collapsible;

use crate::filter_state::FilterState;

const CONNECTION_ICON: &str = "▣";
const DATABASE_ICON: &str = "◈";
const TABLE_ICON: &str = "▤";
const KEY_ICON: &str = "⚷";
const COLUMN_ICON: &str = "·";
const INFO_ICON: &str = "ℹ";
const ERROR_ICON: &str = "✗";
const PIN_MARK: &str = "★";

/// Which server a node below the connection level belongs to. `options`
/// never carries a database; use [`TreeNode::options`] for that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeScope {
    pub connection_id: String,
    pub options: ConnectionOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Connection(ConnectionProfile),
    Database {
        scope: NodeScope,
        database: String,
    },
    Table {
        scope: NodeScope,
        database: String,
        table: Table,
        pinned: bool,
    },
    Column {
        scope: NodeScope,
        database: String,
        table: String,
        column: Column,
    },
    Info {
        message: String,
        is_error: bool,
    },
}

/// How a node is presented in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeItem {
    /// Stable across reloads while the node means the same thing
    pub id: String,
    pub label: String,
    pub detail: String,
    pub icon: &'static str,
    pub state: Collapsible,
    /// Which commands apply to the node
    pub context: &'static str,
}

/// Everything a node needs to load its children.
pub struct TreeContext<'a, E: Executor + ?Sized, S: SecretStore> {
    pub executor: &'a E,
    pub registry: &'a ConnectionRegistry<S>,
    pub filters: &'a FilterState,
    pub max_table_count: u64,
}

impl TreeNode {
    fn error(error: impl std::fmt::Display) -> Self {
        Self::Info {
            message: error.to_string(),
            is_error: true,
        }
    }

    /// Options for queries issued on behalf of this node, with the node's
    /// database selected.
    #[must_use]
    pub fn options(&self) -> Option<ConnectionOptions> {
        match self {
            Self::Database { scope, database }
            | Self::Table { scope, database, .. }
            | Self::Column { scope, database, .. } => {
                Some(scope.options.with_database(database))
            }
            Self::Connection(_) | Self::Info { .. } => None,
        }
    }

    #[must_use]
    pub const fn scope(&self) -> Option<&NodeScope> {
        match self {
            Self::Database { scope, .. }
            | Self::Table { scope, .. }
            | Self::Column { scope, .. } => Some(scope),
            Self::Connection(_) | Self::Info { .. } => None,
        }
    }

    #[must_use]
    pub fn database(&self) -> Option<&str> {
        match self {
            Self::Database { database, .. }
            | Self::Table { database, .. }
            | Self::Column { database, .. } => Some(database),
            Self::Connection(_) | Self::Info { .. } => None,
        }
    }

    /// Table name for table and column nodes.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::Table { table, .. } => Some(&table.name),
            Self::Column { table, .. } => Some(table),
            Self::Connection(_) | Self::Database { .. } | Self::Info { .. } => None,
        }
    }

    #[must_use]
    pub fn table_key(&self) -> Option<TableKey> {
        let scope = self.scope()?;
        Some(scope.options.table_key(self.database()?, self.table()?))
    }

    #[must_use]
    pub fn item(&self, filters: &FilterState) -> TreeItem {
        let expand_all = if filters.all_expanded() {
            Collapsible::Expanded
        } else {
            Collapsible::Collapsed
        };

        match self {
            Self::Connection(profile) => TreeItem {
                id: format!("connection:{}#v{}", profile.id, filters.expand_version()),
                label: profile.label().to_string(),
                detail: format!("{}@{}:{}", profile.user, profile.host, profile.port),
                icon: CONNECTION_ICON,
                state: expand_all,
                context: "connection",
            },
            Self::Database { scope, database } => TreeItem {
                id: format!("database:{}:{database}", scope.connection_id),
                label: database.clone(),
                detail: String::new(),
                icon: DATABASE_ICON,
                state: expand_all,
                context: "database",
            },
            Self::Table {
                scope,
                database,
                table,
                pinned,
            } => TreeItem {
                id: format!("table:{}:{database}.{}", scope.connection_id, table.name),
                label: if *pinned {
                    format!("{PIN_MARK} {}", table.name)
                } else {
                    table.name.clone()
                },
                detail: table.comment.clone(),
                icon: TABLE_ICON,
                state: if filters.has_column_filter() {
                    Collapsible::Expanded
                } else {
                    expand_all
                },
                context: if *pinned { "pinnedTable" } else { "table" },
            },
            Self::Column {
                scope,
                database,
                table,
                column,
            } => TreeItem {
                id: format!(
                    "column:{}:{database}.{table}.{}",
                    scope.connection_id, column.name
                ),
                label: format!("{} : {}", column.name, column.column_type),
                detail: column.comment.clone(),
                icon: if column.is_primary_key() {
                    KEY_ICON
                } else {
                    COLUMN_ICON
                },
                state: Collapsible::None,
                context: "column",
            },
            Self::Info { message, is_error } => TreeItem {
                id: format!("info:{message}"),
                label: message.clone(),
                detail: String::new(),
                icon: if *is_error { ERROR_ICON } else { INFO_ICON },
                state: Collapsible::None,
                context: "info",
            },
        }
    }
}

/// One connection node per saved profile, in creation order.
#[must_use]
pub fn root_nodes<S: SecretStore>(registry: &ConnectionRegistry<S>) -> Vec<TreeNode> {
    match registry.list() {
        Ok(profiles) => profiles.into_iter().map(TreeNode::Connection).collect(),
        Err(e) => {
            tracing::error!(error = %e, "failed to list connections");
            vec![TreeNode::error(e)]
        }
    }
}

/// Children of `node`. Failures become a single error node.
pub async fn children<E, S>(ctx: &TreeContext<'_, E, S>, node: &TreeNode) -> Vec<TreeNode>
where
    E: Executor + ?Sized,
    S: SecretStore,
{
    match node {
        TreeNode::Connection(profile) => database_nodes(ctx, profile).await,
        TreeNode::Database { scope, database } => table_nodes(ctx, scope, database).await,
        TreeNode::Table {
            scope,
            database,
            table,
            ..
        } => column_nodes(ctx, scope, database, &table.name).await,
        TreeNode::Column { .. } | TreeNode::Info { .. } => Vec::new(),
    }
}

async fn database_nodes<E, S>(ctx: &TreeContext<'_, E, S>, profile: &ConnectionProfile) -> Vec<TreeNode>
where
    E: Executor + ?Sized,
    S: SecretStore,
{
    let options = match ctx.registry.options(profile) {
        Ok(options) => options,
        Err(e) => return vec![TreeNode::error(e)],
    };
    match metadata::list_databases(ctx.executor, &options).await {
        Ok(databases) => databases
            .into_iter()
            .map(|database| TreeNode::Database {
                scope: NodeScope {
                    connection_id: profile.id.clone(),
                    options: options.clone(),
                },
                database,
            })
            .collect(),
        Err(e) => {
            tracing::warn!(connection = %options, error = %e, "failed to list databases");
            vec![TreeNode::error(e)]
        }
    }
}

async fn table_nodes<E, S>(
    ctx: &TreeContext<'_, E, S>,
    scope: &NodeScope,
    database: &str,
) -> Vec<TreeNode>
where
    E: Executor + ?Sized,
    S: SecretStore,
{
    let options = scope.options.with_database(database);
    let tables =
        match metadata::list_tables(ctx.executor, &options, database, ctx.max_table_count).await {
            Ok(tables) => tables,
            Err(e) => {
                tracing::warn!(database, error = %e, "failed to list tables");
                return vec![TreeNode::error(e)];
            }
        };

    let pinned = ctx.registry.pinned_tables().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to read pinned tables");
        Vec::new()
    });
    let pin_position =
        |name: &str| pinned.iter().position(|key| *key == scope.options.table_key(database, name));

    let mut tables: Vec<(Option<usize>, Table)> = tables
        .into_iter()
        .filter(|t| ctx.filters.matches_table(&t.name, &t.comment))
        .map(|t| (pin_position(&t.name), t))
        .collect();
    tables.sort_by(|(a_pin, a), (b_pin, b)| compare_tables(*a_pin, a, *b_pin, b));

    tables
        .into_iter()
        .map(|(pin, table)| TreeNode::Table {
            scope: scope.clone(),
            database: database.to_string(),
            table,
            pinned: pin.is_some(),
        })
        .collect()
}

/// Pinned tables first in pin order, then the rest by name ignoring case.
fn compare_tables(a_pin: Option<usize>, a: &Table, b_pin: Option<usize>, b: &Table) -> Ordering {
    match (a_pin, b_pin) {
        (Some(a_pin), Some(b_pin)) => a_pin.cmp(&b_pin),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    }
}

async fn column_nodes<E, S>(
    ctx: &TreeContext<'_, E, S>,
    scope: &NodeScope,
    database: &str,
    table: &str,
) -> Vec<TreeNode>
where
    E: Executor + ?Sized,
    S: SecretStore,
{
    let options = scope.options.with_database(database);
    match metadata::list_columns(ctx.executor, &options, database, table).await {
        Ok(columns) => columns
            .into_iter()
            .filter(|c| {
                ctx.filters
                    .matches_column(&c.name, &c.comment, &c.column_type)
            })
            .map(|column| TreeNode::Column {
                scope: scope.clone(),
                database: database.to_string(),
                table: table.to_string(),
                column,
            })
            .collect(),
        Err(e) => {
            tracing::warn!(database, table, error = %e, "failed to list columns");
            vec![TreeNode::error(e)]
        }
    }
}

#[cfg(test)]
mod tests {
    use miq_auth::MemoryStore;
    use miq_db::{NewConnection, testing::ScriptedExecutor};

    use super::*;

    fn registry() -> (ConnectionRegistry<MemoryStore>, ConnectionProfile) {
        let mut registry = ConnectionRegistry::in_memory(MemoryStore::new()).unwrap();
        let profile = registry
            .add(&NewConnection {
                host: "db.local".to_string(),
                user: "root".to_string(),
                password: "pw".to_string(),
                ..NewConnection::default()
            })
            .unwrap();
        (registry, profile)
    }

    fn scope(profile: &ConnectionProfile) -> NodeScope {
        NodeScope {
            connection_id: profile.id.clone(),
            options: ConnectionOptions::from_profile(profile, "pw".to_string()),
        }
    }

    fn tables_executor() -> ScriptedExecutor {
        ScriptedExecutor::new().on_rows(
            "information_schema.TABLES",
            &["name", "comment"],
            &[
                &[Some("Zebra"), Some("")],
                &[Some("audit"), Some("order history")],
                &[Some("orders"), Some("")],
                &[Some("users"), Some("people")],
            ],
        )
    }

    fn table_names(nodes: &[TreeNode]) -> Vec<&str> {
        nodes.iter().filter_map(TreeNode::table).collect()
    }

    #[test]
    fn roots_follow_profiles() {
        let (registry, profile) = registry();
        let roots = root_nodes(&registry);
        assert_eq!(roots, vec![TreeNode::Connection(profile)]);
    }

    #[tokio::test]
    async fn connection_lists_databases_with_its_password() {
        let (registry, profile) = registry();
        let executor = ScriptedExecutor::new().on_rows(
            "SHOW DATABASES",
            &["Database"],
            &[&[Some("mysql")], &[Some("shop")]],
        );
        let filters = FilterState::new();
        let ctx = TreeContext {
            executor: &executor,
            registry: &registry,
            filters: &filters,
            max_table_count: 500,
        };

        let nodes = children(&ctx, &TreeNode::Connection(profile.clone())).await;
        assert_eq!(nodes.len(), 1);
        let options = nodes.first().and_then(TreeNode::options).unwrap();
        assert_eq!(options.password, "pw");
        assert_eq!(options.database.as_deref(), Some("shop"));
    }

    #[tokio::test]
    async fn tables_sort_pinned_first_then_by_name() {
        let (registry, profile) = registry();
        let scope = scope(&profile);
        registry
            .pin_table(&scope.options.table_key("shop", "users"))
            .unwrap();
        registry
            .pin_table(&scope.options.table_key("shop", "orders"))
            .unwrap();

        let executor = tables_executor();
        let filters = FilterState::new();
        let ctx = TreeContext {
            executor: &executor,
            registry: &registry,
            filters: &filters,
            max_table_count: 500,
        };
        let node = TreeNode::Database {
            scope,
            database: "shop".to_string(),
        };

        let tables = children(&ctx, &node).await;
        assert_eq!(table_names(&tables), vec!["users", "orders", "audit", "Zebra"]);

        let first = tables.first().unwrap().item(&filters);
        assert_eq!(first.label, "★ users");
        assert_eq!(first.context, "pinnedTable");
        assert_eq!(tables.get(2).unwrap().item(&filters).context, "table");
        assert!(executor.executed_sql().iter().any(|sql| sql.contains("LIMIT 500")));
    }

    #[tokio::test]
    async fn table_filter_matches_name_or_comment() {
        let (registry, profile) = registry();
        let executor = tables_executor();
        let mut filters = FilterState::new();
        filters.set_table_filter("ORDER");
        let ctx = TreeContext {
            executor: &executor,
            registry: &registry,
            filters: &filters,
            max_table_count: 500,
        };
        let node = TreeNode::Database {
            scope: scope(&profile),
            database: "shop".to_string(),
        };

        let tables = children(&ctx, &node).await;
        assert_eq!(table_names(&tables), vec!["audit", "orders"]);
    }

    #[tokio::test]
    async fn columns_are_filtered_by_type() {
        let (registry, profile) = registry();
        let executor = ScriptedExecutor::new().on_rows(
            "information_schema.COLUMNS",
            &["name", "column_type", "nullable", "default_value", "column_key", "extra", "comment"],
            &[
                &[Some("id"), Some("int"), Some("NO"), None, Some("PRI"), Some(""), Some("")],
                &[Some("email"), Some("varchar(64)"), Some("YES"), None, Some(""), Some(""), Some("login")],
            ],
        );
        let mut filters = FilterState::new();
        filters.set_column_filter("varchar");
        let ctx = TreeContext {
            executor: &executor,
            registry: &registry,
            filters: &filters,
            max_table_count: 500,
        };
        let node = TreeNode::Table {
            scope: scope(&profile),
            database: "shop".to_string(),
            table: Table {
                name: "users".to_string(),
                comment: String::new(),
            },
            pinned: false,
        };

        assert_eq!(node.item(&filters).state, Collapsible::Expanded);
        let columns = children(&ctx, &node).await;
        assert_eq!(columns.len(), 1);
        let item = columns.first().unwrap().item(&filters);
        assert_eq!(item.label, "email : varchar(64)");
        assert_eq!(item.detail, "login");
        assert_eq!(item.state, Collapsible::None);
    }

    #[tokio::test]
    async fn metadata_failure_becomes_single_info_node() {
        let (registry, profile) = registry();
        let executor = ScriptedExecutor::new().on_connect_error("SHOW DATABASES", "Access denied");
        let filters = FilterState::new();
        let ctx = TreeContext {
            executor: &executor,
            registry: &registry,
            filters: &filters,
            max_table_count: 500,
        };

        let nodes = children(&ctx, &TreeNode::Connection(profile)).await;
        assert_eq!(nodes.len(), 1);
        assert!(matches!(
            nodes.first(),
            Some(TreeNode::Info { message, is_error: true }) if message.contains("Access denied")
        ));
        assert!(children(&ctx, nodes.first().unwrap()).await.is_empty());
    }

    #[test]
    fn connection_id_follows_expand_version() {
        let (_, profile) = registry();
        let node = TreeNode::Connection(profile);
        let mut filters = FilterState::new();

        let before = node.item(&filters);
        assert_eq!(before.state, Collapsible::Collapsed);

        filters.set_all_expanded(true);
        let after = node.item(&filters);
        assert_ne!(before.id, after.id);
        assert!(after.id.ends_with("#v1"));
        assert_eq!(after.state, Collapsible::Expanded);
    }
}
