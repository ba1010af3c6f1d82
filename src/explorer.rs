use std::collections::HashSet;

use miq_auth::SecretStore;
use miq_db::Executor;
use miq_ui::{Collapsible, TreeRow};
use ratatui::widgets::ListState;

use crate::tree::{self, TreeContext, TreeItem, TreeNode};

/// One visible row of the flattened tree.
#[derive(Debug, Clone)]
pub struct Entry {
    pub node: TreeNode,
    pub item: TreeItem,
    pub depth: usize,
    pub expanded: bool,
}

impl Entry {
    fn new(node: TreeNode, item: TreeItem, depth: usize) -> Self {
        Self {
            node,
            item,
            depth,
            expanded: false,
        }
    }

    const fn is_expandable(&self) -> bool {
        !matches!(self.item.state, Collapsible::None)
    }
}

/// The sidebar: the tree flattened into rows plus the selection.
#[derive(Debug, Default)]
pub struct Explorer {
    entries: Vec<Entry>,
    pub state: ListState,
}

impl Explorer {
    #[cfg(test)]
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[must_use]
    pub fn rows(&self) -> Vec<TreeRow> {
        self.entries
            .iter()
            .map(|entry| TreeRow {
                depth: entry.depth,
                label: entry.item.label.clone(),
                detail: entry.item.detail.clone(),
                icon: entry.item.icon,
                state: entry.item.state,
                is_error: matches!(entry.node, TreeNode::Info { is_error: true, .. }),
            })
            .collect()
    }

    #[must_use]
    pub fn selected(&self) -> Option<&Entry> {
        self.state.selected().and_then(|i| self.entries.get(i))
    }

    pub fn select_next(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let next = self
            .state
            .selected()
            .map_or(0, |i| (i + 1).min(self.entries.len() - 1));
        self.state.select(Some(next));
    }

    pub fn select_previous(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let prev = self.state.selected().map_or(0, |i| i.saturating_sub(1));
        self.state.select(Some(prev));
    }

    pub fn select_first(&mut self) {
        if !self.entries.is_empty() {
            self.state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        if let Some(last) = self.entries.len().checked_sub(1) {
            self.state.select(Some(last));
        }
    }

    /// Index of the nearest row above `index` with a smaller depth.
    #[must_use]
    pub fn parent_of(&self, index: usize) -> Option<usize> {
        let depth = self.entries.get(index)?.depth;
        self.entries
            .get(..index)?
            .iter()
            .rposition(|entry| entry.depth < depth)
    }

    pub fn select_parent(&mut self) {
        if let Some(parent) = self.state.selected().and_then(|i| self.parent_of(i)) {
            self.state.select(Some(parent));
        }
    }

    /// The connection row the selection belongs to.
    #[must_use]
    pub fn selected_connection(&self) -> Option<&Entry> {
        let mut index = self.state.selected()?;
        while let Some(parent) = self.parent_of(index) {
            index = parent;
        }
        self.entries
            .get(index)
            .filter(|entry| matches!(entry.node, TreeNode::Connection(_)))
    }

    /// Load and show the children of the selected row. Returns the loaded
    /// children so callers can react to the first successful load.
    pub async fn expand_selected<E, S>(&mut self, ctx: &TreeContext<'_, E, S>) -> Vec<TreeNode>
    where
        E: Executor + ?Sized,
        S: SecretStore,
    {
        let Some(index) = self.state.selected() else {
            return Vec::new();
        };
        self.expand_at(index, ctx).await
    }

    async fn expand_at<E, S>(&mut self, index: usize, ctx: &TreeContext<'_, E, S>) -> Vec<TreeNode>
    where
        E: Executor + ?Sized,
        S: SecretStore,
    {
        let Some(entry) = self.entries.get(index) else {
            return Vec::new();
        };
        if !entry.is_expandable() || entry.expanded {
            return Vec::new();
        }
        let depth = entry.depth + 1;
        let children = tree::children(ctx, &entry.node).await;

        let rows: Vec<Entry> = children
            .iter()
            .map(|child| Entry::new(child.clone(), child.item(ctx.filters), depth))
            .collect();
        let at = index + 1;
        self.entries.splice(at..at, rows);
        if let Some(entry) = self.entries.get_mut(index) {
            entry.expanded = true;
            entry.item.state = Collapsible::Expanded;
        }
        children
    }

    pub fn collapse_selected(&mut self) {
        let Some(index) = self.state.selected() else {
            return;
        };
        match self.entries.get(index) {
            Some(entry) if entry.expanded => self.collapse_at(index),
            Some(_) => self.select_parent(),
            None => {}
        }
    }

    fn collapse_at(&mut self, index: usize) {
        let end = self.subtree_end(index);
        self.entries.drain(index + 1..end);
        if let Some(entry) = self.entries.get_mut(index) {
            entry.expanded = false;
            entry.item.state = Collapsible::Collapsed;
        }
    }

    /// One past the last descendant of `index`.
    fn subtree_end(&self, index: usize) -> usize {
        let Some(depth) = self.entries.get(index).map(|entry| entry.depth) else {
            return index;
        };
        self.entries
            .iter()
            .enumerate()
            .skip(index + 1)
            .find(|(_, entry)| entry.depth <= depth)
            .map_or(self.entries.len(), |(i, _)| i)
    }

    pub async fn toggle_selected<E, S>(&mut self, ctx: &TreeContext<'_, E, S>) -> Vec<TreeNode>
    where
        E: Executor + ?Sized,
        S: SecretStore,
    {
        let Some(index) = self.state.selected() else {
            return Vec::new();
        };
        if self.entries.get(index).is_some_and(|entry| entry.expanded) {
            self.collapse_at(index);
            Vec::new()
        } else {
            self.expand_at(index, ctx).await
        }
    }

    /// Rebuild the whole tree from the server.
    ///
    /// Rows that were open stay open and rows whose descriptor asks to be
    /// expanded are opened. The selection follows its id when it survives.
    pub async fn refresh<E, S>(&mut self, ctx: &TreeContext<'_, E, S>)
    where
        E: Executor + ?Sized,
        S: SecretStore,
    {
        let open: HashSet<String> = self
            .entries
            .iter()
            .filter(|entry| entry.expanded)
            .map(|entry| entry.item.id.clone())
            .collect();
        let selected_id = self.selected().map(|entry| entry.item.id.clone());

        let mut entries = Vec::new();
        let mut stack: Vec<(TreeNode, usize)> = tree::root_nodes(ctx.registry)
            .into_iter()
            .rev()
            .map(|node| (node, 0))
            .collect();

        while let Some((node, depth)) = stack.pop() {
            let item = node.item(ctx.filters);
            let mut entry = Entry::new(node, item, depth);
            if entry.is_expandable()
                && (open.contains(&entry.item.id) || entry.item.state == Collapsible::Expanded)
            {
                let children = tree::children(ctx, &entry.node).await;
                stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
                entry.expanded = true;
                entry.item.state = Collapsible::Expanded;
            }
            entries.push(entry);
        }

        tracing::debug!(rows = entries.len(), "tree refreshed");
        self.entries = entries;

        let selected = selected_id
            .and_then(|id| self.entries.iter().position(|entry| entry.item.id == id))
            .or_else(|| {
                self.state
                    .selected()
                    .map(|i| i.min(self.entries.len().saturating_sub(1)))
            })
            .or_else(|| (!self.entries.is_empty()).then_some(0));
        self.state
            .select(selected.filter(|_| !self.entries.is_empty()));
    }
}

#[cfg(test)]
mod tests {
    use miq_auth::MemoryStore;
    use miq_db::{ConnectionRegistry, NewConnection, testing::ScriptedExecutor};

    use super::*;
    use crate::filter_state::FilterState;

    fn registry() -> ConnectionRegistry<MemoryStore> {
        let mut registry = ConnectionRegistry::in_memory(MemoryStore::new()).unwrap();
        for host in ["alpha", "beta"] {
            registry
                .add(&NewConnection {
                    host: host.to_string(),
                    user: "root".to_string(),
                    ..NewConnection::default()
                })
                .unwrap();
        }
        registry
    }

    fn executor() -> ScriptedExecutor {
        ScriptedExecutor::new()
            .on_rows("SHOW DATABASES", &["Database"], &[&[Some("shop")], &[Some("crm")]])
            .on_rows(
                "information_schema.TABLES",
                &["name", "comment"],
                &[&[Some("orders"), Some("")]],
            )
            .on_rows(
                "information_schema.COLUMNS",
                &["name", "column_type", "nullable", "default_value", "column_key", "extra", "comment"],
                &[&[Some("id"), Some("int"), Some("NO"), None, Some("PRI"), Some(""), Some("")]],
            )
    }

    fn labels(explorer: &Explorer) -> Vec<(usize, &str)> {
        explorer
            .entries()
            .iter()
            .map(|e| (e.depth, e.item.label.as_str()))
            .collect()
    }

    #[tokio::test]
    async fn expand_and_collapse_selected() {
        let registry = registry();
        let executor = executor();
        let filters = FilterState::new();
        let ctx = TreeContext {
            executor: &executor,
            registry: &registry,
            filters: &filters,
            max_table_count: 500,
        };
        let mut explorer = Explorer::default();
        explorer.refresh(&ctx).await;
        assert_eq!(labels(&explorer), vec![(0, "alpha"), (0, "beta")]);
        assert_eq!(explorer.state.selected(), Some(0));

        let children = explorer.expand_selected(&ctx).await;
        assert_eq!(children.len(), 2);
        assert_eq!(
            labels(&explorer),
            vec![(0, "alpha"), (1, "shop"), (1, "crm"), (0, "beta")]
        );

        explorer.select_next();
        explorer.select_parent();
        assert_eq!(explorer.state.selected(), Some(0));

        explorer.collapse_selected();
        assert_eq!(labels(&explorer), vec![(0, "alpha"), (0, "beta")]);
    }

    #[tokio::test]
    async fn refresh_reopens_expanded_rows_and_keeps_selection() {
        let registry = registry();
        let executor = executor();
        let filters = FilterState::new();
        let ctx = TreeContext {
            executor: &executor,
            registry: &registry,
            filters: &filters,
            max_table_count: 500,
        };
        let mut explorer = Explorer::default();
        explorer.refresh(&ctx).await;
        explorer.expand_selected(&ctx).await;
        explorer.select_next();
        explorer.expand_selected(&ctx).await;
        explorer.select_next();
        assert_eq!(explorer.selected().unwrap().item.label, "orders");

        explorer.refresh(&ctx).await;
        assert_eq!(
            labels(&explorer),
            vec![(0, "alpha"), (1, "shop"), (2, "orders"), (1, "crm"), (0, "beta")]
        );
        assert_eq!(explorer.selected().unwrap().item.label, "orders");
        assert_eq!(
            explorer.selected_connection().map(|e| e.item.label.as_str()),
            Some("alpha")
        );
    }

    #[tokio::test]
    async fn expand_all_opens_every_level_and_collapse_all_closes() {
        let registry = registry();
        let executor = executor();
        let mut filters = FilterState::new();
        filters.set_all_expanded(true);
        let mut explorer = Explorer::default();
        {
            let ctx = TreeContext {
                executor: &executor,
                registry: &registry,
                filters: &filters,
                max_table_count: 500,
            };
            explorer.refresh(&ctx).await;
        }
        // 2 connections × (1 + 2 databases × (1 table + 1 column))
        assert_eq!(explorer.entries().len(), 2 * (1 + 2 * 3));

        filters.set_all_expanded(false);
        let ctx = TreeContext {
            executor: &executor,
            registry: &registry,
            filters: &filters,
            max_table_count: 500,
        };
        explorer.refresh(&ctx).await;
        assert_eq!(labels(&explorer), vec![(0, "alpha"), (0, "beta")]);
    }

    #[tokio::test]
    async fn toggle_on_leaf_does_nothing() {
        let registry = registry();
        let executor = executor();
        let filters = FilterState::new();
        let ctx = TreeContext {
            executor: &executor,
            registry: &registry,
            filters: &filters,
            max_table_count: 500,
        };
        let mut explorer = Explorer::default();
        explorer.refresh(&ctx).await;
        explorer.toggle_selected(&ctx).await;
        explorer.select_next();
        explorer.toggle_selected(&ctx).await;
        explorer.select_next();
        explorer.toggle_selected(&ctx).await;
        explorer.select_next();
        assert_eq!(explorer.selected().unwrap().item.label, "id : int");

        let before = explorer.entries().len();
        assert!(explorer.toggle_selected(&ctx).await.is_empty());
        assert_eq!(explorer.entries().len(), before);
        assert_eq!(explorer.rows().len(), before);
    }
}
