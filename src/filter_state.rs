/// Tree-wide filters and the expand-all switch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    table_filter: String,
    column_filter: String,
    all_expanded: bool,
    expand_version: u64,
}

impl FilterState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn table_filter(&self) -> &str {
        &self.table_filter
    }

    #[must_use]
    pub fn column_filter(&self) -> &str {
        &self.column_filter
    }

    #[must_use]
    pub const fn all_expanded(&self) -> bool {
        self.all_expanded
    }

    #[must_use]
    pub const fn expand_version(&self) -> u64 {
        self.expand_version
    }

    /// Returns whether the filter changed.
    pub fn set_table_filter(&mut self, filter: &str) -> bool {
        Self::replace(&mut self.table_filter, filter)
    }

    /// Returns whether the filter changed.
    pub fn set_column_filter(&mut self, filter: &str) -> bool {
        Self::replace(&mut self.column_filter, filter)
    }

    fn replace(slot: &mut String, filter: &str) -> bool {
        let filter = filter.trim();
        if slot == filter {
            return false;
        }
        filter.clone_into(slot);
        true
    }

    /// Bumps the expand version only when the flag flips.
    pub fn set_all_expanded(&mut self, expanded: bool) -> bool {
        if self.all_expanded == expanded {
            return false;
        }
        self.all_expanded = expanded;
        self.expand_version += 1;
        true
    }

    /// Clears both filters. Returns whether anything changed.
    pub fn clear(&mut self) -> bool {
        let changed = !self.table_filter.is_empty() || !self.column_filter.is_empty();
        self.table_filter.clear();
        self.column_filter.clear();
        changed
    }

    #[must_use]
    pub fn has_column_filter(&self) -> bool {
        !self.column_filter.is_empty()
    }

    /// Case-insensitive substring match on the name or comment.
    #[must_use]
    pub fn matches_table(&self, name: &str, comment: &str) -> bool {
        contains_any(&self.table_filter, &[name, comment])
    }

    /// Case-insensitive substring match on the name, comment or type.
    #[must_use]
    pub fn matches_column(&self, name: &str, comment: &str, column_type: &str) -> bool {
        contains_any(&self.column_filter, &[name, comment, column_type])
    }
}

fn contains_any(filter: &str, haystacks: &[&str]) -> bool {
    if filter.is_empty() {
        return true;
    }
    let needle = filter.to_lowercase();
    haystacks
        .iter()
        .any(|h| h.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_same_filter_reports_no_change() {
        let mut filters = FilterState::new();
        assert!(filters.set_table_filter("ord"));
        assert!(!filters.set_table_filter("ord"));
        assert!(!filters.set_table_filter(" ord "));
        assert!(filters.set_column_filter("id"));
        assert!(!filters.set_column_filter("id"));
    }

    #[test]
    fn expand_version_bumps_only_on_change() {
        let mut filters = FilterState::new();
        assert!(!filters.set_all_expanded(false));
        assert_eq!(filters.expand_version(), 0);

        assert!(filters.set_all_expanded(true));
        assert!(!filters.set_all_expanded(true));
        assert_eq!(filters.expand_version(), 1);

        assert!(filters.set_all_expanded(false));
        assert_eq!(filters.expand_version(), 2);
    }

    #[test]
    fn clear_resets_both_filters() {
        let mut filters = FilterState::new();
        filters.set_table_filter("a");
        filters.set_column_filter("b");
        filters.set_all_expanded(true);

        assert!(filters.clear());
        assert!(!filters.clear());
        assert_eq!(filters.table_filter(), "");
        assert_eq!(filters.column_filter(), "");
        assert!(filters.all_expanded());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let mut filters = FilterState::new();
        assert!(filters.matches_table("anything", ""));

        filters.set_table_filter("ORD");
        assert!(filters.matches_table("orders", ""));
        assert!(filters.matches_table("t1", "Customer orders"));
        assert!(!filters.matches_table("users", "people"));

        filters.set_column_filter("varchar");
        assert!(filters.matches_column("name", "", "VARCHAR(20)"));
        assert!(!filters.matches_column("id", "", "int"));
    }
}
