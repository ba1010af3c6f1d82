use miq_db::ConnectionOptions;

/// Which pane receives key events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Tree,
    Editor,
    Results,
}

impl Focus {
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Tree => Self::Editor,
            Self::Editor => Self::Results,
            Self::Results => Self::Tree,
        }
    }
}

/// The connection new queries run against.
///
/// Replaced wholesale whenever the user picks a database, opens a query or
/// browses table rows. Never merged with the previous value.
#[derive(Debug, Clone, Default)]
pub struct Session {
    active: Option<ConnectionOptions>,
}

impl Session {
    pub fn set(&mut self, options: ConnectionOptions) {
        tracing::info!(connection = %options, "active connection changed");
        self.active = Some(options);
    }

    /// Only used for the first successful load, so a later pick is never
    /// overridden.
    pub fn set_if_empty(&mut self, options: &ConnectionOptions) {
        if self.active.is_none() {
            self.set(options.clone());
        }
    }

    #[must_use]
    pub const fn get(&self) -> Option<&ConnectionOptions> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.active.as_ref().and_then(|o| o.database.as_deref())
    }

    #[must_use]
    pub fn label(&self) -> String {
        self.active
            .as_ref()
            .map_or_else(|| "No connection".to_string(), ToString::to_string)
    }
}
