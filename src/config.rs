use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::{Result, eyre::eyre};
use serde::{Deserialize, Serialize};

/// User settings from `config.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tables listed per database node
    pub max_table_count: u64,
    /// Rewrite `DELIMITER` scripts before running them
    pub enable_delimiter_operator: bool,
    /// Result rows per page
    pub page_size: usize,
    /// `LIMIT` added to bare `SELECT`s
    pub default_limit: u64,
    pub sample_rows: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_table_count: 500,
            enable_delimiter_operator: true,
            page_size: 100,
            default_limit: 100,
            sample_rows: 5,
        }
    }
}

impl Config {
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "miq")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Read `path`, or the default location when `None`. A missing file
    /// gives the defaults.
    ///
    /// # Errors
    ///
    /// Fails when the file exists but cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| eyre!("invalid config {}: {e}", path.display()))?;
        Ok(config.sanitized())
    }

    fn sanitized(mut self) -> Self {
        self.page_size = self.page_size.max(1);
        self.max_table_count = self.max_table_count.max(1);
        self.sample_rows = self.sample_rows.max(1);
        self
    }
}

/// Browse MySQL servers and run ad-hoc SQL from the terminal.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Settings file, defaults to `config.toml` in the user config directory
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Keep passwords in memory only for this run
    #[arg(long)]
    pub no_keyring: bool,
}
