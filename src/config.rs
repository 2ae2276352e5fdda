//! Repository configuration
//!
//! Handles loading `relmap.toml`:
//!
//! ```toml
//! [database]
//! path = "shop.db"
//! foreign_keys = true
//! isolation = "repeatable-read"
//! debug = false
//!
//! [services]
//! product = true
//! ```

use relmap_core::MapError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "relmap.toml";

/// Isolation requested when a transaction scope opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Isolation {
    /// Locks are taken on first access.
    Deferred,
    /// Write lock taken at `BEGIN`; no other writer can interleave.
    #[default]
    RepeatableRead,
    /// Exclusive lock taken at `BEGIN`.
    #[serde(alias = "exclusive")]
    Serializable,
}

impl Isolation {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deferred => "deferred",
            Self::RepeatableRead => "repeatable-read",
            Self::Serializable => "serializable",
        }
    }
}

impl std::fmt::Display for Isolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "rusqlite")]
impl From<Isolation> for rusqlite::TransactionBehavior {
    #[inline]
    fn from(isolation: Isolation) -> Self {
        match isolation {
            Isolation::Deferred => rusqlite::TransactionBehavior::Deferred,
            Isolation::RepeatableRead => rusqlite::TransactionBehavior::Immediate,
            Isolation::Serializable => rusqlite::TransactionBehavior::Exclusive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file; in-memory when absent.
    pub path: Option<PathBuf>,
    pub foreign_keys: bool,
    pub isolation: Isolation,
    /// Logs every statement at info level.
    pub debug: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            foreign_keys: true,
            isolation: Isolation::default(),
            debug: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    pub database: DatabaseConfig,
    /// Per-service debug flags, keyed by service name.
    pub services: BTreeMap<String, bool>,
}

impl RepoConfig {
    /// Load from the default config file
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.into())
            } else {
                ConfigError::Io(path.into(), e)
            }
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(path.into(), e))
    }

    /// Debug flag for `service`, falling back to the database-wide flag.
    pub fn service_debug(&self, service: &str) -> bool {
        self.services
            .get(service)
            .copied()
            .unwrap_or(self.database.debug)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),
}

impl From<ConfigError> for MapError {
    fn from(err: ConfigError) -> Self {
        MapError::Config(err.to_string())
    }
}
