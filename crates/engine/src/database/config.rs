//! Store configuration via `stratadoc.toml`
//!
//! Every key has a default, so an empty file (or no file) is a valid
//! configuration. Values are applied as SQLite pragmas when a database is
//! opened; anything SQLite would reject is caught here first and reported
//! as [`Error::Config`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use stratadoc_core::{Error, FieldNaming, Limits, Result, MAX_DOCUMENT_SIZE, MAX_NESTING_DEPTH};

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "stratadoc.toml";

const JOURNAL_MODES: &[&str] = &["delete", "truncate", "persist", "memory", "wal", "off"];
const SYNCHRONOUS_MODES: &[&str] = &["off", "normal", "full", "extra"];

/// Store configuration loaded from `stratadoc.toml`.
///
/// # Example
///
/// ```toml
/// journal_mode = "wal"
/// synchronous = "normal"
/// busy_timeout_ms = 5000
/// case_sensitive_like = true
/// statement_cache_capacity = 64
/// field_naming = "camel_case"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite journal mode (`PRAGMA journal_mode`)
    #[serde(default = "default_journal_mode")]
    pub journal_mode: String,
    /// SQLite sync level (`PRAGMA synchronous`)
    #[serde(default = "default_synchronous")]
    pub synchronous: String,
    /// How long a writer waits on a locked database file
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Whether `contains`/`startsWith`/`endsWith` match case-sensitively
    #[serde(default = "default_true")]
    pub case_sensitive_like: bool,
    /// Prepared statement cache size per connection
    #[serde(default = "default_statement_cache_capacity")]
    pub statement_cache_capacity: usize,
    /// Spelling of field names in stored payloads
    #[serde(default)]
    pub field_naming: FieldNaming,
    /// Maximum serialized document size in bytes
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,
    /// Maximum payload nesting depth
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
}

fn default_journal_mode() -> String {
    "wal".to_string()
}

fn default_synchronous() -> String {
    "normal".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_statement_cache_capacity() -> usize {
    64
}

fn default_max_document_bytes() -> usize {
    MAX_DOCUMENT_SIZE
}

fn default_max_nesting_depth() -> usize {
    MAX_NESTING_DEPTH
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            journal_mode: default_journal_mode(),
            synchronous: default_synchronous(),
            busy_timeout_ms: default_busy_timeout_ms(),
            case_sensitive_like: true,
            statement_cache_capacity: default_statement_cache_capacity(),
            field_naming: FieldNaming::default(),
            max_document_bytes: default_max_document_bytes(),
            max_nesting_depth: default_max_nesting_depth(),
        }
    }
}

impl StoreConfig {
    /// Check every value before it reaches SQLite.
    ///
    /// Mode names are compared case-insensitively.
    ///
    /// # Errors
    ///
    /// `Error::Config` naming the offending key.
    pub fn validate(&self) -> Result<()> {
        let journal = self.journal_mode.to_ascii_lowercase();
        if !JOURNAL_MODES.contains(&journal.as_str()) {
            return Err(Error::Config(format!(
                "invalid journal_mode '{}'; expected one of {}",
                self.journal_mode,
                JOURNAL_MODES.join(", ")
            )));
        }
        let sync = self.synchronous.to_ascii_lowercase();
        if !SYNCHRONOUS_MODES.contains(&sync.as_str()) {
            return Err(Error::Config(format!(
                "invalid synchronous '{}'; expected one of {}",
                self.synchronous,
                SYNCHRONOUS_MODES.join(", ")
            )));
        }
        if self.max_document_bytes == 0 {
            return Err(Error::Config("max_document_bytes must be positive".into()));
        }
        if self.max_nesting_depth == 0 {
            return Err(Error::Config("max_nesting_depth must be positive".into()));
        }
        Ok(())
    }

    /// Document limits derived from this config
    pub fn limits(&self) -> Limits {
        Limits {
            max_document_bytes: self.max_document_bytes,
            max_nesting_depth: self.max_nesting_depth,
        }
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# stratadoc configuration
#
# SQLite journal mode: delete, truncate, persist, memory, wal (default), off
journal_mode = "wal"

# SQLite sync level: off, normal (default), full, extra
synchronous = "normal"

# Milliseconds a writer waits for a locked database file
busy_timeout_ms = 5000

# contains/startsWith/endsWith match case-sensitively (default: true)
case_sensitive_like = true

# Prepared statement cache size
statement_cache_capacity = 64

# Field spelling in stored payloads: "camel_case" (default) or "as_is"
field_naming = "camel_case"

# Document limits
# max_document_bytes = 16777216
# max_nesting_depth = 100
"#
    }

    /// Parse config from TOML text and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: StoreConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
