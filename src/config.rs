use std::path::PathBuf;

use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};

use crate::conn_string::ConnectionString;
use crate::error::TaskQueueError;
use crate::queue::TaskQueue;

/// Where the queue's database lives.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Storage {
    /// Private in-memory database, discarded when the queue closes.
    #[default]
    Memory,
    /// File-backed database at the given path.
    File(PathBuf),
}

/// Options for opening a [`TaskQueue`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueOptions {
    pub storage: Storage,
    /// Raw connection string; overrides `storage` when set.
    pub connection: Option<String>,
    /// URI options merged into the connection string without overriding keys it already has.
    pub uri_options: Vec<String>,
    /// `key=value` pragmas applied in order right after open, before any task runs.
    pub pragmas: Vec<String>,
    pub foreign_keys: bool,
}

impl QueueOptions {
    #[must_use]
    pub fn memory() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            storage: Storage::File(path.into()),
            ..Self::default()
        }
    }

    /// The connection string the handle is opened with.
    #[must_use]
    pub fn connection_string(&self) -> ConnectionString {
        let mut cs = match (&self.connection, &self.storage) {
            (Some(raw), _) if !raw.is_empty() => ConnectionString::parse(raw),
            (_, Storage::Memory) => ConnectionString::parse(ConnectionString::MEMORY),
            (_, Storage::File(path)) => ConnectionString::for_path(&path.to_string_lossy()),
        };
        cs.merge(&self.uri_options);
        cs
    }

    /// Check pragma syntax without touching a database.
    ///
    /// # Errors
    /// Returns `TaskQueueError::ConfigError` for an entry that is not `key=value` with an
    /// identifier key.
    pub fn validate(&self) -> Result<(), TaskQueueError> {
        for pragma in &self.pragmas {
            parse_pragma(pragma)?;
        }
        Ok(())
    }
}

/// Fluent builder for [`QueueOptions`].
#[derive(Debug, Clone, Default)]
pub struct QueueOptionsBuilder {
    opts: QueueOptions,
}

impl QueueOptionsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn memory(mut self) -> Self {
        self.opts.storage = Storage::Memory;
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.opts.storage = Storage::File(path.into());
        self
    }

    #[must_use]
    pub fn connection(mut self, conn: impl Into<String>) -> Self {
        self.opts.connection = Some(conn.into());
        self
    }

    #[must_use]
    pub fn uri_option(mut self, option: impl Into<String>) -> Self {
        self.opts.uri_options.push(option.into());
        self
    }

    #[must_use]
    pub fn pragma(mut self, pragma: impl Into<String>) -> Self {
        self.opts.pragmas.push(pragma.into());
        self
    }

    #[must_use]
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.opts.foreign_keys = enabled;
        self
    }

    #[must_use]
    pub fn finish(self) -> QueueOptions {
        self.opts
    }

    /// Open the database and start the queue worker.
    ///
    /// # Errors
    /// Returns `TaskQueueError` if the options are invalid, the database cannot be opened, or
    /// the worker thread cannot be spawned.
    pub fn open(self) -> Result<TaskQueue, TaskQueueError> {
        TaskQueue::open(self.finish())
    }
}

/// Open the connection described by `opts` and apply its pragmas.
///
/// The returned handle is moved onto the queue worker before any task can see it.
pub(crate) fn open_handle(opts: &QueueOptions, uri: &str) -> Result<Connection, TaskQueueError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(uri, flags).map_err(|e| {
        TaskQueueError::ConnectionError(format!("failed to open SQLite database {uri}: {e}"))
    })?;

    // Bundled SQLite defaults enforcement on, so the flag is always applied.
    let foreign_keys = if opts.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
    for pragma in &opts.pragmas {
        let (key, value) = parse_pragma(pragma)?;
        conn.execute_batch(&format!("PRAGMA {key} = {value};"))?;
    }
    Ok(conn)
}

fn parse_pragma(pragma: &str) -> Result<(&str, &str), TaskQueueError> {
    let (key, value) = pragma
        .split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .ok_or_else(|| TaskQueueError::ConfigError(format!("pragma `{pragma}` is not key=value")))?;
    let is_ident = !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !is_ident {
        return Err(TaskQueueError::ConfigError(format!(
            "pragma key `{key}` is not an identifier"
        )));
    }
    if value.is_empty() || value.contains(';') {
        return Err(TaskQueueError::ConfigError(format!(
            "pragma `{key}` has an invalid value"
        )));
    }
    Ok((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_override_wins_and_uri_options_merge() {
        let opts = QueueOptionsBuilder::new()
            .path("/tmp/ignored.db")
            .connection("file:data.db?cache=shared")
            .uri_option("cache=private")
            .uri_option("mode=rwc")
            .finish();
        assert_eq!(
            opts.connection_string().to_string(),
            "file:data.db?cache=shared&mode=rwc"
        );
    }

    #[test]
    fn storage_defaults() {
        assert_eq!(QueueOptions::memory().connection_string().to_string(), "file::memory:");
        assert_eq!(
            QueueOptions::file("/var/db/a.db").connection_string().to_string(),
            "file:/var/db/a.db"
        );
    }

    #[test]
    fn pragmas_are_validated() {
        assert!(parse_pragma("journal_mode=WAL").is_ok());
        assert!(parse_pragma("busy_timeout = 5000").is_ok());
        assert!(parse_pragma("journal_mode").is_err());
        assert!(parse_pragma("x; DROP TABLE t=1").is_err());
        assert!(parse_pragma("cache_size=1; DROP TABLE t").is_err());
    }

    #[test]
    fn foreign_key_flag_is_applied_both_ways() -> Result<(), TaskQueueError> {
        for (enabled, expected) in [(false, 0_i64), (true, 1)] {
            let opts = QueueOptionsBuilder::new().foreign_keys(enabled).finish();
            let uri = opts.connection_string().to_string();
            let conn = open_handle(&opts, &uri)?;
            let actual: i64 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
            assert_eq!(actual, expected, "foreign_keys({enabled})");
        }
        Ok(())
    }

    #[test]
    fn options_deserialize_from_json() -> Result<(), serde_json::Error> {
        let opts: QueueOptions = serde_json::from_str(
            r#"{"storage": {"file": "app.db"}, "pragmas": ["journal_mode=WAL"], "foreign_keys": true}"#,
        )?;
        assert_eq!(opts.storage, Storage::File("app.db".into()));
        assert!(opts.foreign_keys);
        assert!(opts.connection.is_none());
        Ok(())
    }
}
