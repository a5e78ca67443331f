//! Database connection management
//!
//! Provides utilities for opening, configuring and migrating SQLite
//! connections.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::migrations::apply_migrations;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// SQLite journal mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMode {
    /// Write-ahead log; readers do not block the writer
    Wal,
    /// Rollback journal, SQLite's own default
    Delete,
}

impl JournalMode {
    fn pragma_value(&self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
        }
    }
}

/// Connection settings applied by [`configure`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// How long a writer waits for the database lock before failing
    pub busy_timeout: Duration,
    pub journal_mode: JournalMode,
    pub foreign_keys: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            journal_mode: JournalMode::Wal,
            foreign_keys: true,
        }
    }
}

/// Open a SQLite database at the given path, without configuration
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(from_rusqlite)
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Apply `config` to an open connection
pub fn configure(conn: &Connection, config: &StoreConfig) -> Result<()> {
    conn.busy_timeout(config.busy_timeout)
        .map_err(from_rusqlite)?;

    let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {}", foreign_keys))
        .map_err(from_rusqlite)?;

    // journal_mode answers with the resulting mode; in-memory databases stay "memory".
    let mode: String = conn
        .query_row(
            &format!("PRAGMA journal_mode = {}", config.journal_mode.pragma_value()),
            [],
            |row| row.get(0),
        )
        .map_err(from_rusqlite)?;

    tracing::debug!(
        journal_mode = %mode,
        busy_timeout_ms = config.busy_timeout.as_millis() as u64,
        foreign_keys = config.foreign_keys,
        "connection configured"
    );
    Ok(())
}

/// Open, configure and migrate a database file
pub fn open_with<P: AsRef<Path>>(path: P, config: &StoreConfig) -> Result<Connection> {
    let mut conn = open(path)?;
    configure(&conn, config)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}
