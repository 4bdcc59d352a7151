//! Host and storage backend selectors, fixed per handle at initialize time.

use std::fmt;
use std::str::FromStr;

/// Kind of host process the handle serves
///
/// Selects the durability profile of the store: a manager keeps full
/// synchronous commits, an agent trades them for lower I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HostType {
    Manager,
    #[default]
    Agent,
}

/// Storage backend variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DbEngineType {
    /// SQLite database file at the storage path
    #[default]
    Sqlite3,
    /// Private in-memory SQLite database; the storage path is only a label
    InMemory,
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostType::Manager => f.write_str("manager"),
            HostType::Agent => f.write_str("agent"),
        }
    }
}

impl FromStr for HostType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "manager" => Ok(HostType::Manager),
            "agent" => Ok(HostType::Agent),
            other => Err(format!("unknown host type: {}", other)),
        }
    }
}

impl fmt::Display for DbEngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbEngineType::Sqlite3 => f.write_str("sqlite3"),
            DbEngineType::InMemory => f.write_str("memory"),
        }
    }
}

impl FromStr for DbEngineType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite3" | "sqlite" => Ok(DbEngineType::Sqlite3),
            "memory" | "in-memory" => Ok(DbEngineType::InMemory),
            other => Err(format!("unknown engine type: {}", other)),
        }
    }
}
