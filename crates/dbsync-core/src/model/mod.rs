//! Typed values, rows and host/engine selectors

pub mod host;
pub mod row;
pub mod value;

pub use host::{DbEngineType, HostType};
pub use row::{IncomingRow, PrimaryKey, Row};
pub use value::{ColumnType, Value};
