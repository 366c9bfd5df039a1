//! Persistence layer: libSQL-backed storage for content entries.

pub mod libsql_backend;
pub mod migrations;

pub use libsql_backend::LibSqlEntryStore;
