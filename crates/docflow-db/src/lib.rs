//! Job record store.
//!
//! Jobs live in the SQLite table `processed_files`. Access goes through the
//! [`JobRepository`] trait so the worker and API can be tested against an
//! in-memory database.

pub mod database;
pub mod error;
pub mod migrations;
pub mod repository;
pub mod sqlite;

pub use database::Database;
pub use error::{DbError, DbResult};
pub use repository::JobRepository;
pub use sqlite::SqliteJobRepository;
