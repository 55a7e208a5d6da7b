//! Database module: schema declaration, provisioning and row access.
//!
//! Layout:
//! - `schema.rs`: static table/column/relationship declarations
//! - `dialect.rs`: DDL rendering per backend (SQLite, MySQL)
//! - `catalog.rs`: reading live table shapes back for comparison
//! - `provision.rs`: the one-shot "create tables if absent" routine
//! - `models.rs`: Rust structs mirroring DB rows
//! - `sqlite.rs`: row access over a SQLite pool

pub mod catalog;
pub mod dialect;
pub mod models;
pub mod provision;
pub mod schema;
pub mod sqlite;

pub use catalog::{Catalog, TableShape};
pub use dialect::Dialect;
pub use models::{Course, NewCourse, NewUser, User};
pub use provision::{ProvisionReport, provision};
pub use schema::{Schema, define_schema};
pub use sqlite::{CourseStorage, SqlitePool};
