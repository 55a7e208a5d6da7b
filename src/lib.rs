pub mod config;
pub mod db;
pub mod error;

pub use config::{Config, ConnectionConfig, Driver};
pub use db::{CourseStorage, ProvisionReport, Schema, define_schema, provision};
pub use error::CourseDbError;
