//! One-shot creation of the declared tables.

use crate::config::{ConnectionConfig, Driver};
use crate::db::catalog::Catalog;
use crate::db::dialect::Dialect;
use crate::db::schema::Schema;
use crate::error::CourseDbError;
use sqlx::{Connection, MySqlConnection, SqliteConnection};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What `provision` did to each declared table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    pub created: Vec<String>,
    /// Already present with the declared shape.
    pub verified: Vec<String>,
}

impl ProvisionReport {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
    }
}

/// Connect to the configured database, create every declared table that is
/// absent and check the ones that exist. The connection is closed before
/// returning, on success and on failure.
///
/// Tables created before a later failure are left in place.
pub async fn provision(
    schema: &Schema,
    cfg: &ConnectionConfig,
) -> Result<ProvisionReport, CourseDbError> {
    schema.validate()?;
    let dialect = Dialect::from(cfg.driver);
    info!(target_db = %cfg, "provisioning schema");

    match cfg.driver {
        Driver::Sqlite => {
            let opts = cfg.sqlite_options();
            let mut conn =
                connect_within(cfg.connect_timeout(), SqliteConnection::connect_with(&opts))
                    .await?;
            let result = create_missing(&mut conn, schema, dialect).await;
            if let Err(e) = conn.close().await {
                warn!(error = %e, "failed to close sqlite connection cleanly");
            }
            result
        }
        Driver::Mysql => {
            let opts = cfg.mysql_options();
            let mut conn =
                connect_within(cfg.connect_timeout(), MySqlConnection::connect_with(&opts))
                    .await?;
            let result = create_missing(&mut conn, schema, dialect).await;
            if let Err(e) = conn.close().await {
                warn!(error = %e, "failed to close mysql connection cleanly");
            }
            result
        }
    }
}

async fn connect_within<C>(
    timeout: Duration,
    connect: impl Future<Output = Result<C, sqlx::Error>>,
) -> Result<C, CourseDbError> {
    match tokio::time::timeout(timeout, connect).await {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(e)) => Err(CourseDbError::connection(e)),
        Err(_) => Err(CourseDbError::Connection(format!(
            "timed out after {}s",
            timeout.as_secs()
        ))),
    }
}

/// Create absent tables in declaration order; existing tables must match
/// their declared shape exactly.
pub async fn create_missing<C: Catalog>(
    conn: &mut C,
    schema: &Schema,
    dialect: Dialect,
) -> Result<ProvisionReport, CourseDbError> {
    let mut report = ProvisionReport::default();

    for table in &schema.tables {
        let expected = table.shape();
        match conn.inspect_table(table.name).await? {
            Some(actual) => {
                let diff = expected.diff(&actual);
                if !diff.is_empty() {
                    warn!(
                        table = table.name,
                        differences = diff.len(),
                        "existing table does not match declaration"
                    );
                    return Err(CourseDbError::SchemaConflict {
                        table: table.name.to_string(),
                        detail: diff.join("; "),
                    });
                }
                info!(table = table.name, "table already present");
                report.verified.push(table.name.to_string());
            }
            None => {
                let ddl = dialect.create_table(table);
                debug!(table = table.name, ddl = %ddl, "creating table");
                conn.execute_ddl(&ddl).await?;
                info!(table = table.name, "table created");
                report.created.push(table.name.to_string());
            }
        }
    }

    Ok(report)
}
