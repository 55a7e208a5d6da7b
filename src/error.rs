use sqlx::Error as SqlxError;
use sqlx::error::ErrorKind;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum CourseDbError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Schema conflict on table `{table}`: {detail}")]
    SchemaConflict { table: String, detail: String },

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("Invalid schema declaration: {0}")]
    InvalidSchema(String),

    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Unsupported connection scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Database error: {0}")]
    DatabaseError(SqlxError),
}

impl CourseDbError {
    /// Wrap a driver error raised while establishing a connection.
    pub fn connection(e: SqlxError) -> Self {
        CourseDbError::Connection(e.to_string())
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, CourseDbError::Connection(_))
    }

    pub fn is_schema_conflict(&self) -> bool {
        matches!(self, CourseDbError::SchemaConflict { .. })
    }
}

impl From<SqlxError> for CourseDbError {
    fn from(e: SqlxError) -> Self {
        if let Some(db_err) = e.as_database_error() {
            match db_err.kind() {
                ErrorKind::UniqueViolation => {
                    return CourseDbError::UniqueViolation(db_err.message().to_string());
                }
                ErrorKind::ForeignKeyViolation => {
                    return CourseDbError::ForeignKeyViolation(db_err.message().to_string());
                }
                _ => {}
            }
        }
        match e {
            SqlxError::Io(_) | SqlxError::Tls(_) | SqlxError::PoolTimedOut => {
                CourseDbError::connection(e)
            }
            other => CourseDbError::DatabaseError(other),
        }
    }
}
