//! Reading table definitions back out of a live database.

use crate::db::dialect::Dialect;
use crate::db::schema::{ColumnType, OnDelete};
use crate::error::CourseDbError;
use sqlx::{MySqlConnection, Row, SqliteConnection};
use std::fmt;
use std::future::Future;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnShape {
    pub name: String,
    pub ty: ColumnType,
    pub primary_key: bool,
    pub nullable: bool,
    /// Single-column unique constraint, not counting the primary key.
    pub unique: bool,
}

impl fmt::Display for ColumnShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty)?;
        if self.primary_key {
            write!(f, " primary key")?;
        }
        if self.unique {
            write!(f, " unique")?;
        }
        if !self.nullable && !self.primary_key {
            write!(f, " not null")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyShape {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
    pub on_delete: OnDelete,
}

impl fmt::Display for ForeignKeyShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "-> {}.{} on delete {}",
            self.references_table,
            self.references_column,
            self.on_delete.as_sql().to_ascii_lowercase()
        )
    }
}

/// Normalized view of one table, comparable across backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableShape {
    pub name: String,
    pub columns: Vec<ColumnShape>,
    pub foreign_keys: Vec<ForeignKeyShape>,
}

impl TableShape {
    pub fn column(&self, name: &str) -> Option<&ColumnShape> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn foreign_key(&self, column: &str) -> Option<&ForeignKeyShape> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }

    /// Differences between this (declared) shape and `actual`, one line each.
    /// Column order is ignored.
    pub fn diff(&self, actual: &TableShape) -> Vec<String> {
        let mut out = Vec::new();

        for want in &self.columns {
            match actual.column(&want.name) {
                None => out.push(format!("missing column `{}`", want.name)),
                Some(got) if got != want => out.push(format!(
                    "column `{}`: expected {}, found {}",
                    want.name, want, got
                )),
                Some(_) => {}
            }
        }
        for got in &actual.columns {
            if self.column(&got.name).is_none() {
                out.push(format!("unexpected column `{}`", got.name));
            }
        }

        for want in &self.foreign_keys {
            match actual.foreign_key(&want.column) {
                None => out.push(format!("missing foreign key on `{}`", want.column)),
                Some(got) if got != want => out.push(format!(
                    "foreign key on `{}`: expected {}, found {}",
                    want.column, want, got
                )),
                Some(_) => {}
            }
        }
        for got in &actual.foreign_keys {
            if self.foreign_key(&got.column).is_none() {
                out.push(format!("unexpected foreign key on `{}`", got.column));
            }
        }

        out
    }
}

/// A connection whose catalog can be read and extended.
pub trait Catalog {
    /// `Ok(None)` when the table does not exist.
    fn inspect_table(
        &mut self,
        table: &str,
    ) -> impl Future<Output = Result<Option<TableShape>, CourseDbError>> + Send;

    fn execute_ddl(&mut self, sql: &str) -> impl Future<Output = Result<(), CourseDbError>> + Send;
}

fn unsupported_type(table: &str, column: &str, decl: &str) -> CourseDbError {
    CourseDbError::SchemaConflict {
        table: table.to_string(),
        detail: format!("column `{column}` has unsupported type `{decl}`"),
    }
}

fn unknown_rule(table: &str, column: &str, rule: &str) -> CourseDbError {
    CourseDbError::SchemaConflict {
        table: table.to_string(),
        detail: format!("foreign key on `{column}` has unknown delete rule `{rule}`"),
    }
}

async fn sqlite_primary_key(
    conn: &mut SqliteConnection,
    table: &str,
) -> Result<Option<String>, CourseDbError> {
    let rows = sqlx::query(&format!(
        "PRAGMA table_info({})",
        Dialect::Sqlite.quote(table)
    ))
    .fetch_all(&mut *conn)
    .await?;
    for row in rows {
        let pk: i64 = row.try_get("pk")?;
        if pk == 1 {
            return Ok(Some(row.try_get("name")?));
        }
    }
    Ok(None)
}

impl Catalog for SqliteConnection {
    async fn inspect_table(&mut self, table: &str) -> Result<Option<TableShape>, CourseDbError> {
        let quoted = Dialect::Sqlite.quote(table);

        let rows = sqlx::query(&format!("PRAGMA table_info({quoted})"))
            .fetch_all(&mut *self)
            .await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("name")?;
            let decl: String = row.try_get("type")?;
            let notnull: i64 = row.try_get("notnull")?;
            let pk: i64 = row.try_get("pk")?;
            let ty = ColumnType::parse(&decl).ok_or_else(|| unsupported_type(table, &name, &decl))?;
            columns.push(ColumnShape {
                name,
                ty,
                primary_key: pk != 0,
                nullable: notnull == 0 && pk == 0,
                unique: false,
            });
        }

        let indexes = sqlx::query(&format!("PRAGMA index_list({quoted})"))
            .fetch_all(&mut *self)
            .await?;
        let mut unique_indexes = Vec::new();
        for index in indexes {
            let unique: i64 = index.try_get("unique")?;
            let origin: String = index.try_get("origin")?;
            if unique != 0 && origin != "pk" {
                unique_indexes.push(index.try_get::<String, _>("name")?);
            }
        }
        for index_name in unique_indexes {
            let members = sqlx::query(&format!(
                "PRAGMA index_info({})",
                Dialect::Sqlite.quote(&index_name)
            ))
            .fetch_all(&mut *self)
            .await?;
            if let [member] = members.as_slice() {
                let column: String = member.try_get("name")?;
                if let Some(col) = columns.iter_mut().find(|c| c.name == column) {
                    col.unique = !col.primary_key;
                }
            }
        }

        let fk_rows = sqlx::query(&format!("PRAGMA foreign_key_list({quoted})"))
            .fetch_all(&mut *self)
            .await?;
        let mut declared = Vec::with_capacity(fk_rows.len());
        for row in fk_rows {
            let column: String = row.try_get("from")?;
            let references_table: String = row.try_get("table")?;
            let references_column: Option<String> = row.try_get("to")?;
            let rule: String = row.try_get("on_delete")?;
            declared.push((column, references_table, references_column, rule));
        }

        let mut foreign_keys = Vec::with_capacity(declared.len());
        for (column, references_table, references_column, rule) in declared {
            let on_delete =
                OnDelete::parse(&rule).ok_or_else(|| unknown_rule(table, &column, &rule))?;
            // `REFERENCES parent` without a column targets the parent's key.
            let references_column = match references_column {
                Some(col) => col,
                None => sqlite_primary_key(&mut *self, &references_table)
                    .await?
                    .unwrap_or_default(),
            };
            foreign_keys.push(ForeignKeyShape {
                column,
                references_table,
                references_column,
                on_delete,
            });
        }

        Ok(Some(TableShape {
            name: table.to_string(),
            columns,
            foreign_keys,
        }))
    }

    async fn execute_ddl(&mut self, sql: &str) -> Result<(), CourseDbError> {
        sqlx::query(sql).execute(&mut *self).await?;
        Ok(())
    }
}

impl Catalog for MySqlConnection {
    async fn inspect_table(&mut self, table: &str) -> Result<Option<TableShape>, CourseDbError> {
        // information_schema columns come back as binary strings on some
        // server versions; CAST keeps them decodable as text.
        let rows = sqlx::query(
            r#"SELECT CAST(COLUMN_NAME AS CHAR) AS column_name,
                      CAST(COLUMN_TYPE AS CHAR) AS column_type,
                      CAST(IS_NULLABLE AS CHAR) AS is_nullable,
                      CAST(COLUMN_KEY AS CHAR) AS column_key
               FROM information_schema.COLUMNS
               WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
               ORDER BY ORDINAL_POSITION"#,
        )
        .bind(table)
        .fetch_all(&mut *self)
        .await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("column_name")?;
            let decl: String = row.try_get("column_type")?;
            let is_nullable: String = row.try_get("is_nullable")?;
            let key: String = row.try_get("column_key")?;
            let ty = ColumnType::parse(&decl).ok_or_else(|| unsupported_type(table, &name, &decl))?;
            let primary_key = key == "PRI";
            columns.push(ColumnShape {
                name,
                ty,
                primary_key,
                nullable: is_nullable == "YES" && !primary_key,
                unique: key == "UNI",
            });
        }

        let fk_rows = sqlx::query(
            r#"SELECT CAST(k.COLUMN_NAME AS CHAR) AS column_name,
                      CAST(k.REFERENCED_TABLE_NAME AS CHAR) AS referenced_table,
                      CAST(k.REFERENCED_COLUMN_NAME AS CHAR) AS referenced_column,
                      CAST(r.DELETE_RULE AS CHAR) AS delete_rule
               FROM information_schema.KEY_COLUMN_USAGE k
               JOIN information_schema.REFERENTIAL_CONSTRAINTS r
                 ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA
                AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME
               WHERE k.TABLE_SCHEMA = DATABASE()
                 AND k.TABLE_NAME = ?
                 AND k.REFERENCED_TABLE_NAME IS NOT NULL"#,
        )
        .bind(table)
        .fetch_all(&mut *self)
        .await?;

        let mut foreign_keys = Vec::with_capacity(fk_rows.len());
        for row in fk_rows {
            let column: String = row.try_get("column_name")?;
            let rule: String = row.try_get("delete_rule")?;
            let on_delete =
                OnDelete::parse(&rule).ok_or_else(|| unknown_rule(table, &column, &rule))?;
            foreign_keys.push(ForeignKeyShape {
                references_table: row.try_get("referenced_table")?,
                references_column: row.try_get("referenced_column")?,
                column,
                on_delete,
            });
        }

        Ok(Some(TableShape {
            name: table.to_string(),
            columns,
            foreign_keys,
        }))
    }

    async fn execute_ddl(&mut self, sql: &str) -> Result<(), CourseDbError> {
        sqlx::query(sql).execute(&mut *self).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::{COURSE_TABLE, define_schema};

    #[test]
    fn identical_shapes_have_no_diff() {
        let schema = define_schema();
        for table in &schema.tables {
            assert!(table.shape().diff(&table.shape()).is_empty());
        }
    }

    #[test]
    fn diff_reports_changed_and_extra_columns() {
        let expected = define_schema().table(COURSE_TABLE).unwrap().shape();
        let mut actual = expected.clone();
        actual.columns[1].ty = ColumnType::Varchar(128);
        actual.columns.push(ColumnShape {
            name: "price".to_string(),
            ty: ColumnType::Integer,
            primary_key: false,
            nullable: true,
            unique: false,
        });
        actual.foreign_keys[0].on_delete = OnDelete::NoAction;

        let diff = expected.diff(&actual);
        assert_eq!(
            diff,
            vec![
                "column `name`: expected varchar(64), found varchar(128)".to_string(),
                "unexpected column `price`".to_string(),
                "foreign key on `user_id`: expected -> user.id on delete cascade, \
                 found -> user.id on delete no action"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn diff_reports_missing_pieces() {
        let expected = define_schema().table(COURSE_TABLE).unwrap().shape();
        let mut actual = expected.clone();
        actual.columns.retain(|c| c.name != "user_id");
        actual.foreign_keys.clear();

        let diff = expected.diff(&actual);
        assert_eq!(
            diff,
            vec![
                "missing column `user_id`".to_string(),
                "missing foreign key on `user_id`".to_string(),
            ]
        );
    }
}
