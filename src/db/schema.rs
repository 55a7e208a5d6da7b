//! Declarative description of the `user` / `course` tables.
//!
//! Nothing here performs I/O. [`define_schema`] builds a [`Schema`] value
//! which the provisioner renders into DDL through a [`Dialect`] and compares
//! against the live catalog through [`TableShape`].
//!
//! [`Dialect`]: crate::db::dialect::Dialect

use crate::db::catalog::{ColumnShape, ForeignKeyShape, TableShape};
use crate::error::CourseDbError;
use std::fmt;

pub const USER_TABLE: &str = "user";
pub const COURSE_TABLE: &str = "course";

/// Width shared by every string column.
pub const NAME_MAX_LEN: u16 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Varchar(u16),
}

impl ColumnType {
    /// Normalize a catalog type declaration (`INTEGER`, `int(11)`,
    /// `VARCHAR(64)`, ...) into a `ColumnType`.
    pub fn parse(decl: &str) -> Option<Self> {
        let decl = decl.trim().to_ascii_lowercase();
        let (base, arg) = match decl.split_once('(') {
            Some((base, rest)) => (base.trim(), Some(rest.trim_end_matches(')').trim())),
            None => (decl.as_str(), None),
        };
        match base {
            "integer" | "int" => Some(ColumnType::Integer),
            "varchar" => arg?.parse().ok().map(ColumnType::Varchar),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Varchar(len) => write!(f, "varchar({len})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    NoAction,
    Restrict,
    SetNull,
    Cascade,
}

impl OnDelete {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OnDelete::NoAction => "NO ACTION",
            OnDelete::Restrict => "RESTRICT",
            OnDelete::SetNull => "SET NULL",
            OnDelete::Cascade => "CASCADE",
        }
    }

    /// Parse a delete rule as reported by the catalog.
    pub fn parse(rule: &str) -> Option<Self> {
        match rule.trim().to_ascii_uppercase().as_str() {
            "NO ACTION" | "" => Some(OnDelete::NoAction),
            "RESTRICT" => Some(OnDelete::Restrict),
            "SET NULL" => Some(OnDelete::SetNull),
            "CASCADE" => Some(OnDelete::Cascade),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub primary_key: bool,
    pub nullable: bool,
    pub unique: bool,
}

impl Column {
    /// A nullable, non-unique column.
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            primary_key: false,
            nullable: true,
            unique: false,
        }
    }

    /// Auto-assigned integer primary key.
    pub const fn id() -> Self {
        Self {
            name: "id",
            ty: ColumnType::Integer,
            primary_key: true,
            nullable: false,
            unique: false,
        }
    }

    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references_table: &'static str,
    pub references_column: &'static str,
    pub on_delete: OnDelete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: &'static str,
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The catalog shape this declaration should produce.
    pub fn shape(&self) -> TableShape {
        TableShape {
            name: self.name.to_string(),
            columns: self
                .columns
                .iter()
                .map(|c| ColumnShape {
                    name: c.name.to_string(),
                    ty: c.ty,
                    primary_key: c.primary_key,
                    nullable: c.nullable && !c.primary_key,
                    unique: c.unique && !c.primary_key,
                })
                .collect(),
            foreign_keys: self
                .foreign_keys
                .iter()
                .map(|fk| ForeignKeyShape {
                    column: fk.column.to_string(),
                    references_table: fk.references_table.to_string(),
                    references_column: fk.references_column.to_string(),
                    on_delete: fk.on_delete,
                })
                .collect(),
        }
    }
}

/// One-to-many link between a parent table and the child rows pointing at it.
///
/// `delete_orphans` means removing a parent through the object API also
/// removes its children; it requires the backing foreign key to cascade so
/// that plain SQL deletes behave the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub parent: &'static str,
    pub child: &'static str,
    pub via: &'static str,
    pub delete_orphans: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// In creation order: a table only references tables before it.
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
}

impl Schema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn validate(&self) -> Result<(), CourseDbError> {
        for (idx, table) in self.tables.iter().enumerate() {
            let earlier = &self.tables[..idx];
            if earlier.iter().any(|t| t.name == table.name) {
                return Err(CourseDbError::InvalidSchema(format!(
                    "table `{}` declared twice",
                    table.name
                )));
            }
            for fk in &table.foreign_keys {
                if table.column(fk.column).is_none() {
                    return Err(CourseDbError::InvalidSchema(format!(
                        "`{}.{}` is not a declared column",
                        table.name, fk.column
                    )));
                }
                let target = earlier
                    .iter()
                    .find(|t| t.name == fk.references_table)
                    .ok_or_else(|| {
                        CourseDbError::InvalidSchema(format!(
                            "`{}.{}` references `{}`, which is not declared before it",
                            table.name, fk.column, fk.references_table
                        ))
                    })?;
                if target.column(fk.references_column).is_none() {
                    return Err(CourseDbError::InvalidSchema(format!(
                        "`{}.{}` references missing column `{}.{}`",
                        table.name, fk.column, fk.references_table, fk.references_column
                    )));
                }
            }
        }

        for rel in &self.relationships {
            let fk = self
                .table(rel.child)
                .and_then(|t| {
                    t.foreign_keys
                        .iter()
                        .find(|fk| fk.column == rel.via && fk.references_table == rel.parent)
                })
                .ok_or_else(|| {
                    CourseDbError::InvalidSchema(format!(
                        "relationship {} -> {} has no foreign key on `{}.{}`",
                        rel.parent, rel.child, rel.child, rel.via
                    ))
                })?;
            if rel.delete_orphans && fk.on_delete != OnDelete::Cascade {
                return Err(CourseDbError::InvalidSchema(format!(
                    "relationship {} -> {} deletes orphans but `{}.{}` is ON DELETE {}",
                    rel.parent,
                    rel.child,
                    rel.child,
                    rel.via,
                    fk.on_delete.as_sql()
                )));
            }
        }
        Ok(())
    }
}

/// Declare the `user` and `course` tables and the user -> course relationship.
pub fn define_schema() -> Schema {
    let user = Table {
        name: USER_TABLE,
        columns: vec![
            Column::id(),
            Column::new("name", ColumnType::Varchar(NAME_MAX_LEN))
                .unique()
                .not_null(),
            Column::new("email", ColumnType::Varchar(NAME_MAX_LEN)).unique(),
        ],
        foreign_keys: vec![],
    };

    let course = Table {
        name: COURSE_TABLE,
        columns: vec![
            Column::id(),
            Column::new("name", ColumnType::Varchar(NAME_MAX_LEN)),
            Column::new("user_id", ColumnType::Integer),
        ],
        foreign_keys: vec![ForeignKey {
            column: "user_id",
            references_table: USER_TABLE,
            references_column: "id",
            on_delete: OnDelete::Cascade,
        }],
    };

    Schema {
        tables: vec![user, course],
        relationships: vec![Relationship {
            parent: USER_TABLE,
            child: COURSE_TABLE,
            via: "user_id",
            delete_orphans: true,
        }],
    }
}
