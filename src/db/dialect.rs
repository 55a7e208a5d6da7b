//! DDL rendering for the supported backends.

use crate::config::Driver;
use crate::db::schema::{ColumnType, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    MySql,
}

impl From<Driver> for Dialect {
    fn from(driver: Driver) -> Self {
        match driver {
            Driver::Sqlite => Dialect::Sqlite,
            Driver::Mysql => Dialect::MySql,
        }
    }
}

impl Dialect {
    pub fn quote(&self, ident: &str) -> String {
        match self {
            Dialect::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
            Dialect::MySql => format!("`{}`", ident.replace('`', "``")),
        }
    }

    fn column_type(&self, ty: ColumnType) -> String {
        match ty {
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::Varchar(len) => format!("VARCHAR({len})"),
        }
    }

    /// `CREATE TABLE IF NOT EXISTS` for one declared table.
    ///
    /// SQLite keeps `INTEGER PRIMARY KEY` inline so the column aliases the
    /// rowid and is auto-assigned; MySQL needs `AUTO_INCREMENT` and InnoDB for
    /// the foreign key to be enforced.
    pub fn create_table(&self, table: &Table) -> String {
        let mut defs: Vec<String> = Vec::new();

        for col in &table.columns {
            let mut def = format!("{} {}", self.quote(col.name), self.column_type(col.ty));
            match self {
                Dialect::Sqlite => {
                    if col.primary_key {
                        def.push_str(" PRIMARY KEY");
                    } else {
                        if !col.nullable {
                            def.push_str(" NOT NULL");
                        }
                        if col.unique {
                            def.push_str(" UNIQUE");
                        }
                    }
                }
                Dialect::MySql => {
                    if col.primary_key {
                        def.push_str(" NOT NULL AUTO_INCREMENT");
                    } else if col.nullable {
                        def.push_str(" NULL");
                    } else {
                        def.push_str(" NOT NULL");
                    }
                }
            }
            defs.push(def);
        }

        if *self == Dialect::MySql {
            for col in table.columns.iter().filter(|c| c.primary_key) {
                defs.push(format!("PRIMARY KEY ({})", self.quote(col.name)));
            }
            for col in table.columns.iter().filter(|c| c.unique && !c.primary_key) {
                defs.push(format!("UNIQUE ({})", self.quote(col.name)));
            }
        }

        for fk in &table.foreign_keys {
            defs.push(format!(
                "FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
                self.quote(fk.column),
                self.quote(fk.references_table),
                self.quote(fk.references_column),
                fk.on_delete.as_sql()
            ));
        }

        let suffix = match self {
            Dialect::Sqlite => "",
            Dialect::MySql => " ENGINE=InnoDB",
        };
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n){}",
            self.quote(table.name),
            defs.join(",\n    "),
            suffix
        )
    }
}
