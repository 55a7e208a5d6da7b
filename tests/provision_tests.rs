mod common;

use common::TempDb;
use coursedb::db::catalog::Catalog;
use coursedb::db::dialect::Dialect;
use coursedb::db::schema::{COURSE_TABLE, ColumnType, USER_TABLE};
use coursedb::{ConnectionConfig, CourseDbError, Driver, define_schema, provision};
use sqlx::{Connection, SqliteConnection};

async fn open(db: &TempDb) -> SqliteConnection {
    SqliteConnection::connect_with(&db.config().sqlite_options())
        .await
        .expect("failed to open sqlite file")
}

async fn table_names(conn: &mut SqliteConnection) -> Vec<String> {
    sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(conn)
    .await
    .expect("failed to list tables")
}

#[tokio::test]
async fn provision_creates_tables_once() {
    let db = TempDb::new("idempotent");
    let schema = define_schema();

    let first = provision(&schema, &db.config()).await.expect("first provision failed");
    assert_eq!(first.created, vec!["user", "course"]);
    assert!(first.verified.is_empty());

    let second = provision(&schema, &db.config()).await.expect("second provision failed");
    assert!(second.is_noop());
    assert_eq!(second.verified, vec!["user", "course"]);

    let mut conn = open(&db).await;
    assert_eq!(table_names(&mut conn).await, vec!["course", "user"]);
    conn.close().await.ok();
}

#[tokio::test]
async fn provisioned_catalog_matches_declared_layout() {
    let db = TempDb::new("shape");
    let schema = define_schema();
    provision(&schema, &db.config()).await.expect("provision failed");

    let mut conn = open(&db).await;
    for table in &schema.tables {
        let actual = conn
            .inspect_table(table.name)
            .await
            .expect("inspect failed")
            .expect("table missing after provision");
        assert!(
            table.shape().diff(&actual).is_empty(),
            "{}: {:?}",
            table.name,
            table.shape().diff(&actual)
        );
    }

    let user = conn.inspect_table(USER_TABLE).await.unwrap().unwrap();
    let cols: Vec<_> = user.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(cols, ["id", "name", "email"]);
    let id = user.column("id").unwrap();
    assert!(id.primary_key);
    assert_eq!(id.ty, ColumnType::Integer);
    let name = user.column("name").unwrap();
    assert!(name.unique && !name.nullable);
    assert_eq!(name.ty, ColumnType::Varchar(64));
    let email = user.column("email").unwrap();
    assert!(email.unique && email.nullable);

    let course = conn.inspect_table(COURSE_TABLE).await.unwrap().unwrap();
    let cols: Vec<_> = course.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(cols, ["id", "name", "user_id"]);
    assert_eq!(course.foreign_keys.len(), 1);
    assert_eq!(course.foreign_keys[0].references_table, "user");
    assert_eq!(course.foreign_keys[0].references_column, "id");

    conn.close().await.ok();
}

#[tokio::test]
async fn existing_matching_table_is_kept() {
    let db = TempDb::new("partial");
    let schema = define_schema();

    let mut conn = open(&db).await;
    let ddl = Dialect::Sqlite.create_table(schema.table(USER_TABLE).unwrap());
    sqlx::query(&ddl).execute(&mut conn).await.unwrap();
    sqlx::query(r#"INSERT INTO "user" (name) VALUES ('kept')"#)
        .execute(&mut conn)
        .await
        .unwrap();
    conn.close().await.ok();

    let report = provision(&schema, &db.config()).await.expect("provision failed");
    assert_eq!(report.created, vec!["course"]);
    assert_eq!(report.verified, vec!["user"]);

    let mut conn = open(&db).await;
    let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "user""#)
        .fetch_one(&mut conn)
        .await
        .unwrap();
    assert_eq!(count, 1);
    conn.close().await.ok();
}

#[tokio::test]
async fn incompatible_table_is_a_schema_conflict() {
    let db = TempDb::new("conflict");

    let mut conn = open(&db).await;
    sqlx::query(r#"CREATE TABLE "user" (id INTEGER PRIMARY KEY, name VARCHAR(32))"#)
        .execute(&mut conn)
        .await
        .unwrap();
    conn.close().await.ok();

    let err = provision(&define_schema(), &db.config())
        .await
        .expect_err("provision should reject the existing table");
    assert!(err.is_schema_conflict());
    match err {
        CourseDbError::SchemaConflict { table, detail } => {
            assert_eq!(table, "user");
            assert!(detail.contains("column `name`"), "{detail}");
            assert!(detail.contains("missing column `email`"), "{detail}");
        }
        other => panic!("unexpected error: {other}"),
    }

    let mut conn = open(&db).await;
    assert_eq!(table_names(&mut conn).await, vec!["user"]);
    conn.close().await.ok();
}

#[tokio::test]
async fn foreign_key_without_target_column_matches_declaration() {
    let db = TempDb::new("implicit-fk");
    let schema = define_schema();

    let mut conn = open(&db).await;
    let ddl = Dialect::Sqlite.create_table(schema.table(USER_TABLE).unwrap());
    sqlx::query(&ddl).execute(&mut conn).await.unwrap();
    sqlx::query(
        r#"CREATE TABLE course (
            id INTEGER PRIMARY KEY,
            name VARCHAR(64),
            user_id INTEGER REFERENCES "user" ON DELETE CASCADE
        )"#,
    )
    .execute(&mut conn)
    .await
    .unwrap();

    let course = conn.inspect_table(COURSE_TABLE).await.unwrap().unwrap();
    assert_eq!(course.foreign_keys[0].references_column, "id");
    conn.close().await.ok();

    let report = provision(&schema, &db.config()).await.expect("provision failed");
    assert!(report.is_noop());
    assert_eq!(report.verified, vec!["user", "course"]);
}

#[tokio::test]
async fn provision_runs_on_a_spawned_task() {
    let db = TempDb::new("spawned");
    let cfg = db.config();

    let report = tokio::spawn(async move {
        let schema = define_schema();
        provision(&schema, &cfg).await
    })
        .await
        .expect("provision task panicked")
        .expect("provision failed");
    assert_eq!(report.created, vec!["user", "course"]);
}

#[tokio::test]
async fn unopenable_sqlite_path_is_a_connection_error() {
    let mut path = std::env::temp_dir();
    path.push(format!("coursedb-missing-dir-{}", std::process::id()));
    path.push("nested");
    path.push("study.sqlite");
    let cfg = ConnectionConfig::sqlite(path.display().to_string());

    let err = provision(&define_schema(), &cfg)
        .await
        .expect_err("missing directory should fail");
    assert!(err.is_connection(), "{err}");
}

#[tokio::test]
async fn unreachable_mysql_is_a_connection_error() {
    let cfg = ConnectionConfig {
        driver: Driver::Mysql,
        host: "127.0.0.1".to_string(),
        port: Some(1),
        connect_timeout_secs: 2,
        ..ConnectionConfig::default()
    };

    let err = provision(&define_schema(), &cfg)
        .await
        .expect_err("nothing listens on port 1");
    assert!(err.is_connection(), "{err}");
}

#[tokio::test]
async fn invalid_declaration_fails_before_connecting() {
    let db = TempDb::new("invalid");
    let mut schema = define_schema();
    schema.tables.reverse();

    let err = provision(&schema, &db.config()).await.unwrap_err();
    assert!(matches!(err, CourseDbError::InvalidSchema(_)));
    assert!(!db.path.exists());
}
