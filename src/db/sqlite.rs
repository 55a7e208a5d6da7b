use crate::config::{ConnectionConfig, Driver};
use crate::db::models::{Course, NewCourse, NewUser, User};
use crate::error::CourseDbError;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use tracing::debug;

pub type SqlitePool = Pool<Sqlite>;

/// Row access for the provisioned `user` / `course` tables.
#[derive(Clone)]
pub struct CourseStorage {
    pool: SqlitePool,
}

impl CourseStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool for a SQLite descriptor with foreign keys enforced.
    pub async fn connect(cfg: &ConnectionConfig) -> Result<Self, CourseDbError> {
        if cfg.driver != Driver::Sqlite {
            return Err(CourseDbError::UnsupportedScheme(cfg.to_string()));
        }
        let pool = SqlitePoolOptions::new()
            .acquire_timeout(cfg.connect_timeout())
            .connect_with(cfg.sqlite_options())
            .await
            .map_err(CourseDbError::connection)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Insert a user. Duplicate `name` or non-null `email` yields
    /// `CourseDbError::UniqueViolation`.
    pub async fn insert_user(&self, user: NewUser) -> Result<User, CourseDbError> {
        let row = sqlx::query_as::<_, User>(
            r#"INSERT INTO "user" (name, email) VALUES (?, ?)
               RETURNING id, name, email"#,
        )
        .bind(user.name)
        .bind(user.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>, CourseDbError> {
        let row = sqlx::query_as::<_, User>(r#"SELECT id, name, email FROM "user" WHERE id = ?"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_user_by_name(&self, name: &str) -> Result<Option<User>, CourseDbError> {
        let row =
            sqlx::query_as::<_, User>(r#"SELECT id, name, email FROM "user" WHERE name = ?"#)
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, CourseDbError> {
        let rows = sqlx::query_as::<_, User>(r#"SELECT id, name, email FROM "user" ORDER BY id"#)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Returns false when no user has this id.
    pub async fn update_user_email(
        &self,
        id: i64,
        email: Option<&str>,
    ) -> Result<bool, CourseDbError> {
        let res = sqlx::query(r#"UPDATE "user" SET email = ? WHERE id = ?"#)
            .bind(email)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Insert a course. A `user_id` with no matching user yields
    /// `CourseDbError::ForeignKeyViolation`.
    pub async fn insert_course(&self, course: NewCourse) -> Result<Course, CourseDbError> {
        let row = sqlx::query_as::<_, Course>(
            r#"INSERT INTO course (name, user_id) VALUES (?, ?)
               RETURNING id, name, user_id"#,
        )
        .bind(course.name)
        .bind(course.user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_course(&self, id: i64) -> Result<Option<Course>, CourseDbError> {
        let row = sqlx::query_as::<_, Course>("SELECT id, name, user_id FROM course WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Courses authored by `user_id`, oldest first.
    pub async fn courses_for_user(&self, user_id: i64) -> Result<Vec<Course>, CourseDbError> {
        let rows = sqlx::query_as::<_, Course>(
            "SELECT id, name, user_id FROM course WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_courses(&self) -> Result<Vec<Course>, CourseDbError> {
        let rows = sqlx::query_as::<_, Course>("SELECT id, name, user_id FROM course ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn rename_course(&self, id: i64, name: Option<&str>) -> Result<bool, CourseDbError> {
        let res = sqlx::query("UPDATE course SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn delete_course(&self, id: i64) -> Result<bool, CourseDbError> {
        let res = sqlx::query("DELETE FROM course WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Delete a user together with every course it owns, in one transaction.
    ///
    /// Courses are removed explicitly rather than left to the foreign key,
    /// so the result is the same on a connection without FK enforcement.
    /// Returns the number of courses removed, or `None` if the user did not
    /// exist.
    pub async fn delete_user(&self, id: i64) -> Result<Option<u64>, CourseDbError> {
        let mut tx = self.pool.begin().await?;

        let courses = sqlx::query("DELETE FROM course WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let users = sqlx::query(r#"DELETE FROM "user" WHERE id = ?"#)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if users == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        debug!(user_id = id, courses_removed = courses, "deleted user");
        Ok(Some(courses))
    }
}
