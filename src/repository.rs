use crate::models::{Comment, NewUser, Post, PostForm, User};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;

/// RepositoryError
///
/// Failure modes of the persistence layer. Unique-constraint violations are
/// recoverable user errors and get their own variants so handlers can turn
/// them into form messages instead of leaking a raw storage error.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("an account with that email already exists")]
    DuplicateEmail,
    #[error("a post with that title already exists")]
    DuplicateTitle,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, allowing the
/// handlers to interact with the data layer without knowing the concrete
/// implementation (SQLite, Mock, etc.).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's asynchronous task
/// boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Posts ---
    // Listing in insertion order, with the author's display name joined in.
    async fn list_posts(&self) -> Result<Vec<Post>, RepositoryError>;
    async fn get_post(&self, id: i64) -> Result<Option<Post>, RepositoryError>;
    // Fails with DuplicateTitle; the creation date is stamped by the caller.
    async fn create_post(
        &self,
        form: PostForm,
        user_id: i64,
        date: &str,
    ) -> Result<Post, RepositoryError>;
    // Overwrites title/subtitle/image/body only. Author and date untouched.
    // Returns None when no post has that id.
    async fn update_post(&self, id: i64, form: PostForm) -> Result<Option<Post>, RepositoryError>;
    // Returns true if a row was deleted. Comments cascade with the post.
    async fn delete_post(&self, id: i64) -> Result<bool, RepositoryError>;

    // --- Users ---
    async fn get_user(&self, id: i64) -> Result<Option<User>, RepositoryError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    // Fails with DuplicateEmail.
    async fn create_user(&self, new: NewUser) -> Result<User, RepositoryError>;
    async fn count_users(&self) -> Result<i64, RepositoryError>;

    // --- Comments ---
    async fn add_comment(
        &self,
        post_id: i64,
        user_id: i64,
        body: &str,
    ) -> Result<Comment, RepositoryError>;
    // Insertion order, with author name and email joined in.
    async fn comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

const POST_COLUMNS: &str =
    "p.id, p.title, p.subtitle, p.date, p.body, p.img_url, p.user_id, u.name AS author_name";

const COMMENT_COLUMNS: &str =
    "c.id, c.body, c.user_id, c.post_id, u.name AS author_name, u.email AS author_email";

/// SqliteRepository
///
/// The concrete implementation of the `Repository` trait, backed by a SQLite
/// connection pool. Foreign keys are enabled on every connection so the
/// comment cascade and referential checks actually fire.
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Creates a repository over an existing pool. The schema is expected to
    /// be in place; call `init_schema` after this when starting fresh.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// connect
    ///
    /// Opens a pool on the given SQLite URL (creating the file if missing),
    /// turns foreign keys on, and bootstraps the schema.
    pub async fn connect(db_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let repo = Self::new(pool);
        repo.init_schema().await?;
        Ok(repo)
    }

    /// init_schema
    ///
    /// Creates the three tables when absent. `comments.post_id` cascades so
    /// deleting a post removes its comments in the same transaction.
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'member'
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS blog_posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL UNIQUE,
                subtitle TEXT NOT NULL,
                date TEXT NOT NULL,
                body TEXT NOT NULL,
                img_url TEXT NOT NULL,
                user_id INTEGER NOT NULL REFERENCES users(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                body TEXT NOT NULL,
                user_id INTEGER NOT NULL REFERENCES users(id),
                post_id INTEGER NOT NULL REFERENCES blog_posts(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Maps a unique-constraint violation onto the given recoverable variant and
/// passes every other error through unchanged.
fn map_unique(e: sqlx::Error, duplicate: RepositoryError) -> RepositoryError {
    if e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
    {
        duplicate
    } else {
        RepositoryError::Database(e)
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn list_posts(&self) -> Result<Vec<Post>, RepositoryError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM blog_posts p JOIN users u ON p.user_id = u.id ORDER BY p.id ASC"
        );
        Ok(sqlx::query_as::<_, Post>(&sql).fetch_all(&self.pool).await?)
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>, RepositoryError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM blog_posts p JOIN users u ON p.user_id = u.id WHERE p.id = ?"
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_post(
        &self,
        form: PostForm,
        user_id: i64,
        date: &str,
    ) -> Result<Post, RepositoryError> {
        sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO blog_posts (title, subtitle, date, body, img_url, user_id)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, title, subtitle, date, body, img_url, user_id
            "#,
        )
        .bind(&form.title)
        .bind(&form.subtitle)
        .bind(date)
        .bind(&form.body)
        .bind(&form.img_url)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique(e, RepositoryError::DuplicateTitle))
    }

    async fn update_post(&self, id: i64, form: PostForm) -> Result<Option<Post>, RepositoryError> {
        sqlx::query_as::<_, Post>(
            r#"
            UPDATE blog_posts
            SET title = ?, subtitle = ?, img_url = ?, body = ?
            WHERE id = ?
            RETURNING id, title, subtitle, date, body, img_url, user_id
            "#,
        )
        .bind(&form.title)
        .bind(&form.subtitle)
        .bind(&form.img_url)
        .bind(&form.body)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique(e, RepositoryError::DuplicateTitle))
    }

    async fn delete_post(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, email, name, password_hash, role FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, email, name, password_hash, role FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_user(&self, new: NewUser) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password_hash, role)
            VALUES (?, ?, ?, ?)
            RETURNING id, email, name, password_hash, role
            "#,
        )
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.password_hash)
        .bind(&new.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique(e, RepositoryError::DuplicateEmail))
    }

    async fn count_users(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn add_comment(
        &self,
        post_id: i64,
        user_id: i64,
        body: &str,
    ) -> Result<Comment, RepositoryError> {
        let inserted = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (body, user_id, post_id)
            VALUES (?, ?, ?)
            RETURNING id, body, user_id, post_id
            "#,
        )
        .bind(body)
        .bind(user_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;

        // Re-read through the join so the returned comment carries the
        // author fields the page needs.
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c JOIN users u ON c.user_id = u.id WHERE c.id = ?"
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(inserted.id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>, RepositoryError> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c JOIN users u ON c.user_id = u.id WHERE c.post_id = ? ORDER BY c.id ASC"
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?)
    }
}
