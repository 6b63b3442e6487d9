//! # rb-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `rb-core` domain models, plus the server-side session table.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rb_core::error::AppError;
use rb_core::models::{Comment, NewUser, Post, PostDraft, Role, User, UserCredentials};
use rb_core::traits::{BlogRepo, SessionStore, UserRepo};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

const POST_COLUMNS: &str = "SELECT p.id, p.title, p.subtitle, p.date, p.body, p.img_url, \
     p.user_id, u.name AS author_name \
     FROM blog_posts p JOIN users u ON u.id = p.user_id";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        Self::connect(url, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Opens (creating if needed) the database and applies pending migrations.
    ///
    /// # Developer Note
    /// Every connection to `sqlite::memory:` gets its own empty database, so
    /// in-memory stores are pinned to a single connection that never expires.
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections)
        };

        let pool = pool_options.connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        log::info!("sqlite store ready ({})", if in_memory { "in-memory" } else { url });

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn user_from_row(row: &SqliteRow) -> sqlx::Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        role: Role::parse(row.try_get::<&str, _>("role")?),
    })
}

fn post_from_row(row: &SqliteRow) -> sqlx::Result<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        subtitle: row.try_get("subtitle")?,
        date: row.try_get("date")?,
        body: row.try_get("body")?,
        img_url: row.try_get("img_url")?,
        author_id: row.try_get("user_id")?,
        author_name: row.try_get("author_name")?,
    })
}

fn comment_from_row(row: &SqliteRow) -> sqlx::Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        post_id: row.try_get("blog_id")?,
        author_id: row.try_get("user_id")?,
        author_name: row.try_get("author_name")?,
        text: row.try_get("comment")?,
    })
}

#[async_trait]
impl UserRepo for SqliteStore {
    async fn find_credentials_by_email(&self, email: &str) -> anyhow::Result<Option<UserCredentials>> {
        let row = sqlx::query("SELECT id, name, email, role, password FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(UserCredentials {
                user: user_from_row(&row)?,
                password_hash: row.try_get("password")?,
            })),
            None => Ok(None),
        }
    }

    /// The role is decided inside the insert so that concurrent first
    /// registrations cannot both become admin.
    async fn create_user(&self, user: NewUser) -> anyhow::Result<User> {
        let result = sqlx::query(
            "INSERT INTO users (name, email, password, role) \
             SELECT ?, ?, ?, CASE WHEN EXISTS (SELECT 1 FROM users) THEN 'member' ELSE 'admin' END \
             RETURNING id, name, email, role",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(user_from_row(&row)?),
            Err(e) if is_unique_violation(&e) => Err(AppError::DuplicateEmail(user.email).into()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl BlogRepo for SqliteStore {
    /// Ordered by the stored date string, not by calendar date.
    async fn list_posts(&self) -> anyhow::Result<Vec<Post>> {
        let rows = sqlx::query(&format!("{POST_COLUMNS} ORDER BY p.date DESC, p.id DESC"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(post_from_row).collect::<sqlx::Result<_>>()?)
    }

    async fn get_post(&self, id: i64) -> anyhow::Result<Option<Post>> {
        let row = sqlx::query(&format!("{POST_COLUMNS} WHERE p.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(post_from_row).transpose()?)
    }

    async fn find_post_by_title(&self, title: &str) -> anyhow::Result<Option<Post>> {
        let row = sqlx::query(&format!("{POST_COLUMNS} WHERE p.title = ?"))
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(post_from_row).transpose()?)
    }

    async fn create_post(&self, draft: PostDraft, author_id: i64, date: String) -> anyhow::Result<Post> {
        let result = sqlx::query(
            "INSERT INTO blog_posts (title, subtitle, date, body, img_url, user_id) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&draft.title)
        .bind(&draft.subtitle)
        .bind(&date)
        .bind(&draft.body)
        .bind(&draft.img_url)
        .bind(author_id)
        .execute(&self.pool)
        .await;

        let id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(e) if is_unique_violation(&e) => return Err(AppError::DuplicateTitle(draft.title).into()),
            Err(e) => return Err(e.into()),
        };

        self.get_post(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("post {id} missing right after insert"))
    }

    async fn update_post(&self, id: i64, draft: PostDraft, author_id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE blog_posts SET title = ?, subtitle = ?, body = ?, img_url = ?, user_id = ? WHERE id = ?",
        )
        .bind(&draft.title)
        .bind(&draft.subtitle)
        .bind(&draft.body)
        .bind(&draft.img_url)
        .bind(author_id)
        .bind(id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected() > 0),
            Err(e) if is_unique_violation(&e) => Err(AppError::DuplicateTitle(draft.title).into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes the post and its comments atomically.
    ///
    /// # Developer Note
    /// The schema also cascades, but the explicit delete keeps the behavior
    /// independent of the connection's `foreign_keys` pragma.
    async fn delete_post(&self, id: i64) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM comments WHERE blog_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM blog_posts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn list_comments(&self, post_id: i64) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT c.id, c.blog_id, c.user_id, c.comment, u.name AS author_name \
             FROM comments c JOIN users u ON u.id = c.user_id \
             WHERE c.blog_id = ? ORDER BY c.id ASC",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(comment_from_row).collect::<sqlx::Result<_>>()?)
    }

    async fn create_comment(&self, post_id: i64, author_id: i64, text: String) -> anyhow::Result<Comment> {
        let done = sqlx::query("INSERT INTO comments (comment, user_id, blog_id) VALUES (?, ?, ?)")
            .bind(&text)
            .bind(author_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        let author_name: String = sqlx::query_scalar("SELECT name FROM users WHERE id = ?")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(Comment {
            id: done.last_insert_rowid(),
            post_id,
            author_id,
            author_name,
            text,
        })
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn create_session(&self, token_digest: &str, user_id: i64, expires_at: DateTime<Utc>) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO sessions (token_digest, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
            .bind(token_digest)
            .bind(user_id)
            .bind(Utc::now().timestamp())
            .bind(expires_at.timestamp())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_session_user(&self, token_digest: &str, now: DateTime<Utc>) -> anyhow::Result<Option<User>> {
        let row = sqlx::query(
            "SELECT u.id, u.name, u.email, u.role \
             FROM sessions s JOIN users u ON u.id = s.user_id \
             WHERE s.token_digest = ? AND s.expires_at > ?",
        )
        .bind(token_digest)
        .bind(now.timestamp())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn delete_session(&self, token_digest: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token_digest = ?")
            .bind(token_digest)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let done = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now.timestamp())
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn store() -> SqliteStore {
        SqliteStore::new("sqlite::memory:").await.expect("Failed to open in-memory store")
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: email.split('@').next().unwrap_or_default().to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
        }
    }

    async fn seed_user(store: &SqliteStore, email: &str) -> User {
        store.create_user(new_user(email)).await.unwrap()
    }

    fn draft(title: &str) -> PostDraft {
        PostDraft {
            title: title.to_string(),
            subtitle: "A subtitle".to_string(),
            body: "<p>Hello</p>".to_string(),
            img_url: "https://example.com/img.png".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_user_is_the_admin() {
        let store = store().await;
        let admin = seed_user(&store, "admin@example.com").await;
        let member = seed_user(&store, "member@example.com").await;

        assert_eq!(admin.id, rb_core::ADMIN_USER_ID);
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(member.id, 2);
        assert_eq!(member.role, Role::Member);

        let stored = store.find_credentials_by_email("admin@example.com").await.unwrap().unwrap();
        assert_eq!(stored.user.role, Role::Admin);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_registrations_yield_one_admin() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("blog.db").display());
        let store = std::sync::Arc::new(SqliteStore::connect(&url, 5).await.unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.create_user(new_user(&format!("u{i}@example.com"))).await })
            })
            .collect();

        let mut admins = Vec::new();
        for handle in handles {
            let user = handle.await.unwrap().unwrap();
            if user.role == Role::Admin {
                admins.push(user.id);
            }
        }
        assert_eq!(admins, vec![rb_core::ADMIN_USER_ID]);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_typed_conflict() {
        let store = store().await;
        seed_user(&store, "dup@example.com").await;

        let err = store.create_user(new_user("dup@example.com")).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::DuplicateEmail(_))));

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(users, 1);
    }

    #[tokio::test]
    async fn test_credentials_lookup() {
        let store = store().await;
        seed_user(&store, "ada@example.com").await;

        let creds = store.find_credentials_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(creds.password_hash, "$argon2id$stub");
        assert_eq!(creds.user.name, "ada");
        assert!(store.find_credentials_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_posts_list_by_date_string_descending() {
        let store = store().await;
        let admin = seed_user(&store, "admin@example.com").await;

        store.create_post(draft("Jan"), admin.id, "January 05, 2027".into()).await.unwrap();
        store.create_post(draft("Mar"), admin.id, "March 01, 2026".into()).await.unwrap();
        store.create_post(draft("Feb"), admin.id, "February 10, 2026".into()).await.unwrap();

        let titles: Vec<String> = store.list_posts().await.unwrap().into_iter().map(|p| p.title).collect();
        // String order, not calendar order: "March" > "January" > "February".
        assert_eq!(titles, vec!["Mar", "Jan", "Feb"]);
    }

    #[tokio::test]
    async fn test_duplicate_title_persists_nothing() {
        let store = store().await;
        let admin = seed_user(&store, "admin@example.com").await;

        store.create_post(draft("Same"), admin.id, "May 01, 2026".into()).await.unwrap();
        let err = store
            .create_post(draft("Same"), admin.id, "May 02, 2026".into())
            .await
            .unwrap_err();

        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::DuplicateTitle(_))));
        assert_eq!(store.list_posts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_reassigns_author() {
        let store = store().await;
        let first = seed_user(&store, "first@example.com").await;
        let second = seed_user(&store, "second@example.com").await;

        let post = store.create_post(draft("Original"), first.id, "May 01, 2026".into()).await.unwrap();
        assert!(store.update_post(post.id, draft("Edited"), second.id).await.unwrap());

        let edited = store.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(edited.title, "Edited");
        assert_eq!(edited.author_id, second.id);
        assert_eq!(edited.author_name, "second");
        assert_eq!(edited.date, "May 01, 2026");

        assert!(!store.update_post(999, draft("Ghost"), second.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_post_cascades_to_comments() {
        let store = store().await;
        let admin = seed_user(&store, "admin@example.com").await;
        let reader = seed_user(&store, "reader@example.com").await;

        let post = store.create_post(draft("Doomed"), admin.id, "May 01, 2026".into()).await.unwrap();
        let comment = store.create_comment(post.id, reader.id, "first!".into()).await.unwrap();
        assert_eq!(comment.author_name, "reader");
        assert_eq!(store.list_comments(post.id).await.unwrap(), vec![comment]);

        assert!(store.delete_post(post.id).await.unwrap());
        assert!(store.get_post(post.id).await.unwrap().is_none());

        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(orphans, 0);
        assert!(!store.delete_post(post.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_comment_on_missing_post_violates_foreign_key() {
        let store = store().await;
        let reader = seed_user(&store, "reader@example.com").await;
        assert!(store.create_comment(404, reader.id, "hello?".into()).await.is_err());
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let store = store().await;
        let user = seed_user(&store, "ada@example.com").await;
        let now = Utc::now();

        store.create_session("live", user.id, now + Duration::hours(1)).await.unwrap();
        store.create_session("stale", user.id, now - Duration::hours(1)).await.unwrap();

        assert_eq!(store.find_session_user("live", now).await.unwrap(), Some(user.clone()));
        assert_eq!(store.find_session_user("stale", now).await.unwrap(), None);
        assert_eq!(store.find_session_user("unknown", now).await.unwrap(), None);

        assert_eq!(store.purge_expired(now).await.unwrap(), 1);

        store.delete_session("live").await.unwrap();
        assert_eq!(store.find_session_user("live", now).await.unwrap(), None);
        store.delete_session("live").await.unwrap();
    }
}
