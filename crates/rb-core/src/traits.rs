//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::models::{Comment, NewUser, Post, PostDraft, User, UserCredentials};

/// Data persistence contract for accounts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_credentials_by_email(&self, email: &str) -> anyhow::Result<Option<UserCredentials>>;
    /// Fails with `AppError::DuplicateEmail` if the email is taken. The role is
    /// decided atomically with the insert: admin only when no user exists yet.
    async fn create_user(&self, user: NewUser) -> anyhow::Result<User>;
}

/// Data persistence contract for posts and their comments.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlogRepo: Send + Sync {
    // Post Operations
    /// All posts, newest display-date string first.
    async fn list_posts(&self) -> anyhow::Result<Vec<Post>>;
    async fn get_post(&self, id: i64) -> anyhow::Result<Option<Post>>;
    async fn find_post_by_title(&self, title: &str) -> anyhow::Result<Option<Post>>;
    /// Fails with `AppError::DuplicateTitle` if the title is taken.
    async fn create_post(&self, draft: PostDraft, author_id: i64, date: String) -> anyhow::Result<Post>;
    /// Overwrites the editable fields and the author. Returns false if no such post.
    async fn update_post(&self, id: i64, draft: PostDraft, author_id: i64) -> anyhow::Result<bool>;
    /// Removes the post and its comments. Returns false if no such post.
    async fn delete_post(&self, id: i64) -> anyhow::Result<bool>;

    // Comment Operations
    async fn list_comments(&self, post_id: i64) -> anyhow::Result<Vec<Comment>>;
    async fn create_comment(&self, post_id: i64, author_id: i64, text: String) -> anyhow::Result<Comment>;
}

/// Server-side session persistence. Tokens are only ever stored as digests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, token_digest: &str, user_id: i64, expires_at: DateTime<Utc>) -> anyhow::Result<()>;
    /// The owner of a live (unexpired) session.
    async fn find_session_user(&self, token_digest: &str, now: DateTime<Utc>) -> anyhow::Result<Option<User>>;
    async fn delete_session(&self, token_digest: &str) -> anyhow::Result<()>;
    /// Returns the number of sessions removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> anyhow::Result<u64>;
}

/// Credential hashing and session-token contract.
#[cfg_attr(test, mockall::automock)]
pub trait AuthProvider: Send + Sync {
    /// Salted key-derivation hash of a password, as a PHC string.
    fn hash_password(&self, password: &str) -> anyhow::Result<String>;

    /// Verifies a password against a stored hash. Malformed hashes never verify.
    fn verify_password(&self, password: &str, hash: &str) -> bool;

    /// A fresh, unguessable session token for the cookie.
    fn generate_session_token(&self) -> String;

    /// The form in which a session token is persisted.
    fn digest_session_token(&self, token: &str) -> String;
}
