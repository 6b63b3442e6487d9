//! # BlogService
//!
//! Every business rule of the blog lives here: registration and login,
//! session lifetime, the admin capability check, post CRUD and commenting.
//! Handlers stay thin and pass the request's [`Viewer`] in explicitly.

use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate, Utc};

use crate::error::{AppError, CredentialFault, Result};
use crate::models::{display_date, Comment, NewUser, Post, PostDraft, User, Viewer};
use crate::traits::{AuthProvider, BlogRepo, SessionStore, UserRepo};

/// Sign-up form payload.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// A freshly opened session. `token` goes into the cookie, never into storage.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

pub struct BlogService {
    users: Arc<dyn UserRepo>,
    blog: Arc<dyn BlogRepo>,
    sessions: Arc<dyn SessionStore>,
    auth: Arc<dyn AuthProvider>,
    session_ttl: Duration,
    today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl BlogService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        blog: Arc<dyn BlogRepo>,
        sessions: Arc<dyn SessionStore>,
        auth: Arc<dyn AuthProvider>,
        session_ttl: Duration,
    ) -> Self {
        Self { users, blog, sessions, auth, session_ttl, today: local_today }
    }

    /// Overrides the calendar used to stamp new posts.
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    // ── Authentication ──────────────────────────────────────────────────────

    /// Creates an account and logs it in. The very first account is the admin.
    pub async fn register(&self, form: Registration) -> Result<Session> {
        let form = validate_registration(form)?;

        if self.users.find_credentials_by_email(&form.email).await?.is_some() {
            return Err(AppError::DuplicateEmail(form.email));
        }

        let password_hash = self.hash_password(form.password).await?;
        let user = self
            .users
            .create_user(NewUser { name: form.name, email: form.email, password_hash })
            .await?;

        log::info!("registered user {} as {}", user.id, user.role.as_str());
        self.open_session(user).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let creds = self
            .users
            .find_credentials_by_email(email.trim())
            .await?
            .ok_or(AppError::InvalidCredentials(CredentialFault::UnknownEmail))?;

        if !self.verify_password(password, &creds.password_hash).await? {
            return Err(AppError::InvalidCredentials(CredentialFault::WrongPassword));
        }

        let purged = self.sessions.purge_expired(Utc::now()).await?;
        if purged > 0 {
            log::debug!("purged {purged} expired sessions");
        }

        log::info!("user {} logged in", creds.user.id);
        self.open_session(creds.user).await
    }

    /// Destroys the session behind `token`. Unknown tokens are not an error.
    pub async fn logout(&self, token: &str) -> Result<()> {
        let digest = self.auth.digest_session_token(token);
        self.sessions.delete_session(&digest).await?;
        Ok(())
    }

    /// Maps the session cookie (if any) to the identity the request acts as.
    pub async fn resolve_viewer(&self, token: Option<&str>) -> Result<Viewer> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Ok(Viewer::Anonymous);
        };
        let digest = self.auth.digest_session_token(token);
        Ok(match self.sessions.find_session_user(&digest, Utc::now()).await? {
            Some(user) => Viewer::Authenticated(user),
            None => Viewer::Anonymous,
        })
    }

    /// Hashing and verification run on the blocking pool.
    async fn hash_password(&self, password: String) -> Result<String> {
        let auth = Arc::clone(&self.auth);
        let hash = tokio::task::spawn_blocking(move || auth.hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))??;
        Ok(hash)
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let auth = Arc::clone(&self.auth);
        let (password, hash) = (password.to_owned(), hash.to_owned());
        tokio::task::spawn_blocking(move || auth.verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("password verification task failed: {e}")))
    }

    async fn open_session(&self, user: User) -> Result<Session> {
        let token = self.auth.generate_session_token();
        let digest = self.auth.digest_session_token(&token);
        self.sessions
            .create_session(&digest, user.id, Utc::now() + self.session_ttl)
            .await?;
        Ok(Session { user, token })
    }

    // ── Posts ───────────────────────────────────────────────────────────────

    /// All posts ordered by their display-date string, descending.
    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        Ok(self.blog.list_posts().await?)
    }

    pub async fn get_post(&self, id: i64) -> Result<Post> {
        self.blog
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::not_found("Post", id))
    }

    pub async fn post_with_comments(&self, id: i64) -> Result<(Post, Vec<Comment>)> {
        let post = self.get_post(id).await?;
        let comments = self.blog.list_comments(id).await?;
        Ok((post, comments))
    }

    pub async fn create_post(&self, viewer: &Viewer, draft: PostDraft) -> Result<Post> {
        let admin = require_admin(viewer)?;
        let draft = validate_draft(draft)?;

        if self.blog.find_post_by_title(&draft.title).await?.is_some() {
            return Err(AppError::DuplicateTitle(draft.title));
        }

        let date = display_date((self.today)());
        let post = self.blog.create_post(draft, admin.id, date).await?;
        log::info!("user {} created post {}", admin.id, post.id);
        Ok(post)
    }

    /// Overwrites the post's fields; the editor becomes the post's author.
    pub async fn update_post(&self, viewer: &Viewer, id: i64, draft: PostDraft) -> Result<Post> {
        let admin = require_admin(viewer)?;
        self.get_post(id).await?;
        let draft = validate_draft(draft)?;

        if let Some(other) = self.blog.find_post_by_title(&draft.title).await? {
            if other.id != id {
                return Err(AppError::DuplicateTitle(draft.title));
            }
        }

        if !self.blog.update_post(id, draft, admin.id).await? {
            return Err(AppError::not_found("Post", id));
        }
        log::info!("user {} updated post {}", admin.id, id);
        self.get_post(id).await
    }

    /// Deletes the post together with its comments.
    pub async fn delete_post(&self, viewer: &Viewer, id: i64) -> Result<()> {
        let admin = require_admin(viewer)?;
        if !self.blog.delete_post(id).await? {
            return Err(AppError::not_found("Post", id));
        }
        log::info!("user {} deleted post {}", admin.id, id);
        Ok(())
    }

    // ── Comments ────────────────────────────────────────────────────────────

    /// A missing post wins over a missing session: both are checked, in that order.
    pub async fn add_comment(&self, viewer: &Viewer, post_id: i64, text: &str) -> Result<Comment> {
        self.get_post(post_id).await?;
        let user = viewer
            .user()
            .ok_or_else(|| AppError::Unauthorized("log in to comment".into()))?;

        let text = required("comment", text)?;
        Ok(self.blog.create_comment(post_id, user.id, text).await?)
    }
}

fn require_admin(viewer: &Viewer) -> Result<&User> {
    match viewer.user() {
        None => Err(AppError::Unauthorized("login required".into())),
        Some(user) if user.role.can_manage_posts() => Ok(user),
        Some(user) => Err(AppError::Unauthorized(format!(
            "user {} may not manage posts",
            user.id
        ))),
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::ValidationError(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn validate_registration(form: Registration) -> Result<Registration> {
    let email = required("email", &form.email)?;
    if !email.contains('@') {
        return Err(AppError::ValidationError("email address is invalid".into()));
    }
    if form.password.is_empty() {
        return Err(AppError::ValidationError("password is required".into()));
    }
    Ok(Registration {
        name: required("name", &form.name)?,
        email,
        password: form.password,
    })
}

fn validate_draft(draft: PostDraft) -> Result<PostDraft> {
    let img_url = required("image URL", &draft.img_url)?;
    if !(img_url.starts_with("http://") || img_url.starts_with("https://")) {
        return Err(AppError::ValidationError("image URL must be an http(s) URL".into()));
    }
    Ok(PostDraft {
        title: required("title", &draft.title)?,
        subtitle: required("subtitle", &draft.subtitle)?,
        body: required("body", &draft.body)?,
        img_url,
    })
}
