//! # Domain Models
//!
//! These structs represent the core entities of Rusty-Blog.
//! Identifiers are the integer row ids handed out by the database.

use serde::{Deserialize, Serialize};
use chrono::NaiveDate;

/// Account id of the first registered user, who becomes the site admin.
pub const ADMIN_USER_ID: i64 = 1;

/// Format used for the post display date, e.g. "October 19, 2026".
pub const DISPLAY_DATE_FORMAT: &str = "%B %d, %Y";

/// Renders a calendar date the way posts store it.
pub fn display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

/// What an account is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    /// Unknown values fall back to the least privileged role.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "admin" => Role::Admin,
            _ => Role::Member,
        }
    }

    pub fn can_manage_posts(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// A registered account, without its credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    /// Unique across all users
    pub email: String,
    pub role: Role,
}

/// A user together with the stored password hash. Only the auth flow sees this.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    /// PHC-formatted hash string
    pub password_hash: String,
}

/// Insert payload for a new account. Storage assigns the role: the first
/// account becomes [`Role::Admin`], every later one [`Role::Member`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// A blog entry as read back from storage, joined with its author's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    /// Unique across all posts
    pub title: String,
    pub subtitle: String,
    /// Pre-formatted display date (see [`DISPLAY_DATE_FORMAT`]); also the list sort key
    pub date: String,
    /// Rich text (HTML) body
    pub body: String,
    pub img_url: String,
    pub author_id: i64,
    pub author_name: String,
}

/// The editable fields of a post, shared by create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDraft {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub img_url: String,
}

/// A comment on a post, joined with its author's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub text: String,
}

/// The identity a request acts as. Resolved once per request and passed explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Viewer {
    #[default]
    Anonymous,
    Authenticated(User),
}

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Authenticated(user) => Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    pub fn can_manage_posts(&self) -> bool {
        self.user().is_some_and(|u| u.role.can_manage_posts())
    }
}
