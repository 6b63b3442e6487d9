//! # rb-ui
//!
//! Askama page templates. Every page receives the request's `Viewer`
//! (for the navigation bar) and an optional one-shot flash message.

use askama::Template;
use rb_core::models::{Comment, Post, PostDraft, Viewer};

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub viewer: &'a Viewer,
    pub flash: Option<&'a str>,
    pub posts: &'a [Post],
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate<'a> {
    pub viewer: &'a Viewer,
    pub flash: Option<&'a str>,
    pub post: &'a Post,
    pub comments: &'a [Comment],
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate<'a> {
    pub viewer: &'a Viewer,
    pub flash: Option<&'a str>,
    pub name: &'a str,
    pub email: &'a str,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate<'a> {
    pub viewer: &'a Viewer,
    pub flash: Option<&'a str>,
    pub email: &'a str,
}

/// Shared by "new post" and "edit post".
#[derive(Template)]
#[template(path = "make-post.html")]
pub struct MakePostTemplate<'a> {
    pub viewer: &'a Viewer,
    pub flash: Option<&'a str>,
    pub form: &'a PostDraft,
    pub action: &'a str,
    pub is_edit: bool,
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate<'a> {
    pub viewer: &'a Viewer,
    pub flash: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "contact.html")]
pub struct ContactTemplate<'a> {
    pub viewer: &'a Viewer,
    pub flash: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub viewer: &'a Viewer,
    pub flash: Option<&'a str>,
    pub status: u16,
    pub message: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rb_core::models::{Role, User};

    fn post() -> Post {
        Post {
            id: 7,
            title: "Rust & Friends".into(),
            subtitle: "A subtitle".into(),
            date: "October 19, 2026".into(),
            body: "<p>rich <b>text</b></p>".into(),
            img_url: "https://example.com/a.png".into(),
            author_id: 1,
            author_name: "Ada".into(),
        }
    }

    #[test]
    fn test_index_lists_posts_and_escapes_titles() {
        let posts = vec![post()];
        let html = IndexTemplate { viewer: &Viewer::Anonymous, flash: None, posts: &posts }
            .render()
            .unwrap();
        assert!(html.contains("/post/7"));
        assert!(html.contains("Rust &#38; Friends"));
        assert!(!html.contains("Rust & Friends"));
        assert!(!html.contains("/new-post"));
    }

    #[test]
    fn test_admin_sees_management_links() {
        let admin = Viewer::Authenticated(User {
            id: 1,
            name: "Ada".into(),
            email: "ada@example.com".into(),
            role: Role::Admin,
        });
        let posts = vec![post()];
        let html = IndexTemplate { viewer: &admin, flash: None, posts: &posts }.render().unwrap();
        assert!(html.contains("/new-post"));
        assert!(html.contains("/delete/7"));
        assert!(html.contains("/logout"));
    }

    #[test]
    fn test_post_body_is_rendered_raw_but_comments_are_escaped() {
        let comments = vec![Comment {
            id: 1,
            post_id: 7,
            author_id: 2,
            author_name: "Bob".into(),
            text: "<script>alert(1)</script>".into(),
        }];
        let post = post();
        let html = PostTemplate { viewer: &Viewer::Anonymous, flash: Some("hello"), post: &post, comments: &comments }
            .render()
            .unwrap();
        assert!(html.contains("<b>text</b>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("hello"));
    }
}
