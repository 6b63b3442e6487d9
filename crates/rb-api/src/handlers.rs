//! # rb-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the `BlogService`.
//! Every handler receives the request's identity as an explicit `CurrentViewer`.

use actix_web::http::header::{self, ContentType};
use actix_web::{web, HttpRequest, HttpResponse};
use askama::Template;
use rb_core::error::{AppError, CredentialFault};
use rb_core::models::PostDraft;
use rb_core::service::{BlogService, Registration};
use rb_ui::{
    AboutTemplate, ContactTemplate, IndexTemplate, LoginTemplate, MakePostTemplate, PostTemplate,
    RegisterTemplate,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::session::{flash_cookie, flash_removal_cookie, CookieSettings, CurrentViewer, Flash};

/// State shared across all Actix-web workers.
pub struct AppState {
    pub blog: BlogService,
    pub cookies: CookieSettings,
}

type Page = Result<HttpResponse, ApiError>;

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub comment: String,
}

/// 303 to `location`.
pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// 303 to `location`, leaving a message for the next page.
pub fn redirect_with_flash(location: &str, message: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .cookie(flash_cookie(message))
        .finish()
}

/// Renders an HTML page and consumes the pending flash message, if any.
fn page<T: Template>(template: T, flash: &Flash) -> Page {
    let html = template.render()?;
    let mut res = HttpResponse::Ok();
    res.content_type(ContentType::html());
    if flash.is_pending() {
        res.cookie(flash_removal_cookie());
    }
    Ok(res.body(html))
}

// ── Posts ───────────────────────────────────────────────────────────────────

/// GET /
pub async fn index(data: web::Data<AppState>, viewer: CurrentViewer, flash: Flash) -> Page {
    let posts = data.blog.list_posts().await?;
    page(IndexTemplate { viewer: &viewer, flash: flash.message(), posts: &posts }, &flash)
}

/// GET /post/{id}
pub async fn show_post(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    viewer: CurrentViewer,
    flash: Flash,
) -> Page {
    let (post, comments) = data.blog.post_with_comments(path.into_inner()).await?;
    page(
        PostTemplate { viewer: &viewer, flash: flash.message(), post: &post, comments: &comments },
        &flash,
    )
}

/// POST /post/{id}
pub async fn add_comment(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    viewer: CurrentViewer,
    form: web::Form<CommentForm>,
) -> Page {
    let post_id = path.into_inner();
    let back = format!("/post/{post_id}");

    match data.blog.add_comment(&viewer, post_id, &form.comment).await {
        Ok(_) => Ok(redirect(&back)),
        Err(AppError::Unauthorized(_)) => {
            Ok(redirect_with_flash("/login", "Please log in to make a comment"))
        }
        Err(AppError::ValidationError(msg)) => Ok(redirect_with_flash(&back, &msg)),
        Err(e) => Err(e.into()),
    }
}

/// GET /new-post (admin)
pub async fn new_post_form(viewer: CurrentViewer, flash: Flash) -> Page {
    let form = PostDraft::default();
    page(
        MakePostTemplate { viewer: &viewer, flash: flash.message(), form: &form, action: "/new-post", is_edit: false },
        &flash,
    )
}

/// POST /new-post (admin)
pub async fn create_post(
    data: web::Data<AppState>,
    viewer: CurrentViewer,
    form: web::Form<PostDraft>,
) -> Page {
    let draft = form.into_inner();
    match data.blog.create_post(&viewer, draft.clone()).await {
        Ok(_) => Ok(redirect("/")),
        Err(AppError::DuplicateTitle(_)) => post_form_again(
            &viewer,
            "A post with that title already exists",
            &draft,
            "/new-post",
            false,
        ),
        Err(AppError::ValidationError(msg)) => post_form_again(&viewer, &msg, &draft, "/new-post", false),
        Err(e) => Err(e.into()),
    }
}

/// GET /edit-post/{id} (admin): the form, pre-filled with the stored post.
pub async fn edit_post_form(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    viewer: CurrentViewer,
    flash: Flash,
) -> Page {
    let id = path.into_inner();
    let post = data.blog.get_post(id).await?;
    let form = PostDraft {
        title: post.title,
        subtitle: post.subtitle,
        body: post.body,
        img_url: post.img_url,
    };
    let action = format!("/edit-post/{id}");
    page(
        MakePostTemplate { viewer: &viewer, flash: flash.message(), form: &form, action: &action, is_edit: true },
        &flash,
    )
}

/// POST /edit-post/{id} (admin)
pub async fn update_post(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    viewer: CurrentViewer,
    form: web::Form<PostDraft>,
) -> Page {
    let id = path.into_inner();
    let draft = form.into_inner();
    let action = format!("/edit-post/{id}");

    match data.blog.update_post(&viewer, id, draft.clone()).await {
        Ok(post) => Ok(redirect(&format!("/post/{}", post.id))),
        Err(AppError::DuplicateTitle(_)) => post_form_again(
            &viewer,
            "A post with that title already exists",
            &draft,
            &action,
            true,
        ),
        Err(AppError::ValidationError(msg)) => post_form_again(&viewer, &msg, &draft, &action, true),
        Err(e) => Err(e.into()),
    }
}

/// GET /delete/{id} (admin)
pub async fn delete_post(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    viewer: CurrentViewer,
) -> Page {
    data.blog.delete_post(&viewer, path.into_inner()).await?;
    Ok(redirect("/"))
}

fn post_form_again(viewer: &CurrentViewer, message: &str, form: &PostDraft, action: &str, is_edit: bool) -> Page {
    let html = MakePostTemplate { viewer: &viewer.0, flash: Some(message), form, action, is_edit }.render()?;
    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(html))
}

// ── Authentication ──────────────────────────────────────────────────────────

/// GET /register
pub async fn register_form(viewer: CurrentViewer, flash: Flash) -> Page {
    page(RegisterTemplate { viewer: &viewer, flash: flash.message(), name: "", email: "" }, &flash)
}

/// POST /register
pub async fn register(
    data: web::Data<AppState>,
    viewer: CurrentViewer,
    form: web::Form<RegisterForm>,
) -> Page {
    let RegisterForm { name, email, password } = form.into_inner();
    let registration = Registration { name: name.clone(), email: email.clone(), password };

    match data.blog.register(registration).await {
        Ok(session) => Ok(HttpResponse::SeeOther()
            .insert_header((header::LOCATION, "/"))
            .cookie(data.cookies.session_cookie(session.token))
            .finish()),
        Err(AppError::DuplicateEmail(_)) => Ok(redirect_with_flash(
            "/login",
            "User already exists, please login instead",
        )),
        Err(AppError::ValidationError(msg)) => {
            let html = RegisterTemplate { viewer: &viewer, flash: Some(msg.as_str()), name: &name, email: &email }
                .render()?;
            Ok(HttpResponse::Ok().content_type(ContentType::html()).body(html))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /login
pub async fn login_form(viewer: CurrentViewer, flash: Flash) -> Page {
    page(LoginTemplate { viewer: &viewer, flash: flash.message(), email: "" }, &flash)
}

/// POST /login
pub async fn login(
    data: web::Data<AppState>,
    viewer: CurrentViewer,
    form: web::Form<LoginForm>,
) -> Page {
    let message = match data.blog.login(&form.email, &form.password).await {
        Ok(session) => {
            return Ok(HttpResponse::SeeOther()
                .insert_header((header::LOCATION, "/"))
                .cookie(data.cookies.session_cookie(session.token))
                .finish());
        }
        Err(AppError::InvalidCredentials(CredentialFault::UnknownEmail)) => "Invalid user, please try again",
        Err(AppError::InvalidCredentials(CredentialFault::WrongPassword)) => "Invalid password, please try again",
        Err(e) => return Err(e.into()),
    };

    let html = LoginTemplate { viewer: &viewer, flash: Some(message), email: &form.email }.render()?;
    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(html))
}

/// GET /logout: always succeeds, with or without a session.
pub async fn logout(data: web::Data<AppState>, req: HttpRequest) -> Page {
    if let Some(token) = data.cookies.token(&req) {
        data.blog.logout(&token).await?;
    }
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/"))
        .cookie(data.cookies.removal_cookie())
        .finish())
}

// ── Static pages ────────────────────────────────────────────────────────────

/// GET /about
pub async fn about(viewer: CurrentViewer, flash: Flash) -> Page {
    page(AboutTemplate { viewer: &viewer, flash: flash.message() }, &flash)
}

/// GET /contact
pub async fn contact(viewer: CurrentViewer, flash: Flash) -> Page {
    page(ContactTemplate { viewer: &viewer, flash: flash.message() }, &flash)
}
