//! # Session & Flash Cookies
//!
//! The session cookie carries an opaque token; the server maps it to a user.
//! Flash messages ride in a second cookie that the next rendered page clears.

use std::ops::Deref;

use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{ready, Ready};
use rb_core::models::Viewer;

pub const FLASH_COOKIE: &str = "flash";

/// How the session cookie is issued.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
    pub ttl_hours: i64,
}

impl CookieSettings {
    pub fn new(name: impl Into<String>, secure: bool, ttl_hours: i64) -> Self {
        Self { name: name.into(), secure, ttl_hours }
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build(self.name.clone(), token)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(Duration::hours(self.ttl_hours))
            .finish()
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build(self.name.clone(), "").path("/").finish();
        cookie.make_removal();
        cookie
    }

    pub fn token(&self, req: &HttpRequest) -> Option<String> {
        req.cookie(&self.name).map(|c| c.value().to_owned())
    }
}

pub fn flash_cookie(message: &str) -> Cookie<'static> {
    Cookie::build(FLASH_COOKIE, message.to_owned())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

pub fn flash_removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(FLASH_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// The pending flash message, if the previous response left one.
#[derive(Debug, Clone, Default)]
pub struct Flash(Option<String>);

impl Flash {
    pub fn message(&self) -> Option<&str> {
        self.0.as_deref().filter(|m| !m.is_empty())
    }

    pub fn is_pending(&self) -> bool {
        self.0.is_some()
    }
}

impl FromRequest for Flash {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(Flash(req.cookie(FLASH_COOKIE).map(|c| c.value().to_owned()))))
    }
}

/// The request's identity as resolved by `middleware::resolve_viewer`.
/// Derefs to [`Viewer`]; requests that bypassed the middleware are anonymous.
#[derive(Debug, Clone, Default)]
pub struct CurrentViewer(pub Viewer);

impl Deref for CurrentViewer {
    type Target = Viewer;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for CurrentViewer {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let viewer = req.extensions().get::<Viewer>().cloned().unwrap_or_default();
        ready(Ok(CurrentViewer(viewer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_session_cookie_attributes() {
        let settings = CookieSettings::new("sid", true, 2);
        let cookie = settings.session_cookie("abc".into());
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(Duration::hours(2)));

        let removal = settings.removal_cookie();
        assert_eq!(removal.name(), "sid");
        assert_eq!(removal.value(), "");
        assert_eq!(removal.max_age(), Some(Duration::ZERO));
    }

    #[actix_web::test]
    async fn test_viewer_defaults_to_anonymous() {
        let req = TestRequest::default().to_http_request();
        let viewer = CurrentViewer::extract(&req).await.unwrap();
        assert_eq!(*viewer, Viewer::Anonymous);
    }

    #[actix_web::test]
    async fn test_flash_reads_cookie() {
        let req = TestRequest::default()
            .cookie(flash_cookie("Please log in to make a comment"))
            .to_http_request();
        let flash = Flash::extract(&req).await.unwrap();
        assert!(flash.is_pending());
        assert_eq!(flash.message(), Some("Please log in to make a comment"));

        let req = TestRequest::default().to_http_request();
        assert_eq!(Flash::extract(&req).await.unwrap().message(), None);
    }
}
