#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use reelshelf::{AppState, config::Config, db, router};

pub const PASSWORD: &str = "secret-pw";

/// Router plus the state behind it, on a fresh in-memory database.
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub async fn new() -> Self {
        let config = Arc::new(Config::default());
        let db = db::connect_and_migrate(&config.database_url).await.expect("database");
        let state = Arc::new(AppState::new(config, db));
        Self { router: router(state.clone()), state }
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.expect("infallible router")
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut req = Request::get(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        self.send(req.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut req = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        self.send(req.body(Body::from(body.to_string())).unwrap()).await
    }

    /// Signs up a fresh account and returns its `session=...` cookie pair.
    pub async fn sign_up(&self, email: &str) -> String {
        let body = format!("email={}&password={PASSWORD}", email.replace('@', "%40"));
        let resp = self.post_form("/signup", &body, None).await;
        assert!(resp.status().is_redirection(), "signup failed: {}", resp.status());
        session_cookie(&resp).expect("session cookie")
    }

    pub async fn owner_id(&self, cookie: &str) -> String {
        let token = cookie.trim_start_matches("session=");
        self.state.auth.current_user(token).await.unwrap().expect("signed in").id
    }
}

pub fn session_cookie(resp: &Response<Body>) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with("session=") && pair.len() > "session=".len())
        .map(str::to_string)
}

pub fn location(resp: &Response<Body>) -> &str {
    resp.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()).unwrap_or_default()
}

pub async fn body_text(resp: Response<Body>) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
