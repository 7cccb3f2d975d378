#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tower::ServiceExt;

use photoshake::{
    db,
    models::errors::AppError,
    routes::app_router,
    services::email::{EmailMessage, Mailer},
    utils::config::AppConfig,
    AppState,
};

pub const PASSWORD: &str = "123456789";
const BOUNDARY: &str = "photoshake-test-boundary";

/// Keeps every message instead of delivering it
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), AppError> {
        self.sent.lock().await.push(message);
        Ok(())
    }
}

/// Router over an in-memory database and a throwaway media directory
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    _media: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(customize: impl FnOnce(&mut AppConfig)) -> Self {
        let media = TempDir::new().unwrap();

        let mut config = AppConfig {
            media_dir: media.path().to_str().unwrap().to_string(),
            public_url: "http://testserver".to_string(),
            jwt_secret: "test-secret".to_string(),
            rate_limit_requests: 1000,
            ..AppConfig::default()
        };
        customize(&mut config);

        let pool = db::connect_in_memory().await.unwrap();
        db::migrations::run_migrations(&pool).await.unwrap();

        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(config, pool, mailer.clone()).unwrap();

        Self {
            router: app_router(state.clone()),
            state,
            mailer,
            _media: media,
        }
    }

    pub async fn raw(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Sends the request and decodes the JSON body (`Null` when empty)
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.raw(request).await;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    pub async fn signup(&self, username: &str, email: &str) -> (StatusCode, Value) {
        self.send(json_request(
            "POST",
            "/api/auth/signup",
            None,
            &serde_json::json!({
                "username": username,
                "email": email,
                "password": PASSWORD,
            }),
        ))
        .await
    }

    pub async fn confirm(&self, email: &str) -> (StatusCode, Value) {
        let token = self.state.auth.create_email_token(email).unwrap();
        self.send(get(&format!("/api/auth/confirmed_email/{}", token), None))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        let form = format!("username={}&password={}", email, password);
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap();
        self.send(request).await
    }

    /// Signs up, confirms and logs in; returns the access token
    pub async fn register(&self, username: &str) -> String {
        let email = email_of(username);
        let (status, _) = self.signup(username, &email).await;
        assert_eq!(status, StatusCode::CREATED);
        self.confirm(&email).await;

        let (status, tokens) = self.login(&email, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", tokens);
        tokens["access_token"].as_str().unwrap().to_string()
    }

    pub async fn upload_foto(&self, token: &str, title: &str, tags: &[&str]) -> Value {
        let mut fields = vec![("title", title), ("descr", "Uploaded in a test")];
        fields.extend(tags.iter().map(|tag| ("tags", *tag)));

        let png = png_bytes(40, 30);
        let (status, body) = self
            .send(multipart_request(
                "POST",
                "/api/fotos/new/",
                token,
                &fields,
                &[("file", "foto.png", png.as_slice())],
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "upload failed: {}", body);
        body
    }

    /// Waits for background mail delivery to reach `count` messages
    pub async fn wait_for_mail(&self, count: usize) -> Vec<EmailMessage> {
        for _ in 0..100 {
            {
                let sent = self.mailer.sent.lock().await;
                if sent.len() >= count {
                    return sent.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.mailer.sent.lock().await.clone()
    }
}

/// Marks the request as coming from `ip`, as the server does for real connections
pub fn from_peer(mut request: Request<Body>, ip: [u8; 4]) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
    request
}

pub fn email_of(username: &str) -> String {
    format!("{}@example.com", username)
}

fn authorized(builder: axum::http::request::Builder, token: Option<&str>) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {}", token)),
        None => builder,
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    authorized(Request::builder().method("GET").uri(uri), token)
        .body(Body::empty())
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    authorized(Request::builder().method(method).uri(uri), token)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    authorized(Request::builder().method(method).uri(uri), token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub fn multipart_request(
    method: &str,
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    files: &[(&str, &str, &[u8])],
) -> Request<Body> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }

    for (name, filename, data) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// A small gradient PNG
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x * 6) as u8, (y * 8) as u8, 128, 255])
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut out, image::ImageOutputFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn decode_image(data: &[u8]) -> image::RgbaImage {
    image::load_from_memory(data).unwrap().to_rgba8()
}

/// Last path segments after `/media/`
pub fn media_path(url: &str) -> String {
    let at = url.find("/media/").unwrap();
    url[at..].to_string()
}
