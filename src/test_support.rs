//! In-process stand-ins for the hosted AI API and a cookie-carrying router client.

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{engine::general_purpose, Engine as _};
use http_body_util::BodyExt;
use image::{ImageFormat, Rgba, RgbaImage};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

use crate::config::Config;
use crate::llm::AiGateway;
use crate::server::build_router;
use crate::state::AppState;
use crate::utils::http::build_http_client;
use crate::utils::session_store::ExpiringMemoryStore;

#[derive(Default)]
struct MockState {
    base: String,
    completion_text: String,
    fail_completions: bool,
    empty_choices: bool,
    fail_images: bool,
    completions: Vec<Value>,
    images: Vec<Value>,
    authorization: Option<String>,
    file_hits: usize,
}

type Shared = Arc<Mutex<MockState>>;

#[derive(Clone)]
pub struct MockOpenAi {
    addr: SocketAddr,
    state: Shared,
}

impl MockOpenAi {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock api");
        let addr = listener.local_addr().expect("mock api address");
        let state = Arc::new(Mutex::new(MockState {
            base: format!("http://{addr}"),
            completion_text: "How are you feeling today?".to_string(),
            ..MockState::default()
        }));

        let router = Router::new()
            .route("/v1/completions", post(completions))
            .route("/v1/images/generations", post(images))
            .route("/files/picture.png", get(picture))
            .route("/files/notes.txt", get(notes))
            .with_state(Arc::clone(&state));
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        MockOpenAi { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn set_completion_text(&self, text: &str) {
        self.state.lock().completion_text = text.to_string();
    }

    pub fn fail_completions(&self, fail: bool) {
        self.state.lock().fail_completions = fail;
    }

    pub fn empty_choices(&self, empty: bool) {
        self.state.lock().empty_choices = empty;
    }

    pub fn fail_images(&self, fail: bool) {
        self.state.lock().fail_images = fail;
    }

    pub fn completion_requests(&self) -> Vec<Value> {
        self.state.lock().completions.clone()
    }

    pub fn image_requests(&self) -> Vec<Value> {
        self.state.lock().images.clone()
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.state.lock().authorization.clone()
    }

    pub fn file_hits(&self) -> usize {
        self.state.lock().file_hits
    }
}

fn remember_authorization(state: &mut MockState, headers: &HeaderMap) {
    state.authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());
}

async fn completions(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock();
    remember_authorization(&mut state, &headers);
    state.completions.push(body);
    if state.fail_completions {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "message": "mock completion failure" } })),
        )
            .into_response();
    }
    if state.empty_choices {
        return Json(json!({ "choices": [] })).into_response();
    }
    Json(json!({ "choices": [{ "text": state.completion_text, "index": 0 }] })).into_response()
}

async fn images(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock();
    remember_authorization(&mut state, &headers);
    let count = body.get("n").and_then(Value::as_u64).unwrap_or(1);
    state.images.push(body);
    if state.fail_images {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": { "message": "mock rate limit" } })),
        )
            .into_response();
    }
    let data: Vec<Value> = (0..count)
        .map(|index| json!({ "url": format!("{}/files/generated-{index}.png", state.base) }))
        .collect();
    Json(json!({ "created": 0, "data": data })).into_response()
}

async fn picture(State(state): State<Shared>) -> Response {
    state.lock().file_hits += 1;
    let image = RgbaImage::from_pixel(2, 2, Rgba([0xf4, 0x43, 0x36, 255]));
    ([(header::CONTENT_TYPE, "image/png")], png_bytes(&image)).into_response()
}

async fn notes(State(state): State<Shared>) -> Response {
    state.lock().file_hits += 1;
    "just some text".into_response()
}

pub fn png_bytes(image: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode png");
    bytes
}

pub fn png_data_url(image: &RgbaImage) -> String {
    format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(png_bytes(image))
    )
}

pub fn test_config(mock: &MockOpenAi) -> Config {
    Config {
        openai_api_key: "test-key".to_string(),
        openai_base_url: mock.base_url(),
        http_timeout_seconds: 5,
        proxy_allowed_hosts: vec!["127.0.0.1".to_string()],
        proxy_allow_http: true,
        ..Config::default()
    }
}

pub fn gateway_for_mock(mock: &MockOpenAi) -> AiGateway {
    let config = test_config(mock);
    let client = build_http_client(config.http_timeout()).expect("http client");
    AiGateway::new(client, Arc::new(config))
}

/// Drives the application router in-process, replaying the session cookie like a browser.
pub struct TestClient {
    router: Router,
    sessions: ExpiringMemoryStore,
    cookie: Option<String>,
}

impl TestClient {
    pub fn new(mock: &MockOpenAi) -> Self {
        Self::with_config(test_config(mock))
    }

    pub fn with_config(config: Config) -> Self {
        let state = AppState::new(config).expect("app state");
        TestClient {
            sessions: state.sessions.clone(),
            router: build_router(state),
            cookie: None,
        }
    }

    /// Another browser against the same running application.
    pub fn fresh_session(&self) -> Self {
        TestClient {
            router: self.router.clone(),
            sessions: self.sessions.clone(),
            cookie: None,
        }
    }

    pub fn sessions(&self) -> &ExpiringMemoryStore {
        &self.sessions
    }

    async fn send(&mut self, mut request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        if let Some(cookie) = &self.cookie {
            request.headers_mut().insert(
                header::COOKIE,
                cookie.parse().expect("cookie header value"),
            );
        }

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");

        for value in response.headers().get_all(header::SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            let pair = raw.split(';').next().unwrap_or("").trim().to_string();
            if raw.to_ascii_lowercase().contains("max-age=0") {
                self.cookie = None;
            } else if !pair.is_empty() {
                self.cookie = Some(pair);
            }
        }

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("response body")
            .to_bytes()
            .to_vec();
        (status, headers, body)
    }

    pub async fn get(&mut self, path: &str) -> (StatusCode, HeaderMap, Vec<u8>) {
        let request = Request::builder()
            .uri(path)
            .body(Body::empty())
            .expect("request");
        self.send(request).await
    }

    pub async fn get_text(&mut self, path: &str) -> (StatusCode, String) {
        let (status, _, body) = self.get(path).await;
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    pub async fn post_json(&mut self, path: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        let (status, _, bytes) = self.send(request).await;
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}
