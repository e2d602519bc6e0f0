use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use edu_portal::api::create_router;
use edu_portal::config::Config;
use edu_portal::external::{CompletionClient, ExternalError, MailMessage, Mailer};
use bytes::Bytes;
use edu_portal::object_store::{LocalStore, ObjectStore, ObjectStoreError, ObjectStream};
use edu_portal::storage::Database;
use edu_portal::AppState;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

pub const BOUNDARY: &str = "edu-portal-test-boundary";

/// Keeps every message instead of delivering it.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<MailMessage>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), ExternalError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Answers every prompt with a canned completion and remembers the prompts.
pub struct StubCompletion {
    pub reply: String,
    pub prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl CompletionClient for StubCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, ExternalError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// How a `FaultyStore` misbehaves on writes.
#[allow(dead_code)]
pub enum Fault {
    /// Every write fails with a backend error.
    FailWrites,
    /// Every write stalls for this long before failing.
    StallWrites(Duration),
}

/// Object store whose writes never succeed. Deletes are recorded.
pub struct FaultyStore {
    fault: Fault,
    pub deleted: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FaultyStore {
    pub fn new(fault: Fault) -> Self {
        Self {
            fault,
            deleted: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ObjectStore for FaultyStore {
    async fn put(&self, key: &str, _data: Bytes) -> Result<(), ObjectStoreError> {
        if let Fault::StallWrites(delay) = self.fault {
            tokio::time::sleep(delay).await;
        }
        Err(ObjectStoreError::Backend(format!("refusing to store {key}")))
    }

    async fn get_stream(&self, key: &str) -> Result<ObjectStream, ObjectStoreError> {
        Err(ObjectStoreError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub mailer: Arc<RecordingMailer>,
    pub completions: Arc<StubCompletion>,
    _dir: tempfile::TempDir,
}

#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path().join("uploads")).unwrap();
    build_test_app(config, Arc::new(store), dir)
}

/// Test app backed by the given object store instead of a local directory.
#[allow(dead_code)]
pub fn create_test_app_with_store(config: Config, store: Arc<dyn ObjectStore>) -> TestApp {
    build_test_app(config, store, tempfile::tempdir().unwrap())
}

fn build_test_app(config: Config, store: Arc<dyn ObjectStore>, dir: tempfile::TempDir) -> TestApp {
    let db = Database::open(dir.path().join("data")).unwrap();
    let mailer = Arc::new(RecordingMailer::default());
    let completions = Arc::new(StubCompletion {
        reply: "1. What is ownership?\n2. What is borrowing?\n- What is a lifetime?".to_string(),
        prompts: Mutex::new(Vec::new()),
    });

    let state = Arc::new(AppState {
        config,
        db,
        object_store: store,
        mailer: mailer.clone(),
        completions: completions.clone(),
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        mailer,
        completions,
        _dir: dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    #[allow(dead_code)]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Value {
        let response = self
            .send(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                &serde_json::json!({
                    "name": name,
                    "email": email,
                    "password": password,
                    "role": "student",
                }),
            ))
            .await;
        assert_eq!(response.status(), 201);
        body_json(response).await
    }

    /// Register a user and return their bearer token.
    #[allow(dead_code)]
    pub async fn token_for(&self, name: &str, email: &str) -> String {
        let body = self.register(name, email, "secret123").await;
        body["token"].as_str().unwrap().to_string()
    }
}

#[allow(dead_code)]
pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[allow(dead_code)]
pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

/// One part of a multipart form.
#[allow(dead_code)]
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

#[allow(dead_code)]
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[allow(dead_code)]
pub fn upload_request(token: Option<&str>, parts: &[Part<'_>]) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/content/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

#[allow(dead_code)]
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
