use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use fitclub_api::documents::DocumentStore;
use fitclub_api::{ApiConfig, AppState, AppStateInner, router};
use fitclub_db::Database;

pub const ADMIN_EMAIL: &str = "admin@example.com";

/// Document store double kept in memory. Lookups of ids passed to
/// [`MemoryStore::fail`] return an error.
#[derive(Default)]
pub struct MemoryStore {
    files: Mutex<HashMap<(String, String), Vec<u8>>>,
    failing: Mutex<HashSet<String>>,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn fail(&self, document_id: &str) {
        self.failing.lock().unwrap().insert(document_id.to_string());
    }

    pub fn contains(&self, user_id: &str, document_id: &str) -> bool {
        self.files
            .lock()
            .unwrap()
            .contains_key(&(user_id.to_string(), document_id.to_string()))
    }

    pub fn url_for(user_id: &str, document_id: &str) -> String {
        format!("memory://{}/{}", user_id, document_id)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn put(&self, user_id: &str, document_id: &str, bytes: &[u8]) -> anyhow::Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert((user_id.to_string(), document_id.to_string()), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, user_id: &str, document_id: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(&(user_id.to_string(), document_id.to_string()))
            .cloned())
    }

    async fn url(&self, user_id: &str, document_id: &str) -> anyhow::Result<Option<String>> {
        if self.failing.lock().unwrap().contains(document_id) {
            anyhow::bail!("storage backend unavailable");
        }
        Ok(self
            .contains(user_id, document_id)
            .then(|| Self::url_for(user_id, document_id)))
    }

    async fn delete(&self, user_id: &str, document_id: &str) -> anyhow::Result<()> {
        self.files
            .lock()
            .unwrap()
            .remove(&(user_id.to_string(), document_id.to_string()));
        Ok(())
    }
}

/// A registered account: id and bearer token.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub token: String,
}

#[allow(dead_code)]
impl Account {
    pub fn id_str(&self) -> String {
        self.id.to_string()
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

#[allow(dead_code)]
impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().expect("in-memory database"),
            documents: store.clone(),
            config: ApiConfig {
                jwt_secret: "test-secret-with-enough-entropy".into(),
                token_days: 1,
                admin_emails: vec![ADMIN_EMAIL.into()],
            },
        });

        Self {
            app: router(state.clone()),
            state,
            store,
        }
    }

    /// Send a request and decode the JSON answer (`Null` for an empty body).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = self.call_raw(method, uri, token, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON response body")
        };
        (status, value)
    }

    pub async fn call_raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, Some(token), None).await
    }

    /// Register `name` with `role` ("MEMBER", "COACH", ...).
    pub async fn register(&self, name: &str, role: &str) -> Account {
        self.register_email(name, &format!("{}@example.com", name), role)
            .await
    }

    pub async fn register_email(&self, name: &str, email: &str, role: &str) -> Account {
        let (status, body) = self
            .call(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({
                    "name": name,
                    "email": email,
                    "password": "correct horse battery",
                    "role": role,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {}: {}", name, body);
        Account {
            id: body["userId"].as_str().unwrap().parse().unwrap(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn admin(&self) -> Account {
        self.register_email("admin", ADMIN_EMAIL, "MEMBER").await
    }

    /// Upload `bytes` as `account`; returns the document id.
    pub async fn upload(&self, account: &Account, bytes: &[u8]) -> String {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/documents?kind=IMAGE&fileName=picture.png")
            .header(header::AUTHORIZATION, format!("Bearer {}", account.token))
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from(bytes.to_vec()))
            .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        body["id"].as_str().unwrap().to_string()
    }
}

/// `details` of an error body.
#[allow(dead_code)]
pub fn details(body: &Value) -> &str {
    body["details"].as_str().unwrap_or_default()
}
