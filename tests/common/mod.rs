#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use portfolio_api::config::{AdminCredentials, AppConfig, Environment};
use portfolio_api::database::MemoryStore;
use portfolio_api::notify::LogNotifier;
use portfolio_api::AppState;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";
pub const BOUNDARY: &str = "portfolio-test-boundary";

/// An in-process application backed by the memory store and a throwaway
/// upload directory.
pub struct TestApp {
    pub router: Router,
    pub uploads: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Result<Self> {
        let uploads = tempfile::tempdir().context("failed to create upload dir")?;

        let mut config = AppConfig::preset(
            Environment::Development,
            "integration-test-secret".to_string(),
            AdminCredentials {
                email: ADMIN_EMAIL.to_string(),
                password: ADMIN_PASSWORD.to_string(),
            },
        );
        config.uploads.dir = uploads.path().to_path_buf();

        let state = AppState::new(config, Arc::new(MemoryStore::new()), Arc::new(LogNotifier));
        Ok(Self {
            router: portfolio_api::app(state),
            uploads,
        })
    }

    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        Ok(TestResponse { status, body })
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<TestResponse> {
        self.json(Method::GET, uri, token, None).await
    }

    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Vec<u8>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body))?).await
    }

    /// Log in as the configured admin and return the bearer token.
    pub async fn admin_token(&self) -> Result<String> {
        let res = self
            .json(
                Method::POST,
                "/api/auth/login",
                None,
                Some(serde_json::json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
            )
            .await?;
        anyhow::ensure!(res.status == StatusCode::OK, "login failed: {}", res.body);
        res.body["token"]
            .as_str()
            .map(str::to_string)
            .context("login response has no token")
    }
}

/// Builds a `multipart/form-data` body using [`BOUNDARY`].
#[derive(Default)]
pub struct MultipartBody {
    bytes: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.bytes.extend_from_slice(data);
        self.bytes.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.bytes
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.bytes
    }
}

/// Smallest valid-looking PNG header; only the extension and content type
/// are checked on upload.
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
