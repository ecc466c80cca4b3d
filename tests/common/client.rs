//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with token handling so tests read as request/assert pairs.
//! When routes or request shapes change, update only this file.

use super::constants::*;
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    pub client: reqwest::Client,
    pub base_url: String,
    pub token: Option<String>,
}

impl TestClient {
    /// Creates a new unauthenticated client.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// Creates a client with a freshly signed-up default user.
    pub async fn authenticated(base_url: String) -> Self {
        Self::authenticated_as(base_url, TEST_UID, TEST_EMAIL, TEST_NICKNAME).await
    }

    /// Creates a client with a freshly signed-up user of the given identity.
    pub async fn authenticated_as(
        base_url: String,
        uid: &str,
        email: &str,
        nickname: &str,
    ) -> Self {
        let mut client = Self::new(base_url);
        let response = client.signup(uid, email, nickname).await;
        assert_eq!(
            response.status(),
            StatusCode::CREATED,
            "Test user signup failed"
        );
        let body: Value = response.json().await.expect("Signup body was not JSON");
        client.token = Some(
            body["token"]
                .as_str()
                .expect("Signup response carried no token")
                .to_string(),
        );
        client
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.token.as_deref().unwrap_or(""))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn signup(&self, uid: &str, email: &str, nickname: &str) -> Response {
        self.client
            .post(self.url("/user/me"))
            .json(&json!({ "uid": uid, "email": email, "nickname": nickname }))
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn login(&self, uid: &str, email: &str) -> Response {
        self.client
            .post(self.url("/user/me/login"))
            .json(&json!({ "uid": uid, "email": email }))
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .header("Authorization", self.auth_header())
            .json(body)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn put_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .put(self.url(path))
            .header("Authorization", self.auth_header())
            .json(body)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .expect("Request failed")
    }

    /// Multipart upload of a single `file` field.
    pub async fn post_file(
        &self,
        path: &str,
        filename: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Response {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime)
            .expect("Bad mime type");
        let form = reqwest::multipart::Form::new().part("file", part);
        self.client
            .post(self.url(path))
            .header("Authorization", self.auth_header())
            .multipart(form)
            .send()
            .await
            .expect("Request failed")
    }
}
