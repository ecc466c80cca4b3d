//! Test server lifecycle management
//!
//! Spawns the app on a random port with temp-backed stores and a mock
//! classifier; everything is cleaned up when the server is dropped.

use super::constants::*;
use anyhow::Result;
use async_trait::async_trait;
use petcry_server::auth::TokenIssuer;
use petcry_server::inspection::InspectionEngine;
use petcry_server::pet_store::SqlitePetStore;
use petcry_server::predict::{CryClassifier, PredictionGateway};
use petcry_server::profile_image::ProfileImageStore;
use petcry_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use petcry_server::vocab::Species;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Mock classifier: always returns the fixed label scores.
struct MockCryClassifier;

#[async_trait]
impl CryClassifier for MockCryClassifier {
    async fn classify(
        &self,
        _audio: &[u8],
        _species: Species,
        _user_id: &str,
    ) -> Result<HashMap<String, f64>> {
        Ok(MOCK_CLASSIFIER_SCORES
            .iter()
            .map(|(label, score)| (label.to_string(), *score))
            .collect())
    }
}

pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Store handle for seeding data directly in tests
    pub store: Arc<SqlitePetStore>,

    // Keep resources alive until drop
    _temp_dir: TempDir,
    _server_task: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Spawns a new test server on a random port.
    pub async fn spawn() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let dir = temp_dir.path();

        let store =
            Arc::new(SqlitePetStore::new(dir.join("pet.db")).expect("Failed to open pet store"));

        let inspection_engine = Arc::new(
            InspectionEngine::new(store.clone(), dir.join("cry_inspect_logs"))
                .expect("Failed to create inspection engine"),
        );
        let prediction_gateway = Arc::new(
            PredictionGateway::new(
                store.clone(),
                Arc::new(MockCryClassifier),
                dir.join("cry_dataset"),
            )
            .expect("Failed to create prediction gateway"),
        );
        let profile_images = Arc::new(
            ProfileImageStore::new(
                dir.join("pet_profiles"),
                dir.join("default_profile_image.jpeg"),
            )
            .expect("Failed to create profile image store"),
        );
        let token_issuer = Arc::new(TokenIssuer::new(TEST_JWT_SECRET));

        let app = make_app(
            ServerConfig {
                port: 0,
                requests_logging_level: RequestsLoggingLevel::None,
            },
            store.clone(),
            inspection_engine,
            prediction_gateway,
            profile_images,
            token_issuer,
        )
        .expect("Failed to build app");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener.local_addr().expect("Failed to read port").port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let server_task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server failed");
        });

        TestServer {
            base_url,
            store,
            _temp_dir: temp_dir,
            _server_task: server_task,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self._server_task.abort();
    }
}
