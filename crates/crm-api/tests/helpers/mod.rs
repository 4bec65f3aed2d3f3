pub mod auth;
pub mod fixtures;

use std::sync::{Arc, Mutex};

use axum_test::TestServer;
use crm_api::setup::{routes, services};
use crm_api::AppState;
use crm_core::{AppError, Config, MapSource};
use crm_db::InMemoryBackend;
use crm_services::ResetCodeSink;

pub const TEST_SIGNING_SECRET: &str = "integration-test-signing-secret-0123456789";

/// Returns the versioned API path.
/// Usage: `api_path("/accounts")` -> `/api/v1/accounts`.
pub fn api_path(path: &str) -> String {
    format!("{}{}", crm_api::constants::API_PREFIX, path)
}

/// Keeps reset codes for the test to read back.
#[derive(Default)]
pub struct CapturedCodes(Mutex<Vec<(String, String)>>);

impl CapturedCodes {
    pub fn last_for(&self, email: &str) -> Option<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }
}

#[async_trait::async_trait]
impl ResetCodeSink for CapturedCodes {
    async fn deliver(&self, email: &str, code: &str) -> Result<(), AppError> {
        self.0
            .lock()
            .unwrap()
            .push((email.to_string(), code.to_string()));
        Ok(())
    }
}

/// Test application state
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub codes: Arc<CapturedCodes>,
}

impl TestApp {
    /// Get the HTTP test client
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn test_config() -> Config {
    Config::from_source(
        &MapSource::new()
            .with("IDENTITY_SIGNING_SECRET", TEST_SIGNING_SECRET)
            .with("STORE_BACKEND", "memory"),
    )
    .expect("test config")
}

/// Setup a test application over a fresh in-memory store
pub async fn setup_test_app() -> TestApp {
    let config = test_config();
    let codes = Arc::new(CapturedCodes::default());
    let state = services::initialize_services_with_sink(
        &config,
        Arc::new(InMemoryBackend::new()),
        codes.clone(),
    )
    .expect("Failed to initialize services");
    let router = routes::setup_routes(&config, state.clone()).expect("Failed to setup routes");
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        state,
        codes,
    }
}
