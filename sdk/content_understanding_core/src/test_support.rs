//! Helpers for testing crates built on top of the core client.
//!
//! Enabled with the `test-support` feature.

use crate::auth::ContentUnderstandingCredential;
use crate::client::{ContentUnderstandingClient, RetryPolicy};
use wiremock::MockServer;

/// Test API key (not a real key).
pub const TEST_API_KEY: &str = "test-api-key";

/// Create a client connected to a mock server.
///
/// Retries are disabled so request counts in tests are exact.
pub async fn setup_mock_client(server: &MockServer) -> ContentUnderstandingClient {
    ContentUnderstandingClient::builder()
        .endpoint(server.uri())
        .credential(ContentUnderstandingCredential::api_key(TEST_API_KEY))
        .retry_policy(RetryPolicy::none())
        .build()
        .expect("should build client")
}
