//! Liveness probe.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::record::format_timestamp;

/// HTTP status returned with every health response.
pub const HEALTH_STATUS_CODE: u16 = 200;

const HEALTH_MESSAGE: &str = "Information Extraction Function App is running";

/// Body of the health response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub message: String,
}

/// Reports that the host is up. Touches no external service.
pub fn health_check() -> (u16, HealthStatus) {
    (
        HEALTH_STATUS_CODE,
        HealthStatus {
            status: "healthy".to_string(),
            timestamp: format_timestamp(Utc::now()),
            message: HEALTH_MESSAGE.to_string(),
        },
    )
}
