//! Liveness report. Independent of the prompt builder and the LLM client.

use serde::{Deserialize, Serialize};

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "llm-phraser";

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Always `"ok"` while the process serves requests.
    pub status: String,
    /// Service name.
    pub service: String,
}

/// The fixed liveness payload.
pub fn report() -> HealthReport {
    HealthReport {
        status: "ok".to_owned(),
        service: SERVICE_NAME.to_owned(),
    }
}
