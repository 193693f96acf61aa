// src/handlers/health.rs

/// Liveness probe for the hosting platform.
pub async fn root() -> &'static str {
    "Server is running"
}

pub async fn health() -> &'static str {
    "OK"
}
