//! API server configuration.

use retiro_core::config::AuthConfig;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "0.0.0.0:3001").
    pub bind_addr: String,
    /// SQLite connection URL.
    pub database_url: String,
    /// Signing key, hashing cost, code and session settings.
    pub auth: AuthConfig,
}
