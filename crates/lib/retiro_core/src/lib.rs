//! # retiro_core
//!
//! Core account and verification logic for Retiro.

pub mod auth;
pub mod config;
pub mod db;
pub mod delivery;
pub mod migrate;
pub mod models;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
