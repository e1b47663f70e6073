//! # medora_core
//!
//! Core domain logic for Medora: credential verification, session tokens,
//! the role guard and per-resource ownership policies, over a pluggable
//! persistence layer.

pub mod access;
pub mod auth;
pub mod migrate;
pub mod models;
pub mod store;
pub mod uuid;

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
