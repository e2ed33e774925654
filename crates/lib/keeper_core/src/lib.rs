//! # keeper_core
//!
//! Core domain logic for Keeper: validation, envelope encryption, the
//! session lifecycle and the encrypted keychain.

pub mod auth;
pub mod crypto;
pub mod keychain;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod migrate;
pub mod models;
pub mod uuid;
pub mod validation;

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
