//! What binary is answering: reported by `/health` and logged when the
//! proxy starts listening.
//!
//! `HARBOURMASTER_GIT_HASH` and `HARBOURMASTER_BUILD_PROFILE` are set by
//! `build.rs`; the hash is `unknown` outside a git checkout.

pub const GIT_HASH: &str = env!("HARBOURMASTER_GIT_HASH");

pub const BUILD_PROFILE: &str = env!("HARBOURMASTER_BUILD_PROFILE");

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `"<version> (<hash>, <profile>)"`, as printed in the startup record.
pub fn version_string() -> String {
    format!("{VERSION} ({GIT_HASH}, {BUILD_PROFILE})")
}
