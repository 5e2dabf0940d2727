#![deny(unsafe_code)]

//! Shared test utilities for the Harbourmaster workspace.
//!
//! Provides a stub container engine on a real Unix socket, an instrumented
//! in-process transport, config builders, and tracing helpers so that
//! individual crate tests stay concise and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! harbourmaster-test-utils = { workspace = true }
//! ```

pub mod capture;
pub mod config;
pub mod engine;
pub mod tracing_setup;
pub mod transport;
