//! # kcmock-core
//!
//! Server configuration and shared types for the Keycloak mock.
//!
//! This crate provides the foundational configuration types consumed by the
//! protocol and server crates.

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod config;
pub mod error;

pub use config::{LoginRoleMapping, Protocol, ServerConfig};
pub use error::{ConfigurationError, CoreResult};
