//! # kcmock-crypto
//!
//! Signing key management for the Keycloak mock.
//!
//! Every token the server issues is signed with a single key pair. An
//! embedded RSA 2048 key is used by default; callers can supply their own
//! RSA, P-256 or P-384 key pair in PEM form instead.

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod keys;

pub use keys::{KeyError, KeyPair, PublicKeyComponents};
