//! # kcmock-protocol-oidc
//!
//! `OpenID` Connect protocol logic for the Keycloak mock.
//!
//! ## Modules
//!
//! - [`discovery`] - provider metadata for the `.well-known` endpoint
//! - [`error`] - token parsing and signing errors
//! - [`jwks`] - JSON Web Key Set publication
//! - [`redirect`] - OAuth2 redirect and session cookie construction
//! - [`token`] - token signing and parsing
//! - [`token_config`] - claim set description for a single token
//! - [`urls`] - issuer and endpoint URL resolution

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod discovery;
pub mod error;
pub mod jwks;
pub mod redirect;
pub mod token;
pub mod token_config;
pub mod urls;

pub use discovery::ProviderMetadata;
pub use error::{TokenParseError, TokenParseResult, TokenSigningError};
pub use jwks::{JsonWebKey, JsonWebKeySet};
pub use redirect::{KEYCLOAK_SESSION_COOKIE, RedirectHelper, ResponseMode, ResponseType};
pub use token::{TokenGenerator, TokenHelper};
pub use token_config::{Access, TokenConfig, TokenOptions};
pub use urls::UrlConfiguration;
