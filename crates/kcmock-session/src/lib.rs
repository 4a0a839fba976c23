//! # kcmock-session
//!
//! Login session state for the Keycloak mock.
//!
//! Sessions move through two stages: an authorization request captured when
//! the login page is served, and an established session once the user has
//! authenticated. The repository stores both stages under the session ID and
//! guards every transition against concurrent modification.

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod error;
pub mod repository;
pub mod session;
pub mod user_data;

pub use error::{SessionError, SessionResult};
pub use repository::{SessionEntry, SessionRepository};
pub use session::{AdHocSession, LoginSession, PersistentSession, SessionRequest, SessionRequestOptions};
pub use user_data::UserData;
