//! Authentication state and recovery.
//!
//! This module holds the session store, the single-flight refresh
//! coordinator, and the server-side session verifier.

mod credentials;
pub(crate) mod refresh;
pub(crate) mod store;
pub(crate) mod tokens;
pub(crate) mod verify;

pub use credentials::Credentials;
pub use store::SessionStore;
pub use tokens::{AccessToken, RefreshToken};
pub use verify::{Verification, VerificationStatus};
