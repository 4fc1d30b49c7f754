//! Authentication module for the signed-in user's identity.
//!
//! This module provides:
//! - `SessionStore`: derives the current `Identity` from the stored access
//!   token, publishes it to subscribers and answers role/permission checks
//! - `claims`: ordered claim-alias resolution that normalizes the token
//!   payload of different issuers into one `Identity` shape
//! - `token`: JWT payload decoding (signatures are not verified client-side)
//! - `Navigator`: the seam used to send the user to the sign-in screen
//!
//! A malformed or expired token is never an error for callers: the stored
//! credential is cleared and the session falls back to anonymous.

pub mod claims;
pub mod error;
pub mod navigation;
pub mod session;
pub mod token;

pub use claims::{Claims, Identity, SUPER_ROLE};
pub use error::AuthError;
pub use navigation::{Navigator, SIGN_IN_PATH};
pub use session::{SessionStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
pub use token::{JwtDecoder, TokenDecoder};
