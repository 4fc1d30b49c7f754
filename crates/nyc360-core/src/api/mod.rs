//! REST API access for the NYC360 platform.
//!
//! This module provides:
//! - `RemoteCaller`: the one-call seam interaction sites dispatch through
//! - `ApiClient`: its reqwest implementation, plus account calls and reads
//! - `routes`: path builders for every endpoint the client calls
//!
//! Requests carry the stored access token as a bearer token. Responses use
//! the platform's `{isSuccess, data, error}` envelope; `isSuccess: false`
//! is reported as `ApiError::Rejected`.

pub mod client;
pub mod error;
pub mod remote;
pub mod routes;

pub use client::{
    ApiClient, ChangePasswordRequest, ConfirmEmailRequest, ForgotPasswordRequest, ResetPasswordRequest, TokenPair,
};
pub use error::ApiError;
pub use remote::{Method, RemoteCall, RemoteCaller};
