//! # Authentication Module
//!
//! Exchanges a ClearML access/secret key pair for a bearer token and attaches
//! that token to every later request.
//!
//! ## Overview
//!
//! A [`Session`] is created by [`Session::login`], which issues exactly one
//! `POST /auth.login` with HTTP Basic authentication. The token lives in memory
//! for the lifetime of the session and is never refreshed; build a new session
//! to re-authenticate.
//!
//! A failed login leaves nothing behind: there is no way to obtain a
//! `Session` without a token.

pub mod credentials;
pub mod error;
pub mod session;

pub use credentials::Credentials;
pub use error::{AuthError, Result};
pub use session::{Session, LOGIN_PATH};
