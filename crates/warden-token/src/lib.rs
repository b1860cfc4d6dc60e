//! Compact signed tokens and the principals they prove.
//!
//! This crate provides:
//! - [`SigningSecret`]: a 32-byte HMAC key with a loggable key id and a
//!   redacted `Debug` form
//! - [`TokenCodec`]: issue and verify `header.claims.mac` compact tokens
//!   (HMAC-SHA256, base64url, no padding)
//! - [`Principal`]: the authenticated identity produced by verification
//!
//! Verification recomputes the MAC over the token bytes exactly as received
//! and only then parses the claims. Lifetimes are strict: a token issued at
//! `iat` verifies through `iat + max_token_age` and is rejected one second
//! later.
//!
//! # Example
//!
//! ```
//! use warden_token::{Role, SigningSecret, TokenCodec};
//!
//! let codec = TokenCodec::new(SigningSecret::generate());
//! let token = codec.issue("2", Role::User);
//! let principal = codec.verify(&token).unwrap();
//! assert_eq!(principal.subject_id, "2");
//! ```

pub mod claims;
pub mod codec;
pub mod error;
pub mod secret;

pub use claims::{Principal, Role, UnknownRole};
pub use codec::{TokenCodec, DEFAULT_MAX_TOKEN_AGE_SECONDS};
pub use error::{SecretError, TokenError, TokenResult};
pub use secret::{SigningSecret, SECRET_ENV, SECRET_LEN};
