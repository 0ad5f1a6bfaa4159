//! Secret handling utilities.
//!
//! Re-exports the secrecy types used by [`Config`](super::Config) so callers
//! can expose credentials without a direct secrecy dependency.

pub use secrecy::{ExposeSecret, SecretString};
