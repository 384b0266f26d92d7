//! Secret handling utilities.
//!
//! Re-exports the secrecy types the binary needs to read the database URL.

pub use secrecy::{ExposeSecret, SecretString};
