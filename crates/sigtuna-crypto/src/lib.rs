#![forbid(unsafe_code)]

//! Digest algorithm implementations for the Sigtuna digest-transform library.
//!
//! Provides the `DigestAlgorithm` capability trait, RustCrypto-backed
//! implementations for the SHA families (plus feature-gated legacy hashes),
//! streaming HMAC variants, and the URI registry that selects among them.

pub mod digest;
mod hmac;

pub use digest::{from_uri, DigestAlgorithm};
