#![forbid(unsafe_code)]

//! Transform chain engine for the Sigtuna digest-transform library.
//!
//! A chain is an ordered sequence of byte-oriented transform nodes through
//! which a document's bytes flow during sign or verify processing. The
//! digest transform sits in such a chain as a transparent observer (push
//! mode) or terminal consumer, hashes everything that flows through it, and
//! binds the finalized digest to a `DigestValue` element.

pub mod chain;
pub mod digest;
pub mod memory;

pub use chain::{
    ChainLink, KeyRequirements, Transform, TransformChain, TransformKind, TransformStatus,
    TransformUsage, Written,
};
pub use digest::{DigestMethod, DigestMode, DigestTransform, DIGEST_METHODS};
pub use memory::{MemoryBuffer, MemorySource};
