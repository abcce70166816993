#![forbid(unsafe_code)]

//! XML element abstraction for the Sigtuna digest-transform library.
//!
//! Digest transforms read algorithm configuration from XML and bind their
//! results to XML elements (a `DigestValue` holding base64 text). This crate
//! provides a small owned element model for those two jobs: parse with
//! `roxmltree`, mutate text content in place, serialize back out.

pub mod element;

pub use element::{Element, XmlContent};

/// Return roxmltree parsing options that allow DTD.
///
/// DTD is allowed because roxmltree does not expand external entities or
/// perform entity substitution beyond the five predefined XML entities,
/// so it is safe. Many signed documents in the wild carry DTDs for entity
/// definitions.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}
