#![forbid(unsafe_code)]

//! Core types for the Sigtuna digest-transform library.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};
