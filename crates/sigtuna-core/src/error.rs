#![forbid(unsafe_code)]

/// Errors produced by the Sigtuna digest-transform library.
///
/// A digest mismatch is not an error: it is reported through the transform
/// status. These variants cover structural failures that abort an operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("invalid algorithm configuration: {0}")]
    Config(String),

    #[error("operation out of sequence: {0}")]
    Sequencing(String),

    #[error("chain channel error: {0}")]
    Channel(String),

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
