#![forbid(unsafe_code)]

//! Digest (hash) algorithm implementations.

use crate::hmac::{HashType, HmacDigest};
use digest::Digest;
use sigtuna_core::{algorithm, Error};

/// Trait for streaming digest algorithms.
///
/// One instance holds the running state for a single digest computation.
/// Keyless hashes accept `set_key` as a trivial success; keyed variants
/// (HMAC) must have a key bound before any data is absorbed.
pub trait DigestAlgorithm: Send {
    /// Algorithm URI.
    fn uri(&self) -> &'static str;
    /// Size of the finalized digest in bytes.
    fn output_size(&self) -> usize;
    /// Whether the algorithm needs a key before absorbing data.
    fn needs_key(&self) -> bool {
        false
    }
    /// Bind key material. A no-op success for keyless digests.
    fn set_key(&mut self, _key: &[u8]) -> Result<(), Error> {
        Ok(())
    }
    /// Discard absorbed data and return to the initial state.
    fn reset(&mut self) -> Result<(), Error>;
    /// Feed data into the hash.
    fn update(&mut self, data: &[u8]) -> Result<(), Error>;
    /// Finalize and return the digest value.
    fn finalize(self: Box<Self>) -> Result<Vec<u8>, Error>;
}

/// Create a digest algorithm from its URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn DigestAlgorithm>, Error> {
    match uri {
        algorithm::SHA1 => Ok(Box::new(Sha1Digest::new())),
        algorithm::SHA224 => Ok(Box::new(Sha224Digest::new())),
        algorithm::SHA256 => Ok(Box::new(Sha256Digest::new())),
        algorithm::SHA384 => Ok(Box::new(Sha384Digest::new())),
        algorithm::SHA512 => Ok(Box::new(Sha512Digest::new())),
        algorithm::SHA3_224 => Ok(Box::new(Sha3_224Digest::new())),
        algorithm::SHA3_256 => Ok(Box::new(Sha3_256Digest::new())),
        algorithm::SHA3_384 => Ok(Box::new(Sha3_384Digest::new())),
        algorithm::SHA3_512 => Ok(Box::new(Sha3_512Digest::new())),
        algorithm::HMAC_SHA1 => Ok(Box::new(HmacDigest::new(algorithm::HMAC_SHA1, HashType::Sha1))),
        algorithm::HMAC_SHA224 => {
            Ok(Box::new(HmacDigest::new(algorithm::HMAC_SHA224, HashType::Sha224)))
        }
        algorithm::HMAC_SHA256 => {
            Ok(Box::new(HmacDigest::new(algorithm::HMAC_SHA256, HashType::Sha256)))
        }
        algorithm::HMAC_SHA384 => {
            Ok(Box::new(HmacDigest::new(algorithm::HMAC_SHA384, HashType::Sha384)))
        }
        algorithm::HMAC_SHA512 => {
            Ok(Box::new(HmacDigest::new(algorithm::HMAC_SHA512, HashType::Sha512)))
        }
        #[cfg(feature = "legacy-algorithms")]
        algorithm::MD5 => Ok(Box::new(Md5Digest::new())),
        #[cfg(feature = "legacy-algorithms")]
        algorithm::RIPEMD160 => Ok(Box::new(Ripemd160Digest::new())),
        _ => Err(Error::UnsupportedAlgorithm(format!(
            "digest algorithm: {uri}"
        ))),
    }
}

/// Compute a keyless digest in one shot.
pub fn digest(uri: &str, data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut hasher = from_uri(uri)?;
    hasher.update(data)?;
    hasher.finalize()
}

// ── Concrete implementations ─────────────────────────────────────────

macro_rules! impl_digest {
    ($name:ident, $hasher:ty, $uri:expr) => {
        struct $name {
            inner: $hasher,
        }

        impl $name {
            fn new() -> Self {
                Self {
                    inner: <$hasher>::new(),
                }
            }
        }

        impl DigestAlgorithm for $name {
            fn uri(&self) -> &'static str {
                $uri
            }

            fn output_size(&self) -> usize {
                <$hasher as Digest>::output_size()
            }

            fn reset(&mut self) -> Result<(), Error> {
                Digest::reset(&mut self.inner);
                Ok(())
            }

            fn update(&mut self, data: &[u8]) -> Result<(), Error> {
                Digest::update(&mut self.inner, data);
                Ok(())
            }

            fn finalize(self: Box<Self>) -> Result<Vec<u8>, Error> {
                Ok(Digest::finalize(self.inner).to_vec())
            }
        }
    };
}

impl_digest!(Sha1Digest, sha1::Sha1, algorithm::SHA1);
impl_digest!(Sha224Digest, sha2::Sha224, algorithm::SHA224);
impl_digest!(Sha256Digest, sha2::Sha256, algorithm::SHA256);
impl_digest!(Sha384Digest, sha2::Sha384, algorithm::SHA384);
impl_digest!(Sha512Digest, sha2::Sha512, algorithm::SHA512);
impl_digest!(Sha3_224Digest, sha3::Sha3_224, algorithm::SHA3_224);
impl_digest!(Sha3_256Digest, sha3::Sha3_256, algorithm::SHA3_256);
impl_digest!(Sha3_384Digest, sha3::Sha3_384, algorithm::SHA3_384);
impl_digest!(Sha3_512Digest, sha3::Sha3_512, algorithm::SHA3_512);

#[cfg(feature = "legacy-algorithms")]
impl_digest!(Md5Digest, md5::Md5, algorithm::MD5);

#[cfg(feature = "legacy-algorithms")]
impl_digest!(Ripemd160Digest, ripemd::Ripemd160, algorithm::RIPEMD160);

/// Constant-time byte comparison for equal-length digests.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
