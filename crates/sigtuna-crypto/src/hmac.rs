#![forbid(unsafe_code)]

//! Streaming HMAC implementations of the digest contract.
//!
//! The algorithms here produce the full-length MAC; output truncation is
//! handled by the digest transform.

use hmac::{Hmac, Mac};
use sigtuna_core::Error;

use crate::digest::DigestAlgorithm;

#[derive(Debug, Clone, Copy)]
pub(crate) enum HashType {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl HashType {
    fn output_size(self) -> usize {
        match self {
            HashType::Sha1 => 20,
            HashType::Sha224 => 28,
            HashType::Sha256 => 32,
            HashType::Sha384 => 48,
            HashType::Sha512 => 64,
        }
    }
}

enum HmacInner {
    Sha1(Hmac<sha1::Sha1>),
    Sha224(Hmac<sha2::Sha224>),
    Sha256(Hmac<sha2::Sha256>),
    Sha384(Hmac<sha2::Sha384>),
    Sha512(Hmac<sha2::Sha512>),
}

macro_rules! with_mac {
    ($inner:expr, $mac:ident => $body:expr) => {
        match $inner {
            HmacInner::Sha1($mac) => $body,
            HmacInner::Sha224($mac) => $body,
            HmacInner::Sha256($mac) => $body,
            HmacInner::Sha384($mac) => $body,
            HmacInner::Sha512($mac) => $body,
        }
    };
}

/// A keyed digest. The key must be bound before any data is absorbed.
pub(crate) struct HmacDigest {
    uri: &'static str,
    hash: HashType,
    key: Option<Vec<u8>>,
    mac: Option<HmacInner>,
}

impl HmacDigest {
    pub(crate) fn new(uri: &'static str, hash: HashType) -> Self {
        Self {
            uri,
            hash,
            key: None,
            mac: None,
        }
    }

    fn build_mac(hash: HashType, key: &[u8]) -> Result<HmacInner, Error> {
        macro_rules! keyed {
            ($variant:ident, $hasher:ty) => {
                <Hmac<$hasher>>::new_from_slice(key)
                    .map(HmacInner::$variant)
                    .map_err(|e| Error::Key(format!("HMAC key: {e}")))
            };
        }
        match hash {
            HashType::Sha1 => keyed!(Sha1, sha1::Sha1),
            HashType::Sha224 => keyed!(Sha224, sha2::Sha224),
            HashType::Sha256 => keyed!(Sha256, sha2::Sha256),
            HashType::Sha384 => keyed!(Sha384, sha2::Sha384),
            HashType::Sha512 => keyed!(Sha512, sha2::Sha512),
        }
    }
}

impl DigestAlgorithm for HmacDigest {
    fn uri(&self) -> &'static str {
        self.uri
    }

    fn output_size(&self) -> usize {
        self.hash.output_size()
    }

    fn needs_key(&self) -> bool {
        true
    }

    fn set_key(&mut self, key: &[u8]) -> Result<(), Error> {
        if self.mac.is_some() {
            return Err(Error::Key("HMAC key already set".into()));
        }
        self.mac = Some(Self::build_mac(self.hash, key)?);
        self.key = Some(key.to_vec());
        Ok(())
    }

    fn reset(&mut self) -> Result<(), Error> {
        match &self.key {
            Some(key) => {
                self.mac = Some(Self::build_mac(self.hash, key)?);
                Ok(())
            }
            None => Err(Error::Key("HMAC key not set".into())),
        }
    }

    fn update(&mut self, data: &[u8]) -> Result<(), Error> {
        match &mut self.mac {
            Some(inner) => {
                with_mac!(inner, mac => mac.update(data));
                Ok(())
            }
            None => Err(Error::Key("HMAC key not set".into())),
        }
    }

    fn finalize(self: Box<Self>) -> Result<Vec<u8>, Error> {
        match self.mac {
            Some(inner) => Ok(with_mac!(inner, mac => mac.finalize().into_bytes().to_vec())),
            None => Err(Error::Key("HMAC key not set".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::from_uri;
    use sigtuna_core::algorithm;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn test_hmac_sha256_rfc4231_case1() {
        let mut mac = from_uri(algorithm::HMAC_SHA256).unwrap();
        assert!(mac.needs_key());
        mac.set_key(&[0x0b; 20]).unwrap();
        mac.update(b"Hi There").unwrap();
        let out = mac.finalize().unwrap();
        assert_eq!(
            hex(&out),
            "b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7"
        );
    }

    #[test]
    fn test_hmac_sha1_rfc2202_case1() {
        let mut mac = from_uri(algorithm::HMAC_SHA1).unwrap();
        mac.set_key(&[0x0b; 20]).unwrap();
        mac.update(b"Hi There").unwrap();
        let out = mac.finalize().unwrap();
        assert_eq!(hex(&out), "b617318655057264e28bc0b6fb378c8ef146be00");
    }

    #[test]
    fn test_update_without_key_fails() {
        let mut mac = from_uri(algorithm::HMAC_SHA256).unwrap();
        assert!(matches!(mac.update(b"data"), Err(Error::Key(_))));
    }

    #[test]
    fn test_set_key_twice_fails() {
        let mut mac = from_uri(algorithm::HMAC_SHA256).unwrap();
        mac.set_key(b"secret").unwrap();
        assert!(matches!(mac.set_key(b"other"), Err(Error::Key(_))));
    }

    #[test]
    fn test_reset_reuses_key() {
        let mut mac = from_uri(algorithm::HMAC_SHA256).unwrap();
        mac.set_key(&[0x0b; 20]).unwrap();
        mac.update(b"wrong data").unwrap();
        mac.reset().unwrap();
        mac.update(b"Hi There").unwrap();
        let out = mac.finalize().unwrap();
        assert_eq!(
            hex(&out),
            "b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7"
        );
    }
}
