#![forbid(unsafe_code)]

//! The digest transform: a chain node that hashes the bytes flowing
//! through it and binds the finalized digest to a `DigestValue` element.
//!
//! One transform instance covers one digest computation. It is driven
//! either through the low-level state machine (`update`/`sign`/`verify`)
//! or through the chain contract (`write`/`read`/`flush`) followed by
//! `sign_node`/`verify_node`.

use std::borrow::Cow;

use base64::Engine;
use sigtuna_core::{algorithm, ns, Error, Result};
use sigtuna_crypto::digest::{constant_time_eq, DigestAlgorithm};
use sigtuna_xml::Element;

use crate::chain::{
    KeyRequirements, Transform, TransformKind, TransformStatus, TransformUsage, Written,
};

/// Capacity of the staging buffer input is chunked through.
pub const STAGING_BUFFER_SIZE: usize = 1024;

// ── Digest method descriptors ────────────────────────────────────────

/// Identity of one digest algorithm as a chain transform.
///
/// One descriptor exists per algorithm for the process lifetime. The table
/// is immutable after registration and may be shared across concurrently
/// running chains without locking.
pub struct DigestMethod {
    pub name: &'static str,
    pub uri: &'static str,
    pub kind: TransformKind,
    pub usage: TransformUsage,
    pub key: KeyRequirements,
}

macro_rules! digest_method {
    ($name:expr, $uri:expr, $key:expr) => {
        DigestMethod {
            name: $name,
            uri: $uri,
            kind: TransformKind::Binary,
            usage: TransformUsage::Any,
            key: $key,
        }
    };
}

/// All registered digest methods.
pub static DIGEST_METHODS: &[DigestMethod] = &[
    digest_method!("sha1", algorithm::SHA1, KeyRequirements::None),
    digest_method!("sha224", algorithm::SHA224, KeyRequirements::None),
    digest_method!("sha256", algorithm::SHA256, KeyRequirements::None),
    digest_method!("sha384", algorithm::SHA384, KeyRequirements::None),
    digest_method!("sha512", algorithm::SHA512, KeyRequirements::None),
    digest_method!("sha3-224", algorithm::SHA3_224, KeyRequirements::None),
    digest_method!("sha3-256", algorithm::SHA3_256, KeyRequirements::None),
    digest_method!("sha3-384", algorithm::SHA3_384, KeyRequirements::None),
    digest_method!("sha3-512", algorithm::SHA3_512, KeyRequirements::None),
    digest_method!("hmac-sha1", algorithm::HMAC_SHA1, KeyRequirements::Symmetric),
    digest_method!("hmac-sha224", algorithm::HMAC_SHA224, KeyRequirements::Symmetric),
    digest_method!("hmac-sha256", algorithm::HMAC_SHA256, KeyRequirements::Symmetric),
    digest_method!("hmac-sha384", algorithm::HMAC_SHA384, KeyRequirements::Symmetric),
    digest_method!("hmac-sha512", algorithm::HMAC_SHA512, KeyRequirements::Symmetric),
];

impl DigestMethod {
    /// Look up a descriptor by algorithm URI.
    pub fn find(uri: &str) -> Result<&'static DigestMethod> {
        DIGEST_METHODS
            .iter()
            .find(|m| m.uri == uri)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("digest transform: {uri}")))
    }

    /// Instantiate a transform for one digest computation.
    pub fn create(&'static self, mode: DigestMode) -> Result<DigestTransform> {
        let allowed = match self.usage {
            TransformUsage::Any => true,
            TransformUsage::Sign => mode == DigestMode::Sign,
            TransformUsage::Verify => mode == DigestMode::Verify,
        };
        if !allowed {
            return Err(Error::Config(format!(
                "{} is not usable for {:?}",
                self.name, mode
            )));
        }
        let algorithm = sigtuna_crypto::digest::from_uri(self.uri)?;
        Ok(DigestTransform::new(self, algorithm, mode))
    }
}

/// Direction of a digest transform: producing a digest value (sign side)
/// or consuming one (verify side).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestMode {
    Sign,
    Verify,
}

// ── Digest transform state ───────────────────────────────────────────

/// Per-use digest state: staging buffer, running hash, finalized digest.
pub struct DigestTransform {
    method: &'static DigestMethod,
    /// Algorithm-private state; taken on finalization.
    algorithm: Option<Box<dyn DigestAlgorithm>>,
    mode: DigestMode,
    status: TransformStatus,
    push_mode: bool,
    closed: bool,
    node_read: bool,
    staging: [u8; STAGING_BUFFER_SIZE],
    staged: usize,
    processed: u64,
    output_bits: Option<usize>,
    last_byte_mask: u8,
    digest: Option<Vec<u8>>,
}

impl DigestTransform {
    fn new(
        method: &'static DigestMethod,
        algorithm: Box<dyn DigestAlgorithm>,
        mode: DigestMode,
    ) -> Self {
        Self {
            method,
            algorithm: Some(algorithm),
            mode,
            status: TransformStatus::Unknown,
            push_mode: false,
            closed: false,
            node_read: false,
            staging: [0u8; STAGING_BUFFER_SIZE],
            staged: 0,
            processed: 0,
            output_bits: None,
            last_byte_mask: 0xFF,
            digest: None,
        }
    }

    /// The descriptor this transform was created from.
    pub fn method(&self) -> &'static DigestMethod {
        self.method
    }

    pub fn mode(&self) -> DigestMode {
        self.mode
    }

    pub fn status(&self) -> TransformStatus {
        self.status
    }

    /// Total bytes fed to the hash so far.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// The finalized digest, once `sign` or `verify` has run.
    pub fn digest_value(&self) -> Option<&[u8]> {
        self.digest.as_deref()
    }

    pub fn push_mode(&self) -> bool {
        self.push_mode
    }

    /// Enable or disable forwarding to the next chain node.
    ///
    /// Legal only before the first byte has flowed; switching mid-stream
    /// is rejected.
    pub fn set_push_mode(&mut self, enabled: bool) -> Result<()> {
        if self.processed > 0 || self.closed {
            return Err(Error::Sequencing(
                "push mode cannot change once data has flowed".into(),
            ));
        }
        self.push_mode = enabled;
        Ok(())
    }

    /// Read algorithm configuration from a `DigestMethod`/`Transform`
    /// element. Callable at most once, before any input.
    ///
    /// Keyed methods accept an `HMACOutputLength` child that truncates the
    /// output to the leftmost N bits; ragged lengths mask the unused low
    /// bits of the final byte out of every comparison.
    pub fn read_node(&mut self, node: &Element) -> Result<()> {
        if self.node_read {
            return Err(Error::Sequencing("configuration already read".into()));
        }
        if self.processed > 0 || self.status != TransformStatus::Unknown {
            return Err(Error::Sequencing(
                "configuration must be read before any input".into(),
            ));
        }
        self.node_read = true;

        let Some(length_node) = node.child(ns::node::HMAC_OUTPUT_LENGTH) else {
            return Ok(());
        };
        if self.method.key != KeyRequirements::Symmetric {
            return Err(Error::Config(format!(
                "{} does not accept {}",
                self.method.name,
                ns::node::HMAC_OUTPUT_LENGTH
            )));
        }
        let text = length_node.text();
        let bits: usize = text
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("invalid {}: {text}", ns::node::HMAC_OUTPUT_LENGTH)))?;

        let full_bits = match &self.algorithm {
            Some(algorithm) => algorithm.output_size() * 8,
            None => return Err(Error::Sequencing("digest already finalized".into())),
        };
        if bits == 0 || bits > full_bits {
            return Err(Error::Config(format!(
                "output length {bits} out of range for {}",
                self.method.name
            )));
        }
        // Truncation floor: refuse outputs shorter than half the digest.
        if bits < full_bits / 2 {
            return Err(Error::Config(format!(
                "output length {bits} below minimum {} for {}",
                full_bits / 2,
                self.method.name
            )));
        }
        self.output_bits = Some(bits);
        let ragged = bits % 8;
        self.last_byte_mask = if ragged == 0 { 0xFF } else { 0xFFu8 << (8 - ragged) };
        Ok(())
    }

    /// Feed bytes to the running hash.
    ///
    /// Input is chunked through the fixed staging buffer, so memory use is
    /// bounded by its capacity however long the stream is.
    pub fn update(&mut self, data: &[u8]) -> Result<()> {
        if self.status != TransformStatus::Unknown {
            return Err(Error::Sequencing("digest update after finalization".into()));
        }
        let algorithm = self
            .algorithm
            .as_mut()
            .ok_or_else(|| Error::Sequencing("digest update after finalization".into()))?;
        for chunk in data.chunks(STAGING_BUFFER_SIZE) {
            self.staging[..chunk.len()].copy_from_slice(chunk);
            self.staged = chunk.len();
            algorithm.update(&self.staging[..self.staged])?;
            self.staged = 0;
            self.processed += chunk.len() as u64;
        }
        Ok(())
    }

    fn take_algorithm(&mut self) -> Result<Box<dyn DigestAlgorithm>> {
        if self.status != TransformStatus::Unknown {
            return Err(Error::Sequencing("digest already finalized".into()));
        }
        self.algorithm
            .take()
            .ok_or_else(|| Error::Sequencing("digest already finalized".into()))
    }

    fn truncate_and_mask(&self, mut digest: Vec<u8>) -> Vec<u8> {
        if let Some(bits) = self.output_bits {
            digest.truncate((bits + 7) / 8);
        }
        if let Some(last) = digest.last_mut() {
            *last &= self.last_byte_mask;
        }
        digest
    }

    /// Finalize the hash and return an independent copy of the digest.
    ///
    /// No further `update` is permitted; a second `sign` fails.
    pub fn sign(&mut self) -> Result<Vec<u8>> {
        let algorithm = self.take_algorithm()?;
        let digest = self.truncate_and_mask(algorithm.finalize()?);
        self.status = TransformStatus::Succeeded;
        self.digest = Some(digest.clone());
        Ok(digest)
    }

    /// Finalize the hash and compare it against `expected`.
    ///
    /// The last-byte mask is applied to both sides before the comparison.
    /// A mismatch is reported through the returned status, never as an
    /// error; a length mismatch fails immediately.
    pub fn verify(&mut self, expected: &[u8]) -> Result<TransformStatus> {
        let algorithm = self.take_algorithm()?;
        let computed = self.truncate_and_mask(algorithm.finalize()?);
        self.status = if expected.len() != computed.len() {
            TransformStatus::Failed
        } else {
            let mut expected = expected.to_vec();
            if let Some(last) = expected.last_mut() {
                *last &= self.last_byte_mask;
            }
            if constant_time_eq(&computed, &expected) {
                TransformStatus::Succeeded
            } else {
                TransformStatus::Failed
            }
        };
        self.digest = Some(computed);
        Ok(self.status)
    }

    // ── Node binding ─────────────────────────────────────────────────

    /// Finalize and write the base64 digest as the element's text content.
    ///
    /// With `remove_old_content` the element is emptied first; otherwise
    /// the digest text is appended after the existing content.
    pub fn sign_node(&mut self, node: &mut Element, remove_old_content: bool) -> Result<()> {
        if self.mode != DigestMode::Sign {
            return Err(Error::Sequencing(
                "sign_node on a verifying digest transform".into(),
            ));
        }
        Transform::flush(self)?;
        let digest = self.sign()?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&digest);
        if remove_old_content {
            node.remove_content();
        }
        node.append_text(&encoded);
        Ok(())
    }

    /// Finalize and compare against the element's base64 text content.
    ///
    /// The element is not mutated. Malformed base64 is a decoding error;
    /// a digest mismatch is the `Failed` status.
    pub fn verify_node(&mut self, node: &Element) -> Result<TransformStatus> {
        if self.mode != DigestMode::Verify {
            return Err(Error::Sequencing(
                "verify_node on a signing digest transform".into(),
            ));
        }
        let text = node.text();
        let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let expected = base64::engine::general_purpose::STANDARD
            .decode(cleaned.as_bytes())
            .map_err(|e| Error::Base64(format!("{}: {e}", ns::node::DIGEST_VALUE)))?;
        Transform::flush(self)?;
        self.verify(&expected)
    }
}

// ── Chain contract ───────────────────────────────────────────────────

impl Transform for DigestTransform {
    fn uri(&self) -> &'static str {
        self.method.uri
    }

    fn kind(&self) -> TransformKind {
        self.method.kind
    }

    fn key_requirements(&self) -> KeyRequirements {
        self.method.key
    }

    fn set_key(&mut self, key: &[u8]) -> Result<()> {
        match self.algorithm.as_mut() {
            Some(algorithm) => algorithm.set_key(key),
            None => Err(Error::Sequencing("set_key after finalization".into())),
        }
    }

    fn write<'a>(&mut self, data: &'a [u8]) -> Result<Written<'a>> {
        if self.closed {
            return Err(Error::Channel("write after flush".into()));
        }
        if data.is_empty() {
            return Ok(Written::Consumed);
        }
        self.update(data)?;
        if self.push_mode {
            Ok(Written::Forward(Cow::Borrowed(data)))
        } else {
            Ok(Written::Consumed)
        }
    }

    fn read(&mut self, upstream: Vec<u8>, _max: usize) -> Result<Vec<u8>> {
        if self.closed {
            return Err(Error::Channel("read after flush".into()));
        }
        if !upstream.is_empty() {
            self.update(&upstream)?;
        }
        Ok(upstream)
    }

    fn flush(&mut self) -> Result<bool> {
        self.closed = true;
        Ok(self.push_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::TransformChain;
    use crate::memory::{MemoryBuffer, MemorySource};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn sha256_transform(mode: DigestMode) -> DigestTransform {
        DigestMethod::find(algorithm::SHA256).unwrap().create(mode).unwrap()
    }

    #[test]
    fn test_descriptor_lookup() {
        let method = DigestMethod::find(algorithm::SHA256).unwrap();
        assert_eq!(method.name, "sha256");
        assert_eq!(method.kind, TransformKind::Binary);
        assert!(matches!(
            DigestMethod::find("urn:nosuch"),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_known_digest_sha1_abc() {
        let mut transform = DigestMethod::find(algorithm::SHA1)
            .unwrap()
            .create(DigestMode::Sign)
            .unwrap();
        transform.update(b"abc").unwrap();
        let digest = transform.sign().unwrap();
        assert_eq!(hex(&digest), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_known_digest_sha256_abc() {
        let mut transform = sha256_transform(DigestMode::Sign);
        transform.update(b"abc").unwrap();
        let digest = transform.sign().unwrap();
        assert_eq!(
            hex(&digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_chunk_invariance() {
        let data: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
        let mut whole = sha256_transform(DigestMode::Sign);
        whole.update(&data).unwrap();
        let reference = whole.sign().unwrap();

        for chunk_size in [1, 7, 64, STAGING_BUFFER_SIZE, 1500, 2999] {
            let mut split = sha256_transform(DigestMode::Sign);
            for chunk in data.chunks(chunk_size) {
                split.update(chunk).unwrap();
            }
            assert_eq!(split.sign().unwrap(), reference, "chunk size {chunk_size}");
            assert_eq!(split.processed(), data.len() as u64);
        }
    }

    #[test]
    fn test_update_after_sign_fails() {
        let mut transform = sha256_transform(DigestMode::Sign);
        transform.update(b"abc").unwrap();
        transform.sign().unwrap();
        assert!(matches!(
            transform.update(b"more"),
            Err(Error::Sequencing(_))
        ));
    }

    #[test]
    fn test_sign_twice_fails() {
        let mut transform = sha256_transform(DigestMode::Sign);
        transform.update(b"abc").unwrap();
        transform.sign().unwrap();
        assert!(matches!(transform.sign(), Err(Error::Sequencing(_))));
    }

    #[test]
    fn test_verify_success() {
        let expected = sigtuna_crypto::digest::digest(algorithm::SHA256, b"abc").unwrap();
        let mut transform = sha256_transform(DigestMode::Verify);
        transform.update(b"abc").unwrap();
        assert_eq!(
            transform.verify(&expected).unwrap(),
            TransformStatus::Succeeded
        );
        assert_eq!(transform.status(), TransformStatus::Succeeded);
        assert_eq!(transform.digest_value(), Some(expected.as_slice()));
    }

    #[test]
    fn test_verify_any_bit_flip_fails_without_error() {
        let expected = sigtuna_crypto::digest::digest(algorithm::SHA256, b"abc").unwrap();
        for bit in 0..expected.len() * 8 {
            let mut flipped = expected.clone();
            flipped[bit / 8] ^= 1 << (bit % 8);
            let mut transform = sha256_transform(DigestMode::Verify);
            transform.update(b"abc").unwrap();
            assert_eq!(
                transform.verify(&flipped).unwrap(),
                TransformStatus::Failed,
                "bit {bit}"
            );
        }
    }

    #[test]
    fn test_verify_length_mismatch_fails() {
        let expected = sigtuna_crypto::digest::digest(algorithm::SHA256, b"abc").unwrap();
        let mut transform = sha256_transform(DigestMode::Verify);
        transform.update(b"abc").unwrap();
        assert_eq!(
            transform.verify(&expected[..31]).unwrap(),
            TransformStatus::Failed
        );
    }

    #[test]
    fn test_push_mode_forwards_bytes_downstream() {
        let digest = Rc::new(RefCell::new(sha256_transform(DigestMode::Sign)));
        digest.borrow_mut().set_push_mode(true).unwrap();
        let sink = Rc::new(RefCell::new(MemoryBuffer::new()));

        let mut chain = TransformChain::new();
        chain.push_shared(digest.clone());
        chain.push_shared(sink.clone());

        chain.push_bytes(b"hello ").unwrap();
        chain.push_bytes(b"world").unwrap();
        chain.flush().unwrap();

        assert_eq!(sink.borrow().bytes(), b"hello world");
        let signed = digest.borrow_mut().sign().unwrap();
        let expected = sigtuna_crypto::digest::digest(algorithm::SHA256, b"hello world").unwrap();
        assert_eq!(signed, expected);
    }

    #[test]
    fn test_without_push_mode_downstream_sees_nothing() {
        let digest = Rc::new(RefCell::new(sha256_transform(DigestMode::Sign)));
        let sink = Rc::new(RefCell::new(MemoryBuffer::new()));

        let mut chain = TransformChain::new();
        chain.push_shared(digest.clone());
        chain.push_shared(sink.clone());

        chain.push_bytes(b"hello world").unwrap();
        assert!(sink.borrow().is_empty());
        assert_eq!(digest.borrow().processed(), 11);
    }

    #[test]
    fn test_ten_thousand_single_byte_writes() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 256) as u8).collect();
        let digest = Rc::new(RefCell::new(sha256_transform(DigestMode::Sign)));
        digest.borrow_mut().set_push_mode(true).unwrap();
        let sink = Rc::new(RefCell::new(MemoryBuffer::new()));

        let mut chain = TransformChain::new();
        chain.push_shared(digest.clone());
        chain.push_shared(sink.clone());

        for byte in &data {
            chain.push_bytes(std::slice::from_ref(byte)).unwrap();
        }
        chain.flush().unwrap();

        assert_eq!(sink.borrow().bytes(), data.as_slice());
        let signed = digest.borrow_mut().sign().unwrap();
        let expected = sigtuna_crypto::digest::digest(algorithm::SHA256, &data).unwrap();
        assert_eq!(signed, expected);
    }

    #[test]
    fn test_pull_driven_chain_digests_what_flows_through() {
        let data: Vec<u8> = (0..2500u32).map(|i| (i % 101) as u8).collect();
        let digest = Rc::new(RefCell::new(sha256_transform(DigestMode::Sign)));

        let mut chain = TransformChain::new();
        chain.push_owned(Box::new(MemorySource::new(data.clone())));
        chain.push_shared(digest.clone());

        let mut pulled = Vec::new();
        loop {
            let chunk = chain.pull_bytes(256).unwrap();
            if chunk.is_empty() {
                break;
            }
            pulled.extend_from_slice(&chunk);
        }
        assert_eq!(pulled, data);

        let signed = digest.borrow_mut().sign().unwrap();
        let expected = sigtuna_crypto::digest::digest(algorithm::SHA256, &data).unwrap();
        assert_eq!(signed, expected);
    }

    #[test]
    fn test_zero_length_write_is_noop() {
        let mut transform = sha256_transform(DigestMode::Sign);
        assert!(matches!(
            Transform::write(&mut transform, b"").unwrap(),
            Written::Consumed
        ));
        assert_eq!(transform.processed(), 0);
    }

    #[test]
    fn test_io_after_flush_fails() {
        let mut transform = sha256_transform(DigestMode::Sign);
        Transform::flush(&mut transform).unwrap();
        assert!(matches!(
            Transform::write(&mut transform, b"x"),
            Err(Error::Channel(_))
        ));
        assert!(matches!(
            Transform::read(&mut transform, b"x".to_vec(), 16),
            Err(Error::Channel(_))
        ));
        // A second flush stays a no-op.
        Transform::flush(&mut transform).unwrap();
    }

    #[test]
    fn test_set_push_mode_rejected_mid_stream() {
        let mut transform = sha256_transform(DigestMode::Sign);
        transform.set_push_mode(true).unwrap();
        Transform::write(&mut transform, b"data").unwrap();
        assert!(matches!(
            transform.set_push_mode(false),
            Err(Error::Sequencing(_))
        ));

        let mut flushed = sha256_transform(DigestMode::Sign);
        Transform::flush(&mut flushed).unwrap();
        assert!(matches!(
            flushed.set_push_mode(true),
            Err(Error::Sequencing(_))
        ));
    }

    fn hmac_sha256_config(bits: u32) -> Element {
        Element::parse(&format!(
            "<DigestMethod Algorithm=\"{}\"><HMACOutputLength>{bits}</HMACOutputLength></DigestMethod>",
            algorithm::HMAC_SHA256
        ))
        .unwrap()
    }

    fn full_hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
        use hmac::{Hmac, Mac};
        let mut mac = <Hmac<sha2::Sha256>>::new_from_slice(key).unwrap();
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }

    #[test]
    fn test_truncated_hmac_masks_ragged_bits_on_both_sides() {
        // 132 bits: 17 bytes, 4 ragged bits, mask 0xF0 on the last byte.
        let key = b"test-hmac-key";
        let data = b"the quick brown fox";
        let mut expected = full_hmac_sha256(key, data);
        expected.truncate(17);

        // Low bits of the last byte differ: masked out, still a match.
        let mut low_bits_differ = expected.clone();
        low_bits_differ[16] ^= 0x07;
        let mut transform = DigestMethod::find(algorithm::HMAC_SHA256)
            .unwrap()
            .create(DigestMode::Verify)
            .unwrap();
        transform.read_node(&hmac_sha256_config(132)).unwrap();
        Transform::set_key(&mut transform, key).unwrap();
        transform.update(data).unwrap();
        assert_eq!(
            transform.verify(&low_bits_differ).unwrap(),
            TransformStatus::Succeeded
        );

        // A covered bit differs: mismatch.
        let mut covered_bit_differs = expected.clone();
        covered_bit_differs[16] ^= 0x80;
        let mut transform = DigestMethod::find(algorithm::HMAC_SHA256)
            .unwrap()
            .create(DigestMode::Verify)
            .unwrap();
        transform.read_node(&hmac_sha256_config(132)).unwrap();
        Transform::set_key(&mut transform, key).unwrap();
        transform.update(data).unwrap();
        assert_eq!(
            transform.verify(&covered_bit_differs).unwrap(),
            TransformStatus::Failed
        );
    }

    #[test]
    fn test_truncated_hmac_sign_applies_same_mask() {
        let key = b"test-hmac-key";
        let data = b"the quick brown fox";
        let mut transform = DigestMethod::find(algorithm::HMAC_SHA256)
            .unwrap()
            .create(DigestMode::Sign)
            .unwrap();
        transform.read_node(&hmac_sha256_config(132)).unwrap();
        Transform::set_key(&mut transform, key).unwrap();
        transform.update(data).unwrap();
        let signed = transform.sign().unwrap();

        let mut expected = full_hmac_sha256(key, data);
        expected.truncate(17);
        expected[16] &= 0xF0;
        assert_eq!(signed, expected);
    }

    #[test]
    fn test_read_node_rejects_bad_lengths() {
        for bits in [0u32, 300, 120] {
            let mut transform = DigestMethod::find(algorithm::HMAC_SHA256)
                .unwrap()
                .create(DigestMode::Sign)
                .unwrap();
            assert!(
                matches!(
                    transform.read_node(&hmac_sha256_config(bits)),
                    Err(Error::Config(_))
                ),
                "bits {bits}"
            );
        }
    }

    #[test]
    fn test_read_node_rejects_garbage_length() {
        let node = Element::parse(
            "<DigestMethod><HMACOutputLength>many</HMACOutputLength></DigestMethod>",
        )
        .unwrap();
        let mut transform = DigestMethod::find(algorithm::HMAC_SHA256)
            .unwrap()
            .create(DigestMode::Sign)
            .unwrap();
        assert!(matches!(transform.read_node(&node), Err(Error::Config(_))));
    }

    #[test]
    fn test_read_node_rejects_truncation_on_keyless_method() {
        let node = Element::parse(
            "<DigestMethod><HMACOutputLength>160</HMACOutputLength></DigestMethod>",
        )
        .unwrap();
        let mut transform = sha256_transform(DigestMode::Sign);
        assert!(matches!(transform.read_node(&node), Err(Error::Config(_))));
    }

    #[test]
    fn test_read_node_sequencing() {
        let empty = Element::new("DigestMethod");
        let mut transform = sha256_transform(DigestMode::Sign);
        transform.read_node(&empty).unwrap();
        assert!(matches!(
            transform.read_node(&empty),
            Err(Error::Sequencing(_))
        ));

        let mut late = sha256_transform(DigestMode::Sign);
        late.update(b"abc").unwrap();
        assert!(matches!(late.read_node(&empty), Err(Error::Sequencing(_))));
    }

    #[test]
    fn test_sign_node_appends_after_existing_content() {
        let mut transform = sha256_transform(DigestMode::Sign);
        transform.update(b"abc").unwrap();
        let mut node = Element::new(ns::node::DIGEST_VALUE);
        node.append_text("X");
        transform.sign_node(&mut node, false).unwrap();

        let digest = sigtuna_crypto::digest::digest(algorithm::SHA256, b"abc").unwrap();
        let encoded = base64::engine::general_purpose::STANDARD.encode(&digest);
        assert_eq!(node.text(), format!("X{encoded}"));
    }

    #[test]
    fn test_sign_node_replaces_existing_content() {
        let mut transform = sha256_transform(DigestMode::Sign);
        transform.update(b"abc").unwrap();
        let mut node = Element::new(ns::node::DIGEST_VALUE);
        node.append_text("stale");
        transform.sign_node(&mut node, true).unwrap();

        let digest = sigtuna_crypto::digest::digest(algorithm::SHA256, b"abc").unwrap();
        let encoded = base64::engine::general_purpose::STANDARD.encode(&digest);
        assert_eq!(node.text(), encoded);
    }

    #[test]
    fn test_sign_node_then_verify_node_round_trip() {
        let mut signer = sha256_transform(DigestMode::Sign);
        signer.update(b"document bytes").unwrap();
        let mut node = Element::new(ns::node::DIGEST_VALUE);
        signer.sign_node(&mut node, true).unwrap();

        let mut verifier = sha256_transform(DigestMode::Verify);
        verifier.update(b"document bytes").unwrap();
        assert_eq!(
            verifier.verify_node(&node).unwrap(),
            TransformStatus::Succeeded
        );
    }

    #[test]
    fn test_verify_node_altered_character_fails_and_leaves_node_alone() {
        let digest = sigtuna_crypto::digest::digest(algorithm::SHA256, b"abc").unwrap();
        let mut encoded = base64::engine::general_purpose::STANDARD.encode(&digest);
        let altered = if encoded.starts_with('A') { "B" } else { "A" };
        encoded.replace_range(0..1, altered);

        let mut node = Element::new(ns::node::DIGEST_VALUE);
        node.set_text(&encoded);
        let before = node.text();

        let mut transform = sha256_transform(DigestMode::Verify);
        transform.update(b"abc").unwrap();
        assert_eq!(
            transform.verify_node(&node).unwrap(),
            TransformStatus::Failed
        );
        assert_eq!(node.text(), before);
    }

    #[test]
    fn test_verify_node_malformed_base64_is_decoding_error() {
        let mut node = Element::new(ns::node::DIGEST_VALUE);
        node.set_text("!!! not base64 !!!");
        let mut transform = sha256_transform(DigestMode::Verify);
        transform.update(b"abc").unwrap();
        assert!(matches!(
            transform.verify_node(&node),
            Err(Error::Base64(_))
        ));
    }

    #[test]
    fn test_verify_node_skips_embedded_whitespace() {
        let digest = sigtuna_crypto::digest::digest(algorithm::SHA256, b"abc").unwrap();
        let encoded = base64::engine::general_purpose::STANDARD.encode(&digest);
        let (head, tail) = encoded.split_at(10);
        let mut node = Element::new(ns::node::DIGEST_VALUE);
        node.set_text(&format!("  {head}\n  {tail}\n"));

        let mut transform = sha256_transform(DigestMode::Verify);
        transform.update(b"abc").unwrap();
        assert_eq!(
            transform.verify_node(&node).unwrap(),
            TransformStatus::Succeeded
        );
    }

    #[test]
    fn test_node_binding_enforces_direction() {
        let mut node = Element::new(ns::node::DIGEST_VALUE);
        let mut verifier = sha256_transform(DigestMode::Verify);
        assert!(matches!(
            verifier.sign_node(&mut node, true),
            Err(Error::Sequencing(_))
        ));

        node.set_text("AAAA");
        let mut signer = sha256_transform(DigestMode::Sign);
        assert!(matches!(
            signer.verify_node(&node),
            Err(Error::Sequencing(_))
        ));
    }

    #[test]
    fn test_shared_digest_survives_chain_teardown() {
        let digest = Rc::new(RefCell::new(sha256_transform(DigestMode::Sign)));
        let mut chain = TransformChain::new();
        chain.push_shared(digest.clone());
        chain.push_bytes(b"abc").unwrap();
        drop(chain);

        let signed = digest.borrow_mut().sign().unwrap();
        let expected = sigtuna_crypto::digest::digest(algorithm::SHA256, b"abc").unwrap();
        assert_eq!(signed, expected);
    }

    #[test]
    fn test_hmac_update_without_key_is_key_error() {
        let mut transform = DigestMethod::find(algorithm::HMAC_SHA256)
            .unwrap()
            .create(DigestMode::Sign)
            .unwrap();
        assert_eq!(transform.key_requirements(), KeyRequirements::Symmetric);
        assert!(matches!(transform.update(b"data"), Err(Error::Key(_))));
    }
}
