#![forbid(unsafe_code)]

//! In-memory chain nodes: a head node serving a held buffer to pull-driven
//! chains, and a tee node that records the bytes flowing through it.

use std::borrow::Cow;

use sigtuna_core::{Error, Result};

use crate::chain::{Transform, TransformKind, Written};

/// Head node for pull-driven chains: serves slices of a held buffer.
pub struct MemorySource {
    data: Vec<u8>,
    position: usize,
    closed: bool,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            position: 0,
            closed: false,
        }
    }

    /// Bytes not yet served.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }
}

impl Transform for MemorySource {
    fn uri(&self) -> &'static str {
        "urn:sigtuna:memory-source"
    }

    fn kind(&self) -> TransformKind {
        TransformKind::Binary
    }

    fn write<'a>(&mut self, data: &'a [u8]) -> Result<Written<'a>> {
        if self.closed {
            return Err(Error::Channel("write after flush".into()));
        }
        // In a push-driven chain a source is a plain relay.
        Ok(Written::Forward(Cow::Borrowed(data)))
    }

    fn read(&mut self, _upstream: Vec<u8>, max: usize) -> Result<Vec<u8>> {
        if self.closed {
            return Err(Error::Channel("read after flush".into()));
        }
        let take = max.min(self.remaining());
        let chunk = self.data[self.position..self.position + take].to_vec();
        self.position += take;
        Ok(chunk)
    }

    fn flush(&mut self) -> Result<bool> {
        self.closed = true;
        Ok(true)
    }
}

/// Tee node: records everything that flows through it, then forwards it
/// unchanged.
pub struct MemoryBuffer {
    data: Vec<u8>,
    closed: bool,
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            closed: false,
        }
    }

    /// The bytes observed so far.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Take the observed bytes, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for MemoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for MemoryBuffer {
    fn uri(&self) -> &'static str {
        "urn:sigtuna:memory-buffer"
    }

    fn kind(&self) -> TransformKind {
        TransformKind::Binary
    }

    fn write<'a>(&mut self, data: &'a [u8]) -> Result<Written<'a>> {
        if self.closed {
            return Err(Error::Channel("write after flush".into()));
        }
        if data.is_empty() {
            return Ok(Written::Consumed);
        }
        self.data.extend_from_slice(data);
        Ok(Written::Forward(Cow::Borrowed(data)))
    }

    fn read(&mut self, upstream: Vec<u8>, _max: usize) -> Result<Vec<u8>> {
        if self.closed {
            return Err(Error::Channel("read after flush".into()));
        }
        self.data.extend_from_slice(&upstream);
        Ok(upstream)
    }

    fn flush(&mut self) -> Result<bool> {
        self.closed = true;
        Ok(true)
    }
}
