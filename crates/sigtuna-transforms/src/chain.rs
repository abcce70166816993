#![forbid(unsafe_code)]

//! Transform chain: trait definitions and the owning container.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use sigtuna_core::{Error, Result};

/// How a transform processes data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    /// Operates on raw bytes.
    Binary,
    /// Operates on XML node sets.
    Xml,
    /// Canonicalization-aware.
    C14n,
}

/// Which side of a signature operation a transform may serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformUsage {
    Sign,
    Verify,
    Any,
}

/// Key material a transform needs before it can process data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRequirements {
    None,
    Symmetric,
}

/// Result status of a transform.
///
/// Transitions only `Unknown` → `Succeeded` or `Unknown` → `Failed`;
/// a terminal status is never reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformStatus {
    Unknown,
    Succeeded,
    Failed,
}

/// What a node did with pushed bytes.
pub enum Written<'a> {
    /// Hand these bytes to the next node. A transparent observer forwards
    /// its input unchanged (borrowed); a rewriting transform forwards an
    /// owned replacement.
    Forward(Cow<'a, [u8]>),
    /// This node was the terminal consumer; nothing flows further.
    Consumed,
}

/// Contract every chain member satisfies.
///
/// Nodes never talk to each other directly: the owning [`TransformChain`]
/// drives them and routes forwarded bytes along its links.
pub trait Transform: Send {
    /// The algorithm URI for this transform.
    fn uri(&self) -> &'static str;

    /// How this transform processes data.
    fn kind(&self) -> TransformKind;

    /// Key material this transform needs. Keyless transforms need none.
    fn key_requirements(&self) -> KeyRequirements {
        KeyRequirements::None
    }

    /// Bind key material. A trivial success for keyless transforms.
    fn set_key(&mut self, _key: &[u8]) -> Result<()> {
        Ok(())
    }

    /// Accept bytes pushed from upstream.
    fn write<'a>(&mut self, data: &'a [u8]) -> Result<Written<'a>>;

    /// Transform bytes pulled from upstream. Head nodes receive an empty
    /// `upstream` and may generate up to `max` bytes of their own.
    fn read(&mut self, upstream: Vec<u8>, max: usize) -> Result<Vec<u8>>;

    /// End of stream. Returns whether the flush propagates downstream.
    fn flush(&mut self) -> Result<bool>;
}

/// A chain member, either owned by the chain or shared with the caller.
///
/// Shared nodes survive chain teardown: dropping the chain drops only its
/// reference, so a caller-held handle stays valid for result extraction.
pub enum ChainLink {
    Owned(Box<dyn Transform>),
    Shared(Rc<RefCell<dyn Transform>>),
}

struct Link {
    prev: Option<usize>,
    next: Option<usize>,
}

/// An ordered sequence of transform nodes.
///
/// Forward/backward relations between neighbors are kept as indices into
/// the sequence and stay symmetric by construction: if A's forward link is
/// B then B's backward link is A.
pub struct TransformChain {
    nodes: Vec<ChainLink>,
    links: Vec<Link>,
}

impl TransformChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Append a chain-owned node. Returns its position.
    pub fn push_owned(&mut self, transform: Box<dyn Transform>) -> usize {
        self.push_link(ChainLink::Owned(transform))
    }

    /// Append a node shared with the caller. Returns its position.
    pub fn push_shared(&mut self, transform: Rc<RefCell<dyn Transform>>) -> usize {
        self.push_link(ChainLink::Shared(transform))
    }

    fn push_link(&mut self, link: ChainLink) -> usize {
        let index = self.nodes.len();
        self.nodes.push(link);
        self.links.push(Link {
            prev: index.checked_sub(1),
            next: None,
        });
        if index > 0 {
            self.links[index - 1].next = Some(index);
        }
        index
    }

    /// Number of nodes in the chain.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Forward neighbor of the node at `index`.
    pub fn next_of(&self, index: usize) -> Option<usize> {
        self.links.get(index).and_then(|l| l.next)
    }

    /// Backward neighbor of the node at `index`.
    pub fn prev_of(&self, index: usize) -> Option<usize> {
        self.links.get(index).and_then(|l| l.prev)
    }

    /// Run a closure against the node at `index`.
    fn with_node<R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut dyn Transform) -> Result<R>,
    ) -> Result<R> {
        match self.nodes.get_mut(index) {
            Some(ChainLink::Owned(transform)) => f(transform.as_mut()),
            Some(ChainLink::Shared(transform)) => {
                let mut guard = transform.try_borrow_mut().map_err(|_| {
                    Error::Channel("shared transform is already borrowed".into())
                })?;
                f(&mut *guard)
            }
            None => Err(Error::Channel(format!("no transform at position {index}"))),
        }
    }

    /// Push bytes into the node at `index`; forwarded output flows along
    /// the chain's links.
    pub fn write_from(&mut self, index: usize, data: &[u8]) -> Result<()> {
        let written = self.with_node(index, |t| t.write(data))?;
        if let Written::Forward(bytes) = written {
            if let Some(next) = self.next_of(index) {
                self.write_from(next, &bytes)?;
            }
        }
        Ok(())
    }

    /// Pull up to `max` bytes through the node at `index`, drawing from its
    /// backward neighbors first.
    pub fn read_from(&mut self, index: usize, max: usize) -> Result<Vec<u8>> {
        let upstream = match self.prev_of(index) {
            Some(prev) => self.read_from(prev, max)?,
            None => Vec::new(),
        };
        self.with_node(index, |t| t.read(upstream, max))
    }

    /// Flush the node at `index`, propagating downstream when the node
    /// says so.
    pub fn flush_from(&mut self, index: usize) -> Result<()> {
        let propagate = self.with_node(index, |t| t.flush())?;
        if propagate {
            if let Some(next) = self.next_of(index) {
                self.flush_from(next)?;
            }
        }
        Ok(())
    }

    /// Push bytes into the head of the chain.
    pub fn push_bytes(&mut self, data: &[u8]) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::Channel("empty transform chain".into()));
        }
        self.write_from(0, data)
    }

    /// Pull up to `max` bytes through the tail of the chain.
    pub fn pull_bytes(&mut self, max: usize) -> Result<Vec<u8>> {
        match self.nodes.len() {
            0 => Err(Error::Channel("empty transform chain".into())),
            n => self.read_from(n - 1, max),
        }
    }

    /// Flush the whole chain, starting at the head.
    pub fn flush(&mut self) -> Result<()> {
        if self.nodes.is_empty() {
            return Ok(());
        }
        self.flush_from(0)
    }
}

impl Default for TransformChain {
    fn default() -> Self {
        Self::new()
    }
}
