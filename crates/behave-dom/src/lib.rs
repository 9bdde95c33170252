//! behave DOM - element tree substrate
//!
//! Arena-based element tree with just enough surface for behavior
//! attachment: attributes, traversal, and subtree removal.

mod attributes;
mod node;
mod tree;

pub use attributes::{Attr, AttrMap};
pub use node::{ElementData, Node, NodeData};
pub use tree::{Ancestors, DomTree};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Document root ID
    pub const ROOT: NodeId = NodeId(0);

    /// Check against the sentinel
    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}
