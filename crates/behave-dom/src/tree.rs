//! Element tree (arena-based allocation)
//!
//! Node slots are never reclaimed; removing a subtree only unlinks it from
//! its parent. Removed nodes keep their ids and can be re-appended.

use crate::{Node, NodeData, NodeId};

/// Arena-based element tree
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a new tree holding only the document root
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
        }
    }

    /// Document root id
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes in the arena (including unlinked ones)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a new element node
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(Node::element(tag))
    }

    /// Allocate a new element node with initial attributes
    pub fn create_element_with(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.create_element(tag);
        for (name, value) in attrs {
            self.set_attr(id, name, value);
        }
        id
    }

    /// Allocate a new text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(Node::text(content))
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Append `child` as the last child of `parent`.
    ///
    /// A child already linked elsewhere is unlinked first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.get(parent).is_none() || self.get(child).is_none() || parent == child {
            return;
        }
        self.unlink(child);

        let prev_last = self.nodes[parent.index()].last_child;
        {
            let node = &mut self.nodes[child.index()];
            node.parent = parent;
            node.prev_sibling = prev_last;
        }
        if prev_last.is_none() {
            self.nodes[parent.index()].first_child = child;
        } else {
            self.nodes[prev_last.index()].next_sibling = child;
        }
        self.nodes[parent.index()].last_child = child;
    }

    /// Detach a subtree from its parent. The node and its descendants keep
    /// their arena slots.
    pub fn remove(&mut self, id: NodeId) {
        if self.get(id).is_none() {
            return;
        }
        tracing::trace!(node = id.0, "unlinking subtree");
        self.unlink(id);
    }

    fn unlink(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[id.index()];
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        if parent.is_none() {
            return;
        }

        if prev.is_none() {
            self.nodes[parent.index()].first_child = next;
        } else {
            self.nodes[prev.index()].next_sibling = next;
        }
        if next.is_none() {
            self.nodes[parent.index()].last_child = prev;
        } else {
            self.nodes[next.index()].prev_sibling = prev;
        }

        let node = &mut self.nodes[id.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
    }

    /// Element tag name
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.as_element().map(|e| e.tag.as_str())
    }

    /// Read an attribute from an element node
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)?.as_element()?.attr(name)
    }

    /// Write an attribute on an element node
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(element) = self.get_mut(id).and_then(|n| n.as_element_mut()) {
            element.set_attr(name, value);
        }
    }

    /// Remove an attribute from an element node
    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(element) = self.get_mut(id).and_then(|n| n.as_element_mut()) {
            element.attrs.remove(name);
        }
    }

    /// Parent of a node, if linked
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.get(id)?.parent;
        (!parent.is_none()).then_some(parent)
    }

    /// Direct children, in tree order
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(node) = self.get(id) else {
            return out;
        };
        let mut cursor = node.first_child;
        while !cursor.is_none() {
            out.push(cursor);
            cursor = self.nodes[cursor.index()].next_sibling;
        }
        out
    }

    /// Ancestors of a node, nearest first, excluding the node itself
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            cursor: self.get(id).map(|n| n.parent).unwrap_or(NodeId::NONE),
        }
    }

    /// Descendants of a node in depth-first preorder, excluding the node
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id);
        stack.reverse();
        while let Some(next) = stack.pop() {
            out.push(next);
            let mut kids = self.children(next);
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    /// Nearest ancestor-or-self matching a predicate
    pub fn closest<F>(&self, id: NodeId, pred: F) -> Option<NodeId>
    where
        F: Fn(&DomTree, NodeId) -> bool,
    {
        if self.get(id).is_some() && pred(self, id) {
            return Some(id);
        }
        self.ancestors(id).find(|&a| pred(self, a))
    }

    /// Check whether a node is reachable from the document root
    pub fn is_attached(&self, id: NodeId) -> bool {
        if id == NodeId::ROOT {
            return true;
        }
        self.ancestors(id).any(|a| a == NodeId::ROOT)
    }

    /// Concatenated text content of a subtree
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(text) = self.get(id).and_then(|n| n.as_text()) {
            out.push_str(text);
        }
        for child in self.descendants(id) {
            if let Some(NodeData::Text(text)) = self.get(child).map(|n| &n.data) {
                out.push_str(text);
            }
        }
        out
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over a node's ancestors, nearest first
pub struct Ancestors<'a> {
    tree: &'a DomTree,
    cursor: NodeId,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.is_none() {
            return None;
        }
        let current = self.cursor;
        self.cursor = self
            .tree
            .get(current)
            .map(|n| n.parent)
            .unwrap_or(NodeId::NONE);
        Some(current)
    }
}
