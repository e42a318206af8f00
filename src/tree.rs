use crate::{error::Error, ops::OpKind};

pub type NodeId = usize;

/// What a node holds: a number, a reference into the variable table, or an
/// operator applied to the node's children.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Payload {
    Number(f64),
    Variable(usize),
    Operator(OpKind),
}

/// A node of an expression tree. Children are owned through the tree's
/// arena; the parent link is a non-owning back-reference. A unary operator
/// keeps `left` empty and its operand in `right`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Node {
    payload: Payload,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
}

impl Node {
    pub fn payload(&self) -> Payload {
        self.payload
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn left(&self) -> Option<NodeId> {
        self.left
    }

    pub fn right(&self) -> Option<NodeId> {
        self.right
    }
}

/// Lifecycle of a tree. A live tree cannot be re-initialized.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Status {
    Uninitialized,
    Live,
    Destroyed,
}

/// An expression tree backed by an arena of node slots. Freed slots are
/// recycled through a free list. `node_count` tracks the live nodes and must
/// match a fresh traversal after every mutating operation.
#[derive(Debug, Clone)]
pub struct Tree {
    slots: Vec<Option<Node>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    node_count: usize,
    status: Status,
}

impl Tree {
    pub fn new() -> Tree {
        Tree {
            slots: Vec::new(),
            free: Vec::new(),
            root: None,
            node_count: 0,
            status: Status::Uninitialized,
        }
    }

    /// A live tree holding a single number.
    pub fn constant(value: f64) -> Tree {
        let mut tree = Tree::new();
        let root = tree.alloc(Payload::Number(value), None, None);
        tree.root = Some(root);
        tree.status = Status::Live;
        tree
    }

    /// Allocate a node over the given children. The children's parent links
    /// are not touched; construction wires them explicitly or runs
    /// `fix_parents` afterwards.
    pub fn alloc(&mut self, payload: Payload, left: Option<NodeId>, right: Option<NodeId>) -> NodeId {
        let node = Node {
            payload,
            parent: None,
            left,
            right,
        };
        self.node_count += 1;
        match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    /// Make `id` the root and the tree live. Attaching to a tree that has
    /// already been initialized is an error.
    pub fn attach_root(&mut self, id: NodeId) -> Result<(), Error> {
        if self.status != Status::Uninitialized {
            return Err(Error::Reinitialization);
        }
        if id >= self.slots.len() || self.slots[id].is_none() {
            return Err(Error::InvalidArgument);
        }
        self.node_mut(id).parent = None;
        self.root = Some(id);
        self.status = Status::Live;
        Ok(())
    }

    /// Free every node and retire the tree.
    pub fn destroy(&mut self) {
        if let Some(root) = self.root.take() {
            self.free_subtree(root);
        }
        self.slots.clear();
        self.free.clear();
        self.node_count = 0;
        self.status = Status::Destroyed;
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.slots[id].as_ref().expect("node slot is vacant")
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.slots[id].as_mut().expect("node slot is vacant")
    }

    pub(crate) fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.node_mut(id).parent = parent;
    }

    /// Free `id` and all of its descendants, post-order.
    pub(crate) fn free_subtree(&mut self, id: NodeId) {
        let (left, right) = {
            let node = self.node(id);
            (node.left, node.right)
        };
        if let Some(left) = left {
            self.free_subtree(left);
        }
        if let Some(right) = right {
            self.free_subtree(right);
        }
        self.slots[id] = None;
        self.free.push(id);
        self.node_count -= 1;
    }

    /// Deep-copy the subtree of `src` rooted at `id` into this tree. Every
    /// descendant is copied and its parent link rewired to the copy; the
    /// copied root's parent is left empty for the caller to wire.
    pub fn copy_from(&mut self, src: &Tree, id: NodeId) -> NodeId {
        let node = *src.node(id);
        let left = node.left.map(|l| self.copy_from(src, l));
        let right = node.right.map(|r| self.copy_from(src, r));
        let copy = self.alloc(node.payload, left, right);
        if let Some(left) = left {
            self.set_parent(left, Some(copy));
        }
        if let Some(right) = right {
            self.set_parent(right, Some(copy));
        }
        copy
    }

    /// Re-synchronize every parent link from the root down.
    pub fn fix_parents(&mut self) {
        if let Some(root) = self.root {
            self.set_parent(root, None);
            self.fix_parents_from(root);
        }
    }

    /// Re-synchronize the parent links of all descendants of `id`. The
    /// parent link of `id` itself is left alone.
    pub fn fix_parents_from(&mut self, id: NodeId) {
        let (left, right) = {
            let node = self.node(id);
            (node.left, node.right)
        };
        if let Some(left) = left {
            self.set_parent(left, Some(id));
            self.fix_parents_from(left);
        }
        if let Some(right) = right {
            self.set_parent(right, Some(id));
            self.fix_parents_from(right);
        }
    }

    /// Replace the node `id` with its child `keep`: the survivor is detached
    /// first, then `id` and its remaining subtree are freed, and the
    /// survivor takes the old node's place under its parent (or becomes the
    /// root).
    pub(crate) fn replace_with_child(&mut self, id: NodeId, keep: NodeId) {
        let parent = self.node(id).parent;
        {
            let node = self.node_mut(id);
            if node.left == Some(keep) {
                node.left = None;
            } else if node.right == Some(keep) {
                node.right = None;
            } else {
                panic!("node {keep} is not a child of node {id}");
            }
        }
        self.free_subtree(id);
        self.set_parent(keep, parent);
        match parent {
            Some(parent) => {
                let pnode = self.node_mut(parent);
                if pnode.left == Some(id) {
                    pnode.left = Some(keep);
                } else {
                    pnode.right = Some(keep);
                }
            }
            None => self.root = Some(keep),
        }
    }

    /// Collapse the subtree at `id` into a single number node.
    pub(crate) fn replace_with_number(&mut self, id: NodeId, value: f64) {
        let (left, right) = {
            let node = self.node(id);
            (node.left, node.right)
        };
        if let Some(left) = left {
            self.free_subtree(left);
        }
        if let Some(right) = right {
            self.free_subtree(right);
        }
        let node = self.node_mut(id);
        node.payload = Payload::Number(value);
        node.left = None;
        node.right = None;
    }

    /// Count the nodes reachable from the root by a fresh traversal.
    pub fn count_nodes(&self) -> usize {
        match self.root {
            Some(root) => self.count_from(root),
            None => 0,
        }
    }

    fn count_from(&self, id: NodeId) -> usize {
        let node = self.node(id);
        1 + node.left.map_or(0, |l| self.count_from(l))
            + node.right.map_or(0, |r| self.count_from(r))
    }

    /// Check the structural invariants: the tracked node count must match a
    /// fresh traversal, and every child's parent back-reference must point
    /// at the node that owns it. A broken bond is reported, never repaired.
    pub fn verify(&self) -> Result<(), Error> {
        let actual = self.count_nodes();
        if actual != self.node_count {
            return Err(Error::NodeCountMismatch {
                tracked: self.node_count,
                actual,
            });
        }
        match self.root {
            Some(root) => {
                if self.node(root).parent.is_some() {
                    return Err(Error::BondFailed(root));
                }
                self.verify_bonds(root)
            }
            None => Ok(()),
        }
    }

    fn verify_bonds(&self, id: NodeId) -> Result<(), Error> {
        let node = self.node(id);
        for child in [node.left, node.right].into_iter().flatten() {
            if self.node(child).parent != Some(id) {
                return Err(Error::BondFailed(child));
            }
            self.verify_bonds(child)?;
        }
        Ok(())
    }
}

impl Default for Tree {
    fn default() -> Self {
        Tree::new()
    }
}
