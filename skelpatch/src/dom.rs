//! Arena-based HTML tree with stable post-order ids and child-path ids.
//!
//! Every node lives in its owning [`Tree`]'s node vector; a [`NodeRef`] is an
//! index into that vector and is the node's identity within the tree. Parent
//! links and the post-order index are plain refs into the same arena, so the
//! owning graph is acyclic even though traversal is bidirectional.
//!
//! Two identifier schemes coexist:
//! - `post_id`: 1-based post-order number, assigned once when the tree is
//!   sealed and never touched by later mutation. Index 0 is a reserved dummy
//!   slot so edit mappings can use 0 for "absent".
//! - `cpid` ([`NodeId`]): the child-index path from the root, refreshed on
//!   every structural mutation.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;

use crate::error::{Error, Result};

/// Sentinel tag name for text nodes.
pub const TEXT_NAME: &str = "text";

/// Child-path id: the sequence of child indices from the root to a node.
///
/// Ordering is lexicographic with the shorter path smaller when one is a
/// prefix of the other, which matches a depth-first left-to-right walk where
/// a parent precedes its descendants.
///
/// Uses SmallVec<[u32; 16]> to avoid heap allocations for typical DOM depths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(SmallVec<[u32; 16]>);

impl NodeId {
    /// Build an id from a parent id (None for the root) and a child index.
    pub fn new(parent: Option<&NodeId>, index: u32) -> Self {
        match parent {
            Some(p) => p.child(index),
            None => NodeId(smallvec::smallvec![index]),
        }
    }

    /// The id of this node's `index`-th child.
    pub fn child(&self, index: u32) -> NodeId {
        let mut path = self.0.clone();
        path.push(index);
        NodeId(path)
    }

    /// The full root-to-node index path.
    pub fn path(&self) -> &[u32] {
        &self.0
    }

    /// This node's index in its parent's child list.
    pub fn last_child_index(&self) -> u32 {
        *self.0.last().unwrap_or(&0)
    }

    /// Build an id from a full root-to-node index path.
    pub fn from_path(path: &[u32]) -> Self {
        NodeId(SmallVec::from_slice(path))
    }
}

impl Ord for NodeId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0[..].cmp(&other.0[..])
    }
}

impl PartialOrd for NodeId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, idx) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", idx)?;
        }
        Ok(())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0[..].serialize(serializer)
    }
}

/// A (start, end) pair of node ids identifying a root-to-node path.
/// Supports equality only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathId {
    pub start: NodeId,
    pub end: NodeId,
}

impl PathId {
    pub fn new(start: NodeId, end: NodeId) -> Self {
        PathId { start, end }
    }
}

/// An attribute value: either a plain string or an ordered token list
/// (class-list style). The representation choice from the source HTML is
/// preserved; a string never equals a token list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Str(String),
    Tokens(Vec<String>),
}

impl AttrValue {
    pub fn as_tokens(&self) -> Option<&[String]> {
        match self {
            AttrValue::Tokens(t) => Some(t),
            AttrValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            AttrValue::Tokens(_) => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

/// Attributes as key-value pairs (preserves insertion order).
pub type Attrs = IndexMap<String, AttrValue>;

/// Index of a node in its owning [`Tree`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(u32);

impl NodeRef {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Node payload - an element with attributes and children, or a text run.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Element {
        name: String,
        attrs: Attrs,
        children: Vec<NodeRef>,
    },
    Text {
        content: String,
    },
}

/// A node in the arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub cpid: NodeId,
    /// 1-based post-order id; 0 until the tree is sealed (and for nodes
    /// adopted into a sealed tree by the shadow pass).
    pub post_id: usize,
    pub parent: Option<NodeRef>,
}

impl NodeData {
    /// Tag name for elements, the `"text"` sentinel for text nodes.
    pub fn name(&self) -> &str {
        match &self.kind {
            NodeKind::Element { name, .. } => name,
            NodeKind::Text { .. } => TEXT_NAME,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text { .. })
    }

    pub fn attrs(&self) -> Option<&Attrs> {
        match &self.kind {
            NodeKind::Element { attrs, .. } => Some(attrs),
            NodeKind::Text { .. } => None,
        }
    }

    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text { content } => Some(content),
            NodeKind::Element { .. } => None,
        }
    }

    pub fn children(&self) -> &[NodeRef] {
        match &self.kind {
            NodeKind::Element { children, .. } => children,
            NodeKind::Text { .. } => &[],
        }
    }
}

/// An HTML tree: the arena plus the post-order index and the leftmost-leaf
/// cache (both built once at seal time; the cache is read-only thereafter).
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<NodeData>,
    root: NodeRef,
    by_post_id: Vec<Option<NodeRef>>,
    leftmost_leaves: Vec<Option<NodeRef>>,
}

impl Tree {
    pub(crate) fn new() -> Self {
        Tree {
            nodes: Vec::new(),
            root: NodeRef(0),
            by_post_id: Vec::new(),
            leftmost_leaves: Vec::new(),
        }
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeRef {
        let r = NodeRef(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            cpid: NodeId::new(None, 0),
            post_id: 0,
            parent: None,
        });
        r
    }

    /// Create a detached element node.
    pub(crate) fn create_element(&mut self, name: &str, attrs: Attrs) -> NodeRef {
        self.alloc(NodeKind::Element {
            name: name.to_string(),
            attrs,
            children: Vec::new(),
        })
    }

    /// Create a detached text node.
    pub(crate) fn create_text(&mut self, content: String) -> NodeRef {
        self.alloc(NodeKind::Text { content })
    }

    /// Create an element and attach it; a `None` parent makes it the root.
    pub(crate) fn add_element(
        &mut self,
        parent: Option<NodeRef>,
        name: &str,
        attrs: Attrs,
    ) -> NodeRef {
        let node = self.create_element(name, attrs);
        match parent {
            Some(p) => self.append_child(p, node),
            None => self.root = node,
        }
        node
    }

    /// Create a text node appended to `parent`.
    pub(crate) fn add_text(&mut self, parent: NodeRef, content: String) -> NodeRef {
        let node = self.create_text(content);
        self.append_child(parent, node);
        node
    }

    /// Assign post-order ids and build the leftmost-leaf cache. Called once
    /// after construction; post ids are stable under all later edits.
    pub(crate) fn seal(&mut self) {
        let mut order = Vec::with_capacity(self.nodes.len());
        self.collect_post_order(self.root, &mut order);
        self.by_post_id = Vec::with_capacity(order.len() + 1);
        self.by_post_id.push(None); // dummy slot, post ids start at 1
        for (i, &node) in order.iter().enumerate() {
            self.nodes[node.index()].post_id = i + 1;
            self.by_post_id.push(Some(node));
        }
        self.cache_leftmost_leaves();
    }

    fn collect_post_order(&self, node: NodeRef, out: &mut Vec<NodeRef>) {
        for &child in self.node(node).children() {
            self.collect_post_order(child, out);
        }
        out.push(node);
    }

    fn cache_leftmost_leaves(&mut self) {
        self.leftmost_leaves = vec![None; self.node_count() + 1];
        let mut queue = vec![self.root];
        while let Some(current) = queue.pop() {
            let post_id = self.node(current).post_id;
            self.leftmost_leaves[post_id] = Some(self.leftmost_leaf(current));
            queue.extend_from_slice(self.node(current).children());
        }
    }

    pub fn root(&self) -> NodeRef {
        self.root
    }

    pub fn node(&self, r: NodeRef) -> &NodeData {
        &self.nodes[r.index()]
    }

    pub(crate) fn node_mut(&mut self, r: NodeRef) -> &mut NodeData {
        &mut self.nodes[r.index()]
    }

    /// Total number of nodes reachable from the root.
    pub fn node_count(&self) -> usize {
        self.node(self.root).post_id
    }

    /// Descend through first children to a leaf.
    pub fn leftmost_leaf(&self, node: NodeRef) -> NodeRef {
        let mut current = node;
        while let Some(&first) = self.node(current).children().first() {
            current = first;
        }
        current
    }

    /// Cached leftmost leaf for a post-order id, for solver-style interfaces.
    pub fn cached_leftmost_leaf(&self, post_id: usize) -> Result<NodeRef> {
        self.leftmost_leaves
            .get(post_id)
            .copied()
            .flatten()
            .ok_or_else(|| Error::InvalidInput(format!("no leftmost leaf for post id {post_id}")))
    }

    /// Look up a node by its stable post-order id. Id 0 is the dummy slot and
    /// never resolves.
    pub fn find_by_post_id(&self, id: usize) -> Result<NodeRef> {
        self.by_post_id
            .get(id)
            .copied()
            .flatten()
            .ok_or_else(|| Error::InvalidInput(format!("unknown post-order id {id}")))
    }

    /// Look up a post-order id inside a subtree without the index, using the
    /// fact that post-order ids are monotone per subtree: descend into the
    /// first child whose post id is at least the one sought.
    pub fn find_in_subtree(&self, node: NodeRef, post_id: usize) -> Result<NodeRef> {
        let data = self.node(node);
        if data.post_id == post_id {
            return Ok(node);
        }
        for &child in data.children() {
            if self.node(child).post_id >= post_id {
                return self.find_in_subtree(child, post_id);
            }
        }
        Err(Error::InvalidInput(format!(
            "post-order id {post_id} is not in the subtree of {}",
            data.cpid
        )))
    }

    /// Look up a node by child-path id, walking from the root.
    pub fn find_by_cpid(&self, cpid: &NodeId) -> Result<NodeRef> {
        let path = cpid.path();
        let mut current = None;
        let mut current_children: &[NodeRef] = std::slice::from_ref(&self.root);
        for (i, &child_index) in path.iter().enumerate() {
            let node = *current_children
                .get(child_index as usize)
                .ok_or_else(|| Error::InvalidInput(format!("invalid child-path id {cpid}")))?;
            match &self.node(node).kind {
                NodeKind::Element { children, .. } => current_children = children,
                NodeKind::Text { .. } => {
                    if i != path.len() - 1 {
                        return Err(Error::InvalidInput(format!(
                            "child-path id {cpid} descends through a text node"
                        )));
                    }
                }
            }
            current = Some(node);
        }
        current.ok_or_else(|| Error::InvalidInput("empty child-path id".to_string()))
    }

    /// Root-to-node sequence of refs.
    pub fn path_to(&self, node: NodeRef) -> Vec<NodeRef> {
        let mut path = vec![node];
        let mut current = node;
        while let Some(parent) = self.node(current).parent {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Whether some ancestor of `node` matches the given cpid and name. A
    /// cpid match with a different name is not a match, only a diagnostic -
    /// later edits may still make the subtrees agree.
    pub(crate) fn has_ancestor_matching(
        &self,
        node: NodeRef,
        cpid: &NodeId,
        name: &str,
    ) -> bool {
        let mut ancestor = self.node(node).parent;
        while let Some(a) = ancestor {
            let data = self.node(a);
            if data.cpid == *cpid {
                if data.name() == name {
                    return true;
                }
                tracing::error!(
                    ancestor = %data.cpid,
                    ancestor_name = data.name(),
                    expected_name = name,
                    "ancestor has the expected cpid but a different name"
                );
            }
            ancestor = data.parent;
        }
        false
    }

    /// Recompute `node`'s cpid from its parent's cpid and the given child
    /// index, then refresh all descendants.
    pub(crate) fn refresh_cpid(&mut self, node: NodeRef, new_index: u32) {
        let Some(parent) = self.node(node).parent else {
            return;
        };
        let cpid = self.node(parent).cpid.child(new_index);
        self.set_cpid_recursive(node, cpid);
    }

    fn set_cpid_recursive(&mut self, node: NodeRef, cpid: NodeId) {
        self.node_mut(node).cpid = cpid;
        let children = self.node(node).children().to_vec();
        let base = self.node(node).cpid.clone();
        for (i, child) in children.into_iter().enumerate() {
            self.set_cpid_recursive(child, base.child(i as u32));
        }
    }

    /// Reseat `node` under a new parent and refresh its subtree's cpids.
    pub(crate) fn set_parent(&mut self, node: NodeRef, new_parent: NodeRef, new_index: u32) {
        self.node_mut(node).parent = Some(new_parent);
        self.refresh_cpid(node, new_index);
    }

    /// Append `child` to `parent`'s child list, reseating and refreshing.
    pub(crate) fn append_child(&mut self, parent: NodeRef, child: NodeRef) {
        let index = match &mut self.node_mut(parent).kind {
            NodeKind::Element { children, .. } => {
                children.push(child);
                (children.len() - 1) as u32
            }
            NodeKind::Text { .. } => return,
        };
        self.set_parent(child, parent, index);
    }

    /// Insert `child` into `parent`'s child list at `index` (clamped to the
    /// child count), refreshing the cpids of the siblings that shifted right.
    /// The inserted node's own cpid is left as the caller computed it.
    pub(crate) fn insert_child_at(&mut self, parent: NodeRef, index: usize, child: NodeRef) {
        let (pos, siblings) = match &mut self.node_mut(parent).kind {
            NodeKind::Element { children, .. } => {
                let pos = index.min(children.len());
                children.insert(pos, child);
                (pos, children.clone())
            }
            NodeKind::Text { .. } => return,
        };
        self.node_mut(child).parent = Some(parent);
        for (j, sibling) in siblings.into_iter().enumerate().skip(pos + 1) {
            self.refresh_cpid(sibling, j as u32);
        }
    }

    /// Remove the subtree rooted at `child` from `parent`, matching by
    /// identity, and refresh the cpids of the siblings to its right.
    pub(crate) fn remove_subtree(&mut self, parent: NodeRef, child: NodeRef) -> Result<()> {
        let (pos, siblings) = match &mut self.node_mut(parent).kind {
            NodeKind::Element { children, .. } => {
                let pos = children.iter().position(|&c| c == child).ok_or_else(|| {
                    Error::InvalidInput("node to remove is not a child of its parent".to_string())
                })?;
                children.remove(pos);
                (pos, children.clone())
            }
            NodeKind::Text { .. } => {
                return Err(Error::InvalidInput(
                    "cannot remove a child from a text node".to_string(),
                ));
            }
        };
        for (j, sibling) in siblings.into_iter().enumerate().skip(pos) {
            self.refresh_cpid(sibling, j as u32);
        }
        Ok(())
    }

    /// Delete `node` itself, promoting its children into its parent's child
    /// list at its position. Post-order ids are untouched; cpids of the
    /// promoted subtrees and of the later siblings are refreshed.
    pub(crate) fn splice_out(&mut self, node: NodeRef) -> Result<()> {
        let parent = self.node(node).parent.ok_or_else(|| {
            Error::InvalidInput("cannot delete the root of the subject tree".to_string())
        })?;
        let promoted = self.node(node).children().to_vec();
        let rebuilt = match &mut self.node_mut(parent).kind {
            NodeKind::Element { children, .. } => {
                let pos = children.iter().position(|&c| c == node).ok_or_else(|| {
                    Error::InvalidInput("node to delete is not a child of its parent".to_string())
                })?;
                children.splice(pos..pos + 1, promoted.iter().copied());
                (pos, children.clone())
            }
            NodeKind::Text { .. } => {
                return Err(Error::InvalidInput(
                    "delete target's parent is a text node".to_string(),
                ));
            }
        };
        for &child in &promoted {
            self.node_mut(child).parent = Some(parent);
        }
        let (pos, siblings) = rebuilt;
        for (j, sibling) in siblings.into_iter().enumerate().skip(pos) {
            self.refresh_cpid(sibling, j as u32);
        }
        Ok(())
    }

    /// Deep copy of the whole tree. The copy is re-sealed, which reassigns
    /// the same post-order ids since the structure is identical.
    pub fn deepcopy(&self) -> Tree {
        let mut copy = Tree::new();
        let root = copy.adopt_subtree(self, self.root, None);
        copy.root = root;
        copy.seal();
        copy
    }

    fn adopt_subtree(&mut self, src: &Tree, node: NodeRef, parent: Option<NodeRef>) -> NodeRef {
        let data = src.node(node);
        match &data.kind {
            NodeKind::Element { name, attrs, .. } => {
                let copy = self.add_element(parent, name, attrs.clone());
                for &child in data.children() {
                    self.adopt_subtree(src, child, Some(copy));
                }
                copy
            }
            NodeKind::Text { content } => {
                // a parentless text cannot be a tree root
                let p = parent.expect("text node adopted without a parent");
                self.add_text(p, content.clone())
            }
        }
    }

    /// Copy a node from another tree without its children, the way a browser
    /// inserting a bare element would; later edits supply the descendants.
    /// The copy's cpid points at the slot the source occupied under the given
    /// parent; it is not attached yet.
    pub(crate) fn adopt_shallow(&mut self, src: &Tree, node: NodeRef, parent: NodeRef) -> NodeRef {
        let data = src.node(node);
        let copy = match &data.kind {
            NodeKind::Element { name, attrs, .. } => self.create_element(name, attrs.clone()),
            NodeKind::Text { content } => self.create_text(content.clone()),
        };
        let cpid = self
            .node(parent)
            .cpid
            .child(data.cpid.last_child_index());
        self.node_mut(copy).cpid = cpid;
        self.node_mut(copy).parent = Some(parent);
        copy
    }

    /// Structural equality ignoring post-order ids: names, attrs, contents,
    /// cpids, and child structure.
    pub fn structurally_eq(&self, other: &Tree) -> bool {
        self.subtree_eq(self.root, other, other.root)
    }

    fn subtree_eq(&self, a: NodeRef, other: &Tree, b: NodeRef) -> bool {
        let da = self.node(a);
        let db = other.node(b);
        if da.cpid != db.cpid {
            return false;
        }
        match (&da.kind, &db.kind) {
            (
                NodeKind::Element {
                    name: na,
                    attrs: aa,
                    children: ca,
                },
                NodeKind::Element {
                    name: nb,
                    attrs: ab,
                    children: cb,
                },
            ) => {
                na == nb
                    && aa == ab
                    && ca.len() == cb.len()
                    && ca
                        .iter()
                        .zip(cb.iter())
                        .all(|(&x, &y)| self.subtree_eq(x, other, y))
            }
            (NodeKind::Text { content: ta }, NodeKind::Text { content: tb }) => ta == tb,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_tree() -> (Tree, NodeRef, NodeRef, NodeRef) {
        // <html><head></head><body><p>hi</p></body></html>
        let mut tree = Tree::new();
        let html = tree.add_element(None, "html", Attrs::new());
        let head = tree.add_element(Some(html), "head", Attrs::new());
        let body = tree.add_element(Some(html), "body", Attrs::new());
        let p = tree.add_element(Some(body), "p", Attrs::new());
        tree.add_text(p, "hi".to_string());
        tree.seal();
        (tree, head, body, p)
    }

    #[test]
    fn cpid_ordering_is_depth_first() {
        let a = NodeId::from_path(&[0, 1]);
        let b = NodeId::from_path(&[0, 1, 0]);
        let c = NodeId::from_path(&[0, 2]);
        assert!(a < b, "parent precedes descendant");
        assert!(b < c, "descendant precedes right sibling of parent");
        assert_eq!(a, NodeId::from_path(&[0, 1]));
        assert_eq!(b.last_child_index(), 0);
    }

    #[test]
    fn post_order_ids_cover_one_to_n() {
        let (tree, head, body, p) = leaf_tree();
        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.node(head).post_id, 1);
        assert_eq!(tree.node(p).post_id, 3); // text=2, p=3
        assert_eq!(tree.node(body).post_id, 4);
        assert_eq!(tree.node(tree.root()).post_id, 5);
        for id in 1..=5 {
            let node = tree.find_by_post_id(id).unwrap();
            assert_eq!(tree.node(node).post_id, id);
        }
        assert!(tree.find_by_post_id(0).is_err());
        assert!(tree.find_by_post_id(6).is_err());
    }

    #[test]
    fn cpid_matches_parent_plus_index() {
        let (tree, head, body, p) = leaf_tree();
        assert_eq!(tree.node(tree.root()).cpid, NodeId::from_path(&[0]));
        assert_eq!(tree.node(head).cpid, NodeId::from_path(&[0, 0]));
        assert_eq!(tree.node(body).cpid, NodeId::from_path(&[0, 1]));
        assert_eq!(tree.node(p).cpid, NodeId::from_path(&[0, 1, 0]));
    }

    #[test]
    fn find_by_cpid_walks_the_path() {
        let (tree, _, body, p) = leaf_tree();
        assert_eq!(
            tree.find_by_cpid(&NodeId::from_path(&[0, 1])).unwrap(),
            body
        );
        assert_eq!(
            tree.find_by_cpid(&NodeId::from_path(&[0, 1, 0])).unwrap(),
            p
        );
        assert!(tree.find_by_cpid(&NodeId::from_path(&[0, 7])).is_err());
    }

    #[test]
    fn insert_shifts_sibling_cpids() {
        let (mut tree, _, body, p) = leaf_tree();
        let div = tree.create_element("div", Attrs::new());
        let cpid = tree.node(body).cpid.child(0);
        tree.node_mut(div).cpid = cpid;
        tree.insert_child_at(body, 0, div);
        // the old [0,1,0] now sits at [0,1,1]
        assert_eq!(tree.node(p).cpid, NodeId::from_path(&[0, 1, 1]));
        let text = tree.node(p).children()[0];
        assert_eq!(tree.node(text).cpid, NodeId::from_path(&[0, 1, 1, 0]));
    }

    #[test]
    fn splice_out_promotes_children() {
        let (mut tree, _, body, p) = leaf_tree();
        let text = tree.node(p).children()[0];
        tree.splice_out(p).unwrap();
        assert_eq!(tree.node(body).children(), &[text]);
        assert_eq!(tree.node(text).parent, Some(body));
        assert_eq!(tree.node(text).cpid, NodeId::from_path(&[0, 1, 0]));
        // post ids survive the mutation
        assert_eq!(tree.node(text).post_id, 2);
        assert_eq!(tree.find_by_post_id(2).unwrap(), text);
    }

    #[test]
    fn deepcopy_is_structurally_identical() {
        let (tree, ..) = leaf_tree();
        let copy = tree.deepcopy();
        assert!(tree.structurally_eq(&copy));
        assert_eq!(copy.node_count(), tree.node_count());
        assert_eq!(
            copy.node(copy.find_by_post_id(3).unwrap()).name(),
            tree.node(tree.find_by_post_id(3).unwrap()).name()
        );
    }

    #[test]
    fn path_to_runs_root_to_node() {
        let (tree, _, body, p) = leaf_tree();
        let text = tree.node(p).children()[0];
        assert_eq!(tree.path_to(text), vec![tree.root(), body, p, text]);
        assert_eq!(tree.path_to(tree.root()), vec![tree.root()]);
    }

    #[test]
    fn subtree_walk_agrees_with_the_index() {
        let (tree, ..) = leaf_tree();
        for id in 1..=tree.node_count() {
            assert_eq!(
                tree.find_in_subtree(tree.root(), id).unwrap(),
                tree.find_by_post_id(id).unwrap()
            );
        }
        assert!(tree.find_in_subtree(tree.root(), 99).is_err());
    }

    #[test]
    fn leftmost_leaf_cache() {
        let (tree, head, ..) = leaf_tree();
        let root_pid = tree.node(tree.root()).post_id;
        // the root's leftmost leaf is head (no children of its own)
        assert_eq!(tree.cached_leftmost_leaf(root_pid).unwrap(), head);
    }

    #[test]
    fn path_id_equality() {
        let a = PathId::new(NodeId::from_path(&[0]), NodeId::from_path(&[0, 1]));
        let b = PathId::new(NodeId::from_path(&[0]), NodeId::from_path(&[0, 1]));
        let c = PathId::new(NodeId::from_path(&[0]), NodeId::from_path(&[0, 2]));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
