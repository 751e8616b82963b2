//! Path-based similarity between two HTML trees.
//!
//! Two pages are compared by the root-to-node paths they share: walk both
//! trees level by level, count the multiset intersection of the current path
//! sets, keep only the intersecting paths, expand them one level, and repeat
//! until nothing is shared. The score is the shared-path count as a
//! percentage of the second tree's size.
//!
//! Paths compare without child-path ids - an element step matches on name
//! and attributes, a text step on content - so a page whose subtrees moved
//! sideways still scores. This is the consumer of the parser's strip modes.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::dom::{NodeData, NodeKind, NodeRef, Tree};

/// A root-to-node path within one tree.
struct TreePath<'a> {
    tree: &'a Tree,
    nodes: Vec<NodeRef>,
}

impl<'a> TreePath<'a> {
    fn root(tree: &'a Tree) -> Self {
        TreePath {
            tree,
            nodes: vec![tree.root()],
        }
    }

    fn last(&self) -> NodeRef {
        *self.nodes.last().expect("a path has at least the root")
    }

    /// One path per child of this path's last node.
    fn next_level(&self) -> Vec<TreePath<'a>> {
        self.tree
            .node(self.last())
            .children()
            .iter()
            .map(|&child| {
                let mut nodes = self.nodes.clone();
                nodes.push(child);
                TreePath {
                    tree: self.tree,
                    nodes,
                }
            })
            .collect()
    }
}

/// Node equality without the child-path id.
fn step_eq(a: &NodeData, b: &NodeData) -> bool {
    match (&a.kind, &b.kind) {
        (
            NodeKind::Element {
                name: na, attrs: aa, ..
            },
            NodeKind::Element {
                name: nb, attrs: ab, ..
            },
        ) => na == nb && aa == ab,
        (NodeKind::Text { content: ca }, NodeKind::Text { content: cb }) => ca == cb,
        _ => false,
    }
}

impl PartialEq for TreePath<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .zip(other.nodes.iter())
                .all(|(&a, &b)| step_eq(self.tree.node(a), other.tree.node(b)))
    }
}

impl Eq for TreePath<'_> {}

// Hashing by the name sequence alone is coarser than equality (attrs and
// text content are ignored), which is fine: equal paths always share a hash.
impl Hash for TreePath<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for &node in &self.nodes {
            self.tree.node(node).name().hash(state);
        }
    }
}

fn counter<'p, 'a>(paths: &'p [TreePath<'a>]) -> HashMap<&'p TreePath<'a>, usize> {
    let mut counts = HashMap::new();
    for path in paths {
        *counts.entry(path).or_insert(0) += 1;
    }
    counts
}

/// Number of root-to-node paths the two trees share, counting duplicates up
/// to the smaller multiplicity on each side.
pub fn common_path_count<'t>(first: &'t Tree, second: &'t Tree) -> usize {
    let mut total = 0;
    let mut first_paths = vec![TreePath::root(first)];
    let mut second_paths = vec![TreePath::root(second)];

    loop {
        let (keep_first, keep_second, level_common) = {
            let first_counter = counter(&first_paths);
            let second_counter = counter(&second_paths);
            let level_common: usize = first_counter
                .iter()
                .map(|(path, &count)| {
                    second_counter
                        .get(*path)
                        .map_or(0, |&other| count.min(other))
                })
                .sum();
            // Retaining every copy of a shared path keeps a superset of the
            // true common multiset, which only ever adds candidate children.
            let keep_first: Vec<bool> = first_paths
                .iter()
                .map(|p| second_counter.contains_key(p))
                .collect();
            let keep_second: Vec<bool> = second_paths
                .iter()
                .map(|p| first_counter.contains_key(p))
                .collect();
            (keep_first, keep_second, level_common)
        };
        if level_common == 0 {
            return total;
        }
        total += level_common;

        first_paths = expand_retained(first_paths, &keep_first);
        second_paths = expand_retained(second_paths, &keep_second);
    }
}

fn expand_retained<'a>(paths: Vec<TreePath<'a>>, keep: &[bool]) -> Vec<TreePath<'a>> {
    paths
        .into_iter()
        .zip(keep.iter().copied())
        .filter(|&(_, k)| k)
        .flat_map(|(path, _)| path.next_level())
        .collect()
}

/// Shared paths as a percentage of the second tree's node count.
pub fn similarity(first: &Tree, second: &Tree) -> f64 {
    common_path_count(first, second) as f64 * 100.0 / second.node_count() as f64
}
