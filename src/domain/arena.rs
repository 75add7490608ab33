use std::collections::{HashMap, HashSet};

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::link::Link;
use crate::domain::node::{Node, NodeId, NodeIdentity};
use crate::domain::path::Path;

/// Node registry of one program tree.
///
/// Every distinct node is stored once, keyed by its [`NodeId`]; links refer to
/// children by id, so a node reused under several parents is shared rather
/// than copied. Cloning the arena deep-copies every node and link.
#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    arena: Arena<Node>,
    index: HashMap<NodeId, Index>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the node with the same id.
    #[instrument(level = "trace", skip(self, node), fields(node_id = node.node_id))]
    pub fn insert(&mut self, node: Node) {
        match self.index.get(&node.node_id) {
            Some(&idx) => {
                if let Some(slot) = self.arena.get_mut(idx) {
                    *slot = node;
                }
            }
            None => {
                let node_id = node.node_id;
                let idx = self.arena.insert(node);
                self.index.insert(node_id, idx);
            }
        }
    }

    /// Inserts the node only if its id is unknown. Returns whether it was inserted.
    pub fn insert_if_absent(&mut self, node: Node) -> bool {
        if self.contains(node.node_id) {
            return false;
        }
        self.insert(node);
        true
    }

    pub fn get(&self, node_id: NodeId) -> Option<&Node> {
        self.index.get(&node_id).and_then(|&idx| self.arena.get(idx))
    }

    pub fn get_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        match self.index.get(&node_id) {
            Some(&idx) => self.arena.get_mut(idx),
            None => None,
        }
    }

    pub fn remove(&mut self, node_id: NodeId) -> Option<Node> {
        self.index
            .remove(&node_id)
            .and_then(|idx| self.arena.remove(idx))
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.index.contains_key(&node_id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// All stored nodes, reachable or not, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.arena.iter().map(|(_, node)| node)
    }

    pub fn find_by_identity(&self, identity: &NodeIdentity) -> Option<&Node> {
        self.nodes()
            .find(|node| node.code == identity.code && node.year == identity.year)
    }

    /// Ids reachable from `root`, root included.
    #[instrument(level = "trace", skip(self))]
    pub fn reachable_from(&self, root: NodeId) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(node) = self.get(current) {
                stack.extend(node.children_ids());
            }
        }
        seen
    }

    /// Drops every node not reachable from `root`. Returns the removed nodes.
    #[instrument(level = "debug", skip(self))]
    pub fn retain_reachable(&mut self, root: NodeId) -> Vec<Node> {
        let reachable = self.reachable_from(root);
        let unreachable: Vec<NodeId> = self
            .index
            .keys()
            .filter(|id| !reachable.contains(id))
            .copied()
            .collect();
        unreachable
            .into_iter()
            .filter_map(|id| self.remove(id))
            .collect()
    }

    /// Depth-first walk over every occurrence below `root`, root included.
    pub fn iter_from(&self, root: NodeId) -> OccurrenceIterator<'_> {
        OccurrenceIterator::new(self, root)
    }
}

/// One visited occurrence: where it is, the link that led there (none for the
/// root) and the node itself.
#[derive(Debug, Clone, Copy)]
pub struct Occurrence<'a> {
    pub link: Option<&'a Link>,
    pub node: &'a Node,
}

/// Pre-order DFS yielding `(Path, Occurrence)` for every occurrence of every node.
///
/// A child already on the current path is skipped, so a cyclic structure
/// cannot loop forever.
pub struct OccurrenceIterator<'a> {
    arena: &'a NodeArena,
    stack: Vec<(Path, Option<&'a Link>)>,
}

impl<'a> OccurrenceIterator<'a> {
    fn new(arena: &'a NodeArena, root: NodeId) -> Self {
        let mut stack = Vec::new();
        if arena.contains(root) {
            stack.push((Path::root(root), None));
        }
        Self { arena, stack }
    }
}

impl<'a> Iterator for OccurrenceIterator<'a> {
    type Item = (Path, Occurrence<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((path, link)) = self.stack.pop() {
            let Some(node) = self.arena.get(path.last()) else {
                continue;
            };
            // Push children in reverse order for left-to-right traversal
            for child_link in node.children().iter().rev() {
                if !path.contains(child_link.child) {
                    self.stack.push((path.join(child_link.child), Some(child_link)));
                }
            }
            return Some((path, Occurrence { link, node }));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node_type::{GroupType, NodeType};

    fn arena_with_shared_child() -> NodeArena {
        // 1 -> 2 -> 4, 1 -> 3 -> 4
        let mut arena = NodeArena::new();
        let mut root = Node::new(1, "LDROI100B", 2024, GroupType::CommonCore.into());
        root.add_child(Link::new(2));
        root.add_child(Link::new(3));
        let mut left = Node::new(2, "LDROI101G", 2024, GroupType::SubGroup.into());
        left.add_child(Link::new(4));
        let mut right = Node::new(3, "LDROI102G", 2024, GroupType::SubGroup.into());
        right.add_child(Link::new(4));
        arena.insert(root);
        arena.insert(left);
        arena.insert(right);
        arena.insert(Node::new(4, "LDROI1001", 2024, NodeType::LearningUnit));
        arena
    }

    #[test]
    fn given_shared_child_when_iterating_then_each_occurrence_is_visited() {
        let arena = arena_with_shared_child();

        let paths: Vec<String> = arena.iter_from(1).map(|(p, _)| p.to_string()).collect();

        assert_eq!(paths, vec!["1", "1|2", "1|2|4", "1|3", "1|3|4"]);
    }

    #[test]
    fn given_removed_link_when_retaining_reachable_then_orphans_dropped() {
        let mut arena = arena_with_shared_child();
        arena.get_mut(1).unwrap().remove_child(3);
        arena.get_mut(2).unwrap().remove_child(4);

        let removed = arena.retain_reachable(1);

        let mut removed_ids: Vec<_> = removed.iter().map(|n| n.node_id).collect();
        removed_ids.sort();
        assert_eq!(removed_ids, vec![3, 4]);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn given_cyclic_links_when_iterating_then_terminates() {
        let mut arena = arena_with_shared_child();
        arena.get_mut(2).unwrap().add_child(Link::new(1));

        assert_eq!(arena.iter_from(1).count(), 5);
    }
}
