//! Builds program trees from loose node and link records.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::arena::NodeArena;
use crate::domain::authorized_relationship::AuthorizedRelationshipList;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::link::Link;
use crate::domain::node::{Node, NodeId};
use crate::domain::prerequisite::Prerequisite;
use crate::domain::program_tree::ProgramTree;

/// Result type for tree building.
pub type TreeResult<T> = Result<T, DomainError>;

/// Collects nodes and links, then materialises the tree below any root.
///
/// Links are stored on their parent as they are added; children are ordered
/// by their recorded `order` and renumbered densely.
#[derive(Debug, Clone)]
pub struct ProgramTreeBuilder {
    nodes: NodeArena,
    relationships: Arc<AuthorizedRelationshipList>,
    next_id: NodeId,
}

impl ProgramTreeBuilder {
    pub fn new(relationships: Arc<AuthorizedRelationshipList>) -> Self {
        Self {
            nodes: NodeArena::new(),
            relationships,
            next_id: 1,
        }
    }

    /// Registers a node (replacing one with the same id) and returns its id.
    pub fn node(&mut self, node: Node) -> NodeId {
        let node_id = node.node_id;
        self.next_id = self.next_id.max(node_id + 1);
        self.nodes.insert(node);
        node_id
    }

    /// Smallest id not used by any registered node.
    pub fn next_id(&self) -> NodeId {
        self.next_id
    }

    pub fn link(&mut self, parent: NodeId, link: Link) -> TreeResult<&mut Self> {
        if !self.nodes.contains(link.child) {
            return Err(DomainError::InvalidStructure(format!(
                "link {} -> {}: unknown child",
                parent, link.child
            )));
        }
        let parent_node = self.nodes.get_mut(parent).ok_or_else(|| {
            DomainError::InvalidStructure(format!("link {} -> {}: unknown parent", parent, link.child))
        })?;
        if parent_node.is_learning_unit() {
            return Err(DomainError::InvalidStructure(format!(
                "learning unit {} cannot have children",
                parent_node
            )));
        }
        parent_node.push_loaded_child(link);
        Ok(self)
    }

    /// Registers `node` and links it under `parent` with a default link.
    pub fn child(&mut self, parent: NodeId, node: Node) -> TreeResult<NodeId> {
        self.child_with(parent, node, |link| link)
    }

    /// Like [`child`](Self::child), with a hook to adjust the link.
    pub fn child_with(
        &mut self,
        parent: NodeId,
        node: Node,
        adjust: impl FnOnce(Link) -> Link,
    ) -> TreeResult<NodeId> {
        let mut link = Link::new(node.node_id);
        if node.is_learning_unit() {
            link.relative_credits = node.credits;
        }
        let order = self.nodes.get(parent).map_or(0, |p| p.children().len());
        let mut link = adjust(link);
        link.order = order;
        let node_id = self.node(node);
        self.link(parent, link)?;
        Ok(node_id)
    }

    pub fn prerequisite(&mut self, node_id: NodeId, prerequisite: Prerequisite) -> TreeResult<&mut Self> {
        let node = self.nodes.get_mut(node_id).ok_or_else(|| DomainError::NodeNotFound {
            path: node_id.to_string(),
        })?;
        if !node.set_prerequisite(prerequisite) {
            return Err(DomainError::InvalidStructure(format!(
                "{} is not a learning unit and cannot hold prerequisites",
                node
            )));
        }
        Ok(self)
    }

    /// Unregisters a node. Links pointing at it from other nodes are removed too.
    pub fn remove(&mut self, node_id: NodeId) -> Option<Node> {
        let removed = self.nodes.remove(node_id)?;
        let parents: Vec<NodeId> = self
            .nodes
            .nodes()
            .filter(|n| n.has_child(node_id))
            .map(|n| n.node_id)
            .collect();
        for parent in parents {
            if let Some(parent) = self.nodes.get_mut(parent) {
                parent.remove_child(node_id);
            }
        }
        Some(removed)
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains(node_id)
    }

    pub fn nodes(&self) -> &NodeArena {
        &self.nodes
    }

    /// Tree of everything reachable from `root`. Fails on a cycle.
    #[instrument(level = "debug", skip(self))]
    pub fn build(&self, root: NodeId) -> TreeResult<ProgramTree> {
        if !self.nodes.contains(root) {
            return Err(DomainError::NodeNotFound {
                path: root.to_string(),
            });
        }
        self.ensure_acyclic(root)?;
        let tree = ProgramTree::from_arena(root, self.nodes.clone(), Arc::clone(&self.relationships))?;
        debug!("built tree {} with {} node(s)", tree.identity(), tree.arena().len());
        Ok(tree)
    }

    fn ensure_acyclic(&self, root: NodeId) -> TreeResult<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Open,
            Done,
        }
        let mut marks: HashMap<NodeId, Mark> = HashMap::new();
        // (node, next child index)
        let mut stack: Vec<(NodeId, usize)> = vec![(root, 0)];
        marks.insert(root, Mark::Open);

        while let Some((current, index)) = stack.pop() {
            let child = self
                .nodes
                .get(current)
                .and_then(|n| n.children().get(index))
                .map(|link| link.child);
            let Some(child) = child else {
                marks.insert(current, Mark::Done);
                continue;
            };
            stack.push((current, index + 1));
            match marks.get(&child) {
                Some(Mark::Open) => {
                    let label = self
                        .nodes
                        .get(child)
                        .map_or_else(|| child.to_string(), |n| n.to_string());
                    return Err(DomainError::InvalidStructure(format!("cycle through {}", label)));
                }
                Some(Mark::Done) => {}
                None => {
                    marks.insert(child, Mark::Open);
                    stack.push((child, 0));
                }
            }
        }
        Ok(())
    }
}
