//! In-memory implementation of the program tree repository port.
//!
//! Nodes and links form one shared DAG across all trees; a node reused by
//! several programs is stored once. Prerequisites belong to a (tree, learning
//! unit) pair and are stored per registered tree.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, instrument};

use crate::domain::{
    AuthorizedRelationshipList, DomainError, DomainResult, Node, NodeId, Prerequisite,
    ProgramTree, ProgramTreeBuilder, ProgramTreeIdentity, ProgramTreeRepository, TreeSearch,
};

/// Prerequisites of one registered tree, keyed by learning unit id.
pub type TreePrerequisites = BTreeMap<NodeId, Prerequisite>;

/// Plain content of a repository, as exchanged with the store file.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub relationships: AuthorizedRelationshipList,
    /// Every stored node with its child links, prerequisites stripped.
    pub nodes: Vec<Node>,
    /// Registered tree roots with their prerequisites.
    pub trees: BTreeMap<NodeId, TreePrerequisites>,
}

struct State {
    graph: ProgramTreeBuilder,
    trees: BTreeMap<NodeId, TreePrerequisites>,
}

pub struct InMemoryProgramTreeRepository {
    state: RwLock<State>,
    relationships: Arc<AuthorizedRelationshipList>,
}

fn strip_prerequisite(node: &Node) -> Node {
    let mut node = node.clone();
    if node.is_learning_unit() {
        node.set_prerequisite(Prerequisite::none());
    }
    node
}

impl InMemoryProgramTreeRepository {
    pub fn new(relationships: AuthorizedRelationshipList) -> Self {
        let relationships = Arc::new(relationships);
        Self {
            state: RwLock::new(State {
                graph: ProgramTreeBuilder::new(Arc::clone(&relationships)),
                trees: BTreeMap::new(),
            }),
            relationships,
        }
    }

    /// Rebuilds a repository from stored content. Links must point at known nodes.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> DomainResult<Self> {
        let repository = Self::new(snapshot.relationships);
        {
            let mut state = repository.write();
            for node in &snapshot.nodes {
                let mut bare = strip_prerequisite(node);
                bare.clear_children();
                state.graph.node(bare);
            }
            for node in &snapshot.nodes {
                for link in node.children() {
                    state.graph.link(node.node_id, link.clone())?;
                }
            }
            for root in snapshot.trees.keys() {
                if !state.graph.contains(*root) {
                    return Err(DomainError::InvalidStructure(format!(
                        "registered tree root {} is not a stored node",
                        root
                    )));
                }
            }
            state.trees = snapshot.trees;
        }
        Ok(repository)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.read();
        let mut nodes: Vec<Node> = state.graph.nodes().nodes().cloned().collect();
        nodes.sort_by_key(|n| n.node_id);
        StoreSnapshot {
            relationships: (*self.relationships).clone(),
            nodes,
            trees: state.trees.clone(),
        }
    }

    pub fn relationships(&self) -> Arc<AuthorizedRelationshipList> {
        Arc::clone(&self.relationships)
    }

    /// Adds or replaces a stored node (its links included).
    pub fn save_node(&self, node: Node) {
        self.write().graph.node(strip_prerequisite(&node));
    }

    pub fn next_node_id(&self) -> NodeId {
        self.read().graph.next_id()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn find_id(state: &State, identity: &ProgramTreeIdentity) -> Option<NodeId> {
        state
            .graph
            .nodes()
            .find_by_identity(identity)
            .map(|n| n.node_id)
    }

    fn materialize(state: &State, root: NodeId) -> DomainResult<ProgramTree> {
        let Some(prerequisites) = state.trees.get(&root).filter(|p| !p.is_empty()) else {
            return state.graph.build(root);
        };
        let mut graph = state.graph.clone();
        for (unit, prerequisite) in prerequisites {
            if graph.contains(*unit) {
                graph.prerequisite(*unit, prerequisite.clone())?;
            }
        }
        graph.build(root)
    }

    fn store(state: &mut State, tree: &ProgramTree) {
        let mut prerequisites = TreePrerequisites::new();
        for node in tree.get_all_nodes() {
            if let Some(prerequisite) = node.prerequisite().filter(|p| !p.is_empty()) {
                prerequisites.insert(node.node_id, prerequisite.clone());
            }
            state.graph.node(strip_prerequisite(node));
        }
        state.trees.insert(tree.root_id(), prerequisites);
    }
}

impl ProgramTreeRepository for InMemoryProgramTreeRepository {
    #[instrument(level = "debug", skip(self))]
    fn get(&self, identity: &ProgramTreeIdentity) -> DomainResult<Option<ProgramTree>> {
        let state = self.read();
        match Self::find_id(&state, identity) {
            Some(root) => Self::materialize(&state, root).map(Some),
            None => Ok(None),
        }
    }

    fn search(&self, filter: &TreeSearch) -> DomainResult<Vec<ProgramTree>> {
        let state = self.read();
        let mut result = Vec::new();
        for root in state.trees.keys() {
            let tree = Self::materialize(&state, *root)?;
            let keep = match filter {
                TreeSearch::Roots => true,
                TreeSearch::UsingNode(identity) => tree.find_node(identity).is_some(),
            };
            if keep {
                result.push(tree);
            }
        }
        debug!("search {:?}: {} tree(s)", filter, result.len());
        Ok(result)
    }

    fn create(&self, tree: &ProgramTree) -> DomainResult<()> {
        let mut state = self.write();
        if state.trees.contains_key(&tree.root_id()) {
            let identity = tree.identity();
            return Err(DomainError::ProgramTreeAlreadyExists {
                code: identity.code,
                year: identity.year,
            });
        }
        Self::store(&mut state, tree);
        Ok(())
    }

    fn update(&self, tree: &ProgramTree) -> DomainResult<()> {
        Self::store(&mut self.write(), tree);
        Ok(())
    }

    /// Unregisters the tree and removes its root plus every descendant no
    /// longer linked from a remaining node.
    fn delete(&self, identity: &ProgramTreeIdentity) -> DomainResult<()> {
        let mut state = self.write();
        let root = Self::find_id(&state, identity).ok_or_else(|| DomainError::ProgramTreeNotFound {
            code: identity.code.clone(),
            year: identity.year,
        })?;
        let candidates: HashSet<NodeId> = state.graph.nodes().reachable_from(root);
        state.trees.remove(&root);
        state.graph.remove(root);

        loop {
            let orphans: Vec<NodeId> = candidates
                .iter()
                .copied()
                .filter(|id| state.graph.contains(*id) && !state.trees.contains_key(id))
                .filter(|id| !state.graph.nodes().nodes().any(|n| n.has_child(*id)))
                .collect();
            if orphans.is_empty() {
                break;
            }
            for id in orphans {
                state.graph.remove(id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GroupType, Link, NodeIdentity, NodeType, TrainingType};

    fn repository() -> InMemoryProgramTreeRepository {
        let mut root = Node::new(1, "LDROI100B", 2024, TrainingType::Bachelor.into());
        root.add_child(Link::new(2));
        let mut core = Node::new(2, "LDROI100T", 2024, GroupType::CommonCore.into());
        core.add_child(Link::new(3));
        let unit = Node::new(3, "LDROI1001", 2024, NodeType::LearningUnit);
        let mut trees = BTreeMap::new();
        trees.insert(1, TreePrerequisites::new());
        InMemoryProgramTreeRepository::from_snapshot(StoreSnapshot {
            relationships: AuthorizedRelationshipList::default(),
            nodes: vec![root, core, unit],
            trees,
        })
        .unwrap()
    }

    #[test]
    fn given_stored_node_when_getting_then_materialized_as_root() {
        let repo = repository();

        let tree = repo.get(&NodeIdentity::new("LDROI100T", 2024)).unwrap().unwrap();

        assert_eq!(tree.root_id(), 2);
        assert_eq!(tree.get_all_nodes().len(), 2);
    }

    #[test]
    fn given_node_when_searching_using_node_then_registered_trees_only() {
        let repo = repository();

        let found = repo
            .search(&TreeSearch::UsingNode(NodeIdentity::new("LDROI1001", 2024)))
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].root_id(), 1);
    }

    #[test]
    fn given_empty_tree_when_deleting_then_orphans_removed() {
        let repo = repository();

        repo.delete(&NodeIdentity::new("LDROI100B", 2024)).unwrap();

        let snapshot = repo.snapshot();
        assert!(snapshot.nodes.is_empty());
        assert!(snapshot.trees.is_empty());
    }
}
