//! Storage port consumed by tree operations for cross-tree lookups.
//!
//! The domain never reads storage directly: validators that need other trees
//! (ancestor search, reused subtrees, finality checks) go through this trait.

use crate::domain::error::DomainResult;
use crate::domain::node::NodeIdentity;
use crate::domain::program_tree::ProgramTree;

/// A program tree is identified by the (code, year) of its root node.
pub type ProgramTreeIdentity = NodeIdentity;

/// Filters accepted by [`ProgramTreeRepository::search`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeSearch {
    /// Every registered program tree.
    Roots,
    /// Registered program trees in which the node occurs, as root or anywhere below.
    UsingNode(NodeIdentity),
}

pub trait ProgramTreeRepository: Send + Sync {
    /// Materialises the tree rooted at the node with this identity, if stored.
    fn get(&self, identity: &ProgramTreeIdentity) -> DomainResult<Option<ProgramTree>>;

    fn search(&self, filter: &TreeSearch) -> DomainResult<Vec<ProgramTree>>;

    /// Registers a new program tree. Fails if one already exists with this identity.
    fn create(&self, tree: &ProgramTree) -> DomainResult<()>;

    /// Persists the nodes, links and prerequisites of the tree.
    fn update(&self, tree: &ProgramTree) -> DomainResult<()>;

    fn delete(&self, identity: &ProgramTreeIdentity) -> DomainResult<()>;
}
