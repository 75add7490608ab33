use std::collections::HashSet;

use itertools::Itertools;
use tracing::debug;

use crate::domain::error::DomainResult;
use crate::domain::message::Violation;
use crate::domain::node::{Node, NodeIdentity};
use crate::domain::program_tree::ProgramTree;
use crate::domain::validators::{identities, BusinessValidator, ValidationContext};

/// Rejects an attach that would make a node its own ancestor.
///
/// Ancestors are collected over every occurrence of the parent, in the working
/// tree and in every stored tree reusing it. Descendants include the stored
/// sub-program rooted at the child, if any.
pub struct InfiniteRecursionValidator<'a> {
    tree: &'a ProgramTree,
    parent: &'a Node,
    child: &'a Node,
    ctx: ValidationContext<'a>,
}

impl<'a> InfiniteRecursionValidator<'a> {
    pub fn new(
        tree: &'a ProgramTree,
        parent: &'a Node,
        child: &'a Node,
        ctx: ValidationContext<'a>,
    ) -> Self {
        Self {
            tree,
            parent,
            child,
            ctx,
        }
    }

    fn ancestors(&self) -> DomainResult<HashSet<NodeIdentity>> {
        let others = self.ctx.trees_using(&self.parent.identity(), self.tree)?;
        let mut ancestors = HashSet::new();
        for tree in std::iter::once(self.tree).chain(others.iter()) {
            let Some(parent) = tree.find_node(&self.parent.identity()) else {
                continue;
            };
            for path in tree.paths_of(parent.node_id) {
                ancestors.extend(identities(path.ids().iter().filter_map(|id| tree.node(*id))));
            }
        }
        Ok(ancestors)
    }

    fn descendants(&self) -> DomainResult<HashSet<NodeIdentity>> {
        let mut descendants = identities(self.tree.subtree_nodes(self.child.node_id));
        if let Some(stored) = self.ctx.repository.get(&self.child.identity())? {
            descendants.extend(identities(stored.get_all_nodes()));
        }
        Ok(descendants)
    }
}

impl BusinessValidator for InfiniteRecursionValidator<'_> {
    fn validate(&self) -> DomainResult<()> {
        let ancestors = self.ancestors()?;
        let descendants = self.descendants()?;
        let shared: Vec<&NodeIdentity> = ancestors.intersection(&descendants).sorted().collect();
        if shared.is_empty() {
            return Ok(());
        }
        debug!("recursion through {} node(s)", shared.len());
        Err(Violation::CannotAttachParentNode {
            node: self.child.to_string(),
            ancestors: shared.iter().join(", "),
        }
        .into())
    }
}
