use itertools::Itertools;

use crate::domain::error::DomainResult;
use crate::domain::message::Violation;
use crate::domain::node::Node;
use crate::domain::path::Path;
use crate::domain::program_tree::ProgramTree;
use crate::domain::validators::{identities, BusinessValidator};

pub struct DetachRootValidator<'a> {
    tree: &'a ProgramTree,
    path: &'a Path,
}

impl<'a> DetachRootValidator<'a> {
    pub fn new(tree: &'a ProgramTree, path: &'a Path) -> Self {
        Self { tree, path }
    }
}

impl BusinessValidator for DetachRootValidator<'_> {
    fn validate(&self) -> DomainResult<()> {
        if self.path.is_root() {
            return Err(Violation::CannotDetachRootNode {
                root: self.tree.root_node().to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// A learning unit leaving the tree must not be the prerequisite of one that stays.
///
/// Units still reachable through another occurrence do not leave the tree, so
/// detaching one occurrence of a reused unit is allowed.
pub struct IsPrerequisiteValidator<'a> {
    tree: &'a ProgramTree,
    parent: &'a Node,
    child: &'a Node,
}

impl<'a> IsPrerequisiteValidator<'a> {
    pub fn new(tree: &'a ProgramTree, parent: &'a Node, child: &'a Node) -> Self {
        Self {
            tree,
            parent,
            child,
        }
    }
}

impl BusinessValidator for IsPrerequisiteValidator<'_> {
    fn validate(&self) -> DomainResult<()> {
        let after = self.tree.without_link(self.parent.node_id, self.child.node_id);
        let remaining = identities(after.get_all_learning_units());
        let leaving: Vec<&Node> = self
            .tree
            .get_all_learning_units()
            .into_iter()
            .filter(|unit| !remaining.contains(&unit.identity()))
            .collect();

        let mut prerequisite_codes = Vec::new();
        let mut holders = Vec::new();
        for unit in leaving {
            let dependents: Vec<&Node> = after
                .get_nodes_that_have_prerequisites()
                .into_iter()
                .filter(|n| n.prerequisite().is_some_and(|p| p.contains(&unit.code, unit.year)))
                .collect();
            if !dependents.is_empty() {
                prerequisite_codes.push(unit.code.clone());
                holders.extend(dependents.into_iter().map(|n| n.code.clone()));
            }
        }
        if prerequisite_codes.is_empty() {
            return Ok(());
        }

        let violation = if self.child.is_learning_unit() {
            Violation::CannotDetachLearningUnitWhoIsPrerequisite {
                code: self.child.code.clone(),
                prerequisite_of: holders.into_iter().sorted().dedup().join(", "),
            }
        } else {
            Violation::CannotDetachChildrenWhoArePrerequisite {
                node: self.child.to_string(),
                codes: prerequisite_codes.into_iter().sorted().dedup().join(", "),
            }
        };
        Err(violation.into())
    }
}
