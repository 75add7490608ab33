use std::collections::HashMap;

use itertools::Itertools;

use crate::domain::error::DomainResult;
use crate::domain::link::LinkType;
use crate::domain::message::{Violation, Violations};
use crate::domain::node::Node;
use crate::domain::node_type::NodeType;
use crate::domain::program_tree::ProgramTree;
use crate::domain::validators::{BusinessValidator, ValidationContext};

/// Types a link to `child` contributes to its parent: the child's own type,
/// or its flattened children types when the link is a REFERENCE.
fn contributed_types(tree: &ProgramTree, child: &Node, link_type: LinkType) -> Vec<NodeType> {
    if link_type.is_reference() {
        tree.get_children_types(child.node_id, true)
    } else {
        vec![child.node_type()]
    }
}

fn counts(types: Vec<NodeType>) -> HashMap<NodeType, usize> {
    types.into_iter().counts()
}

/// Checks `added` against the maximum counts of `parent`. With
/// `require_authorized`, a type with no table entry is rejected as well.
fn check_maximums(
    tree: &ProgramTree,
    parent: &Node,
    added: &HashMap<NodeType, usize>,
    require_authorized: bool,
) -> Violations {
    let existing = counts(tree.get_children_types(parent.node_id, true));
    let relationships = tree.authorized_relationships();
    let mut violations = Violations::new();
    for (child_type, added_count) in added.iter().sorted_by_key(|(t, _)| **t) {
        match relationships.get(parent.node_type(), *child_type) {
            None if require_authorized => violations.push(Violation::ChildTypeNotAuthorized {
                parent: parent.to_string(),
                parent_type: parent.node_type().to_string(),
                child_type: child_type.to_string(),
            }),
            None => {}
            Some(rel) => {
                let current = existing.get(child_type).copied().unwrap_or(0);
                if let Some(max) = rel.max_count_authorized {
                    if current + added_count > max {
                        violations.push(Violation::MaximumChildTypesReached {
                            parent: parent.to_string(),
                            child_type: child_type.to_string(),
                            max,
                        });
                    }
                }
            }
        }
    }
    violations
}

/// The parent type must accept every type the new link brings, within the maximum counts.
pub struct AttachAuthorizedRelationshipValidator<'a> {
    tree: &'a ProgramTree,
    parent: &'a Node,
    child: &'a Node,
    link_type: LinkType,
}

impl<'a> AttachAuthorizedRelationshipValidator<'a> {
    pub fn new(tree: &'a ProgramTree, parent: &'a Node, child: &'a Node, link_type: LinkType) -> Self {
        Self {
            tree,
            parent,
            child,
            link_type,
        }
    }
}

impl BusinessValidator for AttachAuthorizedRelationshipValidator<'_> {
    fn validate(&self) -> DomainResult<()> {
        let added = counts(contributed_types(self.tree, self.child, self.link_type));
        Ok(check_maximums(self.tree, self.parent, &added, true).into_result()?)
    }
}

/// Nodes holding a REFERENCE link to the parent see its new children as their
/// own: their maximum counts apply too, in this tree and in every stored tree
/// using the parent.
pub struct AuthorizedRelationshipForAllTreesValidator<'a> {
    tree: &'a ProgramTree,
    parent: &'a Node,
    child: &'a Node,
    link_type: LinkType,
    ctx: ValidationContext<'a>,
}

impl<'a> AuthorizedRelationshipForAllTreesValidator<'a> {
    pub fn new(
        tree: &'a ProgramTree,
        parent: &'a Node,
        child: &'a Node,
        link_type: LinkType,
        ctx: ValidationContext<'a>,
    ) -> Self {
        Self {
            tree,
            parent,
            child,
            link_type,
            ctx,
        }
    }
}

impl BusinessValidator for AuthorizedRelationshipForAllTreesValidator<'_> {
    fn validate(&self) -> DomainResult<()> {
        let added = counts(contributed_types(self.tree, self.child, self.link_type));
        let others = self.ctx.trees_using(&self.parent.identity(), self.tree)?;

        let mut violations = Violations::new();
        for tree in std::iter::once(self.tree).chain(others.iter()) {
            for grand_parent in tree.get_parents_using_node_as_reference(self.parent.node_id) {
                violations.extend(check_maximums(tree, grand_parent, &added, false));
            }
        }
        Ok(violations.into_result()?)
    }
}

/// Removing a branch must not drop the parent below a minimum count.
pub struct DetachAuthorizedRelationshipValidator<'a> {
    tree: &'a ProgramTree,
    parent: &'a Node,
    child: &'a Node,
}

impl<'a> DetachAuthorizedRelationshipValidator<'a> {
    pub fn new(tree: &'a ProgramTree, parent: &'a Node, child: &'a Node) -> Self {
        Self {
            tree,
            parent,
            child,
        }
    }
}

impl BusinessValidator for DetachAuthorizedRelationshipValidator<'_> {
    fn validate(&self) -> DomainResult<()> {
        if self.child.is_learning_unit() {
            return Ok(());
        }
        let link_type = self
            .parent
            .get_link(self.child.node_id)
            .map(|link| link.link_type)
            .unwrap_or_default();
        let removed = counts(contributed_types(self.tree, self.child, link_type));
        let existing = counts(self.tree.get_children_types(self.parent.node_id, true));
        let relationships = self.tree.authorized_relationships();

        let mut violations = Violations::new();
        for (child_type, removed_count) in removed.iter().sorted_by_key(|(t, _)| **t) {
            let Some(rel) = relationships.get(self.parent.node_type(), *child_type) else {
                continue;
            };
            let remaining = existing
                .get(child_type)
                .copied()
                .unwrap_or(0)
                .saturating_sub(*removed_count);
            if remaining < rel.min_count_authorized {
                violations.push(Violation::MinimumChildTypesNotRespected {
                    parent: self.parent.to_string(),
                    child_type: child_type.to_string(),
                    min: rel.min_count_authorized,
                });
            }
        }
        Ok(violations.into_result()?)
    }
}
