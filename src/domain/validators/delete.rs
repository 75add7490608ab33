use crate::domain::error::DomainResult;
use crate::domain::message::Violation;
use crate::domain::program_tree::ProgramTree;
use crate::domain::validators::{BusinessValidator, ValidationContext};

/// Only groups may remain below the root of a tree being deleted.
pub struct EmptyProgramTreeValidator<'a> {
    tree: &'a ProgramTree,
}

impl<'a> EmptyProgramTreeValidator<'a> {
    pub fn new(tree: &'a ProgramTree) -> Self {
        Self { tree }
    }
}

impl BusinessValidator for EmptyProgramTreeValidator<'_> {
    fn validate(&self) -> DomainResult<()> {
        let root_id = self.tree.root_id();
        let has_content = self
            .tree
            .get_all_nodes()
            .into_iter()
            .any(|n| n.node_id != root_id && !n.is_group());
        if has_content {
            return Err(Violation::ProgramTreeNotEmpty {
                program: self.tree.root_node().to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// The root must not be used by another stored tree.
pub struct NodeHaveLinkValidator<'a> {
    tree: &'a ProgramTree,
    ctx: ValidationContext<'a>,
}

impl<'a> NodeHaveLinkValidator<'a> {
    pub fn new(tree: &'a ProgramTree, ctx: ValidationContext<'a>) -> Self {
        Self { tree, ctx }
    }
}

impl BusinessValidator for NodeHaveLinkValidator<'_> {
    fn validate(&self) -> DomainResult<()> {
        let root = self.tree.root_node();
        if self.ctx.trees_using(&root.identity(), self.tree)?.is_empty() {
            return Ok(());
        }
        Err(Violation::NodeHaveLink {
            node: root.to_string(),
        }
        .into())
    }
}
