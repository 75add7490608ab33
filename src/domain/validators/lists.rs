//! Validator lists, one per business action.

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::link::LinkParams;
use crate::domain::node::{Node, NodeId};
use crate::domain::path::Path;
use crate::domain::program_tree::ProgramTree;
use crate::domain::validators::{
    AttachAuthorizedRelationshipValidator, AuthorizedLinkTypeValidator,
    AuthorizedRelationshipForAllTreesValidator, BlockValidator, CreateLinkValidator,
    DetachAuthorizedRelationshipValidator, DetachOptionValidator, DetachRootValidator,
    EmptyProgramTreeValidator, FinalitiesEndDateAndOptionsValidator, InfiniteRecursionValidator,
    IsPrerequisiteValidator, MinimumEditableYearValidator, NodeHaveLinkValidator,
    PrerequisiteItemsValidator, PrerequisiteRootTypeValidator, PrerequisiteSyntaxValidator,
    RelativeCreditsValidator, SelfAttachValidator, ValidationContext, ValidatorList,
};

fn staged_child<'a>(tree: &'a ProgramTree, path: &Path, child_id: NodeId) -> DomainResult<&'a Node> {
    tree.node(child_id).ok_or_else(|| DomainError::NodeNotFound {
        path: path.join(child_id).to_string(),
    })
}

/// Attach `child_id` (already staged in `tree`) under the node at `path`.
pub fn attach_validators<'a>(
    tree: &'a ProgramTree,
    path: &Path,
    child_id: NodeId,
    params: &'a LinkParams,
    ctx: ValidationContext<'a>,
) -> DomainResult<ValidatorList<'a>> {
    let parent = tree.get_node(path)?;
    let child = staged_child(tree, path, child_id)?;
    let is_branch = !child.is_learning_unit();

    Ok(ValidatorList::new()
        .data_contract(SelfAttachValidator::new(parent, child))
        .data_contract(BlockValidator::new(params.block.as_deref()))
        .data_contract(RelativeCreditsValidator::new(params.relative_credits))
        .invariant(CreateLinkValidator::new(parent, child))
        .invariant(AttachAuthorizedRelationshipValidator::new(
            tree,
            parent,
            child,
            params.link_type,
        ))
        .invariant(MinimumEditableYearValidator::new(tree, ctx.minimum_editable_year))
        .invariant(InfiniteRecursionValidator::new(tree, parent, child, ctx))
        .invariant(AuthorizedLinkTypeValidator::new(parent, child, params.link_type))
        .invariant_if(
            is_branch,
            FinalitiesEndDateAndOptionsValidator::new(tree, parent, child, ctx),
        )
        .invariant(AuthorizedRelationshipForAllTreesValidator::new(
            tree,
            parent,
            child,
            params.link_type,
            ctx,
        )))
}

/// Lighter attach check used before a paste: no link parameters yet.
pub fn check_paste_validators<'a>(
    tree: &'a ProgramTree,
    path: &Path,
    child_id: NodeId,
    ctx: ValidationContext<'a>,
) -> DomainResult<ValidatorList<'a>> {
    let parent = tree.get_node(path)?;
    let child = staged_child(tree, path, child_id)?;

    Ok(ValidatorList::new()
        .data_contract(SelfAttachValidator::new(parent, child))
        .invariant(CreateLinkValidator::new(parent, child))
        .invariant_if(
            child.is_learning_unit(),
            AttachAuthorizedRelationshipValidator::new(tree, parent, child, Default::default()),
        )
        .invariant(MinimumEditableYearValidator::new(tree, ctx.minimum_editable_year))
        .invariant(InfiniteRecursionValidator::new(tree, parent, child, ctx)))
}

/// Detach the occurrence addressed by `path`. Detaching the root fails in the
/// data-contract phase, so invariants are only registered when a parent exists.
pub fn detach_validators<'a>(
    tree: &'a ProgramTree,
    path: &'a Path,
    ctx: ValidationContext<'a>,
) -> DomainResult<ValidatorList<'a>> {
    let list = ValidatorList::new().data_contract(DetachRootValidator::new(tree, path));
    let Some(parent_path) = path.parent() else {
        return Ok(list);
    };
    let parent = tree.get_node(&parent_path)?;
    let child = tree.get_node(path)?;
    let is_branch = !child.is_learning_unit();

    Ok(list
        .invariant(MinimumEditableYearValidator::new(tree, ctx.minimum_editable_year))
        .invariant_if(
            is_branch,
            DetachAuthorizedRelationshipValidator::new(tree, parent, child),
        )
        .invariant(IsPrerequisiteValidator::new(tree, parent, child))
        .invariant_if(is_branch, DetachOptionValidator::new(tree, parent, child, ctx)))
}

pub fn update_link_validators<'a>(
    tree: &'a ProgramTree,
    path: &Path,
    params: &'a LinkParams,
    _ctx: ValidationContext<'a>,
) -> DomainResult<ValidatorList<'a>> {
    let parent_path = path.parent().ok_or_else(|| DomainError::LinkNotFound {
        path: path.to_string(),
    })?;
    let parent = tree.get_node(&parent_path)?;
    let child = tree.get_node(path)?;

    Ok(ValidatorList::new()
        .data_contract(BlockValidator::new(params.block.as_deref()))
        .data_contract(RelativeCreditsValidator::new(params.relative_credits))
        .invariant(AuthorizedLinkTypeValidator::new(parent, child, params.link_type)))
}

pub fn update_prerequisite_validators<'a>(
    tree: &'a ProgramTree,
    expression: &'a str,
    node: &'a Node,
    ctx: ValidationContext<'a>,
) -> ValidatorList<'a> {
    ValidatorList::new()
        .data_contract(PrerequisiteSyntaxValidator::new(expression, ctx.grammar))
        .invariant(PrerequisiteRootTypeValidator::new(tree))
        .invariant(PrerequisiteItemsValidator::new(tree, expression, node, ctx.grammar))
}

pub fn delete_validators<'a>(tree: &'a ProgramTree, ctx: ValidationContext<'a>) -> ValidatorList<'a> {
    ValidatorList::new()
        .invariant(EmptyProgramTreeValidator::new(tree))
        .invariant(NodeHaveLinkValidator::new(tree, ctx))
}
