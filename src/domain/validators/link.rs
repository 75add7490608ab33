use crate::domain::error::DomainResult;
use crate::domain::link::{Block, LinkType, MAX_RELATIVE_CREDITS};
use crate::domain::message::{Violation, Violations};
use crate::domain::node::Node;
use crate::domain::validators::BusinessValidator;

/// A node cannot be attached under itself.
pub struct SelfAttachValidator<'a> {
    parent: &'a Node,
    child: &'a Node,
}

impl<'a> SelfAttachValidator<'a> {
    pub fn new(parent: &'a Node, child: &'a Node) -> Self {
        Self { parent, child }
    }
}

impl BusinessValidator for SelfAttachValidator<'_> {
    fn validate(&self) -> DomainResult<()> {
        if self.parent.identity() == self.child.identity() {
            return Err(Violation::CannotPasteNodeToHimself {
                node: self.child.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Block must be a strictly increasing run of digits 1 to 6.
pub struct BlockValidator<'a> {
    block: Option<&'a str>,
}

impl<'a> BlockValidator<'a> {
    pub fn new(block: Option<&'a str>) -> Self {
        Self { block }
    }
}

impl BusinessValidator for BlockValidator<'_> {
    fn validate(&self) -> DomainResult<()> {
        match self.block.map(str::trim) {
            None | Some("") => Ok(()),
            Some(raw) => raw.parse::<Block>().map(|_| ()).map_err(Into::into),
        }
    }
}

pub struct RelativeCreditsValidator {
    relative_credits: Option<i64>,
}

impl RelativeCreditsValidator {
    pub fn new(relative_credits: Option<i64>) -> Self {
        Self { relative_credits }
    }
}

impl BusinessValidator for RelativeCreditsValidator {
    fn validate(&self) -> DomainResult<()> {
        match self.relative_credits {
            Some(value) if !(0..=MAX_RELATIVE_CREDITS).contains(&value) => {
                Err(Violation::RelativeCreditsOutOfRange { value }.into())
            }
            _ => Ok(()),
        }
    }
}

/// Structural preconditions of any new link: container parent, no duplicate
/// child, same academic year.
pub struct CreateLinkValidator<'a> {
    parent: &'a Node,
    child: &'a Node,
}

impl<'a> CreateLinkValidator<'a> {
    pub fn new(parent: &'a Node, child: &'a Node) -> Self {
        Self { parent, child }
    }
}

impl BusinessValidator for CreateLinkValidator<'_> {
    fn validate(&self) -> DomainResult<()> {
        let mut violations = Violations::new();
        if self.parent.is_learning_unit() {
            violations.push(Violation::CannotAttachToLearningUnit {
                parent: self.parent.to_string(),
            });
        }
        if self.parent.has_child(self.child.node_id) {
            violations.push(Violation::CannotAttachSameChildToParent {
                child: self.child.to_string(),
                parent: self.parent.to_string(),
            });
        }
        if self.parent.year != self.child.year {
            violations.push(Violation::CannotAttachNodeOfAnotherYear {
                child: self.child.to_string(),
                parent: self.parent.to_string(),
            });
        }
        Ok(violations.into_result()?)
    }
}

/// REFERENCE is forbidden for learning units and required for minors and
/// deepenings under a minor/major list choice.
pub struct AuthorizedLinkTypeValidator<'a> {
    parent: &'a Node,
    child: &'a Node,
    link_type: LinkType,
}

impl<'a> AuthorizedLinkTypeValidator<'a> {
    pub fn new(parent: &'a Node, child: &'a Node, link_type: LinkType) -> Self {
        Self {
            parent,
            child,
            link_type,
        }
    }
}

impl BusinessValidator for AuthorizedLinkTypeValidator<'_> {
    fn validate(&self) -> DomainResult<()> {
        if self.child.is_learning_unit() && self.link_type.is_reference() {
            return Err(Violation::ReferenceLinkNotAllowedWithLearningUnit {
                child: self.child.to_string(),
            }
            .into());
        }
        if self.parent.is_minor_major_list_choice()
            && self.child.is_minor_or_deepening()
            && !self.link_type.is_reference()
        {
            return Err(Violation::LinkMustBeReference {
                child: self.child.to_string(),
                parent_type: self.parent.node_type().to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::node_type::{GroupType, MiniTrainingType, NodeType};

    fn group(id: i64, group_type: GroupType) -> Node {
        Node::new(id, format!("LGRP{id}G"), 2024, group_type.into())
    }

    #[rstest]
    #[case(None, true)]
    #[case(Some(""), true)]
    #[case(Some("136"), true)]
    #[case(Some("31"), false)]
    #[case(Some("7"), false)]
    #[case(Some("1a"), false)]
    fn given_block_when_validating_then_only_increasing_digits_pass(
        #[case] block: Option<&str>,
        #[case] ok: bool,
    ) {
        assert_eq!(BlockValidator::new(block).validate().is_ok(), ok);
    }

    #[rstest]
    #[case(Some(-1), false)]
    #[case(Some(0), true)]
    #[case(Some(999), true)]
    #[case(Some(1000), false)]
    #[case(None, true)]
    fn given_relative_credits_when_validating_then_bounded(#[case] value: Option<i64>, #[case] ok: bool) {
        assert_eq!(RelativeCreditsValidator::new(value).validate().is_ok(), ok);
    }

    #[test]
    fn given_learning_unit_parent_of_other_year_when_creating_link_then_both_reported() {
        let parent = Node::new(1, "LDROI1001", 2024, NodeType::LearningUnit);
        let child = Node::new(2, "LDROI1002", 2023, NodeType::LearningUnit);

        let err = CreateLinkValidator::new(&parent, &child).validate().unwrap_err();

        assert_eq!(err.violations().unwrap().len(), 2);
    }

    #[test]
    fn given_minor_under_minor_list_when_normal_link_then_reference_required() {
        let parent = group(1, GroupType::MinorListChoice);
        let minor = Node::new(2, "LMIN100I", 2024, MiniTrainingType::OpenMinor.into());

        let normal = AuthorizedLinkTypeValidator::new(&parent, &minor, LinkType::Normal).validate();
        let reference = AuthorizedLinkTypeValidator::new(&parent, &minor, LinkType::Reference).validate();

        assert!(normal
            .unwrap_err()
            .violations()
            .unwrap()
            .contains(|v| matches!(v, Violation::LinkMustBeReference { .. })));
        assert!(reference.is_ok());
    }

    #[test]
    fn given_learning_unit_when_reference_link_then_rejected() {
        let parent = group(1, GroupType::CommonCore);
        let unit = Node::new(2, "LDROI1001", 2024, NodeType::LearningUnit);

        let result = AuthorizedLinkTypeValidator::new(&parent, &unit, LinkType::Reference).validate();

        assert!(result.is_err());
    }
}
