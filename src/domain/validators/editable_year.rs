use crate::domain::error::DomainResult;
use crate::domain::message::Violation;
use crate::domain::program_tree::ProgramTree;
use crate::domain::validators::BusinessValidator;

/// Trees older than the configured cutoff are read-only.
pub struct MinimumEditableYearValidator<'a> {
    tree: &'a ProgramTree,
    minimum: Option<i32>,
}

impl<'a> MinimumEditableYearValidator<'a> {
    pub fn new(tree: &'a ProgramTree, minimum: Option<i32>) -> Self {
        Self { tree, minimum }
    }
}

impl BusinessValidator for MinimumEditableYearValidator<'_> {
    fn validate(&self) -> DomainResult<()> {
        let year = self.tree.root_node().year;
        match self.minimum {
            Some(minimum) if year < minimum => {
                Err(Violation::MinimumEditableYear { year, minimum }.into())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::rstest;

    use super::*;
    use crate::domain::authorized_relationship::AuthorizedRelationshipList;
    use crate::domain::node::Node;
    use crate::domain::node_type::TrainingType;

    #[rstest]
    #[case(None, true)]
    #[case(Some(2023), true)]
    #[case(Some(2024), true)]
    #[case(Some(2025), false)]
    fn given_cutoff_when_validating_2024_tree_then_older_years_rejected(
        #[case] minimum: Option<i32>,
        #[case] ok: bool,
    ) {
        let tree = ProgramTree::new(
            Node::new(1, "LDROI100B", 2024, TrainingType::Bachelor.into()),
            Arc::new(AuthorizedRelationshipList::default()),
        );

        assert_eq!(MinimumEditableYearValidator::new(&tree, minimum).validate().is_ok(), ok);
    }
}
