//! Business-rule validators and the two-phase lists that group them per action.
//!
//! A validator reports business failures as [`DomainError::Business`]; any
//! other error (lookup failure, repository failure) is fatal and stops the run.

mod authorized_relationship;
mod delete;
mod detach;
mod editable_year;
mod finality;
mod link;
mod lists;
mod prerequisite;
mod recursion;

use std::collections::HashSet;

use tracing::debug;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::message::Violations;
use crate::domain::node::{Node, NodeIdentity};
use crate::domain::prerequisite::PrerequisiteGrammar;
use crate::domain::program_tree::ProgramTree;
use crate::domain::repository::{ProgramTreeRepository, TreeSearch};

pub use authorized_relationship::{
    AttachAuthorizedRelationshipValidator, AuthorizedRelationshipForAllTreesValidator,
    DetachAuthorizedRelationshipValidator,
};
pub use delete::{EmptyProgramTreeValidator, NodeHaveLinkValidator};
pub use detach::{DetachRootValidator, IsPrerequisiteValidator};
pub use editable_year::MinimumEditableYearValidator;
pub use finality::{DetachOptionValidator, FinalitiesEndDateAndOptionsValidator};
pub use link::{
    AuthorizedLinkTypeValidator, BlockValidator, CreateLinkValidator, RelativeCreditsValidator,
    SelfAttachValidator,
};
pub use lists::{
    attach_validators, check_paste_validators, delete_validators, detach_validators,
    update_link_validators, update_prerequisite_validators,
};
pub use prerequisite::{
    PrerequisiteItemsValidator, PrerequisiteRootTypeValidator, PrerequisiteSyntaxValidator,
};
pub use recursion::InfiniteRecursionValidator;

/// Collaborators and settings a validator run may consult.
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    pub repository: &'a dyn ProgramTreeRepository,
    /// Trees whose root year is lower are read-only. `None` disables the rule.
    pub minimum_editable_year: Option<i32>,
    pub grammar: &'a PrerequisiteGrammar,
}

impl<'a> ValidationContext<'a> {
    pub fn new(repository: &'a dyn ProgramTreeRepository, grammar: &'a PrerequisiteGrammar) -> Self {
        Self {
            repository,
            minimum_editable_year: None,
            grammar,
        }
    }

    pub fn with_minimum_editable_year(mut self, year: Option<i32>) -> Self {
        self.minimum_editable_year = year;
        self
    }

    /// Stored trees in which `identity` occurs, except the one being edited.
    pub(crate) fn trees_using(
        &self,
        identity: &NodeIdentity,
        working: &ProgramTree,
    ) -> DomainResult<Vec<ProgramTree>> {
        let working_identity = working.identity();
        Ok(self
            .repository
            .search(&TreeSearch::UsingNode(identity.clone()))?
            .into_iter()
            .filter(|tree| tree.identity() != working_identity)
            .collect())
    }
}

/// One business rule. Never mutates its inputs.
pub trait BusinessValidator {
    fn validate(&self) -> DomainResult<()>;

    fn name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

/// Validators for one business action, run in two phases.
///
/// Phase one (data contract) failures skip phase two entirely. Within a
/// phase every validator runs and all violations are returned together.
#[derive(Default)]
pub struct ValidatorList<'a> {
    data_contract: Vec<Box<dyn BusinessValidator + 'a>>,
    invariants: Vec<Box<dyn BusinessValidator + 'a>>,
}

impl<'a> ValidatorList<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_contract(mut self, validator: impl BusinessValidator + 'a) -> Self {
        self.data_contract.push(Box::new(validator));
        self
    }

    pub fn invariant(mut self, validator: impl BusinessValidator + 'a) -> Self {
        self.invariants.push(Box::new(validator));
        self
    }

    pub fn invariant_if(self, condition: bool, validator: impl BusinessValidator + 'a) -> Self {
        if condition {
            self.invariant(validator)
        } else {
            self
        }
    }

    pub fn len(&self) -> usize {
        self.data_contract.len() + self.invariants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of the registered validators, data contract first.
    pub fn names(&self) -> Vec<&'static str> {
        self.data_contract
            .iter()
            .chain(self.invariants.iter())
            .map(|v| v.name())
            .collect()
    }

    pub fn validate(self) -> DomainResult<()> {
        let violations = run_phase(&self.data_contract)?;
        if !violations.is_empty() {
            debug!("data contract failed, {} violation(s)", violations.len());
            return Err(violations.into());
        }
        let violations = run_phase(&self.invariants)?;
        if !violations.is_empty() {
            debug!("invariants failed, {} violation(s)", violations.len());
        }
        violations.into_result().map_err(DomainError::from)
    }
}

fn run_phase(validators: &[Box<dyn BusinessValidator + '_>]) -> DomainResult<Violations> {
    let mut collected = Violations::new();
    for validator in validators {
        match validator.validate() {
            Ok(()) => {}
            Err(DomainError::Business(violations)) => {
                debug!("{} rejected: {}", validator.name(), violations);
                collected.extend(violations);
            }
            Err(fatal) => return Err(fatal),
        }
    }
    Ok(collected)
}

pub(crate) fn identities<'n>(nodes: impl IntoIterator<Item = &'n Node>) -> HashSet<NodeIdentity> {
    nodes.into_iter().map(|n| n.identity()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::Violation;

    struct Fails(Violation);
    impl BusinessValidator for Fails {
        fn validate(&self) -> DomainResult<()> {
            Err(self.0.clone().into())
        }
    }

    struct Passes;
    impl BusinessValidator for Passes {
        fn validate(&self) -> DomainResult<()> {
            Ok(())
        }
    }

    struct Fatal;
    impl BusinessValidator for Fatal {
        fn validate(&self) -> DomainResult<()> {
            Err(DomainError::InvalidPath("boom".into()))
        }
    }

    fn block(value: &str) -> Violation {
        Violation::InvalidBlockValue { value: value.into() }
    }

    #[test]
    fn given_failing_data_contract_when_validating_then_invariants_are_skipped() {
        let list = ValidatorList::new()
            .data_contract(Fails(block("7")))
            .data_contract(Fails(block("21")))
            .invariant(Fatal);

        let err = list.validate().unwrap_err();

        let violations = err.violations().unwrap();
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn given_several_failing_invariants_when_validating_then_all_collected() {
        let list = ValidatorList::new()
            .data_contract(Passes)
            .invariant(Fails(block("0")))
            .invariant(Passes)
            .invariant(Fails(Violation::RelativeCreditsOutOfRange { value: -1 }));

        let err = list.validate().unwrap_err();

        assert_eq!(err.violations().unwrap().len(), 2);
    }

    #[test]
    fn given_fatal_error_when_validating_then_propagated_as_is() {
        let list = ValidatorList::new().invariant(Fails(block("0"))).invariant(Fatal);

        let err = list.validate().unwrap_err();

        assert!(matches!(err, DomainError::InvalidPath(_)));
    }

    #[test]
    fn given_validator_when_asking_name_then_short_type_name() {
        assert_eq!(Passes.name(), "Passes");
    }
}
