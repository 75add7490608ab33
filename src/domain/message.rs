//! Messages handed back to callers and the typed business violations behind them.

use std::fmt;

use itertools::Itertools;
use thiserror::Error;

/// Severity of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageLevel {
    Error,
    Warning,
    Success,
    Info,
}

/// A (text, severity) pair. Rendering is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub level: MessageLevel,
}

impl Message {
    pub fn new(text: impl Into<String>, level: MessageLevel) -> Self {
        Self {
            text: text.into(),
            level,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, MessageLevel::Error)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(text, MessageLevel::Warning)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(text, MessageLevel::Success)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(text, MessageLevel::Info)
    }

    pub fn is_error(&self) -> bool {
        self.level == MessageLevel::Error
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// One violated business rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("Cannot attach \"{node}\" to itself")]
    CannotPasteNodeToHimself { node: String },

    #[error("Cannot attach \"{node}\": it contains {ancestors} which is already one of its parents")]
    CannotAttachParentNode { node: String, ancestors: String },

    #[error("Cannot add a child to the learning unit \"{parent}\"")]
    CannotAttachToLearningUnit { parent: String },

    #[error("\"{child}\" is already attached to \"{parent}\"")]
    CannotAttachSameChildToParent { child: String, parent: String },

    #[error("Cannot attach \"{child}\" to \"{parent}\": they belong to different academic years")]
    CannotAttachNodeOfAnotherYear { child: String, parent: String },

    #[error("The type {child_type} is not authorized as child of \"{parent}\" ({parent_type})")]
    ChildTypeNotAuthorized {
        parent: String,
        parent_type: String,
        child_type: String,
    },

    #[error("\"{parent}\" already contains the maximum of {max} child(ren) of type {child_type}")]
    MaximumChildTypesReached {
        parent: String,
        child_type: String,
        max: usize,
    },

    #[error("\"{parent}\" must contain at least {min} child(ren) of type {child_type}")]
    MinimumChildTypesNotRespected {
        parent: String,
        child_type: String,
        min: usize,
    },

    #[error("Cannot detach the root node \"{root}\" of its own program tree")]
    CannotDetachRootNode { root: String },

    #[error("Cannot detach \"{code}\": it is a prerequisite of {prerequisite_of}")]
    CannotDetachLearningUnitWhoIsPrerequisite { code: String, prerequisite_of: String },

    #[error("Cannot detach \"{node}\": its children {codes} are prerequisites in the program")]
    CannotDetachChildrenWhoArePrerequisite { node: String, codes: String },

    #[error("Cannot detach option(s) {options}: still used in finality {finalities}")]
    CannotDetachOptionUsedInFinality { options: String, finalities: String },

    #[error("Program trees of {year} are read-only: the minimum editable year is {minimum}")]
    MinimumEditableYear { year: i32, minimum: i32 },

    #[error("Finality(ies) {finalities} end after the program {program} (end year {program_end})")]
    FinalityEndDateGreaterThan2M {
        finalities: String,
        program: String,
        program_end: i32,
    },

    #[error("Option(s) {options} must be present in the program {program}")]
    OptionNotInParent2M { options: String, program: String },

    #[error("Invalid block value \"{value}\": expected increasing digits between 1 and 6")]
    InvalidBlockValue { value: String },

    #[error("Relative credits must be between 0 and 999 (got {value})")]
    RelativeCreditsOutOfRange { value: i64 },

    #[error("A learning unit cannot be attached as a reference: \"{child}\"")]
    ReferenceLinkNotAllowedWithLearningUnit { child: String },

    #[error("\"{child}\" must be attached as a reference under a {parent_type}")]
    LinkMustBeReference { child: String, parent_type: String },

    #[error("Prerequisite syntax is invalid: \"{expression}\"")]
    InvalidPrerequisiteSyntax { expression: String },

    #[error("Learning unit(s) {codes} not found in the program {program}")]
    PrerequisiteItemNotInProgram { codes: String, program: String },

    #[error("A learning unit cannot be its own prerequisite: {code}")]
    PrerequisiteCannotBeItself { code: String },

    #[error("Prerequisites cannot be edited in the context of a {root_type}")]
    PrerequisiteRootTypeNotAuthorized { root_type: String },

    #[error("The content of the program \"{program}\" is not empty")]
    ProgramTreeNotEmpty { program: String },

    #[error("\"{node}\" has links to another training / mini-training / group")]
    NodeHaveLink { node: String },
}

impl Violation {
    pub fn to_message(&self) -> Message {
        Message::error(self.to_string())
    }
}

/// Every violation raised by one validator list run, in report order.
#[derive(Error, Debug, Clone, PartialEq, Eq, Default)]
#[error("{}", .violations.iter().join("; "))]
pub struct Violations {
    violations: Vec<Violation>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    pub fn extend(&mut self, other: Violations) {
        self.violations.extend(other.violations);
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }

    pub fn contains(&self, predicate: impl Fn(&Violation) -> bool) -> bool {
        self.violations.iter().any(predicate)
    }

    /// Error-level messages, one per violation.
    pub fn messages(&self) -> Vec<Message> {
        self.violations.iter().map(Violation::to_message).collect()
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), Violations> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<Violation> for Violations {
    fn from(violation: Violation) -> Self {
        Self {
            violations: vec![violation],
        }
    }
}

impl FromIterator<Violation> for Violations {
    fn from_iter<I: IntoIterator<Item = Violation>>(iter: I) -> Self {
        Self {
            violations: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Violations {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_collected_violations_when_converted_then_keeps_order_and_error_level() {
        let violations: Violations = vec![
            Violation::InvalidBlockValue {
                value: "17".into(),
            },
            Violation::RelativeCreditsOutOfRange { value: -1 },
        ]
        .into_iter()
        .collect();

        let messages = violations.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(Message::is_error));
        assert!(messages[0].text.contains("17"));
        assert!(messages[1].text.contains("-1"));
    }

    #[test]
    fn given_no_violation_when_into_result_then_ok() {
        assert!(Violations::new().into_result().is_ok());
    }
}
