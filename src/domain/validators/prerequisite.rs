use itertools::Itertools;

use crate::domain::error::DomainResult;
use crate::domain::message::{Violation, Violations};
use crate::domain::node::Node;
use crate::domain::prerequisite::PrerequisiteGrammar;
use crate::domain::program_tree::ProgramTree;
use crate::domain::validators::BusinessValidator;

pub struct PrerequisiteSyntaxValidator<'a> {
    expression: &'a str,
    grammar: &'a PrerequisiteGrammar,
}

impl<'a> PrerequisiteSyntaxValidator<'a> {
    pub fn new(expression: &'a str, grammar: &'a PrerequisiteGrammar) -> Self {
        Self {
            expression,
            grammar,
        }
    }
}

impl BusinessValidator for PrerequisiteSyntaxValidator<'_> {
    fn validate(&self) -> DomainResult<()> {
        if self.grammar.is_valid(self.expression) {
            return Ok(());
        }
        Err(Violation::InvalidPrerequisiteSyntax {
            expression: self.expression.to_string(),
        }
        .into())
    }
}

/// Prerequisites are edited in the context of a training or mini-training only.
pub struct PrerequisiteRootTypeValidator<'a> {
    tree: &'a ProgramTree,
}

impl<'a> PrerequisiteRootTypeValidator<'a> {
    pub fn new(tree: &'a ProgramTree) -> Self {
        Self { tree }
    }
}

impl BusinessValidator for PrerequisiteRootTypeValidator<'_> {
    fn validate(&self) -> DomainResult<()> {
        let root = self.tree.root_node();
        if root.is_training() || root.is_mini_training() {
            return Ok(());
        }
        Err(Violation::PrerequisiteRootTypeNotAuthorized {
            root_type: root.node_type().to_string(),
        }
        .into())
    }
}

/// Every referenced code is a learning unit of the tree, and never the target itself.
pub struct PrerequisiteItemsValidator<'a> {
    tree: &'a ProgramTree,
    expression: &'a str,
    node: &'a Node,
    grammar: &'a PrerequisiteGrammar,
}

impl<'a> PrerequisiteItemsValidator<'a> {
    pub fn new(
        tree: &'a ProgramTree,
        expression: &'a str,
        node: &'a Node,
        grammar: &'a PrerequisiteGrammar,
    ) -> Self {
        Self {
            tree,
            expression,
            node,
            grammar,
        }
    }
}

impl BusinessValidator for PrerequisiteItemsValidator<'_> {
    fn validate(&self) -> DomainResult<()> {
        let prerequisite = self.grammar.parse(self.expression, self.node.year)?;
        let codes: Vec<&str> = prerequisite
            .get_all_prerequisite_items()
            .into_iter()
            .map(|item| item.code.as_str())
            .collect();

        let mut violations = Violations::new();
        let permitted = self.tree.get_codes_permitted_as_prerequisite();
        let unknown: Vec<&str> = codes
            .iter()
            .copied()
            .filter(|code| permitted.binary_search_by(|p| p.as_str().cmp(*code)).is_err())
            .unique()
            .collect();
        if !unknown.is_empty() {
            violations.push(Violation::PrerequisiteItemNotInProgram {
                codes: unknown.join(", "),
                program: self.tree.root_node().to_string(),
            });
        }
        if codes.contains(&self.node.code.as_str()) {
            violations.push(Violation::PrerequisiteCannotBeItself {
                code: self.node.code.clone(),
            });
        }
        Ok(violations.into_result()?)
    }
}
