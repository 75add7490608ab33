//! Prerequisite expressions: a two-level AND/OR structure over course codes.
//!
//! Grammar, with `A` a course code:
//!
//! ```text
//! expr     := "" | A | multi(ET, OU) | multi(OU, ET)
//! multi(m, s) := element(s) (" " m " " element(s))+
//! element(s)  := A | "(" A (" " s " " A)+ ")"
//! ```
//!
//! Only two nesting levels exist. Mixing operators on one level without
//! parentheses is a syntax error.

use std::fmt;

use itertools::Itertools;
use regex::Regex;
use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::message::Violation;

pub const AND_KEYWORD: &str = "ET";
pub const OR_KEYWORD: &str = "OU";
pub const DEFAULT_COURSE_CODE_PATTERN: &str = r"[BLMWX][A-Z]{2,4}\d{4}[A-Z0-9]?";

/// Keyword set used when rendering an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Keywords {
    /// `ET` / `OU`, the canonical stored form.
    #[default]
    French,
    /// `AND` / `OR`.
    English,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    And,
    Or,
}

impl Operator {
    pub fn other(&self) -> Operator {
        match self {
            Operator::And => Operator::Or,
            Operator::Or => Operator::And,
        }
    }

    pub fn keyword(&self, keywords: Keywords) -> &'static str {
        match (self, keywords) {
            (Operator::And, Keywords::French) => AND_KEYWORD,
            (Operator::Or, Keywords::French) => OR_KEYWORD,
            (Operator::And, Keywords::English) => "AND",
            (Operator::Or, Keywords::English) => "OR",
        }
    }
}

/// A referenced course. Equality is by (code, year).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrerequisiteItem {
    pub code: String,
    pub year: i32,
}

impl PrerequisiteItem {
    pub fn new(code: impl Into<String>, year: i32) -> Self {
        Self {
            code: code.into(),
            year,
        }
    }
}

impl fmt::Display for PrerequisiteItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrerequisiteItemGroup {
    pub operator: Operator,
    pub items: Vec<PrerequisiteItem>,
}

impl PrerequisiteItemGroup {
    pub fn new(operator: Operator, items: Vec<PrerequisiteItem>) -> Self {
        Self { operator, items }
    }

    fn expression(&self, keywords: Keywords) -> String {
        self.items
            .iter()
            .join(&format!(" {} ", self.operator.keyword(keywords)))
    }
}

/// Prerequisite of one learning unit.
///
/// Zero groups is the canonical "no prerequisite" value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prerequisite {
    main_operator: Operator,
    groups: Vec<PrerequisiteItemGroup>,
}

impl Default for Prerequisite {
    fn default() -> Self {
        Self::none()
    }
}

impl Prerequisite {
    /// Every group must use the operator other than `main_operator`.
    pub fn new(main_operator: Operator, groups: Vec<PrerequisiteItemGroup>) -> DomainResult<Self> {
        if let Some(group) = groups
            .iter()
            .find(|g| g.operator != main_operator.other() || g.items.is_empty())
        {
            return Err(DomainError::InvalidStructure(format!(
                "prerequisite group '{}' does not match main operator {:?}",
                group.expression(Keywords::French),
                main_operator
            )));
        }
        Ok(Self {
            main_operator,
            groups,
        })
    }

    pub fn none() -> Self {
        Self {
            main_operator: Operator::And,
            groups: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn main_operator(&self) -> Operator {
        self.main_operator
    }

    pub fn secondary_operator(&self) -> Operator {
        self.main_operator.other()
    }

    pub fn groups(&self) -> &[PrerequisiteItemGroup] {
        &self.groups
    }

    pub fn get_all_prerequisite_items(&self) -> Vec<&PrerequisiteItem> {
        self.groups.iter().flat_map(|g| g.items.iter()).collect()
    }

    pub fn contains(&self, code: &str, year: i32) -> bool {
        self.groups
            .iter()
            .flat_map(|g| g.items.iter())
            .any(|item| item.code == code && item.year == year)
    }

    /// Removes the item everywhere; groups left empty are dropped. Returns whether anything changed.
    pub fn remove_prerequisite_item(&mut self, code: &str, year: i32) -> bool {
        let mut changed = false;
        for group in &mut self.groups {
            let before = group.items.len();
            group.items.retain(|item| !(item.code == code && item.year == year));
            changed |= group.items.len() != before;
        }
        self.groups.retain(|g| !g.items.is_empty());
        changed
    }

    pub fn remove_all_prerequisite_items(&mut self) {
        self.groups.clear();
    }

    /// Canonical rendering. A group is parenthesised only when it has several
    /// items and is not the only group.
    pub fn expression(&self, keywords: Keywords) -> String {
        let several_groups = self.groups.len() > 1;
        self.groups
            .iter()
            .map(|group| {
                let inner = group.expression(keywords);
                if several_groups && group.items.len() > 1 {
                    format!("({inner})")
                } else {
                    inner
                }
            })
            .join(&format!(" {} ", self.main_operator.keyword(keywords)))
    }
}

impl fmt::Display for Prerequisite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression(Keywords::French))
    }
}

/// Regex-backed parser for prerequisite expressions.
#[derive(Debug, Clone)]
pub struct PrerequisiteGrammar {
    syntax: Regex,
    multiple_or: Regex,
    code_pattern: String,
}

impl Default for PrerequisiteGrammar {
    fn default() -> Self {
        Self::new(DEFAULT_COURSE_CODE_PATTERN).expect("default course code pattern is valid")
    }
}

impl PrerequisiteGrammar {
    /// Builds the grammar around a course-code pattern (unanchored regex).
    pub fn new(code_pattern: &str) -> Result<Self, regex::Error> {
        let multiple_and = multiple_regex(code_pattern, AND_KEYWORD, OR_KEYWORD);
        let multiple_or = multiple_regex(code_pattern, OR_KEYWORD, AND_KEYWORD);
        let syntax = Regex::new(&format!(
            "^(?i:|(?:{code_pattern})|{multiple_and}|{multiple_or})$"
        ))?;
        let multiple_or = Regex::new(&format!("^{multiple_or}$"))?;
        Ok(Self {
            syntax,
            multiple_or,
            code_pattern: code_pattern.to_string(),
        })
    }

    pub fn code_pattern(&self) -> &str {
        &self.code_pattern
    }

    pub fn is_valid(&self, expression: &str) -> bool {
        self.syntax.is_match(expression.trim())
    }

    /// Parses an expression; item years are set to `year`.
    #[instrument(level = "debug", skip(self))]
    pub fn parse(&self, expression: &str, year: i32) -> Result<Prerequisite, Violation> {
        let expression = expression.trim();
        if !self.is_valid(expression) {
            return Err(Violation::InvalidPrerequisiteSyntax {
                expression: expression.to_string(),
            });
        }
        if expression.is_empty() {
            return Ok(Prerequisite::none());
        }
        let expression = expression.to_uppercase();

        let main_operator = if self.multiple_or.is_match(&expression) {
            Operator::Or
        } else {
            Operator::And
        };
        let secondary = main_operator.other();
        let main_splitter = format!(" {} ", main_operator.keyword(Keywords::French));
        let secondary_splitter = format!(" {} ", secondary.keyword(Keywords::French));

        let groups = expression
            .split(&main_splitter)
            .map(|segment| {
                let items = segment
                    .replace(['(', ')'], "")
                    .split(&secondary_splitter)
                    .map(|code| PrerequisiteItem::new(code.trim(), year))
                    .collect();
                PrerequisiteItemGroup::new(secondary, items)
            })
            .collect();

        Ok(Prerequisite {
            main_operator,
            groups,
        })
    }

    /// Canonical (French keyword) rendering.
    pub fn format(&self, prerequisite: &Prerequisite) -> String {
        prerequisite.expression(Keywords::French)
    }

    /// Rewrites English keywords to the canonical ones.
    pub fn normalize_expression(expression: &str) -> String {
        expression
            .split(' ')
            .map(|token| {
                if token.eq_ignore_ascii_case("AND") {
                    AND_KEYWORD
                } else if token.eq_ignore_ascii_case("OR") {
                    OR_KEYWORD
                } else {
                    token
                }
            })
            .join(" ")
    }
}

fn element_regex(code_pattern: &str, secondary: &str) -> String {
    format!(r"(?:(?:{code_pattern})|\((?:{code_pattern})(?: {secondary} (?:{code_pattern}))+\))")
}

fn multiple_regex(code_pattern: &str, main: &str, secondary: &str) -> String {
    let element = element_regex(code_pattern, secondary);
    format!("(?:{element}(?: {main} {element})+)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn grammar() -> PrerequisiteGrammar {
        PrerequisiteGrammar::default()
    }

    #[rstest]
    #[case("")]
    #[case("LDROI1001")]
    #[case("LDROI1001 ET LDROI1002")]
    #[case("LDROI1001 OU LDROI1002 OU LDROI1003")]
    #[case("LDROI1001 OU (LDROI1002 ET LDROI1003)")]
    #[case("(LDROI1001 OU LDROI1002) ET (LDROI1003 OU LDROI1004) ET LECGE1120")]
    fn given_canonical_expression_when_parsed_and_formatted_then_round_trips(#[case] expression: &str) {
        let g = grammar();
        let prerequisite = g.parse(expression, 2024).expect("valid expression");
        assert_eq!(g.format(&prerequisite), expression);
    }

    #[rstest]
    #[case("LDROI1001 ET LDROI1002 OU LDROI1003")]
    #[case("(LDROI1001 ET LDROI1002) ET LDROI1003")]
    #[case("(LDROI1001 OU LDROI1002)")]
    #[case("LDROI1001 OU (LDROI1002 OU LDROI1003)")]
    #[case("((LDROI1001 OU LDROI1002) ET LDROI1003) OU LDROI1004")]
    #[case("NOT A CODE")]
    #[case("LDROI1001 ET")]
    fn given_malformed_expression_when_parsed_then_syntax_violation(#[case] expression: &str) {
        assert!(matches!(
            grammar().parse(expression, 2024),
            Err(Violation::InvalidPrerequisiteSyntax { .. })
        ));
    }

    #[test]
    fn given_or_of_and_groups_when_parsed_then_main_operator_is_or() {
        let prerequisite = grammar()
            .parse("LDROI1001 OU (LDROI1002 ET LDROI1003)", 2024)
            .unwrap();

        assert_eq!(prerequisite.main_operator(), Operator::Or);
        assert_eq!(prerequisite.groups().len(), 2);
        assert_eq!(prerequisite.groups()[1].operator, Operator::And);
        assert_eq!(
            prerequisite.groups()[1].items,
            vec![
                PrerequisiteItem::new("LDROI1002", 2024),
                PrerequisiteItem::new("LDROI1003", 2024)
            ]
        );
    }

    #[test]
    fn given_single_code_when_parsed_then_one_and_group() {
        let prerequisite = grammar().parse("LDROI1001", 2024).unwrap();
        assert_eq!(prerequisite.main_operator(), Operator::And);
        assert_eq!(prerequisite.get_all_prerequisite_items().len(), 1);
    }

    #[test]
    fn given_empty_expression_when_parsed_then_no_prerequisite() {
        assert!(grammar().parse("  ", 2024).unwrap().is_empty());
    }

    #[test]
    fn given_lowercase_expression_when_parsed_then_codes_are_uppercased() {
        let prerequisite = grammar().parse("ldroi1001 et ldroi1002", 2024).unwrap();
        assert_eq!(prerequisite.to_string(), "LDROI1001 ET LDROI1002");
    }

    #[test]
    fn given_english_keywords_when_normalized_then_parses() {
        let normalized =
            PrerequisiteGrammar::normalize_expression("LDROI1001 OR (LDROI1002 AND LDROI1003)");
        assert_eq!(normalized, "LDROI1001 OU (LDROI1002 ET LDROI1003)");
        let prerequisite = grammar().parse(&normalized, 2024).unwrap();
        assert_eq!(
            prerequisite.expression(Keywords::English),
            "LDROI1001 OR (LDROI1002 AND LDROI1003)"
        );
    }

    #[rstest]
    #[case("ldroi1001 and ldroi1002", "LDROI1001 ET LDROI1002")]
    #[case("LDROI1001 Or LDROI1002", "LDROI1001 OU LDROI1002")]
    #[case("ldroi1001 or (ldroi1002 and ldroi1003)", "LDROI1001 OU (LDROI1002 ET LDROI1003)")]
    fn given_english_keywords_in_any_case_when_normalized_then_parses(
        #[case] expression: &str,
        #[case] expected: &str,
    ) {
        let normalized = PrerequisiteGrammar::normalize_expression(expression);
        let prerequisite = grammar().parse(&normalized, 2024).expect("valid expression");
        assert_eq!(prerequisite.to_string(), expected);
    }

    #[test]
    fn given_item_removed_when_group_empties_then_group_dropped() {
        let mut prerequisite = grammar()
            .parse("LDROI1001 ET (LDROI1002 OU LDROI1003)", 2024)
            .unwrap();

        assert!(prerequisite.remove_prerequisite_item("LDROI1001", 2024));
        assert_eq!(prerequisite.to_string(), "LDROI1002 OU LDROI1003");
        assert!(!prerequisite.remove_prerequisite_item("LDROI1001", 2024));
    }

    #[test]
    fn given_mismatching_group_operator_when_constructing_then_error() {
        let group = PrerequisiteItemGroup::new(
            Operator::And,
            vec![PrerequisiteItem::new("LDROI1001", 2024)],
        );
        assert!(Prerequisite::new(Operator::And, vec![group]).is_err());
    }
}
