//! Attributed parent→child edges.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::message::{Violation, Violations};
use crate::domain::node::{Node, NodeId};

pub const MAX_RELATIVE_CREDITS: i64 = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkType {
    #[default]
    Normal,
    Reference,
}

impl LinkType {
    pub fn is_reference(&self) -> bool {
        matches!(self, LinkType::Reference)
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkType::Normal => write!(f, "NORMAL"),
            LinkType::Reference => write!(f, "REFERENCE"),
        }
    }
}

impl FromStr for LinkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NORMAL" | "" => Ok(LinkType::Normal),
            "REFERENCE" => Ok(LinkType::Reference),
            other => Err(format!("unknown link type: {other}")),
        }
    }
}

/// Set of study years (1..=6) a child is taught in, as a bitset.
///
/// Textual form is the strictly increasing run of digits, e.g. `"123"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Block(u8);

impl Block {
    pub fn contains(&self, year: u8) -> bool {
        (1..=6).contains(&year) && self.0 & (1 << (year - 1)) != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (1..=6).filter(move |year| self.contains(*year))
    }

    /// Highest study year, 0 for an empty block.
    pub fn max_value(&self) -> u8 {
        self.iter().last().unwrap_or(0)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }
}

impl FromStr for Block {
    type Err = Violation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Violation::InvalidBlockValue {
            value: s.to_string(),
        };
        let mut bits = 0u8;
        let mut previous = 0u8;
        for c in s.trim().chars() {
            let digit = c.to_digit(10).ok_or_else(invalid)? as u8;
            if !(1..=6).contains(&digit) || digit <= previous {
                return Err(invalid());
            }
            bits |= 1 << (digit - 1);
            previous = digit;
        }
        if bits == 0 {
            return Err(invalid());
        }
        Ok(Block(bits))
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for year in self.iter() {
            write!(f, "{year}")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Block {
    type Error = Violation;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Block> for String {
    fn from(value: Block) -> Self {
        value.to_string()
    }
}

/// Edge owned by its parent node; references the child by id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Link {
    pub child: NodeId,
    pub order: usize,
    pub relative_credits: Option<u32>,
    pub min_credits: Option<u32>,
    pub max_credits: Option<u32>,
    pub is_mandatory: bool,
    pub block: Option<Block>,
    pub access_condition: bool,
    pub comment: Option<String>,
    pub comment_english: Option<String>,
    pub link_type: LinkType,
}

impl Link {
    pub fn new(child: NodeId) -> Self {
        Self {
            child,
            is_mandatory: true,
            ..Default::default()
        }
    }

    pub fn is_reference(&self) -> bool {
        self.link_type.is_reference()
    }

    /// Builds a link from raw command values.
    ///
    /// A learning unit child without explicit relative credits inherits its own credits.
    pub fn from_params(child: &Node, params: &LinkParams) -> Result<Link, Violations> {
        let mut violations = Violations::new();
        let block = match params.block.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<Block>() {
                Ok(block) => Some(block),
                Err(violation) => {
                    violations.push(violation);
                    None
                }
            },
        };
        let relative_credits = match params.relative_credits {
            Some(value) if !(0..=MAX_RELATIVE_CREDITS).contains(&value) => {
                violations.push(Violation::RelativeCreditsOutOfRange { value });
                None
            }
            Some(value) => u32::try_from(value).ok(),
            None if child.is_learning_unit() => child.credits,
            None => None,
        };
        violations.into_result()?;

        Ok(Link {
            child: child.node_id,
            order: 0,
            relative_credits,
            min_credits: params.min_credits,
            max_credits: params.max_credits,
            is_mandatory: params.is_mandatory,
            block,
            access_condition: params.access_condition,
            comment: params.comment.clone(),
            comment_english: params.comment_english.clone(),
            link_type: params.link_type,
        })
    }
}

/// Unvalidated link attributes as carried by commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkParams {
    pub relative_credits: Option<i64>,
    pub min_credits: Option<u32>,
    pub max_credits: Option<u32>,
    pub is_mandatory: bool,
    pub block: Option<String>,
    pub access_condition: bool,
    pub comment: Option<String>,
    pub comment_english: Option<String>,
    pub link_type: LinkType,
}

impl Default for LinkParams {
    fn default() -> Self {
        Self {
            relative_credits: None,
            min_credits: None,
            max_credits: None,
            is_mandatory: true,
            block: None,
            access_condition: false,
            comment: None,
            comment_english: None,
            link_type: LinkType::Normal,
        }
    }
}

impl LinkParams {
    pub fn reference() -> Self {
        Self {
            link_type: LinkType::Reference,
            ..Default::default()
        }
    }

    pub fn with_block(mut self, block: impl Into<String>) -> Self {
        self.block = Some(block.into());
        self
    }

    pub fn with_relative_credits(mut self, value: i64) -> Self {
        self.relative_credits = Some(value);
        self
    }
}

impl From<&Link> for LinkParams {
    fn from(link: &Link) -> Self {
        Self {
            relative_credits: link.relative_credits.map(i64::from),
            min_credits: link.min_credits,
            max_credits: link.max_credits,
            is_mandatory: link.is_mandatory,
            block: link.block.map(|b| b.to_string()),
            access_condition: link.access_condition,
            comment: link.comment.clone(),
            comment_english: link.comment_english.clone(),
            link_type: link.link_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node_type::NodeType;
    use rstest::rstest;

    #[rstest]
    #[case("1", 1)]
    #[case("123", 3)]
    #[case("146", 6)]
    #[case("56", 6)]
    fn given_increasing_digits_when_parsing_block_then_accepted(#[case] raw: &str, #[case] max: u8) {
        let block: Block = raw.parse().expect("valid block");
        assert_eq!(block.to_string(), raw);
        assert_eq!(block.max_value(), max);
    }

    #[rstest]
    #[case("")]
    #[case("0")]
    #[case("7")]
    #[case("21")]
    #[case("113")]
    #[case("1a")]
    fn given_invalid_block_when_parsing_then_violation(#[case] raw: &str) {
        assert!(matches!(
            raw.parse::<Block>(),
            Err(Violation::InvalidBlockValue { .. })
        ));
    }

    #[test]
    fn given_learning_unit_without_relative_credits_when_building_link_then_inherits_credits() {
        let child = Node::new(7, "LDROI1001", 2024, NodeType::LearningUnit).with_credits(5);

        let link = Link::from_params(&child, &LinkParams::default()).unwrap();

        assert_eq!(link.relative_credits, Some(5));
        assert!(link.is_mandatory);
    }

    #[test]
    fn given_bad_block_and_credits_when_building_link_then_both_violations_reported() {
        let child = Node::new(7, "LDROI1001", 2024, NodeType::LearningUnit);
        let params = LinkParams::default()
            .with_block("31")
            .with_relative_credits(1000);

        let violations = Link::from_params(&child, &params).unwrap_err();

        assert_eq!(violations.len(), 2);
    }
}
