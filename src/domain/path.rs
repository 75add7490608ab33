//! Occurrence addressing: the root-first chain of node ids leading to a node.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::node::NodeId;

pub const PATH_SEPARATOR: char = '|';

/// Root-first sequence of node ids, rendered as `"1|5|12"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path(Vec<NodeId>);

impl Path {
    pub fn root(node_id: NodeId) -> Self {
        Self(vec![node_id])
    }

    pub fn from_ids(ids: Vec<NodeId>) -> Result<Self, DomainError> {
        if ids.is_empty() {
            return Err(DomainError::InvalidPath("empty path".into()));
        }
        Ok(Self(ids))
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    pub fn first(&self) -> NodeId {
        self.0[0]
    }

    pub fn last(&self) -> NodeId {
        self.0[self.0.len() - 1]
    }

    /// Path of the parent occurrence, `None` for a root path.
    pub fn parent(&self) -> Option<Path> {
        if self.is_root() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    pub fn join(&self, child: NodeId) -> Path {
        let mut ids = self.0.clone();
        ids.push(child);
        Self(ids)
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.0.contains(&node_id)
    }

    /// Fails with [`DomainError::MalformedPath`] if an id occurs twice.
    pub fn ensure_acyclic(&self) -> Result<(), DomainError> {
        for (i, id) in self.0.iter().enumerate() {
            if self.0[i + 1..].contains(id) {
                return Err(DomainError::MalformedPath {
                    path: self.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for id in &self.0 {
            if !first {
                write!(f, "{PATH_SEPARATOR}")?;
            }
            write!(f, "{id}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ids = s
            .trim()
            .split(PATH_SEPARATOR)
            .map(|segment| {
                segment
                    .trim()
                    .parse::<NodeId>()
                    .map_err(|_| DomainError::InvalidPath(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_ids(ids)
    }
}

impl TryFrom<String> for Path {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Path> for String {
    fn from(value: Path) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_built_path_when_rendered_and_parsed_then_identical() {
        let path = Path::root(1).join(5).join(12);
        assert_eq!(path.to_string(), "1|5|12");
        assert_eq!("1|5|12".parse::<Path>().unwrap(), path);
    }

    #[test]
    fn given_garbage_when_parsing_then_invalid_path() {
        assert!(matches!(
            "1||2".parse::<Path>(),
            Err(DomainError::InvalidPath(_))
        ));
        assert!(matches!("".parse::<Path>(), Err(DomainError::InvalidPath(_))));
    }

    #[test]
    fn given_repeated_id_when_checking_then_malformed() {
        let path = Path::root(1).join(2).join(1);
        assert!(matches!(
            path.ensure_acyclic(),
            Err(DomainError::MalformedPath { .. })
        ));
    }

    #[test]
    fn given_child_path_when_parent_then_drops_last() {
        let path = Path::root(1).join(2);
        assert_eq!(path.parent(), Some(Path::root(1)));
        assert_eq!(Path::root(1).parent(), None);
    }
}
