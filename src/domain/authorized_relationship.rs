//! Static table of which child types a parent type accepts, and how many.

use serde::{Deserialize, Serialize};

use crate::domain::node_type::NodeType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedRelationship {
    pub parent_type: NodeType,
    pub child_type: NodeType,
    #[serde(default)]
    pub min_count_authorized: usize,
    /// `None` means unbounded.
    #[serde(default)]
    pub max_count_authorized: Option<usize>,
}

impl AuthorizedRelationship {
    pub fn new(
        parent_type: impl Into<NodeType>,
        child_type: impl Into<NodeType>,
        min_count_authorized: usize,
        max_count_authorized: Option<usize>,
    ) -> Self {
        Self {
            parent_type: parent_type.into(),
            child_type: child_type.into(),
            min_count_authorized,
            max_count_authorized,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorizedRelationshipList {
    relationships: Vec<AuthorizedRelationship>,
}

impl AuthorizedRelationshipList {
    pub fn new(relationships: Vec<AuthorizedRelationship>) -> Self {
        Self { relationships }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuthorizedRelationship> {
        self.relationships.iter()
    }

    pub fn get(&self, parent_type: NodeType, child_type: NodeType) -> Option<&AuthorizedRelationship> {
        self.relationships
            .iter()
            .find(|r| r.parent_type == parent_type && r.child_type == child_type)
    }

    pub fn is_authorized(&self, parent_type: NodeType, child_type: NodeType) -> bool {
        self.get(parent_type, child_type).is_some()
    }

    pub fn authorized_children_types(&self, parent_type: NodeType) -> Vec<NodeType> {
        self.relationships
            .iter()
            .filter(|r| r.parent_type == parent_type)
            .map(|r| r.child_type)
            .collect()
    }

    /// Relationships of `parent_type` with a non-zero minimum.
    pub fn mandatory_children(&self, parent_type: NodeType) -> Vec<&AuthorizedRelationship> {
        self.relationships
            .iter()
            .filter(|r| r.parent_type == parent_type && r.min_count_authorized > 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node_type::{GroupType, TrainingType};

    #[test]
    fn given_table_when_looking_up_then_finds_pair_only() {
        let list = AuthorizedRelationshipList::new(vec![AuthorizedRelationship::new(
            TrainingType::Bachelor,
            GroupType::CommonCore,
            1,
            Some(1),
        )]);

        let bachelor = NodeType::Training(TrainingType::Bachelor);
        let common_core = NodeType::Group(GroupType::CommonCore);
        assert!(list.is_authorized(bachelor, common_core));
        assert!(!list.is_authorized(common_core, bachelor));
        assert_eq!(list.mandatory_children(bachelor).len(), 1);
    }
}
