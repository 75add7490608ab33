//! Tree vertices: containers (trainings, mini-trainings, groups) and learning units.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::link::Link;
use crate::domain::node_type::NodeType;
use crate::domain::prerequisite::Prerequisite;

/// Numeric node identifier, unique across the store. Used as path segment.
pub type NodeId = i64;

/// Business identity of a node: its code in one academic year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub code: String,
    pub year: i32,
}

impl NodeIdentity {
    pub fn new(code: impl Into<String>, year: i32) -> Self {
        Self {
            code: code.into(),
            year,
        }
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.year)
    }
}

/// Fields only a container carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerData {
    pub node_type: NodeType,
    pub remark: Option<String>,
}

/// Fields only a learning unit carries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LearningUnitData {
    pub prerequisite: Prerequisite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Container(ContainerData),
    LearningUnit(LearningUnitData),
}

/// A vertex of the program DAG.
///
/// Children are stored as [`Link`]s holding the child's [`NodeId`]; the child
/// content itself lives in the tree's node arena. Links are kept sorted by
/// their dense, zero-based `order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub node_id: NodeId,
    pub code: String,
    pub year: i32,
    pub title: String,
    pub title_en: Option<String>,
    pub credits: Option<u32>,
    pub end_year: Option<i32>,
    kind: NodeKind,
    children: Vec<Link>,
}

impl Node {
    pub fn new(node_id: NodeId, code: impl Into<String>, year: i32, node_type: NodeType) -> Self {
        let kind = if node_type.is_learning_unit() {
            NodeKind::LearningUnit(LearningUnitData::default())
        } else {
            NodeKind::Container(ContainerData {
                node_type,
                remark: None,
            })
        };
        let code = code.into();
        Self {
            node_id,
            title: code.clone(),
            code,
            year,
            title_en: None,
            credits: None,
            end_year: None,
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_credits(mut self, credits: u32) -> Self {
        self.credits = Some(credits);
        self
    }

    pub fn with_end_year(mut self, end_year: i32) -> Self {
        self.end_year = Some(end_year);
        self
    }

    pub fn identity(&self) -> NodeIdentity {
        NodeIdentity::new(self.code.clone(), self.year)
    }

    pub fn node_type(&self) -> NodeType {
        match &self.kind {
            NodeKind::Container(data) => data.node_type,
            NodeKind::LearningUnit(_) => NodeType::LearningUnit,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn remark(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Container(data) => data.remark.as_deref(),
            NodeKind::LearningUnit(_) => None,
        }
    }

    pub fn set_remark(&mut self, remark: Option<String>) {
        if let NodeKind::Container(data) = &mut self.kind {
            data.remark = remark;
        }
    }

    pub fn is_learning_unit(&self) -> bool {
        matches!(self.kind, NodeKind::LearningUnit(_))
    }

    pub fn is_container(&self) -> bool {
        !self.is_learning_unit()
    }

    pub fn is_finality(&self) -> bool {
        self.node_type().is_finality()
    }

    pub fn is_master_2m(&self) -> bool {
        self.node_type().is_master_2m()
    }

    pub fn is_option(&self) -> bool {
        self.node_type().is_option()
    }

    pub fn is_training(&self) -> bool {
        self.node_type().is_training()
    }

    pub fn is_mini_training(&self) -> bool {
        self.node_type().is_mini_training()
    }

    pub fn is_group(&self) -> bool {
        self.node_type().is_group()
    }

    pub fn is_minor_major_list_choice(&self) -> bool {
        self.node_type().is_minor_major_list_choice()
    }

    pub fn is_minor_or_deepening(&self) -> bool {
        self.node_type().is_minor_or_deepening()
    }

    /// `None` for containers.
    pub fn prerequisite(&self) -> Option<&Prerequisite> {
        match &self.kind {
            NodeKind::LearningUnit(data) => Some(&data.prerequisite),
            NodeKind::Container(_) => None,
        }
    }

    pub fn has_prerequisite(&self) -> bool {
        self.prerequisite().is_some_and(|p| !p.is_empty())
    }

    pub(crate) fn prerequisite_mut(&mut self) -> Option<&mut Prerequisite> {
        match &mut self.kind {
            NodeKind::LearningUnit(data) => Some(&mut data.prerequisite),
            NodeKind::Container(_) => None,
        }
    }

    /// Replaces the prerequisite. Returns `false` on a container.
    pub(crate) fn set_prerequisite(&mut self, prerequisite: Prerequisite) -> bool {
        match self.prerequisite_mut() {
            Some(current) => {
                *current = prerequisite;
                true
            }
            None => false,
        }
    }

    pub fn children(&self) -> &[Link] {
        &self.children
    }

    pub fn children_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().map(|link| link.child)
    }

    pub fn has_child(&self, child: NodeId) -> bool {
        self.children.iter().any(|link| link.child == child)
    }

    pub fn get_link(&self, child: NodeId) -> Option<&Link> {
        self.children.iter().find(|link| link.child == child)
    }

    pub(crate) fn get_link_mut(&mut self, child: NodeId) -> Option<&mut Link> {
        self.children.iter_mut().find(|link| link.child == child)
    }

    /// Appends the link at the end of the sibling order.
    pub(crate) fn add_child(&mut self, mut link: Link) {
        link.order = self.children.len();
        self.children.push(link);
    }

    /// Inserts a link at its stored order, used when materialising from storage.
    pub(crate) fn push_loaded_child(&mut self, link: Link) {
        self.children.push(link);
        self.children.sort_by_key(|l| l.order);
        self.renumber_children();
    }

    pub(crate) fn remove_child(&mut self, child: NodeId) -> Option<Link> {
        let position = self.children.iter().position(|link| link.child == child)?;
        let link = self.children.remove(position);
        self.renumber_children();
        Some(link)
    }

    pub(crate) fn clear_children(&mut self) {
        self.children.clear();
    }

    /// Moves the child one place towards the front. `false` if already first.
    pub(crate) fn order_up(&mut self, child: NodeId) -> bool {
        match self.children.iter().position(|link| link.child == child) {
            Some(position) if position > 0 => {
                self.children.swap(position, position - 1);
                self.renumber_children();
                true
            }
            _ => false,
        }
    }

    /// Moves the child one place towards the back. `false` if already last.
    pub(crate) fn order_down(&mut self, child: NodeId) -> bool {
        match self.children.iter().position(|link| link.child == child) {
            Some(position) if position + 1 < self.children.len() => {
                self.children.swap(position, position + 1);
                self.renumber_children();
                true
            }
            _ => false,
        }
    }

    fn renumber_children(&mut self) {
        for (order, link) in self.children.iter_mut().enumerate() {
            link.order = order;
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::link::Link;
    use crate::domain::node_type::GroupType;

    fn group(node_id: NodeId) -> Node {
        Node::new(node_id, format!("LDROI{node_id}"), 2024, GroupType::SubGroup.into())
    }

    #[test]
    fn given_learning_unit_type_when_created_then_kind_is_leaf_with_empty_prerequisite() {
        let node = Node::new(1, "LDROI1001", 2024, NodeType::LearningUnit);
        assert!(node.is_learning_unit());
        assert_eq!(node.prerequisite().map(Prerequisite::is_empty), Some(true));
    }

    #[test]
    fn given_three_children_when_removing_middle_then_orders_stay_dense() {
        let mut parent = group(1);
        for child in [2, 3, 4] {
            parent.add_child(Link::new(child));
        }

        parent.remove_child(3);

        let orders: Vec<_> = parent.children().iter().map(|l| (l.child, l.order)).collect();
        assert_eq!(orders, vec![(2, 0), (4, 1)]);
    }

    #[test]
    fn given_first_child_when_order_up_then_nothing_moves() {
        let mut parent = group(1);
        parent.add_child(Link::new(2));
        parent.add_child(Link::new(3));

        assert!(!parent.order_up(2));
        assert!(parent.order_down(2));
        assert_eq!(parent.children()[0].child, 3);
        assert_eq!(parent.children()[1].order, 1);
    }
}
