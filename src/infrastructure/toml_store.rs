//! TOML store file: relationships, nodes, links and registered trees.
//!
//! ```toml
//! [[relationships]]
//! parent_type = "BACHELOR"
//! child_type = "COMMON_CORE"
//! min_count_authorized = 1
//! max_count_authorized = 1
//!
//! [[nodes]]
//! node_id = 1
//! code = "LDROI100B"
//! year = 2024
//! node_type = "BACHELOR"
//!
//! [[links]]
//! parent = 1
//! child = 2
//! block = "12"
//!
//! [[trees]]
//! root = 1
//! [trees.prerequisites]
//! LDROI1002 = "LDROI1001 ET LDROI1003"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::domain::{
    AuthorizedRelationship, AuthorizedRelationshipList, Block, Keywords, Link, LinkType, Node,
    NodeId, NodeIdentity, NodeType, PrerequisiteGrammar,
};
use crate::infrastructure::repository::{InMemoryProgramTreeRepository, StoreSnapshot, TreePrerequisites};
use crate::infrastructure::{InfraError, InfraResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeRecord {
    node_id: NodeId,
    code: String,
    year: i32,
    node_type: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    credits: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    remark: Option<String>,
}

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_normal(value: &LinkType) -> bool {
    !value.is_reference()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LinkRecord {
    parent: NodeId,
    child: NodeId,
    #[serde(default)]
    order: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    relative_credits: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_credits: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_credits: Option<u32>,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    is_mandatory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    block: Option<Block>,
    #[serde(default, skip_serializing_if = "is_false")]
    access_condition: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment_english: Option<String>,
    #[serde(default, skip_serializing_if = "is_normal")]
    link_type: LinkType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TreeRecord {
    root: NodeId,
    /// Learning unit code -> canonical expression.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    prerequisites: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    meta: StoreMeta,
    #[serde(default)]
    relationships: Vec<AuthorizedRelationship>,
    #[serde(default)]
    nodes: Vec<NodeRecord>,
    #[serde(default)]
    links: Vec<LinkRecord>,
    #[serde(default)]
    trees: Vec<TreeRecord>,
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            node_id: node.node_id,
            code: node.code.clone(),
            year: node.year,
            node_type: node.node_type(),
            title: (node.title != node.code).then(|| node.title.clone()),
            title_en: node.title_en.clone(),
            credits: node.credits,
            end_year: node.end_year,
            remark: node.remark().map(str::to_string),
        }
    }
}

impl NodeRecord {
    fn into_node(self) -> Node {
        let mut node = Node::new(self.node_id, self.code, self.year, self.node_type);
        if let Some(title) = self.title {
            node = node.with_title(title);
        }
        node.title_en = self.title_en;
        node.credits = self.credits;
        node.end_year = self.end_year;
        node.set_remark(self.remark);
        node
    }
}

impl LinkRecord {
    fn new(parent: NodeId, link: &Link) -> Self {
        Self {
            parent,
            child: link.child,
            order: link.order,
            relative_credits: link.relative_credits,
            min_credits: link.min_credits,
            max_credits: link.max_credits,
            is_mandatory: link.is_mandatory,
            block: link.block,
            access_condition: link.access_condition,
            comment: link.comment.clone(),
            comment_english: link.comment_english.clone(),
            link_type: link.link_type,
        }
    }

    fn to_link(&self) -> Link {
        Link {
            child: self.child,
            order: self.order,
            relative_credits: self.relative_credits,
            min_credits: self.min_credits,
            max_credits: self.max_credits,
            is_mandatory: self.is_mandatory,
            block: self.block,
            access_condition: self.access_condition,
            comment: self.comment.clone(),
            comment_english: self.comment_english.clone(),
            link_type: self.link_type,
        }
    }
}

/// Loads and saves an [`InMemoryProgramTreeRepository`] from a TOML file.
pub struct TomlStore {
    path: PathBuf,
    grammar: PrerequisiteGrammar,
}

impl TomlStore {
    pub fn new(path: impl Into<PathBuf>, grammar: PrerequisiteGrammar) -> Self {
        Self {
            path: path.into(),
            grammar,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn store_err(&self, message: impl Into<String>) -> InfraError {
        InfraError::Store {
            path: self.path.clone(),
            message: message.into(),
        }
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> InfraResult<InMemoryProgramTreeRepository> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| InfraError::io(format!("read store {}", self.path.display()), e))?;
        let document: StoreDocument =
            toml::from_str(&content).map_err(|e| self.store_err(e.to_string()))?;
        debug!(
            "store: {} node(s), {} link(s), {} tree(s)",
            document.nodes.len(),
            document.links.len(),
            document.trees.len()
        );
        let snapshot = self.to_snapshot(document)?;
        InMemoryProgramTreeRepository::from_snapshot(snapshot).map_err(|e| self.store_err(e.to_string()))
    }

    fn to_snapshot(&self, document: StoreDocument) -> InfraResult<StoreSnapshot> {
        let mut nodes: HashMap<NodeId, Node> = HashMap::new();
        for record in document.nodes {
            let node = record.into_node();
            if nodes.insert(node.node_id, node).is_some() {
                return Err(self.store_err("duplicate node_id in [[nodes]]"));
            }
        }
        let mut links = document.links;
        links.sort_by_key(|l| (l.parent, l.order));
        for record in &links {
            if !nodes.contains_key(&record.child) {
                return Err(self.store_err(format!("link {} -> {}: unknown child", record.parent, record.child)));
            }
            let parent = nodes
                .get_mut(&record.parent)
                .ok_or_else(|| self.store_err(format!("link {} -> {}: unknown parent", record.parent, record.child)))?;
            parent.push_loaded_child(record.to_link());
        }

        let mut trees = BTreeMap::new();
        for record in document.trees {
            let root = nodes
                .get(&record.root)
                .ok_or_else(|| self.store_err(format!("tree root {} is not a stored node", record.root)))?;
            let year = root.year;
            let mut prerequisites = TreePrerequisites::new();
            for (code, expression) in record.prerequisites {
                let identity = NodeIdentity::new(code, year);
                let unit = nodes
                    .values()
                    .find(|n| n.is_learning_unit() && n.identity() == identity)
                    .ok_or_else(|| self.store_err(format!("prerequisite of unknown learning unit {}", identity)))?;
                let prerequisite = self
                    .grammar
                    .parse(&expression, year)
                    .map_err(|e| self.store_err(format!("prerequisite of {}: {}", identity, e)))?;
                prerequisites.insert(unit.node_id, prerequisite);
            }
            trees.insert(record.root, prerequisites);
        }

        let mut nodes: Vec<Node> = nodes.into_values().collect();
        nodes.sort_by_key(|n| n.node_id);
        Ok(StoreSnapshot {
            relationships: AuthorizedRelationshipList::new(document.relationships),
            nodes,
            trees,
        })
    }

    fn to_document(snapshot: &StoreSnapshot) -> StoreDocument {
        let by_id: HashMap<NodeId, &Node> = snapshot.nodes.iter().map(|n| (n.node_id, n)).collect();
        let trees = snapshot
            .trees
            .iter()
            .map(|(root, prerequisites)| TreeRecord {
                root: *root,
                prerequisites: prerequisites
                    .iter()
                    .filter_map(|(unit, prerequisite)| {
                        by_id
                            .get(unit)
                            .map(|n| (n.code.clone(), prerequisite.expression(Keywords::French)))
                    })
                    .collect(),
            })
            .collect();
        StoreDocument {
            meta: StoreMeta {
                saved_at: Some(Utc::now().to_rfc3339()),
            },
            relationships: snapshot.relationships.iter().cloned().collect(),
            nodes: snapshot.nodes.iter().map(NodeRecord::from).collect(),
            links: snapshot
                .nodes
                .iter()
                .flat_map(|n| n.children().iter().map(move |l| LinkRecord::new(n.node_id, l)))
                .collect(),
            trees,
        }
    }

    /// Writes the repository content, replacing the file.
    #[instrument(skip(self, repository), fields(path = %self.path.display()))]
    pub fn save(&self, repository: &InMemoryProgramTreeRepository) -> InfraResult<()> {
        let document = Self::to_document(&repository.snapshot());
        let content = toml::to_string_pretty(&document).map_err(|e| self.store_err(e.to_string()))?;

        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, content)
            .map_err(|e| InfraError::io(format!("write store {}", tmp.display()), e))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| InfraError::io(format!("replace store {}", self.path.display()), e))?;
        info!("store saved: {} node(s)", document.nodes.len());
        Ok(())
    }
}
