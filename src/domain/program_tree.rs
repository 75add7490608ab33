//! The program tree aggregate: one root node, its node arena and the shared
//! authorized-relationship table.
//!
//! Every mutation follows validate-then-apply: the matching validator list runs
//! against the current state (or an explicit copy when a post-mutation state
//! must be simulated) and nothing changes unless every rule passes.

use std::collections::HashSet;
use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, info, instrument};

use crate::domain::arena::{NodeArena, Occurrence, OccurrenceIterator};
use crate::domain::authorized_relationship::AuthorizedRelationshipList;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::link::{Link, LinkParams};
use crate::domain::message::Message;
use crate::domain::node::{Node, NodeId, NodeIdentity};
use crate::domain::node_type::{GroupType, NodeType};
use crate::domain::path::Path;
use crate::domain::prerequisite::PrerequisiteGrammar;
use crate::domain::repository::ProgramTreeIdentity;
use crate::domain::validators::{self, ValidationContext};

#[derive(Debug, Clone)]
pub struct ProgramTree {
    root: NodeId,
    nodes: NodeArena,
    authorized_relationships: Arc<AuthorizedRelationshipList>,
}

impl ProgramTree {
    /// Single-node tree.
    pub fn new(root: Node, authorized_relationships: Arc<AuthorizedRelationshipList>) -> Self {
        let root_id = root.node_id;
        let mut nodes = NodeArena::new();
        nodes.insert(root);
        Self {
            root: root_id,
            nodes,
            authorized_relationships,
        }
    }

    /// Tree over an existing arena. Nodes unreachable from `root` are dropped.
    pub fn from_arena(
        root: NodeId,
        mut nodes: NodeArena,
        authorized_relationships: Arc<AuthorizedRelationshipList>,
    ) -> DomainResult<Self> {
        if !nodes.contains(root) {
            return Err(DomainError::NodeNotFound {
                path: root.to_string(),
            });
        }
        for node in nodes.nodes() {
            if let Some(missing) = node.children_ids().find(|id| !nodes.contains(*id)) {
                return Err(DomainError::InvalidStructure(format!(
                    "{} links to unknown node {}",
                    node, missing
                )));
            }
        }
        nodes.retain_reachable(root);
        Ok(Self {
            root,
            nodes,
            authorized_relationships,
        })
    }

    pub fn identity(&self) -> ProgramTreeIdentity {
        self.root_node().identity()
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn root_path(&self) -> Path {
        Path::root(self.root)
    }

    pub fn root_node(&self) -> &Node {
        self.nodes
            .get(self.root)
            .unwrap_or_else(|| unreachable!("root node {} missing from its own arena", self.root))
    }

    pub fn authorized_relationships(&self) -> &AuthorizedRelationshipList {
        &self.authorized_relationships
    }

    pub fn relationships_handle(&self) -> Arc<AuthorizedRelationshipList> {
        Arc::clone(&self.authorized_relationships)
    }

    pub fn arena(&self) -> &NodeArena {
        &self.nodes
    }

    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains(node_id)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Resolves a path by walking ids from the root.
    pub fn get_node(&self, path: &Path) -> DomainResult<&Node> {
        path.ensure_acyclic()?;
        let not_found = || DomainError::NodeNotFound {
            path: path.to_string(),
        };
        if path.first() != self.root {
            return Err(not_found());
        }
        let mut current = self.root_node();
        for &id in &path.ids()[1..] {
            if !current.has_child(id) {
                return Err(not_found());
            }
            current = self.nodes.get(id).ok_or_else(not_found)?;
        }
        Ok(current)
    }

    /// The link whose child is the last node of `path`.
    pub fn get_link(&self, path: &Path) -> DomainResult<&Link> {
        let not_found = || DomainError::LinkNotFound {
            path: path.to_string(),
        };
        let parent_path = path.parent().ok_or_else(not_found)?;
        let parent = self.get_node(&parent_path)?;
        parent.get_link(path.last()).ok_or_else(not_found)
    }

    /// Every ancestor of the addressed occurrence, nearest first.
    pub fn get_parents(&self, path: &Path) -> DomainResult<Vec<&Node>> {
        self.get_node(path)?;
        let ids = path.ids();
        Ok(ids[..ids.len() - 1]
            .iter()
            .rev()
            .filter_map(|id| self.nodes.get(*id))
            .collect())
    }

    pub fn find_node(&self, identity: &NodeIdentity) -> Option<&Node> {
        self.nodes.find_by_identity(identity)
    }

    pub fn get_node_by_identity(&self, identity: &NodeIdentity) -> DomainResult<&Node> {
        self.find_node(identity)
            .ok_or_else(|| DomainError::NodeIdentityNotFound {
                code: identity.code.clone(),
                year: identity.year,
            })
    }

    /// Every occurrence, root first, in depth-first order.
    pub fn occurrences(&self) -> OccurrenceIterator<'_> {
        self.nodes.iter_from(self.root)
    }

    /// Every occurrence below the root with its path.
    pub fn descendants(&self) -> impl Iterator<Item = (Path, &Node)> {
        self.occurrences()
            .skip(1)
            .map(|(path, Occurrence { node, .. })| (path, node))
    }

    /// Distinct nodes reachable from the root, root included, depth-first.
    pub fn get_all_nodes(&self) -> Vec<&Node> {
        let mut seen: HashSet<NodeIdentity> = HashSet::new();
        let mut result = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if !seen.insert(node.identity()) {
                continue;
            }
            stack.extend(node.children_ids().collect::<Vec<_>>().into_iter().rev());
            result.push(node);
        }
        result
    }

    pub fn get_all_learning_units(&self) -> Vec<&Node> {
        self.get_all_nodes()
            .into_iter()
            .filter(|n| n.is_learning_unit())
            .collect()
    }

    /// Every path at which the node occurs.
    pub fn paths_of(&self, node_id: NodeId) -> Vec<Path> {
        self.occurrences()
            .filter(|(path, _)| path.last() == node_id)
            .map(|(path, _)| path)
            .collect()
    }

    pub fn count_usage(&self, node_id: NodeId) -> usize {
        self.paths_of(node_id).len()
    }

    /// Ids of the node and everything below it.
    pub fn subtree_ids(&self, node_id: NodeId) -> HashSet<NodeId> {
        if !self.nodes.contains(node_id) {
            return HashSet::new();
        }
        self.nodes.reachable_from(node_id)
    }

    /// Distinct nodes of the subtree rooted at `node_id`, root included.
    pub fn subtree_nodes(&self, node_id: NodeId) -> Vec<&Node> {
        self.subtree_ids(node_id)
            .into_iter()
            .filter_map(|id| self.nodes.get(id))
            .sorted_by_key(|n| n.node_id)
            .collect()
    }

    /// Deep copy of the subtree rooted at `node_id`.
    pub fn subtree(&self, node_id: NodeId) -> DomainResult<ProgramTree> {
        let mut nodes = NodeArena::new();
        for node in self.subtree_nodes(node_id) {
            nodes.insert(node.clone());
        }
        ProgramTree::from_arena(node_id, nodes, self.relationships_handle())
    }

    /// Parents holding a REFERENCE link to the node.
    pub fn get_parents_using_node_as_reference(&self, node_id: NodeId) -> Vec<&Node> {
        self.get_all_nodes()
            .into_iter()
            .filter(|parent| {
                parent
                    .get_link(node_id)
                    .is_some_and(|link| link.is_reference())
            })
            .collect()
    }

    /// Child links with REFERENCE links replaced, transitively, by the
    /// referenced node's own children.
    pub fn children_and_reference_children(&self, node_id: NodeId) -> Vec<&Link> {
        self.children_and_reference_children_except_within(node_id, &HashSet::new())
    }

    /// Like [`Self::children_and_reference_children`], but REFERENCE links
    /// whose parent has one of the `except_within` types are kept as links.
    pub fn children_and_reference_children_except_within(
        &self,
        node_id: NodeId,
        except_within: &HashSet<NodeType>,
    ) -> Vec<&Link> {
        let mut result = Vec::new();
        // Nodes on the current reference chain only; a node reached by two
        // chains contributes its children twice.
        let mut visiting = HashSet::from([node_id]);
        self.collect_flattened_links(node_id, except_within, &mut visiting, &mut result);
        result
    }

    /// Minor lists keep their REFERENCE links to minors.
    pub fn get_children_and_only_reference_children_except_within_minor_list(
        &self,
        node_id: NodeId,
    ) -> Vec<&Link> {
        let except_within = HashSet::from([NodeType::Group(GroupType::MinorListChoice)]);
        self.children_and_reference_children_except_within(node_id, &except_within)
    }

    fn collect_flattened_links<'a>(
        &'a self,
        node_id: NodeId,
        except_within: &HashSet<NodeType>,
        visiting: &mut HashSet<NodeId>,
        result: &mut Vec<&'a Link>,
    ) {
        let Some(node) = self.nodes.get(node_id) else {
            return;
        };
        let keep_references = except_within.contains(&node.node_type());
        for link in node.children() {
            if link.is_reference() && !keep_references {
                if visiting.insert(link.child) {
                    self.collect_flattened_links(link.child, except_within, visiting, result);
                    visiting.remove(&link.child);
                }
            } else {
                result.push(link);
            }
        }
    }

    /// Child types, one entry per child. With `include_reference`, REFERENCE
    /// links are flattened first.
    pub fn get_children_types(&self, node_id: NodeId, include_reference: bool) -> Vec<NodeType> {
        let links: Vec<&Link> = if include_reference {
            self.children_and_reference_children(node_id)
        } else {
            self.nodes
                .get(node_id)
                .map(|n| n.children().iter().collect())
                .unwrap_or_default()
        };
        links
            .into_iter()
            .filter_map(|link| self.nodes.get(link.child))
            .map(Node::node_type)
            .collect()
    }

    pub fn get_option_list(&self) -> Vec<&Node> {
        self.get_all_nodes()
            .into_iter()
            .filter(|n| n.is_option())
            .collect()
    }

    /// Options reachable from the root without crossing a finality.
    pub fn get_2m_option_list(&self) -> Vec<&Node> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if node.is_finality() {
                continue;
            }
            if node.is_option() {
                result.push(node);
            }
            stack.extend(node.children_ids());
        }
        result.sort_by(|a, b| a.code.cmp(&b.code));
        result
    }

    pub fn get_all_finalities(&self) -> Vec<&Node> {
        self.get_all_nodes()
            .into_iter()
            .filter(|n| n.is_finality())
            .collect()
    }

    /// Sorted, distinct codes of every learning unit in the tree.
    pub fn get_codes_permitted_as_prerequisite(&self) -> Vec<String> {
        self.get_all_learning_units()
            .into_iter()
            .map(|n| n.code.clone())
            .sorted()
            .dedup()
            .collect()
    }

    /// Learning units whose prerequisite references the node.
    pub fn search_is_prerequisite_of(&self, node_id: NodeId) -> Vec<&Node> {
        let Some(target) = self.nodes.get(node_id) else {
            return Vec::new();
        };
        self.get_all_learning_units()
            .into_iter()
            .filter(|n| {
                n.prerequisite()
                    .is_some_and(|p| p.contains(&target.code, target.year))
            })
            .collect()
    }

    pub fn is_prerequisite(&self, node_id: NodeId) -> bool {
        !self.search_is_prerequisite_of(node_id).is_empty()
    }

    pub fn get_nodes_that_have_prerequisites(&self) -> Vec<&Node> {
        self.get_all_learning_units()
            .into_iter()
            .filter(|n| n.has_prerequisite())
            .collect()
    }

    /// Structural copy where nodes of the given types keep no children.
    #[instrument(level = "debug", skip(self))]
    pub fn prune(&self, ignore_children_from: &HashSet<NodeType>) -> ProgramTree {
        let mut pruned = self.clone();
        let to_clear: Vec<NodeId> = pruned
            .nodes
            .nodes()
            .filter(|n| ignore_children_from.contains(&n.node_type()))
            .map(|n| n.node_id)
            .collect();
        for id in to_clear {
            if let Some(node) = pruned.nodes.get_mut(id) {
                node.clear_children();
            }
        }
        pruned.nodes.retain_reachable(pruned.root);
        pruned
    }

    /// Copy of the tree with one link removed and unreachable nodes dropped.
    pub fn without_link(&self, parent_id: NodeId, child_id: NodeId) -> ProgramTree {
        let mut copy = self.clone();
        if let Some(parent) = copy.nodes.get_mut(parent_id) {
            parent.remove_child(child_id);
        }
        copy.nodes.retain_reachable(copy.root);
        copy
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Attaches `node` (with its stored subtree) under the node at `path`.
    ///
    /// The subtree is taken from this tree if the node already occurs in it,
    /// else from the repository, else the node is attached bare.
    #[instrument(skip(self, node, params, ctx), fields(node = %node, path = %path))]
    pub fn attach_node(
        &mut self,
        node: Node,
        path: &Path,
        params: &LinkParams,
        ctx: &ValidationContext<'_>,
    ) -> DomainResult<Vec<Message>> {
        let subtree = self.resolve_subtree(node, ctx)?;
        self.attach_subtree(subtree, path, params, ctx)
    }

    /// Runs the check-paste validators without changing anything.
    #[instrument(skip(self, node, ctx), fields(node = %node, path = %path))]
    pub fn check_paste(
        &self,
        node: Node,
        path: &Path,
        ctx: &ValidationContext<'_>,
    ) -> DomainResult<()> {
        let subtree = self.resolve_subtree(node, ctx)?;
        let mut staged = self.clone();
        staged.stage(&subtree);
        let child_id = subtree.root_id();
        let result = validators::check_paste_validators(&staged, path, child_id, *ctx)?.validate();
        result
    }

    /// Attach, optionally preceded by a detach of the same node elsewhere (a move).
    ///
    /// Both steps are validated and applied on a copy; the tree only changes if both pass.
    #[instrument(skip(self, node, params, ctx), fields(node = %node, path = %path_where_to_paste))]
    pub fn paste_node(
        &mut self,
        node: Node,
        path_where_to_paste: &Path,
        path_where_to_detach: Option<&Path>,
        params: &LinkParams,
        ctx: &ValidationContext<'_>,
    ) -> DomainResult<Vec<Message>> {
        let subtree = self.resolve_subtree(node, ctx)?;
        let mut working = self.clone();
        let mut messages = Vec::new();
        if let Some(detach_path) = path_where_to_detach {
            if detach_path.last() != subtree.root_id() {
                return Err(DomainError::InvalidPath(format!(
                    "{} does not address the pasted node",
                    detach_path
                )));
            }
            messages.extend(working.detach_node(detach_path, ctx)?);
        }
        messages.extend(working.attach_subtree(subtree, path_where_to_paste, params, ctx)?);
        *self = working;
        Ok(messages)
    }

    fn resolve_subtree(&self, node: Node, ctx: &ValidationContext<'_>) -> DomainResult<ProgramTree> {
        if let Some(existing) = self.find_node(&node.identity()) {
            debug!("attach: reusing {} from the working tree", existing);
            return self.subtree(existing.node_id);
        }
        if let Some(stored) = ctx.repository.get(&node.identity())? {
            debug!("attach: loaded subtree of {} from repository", node);
            return Ok(stored);
        }
        if !node.children().is_empty() {
            return Err(DomainError::InvalidStructure(format!(
                "{} has children but no stored subtree",
                node
            )));
        }
        Ok(ProgramTree::new(node, self.relationships_handle()))
    }

    /// Adds the nodes of `subtree` that this arena does not know yet, unlinked.
    fn stage(&mut self, subtree: &ProgramTree) {
        for node in subtree.nodes.nodes() {
            self.nodes.insert_if_absent(node.clone());
        }
    }

    fn attach_subtree(
        &mut self,
        subtree: ProgramTree,
        path: &Path,
        params: &LinkParams,
        ctx: &ValidationContext<'_>,
    ) -> DomainResult<Vec<Message>> {
        let parent_id = self.get_node(path)?.node_id;
        let child_id = subtree.root_id();

        let mut staged = self.clone();
        staged.stage(&subtree);
        validators::attach_validators(&staged, path, child_id, params, *ctx)?.validate()?;

        let (child_label, link) = {
            let child = staged.nodes.get(child_id).ok_or_else(|| DomainError::NodeNotFound {
                path: path.join(child_id).to_string(),
            })?;
            (child.to_string(), Link::from_params(child, params)?)
        };
        let parent = staged.nodes.get_mut(parent_id).ok_or_else(|| DomainError::NodeNotFound {
            path: path.to_string(),
        })?;
        let parent_label = parent.to_string();
        parent.add_child(link);
        *self = staged;

        info!("attached {} under {}", child_label, parent_label);
        Ok(vec![Message::success(format!(
            "\"{child_label}\" has been attached to \"{parent_label}\""
        ))])
    }

    /// Removes the link addressed by `path` and drops nodes that vanish with it.
    #[instrument(skip(self, ctx), fields(path = %path))]
    pub fn detach_node(
        &mut self,
        path: &Path,
        ctx: &ValidationContext<'_>,
    ) -> DomainResult<Vec<Message>> {
        let child_label = self.get_node(path)?.to_string();
        validators::detach_validators(self, path, *ctx)?.validate()?;

        let parent_path = path.parent().ok_or_else(|| DomainError::LinkNotFound {
            path: path.to_string(),
        })?;
        let parent = self.get_node(&parent_path)?;
        let parent_label = parent.to_string();
        let detached = self.without_link(parent.node_id, path.last());

        let disappeared: Vec<NodeIdentity> = self
            .get_all_nodes()
            .into_iter()
            .filter(|n| !detached.contains(n.node_id))
            .map(Node::identity)
            .collect();
        *self = detached;
        self.sever_prerequisites_to(&disappeared);

        info!(
            "detached {} from {} ({} node(s) left the tree)",
            child_label,
            parent_label,
            disappeared.len()
        );
        Ok(vec![Message::success(format!(
            "\"{child_label}\" has been detached from \"{parent_label}\""
        ))])
    }

    fn sever_prerequisites_to(&mut self, disappeared: &[NodeIdentity]) {
        if disappeared.is_empty() {
            return;
        }
        let holders: Vec<NodeId> = self
            .get_nodes_that_have_prerequisites()
            .into_iter()
            .map(|n| n.node_id)
            .collect();
        for id in holders {
            if let Some(prerequisite) = self.nodes.get_mut(id).and_then(Node::prerequisite_mut) {
                for identity in disappeared {
                    if prerequisite.remove_prerequisite_item(&identity.code, identity.year) {
                        debug!("removed prerequisite item {} from node {}", identity, id);
                    }
                }
            }
        }
    }

    /// Replaces the attributes of the link addressed by `path`, keeping child and order.
    #[instrument(skip(self, params, ctx), fields(path = %path))]
    pub fn update_link(
        &mut self,
        path: &Path,
        params: &LinkParams,
        ctx: &ValidationContext<'_>,
    ) -> DomainResult<Vec<Message>> {
        let current = self.get_link(path)?;
        let order = current.order;
        validators::update_link_validators(self, path, params, *ctx)?.validate()?;

        let child = self.get_node(path)?;
        let child_label = child.to_string();
        let mut link = Link::from_params(child, params)?;
        link.order = order;

        let parent_id = path.ids()[path.len() - 2];
        if let Some(slot) = self
            .nodes
            .get_mut(parent_id)
            .and_then(|parent| parent.get_link_mut(path.last()))
        {
            *slot = link;
        }
        Ok(vec![Message::success(format!(
            "The link to \"{child_label}\" has been updated"
        ))])
    }

    /// Moves the addressed child one place up among its siblings.
    pub fn order_up(&mut self, path: &Path) -> DomainResult<bool> {
        self.reorder(path, Node::order_up)
    }

    /// Moves the addressed child one place down among its siblings.
    pub fn order_down(&mut self, path: &Path) -> DomainResult<bool> {
        self.reorder(path, Node::order_down)
    }

    fn reorder(&mut self, path: &Path, step: fn(&mut Node, NodeId) -> bool) -> DomainResult<bool> {
        self.get_link(path)?;
        let parent_id = path.ids()[path.len() - 2];
        Ok(self
            .nodes
            .get_mut(parent_id)
            .is_some_and(|parent| step(parent, path.last())))
    }

    /// Parses and validates `expression`, then replaces the prerequisite of the
    /// learning unit `node`.
    ///
    /// With a `context` path, codes outside that subtree produce advisory warnings.
    #[instrument(skip(self, ctx))]
    pub fn set_prerequisite(
        &mut self,
        expression: &str,
        node: &NodeIdentity,
        context: Option<&Path>,
        ctx: &ValidationContext<'_>,
    ) -> DomainResult<Vec<Message>> {
        let expression = PrerequisiteGrammar::normalize_expression(expression.trim());
        let target = self.get_node_by_identity(node)?;
        if !target.is_learning_unit() {
            return Err(DomainError::InvalidStructure(format!(
                "prerequisites can only be set on a learning unit, not on {}",
                target
            )));
        }
        let (node_id, year) = (target.node_id, target.year);
        validators::update_prerequisite_validators(self, &expression, target, *ctx).validate()?;
        let prerequisite = ctx.grammar.parse(&expression, year)?;

        let mut messages = Vec::new();
        if let Some(context_path) = context {
            let context_node = self.get_node(context_path)?;
            let codes_in_context: HashSet<String> = self
                .subtree_nodes(context_node.node_id)
                .into_iter()
                .filter(|n| n.is_learning_unit())
                .map(|n| n.code.clone())
                .collect();
            for item in prerequisite.get_all_prerequisite_items() {
                if !codes_in_context.contains(&item.code) {
                    messages.push(Message::warning(format!(
                        "{} is not present in {}",
                        item.code, context_node
                    )));
                }
            }
        }

        let rendered = prerequisite.to_string();
        if let Some(target) = self.nodes.get_mut(node_id) {
            target.set_prerequisite(prerequisite);
        }
        info!("prerequisite of {} set to '{}'", node, rendered);
        messages.insert(
            0,
            Message::success(if rendered.is_empty() {
                format!("Prerequisites of {} have been removed", node)
            } else {
                format!("Prerequisites of {} set to: {}", node, rendered)
            }),
        );
        Ok(messages)
    }

    /// Runs the delete validators. Deletion itself belongs to the repository.
    pub fn check_delete(&self, ctx: &ValidationContext<'_>) -> DomainResult<()> {
        validators::delete_validators(self, *ctx).validate()
    }
}

impl PartialEq for ProgramTree {
    /// Same root and same node content, independent of arena layout.
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
            && self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .nodes()
                .all(|n| other.nodes.get(n.node_id) == Some(n))
    }
}
