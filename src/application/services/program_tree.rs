//! Program tree use cases
//!
//! Every mutation loads one snapshot through the repository port, runs the
//! tree operation (validate-then-apply) and persists only on success.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::command::{
    AttachNodeCommand, DeleteTreeCommand, DetachNodeCommand, OrderDirection, OrderLinkCommand,
    PasteNodeCommand, UpdateLinkCommand, UpdatePrerequisiteCommand,
};
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{
    DomainError, Keywords, Message, Node, NodeIdentity, Path, ProgramTree, ProgramTreeIdentity,
    ProgramTreeRepository, PrerequisiteGrammar, TreeSearch, ValidationContext,
};

/// Program tree service.
pub struct ProgramTreeService {
    repository: Arc<dyn ProgramTreeRepository>,
    settings: Arc<Settings>,
    grammar: PrerequisiteGrammar,
}

impl ProgramTreeService {
    /// Create a new program tree service.
    ///
    /// Fails if the configured course-code pattern is not a valid regex.
    pub fn new(
        repository: Arc<dyn ProgramTreeRepository>,
        settings: Arc<Settings>,
    ) -> ApplicationResult<Self> {
        let pattern = &settings.prerequisite.course_code_pattern;
        let grammar = PrerequisiteGrammar::new(pattern).map_err(|e| ApplicationError::Config {
            message: format!("invalid course code pattern '{}': {}", pattern, e),
        })?;
        Ok(Self {
            repository,
            settings,
            grammar,
        })
    }

    pub fn grammar(&self) -> &PrerequisiteGrammar {
        &self.grammar
    }

    /// Keyword set for rendering expressions.
    pub fn keywords(&self) -> Keywords {
        if self.settings.prerequisite.english_keywords {
            Keywords::English
        } else {
            Keywords::French
        }
    }

    fn context(&self) -> ValidationContext<'_> {
        ValidationContext::new(self.repository.as_ref(), &self.grammar)
            .with_minimum_editable_year(self.settings.minimum_editable_year)
    }

    /// Load the program tree rooted at `identity`.
    pub fn load(&self, identity: &ProgramTreeIdentity) -> ApplicationResult<ProgramTree> {
        self.repository
            .get(identity)?
            .ok_or_else(|| {
                DomainError::ProgramTreeNotFound {
                    code: identity.code.clone(),
                    year: identity.year,
                }
                .into()
            })
    }

    /// Registered program trees.
    pub fn list(&self) -> ApplicationResult<Vec<ProgramTree>> {
        Ok(self.repository.search(&TreeSearch::Roots)?)
    }

    /// Any stored node, with its stored children.
    fn stored_node(&self, identity: &NodeIdentity) -> ApplicationResult<Node> {
        let tree = self.repository.get(identity)?.ok_or_else(|| {
            ApplicationError::from(DomainError::NodeIdentityNotFound {
                code: identity.code.clone(),
                year: identity.year,
            })
        })?;
        Ok(tree.root_node().clone())
    }

    #[instrument(skip(self), fields(tree = %cmd.tree, node = %cmd.node))]
    pub fn attach(&self, cmd: &AttachNodeCommand) -> ApplicationResult<Vec<Message>> {
        let mut tree = self.load(&cmd.tree)?;
        let node = self.stored_node(&cmd.node)?;
        let messages = tree.attach_node(node, &cmd.path, &cmd.params, &self.context())?;
        self.repository.update(&tree)?;
        info!("attach: {} under {} saved", cmd.node, cmd.path);
        Ok(messages)
    }

    /// Validate a paste without changing anything.
    pub fn check_paste(&self, cmd: &PasteNodeCommand) -> ApplicationResult<()> {
        let tree = self.load(&cmd.tree)?;
        let node = self.stored_node(&cmd.node)?;
        Ok(tree.check_paste(node, &cmd.path_where_to_paste, &self.context())?)
    }

    #[instrument(skip(self), fields(tree = %cmd.tree, node = %cmd.node))]
    pub fn paste(&self, cmd: &PasteNodeCommand) -> ApplicationResult<Vec<Message>> {
        let mut tree = self.load(&cmd.tree)?;
        let node = self.stored_node(&cmd.node)?;
        let messages = tree.paste_node(
            node,
            &cmd.path_where_to_paste,
            cmd.path_where_to_detach.as_ref(),
            &cmd.params,
            &self.context(),
        )?;
        self.repository.update(&tree)?;
        Ok(messages)
    }

    #[instrument(skip(self), fields(tree = %cmd.tree, path = %cmd.path))]
    pub fn detach(&self, cmd: &DetachNodeCommand) -> ApplicationResult<Vec<Message>> {
        let mut tree = self.load(&cmd.tree)?;
        let messages = tree.detach_node(&cmd.path, &self.context())?;
        self.repository.update(&tree)?;
        Ok(messages)
    }

    #[instrument(skip(self), fields(tree = %cmd.tree, path = %cmd.path))]
    pub fn update_link(&self, cmd: &UpdateLinkCommand) -> ApplicationResult<Vec<Message>> {
        let mut tree = self.load(&cmd.tree)?;
        let messages = tree.update_link(&cmd.path, &cmd.params, &self.context())?;
        self.repository.update(&tree)?;
        Ok(messages)
    }

    /// Returns whether the child moved.
    pub fn order(&self, cmd: &OrderLinkCommand) -> ApplicationResult<bool> {
        let mut tree = self.load(&cmd.tree)?;
        let moved = match cmd.direction {
            OrderDirection::Up => tree.order_up(&cmd.path)?,
            OrderDirection::Down => tree.order_down(&cmd.path)?,
        };
        if moved {
            self.repository.update(&tree)?;
        } else {
            debug!("order: {} already at the edge", cmd.path);
        }
        Ok(moved)
    }

    #[instrument(skip(self), fields(tree = %cmd.tree, node = %cmd.node))]
    pub fn set_prerequisite(&self, cmd: &UpdatePrerequisiteCommand) -> ApplicationResult<Vec<Message>> {
        let mut tree = self.load(&cmd.tree)?;
        let messages = tree.set_prerequisite(
            &cmd.expression,
            &cmd.node,
            cmd.context.as_ref(),
            &self.context(),
        )?;
        self.repository.update(&tree)?;
        Ok(messages)
    }

    /// Validate a prerequisite change on a throwaway copy.
    pub fn check_prerequisite(&self, cmd: &UpdatePrerequisiteCommand) -> ApplicationResult<Vec<Message>> {
        let mut tree = self.load(&cmd.tree)?;
        Ok(tree.set_prerequisite(
            &cmd.expression,
            &cmd.node,
            cmd.context.as_ref(),
            &self.context(),
        )?)
    }

    #[instrument(skip(self), fields(tree = %cmd.tree))]
    pub fn delete_tree(&self, cmd: &DeleteTreeCommand) -> ApplicationResult<Vec<Message>> {
        let tree = self.load(&cmd.tree)?;
        tree.check_delete(&self.context())?;
        self.repository.delete(&cmd.tree)?;
        Ok(vec![Message::success(format!(
            "Program tree {} has been deleted",
            cmd.tree
        ))])
    }

    /// Every occurrence of the node with this identity in the tree.
    pub fn occurrences(
        &self,
        tree: &ProgramTreeIdentity,
        node: &NodeIdentity,
    ) -> ApplicationResult<Vec<Path>> {
        let tree = self.load(tree)?;
        let found = tree.get_node_by_identity(node)?;
        Ok(tree.paths_of(found.node_id))
    }
}
