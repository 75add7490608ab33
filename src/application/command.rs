//! Commands carried from the outer layers into [`ProgramTreeService`](crate::application::services::ProgramTreeService).
//!
//! Commands hold identities and raw values only; the service resolves them
//! against a loaded snapshot.

use crate::domain::{LinkParams, NodeIdentity, Path, ProgramTreeIdentity};

/// Attach a stored node under the node at `path`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachNodeCommand {
    pub tree: ProgramTreeIdentity,
    pub path: Path,
    pub node: NodeIdentity,
    pub params: LinkParams,
}

/// Attach, optionally detaching the same node elsewhere first (a move).
#[derive(Debug, Clone, PartialEq)]
pub struct PasteNodeCommand {
    pub tree: ProgramTreeIdentity,
    pub path_where_to_paste: Path,
    pub path_where_to_detach: Option<Path>,
    pub node: NodeIdentity,
    pub params: LinkParams,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachNodeCommand {
    pub tree: ProgramTreeIdentity,
    pub path: Path,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateLinkCommand {
    pub tree: ProgramTreeIdentity,
    pub path: Path,
    pub params: LinkParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLinkCommand {
    pub tree: ProgramTreeIdentity,
    pub path: Path,
    pub direction: OrderDirection,
}

/// Replace the prerequisite of a learning unit, edited in the context of `tree`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePrerequisiteCommand {
    pub tree: ProgramTreeIdentity,
    pub node: NodeIdentity,
    pub expression: String,
    /// Occurrence under which referenced codes are expected; misses are warnings.
    pub context: Option<Path>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTreeCommand {
    pub tree: ProgramTreeIdentity,
}
