//! Domain layer: program tree model, prerequisite engine and business rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod authorized_relationship;
pub mod builder;
pub mod error;
pub mod link;
pub mod message;
pub mod node;
pub mod node_type;
pub mod path;
pub mod prerequisite;
pub mod program_tree;
pub mod repository;
pub mod validators;

pub use arena::NodeArena;
pub use authorized_relationship::{AuthorizedRelationship, AuthorizedRelationshipList};
pub use builder::ProgramTreeBuilder;
pub use error::{DomainError, DomainResult};
pub use link::{Block, Link, LinkParams, LinkType};
pub use message::{Message, MessageLevel, Violation, Violations};
pub use node::{Node, NodeId, NodeIdentity, NodeKind};
pub use node_type::{GroupType, MiniTrainingType, NodeType, TrainingType};
pub use path::{Path, PATH_SEPARATOR};
pub use prerequisite::{Keywords, Operator, Prerequisite, PrerequisiteGrammar, PrerequisiteItem};
pub use program_tree::ProgramTree;
pub use repository::{ProgramTreeIdentity, ProgramTreeRepository, TreeSearch};
pub use validators::ValidationContext;
