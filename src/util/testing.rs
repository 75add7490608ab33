//! Test setup: logging plus a small sample catalogue of program nodes.

use std::collections::BTreeMap;
use std::env;
use std::sync::{Arc, Once};

use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::application::services::ProgramTreeService;
use crate::config::Settings;
use crate::domain::{
    AuthorizedRelationship, AuthorizedRelationshipList, GroupType, Link, Node, NodeId,
    NodeIdentity, NodeType, Path, TrainingType,
};
use crate::infrastructure::repository::TreePrerequisites;
use crate::infrastructure::{InMemoryProgramTreeRepository, StoreSnapshot};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "debug");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    // Create a filter for noisy modules
    let noisy_modules = ["config::"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

pub const YEAR: i32 = 2024;

/// Bachelor `LDROI100B`, registered as a program tree.
pub const BACHELOR: NodeId = 1;
/// Its common core `LDROI100T`.
pub const COMMON_CORE: NodeId = 2;
/// Sub-group `LDROI101G` under the common core.
pub const GROUP: NodeId = 3;
/// Learning unit `LDROI1001` under the sub-group.
pub const UNIT_A: NodeId = 4;
/// Stored learning unit `LDROI1002`, linked nowhere.
pub const UNIT_B: NodeId = 5;
/// Stored sub-group `LDROI102G`, linked nowhere, holding `LDROI1003`.
pub const SPARE_GROUP: NodeId = 6;
pub const UNIT_C: NodeId = 7;

pub fn identity(code: &str) -> NodeIdentity {
    NodeIdentity::new(code, YEAR)
}

pub fn path(ids: &[NodeId]) -> Path {
    Path::from_ids(ids.to_vec()).expect("test path")
}

/// Bachelor accepts exactly one common core; groups accept groups and units.
pub fn relationships() -> AuthorizedRelationshipList {
    let bachelor = TrainingType::Bachelor;
    let core = GroupType::CommonCore;
    let sub = GroupType::SubGroup;
    AuthorizedRelationshipList::new(vec![
        AuthorizedRelationship::new(bachelor, core, 1, Some(1)),
        AuthorizedRelationship::new(bachelor, sub, 0, None),
        AuthorizedRelationship::new(core, sub, 0, None),
        AuthorizedRelationship::new(core, NodeType::LearningUnit, 0, None),
        AuthorizedRelationship::new(sub, sub, 0, None),
        AuthorizedRelationship::new(sub, NodeType::LearningUnit, 0, None),
    ])
}

fn linked(mut node: Node, children: &[NodeId]) -> Node {
    for (order, child) in children.iter().enumerate() {
        let mut link = Link::new(*child);
        link.order = order;
        node.push_loaded_child(link);
    }
    node
}

/// `LDROI100B | LDROI100T | LDROI101G | LDROI1001` plus spare stored nodes.
pub fn sample_snapshot() -> StoreSnapshot {
    let nodes = vec![
        linked(
            Node::new(BACHELOR, "LDROI100B", YEAR, TrainingType::Bachelor.into())
                .with_title("Bachelier en droit")
                .with_end_year(2030),
            &[COMMON_CORE],
        ),
        linked(
            Node::new(COMMON_CORE, "LDROI100T", YEAR, GroupType::CommonCore.into()),
            &[GROUP],
        ),
        linked(
            Node::new(GROUP, "LDROI101G", YEAR, GroupType::SubGroup.into()),
            &[UNIT_A],
        ),
        Node::new(UNIT_A, "LDROI1001", YEAR, NodeType::LearningUnit).with_credits(5),
        Node::new(UNIT_B, "LDROI1002", YEAR, NodeType::LearningUnit).with_credits(5),
        linked(
            Node::new(SPARE_GROUP, "LDROI102G", YEAR, GroupType::SubGroup.into()),
            &[UNIT_C],
        ),
        Node::new(UNIT_C, "LDROI1003", YEAR, NodeType::LearningUnit).with_credits(3),
    ];
    let mut trees = BTreeMap::new();
    trees.insert(BACHELOR, TreePrerequisites::new());
    StoreSnapshot {
        relationships: relationships(),
        nodes,
        trees,
    }
}

pub fn sample_repository() -> Arc<InMemoryProgramTreeRepository> {
    Arc::new(InMemoryProgramTreeRepository::from_snapshot(sample_snapshot()).expect("sample store"))
}

pub fn service(repository: Arc<InMemoryProgramTreeRepository>, settings: Settings) -> ProgramTreeService {
    ProgramTreeService::new(repository, Arc::new(settings)).expect("sample service")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProgramTreeRepository;

    #[test]
    fn given_sample_store_when_loading_bachelor_then_four_nodes() {
        init_test_setup();
        let repository = sample_repository();

        let tree = repository.get(&identity("LDROI100B")).unwrap().unwrap();

        assert_eq!(tree.get_all_nodes().len(), 4);
        assert!(tree.get_node(&path(&[BACHELOR, COMMON_CORE, GROUP, UNIT_A])).is_ok());
    }
}
