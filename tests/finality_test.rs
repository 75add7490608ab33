//! 2-year master programs: finality end dates and options declared by the program.

use std::collections::BTreeMap;
use std::sync::Arc;

use rstest::{fixture, rstest};

use progtree::application::command::{AttachNodeCommand, DetachNodeCommand};
use progtree::application::services::ProgramTreeService;
use progtree::application::ApplicationError;
use progtree::config::Settings;
use progtree::domain::{
    AuthorizedRelationship, AuthorizedRelationshipList, GroupType, LinkParams, MiniTrainingType,
    Node, NodeId, ProgramTreeBuilder, TrainingType, Violation,
};
use progtree::infrastructure::repository::TreePrerequisites;
use progtree::infrastructure::{InMemoryProgramTreeRepository, StoreSnapshot};
use progtree::util::testing::{self, identity, path, YEAR};

const MASTER: NodeId = 10;
const FINALITIES: NodeId = 11;
const LATE_FINALITY: NodeId = 12;
const FINALITY: NodeId = 13;
const OPTION: NodeId = 14;
const OPTIONS: NodeId = 15;

fn relationships() -> AuthorizedRelationshipList {
    let master = TrainingType::PgrmMaster120;
    AuthorizedRelationshipList::new(vec![
        AuthorizedRelationship::new(master, GroupType::Finality120ListChoice, 0, Some(1)),
        AuthorizedRelationship::new(master, GroupType::OptionListChoice, 0, Some(1)),
        AuthorizedRelationship::new(GroupType::Finality120ListChoice, TrainingType::MasterMa120, 0, None),
        AuthorizedRelationship::new(GroupType::Finality120ListChoice, TrainingType::MasterMd120, 0, None),
        AuthorizedRelationship::new(GroupType::OptionListChoice, MiniTrainingType::Option, 0, None),
        AuthorizedRelationship::new(TrainingType::MasterMd120, MiniTrainingType::Option, 0, None),
    ])
}

/// `LDROI200M` (ends 2028) with an empty finality list and an empty option list.
fn repository() -> Arc<InMemoryProgramTreeRepository> {
    let mut graph = ProgramTreeBuilder::new(Arc::new(relationships()));
    let master = graph.node(
        Node::new(MASTER, "LDROI200M", YEAR, TrainingType::PgrmMaster120.into()).with_end_year(2028),
    );
    graph
        .child(
            master,
            Node::new(FINALITIES, "LDROI200F", YEAR, GroupType::Finality120ListChoice.into()),
        )
        .unwrap();
    graph
        .child(
            master,
            Node::new(OPTIONS, "LDROI200O", YEAR, GroupType::OptionListChoice.into()),
        )
        .unwrap();
    graph.node(
        Node::new(LATE_FINALITY, "LDROI2MA", YEAR, TrainingType::MasterMa120.into()).with_end_year(2030),
    );
    graph.node(
        Node::new(FINALITY, "LDROI2MD", YEAR, TrainingType::MasterMd120.into()).with_end_year(2027),
    );
    graph.node(Node::new(OPTION, "LDROI2OP", YEAR, MiniTrainingType::Option.into()));

    let mut trees = BTreeMap::new();
    trees.insert(MASTER, TreePrerequisites::new());
    let snapshot = StoreSnapshot {
        relationships: relationships(),
        nodes: graph.nodes().nodes().cloned().collect(),
        trees,
    };
    Arc::new(InMemoryProgramTreeRepository::from_snapshot(snapshot).unwrap())
}

#[fixture]
fn service() -> ProgramTreeService {
    testing::init_test_setup();
    testing::service(repository(), Settings::default())
}

fn attach(service: &ProgramTreeService, at: &[NodeId], code: &str) -> Result<(), ApplicationError> {
    service
        .attach(&AttachNodeCommand {
            tree: identity("LDROI200M"),
            path: path(at),
            node: identity(code),
            params: LinkParams::default(),
        })
        .map(|_| ())
}

fn has(err: &ApplicationError, predicate: impl Fn(&Violation) -> bool) -> bool {
    err.violations().is_some_and(|v| v.contains(predicate))
}

#[rstest]
fn given_finality_ending_after_program_when_attaching_then_rejected(service: ProgramTreeService) {
    let err = attach(&service, &[MASTER, FINALITIES], "LDROI2MA").unwrap_err();

    assert!(has(&err, |v| matches!(
        v,
        Violation::FinalityEndDateGreaterThan2M { program_end: 2028, finalities, .. }
            if finalities == "LDROI2MA"
    )));
}

#[rstest]
fn given_finality_ending_before_program_when_attaching_then_accepted(service: ProgramTreeService) {
    attach(&service, &[MASTER, FINALITIES], "LDROI2MD").unwrap();

    let tree = service.load(&identity("LDROI200M")).unwrap();
    assert_eq!(tree.get_all_finalities().len(), 1);
}

#[rstest]
fn given_undeclared_option_when_attaching_in_finality_then_rejected(service: ProgramTreeService) {
    attach(&service, &[MASTER, FINALITIES], "LDROI2MD").unwrap();

    let err = attach(&service, &[MASTER, FINALITIES, FINALITY], "LDROI2OP").unwrap_err();

    assert!(has(&err, |v| matches!(v, Violation::OptionNotInParent2M { .. })));
}

#[rstest]
fn given_option_used_by_finality_when_detaching_from_program_then_rejected(
    service: ProgramTreeService,
) {
    attach(&service, &[MASTER, OPTIONS], "LDROI2OP").unwrap();
    attach(&service, &[MASTER, FINALITIES], "LDROI2MD").unwrap();
    attach(&service, &[MASTER, FINALITIES, FINALITY], "LDROI2OP").unwrap();

    let err = service
        .detach(&DetachNodeCommand {
            tree: identity("LDROI200M"),
            path: path(&[MASTER, OPTIONS, OPTION]),
        })
        .unwrap_err();

    assert!(has(&err, |v| matches!(
        v,
        Violation::CannotDetachOptionUsedInFinality { options, finalities }
            if options == "LDROI2OP" && finalities == "LDROI2MD"
    )));
}

#[rstest]
fn given_option_unused_by_finalities_when_detaching_then_accepted(service: ProgramTreeService) {
    attach(&service, &[MASTER, OPTIONS], "LDROI2OP").unwrap();

    service
        .detach(&DetachNodeCommand {
            tree: identity("LDROI200M"),
            path: path(&[MASTER, OPTIONS, OPTION]),
        })
        .unwrap();

    let tree = service.load(&identity("LDROI200M")).unwrap();
    assert!(tree.get_option_list().is_empty());
}
