//! Loading and saving the TOML store file.

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use progtree::config::Settings;
use progtree::domain::{
    LinkParams, LinkType, PrerequisiteGrammar, ProgramTreeRepository, TreeSearch,
};
use progtree::application::command::{AttachNodeCommand, UpdatePrerequisiteCommand};
use progtree::infrastructure::di::ServiceContainer;
use progtree::infrastructure::{InfraError, TomlStore};
use progtree::util::testing::{self, identity, path, BACHELOR, COMMON_CORE, GROUP};

const STORE: &str = r#"
[[relationships]]
parent_type = "BACHELOR"
child_type = "COMMON_CORE"
min_count_authorized = 1
max_count_authorized = 1

[[relationships]]
parent_type = "COMMON_CORE"
child_type = "LEARNING_UNIT"

[[nodes]]
node_id = 1
code = "LDROI100B"
year = 2024
node_type = "BACHELOR"
title = "Bachelier en droit"

[[nodes]]
node_id = 2
code = "LDROI100T"
year = 2024
node_type = "COMMON_CORE"

[[nodes]]
node_id = 3
code = "LDROI1001"
year = 2024
node_type = "LEARNING_UNIT"
credits = 5

[[nodes]]
node_id = 4
code = "LDROI1002"
year = 2024
node_type = "LEARNING_UNIT"
credits = 4

[[links]]
parent = 1
child = 2

[[links]]
parent = 2
child = 4
order = 1
block = "2"

[[links]]
parent = 2
child = 3
order = 0
block = "12"

[[trees]]
root = 1

[trees.prerequisites]
LDROI1002 = "LDROI1001"
"#;

fn write_store(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let file = dir.path().join("programs.toml");
    fs::write(&file, content).expect("write store");
    file
}

#[test]
fn given_store_file_when_loading_then_tree_and_prerequisites_restored() {
    testing::init_test_setup();
    let dir = TempDir::new().unwrap();
    let store = TomlStore::new(write_store(&dir, STORE), PrerequisiteGrammar::default());

    let repository = store.load().unwrap();

    let tree = repository.get(&identity("LDROI100B")).unwrap().unwrap();
    let core = tree.get_node(&path(&[1, 2])).unwrap();
    let children: Vec<i64> = core.children().iter().map(|l| l.child).collect();
    assert_eq!(children, vec![3, 4]);
    assert_eq!(
        tree.get_link(&path(&[1, 2, 3])).unwrap().block.map(|b| b.to_string()),
        Some("12".to_string())
    );
    let unit = tree.get_node_by_identity(&identity("LDROI1002")).unwrap();
    assert_eq!(unit.prerequisite().unwrap().to_string(), "LDROI1001");
    assert_eq!(tree.root_node().title, "Bachelier en droit");
}

#[test]
fn given_loaded_store_when_saving_then_reload_is_identical() {
    let dir = TempDir::new().unwrap();
    let file = write_store(&dir, STORE);
    let store = TomlStore::new(&file, PrerequisiteGrammar::default());
    let repository = store.load().unwrap();

    store.save(&repository).unwrap();
    let reloaded = store.load().unwrap();

    let before = repository.get(&identity("LDROI100B")).unwrap().unwrap();
    let after = reloaded.get(&identity("LDROI100B")).unwrap().unwrap();
    assert_eq!(before, after);
    let saved = fs::read_to_string(&file).unwrap();
    assert!(saved.contains("saved_at"));
    assert!(!dir.path().join("programs.toml.tmp").exists());
}

#[test]
fn given_link_to_unknown_node_when_loading_then_store_error() {
    let dir = TempDir::new().unwrap();
    let broken = format!("{STORE}\n[[links]]\nparent = 2\nchild = 99\n");
    let store = TomlStore::new(write_store(&dir, &broken), PrerequisiteGrammar::default());

    let result = store.load();

    assert!(matches!(result, Err(InfraError::Store { .. })));
}

#[test]
fn given_bad_stored_prerequisite_when_loading_then_store_error() {
    let dir = TempDir::new().unwrap();
    let broken = STORE.replace(r#"LDROI1002 = "LDROI1001""#, r#"LDROI1002 = "LDROI1001 ET""#);
    let store = TomlStore::new(write_store(&dir, &broken), PrerequisiteGrammar::default());

    assert!(matches!(store.load(), Err(InfraError::Store { .. })));
}

#[test]
fn given_missing_file_when_loading_then_io_error() {
    let dir = TempDir::new().unwrap();
    let store = TomlStore::new(dir.path().join("absent.toml"), PrerequisiteGrammar::default());

    assert!(matches!(store.load(), Err(InfraError::Io { .. })));
}

#[test]
fn given_container_over_store_when_mutating_and_persisting_then_file_updated() {
    let dir = TempDir::new().unwrap();
    let file = write_store(&dir, STORE);
    let container = ServiceContainer::new(Settings::default(), Some(file.as_path())).unwrap();

    container
        .program_trees
        .set_prerequisite(&UpdatePrerequisiteCommand {
            tree: identity("LDROI100B"),
            node: identity("LDROI1002"),
            expression: "".into(),
            context: None,
        })
        .unwrap();
    container.persist().unwrap();

    let reloaded = TomlStore::new(&file, PrerequisiteGrammar::default()).load().unwrap();
    let tree = reloaded.get(&identity("LDROI100B")).unwrap().unwrap();
    assert!(tree.get_nodes_that_have_prerequisites().is_empty());
}

#[test]
fn given_sample_repository_when_saved_then_every_registered_tree_survives() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("sample.toml");
    let repository = testing::sample_repository();
    let service = testing::service(Arc::clone(&repository), Settings::default());
    service
        .attach(&AttachNodeCommand {
            tree: identity("LDROI100B"),
            path: path(&[BACHELOR, COMMON_CORE, GROUP]),
            node: identity("LDROI102G"),
            params: LinkParams::reference(),
        })
        .unwrap();

    let store = TomlStore::new(&file, PrerequisiteGrammar::default());
    store.save(&repository).unwrap();
    let reloaded = store.load().unwrap();

    assert_eq!(reloaded.search(&TreeSearch::Roots).unwrap().len(), 1);
    let tree = reloaded.get(&identity("LDROI100B")).unwrap().unwrap();
    let link = tree.get_link(&path(&[BACHELOR, COMMON_CORE, GROUP, 6])).unwrap();
    assert_eq!(link.link_type, LinkType::Reference);
}
