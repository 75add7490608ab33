//! Service container for dependency injection
//!
//! Wires up the repository, the store file and the services.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::application::services::ProgramTreeService;
use crate::application::ApplicationError;
use crate::config::Settings;
use crate::domain::{AuthorizedRelationshipList, PrerequisiteGrammar};
use crate::infrastructure::{InMemoryProgramTreeRepository, InfraResult, TomlStore};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Repository shared by the services
    pub repository: Arc<InMemoryProgramTreeRepository>,

    pub program_trees: ProgramTreeService,

    /// Backing file, if any
    store: Option<TomlStore>,
}

impl ServiceContainer {
    /// Create a container over the store file (explicit path, else `settings.store_file`).
    ///
    /// Without any store file the repository starts empty and nothing is persisted.
    pub fn new(settings: Settings, store_path: Option<&Path>) -> InfraResult<Self> {
        let path = store_path
            .map(Path::to_path_buf)
            .or_else(|| settings.store_file.clone());
        let Some(path) = path else {
            debug!("no store file configured, using an empty repository");
            let repository = InMemoryProgramTreeRepository::new(AuthorizedRelationshipList::default());
            return Self::with_deps(settings, Arc::new(repository));
        };

        let grammar = grammar_for(&settings)?;
        let store = TomlStore::new(path, grammar);
        let repository = Arc::new(store.load()?);
        let mut container = Self::with_deps(settings, repository)?;
        container.store = Some(store);
        Ok(container)
    }

    /// Create a service container with a given repository (for testing).
    pub fn with_deps(settings: Settings, repository: Arc<InMemoryProgramTreeRepository>) -> InfraResult<Self> {
        let settings = Arc::new(settings);
        let program_trees = ProgramTreeService::new(repository.clone(), Arc::clone(&settings))?;

        Ok(Self {
            settings,
            repository,
            program_trees,
            store: None,
        })
    }

    pub fn store(&self) -> Option<&TomlStore> {
        self.store.as_ref()
    }

    /// Write the repository back to the store file, if there is one.
    pub fn persist(&self) -> InfraResult<()> {
        match &self.store {
            Some(store) => store.save(&self.repository),
            None => Ok(()),
        }
    }
}

fn grammar_for(settings: &Settings) -> InfraResult<PrerequisiteGrammar> {
    let pattern = &settings.prerequisite.course_code_pattern;
    PrerequisiteGrammar::new(pattern).map_err(|e| {
        ApplicationError::Config {
            message: format!("invalid course code pattern '{}': {}", pattern, e),
        }
        .into()
    })
}
