//! Infrastructure layer: repository implementation, TOML store and DI container
//!
//! This layer implements the repository port and wires up services.

pub mod di;
pub mod error;
pub mod repository;
pub mod toml_store;

pub use error::{InfraError, InfraResult};
pub use repository::{InMemoryProgramTreeRepository, StoreSnapshot};
pub use toml_store::TomlStore;
