//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the repository port but are themselves concrete structs.

mod program_tree;

pub use program_tree::ProgramTreeService;
