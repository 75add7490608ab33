//! Application layer: commands and use cases
//!
//! This layer orchestrates domain logic and depends on the repository port.

pub mod command;
pub mod error;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
