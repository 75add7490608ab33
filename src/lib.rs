//! Curriculum program trees.
//!
//! Programs are rooted DAGs of reusable nodes (trainings, groups, learning
//! units) joined by attributed links. Every structural edit runs through a
//! two-phase validator pipeline before it touches the tree.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
