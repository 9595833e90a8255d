//! Subcommand implementations

pub mod interfaces;
pub mod labs;
pub mod tree;
