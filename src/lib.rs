pub mod advisor;
pub mod audit;
pub mod candidate;
pub mod cli;
pub mod config;
pub mod ecosystem;
pub mod error;
pub mod forge;
pub mod impact;
pub mod manifest;
pub mod process;
pub mod registry;
pub mod repo;
pub mod result;
pub mod scanner;
pub mod testgen;
pub mod usage;
pub mod version;
pub mod workflow;

pub use cli::Args;
pub use workflow::{Collaborators, UpgradeWorkflow, WorkflowResult};

#[cfg(test)]
pub mod test_helpers;
