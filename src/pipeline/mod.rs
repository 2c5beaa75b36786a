pub mod caption;
pub mod orchestrator;
pub mod prompt_architect;
pub mod style;
pub mod types;

pub use orchestrator::{Orchestrator, OrchestratorSettings};
