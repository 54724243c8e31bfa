//! Wires the data source, the engine and the reward store together.

pub mod orchestrator;

pub use orchestrator::{CampaignReport, OrchestrationError, Orchestrator, RunSummary};
