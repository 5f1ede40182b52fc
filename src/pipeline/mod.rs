//! Investigation pipeline components

pub mod audit;
pub mod orchestrator;
pub mod stage;

pub use audit::{AuditEntry, AuditOutcome, AuditTrail};
pub use orchestrator::InvestigationPipeline;
pub use stage::{Stage, StageMachine};
