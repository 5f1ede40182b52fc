//! AML Triage Pipeline Library
//!
//! Screens single transactions against a user's behavioral baseline, fuses
//! statistical and geo-temporal signals into a fuzzy risk score, and runs
//! each transaction through an audited investigation pipeline.

pub mod collaborators;
pub mod config;
pub mod consumer;
pub mod error;
pub mod pipeline;
pub mod producer;
pub mod scoring;
pub mod signals;
pub mod stats;
pub mod types;

pub use config::{AppConfig, DetectionPolicy};
pub use consumer::RequestConsumer;
pub use error::{Result, TriageError};
pub use pipeline::InvestigationPipeline;
pub use producer::CaseProducer;
pub use scoring::FuzzyRiskEngine;
pub use signals::RiskSignalExtractor;
pub use stats::TriageStats;
pub use types::{
    BaselineProfile, InvestigationCase, RiskAction, RiskAssessment, RiskSignals, Transaction,
    TriageRequest,
};
