//! Fuzzy risk scoring components

pub mod engine;
pub mod fusion;
pub mod membership;

pub use engine::FuzzyRiskEngine;
pub use fusion::FusionWeights;
