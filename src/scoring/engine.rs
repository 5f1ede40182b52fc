//! Fuzzy risk engine: fuses signals into a score, an action, and a
//! structured explanation.

use super::fusion::FusionWeights;
use super::membership::{crisp, linear_ramp};
use crate::config::DetectionPolicy;
use crate::error::Result;
use crate::types::assessment::{Reasoning, RiskAction, RiskAssessment, RiskSignals};
use tracing::debug;

/// Pure, deterministic scorer. Construction validates the policy, so
/// `score` itself cannot fail.
#[derive(Debug, Clone)]
pub struct FuzzyRiskEngine {
    policy: DetectionPolicy,
    weights: FusionWeights,
}

impl FuzzyRiskEngine {
    /// Create an engine, rejecting policies that break their invariants
    pub fn new(policy: DetectionPolicy) -> Result<Self> {
        policy.validate()?;
        let weights = FusionWeights::from_policy(&policy)?;
        Ok(Self { policy, weights })
    }

    pub fn weights(&self) -> FusionWeights {
        self.weights
    }

    pub fn suspicion_threshold(&self) -> f64 {
        self.policy.suspicion_threshold
    }

    /// Score a set of signals.
    pub fn score(&self, signals: &RiskSignals) -> RiskAssessment {
        let z_membership =
            linear_ramp(signals.z_score, self.policy.z_floor, self.policy.z_ceiling);
        let vel_membership = crisp(signals.velocity_violation);

        let fuzzy_score = self.weights.fuse(z_membership, vel_membership);
        let action = RiskAction::from_score(fuzzy_score, &self.policy.cutoffs);
        let is_suspicious = fuzzy_score >= self.policy.suspicion_threshold;

        debug!(
            z_score = signals.z_score,
            z_membership = z_membership,
            vel_membership = vel_membership,
            fuzzy_score = fuzzy_score,
            action = %action,
            "Fuzzy inference complete"
        );

        RiskAssessment {
            fuzzy_score,
            action,
            is_suspicious,
            reasoning: Reasoning {
                z_score: signals.z_score,
                z_membership,
                vel_membership,
                z_weight: self.weights.z_weight(),
                vel_weight: self.weights.vel_weight(),
                velocity_rule: signals.velocity_rule(),
                elapsed_hours: signals.elapsed_hours,
                location_changed: signals.location_changed,
                from_location: signals.from_location.clone(),
                to_location: signals.to_location.clone(),
                effective_std: signals.effective_std,
                std_fallback_applied: signals.std_fallback_applied,
                clock_anomaly: signals.has_clock_anomaly(),
            },
        }
    }
}

impl Default for FuzzyRiskEngine {
    fn default() -> Self {
        Self {
            policy: DetectionPolicy::default(),
            weights: FusionWeights::default(),
        }
    }
}
