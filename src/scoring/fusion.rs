//! Weighted fusion of membership degrees

use crate::config::DetectionPolicy;
use crate::error::{Result, TriageError};

const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Validated weight pair for the statistical and velocity memberships.
/// Weights are non-negative and sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    z_weight: f64,
    vel_weight: f64,
}

impl FusionWeights {
    /// Accept a pair only if it already sums to 1.
    pub fn new(z_weight: f64, vel_weight: f64) -> Result<Self> {
        Self::check_components(z_weight, vel_weight)?;
        let total = z_weight + vel_weight;
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(TriageError::config(format!(
                "fusion weights must sum to 1.0, got {} + {} = {}",
                z_weight, vel_weight, total
            )));
        }
        Ok(Self {
            z_weight,
            vel_weight,
        })
    }

    /// Divide a pair by its sum. Only a non-positive sum is rejected.
    pub fn renormalized(z_weight: f64, vel_weight: f64) -> Result<Self> {
        Self::check_components(z_weight, vel_weight)?;
        let total = z_weight + vel_weight;
        if total <= 0.0 {
            return Err(TriageError::config(
                "fusion weights sum to zero, cannot renormalize",
            ));
        }
        Ok(Self {
            z_weight: z_weight / total,
            vel_weight: vel_weight / total,
        })
    }

    /// Build from a policy, honoring its renormalization switch.
    pub fn from_policy(policy: &DetectionPolicy) -> Result<Self> {
        if policy.renormalize_weights {
            Self::renormalized(policy.z_weight, policy.vel_weight)
        } else {
            Self::new(policy.z_weight, policy.vel_weight)
        }
    }

    pub fn z_weight(&self) -> f64 {
        self.z_weight
    }

    pub fn vel_weight(&self) -> f64 {
        self.vel_weight
    }

    /// Fuse two memberships into a score in [0, 1].
    pub fn fuse(&self, z_membership: f64, vel_membership: f64) -> f64 {
        (z_membership * self.z_weight + vel_membership * self.vel_weight).clamp(0.0, 1.0)
    }

    fn check_components(z_weight: f64, vel_weight: f64) -> Result<()> {
        if !z_weight.is_finite() || !vel_weight.is_finite() || z_weight < 0.0 || vel_weight < 0.0
        {
            return Err(TriageError::config(format!(
                "fusion weights must be finite and non-negative, got z={} vel={}",
                z_weight, vel_weight
            )));
        }
        Ok(())
    }
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            z_weight: 0.5,
            vel_weight: 0.5,
        }
    }
}
