//! Risk signals, actions, and the structured assessment produced by scoring

use crate::error::{Result, TriageError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw signals derived from one transaction against one baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSignals {
    /// Standard deviations between amount and baseline mean (>= 0)
    pub z_score: f64,
    /// Hours since the baseline's last transaction; negative when the
    /// baseline is newer than the transaction
    pub elapsed_hours: f64,
    pub location_changed: bool,
    /// Location changed faster than the travel threshold allows
    pub impossible_travel: bool,
    pub high_risk_jurisdiction: bool,
    /// `impossible_travel || high_risk_jurisdiction`
    pub velocity_violation: bool,
    /// Baseline location
    pub from_location: String,
    /// Transaction location
    pub to_location: String,
    /// Standard deviation actually used for the z-score
    pub effective_std: f64,
    /// Whether `effective_std` is the configured fallback
    pub std_fallback_applied: bool,
}

impl RiskSignals {
    /// Which crisp rule asserted `velocity_violation`
    pub fn velocity_rule(&self) -> VelocityRule {
        match (self.impossible_travel, self.high_risk_jurisdiction) {
            (true, true) => VelocityRule::Both,
            (true, false) => VelocityRule::ImpossibleTravel,
            (false, true) => VelocityRule::HighRiskJurisdiction,
            (false, false) => VelocityRule::None,
        }
    }

    /// Negative elapsed time: the caller's baseline is out of order
    pub fn has_clock_anomaly(&self) -> bool {
        self.elapsed_hours < 0.0
    }
}

/// Rule that asserted a velocity violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VelocityRule {
    None,
    ImpossibleTravel,
    HighRiskJurisdiction,
    /// Impossible travel into a high-risk jurisdiction
    Both,
}

impl VelocityRule {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ImpossibleTravel => "impossible_travel",
            Self::HighRiskJurisdiction => "high_risk_jurisdiction",
            Self::Both => "impossible_travel+high_risk_jurisdiction",
        }
    }
}

/// Recommended action, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskAction {
    Clear,
    Monitor,
    Restrict,
    Freeze,
}

impl RiskAction {
    /// Defuzzify a score. Each cutoff is inclusive on its lower bound.
    pub fn from_score(score: f64, cutoffs: &ActionCutoffs) -> Self {
        if score >= cutoffs.freeze {
            RiskAction::Freeze
        } else if score >= cutoffs.restrict {
            RiskAction::Restrict
        } else if score >= cutoffs.monitor {
            RiskAction::Monitor
        } else {
            RiskAction::Clear
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clear => "CLEAR",
            Self::Monitor => "MONITOR",
            Self::Restrict => "RESTRICT",
            Self::Freeze => "FREEZE",
        }
    }

    /// Human-facing recommendation for narratives
    pub fn recommendation(self) -> &'static str {
        match self {
            Self::Clear => "No action required",
            Self::Monitor => "Monitor account intensely",
            Self::Restrict => "Apply soft restriction pending review",
            Self::Freeze => "Immediate account freeze",
        }
    }
}

impl fmt::Display for RiskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered defuzzification cutoffs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionCutoffs {
    pub monitor: f64,
    pub restrict: f64,
    pub freeze: f64,
}

impl Default for ActionCutoffs {
    fn default() -> Self {
        Self {
            monitor: 0.3,
            restrict: 0.6,
            freeze: 0.85,
        }
    }
}

impl ActionCutoffs {
    /// Cutoffs must be finite, inside [0, 1], and strictly ascending.
    pub fn validate(&self) -> Result<()> {
        let cutoffs = [self.monitor, self.restrict, self.freeze];
        if cutoffs
            .iter()
            .any(|c| !c.is_finite() || *c < 0.0 || *c > 1.0)
        {
            return Err(TriageError::config(format!(
                "action cutoffs must lie in [0, 1], got {:?}",
                cutoffs
            )));
        }
        if !(self.monitor < self.restrict && self.restrict < self.freeze) {
            return Err(TriageError::config(format!(
                "action cutoffs must be ascending (monitor < restrict < freeze), got {:?}",
                cutoffs
            )));
        }
        Ok(())
    }
}

/// Structured explanation of a score. Every number that went into the
/// fusion is recorded so the decision can be recomputed from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reasoning {
    pub z_score: f64,
    pub z_membership: f64,
    pub vel_membership: f64,
    pub z_weight: f64,
    pub vel_weight: f64,
    pub velocity_rule: VelocityRule,
    pub elapsed_hours: f64,
    pub location_changed: bool,
    pub from_location: String,
    pub to_location: String,
    pub effective_std: f64,
    pub std_fallback_applied: bool,
    /// Baseline newer than the transaction
    pub clock_anomaly: bool,
}

impl fmt::Display for Reasoning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "z={:.2}, z_membership={:.2}, vel_membership={:.2}, w_z={:.2}, w_vel={:.2}, rule={}, elapsed_h={:.2}, loc={}->{}",
            self.z_score,
            self.z_membership,
            self.vel_membership,
            self.z_weight,
            self.vel_weight,
            self.velocity_rule.as_str(),
            self.elapsed_hours,
            self.from_location,
            self.to_location,
        )?;
        if self.std_fallback_applied {
            write!(f, ", std_fallback={:.2}", self.effective_std)?;
        }
        if self.clock_anomaly {
            f.write_str(", clock_anomaly=true")?;
        }
        Ok(())
    }
}

/// Output of the fuzzy risk engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Fused risk score in [0, 1]
    #[serde(rename = "score")]
    pub fuzzy_score: f64,
    pub action: RiskAction,
    /// `fuzzy_score >= suspicion_threshold`
    pub is_suspicious: bool,
    pub reasoning: Reasoning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_from_score() {
        let cutoffs = ActionCutoffs::default();

        assert_eq!(RiskAction::from_score(0.0, &cutoffs), RiskAction::Clear);
        assert_eq!(RiskAction::from_score(0.29, &cutoffs), RiskAction::Clear);
        assert_eq!(RiskAction::from_score(0.3, &cutoffs), RiskAction::Monitor);
        assert_eq!(RiskAction::from_score(0.5, &cutoffs), RiskAction::Monitor);
        assert_eq!(RiskAction::from_score(0.6, &cutoffs), RiskAction::Restrict);
        assert_eq!(RiskAction::from_score(0.85, &cutoffs), RiskAction::Freeze);
        assert_eq!(RiskAction::from_score(1.0, &cutoffs), RiskAction::Freeze);
    }

    #[test]
    fn test_cutoffs_must_ascend() {
        let cutoffs = ActionCutoffs {
            monitor: 0.6,
            restrict: 0.3,
            freeze: 0.85,
        };
        assert!(cutoffs.validate().is_err());
        assert!(ActionCutoffs::default().validate().is_ok());
    }

    #[test]
    fn test_action_serializes_screaming_case() {
        let json = serde_json::to_string(&RiskAction::Freeze).unwrap();
        assert_eq!(json, "\"FREEZE\"");
        assert!(RiskAction::Clear < RiskAction::Monitor);
        assert!(RiskAction::Restrict < RiskAction::Freeze);
    }

    #[test]
    fn test_velocity_rule_selection() {
        let mut signals = RiskSignals {
            z_score: 0.0,
            elapsed_hours: 1.0,
            location_changed: true,
            impossible_travel: true,
            high_risk_jurisdiction: false,
            velocity_violation: true,
            from_location: "Dubai".to_string(),
            to_location: "London".to_string(),
            effective_std: 20.0,
            std_fallback_applied: false,
        };
        assert_eq!(signals.velocity_rule(), VelocityRule::ImpossibleTravel);

        signals.impossible_travel = false;
        signals.high_risk_jurisdiction = true;
        assert_eq!(signals.velocity_rule(), VelocityRule::HighRiskJurisdiction);

        signals.impossible_travel = true;
        assert_eq!(signals.velocity_rule(), VelocityRule::Both);
    }
}
