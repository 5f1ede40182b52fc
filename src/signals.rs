//! Risk signal extraction.
//!
//! Derives the statistical and geo-temporal signals the fuzzy engine fuses
//! from one transaction and the user's baseline. Extraction never fails:
//! degraded inputs are substituted and flagged on the returned signals.

use crate::config::DetectionPolicy;
use crate::types::assessment::RiskSignals;
use crate::types::transaction::{BaselineProfile, Transaction};
use tracing::warn;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Signal extractor bound to a detection policy.
#[derive(Debug, Clone)]
pub struct RiskSignalExtractor {
    policy: DetectionPolicy,
}

impl RiskSignalExtractor {
    pub fn new(policy: DetectionPolicy) -> Self {
        Self { policy }
    }

    /// Extract signals from a transaction against a baseline.
    pub fn extract(&self, tx: &Transaction, baseline: &BaselineProfile) -> RiskSignals {
        // z_score
        let std_fallback_applied = baseline.is_degraded();
        let effective_std = if std_fallback_applied {
            self.policy.std_fallback
        } else {
            baseline.std_amount
        };
        let z_score = ((tx.amount - baseline.mean_amount) / effective_std).abs();

        if std_fallback_applied {
            warn!(
                std_amount = baseline.std_amount,
                fallback = effective_std,
                "Degraded baseline, substituting fallback standard deviation"
            );
        }

        // elapsed_hours (negative when the baseline is newer)
        let elapsed_hours = (tx.timestamp - baseline.last_time).num_milliseconds() as f64
            / 1000.0
            / SECONDS_PER_HOUR;

        if elapsed_hours < 0.0 {
            warn!(
                elapsed_hours = elapsed_hours,
                "Baseline is newer than the transaction"
            );
        }

        // geo-temporal rules
        let location_changed = tx.location != baseline.last_location;
        let impossible_travel =
            location_changed && elapsed_hours < self.policy.travel_threshold_hours;
        let high_risk_jurisdiction = self.policy.is_high_risk(&tx.location);

        RiskSignals {
            z_score,
            elapsed_hours,
            location_changed,
            impossible_travel,
            high_risk_jurisdiction,
            velocity_violation: impossible_travel || high_risk_jurisdiction,
            from_location: baseline.last_location.clone(),
            to_location: tx.location.clone(),
            effective_std,
            std_fallback_applied,
        }
    }
}

impl Default for RiskSignalExtractor {
    fn default() -> Self {
        Self::new(DetectionPolicy::default())
    }
}
