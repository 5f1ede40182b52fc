//! Configuration management for the triage pipeline

use crate::error::TriageError;
use crate::types::assessment::ActionCutoffs;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub nats: NatsConfig,
    #[serde(default)]
    pub detection: DetectionPolicy,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub collaborators: CollaboratorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming triage requests
    pub request_subject: String,
    /// Subject finished cases are published to
    pub case_subject: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            request_subject: "triage.requests".to_string(),
            case_subject: "triage.cases".to_string(),
        }
    }
}

/// Detection policy: every knob the extractor and the fuzzy engine read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionPolicy {
    /// Locations that always assert a velocity violation
    pub high_risk_jurisdictions: BTreeSet<String>,
    /// A location change faster than this is impossible travel
    pub travel_threshold_hours: f64,
    /// Standard deviation used when the baseline has none
    pub std_fallback: f64,
    /// z-score at which statistical membership starts rising
    pub z_floor: f64,
    /// z-score at which statistical membership saturates
    pub z_ceiling: f64,
    pub z_weight: f64,
    pub vel_weight: f64,
    /// Divide weights by their sum instead of rejecting a pair that is off
    pub renormalize_weights: bool,
    pub cutoffs: ActionCutoffs,
    pub suspicion_threshold: f64,
}

impl Default for DetectionPolicy {
    fn default() -> Self {
        Self {
            high_risk_jurisdictions: ["North Korea", "Russia", "Iran"]
                .into_iter()
                .map(String::from)
                .collect(),
            travel_threshold_hours: 4.0,
            std_fallback: 1.0,
            z_floor: 1.0,
            z_ceiling: 5.0,
            z_weight: 0.5,
            vel_weight: 0.5,
            renormalize_weights: false,
            cutoffs: ActionCutoffs::default(),
            suspicion_threshold: 0.6,
        }
    }
}

impl DetectionPolicy {
    /// Check everything except the weight pair, which `FusionWeights`
    /// validates together with the renormalization switch.
    pub fn validate(&self) -> std::result::Result<(), TriageError> {
        if !self.travel_threshold_hours.is_finite() || self.travel_threshold_hours < 0.0 {
            return Err(TriageError::config(format!(
                "travel_threshold_hours must be finite and >= 0, got {}",
                self.travel_threshold_hours
            )));
        }
        if !self.std_fallback.is_finite() || self.std_fallback <= 0.0 {
            return Err(TriageError::config(format!(
                "std_fallback must be finite and > 0, got {}",
                self.std_fallback
            )));
        }
        if !self.z_floor.is_finite() || !self.z_ceiling.is_finite() || self.z_ceiling <= self.z_floor
        {
            return Err(TriageError::config(format!(
                "z_ceiling must exceed z_floor, got floor={} ceiling={}",
                self.z_floor, self.z_ceiling
            )));
        }
        if !(0.0..=1.0).contains(&self.suspicion_threshold) {
            return Err(TriageError::config(format!(
                "suspicion_threshold must lie in [0, 1], got {}",
                self.suspicion_threshold
            )));
        }
        self.cutoffs.validate()
    }

    pub fn is_high_risk(&self, location: &str) -> bool {
        self.high_risk_jurisdictions.contains(location)
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of concurrent investigations in the service
    pub workers: usize,
    /// Upper bound for each external collaborator call, in milliseconds
    pub collaborator_timeout_ms: u64,
    /// Never call the compliance collaborator
    pub skip_compliance: bool,
    /// Never call the narrative collaborator; use the canned summary
    pub skip_narrative: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            collaborator_timeout_ms: 2000,
            skip_compliance: false,
            skip_narrative: false,
        }
    }
}

impl PipelineConfig {
    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }
}

/// External collaborator wiring
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollaboratorConfig {
    /// NATS subject of a remote compliance service; offline rules when unset
    pub compliance_subject: Option<String>,
    /// NATS subject of a remote narrative service; template when unset
    pub narrative_subject: Option<String>,
    /// Amount above which the offline reviewer reports non-compliance
    pub compliance_amount_limit: f64,
    /// Regulatory source reported by the offline reviewer
    pub compliance_source: String,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            compliance_subject: None,
            narrative_subject: None,
            compliance_amount_limit: 40_000.0,
            compliance_source: "EOCN Official Update Feb 2026".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path, with `TRIAGE__*` environment
    /// overrides (e.g. `TRIAGE__PIPELINE__WORKERS=8`)
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env<P: AsRef<Path>>(path: P, env: Environment) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env)
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config
            .detection
            .validate()
            .context("Detection policy rejected")?;
        Ok(config)
    }
}

/// `TRIAGE__SECTION__KEY` overrides. The jurisdiction set takes a
/// comma-separated list, e.g. `TRIAGE__DETECTION__HIGH_RISK_JURISDICTIONS=Iran,Syria`.
fn environment() -> Environment {
    Environment::with_prefix("TRIAGE")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("detection.high_risk_jurisdictions")
}
