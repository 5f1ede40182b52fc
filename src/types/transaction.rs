//! Transaction and baseline records, plus the loosely-typed wire inputs they
//! are validated from.

use crate::error::{Result, TriageError};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transaction kind used when the caller does not send one.
pub const DEFAULT_KIND: &str = "TRANSFER";

/// A single transaction under investigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transferred amount (non-negative)
    pub amount: f64,
    /// Location the transaction originated from
    pub location: String,
    /// When the transaction happened
    pub timestamp: DateTime<Utc>,
    /// Transaction kind (TRANSFER, WIRE, CASH_OUT, ...)
    pub kind: String,
    /// Originating IP address, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_ip: Option<String>,
}

impl Transaction {
    /// Create a new transaction with the default kind and no origin IP
    pub fn new(amount: f64, location: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            amount,
            location: location.into(),
            timestamp,
            kind: DEFAULT_KIND.to_string(),
            origin_ip: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_origin_ip(mut self, ip: impl Into<String>) -> Self {
        self.origin_ip = Some(ip.into());
        self
    }

    /// Check field invariants. Runs at the wire boundary and again at
    /// pipeline entry for directly constructed values.
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() {
            return Err(TriageError::validation("transaction amount must be finite"));
        }
        if self.amount < 0.0 {
            return Err(TriageError::validation(format!(
                "transaction amount must be non-negative, got {}",
                self.amount
            )));
        }
        if self.location.trim().is_empty() {
            return Err(TriageError::validation("transaction location is empty"));
        }
        Ok(())
    }
}

/// A user's historical behavioral norm, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineProfile {
    /// Historical mean transaction amount
    pub mean_amount: f64,
    /// Historical standard deviation; zero means no usable spread
    pub std_amount: f64,
    /// Location of the previous transaction
    pub last_location: String,
    /// Time of the previous transaction
    pub last_time: DateTime<Utc>,
}

impl BaselineProfile {
    pub fn new(
        mean_amount: f64,
        std_amount: f64,
        last_location: impl Into<String>,
        last_time: DateTime<Utc>,
    ) -> Self {
        Self {
            mean_amount,
            std_amount,
            last_location: last_location.into(),
            last_time,
        }
    }

    /// Whether the spread is unusable and the configured fallback applies
    pub fn is_degraded(&self) -> bool {
        self.std_amount.is_nan() || self.std_amount <= 0.0
    }

    pub fn validate(&self) -> Result<()> {
        if !self.mean_amount.is_finite() {
            return Err(TriageError::validation("baseline mean_amount must be finite"));
        }
        if self.std_amount.is_nan() || self.std_amount.is_infinite() {
            return Err(TriageError::validation("baseline std_amount must be finite"));
        }
        if self.last_location.trim().is_empty() {
            return Err(TriageError::validation("baseline last_location is empty"));
        }
        Ok(())
    }
}

/// Transaction as received on the wire, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionInput {
    pub amount: f64,
    #[serde(alias = "loc")]
    pub location: String,
    pub timestamp: String,
    #[serde(default, alias = "type")]
    pub kind: Option<String>,
    #[serde(default, alias = "ip_address", alias = "ip")]
    pub origin_ip: Option<String>,
}

impl TryFrom<TransactionInput> for Transaction {
    type Error = TriageError;

    fn try_from(input: TransactionInput) -> Result<Self> {
        let timestamp = parse_timestamp("transaction.timestamp", &input.timestamp)?;
        let tx = Transaction {
            amount: input.amount,
            location: input.location.trim().to_string(),
            timestamp,
            kind: input
                .kind
                .filter(|k| !k.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_KIND.to_string()),
            origin_ip: input.origin_ip.filter(|ip| !ip.trim().is_empty()),
        };
        tx.validate()?;
        Ok(tx)
    }
}

/// Baseline as received on the wire, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineInput {
    #[serde(alias = "mean_amt")]
    pub mean_amount: f64,
    #[serde(default, alias = "std_amt")]
    pub std_amount: Option<f64>,
    #[serde(alias = "last_loc")]
    pub last_location: String,
    pub last_time: String,
}

impl TryFrom<BaselineInput> for BaselineProfile {
    type Error = TriageError;

    fn try_from(input: BaselineInput) -> Result<Self> {
        let last_time = parse_timestamp("user_baseline.last_time", &input.last_time)?;
        let baseline = BaselineProfile {
            mean_amount: input.mean_amount,
            // Absent spread is the same degraded case as a zero spread
            std_amount: input.std_amount.unwrap_or(0.0),
            last_location: input.last_location.trim().to_string(),
            last_time,
        };
        baseline.validate()?;
        Ok(baseline)
    }
}

/// A single triage request: one transaction against one baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageRequest {
    /// Caller-assigned case identifier; generated when absent
    #[serde(default)]
    pub case_id: Option<String>,
    pub transaction: TransactionInput,
    pub user_baseline: BaselineInput,
}

/// Validated request ready for the pipeline.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub case_id: Option<String>,
    pub transaction: Transaction,
    pub baseline: BaselineProfile,
}

impl TriageRequest {
    /// Validate both records. Fails on the first malformed field.
    pub fn validate(self) -> Result<ValidatedRequest> {
        Ok(ValidatedRequest {
            case_id: self.case_id.filter(|id| !id.trim().is_empty()),
            transaction: Transaction::try_from(self.transaction)?,
            baseline: BaselineProfile::try_from(self.user_baseline)?,
        })
    }
}

/// Parse an ISO-8601 timestamp. Zone-less values are taken as UTC.
pub fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(TriageError::validation(format!(
        "{} is not an ISO-8601 timestamp: '{}'",
        field, raw
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request_json(timestamp: &str) -> String {
        format!(
            r#"{{
                "transaction": {{"amount": 50000, "loc": "London", "timestamp": "{}", "ip_address": "10.0.0.5"}},
                "user_baseline": {{"mean_amt": 1000, "std_amt": 500, "last_loc": "Dubai", "last_time": "2026-02-04T10:00:00"}}
            }}"#,
            timestamp
        )
    }

    #[test]
    fn test_legacy_aliases_accepted() {
        let request: TriageRequest =
            serde_json::from_str(&request_json("2026-02-04T12:00:00")).unwrap();
        let validated = request.validate().unwrap();

        assert_eq!(validated.transaction.location, "London");
        assert_eq!(validated.transaction.kind, DEFAULT_KIND);
        assert_eq!(validated.transaction.origin_ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(validated.baseline.mean_amount, 1000.0);
        assert_eq!(validated.baseline.last_location, "Dubai");
        assert_eq!(
            validated.transaction.timestamp,
            Utc.with_ymd_and_hms(2026, 2, 4, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_unparseable_timestamp_rejected() {
        let request: TriageRequest = serde_json::from_str(&request_json("yesterday")).unwrap();
        let err = request.validate().unwrap_err();

        assert!(err.is_client_error());
        assert!(err.to_string().contains("transaction.timestamp"));
    }

    #[test]
    fn test_rfc3339_with_offset() {
        let ts = parse_timestamp("t", "2026-02-04T14:00:00+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2026, 2, 4, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_missing_std_is_degraded_not_error() {
        let input = BaselineInput {
            mean_amount: 100.0,
            std_amount: None,
            last_location: "Dubai".to_string(),
            last_time: "2026-02-04T10:00:00".to_string(),
        };
        let baseline = BaselineProfile::try_from(input).unwrap();

        assert_eq!(baseline.std_amount, 0.0);
        assert!(baseline.is_degraded());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let tx = Transaction::new(-5.0, "Dubai", Utc::now());
        assert!(matches!(tx.validate(), Err(TriageError::Validation(_))));

        let tx = Transaction::new(f64::NAN, "Dubai", Utc::now());
        assert!(tx.validate().is_err());
    }
}
