//! Caller-owned aggregate state for a triage service.
//!
//! The pipeline never touches this; the service records each finished case
//! through [`TriageStats::record`], the only mutator. The suspicious-case log
//! is append-only and held until the owner takes it with
//! [`TriageStats::drain_cases`]; [`StatsReporter`] does so on every tick.

use crate::types::assessment::RiskAction;
use crate::types::case::InvestigationCase;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Entry in the append-only log of suspicious cases
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseRecord {
    pub id: String,
    pub opened_at: DateTime<Utc>,
    pub amount: f64,
    pub kind: String,
    pub action: RiskAction,
    pub fuzzy_score: f64,
    pub reasoning: String,
    pub origin_ip: Option<String>,
}

impl CaseRecord {
    fn from_case(case: &InvestigationCase) -> Self {
        Self {
            id: case.id().to_string(),
            opened_at: case.opened_at(),
            amount: case.evidence().amount,
            kind: case.evidence().kind.clone(),
            action: case.action(),
            fuzzy_score: case.assessment().fuzzy_score,
            reasoning: case.assessment().reasoning.to_string(),
            origin_ip: case.evidence().origin_ip.clone(),
        }
    }
}

/// Counters and case log for a running service
pub struct TriageStats {
    processed: AtomicU64,
    suspicious: AtomicU64,
    rejected: AtomicU64,
    by_action: RwLock<HashMap<RiskAction, u64>>,
    cases: RwLock<Vec<CaseRecord>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    start_time: Instant,
}

impl TriageStats {
    pub fn new() -> Self {
        Self {
            processed: AtomicU64::new(0),
            suspicious: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            by_action: RwLock::new(HashMap::new()),
            cases: RwLock::new(Vec::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a finished case. Suspicious cases are appended to the log.
    pub fn record(&self, case: &InvestigationCase, processing_time: Duration) {
        self.processed.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_action) = self.by_action.write() {
            *by_action.entry(case.action()).or_insert(0) += 1;
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        if case.is_suspicious() {
            self.suspicious.fetch_add(1, Ordering::Relaxed);
            if let Ok(mut cases) = self.cases.write() {
                cases.push(CaseRecord::from_case(case));
            }
        }
    }

    /// Record a request that never became a case
    pub fn record_rejection(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn suspicious(&self) -> u64 {
        self.suspicious.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Snapshot of the suspicious-case log
    pub fn cases(&self) -> Vec<CaseRecord> {
        self.cases.read().map(|c| c.clone()).unwrap_or_default()
    }

    /// Take every logged case, leaving the log empty. Counters are untouched.
    pub fn drain_cases(&self) -> Vec<CaseRecord> {
        self.cases
            .write()
            .map(|mut c| std::mem::take(&mut *c))
            .unwrap_or_default()
    }

    pub fn by_action(&self) -> HashMap<RiskAction, u64> {
        self.by_action.read().map(|m| m.clone()).unwrap_or_default()
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let Ok(times) = self.processing_times.read() else {
            return ProcessingStats::default();
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let count = sorted.len();
        ProcessingStats {
            count: count as u64,
            mean_us: sorted.iter().sum::<u64>() / count as u64,
            p50_us: sorted[count / 2],
            p99_us: sorted[((count as f64 * 0.99) as usize).min(count - 1)],
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (cases per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.processed() as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        let processed = self.processed();
        let suspicious = self.suspicious();
        let rate = if processed > 0 {
            (suspicious as f64 / processed as f64) * 100.0
        } else {
            0.0
        };
        let timing = self.get_processing_stats();

        info!(
            processed = processed,
            suspicious = suspicious,
            rejected = self.rejected(),
            suspicious_rate = format!("{:.1}%", rate),
            throughput = format!("{:.1} cases/s", self.get_throughput()),
            mean_us = timing.mean_us,
            p99_us = timing.p99_us,
            "Triage summary"
        );

        let mut by_action: Vec<(RiskAction, u64)> = self.by_action().into_iter().collect();
        by_action.sort();
        for (action, count) in by_action {
            info!(action = %action, count = count, "Cases by action");
        }
    }
}

impl Default for TriageStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodic summary reporter
pub struct StatsReporter {
    stats: Arc<TriageStats>,
    interval_secs: u64,
}

impl StatsReporter {
    pub fn new(stats: Arc<TriageStats>, interval_secs: u64) -> Self {
        Self {
            stats,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        loop {
            interval.tick().await;
            self.report();
        }
    }

    /// Log the summary and flush the suspicious-case log
    fn report(&self) {
        self.stats.print_summary();
        for record in self.stats.drain_cases() {
            info!(
                case_id = %record.id,
                action = %record.action,
                fuzzy_score = record.fuzzy_score,
                amount = record.amount,
                reasoning = %record.reasoning,
                "Suspicious case"
            );
        }
    }
}
