//! AML Triage Pipeline - Main Entry Point
//!
//! Consumes triage requests from NATS, investigates each one, and publishes
//! the finished cases. Requests are processed in parallel on a bounded pool.

use anyhow::Result;
use aml_triage_pipeline::{
    collaborators::{
        ComplianceReviewer, NarrativeGenerator, NatsComplianceReviewer, NatsNarrativeGenerator,
        RuleBasedComplianceReviewer, TemplateNarrativeGenerator,
    },
    config::{AppConfig, LoggingConfig},
    consumer::{decode_request, RequestConsumer},
    producer::{CaseProducer, ErrorReply},
    stats::{StatsReporter, TriageStats},
    InvestigationPipeline, TriageError,
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    init_logging(&config.logging)?;
    info!("Starting AML Triage Pipeline");
    info!(
        "Suspicion threshold: {:.2}, Action cutoffs: monitor>={:.2}, restrict>={:.2}, freeze>={:.2}",
        config.detection.suspicion_threshold,
        config.detection.cutoffs.monitor,
        config.detection.cutoffs.restrict,
        config.detection.cutoffs.freeze
    );
    info!(
        jurisdictions = ?config.detection.high_risk_jurisdictions,
        travel_threshold_hours = config.detection.travel_threshold_hours,
        "Detection policy loaded"
    );

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    // Collaborators: remote when a subject is configured, offline otherwise
    let compliance: Arc<dyn ComplianceReviewer> = match &config.collaborators.compliance_subject {
        Some(subject) => Arc::new(NatsComplianceReviewer::new(client.clone(), subject)),
        None => Arc::new(RuleBasedComplianceReviewer::from_config(&config.collaborators)),
    };
    let narrative: Arc<dyn NarrativeGenerator> = match &config.collaborators.narrative_subject {
        Some(subject) => Arc::new(NatsNarrativeGenerator::new(client.clone(), subject)),
        None => Arc::new(TemplateNarrativeGenerator::new()),
    };
    info!(
        compliance = compliance.name(),
        narrative = narrative.name(),
        timeout_ms = config.pipeline.collaborator_timeout_ms,
        "Collaborators configured"
    );

    let pipeline = Arc::new(
        InvestigationPipeline::new(config.detection.clone(), config.pipeline.clone())?
            .with_compliance_reviewer(compliance)
            .with_narrative_generator(narrative),
    );

    let consumer = RequestConsumer::new(client.clone(), &config.nats.request_subject);
    let producer = Arc::new(CaseProducer::new(client.clone(), &config.nats.case_subject));

    // Caller-owned aggregate state
    let stats = Arc::new(TriageStats::new());
    let stats_clone = stats.clone();
    tokio::spawn(async move {
        let reporter = StatsReporter::new(stats_clone, 30);
        reporter.start().await;
    });

    let num_workers = config.pipeline.workers.max(1);
    info!(
        "Starting request processing loop with {} parallel workers",
        num_workers
    );
    info!("Listening on subject: {}", consumer.subject());
    info!("Publishing cases to: {}", producer.subject());

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        // Acquire permit (limits concurrent tasks)
        let permit = semaphore.clone().acquire_owned().await?;

        let pipeline = pipeline.clone();
        let producer = producer.clone();
        let stats = stats.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            let outcome = match decode_request(&message.payload) {
                Ok(request) => pipeline.investigate_request(request).await,
                Err(e) => Err(TriageError::validation(format!("{:#}", e))),
            };

            match outcome {
                Ok(case) => {
                    let processing_time = start_time.elapsed();
                    stats.record(&case, processing_time);

                    if let Some(reply_to) = message.reply.clone() {
                        if let Err(e) = producer.reply(reply_to, &case).await {
                            error!(case_id = %case.id(), error = %e, "Failed to reply with case");
                        }
                    }

                    if let Err(e) = producer.publish(&case).await {
                        error!(case_id = %case.id(), error = %e, "Failed to publish case");
                    } else if case.is_suspicious() {
                        info!(
                            case_id = %case.id(),
                            fuzzy_score = case.assessment().fuzzy_score,
                            action = %case.action(),
                            processing_time_us = processing_time.as_micros(),
                            "Suspicious case published"
                        );
                    } else {
                        debug!(
                            case_id = %case.id(),
                            fuzzy_score = case.assessment().fuzzy_score,
                            processing_time_us = processing_time.as_micros(),
                            "Case processed (below suspicion threshold)"
                        );
                    }
                }
                Err(e) => {
                    stats.record_rejection();
                    if e.is_client_error() {
                        warn!(error = %e, "Rejected triage request");
                    } else {
                        error!(error = %e, "Triage failed");
                    }
                    if let Some(reply_to) = message.reply.clone() {
                        if let Err(e) = producer.reply(reply_to, &ErrorReply::from(&e)).await {
                            error!(error = %e, "Failed to send error reply");
                        }
                    }
                }
            }

            // Release permit when done
            drop(permit);
        });
    }

    // Print final summary
    info!("Pipeline shutting down...");
    stats.print_summary();

    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("aml_triage_pipeline={}", logging.level)))?;

    if logging.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}
