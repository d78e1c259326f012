//! Migration Worker
//!
//! Single long-running consumer of the migration request queue. One request
//! is processed fully before the next dequeue, so requests never run
//! concurrently with each other; only a request's own batches fan out.
//! Cancellation is cooperative and observed at loop-iteration boundaries,
//! never mid-batch. Any failure while processing one request is caught and
//! audited; the loop itself never dies.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::audit::{AuditAction, AuditEvent, AuditLevel, AuditSink};
use crate::engine::BatchMigrationEngine;
use crate::error::MigrationError;
use crate::model::MigrationRequest;
use crate::queue::MigrationRequestQueue;
use crate::resolver::ReferenceResolver;

pub struct MigrationWorker {
    queue: Arc<MigrationRequestQueue>,
    resolver: Arc<dyn ReferenceResolver>,
    engine: Arc<BatchMigrationEngine>,
    audit: Arc<dyn AuditSink>,
    poll_interval: std::time::Duration,
}

/// Handle to a started worker: signal shutdown, then await the loop.
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    /// Request cooperative shutdown and wait for the loop to exit. In-flight
    /// batch work for the current request is never interrupted.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            error!(error = %e, "Migration worker task aborted during shutdown");
        }
    }
}

impl MigrationWorker {
    pub fn new(
        queue: Arc<MigrationRequestQueue>,
        resolver: Arc<dyn ReferenceResolver>,
        engine: Arc<BatchMigrationEngine>,
        audit: Arc<dyn AuditSink>,
        poll_interval: std::time::Duration,
    ) -> Self {
        Self {
            queue,
            resolver,
            engine,
            audit,
            poll_interval,
        }
    }

    /// Spawn the worker loop and return its lifecycle handle.
    pub fn start(self: Arc<Self>) -> WorkerHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let worker = Arc::clone(&self);
        let handle = tokio::spawn(async move { worker.run(shutdown_rx).await });
        WorkerHandle { shutdown, handle }
    }

    /// Run the worker loop until the shutdown signal is received.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Migration worker started");

        loop {
            if *shutdown.borrow() {
                info!("Migration worker shutting down");
                break;
            }

            match self.queue.dequeue().await {
                Some(request) => {
                    let correlation_id = request.correlation_id;
                    let initiated_by = request.initiated_by.clone();
                    if let Err(e) = self.process_request(request).await {
                        // Nothing propagates past here: audit and move on to
                        // the next queued request.
                        error!(
                            correlation_id = %correlation_id,
                            error = %e,
                            "Migration request failed"
                        );
                        self.audit_failure(&initiated_by, correlation_id, &e).await;
                    }
                }
                None => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.poll_interval) => {}
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                info!("Migration worker shutting down");
                                break;
                            }
                        }
                    }
                }
            }
        }

        info!("Migration worker stopped");
    }

    /// Resolve references and drive the engine for one request.
    async fn process_request(&self, request: MigrationRequest) -> Result<(), MigrationError> {
        let product = self
            .resolver
            .find_product(request.product_id)
            .await?
            .ok_or(MigrationError::ProductNotFound(request.product_id))?;

        let teller = self
            .resolver
            .find_teller(request.branch_id)
            .await?
            .ok_or(MigrationError::TellerNotFound(request.branch_id))?;

        let result = self.engine.run(&request, &product, &teller).await;

        info!(
            correlation_id = %request.correlation_id,
            new_accounts = result.new_accounts,
            existing_accounts = result.existing_accounts,
            failed_batches = result.failed_batches,
            duration_ms = result.duration().num_milliseconds(),
            "Migration request processed"
        );

        Ok(())
    }

    /// Audit a request that was dropped or failed. Missing references are
    /// non-retryable drops (404); everything else is a worker-level failure.
    async fn audit_failure(&self, initiated_by: &str, correlation_id: Uuid, e: &MigrationError) {
        let (action, status) = match e {
            MigrationError::ProductNotFound(_) | MigrationError::TellerNotFound(_) => {
                warn!(
                    correlation_id = %correlation_id,
                    error = %e,
                    "Migration request dropped: reference not found"
                );
                (AuditAction::ReferenceMissing, 404)
            }
            _ => (AuditAction::WorkerFailure, 500),
        };

        self.audit
            .log(
                AuditEvent::new(
                    initiated_by,
                    action,
                    format!("Migration request dropped: {}", e),
                )
                .with_level(AuditLevel::Error)
                .with_status(status)
                .with_payload(serde_json::json!({ "error": e.to_string() }))
                .with_correlation(correlation_id),
            )
            .await;
    }
}
