//! Migration Request Queue
//!
//! Mutex-guarded FIFO of pending migration requests. Many producers enqueue
//! concurrently and serialize through the one lock; the single worker polls
//! with a non-blocking dequeue. The queue is purely in-process: a restart
//! drops anything not yet dequeued (see DESIGN.md).

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::model::MigrationRequest;

pub struct MigrationRequestQueue {
    inner: Mutex<VecDeque<MigrationRequest>>,
    audit: Arc<dyn AuditSink>,
}

impl MigrationRequestQueue {
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            audit,
        }
    }

    /// Append a request at the tail. Fire-and-forget: the producer gets no
    /// synchronous success/failure signal beyond the call returning.
    pub async fn enqueue(&self, request: MigrationRequest) {
        let correlation_id = request.correlation_id;
        let seed_count = request.seeds.len();
        let initiated_by = request.initiated_by.clone();

        let depth = {
            let mut queue = self.inner.lock().await;
            queue.push_back(request);
            queue.len()
        };

        debug!(
            correlation_id = %correlation_id,
            seed_count,
            depth,
            "Migration request enqueued"
        );

        self.audit
            .log(
                AuditEvent::new(
                    initiated_by,
                    AuditAction::RequestEnqueued,
                    format!("Migration request queued ({} seeds)", seed_count),
                )
                .with_payload(serde_json::json!({
                    "seed_count": seed_count,
                    "queue_depth": depth,
                }))
                .with_correlation(correlation_id),
            )
            .await;
    }

    /// Non-blocking poll: pops the head, or `None` when the queue is empty.
    pub async fn dequeue(&self) -> Option<MigrationRequest> {
        self.inner.lock().await.pop_front()
    }

    /// Current count, for observability only. Best-effort: not synchronized
    /// with concurrent mutation.
    pub async fn depth(&self) -> usize {
        self.inner.lock().await.len()
    }
}
