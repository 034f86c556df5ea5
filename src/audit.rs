use std::sync::Arc;

use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::model::{
    UserId,
    audit::{AuditAction, AuditEntry},
};
use crate::store::AuditSink;

enum AuditMessage {
    Entry(AuditEntry),
    Flush(oneshot::Sender<()>),
}

/// Appends audit entries without making the caller wait for storage.
///
/// Entries go through a bounded queue to a background writer. A full queue,
/// a stopped writer or a failing sink only produce a warning; nothing is
/// ever reported back to the action being audited.
#[derive(Clone)]
pub struct AuditRecorder {
    tx: mpsc::Sender<AuditMessage>,
    clock: Arc<dyn Clock>,
}

impl AuditRecorder {
    /// Starts the writer task. Must be called from within a tokio runtime.
    pub fn spawn(sink: Arc<dyn AuditSink>, clock: Arc<dyn Clock>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(Self::writer(rx, sink));
        Self { tx, clock }
    }

    async fn writer(mut rx: mpsc::Receiver<AuditMessage>, sink: Arc<dyn AuditSink>) {
        while let Some(message) = rx.recv().await {
            match message {
                AuditMessage::Entry(entry) => {
                    if let Err(e) = sink.append(&entry).await {
                        warn!(
                            error = %e,
                            action = %entry.action,
                            target = %entry.target,
                            "Dropping audit entry"
                        );
                    }
                }
                AuditMessage::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    }

    #[instrument(level = "debug", skip(self, target))]
    pub fn record(&self, actor: Option<UserId>, action: AuditAction, target: impl Into<String>) {
        let entry = AuditEntry {
            id: Uuid::new_v4(),
            actor_user_id: actor,
            action,
            target: target.into(),
            occurred_at: self.clock.now(),
        };

        match self.tx.try_send(AuditMessage::Entry(entry)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("Audit queue full, entry dropped"),
            Err(TrySendError::Closed(_)) => warn!("Audit writer stopped, entry dropped"),
        }
    }

    /// Resolves once every entry queued before the call has been handled.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(AuditMessage::Flush(done_tx)).await.is_ok() {
            let _ = done_rx.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::store::{StoreError, StoreResult, memory::MemoryAuditSink};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakySink {
        calls: AtomicUsize,
        inner: MemoryAuditSink,
    }

    #[async_trait]
    impl AuditSink for FlakySink {
        async fn append(&self, entry: &AuditEntry) -> StoreResult<()> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(StoreError::Unavailable("connection refused".into()));
            }
            self.inner.append(entry).await
        }
    }

    #[tokio::test]
    async fn records_entries_in_order() {
        let sink = Arc::new(MemoryAuditSink::new());
        let recorder = AuditRecorder::spawn(sink.clone(), Arc::new(SystemClock), 16);

        recorder.record(Some(7), AuditAction::ClockIn, "/attendance/7/2025-03-10");
        recorder.record(Some(7), AuditAction::ClockOut, "/attendance/7/2025-03-10");
        recorder.flush().await;

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, AuditAction::ClockIn);
        assert_eq!(entries[0].actor_user_id, Some(7));
        assert_eq!(entries[1].action, AuditAction::ClockOut);
    }

    #[tokio::test]
    async fn sink_failure_is_swallowed() {
        let sink = Arc::new(FlakySink {
            calls: AtomicUsize::new(0),
            inner: MemoryAuditSink::new(),
        });
        let recorder = AuditRecorder::spawn(sink.clone(), Arc::new(SystemClock), 16);

        recorder.record(None, AuditAction::CreateUser, "/users/1");
        recorder.record(None, AuditAction::CreateUser, "/users/2");
        recorder.flush().await;

        let entries = sink.inner.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target, "/users/2");
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let recorder = AuditRecorder {
            tx,
            clock: Arc::new(SystemClock),
        };

        // Nothing drains the queue; the second call must return immediately.
        recorder.record(None, AuditAction::ClockIn, "/attendance/1/2025-03-10");
        recorder.record(None, AuditAction::ClockOut, "/attendance/1/2025-03-10");

        match rx.try_recv() {
            Ok(AuditMessage::Entry(entry)) => assert_eq!(entry.action, AuditAction::ClockIn),
            _ => panic!("expected the first entry to be queued"),
        }
        assert!(rx.try_recv().is_err());
    }
}
