//! Moderation log sink.
//!
//! Recording is fire-and-forget: a failed write is logged and never fails the
//! operation that produced it.

use std::sync::Arc;

use crate::db::Repository;
use crate::models::AuditEntry;

/// Destination for modlog entries.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

/// Writes modlog entries to SQLite on a background task.
#[derive(Clone)]
pub struct Modlog {
    repo: Arc<Repository>,
}

impl Modlog {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }
}

impl AuditSink for Modlog {
    fn record(&self, entry: AuditEntry) {
        tracing::info!(
            target: "modlog",
            action = %entry.action,
            actor = %entry.actor,
            "{}",
            entry.detail
        );

        let repo = self.repo.clone();
        tokio::spawn(async move {
            if let Err(e) = repo.insert_audit(&entry).await {
                tracing::warn!("Failed to record modlog entry {}: {}", entry.action, e);
            }
        });
    }
}
