//! Log of knowledge-base sync jobs shown on the dashboard.
//!
//! Bounded to `capacity` entries, newest first.

use std::collections::VecDeque;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{CrmError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    Manual,
    Upload,
    Startup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Running,
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncJob {
    pub job_id: Uuid,
    pub trigger: SyncTrigger,
    pub status: SyncStatus,
    pub started_at: DateTime<Utc>,
    /// Human readable, e.g. `"1.42s"`; empty while running.
    pub duration: String,
    pub duration_ms: u64,
    pub documents: usize,
    pub chunks: usize,
    pub message: String,
    #[serde(skip)]
    started: Option<Instant>,
}

#[derive(Debug, Clone)]
pub enum SyncOutcome {
    Success { documents: usize, chunks: usize },
    Failed(String),
}

pub struct SyncLog {
    jobs: RwLock<VecDeque<SyncJob>>,
    capacity: usize,
}

impl SyncLog {
    pub fn new(capacity: usize) -> Self {
        Self { jobs: RwLock::new(VecDeque::new()), capacity: capacity.max(1) }
    }

    /// Record a running job and return its id.
    pub async fn start(&self, trigger: SyncTrigger) -> Uuid {
        let job = SyncJob {
            job_id: Uuid::new_v4(),
            trigger,
            status: SyncStatus::Running,
            started_at: Utc::now(),
            duration: String::new(),
            duration_ms: 0,
            documents: 0,
            chunks: 0,
            message: "Sync in progress".to_string(),
            started: Some(Instant::now()),
        };
        let job_id = job.job_id;

        let mut jobs = self.jobs.write().await;
        jobs.push_front(job);
        jobs.truncate(self.capacity);
        info!(%job_id, trigger = ?trigger, "Sync job started");
        job_id
    }

    pub async fn finish(&self, job_id: Uuid, outcome: SyncOutcome) -> Result<SyncJob> {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.iter_mut().find(|j| j.job_id == job_id) else {
            warn!(%job_id, "Finished job is no longer in the sync log");
            return Err(CrmError::JobNotFound(job_id));
        };

        let elapsed = job.started.map(|s| s.elapsed()).unwrap_or_default();
        job.duration_ms = elapsed.as_millis() as u64;
        job.duration = format!("{:.2}s", elapsed.as_secs_f64());
        match outcome {
            SyncOutcome::Success { documents, chunks } => {
                job.status = SyncStatus::Success;
                job.documents = documents;
                job.chunks = chunks;
                job.message = format!("Indexed {documents} documents into {chunks} chunks");
            }
            SyncOutcome::Failed(message) => {
                job.status = SyncStatus::Failed;
                job.message = message;
            }
        }

        info!(%job_id, status = ?job.status, duration = %job.duration, "Sync job finished");
        Ok(job.clone())
    }

    /// Newest first.
    pub async fn list(&self) -> Vec<SyncJob> {
        self.jobs.read().await.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_newest_first_and_bounded() {
        let log = SyncLog::new(2);
        let a = log.start(SyncTrigger::Startup).await;
        let b = log.start(SyncTrigger::Manual).await;
        let c = log.start(SyncTrigger::Upload).await;

        let ids: Vec<Uuid> = log.list().await.into_iter().map(|j| j.job_id).collect();
        assert_eq!(ids, vec![c, b]);
        assert!(!ids.contains(&a));
    }

    #[tokio::test]
    async fn test_finish_records_outcome() {
        let log = SyncLog::new(10);
        let id = log.start(SyncTrigger::Manual).await;
        assert_eq!(log.list().await[0].status, SyncStatus::Running);

        let job = log
            .finish(id, SyncOutcome::Success { documents: 3, chunks: 12 })
            .await
            .unwrap();
        assert_eq!(job.status, SyncStatus::Success);
        assert_eq!(job.chunks, 12);
        assert!(job.duration.ends_with('s'));
        assert_eq!(log.list().await[0].documents, 3);
    }

    #[tokio::test]
    async fn test_failed_job_keeps_message() {
        let log = SyncLog::new(10);
        let id = log.start(SyncTrigger::Manual).await;
        let job = log.finish(id, SyncOutcome::Failed("No documents".into())).await.unwrap();
        assert_eq!(job.status, SyncStatus::Failed);
        assert_eq!(job.message, "No documents");
    }

    #[tokio::test]
    async fn test_finish_unknown_job() {
        let log = SyncLog::new(1);
        assert!(log.finish(Uuid::new_v4(), SyncOutcome::Failed("x".into())).await.is_err());
    }

    #[test]
    fn test_wire_format() {
        let job = SyncJob {
            job_id: Uuid::nil(),
            trigger: SyncTrigger::Upload,
            status: SyncStatus::Success,
            started_at: Utc::now(),
            duration: "0.10s".into(),
            duration_ms: 100,
            documents: 1,
            chunks: 2,
            message: String::new(),
            started: None,
        };
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["trigger"], "upload");
        assert_eq!(json["duration"], "0.10s");
        assert!(json.get("started").is_none());
    }
}
