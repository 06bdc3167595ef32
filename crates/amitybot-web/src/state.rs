//! Shared application state for the web server.

use std::sync::Arc;
use std::time::Duration;

use amitybot_common::config::LlmBackendKind;
use amitybot_common::Config;
use amitybot_crm::{CamClient, LeadRepository, SyncLog, SyncOutcome, SyncStatus, SyncTrigger};
use amitybot_kb::{build_embedder, Embedder, IndexReport, KbError, KbIndexer};
use amitybot_llm::{build_backend, LlmBackend};
use amitybot_rag::{ChatSessions, RagChain, Retriever};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::session::SessionStore;
use crate::users::UserStore;

/// Events pushed to connected clients via SSE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// A knowledge-base rebuild started
    ReindexStarted { job_id: Uuid, trigger: SyncTrigger },
    /// A knowledge-base rebuild finished (successfully or not)
    ReindexFinished {
        job_id: Uuid,
        status: SyncStatus,
        documents: usize,
        chunks: usize,
        message: String,
    },
    /// A file was stored in the knowledge base
    FileUploaded { file: String, chars: usize },
    /// A lead status changed
    LeadUpdated { lead_id: String, old_status: String, new_status: String },
}

impl AppEvent {
    /// SSE event name; matches the serialised `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            AppEvent::ReindexStarted { .. }  => "reindex_started",
            AppEvent::ReindexFinished { .. } => "reindex_finished",
            AppEvent::FileUploaded { .. }    => "file_uploaded",
            AppEvent::LeadUpdated { .. }     => "lead_updated",
        }
    }
}

/// Result of one tracked rebuild.
pub struct ReindexRun {
    pub job_id: Uuid,
    pub result: amitybot_kb::Result<IndexReport>,
}

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub config: Config,
    pub indexer: Arc<KbIndexer>,
    pub chain: RagChain,
    pub chat_sessions: ChatSessions,
    pub sessions: SessionStore,
    pub users: UserStore,
    pub leads: Arc<dyn LeadRepository>,
    pub sync_log: SyncLog,
    pub llm_configured: bool,
    /// Broadcast channel for SSE push events
    pub event_tx: broadcast::Sender<AppEvent>,
}

impl AppState {
    /// Build state with the backends selected in `config`.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let llm = build_backend(&config.llm);
        let embedder = build_embedder(&config.embedding, &config.llm);
        let leads: Arc<dyn LeadRepository> = Arc::new(CamClient::with_fixtures());
        Self::new(config, llm, embedder, leads).await
    }

    pub async fn new(
        config: Config,
        llm: Arc<dyn LlmBackend>,
        embedder: Arc<dyn Embedder>,
        leads: Arc<dyn LeadRepository>,
    ) -> anyhow::Result<Self> {
        let llm_configured =
            config.llm.api_key.is_some() || config.llm.backend == LlmBackendKind::Ollama;
        if !llm_configured {
            warn!("No LLM API key configured; chat replies will fall back to an error message");
        }

        let indexer = Arc::new(KbIndexer::new(config.kb.clone(), embedder.clone()));
        let retriever = Retriever::new(indexer.store(), embedder);
        let chain = RagChain::new(
            llm,
            retriever,
            leads.clone(),
            config.llm.clone(),
            config.rag.clone(),
        )?;
        let users = UserStore::from_seed(&config.auth.seed_users).await?;
        let (event_tx, _) = broadcast::channel(256);

        Ok(Self {
            chat_sessions: ChatSessions::new(
                config.rag.max_history_turns,
                Duration::from_secs(config.rag.chat_session_idle_secs),
            ),
            sessions: SessionStore::new(
                config.server.cookie_name.clone(),
                config.server.session_ttl_secs,
            ),
            sync_log: SyncLog::new(config.crm.max_sync_logs),
            indexer,
            chain,
            users,
            leads,
            llm_configured,
            event_tx,
            config,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.event_tx.subscribe()
    }

    /// Send an SSE event; having no subscribers is fine.
    pub fn emit(&self, event: AppEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Rebuild the knowledge base, recording the run in the sync log.
    pub async fn reindex(&self, trigger: SyncTrigger) -> ReindexRun {
        let job_id = self.sync_log.start(trigger).await;
        self.emit(AppEvent::ReindexStarted { job_id, trigger });

        let result = self.indexer.rebuild().await;
        let outcome = match &result {
            Ok(report) => SyncOutcome::Success { documents: report.documents, chunks: report.chunks },
            Err(e) => SyncOutcome::Failed(e.to_string()),
        };

        match self.sync_log.finish(job_id, outcome).await {
            Ok(job) => self.emit(AppEvent::ReindexFinished {
                job_id,
                status: job.status,
                documents: job.documents,
                chunks: job.chunks,
                message: job.message,
            }),
            Err(e) => warn!(%job_id, error = %e, "Could not record sync job outcome"),
        }

        ReindexRun { job_id, result }
    }

    /// Build the index at startup when nothing has been persisted yet.
    pub async fn index_on_startup(&self) {
        if !self.config.server.index_on_startup {
            return;
        }
        if !self.indexer.store().read().await.is_empty() {
            info!("Vector store already populated, skipping startup indexing");
            return;
        }
        match self.reindex(SyncTrigger::Startup).await.result {
            Ok(report) => info!(chunks = report.chunks, "Startup indexing complete"),
            Err(KbError::NoDocuments(dir)) => {
                warn!(dir = %dir.display(), "No knowledge-base documents to index yet")
            }
            Err(e) => warn!(error = %e, "Startup indexing failed"),
        }
    }
}

pub type SharedState = Arc<AppState>;
