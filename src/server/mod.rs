//! Server module containing the PromptGateServer implementation and the
//! run/artifact records it owns.

use crate::catalog::Catalog;
use crate::config::Config;
use crate::entitlement::Plan;
use crate::error::{PromptGateError, Result};
use crate::guardrails::GuardrailState;
use crate::params::ParameterSet;
use crate::renderer::{ContentRenderer, TemplateRenderer};
use crate::scoring::ScoreResult;
use crate::telemetry::{LogSink, TelemetryRecorder};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Terminal state of one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    Generated,
    ExportDenied { reason: String },
    ExportOk { artifact_id: Uuid },
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generated => write!(f, "generated"),
            Self::ExportDenied { reason } => write!(f, "export_denied:{reason}"),
            Self::ExportOk { artifact_id } => write!(f, "export_ok:{artifact_id}"),
        }
    }
}

/// One generation attempt. The parameter snapshot, score, and guardrails are
/// frozen at creation; re-running a tightened configuration creates a new Run
/// rather than mutating this one. Only the outcome field advances, through
/// `PromptGateServer::record_outcome`.
#[derive(Debug, Clone, Serialize)]
pub struct Run {
    pub id: Uuid,
    pub module_id: Option<String>,
    pub plan: Plan,
    pub params: ParameterSet,
    pub score: ScoreResult,
    pub guardrails: GuardrailState,
    pub content: Option<String>,
    pub can_run_live_test: bool,
    pub created_at: DateTime<Utc>,
    pub outcome: RunOutcome,
}

/// Record minted by a successful export. Append-only.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub id: Uuid,
    pub run_id: Uuid,
    pub format: String,
    pub bytes: u64,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

/// Main promptgate server implementation. Cheap to clone; all state is
/// behind Arcs. The catalog is read-only for the process lifetime; the run
/// and artifact maps are the only shared mutable state and are request-scoped
/// append targets, never cross-request coordination points.
#[derive(Clone)]
pub struct PromptGateServer {
    pub config: Arc<Config>,
    pub catalog: Arc<Catalog>,
    pub renderer: Arc<dyn ContentRenderer>,
    pub telemetry: TelemetryRecorder,
    pub runs: Arc<RwLock<HashMap<Uuid, Run>>>,
    pub artifacts: Arc<RwLock<HashMap<(Uuid, String), Artifact>>>,
}

impl PromptGateServer {
    /// Build a server with the default renderer and log-backed telemetry.
    /// Must run inside a tokio runtime (the telemetry drain task is spawned
    /// here).
    pub fn new(config: Config) -> Result<Self> {
        let catalog = Catalog::load(config.system.catalog_path.as_deref())?;
        let telemetry = TelemetryRecorder::spawn(
            Arc::new(LogSink),
            config.system.telemetry_buffer,
            config.system.telemetry_retries,
        );
        Ok(Self::with_parts(
            config,
            catalog,
            Arc::new(TemplateRenderer),
            telemetry,
        ))
    }

    /// Assemble a server from explicit parts; used by tests to swap in a
    /// memory telemetry sink or a failing renderer.
    pub fn with_parts(
        config: Config,
        catalog: Catalog,
        renderer: Arc<dyn ContentRenderer>,
        telemetry: TelemetryRecorder,
    ) -> Self {
        Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            renderer,
            telemetry,
            runs: Arc::new(RwLock::new(HashMap::new())),
            artifacts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get_run(&self, id: Uuid) -> Result<Run> {
        self.runs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PromptGateError::NotFound {
                message: format!("run {id} does not exist"),
            })
    }

    pub async fn insert_run(&self, run: Run) {
        self.runs.write().await.insert(run.id, run);
    }

    /// Advance a run's outcome. The snapshot fields (params, score,
    /// guardrails, content) are never touched here.
    pub async fn record_outcome(&self, id: Uuid, outcome: RunOutcome) -> Result<()> {
        let mut runs = self.runs.write().await;
        let run = runs.get_mut(&id).ok_or_else(|| PromptGateError::Storage {
            message: format!("run {id} vanished before outcome could be recorded"),
        })?;
        run.outcome = outcome;
        Ok(())
    }

    pub async fn get_artifact(&self, run_id: Uuid, format: &str) -> Option<Artifact> {
        self.artifacts
            .read()
            .await
            .get(&(run_id, format.to_string()))
            .cloned()
    }
}
