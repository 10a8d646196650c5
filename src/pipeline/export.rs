//! Export controller: the gated state machine
//! Idle -> Scoring -> GuardrailCheck -> EntitlementCheck
//!      -> { Denied(reason) | Exporting -> Exported }.
//!
//! Denial reasons are mutually exclusive and strictly ordered: a request is
//! only ever denied for the FIRST blocking condition, so NoModuleSelected can
//! never be masked by ScoreTooLow, and ScoreTooLow never by PlanRequired.
//! Denials are typed values; only internal failures (content missing, store
//! failure) use the error channel.

use crate::entitlement::{self, EXPORT_SCORE_THRESHOLD, Plan};
use crate::error::{PromptGateError, Result};
use crate::server::{Artifact, PromptGateServer, Run, RunOutcome};
use crate::telemetry::props;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub run_id: Uuid,
    pub format: String,
}

/// Business-rule denial. Each variant carries enough context for the UI to
/// render a remediation path ("need N more points", "upgrade to pro").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum ExportDenial {
    NoModuleSelected,
    ScoreTooLow {
        current_score: u8,
        threshold: u8,
    },
    PlanRequired {
        format: String,
        current_plan: Plan,
        required_plan: Plan,
    },
}

impl ExportDenial {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoModuleSelected => "NoModuleSelected",
            Self::ScoreTooLow { .. } => "ScoreTooLow",
            Self::PlanRequired { .. } => "PlanRequired",
        }
    }

    /// 403 for plan, 409 for score-state conflicts.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoModuleSelected | Self::ScoreTooLow { .. } => StatusCode::CONFLICT,
            Self::PlanRequired { .. } => StatusCode::FORBIDDEN,
        }
    }
}

/// Outcome of an export attempt. Both arms are expected results of normal
/// operation.
#[derive(Debug)]
pub enum ExportOutcome {
    Exported(Artifact),
    Denied(ExportDenial),
}

impl PromptGateServer {
    /// Run the export state machine for one request. `plan` is the caller's
    /// current plan as resolved by the session service, passed explicitly;
    /// the plan frozen on the run is deliberately not consulted, so an
    /// upgraded caller can export an older run.
    pub async fn handle_export(
        &self,
        run_id: Uuid,
        format: &str,
        plan: Plan,
    ) -> Result<ExportOutcome> {
        let run = self.get_run(run_id).await?;

        // Idle -> Scoring: requires a module on the run.
        let module_id = match &run.module_id {
            Some(id) => id.clone(),
            None => return self.deny(&run, ExportDenial::NoModuleSelected).await,
        };
        self.stage(&run, "scoring");

        // Scoring -> GuardrailCheck: always proceeds; the score itself cannot
        // deny an export, only the explicit threshold check below does.
        self.stage(&run, "guardrail_check");

        // GuardrailCheck -> EntitlementCheck: plan-independent score gate.
        if run.score.composite < EXPORT_SCORE_THRESHOLD {
            return self
                .deny(
                    &run,
                    ExportDenial::ScoreTooLow {
                        current_score: run.score.composite,
                        threshold: EXPORT_SCORE_THRESHOLD,
                    },
                )
                .await;
        }
        self.stage(&run, "entitlement_check");

        // EntitlementCheck -> Exporting. The module/format pair must exist in
        // the catalog (anything else is a caller mistake), and the caller's
        // plan must clear the pair's minimum: the format's floor raised by
        // the module's own floor.
        let module = self.catalog.module(&module_id).ok_or_else(|| {
            PromptGateError::Catalog {
                message: format!("module '{module_id}' vanished from the catalog"),
            }
        })?;
        if !module.formats.iter().any(|f| f == format) {
            return Err(PromptGateError::Validation {
                message: format!("format '{format}' is not offered by module '{module_id}'"),
            });
        }
        let format_spec =
            self.catalog
                .format(format)
                .ok_or_else(|| PromptGateError::Catalog {
                    message: format!("format '{format}' is missing a catalog entry"),
                })?;
        let required_plan = entitlement::required_plan(module, format_spec);
        if !plan.satisfies(required_plan) {
            return self
                .deny(
                    &run,
                    ExportDenial::PlanRequired {
                        format: format.to_string(),
                        current_plan: plan,
                        required_plan,
                    },
                )
                .await;
        }
        self.stage(&run, "exporting");

        // Exporting -> Exported. Failures past this point are internal, never
        // business denials.
        let artifact = self.mint_artifact(&run, format).await?;
        self.telemetry.record(
            "export_completed",
            props([
                ("run_id", json!(run.id.to_string())),
                ("artifact_id", json!(artifact.id.to_string())),
                ("format", json!(artifact.format.clone())),
                ("bytes", json!(artifact.bytes)),
                ("checksum", json!(artifact.checksum.clone())),
            ]),
        );
        Ok(ExportOutcome::Exported(artifact))
    }

    /// Checksum the run's content and persist the artifact, idempotently per
    /// (run id, format): a racing duplicate request gets the already-minted
    /// record back.
    async fn mint_artifact(&self, run: &Run, format: &str) -> Result<Artifact> {
        let content = run
            .content
            .as_deref()
            .ok_or_else(|| PromptGateError::Render {
                message: format!("run {} has no generated content to export", run.id),
            })?;

        let key = (run.id, format.to_string());
        {
            let artifacts = self.artifacts.read().await;
            if let Some(existing) = artifacts.get(&key) {
                return Ok(existing.clone());
            }
        }

        let artifact = Artifact {
            id: Uuid::new_v4(),
            run_id: run.id,
            format: format.to_string(),
            bytes: content.len() as u64,
            checksum: blake3::hash(content.as_bytes()).to_hex().to_string(),
            created_at: chrono::Utc::now(),
        };

        // Persistence with bounded retry; a store failure here is fatal to
        // the request after the budget is spent.
        let retries = self.config.system.export_retries;
        let delay = std::time::Duration::from_millis(self.config.system.export_retry_delay_ms);
        let mut attempt = 0;
        loop {
            match self.persist_artifact(&key, &artifact).await {
                Ok(minted) => return Ok(minted),
                Err(e) if attempt < retries => {
                    attempt += 1;
                    tracing::warn!(run_id = %run.id, attempt, "artifact persist retry: {e}");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn persist_artifact(
        &self,
        key: &(Uuid, String),
        artifact: &Artifact,
    ) -> Result<Artifact> {
        let mut artifacts = self.artifacts.write().await;
        // Second check under the write lock: the idempotency winner is
        // whoever inserted first.
        if let Some(existing) = artifacts.get(key) {
            return Ok(existing.clone());
        }
        artifacts.insert(key.clone(), artifact.clone());
        drop(artifacts);
        self.record_outcome(
            artifact.run_id,
            RunOutcome::ExportOk {
                artifact_id: artifact.id,
            },
        )
        .await?;
        Ok(artifact.clone())
    }

    /// Record a denial on the run, emit its telemetry event, and hand the
    /// typed value back.
    async fn deny(&self, run: &Run, denial: ExportDenial) -> Result<ExportOutcome> {
        self.telemetry.record(
            "export_denied",
            props([
                ("run_id", json!(run.id.to_string())),
                ("code", json!(denial.code())),
                ("details", json!(denial.clone())),
            ]),
        );
        self.record_outcome(
            run.id,
            RunOutcome::ExportDenied {
                reason: denial.code().to_string(),
            },
        )
        .await?;
        Ok(ExportOutcome::Denied(denial))
    }

    /// One telemetry event per state-machine transition, denial paths
    /// included.
    fn stage(&self, run: &Run, stage: &str) {
        self.telemetry.record(
            "export_stage",
            props([
                ("run_id", json!(run.id.to_string())),
                ("stage", json!(stage)),
            ]),
        );
    }
}
