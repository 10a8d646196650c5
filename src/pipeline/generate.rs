//! Generation chain: validate the parameter set, score it, derive
//! guardrails, render content, and mint an immutable Run.

use crate::entitlement::{self, Plan};
use crate::error::{PromptGateError, Result};
use crate::guardrails;
use crate::params::{ParameterSet, ValidationReport, validate};
use crate::scoring;
use crate::server::{PromptGateServer, Run, RunOutcome};
use crate::telemetry::props;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub module_id: Option<String>,
    #[serde(default)]
    pub params: ParameterSet,
}

/// Either a minted run or the field-level validation report. Validation
/// failures are an expected outcome, returned to the caller, never logged as
/// system failures.
#[derive(Debug)]
pub enum GenerateOutcome {
    Run(Run),
    Invalid(ValidationReport),
}

impl PromptGateServer {
    /// Handle a generation attempt end-to-end. A run is only inserted into
    /// the store at the very end, so an abandoned request leaves nothing
    /// behind.
    pub async fn handle_generate(
        &self,
        request: GenerateRequest,
        plan: Plan,
        user_id: Option<&str>,
    ) -> Result<GenerateOutcome> {
        // Module resolution first: an unknown id is a caller mistake, not a
        // denial.
        let module = match &request.module_id {
            Some(id) => Some(self.catalog.module(id).ok_or_else(|| {
                PromptGateError::NotFound {
                    message: format!("module '{id}' is not in the catalog"),
                }
            })?),
            None => None,
        };

        // Missing required dimensions only drag the completeness score down;
        // a value outside its enumeration means no score may be computed, so
        // only invalid options stop the chain here.
        let report = validate(&request.params, &self.catalog);
        if report.has_invalid_option() {
            self.telemetry.record(
                "validation_failed",
                props([
                    ("error_count", json!(report.errors.len())),
                    ("plan", json!(plan.to_string())),
                ]),
            );
            return Ok(GenerateOutcome::Invalid(report));
        }

        let score = scoring::score(&request.params);
        let guardrail_state = guardrails::evaluate(score.composite, module.is_some());

        // Render only when a module is selected; a run without a module can
        // still be scored and tightened, it just cannot export.
        let content = match module {
            Some(m) => Some(self.renderer.render(&request.params, m)?),
            None => None,
        };

        let run = Run {
            id: Uuid::new_v4(),
            module_id: module.map(|m| m.id.clone()),
            plan,
            params: request.params,
            score,
            guardrails: guardrail_state,
            content,
            can_run_live_test: entitlement::can_run_live_test(plan),
            created_at: chrono::Utc::now(),
            outcome: RunOutcome::Generated,
        };

        self.telemetry.record(
            "run_generated",
            props([
                ("run_id", json!(run.id.to_string())),
                ("module_id", json!(run.module_id.clone())),
                ("score", json!(run.score.composite)),
                ("guardrails_failing", json!(run.guardrails.failing().len())),
                ("plan", json!(plan.to_string())),
                ("user_id", json!(user_id)),
            ]),
        );

        self.insert_run(run.clone()).await;
        Ok(GenerateOutcome::Run(run))
    }
}
