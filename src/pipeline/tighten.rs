//! Tighten-and-retest: list suggestions for a run and apply one, producing a
//! revised parameter set for client-side re-submission to the generate
//! chain. The originating run is never mutated; its score is a snapshot, not
//! a live binding.

use crate::error::{PromptGateError, Result};
use crate::params::ParameterSet;
use crate::server::PromptGateServer;
use crate::suggestions::{self, Suggestion};
use crate::telemetry::props;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct TightenRequest {
    pub run_id: Uuid,
    pub suggestion_id: usize,
}

#[derive(Debug, Serialize)]
pub struct TightenResponse {
    pub run_id: Uuid,
    pub applied: Suggestion,
    /// Revised set; re-submit to /generate for a fresh run. Re-using the old
    /// run's score with these params would be stale.
    pub revised_params: ParameterSet,
}

impl PromptGateServer {
    /// Ordered suggestion list for a run, highest impact first.
    pub async fn handle_suggestions(&self, run_id: Uuid) -> Result<Vec<Suggestion>> {
        let run = self.get_run(run_id).await?;
        Ok(suggestions::suggest(&run))
    }

    /// Apply one suggestion by its id in the run's deterministic list.
    pub async fn handle_tighten(&self, request: TightenRequest) -> Result<TightenResponse> {
        let run = self.get_run(request.run_id).await?;
        let list = suggestions::suggest(&run);
        let suggestion = list
            .into_iter()
            .find(|s| s.id == request.suggestion_id)
            .ok_or_else(|| PromptGateError::NotFound {
                message: format!(
                    "run {} has no suggestion {}",
                    request.run_id, request.suggestion_id
                ),
            })?;

        let revised_params = suggestions::apply_suggestion(&run, &suggestion);

        self.telemetry.record(
            "suggestion_applied",
            props([
                ("run_id", json!(run.id.to_string())),
                ("suggestion_id", json!(suggestion.id)),
                ("kind", json!(suggestion.kind)),
                ("impact", json!(suggestion.impact)),
            ]),
        );

        Ok(TightenResponse {
            run_id: run.id,
            applied: suggestion,
            revised_params,
        })
    }
}
