//! Suggestion loop: categorized improvement suggestions for a low-scoring
//! run, and the merge rule that applies one to a parameter set.
//!
//! Suggestion generation is a deterministic rule lookup over the weakest
//! dimensions and guardrails, not open-ended generation. Applying a
//! suggestion only ever touches the free-form extension fields; required
//! dimension values entered by the user are left alone, and the caller must
//! re-enter the full scoring chain afterwards.

use crate::guardrails::GuardrailState;
use crate::params::{Dimension, ParameterSet};
use crate::server::Run;
use serde::Serialize;

/// Fixed suggestion vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Clarity,
    Specificity,
    Context,
    Examples,
    Constraints,
}

impl SuggestionKind {
    /// Extension key that guidance of this kind merges into.
    pub fn extension_key(&self) -> &'static str {
        match self {
            SuggestionKind::Clarity => "context",
            SuggestionKind::Specificity => "constraints",
            SuggestionKind::Context => "context",
            SuggestionKind::Examples => "examples",
            SuggestionKind::Constraints => "success_criteria",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Low,
}

/// One improvement suggestion. `id` is the stable index into the ordered
/// list for this run, used by the tighten endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub id: usize,
    pub kind: SuggestionKind,
    pub impact: Impact,
    pub text: String,
}

/// Build the ordered suggestion list for a run, highest impact first.
pub fn suggest(run: &Run) -> Vec<Suggestion> {
    let mut raw = rules(&run.params, &run.guardrails, run.score.composite);
    // Stable: rules are generated in a fixed order, so equal impacts keep it.
    raw.sort_by_key(|(impact, _, _)| *impact);
    raw.into_iter()
        .enumerate()
        .map(|(id, (impact, kind, text))| Suggestion {
            id,
            kind,
            impact,
            text,
        })
        .collect()
}

fn rules(
    params: &ParameterSet,
    guardrails: &GuardrailState,
    score: u8,
) -> Vec<(Impact, SuggestionKind, String)> {
    let mut out = Vec::new();

    for dim in Dimension::ALL {
        if !params.is_populated(dim) {
            out.push((
                Impact::High,
                SuggestionKind::Specificity,
                format!("Pin down the {dim} dimension; unset dimensions are the largest drag on the score."),
            ));
        }
    }

    if !guardrails.context_alignment {
        out.push((
            Impact::High,
            SuggestionKind::Context,
            "Describe the situation this prompt runs in; context alignment is failing.".to_string(),
        ));
    }

    if params.populated_count() == Dimension::ALL.len() && !guardrails.quality_threshold {
        out.push((
            Impact::High,
            SuggestionKind::Clarity,
            "Restate the core ask in one sentence; the composite score sits below the export threshold.".to_string(),
        ));
    }

    if !params.extensions.contains_key("context") {
        out.push((
            Impact::Medium,
            SuggestionKind::Context,
            "Add background context: audience, prior attempts, and what already exists.".to_string(),
        ));
    }

    if !params.extensions.contains_key("success_criteria") {
        out.push((
            Impact::Medium,
            SuggestionKind::Constraints,
            "State measurable success criteria so output quality can be judged.".to_string(),
        ));
    }

    if !params.extensions.contains_key("examples") {
        let impact = if score >= 80 { Impact::Low } else { Impact::Medium };
        out.push((
            impact,
            SuggestionKind::Examples,
            "Include one or two examples of the output shape you expect.".to_string(),
        ));
    }

    if score >= 80 && guardrails.all_passing() {
        out.push((
            Impact::Low,
            SuggestionKind::Clarity,
            "Trim redundant qualifiers; shorter constraints read better at this score.".to_string(),
        ));
    }

    out
}

/// Merge a suggestion's guidance into the parameter set's free-form
/// extensions. Returns the revised set; the run itself is untouched and the
/// caller must re-invoke the full generate chain with the result.
pub fn apply_suggestion(run: &Run, suggestion: &Suggestion) -> ParameterSet {
    let mut revised = run.params.clone();
    revised.append_extension(suggestion.kind.extension_key(), &suggestion.text);
    revised
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::entitlement::Plan;
    use crate::guardrails;
    use crate::scoring;
    use crate::server::RunOutcome;
    use chrono::Utc;
    use uuid::Uuid;

    fn run_for(params: ParameterSet, module_selected: bool) -> Run {
        let score = scoring::score(&params);
        let guardrails = guardrails::evaluate(score.composite, module_selected);
        Run {
            id: Uuid::new_v4(),
            module_id: module_selected.then(|| "precision-brief".to_string()),
            plan: Plan::Free,
            params,
            score,
            guardrails,
            content: None,
            can_run_live_test: false,
            created_at: Utc::now(),
            outcome: RunOutcome::Generated,
        }
    }

    fn full_params() -> ParameterSet {
        let catalog = Catalog::embedded();
        let mut params = ParameterSet::default();
        for dim in Dimension::ALL {
            params.set(dim, catalog.default_option(dim));
        }
        params
    }

    #[test]
    fn missing_dimensions_produce_high_impact_specificity() {
        let run = run_for(ParameterSet::default(), true);
        let suggestions = suggest(&run);
        let high: Vec<_> = suggestions
            .iter()
            .filter(|s| s.impact == Impact::High && s.kind == SuggestionKind::Specificity)
            .collect();
        assert_eq!(high.len(), 7);
        // Ordered highest impact first, ids are positional.
        for (i, s) in suggestions.iter().enumerate() {
            assert_eq!(s.id, i);
        }
        assert!(suggestions.windows(2).all(|w| w[0].impact <= w[1].impact));
    }

    #[test]
    fn suggestions_are_deterministic() {
        let run = run_for(full_params(), false);
        let a = suggest(&run);
        let b = suggest(&run);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.text, y.text);
            assert_eq!(x.id, y.id);
        }
    }

    #[test]
    fn apply_touches_only_extensions() {
        let run = run_for(full_params(), true);
        let suggestions = suggest(&run);
        let first = &suggestions[0];
        let revised = apply_suggestion(&run, first);
        assert_eq!(revised.dimensions, run.params.dimensions);
        assert_ne!(revised.extensions, run.params.extensions);
        let merged = &revised.extensions[first.kind.extension_key()];
        assert!(merged.contains(&first.text));
    }

    #[test]
    fn apply_preserves_existing_extension_text() {
        let mut params = full_params();
        params.append_extension("context", "user wrote this");
        let run = run_for(params, false);
        let context_suggestion = suggest(&run)
            .into_iter()
            .find(|s| s.kind.extension_key() == "context")
            .unwrap();
        let revised = apply_suggestion(&run, &context_suggestion);
        assert!(revised.extensions["context"].starts_with("user wrote this"));
    }

    #[test]
    fn healthy_run_still_gets_polish_suggestions() {
        let run = run_for(full_params(), true);
        assert!(run.score.composite >= 80);
        let suggestions = suggest(&run);
        assert!(!suggestions.is_empty());
        assert!(suggestions.iter().all(|s| s.impact != Impact::High));
    }
}
