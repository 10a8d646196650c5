//! Tighten-and-retest flow: suggestion listing, application, and the
//! immutability of the originating run.

use promptgate::catalog::Catalog;
use promptgate::config::Config;
use promptgate::entitlement::Plan;
use promptgate::error::PromptGateError;
use promptgate::params::{Dimension, ParameterSet};
use promptgate::pipeline::generate::{GenerateOutcome, GenerateRequest};
use promptgate::pipeline::tighten::TightenRequest;
use promptgate::renderer::TemplateRenderer;
use promptgate::server::{PromptGateServer, Run};
use promptgate::suggestions::Impact;
use promptgate::telemetry::{MemorySink, TelemetryRecorder};
use std::sync::Arc;

fn test_server() -> (PromptGateServer, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::default());
    let telemetry = TelemetryRecorder::spawn(sink.clone(), 64, 1);
    let server = PromptGateServer::with_parts(
        Config::default(),
        Catalog::embedded(),
        Arc::new(TemplateRenderer),
        telemetry,
    );
    (server, sink)
}

async fn generate(server: &PromptGateServer, params: ParameterSet) -> Run {
    let request = GenerateRequest {
        module_id: Some("precision-brief".into()),
        params,
    };
    match server.handle_generate(request, Plan::Free, None).await {
        Ok(GenerateOutcome::Run(run)) => run,
        other => panic!("expected a run, got {other:?}"),
    }
}

fn weak_params() -> ParameterSet {
    let mut params = ParameterSet::default();
    params.set(Dimension::Domain, "marketing");
    params.set(Dimension::Urgency, "high");
    params
}

#[tokio::test]
async fn low_scoring_run_gets_ordered_suggestions() {
    let (server, _sink) = test_server();
    let run = generate(&server, weak_params()).await;
    assert!(run.score.composite < 80);

    let suggestions = server.handle_suggestions(run.id).await.unwrap();
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].impact, Impact::High);
    assert!(suggestions.windows(2).all(|w| w[0].impact <= w[1].impact));
    for (i, s) in suggestions.iter().enumerate() {
        assert_eq!(s.id, i);
    }
}

#[tokio::test]
async fn tighten_merges_into_extensions_only() {
    let (server, sink) = test_server();
    let run = generate(&server, weak_params()).await;

    let response = server
        .handle_tighten(TightenRequest {
            run_id: run.id,
            suggestion_id: 0,
        })
        .await
        .unwrap();

    assert_eq!(response.revised_params.dimensions, run.params.dimensions);
    assert_ne!(response.revised_params.extensions, run.params.extensions);

    server.telemetry.flush().await;
    assert!(sink.names().contains(&"suggestion_applied".to_string()));
}

#[tokio::test]
async fn retest_creates_a_new_run_and_leaves_the_original_alone() {
    let (server, _sink) = test_server();
    let original = generate(&server, weak_params()).await;
    let original_score = original.score.composite;

    let response = server
        .handle_tighten(TightenRequest {
            run_id: original.id,
            suggestion_id: 0,
        })
        .await
        .unwrap();

    // The caller re-enters the full chain with the revised set.
    let retested = generate(&server, response.revised_params).await;
    assert_ne!(retested.id, original.id);

    let stored = server.get_run(original.id).await.unwrap();
    assert_eq!(stored.score.composite, original_score);
    assert_eq!(stored.params, original.params);
}

#[tokio::test]
async fn out_of_range_suggestion_is_not_found() {
    let (server, _sink) = test_server();
    let run = generate(&server, weak_params()).await;
    let err = server
        .handle_tighten(TightenRequest {
            run_id: run.id,
            suggestion_id: 999,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PromptGateError::NotFound { .. }));
}

#[tokio::test]
async fn suggestions_for_unknown_run_are_not_found() {
    let (server, _sink) = test_server();
    let err = server
        .handle_suggestions(uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, PromptGateError::NotFound { .. }));
}
