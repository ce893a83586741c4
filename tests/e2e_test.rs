//! End-to-end tests: the HTTP client core against the in-process stub backend
//!
//! Each test starts its own stub on a loopback port, so they run in
//! parallel without shared state.

mod fixtures;
mod helpers;

use fixtures::*;
use helpers::*;
use img_gacha::{
    models::{
        generation::{AiModel, GenerationRequest},
        task::TaskStatus,
    },
    services::{
        client::TaskPhase,
        submitter::{JobSubmitter, SubmitError},
        transport::{GenerationApi, HttpTransport, TransportError},
    },
};

#[tokio::test]
async fn test_e2e_health_and_models() {
    let base_url = spawn_stub(fast_stub()).await;
    let client = client(&base_url, fast_polling());

    let health = client.health().await.expect("Health check failed");
    assert_eq!(health.status, "ok");

    let models = client.models().await.expect("Model listing failed");
    assert_eq!(
        models,
        vec!["stable-diffusion-v1.5", "stable-diffusion-v2.1", "dall-e-3"]
    );

    // The root-level probe is kept for load balancers.
    let root = base_url.trim_end_matches("/api");
    let response = reqwest::get(format!("{root}/health"))
        .await
        .expect("Root health check failed");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_e2e_single_spin_completes() {
    let fixture = &SPIN_FIXTURES[0];
    let base_url = spawn_stub(fast_stub()).await;
    let client = client(&base_url, fast_polling());

    println!("Spinning: {} - {}", fixture.prompt, fixture.description);

    let handle = client.start(fixture.request()).expect("Request rejected");
    let mut progress = handle.progress();
    let mut seen = Vec::new();
    let recorder = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let p = progress.borrow_and_update().clone();
            if let Some(status) = p.status {
                if seen.last() != Some(&status) {
                    seen.push(status);
                }
            }
            if p.phase.is_terminal() {
                return (p, seen);
            }
        }
        panic!("progress channel closed before a terminal phase");
    });

    let images = handle
        .wait()
        .await
        .expect("Spin was cancelled")
        .expect("Spin failed");
    let (last, seen) = recorder.await.expect("Progress recorder panicked");

    assert_eq!(images.len(), fixture.count as usize);
    let seeds: Vec<i64> = images.iter().map(|i| i.seed).collect();
    assert_eq!(seeds, vec![1000, 1001, 1002, 1003]);
    assert!(images.iter().all(|i| !i.url.is_empty()));
    let task_id = last.task_id.expect("Task id never reported");
    assert!(images.iter().all(|i| i.task_id == task_id));

    assert_eq!(last.phase, TaskPhase::Completed);
    assert_eq!(seen.last(), Some(&TaskStatus::Completed));
    assert!(seen.contains(&TaskStatus::Processing));

    let view = client.gallery().snapshot();
    assert!(!view.is_loading());
    assert_eq!(view.images, images);
}

#[tokio::test]
async fn test_e2e_concurrent_spins_fill_gallery() {
    let base_url = spawn_stub(fast_stub()).await;
    let client = client(&base_url, fast_polling());

    let handles: Vec<_> = SPIN_FIXTURES
        .iter()
        .map(|fixture| client.start(fixture.request()).expect("Request rejected"))
        .collect();

    let mut total = 0;
    for (fixture, handle) in SPIN_FIXTURES.iter().zip(handles) {
        let images = handle
            .wait()
            .await
            .expect("Spin was cancelled")
            .unwrap_or_else(|e| panic!("{} failed: {e}", fixture.description));
        assert_eq!(images.len(), fixture.count as usize);
        if let Some(seed) = fixture.seed {
            assert_eq!(images[0].seed, seed);
        }
        total += images.len();
    }

    let view = client.gallery().snapshot();
    assert_eq!(view.images.len(), total);
    assert!(view.last_error.is_none());
}

#[tokio::test]
async fn test_e2e_submitter_returns_pending_task() {
    let base_url = spawn_stub(fast_stub()).await;
    let transport = HttpTransport::new(&transport(&base_url)).expect("Transport");
    let submitter = JobSubmitter::new(std::sync::Arc::new(transport));

    let request = GenerationRequest::new("origami crane", AiModel::DallE3, 2);
    let task = submitter.submit(&request).await.expect("Submission failed");
    assert_eq!(task.status, TaskStatus::Pending);
    assert!(!task.id.is_empty());

    let empty = GenerationRequest::new("", AiModel::DallE3, 2);
    assert!(matches!(
        submitter.submit(&empty).await,
        Err(SubmitError::Validation(_))
    ));
}

#[tokio::test]
async fn test_e2e_backend_rejects_invalid_requests() {
    let base_url = spawn_stub(fast_stub()).await;
    let transport = HttpTransport::new(&transport(&base_url)).expect("Transport");

    // Bypass client-side validation to exercise the backend's own checks.
    let too_many = GenerationRequest::new("crowd of cats", AiModel::StableDiffusionV15, 11);
    match transport.submit(&too_many).await {
        Err(TransportError::Api { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("error"));
        }
        other => panic!("expected a 400, got {other:?}"),
    }

    let unknown_model = serde_json::json!({
        "prompt": "crowd of cats",
        "model": "midjourney",
        "count": 1
    });
    let response = reqwest::Client::new()
        .post(format!("{base_url}/generate"))
        .json(&unknown_model)
        .send()
        .await
        .expect("Request failed");
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_e2e_unknown_task_is_not_transient() {
    let base_url = spawn_stub(fast_stub()).await;
    let transport = HttpTransport::new(&transport(&base_url)).expect("Transport");

    let err = transport
        .status("does-not-exist")
        .await
        .expect_err("Unknown task should 404");
    assert!(matches!(err, TransportError::Api { status: 404, .. }));
    assert!(!err.is_transient());
}
