//! Integration tests for orchestration execution and fallback
//!
//! Verifies that:
//! - a failed invocation is retried exactly once on the next best provider
//! - selection errors never reach a provider
//! - invocation timeouts are hard bounds and count as failures
//! - a dispatched call completes and is recorded even if the caller gives up

mod common;

use common::{ScriptedProvider, config, incident, router, router_with_config};
use opsroute::error::{ProviderError, RouterError};
use opsroute::health::HealthStatus;
use opsroute::orchestration::DecisionFilter;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_failed_provider_falls_back_to_next_best() {
    let ollama = ScriptedProvider::with_latency("ollama", 5);
    let mock = ScriptedProvider::with_latency("mock", 20);
    let router = router(&[ollama.clone(), mock.clone()]);
    router.refresh_health(None).await.unwrap();
    ollama.fail_next_invocations(1);

    let outcome = router.run_orchestration(incident()).await.unwrap();

    assert_eq!(outcome.status, "success");
    assert_eq!(outcome.event_type, "incident");
    assert_eq!(outcome.decisions.len(), 1);
    let decision = &outcome.decisions[0];
    assert_eq!(decision.provider, "mock");
    assert_eq!(decision.model, "mock-small");
    assert_eq!(decision.agent_name, "incident_triage_agent");
    assert_eq!(decision.decision, "mock handled incident");
    assert_eq!(outcome.actions_taken, vec!["acknowledge".to_string()]);
    assert_eq!(ollama.invoke_calls(), 1);
    assert_eq!(mock.invoke_calls(), 1);
    assert_eq!(router.metrics().fallbacks_count(), 1);

    let page = router
        .get_decisions(DecisionFilter {
            event_type: Some("incident".to_string()),
            limit: Some(1),
        })
        .await;
    assert_eq!(page.decisions[0], outcome.decisions[0]);
}

#[tokio::test(start_paused = true)]
async fn test_invocation_failure_does_not_change_health() {
    let ollama = ScriptedProvider::with_latency("ollama", 5);
    let mock = ScriptedProvider::with_latency("mock", 20);
    let router = router(&[ollama.clone(), mock]);
    router.refresh_health(None).await.unwrap();
    ollama.fail_next_invocations(1);

    router.run_orchestration(incident()).await.unwrap();

    let view = router.get_health();
    assert_eq!(view.providers.status("ollama"), Some(HealthStatus::Healthy));
    assert_eq!(view.providers.get("ollama").unwrap().error_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_two_failures_exhaust_attempts() {
    let a = ScriptedProvider::with_latency("a", 5);
    let b = ScriptedProvider::with_latency("b", 10);
    let c = ScriptedProvider::with_latency("c", 15);
    let router = router(&[a.clone(), b.clone(), c.clone()]);
    router.refresh_health(None).await.unwrap();
    a.fail_next_invocations(1);
    b.fail_next_invocations(1);

    let err = router.run_orchestration(incident()).await.unwrap_err();

    assert_eq!(
        err,
        RouterError::ExecutionError {
            attempts: 2,
            last_error: ProviderError::Injected {
                provider: "b".to_string(),
                reason: "scripted failure".to_string(),
            },
        }
    );
    assert_eq!(c.invoke_calls(), 0, "only one alternate is tried");
    assert!(router.get_decisions(DecisionFilter::default()).await.decisions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_no_alternate_reports_single_attempt() {
    let only = ScriptedProvider::new("only");
    let router = router(&[only.clone()]);
    router.refresh_health(None).await.unwrap();
    only.fail_next_invocations(1);

    let err = router.run_orchestration(incident()).await.unwrap_err();
    assert!(matches!(err, RouterError::ExecutionError { attempts: 1, .. }));
    assert_eq!(only.invoke_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_healthy_provider_invokes_nothing() {
    let a = ScriptedProvider::new("a");
    let b = ScriptedProvider::new("b");
    a.set_probe_failing(true);
    b.set_probe_failing(true);
    let router = router(&[a.clone(), b.clone()]);
    for _ in 0..3 {
        router.refresh_health(None).await.unwrap();
    }

    let err = router.run_orchestration(incident()).await.unwrap_err();

    assert_eq!(
        err,
        RouterError::NoHealthyProvider {
            checked: 2,
            excluded: 0
        }
    );
    assert_eq!(a.invoke_calls() + b.invoke_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_invocation_timeout_falls_back() {
    let hanging = ScriptedProvider::with_latency("hanging", 5);
    hanging.set_invoke_delay(Duration::from_secs(600));
    let backup = ScriptedProvider::with_latency("backup", 50);
    let router = router_with_config(&[hanging.clone(), backup.clone()], &config(30, 5, 10));
    router.refresh_health(None).await.unwrap();

    let started = tokio::time::Instant::now();
    let outcome = router.run_orchestration(incident()).await.unwrap();

    assert_eq!(outcome.decisions[0].provider, "backup");
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(10));
    assert!(elapsed < Duration::from_secs(11), "timeout must bound the call: {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_on_every_attempt_reports_timeout() {
    let hanging = ScriptedProvider::new("hanging");
    hanging.set_invoke_delay(Duration::from_secs(600));
    let router = router_with_config(&[hanging], &config(30, 5, 2));
    router.refresh_health(None).await.unwrap();

    let err = router.run_orchestration(incident()).await.unwrap_err();
    match err {
        RouterError::ExecutionError {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 1);
            assert_eq!(last_error.kind(), "timeout");
            assert_eq!(last_error.to_string(), "hanging did not respond within 2000ms");
        }
        other => panic!("expected ExecutionError, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_override_falls_back_to_ranked_provider() {
    let pinned = ScriptedProvider::with_latency("pinned", 500);
    let best = ScriptedProvider::with_latency("best", 5);
    let router = router(&[pinned.clone(), best.clone()]);
    router.refresh_health(None).await.unwrap();
    pinned.fail_next_invocations(1);

    let outcome = router
        .run_orchestration(incident().with_provider("pinned"))
        .await
        .unwrap();

    assert_eq!(outcome.decisions[0].provider, "best");
    assert_eq!(pinned.invoke_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_request_is_still_recorded() {
    let slow = ScriptedProvider::new("slow");
    slow.set_invoke_delay(Duration::from_secs(3));
    let router = router(&[slow.clone()]);
    router.refresh_health(None).await.unwrap();

    let abandoned =
        tokio::time::timeout(Duration::from_millis(100), router.run_orchestration(incident()))
            .await;
    assert!(abandoned.is_err(), "caller should have given up");

    tokio::time::sleep(Duration::from_secs(5)).await;

    let page = router.get_decisions(DecisionFilter::default()).await;
    assert_eq!(page.total, 1);
    assert_eq!(page.decisions[0].provider, "slow");
    assert_eq!(slow.invoke_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_configured_model_is_used_for_next_invocation() {
    let provider = ScriptedProvider::new("ollama");
    let router = router(&[provider.clone()]);
    router.refresh_health(None).await.unwrap();

    router
        .configure_provider("ollama", "ollama-large", &Default::default())
        .unwrap();
    let outcome = router.run_orchestration(incident()).await.unwrap();

    assert_eq!(provider.last_model().as_deref(), Some("ollama-large"));
    assert_eq!(outcome.decisions[0].model, "ollama-large");
}

#[tokio::test(start_paused = true)]
async fn test_outcomes_are_counted_per_provider() {
    let ollama = ScriptedProvider::with_latency("ollama", 5);
    let mock = ScriptedProvider::with_latency("mock", 20);
    let router = router(&[ollama.clone(), mock]);
    router.refresh_health(None).await.unwrap();
    ollama.fail_next_invocations(1);

    router.run_orchestration(incident()).await.unwrap();

    let output = router.metrics().gather().unwrap();
    let failure_line = output
        .lines()
        .find(|line| {
            line.starts_with("opsroute_orchestrations_total{")
                && line.contains("provider=\"ollama\"")
                && line.contains("outcome=\"failure\"")
        })
        .expect("failure outcome should be recorded for ollama");
    assert!(failure_line.ends_with(" 1"));
    assert!(output.contains("opsroute_fallbacks_total 1"));
    assert!(output.contains("opsroute_decision_log_appends_total 1"));
}
