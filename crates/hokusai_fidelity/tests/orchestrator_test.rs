//! End-to-end orchestrator tests against a scripted mock backend.

mod test_utils;

use hokusai_fidelity::{FidelityConfig, Orchestrator, RunStatus};
use test_utils::{
    MockDriver, MockResponse, architect_json, evaluator_json, reader_json, script_json,
};
use tokio_util::sync::CancellationToken;

fn success(json: String) -> MockResponse {
    MockResponse::Success(json)
}

/// Config with a short timeout so failure paths stay fast.
fn test_config() -> FidelityConfig {
    FidelityConfig::default().with_stage_timeout_secs(5)
}

#[tokio::test]
async fn fast_pass_validates_on_first_iteration() -> anyhow::Result<()> {
    let driver = MockDriver::new_sequence(vec![
        success(architect_json(None)),
        success(script_json("take one")),
        success(reader_json(82.0)),
        success(evaluator_json(92.0)),
    ]);
    let orchestrator = Orchestrator::new(driver, test_config());

    let result = orchestrator
        .run("A simple love story between two classmates", 3)
        .await?;

    assert_eq!(*result.status(), RunStatus::Validated);
    assert_eq!(result.history().len(), 1);
    assert_eq!(*result.final_score(), Some(92.0));
    assert_eq!(*result.iterations_used(), 1);
    assert!(result.error().is_none());
    Ok(())
}

#[tokio::test]
async fn final_panels_satisfy_the_panel_contract() -> anyhow::Result<()> {
    let driver = MockDriver::new_sequence(vec![
        success(architect_json(None)),
        success(script_json("take one")),
        success(reader_json(82.0)),
        success(evaluator_json(92.0)),
    ]);
    let orchestrator = Orchestrator::new(driver, test_config());

    let result = orchestrator.run("two classmates", 3).await?;

    assert!(!result.panels().is_empty());
    for (position, panel) in result.panels().iter().enumerate() {
        assert_eq!(*panel.index(), position as u32 + 1);
        assert!(!panel.visual().trim().is_empty());
        assert!(panel.visual().chars().count() >= 150);
    }
    Ok(())
}

#[tokio::test]
async fn exhaustion_returns_best_effort_panels() -> anyhow::Result<()> {
    let driver = MockDriver::new_sequence(vec![
        success(architect_json(None)),
        success(script_json("take one")),
        success(reader_json(48.0)),
        success(evaluator_json(55.0)),
        success(script_json("take two")),
        success(reader_json(52.0)),
        success(evaluator_json(61.0)),
    ]);
    let orchestrator = Orchestrator::new(driver, test_config());

    let result = orchestrator
        .run("a story whose central twist is never said aloud", 2)
        .await?;

    assert_eq!(*result.status(), RunStatus::MaxIterationsReached);
    assert_eq!(result.history().len(), 2);
    assert!(*result.history().last().unwrap().score() < 80.0);
    // The best available panels are the last revision produced.
    assert!(result.panels()[0].visual().contains("take two"));
    Ok(())
}

#[tokio::test]
async fn critical_gap_drives_a_textual_revision() -> anyhow::Result<()> {
    let driver = MockDriver::new_sequence(vec![
        success(architect_json(None)),
        success(script_json("take one")),
        success(reader_json(48.0)),
        success(evaluator_json(55.0)),
        success(script_json("take two")),
        success(reader_json(52.0)),
        success(evaluator_json(61.0)),
    ]);
    let orchestrator = Orchestrator::new(driver, test_config());

    let result = orchestrator.run("an ambiguous seed", 2).await?;

    // Iteration 1 reported a critical motivation gap; iteration 2's panels
    // must differ textually from iteration 1's.
    assert_eq!(result.history().len(), 2);
    assert!(*result.history()[0].gap_count() > 0);
    assert!(result.panels()[0].visual().contains("take two"));
    assert!(!result.panels()[0].visual().contains("take one"));
    Ok(())
}

#[tokio::test]
async fn revision_prompt_carries_the_critique() -> anyhow::Result<()> {
    // An Arc keeps a handle on the driver for prompt inspection; the
    // blanket impl lets the orchestrator use the clone directly.
    let driver = std::sync::Arc::new(MockDriver::new_sequence(vec![
        success(architect_json(None)),
        success(script_json("take one")),
        success(reader_json(48.0)),
        success(evaluator_json(55.0)),
        success(script_json("take two")),
        success(reader_json(80.0)),
        success(evaluator_json(88.0)),
    ]));
    let orchestrator = Orchestrator::new(driver.clone(), test_config());
    let _ = orchestrator.run("an ambiguous seed", 3).await?;

    let prompts = driver.prompts();
    // Call order: architect, scripter, reader, evaluator, scripter, ...
    let revision_prompt = &prompts[4];
    assert!(revision_prompt.contains("never learns why the skyline matters"));
    assert!(revision_prompt.contains("dedication page"));
    Ok(())
}

#[tokio::test]
async fn stage_failure_terminates_with_error_and_partial_history() -> anyhow::Result<()> {
    let driver = MockDriver::new_sequence(vec![
        success(architect_json(None)),
        MockResponse::Error("503 model overloaded".to_string()),
    ]);
    let config = test_config().with_stage_retries(0);
    let orchestrator = Orchestrator::new(driver, config);

    let result = orchestrator.run("two classmates", 3).await?;

    assert_eq!(*result.status(), RunStatus::Error);
    assert!(result.error().as_deref().unwrap_or_default().contains("503"));
    // The architect succeeded before the failure; its narrative survives.
    assert!(!result.narrative().is_empty());
    assert!(result.history().is_empty());
    Ok(())
}

#[tokio::test]
async fn transient_failure_is_retried_within_budget() -> anyhow::Result<()> {
    let driver = MockDriver::new_sequence(vec![
        MockResponse::Error("503 service unavailable".to_string()),
        success(architect_json(None)),
        success(script_json("take one")),
        success(reader_json(82.0)),
        success(evaluator_json(90.0)),
    ]);
    let config = test_config().with_stage_retries(1);
    let orchestrator = Orchestrator::new(driver, config);

    let result = orchestrator.run("two classmates", 3).await?;

    assert_eq!(*result.status(), RunStatus::Validated);
    Ok(())
}

#[tokio::test]
async fn retries_exhausted_surface_as_error() -> anyhow::Result<()> {
    let driver = MockDriver::new_sequence(vec![
        MockResponse::Error("429 rate limited".to_string()),
        MockResponse::Error("429 rate limited".to_string()),
    ]);
    let config = test_config().with_stage_retries(1);
    let orchestrator = Orchestrator::new(driver, config);

    let result = orchestrator.run("two classmates", 3).await?;

    assert_eq!(*result.status(), RunStatus::Error);
    let message = result.error().clone().unwrap_or_default();
    assert!(message.contains("2 attempts"));
    Ok(())
}

#[tokio::test]
async fn cancelled_run_terminates_without_reader_calls() -> anyhow::Result<()> {
    let token = CancellationToken::new();
    token.cancel();

    let driver = MockDriver::new_sequence(vec![
        success(architect_json(None)),
        success(script_json("take one")),
    ]);
    let orchestrator = Orchestrator::new(driver, test_config()).with_cancellation(token);

    let result = orchestrator.run("two classmates", 3).await?;

    assert_eq!(*result.status(), RunStatus::Error);
    assert!(
        result
            .error()
            .as_deref()
            .unwrap_or_default()
            .contains("cancelled")
    );
    assert!(result.history().is_empty());
    Ok(())
}

#[tokio::test]
async fn termination_holds_at_the_iteration_ceiling() -> anyhow::Result<()> {
    let driver = MockDriver::new_sequence(vec![
        success(architect_json(None)),
        success(script_json("take one")),
        success(reader_json(40.0)),
        success(evaluator_json(50.0)),
        success(script_json("take two")),
        success(reader_json(45.0)),
        success(evaluator_json(55.0)),
        success(script_json("take three")),
        success(reader_json(50.0)),
        success(evaluator_json(60.0)),
    ]);
    let orchestrator = Orchestrator::new(driver, test_config());

    let result = orchestrator.run("stubbornly unclear seed", 3).await?;

    assert_eq!(*result.status(), RunStatus::MaxIterationsReached);
    assert_eq!(result.history().len(), 3);
    // Scores are recorded in order.
    let scores: Vec<f32> = result.history().iter().map(|r| *r.score()).collect();
    assert_eq!(scores, vec![50.0, 55.0, 60.0]);
    Ok(())
}

#[tokio::test]
async fn progress_snapshots_reach_terminal_state() -> anyhow::Result<()> {
    let driver = MockDriver::new_sequence(vec![
        success(architect_json(None)),
        success(script_json("take one")),
        success(reader_json(82.0)),
        success(evaluator_json(92.0)),
    ]);
    let orchestrator = Orchestrator::new(driver, test_config());
    let progress = orchestrator.subscribe();

    let _ = orchestrator.run("two classmates", 3).await?;

    let snapshot = progress.borrow();
    assert!(snapshot.terminal);
    assert_eq!(snapshot.latest_score, Some(92.0));
    assert!(snapshot.panel_count > 0);
    Ok(())
}

#[tokio::test]
async fn default_budget_comes_from_configuration() -> anyhow::Result<()> {
    let driver = MockDriver::new_sequence(vec![
        success(architect_json(None)),
        success(script_json("take one")),
        success(reader_json(82.0)),
        success(evaluator_json(92.0)),
    ]);
    let orchestrator = Orchestrator::new(driver, test_config().with_max_iterations(2));

    let result = orchestrator.run_with_defaults("two classmates").await?;

    assert_eq!(*result.status(), RunStatus::Validated);
    assert!(result.history().len() <= 2);
    Ok(())
}

#[tokio::test]
async fn zero_iteration_budget_is_rejected_up_front() {
    let driver = MockDriver::new_sequence(vec![]);
    let orchestrator = Orchestrator::new(driver, test_config());

    let result = orchestrator.run("two classmates", 0).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn empty_seed_is_rejected_up_front() {
    let driver = MockDriver::new_sequence(vec![]);
    let orchestrator = Orchestrator::new(driver, test_config());

    let result = orchestrator.run("   ", 3).await;
    assert!(result.is_err());
}
