//! Reload scenarios: worker replacement, rebuild failure, post-dispose.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cadence_control::{ControllerConfig, ExperimentController};
use cadence_core::{ControlError, ExperimentEvent, ExperimentId, ExperimentParams, ParamValue};
use cadence_test_utils::{RecordingReporter, ScriptedFactory};

fn params_stopping_at(stop: i64) -> ExperimentParams {
    let mut params = ExperimentParams::new();
    params.set("stop_at", ParamValue::Int(stop));
    params.with_stop_condition("cycle >= stop_at")
}

fn wait_until(timeout_ms: u64, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    while !cond() {
        if Instant::now() > deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    true
}

fn build_controller(
    factory: ScriptedFactory,
    params: ExperimentParams,
) -> (
    ExperimentController,
    Arc<ScriptedFactory>,
    Arc<RecordingReporter>,
) {
    let factory = Arc::new(factory);
    let reporter = Arc::new(RecordingReporter::new());
    let controller = ExperimentController::new(
        ExperimentId::next(),
        params,
        Arc::clone(&factory) as _,
        Arc::clone(&reporter) as _,
        ControllerConfig::default(),
    )
    .unwrap();
    (controller, factory, reporter)
}

fn reloaded_count(reporter: &RecordingReporter) -> usize {
    reporter
        .events()
        .iter()
        .filter(|e| matches!(e, ExperimentEvent::Reloaded))
        .count()
}

#[test]
fn reload_requires_pause() {
    let (controller, factory, _reporter) =
        build_controller(ScriptedFactory::new(), params_stopping_at(1_000_000));
    controller.direct_open().unwrap();
    controller.user_start();
    assert!(wait_until(5_000, || factory.jobs()[0].steps() > 0));

    let result = controller.direct_reload();
    assert!(matches!(result, Err(ControlError::NotPaused)));
    assert_eq!(factory.builds(), 1, "no rebuild happened");

    controller.dispose();
}

#[test]
fn reload_rebuilds_from_the_same_parameters() {
    let (controller, factory, reporter) =
        build_controller(ScriptedFactory::new(), params_stopping_at(100));
    controller.direct_open().unwrap();
    controller.step(4, true).unwrap();

    controller.direct_reload().unwrap();

    assert_eq!(factory.builds(), 2);
    let jobs = factory.jobs();
    assert_eq!(jobs[0].disposals(), 1, "the old job was disposed");
    assert_eq!(jobs[1].steps(), 0, "the fresh job starts at cycle zero");
    assert!(controller.is_paused(), "a reloaded experiment starts paused");
    assert_eq!(reloaded_count(&reporter), 1);

    // The replacement workers are live: stepping works again.
    controller.step(2, true).unwrap();
    assert_eq!(factory.jobs()[1].steps(), 2);

    controller.dispose();
}

#[test]
fn queued_reload_replaces_the_workers() {
    // RELOAD through the mailbox runs on the command thread, which must
    // retire itself without self-joining.
    let (controller, factory, reporter) =
        build_controller(ScriptedFactory::new(), params_stopping_at(100));
    controller.direct_open().unwrap();

    controller.user_reload();

    assert!(wait_until(5_000, || reloaded_count(&reporter) == 1));
    assert_eq!(factory.builds(), 2);
    assert!(wait_until(5_000, || factory.jobs()[0].disposals() == 1));

    controller.step(1, true).unwrap();
    assert_eq!(factory.jobs()[1].steps(), 1);

    controller.dispose();
}

#[test]
fn repeated_reloads_keep_working() {
    let (controller, factory, reporter) =
        build_controller(ScriptedFactory::new(), params_stopping_at(100));
    controller.direct_open().unwrap();

    for _ in 0..3 {
        controller.direct_reload().unwrap();
    }

    assert_eq!(factory.builds(), 4);
    assert_eq!(reloaded_count(&reporter), 3);
    controller.step(1, true).unwrap();
    assert_eq!(factory.jobs()[3].steps(), 1);

    controller.dispose();
}

#[test]
fn reload_failure_closes_the_experiment() {
    let (controller, factory, reporter) =
        build_controller(ScriptedFactory::new(), params_stopping_at(100));
    controller.direct_open().unwrap();
    factory.fail_next_builds(1);

    let result = controller.direct_reload();
    assert!(matches!(result, Err(ControlError::Load(_))));
    assert!(controller.is_disposing());
    assert_eq!(factory.jobs()[0].disposals(), 1);
    assert!(!reporter.errors().is_empty());
}

#[test]
fn reload_after_dispose_is_rejected() {
    let (controller, factory, _reporter) =
        build_controller(ScriptedFactory::new(), params_stopping_at(100));
    controller.direct_open().unwrap();
    controller.dispose();

    let result = controller.direct_reload();
    assert!(matches!(result, Err(ControlError::Disposing)));
    assert_eq!(factory.builds(), 1);
}

#[test]
fn reload_without_a_job_is_rejected() {
    let (controller, factory, _reporter) =
        build_controller(ScriptedFactory::new(), params_stopping_at(100));

    let result = controller.direct_reload();
    assert!(matches!(result, Err(ControlError::NoJob)));
    assert_eq!(factory.builds(), 0);

    controller.dispose();
}
