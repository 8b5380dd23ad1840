//! Lifecycle scenarios: open, run to completion, close, dispose.

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

fn ended_count(reporter: &RecordingReporter) -> usize {
    reporter
        .events()
        .iter()
        .filter(|e| matches!(e, ExperimentEvent::SimulationEnded { .. }))
        .count()
}

#[test]
fn run_to_stop_condition_reports_ended_once() {
    let (controller, factory, reporter) =
        build_controller(ScriptedFactory::new(), params_stopping_at(25));

    controller.direct_open().unwrap();
    controller.user_start();

    assert!(
        wait_until(5_000, || ended_count(&reporter) > 0),
        "run should reach the stop condition within 5s"
    );
    // Let any straggler iteration surface before asserting exactly-once.
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(ended_count(&reporter), 1);
    assert_eq!(factory.jobs()[0].steps(), 25);

    controller.dispose();
}

#[test]
fn halting_without_stop_condition_is_silent() {
    // stop_at set, but no declared stop condition: the loop halts
    // without announcing anything.
    let mut params = ExperimentParams::new();
    params.set("stop_at", ParamValue::Int(5));
    let (controller, factory, reporter) = build_controller(ScriptedFactory::new(), params);

    controller.direct_open().unwrap();
    controller.user_start();

    assert!(wait_until(5_000, || factory.jobs()[0].steps() >= 5));
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(factory.jobs()[0].steps(), 5, "loop should halt at the threshold");
    assert_eq!(ended_count(&reporter), 0);

    controller.dispose();
}

#[test]
fn commands_after_run_end_do_not_restart_it() {
    let (controller, factory, reporter) =
        build_controller(ScriptedFactory::new(), params_stopping_at(3));
    controller.direct_open().unwrap();
    controller.user_start();
    assert!(wait_until(5_000, || ended_count(&reporter) == 1));

    // The end is terminal for this job: later STEP and START must not
    // resurrect the run loop, re-run the job, or announce the end again.
    controller.user_step();
    controller.user_start();
    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(ended_count(&reporter), 1);
    assert_eq!(factory.jobs()[0].steps(), 3);
    assert!(matches!(controller.direct_step(), Err(ControlError::Ended)));

    // RELOAD is the way back in: fresh job, stepping works again.
    controller.direct_pause().unwrap();
    controller.direct_reload().unwrap();
    controller.step(1, true).unwrap();
    assert_eq!(factory.jobs()[1].steps(), 1);

    controller.dispose();
}

#[test]
fn queued_open_builds_the_job() {
    let (controller, factory, _reporter) =
        build_controller(ScriptedFactory::new(), params_stopping_at(100));

    // OPEN is the one command admitted to the queue with no job loaded.
    controller.user_open();

    assert!(wait_until(5_000, || factory.builds() == 1));
    assert!(controller.is_paused());
    assert_eq!(factory.jobs()[0].steps(), 0);

    controller.dispose();
}

#[test]
fn dispose_is_idempotent() {
    let (controller, factory, reporter) =
        build_controller(ScriptedFactory::new(), params_stopping_at(100));
    controller.direct_open().unwrap();

    controller.dispose();
    controller.dispose();

    assert_eq!(factory.jobs()[0].disposals(), 1, "job disposed exactly once");
    let disposed = reporter
        .events()
        .iter()
        .filter(|e| matches!(e, ExperimentEvent::Disposed))
        .count();
    assert_eq!(disposed, 1);
}

#[test]
fn drop_disposes() {
    let (controller, factory, _reporter) =
        build_controller(ScriptedFactory::new(), params_stopping_at(100));
    controller.direct_open().unwrap();
    drop(controller);
    assert_eq!(factory.jobs()[0].disposals(), 1);
}

#[test]
fn commands_after_dispose_are_dropped_silently() {
    let (controller, factory, reporter) =
        build_controller(ScriptedFactory::new(), params_stopping_at(100));
    controller.direct_open().unwrap();
    controller.dispose();
    let errors_before = reporter.errors().len();

    // Disposal race: late commands are a no-op at the queue boundary,
    // not an error.
    controller.user_start();
    controller.user_step();
    controller.user_reload();
    std::thread::sleep(Duration::from_millis(100));

    assert_eq!(factory.jobs()[0].steps(), 0);
    assert_eq!(reporter.errors().len(), errors_before);
}

#[test]
fn open_failure_is_reported_and_retryable() {
    let (controller, factory, reporter) = build_controller(
        ScriptedFactory::new().failing_builds(1),
        params_stopping_at(100),
    );

    let result = controller.direct_open();
    assert!(matches!(result, Err(ControlError::Load(_))));
    assert_eq!(reporter.errors().len(), 1);
    assert_eq!(factory.builds(), 0);

    // The controller stays available for a retry.
    controller.direct_open().unwrap();
    assert_eq!(factory.builds(), 1);
    controller.step(1, true).unwrap();
    assert_eq!(factory.jobs()[0].steps(), 1);

    controller.dispose();
}

#[test]
fn close_cascades_to_dispose() {
    let (controller, factory, reporter) =
        build_controller(ScriptedFactory::new(), params_stopping_at(100));
    controller.direct_open().unwrap();

    controller.close();

    assert!(controller.is_disposing());
    assert_eq!(factory.jobs()[0].disposals(), 1);
    assert!(reporter
        .events()
        .iter()
        .any(|e| matches!(e, ExperimentEvent::Disposed)));
}

#[test]
fn queued_close_tears_down() {
    let (controller, factory, _reporter) =
        build_controller(ScriptedFactory::new(), params_stopping_at(100));
    controller.direct_open().unwrap();

    controller.user_close();

    assert!(wait_until(5_000, || factory.jobs()[0].disposals() == 1));
    assert!(controller.is_disposing());
}
