// tests/worker_registry.rs

use std::collections::BTreeMap;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::json;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use taskswarm::exec::builtin::EchoWorker;
use taskswarm::exec::{BuildError, WorkerContext, WorkerProvider, WorkerRegistry};

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("build tokio runtime")
}

fn ctx(rt: &Runtime, id: &str, cancel: CancellationToken) -> WorkerContext {
    let mut deps = BTreeMap::new();
    deps.insert("up".to_string(), json!({"text": "upstream"}));
    WorkerContext::new(id, "echo", deps, cancel, rt.handle().clone())
}

#[test]
fn builtins_are_registered() {
    let registry = WorkerRegistry::with_builtins();
    assert_eq!(registry.kinds(), vec!["command", "echo", "sleep"]);
    assert!(!registry.contains("research"));
}

#[test]
fn unknown_kind_and_failing_factory_are_build_errors() {
    let mut registry = WorkerRegistry::new();
    registry.register_fallible("flaky", || Err::<EchoWorker, _>("missing credentials".to_string()));

    assert!(matches!(
        registry.build("nothing"),
        Err(BuildError::UnknownKind(kind)) if kind == "nothing"
    ));
    assert!(matches!(
        registry.build("flaky"),
        Err(BuildError::Construction { message, .. }) if message == "missing credentials"
    ));
}

#[test]
fn echo_returns_input_and_dependencies() {
    let rt = runtime();
    let registry = WorkerRegistry::with_builtins();
    let mut worker = registry.build("echo").expect("echo is built in");

    let out = worker
        .execute(&json!({"x": 1}), &ctx(&rt, "e", CancellationToken::new()))
        .expect("echo succeeds");
    assert_eq!(
        out,
        json!({"input": {"x": 1}, "dependencies": {"up": {"text": "upstream"}}})
    );
}

#[test]
fn context_sleep_stops_early_when_cancelled() {
    let rt = runtime();
    let token = CancellationToken::new();
    let ctx = ctx(&rt, "s", token.clone());
    token.cancel();

    let started = Instant::now();
    assert!(ctx.sleep(Duration::from_secs(5)).is_err());
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(ctx.is_cancelled());
}

#[test]
fn sleep_worker_rejects_malformed_input() {
    let rt = runtime();
    let registry = WorkerRegistry::with_builtins();
    let mut worker = registry.build("sleep").expect("sleep is built in");

    let err = worker
        .execute(&json!({"seconds": 1}), &ctx(&rt, "s", CancellationToken::new()))
        .expect_err("ms is required");
    assert!(err.to_string().contains("sleep input"));
}

#[test]
fn context_sleep_completes_without_cancellation() {
    let rt = runtime();
    let ctx = ctx(&rt, "s", CancellationToken::new());

    let started = Instant::now();
    ctx.sleep(Duration::from_millis(50)).expect("not cancelled");
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[cfg(unix)]
#[test]
fn command_reports_stdout_and_exit_code() {
    let rt = runtime();
    let registry = WorkerRegistry::with_builtins();
    let mut worker = registry.build("command").expect("command is built in");

    let out = worker
        .execute(
            &json!({"cmd": "echo out; echo err >&2"}),
            &ctx(&rt, "c", CancellationToken::new()),
        )
        .expect("command succeeds");
    assert_eq!(out["exit_code"], json!(0));
    assert_eq!(out["stdout"], json!("out\n"));
    assert_eq!(out["stderr"], json!("err\n"));

    let err = worker
        .execute(
            &json!({"cmd": "echo broken >&2; exit 4"}),
            &ctx(&rt, "c", CancellationToken::new()),
        )
        .expect_err("non-zero exit fails");
    assert!(err.to_string().contains("code 4: broken"), "{err}");
}

#[cfg(unix)]
#[test]
fn command_is_killed_when_cancelled_mid_run() {
    let rt = runtime();
    let registry = WorkerRegistry::with_builtins();
    let mut worker = registry.build("command").expect("command is built in");
    let token = CancellationToken::new();
    let ctx = ctx(&rt, "c", token.clone());

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        token.cancel();
    });

    let started = Instant::now();
    let err = worker
        .execute(&json!({"cmd": "sleep 30"}), &ctx)
        .expect_err("cancelled command fails");
    canceller.join().expect("canceller thread");

    assert!(err.to_string().contains("cancelled"), "{err}");
    assert!(started.elapsed() < Duration::from_secs(5));
}
