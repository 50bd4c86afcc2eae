// tests/system_processes.rs
//
// Runs real `sh` processes through the system launcher.

#![cfg(unix)]

use std::error::Error;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use migrun::engine::{Orchestrator, RunOutcome};
use migrun::errors::MigrunError;
use migrun::exec::SystemLauncher;
use migrun::types::{ProcessExit, StderrMode};
use migrun_test_utils::builders::UnitBuilder;
use migrun_test_utils::recording_surface::RecordingSurface;
use migrun_test_utils::{init_tracing, wait_until, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn launcher() -> SystemLauncher {
    SystemLauncher::new(StderrMode::Discard)
}

#[tokio::test]
async fn shell_units_report_their_last_status() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;

    let units = vec![
        UnitBuilder::new("first")
            .working_dir(dir.path())
            .shell("echo '[Step 1]'; echo '[12:00:01] Migrating schema...'; echo done")
            .build(),
        UnitBuilder::new("second")
            .working_dir(dir.path())
            .shell("echo '[ok]'; exit 4")
            .build(),
    ];

    let surface = RecordingSurface::new();
    let report = with_timeout(
        Orchestrator::new(launcher(), surface.clone()).run(units, CancellationToken::new()),
    )
    .await?;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(
        surface.last_statuses(),
        vec!["12:00:01 Migrating schema...", "ok"]
    );
    assert_eq!(report.units[0].exit, Some(ProcessExit::with_code(0)));
    assert_eq!(report.units[1].exit, Some(ProcessExit::with_code(4)));
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.killed(), 0);

    Ok(())
}

#[tokio::test]
async fn units_run_in_their_working_directory() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    std::fs::write(dir.path().join("marker.txt"), "x")?;

    let unit = UnitBuilder::new("cwd")
        .working_dir(dir.path())
        .shell("test -f marker.txt && echo '[found]'")
        .build();

    let surface = RecordingSurface::new();
    let report = with_timeout(
        Orchestrator::new(launcher(), surface.clone()).run(vec![unit], CancellationToken::new()),
    )
    .await?;

    assert!(report.all_succeeded());
    assert_eq!(surface.last_statuses(), vec!["found"]);

    Ok(())
}

#[tokio::test]
async fn missing_program_is_a_launch_error() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;

    let unit = UnitBuilder::new("ghost")
        .working_dir(dir.path())
        .program("migrun-test-no-such-program")
        .build();

    let result = with_timeout(
        Orchestrator::new(launcher(), RecordingSurface::new())
            .run(vec![unit], CancellationToken::new()),
    )
    .await;

    match result {
        Err(MigrunError::Launch(err)) => {
            assert_eq!(err.unit, "ghost");
            assert_eq!(err.source.kind(), std::io::ErrorKind::NotFound);
        }
        Err(e) => panic!("Expected Launch error, got: {e:?}"),
        Ok(r) => panic!("Expected error, got Ok: {r:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn cancellation_kills_the_whole_process_tree() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;

    // The shell starts a grandchild and reports its pid as status.
    let unit = UnitBuilder::new("tree")
        .working_dir(dir.path())
        .shell("sleep 30 & echo \"[pid $!]\"; wait")
        .build();

    let surface = RecordingSurface::new();
    let cancel = CancellationToken::new();
    let run = tokio::spawn(
        Orchestrator::new(launcher(), surface.clone()).run(vec![unit], cancel.clone()),
    );

    with_timeout(wait_until(|| {
        surface
            .last_statuses()
            .first()
            .is_some_and(|s| s.starts_with("pid "))
    }))
    .await;

    let status = surface.last_statuses().remove(0);
    let grandchild: i32 = status.trim_start_matches("pid ").parse()?;

    cancel.cancel();
    let report = with_timeout(run).await??;

    assert_eq!(report.outcome, RunOutcome::Cancelled);
    assert_eq!(report.killed(), 1);
    assert_eq!(report.units[0].exit, Some(ProcessExit::signalled()));

    with_timeout(wait_until(|| !is_alive(grandchild))).await;

    Ok(())
}

#[tokio::test]
async fn undecodable_output_does_not_break_the_child() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;

    // A Latin-1 line, then enough output to fill the pipe if nobody reads it.
    let unit = UnitBuilder::new("latin1")
        .working_dir(dir.path())
        .shell(
            "printf '[10:00] Migraci\\363n\\n'; sleep 0.3; \
             i=0; while [ $i -lt 2000 ]; do echo \"[10:01] step $i\"; i=$((i+1)); done; exit 0",
        )
        .build();

    let surface = RecordingSurface::new();
    let report = with_timeout(
        Orchestrator::new(launcher(), surface.clone()).run(vec![unit], CancellationToken::new()),
    )
    .await?;

    assert_eq!(report.units[0].exit, Some(ProcessExit::with_code(0)));
    assert_eq!(report.exit_code(), 0);
    assert_eq!(surface.last_statuses(), vec!["10:01 step 1999"]);

    Ok(())
}

#[tokio::test]
async fn descendants_are_swept_after_a_normal_exit() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;

    let unit = UnitBuilder::new("leaves-child")
        .working_dir(dir.path())
        .shell("sleep 30 >/dev/null & echo \"[pid $!]\"; exit 0")
        .build();

    let report = with_timeout(
        Orchestrator::new(launcher(), RecordingSurface::new())
            .run(vec![unit], CancellationToken::new()),
    )
    .await?;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.killed(), 0);
    assert_eq!(report.units[0].exit, Some(ProcessExit::with_code(0)));

    let grandchild: i32 = report.units[0].status.trim_start_matches("pid ").parse()?;
    with_timeout(wait_until(|| !is_alive(grandchild))).await;

    Ok(())
}

#[tokio::test]
async fn slow_unit_is_awaited_not_killed() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;

    let unit = UnitBuilder::new("slow")
        .working_dir(dir.path())
        .shell("sleep 0.2; echo '[finished]'")
        .build();

    let surface = RecordingSurface::new();
    let started = std::time::Instant::now();
    let report = with_timeout(
        Orchestrator::new(launcher(), surface.clone()).run(vec![unit], CancellationToken::new()),
    )
    .await?;

    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(report.killed(), 0);
    assert_eq!(surface.last_statuses(), vec!["finished"]);

    Ok(())
}

/// A process that is gone or only left as a zombie counts as dead.
#[cfg(target_os = "linux")]
fn is_alive(pid: i32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .is_some_and(|state| state != "Z" && state != "X"),
        Err(_) => false,
    }
}

#[cfg(not(target_os = "linux"))]
fn is_alive(pid: i32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid), None).is_ok()
}
