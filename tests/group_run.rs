// tests/group_run.rs

mod common;

use std::fs;
use std::time::{Duration, Instant};

use hydra::errors::HydraError;
use hydra::exec::{LAUNCH_FAILURE_EXIT_CODE, TIMEOUT_EXIT_CODE};
use hydra::group::{run_identifier, SUMMARY_FILE};
use hydra::staging::STAGED_DIR_SUFFIX;
use hydra_test_utils::builders::{JobBuilder, JobGroupBuilder};
use hydra_test_utils::{init_tracing, with_timeout};

use common::{assert_all_committed, entries, read_log, run_dir};

#[tokio::test]
async fn default_chaining_runs_jobs_in_declaration_order() {
    init_tracing();
    let out = tempfile::tempdir().unwrap();

    let mut group = JobGroupBuilder::new("chain")
        .with_job(JobBuilder::sh("a", "echo first"))
        .with_job(JobBuilder::sh("b", "echo second"))
        .with_job(JobBuilder::sh("c", "echo third"))
        .build(out.path());

    let any_failed = with_timeout(30, group.run()).await.unwrap();
    assert!(!any_failed);
    assert_eq!(group.failed_jobs(), Some(0));
    assert_eq!(group.started_jobs(), 3);
    assert_eq!(group.finished_jobs(), 3);

    let jobs = group.jobs();
    for pair in jobs.windows(2) {
        let before = pair[0].result().unwrap();
        let after = pair[1].result().unwrap();
        assert!(after.start_time >= before.end_time, "{} started before {} ended", pair[1], pair[0]);
    }

    let dir = run_dir(&group);
    assert!(dir.file_name().unwrap().to_string_lossy().ends_with("_chain"));
    assert_eq!(
        entries(&dir),
        vec!["1.a.log", "2.b.log", "3.c.log", SUMMARY_FILE]
    );
    assert_all_committed(&dir);

    let log = read_log(&dir, 2, "b");
    assert!(log.contains("starting job 2: Job(\"b\""));
    assert!(log.contains("second\n"));
    assert!(log.contains(":: RunResult"));
    assert!(log.contains("finished job 2"));
    assert!(jobs[1].log_path().unwrap().ends_with("2.b.log"));
}

#[tokio::test]
async fn max_duration_kills_the_job_with_exit_124() {
    init_tracing();
    let out = tempfile::tempdir().unwrap();

    let mut group = JobGroupBuilder::new("limits")
        .with_job(JobBuilder::new("slow", &["sleep", "10"]).max_duration(2))
        .build(out.path());

    let started = Instant::now();
    let any_failed = with_timeout(20, group.run()).await.unwrap();
    assert!(started.elapsed().as_secs() < 9);
    assert!(any_failed);

    let job = &group.jobs()[0];
    assert_eq!(job.result().unwrap().exit_code, TIMEOUT_EXIT_CODE);
    assert!(job.timed_out());
    assert_eq!(job.argv(), vec!["timeout", "2", "sleep", "10"]);

    let log = read_log(&run_dir(&group), 1, "slow");
    assert!(log.contains("timeout triggered because job exceeded max time of 0:00:02"));
}

#[tokio::test]
async fn unknown_dependency_fails_before_anything_runs() {
    init_tracing();
    let out = tempfile::tempdir().unwrap();
    let marker = out.path().join("ran");

    let mut group = JobGroupBuilder::new("broken")
        .with_job(JobBuilder::sh("a", &format!("touch {}", marker.display())).after_nothing())
        .with_job(JobBuilder::sh("b", "true").after("nonexistent"))
        .build(out.path());

    let err = group.run().await.unwrap_err();
    assert!(matches!(
        &err,
        HydraError::UnknownDependency { job, dependency } if job == "b" && dependency == "nonexistent"
    ));
    assert!(err.is_configuration());
    assert!(entries(out.path()).is_empty(), "no run directory expected");
    assert!(group.jobs().iter().all(|j| !j.is_finished()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn independent_jobs_overlap() {
    init_tracing();
    let out = tempfile::tempdir().unwrap();

    let mut group = JobGroupBuilder::new("parallel")
        .with_job(JobBuilder::new("x", &["sleep", "2"]).after_nothing())
        .with_job(JobBuilder::new("y", &["sleep", "2"]).after_nothing())
        .build(out.path());

    let started = Instant::now();
    with_timeout(20, group.run()).await.unwrap();
    assert!(started.elapsed().as_secs_f64() < 3.9);

    let x = group.jobs()[0].result().unwrap();
    let y = group.jobs()[1].result().unwrap();
    assert!(x.start_time < y.end_time && y.start_time < x.end_time);
}

#[tokio::test]
async fn launch_failure_is_recorded_and_does_not_block() {
    init_tracing();
    let out = tempfile::tempdir().unwrap();

    let mut group = JobGroupBuilder::new("launch")
        .with_job(JobBuilder::new("missing", &["hydra-test-no-such-program"]).after_nothing())
        .with_job(JobBuilder::new("sibling", &["echo", "hi"]).after_nothing())
        .with_job(JobBuilder::new("dependent", &["echo", "after"]).after("missing"))
        .build(out.path());

    let any_failed = with_timeout(30, group.run()).await.unwrap();
    assert!(any_failed);
    assert_eq!(group.failed_jobs(), Some(1));

    let codes: Vec<i32> = group
        .jobs()
        .iter()
        .map(|j| j.result().unwrap().exit_code)
        .collect();
    assert_eq!(codes, vec![LAUNCH_FAILURE_EXIT_CODE, 0, 0]);

    let dir = run_dir(&group);
    assert!(read_log(&dir, 1, "missing").contains("exit_code   : -1"));
    assert_all_committed(&dir);
}

#[tokio::test]
async fn failed_dependency_still_unblocks_its_dependent() {
    init_tracing();
    let out = tempfile::tempdir().unwrap();

    let mut group = JobGroupBuilder::new("failing")
        .with_job(JobBuilder::new("bad", &["false"]))
        .with_job(JobBuilder::sh("next", "echo $WHO").env("WHO", "still-ran"))
        .build(out.path());

    let any_failed = with_timeout(30, group.run()).await.unwrap();
    assert!(any_failed);
    assert_eq!(group.jobs()[0].result().unwrap().exit_code, 1);
    assert_eq!(group.jobs()[1].result().unwrap().exit_code, 0);
    assert!(read_log(&run_dir(&group), 2, "next").contains("still-ran"));
}

#[tokio::test]
async fn summary_is_written_and_printed() {
    init_tracing();
    let out = tempfile::tempdir().unwrap();

    let mut group = JobGroupBuilder::new("report")
        .with_job(JobBuilder::new("ok", &["true"]).after_nothing())
        .with_job(JobBuilder::new("bad", &["false"]).after_nothing())
        .build(out.path());

    with_timeout(30, group.run()).await.unwrap();

    let text = fs::read_to_string(run_dir(&group).join(SUMMARY_FILE)).unwrap();
    assert_eq!(text, group.format_results());
    assert!(text.starts_with("Summary for Job Group \"report\"\n\n"));
    assert!(text.contains("2 jobs total in "));
    assert!(text.trim_end().ends_with("1 jobs failed"));

    let bad_row = text.lines().find(|l| l.ends_with("  bad")).unwrap();
    assert!(bad_row.starts_with('!'), "{bad_row}");
    let ok_row = text.lines().find(|l| l.ends_with("  ok")).unwrap();
    assert!(ok_row.starts_with("      "), "{ok_row}");
}

#[tokio::test]
async fn a_group_runs_only_once() {
    init_tracing();
    let out = tempfile::tempdir().unwrap();

    let mut group = JobGroupBuilder::new("once")
        .with_job(JobBuilder::new("t", &["true"]))
        .build(out.path());

    with_timeout(30, group.run()).await.unwrap();
    assert!(matches!(group.run().await, Err(HydraError::JobAlreadyRan(_))));
    assert_eq!(entries(out.path()).len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn staged_artifacts_and_wait_notices_are_visible_mid_run() {
    init_tracing();
    let out = tempfile::tempdir().unwrap();

    let mut group = JobGroupBuilder::new("live")
        .with_job(JobBuilder::new("slow", &["sleep", "3"]))
        .with_job(JobBuilder::new("quick", &["sleep", "1"]).after_nothing())
        .with_job(JobBuilder::new("last", &["echo", "done"]).after("slow"))
        .build(out.path());

    let run = tokio::spawn(async move {
        let outcome = group.run().await;
        (group, outcome)
    });

    // `quick` finishing rewrites the live summary while `slow` still runs.
    let mut snapshot = None;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let staged = entries(out.path())
            .into_iter()
            .find(|name| name.ends_with(STAGED_DIR_SUFFIX));
        if let Some(staged) = staged {
            let dir = out.path().join(staged);
            if let Ok(summary) = fs::read_to_string(dir.join(SUMMARY_FILE)) {
                snapshot = Some((entries(out.path()), entries(&dir), summary, dir));
                break;
            }
        }
    }
    let (top, inside, summary, staged_dir) = snapshot.expect("no live summary seen");

    assert_eq!(top.len(), 1, "only the staged run directory may exist: {top:?}");
    assert!(inside.contains(&",1.slow.log".to_string()), "{inside:?}");
    assert!(inside.contains(&"2.quick.log".to_string()), "{inside:?}");
    assert!(inside.contains(&",3.last.log".to_string()), "{inside:?}");
    assert!(!inside.contains(&"1.slow.log".to_string()));

    let row = |name: &str| {
        summary
            .lines()
            .find(|l| l.ends_with(&format!("  {name}")))
            .unwrap_or_else(|| panic!("no row for {name} in:\n{summary}"))
            .to_string()
    };
    assert!(row("slow").contains("running"), "{summary}");
    assert!(row("last").contains("queued"), "{summary}");
    assert!(!summary.contains("jobs total"), "footer only once the run ends");

    let waiting = fs::read_to_string(staged_dir.join(",3.last.log")).unwrap();
    assert!(
        waiting.contains(r#"waiting for ["slow"] (checking every 1 second)"#),
        "{waiting}"
    );

    let (group, outcome) = with_timeout(30, run).await.unwrap();
    assert!(!outcome.unwrap());
    let dir = run_dir(&group);
    assert_all_committed(&dir);
    assert!(read_log(&dir, 3, "last").contains("waiting for [\"slow\"]"));
}

#[tokio::test]
async fn existing_run_directory_stops_the_group_before_any_job() {
    init_tracing();
    let out = tempfile::tempdir().unwrap();
    let marker = out.path().join("ran");

    // Occupy the run directory names for the next few seconds.
    let now = chrono::Local::now();
    for offset in 0..5 {
        let start = now + chrono::TimeDelta::seconds(offset);
        fs::create_dir(out.path().join(run_identifier(&start, "dup"))).unwrap();
    }
    let before = entries(out.path());

    let mut group = JobGroupBuilder::new("dup")
        .with_job(JobBuilder::sh("touch", &format!("touch {}", marker.display())))
        .build(out.path());

    let err = with_timeout(30, group.run()).await.unwrap_err();
    assert!(
        matches!(&err, HydraError::IoError(e) if e.kind() == std::io::ErrorKind::AlreadyExists),
        "{err:?}"
    );
    assert!(!marker.exists(), "job ran despite the collision");
    assert_eq!(entries(out.path()), before, "no staged directory expected");
}
