// tests/run_store.rs

mod common;

use std::error::Error;
use std::fs;
use std::sync::Arc;
use std::thread;

use litani::model::{Run, RunStatus};
use litani::registry::{self, NewJob};
use litani::store::{self, atomic};

use crate::common::builders::JobBuilder;
use crate::common::{init_tracing, scratch_store};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn init_creates_layout_and_pointer() -> TestResult {
    init_tracing();
    let (_scratch, root) = scratch_store();

    let run_dir = store::init_run(&root, "demo")?;

    assert!(run_dir.jobs_dir().is_dir());
    assert!(run_dir.status_dir().is_dir());
    assert!(run_dir.artifacts_dir().is_dir());

    let run: Run = serde_json::from_str(&fs::read_to_string(run_dir.cache_file())?)?;
    assert_eq!(run.project, "demo");
    assert_eq!(run.status, RunStatus::InProgress);
    assert!(run.jobs.is_empty());
    assert!(run.end_time.is_none());

    let pointer = fs::read_to_string(root.cache_pointer_path())?;
    assert_eq!(pointer.trim(), run_dir.path().display().to_string());
    assert_eq!(root.current_run_dir()?.path(), run_dir.path());

    Ok(())
}

#[cfg(unix)]
#[test]
fn init_twice_repoints_latest_to_the_new_run() -> TestResult {
    init_tracing();
    let (_scratch, root) = scratch_store();

    let first = store::init_run(&root, "demo")?;
    let second = store::init_run(&root, "demo")?;
    assert_ne!(first.path(), second.path());

    let latest = fs::read_link(root.latest_link_path())?;
    assert_eq!(latest, second.path());
    assert_eq!(root.current_run_dir()?.path(), second.path());

    Ok(())
}

#[test]
fn add_job_persists_a_loadable_descriptor() -> TestResult {
    init_tracing();
    let (_scratch, root) = scratch_store();
    let run_dir = store::init_run(&root, "demo")?;

    let descriptor = registry::add_job(
        &root,
        JobBuilder::new("echo hi")
            .pipeline("p1")
            .output("a.txt")
            .description("say hi")
            .tag("smoke")
            .build(),
    )?;

    assert!(run_dir.job_file(&descriptor.job_id).is_file());
    assert_eq!(descriptor.status_file, run_dir.status_file(&descriptor.job_id));

    let loaded = run_dir.load_descriptors()?;
    assert_eq!(loaded, vec![descriptor]);

    Ok(())
}

#[test]
fn add_job_without_an_active_run_fails() {
    init_tracing();
    let (_scratch, root) = scratch_store();

    let result = registry::add_job(&root, NewJob::new("true", "p", litani::model::CiStage::Build));
    assert!(result.is_err());
}

#[test]
fn parallel_add_jobs_produce_distinct_descriptor_files() -> TestResult {
    init_tracing();
    let (_scratch, root) = scratch_store();
    let run_dir = store::init_run(&root, "demo")?;
    let root = Arc::new(root);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let root = Arc::clone(&root);
            thread::spawn(move || {
                registry::add_job(
                    &root,
                    JobBuilder::new(&format!("echo {i}")).pipeline("p").build(),
                )
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let descriptor = handle.join().expect("add-job thread panicked")?;
        ids.push(descriptor.job_id);
    }

    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert_eq!(run_dir.load_descriptors()?.len(), 8);

    Ok(())
}

#[test]
fn unreadable_descriptor_is_fatal_and_names_the_path() -> TestResult {
    init_tracing();
    let (_scratch, root) = scratch_store();
    let run_dir = store::init_run(&root, "demo")?;

    let bad = run_dir.jobs_dir().join("broken.json");
    fs::write(&bad, "{ not json")?;

    let err = run_dir.load_descriptors().unwrap_err();
    assert!(format!("{err}").contains("broken.json"));

    Ok(())
}

#[test]
fn concurrent_atomic_writers_never_tear_the_target() -> TestResult {
    init_tracing();
    let scratch = tempfile::tempdir()?;
    let target = Arc::new(scratch.path().join("contended.json"));

    let writers: Vec<_> = (0..4)
        .map(|worker| {
            let target = Arc::clone(&target);
            thread::spawn(move || {
                for round in 0..50 {
                    let value = serde_json::json!({ "worker": worker, "round": round });
                    atomic::write_json_atomic(&target, &value).expect("atomic write failed");
                }
            })
        })
        .collect();

    // Race the readers against the writers: every observed version must
    // parse, whichever writer won the last rename.
    for _ in 0..200 {
        if let Ok(contents) = fs::read_to_string(target.as_ref()) {
            let parsed: serde_json::Value = serde_json::from_str(&contents)?;
            assert!(parsed.get("worker").is_some());
        }
    }

    for writer in writers {
        writer.join().expect("writer thread panicked");
    }

    let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(target.as_ref())?)?;
    assert_eq!(parsed["round"], serde_json::json!(49));

    Ok(())
}
