// src/ninja.rs

//! The Graph Emitter: translate the registered job set into a ninja
//! build file. Scheduling, parallelism and restart are the executor's
//! problem; each build edge's command is a re-invocation of this binary
//! in `exec` mode with the descriptor passed as a file path.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;
use tracing::debug;

use crate::model::{CiStage, JobDescriptor};
use crate::store::{atomic, RunDir};

/// Phony aggregate selecting every job of one pipeline.
pub fn pipeline_target(pipeline: &str) -> String {
    format!("__litani_pipeline_name_{pipeline}")
}

/// Phony aggregate selecting every job of one CI stage.
pub fn stage_target(stage: CiStage) -> String {
    format!("__litani_ci_stage_{stage}")
}

/// Render the complete build file for the given descriptors.
///
/// `exec_program` is the binary the executor re-invokes per job
/// (normally the current executable).
pub fn render(descriptors: &[JobDescriptor], exec_program: &Path) -> String {
    let mut out = String::new();
    let exec_program = quote_sh(&exec_program.display().to_string());

    let mut pipeline_outputs: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut stage_outputs: BTreeMap<CiStage, Vec<String>> = BTreeMap::new();

    for descriptor in descriptors {
        let status_file = descriptor.status_file.display().to_string();
        let job_file = descriptor
            .status_file
            .parent()
            .and_then(Path::parent)
            .map(|run| run.join("jobs").join(format!("{}.json", descriptor.job_id)))
            .unwrap_or_else(|| descriptor.status_file.clone());

        writeln!(out, "rule {}", descriptor.job_id).ok();
        writeln!(
            out,
            "  command = {exec_program} exec --descriptor {}",
            quote_sh(&job_file.display().to_string())
        )
        .ok();
        let description = escape_value(
            descriptor
                .description
                .as_deref()
                .unwrap_or(&descriptor.command),
        );
        writeln!(out, "  description = {description}").ok();
        writeln!(out).ok();

        let mut edge_outputs: Vec<String> =
            descriptor.outputs.iter().map(|o| escape_path(o)).collect();
        edge_outputs.push(escape_path(&status_file));

        let edge_inputs: Vec<String> = descriptor.inputs.iter().map(|i| escape_path(i)).collect();

        writeln!(
            out,
            "build {}: {} {}",
            edge_outputs.join(" "),
            descriptor.job_id,
            edge_inputs.join(" ")
        )
        .ok();
        writeln!(out).ok();

        // Only declared outputs feed the aggregates; a job without them
        // stays reachable through its status-file output.
        pipeline_outputs
            .entry(descriptor.pipeline_name.clone())
            .or_default()
            .extend(descriptor.outputs.iter().map(|o| escape_path(o)));
        stage_outputs
            .entry(descriptor.ci_stage)
            .or_default()
            .extend(descriptor.outputs.iter().map(|o| escape_path(o)));
    }

    for (pipeline, outputs) in &pipeline_outputs {
        write_phony(&mut out, &pipeline_target(pipeline), outputs);
    }
    for (stage, outputs) in &stage_outputs {
        write_phony(&mut out, &stage_target(*stage), outputs);
    }

    out
}

/// Emit `litani.ninja` into the run directory.
pub fn emit(run_dir: &RunDir, descriptors: &[JobDescriptor], exec_program: &Path) -> Result<()> {
    let contents = render(descriptors, exec_program);
    atomic::write_atomic(&run_dir.ninja_file(), contents.as_bytes())?;
    debug!(
        path = ?run_dir.ninja_file(),
        jobs = descriptors.len(),
        "emitted build graph"
    );
    Ok(())
}

fn write_phony(out: &mut String, target: &str, outputs: &[String]) {
    let mut sorted: Vec<&String> = outputs.iter().collect();
    sorted.sort();
    sorted.dedup();
    let inputs = sorted
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    if inputs.is_empty() {
        writeln!(out, "build {target}: phony").ok();
    } else {
        writeln!(out, "build {target}: phony {inputs}").ok();
    }
}

/// Escape free text for a ninja variable binding. Only `$` is
/// significant there (a literal space is fine, unlike in paths);
/// newlines cannot appear in a binding at all.
fn escape_value(text: &str) -> String {
    text.replace('$', "$$").replace('\n', " ")
}

/// Escape a path for use in a ninja build statement (`$`, space and `:`
/// are significant to the ninja lexer).
fn escape_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for ch in path.chars() {
        match ch {
            '$' => escaped.push_str("$$"),
            ' ' => escaped.push_str("$ "),
            ':' => escaped.push_str("$:"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// The one audited shell-quoting helper: single-quote the token,
/// escaping embedded single quotes.
pub fn quote_sh(token: &str) -> String {
    if !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '-' | '_'))
    {
        return token.to_string();
    }
    format!("'{}'", token.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn descriptor(id: &str, pipeline: &str, stage: CiStage) -> JobDescriptor {
        JobDescriptor {
            job_id: id.to_string(),
            command: "echo hi".into(),
            pipeline_name: pipeline.to_string(),
            ci_stage: stage,
            cwd: None,
            inputs: vec![],
            outputs: vec![],
            timeout: None,
            timeout_ok: false,
            timeout_ignore: false,
            interleave_stdout_stderr: false,
            ignore_returns: vec![],
            ok_returns: vec![],
            description: None,
            tags: vec![],
            stdout_file: None,
            stderr_file: None,
            status_file: PathBuf::from(format!("/runs/r1/status/{id}.json")),
        }
    }

    #[test]
    fn escapes_ninja_significant_characters() {
        assert_eq!(escape_path("a b"), "a$ b");
        assert_eq!(escape_path("c:d"), "c$:d");
        assert_eq!(escape_path("$x"), "$$x");
        assert_eq!(escape_path("plain/path.txt"), "plain/path.txt");
    }

    #[test]
    fn description_bindings_escape_dollar_signs() {
        let mut d = descriptor("job-1", "p", CiStage::Build);
        d.command = "echo $HOME".into();

        let text = render(&[d.clone()], Path::new("litani"));
        assert!(text.contains("description = echo $$HOME"));

        d.description = Some("expand $(pwd) first".into());
        let text = render(&[d], Path::new("litani"));
        assert!(text.contains("description = expand $$(pwd) first"));
    }

    #[test]
    fn quotes_shell_tokens_conservatively() {
        assert_eq!(quote_sh("/usr/bin/litani"), "/usr/bin/litani");
        assert_eq!(quote_sh("a b"), "'a b'");
        assert_eq!(quote_sh("it's"), r"'it'\''s'");
    }

    #[test]
    fn build_edge_always_carries_the_status_file() {
        let mut d = descriptor("job-1", "p", CiStage::Build);
        d.inputs = vec!["in.txt".into()];
        d.outputs = vec!["out.txt".into()];

        let text = render(&[d], Path::new("litani"));
        assert!(text.contains("rule job-1"));
        assert!(text.contains("--descriptor /runs/r1/jobs/job-1.json"));
        assert!(text.contains("build out.txt /runs/r1/status/job-1.json: job-1 in.txt"));
    }

    #[test]
    fn phony_inputs_are_sorted_and_exclude_jobs_without_outputs() {
        let mut a = descriptor("job-a", "p", CiStage::Build);
        a.outputs = vec!["z.txt".into(), "a.txt".into()];
        let b = descriptor("job-b", "p", CiStage::Test);

        let text = render(&[a, b], Path::new("litani"));
        assert!(text.contains("build __litani_pipeline_name_p: phony a.txt z.txt"));
        assert!(text.contains("build __litani_ci_stage_build: phony a.txt z.txt"));
        // The no-output test job yields an empty stage aggregate.
        assert!(text.contains("build __litani_ci_stage_test: phony\n"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut a = descriptor("job-a", "p2", CiStage::Build);
        a.outputs = vec!["x".into()];
        let mut b = descriptor("job-b", "p1", CiStage::Report);
        b.outputs = vec!["y".into()];

        let first = render(&[a.clone(), b.clone()], Path::new("litani"));
        let second = render(&[a, b], Path::new("litani"));
        assert_eq!(first, second);
    }
}
