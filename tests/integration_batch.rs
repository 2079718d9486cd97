#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Batch runs over in-memory collaborators

mod common;

use std::fs;
use tempfile::TempDir;

use common::{FRUIT_HTML, KeywordEmbedder, ROME_HTML, RecordingModel, World, settings};
use web_answer::AnswerError;
use web_answer::batch::{BatchOptions, BatchRunner, BatchWarning};
use web_answer::pipeline::Status;
use web_answer::search::SearchEngine;

const VOCABULARY: [&str; 3] = ["rome", "italy", "banana"];
const ROME_URL: &str = "https://travel.example/rome";

fn queries(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| (*l).to_string()).collect()
}

#[tokio::test]
async fn one_record_per_non_empty_line() {
    let dir = TempDir::new().expect("temp dir");
    let world = World::new(&[ROME_URL], &[(ROME_URL, ROME_HTML)], &VOCABULARY);
    let pipeline = world.pipeline(settings(SearchEngine::Ddg, dir.path().to_path_buf()));

    let mut report = Vec::new();
    let summary = BatchRunner::new(&pipeline, ";")
        .run(
            &queries(&["Rome Italy", "", "   ", "  Rome  "]),
            "english",
            None,
            &mut report,
        )
        .await
        .expect("batch should succeed");

    assert_eq!(
        String::from_utf8(report).expect("utf8"),
        "Rome Italy;The answer.\nRome;The answer.\n"
    );
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.written, 2);
    assert!(summary.warnings.is_empty());
    assert!(summary.report_path.is_none());
}

#[tokio::test]
async fn answers_are_sanitized() {
    let dir = TempDir::new().expect("temp dir");
    let world = World {
        model: RecordingModel::new("Rome; the eternal city.\nFounded in 753 BC."),
        ..World::new(&[ROME_URL], &[(ROME_URL, ROME_HTML)], &VOCABULARY)
    };
    let pipeline = world.pipeline(settings(SearchEngine::Ddg, dir.path().to_path_buf()));

    let mut report = Vec::new();
    BatchRunner::new(&pipeline, ";")
        .run(&queries(&["Rome"]), "global", None, &mut report)
        .await
        .expect("batch should succeed");

    let report = String::from_utf8(report).expect("utf8");
    assert_eq!(
        report,
        "Rome;Rome - the eternal city. Founded in 753 BC.\n"
    );
    for line in report.lines() {
        assert_eq!(line.matches(';').count(), 1);
    }
}

#[tokio::test]
async fn degraded_statuses_are_collected() {
    let dir = TempDir::new().expect("temp dir");
    let url = "https://fruit.example/";
    let world = World::new(&[url], &[(url, FRUIT_HTML)], &VOCABULARY);
    let pipeline = world.pipeline(settings(SearchEngine::Ddg, dir.path().to_path_buf()));

    let mut report = Vec::new();
    let summary = BatchRunner::new(&pipeline, ";")
        .run(&queries(&["Rome", "Banana"]), "global", None, &mut report)
        .await
        .expect("batch should succeed");

    assert_eq!(summary.written, 2);
    assert_eq!(
        summary.warnings,
        vec![BatchWarning {
            query: "Rome".to_string(),
            status: Some(Status::NoRelevantChunks),
            error: None,
        }]
    );
    assert_eq!(summary.failed(), 0);
}

#[tokio::test]
async fn model_failure_skips_the_record_and_continues() {
    let dir = TempDir::new().expect("temp dir");
    let world = World {
        model: RecordingModel::failing_on("The answer.", "Question: Italy"),
        ..World::new(&[ROME_URL], &[(ROME_URL, ROME_HTML)], &VOCABULARY)
    };
    let pipeline = world.pipeline(settings(SearchEngine::Ddg, dir.path().to_path_buf()));

    let mut report = Vec::new();
    let summary = BatchRunner::new(&pipeline, ";")
        .run(
            &queries(&["Rome", "Italy", "Rome Italy"]),
            "global",
            None,
            &mut report,
        )
        .await
        .expect("batch should succeed");

    assert_eq!(
        String::from_utf8(report).expect("utf8"),
        "Rome;The answer.\nRome Italy;The answer.\n"
    );
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.written, 2);
    assert_eq!(summary.failed(), 1);

    let warning = &summary.warnings[0];
    assert_eq!(warning.query, "Italy");
    assert_eq!(warning.status, Some(Status::Ok));
    assert!(
        warning
            .error
            .as_deref()
            .is_some_and(|e| e.contains("connection refused"))
    );
}

#[tokio::test]
async fn retrieval_failure_is_a_warning_and_later_queries_still_run() {
    let dir = TempDir::new().expect("temp dir");
    let url = "https://fruit.example/";
    let world = World {
        embedder: KeywordEmbedder::failing_on(&VOCABULARY, "boom"),
        ..World::new(&[url], &[(url, FRUIT_HTML)], &VOCABULARY)
    };
    let pipeline = world.pipeline(settings(SearchEngine::Ddg, dir.path().to_path_buf()));

    let mut report = Vec::new();
    let summary = BatchRunner::new(&pipeline, ";")
        .run(
            &queries(&["Rome", "boom", "Banana"]),
            "global",
            None,
            &mut report,
        )
        .await
        .expect("batch should keep going");

    assert_eq!(
        String::from_utf8(report).expect("utf8"),
        "Rome;The answer.\nBanana;The answer.\n"
    );
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.written, 2);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.warnings.len(), 2);

    assert_eq!(summary.warnings[0].query, "Rome");
    assert_eq!(summary.warnings[0].status, Some(Status::NoRelevantChunks));

    let failed = &summary.warnings[1];
    assert_eq!(failed.query, "boom");
    assert_eq!(failed.status, None);
    assert!(
        failed
            .error
            .as_deref()
            .is_some_and(|e| e.contains("ollama down"))
    );
    assert_eq!(world.model.prompts().len(), 2);
}

#[tokio::test]
async fn invalid_settings_stop_the_batch() {
    let dir = TempDir::new().expect("temp dir");
    let world = World::new(&[ROME_URL], &[(ROME_URL, ROME_HTML)], &VOCABULARY);
    let mut settings = settings(SearchEngine::DdgCustom, dir.path().to_path_buf());
    settings.max_pages = 11;
    let pipeline = world.pipeline(settings);

    let mut report = Vec::new();
    let result = BatchRunner::new(&pipeline, ";")
        .run(&queries(&["Rome", "Italy"]), "global", None, &mut report)
        .await;

    assert!(matches!(result, Err(AnswerError::Validation(_))));
    assert!(report.is_empty());
    assert_eq!(world.ddg_custom.calls(), 0);
}

#[tokio::test]
async fn run_file_writes_report_next_to_input() {
    let dir = TempDir::new().expect("temp dir");
    let input = dir.path().join("queries.txt");
    fs::write(&input, "rome\n\nitaly\n").expect("write input");

    let world = World::new(&[ROME_URL], &[(ROME_URL, ROME_HTML)], &VOCABULARY);
    let pipeline = world.pipeline(settings(SearchEngine::Ddg, dir.path().to_path_buf()));

    let options = BatchOptions {
        input: input.clone(),
        language: "italian".to_string(),
        expansion: Some("Definition of".to_string()),
    };
    let summary = BatchRunner::new(&pipeline, "|")
        .run_file(&options)
        .await
        .expect("batch should succeed");

    let report_path = dir.path().join("queries_answers.csv");
    assert_eq!(summary.report_path.as_deref(), Some(report_path.as_path()));
    assert_eq!(
        fs::read_to_string(&report_path).expect("report"),
        "Definition of rome|The answer.\nDefinition of italy|The answer.\n"
    );
    assert!(
        world
            .model
            .prompts()
            .iter()
            .all(|prompt| prompt.starts_with("Language: italian\nQuestion: Definition of "))
    );
}

#[tokio::test]
async fn missing_input_file_is_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let world = World::new(&[], &[], &VOCABULARY);
    let pipeline = world.pipeline(settings(SearchEngine::Ddg, dir.path().to_path_buf()));

    let options = BatchOptions {
        input: dir.path().join("absent.txt"),
        language: "global".to_string(),
        expansion: None,
    };
    let result = BatchRunner::new(&pipeline, ";").run_file(&options).await;

    assert!(matches!(result, Err(AnswerError::Validation(_))));
    assert!(!dir.path().join("absent_answers.csv").exists());
}
