
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::pipeline::{Pipeline, Query, Status};
use crate::{AnswerError, Result};

/// Replacement for separators found inside a field, in order of preference
const SEPARATOR_SUBSTITUTES: [&str; 3] = [" -", " ", ""];

/// Inputs of a batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// File with one query per line
    pub input: PathBuf,
    pub language: String,
    /// Prefixed to every query as `"{expansion} {query}"`
    pub expansion: Option<String>,
}

/// A query that did not produce a clean answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchWarning {
    pub query: String,
    /// Missing when the query failed before its content was classified
    pub status: Option<Status>,
    /// Set when the query failed and no record was written
    pub error: Option<String>,
}

impl fmt::Display for BatchWarning {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.query)?;
        if let Some(status) = self.status {
            write!(f, " - Status: {}", status)?;
        }
        if let Some(error) = &self.error {
            write!(f, " - Failed: {}", error)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub report_path: Option<PathBuf>,
    /// Queries run through the pipeline
    pub processed: usize,
    /// Records written to the report
    pub written: usize,
    pub warnings: Vec<BatchWarning>,
}

impl BatchSummary {
    #[inline]
    pub fn failed(&self) -> usize {
        self.warnings
            .iter()
            .filter(|warning| warning.error.is_some())
            .count()
    }
}

/// Make a field safe for a single `query<sep>answer` line.
///
/// Line breaks become spaces and every separator becomes `" -"`, or the first
/// substitute that does not itself contain the separator.
#[inline]
pub fn sanitize_field(text: &str, separator: &str) -> String {
    let flattened = text.replace("\r\n", " ").replace(['\n', '\r'], " ");
    if separator.is_empty() {
        return flattened;
    }

    let substitute = SEPARATOR_SUBSTITUTES
        .iter()
        .copied()
        .find(|candidate| !candidate.contains(separator))
        .unwrap_or("");

    let mut sanitized = flattened.replace(separator, substitute);
    // Substitutes next to leftover characters can form a new separator
    while sanitized.contains(separator) {
        sanitized = sanitized.replace(separator, "");
    }
    sanitized
}

/// Non-empty, trimmed lines of a query file
#[inline]
pub fn read_queries(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| {
        AnswerError::Validation(format!("Cannot read input file {}: {}", path.display(), e))
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[inline]
pub fn expand_query(line: &str, expansion: Option<&str>) -> String {
    match expansion {
        Some(template) => format!("{} {}", template, line),
        None => line.to_string(),
    }
}

/// `queries.txt` becomes `queries_answers.csv` next to it; other names get
/// `_answers.csv` appended
#[inline]
pub fn report_path(input: &Path) -> PathBuf {
    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let stem = file_name
        .strip_suffix(".txt")
        .unwrap_or(file_name.as_str());
    input.with_file_name(format!("{}_answers.csv", stem))
}

/// Runs the pipeline over a list of queries and streams the report
pub struct BatchRunner<'a> {
    pipeline: &'a Pipeline,
    separator: String,
    show_progress: bool,
}

impl<'a> BatchRunner<'a> {
    #[inline]
    pub fn new(pipeline: &'a Pipeline, separator: &str) -> Self {
        Self {
            pipeline,
            separator: separator.to_string(),
            show_progress: false,
        }
    }

    #[inline]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Read `options.input` and write the report next to it
    #[inline]
    pub async fn run_file(&self, options: &BatchOptions) -> Result<BatchSummary> {
        if !options.input.is_file() {
            return Err(AnswerError::Validation(format!(
                "File not found: {}",
                options.input.display()
            )));
        }

        let queries = read_queries(&options.input)?;
        let path = report_path(&options.input);
        let mut writer = BufWriter::new(File::create(&path)?);

        let mut summary = self
            .run(
                &queries,
                &options.language,
                options.expansion.as_deref(),
                &mut writer,
            )
            .await?;
        summary.report_path = Some(path);
        Ok(summary)
    }

    /// Answer every query in order, writing and flushing one record per
    /// answered query.
    ///
    /// A query that fails in search, harvest, retrieval or the language model
    /// becomes a warning and the batch moves on. Validation and report write
    /// errors stop the run.
    #[inline]
    pub async fn run<W: Write + Send>(
        &self,
        queries: &[String],
        language: &str,
        expansion: Option<&str>,
        writer: &mut W,
    ) -> Result<BatchSummary> {
        let lines: Vec<&str> = queries
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect();

        let bar = if self.show_progress && console::user_attended_stderr() {
            ProgressBar::new(lines.len() as u64).with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Answering {msg}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut summary = BatchSummary::default();

        for line in lines {
            let query = Query::new(&expand_query(line, expansion), language)?;
            info!("Processing: {}", query);
            bar.set_message(query.text().to_string());

            summary.processed += 1;
            let evidence = match self.pipeline.gather(&query).await {
                Ok(evidence) => evidence,
                Err(e @ AnswerError::Validation(_)) => return Err(e),
                Err(e) => {
                    warn!("{} - Failed: {}", query, e);
                    summary.warnings.push(BatchWarning {
                        query: query.text().to_string(),
                        status: None,
                        error: Some(e.to_string()),
                    });
                    bar.inc(1);
                    continue;
                }
            };
            let status = evidence.outcome.status;

            match self.pipeline.answer_evidence(&evidence) {
                Ok(answer) => {
                    let answer_field = sanitize_field(&answer.answer, &self.separator);
                    writeln!(
                        writer,
                        "{}{}{}",
                        sanitize_field(query.text(), &self.separator),
                        self.separator,
                        answer_field
                    )?;
                    writer.flush()?;
                    summary.written += 1;

                    if status.is_ok() {
                        bar.suspend(|| {
                            println!(
                                "{} {} - Answer: {}",
                                console::style("[OK]").green(),
                                query,
                                answer_field
                            );
                        });
                    } else {
                        warn!("{} - Status: {}", query, status);
                        summary.warnings.push(BatchWarning {
                            query: query.text().to_string(),
                            status: Some(status),
                            error: None,
                        });
                    }
                }
                Err(e) => {
                    warn!("{} - Status: {} - Failed: {}", query, status, e);
                    summary.warnings.push(BatchWarning {
                        query: query.text().to_string(),
                        status: Some(status),
                        error: Some(e.to_string()),
                    });
                }
            }

            bar.inc(1);
        }

        bar.finish_and_clear();
        Ok(summary)
    }
}
