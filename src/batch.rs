//! Batch processing of source files into one downloadable archive.
//!
//! [`run_batch`] extracts each file, dispatches its synthesis jobs, and
//! writes every produced artifact into a single shared archive. Per-file and
//! per-job failures are isolated: a malformed table fails only that file and
//! a failed synthesis call fails only that job, both recorded in the
//! [`BatchReport`]. Only request validation and archive serialization abort
//! the whole batch.

use serde::Serialize;

use crate::archive::{ArchiveError, AudioArchive};
use crate::dispatch::{
    dispatch, JobOutcome, SynthesisRequest, SynthesisRequestBuilder, SynthesisRequestBuilderError,
};
use crate::table;
use crate::SpeechSynthesizer;

/// One uploaded document together with the locales chosen for it.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Original file name; its stem becomes the archive directory.
    pub name: String,
    /// Raw HTML markup.
    pub markup: Vec<u8>,
    /// Locale codes to synthesize for this file, in output order.
    pub locales: Vec<String>,
}

/// A batch-level failure. Per-file and per-job problems never end up here;
/// they are reported through [`BatchReport`] instead.
#[derive(thiserror::Error, Debug)]
pub enum BatchError {
    #[error("invalid synthesis request: {0}")]
    Request(#[from] SynthesisRequestBuilderError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// A source file whose table could not be extracted.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MalformedFile {
    pub file: String,
    pub error: String,
}

/// A single synthesis job whose capability call failed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailedJob {
    pub file: String,
    pub locale: String,
    pub key: String,
    pub error: String,
}

/// Aggregated outcome of one batch run.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct BatchReport {
    /// Artifacts written into the archive.
    pub produced: usize,
    /// Jobs skipped because the pair had no text.
    pub skipped: usize,
    /// Jobs whose capability call failed.
    pub failed: usize,
    /// Files whose table structure could not be parsed.
    pub malformed_files: Vec<MalformedFile>,
    /// Details of every failed job.
    pub failed_jobs: Vec<FailedJob>,
}

/// The archive bytes and report produced by [`run_batch`].
#[derive(Debug)]
pub struct BatchOutput {
    /// Complete ZIP archive content.
    pub archive: Vec<u8>,
    pub report: BatchReport,
}

/// Process every source file and assemble the artifacts into one archive.
///
/// `model` and `voice` are shared by the whole batch; each file carries its
/// own locale selection. Files are processed in order, jobs within a file in
/// record-then-selection order, so archive content is deterministic. A batch
/// with per-job failures still yields an archive containing the artifacts
/// that succeeded.
pub fn run_batch<S: SpeechSynthesizer>(
    synthesizer: &mut S,
    files: &[SourceFile],
    model: &str,
    voice: &str,
) -> Result<BatchOutput, BatchError> {
    // Validate model and voice once, before any synthesis cost is incurred.
    let base = SynthesisRequestBuilder::default()
        .model(model)
        .voice(voice)
        .build()?;

    let mut archive = AudioArchive::new();
    let mut report = BatchReport::default();

    for file in files {
        let extraction = match table::extract(&file.markup) {
            Ok(extraction) => extraction,
            Err(error) => {
                log::warn!("failed to extract table from {}: {error}", file.name);
                report.malformed_files.push(MalformedFile {
                    file: file.name.clone(),
                    error: error.to_string(),
                });
                continue;
            }
        };

        let request = SynthesisRequest {
            locales: file.locales.clone(),
            ..base.clone()
        };

        for outcome in dispatch(synthesizer, &file.name, &extraction, &request) {
            match outcome {
                JobOutcome::Produced(artifact) => {
                    report.produced += 1;
                    archive.add_artifact(artifact);
                }
                JobOutcome::Skipped { .. } => report.skipped += 1,
                JobOutcome::Failed { locale, key, error } => {
                    report.failed += 1;
                    report.failed_jobs.push(FailedJob {
                        file: file.name.clone(),
                        locale,
                        key,
                        error: error.to_string(),
                    });
                }
            }
        }
    }

    log::info!(
        "batch finished: {} produced, {} skipped, {} failed",
        report.produced,
        report.skipped,
        report.failed
    );

    Ok(BatchOutput {
        archive: archive.finish()?,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::{run_batch, SourceFile};
    use crate::SpeechSynthesizer;

    struct StubSynthesizer;

    impl SpeechSynthesizer for StubSynthesizer {
        fn synthesize(
            &mut self,
            _model: &str,
            _voice: &str,
            text: &str,
        ) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
            Ok(text.as_bytes().to_vec())
        }
    }

    fn source(name: &str, markup: &str, locales: &[&str]) -> SourceFile {
        SourceFile {
            name: name.to_string(),
            markup: markup.as_bytes().to_vec(),
            locales: locales.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[test]
    fn blank_model_fails_before_any_work() {
        let files = [source("a.html", "<table></table>", &["en"])];
        assert!(run_batch(&mut StubSynthesizer, &files, "", "alloy").is_err());
    }

    #[test]
    fn malformed_file_is_reported_and_siblings_continue() {
        let good = r#"
            <table>
                <tr><td></td><td></td><td></td></tr>
                <tr><td></td><td></td><td>English (en)</td></tr>
                <tr><td>greeting</td><td></td><td>Hello</td></tr>
            </table>
        "#;
        let files = [
            source("broken.html", "<p>no rows here</p>", &["en"]),
            source("good.html", good, &["en"]),
        ];

        let output = run_batch(&mut StubSynthesizer, &files, "tts-1", "alloy")
            .expect("batch should succeed");
        assert_eq!(output.report.produced, 1);
        assert_eq!(output.report.malformed_files.len(), 1);
        assert_eq!(output.report.malformed_files[0].file, "broken.html");
    }

    #[test]
    fn report_serializes_to_json() {
        let output = run_batch(&mut StubSynthesizer, &[], "tts-1", "alloy")
            .expect("batch should succeed");
        let json = serde_json::to_value(&output.report).expect("report should serialize");
        assert_eq!(json["produced"], 0);
        assert_eq!(json["skipped"], 0);
        assert_eq!(json["failed"], 0);
    }
}
