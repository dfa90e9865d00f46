//! # voicepack-rs
//!
//! A Rust library that turns a multi-locale text table embedded in an HTML
//! document into a ZIP archive of per-locale, per-key speech audio files.
//!
//! ## Pipeline
//!
//! - **Extraction** ([`table`]): parse the HTML table into ordered records of
//!   `key -> {locale: text}` plus the ordered list of locale codes found in
//!   the header row.
//! - **Dispatch** ([`dispatch`]): fan the records out into one synthesis call
//!   per non-blank `(key, locale)` pair against a caller-supplied
//!   [`SpeechSynthesizer`]. Blank texts are skipped, and one failed call
//!   never aborts the rest of the batch.
//! - **Assembly** ([`archive`]): place every produced artifact at the
//!   deterministic path `Audio/<source-stem>/<locale>/<locale>-<key>.mp3`
//!   inside a single ZIP archive.
//!
//! The [`batch`] module drives all three stages over a set of source files
//! and aggregates a per-batch report of produced, skipped, and failed jobs.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! voicepack-rs = "0.1"
//! ```
//!
//! ```ignore
//! use voicepack_rs::batch::{run_batch, SourceFile};
//!
//! let files = vec![SourceFile {
//!     name: "strings.html".to_string(),
//!     markup: std::fs::read("strings.html")?,
//!     locales: vec!["en".to_string(), "de".to_string()],
//! }];
//!
//! let output = run_batch(&mut synthesizer, &files, "tts-1", "alloy")?;
//! std::fs::write("processed_audio_files.zip", output.archive)?;
//! println!("{} produced, {} skipped", output.report.produced, output.report.skipped);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod archive;
pub mod batch;
pub mod dispatch;
pub mod table;

pub use archive::{artifact_path, ArchiveError, AudioArchive, ARCHIVE_DOWNLOAD_NAME};
pub use batch::{run_batch, BatchOutput, BatchReport, SourceFile};
pub use dispatch::{
    dispatch, AudioArtifact, JobOutcome, SynthesisRequest, SynthesisRequestBuilder,
};
pub use table::{extract, ExtractionResult, TableError, TextRecord};

/// Locale codes offered for selection by default.
pub const SUPPORTED_LOCALES: [&str; 4] = ["en", "de", "it", "ru"];

/// External text-to-speech capability.
///
/// This is the only boundary at which the library talks to the outside
/// world. Implementations wrap whatever engine or remote API actually
/// produces audio; the library treats every call as independently fallible
/// (quota, invalid voice or model, transient network failure) and never
/// retries internally. Implementations that talk to a network service should
/// enforce their own per-call timeout and report it as an error.
pub trait SpeechSynthesizer {
    /// Synthesize speech audio bytes for `text` using the given model and voice.
    fn synthesize(
        &mut self,
        model: &str,
        voice: &str,
        text: &str,
    ) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>>;
}
