//! Assembly of produced audio artifacts into a single ZIP archive.
//!
//! Every artifact lands at a path that is a pure function of its
//! `(source file, locale, key)` triple, so archive content does not depend
//! on write order. Entries are staged in memory and serialized once at
//! [`AudioArchive::finish`]; a storage failure therefore surfaces as a
//! whole-archive error and a partial archive is never handed out. Staging
//! also gives duplicate triples exact last-write-wins semantics, which is
//! what a source table with duplicate keys produces.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::dispatch::AudioArtifact;

/// File name offered when the archive is served as a download.
pub const ARCHIVE_DOWNLOAD_NAME: &str = "processed_audio_files.zip";

/// Failure while serializing the archive.
#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    #[error("failed to write archive entry {path}: {source}")]
    Entry {
        path: String,
        source: zip::result::ZipError,
    },
    #[error("failed to finalize archive: {0}")]
    Finalize(#[from] zip::result::ZipError),
    #[error("I/O error while assembling archive: {0}")]
    Io(#[from] std::io::Error),
}

/// Archive entry path for one artifact triple.
///
/// `source_file` contributes only its file stem, so `"strings.html"` and
/// `"strings.txt"` map to the same directory.
pub fn artifact_path(source_file: &str, locale: &str, key: &str) -> String {
    let stem = Path::new(source_file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_file.to_string());
    format!("Audio/{stem}/{locale}/{locale}-{key}.mp3")
}

/// Accumulates audio artifacts and serializes them into one ZIP archive.
///
/// The archive is exclusively owned by the batch that created it; all
/// source files of a batch write into the same instance, distinguished by
/// their path prefix.
#[derive(Default)]
pub struct AudioArchive {
    entries: Vec<(String, Vec<u8>)>,
    index: HashMap<String, usize>,
}

impl AudioArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage one artifact at its deterministic path.
    ///
    /// The artifact is consumed here; a later artifact with the same triple
    /// replaces the staged bytes (last write wins) while keeping the entry's
    /// original position.
    pub fn add_artifact(&mut self, artifact: AudioArtifact) {
        let path = artifact_path(&artifact.source_file, &artifact.locale, &artifact.key);
        match self.index.get(&path) {
            Some(&i) => {
                log::warn!("duplicate artifact path {path}, keeping the later audio");
                self.entries[i].1 = artifact.bytes;
            }
            None => {
                self.index.insert(path.clone(), self.entries.len());
                self.entries.push((path, artifact.bytes));
            }
        }
    }

    /// Number of staged entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize all staged entries and return the complete archive bytes.
    ///
    /// An empty archive (zero entries) is valid and yields a well-formed
    /// empty ZIP file.
    pub fn finish(self) -> Result<Vec<u8>, ArchiveError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (path, bytes) in &self.entries {
            writer
                .start_file(path.as_str(), options)
                .map_err(|source| ArchiveError::Entry {
                    path: path.clone(),
                    source,
                })?;
            writer.write_all(bytes)?;
        }

        log::info!("finalized archive with {} entries", self.entries.len());
        Ok(writer.finish()?.into_inner())
    }
}
