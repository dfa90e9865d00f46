//! Fan-out of extracted records into individual synthesis jobs.
//!
//! [`dispatch`] walks the records of an [`ExtractionResult`] in source order
//! and, for each locale in the caller's selection order, either skips the
//! pair (blank text), synthesizes it, or reports the capability failure.
//! Jobs are produced lazily, one `(record, locale)` pair at a time, so
//! memory stays bounded to a single artifact regardless of table size.

use derive_builder::Builder;

use crate::table::ExtractionResult;
use crate::SpeechSynthesizer;

/// Parameters for one dispatch run: the synthesis model and voice shared by
/// every job, plus the locales to produce, in output order.
///
/// `model` and `voice` must be non-empty; the builder rejects blank values.
/// Selected locales that never appear in the table header simply produce no
/// jobs, which lets callers offer a fixed locale catalog without inspecting
/// each table first.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct SynthesisRequest {
    /// Synthesis model identifier, e.g. `"tts-1"`.
    pub model: String,
    /// Voice identifier, e.g. `"alloy"`.
    pub voice: String,
    /// Locale codes to synthesize, in the order audio should be produced.
    #[builder(default = "crate::SUPPORTED_LOCALES.iter().map(|l| l.to_string()).collect()")]
    pub locales: Vec<String>,
}

impl SynthesisRequestBuilder {
    fn validate(&self) -> Result<(), String> {
        match (&self.model, &self.voice) {
            (Some(model), _) if model.trim().is_empty() => {
                Err("synthesis model must not be empty".to_string())
            }
            (_, Some(voice)) if voice.trim().is_empty() => {
                Err("synthesis voice must not be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Audio produced for one `(source file, locale, key)` triple.
///
/// Artifacts are transient: the batch driver hands each one to the archive
/// as soon as it is yielded and never holds more than one in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    pub source_file: String,
    pub locale: String,
    pub key: String,
    pub bytes: Vec<u8>,
}

/// Outcome of one synthesis job.
#[derive(Debug)]
pub enum JobOutcome {
    /// The capability produced audio for this pair.
    Produced(AudioArtifact),
    /// The pair had no text; the capability was not called.
    Skipped { locale: String, key: String },
    /// The capability call failed; sibling jobs continue regardless.
    Failed {
        locale: String,
        key: String,
        error: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Lazily dispatch one synthesis job per non-blank `(record, locale)` pair.
///
/// Records are visited in source order and locales in the request's
/// selection order, which keeps archive content deterministic. A failing
/// capability call yields [`JobOutcome::Failed`] and iteration continues;
/// no retry is attempted here — retry policy belongs to the caller.
pub fn dispatch<'a, S: SpeechSynthesizer>(
    synthesizer: &'a mut S,
    source_file: &'a str,
    extraction: &'a ExtractionResult,
    request: &'a SynthesisRequest,
) -> Jobs<'a, S> {
    Jobs {
        synthesizer,
        source_file,
        extraction,
        request,
        record_idx: 0,
        locale_idx: 0,
    }
}

/// Iterator over the job outcomes of one dispatch run. See [`dispatch`].
pub struct Jobs<'a, S> {
    synthesizer: &'a mut S,
    source_file: &'a str,
    extraction: &'a ExtractionResult,
    request: &'a SynthesisRequest,
    record_idx: usize,
    locale_idx: usize,
}

impl<S: SpeechSynthesizer> Iterator for Jobs<'_, S> {
    type Item = JobOutcome;

    fn next(&mut self) -> Option<JobOutcome> {
        loop {
            let record = self.extraction.records.get(self.record_idx)?;

            let Some(locale) = self.request.locales.get(self.locale_idx) else {
                self.record_idx += 1;
                self.locale_idx = 0;
                continue;
            };
            self.locale_idx += 1;

            // A selected locale the header never declared has no text
            // anywhere; it produces no job at all.
            let Some(text) = record.texts.get(locale) else {
                continue;
            };

            if text.trim().is_empty() {
                log::debug!("skipping empty text for locale {locale}, key {}", record.key);
                return Some(JobOutcome::Skipped {
                    locale: locale.clone(),
                    key: record.key.clone(),
                });
            }

            log::debug!("synthesizing locale {locale}, key {}", record.key);
            let outcome = match self
                .synthesizer
                .synthesize(&self.request.model, &self.request.voice, text)
            {
                Ok(bytes) => JobOutcome::Produced(AudioArtifact {
                    source_file: self.source_file.to_string(),
                    locale: locale.clone(),
                    key: record.key.clone(),
                    bytes,
                }),
                Err(error) => {
                    log::warn!(
                        "synthesis failed for locale {locale}, key {}: {error}",
                        record.key
                    );
                    JobOutcome::Failed {
                        locale: locale.clone(),
                        key: record.key.clone(),
                        error,
                    }
                }
            };
            return Some(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{dispatch, JobOutcome, SynthesisRequest, SynthesisRequestBuilder};
    use crate::table::{ExtractionResult, TextRecord};
    use crate::SpeechSynthesizer;

    /// Records every call and fails on texts it was told to reject.
    struct MockSynthesizer {
        calls: Vec<(String, String, String)>,
        fail_texts: Vec<String>,
    }

    impl MockSynthesizer {
        fn new() -> Self {
            Self {
                calls: Vec::new(),
                fail_texts: Vec::new(),
            }
        }

        fn failing_on(text: &str) -> Self {
            Self {
                calls: Vec::new(),
                fail_texts: vec![text.to_string()],
            }
        }
    }

    impl SpeechSynthesizer for MockSynthesizer {
        fn synthesize(
            &mut self,
            model: &str,
            voice: &str,
            text: &str,
        ) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
            self.calls
                .push((model.to_string(), voice.to_string(), text.to_string()));
            if self.fail_texts.iter().any(|t| t == text) {
                return Err("quota exceeded".into());
            }
            Ok(format!("MP3:{text}").into_bytes())
        }
    }

    fn record(key: &str, texts: &[(&str, &str)]) -> TextRecord {
        TextRecord {
            key: key.to_string(),
            texts: texts
                .iter()
                .map(|(l, t)| (l.to_string(), t.to_string()))
                .collect(),
        }
    }

    fn extraction() -> ExtractionResult {
        ExtractionResult {
            locales: vec!["en".to_string(), "de".to_string()],
            records: vec![
                record("greeting", &[("en", "Hello"), ("de", "Hallo")]),
                record("farewell", &[("en", "Goodbye"), ("de", "")]),
            ],
        }
    }

    fn request(locales: &[&str]) -> SynthesisRequest {
        SynthesisRequestBuilder::default()
            .model("tts-1")
            .voice("alloy")
            .locales(locales.iter().map(|l| l.to_string()).collect::<Vec<_>>())
            .build()
            .expect("request should build")
    }

    #[test]
    fn yields_jobs_in_record_then_selection_order() {
        let mut synth = MockSynthesizer::new();
        let extraction = extraction();
        let req = request(&["de", "en"]);

        let outcomes: Vec<_> = dispatch(&mut synth, "file.html", &extraction, &req).collect();
        assert_eq!(outcomes.len(), 4);

        let produced: Vec<_> = outcomes
            .iter()
            .filter_map(|o| match o {
                JobOutcome::Produced(a) => Some((a.locale.as_str(), a.key.as_str())),
                _ => None,
            })
            .collect();
        // Selection order "de" before "en" within each record.
        assert_eq!(
            produced,
            vec![("de", "greeting"), ("en", "greeting"), ("en", "farewell")]
        );
    }

    #[test]
    fn blank_text_is_skipped_without_calling_the_capability() {
        let mut synth = MockSynthesizer::new();
        let extraction = extraction();
        let req = request(&["de"]);

        let outcomes: Vec<_> = dispatch(&mut synth, "file.html", &extraction, &req).collect();
        assert!(matches!(
            outcomes[1],
            JobOutcome::Skipped { ref locale, ref key } if locale == "de" && key == "farewell"
        ));
        // Only the non-blank pair reached the synthesizer.
        assert_eq!(synth.calls.len(), 1);
        assert_eq!(synth.calls[0].2, "Hallo");
    }

    #[test]
    fn unknown_selected_locale_produces_no_jobs() {
        let mut synth = MockSynthesizer::new();
        let extraction = extraction();
        let req = request(&["ru"]);

        let outcomes: Vec<_> = dispatch(&mut synth, "file.html", &extraction, &req).collect();
        assert!(outcomes.is_empty());
        assert!(synth.calls.is_empty());
    }

    #[test]
    fn one_failure_does_not_abort_remaining_jobs() {
        let mut synth = MockSynthesizer::failing_on("Hello");
        let extraction = extraction();
        let req = request(&["en"]);

        let outcomes: Vec<_> = dispatch(&mut synth, "file.html", &extraction, &req).collect();
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0], JobOutcome::Failed { ref key, .. } if key == "greeting"));
        assert!(matches!(
            outcomes[1],
            JobOutcome::Produced(ref a) if a.key == "farewell" && a.bytes == b"MP3:Goodbye"
        ));
    }

    #[test]
    fn artifacts_carry_the_source_file_and_request_parameters() {
        let mut synth = MockSynthesizer::new();
        let extraction = ExtractionResult {
            locales: vec!["en".to_string()],
            records: vec![record("greeting", &[("en", "Hello")])],
        };
        let req = request(&["en"]);

        let outcomes: Vec<_> = dispatch(&mut synth, "strings.html", &extraction, &req).collect();
        match &outcomes[0] {
            JobOutcome::Produced(a) => {
                assert_eq!(a.source_file, "strings.html");
                assert_eq!(a.locale, "en");
            }
            other => panic!("expected produced artifact, got {other:?}"),
        }
        assert_eq!(
            synth.calls,
            vec![(
                "tts-1".to_string(),
                "alloy".to_string(),
                "Hello".to_string()
            )]
        );
    }

    #[test]
    fn builder_defaults_to_the_supported_locale_catalog() {
        let req = SynthesisRequestBuilder::default()
            .model("tts-1")
            .voice("alloy")
            .build()
            .expect("request should build");
        assert_eq!(req.locales, vec!["en", "de", "it", "ru"]);
    }

    #[test]
    fn builder_rejects_blank_model_and_voice() {
        assert!(SynthesisRequestBuilder::default()
            .model("")
            .voice("alloy")
            .build()
            .is_err());
        assert!(SynthesisRequestBuilder::default()
            .model("tts-1")
            .voice("   ")
            .build()
            .is_err());
    }

    #[test]
    fn no_records_means_no_jobs() {
        let mut synth = MockSynthesizer::new();
        let extraction = ExtractionResult {
            locales: vec!["en".to_string()],
            records: Vec::new(),
        };
        let req = request(&["en"]);
        assert_eq!(
            dispatch(&mut synth, "file.html", &extraction, &req).count(),
            0
        );
        assert!(synth.calls.is_empty());
    }
}
