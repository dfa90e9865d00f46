use std::time::Instant;

use voicepack_rs::batch::{run_batch, SourceFile};
use voicepack_rs::{SpeechSynthesizer, ARCHIVE_DOWNLOAD_NAME, SUPPORTED_LOCALES};

/// Stand-in capability that emits the text itself as fake audio bytes.
/// Swap in a real engine or API client to produce actual speech.
struct EchoSynthesizer;

impl SpeechSynthesizer for EchoSynthesizer {
    fn synthesize(
        &mut self,
        _model: &str,
        _voice: &str,
        text: &str,
    ) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(text.as_bytes().to_vec())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let markup = r#"
        <table>
            <tr><td>Resource</td><td>Notes</td><td>Col A</td><td>Col B</td></tr>
            <tr><td></td><td></td><td>English (en)</td><td>German (de)</td></tr>
            <tr><td>greeting</td><td></td><td>Hello there!</td><td>Hallo!</td></tr>
            <tr><td>farewell</td><td></td><td>See you soon.</td><td></td></tr>
        </table>
    "#;

    let files = vec![SourceFile {
        name: "strings.html".to_string(),
        markup: markup.as_bytes().to_vec(),
        locales: SUPPORTED_LOCALES.iter().map(|l| l.to_string()).collect(),
    }];

    let start = Instant::now();
    let output = run_batch(&mut EchoSynthesizer, &files, "tts-1", "alloy")?;
    println!("Batch processed in {:.2?}", start.elapsed());

    println!("{}", serde_json::to_string_pretty(&output.report)?);

    std::fs::write(ARCHIVE_DOWNLOAD_NAME, &output.archive)?;
    println!(
        "Saved {} ({} bytes)",
        ARCHIVE_DOWNLOAD_NAME,
        output.archive.len()
    );

    Ok(())
}
