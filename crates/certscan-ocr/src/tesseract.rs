//! Local OCR through the Tesseract CLI.
//!
//! Runs `tesseract <image> stdout -l <lang> tsv` and rebuilds the text line by
//! line from the word rows, averaging the per-word confidences. Inline bytes
//! are staged in a temporary file first.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::backend::{LocalInput, LocalOcr, OcrText};
use crate::error::OcrError;

/// TSV row level for individual words.
const WORD_LEVEL: &str = "5";

#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: PathBuf,
    language: String,
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract", "eng")
    }
}

impl TesseractEngine {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }

    async fn run(&self, image: &Path) -> Result<OcrText, OcrError> {
        let output = Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("tsv")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                OcrError::Unavailable(format!(
                    "failed to run {} (is it installed?): {e}",
                    self.binary.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!(
                "exit code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let text = parse_tsv(&tsv);
        debug!(
            image = %image.display(),
            chars = text.text.len(),
            "tesseract finished"
        );
        Ok(text)
    }
}

#[async_trait]
impl LocalOcr for TesseractEngine {
    async fn recognize(&self, input: LocalInput<'_>) -> Result<OcrText, OcrError> {
        match input {
            LocalInput::Path(path) => self.run(path).await,
            LocalInput::Bytes { data, extension } => {
                let staged = tempfile::Builder::new()
                    .prefix("certscan-")
                    .suffix(&format!(".{extension}"))
                    .tempfile()
                    .map_err(|e| OcrError::Engine(format!("failed to create temp file: {e}")))?;
                tokio::fs::write(staged.path(), data)
                    .await
                    .map_err(|source| OcrError::Io {
                        path: staged.path().to_path_buf(),
                        source,
                    })?;
                // `staged` lives until the process has exited.
                self.run(staged.path()).await
            }
        }
    }
}

/// Rebuild text and mean confidence from Tesseract TSV output.
///
/// Columns: level, page_num, block_num, par_num, line_num, word_num,
/// left, top, width, height, conf, text.
fn parse_tsv(tsv: &str) -> OcrText {
    let mut lines: Vec<String> = Vec::new();
    let mut current_line: Option<(&str, &str, &str, &str)> = None;
    let mut conf_sum = 0.0f32;
    let mut conf_count = 0usize;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != WORD_LEVEL {
            continue;
        }
        let word = cols[11].trim();
        let conf: f32 = match cols[10].trim().parse() {
            Ok(c) if c >= 0.0 => c,
            _ => continue,
        };
        if word.is_empty() {
            continue;
        }

        conf_sum += conf;
        conf_count += 1;

        let key = (cols[1], cols[2], cols[3], cols[4]);
        match lines.last_mut() {
            Some(line) if current_line == Some(key) => {
                line.push(' ');
                line.push_str(word);
            }
            _ => {
                lines.push(word.to_string());
                current_line = Some(key);
            }
        }
    }

    let confidence = if conf_count == 0 {
        None
    } else {
        Some(conf_sum / conf_count as f32 / 100.0)
    };

    OcrText {
        text: lines.join("\n"),
        confidence,
    }
}
