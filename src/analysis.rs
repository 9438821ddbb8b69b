// External analysis bridge.
//
// A transaction batch is round-tripped through an external script via two
// temp files: the request JSON goes in, an index->annotation map comes out.
// The bridge never fails outward: any internal error is logged and the
// caller gets its batch back unannotated.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;

use crate::error::AnalysisError;
use crate::transactions::{TransactionRecord, DEFAULT_CATEGORY};

/// Timestamp format of the request document. Must match what the external
/// script expects; independent of the CSV input formats.
pub const REQUEST_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Port for transaction analysis. The script-backed adapter below is the
/// production implementation; tests and future in-process analyzers plug in
/// here without touching callers.
pub trait AnalysisBridge: Send + Sync {
    /// Annotate a batch. Infallible outward: on any internal failure the
    /// input comes back unchanged, same length and order.
    fn analyze(&self, batch: Vec<TransactionRecord>) -> Vec<TransactionRecord>;
}

/// Request document written to the input temp file.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub user_id: i64,
    pub transactions: Vec<RequestTransaction>,
}

/// One transaction as the external script sees it. Array order = batch order.
#[derive(Debug, Serialize, Deserialize)]
pub struct RequestTransaction {
    pub amount: f64,
    pub category: String,
    pub timestamp: String,
}

/// Per-record annotation read back from the output file. Field names follow
/// the script's PascalCase contract.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisResult {
    #[serde(rename = "Flagged", default)]
    pub flagged: bool,
    #[serde(rename = "Advice", default)]
    pub advice: Option<String>,
    #[serde(rename = "Impact", default)]
    pub impact: Option<String>,
    #[serde(rename = "Tags", default)]
    pub tags: Option<Vec<String>>,
}

/// Build the request document for a batch.
pub fn build_request(user_id: i64, batch: &[TransactionRecord]) -> AnalysisRequest {
    AnalysisRequest {
        user_id,
        transactions: batch
            .iter()
            .map(|tx| RequestTransaction {
                amount: tx.amount,
                // Records are normalized at construction, but guard anyway
                category: if tx.category.trim().is_empty() {
                    DEFAULT_CATEGORY.to_string()
                } else {
                    tx.category.to_lowercase()
                },
                timestamp: tx.timestamp.format(REQUEST_TIMESTAMP_FORMAT).to_string(),
            })
            .collect(),
    }
}

/// Merge annotations into the batch by position. Indices beyond the batch
/// bounds are ignored; untouched positions keep their defaults.
pub fn apply_results(batch: &mut [TransactionRecord], results: HashMap<usize, AnalysisResult>) {
    for (index, result) in results {
        if let Some(tx) = batch.get_mut(index) {
            tx.flagged = result.flagged;
            tx.advice = result.advice;
            tx.impact = result.impact;
            tx.tags = result.tags.unwrap_or_default();
        }
    }
}

/// Script-backed adapter: `<interpreter> <script> <input-file> <output-file>`.
pub struct ScriptBridge {
    interpreter: String,
    script_path: PathBuf,
    user_id: i64,
}

impl ScriptBridge {
    pub fn new<P: Into<PathBuf>>(interpreter: &str, script_path: P, user_id: i64) -> Self {
        Self {
            interpreter: interpreter.to_string(),
            script_path: script_path.into(),
            user_id,
        }
    }

    /// Run the external process once. `Ok(None)` means a clean exit with
    /// nothing to merge (empty or absent output).
    fn run(
        &self,
        batch: &[TransactionRecord],
    ) -> Result<Option<HashMap<usize, AnalysisResult>>, AnalysisError> {
        let request = build_request(self.user_id, batch);
        let json = serde_json::to_string(&request)?;

        // Both files are deleted on drop, on every exit path
        let input = NamedTempFile::new()?;
        let output = NamedTempFile::new()?;
        fs::write(input.path(), &json)?;

        tracing::debug!(
            interpreter = %self.interpreter,
            script = %self.script_path.display(),
            transactions = batch.len(),
            "invoking analysis script"
        );

        let child = Command::new(&self.interpreter)
            .arg(&self.script_path)
            .arg(input.path())
            .arg(output.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(AnalysisError::Launch)?;

        // No timeout: a hung script hangs the request
        let result = child.wait_with_output()?;

        if !result.status.success() {
            return Err(AnalysisError::Exit {
                code: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            });
        }

        let stdout = String::from_utf8_lossy(&result.stdout);
        if !stdout.trim().is_empty() {
            tracing::debug!(output = %stdout.trim(), "analysis script stdout");
        }

        // A clean exit with an empty output file means "no annotations"
        let raw = match fs::read_to_string(output.path()) {
            Ok(text) if !text.trim().is_empty() => text,
            _ => return Ok(None),
        };

        let keyed: HashMap<String, AnalysisResult> = serde_json::from_str(&raw)?;
        let by_index = keyed
            .into_iter()
            .filter_map(|(key, value)| key.parse::<usize>().ok().map(|idx| (idx, value)))
            .collect();

        Ok(Some(by_index))
    }
}

impl AnalysisBridge for ScriptBridge {
    fn analyze(&self, mut batch: Vec<TransactionRecord>) -> Vec<TransactionRecord> {
        if batch.is_empty() {
            return batch;
        }

        match self.run(&batch) {
            Ok(Some(results)) => apply_results(&mut batch, results),
            Ok(None) => {
                tracing::info!("analysis script returned no annotations");
            }
            Err(err) => {
                tracing::error!(error = %err, "transaction analysis failed; returning batch unannotated");
            }
        }

        batch
    }
}
