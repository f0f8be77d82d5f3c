//! Generated files and their review verdicts.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::plan::normalize_path;

/// A generated file: path plus textual content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Normalized path used to match plan steps and replacements.
    pub fn key(&self) -> String {
        normalize_path(&self.path)
    }

    /// Hex SHA-256 of the content.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.content.as_bytes()))
    }
}

/// Replace the file with the same normalized path, or append it.
///
/// Returns true when an existing entry was replaced.
pub fn splice_file(files: &mut Vec<GeneratedFile>, file: GeneratedFile) -> bool {
    let key = file.key();
    match files.iter_mut().find(|f| f.key() == key) {
        Some(existing) => {
            *existing = file;
            true
        }
        None => {
            log::warn!("Corrected file {} has no prior version; appending", file.path);
            files.push(file);
            false
        }
    }
}

/// Verdict for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewResult {
    pub file_path: String,
    pub passed: bool,
    pub feedback: String,
}

impl ReviewResult {
    /// Create a passing result.
    pub fn pass(file_path: impl Into<String>, feedback: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            passed: true,
            feedback: feedback.into(),
        }
    }

    /// Create a failing result.
    pub fn fail(file_path: impl Into<String>, feedback: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            passed: false,
            feedback: feedback.into(),
        }
    }

    pub fn key(&self) -> String {
        normalize_path(&self.file_path)
    }
}

/// Merge new verdicts into `results`, replacing by normalized path.
pub fn merge_results(results: &mut Vec<ReviewResult>, fresh: Vec<ReviewResult>) {
    for result in fresh {
        let key = result.key();
        match results.iter_mut().find(|r| r.key() == key) {
            Some(existing) => *existing = result,
            None => results.push(result),
        }
    }
}
