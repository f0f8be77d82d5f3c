//! File and dependency extraction from raw generator output.
//!
//! The generator wraps each file in a block:
//!
//! ```text
//! <artifact filename="app/page.tsx">
//! export default function Page() { ... }
//! </artifact>
//! ```
//!
//! and each dependency descriptor in `<dependency>name@version</dependency>`.
//! Generators misspell the closing tag often enough that `</artefact>`,
//! `</artifcat>` and `</artifacts>` are accepted as well.
//!
//! Extraction is total: any input yields a (possibly empty) result. Blocks
//! with an empty path or empty content, and blocks that are never closed,
//! are dropped with a warning.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{GeneratedFile, normalize_path};

/// Closing tags recognized for file blocks.
pub const CLOSING_TAG_VARIANTS: [&str; 4] = ["artifact", "artefact", "artifcat", "artifacts"];

/// `filename` may sit among other attributes. Its value is a quoted string
/// (a doubled quote pair is kept for path normalisation) or a bare token.
static OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<artifact\b[^>]*?\bfilename\s*=\s*(""[^"]*""|"[^"]*"|'[^']*'|[^\s>]+)[^>]*>"#)
        .expect("valid open-tag regex")
});

static CLOSE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)</\s*(?:{})\s*>", CLOSING_TAG_VARIANTS.join("|"))).expect("valid close-tag regex")
});

static DEPENDENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<dependency\b[^>]*>(.*?)</dependency\s*>").expect("valid dependency regex"));

/// Everything recovered from one generator response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Files in order of appearance
    pub files: Vec<GeneratedFile>,
    /// Dependency descriptors in order of appearance, duplicates kept
    pub dependencies: Vec<String>,
    /// Number of blocks dropped as malformed
    pub skipped: usize,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Extract files and dependencies from raw generator text.
pub fn extract_artifacts(raw: &str) -> Extraction {
    let (files, skipped) = scan_file_blocks(raw);
    Extraction {
        files,
        dependencies: extract_dependencies(raw),
        skipped,
    }
}

/// Extract only the file blocks.
pub fn extract_files(raw: &str) -> Vec<GeneratedFile> {
    scan_file_blocks(raw).0
}

/// Extract dependency descriptors, in order, duplicates preserved.
pub fn extract_dependencies(raw: &str) -> Vec<String> {
    DEPENDENCY
        .captures_iter(raw)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().trim())
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

/// Walk opening tags left to right. Each block ends at the first closing tag
/// after it; if another opening tag comes first, the block is unterminated.
fn scan_file_blocks(raw: &str) -> (Vec<GeneratedFile>, usize) {
    let mut files = Vec::new();
    let mut skipped = 0;
    let mut pos = 0;

    while let Some(open) = OPEN_TAG.captures_at(raw, pos) {
        let (Some(whole), Some(attr)) = (open.get(0), open.get(1)) else {
            break;
        };
        let body_start = whole.end();
        let close = CLOSE_TAG.find_at(raw, body_start);
        let next_open = OPEN_TAG.find_at(raw, body_start);

        let close = match (close, next_open) {
            (None, _) => {
                log::warn!("Dropping unterminated file block at offset {}", whole.start());
                skipped += 1;
                break;
            }
            (Some(close), Some(next)) if next.start() < close.start() => {
                log::warn!("Dropping unterminated file block at offset {}", whole.start());
                skipped += 1;
                pos = next.start();
                continue;
            }
            (Some(close), _) => close,
        };

        let path = normalize_path(attr.as_str());
        let content = raw[body_start..close.start()].trim();
        pos = close.end();

        if path.is_empty() || content.is_empty() {
            log::warn!(
                "Skipping file block with empty {} (path: {:?})",
                if path.is_empty() { "path" } else { "content" },
                path
            );
            skipped += 1;
            continue;
        }

        files.push(GeneratedFile::new(path, content));
    }

    (files, skipped)
}
