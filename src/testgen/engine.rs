//! Companion test generation for UI components.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::artifact::extract_artifacts;
use crate::collab::Generator;
use crate::domain::{GeneratedFile, normalize_path};
use crate::metrics::PipelineMetrics;

const COMPONENT_DIR: &str = "components";
const COMPONENT_EXTENSIONS: [&str; 2] = ["tsx", "jsx"];
const TEST_MARKERS: [&str; 2] = [".test", ".spec"];

const TESTGEN_SYSTEM: &str = "You write focused unit tests for React components using Jest and \
React Testing Library. Return the test file in one <artifact filename=\"PATH\">...</artifact> block.";

/// Whether `path` is a component source file that should get a test.
pub fn is_test_eligible(path: &str) -> bool {
    let key = normalize_path(path);
    let path = Path::new(&key);

    let in_components = path
        .parent()
        .is_some_and(|dir| dir.components().any(|c| c.as_os_str() == COMPONENT_DIR));
    let has_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| COMPONENT_EXTENSIONS.contains(&e));
    let is_test = path
        .file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| TEST_MARKERS.iter().any(|m| stem.ends_with(m)));

    in_components && has_extension && !is_test
}

/// `components/Nav.tsx` -> `components/Nav.test.tsx`.
pub fn companion_path(path: &str) -> String {
    let key = normalize_path(path);
    match key.rfind('.') {
        Some(dot) if !key[dot..].contains('/') => format!("{}.test{}", &key[..dot], &key[dot..]),
        _ => format!("{}.test", key),
    }
}

pub struct TestGenerationEngine {
    generator: Arc<dyn Generator>,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl TestGenerationEngine {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Generate one companion per eligible file. A failed companion is
    /// logged and skipped; a component whose companion is already in
    /// `files` is left alone.
    pub async fn generate_tests(&self, files: &[GeneratedFile], brief: &str) -> Vec<GeneratedFile> {
        let existing: HashSet<String> = files.iter().map(GeneratedFile::key).collect();
        let mut companions = Vec::new();
        for file in files.iter().filter(|f| is_test_eligible(&f.path)) {
            if existing.contains(&companion_path(&file.path)) {
                log::debug!("{} already has a test companion", file.path);
                continue;
            }
            match self.generate_companion(file, brief).await {
                Some(companion) => companions.push(companion),
                None => log::warn!("Skipping test companion for {}", file.path),
            }
        }
        log::info!("Generated {} test companions", companions.len());
        companions
    }

    async fn generate_companion(&self, file: &GeneratedFile, brief: &str) -> Option<GeneratedFile> {
        let target = companion_path(&file.path);
        let prompt = format!(
            "## Application brief\n\n{}\n\n## Component `{}`\n\n```tsx\n{}\n```\n\n\
             Write `{}` covering rendering and the main interactions.\n",
            brief.trim(),
            file.key(),
            file.content,
            target
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_generation_call();
        }
        let raw = match self.generator.generate(&prompt, Some(TESTGEN_SYSTEM)).await {
            Ok(output) => output.into_text(),
            Err(e) => {
                log::warn!("Test generation for {} failed: {}", file.path, e);
                return None;
            }
        };

        let mut extracted = extract_artifacts(&raw).files;
        if extracted.is_empty() {
            log::warn!("Test generation for {} produced no file", file.path);
            return None;
        }
        let index = extracted.iter().position(|f| f.key() == target).unwrap_or(0);
        let mut companion = extracted.swap_remove(index);
        if companion.key() != target {
            log::debug!("Renaming companion {} to {}", companion.path, target);
            companion.path = target;
        }
        Some(companion)
    }
}
