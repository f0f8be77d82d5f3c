//! Filesystem scaffold writer.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::collab::{PersistReport, Persistence, WrittenFile};
use crate::domain::{DEFAULT_VERSION, GeneratedFile, normalize_path};
use crate::error::{Result, ScaffoldrError};

/// Manifest generated files may not overwrite.
pub const DEFAULT_MANIFEST: &str = "package.json";

/// Writes the accepted artifact set into a target directory.
///
/// The target is cleared, the baseline tree (if any) copied in, then each
/// file written. Dependencies are merged into the manifest's
/// `dependencies` object.
#[derive(Debug, Clone)]
pub struct ScaffoldWriter {
    target: PathBuf,
    baseline: Option<PathBuf>,
    manifest: String,
}

impl ScaffoldWriter {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            baseline: None,
            manifest: DEFAULT_MANIFEST.to_string(),
        }
    }

    pub fn with_baseline(mut self, baseline: impl Into<PathBuf>) -> Self {
        self.baseline = Some(baseline.into());
        self
    }

    pub fn with_manifest(mut self, manifest: impl Into<String>) -> Self {
        self.manifest = manifest.into();
        self
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    fn write_all(&self, files: &[GeneratedFile], dependencies: &[String]) -> Result<PersistReport> {
        if self.target.exists() {
            fs::remove_dir_all(&self.target).map_err(|e| io_error("clear target", &self.target, e))?;
        }
        fs::create_dir_all(&self.target).map_err(|e| io_error("create target", &self.target, e))?;

        if let Some(baseline) = &self.baseline {
            if baseline.is_dir() {
                copy_tree(baseline, &self.target).map_err(|e| io_error("copy baseline", baseline, e))?;
            } else {
                log::warn!("Baseline {} is not a directory; skipping copy", baseline.display());
            }
        }

        let mut report = PersistReport::default();
        for file in files {
            let requested = normalize_path(&file.path);
            let Some(relative) = contained_path(&requested) else {
                log::warn!("Refusing path outside the target: {}", requested);
                report.refused.push(requested);
                continue;
            };
            if contained_path(&self.manifest).as_deref() == Some(relative.as_str()) {
                log::warn!("Refusing to overwrite protected manifest {}", requested);
                report.refused.push(requested);
                continue;
            }

            let full = self.target.join(&relative);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).map_err(|e| io_error("create directory", parent, e))?;
            }
            fs::write(&full, &file.content).map_err(|e| io_error("write", &full, e))?;
            log::debug!("Wrote {}", full.display());
            report.written.push(WrittenFile {
                path: relative,
                sha256: file.digest(),
            });
        }

        if !dependencies.is_empty() {
            report.dependencies_merged = self.merge_dependencies(dependencies)?;
        }

        log::info!(
            "Scaffold written to {}: {} files, {} dependencies, {} refused",
            self.target.display(),
            report.written.len(),
            report.dependencies_merged,
            report.refused.len()
        );
        Ok(report)
    }

    fn merge_dependencies(&self, dependencies: &[String]) -> Result<usize> {
        let path = self.target.join(&self.manifest);
        let mut manifest: Value = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|e| io_error("read manifest", &path, e))?;
            serde_json::from_str(&text)
                .map_err(|e| ScaffoldrError::Persistence(format!("manifest {} is not JSON: {}", path.display(), e)))?
        } else {
            Value::Object(Map::new())
        };

        let Some(root) = manifest.as_object_mut() else {
            return Err(ScaffoldrError::Persistence(format!(
                "manifest {} is not a JSON object",
                path.display()
            )));
        };
        let deps = root
            .entry("dependencies")
            .or_insert_with(|| Value::Object(Map::new()));
        if !deps.is_object() {
            *deps = Value::Object(Map::new());
        }

        let mut merged = BTreeSet::new();
        if let Some(deps) = deps.as_object_mut() {
            for descriptor in dependencies {
                let Some((name, version)) = split_dependency(descriptor) else {
                    log::warn!("Ignoring malformed dependency {:?}", descriptor);
                    continue;
                };
                deps.insert(name.to_string(), Value::String(version.to_string()));
                merged.insert(name.to_string());
            }
        }

        let text = serde_json::to_string_pretty(&manifest)?;
        fs::write(&path, text + "\n").map_err(|e| io_error("write manifest", &path, e))?;
        Ok(merged.len())
    }
}

#[async_trait]
impl Persistence for ScaffoldWriter {
    async fn persist(&self, files: &[GeneratedFile], dependencies: &[String]) -> Result<PersistReport> {
        let writer = self.clone();
        let files = files.to_vec();
        let dependencies = dependencies.to_vec();
        tokio::task::spawn_blocking(move || writer.write_all(&files, &dependencies))
            .await
            .map_err(|e| ScaffoldrError::Persistence(format!("writer task failed: {}", e)))?
    }
}

/// Split `name@version` on the last `@`.
///
/// A leading `@` belongs to a scope, so `@scope/pkg` has no version and
/// maps to `latest`, as does a bare name.
pub fn split_dependency(descriptor: &str) -> Option<(&str, &str)> {
    let descriptor = descriptor.trim();
    let (name, version) = match descriptor.rfind('@') {
        Some(at) if at > 0 => (&descriptor[..at], &descriptor[at + 1..]),
        _ => (descriptor, ""),
    };
    let name = name.trim();
    let version = version.trim();
    if name.is_empty() || name == "@" {
        return None;
    }
    Some((name, if version.is_empty() { DEFAULT_VERSION } else { version }))
}

/// Lexical form of a relative path with `.` segments dropped, or `None`
/// when it is empty, absolute or climbs out with `..`.
fn contained_path(relative: &str) -> Option<String> {
    let mut parts = Vec::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}

fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

fn io_error(operation: &str, path: &Path, err: std::io::Error) -> ScaffoldrError {
    ScaffoldrError::Persistence(format!("{} {}: {}", operation, path.display(), err))
}
