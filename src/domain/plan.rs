//! Action plans: ordered per-file generation directives.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Normalize a file path for equality comparisons.
///
/// Trims whitespace and strips one wrapping pair of straight quotes, so
/// `"app/page.tsx"` and `app/page.tsx` share a key.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2
            && let Some(inner) = trimmed.strip_prefix(quote).and_then(|s| s.strip_suffix(quote))
        {
            return inner.trim().to_string();
        }
    }
    trimmed.to_string()
}

/// Classification of the app being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppType {
    /// Plan enriched from a domain catalogue record
    Domain,
    /// Plan derived from the spec alone
    Custom,
}

/// What kind of file a step produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepCategory {
    Page,
    Component,
    Layout,
    Test,
}

/// One unit of generation work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPlanStep {
    pub file_path: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<StepCategory>,
}

impl ActionPlanStep {
    /// Create a new step without category.
    pub fn new(file_path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            description: description.into(),
            category: None,
        }
    }

    /// Set the category.
    pub fn with_category(mut self, category: StepCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Lookup key for this step.
    pub fn key(&self) -> String {
        normalize_path(&self.file_path)
    }

    /// Copy of this step whose description carries review feedback.
    pub fn with_feedback(&self, feedback: &str) -> Self {
        Self {
            description: format!(
                "{}\n\nA previous version of this file failed review. Address this feedback:\n{}",
                self.description,
                feedback.trim()
            ),
            ..self.clone()
        }
    }
}

/// Ordered steps with an index by normalized path.
#[derive(Debug, Clone, Default)]
pub struct ActionPlan {
    steps: Vec<ActionPlanStep>,
    index: HashMap<String, usize>,
}

impl ActionPlan {
    /// Empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan holding exactly one step.
    pub fn single(step: ActionPlanStep) -> Self {
        let mut plan = Self::new();
        plan.push(step);
        plan
    }

    /// Append a step. A step whose path is already planned is ignored.
    ///
    /// Returns whether the step was added.
    pub fn push(&mut self, step: ActionPlanStep) -> bool {
        let key = step.key();
        if key.is_empty() {
            log::warn!("Dropping plan step with an empty path: {}", step.description);
            return false;
        }
        if self.index.contains_key(&key) {
            log::warn!("Plan already has a step for {}; dropping: {}", key, step.description);
            return false;
        }
        self.index.insert(key, self.steps.len());
        self.steps.push(step);
        true
    }

    /// Find the step for a (possibly quoted) path.
    pub fn get(&self, path: &str) -> Option<&ActionPlanStep> {
        self.index.get(&normalize_path(path)).map(|&i| &self.steps[i])
    }

    pub fn steps(&self) -> &[ActionPlanStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionPlanStep> {
        self.steps.iter()
    }
}

impl FromIterator<ActionPlanStep> for ActionPlan {
    fn from_iter<I: IntoIterator<Item = ActionPlanStep>>(iter: I) -> Self {
        let mut plan = ActionPlan::new();
        for step in iter {
            plan.push(step);
        }
        plan
    }
}

impl Serialize for ActionPlan {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.steps.serialize(serializer)
    }
}
