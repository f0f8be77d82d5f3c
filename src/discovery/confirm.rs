//! Confirmation detection and locally produced follow-up questions.

use std::sync::LazyLock;

use regex::Regex;

static AFFIRMATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:yes|y|yeah|yep|sure|ok|okay|proceed|confirm|go ahead|let's go|do it|looks good|sounds good)\b")
        .expect("valid affirmative regex")
});

/// Whether the user's reply confirms the proposed spec.
///
/// The input is trimmed and lower-cased, then must start with an
/// affirmative phrase.
pub fn is_affirmative(input: &str) -> bool {
    let normalized = input.trim().to_lowercase().replace('\u{2019}', "'");
    AFFIRMATIVE.is_match(&normalized)
}

/// Follow-up question for each missing required field.
pub fn clarification_questions(missing: &[&str]) -> Vec<String> {
    missing
        .iter()
        .map(|field| match *field {
            "pages" => "Which pages should the app have (for example: home, dashboard, settings)?".to_string(),
            "components" => {
                "Which UI components do you need (for example: navigation bar, data table, chart)?".to_string()
            }
            other => format!("Could you provide a value for {}?", other),
        })
        .collect()
}
