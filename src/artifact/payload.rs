//! Recovering JSON objects from model replies.
//!
//! Models asked for "JSON only" still wrap answers in markdown fences or
//! surround them with prose. Parsing is layered: the reply as-is, then with
//! fences stripped, then the first balanced `{...}` substring.

use serde::de::DeserializeOwned;

/// Which layer produced the parsed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLayer {
    Direct,
    Unfenced,
    Embedded,
}

/// Failure after every layer was tried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no JSON object could be parsed: {reason}")]
pub struct PayloadError {
    pub reason: String,
}

/// Parse `text` into `T`, trying each layer in turn.
pub fn parse_json_payload<T: DeserializeOwned>(text: &str) -> Result<(T, PayloadLayer), PayloadError> {
    let trimmed = text.trim();

    let mut last_error = match serde_json::from_str::<T>(trimmed) {
        Ok(value) => return Ok((value, PayloadLayer::Direct)),
        Err(e) => e.to_string(),
    };

    let unfenced = strip_fences(trimmed);
    if unfenced != trimmed {
        match serde_json::from_str::<T>(unfenced) {
            Ok(value) => return Ok((value, PayloadLayer::Unfenced)),
            Err(e) => last_error = e.to_string(),
        }
    }

    if let Some(object) = first_object(trimmed) {
        match serde_json::from_str::<T>(object) {
            Ok(value) => return Ok((value, PayloadLayer::Embedded)),
            Err(e) => last_error = e.to_string(),
        }
    } else if trimmed.is_empty() {
        last_error = "empty response".to_string();
    }

    Err(PayloadError { reason: last_error })
}

/// Remove one surrounding markdown fence (```` ``` ```` or ```` ```json ````).
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") up to the first newline.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// First balanced `{...}` substring, honoring JSON string escapes.
pub fn first_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Verdict {
        pass: bool,
        feedback: String,
    }

    #[test]
    fn test_direct_parse() {
        let (v, layer) = parse_json_payload::<Verdict>(r#" {"pass": true, "feedback": "ok"} "#).unwrap();
        assert!(v.pass);
        assert_eq!(layer, PayloadLayer::Direct);
    }

    #[test]
    fn test_fenced_parse() {
        let text = "```json\n{\"pass\": false, \"feedback\": \"missing export\"}\n```";
        let (v, layer) = parse_json_payload::<Verdict>(text).unwrap();
        assert!(!v.pass);
        assert_eq!(v.feedback, "missing export");
        assert_eq!(layer, PayloadLayer::Unfenced);
    }

    #[test]
    fn test_embedded_parse() {
        let text = "Sure! Here is my verdict: {\"pass\": true, \"feedback\": \"uses {braces} fine\"} Hope that helps.";
        let (v, layer) = parse_json_payload::<Verdict>(text).unwrap();
        assert!(v.pass);
        assert_eq!(v.feedback, "uses {braces} fine");
        assert_eq!(layer, PayloadLayer::Embedded);
    }

    #[test]
    fn test_all_layers_fail() {
        assert!(parse_json_payload::<Verdict>("").is_err());
        assert!(parse_json_payload::<Verdict>("looks good to me").is_err());
        assert!(parse_json_payload::<Verdict>("{\"pass\": \"maybe\"}").is_err());
        assert!(parse_json_payload::<Verdict>("{ unterminated").is_err());
    }

    #[test]
    fn test_strip_fences_variants() {
        assert_eq!(strip_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_fences("```json\n{\"a\":1}\n```\n"), "{\"a\":1}");
        assert_eq!(strip_fences("{}"), "{}");
        assert_eq!(strip_fences("```json\n{}"), "{}");
    }

    #[test]
    fn test_first_object_with_escaped_quotes() {
        let text = r#"x {"a": "say \"}\" now", "b": {"c": 1}} tail }"#;
        assert_eq!(first_object(text), Some(r#"{"a": "say \"}\" now", "b": {"c": 1}}"#));
        assert_eq!(first_object("no braces"), None);
        assert_eq!(first_object("{ never closed"), None);
    }
}
