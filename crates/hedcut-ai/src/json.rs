//! Defensive JSON extraction from free-form model output.
//!
//! Models wrap JSON in prose, code fences, or emit stray control
//! characters. Callers pattern-match the result instead of catching
//! errors.

use serde_json::Value;

/// Outcome of scanning model text for a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonExtract {
    /// A JSON object was found and parsed.
    Parsed(Value),
    /// No `{...}` block present in the text.
    NotFound,
    /// A block was found but did not parse as JSON.
    Invalid(String),
}

impl JsonExtract {
    pub fn into_value(self) -> Option<Value> {
        match self {
            JsonExtract::Parsed(v) => Some(v),
            _ => None,
        }
    }
}

/// Find the outermost `{...}` block in model output and parse it.
///
/// Strips markdown code fences first, then takes everything from the
/// first `{` to the last `}`, dropping ASCII control characters that
/// some providers leak into string literals.
pub fn extract_json_object(text: &str) -> JsonExtract {
    let stripped = strip_code_fences(text);

    let start = match stripped.find('{') {
        Some(i) => i,
        None => return JsonExtract::NotFound,
    };
    let end = match stripped.rfind('}') {
        Some(i) if i >= start => i,
        _ => return JsonExtract::NotFound,
    };

    let candidate: String = stripped[start..=end]
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();

    match serde_json::from_str::<Value>(&candidate) {
        Ok(v) if v.is_object() => JsonExtract::Parsed(v),
        Ok(_) => JsonExtract::Invalid("top-level value is not an object".to_string()),
        Err(e) => JsonExtract::Invalid(e.to_string()),
    }
}

/// Remove ```json ... ``` style fences, keeping the inner text.
fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.contains("```") {
        return trimmed.to_string();
    }
    trimmed
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_object() {
        let result = extract_json_object(r#"{"summary": "ok"}"#);
        assert!(matches!(result, JsonExtract::Parsed(_)));
    }

    #[test]
    fn parses_object_wrapped_in_prose() {
        let text = "Here is the analysis you asked for:\n{\"summary\": \"ok\"}\nHope it helps!";
        match extract_json_object(text) {
            JsonExtract::Parsed(v) => assert_eq!(v["summary"], "ok"),
            other => panic!("expected Parsed, got {other:?}"),
        }
    }

    #[test]
    fn strips_json_code_fence() {
        let text = "```json\n{\"summary\": \"fenced\"}\n```";
        match extract_json_object(text) {
            JsonExtract::Parsed(v) => assert_eq!(v["summary"], "fenced"),
            other => panic!("expected Parsed, got {other:?}"),
        }
    }

    #[test]
    fn reports_missing_object() {
        assert_eq!(extract_json_object("no json here"), JsonExtract::NotFound);
        assert_eq!(extract_json_object(""), JsonExtract::NotFound);
    }

    #[test]
    fn reports_invalid_block() {
        let result = extract_json_object("{not valid json}");
        assert!(matches!(result, JsonExtract::Invalid(_)));
    }

    #[test]
    fn strips_control_characters() {
        let text = "{\"text\": \"hi\u{0008}there\"}";
        match extract_json_object(text) {
            JsonExtract::Parsed(v) => assert_eq!(v["text"], "hithere"),
            other => panic!("expected Parsed, got {other:?}"),
        }
    }

    #[test]
    fn rejects_top_level_array() {
        // rfind('}') inside an array of objects still yields a non-object span
        let result = extract_json_object("[1, 2, 3]");
        assert_eq!(result, JsonExtract::NotFound);
    }
}
