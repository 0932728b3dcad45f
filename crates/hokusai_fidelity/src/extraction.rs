//! Utilities for extracting structured data from model responses.
//!
//! Model responses often wrap JSON in markdown fences or surround it with
//! prose. The helpers here locate the JSON payload before typed parsing,
//! so stages see either a valid structure or a clear error.

use hokusai_error::{HokusaiResult, JsonError};

/// Extract the JSON payload from a response that may contain markdown or
/// surrounding prose.
///
/// Strategies, in order:
/// 1. Fenced code block (```json ... ``` or bare ``` ... ```)
/// 2. First balanced `{...}` or `[...]` span, whichever opens earlier
///
/// # Errors
///
/// Returns an error if no JSON-shaped span is found.
///
/// # Examples
///
/// ```
/// use hokusai_fidelity::extract_json;
///
/// let response = "Sure, here is the script:\n```json\n{\"panels\": []}\n```";
/// assert_eq!(extract_json(response).unwrap(), "{\"panels\": []}");
/// ```
pub fn extract_json(response: &str) -> HokusaiResult<String> {
    if let Some(fenced) = fenced_block(response) {
        return Ok(fenced);
    }

    let object = delimited_span(response, '{', '}');
    let array = delimited_span(response, '[', ']');
    let earliest = match (object, array) {
        (Some(o), Some(a)) => Some(if o.0 < a.0 { o } else { a }),
        (span, None) | (None, span) => span,
    };
    if let Some((start, end)) = earliest {
        return Ok(response[start..end].to_string());
    }

    tracing::error!(
        response_length = response.len(),
        "No JSON found in model response"
    );
    Err(JsonError::new(format!(
        "No JSON found in response (length: {}). Ensure the prompt requests JSON-only output.",
        response.len()
    ))
    .into())
}

/// Pull content out of the first markdown code fence, if any.
fn fenced_block(response: &str) -> Option<String> {
    let opening = response.find("```")?;
    let after_fence = opening + 3;
    // Skip an optional language tag up to the first newline.
    let body_start = response[after_fence..]
        .find('\n')
        .map(|n| after_fence + n + 1)
        .unwrap_or(after_fence);

    match response[body_start..].find("```") {
        Some(closing) => Some(response[body_start..body_start + closing].trim().to_string()),
        // A missing closing fence usually means a truncated response; take
        // everything after the opening fence and let the parser decide.
        None => Some(response[body_start..].trim().to_string()),
    }
}

/// Locate the first balanced span between `open` and `close`, respecting
/// JSON string literals and escapes. Returns byte offsets `(start, end)`
/// where `end` is one past the closing delimiter.
fn delimited_span(response: &str, open: char, close: char) -> Option<(usize, usize)> {
    let start = response.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in response[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some((start, start + offset + ch.len_utf8()));
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse extracted JSON into a typed structure.
///
/// # Errors
///
/// Returns an error carrying a short preview of the offending JSON.
///
/// # Examples
///
/// ```
/// use hokusai_fidelity::parse_json;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Score {
///     value: f32,
/// }
///
/// let score: Score = parse_json(r#"{"value": 87.5}"#).unwrap();
/// assert_eq!(score.value, 87.5);
/// ```
pub fn parse_json<T>(json_str: &str) -> HokusaiResult<T>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(json_str).map_err(|e| {
        let preview: String = json_str.chars().take(100).collect();
        tracing::error!(error = %e, json_preview = %preview, "JSON parsing failed");
        JsonError::new(format!("Failed to parse JSON: {} (JSON: {}...)", e, preview)).into()
    })
}
