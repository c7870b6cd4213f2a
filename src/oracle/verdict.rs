use serde_json::{Map, Value};

use crate::models::{ChunkSummary, Emotion};
use crate::utils::text::truncate_chars;

use super::extract::extract_json_object;
use super::{ChunkVerdict, OracleError};

const SCORE_KEYS: &[&str] = &["focus_score", "score"];
const SUMMARY_KEYS: &[&str] = &["summary", "summary_so_far", "rewritten_summary"];
const COMMENT_KEYS: &[&str] = &["comment", "leonardo_comment", "new_comment"];
const EMOTION_KEYS: &[&str] = &["emotion", "mood"];

pub const DEFAULT_COMMENT: &str = "I am observing.";
const FALLBACK_SUMMARY: &str = "Session in progress.";

/// Turn raw oracle text into a verdict, repairing what can be repaired.
///
/// Fails only when there is no JSON object at all, it does not parse, or it
/// carries none of the expected fields. Otherwise: a missing or garbled score
/// falls back to `100 - global_distraction_ratio`, scores are clamped to
/// [0, 100], an empty summary keeps the previous one, a missing comment gets
/// a neutral default, and unknown emotions become `None`.
pub fn parse_verdict(
    text: &str,
    chunk: &ChunkSummary,
    previous_summary: &str,
    summary_max_chars: usize,
) -> Result<ChunkVerdict, OracleError> {
    let raw = extract_json_object(text)?;
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| OracleError::MalformedResponse(format!("invalid JSON: {err}")))?;
    let Value::Object(fields) = value else {
        return Err(OracleError::MalformedResponse("expected a JSON object".into()));
    };

    let known = SCORE_KEYS
        .iter()
        .chain(SUMMARY_KEYS)
        .chain(COMMENT_KEYS)
        .chain(EMOTION_KEYS)
        .any(|key| fields.contains_key(*key));
    if !known {
        return Err(OracleError::MalformedResponse(
            "object has none of the expected fields".into(),
        ));
    }

    let anchor = 100 - chunk.global_distraction_ratio.min(100);
    let score = first(&fields, SCORE_KEYS).and_then(coerce_score).unwrap_or(anchor);

    let summary = first_text(&fields, SUMMARY_KEYS)
        .or_else(|| Some(previous_summary.trim().to_string()).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| FALLBACK_SUMMARY.to_string());

    let comment = first_text(&fields, COMMENT_KEYS).unwrap_or_else(|| DEFAULT_COMMENT.to_string());

    let emotion = first(&fields, EMOTION_KEYS)
        .and_then(Value::as_str)
        .and_then(Emotion::parse_loose);

    Ok(ChunkVerdict {
        summary: truncate_chars(&summary, summary_max_chars),
        emotion,
        score,
        comment,
    })
}

fn first<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| fields.get(*key))
}

fn first_text(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    first(fields, keys)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Accepts 72, 72.6, "72", "72/100", "72%".
fn coerce_score(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let head = s.trim().split(&['/', '%', ' '][..]).next()?;
            head.parse::<f64>().ok()?
        }
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    Some(number.round().clamp(0.0, 100.0) as u8)
}
