//! Turns the model's free-text reply into validated [`MovieRecord`]s.
//!
//! The model is asked for a bare JSON array but regularly wraps it in
//! markdown fences, leaves fields out, or writes the string `"null"` where it
//! means JSON null. Everything downstream of [`normalize`] may assume every
//! record has a non-empty title, year and reason.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::models::{MovieRecord, RawModelReply, DEFAULT_GENRE};

/// Why a model reply could not be turned into recommendations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// `cleaned` holds the fence-stripped reply for operator logs only
    #[error("Model reply is not valid JSON: {reason}")]
    MalformedResponse { cleaned: String, reason: String },

    #[error("Model reply is a JSON {found}, expected an array")]
    UnexpectedShape { found: &'static str },

    #[error("Model reply contained no valid movie records")]
    EmptyResult,
}

static CODE_FENCE: OnceLock<Regex> = OnceLock::new();

/// Matches ``` plus an optional language hint. A hint is only consumed when it
/// ends the line, or when it is `json` glued to the payload (```json[...]).
fn code_fence() -> &'static Regex {
    CODE_FENCE.get_or_init(|| {
        Regex::new(r"```(?:[A-Za-z][\w+.-]*[ \t]*\r?\n|(?i:json))?").unwrap()
    })
}

/// Removes every markdown code-fence marker, then trims the result
pub fn strip_code_fences(text: &str) -> String {
    code_fence().replace_all(text, "").trim().to_string()
}

/// Validates a raw model reply against the movie-record shape
///
/// Records missing a required field are dropped with a warning; the call only
/// fails when the reply is unusable as a whole or nothing survives.
pub fn normalize(raw: &RawModelReply) -> Result<Vec<MovieRecord>, NormalizeError> {
    let cleaned = strip_code_fences(raw.as_str());

    let parsed: Value = match serde_json::from_str(&cleaned) {
        Ok(value) => value,
        Err(e) => {
            return Err(NormalizeError::MalformedResponse {
                reason: e.to_string(),
                cleaned,
            })
        }
    };

    let elements = match parsed {
        Value::Array(elements) => elements,
        other => {
            return Err(NormalizeError::UnexpectedShape {
                found: json_type_name(&other),
            })
        }
    };

    let total = elements.len();
    let movies: Vec<MovieRecord> = elements
        .iter()
        .enumerate()
        .filter_map(|(index, element)| match normalize_record(element) {
            Ok(movie) => Some(movie),
            Err(missing) => {
                tracing::warn!(
                    index,
                    missing = ?missing,
                    record = %element,
                    "Dropping movie record with missing required fields"
                );
                None
            }
        })
        .collect();

    if movies.is_empty() {
        return Err(NormalizeError::EmptyResult);
    }

    tracing::debug!(
        received = total,
        kept = movies.len(),
        "Normalized model reply"
    );

    Ok(movies)
}

/// Builds one record, or returns the names of the required fields it lacks
fn normalize_record(element: &Value) -> Result<MovieRecord, Vec<&'static str>> {
    let title = coerce_text(element.get("title"));
    let year = coerce_text(element.get("year"));
    let reason = coerce_text(element.get("reason"));

    match (title, year, reason) {
        (Some(title), Some(year), Some(reason)) => Ok(MovieRecord {
            title,
            year,
            genre: coerce_text(element.get("genre"))
                .unwrap_or_else(|| DEFAULT_GENRE.to_string()),
            rating: coerce_text(element.get("rating")).filter(|rating| rating != "null"),
            reason,
        }),
        (title, year, reason) => {
            let missing = [("title", title), ("year", year), ("reason", reason)]
                .into_iter()
                .filter(|(_, value)| value.is_none())
                .map(|(name, _)| name)
                .collect();
            Err(missing)
        }
    }
}

/// Text form of a scalar field, trimmed
///
/// Only strings and non-zero numbers carry a value. Null, booleans, zero,
/// arrays, objects and blank strings all count as absent.
fn coerce_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) if n.as_f64() == Some(0.0) => return None,
        Value::Number(n) => number_text(n),
        _ => return None,
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Whole-valued floats print without a fraction, so `8.0` reads as "8"
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
