//! Marker-delimited result protocol spoken by the external answering engine.
//!
//! The engine may print arbitrary diagnostics around its payload. The payload itself sits on the
//! lines between a start marker line and an end marker line and is a single JSON object:
//!
//! ```text
//! loading index...
//! RESULT_START
//! {"success": true, "answer": "...", "sources": [...], ...}
//! RESULT_END
//! ```
//!
//! Failures use `ERROR_START`/`ERROR_END` around `{"success": false, "error": "...", "type": "..."}`.
//! Markers are literal, case-sensitive and must occupy a whole line (surrounding whitespace is
//! ignored). The first start marker pairs with the first end marker after it. An error region
//! wins over a result region wherever they appear, since a failing engine may still print
//! result-shaped text in its traceback.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

/// Line opening a result region.
pub const RESULT_START: &str = "RESULT_START";
/// Line closing a result region.
pub const RESULT_END: &str = "RESULT_END";
/// Line opening an error region.
pub const ERROR_START: &str = "ERROR_START";
/// Line closing an error region.
pub const ERROR_END: &str = "ERROR_END";

/// Outcome of scanning captured engine output.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedOutcome {
    /// A well-formed result region was found.
    Result(ResultPayload),
    /// A well-formed error region was found.
    Error(ErrorPayload),
    /// No complete marker pair was present.
    NotFound,
}

/// A marker region was present but its body could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {region} payload: {message}")]
pub struct ProtocolError {
    /// Which region failed to decode (`result` or `error`).
    pub region: &'static str,
    /// Decoder diagnostic.
    pub message: String,
}

/// Body of a result region.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPayload {
    /// Engine-side success flag.
    pub success: bool,
    /// Generated answer text.
    #[serde(default)]
    pub answer: String,
    /// Scored excerpts in engine order.
    #[serde(default)]
    pub sources: Vec<SourcePayload>,
    /// Detected question category.
    #[serde(default, alias = "category_hint")]
    pub category: Option<String>,
    /// Retrieval methods used.
    #[serde(default)]
    pub methods: Vec<String>,
    /// Engine-reported processing time in seconds.
    #[serde(default, alias = "query_time")]
    pub query_time: f64,
    /// Number of chunks the engine considered.
    #[serde(default, alias = "chunks_processed", alias = "totalChunks")]
    pub chunks_processed: u64,
    /// Failure message when `success` is false.
    #[serde(default)]
    pub error: Option<String>,
    /// Failure classification when `success` is false.
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
}

/// One scored excerpt inside a result payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourcePayload {
    /// Excerpt text.
    pub content: String,
    /// Handbook page; non-numeric values decode as `0`.
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: i64,
    /// Relevance score.
    #[serde(default)]
    pub score: f64,
    /// Optional excerpt category.
    #[serde(default)]
    pub category: Option<String>,
}

/// Body of an error region.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorPayload {
    /// Always false for well-behaved engines.
    #[serde(default)]
    pub success: bool,
    /// Engine-reported message.
    #[serde(default = "unknown_error_message")]
    pub error: String,
    /// Engine-reported classification, e.g. the exception type.
    #[serde(default = "unknown_error_type", rename = "type")]
    pub kind: String,
}

fn unknown_error_message() -> String {
    "Unknown backend error".to_string()
}

fn unknown_error_type() -> String {
    "UnknownError".to_string()
}

fn lenient_page<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|page| page as i64))
            .unwrap_or(0),
        Value::String(text) => text.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// Scan captured engine output for a result or error region.
///
/// Pure: identical input always yields an identical outcome. Text outside the selected region
/// is ignored.
pub fn parse(raw: &str) -> Result<ParsedOutcome, ProtocolError> {
    if let Some(body) = find_region(raw, ERROR_START, ERROR_END) {
        return decode(body, "error").map(ParsedOutcome::Error);
    }
    if let Some(body) = find_region(raw, RESULT_START, RESULT_END) {
        return decode(body, "result").map(ParsedOutcome::Result);
    }
    Ok(ParsedOutcome::NotFound)
}

fn decode<T: serde::de::DeserializeOwned>(
    body: &str,
    region: &'static str,
) -> Result<T, ProtocolError> {
    serde_json::from_str(body.trim()).map_err(|err| ProtocolError {
        region,
        message: err.to_string(),
    })
}

/// Return the text between the first `start` line and the first `end` line after it.
fn find_region<'a>(raw: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let mut offset = 0;
    let mut body_start = None;
    for line in raw.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        let token = line.trim();
        match body_start {
            None if token == start => body_start = Some(offset),
            Some(begin) if token == end => return Some(&raw[begin..line_start]),
            _ => {}
        }
    }
    None
}
