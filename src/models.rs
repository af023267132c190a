//! Analysis report data model as returned by the backend

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::error::{AnalysisError, Result};

/// Parsed body of a successful analysis request.
///
/// Only `overall_score` is required. Every section is absent-tolerant and
/// unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(deserialize_with = "score")]
    pub overall_score: u8,

    #[serde(default, deserialize_with = "nullable")]
    pub whats_right: Vec<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub corrections_needed: Vec<Correction>,

    #[serde(default, deserialize_with = "nullable")]
    pub detailed_breakdown: BTreeMap<String, AspectScore>,

    #[serde(default, deserialize_with = "nullable")]
    pub improvement_tips: Vec<String>,

    /// Server-relative path to the annotated video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_url: Option<String>,

    /// One-line verdict some backends attach
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    #[serde(default, deserialize_with = "text")]
    pub issue: String,

    #[serde(default)]
    pub severity: Severity,

    #[serde(default, deserialize_with = "text")]
    pub feedback: String,

    #[serde(default, deserialize_with = "text")]
    pub correction_instruction: String,
}

/// Score and note for one aspect of the movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectScore {
    /// 0 when the backend omits it or sends something other than a number
    #[serde(default, deserialize_with = "lenient_score")]
    pub score: u8,

    #[serde(default, deserialize_with = "text")]
    pub feedback: String,
}

/// Importance of a correction. Unrecognized values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    Critical,
    Warning,
    Info,
    Other(String),
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Other(raw) => raw,
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Other(String::new())
    }
}

impl From<&str> for Severity {
    fn from(raw: &str) -> Self {
        match raw {
            "critical" => Severity::Critical,
            "warning" => Severity::Warning,
            "info" => Severity::Info,
            other => Severity::Other(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(raw) => Severity::from(raw.as_str()),
            serde_json::Value::Null => Severity::default(),
            other => Severity::Other(other.to_string()),
        })
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Treat an explicit `null` the same as a missing field
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Scores arrive as JSON numbers (occasionally floats); clamp into 0..=100
fn score<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u8, D::Error> {
    let raw = f64::deserialize(deserializer)?;
    if raw.is_nan() {
        return Err(serde::de::Error::custom("score is not a number"));
    }
    Ok(clamp_score(raw))
}

fn clamp_score(raw: f64) -> u8 {
    raw.round().clamp(0.0, 100.0) as u8
}

/// Per-aspect scores never fail the report: anything that is not a number becomes 0
fn lenient_score<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u8, D::Error> {
    Ok(serde_json::Value::deserialize(deserializer)?
        .as_f64()
        .map(clamp_score)
        .unwrap_or(0))
}

/// Free-text fields: null is empty, non-strings are kept as their JSON text
fn text<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Interpret a 2xx response body.
///
/// The backend sometimes reports failures with a success status, either as
/// `{"success": false, "error": ...}` or as a bare `{"error": ...}`. Those are
/// analysis failures, not results.
pub fn parse_analysis_body(body: &[u8]) -> Result<AnalysisResult> {
    let value: serde_json::Value = serde_json::from_slice(body)?;

    let flagged_failure = value.get("success").and_then(|s| s.as_bool()) == Some(false);
    let bare_error = value.get("overall_score").is_none() && value.get("error").is_some();
    if flagged_failure || bare_error {
        let message = value
            .get("error")
            .and_then(|e| e.as_str())
            .unwrap_or("backend reported an unsuccessful analysis")
            .to_string();
        return Err(AnalysisError::Rejected(message));
    }

    Ok(serde_json::from_value(value)?)
}
