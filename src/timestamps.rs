// src/timestamps.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Minimum spacing between two rendered seek markers, in seconds.
pub const DEFAULT_MIN_GAP_SECS: f64 = 600.0;

/// A moment in the video the backend considers relevant to an answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Timestamp {
    /// Offset from the start of the video, in seconds.
    pub start: f64,
    /// Transcript snippet attached by the backend, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Anything else the backend sent along; carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Timestamp {
    pub fn at(start: f64) -> Self {
        Self {
            start,
            text: None,
            extra: Map::new(),
        }
    }

    pub fn with_text(start: f64, text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::at(start)
        }
    }

    /// Reads one backend entry. Anything without a numeric `start` is
    /// rejected; a non-string `text` stays in `extra`.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut extra) = value else {
            return None;
        };
        let start = extra.remove("start")?.as_f64()?;
        let text = match extra.remove("text") {
            Some(Value::String(text)) => Some(text),
            Some(other) => {
                extra.insert("text".to_string(), other);
                None
            }
            None => None,
        };
        Some(Self { start, text, extra })
    }
}

/// Sorts `timestamps` by `start` and greedily keeps every entry that lies at
/// least `min_gap_secs` after the previously kept one.
///
/// The earliest candidate is always kept, ties keep their input order, and the
/// input slice is left untouched.
pub fn select(timestamps: &[Timestamp], min_gap_secs: f64) -> Vec<Timestamp> {
    let mut sorted: Vec<&Timestamp> = timestamps.iter().collect();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut selected = Vec::new();
    let mut last_added = f64::NEG_INFINITY;

    for ts in sorted {
        if ts.start - last_added >= min_gap_secs {
            selected.push(ts.clone());
            last_added = ts.start;
        }
    }

    selected
}

/// Renders a second offset as `M:SS`, e.g. `605.0` -> `"10:05"`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}
