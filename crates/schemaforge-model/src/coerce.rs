// Value coercion
//
// Converts free-form textual input into a typed value for a declared
// property type, and renders typed values back to editable text. The
// whole per-type contract (convert / format / shape check / raw grammar
// check) is colocated here so each type's behavior is exhaustively
// matched in one place.

use crate::property::PropertyType;
use serde_json::Value;

impl PropertyType {
    /// Convert raw textual input into a typed value.
    ///
    /// Conversion failure is `None`, never an error: the caller surfaces
    /// it as a value-field validation problem.
    pub fn convert(&self, raw: &str) -> Option<Value> {
        match self {
            PropertyType::String => Some(Value::String(raw.to_string())),
            PropertyType::Number => parse_number(raw.trim()),
            PropertyType::Boolean => match raw.trim() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            PropertyType::Object => match serde_json::from_str::<Value>(raw) {
                Ok(v) if v.is_object() => Some(v),
                _ => None,
            },
            PropertyType::Array => convert_array(raw),
            PropertyType::Null => Some(Value::Null),
        }
    }

    /// Render a typed value back to editable text (the inverse of
    /// [`PropertyType::convert`] for display purposes).
    pub fn format(&self, value: &Value) -> String {
        match self {
            PropertyType::Array => format_array(value),
            PropertyType::Object => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
            }
            _ => format_scalar(value),
        }
    }

    /// Check that a converted value's run-time shape matches this type.
    pub fn matches_shape(&self, value: &Value) -> bool {
        match self {
            PropertyType::String => value.is_string(),
            PropertyType::Number => value.is_number(),
            PropertyType::Boolean => value.is_boolean(),
            PropertyType::Object => value.is_object(),
            PropertyType::Array => value.is_array(),
            PropertyType::Null => value.is_null(),
        }
    }

    /// Grammar check applied while the user is still typing.
    ///
    /// Stricter than the post-conversion shape check for scalars, but
    /// deliberately lenient for object/array input that looks like
    /// incomplete JSON (an opening bracket without its closing one), so
    /// mid-keystroke states are not flagged as errors.
    pub fn raw_input_valid(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        match self {
            PropertyType::String | PropertyType::Null => true,
            PropertyType::Number => trimmed.parse::<f64>().is_ok_and(f64::is_finite),
            PropertyType::Boolean => trimmed.eq_ignore_ascii_case("true")
                || trimmed.eq_ignore_ascii_case("false"),
            PropertyType::Object => {
                if looks_incomplete(trimmed, '{', '}') {
                    return true;
                }
                matches!(serde_json::from_str::<Value>(trimmed), Ok(v) if v.is_object())
            }
            PropertyType::Array => {
                if looks_incomplete(trimmed, '[', ']') {
                    return true;
                }
                // The comma-separated fallback accepts any remaining input.
                true
            }
        }
    }
}

/// Parse a number, preferring integer representation so whole numbers
/// round-trip as `42` rather than `42.0`.
fn parse_number(raw: &str) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    let f = raw.parse::<f64>().ok().filter(|f| f.is_finite())?;
    serde_json::Number::from_f64(f).map(Value::Number)
}

/// Array conversion: JSON array parse first, then the comma-separated
/// fallback where each trimmed segment is tried as (in order) JSON value
/// for `{`/`[` prefixes, number, boolean literal, else kept as a string.
fn convert_array(raw: &str) -> Option<Value> {
    if let Ok(v) = serde_json::from_str::<Value>(raw) {
        if v.is_array() {
            return Some(v);
        }
    }
    if raw.trim().is_empty() {
        return None;
    }
    let items = raw.split(',').map(|s| parse_segment(s.trim())).collect();
    Some(Value::Array(items))
}

fn parse_segment(segment: &str) -> Value {
    if segment.starts_with('{') || segment.starts_with('[') {
        if let Ok(v) = serde_json::from_str::<Value>(segment) {
            return v;
        }
    }
    if let Some(n) = parse_number(segment) {
        return n;
    }
    match segment {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(segment.to_string()),
    }
}

fn format_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        v => v.to_string(),
    }
}

/// Arrays of scalar items render as a comma-joined list; arrays holding
/// any composite item render as JSON.
fn format_array(value: &Value) -> String {
    let Some(items) = value.as_array() else {
        return format_scalar(value);
    };
    let composite = items.iter().any(|v| v.is_object() || v.is_array());
    if composite {
        serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
    } else {
        items
            .iter()
            .map(format_scalar)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// JSON input that has started but not finished: an opening bracket
/// without the matching closing one at the end.
fn looks_incomplete(raw: &str, open: char, close: char) -> bool {
    raw.starts_with(open) && !raw.ends_with(close)
}
