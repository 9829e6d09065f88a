#![forbid(unsafe_code)]

//! Wire-level model of the KLE row notation.
//!
//! A layout is a JSON array; the first element may be a metadata object, and
//! every other element is a row array mixing property-delta objects with
//! label strings. The same structure is also accepted in the relaxed
//! non-strict notation (unquoted keys, trailing commas), normalized through
//! `json5` before structural decoding.
//!
//! Field declaration order in [`RawProps`] matters: serde emits struct
//! fields in declaration order, and a compliant decoder must see the
//! rotation triple `r`/`rx`/`ry` before any positional delta on the first
//! key of a rotated row.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::FormatError;

/// One property-delta object. Every field is a delta or override applied to
/// the running decode state, never an absolute reset of unrelated fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawProps {
    // Rotation triple first: emission order is load-bearing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rx: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ry: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h2: Option<f64>,

    /// Keycap color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c: Option<String>,
    /// Legend colors, newline-separated by slot. An empty string clears all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    /// Ghost flag (one-shot).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub g: Option<bool>,
    /// Legend alignment bits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub a: Option<u8>,
    /// Default legend text size (1-9).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f: Option<u8>,
    /// Keycap profile tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    /// Homing-nub flag (one-shot).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<bool>,
    /// Stepped-cap flag (one-shot).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub l: Option<bool>,
    /// Decal flag (one-shot).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<bool>,
}

impl RawProps {
    /// Whether no field is set (such an object is dropped on encode).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Background passthrough in the metadata object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawBackground {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

/// The optional leading metadata object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<RawBackground>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radii: Option<String>,
    #[serde(rename = "switchMount", skip_serializing_if = "Option::is_none")]
    pub switch_mount: Option<String>,
    #[serde(rename = "switchBrand", skip_serializing_if = "Option::is_none")]
    pub switch_brand: Option<String>,
    #[serde(rename = "switchType", skip_serializing_if = "Option::is_none")]
    pub switch_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcb: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
}

/// Parse the top level of a layout: strict JSON first, then the relaxed
/// notation. Returns the element list of the outer array.
pub fn parse_root(input: &str) -> Result<Vec<Value>, FormatError> {
    let value: Value = match serde_json::from_str(input) {
        Ok(v) => v,
        Err(_) => {
            let mut v = json5::from_str(input)
                .map_err(|e| FormatError::Syntax(e.to_string()))?;
            // json5 yields every number as a float; fold whole-valued ones
            // back to integers so integer-typed fields deserialize.
            normalize_numbers(&mut v);
            v
        }
    };
    match value {
        Value::Array(entries) => Ok(entries),
        other => Err(FormatError::NotAnArray {
            found: type_name(&other),
        }),
    }
}

fn normalize_numbers(value: &mut Value) {
    match value {
        Value::Number(n) => {
            if n.as_i64().is_none()
                && n.as_u64().is_none()
                && let Some(f) = n.as_f64()
                && f.fract() == 0.0
                && f.abs() < i64::MAX as f64
            {
                *value = Value::from(f as i64);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(normalize_numbers),
        Value::Object(map) => map.values_mut().for_each(normalize_numbers),
        _ => {}
    }
}

/// Human-readable JSON type name for error messages.
#[must_use]
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_json_parses() {
        let entries = parse_root(r#"[[{"w":2},"Spacebar"]]"#).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn relaxed_notation_parses() {
        // Unquoted keys and a trailing comma, as pasted from the editor.
        let entries = parse_root(r#"[[{w:2},"Spacebar"],]"#).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn non_array_root_is_rejected() {
        let err = parse_root(r#"{"w":2}"#).unwrap_err();
        assert!(matches!(err, FormatError::NotAnArray { found: "object" }));
    }

    #[test]
    fn garbage_is_a_syntax_error() {
        let err = parse_root("[[{").unwrap_err();
        assert!(matches!(err, FormatError::Syntax(_)));
    }

    #[test]
    fn props_serialize_rotation_triple_first() {
        let props = RawProps {
            r: Some(15.0),
            rx: Some(4.0),
            ry: Some(2.0),
            x: Some(1.0),
            ..RawProps::default()
        };
        let json = serde_json::to_string(&props).unwrap();
        let r_at = json.find("\"r\"").unwrap();
        let rx_at = json.find("\"rx\"").unwrap();
        let ry_at = json.find("\"ry\"").unwrap();
        let x_at = json.find("\"x\"").unwrap();
        assert!(r_at < rx_at && rx_at < ry_at && ry_at < x_at);
    }
}
