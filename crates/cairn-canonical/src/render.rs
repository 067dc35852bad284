//! Human-readable rendering of normal forms as RFC 8785 canonical JSON.
//!
//! Rendering is for inspection and interchange only; identity is always
//! computed over [`encode`](crate::encoding::encode) bytes.
//!
//! ```json
//! {"kind":"cairn.node.v1.Var","slots":{"name":{"t":"str","v":"x"}}}
//! ```
//!
//! Integers render as decimal strings and floats as 16 lowercase hex digits
//! of their bit pattern, so no value passes through a JSON number. Maps render
//! as `[key, value]` pairs because canonical JSON orders object members by
//! UTF-16 code units rather than bytes.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_normalization::is_nfc;

use crate::cid::Cid;
use crate::kind::NodeKind;
use crate::normal::{check_shape, is_canonical_float_bits, NormalForm, NormalValue};
use crate::schema;
use crate::validation::ValidationError;

/// Errors produced while rendering or parsing a rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// JSON could not be produced or parsed.
    #[error("json error: {0}")]
    Json(String),
    /// A scalar or CID had the wrong textual shape.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The rendering does not describe a normal form.
    #[error("invalid rendering: {0}")]
    Invalid(String),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RenderedForm {
    kind: String,
    slots: BTreeMap<String, RenderedValue>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "lowercase")]
enum RenderedValue {
    Absent,
    Bool(bool),
    Int(String),
    F64(String),
    Str(String),
    Cid(String),
    List(Vec<RenderedValue>),
    Map(Vec<(String, RenderedValue)>),
}

impl From<&NormalValue> for RenderedValue {
    fn from(value: &NormalValue) -> Self {
        match value {
            NormalValue::Absent => RenderedValue::Absent,
            NormalValue::Bool(b) => RenderedValue::Bool(*b),
            NormalValue::Int(i) => RenderedValue::Int(i.to_string()),
            NormalValue::Float(bits) => RenderedValue::F64(format!("{bits:016x}")),
            NormalValue::Str(s) => RenderedValue::Str(s.clone()),
            NormalValue::Cid(cid) => RenderedValue::Cid(cid.to_string()),
            NormalValue::List(items) => {
                RenderedValue::List(items.iter().map(RenderedValue::from).collect())
            }
            NormalValue::Map(entries) => RenderedValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), RenderedValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Renders a normal form as canonical JSON.
///
/// # Errors
///
/// Returns [`RenderError::Json`] if serialization fails.
pub fn render(form: &NormalForm) -> Result<String, RenderError> {
    let rendered = RenderedForm {
        kind: form.kind().qualified_name().to_string(),
        slots: form
            .slots()
            .map(|(name, value)| (name.to_string(), RenderedValue::from(value)))
            .collect(),
    };
    let value = serde_json::to_value(&rendered).map_err(|e| RenderError::Json(e.to_string()))?;
    canonical_json::to_string(&value).map_err(|e| RenderError::Json(e.to_string()))
}

/// Parses a rendering back into the normal form it describes.
///
/// Applies the same strictness as [`decode`](crate::encoding::decode): every
/// declared slot must be present exactly once with a value its schema
/// allows, strings must be NFC, maps must be strictly ordered and NaN must be
/// canonical.
///
/// # Errors
///
/// Returns [`RenderError`] for malformed or non-canonical input.
pub fn parse_rendering(text: &str) -> Result<NormalForm, RenderError> {
    let rendered: RenderedForm =
        serde_json::from_str(text).map_err(|e| RenderError::Json(e.to_string()))?;
    let kind = NodeKind::ALL
        .iter()
        .copied()
        .find(|k| k.qualified_name() == rendered.kind)
        .ok_or_else(|| RenderError::Invalid(format!("unknown node kind '{}'", rendered.kind)))?;

    let declared = schema::slots(kind);
    if let Some(extra) = rendered
        .slots
        .keys()
        .find(|name| schema::slot_index(kind, name).is_none())
    {
        return Err(RenderError::Invalid(format!("{kind} has no slot '{extra}'")));
    }
    let mut slots = rendered.slots;
    let values = declared
        .iter()
        .map(|slot| {
            let value = slots
                .remove(slot.name)
                .ok_or_else(|| RenderError::Invalid(format!("{kind}.{} is missing", slot.name)))?;
            normal_value(value)
        })
        .collect::<Result<Vec<_>, _>>()?;
    check_shape(kind, &values).map_err(RenderError::Invalid)?;
    Ok(NormalForm::from_parts(kind, values))
}

fn int_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?(0|[1-9][0-9]*)$").expect("invalid regex"))
}

fn float_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-f]{16}$").expect("invalid regex"))
}

fn nfc(s: String) -> Result<String, RenderError> {
    if is_nfc(&s) {
        Ok(s)
    } else {
        Err(RenderError::Invalid(format!("string {s:?} is not NFC")))
    }
}

fn normal_value(value: RenderedValue) -> Result<NormalValue, RenderError> {
    Ok(match value {
        RenderedValue::Absent => NormalValue::Absent,
        RenderedValue::Bool(b) => NormalValue::Bool(b),
        RenderedValue::Int(text) => {
            if !int_pattern().is_match(&text) || text == "-0" {
                return Err(ValidationError::PatternMismatch {
                    field: "int",
                    value: text,
                }
                .into());
            }
            let n = text.parse::<i64>().map_err(|_| ValidationError::OutOfBounds {
                field: "int",
                value: text.clone(),
            })?;
            NormalValue::Int(n)
        }
        RenderedValue::F64(text) => {
            if !float_pattern().is_match(&text) {
                return Err(ValidationError::PatternMismatch {
                    field: "f64",
                    value: text,
                }
                .into());
            }
            let bits = u64::from_str_radix(&text, 16).map_err(|_| ValidationError::PatternMismatch {
                field: "f64",
                value: text.clone(),
            })?;
            if !is_canonical_float_bits(bits) {
                return Err(RenderError::Invalid(format!("NaN payload {text} is not canonical")));
            }
            NormalValue::Float(bits)
        }
        RenderedValue::Str(s) => NormalValue::Str(nfc(s)?),
        RenderedValue::Cid(text) => NormalValue::Cid(Cid::parse(&text)?),
        RenderedValue::List(items) => NormalValue::List(
            items
                .into_iter()
                .map(normal_value)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        RenderedValue::Map(entries) => {
            let mut out: Vec<(String, NormalValue)> = Vec::with_capacity(entries.len());
            for (key, item) in entries {
                let key = nfc(key)?;
                if let Some((prev, _)) = out.last() {
                    if prev.as_bytes() >= key.as_bytes() {
                        return Err(RenderError::Invalid(format!(
                            "map key {key:?} is not strictly ascending"
                        )));
                    }
                }
                out.push((key, normal_value(item)?));
            }
            NormalValue::Map(out)
        }
    })
}
