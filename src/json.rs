//! The KMIP JSON encoding of TTLV.
//!
//! Each TTLV item becomes an object `{"tag": …, "type": …, "value": …}`. For a Structure the `type` member is
//! omitted and `value` is an array of child objects.
//!
//! Integer, Long Integer and Big Integer values are emitted as JSON numbers only while they fit within ±2⁵²;
//! beyond that they are emitted as `0x`-prefixed hex strings of the raw value bytes, so that JSON parsers which
//! read all numbers as 64-bit floats cannot silently lose precision.
//!
//! ```
//! use ttlv_codec::{json, SymbolTable, TtlvEncoder, TtlvTag, TtlvView};
//!
//! let registry = SymbolTable::new().with_tag(TtlvTag::new(0x42000D), "BatchCount");
//! let mut enc = TtlvEncoder::new();
//! enc.write_integer(TtlvTag::new(0x42000D), 1);
//! let bytes = enc.into_vec();
//!
//! let text = json::to_string(TtlvView::new(&bytes), &registry)?;
//! assert_eq!(text, r#"{"tag":"BatchCount","type":"Integer","value":1}"#);
//! assert_eq!(json::from_str(&text, &registry)?, bytes);
//! # Ok::<(), ttlv_codec::Error>(())
//! ```

use std::convert::TryFrom;

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde_json::{Map, Value};
use tracing::trace;

use crate::enc::TtlvEncoder;
use crate::error::{Error, ErrorKind, ErrorLocation, Result};
use crate::registry::{SymbolRegistry, TAG_ATTRIBUTE_NAME, TAG_ATTRIBUTE_VALUE};
use crate::types::{TtlvTag, TtlvType};
use crate::util::{
    parse_date_time, parse_date_time_extended, parse_hex, parse_i64_text, parse_u32_text,
    render_date_time, render_date_time_extended,
};
use crate::view::TtlvView;

/// The largest magnitude a JSON number may carry here without risking silent precision loss in consumers that
/// parse all numbers as IEEE 754 doubles.
const MAX_SAFE_JSON_INT: u64 = 1 << 52;

// --- Marshal --------------------------------------------------------------------------------------------------------

/// Renders a TTLV item (and its whole subtree) as a [serde_json::Value] tree.
pub fn to_value<R>(ttlv: TtlvView<'_>, registry: &R) -> Result<Value>
where
    R: SymbolRegistry + ?Sized,
{
    trace!("rendering {} TTLV bytes as JSON", ttlv.as_bytes().len());
    ttlv.valid()?;
    item_to_value(ttlv, registry, None)
}

/// Renders a TTLV item as a JSON string.
pub fn to_string<R>(ttlv: TtlvView<'_>, registry: &R) -> Result<String>
where
    R: SymbolRegistry + ?Sized,
{
    let value = to_value(ttlv, registry)?;
    serde_json::to_string(&value).map_err(Error::from)
}

/// Renders a TTLV item as a pretty-printed JSON string.
pub fn to_string_pretty<R>(ttlv: TtlvView<'_>, registry: &R) -> Result<String>
where
    R: SymbolRegistry + ?Sized,
{
    let value = to_value(ttlv, registry)?;
    serde_json::to_string_pretty(&value).map_err(Error::from)
}

fn item_to_value<R>(
    node: TtlvView<'_>,
    registry: &R,
    effective: Option<TtlvTag>,
) -> Result<Value>
where
    R: SymbolRegistry + ?Sized,
{
    let tag = node.tag();
    let r#type = node.ttlv_type()?;
    let effective = effective.unwrap_or(tag);

    let mut obj = Map::new();
    obj.insert("tag".to_string(), Value::String(registry.format_tag(tag)));
    if r#type != TtlvType::Structure {
        obj.insert("type".to_string(), Value::String(r#type.name().to_string()));
    }

    let value = match r#type {
        TtlvType::Structure => {
            let mut children = Vec::new();
            let mut attr_tag = None;
            for child in node.children() {
                if child.tag() == TAG_ATTRIBUTE_NAME {
                    attr_tag = child
                        .value_text_string()
                        .ok()
                        .and_then(|s| registry.parse_tag(s).ok());
                }
                let child_effective = if child.tag() == TAG_ATTRIBUTE_VALUE {
                    attr_tag
                } else {
                    None
                };
                children.push(item_to_value(child, registry, child_effective)?);
            }
            Value::Array(children)
        }
        TtlvType::Integer => {
            let v = node.value_integer();
            if registry
                .enum_for_tag(effective)
                .map_or(false, |def| def.is_bitmask())
            {
                Value::String(registry.format_int(effective, v))
            } else {
                Value::Number(v.into())
            }
        }
        TtlvType::LongInteger => {
            let v = node.value_long_integer();
            if v.unsigned_abs() > MAX_SAFE_JSON_INT {
                Value::String(format!("0x{:016X}", v as u64))
            } else {
                Value::Number(v.into())
            }
        }
        TtlvType::BigInteger => match node.value_big_integer().to_i64() {
            Some(v) if v.unsigned_abs() <= MAX_SAFE_JSON_INT => Value::Number(v.into()),
            _ => Value::String(format!("0x{}", hex::encode_upper(node.value_raw()))),
        },
        TtlvType::Enumeration => {
            Value::String(registry.format_enum(effective, node.value_enumeration()))
        }
        TtlvType::Boolean => Value::Bool(node.value_boolean()),
        TtlvType::TextString => Value::String(
            node.value_text_string()
                .map_err(|e| e.locate(ErrorLocation::from(tag)))?
                .to_string(),
        ),
        TtlvType::ByteString => Value::String(hex::encode(node.value_byte_string())),
        TtlvType::DateTime => Value::String(
            render_date_time(node.value_date_time())
                .map_err(|e| e.locate(ErrorLocation::from(tag).with_type(r#type)))?,
        ),
        TtlvType::Interval => Value::Number(node.value_interval().into()),
        TtlvType::DateTimeExtended => Value::String(
            render_date_time_extended(node.value_date_time_extended())
                .map_err(|e| e.locate(ErrorLocation::from(tag).with_type(r#type)))?,
        ),
    };
    obj.insert("value".to_string(), value);
    Ok(Value::Object(obj))
}

// --- Unmarshal ------------------------------------------------------------------------------------------------------

/// Parses the JSON encoding back into canonical TTLV bytes.
pub fn from_str<R>(json: &str, registry: &R) -> Result<Vec<u8>>
where
    R: SymbolRegistry + ?Sized,
{
    let value: Value = serde_json::from_str(json)?;
    from_value(&value, registry)
}

/// Parses the JSON encoding from raw bytes back into canonical TTLV bytes.
pub fn from_slice<R>(json: &[u8], registry: &R) -> Result<Vec<u8>>
where
    R: SymbolRegistry + ?Sized,
{
    let value: Value = serde_json::from_slice(json)?;
    from_value(&value, registry)
}

/// Parses a [serde_json::Value] tree back into canonical TTLV bytes.
pub fn from_value<R>(value: &Value, registry: &R) -> Result<Vec<u8>>
where
    R: SymbolRegistry + ?Sized,
{
    trace!("parsing JSON value as TTLV");
    let mut enc = TtlvEncoder::new();
    encode_item(value, &mut enc, registry, &mut None)?;
    Ok(enc.into_vec())
}

fn encode_item<R>(
    value: &Value,
    enc: &mut TtlvEncoder,
    registry: &R,
    attr_tag: &mut Option<TtlvTag>,
) -> Result<()>
where
    R: SymbolRegistry + ?Sized,
{
    let obj = value
        .as_object()
        .ok_or_else(|| ErrorKind::Syntax("expected a TTLV JSON object".to_string()))?;

    let tag_text = obj
        .get("tag")
        .and_then(Value::as_str)
        .ok_or_else(|| ErrorKind::Syntax("missing tag member".to_string()))?;
    let tag = registry.parse_tag(tag_text)?;

    // A missing type member denotes a Structure.
    let r#type = match obj.get("type") {
        None => TtlvType::Structure,
        Some(Value::String(s)) => registry.parse_type(s)?,
        Some(_) => {
            return Err(Error::pinpoint(
                ErrorKind::Syntax("type member must be a string".to_string()),
                ErrorLocation::from(tag),
            ));
        }
    };

    let raw = obj.get("value").ok_or_else(|| {
        Error::pinpoint(
            ErrorKind::Syntax("missing value member".to_string()),
            ErrorLocation::from(tag).with_type(r#type),
        )
    })?;

    if r#type == TtlvType::Structure {
        let children = raw.as_array().ok_or_else(|| {
            Error::pinpoint(
                ErrorKind::Syntax("Structure value must be an array".to_string()),
                ErrorLocation::from(tag),
            )
        })?;
        let handle = enc.begin_structure(tag);
        let mut inner_attr_tag = None;
        for child in children {
            encode_item(child, enc, registry, &mut inner_attr_tag)?;
        }
        enc.end_structure(handle);
        return Ok(());
    }

    let effective = if tag == TAG_ATTRIBUTE_VALUE {
        attr_tag.unwrap_or(tag)
    } else {
        tag
    };

    encode_leaf(enc, tag, r#type, effective, raw, registry)
        .map_err(|e| e.locate(ErrorLocation::from(effective).with_type(r#type)))?;

    if tag == TAG_ATTRIBUTE_NAME && r#type == TtlvType::TextString {
        *attr_tag = raw.as_str().and_then(|s| registry.parse_tag(s).ok());
    }
    Ok(())
}

fn encode_leaf<R>(
    enc: &mut TtlvEncoder,
    tag: TtlvTag,
    r#type: TtlvType,
    effective: TtlvTag,
    raw: &Value,
    registry: &R,
) -> Result<()>
where
    R: SymbolRegistry + ?Sized,
{
    match r#type {
        TtlvType::Structure => {
            return Err(ErrorKind::Syntax("Structure handled by caller".to_string()).into());
        }
        TtlvType::Integer => {
            let v = match raw {
                Value::Number(n) => n
                    .as_i64()
                    .and_then(|v| i32::try_from(v).ok())
                    .ok_or_else(|| ErrorKind::InvalidNumber(n.to_string()))?,
                Value::String(s) => registry.parse_int(effective, s)?,
                _ => return Err(invalid_member("Integer")),
            };
            enc.write_integer(tag, v);
        }
        TtlvType::LongInteger => {
            let v = match raw {
                Value::Number(n) => n
                    .as_i64()
                    .ok_or_else(|| ErrorKind::InvalidNumber(n.to_string()))?,
                Value::String(s) => parse_i64_text(s)?,
                _ => return Err(invalid_member("LongInteger")),
            };
            enc.write_long_integer(tag, v);
        }
        TtlvType::BigInteger => {
            let v = match raw {
                Value::Number(n) => BigInt::from(
                    n.as_i64()
                        .ok_or_else(|| ErrorKind::InvalidNumber(n.to_string()))?,
                ),
                Value::String(s) => {
                    let digits = s.strip_prefix("0x").ok_or_else(|| {
                        ErrorKind::InvalidNumber(s.to_string())
                    })?;
                    if digits.len() % 2 != 0 {
                        return Err(ErrorKind::BigIntegerBadAlignment(digits.len()).into());
                    }
                    BigInt::from_signed_bytes_be(&parse_hex(digits)?)
                }
                _ => return Err(invalid_member("BigInteger")),
            };
            enc.write_big_integer(tag, &v);
        }
        TtlvType::Enumeration => {
            let v = match raw {
                Value::Number(n) => n
                    .as_u64()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| ErrorKind::InvalidNumber(n.to_string()))?,
                Value::String(s) => registry.parse_enum(effective, s)?,
                _ => return Err(invalid_member("Enumeration")),
            };
            enc.write_enumeration(tag, v);
        }
        TtlvType::Boolean => {
            let v = match raw {
                Value::Bool(b) => *b,
                // The hex rendition of the 8 value bytes is also admitted on input.
                Value::String(s) => match parse_i64_text(s)? {
                    0 => false,
                    1 => true,
                    _ => return Err(ErrorKind::InvalidNumber(s.to_string()).into()),
                },
                _ => return Err(invalid_member("Boolean")),
            };
            enc.write_boolean(tag, v);
        }
        TtlvType::TextString => {
            let v = raw.as_str().ok_or_else(|| invalid_member("TextString"))?;
            enc.write_text_string(tag, v);
        }
        TtlvType::ByteString => {
            let s = raw.as_str().ok_or_else(|| invalid_member("ByteString"))?;
            if s.starts_with("0x") {
                return Err(ErrorKind::InvalidHexPrefix("ByteString").into());
            }
            enc.write_byte_string(tag, &parse_hex(s)?);
        }
        TtlvType::DateTime => {
            let s = raw.as_str().ok_or_else(|| invalid_member("DateTime"))?;
            let v = if s.starts_with("0x") {
                parse_i64_text(s)?
            } else {
                parse_date_time(s)?
            };
            enc.write_date_time(tag, v);
        }
        TtlvType::Interval => {
            let v = match raw {
                Value::Number(n) => n
                    .as_u64()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| ErrorKind::InvalidNumber(n.to_string()))?,
                Value::String(s) => parse_u32_text(s)?,
                _ => return Err(invalid_member("Interval")),
            };
            enc.write_interval(tag, v);
        }
        TtlvType::DateTimeExtended => {
            let s = raw
                .as_str()
                .ok_or_else(|| invalid_member("DateTimeExtended"))?;
            let v = if s.starts_with("0x") {
                parse_i64_text(s)?
            } else {
                parse_date_time_extended(s)?
            };
            enc.write_date_time_extended(tag, v);
        }
    }
    Ok(())
}

fn invalid_member(r#type: &str) -> Error {
    ErrorKind::Syntax(format!("invalid JSON value for {}", r#type)).into()
}
