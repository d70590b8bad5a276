//! The KMIP XML encoding of TTLV.
//!
//! Each TTLV item becomes one element. The element name is the tag's registered name, or `TTLV` with a `tag`
//! attribute when the tag is not registered. Leaf items carry `type` and `value` attributes; a Structure carries
//! neither and nests its children as child elements.
//!
//! ```
//! use ttlv_codec::{xml, SymbolTable, TtlvEncoder, TtlvTag, TtlvView};
//!
//! let registry = SymbolTable::new().with_tag(TtlvTag::new(0x42000D), "BatchCount");
//! let mut enc = TtlvEncoder::new();
//! enc.write_integer(TtlvTag::new(0x42000D), 1);
//! let bytes = enc.into_vec();
//!
//! let text = xml::to_string(TtlvView::new(&bytes), &registry)?;
//! assert_eq!(text, r#"<BatchCount type="Integer" value="1"/>"#);
//! assert_eq!(xml::from_str(&text, &registry)?, bytes);
//! # Ok::<(), ttlv_codec::Error>(())
//! ```

use std::io::Write;
use std::str::FromStr;

use num_bigint::BigInt;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use tracing::trace;

use crate::enc::{StructHandle, TtlvEncoder};
use crate::error::{Error, ErrorKind, ErrorLocation, Result};
use crate::registry::{SymbolRegistry, TAG_ATTRIBUTE_NAME, TAG_ATTRIBUTE_VALUE};
use crate::types::{TtlvTag, TtlvType};
use crate::util::{
    parse_date_time, parse_date_time_extended, parse_hex, parse_i64_text, parse_u32_text,
    render_date_time, render_date_time_extended,
};
use crate::view::TtlvView;

// --- Marshal --------------------------------------------------------------------------------------------------------

/// Renders a TTLV item (and its whole subtree) as an XML string.
pub fn to_string<R>(ttlv: TtlvView<'_>, registry: &R) -> Result<String>
where
    R: SymbolRegistry + ?Sized,
{
    let mut out = Vec::new();
    to_writer(&mut out, ttlv, registry)?;
    String::from_utf8(out)
        .map_err(|_| ErrorKind::Syntax("generated XML is not UTF-8".to_string()).into())
}

/// Renders a TTLV item as XML into the given writer.
pub fn to_writer<W, R>(writer: W, ttlv: TtlvView<'_>, registry: &R) -> Result<()>
where
    W: Write,
    R: SymbolRegistry + ?Sized,
{
    trace!("rendering {} TTLV bytes as XML", ttlv.as_bytes().len());
    ttlv.valid()?;
    let mut xml_writer = Writer::new(writer);
    emit_item(&mut xml_writer, ttlv, registry, None)
}

fn emit_item<W, R>(
    writer: &mut Writer<W>,
    node: TtlvView<'_>,
    registry: &R,
    effective: Option<TtlvTag>,
) -> Result<()>
where
    W: Write,
    R: SymbolRegistry + ?Sized,
{
    let tag = node.tag();
    let r#type = node.ttlv_type()?;
    let (name, tag_attr) = match registry.tag_name(tag) {
        Some(name) => (name.to_string(), None),
        None => ("TTLV".to_string(), Some(tag.to_string())),
    };

    let mut elem = BytesStart::new(name.as_str());
    if let Some(tag_attr) = &tag_attr {
        elem.push_attribute(("tag", tag_attr.as_str()));
    }

    if r#type == TtlvType::Structure {
        writer.write_event(Event::Start(elem))?;
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
            emit_item(writer, child, registry, child_effective)?;
        }
        writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
    } else {
        let effective = effective.unwrap_or(tag);
        let value = render_value(&node, r#type, effective, registry)
            .map_err(|e| e.locate(ErrorLocation::from(tag).with_type(r#type)))?;
        elem.push_attribute(("type", r#type.name()));
        elem.push_attribute(("value", value.as_str()));
        writer.write_event(Event::Empty(elem))?;
    }
    Ok(())
}

fn render_value<R>(
    node: &TtlvView<'_>,
    r#type: TtlvType,
    effective: TtlvTag,
    registry: &R,
) -> Result<String>
where
    R: SymbolRegistry + ?Sized,
{
    let value = match r#type {
        TtlvType::Structure => String::new(),
        // Bitmask components are separated by spaces in XML rather than by the pipes the registry speaks.
        TtlvType::Integer => registry
            .format_int(effective, node.value_integer())
            .replace('|', " "),
        TtlvType::LongInteger => node.value_long_integer().to_string(),
        TtlvType::BigInteger => hex::encode_upper(node.value_raw()),
        TtlvType::Enumeration => registry.format_enum(effective, node.value_enumeration()),
        TtlvType::Boolean => node.value_boolean().to_string(),
        TtlvType::TextString => node.value_text_string()?.to_string(),
        TtlvType::ByteString => hex::encode(node.value_byte_string()),
        TtlvType::DateTime => render_date_time(node.value_date_time())?,
        TtlvType::Interval => node.value_interval().to_string(),
        TtlvType::DateTimeExtended => {
            render_date_time_extended(node.value_date_time_extended())?
        }
    };
    Ok(value)
}

// --- Unmarshal ------------------------------------------------------------------------------------------------------

enum StackEntry {
    Structure {
        handle: StructHandle,
        attr_tag: Option<TtlvTag>,
    },
    Leaf,
}

/// Parses the XML encoding back into canonical TTLV bytes.
///
/// The input must hold exactly one top-level element. Failures name the offending tag and the syntactic
/// expectation.
pub fn from_str<R>(xml: &str, registry: &R) -> Result<Vec<u8>>
where
    R: SymbolRegistry + ?Sized,
{
    trace!("parsing {} bytes of XML as TTLV", xml.len());
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut enc = TtlvEncoder::new();
    let mut stack: Vec<StackEntry> = Vec::new();
    let mut root_done = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if root_done {
                    return Err(
                        ErrorKind::Syntax("more than one top-level element".to_string()).into(),
                    );
                }
                open_element(&e, &mut enc, &mut stack, registry, false)?;
            }
            Event::Empty(e) => {
                if root_done {
                    return Err(
                        ErrorKind::Syntax("more than one top-level element".to_string()).into(),
                    );
                }
                open_element(&e, &mut enc, &mut stack, registry, true)?;
                if stack.is_empty() {
                    root_done = true;
                }
            }
            Event::End(_) => {
                match stack.pop() {
                    Some(StackEntry::Structure { handle, .. }) => enc.end_structure(handle),
                    Some(StackEntry::Leaf) => {}
                    None => {
                        return Err(
                            ErrorKind::Syntax("unbalanced closing element".to_string()).into()
                        );
                    }
                }
                if stack.is_empty() {
                    root_done = true;
                }
            }
            Event::Text(t) => {
                // Whitespace-only runs were trimmed away; anything left is content the encoding does not use.
                let text = t.unescape()?;
                return Err(ErrorKind::Syntax(format!(
                    "unexpected text content: {:?}",
                    text.as_ref()
                ))
                .into());
            }
            Event::CData(_) => {
                return Err(ErrorKind::Syntax("unexpected CDATA content".to_string()).into());
            }
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if !stack.is_empty() {
        return Err(ErrorKind::Syntax("unclosed element at end of input".to_string()).into());
    }
    if !root_done {
        return Err(ErrorKind::Syntax("no TTLV element found".to_string()).into());
    }
    Ok(enc.into_vec())
}

fn open_element<R>(
    e: &BytesStart<'_>,
    enc: &mut TtlvEncoder,
    stack: &mut Vec<StackEntry>,
    registry: &R,
    self_closing: bool,
) -> Result<()>
where
    R: SymbolRegistry + ?Sized,
{
    let (tag, r#type, value) = element_parts(e, registry)?;

    if r#type == TtlvType::Structure {
        let handle = enc.begin_structure(tag);
        if self_closing {
            enc.end_structure(handle);
        } else {
            stack.push(StackEntry::Structure {
                handle,
                attr_tag: None,
            });
        }
        return Ok(());
    }

    let value = value.ok_or_else(|| {
        Error::pinpoint(
            ErrorKind::Syntax("missing value attribute".to_string()),
            ErrorLocation::from(tag).with_type(r#type),
        )
    })?;

    let attr_tag = match stack.last() {
        Some(StackEntry::Structure { attr_tag, .. }) => *attr_tag,
        _ => None,
    };
    let effective = if tag == TAG_ATTRIBUTE_VALUE {
        attr_tag.unwrap_or(tag)
    } else {
        tag
    };

    encode_leaf(enc, tag, r#type, effective, &value, registry)
        .map_err(|e| e.locate(ErrorLocation::from(effective).with_type(r#type)))?;

    if tag == TAG_ATTRIBUTE_NAME && r#type == TtlvType::TextString {
        if let Some(StackEntry::Structure { attr_tag, .. }) = stack.last_mut() {
            *attr_tag = registry.parse_tag(&value).ok();
        }
    }
    if !self_closing {
        stack.push(StackEntry::Leaf);
    }
    Ok(())
}

fn element_parts<R>(e: &BytesStart<'_>, registry: &R) -> Result<(TtlvTag, TtlvType, Option<String>)>
where
    R: SymbolRegistry + ?Sized,
{
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|_| ErrorKind::Syntax("element name is not UTF-8".to_string()))?
        .to_string();

    let mut tag_attr = None;
    let mut type_attr = None;
    let mut value_attr = None;
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::InvalidAttr)?;
        let value = attr.unescape_value()?.into_owned();
        match attr.key.as_ref() {
            b"tag" => tag_attr = Some(value),
            b"type" => type_attr = Some(value),
            b"value" => value_attr = Some(value),
            other => {
                return Err(ErrorKind::Syntax(format!(
                    "unexpected attribute on {}: {}",
                    name,
                    String::from_utf8_lossy(other)
                ))
                .into());
            }
        }
    }

    let tag = if name == "TTLV" {
        let tag_attr = tag_attr.ok_or_else(|| {
            ErrorKind::Syntax("TTLV element requires a tag attribute".to_string())
        })?;
        TtlvTag::from_str(&tag_attr)?
    } else {
        registry.parse_tag(&name)?
    };

    let r#type = match type_attr {
        Some(s) => registry.parse_type(&s)?,
        None => TtlvType::Structure,
    };
    Ok((tag, r#type, value_attr))
}

fn encode_leaf<R>(
    enc: &mut TtlvEncoder,
    tag: TtlvTag,
    r#type: TtlvType,
    effective: TtlvTag,
    value: &str,
    registry: &R,
) -> Result<()>
where
    R: SymbolRegistry + ?Sized,
{
    match r#type {
        TtlvType::Structure => {
            return Err(ErrorKind::Syntax("Structure cannot carry a value".to_string()).into());
        }
        // XML separates bitmask components by spaces; the registry speaks pipes.
        TtlvType::Integer => {
            enc.write_integer(tag, registry.parse_int(effective, &value.replace(' ', "|"))?)
        }
        TtlvType::LongInteger => enc.write_long_integer(tag, parse_i64_text(value)?),
        TtlvType::BigInteger => {
            if value.starts_with("0x") {
                return Err(ErrorKind::InvalidHexPrefix("BigInteger").into());
            }
            if value.len() % 2 != 0 {
                return Err(ErrorKind::BigIntegerBadAlignment(value.len()).into());
            }
            let bytes = parse_hex(value)?;
            enc.write_big_integer(tag, &BigInt::from_signed_bytes_be(&bytes));
        }
        TtlvType::Enumeration => enc.write_enumeration(tag, registry.parse_enum(effective, value)?),
        TtlvType::Boolean => {
            let v = match value {
                "true" => true,
                "false" => false,
                _ => {
                    return Err(
                        ErrorKind::Syntax(format!("invalid Boolean value: {}", value)).into()
                    );
                }
            };
            enc.write_boolean(tag, v);
        }
        TtlvType::TextString => enc.write_text_string(tag, value),
        TtlvType::ByteString => {
            if value.starts_with("0x") {
                return Err(ErrorKind::InvalidHexPrefix("ByteString").into());
            }
            enc.write_byte_string(tag, &parse_hex(value)?);
        }
        TtlvType::DateTime => enc.write_date_time(tag, parse_date_time(value)?),
        TtlvType::Interval => enc.write_interval(tag, parse_u32_text(value)?),
        TtlvType::DateTimeExtended => {
            enc.write_date_time_extended(tag, parse_date_time_extended(value)?)
        }
    }
    Ok(())
}
