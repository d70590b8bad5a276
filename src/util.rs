//! Diagnostic rendering of TTLV bytes, and the textual value forms shared by the XML and JSON codecs.

use chrono::{DateTime, LocalResult, SecondsFormat, TimeZone, Utc};

use crate::error::{ErrorKind, Result};
use crate::registry::SymbolRegistry;
use crate::types::TtlvType;
use crate::view::{TtlvView, HEADER_LEN};

// --- Textual value forms --------------------------------------------------------------------------------------------

/// Renders POSIX seconds as RFC 3339.
pub(crate) fn render_date_time(seconds: i64) -> Result<String> {
    match Utc.timestamp_opt(seconds, 0) {
        LocalResult::Single(dt) => Ok(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        _ => Err(ErrorKind::InvalidDateTime(seconds.to_string()).into()),
    }
}

/// Renders microseconds since the epoch as RFC 3339, with sub-second digits only when nonzero.
pub(crate) fn render_date_time_extended(microseconds: i64) -> Result<String> {
    let seconds = microseconds.div_euclid(1_000_000);
    let nanos = (microseconds.rem_euclid(1_000_000) * 1_000) as u32;
    match Utc.timestamp_opt(seconds, nanos) {
        LocalResult::Single(dt) => Ok(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        _ => Err(ErrorKind::InvalidDateTime(microseconds.to_string()).into()),
    }
}

/// Parses an RFC 3339 date-time to POSIX seconds.
pub(crate) fn parse_date_time(s: &str) -> Result<i64> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp())
        .map_err(|_| ErrorKind::InvalidDateTime(s.to_string()).into())
}

/// Parses an RFC 3339 date-time to microseconds since the epoch.
pub(crate) fn parse_date_time_extended(s: &str) -> Result<i64> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp_micros())
        .map_err(|_| ErrorKind::InvalidDateTime(s.to_string()).into())
}

/// Parses a signed 64-bit number: decimal, or the raw value bytes as `0x`-prefixed hex.
pub(crate) fn parse_i64_text(s: &str) -> Result<i64> {
    let parsed = if let Some(digits) = s.strip_prefix("0x") {
        u64::from_str_radix(digits, 16).map(|v| v as i64)
    } else {
        s.parse()
    };
    parsed.map_err(|_| ErrorKind::InvalidNumber(s.to_string()).into())
}

/// Parses an unsigned 32-bit number: decimal, or `0x`-prefixed hex.
pub(crate) fn parse_u32_text(s: &str) -> Result<u32> {
    let parsed = if let Some(digits) = s.strip_prefix("0x") {
        u32::from_str_radix(digits, 16)
    } else {
        s.parse()
    };
    parsed.map_err(|_| ErrorKind::InvalidNumber(s.to_string()).into())
}

/// Decodes bare hex digits to bytes.
pub(crate) fn parse_hex(s: &str) -> Result<Vec<u8>> {
    hex::decode(s).map_err(|_| ErrorKind::InvalidNumber(s.to_string()).into())
}

// --- PrettyPrinter --------------------------------------------------------------------------------------------------

/// Best-effort human-readable rendering of TTLV bytes.
///
/// The printer never fails: items that cannot be bounded are rendered inline as a hex remnant and the walk stops
/// there, so damaged captures still produce useful output. Tag and enumeration names are resolved through the
/// supplied registry.
pub struct PrettyPrinter<'r, R: SymbolRegistry + ?Sized> {
    registry: &'r R,
}

impl<'r, R: SymbolRegistry + ?Sized> PrettyPrinter<'r, R> {
    pub fn new(registry: &'r R) -> Self {
        PrettyPrinter { registry }
    }

    /// Renders the given TTLV bytes as an indented tree, one item per line.
    pub fn to_string(&self, bytes: &[u8]) -> String {
        let mut out = String::new();
        self.render_siblings(TtlvView::new(bytes), 0, &mut out);
        out
    }

    /// Renders the given TTLV bytes in a compact single-line form with all values except enumerations redacted,
    /// suitable for logging requests and responses without exposing key material.
    pub fn to_diag_string(&self, bytes: &[u8]) -> String {
        let mut out = String::new();
        self.render_diag(TtlvView::new(bytes), &mut out);
        out
    }

    fn bounded(&self, node: &TtlvView<'_>) -> bool {
        node.as_bytes().len() >= HEADER_LEN
            && node
                .full_len()
                .map_or(false, |n| n <= node.as_bytes().len())
    }

    fn render_siblings(&self, first: TtlvView<'_>, depth: usize, out: &mut String) {
        let mut cursor = first;
        while !cursor.is_empty() {
            let indent = "  ".repeat(depth);
            if !self.bounded(&cursor) {
                out.push_str(&indent);
                out.push_str("!! invalid bytes: ");
                out.push_str(&hex_remnant(cursor.as_bytes()));
                out.push('\n');
                return;
            }
            let r#type = match cursor.ttlv_type() {
                Ok(t) => t,
                Err(_) => return,
            };
            out.push_str(&indent);
            out.push_str(&self.registry.format_tag(cursor.tag()));
            out.push_str(" (");
            out.push_str(r#type.name());
            out.push_str(")");
            if r#type == TtlvType::Structure {
                out.push_str(":\n");
                self.render_siblings(cursor.value_structure(), depth + 1, out);
            } else {
                out.push_str(": ");
                out.push_str(&self.render_value(&cursor, r#type));
                out.push('\n');
            }
            cursor = cursor.next();
        }
    }

    fn render_value(&self, node: &TtlvView<'_>, r#type: TtlvType) -> String {
        match r#type {
            TtlvType::Structure => String::new(),
            TtlvType::Integer => self.registry.format_int(node.tag(), node.value_integer()),
            TtlvType::LongInteger => node.value_long_integer().to_string(),
            TtlvType::BigInteger => node.value_big_integer().to_string(),
            TtlvType::Enumeration => self
                .registry
                .format_enum(node.tag(), node.value_enumeration()),
            TtlvType::Boolean => node.value_boolean().to_string(),
            TtlvType::TextString => match node.value_text_string() {
                Ok(s) => format!("{:?}", s),
                Err(_) => hex_remnant(node.value_raw()),
            },
            TtlvType::ByteString => hex_remnant(node.value_byte_string()),
            TtlvType::DateTime => render_date_time(node.value_date_time())
                .unwrap_or_else(|_| node.value_date_time().to_string()),
            TtlvType::Interval => node.value_interval().to_string(),
            TtlvType::DateTimeExtended => {
                render_date_time_extended(node.value_date_time_extended())
                    .unwrap_or_else(|_| node.value_date_time_extended().to_string())
            }
        }
    }

    fn render_diag(&self, first: TtlvView<'_>, out: &mut String) {
        let mut cursor = first;
        let mut sep = "";
        while !cursor.is_empty() {
            out.push_str(sep);
            sep = ",";
            if !self.bounded(&cursor) {
                out.push('!');
                return;
            }
            out.push_str(&format!("{:06X}", *cursor.tag()));
            match cursor.ttlv_type() {
                Ok(TtlvType::Structure) => {
                    out.push('[');
                    self.render_diag(cursor.value_structure(), out);
                    out.push(']');
                }
                Ok(TtlvType::Enumeration) => {
                    out.push_str(&format!("={}", cursor.value_enumeration()));
                }
                _ => {}
            }
            cursor = cursor.next();
        }
    }
}

fn hex_remnant(bytes: &[u8]) -> String {
    const CAP: usize = 32;
    if bytes.len() > CAP {
        format!("{}.. ({} bytes)", hex::encode(&bytes[..CAP]), bytes.len())
    } else {
        hex::encode(bytes)
    }
}
