//! The symbol registry: tag, enumeration and bitmask name lookup for the textual encodings.
//!
//! The codec consumes a registry through the [SymbolRegistry] trait and ships no KMIP tables of its own; loading
//! the tag and enumeration names of a KMIP profile into a [SymbolTable] is the embedder's job. A registry is
//! expected to be deterministic and side-effect-free, and frozen once constructed so it can be shared freely.

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{ErrorKind, Result};
use crate::types::{TtlvTag, TtlvType};

/// The Attribute Name tag. Its text value selects the effective tag under which the value of the sibling
/// [Attribute Value](TAG_ATTRIBUTE_VALUE) item is resolved.
pub const TAG_ATTRIBUTE_NAME: TtlvTag = TtlvTag::new(0x42000A);

/// The Attribute Value tag. See [TAG_ATTRIBUTE_NAME].
pub const TAG_ATTRIBUTE_VALUE: TtlvTag = TtlvTag::new(0x42000B);

/// Reduces a name to its lookup key: ASCII alphanumerics only, lowercased.
///
/// This makes `Key Format Type`, `KeyFormatType` and `key-format-type` interchangeable on input, and lets the
/// textual value of an Attribute Name item be resolved as a tag name.
pub fn normalize_name(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// --- EnumDef --------------------------------------------------------------------------------------------------------

/// The enumeration or bitmask descriptor bound to a tag.
///
/// An Enumeration maps each value to one name. A bitmask additionally permits combining: its names denote single
/// bits and a value renders as the `|`-joined names of its set bits.
#[derive(Clone, Debug, Default)]
pub struct EnumDef {
    bitmask: bool,
    by_value: HashMap<u32, String>,
    by_name: HashMap<String, u32>,
}

impl EnumDef {
    pub fn new(bitmask: bool) -> Self {
        EnumDef {
            bitmask,
            ..Default::default()
        }
    }

    /// Adds a value under its canonical name.
    pub fn with_value(mut self, name: &str, value: u32) -> Self {
        self.by_value.insert(value, name.to_string());
        self.by_name.insert(normalize_name(name), value);
        self
    }

    pub fn is_bitmask(&self) -> bool {
        self.bitmask
    }

    /// The canonical name of a value, if registered.
    pub fn name_of(&self, value: u32) -> Option<&str> {
        self.by_value.get(&value).map(String::as_str)
    }

    /// The value registered under a name. Lookup is on the normalized form.
    pub fn value_of(&self, name: &str) -> Option<u32> {
        self.by_name.get(&normalize_name(name)).copied()
    }
}

// --- SymbolRegistry -------------------------------------------------------------------------------------------------

/// Bidirectional mapping between the numeric and the textual rendering of tags, enumerations and bitmasks.
///
/// Implementors supply the three lookups; the formatting and parsing operations are provided on top of them and
/// fall back to hexadecimal renditions whenever a symbol is not registered, so an empty registry still yields a
/// lossless textual encoding.
pub trait SymbolRegistry {
    /// The canonical name of a tag, if registered.
    fn tag_name(&self, tag: TtlvTag) -> Option<&str>;

    /// The tag registered under a [normalized](normalize_name) name.
    fn tag_value(&self, normalized_name: &str) -> Option<TtlvTag>;

    /// The enumeration or bitmask descriptor bound to a tag, if any.
    fn enum_for_tag(&self, tag: TtlvTag) -> Option<&EnumDef>;

    /// The canonical name of a tag, or its `0x`-prefixed six digit hex rendition.
    fn format_tag(&self, tag: TtlvTag) -> String {
        match self.tag_name(tag) {
            Some(name) => name.to_string(),
            None => tag.to_string(),
        }
    }

    /// Resolves a textual tag: a canonical name, a normalized name, or a `0x`-prefixed hex value.
    fn parse_tag(&self, s: &str) -> Result<TtlvTag> {
        if s.starts_with("0x") {
            return TtlvTag::from_str(s);
        }
        self.tag_value(&normalize_name(s))
            .ok_or_else(|| ErrorKind::UnknownTag(s.to_string()).into())
    }

    /// Resolves a textual type name, accepting both the camel case and the spaced form (`LongInteger`,
    /// `Long Integer`).
    fn parse_type(&self, s: &str) -> Result<TtlvType> {
        let r#type = match normalize_name(s).as_str() {
            "structure" => TtlvType::Structure,
            "integer" => TtlvType::Integer,
            "longinteger" => TtlvType::LongInteger,
            "biginteger" => TtlvType::BigInteger,
            "enumeration" => TtlvType::Enumeration,
            "boolean" => TtlvType::Boolean,
            "textstring" => TtlvType::TextString,
            "bytestring" => TtlvType::ByteString,
            "datetime" => TtlvType::DateTime,
            "interval" => TtlvType::Interval,
            "datetimeextended" => TtlvType::DateTimeExtended,
            _ => {
                return Err(ErrorKind::Syntax(format!("unknown TTLV type name: {}", s)).into());
            }
        };
        Ok(r#type)
    }

    /// The name of an enumeration value under the given tag, or its `0x`-prefixed eight digit hex rendition.
    fn format_enum(&self, tag: TtlvTag, value: u32) -> String {
        match self.enum_for_tag(tag).and_then(|def| def.name_of(value)) {
            Some(name) => name.to_string(),
            None => format!("0x{:08X}", value),
        }
    }

    /// Resolves a textual enumeration value: a registered name or a `0x`-prefixed hex value.
    fn parse_enum(&self, tag: TtlvTag, s: &str) -> Result<u32> {
        if let Some(digits) = s.strip_prefix("0x") {
            return u32::from_str_radix(digits, 16)
                .map_err(|_| ErrorKind::InvalidNumber(s.to_string()).into());
        }
        self.enum_for_tag(tag)
            .and_then(|def| def.value_of(s))
            .ok_or_else(|| ErrorKind::UnknownEnum(s.to_string()).into())
    }

    /// Formats an Integer value under the given tag.
    ///
    /// When the tag carries a bitmask binding the set bits render as their `|`-joined names, with any unregistered
    /// residue collected into one trailing hex component; otherwise the plain decimal rendition is returned.
    fn format_int(&self, tag: TtlvTag, value: i32) -> String {
        let def = match self.enum_for_tag(tag) {
            Some(def) if def.is_bitmask() => def,
            _ => return value.to_string(),
        };
        let bits = value as u32;
        let mut parts = Vec::new();
        let mut residue = 0u32;
        for shift in 0..32 {
            let bit = 1u32 << shift;
            if bits & bit == 0 {
                continue;
            }
            match def.name_of(bit) {
                Some(name) => parts.push(name.to_string()),
                None => residue |= bit,
            }
        }
        if residue != 0 {
            parts.push(format!("0x{:08X}", residue));
        }
        if parts.is_empty() {
            "0".to_string()
        } else {
            parts.join("|")
        }
    }

    /// Resolves a textual Integer value: `|`-separated components that are each a registered bit name, a
    /// `0x`-prefixed hex value, or a decimal number, OR-ed together.
    fn parse_int(&self, tag: TtlvTag, s: &str) -> Result<i32> {
        let mut bits = 0u32;
        for part in s.split('|') {
            let part = part.trim();
            if let Some(digits) = part.strip_prefix("0x") {
                let v = u32::from_str_radix(digits, 16)
                    .map_err(|_| ErrorKind::InvalidNumber(part.to_string()))?;
                bits |= v;
            } else if part
                .chars()
                .next()
                .map_or(false, |c| c.is_ascii_digit() || c == '-')
            {
                let v: i32 = part
                    .parse()
                    .map_err(|_| ErrorKind::InvalidNumber(part.to_string()))?;
                bits |= v as u32;
            } else {
                let v = self
                    .enum_for_tag(tag)
                    .and_then(|def| def.value_of(part))
                    .ok_or_else(|| ErrorKind::UnknownMaskBit(part.to_string()))?;
                bits |= v;
            }
        }
        Ok(bits as i32)
    }
}

// --- SymbolTable ----------------------------------------------------------------------------------------------------

/// A map-backed [SymbolRegistry].
///
/// An empty table is a usable registry: every symbol then renders in its hexadecimal form. Registration is meant
/// to happen once, at startup or in test setup; the table is read-only thereafter.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    names: HashMap<TtlvTag, String>,
    tags: HashMap<String, TtlvTag>,
    enums: HashMap<TtlvTag, EnumDef>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tag under its canonical name.
    pub fn register_tag(&mut self, tag: TtlvTag, name: &str) {
        self.names.insert(tag, name.to_string());
        self.tags.insert(normalize_name(name), tag);
    }

    /// Binds an enumeration or bitmask descriptor to a tag.
    pub fn register_enum(&mut self, tag: TtlvTag, def: EnumDef) {
        self.enums.insert(tag, def);
    }

    /// Builder form of [register_tag](Self::register_tag).
    pub fn with_tag(mut self, tag: TtlvTag, name: &str) -> Self {
        self.register_tag(tag, name);
        self
    }

    /// Builder form of [register_enum](Self::register_enum).
    pub fn with_enum(mut self, tag: TtlvTag, def: EnumDef) -> Self {
        self.register_enum(tag, def);
        self
    }
}

impl SymbolRegistry for SymbolTable {
    fn tag_name(&self, tag: TtlvTag) -> Option<&str> {
        self.names.get(&tag).map(String::as_str)
    }

    fn tag_value(&self, normalized_name: &str) -> Option<TtlvTag> {
        self.tags.get(normalized_name).copied()
    }

    fn enum_for_tag(&self, tag: TtlvTag) -> Option<&EnumDef> {
        self.enums.get(&tag)
    }
}
