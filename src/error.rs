//! Failure details and the location in the TTLV data at which they occurred.

use std::fmt::{self, Display};

use crate::types::{TtlvTag, TtlvType};

pub type Result<T> = std::result::Result<T, Error>;

// --- Error ----------------------------------------------------------------------------------------------------------

/// Details of a codec failure and the location in the data where the problem occurred.
///
/// An error consists of an [ErrorKind] that identifies the kind of error, and an [ErrorLocation] that describes
/// where in the TTLV tree or input text the problem occurred.
#[derive(Debug)]
#[non_exhaustive]
pub struct Error {
    kind: ErrorKind,
    location: ErrorLocation,
}

impl Error {
    pub(crate) fn pinpoint<K, L>(kind: K, location: L) -> Self
    where
        ErrorKind: From<K>,
        ErrorLocation: From<L>,
    {
        Self {
            kind: kind.into(),
            location: location.into(),
        }
    }

    /// Extends the location context of the error, keeping any detail already recorded closer to the fault.
    pub(crate) fn locate<L>(mut self, location: L) -> Self
    where
        ErrorLocation: From<L>,
    {
        self.location = self.location.merge(location.into());
        self
    }

    /// Get details about the kind of error that occurred.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Get details about where in the data the error occurred.
    pub fn location(&self) -> &ErrorLocation {
        &self.location
    }
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_unknown() {
            Display::fmt(&self.kind, f)
        } else {
            write!(f, "{} (at {})", self.kind, self.location)
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            location: ErrorLocation::unknown(),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        ErrorKind::Xml(err).into()
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        ErrorKind::Json(err).into()
    }
}

// --- ErrorKind ------------------------------------------------------------------------------------------------------

// Errors raised by the inner guts of the codec may occur in code that has no notion of its position within the
// bytes being read or written and so no way to indicate which item the error relates to. Hence why the kind of
// error is kept separate from the location of the error.

/// Details about the kind of error that occurred.
///
/// Errors fall into three groups:
///   - Structural errors raised while bounding TTLV bytes, from [HeaderTruncated](Self::HeaderTruncated) through
///     [InvalidTag](Self::InvalidTag).
///   - Value errors raised while interpreting or rendering a single item value, from
///     [InvalidValue](Self::InvalidValue) through [Syntax](Self::Syntax).
///   - Errors bridged from the XML and JSON tokenizers, i.e. [Xml](Self::Xml) and [Json](Self::Json).
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Fewer than the eight bytes of a TTLV header remain.
    HeaderTruncated,

    /// The declared value length runs past the end of the buffer.
    ValueTruncated { needed: usize, available: usize },

    /// The declared length is not admissible for the item type.
    InvalidLen { r#type: TtlvType, actual: u32 },

    /// The type byte is not one of the known type codes.
    InvalidType(u8),

    /// The tag high byte is outside the canonical and vendor extension ranges.
    InvalidTag(u32),

    /// The value bytes are not valid for the item type (e.g. a TextString that is not UTF-8).
    InvalidValue(TtlvType),

    /// A textual tag is neither a registered name nor a hexadecimal tag value.
    UnknownTag(String),

    /// A textual enumeration value is neither a registered name nor a hexadecimal value.
    UnknownEnum(String),

    /// A textual mask component is not a registered bit name.
    UnknownMaskBit(String),

    /// A `0x` prefix on a value that the textual encodings require to be bare hex.
    InvalidHexPrefix(&'static str),

    /// A textual number could not be parsed for the item type.
    InvalidNumber(String),

    /// A textual date-time is not valid RFC 3339, or the instant is not representable.
    InvalidDateTime(String),

    /// A textual Big Integer whose hex digit count does not form whole bytes.
    BigIntegerBadAlignment(usize),

    /// The shape of the textual input does not match the encoding (missing member, stray content, ...).
    Syntax(String),

    /// An error reported by the XML tokenizer.
    Xml(quick_xml::Error),

    /// An error reported by the JSON parser or serializer.
    Json(serde_json::Error),
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::HeaderTruncated => f.write_str("TTLV header truncated"),
            ErrorKind::ValueTruncated { needed, available } => write!(
                f,
                "TTLV value truncated: {} bytes needed but only {} available",
                needed, available
            ),
            ErrorKind::InvalidLen { r#type, actual } => {
                write!(f, "invalid length {} for {}", actual, r#type)
            }
            ErrorKind::InvalidType(v) => write!(f, "invalid TTLV type byte 0x{:02X}", v),
            ErrorKind::InvalidTag(v) => write!(f, "invalid TTLV tag 0x{:06X}", v),
            ErrorKind::InvalidValue(r#type) => write!(f, "invalid value for {}", r#type),
            ErrorKind::UnknownTag(s) => write!(f, "unknown tag: {}", s),
            ErrorKind::UnknownEnum(s) => {
                write!(f, "invalid Enumeration: unknown name: {}", s)
            }
            ErrorKind::UnknownMaskBit(s) => {
                write!(f, "invalid Integer: unknown mask bit name: {}", s)
            }
            ErrorKind::InvalidHexPrefix(what) => {
                write!(f, "{} value must not carry a 0x prefix", what)
            }
            ErrorKind::InvalidNumber(s) => write!(f, "invalid number: {}", s),
            ErrorKind::InvalidDateTime(s) => write!(f, "invalid date-time: {}", s),
            ErrorKind::BigIntegerBadAlignment(digits) => write!(
                f,
                "invalid BigInteger: {} hex digits do not form whole bytes",
                digits
            ),
            ErrorKind::Syntax(s) => f.write_str(s),
            ErrorKind::Xml(e) => write!(f, "XML error: {}", e),
            ErrorKind::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

// --- ErrorLocation --------------------------------------------------------------------------------------------------

/// Details about where in the data the error occurred.
#[derive(Clone, Debug, Default)]
pub struct ErrorLocation {
    offset: Option<usize>,
    parent_tags: Vec<TtlvTag>,
    tag: Option<TtlvTag>,
    r#type: Option<TtlvType>,
}

impl ErrorLocation {
    pub(crate) fn at(offset: usize) -> Self {
        Self {
            offset: Some(offset),
            ..Default::default()
        }
    }

    // Use `at()` or one of the `with_*` builders instead when a byte offset or TTLV location is known.
    pub(crate) fn unknown() -> Self {
        Self::default()
    }

    pub(crate) fn with_parent_tags(mut self, parent_tags: &[TtlvTag]) -> Self {
        if self.parent_tags.is_empty() {
            self.parent_tags.extend(parent_tags);
        }
        self
    }

    pub(crate) fn with_tag(mut self, tag: TtlvTag) -> Self {
        let _ = self.tag.get_or_insert(tag);
        self
    }

    pub(crate) fn with_type(mut self, r#type: TtlvType) -> Self {
        let _ = self.r#type.get_or_insert(r#type);
        self
    }

    pub(crate) fn merge(mut self, loc: ErrorLocation) -> Self {
        if let Some(offset) = loc.offset {
            let _ = self.offset.get_or_insert(offset);
        }
        self = self.with_parent_tags(&loc.parent_tags);
        if let Some(tag) = loc.tag {
            self = self.with_tag(tag);
        }
        if let Some(r#type) = loc.r#type {
            self = self.with_type(r#type);
        }
        self
    }

    pub fn is_unknown(&self) -> bool {
        self.offset.is_none() && self.parent_tags.is_empty() && self.tag.is_none() && self.r#type.is_none()
    }

    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// The tags of the structures enclosing the faulting item, outermost first.
    pub fn parent_tags(&self) -> &[TtlvTag] {
        &self.parent_tags
    }

    pub fn tag(&self) -> Option<TtlvTag> {
        self.tag
    }

    pub fn r#type(&self) -> Option<TtlvType> {
        self.r#type
    }
}

impl From<TtlvTag> for ErrorLocation {
    fn from(tag: TtlvTag) -> Self {
        Self {
            tag: Some(tag),
            ..Default::default()
        }
    }
}

impl From<usize> for ErrorLocation {
    fn from(offset: usize) -> Self {
        Self::at(offset)
    }
}

impl Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            return f.write_str("unknown");
        }

        let mut sep = "";
        if let Some(offset) = self.offset {
            write!(f, "pos: {} bytes", offset)?;
            sep = ", ";
        }
        if !self.parent_tags.is_empty() {
            write!(f, "{}parent tags: ", sep)?;
            for (i, tag) in self.parent_tags.iter().enumerate() {
                if i > 0 {
                    f.write_str(" > ")?;
                }
                Display::fmt(tag, f)?;
            }
            sep = ", ";
        }
        if let Some(tag) = self.tag {
            write!(f, "{}tag: {}", sep, tag)?;
            sep = ", ";
        }
        if let Some(r#type) = self.r#type {
            write!(f, "{}type: {}", sep, r#type)?;
        }

        Ok(())
    }
}
