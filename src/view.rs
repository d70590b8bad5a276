//! Zero-copy inspection of TTLV bytes.
//!
//! A [TtlvView] is a borrowed byte range whose prefix is interpreted as one TTLV item. It owns nothing and never
//! copies; the typed accessors project the value bytes into Rust scalars, allocating only where the projection
//! itself requires it (Big Integers). Header accessors are total: on a truncated header they return zero rather
//! than fault, so best-effort tools such as the [pretty printer](crate::util::PrettyPrinter) can walk damaged
//! input. Strict checking is opt-in through [TtlvView::valid].
//!
//! ```
//! use ttlv_codec::TtlvView;
//!
//! let wire = b"\x42\x00\x20\x02\x00\x00\x00\x04\x00\x00\x00\x08\x00\x00\x00\x00";
//! let ttlv = TtlvView::new(wire);
//! ttlv.valid()?;
//! assert_eq!(*ttlv.tag(), 0x420020);
//! assert_eq!(ttlv.value_integer(), 8);
//! # Ok::<(), ttlv_codec::Error>(())
//! ```

use std::convert::TryFrom;
use std::fmt::{self, Debug};

use num_bigint::BigInt;

use crate::error::{Error, ErrorKind, ErrorLocation, Result};
use crate::types::{calc_pad_bytes, TtlvTag, TtlvType, TtlvValue};

/// The number of bytes in a TTLV header: 3 byte tag, 1 byte type, 4 byte big-endian length.
pub const HEADER_LEN: usize = 8;

// E.g. define_fixed_width_value_accessor!(value_integer, i32, 4) defines an accessor that reads the first 4 value
// bytes as a big-endian i32, returning 0 when fewer than 4 value bytes are available.
macro_rules! define_fixed_width_value_accessor {
    ($(#[$meta:meta])* $fn_name:ident, $rust_type:ty, $width:literal) => {
        $(#[$meta])*
        pub fn $fn_name(&self) -> $rust_type {
            let v = self.value_raw();
            if v.len() < $width {
                return 0;
            }
            let mut raw = [0u8; $width];
            raw.copy_from_slice(&v[..$width]);
            <$rust_type>::from_be_bytes(raw)
        }
    };
}

// --- TtlvView -------------------------------------------------------------------------------------------------------

/// A borrowed byte range positioned at a TTLV item.
///
/// The bytes following the item may contain sibling items; [next](Self::next) advances over them during the walk
/// of a structure's children. The view is a cursor, not an owner: its lifetime is bounded by the backing buffer
/// and copying it is free.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct TtlvView<'a> {
    buf: &'a [u8],
}

impl<'a> TtlvView<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        TtlvView { buf }
    }

    /// The bytes from the current position to the end of the backing range.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    /// True when no bytes remain, i.e. the sibling walk is exhausted.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The item tag, or a zero tag when the header is truncated.
    pub fn tag(&self) -> TtlvTag {
        if self.buf.len() < HEADER_LEN {
            TtlvTag::new(0)
        } else {
            TtlvTag::from([self.buf[0], self.buf[1], self.buf[2]])
        }
    }

    /// The raw type byte, or zero when the header is truncated.
    pub fn type_code(&self) -> u8 {
        if self.buf.len() < HEADER_LEN {
            0
        } else {
            self.buf[3]
        }
    }

    /// The item type, failing with [ErrorKind::InvalidType] on an unrecognized type byte.
    pub fn ttlv_type(&self) -> Result<TtlvType> {
        TtlvType::try_from(self.type_code()).map_err(|e| e.locate(ErrorLocation::from(self.tag())))
    }

    /// The declared value length, excluding padding, or zero when the header is truncated.
    pub fn len(&self) -> u32 {
        if self.buf.len() < HEADER_LEN {
            0
        } else {
            u32::from_be_bytes([self.buf[4], self.buf[5], self.buf[6], self.buf[7]])
        }
    }

    /// The total size of the item: header, value and trailing pad bytes.
    ///
    /// Integer, Enumeration and Interval values are followed by four pad bytes, TextString and ByteString values by
    /// the minimal pad to the next eight byte boundary. A Big Integer declares a length that is already a multiple
    /// of eight and carries no further pad. Fails only when the type byte is unrecognized.
    pub fn full_len(&self) -> Result<usize> {
        let len = self.len() as usize;
        let total = match self.ttlv_type()? {
            TtlvType::Integer
            | TtlvType::Enumeration
            | TtlvType::Interval
            | TtlvType::TextString
            | TtlvType::ByteString => HEADER_LEN + len + calc_pad_bytes(self.len()) as usize,
            _ => HEADER_LEN + len,
        };
        Ok(total)
    }

    /// The value bytes, clipped to the bytes actually available.
    pub fn value_raw(&self) -> &'a [u8] {
        if self.buf.len() < HEADER_LEN {
            return &[];
        }
        let end = (HEADER_LEN + self.len() as usize).min(self.buf.len());
        &self.buf[HEADER_LEN..end]
    }

    define_fixed_width_value_accessor!(
        /// The value as a TTLV Integer: a 4-byte big-endian signed number.
        value_integer,
        i32,
        4
    );

    define_fixed_width_value_accessor!(
        /// The value as a TTLV Long Integer: an 8-byte big-endian signed number.
        value_long_integer,
        i64,
        8
    );

    define_fixed_width_value_accessor!(
        /// The value as a TTLV Enumeration: a 4-byte big-endian unsigned number.
        value_enumeration,
        u32,
        4
    );

    define_fixed_width_value_accessor!(
        /// The value as a TTLV Date-Time: POSIX seconds since the epoch.
        value_date_time,
        i64,
        8
    );

    define_fixed_width_value_accessor!(
        /// The value as a TTLV Date-Time Extended: microseconds since the epoch.
        value_date_time_extended,
        i64,
        8
    );

    define_fixed_width_value_accessor!(
        /// The value as a TTLV Interval: a 4-byte big-endian unsigned number of seconds.
        value_interval,
        u32,
        4
    );

    /// The value as a TTLV Boolean. Only the final value byte carries the truth indicator: nonzero means true.
    pub fn value_boolean(&self) -> bool {
        self.value_raw().last().map_or(false, |b| *b != 0)
    }

    /// The value as a TTLV Big Integer, allocating a [BigInt] from the big-endian two's complement value bytes.
    pub fn value_big_integer(&self) -> BigInt {
        BigInt::from_signed_bytes_be(self.value_raw())
    }

    /// The value as a TTLV Text String.
    ///
    /// The declared length is the byte count of the string; trailing pad bytes sit outside it and zero bytes
    /// within it are part of the string. Fails with [ErrorKind::InvalidValue] when the bytes are not UTF-8.
    pub fn value_text_string(&self) -> Result<&'a str> {
        std::str::from_utf8(self.value_raw()).map_err(|_| {
            Error::pinpoint(
                ErrorKind::InvalidValue(TtlvType::TextString),
                ErrorLocation::from(self.tag()).with_type(TtlvType::TextString),
            )
        })
    }

    /// The value as a TTLV Byte String.
    pub fn value_byte_string(&self) -> &'a [u8] {
        self.value_raw()
    }

    /// A view over the value bytes, positioned at the first child item of a TTLV Structure.
    pub fn value_structure(&self) -> TtlvView<'a> {
        TtlvView::new(self.value_raw())
    }

    /// The value in its polymorphic form.
    ///
    /// The typed accessors are the preferred path when the expected type is known; this form serves diagnostic
    /// walks over arbitrary trees.
    pub fn value(&self) -> Result<TtlvValue<'a>> {
        let value = match self.ttlv_type()? {
            TtlvType::Structure => TtlvValue::Structure(self.value_structure()),
            TtlvType::Integer => TtlvValue::Integer(self.value_integer()),
            TtlvType::LongInteger => TtlvValue::LongInteger(self.value_long_integer()),
            TtlvType::BigInteger => TtlvValue::BigInteger(self.value_big_integer()),
            TtlvType::Enumeration => TtlvValue::Enumeration(self.value_enumeration()),
            TtlvType::Boolean => TtlvValue::Boolean(self.value_boolean()),
            TtlvType::TextString => TtlvValue::TextString(self.value_text_string()?),
            TtlvType::ByteString => TtlvValue::ByteString(self.value_byte_string()),
            TtlvType::DateTime => TtlvValue::DateTime(self.value_date_time()),
            TtlvType::Interval => TtlvValue::Interval(self.value_interval()),
            TtlvType::DateTimeExtended => {
                TtlvValue::DateTimeExtended(self.value_date_time_extended())
            }
        };
        Ok(value)
    }

    /// A view over the sibling item that follows this one.
    ///
    /// Returns an empty view when no sibling remains. Also returns an empty view when the current item cannot be
    /// bounded (truncated or of unrecognized type): the stream is not recoverable past a bad item.
    pub fn next(&self) -> TtlvView<'a> {
        match self.full_len() {
            Ok(n) if n <= self.buf.len() => TtlvView::new(&self.buf[n..]),
            _ => TtlvView::new(&[]),
        }
    }

    /// An iterator over the children of a TTLV Structure.
    ///
    /// Iteration stops at the end of the value bytes, or early at the first child that cannot be bounded. Callers
    /// that need the guarantee of a complete walk should check [valid](Self::valid) first.
    pub fn children(&self) -> TtlvChildren<'a> {
        TtlvChildren {
            cursor: self.value_structure(),
        }
    }

    /// Checks that the bytes form a complete, well-formed TTLV item.
    ///
    /// The whole tree is checked: the header must be present, the tag high byte and type byte must be admissible,
    /// the declared length must fit the type and the buffer, and for a Structure the children must themselves be
    /// valid and together account for exactly the declared length. Errors carry the path of enclosing tags.
    pub fn valid(&self) -> Result<()> {
        let mut parents = Vec::new();
        self.validate(0, &mut parents)
    }

    fn validate(&self, offset: usize, parents: &mut Vec<TtlvTag>) -> Result<()> {
        if self.buf.len() < HEADER_LEN {
            return Err(Error::pinpoint(
                ErrorKind::HeaderTruncated,
                ErrorLocation::at(offset).with_parent_tags(parents),
            ));
        }

        let tag = self.tag();
        let here = || {
            ErrorLocation::at(offset)
                .with_parent_tags(parents)
                .with_tag(tag)
        };

        if !tag.has_valid_prefix() {
            return Err(Error::pinpoint(ErrorKind::InvalidTag(*tag), here()));
        }

        let r#type = TtlvType::try_from(self.type_code()).map_err(|e| e.locate(here()))?;

        let len = self.len();
        let len_ok = match r#type {
            TtlvType::Integer | TtlvType::Enumeration | TtlvType::Interval => len == 4,
            TtlvType::LongInteger
            | TtlvType::Boolean
            | TtlvType::DateTime
            | TtlvType::DateTimeExtended => len == 8,
            TtlvType::BigInteger => len > 0 && len % 8 == 0,
            TtlvType::Structure | TtlvType::TextString | TtlvType::ByteString => true,
        };
        if !len_ok {
            return Err(Error::pinpoint(
                ErrorKind::InvalidLen { r#type, actual: len },
                here().with_type(r#type),
            ));
        }

        let needed = HEADER_LEN + len as usize;
        if self.buf.len() < needed {
            return Err(Error::pinpoint(
                ErrorKind::ValueTruncated {
                    needed,
                    available: self.buf.len(),
                },
                here().with_type(r#type),
            ));
        }

        if r#type == TtlvType::Structure {
            parents.push(tag);
            let region = self.value_raw();
            let mut walked = 0;
            while walked < region.len() {
                let child = TtlvView::new(&region[walked..]);
                let child_offset = offset + HEADER_LEN + walked;
                child.validate(child_offset, parents)?;
                let child_len = child.full_len()?;
                if walked + child_len > region.len() {
                    // The child value fits but its trailing pad overruns the declared structure length.
                    return Err(Error::pinpoint(
                        ErrorKind::ValueTruncated {
                            needed: walked + child_len,
                            available: region.len(),
                        },
                        ErrorLocation::at(child_offset)
                            .with_parent_tags(parents)
                            .with_tag(child.tag()),
                    ));
                }
                walked += child_len;
            }
            parents.pop();
        }

        Ok(())
    }
}

impl<'a> Debug for TtlvView<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("TtlvView(empty)");
        }
        f.debug_struct("TtlvView")
            .field("tag", &self.tag())
            .field("type", &self.type_code())
            .field("len", &self.len())
            .field("available", &self.buf.len())
            .finish()
    }
}

// --- TtlvChildren ---------------------------------------------------------------------------------------------------

/// Iterator over the child items of a TTLV Structure. See [TtlvView::children].
pub struct TtlvChildren<'a> {
    cursor: TtlvView<'a>,
}

impl<'a> Iterator for TtlvChildren<'a> {
    type Item = TtlvView<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.is_empty() {
            None
        } else {
            let current = self.cursor;
            self.cursor = current.next();
            Some(current)
        }
    }
}
