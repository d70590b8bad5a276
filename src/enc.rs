//! Append-only construction of TTLV bytes.
//!
//! [TtlvEncoder] grows a byte buffer and emits each item atomically: header, value and pad bytes in one call.
//! Structures are opened with [begin_structure](TtlvEncoder::begin_structure), which leaves a placeholder length
//! behind, and closed with [end_structure](TtlvEncoder::end_structure), which patches the real length in once the
//! children are in the buffer.
//!
//! ```
//! use ttlv_codec::{TtlvEncoder, TtlvTag};
//!
//! let mut enc = TtlvEncoder::new();
//! let request = enc.begin_structure(TtlvTag::new(0x420078));
//! enc.write_integer(TtlvTag::new(0x42000D), 1);
//! enc.end_structure(request);
//! let bytes = enc.into_vec();
//! assert_eq!(bytes.len(), 24);
//! ```

use num_bigint::BigInt;

use crate::types::{big_integer_to_bytes, calc_pad_bytes, TtlvTag, TtlvType};

const PAD_BYTES: [u8; 8] = [0; 8];

// --- StructHandle ---------------------------------------------------------------------------------------------------

/// A back-patch handle for an open TTLV Structure, returned by [TtlvEncoder::begin_structure].
///
/// The handle records the buffer offset of the placeholder length field. Handing a handle to the wrong encoder,
/// or closing structures out of order, is a program bug rather than a recoverable condition; balance is checked
/// in debug builds only.
#[derive(Debug)]
#[must_use = "a structure left open produces a zero-length header"]
pub struct StructHandle(usize);

// --- TtlvEncoder ----------------------------------------------------------------------------------------------------

/// An append-only builder that emits well-formed TTLV bytes.
///
/// The encoder performs no registry lookups and no tag validation; unknown tags are encoded verbatim. The buffer
/// grows geometrically and is handed to the caller by [into_vec](Self::into_vec) when the message is complete.
#[derive(Debug, Default)]
pub struct TtlvEncoder {
    buf: Vec<u8>,
    open_structures: usize,
}

impl TtlvEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn write_header(&mut self, tag: TtlvTag, r#type: TtlvType, len: u32) {
        let tag_bytes: [u8; 3] = tag.into();
        self.buf.extend_from_slice(&tag_bytes);
        self.buf.push(r#type as u8);
        self.buf.extend_from_slice(&len.to_be_bytes());
    }

    fn write_value_and_pad(&mut self, value: &[u8]) {
        self.buf.extend_from_slice(value);
        let num_pad_bytes = calc_pad_bytes(value.len() as u32) as usize;
        self.buf.extend_from_slice(&PAD_BYTES[..num_pad_bytes]);
    }

    /// Opens a TTLV Structure, writing its header with a placeholder length.
    pub fn begin_structure(&mut self, tag: TtlvTag) -> StructHandle {
        self.write_header(tag, TtlvType::Structure, 0);
        self.open_structures += 1;
        StructHandle(self.buf.len() - 4)
    }

    /// Closes the structure opened by the matching [begin_structure](Self::begin_structure) call, patching the
    /// length field with the number of value bytes written since.
    pub fn end_structure(&mut self, handle: StructHandle) {
        let StructHandle(len_offset) = handle;
        debug_assert!(
            self.open_structures > 0,
            "end_structure without a matching begin_structure"
        );
        self.open_structures = self.open_structures.saturating_sub(1);
        let len = (self.buf.len() - len_offset - 4) as u32;
        self.buf[len_offset..len_offset + 4].copy_from_slice(&len.to_be_bytes());
    }

    /// Writes a TTLV Integer: 4 value bytes and 4 pad bytes.
    pub fn write_integer(&mut self, tag: TtlvTag, value: i32) {
        self.write_header(tag, TtlvType::Integer, 4);
        self.write_value_and_pad(&value.to_be_bytes());
    }

    /// Writes a TTLV Long Integer: 8 value bytes, no pad.
    pub fn write_long_integer(&mut self, tag: TtlvTag, value: i64) {
        self.write_header(tag, TtlvType::LongInteger, 8);
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes a TTLV Big Integer.
    ///
    /// The value is sign-extended to a multiple of eight bytes; the pad is part of the value and of the declared
    /// length, so no trailing pad follows.
    pub fn write_big_integer(&mut self, tag: TtlvTag, value: &BigInt) {
        let v = big_integer_to_bytes(value);
        self.write_header(tag, TtlvType::BigInteger, v.len() as u32);
        self.buf.extend_from_slice(&v);
    }

    /// Writes a TTLV Enumeration: 4 value bytes and 4 pad bytes.
    pub fn write_enumeration(&mut self, tag: TtlvTag, value: u32) {
        self.write_header(tag, TtlvType::Enumeration, 4);
        self.write_value_and_pad(&value.to_be_bytes());
    }

    /// Writes a TTLV Boolean as 8 value bytes holding 0 or 1.
    pub fn write_boolean(&mut self, tag: TtlvTag, value: bool) {
        self.write_header(tag, TtlvType::Boolean, 8);
        self.buf.extend_from_slice(&(value as u64).to_be_bytes());
    }

    /// Writes a TTLV Text String: the UTF-8 bytes, zero-padded to the next eight byte boundary. The declared
    /// length is the unpadded byte count.
    pub fn write_text_string(&mut self, tag: TtlvTag, value: &str) {
        self.write_header(tag, TtlvType::TextString, value.len() as u32);
        self.write_value_and_pad(value.as_bytes());
    }

    /// Writes a TTLV Byte String: the raw bytes, zero-padded to the next eight byte boundary.
    pub fn write_byte_string(&mut self, tag: TtlvTag, value: &[u8]) {
        self.write_header(tag, TtlvType::ByteString, value.len() as u32);
        self.write_value_and_pad(value);
    }

    /// Writes a TTLV Date-Time: POSIX seconds since the epoch as 8 value bytes.
    pub fn write_date_time(&mut self, tag: TtlvTag, seconds: i64) {
        self.write_header(tag, TtlvType::DateTime, 8);
        self.buf.extend_from_slice(&seconds.to_be_bytes());
    }

    /// Writes a TTLV Date-Time Extended: microseconds since the epoch as 8 value bytes.
    pub fn write_date_time_extended(&mut self, tag: TtlvTag, microseconds: i64) {
        self.write_header(tag, TtlvType::DateTimeExtended, 8);
        self.buf.extend_from_slice(&microseconds.to_be_bytes());
    }

    /// Writes a TTLV Interval: 4 value bytes of seconds and 4 pad bytes.
    pub fn write_interval(&mut self, tag: TtlvTag, seconds: u32) {
        self.write_header(tag, TtlvType::Interval, 4);
        self.write_value_and_pad(&seconds.to_be_bytes());
    }

    /// The bytes written so far.
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Discards the buffer contents so the encoder can be reused.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.open_structures = 0;
    }

    /// Hands the finished buffer to the caller.
    pub fn into_vec(self) -> Vec<u8> {
        debug_assert_eq!(
            self.open_structures, 0,
            "finished with unclosed structures"
        );
        self.buf
    }
}
