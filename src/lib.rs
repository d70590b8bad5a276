//! A codec for the KMIP TTLV wire format and its XML and JSON textual encodings.
//!
//! TTLV stands for Tag-Type-Length-Value, the self-describing binary tree format in which KMIP clients and
//! servers exchange key management messages:
//!
//!   - The TTLV format is defined as part of the [Oasis Key Management Interoperability Protocol Specification
//!     Version 1.0] (aka KMIP) in [Section 9.1 TTLV Encoding].
//!   - The byte representation of a TTLV item consists of a 3 byte tag, a 1 byte type, a 4 byte big-endian
//!     length, and zero or more value bytes followed by any required padding bytes.
//!   - Leaf items carry a primitive value of some kind (Integer, Boolean, etc); all other items are "Structure"
//!     items whose value consists of zero or more nested TTLV items.
//!
//! [Oasis Key Management Interoperability Protocol Specification Version 1.0]: https://docs.oasis-open.org/kmip/spec/v1.0/os/kmip-spec-1.0-os.html
//! [Section 9.1 TTLV Encoding]: https://docs.oasis-open.org/kmip/spec/v1.0/os/kmip-spec-1.0-os.html#_Toc262581260
//!
//! This crate covers three jobs:
//!
//!   - **Inspecting binary TTLV.** [TtlvView] interprets a borrowed byte range as a TTLV item without copying:
//!     header accessors, typed value accessors, recursive validation and sibling traversal.
//!   - **Producing binary TTLV.** [TtlvEncoder] appends items to a growing buffer, back-patching structure
//!     lengths as structures are closed.
//!   - **Translating to and from text.** The [xml] and [json] modules implement the KMIP XML and JSON encodings
//!     over the view and the encoder, resolving names through a pluggable [SymbolRegistry]. All three encodings
//!     round-trip losslessly.
//!
//! # Example
//!
//! ```
//! use ttlv_codec::{json, SymbolTable, TtlvEncoder, TtlvTag, TtlvView};
//!
//! let registry = SymbolTable::new().with_tag(TtlvTag::new(0x420008), "Attribute");
//!
//! // Build a message.
//! let mut enc = TtlvEncoder::new();
//! let attribute = enc.begin_structure(TtlvTag::new(0x420008));
//! enc.write_text_string(TtlvTag::new(0x42000A), "x-meta");
//! enc.end_structure(attribute);
//! let bytes = enc.into_vec();
//!
//! // Inspect it without copying.
//! let ttlv = TtlvView::new(&bytes);
//! ttlv.valid()?;
//! assert_eq!(*ttlv.tag(), 0x420008);
//!
//! // Translate it.
//! let text = json::to_string(ttlv, &registry)?;
//! assert_eq!(json::from_str(&text, &registry)?, bytes);
//! # Ok::<(), ttlv_codec::Error>(())
//! ```
//!
//! # Names and registries
//!
//! The textual encodings render tags, enumeration values and bitmask bits by name. The names come from a
//! [SymbolRegistry] supplied per call; this crate ships the [SymbolTable] container but no KMIP tables, which
//! are defined by the KMIP profile a deployment implements. An empty registry is usable: every symbol then
//! renders in its hexadecimal form, which remains lossless.
//!
//! A special case is the KMIP Attribute structure, whose Attribute Value item is typed by the textual value of
//! the preceding Attribute Name item. Both text codecs resolve enumeration and bitmask names for an Attribute
//! Value under that effective tag, in both directions.
//!
//! # Error handling
//!
//! The binary view never faults while reading headers and values: accessors clip or return zero so that
//! diagnostic tools can walk damaged input. Strict checking is opt-in through [TtlvView::valid]. The text codecs
//! are strict and fail with the offending tag, the expected syntax and, inside structures, the path of enclosing
//! tags; see [Error] and [ErrorKind].
//!
//! For logging of requests and responses use [PrettyPrinter::to_diag_string], which renders the message skeleton
//! with all values except enumerations redacted.

pub mod enc;
pub mod error;
pub mod json;
pub mod registry;
pub mod types;
pub mod util;
pub mod view;
pub mod xml;

#[doc(inline)]
pub use enc::{StructHandle, TtlvEncoder};

#[doc(inline)]
pub use error::{Error, ErrorKind, Result};

#[doc(inline)]
pub use registry::{EnumDef, SymbolRegistry, SymbolTable};

#[doc(inline)]
pub use types::{TtlvTag, TtlvType, TtlvValue};

#[doc(inline)]
pub use util::PrettyPrinter;

#[doc(inline)]
pub use view::TtlvView;

#[cfg(test)]
mod tests;
