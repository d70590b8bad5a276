//! Test support and per-area test modules.

mod json;
mod util;

pub(crate) mod fixtures {
    use crate::registry::{EnumDef, SymbolTable};
    use crate::types::TtlvTag;

    pub(crate) const TAG_REQUEST_MESSAGE: TtlvTag = TtlvTag::new(0x420078);
    pub(crate) const TAG_REQUEST_HEADER: TtlvTag = TtlvTag::new(0x420077);
    pub(crate) const TAG_PROTOCOL_VERSION: TtlvTag = TtlvTag::new(0x420069);
    pub(crate) const TAG_PROTOCOL_VERSION_MAJOR: TtlvTag = TtlvTag::new(0x42006A);
    pub(crate) const TAG_PROTOCOL_VERSION_MINOR: TtlvTag = TtlvTag::new(0x42006B);
    pub(crate) const TAG_BATCH_COUNT: TtlvTag = TtlvTag::new(0x42000D);
    pub(crate) const TAG_ATTRIBUTE: TtlvTag = TtlvTag::new(0x420008);
    pub(crate) const TAG_ATTRIBUTE_NAME: TtlvTag = TtlvTag::new(0x42000A);
    pub(crate) const TAG_ATTRIBUTE_VALUE: TtlvTag = TtlvTag::new(0x42000B);
    pub(crate) const TAG_KEY_FORMAT_TYPE: TtlvTag = TtlvTag::new(0x420042);
    pub(crate) const TAG_CRYPTOGRAPHIC_USAGE_MASK: TtlvTag = TtlvTag::new(0x42002C);
    pub(crate) const TAG_ACTIVATION_DATE: TtlvTag = TtlvTag::new(0x420012);

    /// A small registry covering the tags the tests exercise. Loading the complete tables of a KMIP profile is
    /// the embedder's job; the codec works off whatever it is given.
    pub(crate) fn registry() -> SymbolTable {
        SymbolTable::new()
            .with_tag(TAG_REQUEST_MESSAGE, "RequestMessage")
            .with_tag(TAG_REQUEST_HEADER, "RequestHeader")
            .with_tag(TAG_PROTOCOL_VERSION, "ProtocolVersion")
            .with_tag(TAG_PROTOCOL_VERSION_MAJOR, "ProtocolVersionMajor")
            .with_tag(TAG_PROTOCOL_VERSION_MINOR, "ProtocolVersionMinor")
            .with_tag(TAG_BATCH_COUNT, "BatchCount")
            .with_tag(TAG_ATTRIBUTE, "Attribute")
            .with_tag(TAG_ATTRIBUTE_NAME, "AttributeName")
            .with_tag(TAG_ATTRIBUTE_VALUE, "AttributeValue")
            .with_tag(TAG_KEY_FORMAT_TYPE, "KeyFormatType")
            .with_tag(TAG_CRYPTOGRAPHIC_USAGE_MASK, "CryptographicUsageMask")
            .with_tag(TAG_ACTIVATION_DATE, "ActivationDate")
            .with_enum(
                TAG_KEY_FORMAT_TYPE,
                EnumDef::new(false)
                    .with_value("Raw", 1)
                    .with_value("X_509", 2)
                    .with_value("PKCS_8", 3),
            )
            .with_enum(
                TAG_CRYPTOGRAPHIC_USAGE_MASK,
                EnumDef::new(true)
                    .with_value("Sign", 0x01)
                    .with_value("Verify", 0x02)
                    .with_value("Encrypt", 0x04)
                    .with_value("Decrypt", 0x08),
            )
    }

    /// Decodes a whitespace-separated hex string, as the byte listings in the KMIP specification are written.
    pub(crate) fn hex_bytes(s: &str) -> Vec<u8> {
        hex::decode(s.replace(' ', "")).unwrap()
    }

    /// A three level request message used by the traversal and round trip tests.
    pub(crate) fn request_message_bytes() -> Vec<u8> {
        hex_bytes(
            "42 00 78 01 00 00 00 40 \
             42 00 77 01 00 00 00 28 \
             42 00 69 01 00 00 00 20 \
             42 00 6A 02 00 00 00 04 00 00 00 01 00 00 00 00 \
             42 00 6B 02 00 00 00 04 00 00 00 04 00 00 00 00 \
             42 00 0D 02 00 00 00 04 00 00 00 01 00 00 00 00",
        )
    }
}
