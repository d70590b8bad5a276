use assert_matches::assert_matches;
use num_bigint::BigInt;
use pretty_assertions::assert_eq;
use serde_json::json;

use super::fixtures::*;
use crate::enc::TtlvEncoder;
use crate::error::ErrorKind;
use crate::json;
use crate::types::TtlvTag;
use crate::view::TtlvView;

#[test]
fn structure_renders_as_nested_objects() {
    let registry = registry();
    let bytes = request_message_bytes();
    let value = json::to_value(TtlvView::new(&bytes), &registry).unwrap();
    assert_eq!(
        value,
        json!({
            "tag": "RequestMessage",
            "value": [
                {
                    "tag": "RequestHeader",
                    "value": [
                        {
                            "tag": "ProtocolVersion",
                            "value": [
                                {"tag": "ProtocolVersionMajor", "type": "Integer", "value": 1},
                                {"tag": "ProtocolVersionMinor", "type": "Integer", "value": 4}
                            ]
                        }
                    ]
                },
                {"tag": "BatchCount", "type": "Integer", "value": 1}
            ]
        })
    );
    assert_eq!(json::from_value(&value, &registry).unwrap(), bytes);
}

#[test]
fn every_scalar_type_round_trips() {
    let registry = registry();
    let mut enc = TtlvEncoder::new();
    let outer = enc.begin_structure(TAG_REQUEST_MESSAGE);
    enc.write_integer(TtlvTag::new(0x540001), -42);
    enc.write_long_integer(TtlvTag::new(0x540002), 123_456_789_000_000_000);
    enc.write_big_integer(TtlvTag::new(0x540003), &"1234567890000000000000000000".parse().unwrap());
    enc.write_enumeration(TtlvTag::new(0x540004), 7);
    enc.write_boolean(TtlvTag::new(0x540005), true);
    enc.write_text_string(TtlvTag::new(0x540006), "Hello World");
    enc.write_byte_string(TtlvTag::new(0x540007), &[0xDE, 0xAD, 0xBE, 0xEF]);
    enc.write_date_time(TtlvTag::new(0x540008), 1_205_495_800);
    enc.write_interval(TtlvTag::new(0x540009), 675_000);
    enc.write_date_time_extended(TtlvTag::new(0x54000A), 1_205_495_800_123_456);
    enc.end_structure(outer);
    let bytes = enc.into_vec();

    let text = json::to_string(TtlvView::new(&bytes), &registry).unwrap();
    assert_eq!(json::from_str(&text, &registry).unwrap(), bytes);
}

// Values beyond ±2^52 must not be entrusted to JSON numbers: parsers that read all numbers as doubles would
// silently round them.
#[test]
fn long_integers_beyond_double_precision_emit_as_hex_strings() {
    let registry = registry();

    let mut enc = TtlvEncoder::new();
    enc.write_long_integer(TAG_BATCH_COUNT, 1 << 53);
    let bytes = enc.into_vec();
    let value = json::to_value(TtlvView::new(&bytes), &registry).unwrap();
    assert_eq!(
        value,
        json!({"tag": "BatchCount", "type": "LongInteger", "value": "0x0020000000000000"})
    );
    assert_eq!(json::from_value(&value, &registry).unwrap(), bytes);

    // 2^52 itself still fits.
    let mut enc = TtlvEncoder::new();
    enc.write_long_integer(TAG_BATCH_COUNT, 1 << 52);
    let bytes = enc.into_vec();
    let value = json::to_value(TtlvView::new(&bytes), &registry).unwrap();
    assert_eq!(value["value"], json!(4_503_599_627_370_496u64));

    // Negative values escape symmetrically, as the hex of the raw value bytes.
    let mut enc = TtlvEncoder::new();
    enc.write_long_integer(TAG_BATCH_COUNT, -(1 << 53));
    let bytes = enc.into_vec();
    let value = json::to_value(TtlvView::new(&bytes), &registry).unwrap();
    assert_eq!(value["value"], json!("0xFFE0000000000000"));
    assert_eq!(json::from_value(&value, &registry).unwrap(), bytes);
}

#[test]
fn big_integers_escape_to_hex_beyond_double_precision() {
    let registry = registry();

    let mut enc = TtlvEncoder::new();
    enc.write_big_integer(TtlvTag::new(0x540003), &BigInt::from(12345));
    let bytes = enc.into_vec();
    let value = json::to_value(TtlvView::new(&bytes), &registry).unwrap();
    assert_eq!(value["value"], json!(12345));
    assert_eq!(json::from_value(&value, &registry).unwrap(), bytes);

    let big: BigInt = "1234567890000000000000000000".parse().unwrap();
    let mut enc = TtlvEncoder::new();
    enc.write_big_integer(TtlvTag::new(0x540003), &big);
    let bytes = enc.into_vec();
    let value = json::to_value(TtlvView::new(&bytes), &registry).unwrap();
    assert_eq!(value["value"], json!("0x0000000003FD35EB6BC2DF4618080000"));
    assert_eq!(json::from_value(&value, &registry).unwrap(), bytes);
}

#[test]
fn attribute_name_selects_the_effective_enum_tag() {
    let registry = registry();
    let mut enc = TtlvEncoder::new();
    let attribute = enc.begin_structure(TAG_ATTRIBUTE);
    enc.write_text_string(TAG_ATTRIBUTE_NAME, "Key Format Type");
    enc.write_enumeration(TAG_ATTRIBUTE_VALUE, 2);
    enc.end_structure(attribute);
    let bytes = enc.into_vec();

    let value = json::to_value(TtlvView::new(&bytes), &registry).unwrap();
    assert_eq!(
        value,
        json!({
            "tag": "Attribute",
            "value": [
                {"tag": "AttributeName", "type": "TextString", "value": "Key Format Type"},
                {"tag": "AttributeValue", "type": "Enumeration", "value": "X_509"}
            ]
        })
    );
    assert_eq!(json::from_value(&value, &registry).unwrap(), bytes);
}

#[test]
fn masks_render_as_pipe_joined_strings() {
    let registry = registry();
    let mut enc = TtlvEncoder::new();
    enc.write_integer(TAG_CRYPTOGRAPHIC_USAGE_MASK, 0x01 | 0x08);
    let bytes = enc.into_vec();

    let value = json::to_value(TtlvView::new(&bytes), &registry).unwrap();
    assert_eq!(value["value"], json!("Sign|Decrypt"));
    assert_eq!(json::from_value(&value, &registry).unwrap(), bytes);
}

#[test]
fn lenient_input_forms_are_accepted() {
    let registry = registry();

    // Boolean as the hex rendition of its 8 value bytes.
    let text = r#"{"tag":"0x540005","type":"Boolean","value":"0x0000000000000001"}"#;
    let bytes = json::from_str(text, &registry).unwrap();
    assert!(TtlvView::new(&bytes).value_boolean());
    let text = r#"{"tag":"0x540005","type":"Boolean","value":"0x0000000000000000"}"#;
    let bytes = json::from_str(text, &registry).unwrap();
    assert!(!TtlvView::new(&bytes).value_boolean());

    // DateTime as hex seconds from the epoch.
    let text = r#"{"tag":"ActivationDate","type":"DateTime","value":"0x0000000047DA67F8"}"#;
    let bytes = json::from_str(text, &registry).unwrap();
    assert_eq!(TtlvView::new(&bytes).value_date_time(), 1_205_495_800);

    // Enumerations as plain numbers.
    let text = r#"{"tag":"KeyFormatType","type":"Enumeration","value":2}"#;
    let bytes = json::from_str(text, &registry).unwrap();
    assert_eq!(TtlvView::new(&bytes).value_enumeration(), 2);

    // Intervals as hex.
    let text = r#"{"tag":"0x540009","type":"Interval","value":"0x000A4CB8"}"#;
    let bytes = json::from_str(text, &registry).unwrap();
    assert_eq!(TtlvView::new(&bytes).value_interval(), 675_000);
}

#[test]
fn date_time_renders_as_rfc3339() {
    let registry = registry();
    let mut enc = TtlvEncoder::new();
    enc.write_date_time(TAG_ACTIVATION_DATE, 1_205_495_800);
    let bytes = enc.into_vec();
    let value = json::to_value(TtlvView::new(&bytes), &registry).unwrap();
    assert_eq!(
        value,
        json!({"tag": "ActivationDate", "type": "DateTime", "value": "2008-03-14T11:56:40Z"})
    );
    assert_eq!(json::from_value(&value, &registry).unwrap(), bytes);
}

#[test]
fn byte_string_rejects_hex_prefix() {
    let registry = registry();
    let text = r#"{"tag":"0x540007","type":"ByteString","value":"0xDEAD"}"#;
    assert_matches!(
        json::from_str(text, &registry).unwrap_err().kind(),
        ErrorKind::InvalidHexPrefix("ByteString")
    );
}

#[test]
fn big_integer_strings_require_the_hex_prefix() {
    let registry = registry();
    let text = r#"{"tag":"0x540003","type":"BigInteger","value":"1234"}"#;
    assert_matches!(
        json::from_str(text, &registry).unwrap_err().kind(),
        ErrorKind::InvalidNumber(_)
    );

    let text = r#"{"tag":"0x540003","type":"BigInteger","value":"0xABC"}"#;
    assert_matches!(
        json::from_str(text, &registry).unwrap_err().kind(),
        ErrorKind::BigIntegerBadAlignment(3)
    );
}

#[test]
fn shape_errors_name_the_offending_member() {
    let registry = registry();

    let err = json::from_str(r#"{"type":"Integer","value":1}"#, &registry).unwrap_err();
    assert_matches!(err.kind(), ErrorKind::Syntax(_));

    let err = json::from_str(r#"{"tag":"NoSuchTag","type":"Integer","value":1}"#, &registry)
        .unwrap_err();
    assert_matches!(err.kind(), ErrorKind::UnknownTag(_));

    let err = json::from_str(r#"{"tag":"BatchCount","type":"Integer"}"#, &registry).unwrap_err();
    assert_matches!(err.kind(), ErrorKind::Syntax(_));
    assert_eq!(err.location().tag(), Some(TAG_BATCH_COUNT));

    let err = json::from_str(
        r#"{"tag":"KeyFormatType","type":"Enumeration","value":"NoSuchValue"}"#,
        &registry,
    )
    .unwrap_err();
    assert_matches!(err.kind(), ErrorKind::UnknownEnum(_));
    assert_eq!(err.location().tag(), Some(TAG_KEY_FORMAT_TYPE));

    // A structure value must be an array.
    let err = json::from_str(r#"{"tag":"RequestMessage","value":1}"#, &registry).unwrap_err();
    assert_matches!(err.kind(), ErrorKind::Syntax(_));

    // An Integer that does not fit 32 bits.
    let err = json::from_str(r#"{"tag":"BatchCount","type":"Integer","value":4294967296}"#, &registry)
        .unwrap_err();
    assert_matches!(err.kind(), ErrorKind::InvalidNumber(_));
}

#[test]
fn missing_type_member_denotes_a_structure() {
    let registry = registry();
    let text = r#"{"tag":"RequestHeader","value":[]}"#;
    let bytes = json::from_str(text, &registry).unwrap();
    assert_eq!(bytes, hex_bytes("42 00 77 01 00 00 00 00"));
}
