use pretty_assertions::assert_eq;

use super::fixtures::*;
use crate::enc::TtlvEncoder;
use crate::util::PrettyPrinter;

#[test]
fn pretty_tree_resolves_names() {
    let registry = registry();
    let bytes = request_message_bytes();
    let printer = PrettyPrinter::new(&registry);
    assert_eq!(
        printer.to_string(&bytes),
        "RequestMessage (Structure):\n\
        \x20 RequestHeader (Structure):\n\
        \x20   ProtocolVersion (Structure):\n\
        \x20     ProtocolVersionMajor (Integer): 1\n\
        \x20     ProtocolVersionMinor (Integer): 4\n\
        \x20 BatchCount (Integer): 1\n"
    );
}

#[test]
fn pretty_tree_marks_invalid_remnants() {
    let registry = registry();
    let bytes = request_message_bytes();
    let out = PrettyPrinter::new(&registry).to_string(&bytes[..20]);
    assert!(out.contains("!! invalid bytes:"), "got: {}", out);
}

#[test]
fn diag_string_redacts_values_but_keeps_enumerations() {
    let registry = registry();
    let mut enc = TtlvEncoder::new();
    let attribute = enc.begin_structure(TAG_ATTRIBUTE);
    enc.write_text_string(TAG_ATTRIBUTE_NAME, "Key Format Type");
    enc.write_enumeration(TAG_ATTRIBUTE_VALUE, 2);
    enc.end_structure(attribute);
    let bytes = enc.into_vec();

    let out = PrettyPrinter::new(&registry).to_diag_string(&bytes);
    assert_eq!(out, "420008[42000A,42000B=2]");
    assert!(!out.contains("Key Format Type"));
}
