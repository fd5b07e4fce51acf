use phylostream::error::StreamErrorKind;
use phylostream::translate::{default_registry, ObjectValue};

#[test]
fn test_scalar_translators_round_trip() {
    let registry = default_registry();

    let integer = registry.translator("xsd:int").unwrap();
    assert_eq!(integer.from_text(" 42 ").unwrap(), ObjectValue::Integer(42));
    assert_eq!(integer.to_text(&ObjectValue::Integer(-7)).unwrap(), "-7");

    let double = registry.translator("xsd:double").unwrap();
    assert_eq!(double.from_text("1.5e2").unwrap(), ObjectValue::Double(150.0));
    // Integers are an acceptable numeric input for the double form
    assert_eq!(double.to_text(&ObjectValue::Integer(3)).unwrap(), "3");

    let boolean = registry.translator("xsd:boolean").unwrap();
    assert_eq!(boolean.from_text("TRUE").unwrap(), ObjectValue::Boolean(true));
    assert_eq!(boolean.from_text("0").unwrap(), ObjectValue::Boolean(false));

    let string = registry.translator("xsd:string").unwrap();
    assert_eq!(
        string.from_text("kaka beak").unwrap(),
        ObjectValue::Text("kaka beak".to_string())
    );
}

#[test]
fn test_parse_failures_are_invalid_object_data() {
    let registry = default_registry();
    for (datatype, text) in [
        ("xsd:int", "4.5"),
        ("xsd:double", "abc"),
        ("xsd:boolean", "maybe"),
        ("phylostream:list", "{1, 2"),
    ] {
        let err = registry
            .translator(datatype)
            .unwrap()
            .from_text(text)
            .unwrap_err();
        assert!(
            matches!(err.kind(), StreamErrorKind::InvalidObjectData(_)),
            "{datatype} accepted '{text}'"
        );
    }
}

#[test]
fn test_type_mismatches_are_rejected_on_output() {
    let registry = default_registry();
    let integer = registry.translator("xsd:int").unwrap();
    assert!(matches!(
        integer
            .to_text(&ObjectValue::Text("42".to_string()))
            .unwrap_err()
            .kind(),
        StreamErrorKind::InvalidObjectData(_)
    ));
}

#[test]
fn test_list_translator_handles_mixed_items() {
    let registry = default_registry();
    let list = registry.translator("phylostream:list").unwrap();
    let value = list.from_text("{1, 2.5, 'Chatham Islands', true}").unwrap();
    assert_eq!(
        value,
        ObjectValue::List(vec![
            ObjectValue::Integer(1),
            ObjectValue::Double(2.5),
            ObjectValue::Text("Chatham Islands".to_string()),
            ObjectValue::Boolean(true),
        ])
    );
    assert_eq!(
        list.to_text(&value).unwrap(),
        "{1, 2.5, 'Chatham Islands', true}"
    );
}
