//! Smoke test to verify basic functionality

use argcheck::{
    CheckerConfig, DFormat, FormatStringParser, InvalidReason, MarkKind, Presence,
    MAX_NESTING_DEPTH,
};

#[test]
fn smoke_test_parse_and_check() {
    let parser = DFormat::default();

    let msgid = parser.parse("%1$s and %2$s", false).into_result().unwrap();
    let list = msgid.list();
    assert!(list.is_finite());
    assert_eq!(list.initial().length(), 2);
    assert!(list
        .initial()
        .elements()
        .iter()
        .all(|e| e.presence() == Presence::Required));
    assert_eq!(parser.directive_count(&msgid), 2);
    assert!(!parser.is_unlikely_intentional(&msgid));

    let msgstr = parser.parse("%2$s und %1$s", true).into_result().unwrap();
    assert!(!parser.check(&msgid, &msgstr, true, None, "%1$s and %2$s", "%2$s und %1$s"));
}

#[test]
fn smoke_test_rejection_carries_marks() {
    let outcome = DFormat::default().parse("%s %z", false);
    let err = outcome.result.unwrap_err();
    assert_eq!(
        err.to_string(),
        "In the directive number 2, the character 'z' is not a valid conversion specifier."
    );
    assert_eq!(err.offset, Some(4));
    let kinds: Vec<MarkKind> = outcome.marks.iter().map(|m| m.kind).collect();
    assert_eq!(
        kinds,
        vec![MarkKind::Start, MarkKind::End, MarkKind::Start, MarkKind::Error]
    );
}

#[test]
fn smoke_test_spec_serializes() {
    let spec = DFormat::default().parse("%*d", false).into_result().unwrap();
    let json = serde_json::to_value(&spec).unwrap();
    assert_eq!(json["directives"], 1);
    assert_eq!(json["list"]["initial"]["length"], 2);
}

fn nested_compounds(levels: usize) -> String {
    format!("{}%s{}", "%(".repeat(levels), "%)".repeat(levels))
}

#[test]
fn smoke_test_default_nesting_limit() {
    let parser = DFormat::new(CheckerConfig::default());

    let spec = parser
        .parse(&nested_compounds(MAX_NESTING_DEPTH), false)
        .into_result()
        .unwrap();
    assert_eq!(spec.list().depth(), MAX_NESTING_DEPTH + 1);
    assert!(!parser.check(&spec, &spec.clone(), true, None, "a", "b"));

    let err = parser
        .parse(&nested_compounds(MAX_NESTING_DEPTH + 1), false)
        .into_result()
        .unwrap_err();
    assert_eq!(
        err.reason,
        InvalidReason::NestingTooDeep {
            limit: MAX_NESTING_DEPTH
        }
    );
}

#[test]
fn smoke_test_deep_nesting_on_small_stack() {
    // Same budget as a default spawned thread.
    let handle = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(|| {
            let parser = DFormat::default();
            assert!(parser.parse(&nested_compounds(500), false).is_valid());
            assert!(parser.parse(&nested_compounds(MAX_NESTING_DEPTH), false).is_valid());
        })
        .unwrap();
    handle.join().unwrap();
}
