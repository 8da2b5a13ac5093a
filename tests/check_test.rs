//! Equivalence checks between source strings and translations

use argcheck::{
    CheckDiagnostic, CheckerConfig, DFormat, DFormatSpec, EqualityPolicy, FormatStringParser,
};
use pretty_assertions::assert_eq;

fn parse(parser: &DFormat, text: &str) -> DFormatSpec {
    parser.parse(text, false).into_result().unwrap()
}

/// Run a check and collect the logged messages
fn run_check(parser: &DFormat, msgid: &str, msgstr: &str, equality: bool) -> (bool, Vec<String>) {
    let spec1 = parse(parser, msgid);
    let spec2 = parse(parser, msgstr);
    let mut messages = Vec::new();
    let mut logger = |d: &CheckDiagnostic| messages.push(d.to_string());
    let failed = parser.check(&spec1, &spec2, equality, Some(&mut logger), msgid, msgstr);
    (failed, messages)
}

fn lax_parser() -> DFormat {
    DFormat::new(CheckerConfig {
        equality_policy: EqualityPolicy::CallerDecides,
        ..CheckerConfig::default()
    })
}

#[test]
fn test_identical_strings_pass() {
    let parser = DFormat::default();
    assert_eq!(run_check(&parser, "%d", "%d", true), (false, vec![]));
}

#[test]
fn test_reordered_translation_passes() {
    let parser = DFormat::default();
    let (failed, messages) = run_check(
        &parser,
        "%1$s copied %2$d files",
        "%2$d Dateien von %1$s kopiert",
        true,
    );
    assert!(!failed);
    assert!(messages.is_empty());
}

#[test]
fn test_type_mismatch_fails() {
    let parser = DFormat::default();
    let (failed, messages) = run_check(&parser, "%d", "%s", true);
    assert!(failed);
    assert_eq!(
        messages,
        vec!["format specifications in '%d' and '%s' are not equivalent".to_string()]
    );
}

#[test]
fn test_dropped_argument_fails() {
    let parser = DFormat::default();
    let (failed, _) = run_check(&parser, "%d pieces", "a piece", true);
    assert!(failed);
}

#[test]
fn test_zero_precision_workaround_passes() {
    let parser = DFormat::default();
    let (failed, _) = run_check(&parser, "%s pieces", "%.0sa piece", true);
    assert!(!failed);
}

#[test]
fn test_default_policy_ignores_lax_request() {
    let parser = DFormat::default();
    // Without the policy override, asking for a lax check still compares strictly.
    let (failed, messages) = run_check(&parser, "%s", "%d", false);
    assert!(failed);
    assert_eq!(
        messages,
        vec!["format specifications in '%s' and '%d' are not equivalent".to_string()]
    );
}

#[test]
fn test_lax_check_accepts_narrower_translation() {
    let parser = lax_parser();
    let (failed, messages) = run_check(&parser, "%s", "%d", false);
    assert!(!failed);
    assert!(messages.is_empty());
}

#[test]
fn test_lax_check_rejects_wider_translation() {
    let parser = lax_parser();
    let (failed, messages) = run_check(&parser, "%d", "%s", false);
    assert!(failed);
    assert_eq!(
        messages,
        vec!["format specifications in '%s' are not a subset of those in '%d'".to_string()]
    );
}

#[test]
fn test_lax_check_rejects_incompatible_kinds() {
    let parser = lax_parser();
    let (failed, _) = run_check(&parser, "%c", "%f", false);
    assert!(failed);
}

#[test]
fn test_caller_decides_still_honours_equality() {
    let parser = lax_parser();
    let (failed, _) = run_check(&parser, "%s", "%d", true);
    assert!(failed);
}

#[test]
fn test_check_without_logger() {
    let parser = DFormat::default();
    let spec1 = parse(&parser, "%(%s%|, %)");
    let spec2 = parse(&parser, "%(%s%|; %)");
    assert!(!parser.check(&spec1, &spec2, true, None, "a", "b"));

    let spec3 = parse(&parser, "%(%s=%s%)");
    assert!(parser.check(&spec1, &spec3, true, None, "a", "b"));
}
