//! AST-writer escaping rules exercised through a full compile, not hand-built nodes.

use m2fc::options::Options;
use m2fc::parser::SourceType;
use m2fc::{compile_source, writer};

#[test]
fn string_literal_containing_a_double_quote_flips_to_single_quote_delimiters() {
    let src = b"MODULE Quoting;\n  FROM IO IMPORT Put;\nBEGIN\n  Put('say \"hi\"');\nEND Quoting.";
    let outcome = compile_source(src, "Quoting.mod", Options::defaults(), SourceType::Any).unwrap();
    let rendered = writer::to_string(&outcome.root);
    assert!(rendered.contains("(QUOTEDVAL 'say \"hi\"')"));
}

#[test]
fn ordinary_string_literal_keeps_double_quote_delimiters() {
    let src = b"MODULE Plain;\n  FROM IO IMPORT Put;\nBEGIN\n  Put(\"plain\");\nEND Plain.";
    let outcome = compile_source(src, "Plain.mod", Options::defaults(), SourceType::Any).unwrap();
    let rendered = writer::to_string(&outcome.root);
    assert!(rendered.contains("(QUOTEDVAL \"plain\")"));
}

#[test]
fn written_output_ends_with_exactly_one_newline() {
    let outcome = compile_source(
        b"DEFINITION MODULE Empty;\nEND Empty.",
        "Empty.def",
        Options::defaults(),
        SourceType::Any,
    )
    .unwrap();
    let rendered = writer::to_string(&outcome.root);
    assert!(rendered.ends_with('\n'));
    assert!(!rendered.ends_with("\n\n"));
}

#[test]
fn serialisation_is_deterministic_across_repeated_calls() {
    let outcome = compile_source(
        b"DEFINITION MODULE Empty;\nEND Empty.",
        "Empty.def",
        Options::defaults(),
        SourceType::Any,
    )
    .unwrap();
    assert_eq!(writer::to_string(&outcome.root), writer::to_string(&outcome.root));
}

#[test]
fn write_to_path_reports_the_character_count() {
    let outcome = compile_source(
        b"DEFINITION MODULE Empty;\nEND Empty.",
        "Empty.def",
        Options::defaults(),
        SourceType::Any,
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Empty.ast");
    match writer::write_to_path(&outcome.root, &path) {
        writer::WriteStatus::Success { chars_written } => {
            let expected = writer::to_string(&outcome.root).chars().count();
            assert_eq!(chars_written, expected);
        }
        other => panic!("expected a successful write, got {other:?}"),
    }
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        writer::to_string(&outcome.root)
    );
}
