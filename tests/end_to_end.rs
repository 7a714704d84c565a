//! End-to-end scenarios: source in, rendered S-expression out.

use m2fc::diagnostics::DiagnosticKind;
use m2fc::options::Options;
use m2fc::parser::SourceType;
use m2fc::{compile_source, writer};

#[test]
fn empty_definition_module() {
    let outcome = compile_source(
        b"DEFINITION MODULE Empty;\nEND Empty.",
        "Empty.def",
        Options::defaults(),
        SourceType::Any,
    )
    .unwrap();

    assert_eq!(outcome.diagnostics.borrow().error_count(), 0);
    assert_eq!(outcome.diagnostics.borrow().warning_count(), 0);
    assert_eq!(
        writer::to_string(&outcome.root),
        "(ROOT (FILENAME \"Empty.def\") (OPTIONS) (DEFMOD (IDENT Empty) (IMPLIST) (DEFLIST)))\n"
    );
}

#[test]
fn hello_world_program_module() {
    let src = b"MODULE Hello;\n  FROM IO IMPORT Put;\nBEGIN\n  Put(\"hi\");\nEND Hello.";
    let outcome = compile_source(src, "Hello.mod", Options::defaults(), SourceType::Any).unwrap();

    assert_eq!(outcome.diagnostics.borrow().error_count(), 0);
    let rendered = writer::to_string(&outcome.root);
    assert!(rendered.contains(
        "(IMPMOD (IDENT Hello) (EMPTY) (IMPLIST (UNQIMP (IDENT IO) (IDENTLIST Put))) \
         (BLOCK (EMPTY) (STMTSEQ (PCALL (IDENT Put) (ARGS (QUOTEDVAL \"hi\"))))))"
    ));
}

#[test]
fn real_constant_definition() {
    let src = b"DEFINITION MODULE Consts;\n  CONST pi = 3.14159;\nEND Consts.";
    let outcome = compile_source(src, "Consts.def", Options::defaults(), SourceType::Any).unwrap();

    assert_eq!(outcome.diagnostics.borrow().error_count(), 0);
    let rendered = writer::to_string(&outcome.root);
    assert!(rendered.contains("(CONSTDEF (IDENT pi) (REALVAL 3.14159))"));
}

#[test]
fn malformed_suffix_integer_without_octal_literals_is_flagged() {
    let mut opts = Options::defaults();
    opts.octal_literals = false;
    // "0FF" has no H/B/C suffix, so suffix mode can't settle on a base: MALFORMED_INTEGER.
    let src = b"DEFINITION MODULE Bad;\n  CONST x = 0FF;\nEND Bad.";
    let outcome = compile_source(src, "Bad.def", opts, SourceType::Any).unwrap();

    assert!(outcome
        .diagnostics
        .borrow()
        .records()
        .iter()
        .any(|d| d.kind == DiagnosticKind::MissingSuffix));
}

#[test]
fn errant_semicolon_before_end_is_a_single_warning_and_parse_still_succeeds() {
    let src = b"MODULE Trailing;\nBEGIN\n  Put;\nEND Trailing.";
    let outcome = compile_source(src, "Trailing.mod", Options::defaults(), SourceType::Any).unwrap();

    assert_eq!(outcome.diagnostics.borrow().error_count(), 0);
    let semicolon_warnings = outcome
        .diagnostics
        .borrow()
        .records()
        .iter()
        .filter(|d| d.kind == DiagnosticKind::SemicolonAfterStmtSeq)
        .count();
    assert_eq!(semicolon_warnings, 1);
}

#[test]
fn duplicate_identifier_in_ident_list_is_reported_once_and_dropped() {
    let src = b"DEFINITION MODULE Dup;\n  VAR a, b, a: INTEGER;\nEND Dup.";
    let outcome = compile_source(src, "Dup.def", Options::defaults(), SourceType::Any).unwrap();

    let duplicate_count = outcome
        .diagnostics
        .borrow()
        .records()
        .iter()
        .filter(|d| d.kind == DiagnosticKind::DuplicateIdentInIdentList)
        .count();
    assert_eq!(duplicate_count, 1);

    let rendered = writer::to_string(&outcome.root);
    assert!(rendered.contains("(IDENTLIST a b)"));
    assert!(!rendered.contains("a b a"));
}
