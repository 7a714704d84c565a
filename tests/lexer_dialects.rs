//! Dialect-toggle coverage for the lexer.

use std::cell::RefCell;
use std::rc::Rc;

use m2fc::diagnostics::Diagnostics;
use m2fc::lexer::Lexer;
use m2fc::options::Options;
use m2fc::pool::Pool;
use m2fc::reader::SourceReader;
use m2fc::token_set::TokenKind;

fn lex_all(src: &str, options: Options) -> Vec<TokenKind> {
    let pool = Pool::new(64).unwrap();
    let reader = SourceReader::from_bytes(src.as_bytes().to_vec(), "<test>", &pool).unwrap();
    let diagnostics = Rc::new(RefCell::new(Diagnostics::new(false)));
    let mut lexer = Lexer::new(reader, pool, options, diagnostics).unwrap();
    let mut kinds = Vec::new();
    loop {
        let kind = lexer.lookahead_token();
        kinds.push(kind);
        if kind == TokenKind::EndOfFile {
            break;
        }
        lexer.consume_sym().unwrap();
    }
    kinds
}

#[test]
fn ampersand_is_and_only_when_synonyms_is_on() {
    let mut opts = Options::defaults();
    opts.synonyms = true;
    assert_eq!(lex_all("&", opts)[0], TokenKind::And);

    let opts = Options::defaults();
    assert_ne!(lex_all("&", opts)[0], TokenKind::And);
}

#[test]
fn tilde_is_not_only_when_synonyms_is_on() {
    let mut opts = Options::defaults();
    opts.synonyms = true;
    assert_eq!(lex_all("~", opts)[0], TokenKind::Not);
}

#[test]
fn diamond_is_not_equal_only_when_synonyms_is_on() {
    let mut opts = Options::defaults();
    opts.synonyms = true;
    assert_eq!(lex_all("<>", opts)[0], TokenKind::NotEqual);
}

#[test]
fn lowline_identifiers_gated_by_option() {
    let mut opts = Options::defaults();
    opts.lowline_identifiers = true;
    assert_eq!(lex_all("my_ident", opts)[0], TokenKind::Identifier);
}

#[test]
fn reserved_word_wins_over_identifier_on_exact_byte_match() {
    let opts = Options::defaults();
    assert_eq!(lex_all("MODULE", opts)[0], TokenKind::Module);
}

#[test]
fn prefix_mode_hex_and_char_code_literals() {
    let mut opts = Options::defaults();
    opts.prefix_literals = true;
    assert_eq!(lex_all("0x1F", opts)[0], TokenKind::IntLiteral);
    assert_eq!(lex_all("0u41", opts)[0], TokenKind::CharLiteral);
}

#[test]
fn suffix_mode_octal_literal_gated_by_option() {
    let mut opts = Options::defaults();
    opts.octal_literals = true;
    assert_eq!(lex_all("17B", opts)[0], TokenKind::IntLiteral);
}

#[test]
fn suffix_mode_hex_literal_is_recognised() {
    let opts = Options::defaults();
    assert_eq!(lex_all("0FFH", opts)[0], TokenKind::IntLiteral);
}
