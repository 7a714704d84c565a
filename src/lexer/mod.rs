//! Lexer: converts the character stream from a [`SourceReader`] into a stream of
//! [`Token`]s, honouring the dialect [`Options`].
//!
//! The lexer owns one token of buffered lookahead, primed on construction; every
//! recognition rule is implemented as a private `scan_*` helper dispatched from
//! [`Lexer::scan_token`]. Lexical faults never abort the scan — they're reported through
//! the shared [`Diagnostics`] sink and recovered locally; only a column overflow from the
//! reader is fatal.

pub mod token;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::options::Options;
use crate::pool::Pool;
use crate::reader::{ReaderError, ReaderStatus, SourceReader, EOT};
use crate::token_set::TokenKind;

pub use token::Token;

/// Shared handle to a [`Diagnostics`] sink; the lexer and parser both write through it.
pub type DiagSink = Rc<RefCell<Diagnostics>>;

/// The only fatal condition a lexer can raise once its [`SourceReader`] is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    Reader(ReaderError),
}

impl From<ReaderError> for LexError {
    fn from(e: ReaderError) -> Self {
        LexError::Reader(e)
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::Reader(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LexError {}

pub struct Lexer {
    reader: SourceReader,
    pool: Pool,
    options: Options,
    diagnostics: DiagSink,
    lookahead: Token,
    current: Token,
    lexical_error_count: usize,
}

impl Lexer {
    pub fn new(
        reader: SourceReader,
        pool: Pool,
        options: Options,
        diagnostics: DiagSink,
    ) -> Result<Self, LexError> {
        let mut lexer = Lexer {
            reader,
            pool,
            options,
            diagnostics,
            lookahead: Token::eof(1, 1),
            current: Token::eof(1, 1),
            lexical_error_count: 0,
        };
        let first = lexer.scan_token()?;
        lexer.current = first.clone();
        lexer.lookahead = first;
        Ok(lexer)
    }

    pub fn filename(&self) -> crate::pool::Symbol {
        self.reader.filename().clone()
    }

    pub fn status(&self) -> ReaderStatus {
        self.reader.status()
    }

    pub fn error_count(&self) -> usize {
        self.lexical_error_count
    }

    pub fn lookahead_token(&self) -> TokenKind {
        self.lookahead.kind
    }

    pub fn lookahead_lexeme(&self) -> Option<&crate::pool::Symbol> {
        self.lookahead.lexeme.as_ref()
    }

    pub fn lookahead_line(&self) -> usize {
        self.lookahead.line
    }

    pub fn lookahead_column(&self) -> usize {
        self.lookahead.column
    }

    pub fn current_token(&self) -> TokenKind {
        self.current.kind
    }

    pub fn current_lexeme(&self) -> Option<&crate::pool::Symbol> {
        self.current.lexeme.as_ref()
    }

    pub fn current_line(&self) -> usize {
        self.current.line
    }

    pub fn current_column(&self) -> usize {
        self.current.column
    }

    /// Source line text, for verbose diagnostics.
    pub fn source_for_line(&self, n: usize) -> Option<crate::pool::Symbol> {
        self.reader.source_for_line(n, &self.pool)
    }

    /// Advance past the buffered lookahead and fetch the next token, returning its kind.
    pub fn consume_sym(&mut self) -> Result<TokenKind, LexError> {
        let next = self.scan_token()?;
        self.current = std::mem::replace(&mut self.lookahead, next);
        Ok(self.lookahead.kind)
    }

    fn emit_error(&mut self, kind: DiagnosticKind, line: usize, column: usize) {
        self.diagnostics.borrow_mut().emit_error_w_pos(kind, line, column);
        if !kind.is_warning() {
            self.lexical_error_count += 1;
        }
    }

    fn emit_error_chr(&mut self, kind: DiagnosticKind, line: usize, column: usize, ch: char) {
        self.diagnostics.borrow_mut().emit_error_w_chr(kind, line, column, ch);
        if !kind.is_warning() {
            self.lexical_error_count += 1;
        }
    }

    fn emit_warning_range(&mut self, kind: DiagnosticKind, first_line: usize, last_line: usize) {
        self.diagnostics
            .borrow_mut()
            .emit_warning_w_range(kind, first_line, last_line);
    }

    fn consume(&mut self) -> Result<char, LexError> {
        Ok(self.reader.consume_char()?)
    }

    fn is_control_other_than_tab_or_lf(ch: char) -> bool {
        ch != '\t' && ch != '\n' && !(32..=126).contains(&(ch as u32)) && ch != EOT
    }

    /// Skip whitespace and comments, recognise pragmas and disabled-code sections, and
    /// return the next real token.
    fn scan_token(&mut self) -> Result<Token, LexError> {
        loop {
            match self.reader.next_char() {
                ' ' | '\t' | '\n' => {
                    self.consume()?;
                }
                '!' if self.options.line_comments => {
                    self.skip_line_comment()?;
                }
                '!' => {
                    let (line, col) = (self.reader.line(), self.reader.column());
                    self.emit_error_chr(DiagnosticKind::InvalidInputChar, line, col, '!');
                    self.consume()?;
                }
                '(' if self.reader.la2_char() == '*' => {
                    self.skip_block_comment()?;
                }
                '<' if self.reader.la2_char() == '*' => {
                    return self.scan_pragma();
                }
                '?' if self.reader.la2_char() == '<' && self.reader.column() == 1 => {
                    self.skip_disabled_section()?;
                }
                EOT => return Ok(Token::eof(self.reader.line(), self.reader.column())),
                ch => return self.scan_real_token(ch),
            }
        }
    }

    fn skip_line_comment(&mut self) -> Result<(), LexError> {
        self.consume()?; // '!'
        loop {
            match self.reader.next_char() {
                '\n' | EOT => return Ok(()),
                _ => {
                    self.consume()?;
                }
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        self.consume()?; // '('
        self.consume()?; // '*'
        let mut depth: u32 = 1;
        loop {
            match self.reader.next_char() {
                EOT => {
                    let (line, col) = (self.reader.line(), self.reader.column());
                    self.emit_error(DiagnosticKind::EofInBlockComment, line, col);
                    return Ok(());
                }
                '(' if self.reader.la2_char() == '*' => {
                    self.consume()?;
                    self.consume()?;
                    depth += 1;
                }
                '*' if self.reader.la2_char() == ')' => {
                    self.consume()?;
                    self.consume()?;
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                '\t' | '\n' => {
                    self.consume()?;
                }
                ch if Self::is_control_other_than_tab_or_lf(ch) => {
                    let (line, col) = (self.reader.line(), self.reader.column());
                    self.emit_error_chr(DiagnosticKind::InvalidInputChar, line, col, ch);
                    self.consume()?;
                }
                _ => {
                    self.consume()?;
                }
            }
        }
    }

    fn scan_pragma(&mut self) -> Result<Token, LexError> {
        let (line, col) = (self.reader.line(), self.reader.column());
        self.consume()?; // '<'
        self.consume()?; // '*'
        self.reader.mark_lexeme();
        loop {
            match self.reader.next_char() {
                EOT => {
                    self.emit_error(DiagnosticKind::EofInPragma, self.reader.line(), self.reader.column());
                    let lexeme = self.reader.read_marked_lexeme(&self.pool);
                    return Ok(Token::new(TokenKind::Pragma, Some(lexeme), line, col));
                }
                '*' if self.reader.la2_char() == '>' => {
                    let lexeme = self.reader.read_marked_lexeme(&self.pool);
                    self.consume()?;
                    self.consume()?;
                    return Ok(Token::new(TokenKind::Pragma, Some(lexeme), line, col));
                }
                _ => {
                    self.consume()?;
                }
            }
        }
    }

    fn skip_disabled_section(&mut self) -> Result<(), LexError> {
        let first_line = self.reader.line();
        self.consume()?; // '?'
        self.consume()?; // '<'
        loop {
            match self.reader.next_char() {
                EOT => break,
                '>' if self.reader.column() == 1 && self.reader.la2_char() == '?' => {
                    self.consume()?;
                    self.consume()?;
                    break;
                }
                ch if Self::is_control_other_than_tab_or_lf(ch) => {
                    let (line, col) = (self.reader.line(), self.reader.column());
                    self.emit_error_chr(DiagnosticKind::InvalidInputChar, line, col, ch);
                    self.consume()?;
                }
                _ => {
                    self.consume()?;
                }
            }
        }
        let last_line = self.reader.line();
        self.emit_warning_range(DiagnosticKind::DisabledCodeSection, first_line, last_line);
        Ok(())
    }

    fn scan_real_token(&mut self, ch: char) -> Result<Token, LexError> {
        let (line, col) = (self.reader.line(), self.reader.column());
        if ch.is_ascii_alphabetic() {
            return self.scan_identifier(line, col);
        }
        if ch.is_ascii_digit() {
            return self.scan_number(line, col);
        }
        if ch == '\'' || ch == '"' {
            return self.scan_string(line, col, ch);
        }
        self.scan_symbol(line, col, ch)
    }

    fn scan_identifier(&mut self, line: usize, col: usize) -> Result<Token, LexError> {
        self.reader.mark_lexeme();
        self.consume()?;
        loop {
            let c = self.reader.next_char();
            if c.is_ascii_alphanumeric() {
                self.consume()?;
            } else if c == '_' && self.options.lowline_identifiers && self.reader.la2_char().is_ascii_alphanumeric() {
                self.consume()?;
            } else {
                break;
            }
        }
        let lexeme = self.reader.read_marked_lexeme(&self.pool);
        let text = lexeme.as_str();
        if text.chars().all(|c| c.is_ascii_uppercase()) {
            if let Some(kind) = TokenKind::reserved_word(text) {
                return Ok(Token::new(kind, None, line, col));
            }
        }
        Ok(Token::new(TokenKind::Identifier, Some(lexeme), line, col))
    }

    /// Consumes an optional `.digit+` fraction and an optional `E`/`e` exponent. Two
    /// trailing dots (a range operator) are never consumed as a fraction.
    fn scan_fractional_exponent_tail(&mut self) -> Result<(bool, bool), LexError> {
        let mut is_real = false;
        let mut malformed = false;
        if self.reader.next_char() == '.' && self.reader.la2_char() != '.' {
            is_real = true;
            self.consume()?;
            if !self.reader.next_char().is_ascii_digit() {
                malformed = true;
            } else {
                while self.reader.next_char().is_ascii_digit() {
                    self.consume()?;
                }
            }
        }
        if matches!(self.reader.next_char(), 'E' | 'e') {
            is_real = true;
            self.consume()?;
            if matches!(self.reader.next_char(), '+' | '-') {
                self.consume()?;
            }
            if !self.reader.next_char().is_ascii_digit() {
                malformed = true;
            } else {
                while self.reader.next_char().is_ascii_digit() {
                    self.consume()?;
                }
            }
        }
        Ok((is_real, malformed))
    }

    fn scan_number(&mut self, line: usize, col: usize) -> Result<Token, LexError> {
        self.reader.mark_lexeme();
        if self.options.prefix_literals {
            self.scan_number_prefix_mode(line, col)
        } else {
            self.scan_number_suffix_mode(line, col)
        }
    }

    fn scan_number_prefix_mode(&mut self, line: usize, col: usize) -> Result<Token, LexError> {
        if self.reader.next_char() == '0' && matches!(self.reader.la2_char(), 'x' | 'u') {
            let is_char_code = self.reader.la2_char() == 'u';
            self.consume()?;
            self.consume()?;
            let mut digits = 0u32;
            while self.reader.next_char().is_ascii_hexdigit() {
                self.consume()?;
                digits += 1;
            }
            let lexeme = self.reader.read_marked_lexeme(&self.pool);
            if digits == 0 {
                self.emit_error(DiagnosticKind::MissingSuffix, line, col);
                return Ok(Token::new(TokenKind::MalformedInteger, Some(lexeme), line, col));
            }
            let kind = if is_char_code {
                TokenKind::CharLiteral
            } else {
                TokenKind::IntLiteral
            };
            return Ok(Token::new(kind, Some(lexeme), line, col));
        }

        while self.reader.next_char().is_ascii_digit() {
            self.consume()?;
        }
        let (is_real, malformed) = self.scan_fractional_exponent_tail()?;
        let lexeme = self.reader.read_marked_lexeme(&self.pool);
        if malformed {
            self.emit_error(DiagnosticKind::MissingExponent, line, col);
            return Ok(Token::new(TokenKind::MalformedReal, Some(lexeme), line, col));
        }
        let kind = if is_real { TokenKind::RealLiteral } else { TokenKind::IntLiteral };
        Ok(Token::new(kind, Some(lexeme), line, col))
    }

    fn scan_number_suffix_mode(&mut self, line: usize, col: usize) -> Result<Token, LexError> {
        let mut all_octal = true;
        let mut all_decimal = true;
        loop {
            let c = self.reader.next_char();
            if c.is_ascii_digit() {
                if !('0'..='7').contains(&c) {
                    all_octal = false;
                }
                self.consume()?;
            } else if ('A'..='F').contains(&c) {
                all_octal = false;
                all_decimal = false;
                self.consume()?;
            } else {
                break;
            }
        }
        match self.reader.next_char() {
            'H' => {
                self.consume()?;
                let lexeme = self.reader.read_marked_lexeme(&self.pool);
                Ok(Token::new(TokenKind::IntLiteral, Some(lexeme), line, col))
            }
            c @ ('B' | 'C') if self.options.octal_literals && all_octal => {
                self.consume()?;
                let lexeme = self.reader.read_marked_lexeme(&self.pool);
                let kind = if c == 'B' { TokenKind::IntLiteral } else { TokenKind::CharLiteral };
                Ok(Token::new(kind, Some(lexeme), line, col))
            }
            _ if !all_decimal => {
                let lexeme = self.reader.read_marked_lexeme(&self.pool);
                self.emit_error(DiagnosticKind::MissingSuffix, line, col);
                Ok(Token::new(TokenKind::MalformedInteger, Some(lexeme), line, col))
            }
            _ => {
                let (is_real, malformed) = self.scan_fractional_exponent_tail()?;
                let lexeme = self.reader.read_marked_lexeme(&self.pool);
                if malformed {
                    self.emit_error(DiagnosticKind::MissingExponent, line, col);
                    return Ok(Token::new(TokenKind::MalformedReal, Some(lexeme), line, col));
                }
                let kind = if is_real { TokenKind::RealLiteral } else { TokenKind::IntLiteral };
                Ok(Token::new(kind, Some(lexeme), line, col))
            }
        }
    }

    fn scan_string(&mut self, line: usize, col: usize, delim: char) -> Result<Token, LexError> {
        self.consume()?; // opening delimiter
        self.reader.mark_lexeme();
        loop {
            let c = self.reader.next_char();
            if c == EOT {
                self.emit_error(DiagnosticKind::EofInStringLiteral, self.reader.line(), self.reader.column());
                let lexeme = self.reader.read_marked_lexeme(&self.pool);
                return Ok(Token::new(TokenKind::StringLiteral, Some(lexeme), line, col));
            }
            if c == '\n' {
                self.emit_error(DiagnosticKind::NewLineInStringLiteral, self.reader.line(), self.reader.column());
                let lexeme = self.reader.read_marked_lexeme(&self.pool);
                return Ok(Token::new(TokenKind::StringLiteral, Some(lexeme), line, col));
            }
            if c == delim {
                let lexeme = self.reader.read_marked_lexeme(&self.pool);
                self.consume()?;
                return Ok(Token::new(TokenKind::StringLiteral, Some(lexeme), line, col));
            }
            if c == '\\' && self.options.escape_tab_and_newline {
                self.consume()?;
                match self.reader.next_char() {
                    '\\' | 'n' | 't' => {
                        self.consume()?;
                    }
                    EOT => {
                        self.emit_error(DiagnosticKind::EofInStringLiteral, self.reader.line(), self.reader.column());
                    }
                    other => {
                        self.emit_error_chr(
                            DiagnosticKind::InvalidEscapeSequence,
                            self.reader.line(),
                            self.reader.column(),
                            other,
                        );
                        self.consume()?;
                    }
                }
                continue;
            }
            if Self::is_control_other_than_tab_or_lf(c) {
                self.emit_error_chr(DiagnosticKind::InvalidInputChar, self.reader.line(), self.reader.column(), c);
                self.consume()?;
                continue;
            }
            self.consume()?;
        }
    }

    fn scan_symbol(&mut self, line: usize, col: usize, ch: char) -> Result<Token, LexError> {
        match ch {
            '+' => self.one(TokenKind::Plus, line, col),
            '-' => self.one(TokenKind::Minus, line, col),
            '=' => self.one(TokenKind::Equal, line, col),
            '#' => self.one(TokenKind::NotEqual, line, col),
            '*' => self.one(TokenKind::Asterisk, line, col),
            '/' => self.one(TokenKind::Solidus, line, col),
            ',' => self.one(TokenKind::Comma, line, col),
            ';' => self.one(TokenKind::Semicolon, line, col),
            '^' => self.one(TokenKind::Caret, line, col),
            '|' => self.one(TokenKind::Bar, line, col),
            '(' => self.one(TokenKind::LParen, line, col),
            ')' => self.one(TokenKind::RParen, line, col),
            '[' => self.one(TokenKind::LBracket, line, col),
            ']' => self.one(TokenKind::RBracket, line, col),
            '{' => self.one(TokenKind::LBrace, line, col),
            '}' => self.one(TokenKind::RBrace, line, col),
            ':' => {
                self.consume()?;
                if self.reader.next_char() == '=' {
                    self.consume()?;
                    Ok(Token::new(TokenKind::Assign, None, line, col))
                } else {
                    Ok(Token::new(TokenKind::Colon, None, line, col))
                }
            }
            '<' => {
                self.consume()?;
                match self.reader.next_char() {
                    '=' => {
                        self.consume()?;
                        Ok(Token::new(TokenKind::LessEqual, None, line, col))
                    }
                    '>' if self.options.synonyms => {
                        self.consume()?;
                        Ok(Token::new(TokenKind::NotEqual, None, line, col))
                    }
                    _ => Ok(Token::new(TokenKind::Less, None, line, col)),
                }
            }
            '>' => {
                self.consume()?;
                if self.reader.next_char() == '=' {
                    self.consume()?;
                    Ok(Token::new(TokenKind::GreaterEqual, None, line, col))
                } else {
                    Ok(Token::new(TokenKind::Greater, None, line, col))
                }
            }
            '.' => {
                self.consume()?;
                if self.reader.next_char() == '.' {
                    self.consume()?;
                    Ok(Token::new(TokenKind::DotDot, None, line, col))
                } else {
                    Ok(Token::new(TokenKind::Period, None, line, col))
                }
            }
            '&' if self.options.synonyms => self.one(TokenKind::And, line, col),
            '~' if self.options.synonyms => self.one(TokenKind::Not, line, col),
            _ => {
                self.emit_error_chr(DiagnosticKind::InvalidInputChar, line, col, ch);
                self.consume()?;
                self.scan_token()
            }
        }
    }

    fn one(&mut self, kind: TokenKind, line: usize, col: usize) -> Result<Token, LexError> {
        self.consume()?;
        Ok(Token::new(kind, None, line, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str, options: Options) -> (Lexer, Pool) {
        let pool = Pool::new(64).unwrap();
        let reader = SourceReader::from_bytes(src.as_bytes().to_vec(), "<test>", &pool).unwrap();
        let diagnostics = Rc::new(RefCell::new(Diagnostics::new(false)));
        (Lexer::new(reader, pool.clone(), options, diagnostics).unwrap(), pool)
    }

    #[test]
    fn reserved_word_wins_over_identifier_for_exact_byte_match() {
        let (lexer, _pool) = lex("MODULE", Options::defaults());
        assert_eq!(lexer.lookahead_token(), TokenKind::Module);
    }

    #[test]
    fn mixed_case_identifier_is_not_promoted() {
        let (lexer, _pool) = lex("Module", Options::defaults());
        assert_eq!(lexer.lookahead_token(), TokenKind::Identifier);
    }

    #[test]
    fn skips_line_comment_to_end_of_line() {
        let (mut lexer, _pool) = lex("! comment\nBEGIN", Options::defaults());
        assert_eq!(lexer.lookahead_token(), TokenKind::Begin);
        assert_eq!(lexer.consume_sym().unwrap(), TokenKind::EndOfFile);
    }

    #[test]
    fn nested_block_comments_balance_depth() {
        let (lexer, _pool) = lex("(* outer (* inner *) still *)END", Options::defaults());
        assert_eq!(lexer.lookahead_token(), TokenKind::End);
    }

    #[test]
    fn unterminated_block_comment_reports_and_reaches_eof() {
        let (lexer, _pool) = lex("(* never closes", Options::defaults());
        assert_eq!(lexer.lookahead_token(), TokenKind::EndOfFile);
        assert_eq!(lexer.error_count(), 1);
    }

    #[test]
    fn pragma_lexeme_is_the_inner_text() {
        let (lexer, _pool) = lex("<* FOO BAR *>", Options::defaults());
        assert_eq!(lexer.lookahead_token(), TokenKind::Pragma);
        assert_eq!(lexer.lookahead_lexeme().unwrap().as_str(), " FOO BAR ");
    }

    #[test]
    fn string_literal_captures_text_between_matching_quotes() {
        let (lexer, _pool) = lex(r#""hi""#, Options::defaults());
        assert_eq!(lexer.lookahead_token(), TokenKind::StringLiteral);
        assert_eq!(lexer.lookahead_lexeme().unwrap().as_str(), "hi");
    }

    #[test]
    fn single_quote_string_is_accepted_too() {
        let (lexer, _pool) = lex("'hi'", Options::defaults());
        assert_eq!(lexer.lookahead_token(), TokenKind::StringLiteral);
    }

    #[test]
    fn suffix_mode_hex_integer_requires_h() {
        let (lexer, _pool) = lex("0FFH", Options::defaults());
        assert_eq!(lexer.lookahead_token(), TokenKind::IntLiteral);
    }

    #[test]
    fn suffix_mode_missing_h_is_malformed() {
        let (lexer, _pool) = lex("0FF", Options::defaults());
        assert_eq!(lexer.lookahead_token(), TokenKind::MalformedInteger);
        assert_eq!(lexer.error_count(), 1);
    }

    #[test]
    fn suffix_mode_decimal_real_with_fraction() {
        let (lexer, _pool) = lex("3.14159", Options::defaults());
        assert_eq!(lexer.lookahead_token(), TokenKind::RealLiteral);
        assert_eq!(lexer.lookahead_lexeme().unwrap().as_str(), "3.14159");
    }

    #[test]
    fn range_operator_is_not_confused_with_a_fraction() {
        let (mut lexer, _pool) = lex("1..5", Options::defaults());
        assert_eq!(lexer.lookahead_token(), TokenKind::IntLiteral);
        lexer.consume_sym().unwrap();
        assert_eq!(lexer.current_token(), TokenKind::DotDot);
    }

    #[test]
    fn prefix_mode_hex_and_char_code_literals() {
        let mut opts = Options::defaults();
        opts.prefix_literals = true;
        let (lexer, _pool) = lex("0x1F", opts);
        assert_eq!(lexer.lookahead_token(), TokenKind::IntLiteral);

        let (lexer2, _pool2) = lex("0u41", opts);
        assert_eq!(lexer2.lookahead_token(), TokenKind::CharLiteral);
    }

    #[test]
    fn synonyms_map_ampersand_and_tilde_and_diamond() {
        let mut opts = Options::defaults();
        opts.synonyms = true;
        let (lexer, _pool) = lex("&", opts);
        assert_eq!(lexer.lookahead_token(), TokenKind::And);
        let (lexer2, _pool2) = lex("~", opts);
        assert_eq!(lexer2.lookahead_token(), TokenKind::Not);
        let (lexer3, _pool3) = lex("<>", opts);
        assert_eq!(lexer3.lookahead_token(), TokenKind::NotEqual);
    }

    #[test]
    fn diamond_without_synonyms_parses_as_less_then_greater() {
        let (mut lexer, _pool) = lex("<>", Options::defaults());
        assert_eq!(lexer.lookahead_token(), TokenKind::Less);
        lexer.consume_sym().unwrap();
        assert_eq!(lexer.current_token(), TokenKind::Greater);
    }

    #[test]
    fn disabled_code_section_emits_a_warning_and_produces_no_tokens() {
        let (lexer, _pool) = lex("?<\njunk here\n>?\nEND", Options::defaults());
        assert_eq!(lexer.lookahead_token(), TokenKind::End);
        assert_eq!(lexer.error_count(), 0);
    }

    #[test]
    fn lowline_identifiers_permit_single_internal_underscore() {
        let mut opts = Options::defaults();
        opts.lowline_identifiers = true;
        let (lexer, _pool) = lex("foo_bar", opts);
        assert_eq!(lexer.lookahead_token(), TokenKind::Identifier);
        assert_eq!(lexer.lookahead_lexeme().unwrap().as_str(), "foo_bar");
    }
}
