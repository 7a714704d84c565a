//! Diagnostics: the closed error/warning taxonomy and emission API.
//!
//! A [`Diagnostics`] sink accumulates [`Diagnostic`] records and tracks error/warning
//! counts; it never aborts on its own — propagation policy lives in the lexer and parser,
//! which decide when a diagnostic also means "stop and resync".

use std::fmt;

use colored::Colorize;

use crate::pool::Symbol;
use crate::reader::SourceReader;
use crate::token_set::TokenKind;

/// The closed diagnostic taxonomy. `Semantic` is listed for completeness; this crate never
/// produces one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    // Lexical
    DisabledCodeSection,
    InvalidInputChar,
    EofInBlockComment,
    NewLineInStringLiteral,
    EofInStringLiteral,
    InvalidEscapeSequence,
    EofInPragma,
    MissingStringDelimiter,
    MissingSuffix,
    MissingExponent,

    // Syntactic
    UnexpectedSymbol,
    InvalidStartSymbol,
    DuplicateIdentInIdentList,
    SemicolonAfterFieldListSeq,
    EmptyFieldListSeq,
    SemicolonAfterFormalParamList,
    SemicolonAfterStmtSeq,
    EmptyStmtSeq,

    // Option
    ConflictingDialectPreset,
}

impl DiagnosticKind {
    pub fn description(self) -> &'static str {
        use DiagnosticKind::*;
        match self {
            DisabledCodeSection => "disabled code section",
            InvalidInputChar => "invalid input character",
            EofInBlockComment => "end of file in block comment",
            NewLineInStringLiteral => "new line in string literal",
            EofInStringLiteral => "end of file in string literal",
            InvalidEscapeSequence => "invalid escape sequence",
            EofInPragma => "end of file in pragma",
            MissingStringDelimiter => "missing string delimiter",
            MissingSuffix => "missing numeric literal suffix",
            MissingExponent => "missing exponent digits",
            UnexpectedSymbol => "unexpected symbol",
            InvalidStartSymbol => "invalid start symbol",
            DuplicateIdentInIdentList => "duplicate identifier in identifier list",
            SemicolonAfterFieldListSeq => "semicolon after field list sequence",
            EmptyFieldListSeq => "empty field list sequence",
            SemicolonAfterFormalParamList => "semicolon after formal parameter list",
            SemicolonAfterStmtSeq => "semicolon after statement sequence",
            EmptyStmtSeq => "empty statement sequence",
            ConflictingDialectPreset => "conflicting dialect preset",
        }
    }

    /// The default severity for this kind when a call site doesn't choose one explicitly.
    /// `SemicolonAfterStmtSeq` is the one kind whose actual severity is chosen per call site
    /// (the `errant_semicolon` option), so this default is only a fallback.
    pub fn is_warning(self) -> bool {
        use DiagnosticKind::*;
        matches!(
            self,
            DisabledCodeSection
                | EmptyFieldListSeq
                | EmptyStmtSeq
                | DuplicateIdentInIdentList
                | SemicolonAfterFieldListSeq
                | SemicolonAfterFormalParamList
                | SemicolonAfterStmtSeq
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Warning,
    Error,
}

/// A single (line, column) position, or a (firstLine, lastLine) range, or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locus {
    None,
    Position { line: usize, column: usize },
    Range { first_line: usize, last_line: usize },
}

/// One recorded error or warning.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub locus: Locus,
    pub lexeme: Option<Symbol>,
    pub offending_token: Option<TokenKind>,
    pub expected: Vec<TokenKind>,
    severity: Severity,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.locus {
            Locus::Position { line, column } => {
                write!(f, "line {line}, column {column}, {}", self.kind.description())?;
            }
            Locus::Range { first_line, last_line } => {
                write!(
                    f,
                    "line {first_line}-{last_line}, {}",
                    self.kind.description()
                )?;
            }
            Locus::None => write!(f, "{}", self.kind.description())?,
        }
        if let Some(lex) = &self.lexeme {
            write!(f, ", offending \"{lex}\"")?;
        }
        if !self.expected.is_empty() {
            write!(f, "\n  expected {}", format_token_list(&self.expected))?;
        }
        Ok(())
    }
}

fn token_class_name(tok: TokenKind) -> String {
    use TokenKind::*;
    match tok {
        Identifier => "identifier".to_string(),
        IntLiteral | RealLiteral | MalformedInteger | MalformedReal => "number literal".to_string(),
        CharLiteral => "character literal".to_string(),
        StringLiteral => "string literal".to_string(),
        EndOfFile => "end of file".to_string(),
        Error => "invalid token".to_string(),
        other => format!("'{other:?}'"),
    }
}

fn format_token_list(tokens: &[TokenKind]) -> String {
    match tokens {
        [] => String::new(),
        [only] => token_class_name(*only),
        many => {
            let (last, rest) = many.split_last().unwrap();
            let joined = rest
                .iter()
                .map(|t| token_class_name(*t))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{joined} or {}", token_class_name(*last))
        }
    }
}

/// Accumulates diagnostics and counts. One instance per parse.
pub struct Diagnostics {
    records: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
    verbose: bool,
}

impl Diagnostics {
    pub fn new(verbose: bool) -> Self {
        Diagnostics {
            records: Vec::new(),
            error_count: 0,
            warning_count: 0,
            verbose,
        }
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    fn record(&mut self, d: Diagnostic) {
        match d.severity {
            Severity::Warning => self.warning_count += 1,
            Severity::Error => self.error_count += 1,
        }
        log::debug!("{d}");
        self.records.push(d);
    }

    pub fn emit_error(&mut self, kind: DiagnosticKind) {
        self.record(Diagnostic {
            kind,
            locus: Locus::None,
            lexeme: None,
            offending_token: None,
            expected: Vec::new(),
            severity: Severity::Error,
        });
    }

    pub fn emit_error_w_lex(&mut self, kind: DiagnosticKind, line: usize, column: usize, lexeme: Symbol) {
        self.record(Diagnostic {
            kind,
            locus: Locus::Position { line, column },
            lexeme: Some(lexeme),
            offending_token: None,
            expected: Vec::new(),
            severity: Severity::Error,
        });
    }

    pub fn emit_error_w_chr(&mut self, kind: DiagnosticKind, line: usize, column: usize, ch: char) {
        self.record(Diagnostic {
            kind,
            locus: Locus::Position { line, column },
            lexeme: None,
            offending_token: None,
            expected: Vec::new(),
            severity: Severity::Error,
        });
        log::trace!("offending character: {ch:?}");
    }

    pub fn emit_error_w_pos(&mut self, kind: DiagnosticKind, line: usize, column: usize) {
        self.record(Diagnostic {
            kind,
            locus: Locus::Position { line, column },
            lexeme: None,
            offending_token: None,
            expected: Vec::new(),
            severity: Severity::Error,
        });
    }

    pub fn emit_warning_w_pos(&mut self, kind: DiagnosticKind, line: usize, column: usize) {
        self.record(Diagnostic {
            kind,
            locus: Locus::Position { line, column },
            lexeme: None,
            offending_token: None,
            expected: Vec::new(),
            severity: Severity::Warning,
        });
    }

    pub fn emit_warning_w_range(&mut self, kind: DiagnosticKind, first_line: usize, last_line: usize) {
        self.record(Diagnostic {
            kind,
            locus: Locus::Range { first_line, last_line },
            lexeme: None,
            offending_token: None,
            expected: Vec::new(),
            severity: Severity::Warning,
        });
    }

    /// Like [`Self::emit_warning_w_pos`]/[`Self::emit_error_w_pos`], but with severity chosen
    /// by the caller rather than fixed by `kind`. The parser uses this for the one diagnostic
    /// whose severity is itself dialect-option-controlled (errant semicolons).
    pub fn emit_w_pos_and_severity(&mut self, kind: DiagnosticKind, line: usize, column: usize, is_error: bool) {
        self.record(Diagnostic {
            kind,
            locus: Locus::Position { line, column },
            lexeme: None,
            offending_token: None,
            expected: Vec::new(),
            severity: if is_error { Severity::Error } else { Severity::Warning },
        });
    }

    pub fn emit_syntax_error_w_token(
        &mut self,
        line: usize,
        column: usize,
        offending_tok: TokenKind,
        offending_lex: Option<Symbol>,
        expected_tok: TokenKind,
    ) {
        self.record(Diagnostic {
            kind: DiagnosticKind::UnexpectedSymbol,
            locus: Locus::Position { line, column },
            lexeme: offending_lex,
            offending_token: Some(offending_tok),
            expected: vec![expected_tok],
            severity: Severity::Error,
        });
    }

    pub fn emit_syntax_error_w_set(
        &mut self,
        line: usize,
        column: usize,
        offending_tok: TokenKind,
        offending_lex: Option<Symbol>,
        expected: Vec<TokenKind>,
    ) {
        self.record(Diagnostic {
            kind: DiagnosticKind::UnexpectedSymbol,
            locus: Locus::Position { line, column },
            lexeme: offending_lex,
            offending_token: Some(offending_tok),
            expected,
            severity: Severity::Error,
        });
    }

    /// Render every recorded diagnostic to `out`, echoing the offending source line with a
    /// caret when `verbose` is set.
    pub fn render(
        &self,
        out: &mut dyn std::io::Write,
        reader: &SourceReader,
        pool: &crate::pool::Pool,
    ) -> std::io::Result<()> {
        for d in &self.records {
            writeln!(out, "{d}")?;
            if self.verbose {
                self.echo_source_line(out, reader, pool, d.locus)?;
            }
        }
        Ok(())
    }

    fn echo_source_line(
        &self,
        out: &mut dyn std::io::Write,
        reader: &SourceReader,
        pool: &crate::pool::Pool,
        locus: Locus,
    ) -> std::io::Result<()> {
        let (line, column) = match locus {
            Locus::Position { line, column } => (line, column),
            Locus::Range { first_line, .. } => (first_line, 1),
            Locus::None => return Ok(()),
        };
        if let Some(text) = reader.source_for_line(line, pool) {
            writeln!(out, "{}", text.as_str())?;
            let marker = format!("{}{}", " ".repeat(column.saturating_sub(1)), "^".bright_red());
            writeln!(out, "{marker}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_and_errors_are_counted_separately() {
        let mut d = Diagnostics::new(false);
        d.emit_warning_w_pos(DiagnosticKind::EmptyStmtSeq, 3, 1);
        d.emit_error_w_pos(DiagnosticKind::InvalidInputChar, 4, 2);
        assert_eq!(d.warning_count(), 1);
        assert_eq!(d.error_count(), 1);
    }

    #[test]
    fn display_formats_position_and_description() {
        let mut d = Diagnostics::new(false);
        d.emit_error_w_pos(DiagnosticKind::EofInBlockComment, 10, 5);
        let rendered = format!("{}", d.records()[0]);
        assert_eq!(rendered, "line 10, column 5, end of file in block comment");
    }

    #[test]
    fn expected_set_renders_with_oxford_or() {
        let list = format_token_list(&[TokenKind::Identifier, TokenKind::Const, TokenKind::End]);
        assert_eq!(list, "identifier, 'Const' or 'End'");
    }

    #[test]
    fn single_expected_token_has_no_connective() {
        let list = format_token_list(&[TokenKind::EndOfFile]);
        assert_eq!(list, "end of file");
    }
}
