//! Parser: a top-down predictive parser with one token of lookahead, per-nonterminal
//! procedures, and panic-mode recovery driven by the FIRST/FOLLOW/RESYNC tables in
//! [`crate::token_set`].
//!
//! Every grammar procedure returns a [`Node`] and never aborts on a syntax error: a failed
//! `match_token`/`match_set` records a diagnostic, resyncs the lexer to a recovery point,
//! and the caller keeps building whatever subtree it can out of what follows. The one
//! exception is [`ParseFatal`], a defensive guard against a resync set that is empty by
//! construction — a condition every literal table in `token_set` is built to avoid, so this
//! should never actually fire.

use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::{Node, Tag};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::fifo::Fifo;
use crate::lexer::{LexError, Lexer};
use crate::options::Options;
use crate::pool::{Pool, Symbol};
use crate::token_set::*;

pub type DiagSink = Rc<RefCell<Diagnostics>>;

/// A defensive invariant violation: a recovery set turned out empty before `ALWAYS_RESYNC`
/// was unioned in. Every literal resync table in `token_set` is non-empty, so this should
/// be unreachable in practice.
#[derive(Debug)]
pub enum ParseFatal {
    EmptyResyncSet,
    Lex(LexError),
}

impl From<LexError> for ParseFatal {
    fn from(e: LexError) -> Self {
        ParseFatal::Lex(e)
    }
}

impl std::fmt::Display for ParseFatal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseFatal::EmptyResyncSet => write!(f, "internal error: empty recovery set"),
            ParseFatal::Lex(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ParseFatal {}

/// Which compilation-unit shape the caller expects: any of the three, or one dispatch
/// mode pinned in advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    Any,
    DefinitionOnly,
    ImplementationOrProgramOnly,
}

/// Whether the top-level production matched. Every other failure is reflected only in the
/// diagnostics error count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserStatus {
    Ok,
    InvalidStartSymbol,
}

pub struct Parser {
    lexer: Lexer,
    pool: Pool,
    options: Options,
    diagnostics: DiagSink,
    status: ParserStatus,
}

impl Parser {
    pub fn new(lexer: Lexer, pool: Pool, options: Options, diagnostics: DiagSink) -> Self {
        Parser {
            lexer,
            pool,
            options,
            diagnostics,
            status: ParserStatus::Ok,
        }
    }

    pub fn status(&self) -> ParserStatus {
        self.status
    }

    /// Parse one compilation unit and wrap it as `ROOT(FILENAME, OPTIONS, body)`.
    pub fn parse(&mut self, source_type: SourceType) -> Result<Node, ParseFatal> {
        let body = self.compilation_unit(source_type)?;
        if self.lexer.lookahead_token() != TokenKind::EndOfFile {
            self.syntax_error_token(TokenKind::EndOfFile)?;
        }
        let filename = Node::new_terminal(Tag::Filename, self.lexer.filename());
        let options_node = self.build_options_node();
        Ok(Node::new_branch(Tag::Root, vec![filename, options_node, body]))
    }

    fn compilation_unit(&mut self, source_type: SourceType) -> Result<Node, ParseFatal> {
        use TokenKind::*;
        let lookahead = self.lexer.lookahead_token();
        let accepts = |allowed: TokenKind| match source_type {
            SourceType::Any => matches!(lookahead, Definition | Implementation | Module) && lookahead == allowed,
            SourceType::DefinitionOnly => lookahead == Definition && allowed == Definition,
            SourceType::ImplementationOrProgramOnly => {
                matches!(lookahead, Implementation | Module) && lookahead == allowed
            }
        };
        if lookahead == Definition && accepts(Definition) {
            return self.definition_module();
        }
        if lookahead == Implementation && accepts(Implementation) {
            return self.implementation_or_program_module();
        }
        if lookahead == Module && accepts(Module) {
            return self.implementation_or_program_module();
        }
        let (line, col) = (self.lexer.lookahead_line(), self.lexer.lookahead_column());
        self.diagnostics
            .borrow_mut()
            .emit_error_w_pos(DiagnosticKind::InvalidStartSymbol, line, col);
        self.status = ParserStatus::InvalidStartSymbol;
        self.resync(ALWAYS_RESYNC)?;
        Ok(Node::empty())
    }

    fn build_options_node(&self) -> Node {
        let defaults = Options::defaults();
        let mut fifo = Fifo::new();
        for flag in crate::options::Flag::ALL {
            if self.options.get(flag) != defaults.get(flag) {
                fifo.append(self.pool.intern(flag.cli_name()));
            }
        }
        Node::new_terminal_list(Tag::Options, fifo)
    }

    // --- token-stream primitives ---------------------------------------------------------

    fn advance(&mut self) -> Result<(), ParseFatal> {
        self.lexer.consume_sym()?;
        Ok(())
    }

    fn syntax_error_token(&mut self, expected: TokenKind) -> Result<(), ParseFatal> {
        let (line, col) = (self.lexer.lookahead_line(), self.lexer.lookahead_column());
        let tok = self.lexer.lookahead_token();
        let lex = self.lexer.lookahead_lexeme().cloned();
        self.diagnostics
            .borrow_mut()
            .emit_syntax_error_w_token(line, col, tok, lex, expected);
        Ok(())
    }

    fn syntax_error_set(&mut self, expected: TokenSet) -> Result<(), ParseFatal> {
        let (line, col) = (self.lexer.lookahead_line(), self.lexer.lookahead_column());
        let tok = self.lexer.lookahead_token();
        let lex = self.lexer.lookahead_lexeme().cloned();
        self.diagnostics
            .borrow_mut()
            .emit_syntax_error_w_set(line, col, tok, lex, expected.iter().collect());
        Ok(())
    }

    /// Advance past tokens until the lookahead is in `resync` (or `ALWAYS_RESYNC`, which is
    /// unioned in unconditionally). Fails only if `resync` was empty before that union.
    fn resync(&mut self, resync: TokenSet) -> Result<(), ParseFatal> {
        if resync.is_empty() {
            return Err(ParseFatal::EmptyResyncSet);
        }
        let resync = resync.union(ALWAYS_RESYNC);
        while !resync.contains(self.lexer.lookahead_token()) {
            self.advance()?;
        }
        Ok(())
    }

    /// Returns `true` and leaves the lookahead untouched if it matches `expected`; otherwise
    /// records a diagnostic, resyncs, and returns `false`.
    fn match_token(&mut self, expected: TokenKind, resync: TokenSet) -> Result<bool, ParseFatal> {
        if self.lexer.lookahead_token() == expected {
            Ok(true)
        } else {
            self.syntax_error_token(expected)?;
            self.resync(resync)?;
            Ok(false)
        }
    }

    fn match_set(&mut self, expected: TokenSet, resync: TokenSet) -> Result<bool, ParseFatal> {
        if expected.contains(self.lexer.lookahead_token()) {
            Ok(true)
        } else {
            self.syntax_error_set(expected)?;
            self.resync(resync)?;
            Ok(false)
        }
    }

    /// `match_token` plus consuming the token on success; the common case.
    fn expect(&mut self, expected: TokenKind, resync: TokenSet) -> Result<bool, ParseFatal> {
        let matched = self.match_token(expected, resync)?;
        if matched {
            self.advance()?;
        }
        Ok(matched)
    }

    fn expect_identifier(&mut self, resync: TokenSet) -> Result<Option<Symbol>, ParseFatal> {
        if self.match_set(FIRST_DESIGNATOR, resync)? {
            let lex = self.lexer.lookahead_lexeme().cloned();
            self.advance()?;
            Ok(lex)
        } else {
            Ok(None)
        }
    }

    /// An `IDENT` leaf, or `EMPTY` if no identifier was present (the caller has already
    /// resynced via `expect_identifier`).
    fn ident_node(&mut self, resync: TokenSet) -> Result<Node, ParseFatal> {
        Ok(match self.expect_identifier(resync)? {
            Some(sym) => Node::new_terminal(Tag::Ident, sym),
            None => Node::empty(),
        })
    }

    // --- compilation units -----------------------------------------------------------------

    fn definition_module(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // DEFINITION
        self.expect(TokenKind::Module, FOLLOW_IMPORT)?;
        let ident = self.ident_node(FOLLOW_IMPORT)?;
        self.expect(TokenKind::Semicolon, FOLLOW_IMPORT)?;

        let mut imports = Fifo::new();
        while FIRST_IMPORT.contains(self.lexer.lookahead_token()) {
            imports.append(self.import()?);
        }
        let implist = Node::new_list(Tag::ImpList, imports);

        let mut defs = Fifo::new();
        while FIRST_DEFINITION.contains(self.lexer.lookahead_token()) {
            self.definition(&mut defs)?;
        }
        let deflist = Node::new_list(Tag::DefList, defs);

        self.expect(TokenKind::End, RESYNC_PERIOD)?;
        if self.lexer.lookahead_token() == TokenKind::Identifier {
            self.advance()?;
        }
        self.expect(TokenKind::Period, ALWAYS_RESYNC)?;

        Ok(Node::new_branch(Tag::DefMod, vec![ident, implist, deflist]))
    }

    /// `implementationModule` and `programModule` share one AST shape: `IMPMOD(ident,
    /// priorityOrEmpty, implist, block)`. Structurally they differ only in their leading
    /// keyword(s).
    fn implementation_or_program_module(&mut self) -> Result<Node, ParseFatal> {
        if self.lexer.lookahead_token() == TokenKind::Implementation {
            self.advance()?; // IMPLEMENTATION
        }
        self.expect(TokenKind::Module, FOLLOW_IMPORT)?;
        let ident = self.ident_node(FOLLOW_IMPORT)?;

        let priority = if self.lexer.lookahead_token() == TokenKind::LBracket {
            self.advance()?;
            let expr = self.expression()?;
            self.expect(TokenKind::RBracket, FOLLOW_IMPORT)?;
            expr
        } else {
            Node::empty()
        };

        self.expect(TokenKind::Semicolon, FOLLOW_IMPORT)?;

        let mut imports = Fifo::new();
        while FIRST_IMPORT.contains(self.lexer.lookahead_token()) {
            imports.append(self.import()?);
        }
        let implist = Node::new_list(Tag::ImpList, imports);

        let block = self.block()?;

        if self.lexer.lookahead_token() == TokenKind::Identifier {
            self.advance()?;
        }
        self.expect(TokenKind::Period, ALWAYS_RESYNC)?;

        Ok(Node::new_branch(Tag::ImpMod, vec![ident, priority, implist, block]))
    }

    fn import(&mut self) -> Result<Node, ParseFatal> {
        if self.lexer.lookahead_token() == TokenKind::Import {
            self.advance()?;
            let idlist = self.ident_list()?;
            self.expect(TokenKind::Semicolon, FOLLOW_IMPORT)?;
            Ok(Node::new_branch(Tag::Import, vec![idlist]))
        } else {
            self.advance()?; // FROM
            let ident = self.ident_node(FOLLOW_IMPORT)?;
            self.expect(TokenKind::Import, FOLLOW_IMPORT)?;
            let idlist = self.ident_list()?;
            self.expect(TokenKind::Semicolon, FOLLOW_IMPORT)?;
            Ok(Node::new_branch(Tag::UnqImp, vec![ident, idlist]))
        }
    }

    /// `Id (',' Id)*`. A duplicate is diagnosed once (`DUPLICATE_IDENT_IN_IDENT_LIST`) and
    /// dropped from the emitted `IDENTLIST`; the first occurrence is kept.
    fn ident_list(&mut self) -> Result<Node, ParseFatal> {
        let mut seen: Vec<Symbol> = Vec::new();
        let mut fifo = Fifo::new();
        if let Some(first) = self.expect_identifier(RESYNC_COMMA_OR_SEMICOLON)? {
            fifo.append(first.clone());
            seen.push(first);
        }
        while self.lexer.lookahead_token() == TokenKind::Comma {
            self.advance()?;
            let (line, col) = (self.lexer.lookahead_line(), self.lexer.lookahead_column());
            if let Some(next) = self.expect_identifier(RESYNC_COMMA_OR_SEMICOLON)? {
                if seen.iter().any(|s| s.as_str() == next.as_str()) {
                    self.diagnostics
                        .borrow_mut()
                        .emit_warning_w_pos(DiagnosticKind::DuplicateIdentInIdentList, line, col);
                } else {
                    fifo.append(next.clone());
                    seen.push(next);
                }
            }
        }
        Ok(Node::new_terminal_list(Tag::IdentList, fifo))
    }

    // --- definitions and declarations -------------------------------------------------------

    /// `CONST`/`TYPE`/`VAR` bodies are identical between `definition` and `declaration`;
    /// only `PROCEDURE` and (in a block) `MODULE` differ.
    fn const_type_var(&mut self, out: &mut Fifo<Node>, follow: TokenSet) -> Result<(), ParseFatal> {
        match self.lexer.lookahead_token() {
            TokenKind::Const => {
                self.advance()?;
                while self.lexer.lookahead_token() == TokenKind::Identifier {
                    let ident = self.ident_node(follow)?;
                    self.expect(TokenKind::Equal, follow)?;
                    let value = self.expression()?;
                    self.expect(TokenKind::Semicolon, follow)?;
                    out.append(Node::new_branch(Tag::ConstDef, vec![ident, value]));
                }
            }
            TokenKind::Type => {
                self.advance()?;
                while self.lexer.lookahead_token() == TokenKind::Identifier {
                    let ident = self.ident_node(follow)?;
                    let ty = if self.lexer.lookahead_token() == TokenKind::Equal {
                        self.advance()?;
                        self.type_spec()?
                    } else {
                        Node::empty()
                    };
                    self.expect(TokenKind::Semicolon, follow)?;
                    out.append(Node::new_branch(Tag::TypeDef, vec![ident, ty]));
                }
            }
            TokenKind::Var => {
                self.advance()?;
                while self.lexer.lookahead_token() == TokenKind::Identifier {
                    let idlist = self.ident_list()?;
                    self.expect(TokenKind::Colon, follow)?;
                    let ty = self.type_spec()?;
                    self.expect(TokenKind::Semicolon, follow)?;
                    out.append(Node::new_branch(Tag::VarDecl, vec![idlist, ty]));
                }
            }
            _ => unreachable!("const_type_var called outside CONST/TYPE/VAR"),
        }
        Ok(())
    }

    fn definition(&mut self, out: &mut Fifo<Node>) -> Result<(), ParseFatal> {
        match self.lexer.lookahead_token() {
            TokenKind::Const | TokenKind::Type | TokenKind::Var => {
                self.const_type_var(out, FOLLOW_DEFINITION)
            }
            TokenKind::Procedure => {
                self.advance()?;
                let ident = self.ident_node(FOLLOW_DEFINITION)?;
                let params = if self.lexer.lookahead_token() == TokenKind::LParen {
                    self.formal_param_list()?
                } else {
                    Node::empty()
                };
                self.expect(TokenKind::Semicolon, FOLLOW_DEFINITION)?;
                out.append(Node::new_branch(Tag::ProcDef, vec![ident, params]));
                Ok(())
            }
            _ => unreachable!("definition called outside FIRST_DEFINITION"),
        }
    }

    fn declaration(&mut self, out: &mut Fifo<Node>) -> Result<(), ParseFatal> {
        match self.lexer.lookahead_token() {
            TokenKind::Const | TokenKind::Type | TokenKind::Var => {
                self.const_type_var(out, FOLLOW_DECLARATION)
            }
            TokenKind::Procedure => {
                self.advance()?;
                let ident = self.ident_node(FOLLOW_DECLARATION)?;
                let params = if self.lexer.lookahead_token() == TokenKind::LParen {
                    self.formal_param_list()?
                } else {
                    Node::empty()
                };
                self.expect(TokenKind::Semicolon, FOLLOW_DECLARATION)?;
                let body = self.block()?;
                if self.lexer.lookahead_token() == TokenKind::Identifier {
                    self.advance()?;
                }
                self.expect(TokenKind::Semicolon, FOLLOW_DECLARATION)?;
                out.append(Node::new_branch(Tag::ProcDef, vec![ident, params, body]));
                Ok(())
            }
            TokenKind::Module => {
                self.advance()?;
                let ident = self.ident_node(FOLLOW_DECLARATION)?;
                self.expect(TokenKind::Semicolon, FOLLOW_DECLARATION)?;
                let mut imports = Fifo::new();
                while FIRST_IMPORT.contains(self.lexer.lookahead_token()) {
                    imports.append(self.import()?);
                }
                let implist = Node::new_list(Tag::ImpList, imports);
                if self.lexer.lookahead_token() == TokenKind::Export {
                    self.advance()?;
                    if self.lexer.lookahead_token() == TokenKind::Qualified {
                        self.advance()?;
                    }
                    let _ = self.ident_list()?;
                    self.expect(TokenKind::Semicolon, FOLLOW_DECLARATION)?;
                }
                let body = self.block()?;
                if self.lexer.lookahead_token() == TokenKind::Identifier {
                    self.advance()?;
                }
                self.expect(TokenKind::Semicolon, FOLLOW_DECLARATION)?;
                out.append(Node::new_branch(Tag::ImpMod, vec![ident, Node::empty(), implist, body]));
                Ok(())
            }
            _ => unreachable!("declaration called outside FIRST_DECLARATION"),
        }
    }

    fn formal_param_list(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // '('
        let mut params = Fifo::new();
        if self.lexer.lookahead_token() != TokenKind::RParen {
            loop {
                if self.lexer.lookahead_token() == TokenKind::Var {
                    self.advance()?;
                }
                let idlist = self.ident_list()?;
                self.expect(TokenKind::Colon, RESYNC_COMMA_OR_SEMICOLON)?;
                let ty = self.type_spec()?;
                params.append(Node::new_branch(Tag::Param, vec![idlist, ty]));
                if self.lexer.lookahead_token() == TokenKind::Semicolon {
                    self.advance()?;
                    if self.lexer.lookahead_token() == TokenKind::RParen {
                        let (line, col) = (self.lexer.lookahead_line(), self.lexer.lookahead_column());
                        self.diagnostics
                            .borrow_mut()
                            .emit_warning_w_pos(DiagnosticKind::SemicolonAfterFormalParamList, line, col);
                        break;
                    }
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, FOLLOW_DEFINITION)?;
        Ok(Node::new_list(Tag::FormalParams, params))
    }

    // --- types -------------------------------------------------------------------------------

    fn type_spec(&mut self) -> Result<Node, ParseFatal> {
        use TokenKind::*;
        Ok(match self.lexer.lookahead_token() {
            Identifier => self.qualident_or_ident()?,
            LParen => self.enum_type()?,
            LBracket => self.subrange_type()?,
            Set => self.set_type()?,
            Array => self.array_type()?,
            Record => self.record_type()?,
            Pointer => self.pointer_type()?,
            Procedure => self.proc_type()?,
            _ => {
                self.syntax_error_set(FIRST_TYPE)?;
                self.resync(FOLLOW_DEFINITION)?;
                Node::empty()
            }
        })
    }

    fn qualident_or_ident(&mut self) -> Result<Node, ParseFatal> {
        let first = match self.expect_identifier(FOLLOW_DEFINITION)? {
            Some(sym) => sym,
            None => return Ok(Node::empty()),
        };
        if self.lexer.lookahead_token() != TokenKind::Period {
            return Ok(Node::new_terminal(Tag::Ident, first));
        }
        let mut fifo = Fifo::new();
        fifo.append(first);
        while self.lexer.lookahead_token() == TokenKind::Period {
            self.advance()?;
            if let Some(sym) = self.expect_identifier(FOLLOW_DEFINITION)? {
                fifo.append(sym);
            }
        }
        Ok(Node::new_terminal_list(Tag::QualIdent, fifo))
    }

    fn enum_type(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // '('
        let idlist = self.ident_list()?;
        self.expect(TokenKind::RParen, FOLLOW_DEFINITION)?;
        Ok(Node::new_branch(Tag::Enum, vec![idlist]))
    }

    fn subrange_type(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // '['
        let lo = self.expression()?;
        self.expect(TokenKind::DotDot, FOLLOW_DEFINITION)?;
        let hi = self.expression()?;
        self.expect(TokenKind::RBracket, FOLLOW_DEFINITION)?;
        Ok(Node::new_branch(Tag::Subr, vec![lo, hi]))
    }

    fn set_type(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // SET
        self.expect(TokenKind::Of, FOLLOW_DEFINITION)?;
        let base = self.type_spec()?;
        Ok(Node::new_branch(Tag::SetType, vec![base]))
    }

    fn array_type(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // ARRAY
        let mut children = vec![self.type_spec()?];
        while self.lexer.lookahead_token() == TokenKind::Comma {
            self.advance()?;
            children.push(self.type_spec()?);
        }
        self.expect(TokenKind::Of, FOLLOW_DEFINITION)?;
        children.push(self.type_spec()?);
        Ok(Node::new_branch(Tag::ArrayType, children))
    }

    fn pointer_type(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // POINTER
        self.expect(TokenKind::To, FOLLOW_DEFINITION)?;
        let base = self.type_spec()?;
        Ok(Node::new_branch(Tag::PointerType, vec![base]))
    }

    fn proc_type(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // PROCEDURE
        if self.lexer.lookahead_token() != TokenKind::LParen {
            return Ok(Node::new_branch(Tag::ProcType, vec![]));
        }
        self.advance()?;
        let mut children = Vec::new();
        if self.lexer.lookahead_token() != TokenKind::RParen {
            children.push(self.type_spec()?);
            while self.lexer.lookahead_token() == TokenKind::Comma {
                self.advance()?;
                children.push(self.type_spec()?);
            }
        }
        self.expect(TokenKind::RParen, FOLLOW_DEFINITION)?;
        Ok(Node::new_branch(Tag::ProcType, children))
    }

    /// Dispatches on the `variant_records` dialect option: when set, `RECORD` bodies may
    /// carry a trailing `CASE` variant part; otherwise they may carry a leading extension
    /// clause instead.
    fn record_type(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // RECORD
        if self.options.variant_records {
            self.variant_record_body()
        } else {
            self.extensible_record_body()
        }
    }

    fn extensible_record_body(&mut self) -> Result<Node, ParseFatal> {
        let base = if self.lexer.lookahead_token() == TokenKind::LParen {
            self.advance()?;
            let b = self.type_spec()?;
            self.expect(TokenKind::RParen, FOLLOW_DEFINITION)?;
            Some(b)
        } else {
            None
        };
        let fields = self.field_list_sequence()?;
        self.expect(TokenKind::End, RESYNC_END)?;
        Ok(match base {
            Some(b) => Node::new_branch(Tag::ExtRec, vec![b, fields]),
            None => Node::new_branch(Tag::Record, vec![fields]),
        })
    }

    fn variant_record_body(&mut self) -> Result<Node, ParseFatal> {
        let fields = self.field_list_sequence()?;
        if self.lexer.lookahead_token() == TokenKind::Case {
            let variant = self.variant_fields()?;
            self.expect(TokenKind::End, RESYNC_END)?;
            Ok(Node::new_branch(Tag::VrntRec, vec![fields, variant]))
        } else {
            self.expect(TokenKind::End, RESYNC_END)?;
            Ok(Node::new_branch(Tag::Record, vec![fields]))
        }
    }

    /// `fieldList (';' fieldList)*`. Both an empty sequence and a trailing semicolon before
    /// the closing delimiter are warned about, never hard errors.
    fn field_list_sequence(&mut self) -> Result<Node, ParseFatal> {
        let mut fifo = Fifo::new();
        if !FIRST_FIELD_LIST.contains(self.lexer.lookahead_token()) {
            let (line, col) = (self.lexer.lookahead_line(), self.lexer.lookahead_column());
            self.diagnostics
                .borrow_mut()
                .emit_warning_w_pos(DiagnosticKind::EmptyFieldListSeq, line, col);
            return Ok(Node::new_list(Tag::FieldListSeq, fifo));
        }
        loop {
            fifo.append(self.field_list()?);
            if self.lexer.lookahead_token() == TokenKind::Semicolon {
                self.advance()?;
                if !FIRST_FIELD_LIST.contains(self.lexer.lookahead_token()) {
                    let (line, col) = (self.lexer.lookahead_line(), self.lexer.lookahead_column());
                    self.diagnostics
                        .borrow_mut()
                        .emit_warning_w_pos(DiagnosticKind::SemicolonAfterFieldListSeq, line, col);
                    break;
                }
            } else {
                break;
            }
        }
        Ok(Node::new_list(Tag::FieldListSeq, fifo))
    }

    fn field_list(&mut self) -> Result<Node, ParseFatal> {
        let idlist = self.ident_list()?;
        self.expect(TokenKind::Colon, FOLLOW_FIELD_LIST)?;
        let ty = self.type_spec()?;
        Ok(Node::new_branch(Tag::FieldList, vec![idlist, ty]))
    }

    fn variant_fields(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // CASE
        let case_id = if self.lexer.lookahead_token() == TokenKind::Identifier {
            self.ident_node(RESYNC_ELSE_OR_END)?
        } else {
            Node::empty()
        };
        self.expect(TokenKind::Colon, RESYNC_ELSE_OR_END)?;
        let type_id = self.qualident_or_ident()?;
        self.expect(TokenKind::Of, RESYNC_ELSE_OR_END)?;

        let mut variants = Fifo::new();
        variants.append(self.variant()?);
        while self.lexer.lookahead_token() == TokenKind::Bar {
            self.advance()?;
            variants.append(self.variant()?);
        }
        let variant_list = Node::new_list(Tag::VariantList, variants);

        let else_fields = if self.lexer.lookahead_token() == TokenKind::Else {
            self.advance()?;
            self.field_list_sequence()?
        } else {
            Node::empty()
        };

        Ok(Node::new_branch(Tag::VfList, vec![case_id, type_id, variant_list, else_fields]))
    }

    fn variant(&mut self) -> Result<Node, ParseFatal> {
        let labels = self.case_label_list()?;
        self.expect(TokenKind::Colon, RESYNC_BAR_OR_ELSE_OR_END)?;
        let fields = self.field_list_sequence()?;
        Ok(Node::new_branch(Tag::Variant, vec![labels, fields]))
    }

    fn case_label_list(&mut self) -> Result<Node, ParseFatal> {
        let mut fifo = Fifo::new();
        fifo.append(self.case_label()?);
        while self.lexer.lookahead_token() == TokenKind::Comma {
            self.advance()?;
            fifo.append(self.case_label()?);
        }
        Ok(Node::new_list(Tag::CaseLabelList, fifo))
    }

    fn case_label(&mut self) -> Result<Node, ParseFatal> {
        let lo = self.expression()?;
        if self.lexer.lookahead_token() == TokenKind::DotDot {
            self.advance()?;
            let hi = self.expression()?;
            Ok(Node::new_branch(Tag::Subr, vec![lo, hi]))
        } else {
            Ok(lo)
        }
    }

    // --- blocks and statements ---------------------------------------------------------------

    /// `declaration* (BEGIN statementSequence)? END`. `block` consumes its own closing
    /// `END`. An empty declaration region renders as `EMPTY`, not an empty list node — the
    /// one place this crate's examples show that choice for a declaration-bearing slot.
    fn block(&mut self) -> Result<Node, ParseFatal> {
        let mut decls = Fifo::new();
        while FIRST_DECLARATION.contains(self.lexer.lookahead_token()) {
            self.declaration(&mut decls)?;
        }
        let decls_node = if decls.is_empty() {
            Node::empty()
        } else {
            Node::new_list(Tag::DeclList, decls)
        };

        let stmts_node = if self.lexer.lookahead_token() == TokenKind::Begin {
            self.advance()?;
            self.statement_sequence()?
        } else {
            Node::empty()
        };

        self.expect(TokenKind::End, FOLLOW_DECLARATION)?;
        Ok(Node::new_branch(Tag::Block, vec![decls_node, stmts_node]))
    }

    /// Emitted identically whether the statement sequence's keyword is immediately followed
    /// by a terminator or by a token in `FOLLOW_STATEMENT`.
    fn statement_sequence(&mut self) -> Result<Node, ParseFatal> {
        let mut fifo = Fifo::new();
        if !FIRST_STATEMENT.contains(self.lexer.lookahead_token()) {
            let (line, col) = (self.lexer.lookahead_line(), self.lexer.lookahead_column());
            self.diagnostics
                .borrow_mut()
                .emit_warning_w_pos(DiagnosticKind::EmptyStmtSeq, line, col);
            return Ok(Node::new_list(Tag::StmtSeq, fifo));
        }
        loop {
            fifo.append(self.statement()?);
            if self.lexer.lookahead_token() == TokenKind::Semicolon {
                self.advance()?;
                if !FIRST_STATEMENT.contains(self.lexer.lookahead_token()) {
                    if FOLLOW_STATEMENT.contains(self.lexer.lookahead_token()) {
                        let (line, col) = (self.lexer.lookahead_line(), self.lexer.lookahead_column());
                        self.diagnostics.borrow_mut().emit_w_pos_and_severity(
                            DiagnosticKind::SemicolonAfterStmtSeq,
                            line,
                            col,
                            !self.options.errant_semicolon,
                        );
                    }
                    break;
                }
            } else {
                break;
            }
        }
        Ok(Node::new_list(Tag::StmtSeq, fifo))
    }

    fn statement(&mut self) -> Result<Node, ParseFatal> {
        use TokenKind::*;
        match self.lexer.lookahead_token() {
            Identifier => self.assignment_or_proc_call(),
            Return => self.return_statement(),
            With => self.with_statement(),
            If => self.if_statement(),
            Case => self.case_statement(),
            Loop => self.loop_statement(),
            While => self.while_statement(),
            Repeat => self.repeat_statement(),
            For => self.for_statement(),
            Exit => self.exit_statement(),
            _ => {
                self.syntax_error_set(FIRST_STATEMENT)?;
                self.resync(FOLLOW_STATEMENT)?;
                Ok(Node::empty())
            }
        }
    }

    fn assignment_or_proc_call(&mut self) -> Result<Node, ParseFatal> {
        let d = self.designator()?;
        if self.lexer.lookahead_token() == TokenKind::Assign {
            self.advance()?;
            let e = self.expression()?;
            Ok(Node::new_branch(Tag::Assign, vec![d, e]))
        } else {
            let args = if self.lexer.lookahead_token() == TokenKind::LParen {
                self.actual_parameters()?
            } else {
                Node::empty()
            };
            Ok(Node::new_branch(Tag::PCall, vec![d, args]))
        }
    }

    fn return_statement(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // RETURN
        let e = if FIRST_EXPRESSION.contains(self.lexer.lookahead_token()) {
            self.expression()?
        } else {
            Node::empty()
        };
        Ok(Node::new_branch(Tag::ReturnStmt, vec![e]))
    }

    fn with_statement(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // WITH
        let d = self.designator()?;
        self.expect(TokenKind::Do, RESYNC_END)?;
        let body = self.statement_sequence()?;
        self.expect(TokenKind::End, FOLLOW_STATEMENT)?;
        Ok(Node::new_branch(Tag::WithStmt, vec![d, body]))
    }

    /// `children` alternates `(cond, body)` pairs for `IF`/`ELSIF` arms, with the final
    /// `ELSE` body (or `EMPTY`) as the last element.
    fn if_statement(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // IF
        let mut children = Vec::new();
        let cond = self.expression()?;
        self.expect(TokenKind::Then, RESYNC_ELSIF_OR_ELSE_OR_END)?;
        let body = self.statement_sequence()?;
        children.push(cond);
        children.push(body);
        while self.lexer.lookahead_token() == TokenKind::Elsif {
            self.advance()?;
            let c = self.expression()?;
            self.expect(TokenKind::Then, RESYNC_ELSIF_OR_ELSE_OR_END)?;
            let b = self.statement_sequence()?;
            children.push(c);
            children.push(b);
        }
        let else_body = if self.lexer.lookahead_token() == TokenKind::Else {
            self.advance()?;
            self.statement_sequence()?
        } else {
            Node::empty()
        };
        children.push(else_body);
        self.expect(TokenKind::End, FOLLOW_STATEMENT)?;
        Ok(Node::new_branch(Tag::IfStmt, children))
    }

    fn case_statement(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // CASE
        let selector = self.expression()?;
        self.expect(TokenKind::Of, RESYNC_ELSE_OR_END)?;
        let mut arms = Fifo::new();
        arms.append(self.case_arm()?);
        while self.lexer.lookahead_token() == TokenKind::Bar {
            self.advance()?;
            arms.append(self.case_arm()?);
        }
        let arms_node = Node::new_list(Tag::CaseLabelList, arms);
        let else_body = if self.lexer.lookahead_token() == TokenKind::Else {
            self.advance()?;
            self.statement_sequence()?
        } else {
            Node::empty()
        };
        self.expect(TokenKind::End, FOLLOW_STATEMENT)?;
        Ok(Node::new_branch(Tag::Switch, vec![selector, arms_node, else_body]))
    }

    fn case_arm(&mut self) -> Result<Node, ParseFatal> {
        let labels = self.case_label_list()?;
        self.expect(TokenKind::Colon, RESYNC_BAR_OR_ELSE_OR_END)?;
        let body = self.statement_sequence()?;
        Ok(Node::new_branch(Tag::Variant, vec![labels, body]))
    }

    fn loop_statement(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // LOOP
        let body = self.statement_sequence()?;
        self.expect(TokenKind::End, FOLLOW_STATEMENT)?;
        Ok(Node::new_branch(Tag::LoopStmt, vec![body]))
    }

    fn while_statement(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // WHILE
        let cond = self.expression()?;
        self.expect(TokenKind::Do, RESYNC_END)?;
        let body = self.statement_sequence()?;
        self.expect(TokenKind::End, FOLLOW_STATEMENT)?;
        Ok(Node::new_branch(Tag::WhileStmt, vec![cond, body]))
    }

    fn repeat_statement(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // REPEAT
        let body = self.statement_sequence()?;
        self.expect(TokenKind::Until, FOLLOW_STATEMENT)?;
        let cond = self.expression()?;
        Ok(Node::new_branch(Tag::RepeatStmt, vec![body, cond]))
    }

    fn for_statement(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // FOR
        let ident = self.ident_node(RESYNC_END)?;
        self.expect(TokenKind::Assign, RESYNC_END)?;
        let from = self.expression()?;
        self.expect(TokenKind::To, RESYNC_END)?;
        let to = self.expression()?;
        let by = if self.lexer.lookahead_token() == TokenKind::By {
            self.advance()?;
            self.expression()?
        } else {
            Node::empty()
        };
        self.expect(TokenKind::Do, RESYNC_END)?;
        let body = self.statement_sequence()?;
        self.expect(TokenKind::End, FOLLOW_STATEMENT)?;
        Ok(Node::new_branch(Tag::ForTo, vec![ident, from, to, by, body]))
    }

    fn exit_statement(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // EXIT
        Ok(Node::new_branch(Tag::ExitStmt, vec![]))
    }

    // --- designators and expressions ---------------------------------------------------------

    /// `qualident ( '^' | selector )*`, left-folding `DEREF` and `DESIG`. A `.field` and a
    /// `[index, ...]` selector both fold into `DESIG` — the grammar excerpt doesn't give
    /// `selector` its own AST tag, so this crate renders both uniformly.
    fn designator(&mut self) -> Result<Node, ParseFatal> {
        let mut result = self.qualident_or_ident()?;
        loop {
            match self.lexer.lookahead_token() {
                TokenKind::Caret => {
                    self.advance()?;
                    result = Node::new_branch(Tag::Deref, vec![result]);
                }
                TokenKind::Period => {
                    self.advance()?;
                    let field = self.ident_node(FOLLOW_STATEMENT)?;
                    result = Node::new_branch(Tag::Desig, vec![result, field]);
                }
                TokenKind::LBracket => {
                    self.advance()?;
                    let mut indices = vec![self.expression()?];
                    while self.lexer.lookahead_token() == TokenKind::Comma {
                        self.advance()?;
                        indices.push(self.expression()?);
                    }
                    self.expect(TokenKind::RBracket, FOLLOW_STATEMENT)?;
                    let mut children = vec![result];
                    children.extend(indices);
                    result = Node::new_branch(Tag::Desig, children);
                }
                _ => break,
            }
        }
        Ok(result)
    }

    fn designator_or_func_call(&mut self) -> Result<Node, ParseFatal> {
        let d = self.designator()?;
        if self.lexer.lookahead_token() == TokenKind::LParen {
            let args = self.actual_parameters()?;
            Ok(Node::new_branch(Tag::FCall, vec![d, args]))
        } else {
            Ok(d)
        }
    }

    fn actual_parameters(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // '('
        let mut fifo = Fifo::new();
        if self.lexer.lookahead_token() != TokenKind::RParen {
            fifo.append(self.expression()?);
            while self.lexer.lookahead_token() == TokenKind::Comma {
                self.advance()?;
                fifo.append(self.expression()?);
            }
        }
        self.expect(TokenKind::RParen, FOLLOW_STATEMENT)?;
        Ok(Node::new_list(Tag::Args, fifo))
    }

    fn expression(&mut self) -> Result<Node, ParseFatal> {
        let left = self.simple_expression()?;
        if OPER_L1.contains(self.lexer.lookahead_token()) {
            let op = self.lexer.lookahead_token();
            self.advance()?;
            let right = self.simple_expression()?;
            let tag = Self::tag_for_oper_l1(op);
            Ok(Node::new_branch(tag, vec![left, right]))
        } else {
            Ok(left)
        }
    }

    fn simple_expression(&mut self) -> Result<Node, ParseFatal> {
        let negate = match self.lexer.lookahead_token() {
            TokenKind::Plus => {
                self.advance()?;
                false
            }
            TokenKind::Minus => {
                self.advance()?;
                true
            }
            _ => false,
        };
        let mut left = self.term()?;
        if negate {
            left = Node::new_branch(Tag::Neg, vec![left]);
        }
        while OPER_L2.contains(self.lexer.lookahead_token()) {
            let op = self.lexer.lookahead_token();
            self.advance()?;
            let right = self.term()?;
            let tag = Self::tag_for_oper_l2(op);
            left = Node::new_branch(tag, vec![left, right]);
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Node, ParseFatal> {
        let mut left = self.simple_term()?;
        while OPER_L3.contains(self.lexer.lookahead_token()) {
            let op = self.lexer.lookahead_token();
            self.advance()?;
            let right = self.simple_term()?;
            let tag = Self::tag_for_oper_l3(op);
            left = Node::new_branch(tag, vec![left, right]);
        }
        Ok(left)
    }

    fn simple_term(&mut self) -> Result<Node, ParseFatal> {
        if self.lexer.lookahead_token() == TokenKind::Not {
            self.advance()?;
            let f = self.factor()?;
            Ok(Node::new_branch(Tag::NotOp, vec![f]))
        } else {
            self.factor()
        }
    }

    fn factor(&mut self) -> Result<Node, ParseFatal> {
        use TokenKind::*;
        match self.lexer.lookahead_token() {
            IntLiteral | MalformedInteger => {
                let lex = self.lexer.lookahead_lexeme().cloned().unwrap();
                self.advance()?;
                Ok(Node::new_terminal(Tag::IntVal, lex))
            }
            RealLiteral | MalformedReal => {
                let lex = self.lexer.lookahead_lexeme().cloned().unwrap();
                self.advance()?;
                Ok(Node::new_terminal(Tag::RealVal, lex))
            }
            CharLiteral => {
                let lex = self.lexer.lookahead_lexeme().cloned().unwrap();
                self.advance()?;
                Ok(Node::new_terminal(Tag::ChrVal, lex))
            }
            StringLiteral => {
                let lex = self.lexer.lookahead_lexeme().cloned().unwrap();
                self.advance()?;
                Ok(Node::new_terminal(Tag::QuotedVal, lex))
            }
            LBrace => self.set_value(),
            LParen => {
                self.advance()?;
                let e = self.expression()?;
                self.expect(RParen, FOLLOW_STATEMENT)?;
                Ok(e)
            }
            Identifier => self.designator_or_func_call(),
            _ => {
                self.syntax_error_set(FIRST_FACTOR)?;
                self.resync(FOLLOW_STATEMENT)?;
                Ok(Node::empty())
            }
        }
    }

    fn set_value(&mut self) -> Result<Node, ParseFatal> {
        self.advance()?; // '{'
        let mut fifo = Fifo::new();
        if self.lexer.lookahead_token() != TokenKind::RBrace {
            fifo.append(self.set_element()?);
            while self.lexer.lookahead_token() == TokenKind::Comma {
                self.advance()?;
                fifo.append(self.set_element()?);
            }
        }
        self.expect(TokenKind::RBrace, FOLLOW_STATEMENT)?;
        Ok(Node::new_list(Tag::SetVal, fifo))
    }

    fn set_element(&mut self) -> Result<Node, ParseFatal> {
        let lo = self.expression()?;
        if self.lexer.lookahead_token() == TokenKind::DotDot {
            self.advance()?;
            let hi = self.expression()?;
            Ok(Node::new_branch(Tag::Subr, vec![lo, hi]))
        } else {
            Ok(lo)
        }
    }

    fn tag_for_oper_l1(op: TokenKind) -> Tag {
        use TokenKind::*;
        match op {
            Equal => Tag::Eq,
            NotEqual => Tag::Neq,
            Less => Tag::Lt,
            LessEqual => Tag::LtEq,
            Greater => Tag::Gt,
            GreaterEqual => Tag::GtEq,
            In => Tag::InOp,
            _ => unreachable!("tag_for_oper_l1 called with a non-L1 operator"),
        }
    }

    fn tag_for_oper_l2(op: TokenKind) -> Tag {
        use TokenKind::*;
        match op {
            Plus => Tag::Plus,
            Minus => Tag::Minus,
            Or => Tag::Or,
            _ => unreachable!("tag_for_oper_l2 called with a non-L2 operator"),
        }
    }

    fn tag_for_oper_l3(op: TokenKind) -> Tag {
        use TokenKind::*;
        match op {
            Asterisk => Tag::Asterisk,
            Solidus => Tag::Solidus,
            Div => Tag::Div,
            Mod => Tag::Mod,
            And => Tag::And,
            _ => unreachable!("tag_for_oper_l3 called with a non-L3 operator"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::reader::SourceReader;

    fn parse_str(src: &str, source_type: SourceType) -> (Node, DiagSink, ParserStatus) {
        let pool = Pool::new(64).unwrap();
        let reader = SourceReader::from_bytes(src.as_bytes().to_vec(), "<test>", &pool).unwrap();
        let diagnostics: DiagSink = Rc::new(RefCell::new(Diagnostics::new(false)));
        let lexer = Lexer::new(reader, pool.clone(), Options::defaults(), diagnostics.clone()).unwrap();
        let mut parser = Parser::new(lexer, pool, Options::defaults(), diagnostics.clone());
        let node = parser.parse(source_type).unwrap();
        let status = parser.status();
        (node, diagnostics, status)
    }

    #[test]
    fn empty_definition_module_has_empty_deflist_and_implist() {
        let (node, diagnostics, status) = parse_str("DEFINITION MODULE Empty;\nEND Empty.", SourceType::Any);
        assert_eq!(status, ParserStatus::Ok);
        assert_eq!(diagnostics.borrow().error_count(), 0);
        assert_eq!(node.tag(), Some(Tag::Root));
        let defmod = node.subnode_for_index(2);
        assert_eq!(defmod.tag(), Some(Tag::DefMod));
        assert_eq!(defmod.subnode_for_index(0).value_for_index(0).as_str(), "Empty");
        assert_eq!(defmod.subnode_for_index(1).subnode_count(), 0);
        assert_eq!(defmod.subnode_for_index(2).subnode_count(), 0);
    }

    #[test]
    fn options_node_is_empty_under_pure_defaults() {
        let (node, _diag, _status) = parse_str("DEFINITION MODULE Empty;\nEND Empty.", SourceType::Any);
        let options = node.subnode_for_index(1);
        assert_eq!(options.tag(), Some(Tag::Options));
        assert_eq!(options.subnode_count(), 0);
    }

    #[test]
    fn program_module_builds_pcall_with_string_argument() {
        let src = "MODULE Hello;\n  FROM IO IMPORT Put;\nBEGIN\n  Put(\"hi\");\nEND Hello.";
        let (node, diagnostics, status) = parse_str(src, SourceType::Any);
        assert_eq!(status, ParserStatus::Ok);
        assert_eq!(diagnostics.borrow().error_count(), 0);
        let impmod = node.subnode_for_index(2);
        assert_eq!(impmod.tag(), Some(Tag::ImpMod));
        assert!(impmod.subnode_for_index(1).is_empty_node());
        let implist = impmod.subnode_for_index(2);
        assert_eq!(implist.subnode_count(), 1);
        assert_eq!(implist.subnode_for_index(0).tag(), Some(Tag::UnqImp));
        let block = impmod.subnode_for_index(3);
        assert!(block.subnode_for_index(0).is_empty_node());
        let stmts = block.subnode_for_index(1);
        assert_eq!(stmts.subnode_count(), 1);
        let pcall = stmts.subnode_for_index(0);
        assert_eq!(pcall.tag(), Some(Tag::PCall));
        assert_eq!(pcall.subnode_for_index(0).value_for_index(0).as_str(), "Put");
        let args = pcall.subnode_for_index(1);
        assert_eq!(args.subnode_count(), 1);
        assert_eq!(args.subnode_for_index(0).tag(), Some(Tag::QuotedVal));
    }

    #[test]
    fn duplicate_ident_in_ident_list_is_dropped_and_warned_once() {
        let src = "DEFINITION MODULE D;\nVAR a, b, a: INTEGER;\nEND D.";
        let (_node, diagnostics, status) = parse_str(src, SourceType::Any);
        assert_eq!(status, ParserStatus::Ok);
        let d = diagnostics.borrow();
        assert_eq!(d.warning_count(), 1);
        assert_eq!(d.error_count(), 0);
    }

    #[test]
    fn errant_semicolon_before_end_is_a_warning_by_default() {
        let src = "MODULE M;\nBEGIN\n  Foo;\n  Bar;\nEND M.";
        let (_node, diagnostics, status) = parse_str(src, SourceType::Any);
        assert_eq!(status, ParserStatus::Ok);
        let d = diagnostics.borrow();
        assert_eq!(d.error_count(), 0);
    }

    #[test]
    fn invalid_start_symbol_is_reported_and_status_reflects_it() {
        let (_node, diagnostics, status) = parse_str("VAR x: INTEGER;", SourceType::Any);
        assert_eq!(status, ParserStatus::InvalidStartSymbol);
        assert!(diagnostics.borrow().error_count() >= 1);
    }

    #[test]
    fn expression_precedence_folds_left_to_right() {
        let src = "DEFINITION MODULE E;\nCONST x = 1 + 2 * 3;\nEND E.";
        let (node, diagnostics, _status) = parse_str(src, SourceType::Any);
        assert_eq!(diagnostics.borrow().error_count(), 0);
        let defmod = node.subnode_for_index(2);
        let deflist = defmod.subnode_for_index(2);
        let constdef = deflist.subnode_for_index(0);
        assert_eq!(constdef.tag(), Some(Tag::ConstDef));
        let value = constdef.subnode_for_index(1);
        assert_eq!(value.tag(), Some(Tag::Plus));
        assert_eq!(value.subnode_for_index(1).tag(), Some(Tag::Asterisk));
    }
}
