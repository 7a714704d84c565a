//! Front end for classic Modula-2 (PIM 2nd-4th editions): source reader, lexer,
//! recursive-descent parser with error recovery, and an AST + S-expression writer.
//! Semantic analysis, code generation, and the host C-compiler pipeline are out of scope —
//! this crate produces an AST and diagnostics, nothing more.

pub mod ast;
pub mod diagnostics;
pub mod error;
pub mod fifo;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod pool;
pub mod reader;
pub mod token_set;
pub mod writer;

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use ast::Node;
use diagnostics::Diagnostics;
use error::M2Error;
use lexer::Lexer;
use options::Options;
use parser::{Parser, ParserStatus, SourceType};
use pool::Pool;
use reader::SourceReader;

/// Everything a caller needs after a parse: the AST, the accumulated diagnostics, and the
/// reader/pool needed to render a `verbose` source-line echo for them.
pub struct CompileOutcome {
    pub root: Node,
    pub diagnostics: Rc<RefCell<Diagnostics>>,
    pub reader: SourceReader,
    pub pool: Pool,
    pub parser_status: ParserStatus,
}

impl CompileOutcome {
    pub fn had_errors(&self) -> bool {
        self.diagnostics.borrow().error_count() > 0
    }
}

/// Read, lex, and parse `path` under `options`, producing a [`CompileOutcome`]. The string
/// pool is created fresh per call, so tests can instantiate an isolated pool, rather than
/// reaching for the process-wide singleton in [`pool::global`].
pub fn compile_file(
    path: &Path,
    options: Options,
    source_type: SourceType,
) -> Result<CompileOutcome, M2Error> {
    let pool = Pool::new(4096)?;
    let reader = SourceReader::open(path, &pool)?;
    compile_with_reader(reader, pool, options, source_type)
}

/// Same as [`compile_file`], but from an in-memory buffer rather than a filesystem path —
/// used by integration tests that want to avoid touching disk.
pub fn compile_source(
    source: &[u8],
    filename: &str,
    options: Options,
    source_type: SourceType,
) -> Result<CompileOutcome, M2Error> {
    let pool = Pool::new(4096)?;
    let reader = SourceReader::from_bytes(source.to_vec(), filename, &pool)?;
    compile_with_reader(reader, pool, options, source_type)
}

fn compile_with_reader(
    reader: SourceReader,
    pool: Pool,
    options: Options,
    source_type: SourceType,
) -> Result<CompileOutcome, M2Error> {
    // The parser consumes the lexer (and with it, the reader) by value, so nothing would
    // survive the parse for `Diagnostics::render` to borrow afterwards; snapshot it first.
    let reader_snapshot = reader.clone();
    let diagnostics = Rc::new(RefCell::new(Diagnostics::new(options.verbose)));
    let lexer = Lexer::new(reader, pool.clone(), options, diagnostics.clone())?;
    let mut parser = Parser::new(lexer, pool.clone(), options, diagnostics.clone());
    let root = parser.parse(source_type)?;
    let parser_status = parser.status();
    Ok(CompileOutcome {
        root,
        diagnostics,
        reader: reader_snapshot,
        pool,
        parser_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_source_round_trips_the_empty_definition_module_scenario() {
        let outcome = compile_source(
            b"DEFINITION MODULE Empty;\nEND Empty.",
            "Empty.def",
            Options::defaults(),
            SourceType::Any,
        )
        .unwrap();
        assert!(!outcome.had_errors());
        assert_eq!(outcome.diagnostics.borrow().warning_count(), 0);
        let rendered = writer::to_string(&outcome.root);
        assert_eq!(
            rendered,
            "(ROOT (FILENAME \"Empty.def\") (OPTIONS) (DEFMOD (IDENT Empty) (IMPLIST) (DEFLIST)))\n"
        );
    }
}
