//! Crate-root error type unifying every fatal failure path, for the CLI's exit-code
//! mapping. Recoverable lexical/syntactic faults never reach here — they live in
//! [`crate::diagnostics::Diagnostics`] instead.

use std::fmt;

use crate::lexer::LexError;
use crate::options::ConflictingPresetError;
use crate::parser::ParseFatal;
use crate::pool::PoolError;
use crate::reader::ReaderError;
use crate::writer::WriteStatus;

#[derive(Debug)]
pub enum M2Error {
    Option(ConflictingPresetError),
    Io(std::io::Error),
    Reader(ReaderError),
    Lex(LexError),
    Pool(PoolError),
    Fatal(ParseFatal),
    Write(WriteStatus),
}

impl fmt::Display for M2Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            M2Error::Option(e) => write!(f, "{e}"),
            M2Error::Io(e) => write!(f, "{e}"),
            M2Error::Reader(e) => write!(f, "{e}"),
            M2Error::Lex(e) => write!(f, "{e}"),
            M2Error::Pool(e) => write!(f, "{e}"),
            M2Error::Fatal(e) => write!(f, "{e}"),
            M2Error::Write(s) => write!(f, "{s}"),
        }
    }
}

impl std::error::Error for M2Error {}

impl From<ConflictingPresetError> for M2Error {
    fn from(e: ConflictingPresetError) -> Self {
        M2Error::Option(e)
    }
}

impl From<std::io::Error> for M2Error {
    fn from(e: std::io::Error) -> Self {
        M2Error::Io(e)
    }
}

impl From<ReaderError> for M2Error {
    fn from(e: ReaderError) -> Self {
        M2Error::Reader(e)
    }
}

impl From<LexError> for M2Error {
    fn from(e: LexError) -> Self {
        M2Error::Lex(e)
    }
}

impl From<PoolError> for M2Error {
    fn from(e: PoolError) -> Self {
        M2Error::Pool(e)
    }
}

impl From<ParseFatal> for M2Error {
    fn from(e: ParseFatal) -> Self {
        M2Error::Fatal(e)
    }
}

/// The CLI's exit-code mapping. 0 success is handled by the caller, not here.
impl M2Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            M2Error::Option(_) => 1,
            M2Error::Io(_) | M2Error::Reader(_) | M2Error::Lex(_) => 2,
            M2Error::Pool(_) | M2Error::Fatal(_) | M2Error::Write(_) => 4,
        }
    }
}
