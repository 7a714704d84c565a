//! Source Reader: opens a file, buffers its bytes, and exposes 1- and 2-character
//! lookahead, single-character consume, line/column tracking, lexeme marking, and
//! per-line source retrieval.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::pool::{Pool, Symbol};

/// Maximum source size the reader will accept, in bytes.
pub const MAX_SOURCE_BYTES: usize = 260_000;
/// Maximum number of lines the reader will accept.
pub const MAX_LINE_COUNT: usize = 64_000;
/// Maximum column value before a fatal error is raised.
pub const MAX_COLUMN: usize = 32_000;

/// Sentinel returned by [`SourceReader::next_char`]/[`SourceReader::la2_char`] once the
/// buffer is exhausted.
pub const EOT: char = '\u{4}';

/// Status of the reader, covering its fatal conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderStatus {
    Ok,
    AttemptToReadPastEof,
}

/// Fatal conditions that abort opening or reading a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderError {
    Io(String),
    FileTooLarge { bytes: usize, cap: usize },
    TooManyLines { lines: usize, cap: usize },
    ColumnOverflow { line: usize, column: usize },
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderError::Io(msg) => write!(f, "failed to open source file: {msg}"),
            ReaderError::FileTooLarge { bytes, cap } => {
                write!(f, "source file is {bytes} bytes, exceeding the {cap}-byte cap")
            }
            ReaderError::TooManyLines { lines, cap } => {
                write!(f, "source file has {lines} lines, exceeding the {cap}-line cap")
            }
            ReaderError::ColumnOverflow { line, column } => {
                write!(f, "line {line}, column {column} exceeds the maximum column width")
            }
        }
    }
}

impl std::error::Error for ReaderError {}

/// Owns the byte buffer, filename, cursor, and line-start offset table for one open
/// source file.
///
/// `Clone` is cheap relative to parsing (bytes are capped at [`MAX_SOURCE_BYTES`]) and is
/// used to snapshot the reader before it's moved into a [`crate::lexer::Lexer`], so a
/// caller can still render source-line echoes for diagnostics after the parse completes.
#[derive(Clone)]
pub struct SourceReader {
    bytes: Vec<u8>,
    filename: Symbol,
    pos: usize,
    line: usize,
    column: usize,
    line_starts: Vec<usize>,
    mark: usize,
    status: ReaderStatus,
}

impl SourceReader {
    /// Open `path`, buffering its contents and building the line-start table in one pass.
    pub fn open(path: &Path, pool: &Pool) -> Result<Self, ReaderError> {
        let bytes = fs::read(path).map_err(|e| ReaderError::Io(e.to_string()))?;
        Self::from_bytes(bytes, &path.to_string_lossy(), pool)
    }

    /// Construct a reader directly from an in-memory buffer; used by `open` and directly
    /// by tests that don't want to touch the filesystem.
    pub fn from_bytes(bytes: Vec<u8>, filename: &str, pool: &Pool) -> Result<Self, ReaderError> {
        if bytes.len() > MAX_SOURCE_BYTES {
            return Err(ReaderError::FileTooLarge {
                bytes: bytes.len(),
                cap: MAX_SOURCE_BYTES,
            });
        }

        let mut line_starts = vec![0usize];
        for (i, &b) in bytes.iter().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        if line_starts.len() > MAX_LINE_COUNT {
            return Err(ReaderError::TooManyLines {
                lines: line_starts.len(),
                cap: MAX_LINE_COUNT,
            });
        }

        Ok(SourceReader {
            bytes,
            filename: pool.intern(filename),
            pos: 0,
            line: 1,
            column: 1,
            line_starts,
            mark: 0,
            status: ReaderStatus::Ok,
        })
    }

    pub fn filename(&self) -> &Symbol {
        &self.filename
    }

    pub fn status(&self) -> ReaderStatus {
        self.status
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    fn byte_at(&self, pos: usize) -> Option<u8> {
        self.bytes.get(pos).copied()
    }

    /// Peek the current lookahead character without advancing.
    pub fn next_char(&mut self) -> char {
        match self.byte_at(self.pos) {
            Some(b) => b as char,
            None => {
                self.status = ReaderStatus::AttemptToReadPastEof;
                EOT
            }
        }
    }

    /// Peek one character beyond the current lookahead, without advancing.
    pub fn la2_char(&mut self) -> char {
        match self.byte_at(self.pos + 1) {
            Some(b) => b as char,
            None => EOT,
        }
    }

    /// Advance the cursor past the current lookahead and return the new lookahead.
    pub fn consume_char(&mut self) -> Result<char, ReaderError> {
        if let Some(b) = self.byte_at(self.pos) {
            self.pos += 1;
            match b {
                b'\n' => {
                    self.line += 1;
                    self.column = 1;
                }
                _ => {
                    self.column += 1;
                }
            }
            if self.column > MAX_COLUMN {
                return Err(ReaderError::ColumnOverflow {
                    line: self.line,
                    column: self.column,
                });
            }
        } else {
            self.status = ReaderStatus::AttemptToReadPastEof;
        }
        Ok(self.next_char())
    }

    /// Remember the current cursor position as the start of the next lexeme.
    pub fn mark_lexeme(&mut self) {
        self.mark = self.pos;
    }

    /// Intern and return the slice `[mark .. cursor)` captured since the last
    /// [`mark_lexeme`] call.
    pub fn read_marked_lexeme(&self, pool: &Pool) -> Symbol {
        debug_assert!(self.mark <= self.pos, "lexeme mark must not be ahead of the cursor");
        let end = self.pos.min(self.bytes.len());
        let start = self.mark.min(end);
        pool.intern_slice(&self.bytes[start..end])
    }

    /// Intern and return the raw text of 1-indexed line `n`, without its terminator.
    pub fn source_for_line(&self, n: usize, pool: &Pool) -> Option<Symbol> {
        let start = *self.line_starts.get(n.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(n)
            .copied()
            .unwrap_or(self.bytes.len());
        let mut end = end.min(self.bytes.len());
        while end > start && (self.bytes[end - 1] == b'\n' || self.bytes[end - 1] == b'\r') {
            end -= 1;
        }
        Some(pool.intern_slice(&self.bytes[start..end]))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
