//! AST Writer: serialises an [`Node`] tree to its canonical S-expression form, terminated
//! by exactly one LF.
//!
//! Every node renders as `( TAG` followed by its children or values, each preceded by a
//! single space, then `)`; the outermost node alone has no leading space. Terminal
//! rendering is tag-sensitive: most leaves print their raw lexeme, `QUOTEDVAL`/`FILENAME`/
//! `OPTIONS` members are quoted (flipping the delimiter when the text itself contains a
//! `"`), and `INTVAL`/`CHRVAL` carry a dialect-disambiguating marker character so the
//! written form is unambiguous regardless of which lexer mode produced it.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::ast::{Node, Tag};
use crate::pool::Symbol;

/// Outcome of a write.
#[derive(Debug)]
pub enum WriteStatus {
    Success { chars_written: usize },
    InvalidFile,
    FileOpenFailure(io::Error),
    WriteFailure(io::Error),
}

impl fmt::Display for WriteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStatus::Success { chars_written } => {
                write!(f, "wrote {chars_written} characters")
            }
            WriteStatus::InvalidFile => write!(f, "invalid output path"),
            WriteStatus::FileOpenFailure(e) => write!(f, "failed to open output file: {e}"),
            WriteStatus::WriteFailure(e) => write!(f, "failed to write output file: {e}"),
        }
    }
}

/// Serialise `root` to `path`, creating or truncating it. Returns the number of
/// characters written on success.
pub fn write_to_path(root: &Node, path: &Path) -> WriteStatus {
    if path.as_os_str().is_empty() {
        return WriteStatus::InvalidFile;
    }
    let mut file = match File::create(path) {
        Ok(f) => f,
        Err(e) => return WriteStatus::FileOpenFailure(e),
    };
    match write_to(&mut file, root) {
        Ok(chars_written) => WriteStatus::Success { chars_written },
        Err(e) => WriteStatus::WriteFailure(e),
    }
}

/// Serialise `root` to any [`Write`] sink, returning the number of characters written
/// (including the trailing LF). Used directly by tests that don't want to touch the
/// filesystem.
pub fn write_to(out: &mut dyn Write, root: &Node) -> io::Result<usize> {
    let mut buf = String::new();
    render(root, &mut buf, true);
    buf.push('\n');
    out.write_all(buf.as_bytes())?;
    Ok(buf.chars().count())
}

/// Serialise `root` to an owned `String`, terminator included. Convenient for tests that
/// want to assert on the exact rendered text.
pub fn to_string(root: &Node) -> String {
    let mut buf = String::new();
    render(root, &mut buf, true);
    buf.push('\n');
    buf
}

fn render(node: &Node, buf: &mut String, outermost: bool) {
    if !outermost {
        buf.push(' ');
    }
    match node {
        Node::Empty => buf.push_str("(EMPTY)"),
        Node::Branch { tag, children } => {
            buf.push('(');
            buf.push_str(tag.name());
            for child in children {
                render(child, buf, false);
            }
            buf.push(')');
        }
        Node::Leaf { tag, value } => {
            buf.push('(');
            buf.push_str(tag.name());
            buf.push(' ');
            buf.push_str(&render_terminal(*tag, value));
            buf.push(')');
        }
        Node::ValueList { tag, values } => {
            buf.push('(');
            buf.push_str(tag.name());
            for value in values {
                buf.push(' ');
                buf.push_str(&render_terminal_list_item(*tag, value));
            }
            buf.push(')');
        }
    }
}

/// Rendering for a single-valued terminal leaf.
fn render_terminal(tag: Tag, value: &Symbol) -> String {
    match tag {
        Tag::QuotedVal | Tag::Filename => quote(value.as_str()),
        Tag::IntVal => marked_int(value.as_str()),
        Tag::ChrVal => marked_chr(value.as_str()),
        // IDENT, REALVAL, and anything else without a special rule: raw lexeme.
        _ => value.as_str().to_string(),
    }
}

/// Rendering for one element of a terminal-list node. `QUALIDENT`/`IDENTLIST` members are
/// raw; `OPTIONS` members are quoted.
fn render_terminal_list_item(tag: Tag, value: &Symbol) -> String {
    match tag {
        Tag::Options => quote(value.as_str()),
        _ => value.as_str().to_string(),
    }
}

/// Quote `text`, flipping the delimiter to `'` when `text` itself contains a `"`.
fn quote(text: &str) -> String {
    if text.contains('"') {
        format!("'{text}'")
    } else {
        format!("\"{text}\"")
    }
}

/// `INTVAL`: `#` prefix when the lexer's prefix mode produced it (`0x...`/`0u...`-shaped
/// lexeme, second byte `x`), `?` prefix when suffix mode produced a `H`/`B`-terminated
/// lexeme, otherwise unmarked.
fn marked_int(lexeme: &str) -> String {
    let bytes = lexeme.as_bytes();
    if bytes.get(1) == Some(&b'x') {
        format!("#{lexeme}")
    } else if matches!(bytes.last(), Some(b'H') | Some(b'B')) {
        format!("?{lexeme}")
    } else {
        lexeme.to_string()
    }
}

/// `CHRVAL`: same marker scheme as [`marked_int`], but prefix mode's second byte is `u`
/// (`0u<hex>` character code) and suffix mode's trailing byte is `C` (octal char code).
fn marked_chr(lexeme: &str) -> String {
    let bytes = lexeme.as_bytes();
    if bytes.get(1) == Some(&b'u') {
        format!("#{lexeme}")
    } else if bytes.last() == Some(&b'C') {
        format!("?{lexeme}")
    } else {
        lexeme.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fifo::Fifo;
    use crate::pool::Pool;

    #[test]
    fn empty_definition_module_matches_the_canonical_transcript() {
        let pool = Pool::new(16).unwrap();
        let ident = Node::new_terminal(Tag::Ident, pool.intern("Empty"));
        let implist = Node::new_branch(Tag::ImpList, vec![]);
        let deflist = Node::new_branch(Tag::DefList, vec![]);
        let defmod = Node::new_branch(Tag::DefMod, vec![ident, implist, deflist]);
        let filename = Node::new_terminal(Tag::Filename, pool.intern("Empty.def"));
        let options = Node::new_terminal_list(Tag::Options, Fifo::new());
        let root = Node::new_branch(Tag::Root, vec![filename, options, defmod]);

        assert_eq!(
            to_string(&root),
            "(ROOT (FILENAME \"Empty.def\") (OPTIONS) (DEFMOD (IDENT Empty) (IMPLIST) (DEFLIST)))\n"
        );
    }

    #[test]
    fn outermost_node_has_no_leading_space() {
        let pool = Pool::new(8).unwrap();
        let node = Node::new_terminal(Tag::Ident, pool.intern("x"));
        assert!(to_string(&node).starts_with("(IDENT"));
    }

    #[test]
    fn every_nested_node_is_preceded_by_exactly_one_space() {
        let pool = Pool::new(8).unwrap();
        let a = Node::new_terminal(Tag::Ident, pool.intern("a"));
        let b = Node::new_terminal(Tag::Ident, pool.intern("b"));
        let branch = Node::new_branch(Tag::Block, vec![a, b]);
        assert_eq!(to_string(&branch), "(BLOCK (IDENT a) (IDENT b))\n");
    }

    #[test]
    fn quoted_val_flips_delimiter_when_content_has_a_double_quote() {
        let pool = Pool::new(8).unwrap();
        let plain = Node::new_terminal(Tag::QuotedVal, pool.intern("hi"));
        assert_eq!(to_string(&plain), "(QUOTEDVAL \"hi\")\n");

        let with_quote = Node::new_terminal(Tag::QuotedVal, pool.intern("a\"b"));
        assert_eq!(to_string(&with_quote), "(QUOTEDVAL 'a\"b')\n");
    }

    #[test]
    fn intval_prefix_mode_gets_hash_marker() {
        let pool = Pool::new(8).unwrap();
        let node = Node::new_terminal(Tag::IntVal, pool.intern("0x1F"));
        assert_eq!(to_string(&node), "(INTVAL #0x1F)\n");
    }

    #[test]
    fn intval_suffix_mode_gets_question_marker() {
        let pool = Pool::new(8).unwrap();
        let node = Node::new_terminal(Tag::IntVal, pool.intern("0FFH"));
        assert_eq!(to_string(&node), "(INTVAL ?0FFH)\n");
    }

    #[test]
    fn intval_plain_decimal_is_unmarked() {
        let pool = Pool::new(8).unwrap();
        let node = Node::new_terminal(Tag::IntVal, pool.intern("42"));
        assert_eq!(to_string(&node), "(INTVAL 42)\n");
    }

    #[test]
    fn chrval_suffix_mode_gets_question_marker() {
        let pool = Pool::new(8).unwrap();
        let node = Node::new_terminal(Tag::ChrVal, pool.intern("101C"));
        assert_eq!(to_string(&node), "(CHRVAL ?101C)\n");
    }

    #[test]
    fn empty_sentinel_renders_as_empty_tag() {
        assert_eq!(to_string(&Node::empty()), "(EMPTY)\n");
    }

    #[test]
    fn identlist_and_qualident_members_are_raw_not_quoted() {
        let pool = Pool::new(8).unwrap();
        let mut fifo = Fifo::new();
        fifo.append(pool.intern("Put"));
        fifo.append(pool.intern("Get"));
        let idlist = Node::new_terminal_list(Tag::IdentList, fifo);
        assert_eq!(to_string(&idlist), "(IDENTLIST Put Get)\n");
    }

    #[test]
    fn options_members_are_quoted() {
        let pool = Pool::new(8).unwrap();
        let mut fifo = Fifo::new();
        fifo.append(pool.intern("verbose"));
        let options = Node::new_terminal_list(Tag::Options, fifo);
        assert_eq!(to_string(&options), "(OPTIONS \"verbose\")\n");
    }

    #[test]
    fn hello_program_matches_the_canonical_transcript() {
        let pool = Pool::new(64).unwrap();
        let put = Node::new_terminal(Tag::Ident, pool.intern("Put"));
        let arg = Node::new_terminal(Tag::QuotedVal, pool.intern("hi"));
        let args = Node::new_branch(Tag::Args, vec![arg]);
        let pcall = Node::new_branch(Tag::PCall, vec![put, args]);
        let stmtseq = Node::new_branch(Tag::StmtSeq, vec![pcall]);
        let block = Node::new_branch(Tag::Block, vec![Node::empty(), stmtseq]);
        let io_ident = Node::new_terminal(Tag::Ident, pool.intern("IO"));
        let mut idlist_fifo = Fifo::new();
        idlist_fifo.append(pool.intern("Put"));
        let idlist = Node::new_terminal_list(Tag::IdentList, idlist_fifo);
        let unqimp = Node::new_branch(Tag::UnqImp, vec![io_ident, idlist]);
        let implist = Node::new_branch(Tag::ImpList, vec![unqimp]);
        let hello = Node::new_terminal(Tag::Ident, pool.intern("Hello"));
        let impmod = Node::new_branch(Tag::ImpMod, vec![hello, Node::empty(), implist, block]);

        assert_eq!(
            to_string(&impmod),
            "(IMPMOD (IDENT Hello) (EMPTY) (IMPLIST (UNQIMP (IDENT IO) (IDENTLIST Put))) \
             (BLOCK (EMPTY) (STMTSEQ (PCALL (IDENT Put) (ARGS (QUOTEDVAL \"hi\"))))))\n"
        );
    }
}
