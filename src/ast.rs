//! Tagged-tree AST representation. A single sum type models every node shape — branch,
//! terminal leaf, terminal list, and the empty sentinel — rather than a hierarchy of node
//! kinds with runtime inheritance.

use crate::fifo::Fifo;
use crate::pool::Symbol;

/// Every node kind the grammar produces. Names match the uppercase identifiers the AST
/// Writer emits verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Root,
    DefMod,
    ImpMod,
    ProgMod,
    ImpList,
    UnqImp,
    Import,
    IdentList,
    DefList,
    ConstDef,
    TypeDef,
    VarDecl,
    ProcDef,
    Ident,
    QualIdent,
    Subr,
    Enum,
    SetType,
    ArrayType,
    Record,
    ExtRec,
    VrntRec,
    PointerType,
    ProcType,
    FieldListSeq,
    FieldList,
    VfList,
    VariantList,
    Variant,
    CaseLabelList,
    FormalParams,
    Param,
    DeclList,
    Block,
    StmtSeq,
    Assign,
    PCall,
    ReturnStmt,
    WithStmt,
    IfStmt,
    Switch,
    LoopStmt,
    WhileStmt,
    RepeatStmt,
    ForTo,
    ExitStmt,
    Eq,
    Neq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    InOp,
    Plus,
    Minus,
    Or,
    Neg,
    Asterisk,
    Solidus,
    Div,
    Mod,
    And,
    NotOp,
    IntVal,
    RealVal,
    ChrVal,
    QuotedVal,
    SetVal,
    Desig,
    FCall,
    Deref,
    Args,
    Options,
    Filename,
}

impl Tag {
    /// The uppercase name the AST Writer renders for this tag.
    pub fn name(self) -> &'static str {
        use Tag::*;
        match self {
            Root => "ROOT",
            DefMod => "DEFMOD",
            ImpMod => "IMPMOD",
            ProgMod => "PROGMOD",
            ImpList => "IMPLIST",
            UnqImp => "UNQIMP",
            Import => "IMPORT",
            IdentList => "IDENTLIST",
            DefList => "DEFLIST",
            ConstDef => "CONSTDEF",
            TypeDef => "TYPEDEF",
            VarDecl => "VARDECL",
            ProcDef => "PROCDEF",
            Ident => "IDENT",
            QualIdent => "QUALIDENT",
            Subr => "SUBR",
            Enum => "ENUM",
            SetType => "SET",
            ArrayType => "ARRAY",
            Record => "RECORD",
            ExtRec => "EXTREC",
            VrntRec => "VRNTREC",
            PointerType => "POINTER",
            ProcType => "PROCTYPE",
            FieldListSeq => "FIELDLISTSEQ",
            FieldList => "FIELDLIST",
            VfList => "VFLIST",
            VariantList => "VARIANTLIST",
            Variant => "VARIANT",
            CaseLabelList => "CASELABELLIST",
            FormalParams => "FORMALPARAMS",
            Param => "PARAM",
            DeclList => "DECLLIST",
            Block => "BLOCK",
            StmtSeq => "STMTSEQ",
            Assign => "ASSIGN",
            PCall => "PCALL",
            ReturnStmt => "RETURN",
            WithStmt => "WITH",
            IfStmt => "IF",
            Switch => "SWITCH",
            LoopStmt => "LOOP",
            WhileStmt => "WHILE",
            RepeatStmt => "REPEAT",
            ForTo => "FORTO",
            ExitStmt => "EXIT",
            Eq => "EQ",
            Neq => "NEQ",
            Lt => "LT",
            LtEq => "LTEQ",
            Gt => "GT",
            GtEq => "GTEQ",
            InOp => "IN",
            Plus => "PLUS",
            Minus => "MINUS",
            Or => "OR",
            Neg => "NEG",
            Asterisk => "ASTERISK",
            Solidus => "SOLIDUS",
            Div => "DIV",
            Mod => "MOD",
            And => "AND",
            NotOp => "NOT",
            IntVal => "INTVAL",
            RealVal => "REALVAL",
            ChrVal => "CHRVAL",
            QuotedVal => "QUOTEDVAL",
            SetVal => "SETVAL",
            Desig => "DESIG",
            FCall => "FCALL",
            Deref => "DEREF",
            Args => "ARGS",
            Options => "OPTIONS",
            Filename => "FILENAME",
        }
    }
}

/// A node in the AST. Tags and arity are fixed once built, except through
/// [`Node::replace_subnode`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Branch { tag: Tag, children: Vec<Node> },
    Leaf { tag: Tag, value: Symbol },
    ValueList { tag: Tag, values: Vec<Symbol> },
    Empty,
}

impl Node {
    /// Fixed-arity branch node.
    pub fn new_branch(tag: Tag, children: Vec<Node>) -> Node {
        Node::Branch { tag, children }
    }

    /// Drains `fifo` into a variable-arity branch node, preserving insertion order.
    pub fn new_list(tag: Tag, fifo: Fifo<Node>) -> Node {
        Node::Branch {
            tag,
            children: fifo.into_vec(),
        }
    }

    /// Single-value terminal leaf.
    pub fn new_terminal(tag: Tag, value: Symbol) -> Node {
        Node::Leaf { tag, value }
    }

    /// List of interned values, e.g. `IDENTLIST`/`OPTIONS`.
    pub fn new_terminal_list(tag: Tag, fifo: Fifo<Symbol>) -> Node {
        Node::ValueList {
            tag,
            values: fifo.into_vec(),
        }
    }

    /// The empty sentinel, used wherever the grammar permits an absent optional subnode.
    pub fn empty() -> Node {
        Node::Empty
    }

    pub fn tag(&self) -> Option<Tag> {
        match self {
            Node::Branch { tag, .. } | Node::Leaf { tag, .. } | Node::ValueList { tag, .. } => {
                Some(*tag)
            }
            Node::Empty => None,
        }
    }

    pub fn is_empty_node(&self) -> bool {
        matches!(self, Node::Empty)
    }

    /// Number of children (branch) or values (terminal list); 1 for a leaf, 0 for empty.
    pub fn subnode_count(&self) -> usize {
        match self {
            Node::Branch { children, .. } => children.len(),
            Node::Leaf { .. } => 1,
            Node::ValueList { values, .. } => values.len(),
            Node::Empty => 0,
        }
    }

    /// The child at `index`, for a branch node. Panics if `self` is not a branch or the
    /// index is out of range — callers are the parser's own constructors, which never pass
    /// an invalid index for a well-formed tree.
    pub fn subnode_for_index(&self, index: usize) -> &Node {
        match self {
            Node::Branch { children, .. } => &children[index],
            other => panic!("subnode_for_index called on non-branch node {other:?}"),
        }
    }

    /// The interned value at `index`, for a leaf (`index` must be 0) or terminal-list node.
    pub fn value_for_index(&self, index: usize) -> &Symbol {
        match self {
            Node::Leaf { value, .. } if index == 0 => value,
            Node::ValueList { values, .. } => &values[index],
            other => panic!("value_for_index called on non-terminal node {other:?}"),
        }
    }

    /// Replace the child at `index` in place. Used sparingly by the parser when an
    /// already-built subtree must become a child of a later node.
    pub fn replace_subnode(&mut self, index: usize, new: Node) {
        match self {
            Node::Branch { children, .. } => {
                assert!(index < children.len(), "replace_subnode index out of range");
                children[index] = new;
            }
            other => panic!("replace_subnode called on non-branch node {other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Pool;

    #[test]
    fn branch_reports_its_declared_children() {
        let pool = Pool::new(8).unwrap();
        let ident = Node::new_terminal(Tag::Ident, pool.intern("Empty"));
        let implist = Node::new_branch(Tag::ImpList, vec![]);
        let deflist = Node::new_branch(Tag::DefList, vec![]);
        let defmod = Node::new_branch(Tag::DefMod, vec![ident, implist, deflist]);
        assert_eq!(defmod.tag(), Some(Tag::DefMod));
        assert_eq!(defmod.subnode_count(), 3);
        assert_eq!(defmod.subnode_for_index(0).tag(), Some(Tag::Ident));
    }

    #[test]
    fn new_list_preserves_fifo_order() {
        let pool = Pool::new(8).unwrap();
        let mut fifo = Fifo::new();
        fifo.append(Node::new_terminal(Tag::Ident, pool.intern("a")));
        fifo.append(Node::new_terminal(Tag::Ident, pool.intern("b")));
        let list = Node::new_list(Tag::IdentList, fifo);
        assert_eq!(list.subnode_count(), 2);
        assert_eq!(list.subnode_for_index(0).value_for_index(0).as_str(), "a");
        assert_eq!(list.subnode_for_index(1).value_for_index(0).as_str(), "b");
    }

    #[test]
    fn empty_nodes_compare_equal() {
        assert_eq!(Node::empty(), Node::empty());
    }

    #[test]
    fn replace_subnode_swaps_a_single_slot() {
        let pool = Pool::new(8).unwrap();
        let mut branch = Node::new_branch(
            Tag::Assign,
            vec![Node::empty(), Node::empty()],
        );
        let replacement = Node::new_terminal(Tag::Ident, pool.intern("x"));
        branch.replace_subnode(0, replacement);
        assert_eq!(branch.subnode_for_index(0).tag(), Some(Tag::Ident));
        assert!(branch.subnode_for_index(1).is_empty_node());
    }

    #[test]
    fn terminal_list_values_are_in_source_order() {
        let pool = Pool::new(8).unwrap();
        let mut fifo = Fifo::new();
        fifo.append(pool.intern("one"));
        fifo.append(pool.intern("two"));
        let options = Node::new_terminal_list(Tag::Options, fifo);
        assert_eq!(options.value_for_index(0).as_str(), "one");
        assert_eq!(options.value_for_index(1).as_str(), "two");
    }
}
