use crate::interpreter::lexer::{LitType, Op, Pos};

/// The kind of a branch statement, `break` or `continue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Break,
    Continue,
}

impl std::fmt::Display for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Break => write!(f, "break"),
            Self::Continue => write!(f, "continue"),
        }
    }
}

/// An abstract syntax tree node representing a construct in a req script.
///
/// The parser produces a list of these for each script, and the evaluator
/// walks them directly. Every variant carries the position of the token that
/// introduced it for error reporting.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A literal together with its scanned type tag. String literals hold
    /// their inner text verbatim; escapes and `$(...)` interpolation are
    /// decoded during evaluation.
    Lit {
        typ:   LitType,
        value: String,
        pos:   Pos,
    },
    /// An identifier in expression position, such as an object key, a bare
    /// command argument, or the `_` discard.
    Name {
        value: String,
        pos:   Pos,
    },
    /// A `$`-prefixed variable reference. The inner node is a [`Node::Name`],
    /// [`Node::DotExpr`], or [`Node::IndExpr`].
    Ref {
        inner: Box<Node>,
        pos:   Pos,
    },
    /// Field selection, `left.Right`.
    DotExpr {
        left:  Box<Node>,
        right: Box<Node>,
        pos:   Pos,
    },
    /// Index access, `left[right]`. An empty index (`Arr[] = v`) holds an
    /// empty [`Node::Array`] as its right-hand side and appends on
    /// assignment.
    IndExpr {
        left:  Box<Node>,
        right: Box<Node>,
        pos:   Pos,
    },
    /// An array literal, `[a, b, c]`.
    Array {
        items: Vec<Node>,
        pos:   Pos,
    },
    /// An object literal, `(key: value, ...)`. Keys are names and the pair
    /// order is preserved.
    Object {
        pairs: Vec<(String, Node)>,
        pos:   Pos,
    },
    /// A comma-separated list of expressions, used for the two sides of an
    /// assignment and for range bindings.
    ExprList {
        nodes: Vec<Node>,
        pos:   Pos,
    },
    /// An assignment, `lhs, ... = rhs, ...`. Both sides are
    /// [`Node::ExprList`]s of equal length.
    AssignStmt {
        left:  Box<Node>,
        right: Box<Node>,
        pos:   Pos,
    },
    /// A `{ ... }` block. Blocks open a scope.
    BlockStmt {
        nodes: Vec<Node>,
        pos:   Pos,
    },
    /// A command invocation, `name arg arg ...`.
    CommandStmt {
        name: String,
        args: Vec<Node>,
        pos:  Pos,
    },
    /// A command pipeline, `a -> b -> c`. Each command's return value is
    /// appended to the argument list of the next.
    ChainExpr {
        commands: Vec<Node>,
        pos:      Pos,
    },
    /// A single `literal -> stmt-or-block` arm of a match statement.
    CaseStmt {
        value: Box<Node>,
        then:  Box<Node>,
        pos:   Pos,
    },
    /// A `match` statement with its arms and optional `_` default.
    MatchStmt {
        cond:    Box<Node>,
        cases:   Vec<Node>,
        default: Option<Box<Node>>,
        pos:     Pos,
    },
    /// An `if` statement. The else branch is another [`Node::IfStmt`] or a
    /// [`Node::BlockStmt`].
    IfStmt {
        cond: Box<Node>,
        then: Box<Node>,
        els:  Option<Box<Node>>,
        pos:  Pos,
    },
    /// A `for` loop in any of its three forms. When the init node is a
    /// [`Node::Range`] the loop iterates that range instead.
    ForStmt {
        init: Option<Box<Node>>,
        cond: Option<Box<Node>>,
        post: Option<Box<Node>>,
        body: Box<Node>,
        pos:  Pos,
    },
    /// The `names range expr` head of a range loop. The left side is an
    /// [`Node::ExprList`] of one or two names.
    Range {
        left:  Box<Node>,
        right: Box<Node>,
        pos:   Pos,
    },
    /// A unary or binary operation. A missing right operand is a truthiness
    /// test of the left operand.
    Operation {
        op:    Op,
        left:  Box<Node>,
        right: Option<Box<Node>>,
        pos:   Pos,
    },
    /// `break` or `continue`.
    BranchStmt {
        kind: Branch,
        pos:  Pos,
    },
}

impl Node {
    /// The position of the token that introduced this node.
    pub fn pos(&self) -> &Pos {
        match self {
            Self::Lit { pos, .. }
            | Self::Name { pos, .. }
            | Self::Ref { pos, .. }
            | Self::DotExpr { pos, .. }
            | Self::IndExpr { pos, .. }
            | Self::Array { pos, .. }
            | Self::Object { pos, .. }
            | Self::ExprList { pos, .. }
            | Self::AssignStmt { pos, .. }
            | Self::BlockStmt { pos, .. }
            | Self::CommandStmt { pos, .. }
            | Self::ChainExpr { pos, .. }
            | Self::CaseStmt { pos, .. }
            | Self::MatchStmt { pos, .. }
            | Self::IfStmt { pos, .. }
            | Self::ForStmt { pos, .. }
            | Self::Range { pos, .. }
            | Self::Operation { pos, .. }
            | Self::BranchStmt { pos, .. } => pos,
        }
    }
}
