/// Core parser machinery.
///
/// Holds the parser state, token lookahead, error reporting and recovery,
/// and the public entry points for parsing scripts, REPL lines, and
/// references.
pub mod core;

/// Operand parsing.
///
/// Parses the leaves of expressions: literals, names, `$`-references with
/// their dot and index tails, object literals, and array literals.
pub mod operand;

/// Expression parsing.
///
/// Implements binary-precedence climbing over unary operands, where a name
/// in operand position starts a command invocation, possibly chained.
pub mod expression;

/// Statement parsing.
///
/// Parses top-level statements: assignments, commands and chains, `match`,
/// `if`, `for` in its three forms plus range iteration, and branch
/// statements.
pub mod statement;

pub use core::{Parser, parse, parse_expr, parse_ref};
