/// Core evaluation logic.
///
/// Contains the scoped symbol table, the evaluator itself, and the walk over
/// every AST node variant: assignment with type pinning, references and
/// selection, control flow, command dispatch, and chaining.
pub mod core;

/// String interpolation.
///
/// Decodes escape sequences and substitutes `$(expr)` expressions inside
/// string literals, tracking the column offset so errors point at the
/// expression inside the string.
pub mod interp;

/// The command registry and built-in commands.
///
/// Holds the name-to-command table with arity checking, and the thin
/// bindings from the language to the outside world: files, environment,
/// HTTP, and the codec sub-commands.
pub mod command;

pub use core::{Context, Evaluator};
