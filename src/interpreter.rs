/// The evaluator module executes AST nodes and computes results.
///
/// The evaluator walks the AST, resolves references against a scoped symbol
/// table, interpolates strings, dispatches commands, and drives control flow.
/// It is the core execution engine of the interpreter.
///
/// # Responsibilities
/// - Evaluates AST nodes into runtime values.
/// - Manages variable scoping, type pinning, and iteration.
/// - Dispatches commands through the registry and tracks opened files so
///   they close on normal termination.
pub mod evaluator;
/// The lexer module tokenizes source code for further parsing.
///
/// The lexer reads the raw source text and produces a stream of tokens, each
/// corresponding to meaningful language elements such as literals, names,
/// operators, and punctuation. This is the first stage of interpretation.
///
/// # Responsibilities
/// - Converts the input character stream into tokens with type tags and
///   source positions.
/// - Handles string literals with interpolation windows, numbers, and
///   identifiers.
/// - Reports lexical errors for invalid or malformed input and keeps
///   scanning.
pub mod lexer;
/// The parser module builds the abstract syntax tree (AST) from tokens.
///
/// The parser processes the token stream produced by the lexer and
/// constructs an AST that represents the syntactic structure of statements
/// and expressions. This enables the evaluator to execute scripts.
///
/// # Responsibilities
/// - Converts tokens into structured AST nodes.
/// - Validates grammar, reporting errors with positions and recovering at
///   follow sets so one pass surfaces every problem.
/// - Supports assignments, commands and chains, match, if, and for.
pub mod parser;
/// The value module defines the runtime data types for evaluation.
///
/// This module declares all the value types used during execution: scalars,
/// arrays and objects, files and streams, HTTP requests and responses,
/// cookies, form-data, and the universal zero value. It also provides the
/// uniform operations every value supports.
///
/// # Responsibilities
/// - Defines the `Value` enum and all supported value variants.
/// - Implements formatting, comparison, iteration, indexing, and field
///   selection.
/// - Keeps compound values shared so mutation through references behaves
///   consistently.
pub mod value;
