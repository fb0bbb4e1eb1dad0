//! # req
//!
//! req is an opinionated scripting language for making HTTP requests. It
//! parses, evaluates, and executes `.req` scripts that compose requests,
//! send them, pattern-match on their responses, and encode or decode the
//! payloads that flow through them.

#![warn(
    clippy::redundant_clone,
    clippy::needless_pass_by_value,
    clippy::large_enum_variant,
    clippy::string_lit_as_bytes,
    clippy::match_same_arms,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    clippy::correctness,
    clippy::complexity
)]

use std::io::Write;

use crate::{error::ParseError, interpreter::evaluator::Evaluator, interpreter::parser};

/// Defines the structure of parsed scripts.
///
/// This module declares the `Node` enum that represents the syntactic
/// structure of a script as a tree. The AST is built by the parser and
/// walked by the evaluator.
///
/// # Responsibilities
/// - Defines node variants for every surface construct.
/// - Attaches source positions to nodes for error reporting.
pub mod ast;
/// Provides unified error types for parsing and evaluation.
///
/// This module defines all errors that can be raised while scanning,
/// parsing, or evaluating a script. It standardizes error reporting and
/// carries positions so failures point back into the source.
///
/// # Responsibilities
/// - Defines error enums for all failure modes.
/// - Attaches positions and detailed messages for user feedback.
/// - Supports integration with standard error handling traits.
pub mod error;
/// Orchestrates the entire process of script execution.
///
/// This module ties together scanning, parsing, evaluation, the value
/// system, and the command registry to provide a complete runtime for req
/// scripts.
///
/// # Responsibilities
/// - Coordinates all core components: lexer, parser, evaluator, values.
/// - Provides entry points for parsing and evaluating scripts.
/// - Manages the flow of data and errors between phases.
pub mod interpreter;
/// The interactive read-eval-print loop.
///
/// Reads lines, parses each as an expression sequence, evaluates it against
/// a persistent context, and prints the results.
pub mod repl;

/// The build version of req, reported by `--version` and carried in the
/// default `User-Agent` header of outgoing requests.
pub const BUILD: &str = env!("CARGO_PKG_VERSION");

/// Parses and evaluates the given script, writing command output to the
/// given writer. Parse diagnostics are reported through the error sink as
/// they are found; if any occurred, evaluation does not start and the
/// summarizing error is returned.
///
/// # Errors
/// Returns an error if parsing reported any diagnostics, or if a runtime
/// error occurs during evaluation.
///
/// # Examples
/// ```
/// let mut out = Vec::new();
/// req::run("hello.req", "writeln _ \"hello\";", &mut out, &mut |_| {}).unwrap();
///
/// assert_eq!(out, b"hello\n");
/// ```
pub fn run(
    name: &str,
    source: &str,
    out: &mut dyn Write,
    errh: &mut dyn FnMut(&ParseError),
) -> Result<(), Box<dyn std::error::Error>> {
    let nodes = parser::parse(name, source, errh)?;

    let mut evaluator = Evaluator::new(out);
    evaluator.run(&nodes)?;

    Ok(())
}
