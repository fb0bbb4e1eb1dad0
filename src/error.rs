/// Parsing errors.
///
/// Defines all error types that can occur during scanning and parsing of a
/// script. Parse errors include unexpected tokens, missing terminators, and
/// malformed literals, and are reported through the parser's error sink as
/// they accumulate.
pub mod parse_error;
/// Runtime errors.
///
/// Contains all error types that can be raised during evaluation. Runtime
/// errors include type mismatches, missing fields, command failures, and the
/// internal branch sentinel used by `break` and `continue`.
pub mod runtime_error;

pub use parse_error::ParseError;
pub use runtime_error::RuntimeError;
