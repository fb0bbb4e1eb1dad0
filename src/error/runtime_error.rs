use crate::ast::Branch;
use crate::interpreter::lexer::{Op, Pos};

#[derive(Debug)]
/// Represents all errors that can occur during evaluation.
pub enum RuntimeError {
    /// Looked up a variable that was never assigned.
    Undefined {
        /// The name of the variable.
        name: String,
    },
    /// Invoked a command that is not in the registry.
    UndefinedCommand {
        /// The name of the command.
        name: String,
    },
    /// A value had the wrong type for the operation, "cannot use X as Y".
    Type {
        /// Type name of the value that was found.
        from: &'static str,
        /// Type name that was required.
        to:   &'static str,
    },
    /// Selected a field the value does not expose.
    NoField {
        /// Type name of the value being selected from.
        typ:   &'static str,
        /// The field that was asked for.
        field: String,
    },
    /// Iterated a value that does not support iteration.
    NotIterable {
        /// Type name of the value.
        typ: &'static str,
    },
    /// Indexed a value that does not support indexing.
    NotIndexable {
        /// Type name of the value.
        typ: &'static str,
    },
    /// Selected a field on a value that has no fields.
    NotSelectable {
        /// Type name of the value.
        typ: &'static str,
    },
    /// Compared two values of incompatible types.
    Compare {
        /// The comparison operator.
        op:    Op,
        /// Type name of the left operand.
        left:  &'static str,
        /// Type name of the right operand.
        right: &'static str,
    },
    /// Applied an operator a type does not define.
    InvalidOp {
        /// The operator.
        op:  Op,
        /// Type name of the operand.
        typ: &'static str,
    },
    /// Put a value of a different type into a homogeneous array.
    Homogeneity {
        /// Type name the array is pinned to.
        typ: &'static str,
    },
    /// Assigned through an index that is outside the array.
    OutOfBounds,
    /// The two sides of an assignment have different lengths.
    Mismatch {
        /// Number of variables on the left.
        vars: usize,
        /// Number of values on the right.
        vals: usize,
    },
    /// A range loop bound more than two variables.
    RangeMismatch,
    /// An expression was used where a value was required but produced none.
    MissingValue,
    /// A command invocation failed, either up front (wrong argument count or
    /// type) or while the handler ran.
    Command {
        /// The operation that failed, such as "call", if the failure happened
        /// before the handler ran.
        op:  Option<&'static str>,
        /// The name of the command.
        cmd: String,
        /// The underlying error.
        err: Box<RuntimeError>,
    },
    /// Internal sentinel raised by `break` and `continue` and caught by the
    /// nearest enclosing loop. User-visible only when no loop encloses it.
    Branch {
        /// Which branch statement was evaluated.
        kind: Branch,
        /// The position of the branch statement.
        pos:  Pos,
    },
    /// An error decorated with the position it occurred at. Errors are never
    /// wrapped twice.
    Eval {
        /// The position at which the error occurred.
        pos: Pos,
        /// The underlying error.
        err: Box<RuntimeError>,
    },
    /// An I/O operation failed.
    Io(std::io::Error),
    /// The HTTP transport failed.
    Http(reqwest::Error),
    /// A JSON payload could not be decoded.
    Json(serde_json::Error),
    /// Any other evaluation error, with a free-form message.
    Message(String),
}

impl RuntimeError {
    /// Wraps the error with the given position, unless it already carries
    /// one.
    pub fn at(self, pos: &Pos) -> Self {
        match self {
            Self::Eval { .. } => self,
            err => Self::Eval {
                pos: pos.clone(),
                err: Box::new(err),
            },
        }
    }

    /// Strips the position decoration, if any, leaving the underlying error.
    /// The REPL uses this to show bare messages for single-line input.
    pub fn unwrapped(self) -> Self {
        match self {
            Self::Eval { err, .. } => *err,
            err => err,
        }
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undefined { name } => write!(f, "undefined: {name}"),
            Self::UndefinedCommand { name } => write!(f, "undefined command: {name}"),
            Self::Type { from, to } => write!(f, "cannot use {from} as {to}"),
            Self::NoField { typ, field } => write!(f, "type {typ} has no field {field}"),
            Self::NotIterable { typ } => write!(f, "type {typ} is not an iterable"),
            Self::NotIndexable { typ } => write!(f, "type {typ} does not support indexing"),
            Self::NotSelectable { typ } => write!(f, "type {typ} does not support selection"),
            Self::Compare { op, left, right } => {
                write!(f, "type mismatch for comparison: {left} {op} {right}")
            }
            Self::InvalidOp { op, typ } => write!(f, "invalid operation {op} on {typ}"),
            Self::Homogeneity { typ } => write!(f, "array can only contain type {typ}"),
            Self::OutOfBounds => write!(f, "assignment out of bounds"),
            Self::Mismatch { vars, vals } => {
                write!(f, "assignment mismatch: {vars} variable(s) but {vals} value(s)")
            }
            Self::RangeMismatch => write!(
                f,
                "assignment mismatch: can only assign at most 2 variables during iteration"
            ),
            Self::MissingValue => write!(f, "expression produced no value"),
            Self::Command { op, cmd, err } => match op {
                Some(op) => write!(f, "invalid {op} to {cmd}: {err}"),
                None => write!(f, "{cmd}: {err}"),
            },
            Self::Branch { kind, pos } => write!(f, "{pos} - {kind} outside of loop"),
            Self::Eval { pos, err } => write!(f, "{pos} - {err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Http(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "{err}"),
            Self::Message(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Command { err, .. } | Self::Eval { err, .. } => Some(err.as_ref()),
            Self::Io(err) => Some(err),
            Self::Http(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RuntimeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<reqwest::Error> for RuntimeError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

impl From<serde_json::Error> for RuntimeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}
