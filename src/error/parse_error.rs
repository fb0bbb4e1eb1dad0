use crate::interpreter::lexer::Pos;

#[derive(Debug, Clone, PartialEq)]
/// Represents all errors that can occur during scanning or parsing.
///
/// Individual errors are handed to the parser's error sink as they are found;
/// the parser keeps going so a single pass surfaces as many problems as
/// possible. Once parsing has completed, callers receive [`ParseError::Count`]
/// summarizing how many errors were reported.
pub enum ParseError {
    /// A specific token was required but something else was found.
    Expected {
        /// Display name of the required token.
        token: String,
        /// The position at which the error occurred.
        pos:   Pos,
    },
    /// A token that cannot begin or continue the current construct.
    Unexpected {
        /// Display name of the offending token.
        token: String,
        /// The position at which the error occurred.
        pos:   Pos,
    },
    /// Any other scan or parse diagnostic, with a free-form message.
    Message {
        /// Details about the error.
        msg: String,
        /// The position at which the error occurred.
        pos: Pos,
    },
    /// Summary returned after parsing finishes with one or more errors.
    Count {
        /// How many errors the sink received.
        count: usize,
    },
}

impl ParseError {
    /// The error message alone, without the position prefix. String
    /// interpolation re-positions reference errors relative to the
    /// enclosing literal, so it reports the bare message at its own
    /// position.
    pub fn message(&self) -> String {
        match self {
            Self::Expected { token, .. } => format!("expected {token}"),
            Self::Unexpected { token, .. } => format!("unexpected {token}"),
            Self::Message { msg, .. } => msg.clone(),
            Self::Count { count } => format!("parser encountered {count} error(s)"),
        }
    }

    /// The position the error points at, if it carries one.
    pub fn pos(&self) -> Option<&Pos> {
        match self {
            Self::Expected { pos, .. } | Self::Unexpected { pos, .. } | Self::Message { pos, .. } => {
                Some(pos)
            }
            Self::Count { .. } => None,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expected { token, pos } => write!(f, "{pos} - expected {token}"),
            Self::Unexpected { token, pos } => write!(f, "{pos} - unexpected {token}"),
            Self::Message { msg, pos } => write!(f, "{pos} - {msg}"),
            Self::Count { count } => write!(f, "parser encountered {count} error(s)"),
        }
    }
}

impl std::error::Error for ParseError {}
