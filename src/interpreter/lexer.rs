use std::fmt;
use std::rc::Rc;

use logos::{Lexer, Logos};

/// A position within a script. Tokens and AST nodes carry one so that errors
/// can point back at the source that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pos {
    /// Name of the file being scanned, empty for REPL input.
    pub file: Rc<str>,
    /// 1-indexed line.
    pub line: usize,
    /// 1-indexed byte column.
    pub col:  usize,
}

impl Pos {
    /// Formats an error message prefixed with this position, in the same
    /// shape the error sink produces.
    pub fn err(&self, msg: &str) -> String {
        format!("{self} - {msg}")
    }
}

impl fmt::Display for Pos {
    /// Formats the position, eliding the parts that are not present,
    ///
    /// File
    /// File,Line
    /// File,Line:Col
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file)?;

        if self.line > 0 {
            if !self.file.is_empty() {
                write!(f, ",")?;
            }
            write!(f, "{}", self.line)?;

            if self.col > 0 {
                write!(f, ":{}", self.col)?;
            }
        }
        Ok(())
    }
}

/// The type of a scanned literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitType {
    String,
    Int,
    Float,
    Bool,
}

impl fmt::Display for LitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
        };
        write!(f, "{s}")
    }
}

/// A comparison or logical operator. The word operators `in`, `and`, and `or`
/// scan as operators too; they are recognized after an identifier has been
/// scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
    In,
    And,
    Or,
}

impl Op {
    /// The binding strength of the operator, used by the parser for
    /// precedence climbing. Low to high: `or`, `and`, comparisons, `in`.
    pub fn prec(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::Neq | Self::Lt | Self::Leq | Self::Gt | Self::Geq => 3,
            Self::In => 4,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Leq => "<=",
            Self::Gt => ">",
            Self::Geq => ">=",
            Self::In => "in",
            Self::And => "and",
            Self::Or => "or",
        };
        write!(f, "{s}")
    }
}

/// Error raised for input the scanner cannot turn into a token. The default
/// error carries no message and is reported as an unexpected token.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LexError {
    pub msg: Option<&'static str>,
}

impl LexError {
    fn new(msg: &'static str) -> Self {
        Self { msg: Some(msg) }
    }
}

/// Represents a lexical token in a req script.
///
/// Keywords are explicit token definitions so that they take priority over
/// the identifier pattern. Everything else the language treats as an
/// identifier, including header-style names such as `Content-Type`, scans as
/// [`Token::Name`].
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexError)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip r"#[^\n]*")]
pub enum Token {
    /// An identifier, `[A-Za-z_][A-Za-z0-9_-]*` with any Unicode letter also
    /// treated as a letter.
    #[regex(r"[\p{L}_][\p{L}0-9_\-]*", |lex| lex.slice().to_string())]
    Name(String),

    /// A literal together with its type tag. String literals keep their inner
    /// text verbatim so that interpolation can be applied during evaluation.
    #[regex(r"[0-9][0-9.]*", number)]
    #[token("\"", string)]
    #[token("true", lit_true)]
    #[token("false", lit_false)]
    Literal((LitType, String)),

    /// A comparison operator or one of the word operators `in`, `and`, `or`.
    #[token("==", |_| Op::Eq)]
    #[token("!=", |_| Op::Neq)]
    #[token("<=", |_| Op::Leq)]
    #[token("<", |_| Op::Lt)]
    #[token(">=", |_| Op::Geq)]
    #[token(">", |_| Op::Gt)]
    #[token("in", |_| Op::In)]
    #[token("and", |_| Op::And)]
    #[token("or", |_| Op::Or)]
    Op(Op),

    /// `;` or a newline, either terminates a statement.
    #[token(";")]
    #[token("\n")]
    Semi,
    /// `,`
    #[token(",")]
    Comma,
    /// `:`
    #[token(":")]
    Colon,
    /// `.`
    #[token(".")]
    Dot,
    /// `->`
    #[token("->")]
    Arrow,
    /// `=`
    #[token("=")]
    Assign,
    /// `$`
    #[token("$")]
    Ref,
    /// `{`
    #[token("{")]
    Lbrace,
    /// `}`
    #[token("}")]
    Rbrace,
    /// `(`
    #[token("(")]
    Lparen,
    /// `)`
    #[token(")")]
    Rparen,
    /// `[`
    #[token("[")]
    Lbrack,
    /// `]`
    #[token("]")]
    Rbrack,

    /// `break`
    #[token("break")]
    Break,
    /// `continue`
    #[token("continue")]
    Continue,
    /// `if`
    #[token("if")]
    If,
    /// `else`
    #[token("else")]
    Else,
    /// `for`
    #[token("for")]
    For,
    /// `match`
    #[token("match")]
    Match,
    /// `range`
    #[token("range")]
    Range,

    /// A NUL byte is never valid input. It is reported and skipped.
    #[token("\u{0}", nul)]
    Nul,

    /// End of input, appended once by [`lex`].
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Name(_) => "name",
            Self::Literal(_) => "literal",
            Self::Op(_) => "op",
            Self::Semi => "semi or newline",
            Self::Comma => ",",
            Self::Colon => ":",
            Self::Dot => ".",
            Self::Arrow => "->",
            Self::Assign => "=",
            Self::Ref => "$",
            Self::Lbrace => "{",
            Self::Rbrace => "}",
            Self::Lparen => "(",
            Self::Rparen => ")",
            Self::Lbrack => "[",
            Self::Rbrack => "]",
            Self::Break => "break",
            Self::Continue => "continue",
            Self::If => "if",
            Self::Else => "else",
            Self::For => "for",
            Self::Match => "match",
            Self::Range => "range",
            Self::Nul | Self::Eof => "eof",
        };
        write!(f, "{s}")
    }
}

fn nul(_lex: &mut Lexer<'_, Token>) -> Result<(), LexError> {
    Err(LexError::new("invalid NUL byte"))
}

fn lit_true(_lex: &mut Lexer<'_, Token>) -> (LitType, String) {
    (LitType::Bool, String::from("true"))
}

fn lit_false(_lex: &mut Lexer<'_, Token>) -> (LitType, String) {
    (LitType::Bool, String::from("false"))
}

/// Scans a number. Numbers scan as int literals unless a single `.` appears
/// mid-number, in which case the literal is a float. Anything else is a
/// diagnostic.
fn number(lex: &mut Lexer<'_, Token>) -> Result<(LitType, String), LexError> {
    let text = lex.slice();
    let dots = text.bytes().filter(|&b| b == b'.').count();

    match dots {
        0 => Ok((LitType::Int, text.to_string())),
        1 if !text.ends_with('.') => Ok((LitType::Float, text.to_string())),
        _ => Err(LexError::new("invalid number")),
    }
}

/// Scans the remainder of a string literal after the opening quote. The inner
/// text is kept verbatim; escape sequences and `$(...)` interpolations are
/// decoded during evaluation. Inside an interpolation window a `"` does not
/// terminate the string, so expressions such as `$(Obj["key"])` can appear in
/// string literals.
fn string(lex: &mut Lexer<'_, Token>) -> Result<(LitType, String), LexError> {
    let rem = lex.remainder();
    let bytes = rem.as_bytes();

    let mut interpolate = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' if !interpolate => {
                let text = rem[..i].to_string();
                lex.bump(i + 1);
                return Ok((LitType::String, text));
            }
            b'\\' => i += 2,
            b'\n' => {
                lex.bump(i);
                return Err(LexError::new("unexpected newline in string"));
            }
            b'$' if bytes.get(i + 1) == Some(&b'(') => {
                interpolate = true;
                i += 2;
            }
            b')' if interpolate => {
                interpolate = false;
                i += 1;
            }
            _ => i += 1,
        }
    }

    lex.bump(bytes.len());
    Err(LexError::new("unexpected end of string"))
}

/// Scans the given source into a list of tokens with their positions. Scan
/// errors are reported through the given error sink and scanning continues,
/// so a single pass surfaces every lexical problem. The returned list always
/// ends with [`Token::Eof`].
pub fn lex(file: &str, source: &str, errh: &mut dyn FnMut(Pos, &str)) -> Vec<(Token, Pos)> {
    let file: Rc<str> = Rc::from(file);

    // Byte offsets at which each line starts, for offset to line:col mapping.
    let mut line_starts = vec![0];
    for (i, b) in source.bytes().enumerate() {
        if b == b'\n' {
            line_starts.push(i + 1);
        }
    }

    let pos = |offset: usize| -> Pos {
        let line = line_starts.partition_point(|&start| start <= offset);
        Pos {
            file: Rc::clone(&file),
            line,
            col: offset - line_starts[line - 1] + 1,
        }
    };

    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(scanned) = lexer.next() {
        let tokpos = pos(lexer.span().start);

        match scanned {
            Ok(tok) => tokens.push((tok, tokpos)),
            Err(err) => match err.msg {
                Some(msg) => errh(tokpos, msg),
                None => errh(tokpos, &format!("unexpected token {:?}", lexer.slice())),
            },
        }
    }

    tokens.push((Token::Eof, pos(source.len())));
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_ok(source: &str) -> Vec<Token> {
        lex_ok_with_pos(source).into_iter().map(|(tok, _)| tok).collect()
    }

    fn lex_ok_with_pos(source: &str) -> Vec<(Token, Pos)> {
        let mut errs = Vec::new();
        let tokens = lex("", source, &mut |pos, msg| errs.push(pos.err(msg)));

        assert!(errs.is_empty(), "unexpected scan errors: {errs:?}");
        tokens
    }

    #[test]
    fn scans_assignment_and_command() {
        let tokens = lex_ok("Stdout = open \"/dev/stdout\";\n");

        assert_eq!(tokens, vec![
            Token::Name("Stdout".into()),
            Token::Assign,
            Token::Name("open".into()),
            Token::Literal((LitType::String, "/dev/stdout".into())),
            Token::Semi,
            Token::Semi,
            Token::Eof,
        ]);
    }

    #[test]
    fn scans_chain_and_object() {
        let tokens = lex_ok("GET \"url\" (Content-Type: \"text/plain\") -> send;");

        assert_eq!(tokens, vec![
            Token::Name("GET".into()),
            Token::Literal((LitType::String, "url".into())),
            Token::Lparen,
            Token::Name("Content-Type".into()),
            Token::Colon,
            Token::Literal((LitType::String, "text/plain".into())),
            Token::Rparen,
            Token::Arrow,
            Token::Name("send".into()),
            Token::Semi,
            Token::Eof,
        ]);
    }

    #[test]
    fn keywords_and_word_operators() {
        let tokens = lex_ok("if for match range break continue in and or true");

        assert_eq!(tokens, vec![
            Token::If,
            Token::For,
            Token::Match,
            Token::Range,
            Token::Break,
            Token::Continue,
            Token::Op(Op::In),
            Token::Op(Op::And),
            Token::Op(Op::Or),
            Token::Literal((LitType::Bool, "true".into())),
            Token::Eof,
        ]);
    }

    #[test]
    fn identifier_like_keywords_scan_as_names() {
        let tokens = lex_ok("iffy format inner");

        assert_eq!(tokens, vec![
            Token::Name("iffy".into()),
            Token::Name("format".into()),
            Token::Name("inner".into()),
            Token::Eof,
        ]);
    }

    #[test]
    fn numbers_scan_with_type_tags() {
        let tokens = lex_ok("10 2.5");

        assert_eq!(tokens, vec![
            Token::Literal((LitType::Int, "10".into())),
            Token::Literal((LitType::Float, "2.5".into())),
            Token::Eof,
        ]);
    }

    #[test]
    fn number_with_two_dots_is_a_diagnostic() {
        let mut errs = Vec::new();
        lex("", "1.2.3", &mut |pos, msg| errs.push(pos.err(msg)));

        assert_eq!(errs, vec!["1:1 - invalid number"]);
    }

    #[test]
    fn interpolation_window_keeps_inner_quotes() {
        let tokens = lex_ok(r#""Hello $(User["login"])""#);

        assert_eq!(tokens, vec![
            Token::Literal((LitType::String, r#"Hello $(User["login"])"#.into())),
            Token::Eof,
        ]);
    }

    #[test]
    fn newline_in_string_is_a_diagnostic() {
        let mut errs = Vec::new();
        lex("", "\"broken\nstring\"", &mut |pos, msg| errs.push(pos.err(msg)));

        assert_eq!(errs[0], "1:1 - unexpected newline in string");
    }

    #[test]
    fn nul_byte_is_reported_and_skipped() {
        let mut errs = Vec::new();
        let tokens = lex("", "A\u{0} = 1;", &mut |pos, msg| errs.push(pos.err(msg)));

        assert_eq!(errs, vec!["1:2 - invalid NUL byte"]);
        assert_eq!(tokens[0].0, Token::Name("A".into()));
        assert_eq!(tokens[1].0, Token::Assign);
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let tokens = lex_ok_with_pos("A = 1;\nB = 2;");

        let (_, pos) = &tokens[3];
        assert_eq!((pos.line, pos.col), (1, 6));

        let (tok, pos) = &tokens[5];
        assert_eq!(tok, &Token::Name("B".into()));
        assert_eq!((pos.line, pos.col), (2, 1));
    }
}
