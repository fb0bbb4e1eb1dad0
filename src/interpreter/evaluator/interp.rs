use crate::{
    error::RuntimeError,
    interpreter::{
        evaluator::core::{Context, Evaluator},
        lexer::Pos,
        parser,
        value::Value,
    },
};

impl Evaluator<'_> {
    /// Decodes the given string literal, expanding escape sequences and
    /// substituting any `$(Ref)`, `$(Ref.Dot)`, and `$(Ref[Ind])`
    /// expressions that are found with their Sprint rendering.
    ///
    /// The position carried into interpolation tracks the column offset of
    /// the expression, so an error raised for `$(expr)` points at the
    /// expression inside the string rather than at the string itself.
    pub(super) fn interpolate(
        &mut self,
        c: &mut Context,
        litpos: &Pos,
        s: &str,
    ) -> Result<Value, RuntimeError> {
        let bytes = s.as_bytes();

        let mut buf = String::new();
        let mut expr = String::new();
        let mut interpolate = false;
        let mut pos = litpos.clone();

        let mut i = 0;

        while i < bytes.len() {
            let Some(ch) = s[i..].chars().next() else {
                break;
            };
            i += ch.len_utf8();

            if ch == '\\' && i < bytes.len() {
                match bytes[i] {
                    b't' => {
                        buf.push('\t');
                        i += 1;
                    }
                    b'r' => {
                        buf.push('\r');
                        i += 1;
                    }
                    b'n' => {
                        buf.push('\n');
                        i += 1;
                    }
                    // Anything else, such as an escaped quote, is kept
                    // verbatim without the backslash.
                    _ => {}
                }
                continue;
            }

            if ch == '$' && i < bytes.len() && bytes[i] == b'(' {
                interpolate = true;
                pos.col += i;
                i += 1;
                continue;
            }

            if ch == ')' && interpolate {
                interpolate = false;

                let node = parser::parse_ref(&format!("${expr}")).map_err(|err| {
                    RuntimeError::Message(err.message()).at(&pos)
                })?;

                let val = match self.eval(c, &node) {
                    Ok(Some(val)) => val,
                    Ok(None) => return Err(RuntimeError::MissingValue.at(&pos)),
                    Err(err) => return Err(err.unwrapped().at(&pos)),
                };

                buf.push_str(&val.sprint());

                expr.clear();
                pos.col = 0;
                continue;
            }

            if interpolate {
                expr.push(ch);
                continue;
            }
            buf.push(ch);
        }

        Ok(Value::Str(buf))
    }
}
