use std::io::Write;
use std::process;

use crate::{
    error::RuntimeError,
    interpreter::evaluator::command::core::cmd_err,
    interpreter::value::Value,
};

/// The `env` command retrieves the environment variable named by its single
/// string argument. An unset variable yields the empty string.
pub fn env(
    _out: &mut dyn Write,
    cmd: &str,
    args: Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    let name = args[0].as_str().map_err(|err| cmd_err(cmd, err))?;

    Ok(Some(Value::Str(std::env::var(name).unwrap_or_default())))
}

/// The `exit` command terminates the process with the int exit code it is
/// given. Termination is immediate, so the files opened by the script are
/// not closed through their finalizers.
pub fn exit(
    out: &mut dyn Write,
    cmd: &str,
    args: Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    let code = args[0].as_int().map_err(|err| cmd_err(cmd, err))?;

    let _ = out.flush();
    process::exit(code as i32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_returns_the_variable_or_empty() {
        let mut out = Vec::new();

        // SAFETY: test-local variable, no other thread reads the
        // environment concurrently in this test binary's process setup.
        unsafe { std::env::set_var("REQ_TEST_TOKEN", "123456") };

        let val = env(&mut out, "env", vec![Value::Str("REQ_TEST_TOKEN".into())]).unwrap();
        assert_eq!(val.unwrap().sprint(), "123456");

        let val = env(&mut out, "env", vec![Value::Str("REQ_TEST_UNSET".into())]).unwrap();
        assert_eq!(val.unwrap().sprint(), "");
    }

    #[test]
    fn env_requires_a_string() {
        let mut out = Vec::new();
        let err = env(&mut out, "env", vec![Value::Int(1)]).unwrap_err();

        assert_eq!(err.to_string(), "env: cannot use int as string");
    }
}
