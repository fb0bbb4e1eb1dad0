use std::io::Write;

use crate::{
    error::RuntimeError,
    interpreter::evaluator::command::{codec, env, file, http, sniff},
    interpreter::value::Value,
};

/// The function handling the invocation of a command. It receives the
/// writer the write commands target, the name the command was invoked
/// under, and its evaluated arguments. Commands that produce nothing, such
/// as `write`, return `None`.
pub type CommandFunc =
    fn(&mut dyn Write, &str, Vec<Value>) -> Result<Option<Value>, RuntimeError>;

/// Specifies the number of arguments a command accepts.
///
/// - `Exact(n)` means the command must receive exactly `n` arguments.
/// - `Variadic` means the command checks its own argument count.
#[derive(Clone, Copy)]
pub enum Arity {
    Exact(usize),
    Variadic,
}

/// A named built-in command.
pub struct Command {
    pub name:  &'static str,
    pub arity: Arity,
    pub func:  CommandFunc,
}

/// Defines the built-in commands by generating a lookup table.
///
/// Each entry provides a string name, the number of arguments the command
/// accepts, and a function pointer implementing it.
macro_rules! commands {
    (
        $(
            $name:literal => {
                arity: $arity:expr,
                func: $func:expr $(,)?
            }
        ),* $(,)?
    ) => {
        static COMMAND_TABLE: &[Command] = &[
            $(
                Command { name: $name, arity: $arity, func: $func },
            )*
        ];
    };
}

commands! {
    "env"     => { arity: Arity::Exact(1), func: env::env },
    "exit"    => { arity: Arity::Exact(1), func: env::exit },
    "open"    => { arity: Arity::Exact(1), func: file::open },
    "read"    => { arity: Arity::Exact(1), func: file::read },
    "readln"  => { arity: Arity::Exact(1), func: file::readln },
    "write"   => { arity: Arity::Variadic, func: file::write },
    "writeln" => { arity: Arity::Variadic, func: file::writeln },
    "HEAD"    => { arity: Arity::Variadic, func: |out, cmd, args| http::request(out, cmd, args, 2) },
    "OPTIONS" => { arity: Arity::Variadic, func: |out, cmd, args| http::request(out, cmd, args, 2) },
    "GET"     => { arity: Arity::Variadic, func: |out, cmd, args| http::request(out, cmd, args, 2) },
    "DELETE"  => { arity: Arity::Variadic, func: |out, cmd, args| http::request(out, cmd, args, 2) },
    "POST"    => { arity: Arity::Variadic, func: |out, cmd, args| http::request(out, cmd, args, 3) },
    "PUT"     => { arity: Arity::Variadic, func: |out, cmd, args| http::request(out, cmd, args, 3) },
    "PATCH"   => { arity: Arity::Variadic, func: |out, cmd, args| http::request(out, cmd, args, 3) },
    "send"    => { arity: Arity::Exact(1), func: http::send },
    "sniff"   => { arity: Arity::Exact(1), func: sniff::sniff },
    "encode"  => { arity: Arity::Exact(2), func: codec::encode },
    "decode"  => { arity: Arity::Exact(2), func: codec::decode },
}

/// Looks the given name up in the command registry.
pub fn lookup(name: &str) -> Option<&'static Command> {
    COMMAND_TABLE.iter().find(|cmd| cmd.name == name)
}

/// Wraps an error with the name of the command that raised it.
pub(super) fn cmd_err(cmd: &str, err: RuntimeError) -> RuntimeError {
    RuntimeError::Command { op: None, cmd: cmd.to_string(), err: Box::new(err) }
}

pub(super) fn not_enough_args(cmd: &str) -> RuntimeError {
    RuntimeError::Command {
        op:  Some("call"),
        cmd: cmd.to_string(),
        err: Box::new(RuntimeError::Message("not enough arguments".to_string())),
    }
}

impl Command {
    /// Executes the command. Before execution the number of arguments given
    /// is checked against what the command expects.
    pub fn invoke(
        &self,
        out: &mut dyn Write,
        args: Vec<Value>,
    ) -> Result<Option<Value>, RuntimeError> {
        self.invoke_named(out, self.name, args)
    }

    /// Executes the command under the given name, which sub-command
    /// dispatch uses to report errors as `encode json` rather than `json`.
    pub(super) fn invoke_named(
        &self,
        out: &mut dyn Write,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Option<Value>, RuntimeError> {
        if let Arity::Exact(argc) = self.arity
            && args.len() != argc
        {
            let msg = if args.len() > argc { "too many arguments" } else { "not enough arguments" };

            return Err(RuntimeError::Command {
                op:  Some("call"),
                cmd: name.to_string(),
                err: Box::new(RuntimeError::Message(msg.to_string())),
            });
        }
        (self.func)(out, name, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_is_checked_before_dispatch() {
        let cmd = lookup("env").unwrap();
        let mut out = Vec::new();

        let err = cmd.invoke(&mut out, vec![]).unwrap_err();
        assert_eq!(err.to_string(), "invalid call to env: not enough arguments");

        let err = cmd
            .invoke(&mut out, vec![Value::Str("A".into()), Value::Str("B".into())])
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid call to env: too many arguments");
    }

    #[test]
    fn unknown_commands_are_not_in_the_registry() {
        assert!(lookup("command").is_none());
        assert!(lookup("GET").is_some());
        assert!(lookup("writeln").is_some());
    }
}
