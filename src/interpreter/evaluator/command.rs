/// The command table.
///
/// Defines the command type with its arity check and the registry every
/// invocation resolves against.
pub mod core;

/// Environment and process commands: `env` and `exit`.
pub mod env;
/// File and output commands: `open`, `read`, `readln`, `write`, `writeln`.
pub mod file;
/// HTTP commands: the request builders for each method, and `send`.
pub mod http;
/// The `sniff` command and its content-type detection.
pub mod sniff;
/// The `encode` and `decode` command families: base64, form-data, json, and
/// url.
pub mod codec;

pub use core::{Command, lookup};
