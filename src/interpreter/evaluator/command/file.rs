use std::cell::RefCell;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use std::rc::Rc;

use crate::{
    error::RuntimeError,
    interpreter::evaluator::command::core::{cmd_err, not_enough_args},
    interpreter::value::{
        Value,
        stream::{FileStream, to_stream},
    },
};

/// The `open` command opens the file at the given path, creating any parent
/// directories along the way. The file is created if it does not exist and
/// opened for reading, writing, and appending. The returned handle is
/// registered by the evaluator to be closed on normal termination.
pub fn open(
    _out: &mut dyn Write,
    cmd: &str,
    args: Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    let path = args[0].as_str().map_err(|err| cmd_err(cmd, err))?;

    if let Some(dir) = Path::new(path).parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).map_err(|err| cmd_err(cmd, err.into()))?;
    }

    let mut opts = OpenOptions::new();
    opts.create(true).read(true).append(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o644);
    }

    let handle = opts.open(path).map_err(|err| cmd_err(cmd, err.into()))?;

    Ok(Some(Value::File(Rc::new(RefCell::new(FileStream::new(handle, path))))))
}

/// The `read` command returns the entire content of a stream as a string.
/// The name `_` reads standard input instead; streams are rewound once
/// read.
pub fn read(
    _out: &mut dyn Write,
    cmd: &str,
    args: Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    if let Value::Name(name) = &args[0]
        && name == "_"
    {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|err| cmd_err(cmd, err.into()))?;
        return Ok(Some(Value::Str(buf)));
    }

    let stream = to_stream(&args[0]).map_err(|err| cmd_err(cmd, err))?;

    stream.rewind().map_err(|err| cmd_err(cmd, err))?;
    let buf = stream.read_to_end().map_err(|err| cmd_err(cmd, err))?;
    stream.rewind().map_err(|err| cmd_err(cmd, err))?;

    Ok(Some(Value::Str(String::from_utf8_lossy(&buf).into_owned())))
}

/// The `readln` command returns the next line of a stream, including its
/// newline, leaving the cursor just after it. The name `_` reads standard
/// input instead.
pub fn readln(
    _out: &mut dyn Write,
    cmd: &str,
    args: Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    if let Value::Name(name) = &args[0]
        && name == "_"
    {
        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .map_err(|err| cmd_err(cmd, err.into()))?;
        return Ok(Some(Value::Str(line)));
    }

    let stream = to_stream(&args[0]).map_err(|err| cmd_err(cmd, err))?;
    let line = stream.read_line().map_err(|err| cmd_err(cmd, err))?;

    Ok(Some(Value::Str(String::from_utf8_lossy(&line).into_owned())))
}

/// Writes the Sprint rendering of each value after the first argument,
/// concatenated, to the destination the first argument names: `_` for the
/// evaluator's output, or an open file.
fn write_values(
    out: &mut dyn Write,
    cmd: &str,
    args: &[Value],
    newline: bool,
) -> Result<(), RuntimeError> {
    let Some(dest) = args.first() else {
        return Err(not_enough_args(cmd));
    };

    let mut buf = String::new();

    for arg in &args[1..] {
        buf.push_str(&arg.sprint());
    }
    if newline {
        buf.push('\n');
    }

    match dest {
        Value::Name(name) if name == "_" => {
            out.write_all(buf.as_bytes()).map_err(|err| cmd_err(cmd, err.into()))?;
        }
        Value::File(file) => {
            file.borrow_mut().write_all(buf.as_bytes()).map_err(|err| cmd_err(cmd, err))?;
        }
        _ => {
            return Err(cmd_err(
                cmd,
                RuntimeError::Type { from: dest.type_name(), to: "file" },
            ));
        }
    }
    Ok(())
}

/// The `write` command.
pub fn write(
    out: &mut dyn Write,
    cmd: &str,
    args: Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    write_values(out, cmd, &args, false)?;
    Ok(None)
}

/// The `writeln` command, `write` with a trailing newline.
pub fn writeln(
    out: &mut dyn Write,
    cmd: &str,
    args: Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    write_values(out, cmd, &args, true)?;
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_concatenates_sprinted_values() {
        let mut out = Vec::new();

        write(
            &mut out,
            "write",
            vec![
                Value::Name("_".into()),
                Value::Str("a".into()),
                Value::Int(1),
                Value::Str("b".into()),
            ],
        )
        .unwrap();

        assert_eq!(out, b"a1b");
    }

    #[test]
    fn writeln_appends_a_newline() {
        let mut out = Vec::new();

        writeln(&mut out, "writeln", vec![Value::Name("_".into()), Value::Str("hi".into())])
            .unwrap();

        assert_eq!(out, b"hi\n");
    }

    #[test]
    fn write_requires_a_destination() {
        let mut out = Vec::new();
        let err = write(&mut out, "write", vec![]).unwrap_err();

        assert_eq!(err.to_string(), "invalid call to write: not enough arguments");

        let err = write(&mut out, "write", vec![Value::Int(1)]).unwrap_err();
        assert_eq!(err.to_string(), "write: cannot use int as file");
    }

    #[test]
    fn open_read_write_round_trip() {
        let dir = std::env::temp_dir().join(format!("req-file-test-{}", std::process::id()));
        let path = dir.join("nested").join("out.txt");
        let path = path.to_string_lossy().into_owned();

        let mut out = Vec::new();
        let file = open(&mut out, "open", vec![Value::Str(path.clone())])
            .unwrap()
            .unwrap();

        write(&mut out, "write", vec![file.clone(), Value::Str("line one\nrest".into())])
            .unwrap();

        // Contents written through the handle come back through read.
        let content = read(&mut out, "read", vec![file.clone()]).unwrap().unwrap();
        assert_eq!(content.sprint(), "line one\nrest");

        let line = readln(&mut out, "readln", vec![file]).unwrap().unwrap();
        assert_eq!(line.sprint(), "line one\n");

        let _ = fs::remove_dir_all(dir);
    }
}
