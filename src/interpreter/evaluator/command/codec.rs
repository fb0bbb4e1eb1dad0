use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::{
    error::RuntimeError,
    interpreter::value::{
        Value,
        array::Array,
        http::FormData,
        json,
        object::Object,
        stream::{BufStream, to_stream},
    },
};

use crate::interpreter::evaluator::command::core::{Arity, Command, cmd_err};

static ENCODE_TABLE: &[Command] = &[
    Command { name: "base64", arity: Arity::Exact(1), func: encode_base64 },
    Command { name: "form-data", arity: Arity::Exact(1), func: encode_form_data },
    Command { name: "json", arity: Arity::Exact(1), func: encode_json },
    Command { name: "url", arity: Arity::Exact(1), func: encode_url },
];

static DECODE_TABLE: &[Command] = &[
    Command { name: "base64", arity: Arity::Exact(1), func: decode_base64 },
    Command { name: "form-data", arity: Arity::Exact(1), func: decode_form_data },
    Command { name: "json", arity: Arity::Exact(1), func: decode_json },
    Command { name: "url", arity: Arity::Exact(1), func: decode_url },
];

/// Dispatches `encode name value` to the named sub-encoder.
pub fn encode(
    out: &mut dyn Write,
    cmd: &str,
    mut args: Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    dispatch(out, cmd, ENCODE_TABLE, &mut args)
}

/// Dispatches `decode name value` to the named sub-decoder.
pub fn decode(
    out: &mut dyn Write,
    cmd: &str,
    mut args: Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    dispatch(out, cmd, DECODE_TABLE, &mut args)
}

fn dispatch(
    out: &mut dyn Write,
    cmd: &str,
    table: &[Command],
    args: &mut Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    let name = args[0].as_name()?.to_string();

    let Some(sub) = table.iter().find(|sub| sub.name == name) else {
        return Err(RuntimeError::UndefinedCommand { name: format!("{cmd} {name}") });
    };

    sub.invoke_named(out, &format!("{cmd} {name}"), args.split_off(1))
}

fn encode_base64(
    _out: &mut dyn Write,
    cmd: &str,
    args: Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    let src = match &args[0] {
        Value::Str(s) => s.as_bytes().to_vec(),
        arg @ (Value::Stream(_) | Value::File(_)) => {
            let stream = to_stream(arg).map_err(|err| cmd_err(cmd, err))?;
            let buf = stream.read_to_end().map_err(|err| cmd_err(cmd, err))?;

            stream.rewind().map_err(|err| cmd_err(cmd, err))?;
            buf
        }
        arg => {
            return Err(cmd_err(
                cmd,
                RuntimeError::Message(format!("cannot encode {}", arg.type_name())),
            ));
        }
    };

    Ok(Some(Value::Str(BASE64.encode(src))))
}

fn decode_base64(
    _out: &mut dyn Write,
    cmd: &str,
    args: Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    let src = match &args[0] {
        Value::Str(s) => s.as_bytes().to_vec(),
        arg @ (Value::Stream(_) | Value::File(_)) => {
            let stream = to_stream(arg).map_err(|err| cmd_err(cmd, err))?;
            stream.read_to_end().map_err(|err| cmd_err(cmd, err))?
        }
        arg => {
            return Err(cmd_err(
                cmd,
                RuntimeError::Message(format!("cannot decode {}", arg.type_name())),
            ));
        }
    };

    let decoded = BASE64
        .decode(src)
        .map_err(|err| cmd_err(cmd, RuntimeError::Message(err.to_string())))?;

    Ok(Some(BufStream::new(decoded.as_slice()).into_value()))
}

fn encode_json(
    _out: &mut dyn Write,
    cmd: &str,
    args: Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    if !matches!(args[0], Value::Array(_) | Value::Object(_)) {
        return Err(cmd_err(
            cmd,
            RuntimeError::Message(format!("cannot encode {}", args[0].type_name())),
        ));
    }

    let doc = json::encode(&args[0]).map_err(|err| cmd_err(cmd, err))?;
    let text = serde_json::to_string(&doc).map_err(|err| cmd_err(cmd, err.into()))?;

    Ok(Some(Value::Str(text)))
}

fn decode_json(
    _out: &mut dyn Write,
    cmd: &str,
    args: Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    let src = match &args[0] {
        Value::Str(s) => s.as_bytes().to_vec(),
        arg @ (Value::Stream(_) | Value::File(_)) => {
            let stream = to_stream(arg).map_err(|err| cmd_err(cmd, err))?;
            let buf = stream.read_to_end().map_err(|err| cmd_err(cmd, err))?;

            stream.rewind().map_err(|err| cmd_err(cmd, err))?;
            buf
        }
        arg => {
            return Err(RuntimeError::Message(format!("cannot decode {}", arg.type_name())));
        }
    };

    Ok(Some(json::decode(&src).map_err(|err| cmd_err(cmd, err))?))
}

fn encode_url(
    _out: &mut dyn Write,
    cmd: &str,
    args: Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    let obj = args[0].as_object().map_err(|_| {
        cmd_err(cmd, RuntimeError::Message(format!("cannot encode {}", args[0].type_name())))
    })?;
    let obj = obj.borrow();

    let mut keys: Vec<&String> = obj.keys().collect();
    keys.sort();

    let mut form = url::form_urlencoded::Serializer::new(String::new());

    for key in keys {
        let Some(val) = obj.value(key) else {
            continue;
        };

        match val {
            Value::Str(_) | Value::Int(_) | Value::Bool(_) => {
                form.append_pair(key, &val.sprint());
            }
            Value::Array(arr) => {
                for item in arr.borrow().items() {
                    form.append_pair(key, &item.sprint());
                }
            }
            _ => {
                return Err(cmd_err(
                    cmd,
                    RuntimeError::Message(format!(
                        "key error {key}: cannot encode {}",
                        val.type_name()
                    )),
                ));
            }
        }
    }

    Ok(Some(Value::Str(form.finish())))
}

fn decode_url(
    _out: &mut dyn Write,
    cmd: &str,
    args: Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    let src = args[0].as_str().map_err(|err| cmd_err(cmd, err))?;

    // Gather the values per key, keeping the order keys first appear in.
    let mut keys: Vec<String> = Vec::new();
    let mut groups: Vec<Vec<Value>> = Vec::new();

    for (key, val) in url::form_urlencoded::parse(src.as_bytes()) {
        let key = key.into_owned();
        let val = retype(&val);

        match keys.iter().position(|k| *k == key) {
            Some(i) => groups[i].push(val),
            None => {
                keys.push(key);
                groups.push(vec![val]);
            }
        }
    }

    let mut obj = Object::new();

    for (key, mut vals) in keys.into_iter().zip(groups) {
        let val = if vals.len() > 1 {
            Value::Array(Rc::new(RefCell::new(Array::from_items(vals))))
        } else {
            vals.remove(0)
        };
        obj.insert(key, val);
    }

    Ok(Some(Value::Object(Rc::new(RefCell::new(obj)))))
}

/// Re-parses a decoded form value into the value variant it reads as:
/// bool, int, or string.
fn retype(s: &str) -> Value {
    match s {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(i) = s.parse::<i64>() {
        return Value::Int(i);
    }
    Value::Str(s.to_string())
}

fn encode_form_data(
    out: &mut dyn Write,
    cmd: &str,
    args: Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    encode_form_data_with(out, cmd, args, &boundary())
}

/// Encodes an object into a multipart/form-data payload with the given
/// boundary. String, int, and bool values become plain fields; files become
/// file parts carrying their filename.
fn encode_form_data_with(
    _out: &mut dyn Write,
    cmd: &str,
    args: Vec<Value>,
    boundary: &str,
) -> Result<Option<Value>, RuntimeError> {
    let obj = args[0].as_object().map_err(|_| {
        cmd_err(cmd, RuntimeError::Message(format!("cannot encode {}", args[0].type_name())))
    })?;
    let obj = obj.borrow();

    let mut body: Vec<u8> = Vec::new();

    for key in obj.keys() {
        let Some(val) = obj.value(key) else {
            continue;
        };

        match val {
            Value::Str(_) | Value::Int(_) | Value::Bool(_) => {
                body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                        escape_quotes(key)
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(val.sprint().as_bytes());
                body.extend_from_slice(b"\r\n");
            }
            Value::File(file) => {
                let mut file = file.borrow_mut();

                let filename = std::path::Path::new(file.name())
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();

                body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        escape_quotes(key),
                        escape_quotes(&filename),
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");

                let content = file.read_to_end().map_err(|err| cmd_err(cmd, err))?;
                file.rewind().map_err(|err| cmd_err(cmd, err))?;

                body.extend_from_slice(&content);
                body.extend_from_slice(b"\r\n");
            }
            _ => {
                return Err(cmd_err(
                    cmd,
                    RuntimeError::Message(format!(
                        "key error {key}: cannot encode {}",
                        val.type_name()
                    )),
                ));
            }
        }
    }

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    Ok(Some(Value::FormData(Rc::new(FormData {
        content_type: format!("multipart/form-data; boundary={boundary}"),
        data:         Rc::new(RefCell::new(BufStream::new(body.as_slice()))),
    }))))
}

fn decode_form_data(
    _out: &mut dyn Write,
    cmd: &str,
    args: Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    let data = args[0].as_form_data().map_err(|_| {
        cmd_err(cmd, RuntimeError::Message(format!("cannot decode {}", args[0].type_name())))
    })?;

    let Some(boundary) = data
        .content_type
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("boundary="))
    else {
        return Err(cmd_err(
            cmd,
            RuntimeError::Message("no boundary in content type".to_string()),
        ));
    };

    let body = data.data.borrow().bytes();
    let text = String::from_utf8_lossy(&body);

    let mut obj = Object::new();

    for part in text.split(&format!("--{boundary}")) {
        let part = part.trim_start_matches("\r\n");

        if part.is_empty() || part.starts_with("--") {
            continue;
        }

        let Some((head, content)) = part.split_once("\r\n\r\n") else {
            continue;
        };
        let content = content.strip_suffix("\r\n").unwrap_or(content);

        let Some(disposition) = head
            .lines()
            .map(str::trim)
            .find(|line| line.to_ascii_lowercase().starts_with("content-disposition:"))
        else {
            continue;
        };

        let Some(name) = disposition_param(disposition, "name") else {
            continue;
        };

        if disposition_param(disposition, "filename").is_some() {
            obj.insert(name, BufStream::new(content.as_bytes()).into_value());
            continue;
        }
        obj.insert(name, Value::Str(content.to_string()));
    }

    Ok(Some(Value::Object(Rc::new(RefCell::new(obj)))))
}

/// Pulls a quoted parameter such as `name="file"` out of a
/// Content-Disposition header line.
fn disposition_param(line: &str, param: &str) -> Option<String> {
    line.split(';').map(str::trim).find_map(|part| {
        let rest = part.strip_prefix(param)?.strip_prefix('=')?;
        Some(rest.trim_matches('"').to_string())
    })
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A fresh multipart boundary. Uniqueness matters more than randomness
/// here, so the clock is enough.
fn boundary() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|at| at.as_nanos())
        .unwrap_or_default();

    format!("{nanos:030x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(pairs: Vec<(&str, Value)>) -> Value {
        let pairs = pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        Value::Object(Rc::new(RefCell::new(Object::from_pairs(pairs))))
    }

    #[test]
    fn base64_round_trips_strings() {
        let mut out = Vec::new();

        let encoded = encode_base64(&mut out, "encode base64", vec![Value::Str("hi".into())])
            .unwrap()
            .unwrap();
        assert_eq!(encoded.sprint(), "aGk=");

        let decoded = decode_base64(&mut out, "decode base64", vec![encoded])
            .unwrap()
            .unwrap();
        assert_eq!(decoded.sprint(), "hi");
    }

    #[test]
    fn unknown_sub_commands_are_undefined() {
        let mut out = Vec::new();

        let err = encode(
            &mut out,
            "encode",
            vec![Value::Name("rot13".into()), Value::Str("x".into())],
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "undefined command: encode rot13");
    }

    #[test]
    fn json_encodes_objects_and_rejects_scalars() {
        let mut out = Vec::new();

        let encoded = encode_json(
            &mut out,
            "encode json",
            vec![object(vec![("user", Value::Str("gopher".into())), ("id", Value::Int(1))])],
        )
        .unwrap()
        .unwrap();
        assert_eq!(encoded.sprint(), r#"{"user":"gopher","id":1}"#);

        let err = encode_json(&mut out, "encode json", vec![Value::Str("x".into())])
            .unwrap_err();
        assert_eq!(err.to_string(), "encode json: cannot encode string");
    }

    #[test]
    fn url_encoding_sorts_keys_and_expands_arrays() {
        let mut out = Vec::new();

        let arr = Value::Array(Rc::new(RefCell::new(
            Array::new(vec![Value::Str("x".into()), Value::Str("y".into())]).unwrap(),
        )));

        let encoded = encode_url(
            &mut out,
            "encode url",
            vec![object(vec![
                ("b", Value::Int(2)),
                ("a", Value::Bool(true)),
                ("tags", arr),
            ])],
        )
        .unwrap()
        .unwrap();

        assert_eq!(encoded.sprint(), "a=true&b=2&tags=x&tags=y");
    }

    #[test]
    fn url_decoding_retypes_values_and_groups_repeats() {
        let mut out = Vec::new();

        let decoded = decode_url(
            &mut out,
            "decode url",
            vec![Value::Str("a=true&b=2&c=text&tag=x&tag=y".into())],
        )
        .unwrap()
        .unwrap();

        let obj = decoded.as_object().unwrap();
        let obj = obj.borrow();

        assert!(matches!(obj.value("a"), Some(Value::Bool(true))));
        assert!(matches!(obj.value("b"), Some(Value::Int(2))));
        assert!(matches!(obj.value("c"), Some(Value::Str(_))));
        assert!(matches!(obj.value("tag"), Some(Value::Array(_))));
    }

    #[test]
    fn form_data_round_trips_fields() {
        let mut out = Vec::new();

        let encoded = encode_form_data_with(
            &mut out,
            "encode form-data",
            vec![object(vec![
                ("user", Value::Str("gopher".into())),
                ("id", Value::Int(7)),
            ])],
            "test-boundary",
        )
        .unwrap()
        .unwrap();

        let Value::FormData(data) = &encoded else { panic!("expected form-data") };
        assert_eq!(data.content_type, "multipart/form-data; boundary=test-boundary");

        let decoded = decode_form_data(&mut out, "decode form-data", vec![encoded.clone()])
            .unwrap()
            .unwrap();
        let obj = decoded.as_object().unwrap();
        let obj = obj.borrow();

        assert_eq!(obj.get(&Value::Str("user".into())).unwrap().sprint(), "gopher");
        assert_eq!(obj.get(&Value::Str("id".into())).unwrap().sprint(), "7");
    }
}
