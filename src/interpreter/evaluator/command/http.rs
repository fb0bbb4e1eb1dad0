use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use crate::{
    error::RuntimeError,
    interpreter::evaluator::command::core::{cmd_err, not_enough_args},
    interpreter::value::{
        Value,
        http::{Request, Response},
        stream::to_stream,
    },
};

/// Builds a request value for the method the command was invoked under:
/// `METHOD url [headers [body]]`. Surplus arguments beyond what the method
/// accepts are clamped off, which lets a chained value land harmlessly. The
/// request is not sent; `send` does that.
pub fn request(
    _out: &mut dyn Write,
    cmd: &str,
    mut args: Vec<Value>,
    max: usize,
) -> Result<Option<Value>, RuntimeError> {
    if args.is_empty() {
        return Err(not_enough_args(cmd));
    }
    args.truncate(max);

    let url = args[0].as_str().map_err(|err| cmd_err(cmd, err))?.to_string();

    url::Url::parse(&url)
        .map_err(|err| cmd_err(cmd, RuntimeError::Message(err.to_string())))?;

    let mut headers = Vec::new();

    if let Some(arg) = args.get(1) {
        let obj = arg.as_object().map_err(|err| cmd_err(cmd, err))?;
        let obj = obj.borrow();

        for key in obj.keys() {
            let Some(val) = obj.value(key) else {
                continue;
            };
            let val = val.as_str().map_err(|err| cmd_err(cmd, err))?;

            headers.push((key.clone(), val.to_string()));
        }
    }

    let body = match args.get(2) {
        None => None,
        Some(Value::Str(s)) => Some(Rc::from(s.as_bytes())),
        Some(arg @ (Value::File(_) | Value::Stream(_))) => {
            let stream = to_stream(arg).map_err(|err| cmd_err(cmd, err))?;
            let buf = stream.read_to_end().map_err(|err| cmd_err(cmd, err))?;

            if let Value::Stream(_) = arg {
                stream.rewind().map_err(|err| cmd_err(cmd, err))?;
            }
            Some(Rc::from(buf.as_slice()))
        }
        Some(arg) => {
            return Err(cmd_err(
                cmd,
                RuntimeError::Message(format!(
                    "cannot use type {} as request body",
                    arg.type_name()
                )),
            ));
        }
    };

    let mut req = Request { method: cmd.to_string(), url, headers, body };

    if req.header("User-Agent").is_none() {
        req.headers.push(("User-Agent".to_string(), format!("req/{}", crate::BUILD)));
    }

    Ok(Some(Value::Request(Rc::new(RefCell::new(req)))))
}

/// The `send` command performs the given request over the transport and
/// returns the response. The response body is buffered in full so that
/// rendering and decoding see identical bytes.
pub fn send(
    _out: &mut dyn Write,
    cmd: &str,
    args: Vec<Value>,
) -> Result<Option<Value>, RuntimeError> {
    let req = args[0].as_request().map_err(|err| cmd_err(cmd, err))?;
    let req = req.borrow();

    let method = reqwest::Method::from_bytes(req.method.as_bytes())
        .map_err(|err| cmd_err(cmd, RuntimeError::Message(err.to_string())))?;

    let client = reqwest::blocking::Client::new();
    let mut builder = client.request(method, &req.url);

    for (key, val) in &req.headers {
        builder = builder.header(key.as_str(), val.as_str());
    }
    if let Some(body) = &req.body {
        builder = builder.body(body.to_vec());
    }

    let resp = builder.send().map_err(|err| cmd_err(cmd, err.into()))?;

    let proto = format!("{:?}", resp.version());
    let status_code = i64::from(resp.status().as_u16());
    let status = match resp.status().canonical_reason() {
        Some(reason) => format!("{status_code} {reason}"),
        None => status_code.to_string(),
    };

    let mut headers: Vec<(String, Vec<String>)> = Vec::new();

    for key in resp.headers().keys() {
        let vals = resp
            .headers()
            .get_all(key)
            .iter()
            .map(|val| String::from_utf8_lossy(val.as_bytes()).into_owned())
            .collect();
        headers.push((key.as_str().to_string(), vals));
    }

    let body = resp.bytes().map_err(|err| cmd_err(cmd, err.into()))?;

    Ok(Some(Value::Response(Rc::new(Response {
        proto,
        status,
        status_code,
        headers,
        body: Rc::from(&body[..]),
    }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Value {
        use crate::interpreter::value::object::Object;

        let pairs = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Str(v.to_string())))
            .collect();
        Value::Object(Rc::new(RefCell::new(Object::from_pairs(pairs))))
    }

    #[test]
    fn builds_a_request_with_headers_and_body() {
        let mut out = Vec::new();

        let val = request(
            &mut out,
            "POST",
            vec![
                Value::Str("https://example.com/login".into()),
                headers(&[("Content-Type", "application/json")]),
                Value::Str(r#"{"username": "admin"}"#.into()),
            ],
            3,
        )
        .unwrap()
        .unwrap();

        let req = val.as_request().unwrap();
        let req = req.borrow();

        assert_eq!(req.method, "POST");
        assert_eq!(req.url, "https://example.com/login");
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        assert_eq!(req.body.as_deref(), Some(&br#"{"username": "admin"}"#[..]));
    }

    #[test]
    fn default_user_agent_is_set_when_missing() {
        let mut out = Vec::new();

        let val = request(&mut out, "GET", vec![Value::Str("https://example.com".into())], 2)
            .unwrap()
            .unwrap();
        let req = val.as_request().unwrap();

        assert_eq!(
            req.borrow().header("User-Agent"),
            Some(format!("req/{}", crate::BUILD).as_str())
        );

        // A script-supplied agent wins, whatever its casing.
        let val = request(
            &mut out,
            "GET",
            vec![
                Value::Str("https://example.com".into()),
                headers(&[("user-agent", "custom/1.0")]),
            ],
            2,
        )
        .unwrap()
        .unwrap();
        let req = val.as_request().unwrap();

        assert_eq!(req.borrow().header("User-Agent"), Some("custom/1.0"));
    }

    #[test]
    fn surplus_arguments_are_clamped() {
        let mut out = Vec::new();

        // A chained value appended after url and headers lands in the body
        // slot for POST, and is cut off for GET.
        let val = request(
            &mut out,
            "GET",
            vec![
                Value::Str("https://example.com".into()),
                headers(&[]),
                Value::Str("ignored".into()),
            ],
            2,
        )
        .unwrap()
        .unwrap();

        let req = val.as_request().unwrap();
        assert!(req.borrow().body.is_none());
    }

    #[test]
    fn invalid_urls_are_rejected_up_front() {
        let mut out = Vec::new();
        let err = request(&mut out, "GET", vec![Value::Str("::not a url::".into())], 2)
            .unwrap_err();

        assert!(err.to_string().starts_with("GET: "));
    }
}
