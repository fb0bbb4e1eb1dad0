use std::cell::RefCell;
use std::rc::Rc;

use crate::{
    error::RuntimeError,
    interpreter::value::{
        array::Array,
        core::Value,
        object::Object,
        stream::BufStream,
    },
};

/// A prepared HTTP request. Requests are plain data until `send` hands them
/// to the transport, so scripts can inspect and render them first.
#[derive(Debug)]
pub struct Request {
    pub method:  String,
    pub url:     String,
    /// Header pairs in the order the script supplied them.
    pub headers: Vec<(String, String)>,
    /// The request body, buffered when the request is built so that
    /// inspecting it does not consume it.
    pub body:    Option<Rc<[u8]>>,
}

impl Request {
    /// The first header with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the field with the given name.
    pub fn select(&self, field: &Value) -> Result<Value, RuntimeError> {
        let name = field.as_name()?;

        match name {
            "Method" => Ok(Value::Str(self.method.clone())),
            "URL" => Ok(Value::Str(self.url.clone())),
            "Header" => {
                let pairs = self
                    .headers
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::Str(v.clone())))
                    .collect();
                Ok(Value::Object(Rc::new(RefCell::new(Object::from_pairs(pairs)))))
            }
            "Body" => {
                let data = match &self.body {
                    Some(body) => Rc::clone(body),
                    None => Rc::from(&[][..]),
                };
                Ok(BufStream::new(data).into_value())
            }
            _ => Err(RuntimeError::NoField { typ: "request", field: name.to_string() }),
        }
    }

    /// Renders the request as its protocol header block followed by the
    /// body.
    pub fn sprint(&self) -> String {
        let mut out = format!("{} HTTP/1.1\n", self.method);

        for (k, v) in &self.headers {
            out.push_str(&format!("{k}: {v}\n"));
        }

        if let Some(body) = &self.body {
            out.push('\n');
            out.push_str(&String::from_utf8_lossy(body));
        }
        out
    }
}

/// A received HTTP response. The body is buffered in full when the response
/// arrives, so rendering it and decoding it see identical bytes.
#[derive(Debug)]
pub struct Response {
    pub proto:       String,
    /// The full status line text, such as "200 OK".
    pub status:      String,
    pub status_code: i64,
    /// Header entries in arrival order. A name can map to several values.
    pub headers:     Vec<(String, Vec<String>)>,
    pub body:        Rc<[u8]>,
}

impl Response {
    /// Returns the field with the given name.
    ///
    /// Header entries come back as tuples so that `Header["X"] == "y"`
    /// compares against the first value while `"y" in $Resp.Header["X"]`
    /// searches the full list.
    pub fn select(&self, field: &Value) -> Result<Value, RuntimeError> {
        let name = field.as_name()?;

        match name {
            "Status" => Ok(Value::Str(self.status.clone())),
            "StatusCode" => Ok(Value::Int(self.status_code)),
            "Header" => {
                let mut obj = Object::new();

                for (k, vals) in &self.headers {
                    let items: Vec<Value> = vals.iter().map(|v| Value::Str(v.clone())).collect();
                    let first = items.first().cloned().unwrap_or(Value::Zero);
                    let arr = Array::new(items)?;

                    obj.insert(
                        k.clone(),
                        Value::Tuple(Rc::new(Tuple {
                            t1: first,
                            t2: Value::Array(Rc::new(RefCell::new(arr))),
                        })),
                    );
                }
                Ok(Value::Object(Rc::new(RefCell::new(obj))))
            }
            "Cookie" => {
                let mut obj = Object::new();

                for (k, vals) in &self.headers {
                    if !k.eq_ignore_ascii_case("Set-Cookie") {
                        continue;
                    }

                    for raw in vals {
                        if let Some(cookie) = Cookie::parse(raw) {
                            obj.insert(cookie.name.clone(), Value::Cookie(Rc::new(cookie)));
                        }
                    }
                }
                Ok(Value::Object(Rc::new(RefCell::new(obj))))
            }
            "Body" => Ok(BufStream::new(Rc::clone(&self.body)).into_value()),
            _ => Err(RuntimeError::NoField { typ: "response", field: name.to_string() }),
        }
    }

    /// Renders the response as its protocol header block followed by the
    /// body.
    pub fn sprint(&self) -> String {
        let mut out = format!("{} {}\n", self.proto, self.status);

        for (k, vals) in &self.headers {
            for v in vals {
                out.push_str(&format!("{k}: {v}\n"));
            }
        }

        out.push('\n');
        out.push_str(&String::from_utf8_lossy(&self.body));
        out
    }
}

/// A cookie from a response's `Set-Cookie` headers.
#[derive(Debug, Default)]
pub struct Cookie {
    pub name:      String,
    pub value:     String,
    pub path:      String,
    pub domain:    String,
    /// The Expires attribute, kept in the HTTP date text it arrived as.
    pub expires:   Option<String>,
    pub max_age:   i64,
    pub secure:    bool,
    pub http_only: bool,
    pub same_site: String,
}

impl Cookie {
    /// Parses a `Set-Cookie` header value. Returns `None` when the leading
    /// `name=value` pair is missing or empty.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(';').map(str::trim);

        let (name, value) = parts.next()?.split_once('=')?;

        if name.is_empty() {
            return None;
        }

        let mut cookie = Self {
            name: name.to_string(),
            value: value.trim_matches('"').to_string(),
            ..Self::default()
        };

        for part in parts {
            let (attr, val) = match part.split_once('=') {
                Some((attr, val)) => (attr, val),
                None => (part, ""),
            };

            match attr.to_ascii_lowercase().as_str() {
                "path" => cookie.path = val.to_string(),
                "domain" => cookie.domain = val.to_string(),
                "expires" => cookie.expires = Some(val.to_string()),
                "max-age" => cookie.max_age = val.parse().unwrap_or(0),
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                "samesite" => cookie.same_site = val.to_string(),
                _ => {}
            }
        }
        Some(cookie)
    }

    /// Returns the field with the given name.
    pub fn select(&self, field: &Value) -> Result<Value, RuntimeError> {
        let name = field.as_name()?;

        match name {
            "Name" => Ok(Value::Str(self.name.clone())),
            "Value" => Ok(Value::Str(self.value.clone())),
            "Path" => Ok(Value::Str(self.path.clone())),
            "Domain" => Ok(Value::Str(self.domain.clone())),
            "Expires" => match &self.expires {
                Some(at) => Ok(Value::Time(at.clone())),
                None => Ok(Value::Zero),
            },
            "MaxAge" => Ok(Value::Int(self.max_age)),
            "Secure" => Ok(Value::Bool(self.secure)),
            "HttpOnly" => Ok(Value::Bool(self.http_only)),
            "SameSite" => Ok(Value::Str(self.same_site.clone())),
            _ => Err(RuntimeError::NoField { typ: "cookie", field: name.to_string() }),
        }
    }

    /// Renders the cookie in `Set-Cookie`-style text.
    pub fn sprint(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);

        if !self.path.is_empty() {
            out.push_str(&format!("; Path={}", self.path));
        }
        if !self.domain.is_empty() {
            out.push_str(&format!("; Domain={}", self.domain));
        }
        if let Some(at) = &self.expires {
            out.push_str(&format!("; Expires={at}"));
        }
        if self.max_age != 0 {
            out.push_str(&format!("; Max-Age={}", self.max_age));
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if !self.same_site.is_empty() {
            out.push_str(&format!("; SameSite={}", self.same_site));
        }
        out
    }
}

/// A multipart/form-data payload: the content type carrying the boundary,
/// and the encoded bytes.
#[derive(Debug)]
pub struct FormData {
    pub content_type: String,
    pub data:         Rc<RefCell<BufStream>>,
}

impl FormData {
    /// Returns the field with the given name.
    pub fn select(&self, field: &Value) -> Result<Value, RuntimeError> {
        let name = field.as_name()?;

        match name {
            "Content-Type" => Ok(Value::Str(self.content_type.clone())),
            "Data" => Ok(Value::Stream(Rc::clone(&self.data))),
            _ => Err(RuntimeError::NoField { typ: "form-data", field: name.to_string() }),
        }
    }

    /// The verbatim encoded payload.
    pub fn sprint(&self) -> String {
        self.data.borrow_mut().sprint()
    }
}

/// A polymorphic pair. Comparisons succeed if either projection compares
/// truthy; response header entries use this to expose a first-value view
/// and a full-list view at once.
#[derive(Debug)]
pub struct Tuple {
    pub t1: Value,
    pub t2: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_set_cookie_header() {
        let cookie = Cookie::parse(
            "session=abc123; Path=/; Domain=example.com; Max-Age=3600; Secure; HttpOnly; SameSite=Lax",
        )
        .unwrap();

        assert_eq!(cookie.name, "session");
        assert_eq!(cookie.value, "abc123");
        assert_eq!(cookie.path, "/");
        assert_eq!(cookie.domain, "example.com");
        assert_eq!(cookie.max_age, 3600);
        assert!(cookie.secure);
        assert!(cookie.http_only);
        assert_eq!(cookie.same_site, "Lax");
    }

    #[test]
    fn cookie_sprint_round_trips_the_attributes() {
        let cookie = Cookie::parse("id=1; Path=/api; Secure").unwrap();
        assert_eq!(cookie.sprint(), "id=1; Path=/api; Secure");
    }

    #[test]
    fn bare_attribute_strings_are_not_cookies() {
        assert!(Cookie::parse("Secure").is_none());
        assert!(Cookie::parse("=orphan").is_none());
    }

    #[test]
    fn request_selects_its_fields() {
        let req = Request {
            method:  "GET".into(),
            url:     "https://example.com/user".into(),
            headers: vec![("Authorization".into(), "Bearer t".into())],
            body:    None,
        };

        assert_eq!(req.select(&Value::Name("Method".into())).unwrap().sprint(), "GET");
        assert_eq!(
            req.select(&Value::Name("URL".into())).unwrap().sprint(),
            "https://example.com/user"
        );

        let err = req.select(&Value::Name("Nope".into())).unwrap_err();
        assert_eq!(err.to_string(), "type request has no field Nope");
    }

    #[test]
    fn response_header_entries_are_tuples() {
        let resp = Response {
            proto:       "HTTP/1.1".into(),
            status:      "200 OK".into(),
            status_code: 200,
            headers:     vec![(
                "Vary".into(),
                vec!["Accept".into(), "Accept-Encoding".into()],
            )],
            body:        Rc::from(&b""[..]),
        };

        let header = resp.select(&Value::Name("Header".into())).unwrap();
        let entry = crate::interpreter::value::core::to_index(&header)
            .unwrap()
            .get(&Value::Str("Vary".into()))
            .unwrap();

        // The first-value view drives == while the full list drives `in`.
        assert_eq!(entry.sprint(), "Accept");

        let full = crate::interpreter::value::core::to_index(&entry).unwrap();
        assert!(full.has(&Value::Str("Accept-Encoding".into())));
    }

    #[test]
    fn response_body_reads_are_replayable() {
        let resp = Response {
            proto:       "HTTP/1.1".into(),
            status:      "200 OK".into(),
            status_code: 200,
            headers:     Vec::new(),
            body:        Rc::from(&b"payload"[..]),
        };

        let body = resp.select(&Value::Name("Body".into())).unwrap();
        assert_eq!(body.sprint(), "payload");
        assert_eq!(body.sprint(), "payload");

        let again = resp.select(&Value::Name("Body".into())).unwrap();
        assert_eq!(again.sprint(), "payload");
    }
}
