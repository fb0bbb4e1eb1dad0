use std::cell::RefCell;
use std::rc::Rc;

use ordered_float::OrderedFloat;

use crate::{
    error::RuntimeError,
    interpreter::{
        lexer::Op,
        value::{
            array::Array,
            http::{Cookie, FormData, Request, Response, Tuple},
            object::Object,
            stream::{BufStream, FileStream},
        },
    },
};

/// Represents a runtime value in the interpreter.
///
/// Compound values are reference counted so that assignment through an index
/// or field chain mutates the same storage every binding of the value sees,
/// and so that response bodies can be replayed without copying.
#[derive(Debug, Clone)]
pub enum Value {
    /// A string value.
    Str(String),
    /// A 64-bit signed integer value.
    Int(i64),
    /// A floating-point value. Only the float literal type and comparisons
    /// exist, there is no float arithmetic in the language.
    Float(OrderedFloat<f64>),
    /// A boolean value. The only truthy value is `true`.
    Bool(bool),
    /// An ordered, homogeneous sequence of values.
    Array(Rc<RefCell<Array>>),
    /// A mapping from strings to values that iterates in insertion order.
    Object(Rc<RefCell<Object>>),
    /// A handle to an open file, usable as a stream.
    File(Rc<RefCell<FileStream>>),
    /// An in-memory byte stream produced by codec output and body access.
    Stream(Rc<RefCell<BufStream>>),
    /// A prepared HTTP request that has not been sent.
    Request(Rc<RefCell<Request>>),
    /// A received HTTP response.
    Response(Rc<Response>),
    /// A cookie from a response's `Set-Cookie` headers.
    Cookie(Rc<Cookie>),
    /// A multipart/form-data payload, a content type and a byte stream.
    FormData(Rc<FormData>),
    /// An unresolved identifier in value position, such as `json` in
    /// `decode json`. Distinct from a string.
    Name(String),
    /// A pair whose comparisons succeed if either projection compares
    /// truthy. Used for multi-valued response header entries.
    Tuple(Rc<Tuple>),
    /// A span of time.
    Duration(std::time::Duration),
    /// A point in time, kept in the HTTP date text it arrived as.
    Time(String),
    /// The universal zero value returned when a lookup misses. Compares
    /// equal to the type-specific zero of any other value.
    Zero,
}

/// Something that can be indexed with `[...]`, iterated with `range`, and
/// probed with `in`. Arrays and objects qualify; a tuple lends its full-list
/// projection.
pub enum Indexed {
    Array(Rc<RefCell<Array>>),
    Object(Rc<RefCell<Object>>),
}

impl Indexed {
    /// Whether the index holds the given value.
    pub fn has(&self, v: &Value) -> bool {
        match self {
            Self::Array(arr) => arr.borrow().has(v),
            Self::Object(obj) => obj.borrow().has(v),
        }
    }

    /// The value at the given key. A missed lookup returns [`Value::Zero`],
    /// never an error.
    pub fn get(&self, key: &Value) -> Result<Value, RuntimeError> {
        match self {
            Self::Array(arr) => arr.borrow().get(key),
            Self::Object(obj) => obj.borrow().get(key),
        }
    }

    /// Stores a value at the given key. In strict mode the slot being
    /// replaced must share the incoming value's type.
    pub fn set(&self, strict: bool, key: &Value, val: Value) -> Result<(), RuntimeError> {
        match self {
            Self::Array(arr) => arr.borrow_mut().set(strict, key, val),
            Self::Object(obj) => obj.borrow_mut().set(strict, key, val),
        }
    }

    /// Yields the next `(key, value)` pair, or `None` once the iteration is
    /// exhausted. Exhaustion resets the cursor so the value can be iterated
    /// again.
    pub fn next(&self) -> Option<(Value, Value)> {
        match self {
            Self::Array(arr) => arr.borrow_mut().next(),
            Self::Object(obj) => obj.borrow_mut().next(),
        }
    }
}

/// Asserts the given value to an index.
pub fn to_index(v: &Value) -> Result<Indexed, RuntimeError> {
    match v {
        Value::Array(arr) => Ok(Indexed::Array(Rc::clone(arr))),
        Value::Object(obj) => Ok(Indexed::Object(Rc::clone(obj))),
        Value::Tuple(t) => to_index(&t.t2),
        _ => Err(RuntimeError::NotIndexable { typ: v.type_name() }),
    }
}

/// Asserts the given value to an iterable.
pub fn to_iterable(v: &Value) -> Result<Indexed, RuntimeError> {
    match v {
        Value::Array(arr) => Ok(Indexed::Array(Rc::clone(arr))),
        Value::Object(obj) => Ok(Indexed::Object(Rc::clone(obj))),
        _ => Err(RuntimeError::NotIterable { typ: v.type_name() }),
    }
}

impl Value {
    /// The name of the value's type as diagnostics report it.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::File(_) => "file",
            Self::Stream(_) => "stream",
            Self::Request(_) => "request",
            Self::Response(_) => "response",
            Self::Cookie(_) => "cookie",
            Self::FormData(_) => "form-data",
            Self::Name(_) => "name",
            Self::Tuple(_) => "tuple",
            Self::Duration(_) => "duration",
            Self::Time(_) => "time",
            Self::Zero => "zero",
        }
    }

    /// Whether the value counts as true in a condition. Exclusively the bool
    /// `true`; every other value, including non-zero ints and non-empty
    /// strings, is not truthy.
    pub fn truthy(&self) -> bool {
        matches!(self, Self::Bool(true))
    }

    /// Asserts the value to a string.
    pub fn as_str(&self) -> Result<&str, RuntimeError> {
        match self {
            Self::Str(s) => Ok(s),
            _ => Err(RuntimeError::Type { from: self.type_name(), to: "string" }),
        }
    }

    /// Asserts the value to an int.
    pub fn as_int(&self) -> Result<i64, RuntimeError> {
        match self {
            Self::Int(i) => Ok(*i),
            _ => Err(RuntimeError::Type { from: self.type_name(), to: "int" }),
        }
    }

    /// Asserts the value to a name.
    pub fn as_name(&self) -> Result<&str, RuntimeError> {
        match self {
            Self::Name(n) => Ok(n),
            _ => Err(RuntimeError::Type { from: self.type_name(), to: "name" }),
        }
    }

    /// Asserts the value to an object.
    pub fn as_object(&self) -> Result<Rc<RefCell<Object>>, RuntimeError> {
        match self {
            Self::Object(obj) => Ok(Rc::clone(obj)),
            _ => Err(RuntimeError::Type { from: self.type_name(), to: "object" }),
        }
    }

    /// Asserts the value to a request.
    pub fn as_request(&self) -> Result<Rc<RefCell<Request>>, RuntimeError> {
        match self {
            Self::Request(req) => Ok(Rc::clone(req)),
            _ => Err(RuntimeError::Type { from: self.type_name(), to: "request" }),
        }
    }

    /// Asserts the value to form-data.
    pub fn as_form_data(&self) -> Result<Rc<FormData>, RuntimeError> {
        match self {
            Self::FormData(data) => Ok(Rc::clone(data)),
            _ => Err(RuntimeError::Type { from: self.type_name(), to: "form-data" }),
        }
    }

    /// Formats the value verbatim. Strings are unquoted, streams are fully
    /// consumed and rewound, and requests and responses render their
    /// protocol header block followed by the body.
    pub fn sprint(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            Self::Array(arr) => {
                let arr = arr.borrow();
                let items: Vec<String> = arr.items().iter().map(Value::sprint).collect();
                format!("[{}]", items.join(" "))
            }
            Self::Object(obj) => {
                let obj = obj.borrow();
                let mut keys: Vec<&String> = obj.keys().collect();
                keys.sort();

                let pairs: Vec<String> = keys
                    .iter()
                    .filter_map(|k| obj.value(k).map(|v| format!("{k}:{}", v.sprint())))
                    .collect();
                format!("({})", pairs.join(" "))
            }
            Self::File(f) => f.borrow_mut().sprint(),
            Self::Stream(s) => s.borrow_mut().sprint(),
            Self::Request(req) => req.borrow().sprint(),
            Self::Response(resp) => resp.sprint(),
            Self::Cookie(c) => c.sprint(),
            Self::FormData(data) => data.sprint(),
            Self::Tuple(t) => t.t1.sprint(),
            _ => self.to_string(),
        }
    }
}

impl std::fmt::Display for Value {
    /// Formats the value for display in a REPL. Strings are quoted and
    /// handle-backed values show their address.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{:.2}", v.into_inner()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Array(arr) => {
                write!(f, "[")?;

                for (i, it) in arr.borrow().items().iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{it}")?;
                }
                write!(f, "]")
            }
            Self::Object(obj) => {
                let obj = obj.borrow();

                write!(f, "(")?;

                for (i, k) in obj.keys().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    match obj.value(k) {
                        Some(v) => write!(f, "{k}:{v}")?,
                        None => write!(f, "{k}:")?,
                    }
                }
                write!(f, ")")
            }
            Self::File(handle) => {
                write!(f, "File<addr={:p}, name={:?}>", Rc::as_ptr(handle), handle.borrow().name())
            }
            Self::Stream(s) => write!(f, "Stream<addr={:p}>", Rc::as_ptr(s)),
            Self::Request(req) => write!(f, "Request<addr={:p}>", Rc::as_ptr(req)),
            Self::Response(resp) => write!(f, "Response<addr={:p}>", Rc::as_ptr(resp)),
            Self::Cookie(c) => write!(f, "Cookie<addr={:p}>", Rc::as_ptr(c)),
            Self::FormData(data) => write!(f, "FormData<addr={:p}>", Rc::as_ptr(data)),
            Self::Name(n) => write!(f, "{n}"),
            Self::Tuple(t) => write!(f, "{}", t.t1),
            Self::Duration(d) => write!(f, "{d:?}"),
            Self::Time(t) => write!(f, "{t}"),
            Self::Zero => Ok(()),
        }
    }
}

/// Checks that two values share a type, for type-pinned assignment and match
/// case validation.
pub fn compare_type(a: &Value, b: &Value) -> Result<(), RuntimeError> {
    if a.type_name() != b.type_name() {
        return Err(RuntimeError::Type { from: a.type_name(), to: b.type_name() });
    }
    Ok(())
}

/// Compares two values under the given operator, returning a bool value or
/// an error.
///
/// `and` and `or` combine truthiness, and `in` asks the right operand's
/// index; all other operators dispatch on the left operand's type.
/// Cross-type comparisons are errors, except that the zero value compares
/// against any type's empty form by delegating to the other operand.
pub fn compare(a: &Value, op: Op, b: &Value) -> Result<Value, RuntimeError> {
    match op {
        Op::And => return Ok(Value::Bool(a.truthy() && b.truthy())),
        Op::Or => return Ok(Value::Bool(a.truthy() || b.truthy())),
        Op::In => return Ok(Value::Bool(to_index(b)?.has(a))),
        _ => {}
    }

    match a {
        Value::Str(s) => cmp_str(s, op, b),
        Value::Int(i) => cmp_int(*i, op, b, "int"),
        Value::Float(v) => cmp_float(v.into_inner(), op, b),
        Value::Bool(v) => cmp_bool(*v, op, b),
        Value::Array(arr) => cmp_array(arr, op, b),
        Value::Object(obj) => cmp_object(obj, op, b),
        Value::Tuple(t) => cmp_tuple(t, op, b),
        Value::Duration(d) => cmp_int(d.as_nanos() as i64, op, b, "duration"),
        Value::Zero => cmp_zero(op, b),
        _ => Err(RuntimeError::InvalidOp { op, typ: a.type_name() }),
    }
}

fn compare_error(op: Op, a: &Value, b: &Value) -> RuntimeError {
    RuntimeError::Compare { op, left: a.type_name(), right: b.type_name() }
}

/// Applies an ordered comparison to two operands of the same type.
fn ord_cmp<T: PartialOrd>(a: &T, op: Op, b: &T, typ: &'static str) -> Result<Value, RuntimeError> {
    let ans = match op {
        Op::Eq => a == b,
        Op::Neq => a != b,
        Op::Lt => a < b,
        Op::Leq => a <= b,
        Op::Gt => a > b,
        Op::Geq => a >= b,
        _ => return Err(RuntimeError::InvalidOp { op, typ }),
    };
    Ok(Value::Bool(ans))
}

fn cmp_str(s: &str, op: Op, b: &Value) -> Result<Value, RuntimeError> {
    match b {
        Value::Str(other) => ord_cmp(&s, op, &other.as_str(), "string"),
        Value::Zero => ord_cmp(&s, op, &"", "string"),
        _ => Err(compare_error(op, &Value::Str(s.to_string()), b)),
    }
}

fn cmp_int(i: i64, op: Op, b: &Value, typ: &'static str) -> Result<Value, RuntimeError> {
    match b {
        Value::Int(other) => ord_cmp(&i, op, other, typ),
        Value::Zero => ord_cmp(&i, op, &0, typ),
        _ => Err(RuntimeError::Compare { op, left: typ, right: b.type_name() }),
    }
}

fn cmp_float(v: f64, op: Op, b: &Value) -> Result<Value, RuntimeError> {
    match b {
        Value::Float(other) => ord_cmp(&v, op, &other.into_inner(), "float"),
        Value::Zero => ord_cmp(&v, op, &0.0, "float"),
        _ => Err(RuntimeError::Compare { op, left: "float", right: b.type_name() }),
    }
}

fn cmp_bool(v: bool, op: Op, b: &Value) -> Result<Value, RuntimeError> {
    let other = match b {
        Value::Bool(other) => *other,
        Value::Zero => false,
        _ => return Err(RuntimeError::Compare { op, left: "bool", right: b.type_name() }),
    };

    match op {
        Op::Eq => Ok(Value::Bool(v == other)),
        Op::Neq => Ok(Value::Bool(v != other)),
        _ => Err(RuntimeError::InvalidOp { op, typ: "bool" }),
    }
}

fn cmp_array(arr: &Rc<RefCell<Array>>, op: Op, b: &Value) -> Result<Value, RuntimeError> {
    let eq = match b {
        Value::Array(other) => {
            if Rc::ptr_eq(arr, other) {
                true
            } else {
                let arr = arr.borrow();
                let other = other.borrow();

                arr.items().len() == other.items().len()
                    && arr
                        .items()
                        .iter()
                        .zip(other.items())
                        .all(|(x, y)| compare(x, Op::Eq, y).is_ok_and(|v| v.truthy()))
            }
        }
        Value::Zero => arr.borrow().items().is_empty(),
        _ => return Err(RuntimeError::Compare { op, left: "array", right: b.type_name() }),
    };

    match op {
        Op::Eq => Ok(Value::Bool(eq)),
        Op::Neq => Ok(Value::Bool(!eq)),
        _ => Err(RuntimeError::InvalidOp { op, typ: "array" }),
    }
}

fn cmp_object(obj: &Rc<RefCell<Object>>, op: Op, b: &Value) -> Result<Value, RuntimeError> {
    let eq = match b {
        Value::Object(other) => {
            if Rc::ptr_eq(obj, other) {
                true
            } else {
                let obj = obj.borrow();
                let other = other.borrow();

                obj.len() == other.len()
                    && obj.keys().all(|k| match (obj.value(k), other.value(k)) {
                        (Some(x), Some(y)) => compare(x, Op::Eq, y).is_ok_and(|v| v.truthy()),
                        _ => false,
                    })
            }
        }
        Value::Zero => obj.borrow().len() == 0,
        _ => return Err(RuntimeError::Compare { op, left: "object", right: b.type_name() }),
    };

    match op {
        Op::Eq => Ok(Value::Bool(eq)),
        Op::Neq => Ok(Value::Bool(!eq)),
        _ => Err(RuntimeError::InvalidOp { op, typ: "object" }),
    }
}

/// A tuple compares through its projections: the first-value view is tried
/// first, then the full-list view, and the comparison succeeds if either
/// does.
fn cmp_tuple(t: &Tuple, op: Op, b: &Value) -> Result<Value, RuntimeError> {
    let first = compare(&t.t1, op, b);

    if first.as_ref().is_ok_and(|v| v.truthy()) {
        return first;
    }

    match compare(&t.t2, op, b) {
        Ok(val) => Ok(val),
        Err(_) => first.map_err(|_| RuntimeError::InvalidOp { op, typ: "tuple" }),
    }
}

/// `zero op X` delegates to `X op zero` so every concrete type handles its
/// zero case in one place.
fn cmp_zero(op: Op, b: &Value) -> Result<Value, RuntimeError> {
    if let Value::Zero = b {
        return match op {
            Op::Eq => Ok(Value::Bool(true)),
            Op::Neq => Ok(Value::Bool(false)),
            _ => Err(RuntimeError::InvalidOp { op, typ: "zero" }),
        };
    }
    compare(b, op, &Value::Zero)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array_of(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(Array::new(items).unwrap())))
    }

    #[test]
    fn strings_compare_lexicographically() {
        let a = Value::Str("abc".into());
        let b = Value::Str("abd".into());

        assert!(compare(&a, Op::Lt, &b).unwrap().truthy());
        assert!(compare(&a, Op::Neq, &b).unwrap().truthy());
        assert!(!compare(&a, Op::Eq, &b).unwrap().truthy());
    }

    #[test]
    fn cross_type_comparison_is_an_error() {
        let err = compare(&Value::Str("10".into()), Op::Eq, &Value::Int(10)).unwrap_err();

        assert_eq!(err.to_string(), "type mismatch for comparison: string == int");
    }

    #[test]
    fn zero_equals_the_empty_form_of_any_type() {
        assert!(compare(&Value::Str(String::new()), Op::Eq, &Value::Zero).unwrap().truthy());
        assert!(compare(&Value::Zero, Op::Eq, &Value::Int(0)).unwrap().truthy());
        assert!(compare(&Value::Zero, Op::Eq, &Value::Bool(false)).unwrap().truthy());
        assert!(compare(&array_of(vec![]), Op::Eq, &Value::Zero).unwrap().truthy());
        assert!(!compare(&Value::Int(3), Op::Eq, &Value::Zero).unwrap().truthy());
    }

    #[test]
    fn in_asks_the_right_operands_index() {
        let arr = array_of(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);

        assert!(compare(&Value::Int(2), Op::In, &arr).unwrap().truthy());
        assert!(!compare(&Value::Int(9), Op::In, &arr).unwrap().truthy());
    }

    #[test]
    fn and_or_combine_truthiness() {
        let t = Value::Bool(true);
        let f = Value::Bool(false);

        assert!(compare(&t, Op::And, &t).unwrap().truthy());
        assert!(!compare(&t, Op::And, &f).unwrap().truthy());
        assert!(compare(&f, Op::Or, &t).unwrap().truthy());
        assert!(!compare(&Value::Int(1), Op::And, &t).unwrap().truthy());
    }

    #[test]
    fn only_the_bool_true_is_truthy() {
        assert!(Value::Bool(true).truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(!Value::Int(1).truthy());
        assert!(!Value::Str("yes".into()).truthy());
    }

    #[test]
    fn display_quotes_strings_and_sprint_does_not() {
        let s = Value::Str("hi".into());

        assert_eq!(s.to_string(), "\"hi\"");
        assert_eq!(s.sprint(), "hi");
    }

    #[test]
    fn tuples_compare_through_either_projection() {
        let t = Value::Tuple(Rc::new(Tuple {
            t1: Value::Str("gzip".into()),
            t2: array_of(vec![Value::Str("gzip".into()), Value::Str("br".into())]),
        }));

        assert!(compare(&t, Op::Eq, &Value::Str("gzip".into())).unwrap().truthy());
        assert!(compare(&Value::Str("br".into()), Op::In, &t).unwrap().truthy());
    }
}
