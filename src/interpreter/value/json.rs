use std::cell::RefCell;
use std::rc::Rc;

use ordered_float::OrderedFloat;

use crate::{
    error::RuntimeError,
    interpreter::value::{array::Array, core::Value, object::Object},
};

/// Decodes a JSON document into a value.
///
/// Primitives map onto the corresponding value variants: null becomes zero,
/// integral numbers become ints, and other numbers become floats. Decoded
/// arrays skip the homogeneity check since JSON arrays may mix types.
pub fn decode(data: &[u8]) -> Result<Value, RuntimeError> {
    let doc: serde_json::Value = serde_json::from_slice(data)?;
    Ok(from_json(doc))
}

fn from_json(doc: serde_json::Value) -> Value {
    match doc {
        serde_json::Value::Null => Value::Zero,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(OrderedFloat(n.as_f64().unwrap_or(0.0))),
        },
        serde_json::Value::String(s) => Value::Str(s),
        serde_json::Value::Array(items) => {
            let items = items.into_iter().map(from_json).collect();
            Value::Array(Rc::new(RefCell::new(Array::from_items(items))))
        }
        serde_json::Value::Object(pairs) => {
            let pairs = pairs.into_iter().map(|(k, v)| (k, from_json(v))).collect();
            Value::Object(Rc::new(RefCell::new(Object::from_pairs(pairs))))
        }
    }
}

/// Encodes a value into a JSON document. Values without a JSON shape, such
/// as files and streams, cannot be encoded.
pub fn encode(v: &Value) -> Result<serde_json::Value, RuntimeError> {
    match v {
        Value::Str(s) => Ok(serde_json::Value::String(s.clone())),
        Value::Int(i) => Ok(serde_json::Value::from(*i)),
        Value::Float(f) => Ok(serde_json::Value::from(f.into_inner())),
        Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Zero => Ok(serde_json::Value::Null),
        Value::Array(arr) => {
            let items = arr
                .borrow()
                .items()
                .iter()
                .map(encode)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(serde_json::Value::Array(items))
        }
        Value::Object(obj) => {
            let obj = obj.borrow();
            let mut map = serde_json::Map::new();

            for k in obj.keys() {
                if let Some(val) = obj.value(k) {
                    map.insert(k.clone(), encode(val)?);
                }
            }
            Ok(serde_json::Value::Object(map))
        }
        _ => Err(RuntimeError::Message(format!("cannot encode {}", v.type_name()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::lexer::Op;
    use crate::interpreter::value::core::compare;

    #[test]
    fn decode_maps_primitives_onto_value_variants() {
        let val = decode(br#"{"s": "x", "i": 3, "f": 1.5, "b": true, "n": null}"#).unwrap();
        let obj = val.as_object().unwrap();
        let obj = obj.borrow();

        assert!(matches!(obj.value("s"), Some(Value::Str(_))));
        assert!(matches!(obj.value("i"), Some(Value::Int(3))));
        assert!(matches!(obj.value("f"), Some(Value::Float(_))));
        assert!(matches!(obj.value("b"), Some(Value::Bool(true))));
        assert!(matches!(obj.value("n"), Some(Value::Zero)));
    }

    #[test]
    fn decode_preserves_object_key_order() {
        let val = decode(br#"{"b": 1, "a": 2, "c": 3}"#).unwrap();
        let obj = val.as_object().unwrap();
        let keys: Vec<String> = obj.borrow().keys().cloned().collect();

        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn round_trip_preserves_equality() {
        let doc = br#"{"user": "gopher", "ids": [1, 2, 3], "active": true, "gone": null}"#;

        let first = decode(doc).unwrap();
        let encoded = serde_json::to_vec(&encode(&first).unwrap()).unwrap();
        let second = decode(&encoded).unwrap();

        assert!(compare(&first, Op::Eq, &second).unwrap().truthy());
    }

    #[test]
    fn streams_cannot_be_encoded() {
        use crate::interpreter::value::stream::BufStream;

        let err = encode(&BufStream::new(&b"x"[..]).into_value()).unwrap_err();
        assert_eq!(err.to_string(), "cannot encode stream");
    }
}
