use rustc_hash::FxHashMap;

use crate::{
    error::RuntimeError,
    interpreter::value::core::{Value, compare_type},
};

/// The storage behind `Value::Object`.
///
/// A mapping from strings to values plus the order in which the keys were
/// inserted. Iteration follows the order list, and updating an existing key
/// keeps its position.
#[derive(Debug, Default)]
pub struct Object {
    pairs: FxHashMap<String, Value>,
    order: Vec<String>,
    curr:  usize,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an object from the given pairs, preserving their order.
    pub fn from_pairs(pairs: Vec<(String, Value)>) -> Self {
        let mut obj = Self::new();

        for (key, val) in pairs {
            obj.insert(key, val);
        }
        obj
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    /// The value stored under the given key, if any.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.pairs.get(key)
    }

    /// Stores a value, appending the key to the order list if it is new.
    pub fn insert(&mut self, key: String, val: Value) {
        if !self.pairs.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.pairs.insert(key, val);
    }

    /// Whether the object has the given value as a key, if that value is a
    /// string.
    pub fn has(&self, v: &Value) -> bool {
        match v {
            Value::Str(s) => self.pairs.contains_key(s),
            _ => false,
        }
    }

    /// The value under the given string key. A missing key returns
    /// [`Value::Zero`], never an error.
    pub fn get(&self, key: &Value) -> Result<Value, RuntimeError> {
        let key = key.as_str()?;

        match self.pairs.get(key) {
            Some(val) => Ok(val.clone()),
            None => Ok(Value::Zero),
        }
    }

    /// Stores a value under the given string key. In strict mode an existing
    /// value must share the incoming value's type.
    pub fn set(&mut self, strict: bool, key: &Value, val: Value) -> Result<(), RuntimeError> {
        let key = key.as_str()?;

        if let Some(existing) = self.pairs.get(key) {
            if strict {
                compare_type(&val, existing)?;
            }
            self.pairs.insert(key.to_string(), val);
            return Ok(());
        }

        self.insert(key.to_string(), val);
        Ok(())
    }

    /// Yields the next `(key, value)` pair in insertion order. Exhaustion
    /// resets the cursor so the object can be iterated again.
    pub fn next(&mut self) -> Option<(Value, Value)> {
        if self.curr >= self.order.len() {
            self.curr = 0;
            return None;
        }

        let key = self.order[self.curr].clone();
        self.curr += 1;

        let val = self.pairs.get(&key).cloned().unwrap_or(Value::Zero);
        Some((Value::Str(key), val))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_preserves_insertion_order() {
        let mut obj = Object::from_pairs(vec![
            ("b".into(), Value::Int(1)),
            ("a".into(), Value::Int(2)),
            ("c".into(), Value::Int(3)),
        ]);

        let mut keys = Vec::new();
        while let Some((k, _)) = obj.next() {
            keys.push(k.sprint());
        }

        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn updating_a_key_keeps_its_position() {
        let mut obj = Object::from_pairs(vec![
            ("b".into(), Value::Int(1)),
            ("a".into(), Value::Int(2)),
        ]);

        obj.set(true, &Value::Str("b".into()), Value::Int(9)).unwrap();

        assert_eq!(obj.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(obj.get(&Value::Str("b".into())).unwrap().to_string(), "9");
    }

    #[test]
    fn missing_key_returns_zero() {
        let obj = Object::new();
        assert!(matches!(obj.get(&Value::Str("nope".into())).unwrap(), Value::Zero));
    }

    #[test]
    fn strict_set_pins_the_value_type() {
        let mut obj = Object::from_pairs(vec![("n".into(), Value::Int(1))]);

        let err = obj.set(true, &Value::Str("n".into()), Value::Str("x".into())).unwrap_err();
        assert_eq!(err.to_string(), "cannot use string as int");

        // Non-strict replacement is allowed, as during range iteration.
        obj.set(false, &Value::Str("n".into()), Value::Str("x".into())).unwrap();
    }

    #[test]
    fn non_string_keys_do_not_index_objects() {
        let obj = Object::new();
        let err = obj.get(&Value::Int(1)).unwrap_err();

        assert_eq!(err.to_string(), "cannot use int as string");
    }
}
