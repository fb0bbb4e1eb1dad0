use rustc_hash::FxHashSet;

use crate::{
    error::RuntimeError,
    interpreter::value::core::{Value, compare_type},
};

/// The storage behind `Value::Array`.
///
/// Arrays are homogeneous: every item shares one type, checked at
/// construction and again on append. A set of rendered item forms is kept
/// alongside the items so the `in` operator answers without walking the
/// array.
#[derive(Debug, Default)]
pub struct Array {
    items: Vec<Value>,
    set:   FxHashSet<String>,
    curr:  usize,
}

impl Array {
    /// Builds an array from the given items, enforcing that they all share
    /// one type.
    pub fn new(items: Vec<Value>) -> Result<Self, RuntimeError> {
        if let Some(first) = items.first() {
            let typ = first.type_name();

            if items.iter().any(|it| it.type_name() != typ) {
                return Err(RuntimeError::Homogeneity { typ });
            }
        }
        Ok(Self::from_items(items))
    }

    /// Builds an array without the homogeneity check. Decoded JSON arrays may
    /// legitimately mix types and nulls.
    pub fn from_items(items: Vec<Value>) -> Self {
        let set = items.iter().map(Value::to_string).collect();
        Self { items, set, curr: 0 }
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Whether the array contains the given value, by its rendered form.
    pub fn has(&self, v: &Value) -> bool {
        self.set.contains(&v.to_string())
    }

    /// The item at the given int index. An out-of-range index returns
    /// [`Value::Zero`], never an error.
    pub fn get(&self, key: &Value) -> Result<Value, RuntimeError> {
        let i = key.as_int()?;

        if i < 0 || i as usize >= self.items.len() {
            return Ok(Value::Zero);
        }
        Ok(self.items[i as usize].clone())
    }

    /// Stores a value in the array. An empty array literal as the key, the
    /// `Arr[] = v` form, appends; an int key replaces the item at that index
    /// and errors when it is out of bounds. In strict mode the replaced item
    /// must share the incoming value's type.
    pub fn set(&mut self, strict: bool, key: &Value, val: Value) -> Result<(), RuntimeError> {
        if let Value::Array(_) = key {
            return self.push(val);
        }

        let i = key.as_int()?;

        if i < 0 || i as usize >= self.items.len() {
            return Err(RuntimeError::OutOfBounds);
        }

        let i = i as usize;

        if strict {
            compare_type(&val, &self.items[i])?;
        }

        self.set.remove(&self.items[i].to_string());
        self.set.insert(val.to_string());
        self.items[i] = val;
        Ok(())
    }

    /// Appends a value, keeping the array homogeneous.
    pub fn push(&mut self, val: Value) -> Result<(), RuntimeError> {
        if let Some(first) = self.items.first() {
            if first.type_name() != val.type_name() {
                return Err(RuntimeError::Homogeneity { typ: first.type_name() });
            }
        }

        self.set.insert(val.to_string());
        self.items.push(val);
        Ok(())
    }

    /// Yields the next `(index, item)` pair. Exhaustion resets the cursor so
    /// the array can be iterated again.
    pub fn next(&mut self) -> Option<(Value, Value)> {
        if self.curr >= self.items.len() {
            self.curr = 0;
            return None;
        }

        let i = self.curr;
        self.curr += 1;

        Some((Value::Int(i as i64), self.items[i].clone()))
    }
}
