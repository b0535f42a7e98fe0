use indexmap::map::{IndexMap, IntoIter};

use super::Value;

/// An ordered map of field names to [`Value`]s.
///
/// Insertion order is the order fields appear in the response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Object {
    key_value_list: IndexMap<String, Value>,
}

impl Object {
    /// Creates a new [`Object`] with a fixed number of preallocated slots for
    /// field-value pairs.
    pub fn with_capacity(size: usize) -> Self {
        Self {
            key_value_list: IndexMap::with_capacity(size),
        }
    }

    /// Adds a new field with a value.
    ///
    /// If there is already a field with the given name and both values are
    /// objects, they are merged. Otherwise the existing value is replaced and
    /// returned.
    pub fn add_field(&mut self, k: impl Into<String>, value: Value) -> Option<Value> {
        let key = k.into();
        match (value, self.key_value_list.get_mut(&key)) {
            (Value::Object(obj_val), Some(Value::Object(existing_obj))) => {
                for (key, val) in obj_val {
                    existing_obj.add_field(key, val);
                }
                None
            }
            (non_obj_val, _) => self.key_value_list.insert(key, non_obj_val),
        }
    }

    /// Checks whether this [`Object`] contains a field with the given name.
    pub fn contains_field(&self, f: &str) -> bool {
        self.key_value_list.contains_key(f)
    }

    /// Returns an iterator over all field-value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.key_value_list.iter()
    }

    /// Returns the current number of fields.
    pub fn field_count(&self) -> usize {
        self.key_value_list.len()
    }

    /// Returns the value of the given field, if any.
    pub fn get_field_value(&self, key: &str) -> Option<&Value> {
        self.key_value_list.get(key)
    }
}

impl IntoIterator for Object {
    type Item = (String, Value);
    type IntoIter = IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.key_value_list.into_iter()
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Self::Object(o)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut ret = Self::with_capacity(iter.size_hint().0);
        for (k, v) in iter {
            ret.add_field(k, v);
        }
        ret
    }
}
