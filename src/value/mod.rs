//! Runtime values produced by resolvers and assembled into result trees.

mod object;
mod scalar;

use std::fmt;

use serde::{
    Deserialize, Serialize,
    de::{self, Deserializer, MapAccess, SeqAccess},
    ser::{SerializeMap as _, Serializer},
};

use crate::ast::InputValue;

pub use self::{object::Object, scalar::DefaultScalarValue};

/// Serializable value returned from query and field execution.
///
/// Used by the execution engine and resolvers to build up the response
/// structure. Similar to the `Json` type found in the serialize crate.
///
/// It is also similar to the [`InputValue`] type, but can not contain enum
/// values or variables. Also, lists and objects do not contain any location
/// information since they are generated by resolving fields and values rather
/// than parsing a source query.
#[derive(Clone, Debug, Default, PartialEq)]
#[expect(missing_docs, reason = "self-explanatory")]
pub enum Value {
    #[default]
    Null,
    Scalar(DefaultScalarValue),
    List(Vec<Value>),
    Object(Object),
}

impl Value {
    /// Constructs a null value.
    pub fn null() -> Self {
        Self::Null
    }

    /// Constructs a scalar value.
    pub fn scalar(s: impl Into<DefaultScalarValue>) -> Self {
        Self::Scalar(s.into())
    }

    /// Constructs a list value.
    pub fn list(l: Vec<Self>) -> Self {
        Self::List(l)
    }

    /// Constructs an object value.
    pub fn object(o: Object) -> Self {
        Self::Object(o)
    }

    /// Does this value represent `null`?
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Views the underlying scalar value, if present.
    pub fn as_scalar(&self) -> Option<&DefaultScalarValue> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Views the underlying string value, if present.
    pub fn as_string_value(&self) -> Option<&str> {
        self.as_scalar().and_then(DefaultScalarValue::as_str)
    }

    /// Views the underlying object value, if present.
    pub fn as_object_value(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Views the underlying list value, if present.
    pub fn as_list_value(&self) -> Option<&Vec<Self>> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// Converts this [`Value`] into a constant [`InputValue`].
    ///
    /// Used to hand a parent value to a resolver as an argument.
    pub fn to_input_value(&self) -> InputValue {
        match self {
            Self::Null => InputValue::Null,
            Self::Scalar(s) => InputValue::Scalar(s.clone()),
            Self::List(l) => InputValue::List(l.iter().map(Self::to_input_value).collect()),
            Self::Object(o) => InputValue::Object(
                o.iter()
                    .map(|(k, v)| (k.clone(), v.to_input_value()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Scalar(s) => write!(f, "{s}"),
            Self::List(list) => {
                write!(f, "[")?;
                for (idx, item) in list.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Object(obj) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in obj.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{key}\": {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::scalar(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::scalar(s)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::scalar(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::scalar(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::scalar(b)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => ser.serialize_unit(),
            Self::Scalar(s) => s.serialize(ser),
            Self::List(l) => l.serialize(ser),
            Self::Object(o) => {
                let mut map = ser.serialize_map(Some(o.field_count()))?;
                for (f, v) in o.iter() {
                    map.serialize_entry(f, v)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = Value;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a valid value")
            }

            fn visit_bool<E: de::Error>(self, b: bool) -> Result<Self::Value, E> {
                Ok(Value::scalar(b))
            }

            fn visit_i64<E: de::Error>(self, n: i64) -> Result<Self::Value, E> {
                DefaultScalarValue::deserialize(de::value::I64Deserializer::new(n))
                    .map(Value::Scalar)
            }

            fn visit_u64<E: de::Error>(self, n: u64) -> Result<Self::Value, E> {
                DefaultScalarValue::deserialize(de::value::U64Deserializer::new(n))
                    .map(Value::Scalar)
            }

            fn visit_f64<E: de::Error>(self, f: f64) -> Result<Self::Value, E> {
                Ok(Value::scalar(f))
            }

            fn visit_str<E: de::Error>(self, s: &str) -> Result<Self::Value, E> {
                Ok(Value::scalar(s))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(Value::Null)
            }

            fn visit_seq<V: SeqAccess<'de>>(self, mut visitor: V) -> Result<Self::Value, V::Error> {
                let mut values = Vec::new();
                while let Some(el) = visitor.next_element()? {
                    values.push(el);
                }
                Ok(Value::List(values))
            }

            fn visit_map<V: MapAccess<'de>>(self, mut visitor: V) -> Result<Self::Value, V::Error> {
                let mut object = Object::with_capacity(visitor.size_hint().unwrap_or(0));
                while let Some((key, value)) = visitor.next_entry::<String, Value>()? {
                    object.add_field(key, value);
                }
                Ok(Value::Object(object))
            }
        }

        de.deserialize_any(Visitor)
    }
}
