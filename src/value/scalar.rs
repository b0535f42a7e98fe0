use std::fmt;

use derive_more::with_trait::{Display, From};
use serde::{
    Serialize,
    de::{self, Deserialize, Deserializer},
};

/// The scalar values a [`Value`] or an [`InputValue`] may carry.
///
/// [`InputValue`]: crate::InputValue
/// [`Value`]: crate::Value
#[derive(Clone, Debug, Display, From, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DefaultScalarValue {
    /// [`Int` scalar][0] as a signed 32-bit integer.
    ///
    /// [0]: https://spec.graphql.org/October2021#sec-Int
    Int(i32),

    /// [`Float` scalar][0] as a double-precision number.
    ///
    /// [0]: https://spec.graphql.org/October2021#sec-Float
    Float(f64),

    /// [`String` scalar][0], also used for [`ID`][1] values.
    ///
    /// [0]: https://spec.graphql.org/October2021#sec-String
    /// [1]: https://spec.graphql.org/October2021#sec-ID
    #[display("\"{_0}\"")]
    String(String),

    /// [`Boolean` scalar][0].
    ///
    /// [0]: https://spec.graphql.org/October2021#sec-Boolean
    Boolean(bool),
}

impl DefaultScalarValue {
    /// Returns the [`i32`] held by this scalar, if it's an `Int`.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns this scalar as a [`f64`], widening `Int`s.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(f64::from(*i)),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string held by this scalar, if it's a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the [`bool`] held by this scalar, if it's a `Boolean`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for DefaultScalarValue {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl<'de> Deserialize<'de> for DefaultScalarValue {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        struct Visitor;

        impl de::Visitor<'_> for Visitor {
            type Value = DefaultScalarValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a valid scalar value")
            }

            fn visit_bool<E: de::Error>(self, b: bool) -> Result<Self::Value, E> {
                Ok(DefaultScalarValue::Boolean(b))
            }

            fn visit_i64<E: de::Error>(self, n: i64) -> Result<Self::Value, E> {
                // Integers out of the `Int` range are transferred as floats,
                // the way `JSON.stringify` drops the fractional part of them.
                Ok(i32::try_from(n)
                    .map(DefaultScalarValue::Int)
                    .unwrap_or(DefaultScalarValue::Float(n as f64)))
            }

            fn visit_u64<E: de::Error>(self, n: u64) -> Result<Self::Value, E> {
                Ok(i32::try_from(n)
                    .map(DefaultScalarValue::Int)
                    .unwrap_or(DefaultScalarValue::Float(n as f64)))
            }

            fn visit_f64<E: de::Error>(self, f: f64) -> Result<Self::Value, E> {
                Ok(DefaultScalarValue::Float(f))
            }

            fn visit_str<E: de::Error>(self, s: &str) -> Result<Self::Value, E> {
                Ok(DefaultScalarValue::String(s.into()))
            }

            fn visit_string<E: de::Error>(self, s: String) -> Result<Self::Value, E> {
                Ok(DefaultScalarValue::String(s))
            }
        }

        de.deserialize_any(Visitor)
    }
}
