//! Inputs of the engine: type literals, input values and selections.

use std::{collections::HashMap, fmt, str::FromStr};

use arcstr::ArcStr;
use derive_more::with_trait::{Display, Error};
use indexmap::IndexMap;
use serde::{
    Deserialize,
    de::{self, Deserializer, MapAccess, SeqAccess},
};

use crate::{util::is_valid_name, value::DefaultScalarValue};

/// A type literal in the syntax tree.
///
/// This enum carries no semantic information and might refer to types that do
/// not exist.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Type {
    /// A nullable named type, e.g. `String`.
    Named(ArcStr),
    /// A nullable list type, e.g. `[String]`.
    ///
    /// The list itself is what's nullable, the containing type might be non-null.
    List(Box<Type>),
    /// A non-null named type, e.g. `String!`.
    NonNullNamed(ArcStr),
    /// A non-null list type, e.g. `[String]!`.
    ///
    /// The list itself is what's non-null, the containing type might be null.
    NonNullList(Box<Type>),
}

impl Type {
    /// Returns the name of a named type.
    ///
    /// Only applies to named types; lists will return [`None`].
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(n) | Self::NonNullNamed(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the innermost name by unpacking lists.
    ///
    /// All type literals contain exactly one named type.
    pub fn innermost_name(&self) -> &str {
        match self {
            Self::Named(n) | Self::NonNullNamed(n) => n,
            Self::List(l) | Self::NonNullList(l) => l.innermost_name(),
        }
    }

    /// Determines if a type only can represent non-null values.
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNullNamed(_) | Self::NonNullList(_))
    }

    /// Determines if this is a list type, regardless of its nullability.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_) | Self::NonNullList(_))
    }

    /// Returns the nullable variant of this type.
    #[must_use]
    pub fn nullable(&self) -> Self {
        match self {
            Self::NonNullNamed(n) => Self::Named(n.clone()),
            Self::NonNullList(l) => Self::List(l.clone()),
            t => t.clone(),
        }
    }

    /// Wraps this type into a non-null wrapper, unless it's already non-null.
    #[must_use]
    pub fn non_null(self) -> Self {
        match self {
            Self::Named(n) => Self::NonNullNamed(n),
            Self::List(l) => Self::NonNullList(l),
            t => t,
        }
    }

    /// Returns the item type of a list type.
    pub fn list_item(&self) -> Option<&Self> {
        match self {
            Self::List(l) | Self::NonNullList(l) => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(n) => write!(f, "{n}"),
            Self::NonNullNamed(n) => write!(f, "{n}!"),
            Self::List(t) => write!(f, "[{t}]"),
            Self::NonNullList(t) => write!(f, "[{t}]!"),
        }
    }
}

/// Error of parsing a [`Type`] literal like `[Int!]!`.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
#[display("invalid type literal `{literal}`")]
pub struct TypeLiteralError {
    literal: String,
}

impl FromStr for Type {
    type Err = TypeLiteralError;

    fn from_str(literal: &str) -> Result<Self, Self::Err> {
        fn parse(s: &str) -> Option<Type> {
            let s = s.trim();
            let (inner, non_null) = match s.strip_suffix('!') {
                Some(inner) => (inner.trim_end(), true),
                None => (s, false),
            };
            let ty = if let Some(list) = inner.strip_prefix('[') {
                Type::List(Box::new(parse(list.strip_suffix(']')?)?))
            } else if is_valid_name(inner) {
                Type::Named(inner.into())
            } else {
                return None;
            };
            Some(if non_null { ty.non_null() } else { ty })
        }

        parse(literal).ok_or_else(|| TypeLiteralError {
            literal: literal.into(),
        })
    }
}

/// A JSON-like value that can be passed into the query execution, either
/// out-of-band, or in-band as default variable values. These are _not_ constant
/// and might contain variables.
#[derive(Clone, Debug, PartialEq)]
#[expect(missing_docs, reason = "self-explanatory")]
pub enum InputValue {
    Null,
    Scalar(DefaultScalarValue),
    Enum(String),
    Variable(String),
    List(Vec<InputValue>),
    Object(IndexMap<String, InputValue>),
}

/// The map of variables used for substitution during query execution.
pub type Variables = HashMap<String, InputValue>;

impl InputValue {
    /// Constructs a `null` value.
    pub fn null() -> Self {
        Self::Null
    }

    /// Constructs a scalar value.
    pub fn scalar(v: impl Into<DefaultScalarValue>) -> Self {
        Self::Scalar(v.into())
    }

    /// Constructs an enum value.
    pub fn enum_value(s: impl AsRef<str>) -> Self {
        Self::Enum(s.as_ref().into())
    }

    /// Constructs a variable value.
    pub fn variable(v: impl AsRef<str>) -> Self {
        Self::Variable(v.as_ref().into())
    }

    /// Constructs a list value.
    pub fn list(l: Vec<Self>) -> Self {
        Self::List(l)
    }

    /// Constructs an object value.
    pub fn object<K: Into<String>>(o: impl IntoIterator<Item = (K, Self)>) -> Self {
        Self::Object(o.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Resolves all variables of this [`InputValue`] to their actual `values`.
    ///
    /// If a variable is not present in the `values`:
    /// - Returns [`None`] in case this is an [`InputValue::Variable`].
    /// - Skips field in case of an [`InputValue::Object`] field.
    /// - Replaces with an [`InputValue::Null`] in case of an
    ///   [`InputValue::List`] element.
    ///
    /// This is done, because for an [`InputValue::Variable`] (or an
    /// [`InputValue::Object`] field) a default value can be used later, if it's
    /// provided. While on contrary, a single [`InputValue::List`] element
    /// cannot have a default value.
    #[must_use]
    pub fn into_const(self, values: &Variables) -> Option<Self> {
        match self {
            Self::Variable(v) => values.get(&v).cloned(),
            Self::List(l) => Some(Self::List(
                l.into_iter()
                    .map(|v| v.into_const(values).unwrap_or_else(Self::null))
                    .collect(),
            )),
            Self::Object(o) => Some(Self::Object(
                o.into_iter()
                    .filter_map(|(k, v)| v.into_const(values).map(|v| (k, v)))
                    .collect(),
            )),
            v => Some(v),
        }
    }

    /// Shorthand form of invoking [`FromInputValue::from_input_value()`].
    pub fn convert<T: FromInputValue>(&self) -> Result<T, InputValueError> {
        T::from_input_value(self)
    }

    /// Does the value represent a `null`?
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Views the underlying enum value, if present.
    pub fn as_enum_value(&self) -> Option<&str> {
        match self {
            Self::Enum(e) => Some(e.as_str()),
            _ => None,
        }
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
}

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Scalar(s) => write!(f, "{s}"),
            Self::Enum(v) => write!(f, "{v}"),
            Self::Variable(v) => write!(f, "${v}"),
            Self::List(v) => {
                write!(f, "[")?;
                for (i, item) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt(f)?;
                }
                write!(f, "]")
            }
            Self::Object(o) => {
                write!(f, "{{")?;
                for (i, (k, v)) in o.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl<T: Into<Self>> From<Option<T>> for InputValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

impl From<&str> for InputValue {
    fn from(s: &str) -> Self {
        Self::scalar(s)
    }
}

impl From<String> for InputValue {
    fn from(s: String) -> Self {
        Self::scalar(s)
    }
}

impl From<i32> for InputValue {
    fn from(i: i32) -> Self {
        Self::scalar(i)
    }
}

impl From<f64> for InputValue {
    fn from(f: f64) -> Self {
        Self::scalar(f)
    }
}

impl From<bool> for InputValue {
    fn from(b: bool) -> Self {
        Self::scalar(b)
    }
}

impl<'de> Deserialize<'de> for InputValue {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        struct Visitor;

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = InputValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a valid input value")
            }

            fn visit_bool<E: de::Error>(self, b: bool) -> Result<Self::Value, E> {
                Ok(InputValue::scalar(b))
            }

            fn visit_i64<E: de::Error>(self, n: i64) -> Result<Self::Value, E> {
                DefaultScalarValue::deserialize(de::value::I64Deserializer::new(n))
                    .map(InputValue::Scalar)
            }

            fn visit_u64<E: de::Error>(self, n: u64) -> Result<Self::Value, E> {
                DefaultScalarValue::deserialize(de::value::U64Deserializer::new(n))
                    .map(InputValue::Scalar)
            }

            fn visit_f64<E: de::Error>(self, f: f64) -> Result<Self::Value, E> {
                Ok(InputValue::scalar(f))
            }

            fn visit_str<E: de::Error>(self, s: &str) -> Result<Self::Value, E> {
                Ok(InputValue::scalar(s))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(InputValue::Null)
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(InputValue::Null)
            }

            fn visit_seq<V: SeqAccess<'de>>(self, mut visitor: V) -> Result<Self::Value, V::Error> {
                let mut values = Vec::new();
                while let Some(el) = visitor.next_element()? {
                    values.push(el);
                }
                Ok(InputValue::List(values))
            }

            fn visit_map<V: MapAccess<'de>>(self, mut visitor: V) -> Result<Self::Value, V::Error> {
                let mut object = IndexMap::with_capacity(visitor.size_hint().unwrap_or(0));
                while let Some((key, value)) = visitor.next_entry()? {
                    object.insert(key, value);
                }
                Ok(InputValue::Object(object))
            }
        }

        de.deserialize_any(Visitor)
    }
}

/// Error of converting an [`InputValue`] into a Rust value.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
#[display("Expected `{expected}`, found: {found}")]
pub struct InputValueError {
    expected: &'static str,
    found: String,
}

impl InputValueError {
    /// Creates a new [`InputValueError`] describing the `expected` type of the
    /// `found` value.
    pub fn new(expected: &'static str, found: &InputValue) -> Self {
        Self {
            expected,
            found: found.to_string(),
        }
    }
}

/// Parsing of an unstructured input value into a Rust data type.
///
/// Used by resolvers to read their bound arguments, see
/// [`Arguments::get()`](crate::Arguments::get).
pub trait FromInputValue: Sized {
    /// Performs the conversion.
    fn from_input_value(v: &InputValue) -> Result<Self, InputValueError>;

    /// Performs the conversion from an absent value (e.g. to distinguish
    /// between implicit and explicit `null`).
    ///
    /// The default implementation just calls [`from_input_value()`] as if an
    /// explicit `null` was provided.
    ///
    /// [`from_input_value()`]: FromInputValue::from_input_value
    fn from_implicit_null() -> Result<Self, InputValueError> {
        Self::from_input_value(&InputValue::Null)
    }
}

impl FromInputValue for InputValue {
    fn from_input_value(v: &InputValue) -> Result<Self, InputValueError> {
        Ok(v.clone())
    }
}

impl FromInputValue for i32 {
    fn from_input_value(v: &InputValue) -> Result<Self, InputValueError> {
        v.as_scalar()
            .and_then(DefaultScalarValue::as_int)
            .ok_or_else(|| InputValueError::new("Int", v))
    }
}

impl FromInputValue for f64 {
    fn from_input_value(v: &InputValue) -> Result<Self, InputValueError> {
        v.as_scalar()
            .and_then(DefaultScalarValue::as_float)
            .ok_or_else(|| InputValueError::new("Float", v))
    }
}

impl FromInputValue for bool {
    fn from_input_value(v: &InputValue) -> Result<Self, InputValueError> {
        v.as_scalar()
            .and_then(DefaultScalarValue::as_bool)
            .ok_or_else(|| InputValueError::new("Boolean", v))
    }
}

impl FromInputValue for String {
    fn from_input_value(v: &InputValue) -> Result<Self, InputValueError> {
        match v {
            InputValue::Enum(e) => Ok(e.clone()),
            v => v
                .as_string_value()
                .map(Into::into)
                .ok_or_else(|| InputValueError::new("String", v)),
        }
    }
}

impl<T: FromInputValue> FromInputValue for Option<T> {
    fn from_input_value(v: &InputValue) -> Result<Self, InputValueError> {
        match v {
            InputValue::Null => Ok(None),
            v => T::from_input_value(v).map(Some),
        }
    }
}

impl<T: FromInputValue> FromInputValue for Vec<T> {
    fn from_input_value(v: &InputValue) -> Result<Self, InputValueError> {
        match v {
            InputValue::List(l) => l.iter().map(T::from_input_value).collect(),
            InputValue::Null => Err(InputValueError::new("list", v)),
            other => T::from_input_value(other).map(|e| vec![e]),
        }
    }
}

/// Kind of the operation being executed.
#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
pub enum OperationType {
    /// Read-only fetch, top-level fields resolve concurrently.
    #[default]
    #[display("query")]
    Query,
    /// Write followed by a fetch, top-level fields resolve serially.
    #[display("mutation")]
    Mutation,
}

/// A directive applied to a selection, e.g. `@skip(if: $flag)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Directive {
    /// Name of the directive, without the leading `@`.
    pub name: ArcStr,
    /// Arguments the directive is applied with.
    pub arguments: Vec<(ArcStr, InputValue)>,
}

impl Directive {
    /// Constructs a new [`Directive`] with the provided `name` and `arguments`.
    pub fn new(name: impl Into<ArcStr>, arguments: Vec<(ArcStr, InputValue)>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Constructs a `@skip(if: condition)` directive.
    pub fn skip(condition: impl Into<InputValue>) -> Self {
        Self::new("skip", vec![("if".into(), condition.into())])
    }

    /// Constructs an `@include(if: condition)` directive.
    pub fn include(condition: impl Into<InputValue>) -> Self {
        Self::new("include", vec![("if".into(), condition.into())])
    }

    pub(crate) fn argument(&self, name: &str) -> Option<&InputValue> {
        self.arguments
            .iter()
            .find_map(|(k, v)| (k == name).then_some(v))
    }
}

/// A selected field, e.g. `alias: name(arg: 1) @skip(if: false) { ... }`.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSelection {
    /// Response key this field is reported under, if different from its name.
    pub alias: Option<ArcStr>,
    /// Name of the selected field.
    pub name: ArcStr,
    /// Arguments supplied to the field, possibly referencing variables.
    pub arguments: Vec<(ArcStr, InputValue)>,
    /// Directives applied to the field.
    pub directives: Vec<Directive>,
    /// Sub-selection of the field, empty for leaf fields.
    pub selection_set: Vec<Selection>,
}

impl FieldSelection {
    /// Returns the key this field is reported under in the result tree.
    pub fn response_name(&self) -> &ArcStr {
        self.alias.as_ref().unwrap_or(&self.name)
    }
}

/// An inline fragment, e.g. `... on User { name }`.
#[derive(Clone, Debug, PartialEq)]
pub struct InlineFragment {
    /// Concrete type the fragment applies to, or [`None`] for any type.
    pub type_condition: Option<ArcStr>,
    /// Directives applied to the fragment.
    pub directives: Vec<Directive>,
    /// Selections of the fragment.
    pub selection_set: Vec<Selection>,
}

/// Entry in a selection set.
///
/// Selections arrive already parsed; building them from query text is up to
/// the caller.
#[derive(Clone, Debug, PartialEq)]
#[expect(missing_docs, reason = "self-explanatory")]
pub enum Selection {
    Field(FieldSelection),
    InlineFragment(InlineFragment),
}

impl Selection {
    /// Selects a field by its `name`.
    pub fn field(name: impl Into<ArcStr>) -> Self {
        Self::Field(FieldSelection {
            alias: None,
            name: name.into(),
            arguments: vec![],
            directives: vec![],
            selection_set: vec![],
        })
    }

    /// Selects an inline fragment applying to the given type.
    pub fn inline_fragment(type_condition: Option<&str>, selection_set: Vec<Self>) -> Self {
        Self::InlineFragment(InlineFragment {
            type_condition: type_condition.map(Into::into),
            directives: vec![],
            selection_set,
        })
    }

    /// Sets the response alias of a field selection.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<ArcStr>) -> Self {
        if let Self::Field(f) = &mut self {
            f.alias = Some(alias.into());
        }
        self
    }

    /// Adds an argument to a field selection.
    #[must_use]
    pub fn argument(mut self, name: impl Into<ArcStr>, value: impl Into<InputValue>) -> Self {
        if let Self::Field(f) = &mut self {
            f.arguments.push((name.into(), value.into()));
        }
        self
    }

    /// Adds a directive to this selection.
    #[must_use]
    pub fn directive(mut self, directive: Directive) -> Self {
        match &mut self {
            Self::Field(f) => f.directives.push(directive),
            Self::InlineFragment(f) => f.directives.push(directive),
        }
        self
    }

    /// Sets the sub-selection of this selection.
    #[must_use]
    pub fn select(mut self, selection_set: Vec<Self>) -> Self {
        match &mut self {
            Self::Field(f) => f.selection_set = selection_set,
            Self::InlineFragment(f) => f.selection_set = selection_set,
        }
        self
    }

    /// Returns the directives applied to this selection.
    pub fn directives(&self) -> &[Directive] {
        match self {
            Self::Field(f) => &f.directives,
            Self::InlineFragment(f) => &f.directives,
        }
    }

    /// Checks whether `@skip`/`@include` directives exclude this selection.
    ///
    /// A condition referencing a missing variable, or not being a boolean,
    /// leaves the selection in place.
    pub fn is_excluded(&self, vars: &Variables) -> bool {
        self.directives().iter().any(|d| {
            let condition = d
                .argument("if")
                .cloned()
                .and_then(|v| v.into_const(vars))
                .and_then(|v| v.as_scalar().and_then(DefaultScalarValue::as_bool));
            match (d.name.as_str(), condition) {
                ("skip", Some(true)) | ("include", Some(false)) => true,
                _ => false,
            }
        })
    }
}
