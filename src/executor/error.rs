use std::{any::Any, error::Error as StdError, fmt, sync::Arc};

use arcstr::ArcStr;
use derive_more::with_trait::Display;
use serde::{Serialize, ser::SerializeMap as _};

use crate::value::Value;

/// Error type for errors that occur during field resolution.
///
/// Field errors are represented by a human-readable error message and an
/// optional `Value` structure containing additional information. An
/// underlying cause may be attached, and is preserved for logging but never
/// serialized.
///
/// They can be converted to from any type that implements
/// [`std::fmt::Display`], which makes error chaining with the `?` operator a
/// breeze:
///
/// ```rust
/// # use typegraph::FieldError;
/// fn get_string(data: Vec<u8>) -> Result<String, FieldError> {
///     let s = String::from_utf8(data)?;
///     Ok(s)
/// }
/// ```
#[derive(Clone)]
pub struct FieldError {
    message: String,
    extensions: Value,
    cause: Option<Arc<dyn StdError + Send + Sync>>,
}

impl<T: fmt::Display> From<T> for FieldError {
    fn from(e: T) -> Self {
        Self {
            message: e.to_string(),
            extensions: Value::null(),
            cause: None,
        }
    }
}

impl FieldError {
    /// Construct a new [`FieldError`] with additional data.
    ///
    /// The `extensions` are serialized next to the message, under the
    /// `extensions` key. A `null` value is omitted.
    pub fn new<T: fmt::Display>(e: T, extensions: Value) -> Self {
        Self {
            message: e.to_string(),
            extensions,
            cause: None,
        }
    }

    /// Construct a new [`FieldError`] caused by the provided `error`.
    pub fn caused_by<E: StdError + Send + Sync + 'static>(error: E) -> Self {
        Self {
            message: error.to_string(),
            extensions: Value::null(),
            cause: Some(Arc::new(error)),
        }
    }

    /// Returns the `"message"` field of this [`FieldError`].
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the `"extensions"` field of this [`FieldError`].
    ///
    /// If there are no `"extensions"`, then [`Value::Null`] is returned.
    #[must_use]
    pub fn extensions(&self) -> &Value {
        &self.extensions
    }

    /// Returns the underlying cause of this [`FieldError`], if any.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Turns a panic payload caught while resolving into an error.
    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "resolver panicked".into());
        Self::from(message)
    }
}

impl fmt::Debug for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldError")
            .field("message", &self.message)
            .field("extensions", &self.extensions)
            .field("cause", &self.cause.as_ref().map(ToString::to_string))
            .finish()
    }
}

impl PartialEq for FieldError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message && self.extensions == other.extensions
    }
}

/// The result of resolving the value of a field of type `T`
pub type FieldResult<T> = Result<T, FieldError>;

/// Segment of the path from the root of a result to a value.
#[derive(Clone, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Response name of a field.
    Field(ArcStr),
    /// Position in a list.
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(s: &str) -> Self {
        Self::Field(s.into())
    }
}

impl From<usize> for PathSegment {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

/// Kind of an [`ExecutionError`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ExecutionErrorKind {
    /// Arguments of a field can't be bound to its declared arguments.
    #[display("ARGUMENT_BINDING_ERROR")]
    ArgumentBinding,
    /// A resolver (or a middleware) failed or panicked.
    #[display("RESOLVER_THREW")]
    ResolverThrew,
    /// A non-null position resolved to `null`.
    #[display("NON_NULL_VIOLATION")]
    NonNullViolation,
    /// The request was cancelled before the field resolved.
    #[display("CANCELLED")]
    Cancelled,
    /// The selected field doesn't exist on the type.
    #[display("FIELD_NOT_FOUND")]
    FieldNotFound,
    /// A resolved value doesn't fit the declared result type.
    #[display("RESULT_COERCION_ERROR")]
    ResultCoercion,
}

/// Error that occurred while resolving a field, positioned in the result.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionError {
    kind: ExecutionErrorKind,
    path: Vec<PathSegment>,
    error: FieldError,
}

impl ExecutionError {
    pub(crate) fn new(kind: ExecutionErrorKind, path: &[PathSegment], error: FieldError) -> Self {
        Self {
            kind,
            path: path.to_vec(),
            error,
        }
    }

    /// Kind of this error.
    pub fn kind(&self) -> ExecutionErrorKind {
        self.kind
    }

    /// Stable code of this error.
    pub fn code(&self) -> String {
        self.kind.to_string()
    }

    /// The path in the result the error occurred at.
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// The error itself.
    pub fn error(&self) -> &FieldError {
        &self.error
    }
}

impl Serialize for ExecutionError {
    fn serialize<S: serde::Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        let has_extensions = !self.error.extensions.is_null();
        let mut map = ser.serialize_map(Some(3 + usize::from(has_extensions)))?;
        map.serialize_entry("message", self.error.message())?;
        map.serialize_entry("path", &self.path)?;
        map.serialize_entry("code", &self.code())?;
        if has_extensions {
            map.serialize_entry("extensions", self.error.extensions())?;
        }
        map.end()
    }
}
