//! Success-or-errors results of mutations.

use arcstr::ArcStr;
use derive_more::with_trait::{Display, Error};

use crate::{
    executor::{FieldError, FieldResult},
    value::{Object, Value},
};

/// Error reported inside a [`Payload`], rather than as a field error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PayloadError {
    message: String,
    code: Option<ArcStr>,
}

impl PayloadError {
    /// Creates an error with the given `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Sets a machine-readable code of this error.
    #[must_use]
    pub fn code(mut self, code: impl Into<ArcStr>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Message of this error.
    pub fn message(&self) -> &str {
        &self.message
    }

    fn to_value(&self) -> Value {
        let mut obj = Object::with_capacity(2);
        obj.add_field("message", Value::scalar(self.message.as_str()));
        if let Some(code) = &self.code {
            obj.add_field("code", Value::scalar(code.as_str()));
        }
        Value::object(obj)
    }
}

/// Reasons a [`Payload`] can't be constructed.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum PayloadConstructionError {
    /// No errors were given for an error payload.
    #[display("Error payload needs at least one error")]
    EmptyErrorList,
    /// One of the errors has no message.
    #[display("Payload error at position {_0} has an empty message")]
    BlankMessage(#[error(not(source))] usize),
}

/// Either a successful result, or one or more errors.
///
/// There's no implicit conversion into a [`Payload`]: construct it with
/// [`Payload::success()`] or the validating [`Payload::errors()`].
#[derive(Clone, Debug, PartialEq)]
pub enum Payload<T> {
    /// Successful result.
    Success(T),
    /// Non-empty list of errors.
    Errors(Vec<PayloadError>),
}

impl<T> Payload<T> {
    /// Wraps a successful result.
    pub fn success(value: T) -> Self {
        Self::Success(value)
    }

    /// Wraps a list of errors.
    ///
    /// # Errors
    ///
    /// If the list is empty, or any of the errors has an empty message.
    pub fn errors(errors: Vec<PayloadError>) -> Result<Self, PayloadConstructionError> {
        if errors.is_empty() {
            return Err(PayloadConstructionError::EmptyErrorList);
        }
        if let Some(pos) = errors.iter().position(|e| e.message.trim().is_empty()) {
            return Err(PayloadConstructionError::BlankMessage(pos));
        }
        Ok(Self::Errors(errors))
    }

    /// Checks whether this is a successful result.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Errors of this payload, empty for a successful one.
    pub fn error_list(&self) -> &[PayloadError] {
        match self {
            Self::Success(_) => &[],
            Self::Errors(e) => e,
        }
    }

    /// Maps the successful result.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Payload<U> {
        match self {
            Self::Success(v) => Payload::Success(f(v)),
            Self::Errors(e) => Payload::Errors(e),
        }
    }

    /// Converts this payload into the result of a field.
    ///
    /// Errors become a single [`FieldError`] with the first message, and
    /// every error listed under the `errors` extension.
    pub fn into_field_result(self) -> FieldResult<T> {
        match self {
            Self::Success(v) => Ok(v),
            Self::Errors(errors) => {
                let message = errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_default();
                let mut ext = Object::with_capacity(1);
                ext.add_field(
                    "errors",
                    Value::list(errors.iter().map(PayloadError::to_value).collect()),
                );
                Err(FieldError::new(message, Value::object(ext)))
            }
        }
    }
}

impl<T: Into<Value>> Payload<T> {
    /// Converts this payload into a value: the successful result itself, or
    /// an object listing the errors under `errors`.
    pub fn into_value(self) -> Value {
        match self {
            Self::Success(v) => v.into(),
            Self::Errors(errors) => {
                let mut obj = Object::with_capacity(1);
                obj.add_field(
                    "errors",
                    Value::list(errors.iter().map(PayloadError::to_value).collect()),
                );
                Value::object(obj)
            }
        }
    }
}
