//! Binding of supplied arguments to the declared ones.

use std::sync::Arc;

use arcstr::ArcStr;
use indexmap::IndexMap;

use crate::{
    ast::{FromInputValue, InputValue, Type, Variables},
    executor::{FieldError, FieldResult},
    schema::{
        meta::{CompletedArgument, CompletedField, TypeKind},
        model::TypeGraph,
    },
    value::DefaultScalarValue,
};

/// Arguments of a field, coerced to their declared types.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Arguments {
    args: Arc<IndexMap<ArcStr, InputValue>>,
}

impl Arguments {
    /// Reads and converts the argument `name`.
    ///
    /// An absent argument converts as an implicit `null`.
    ///
    /// # Errors
    ///
    /// If the argument can't be converted into `T`.
    pub fn get<T: FromInputValue>(&self, name: &str) -> FieldResult<T> {
        match self.args.get(name) {
            Some(v) => T::from_input_value(v),
            None => T::from_implicit_null(),
        }
        .map_err(|e| FieldError::from(format!("Argument `{name}`: {e}")))
    }

    /// Returns the raw value of the argument `name`, if present.
    pub fn get_input_value(&self, name: &str) -> Option<&InputValue> {
        self.args.get(name)
    }

    /// Checks whether the argument `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.args.contains_key(name)
    }

    /// Iterates over all the present arguments.
    pub fn iter(&self) -> impl Iterator<Item = (&ArcStr, &InputValue)> {
        self.args.iter()
    }

    /// Returns these arguments with `name` set to `value`.
    #[must_use]
    pub fn with(mut self, name: ArcStr, value: InputValue) -> Self {
        Arc::make_mut(&mut self.args).insert(name, value);
        self
    }
}

impl FromIterator<(ArcStr, InputValue)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (ArcStr, InputValue)>>(iter: I) -> Self {
        Self {
            args: Arc::new(iter.into_iter().collect()),
        }
    }
}

/// Binds the `supplied` arguments of a selection to the `field`'s declared
/// ones.
///
/// Variables are substituted, omitted arguments fall back to their defaults,
/// and every value is coerced to its declared type.
pub(crate) fn bind(
    field: &CompletedField,
    supplied: &[(ArcStr, InputValue)],
    vars: &Variables,
    graph: &TypeGraph,
) -> FieldResult<Arguments> {
    if let Some((name, _)) = supplied
        .iter()
        .find(|(name, _)| field.argument_by_name(name).is_none())
    {
        return Err(format!("Unknown argument `{name}` on field `{}`", field.name()).into());
    }

    let mut bound = IndexMap::with_capacity(field.arguments.len());
    for arg in field.arguments() {
        let provided = supplied
            .iter()
            .find(|(name, _)| name == arg.name())
            .and_then(|(_, v)| v.clone().into_const(vars));
        let value = match (provided, arg.default_value()) {
            (Some(v), _) => coerce_input(arg.arg_type(), v, graph)
                .map_err(|e| format!("Invalid value for argument `{}`: {e}", arg.name()))?,
            (None, Some(default)) => default.clone(),
            (None, None) if arg.arg_type().is_non_null() => {
                return Err(missing(arg).into());
            }
            (None, None) => continue,
        };
        bound.insert(arg.name().clone(), value);
    }
    Ok(Arguments {
        args: Arc::new(bound),
    })
}

fn missing(arg: &CompletedArgument) -> String {
    format!(
        "Missing required argument `{}` of type `{}`",
        arg.name(),
        arg.arg_type(),
    )
}

/// Coerces a constant `value` to the input type `ty`.
pub(crate) fn coerce_input(ty: &Type, value: InputValue, graph: &TypeGraph) -> Result<InputValue, String> {
    if value.is_null() {
        return if ty.is_non_null() {
            Err(format!("Expected `{ty}`, found null"))
        } else {
            Ok(InputValue::Null)
        };
    }

    match ty {
        Type::List(item) | Type::NonNullList(item) => match value {
            InputValue::List(items) => items
                .into_iter()
                .map(|v| coerce_input(item, v, graph))
                .collect::<Result<_, _>>()
                .map(InputValue::List),
            single => Ok(InputValue::List(vec![coerce_input(item, single, graph)?])),
        },
        Type::Named(name) | Type::NonNullNamed(name) => {
            let meta = graph
                .type_by_name(name)
                .ok_or_else(|| format!("Unknown type `{name}`"))?;
            match meta.kind() {
                TypeKind::Scalar => coerce_scalar(name, value),
                TypeKind::Enum => {
                    let variant = match &value {
                        InputValue::Enum(e) => Some(e.as_str()),
                        v => v.as_string_value(),
                    };
                    match variant {
                        Some(v) if meta.has_enum_value(v) => Ok(InputValue::Enum(v.into())),
                        _ => Err(format!("Invalid value `{value}` for enum `{name}`")),
                    }
                }
                TypeKind::InputObject => {
                    let InputValue::Object(mut fields) = value else {
                        return Err(format!("Expected input object `{name}`, found `{value}`"));
                    };
                    if let Some(unknown) = fields
                        .keys()
                        .find(|k| meta.input_field_by_name(k).is_none())
                    {
                        return Err(format!("Unknown field `{unknown}` of input object `{name}`"));
                    }
                    let mut coerced = IndexMap::with_capacity(meta.input_fields.len());
                    for field in meta.input_fields() {
                        match (fields.shift_remove(field.name().as_str()), field.default_value()) {
                            (Some(v), _) => {
                                let v = coerce_input(field.arg_type(), v, graph)
                                    .map_err(|e| format!("In field `{}`: {e}", field.name()))?;
                                coerced.insert(field.name().to_string(), v);
                            }
                            (None, Some(default)) => {
                                coerced.insert(field.name().to_string(), default.clone());
                            }
                            (None, None) if field.arg_type().is_non_null() => {
                                return Err(missing(field));
                            }
                            (None, None) => {}
                        }
                    }
                    Ok(InputValue::Object(coerced))
                }
                kind => Err(format!("Type `{name}` of kind {kind} is not an input type")),
            }
        }
    }
}

fn coerce_scalar(name: &str, value: InputValue) -> Result<InputValue, String> {
    let mismatch = |v: &InputValue| format!("Expected `{name}`, found `{v}`");
    let InputValue::Scalar(s) = &value else {
        // Custom scalars accept any constant structure.
        return if is_builtin_scalar(name) {
            Err(mismatch(&value))
        } else {
            Ok(value)
        };
    };
    let coerced = match (name, s) {
        ("Int", DefaultScalarValue::Int(_))
        | ("Float", DefaultScalarValue::Float(_))
        | ("String", DefaultScalarValue::String(_))
        | ("Boolean", DefaultScalarValue::Boolean(_))
        | ("ID", DefaultScalarValue::String(_)) => s.clone(),
        ("Float", DefaultScalarValue::Int(i)) => DefaultScalarValue::Float(f64::from(*i)),
        ("ID", DefaultScalarValue::Int(i)) => DefaultScalarValue::String(i.to_string()),
        (n, _) if !is_builtin_scalar(n) => s.clone(),
        _ => return Err(mismatch(&value)),
    };
    Ok(InputValue::Scalar(coerced))
}

fn is_builtin_scalar(name: &str) -> bool {
    crate::schema::meta::BUILTIN_SCALARS.contains(&name)
}
