//! Types used to describe a completed type graph.

use std::{fmt, sync::Arc};

use arcstr::ArcStr;
use derive_more::with_trait::Display;
use indexmap::IndexMap;

use crate::{
    ast::{InputValue, Type},
    resolve::middleware::Pipeline,
    value::Value,
};

/// Kind of a named type, as reported by introspection.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum TypeKind {
    /// Leaf value with a custom or built-in representation.
    #[display("SCALAR")]
    Scalar,
    /// Composite type with resolvable fields.
    #[display("OBJECT")]
    Object,
    /// Abstract type declaring fields its implementers must provide.
    #[display("INTERFACE")]
    Interface,
    /// Abstract type standing for one of several object types.
    #[display("UNION")]
    Union,
    /// Leaf type with a fixed set of values.
    #[display("ENUM")]
    Enum,
    /// Composite type usable in input positions only.
    #[display("INPUT_OBJECT")]
    InputObject,
}

impl TypeKind {
    /// Returns `true` for types that can occur in leaf positions.
    pub fn is_leaf(self) -> bool {
        matches!(self, Self::Scalar | Self::Enum)
    }

    /// Returns `true` for objects, interfaces and unions.
    pub fn is_composite(self) -> bool {
        matches!(self, Self::Object | Self::Interface | Self::Union)
    }

    /// Returns `true` for interfaces and unions.
    pub fn is_abstract(self) -> bool {
        matches!(self, Self::Interface | Self::Union)
    }

    /// Returns `true` for types usable as arguments and input fields.
    pub fn is_input(self) -> bool {
        matches!(self, Self::Scalar | Self::Enum | Self::InputObject)
    }

    /// Returns `true` for types usable as field results.
    pub fn is_output(self) -> bool {
        !matches!(self, Self::InputObject)
    }
}

/// Whether an item is deprecated, with context.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum DeprecationStatus {
    /// The field/variant is not deprecated.
    #[default]
    Current,
    /// The field/variant is deprecated, with an optional reason.
    Deprecated(Option<ArcStr>),
}

impl DeprecationStatus {
    /// If this deprecation status indicates the item is deprecated.
    pub fn is_deprecated(&self) -> bool {
        match self {
            Self::Current => false,
            Self::Deprecated(_) => true,
        }
    }

    /// An optional reason for the deprecation, or none if `Current`.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Current => None,
            Self::Deprecated(rsn) => rsn.as_deref(),
        }
    }
}

/// Metadata for a single value in an enum.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnumValue {
    /// The name of the enum value.
    ///
    /// This is the string literal representation of the enum in responses.
    pub name: ArcStr,
    /// The optional description of the enum value.
    pub description: Option<ArcStr>,
    /// Whether the value is deprecated or not, with an optional reason.
    pub deprecation_status: DeprecationStatus,
}

impl EnumValue {
    /// Constructs a new [`EnumValue`] with the provided `name`.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            description: None,
            deprecation_status: DeprecationStatus::Current,
        }
    }

    /// Sets the `description` of this [`EnumValue`].
    ///
    /// Overwrites any previously set description.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets this [`EnumValue`] as deprecated with an optional `reason`.
    ///
    /// Overwrites any previously set deprecation reason.
    #[must_use]
    pub fn deprecated(mut self, reason: Option<&str>) -> Self {
        self.deprecation_status = DeprecationStatus::Deprecated(reason.map(Into::into));
        self
    }
}

/// Function picking the concrete object type name of a value of an abstract
/// type.
#[derive(Clone)]
pub struct TypeResolver(Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>);

impl TypeResolver {
    /// Wraps the provided function into a [`TypeResolver`].
    pub fn new(f: impl Fn(&Value) -> Option<String> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn resolve(&self, value: &Value) -> Option<String> {
        (self.0)(value)
    }
}

impl fmt::Debug for TypeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TypeResolver")
    }
}

/// Metadata for an argument of a field, or a field of an input object.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletedArgument {
    pub(crate) name: ArcStr,
    pub(crate) description: Option<ArcStr>,
    pub(crate) arg_type: Type,
    pub(crate) default_value: Option<InputValue>,
}

impl CompletedArgument {
    /// Final name of this argument.
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// Description of this argument, if any.
    pub fn description(&self) -> Option<&ArcStr> {
        self.description.as_ref()
    }

    /// Closed type of this argument.
    pub fn arg_type(&self) -> &Type {
        &self.arg_type
    }

    /// Value used when the argument is omitted.
    pub fn default_value(&self) -> Option<&InputValue> {
        self.default_value.as_ref()
    }
}

/// Metadata for a completed field.
#[derive(Clone, Debug)]
pub struct CompletedField {
    pub(crate) name: ArcStr,
    pub(crate) description: Option<ArcStr>,
    pub(crate) arguments: IndexMap<ArcStr, CompletedArgument>,
    pub(crate) field_type: Type,
    pub(crate) deprecation_status: DeprecationStatus,
    pub(crate) pipeline: Option<Pipeline>,
}

impl CompletedField {
    /// Final name of this field.
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// Description of this field, if any.
    pub fn description(&self) -> Option<&ArcStr> {
        self.description.as_ref()
    }

    /// Arguments of this field, in declaration order.
    pub fn arguments(&self) -> impl Iterator<Item = &CompletedArgument> {
        self.arguments.values()
    }

    /// Looks up an argument by its name.
    pub fn argument_by_name(&self, name: &str) -> Option<&CompletedArgument> {
        self.arguments.get(name)
    }

    /// Closed result type of this field.
    pub fn field_type(&self) -> &Type {
        &self.field_type
    }

    /// Deprecation state of this field.
    pub fn deprecation_status(&self) -> &DeprecationStatus {
        &self.deprecation_status
    }

    /// Compiled middleware pipeline of this field.
    ///
    /// Only object fields carry one; interface fields are resolved through
    /// the concrete object type.
    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.pipeline.as_ref()
    }

    /// Returns true if the field is built-in to GraphQL.
    pub fn is_builtin(&self) -> bool {
        // "used exclusively by GraphQL’s introspection system"
        self.name.starts_with("__")
    }
}

/// Immutable metadata of a named type in a frozen graph.
#[derive(Clone, Debug)]
pub struct CompletedType {
    pub(crate) name: ArcStr,
    pub(crate) kind: TypeKind,
    pub(crate) description: Option<ArcStr>,
    pub(crate) fields: IndexMap<ArcStr, CompletedField>,
    pub(crate) input_fields: IndexMap<ArcStr, CompletedArgument>,
    pub(crate) interface_names: Vec<ArcStr>,
    pub(crate) possible_types: Vec<ArcStr>,
    pub(crate) enum_values: Vec<EnumValue>,
    pub(crate) type_resolver: Option<TypeResolver>,
}

impl CompletedType {
    /// Final name of this type.
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// Kind of this type.
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Description of this type, if any.
    pub fn description(&self) -> Option<&ArcStr> {
        self.description.as_ref()
    }

    /// Fields of an object or interface type, in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &CompletedField> {
        self.fields.values()
    }

    /// Accesses a field's metadata given its name.
    ///
    /// Only objects and interfaces have fields. This method always returns
    /// [`None`] for other types.
    pub fn field_by_name(&self, name: &str) -> Option<&CompletedField> {
        self.fields.get(name)
    }

    /// Fields of an input object type, in insertion order.
    pub fn input_fields(&self) -> impl Iterator<Item = &CompletedArgument> {
        self.input_fields.values()
    }

    /// Accesses an input field's metadata given its name.
    pub fn input_field_by_name(&self, name: &str) -> Option<&CompletedArgument> {
        self.input_fields.get(name)
    }

    /// Names of the interfaces this type implements.
    pub fn interface_names(&self) -> &[ArcStr] {
        &self.interface_names
    }

    /// Names of the member types of a union.
    pub fn possible_type_names(&self) -> &[ArcStr] {
        &self.possible_types
    }

    /// Values of an enum type.
    pub fn enum_values(&self) -> &[EnumValue] {
        &self.enum_values
    }

    /// Checks whether `name` is one of the values of this enum type.
    pub fn has_enum_value(&self, name: &str) -> bool {
        self.enum_values.iter().any(|v| v.name == name)
    }

    /// Returns true if the type is built-in to GraphQL.
    pub fn is_builtin(&self) -> bool {
        // "used exclusively by GraphQL’s introspection system"
        self.name.starts_with("__") || BUILTIN_SCALARS.contains(&self.name.as_str())
    }
}

/// Names of the scalars every graph provides.
///
/// See <https://spec.graphql.org/October2021#sec-Scalars>.
pub const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];
