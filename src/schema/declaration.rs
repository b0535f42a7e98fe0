//! Declarations contributed to a [`GraphBuilder`](crate::GraphBuilder).
//!
//! A declaration describes a type partially: any mix of explicit fields,
//! a [`ShapeDescriptor`] to infer fields from, and a [`NameSource`] that may
//! depend on the names of other types. Declarations sharing an identity
//! token are merged before completion.

use std::{fmt, sync::Arc};

use arcstr::ArcStr;
use derive_more::with_trait::{Display, From};

use crate::{
    ast::{InputValue, Type},
    resolve::{Resolver, Thunk, middleware::Middleware},
    schema::{
        error::BuildError,
        meta::{DeprecationStatus, EnumValue, TypeKind, TypeResolver},
        shape::ShapeDescriptor,
    },
    value::Value,
};

/// Opaque identity token of a type.
///
/// Declarations with equal keys describe the same type and are merged.
#[derive(Clone, Debug, Display, Eq, From, Hash, Ord, PartialEq, PartialOrd)]
pub struct TypeKey(ArcStr);

impl TypeKey {
    /// Creates a new [`TypeKey`].
    pub fn new(key: impl Into<ArcStr>) -> Self {
        Self(key.into())
    }

    /// Returns the string representation of this key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TypeKey {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<String> for TypeKey {
    fn from(s: String) -> Self {
        Self(s.into())
    }
}

/// Stable handle of a registered declaration.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("#{_0}")]
pub struct TypeHandle(pub(crate) usize);

impl TypeHandle {
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// Function composing a type name out of its dependencies' final names.
pub type NameComposer = Arc<dyn Fn(&[&str]) -> String + Send + Sync>;

/// Where the final name of a type comes from.
#[derive(Clone)]
pub enum NameSource {
    /// The name is known upfront.
    Literal(ArcStr),

    /// The name is a function of the final names of other types, e.g.
    /// `UserConnection` composed out of `User`.
    Derived {
        /// Types whose names are required, in the order passed to `compose`.
        dependencies: Vec<TypeKey>,
        /// Composition function.
        compose: NameComposer,
    },
}

impl NameSource {
    /// Name dependencies of this source.
    pub fn dependencies(&self) -> &[TypeKey] {
        match self {
            Self::Literal(_) => &[],
            Self::Derived { dependencies, .. } => dependencies,
        }
    }
}

impl fmt::Debug for NameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(n) => f.debug_tuple("Literal").field(n).finish(),
            Self::Derived { dependencies, .. } => f
                .debug_struct("Derived")
                .field("dependencies", dependencies)
                .finish_non_exhaustive(),
        }
    }
}

/// Possibly-unresolved reference to a type.
///
/// Names only become known during completion, so references are made by
/// [`TypeKey`] and closed into [`Type`]s later.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum TypeRef {
    /// Nullable reference to a named type.
    Named(TypeKey),
    /// Nullable list of the inner type.
    List(Box<TypeRef>),
    /// Non-null wrapper of the inner type.
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// Nullable reference to the type with the given `key`.
    pub fn named(key: impl Into<TypeKey>) -> Self {
        Self::Named(key.into())
    }

    /// Nullable list of `item`s.
    pub fn list(item: Self) -> Self {
        Self::List(Box::new(item))
    }

    /// Wraps this reference into a non-null wrapper, unless it's already
    /// non-null.
    #[must_use]
    pub fn non_null(self) -> Self {
        match self {
            nn @ Self::NonNull(_) => nn,
            t => Self::NonNull(Box::new(t)),
        }
    }

    /// Strips the outermost non-null wrapper, if any.
    #[must_use]
    pub fn into_nullable(self) -> Self {
        match self {
            Self::NonNull(inner) => *inner,
            t => t,
        }
    }

    /// Returns the key of the innermost named type.
    pub fn innermost_key(&self) -> &TypeKey {
        match self {
            Self::Named(k) => k,
            Self::List(t) | Self::NonNull(t) => t.innermost_key(),
        }
    }
}

impl From<&Type> for TypeRef {
    fn from(ty: &Type) -> Self {
        match ty {
            Type::Named(n) => Self::Named(TypeKey(n.clone())),
            Type::NonNullNamed(n) => Self::Named(TypeKey(n.clone())).non_null(),
            Type::List(t) => Self::list(t.as_ref().into()),
            Type::NonNullList(t) => Self::list(t.as_ref().into()).non_null(),
        }
    }
}

/// Delegation of a field to a member of a separately declared
/// [`ResolverType`](crate::ResolverType).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Delegation {
    /// Name of the resolver type.
    pub resolver_type: ArcStr,
    /// Member of the resolver type doing the work.
    pub member: ArcStr,
    /// Argument the parent value is passed under, if the member needs it.
    pub parent_parameter: Option<ArcStr>,
}

/// How a field obtains its value.
#[derive(Clone, Default)]
pub enum ResolverBinding {
    /// Nothing declared explicitly, the field is backed by the parent's
    /// shape member, if any.
    #[default]
    Unbound,
    /// Always the same value.
    Constant(Value),
    /// Zero-argument function.
    Thunk(Thunk),
    /// Context-aware function.
    Function(Resolver),
    /// Member of a resolver type.
    Delegate(Delegation),
}

impl ResolverBinding {
    /// Checks whether anything is bound explicitly.
    pub fn is_bound(&self) -> bool {
        !matches!(self, Self::Unbound)
    }

    /// Binds the field to a member of the given resolver type.
    pub fn delegate(resolver_type: impl Into<ArcStr>, member: impl Into<ArcStr>) -> Self {
        Self::Delegate(Delegation {
            resolver_type: resolver_type.into(),
            member: member.into(),
            parent_parameter: None,
        })
    }
}

impl fmt::Debug for ResolverBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbound => f.write_str("Unbound"),
            Self::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            Self::Thunk(_) => f.write_str("Thunk"),
            Self::Function(r) => f.debug_tuple("Function").field(r).finish(),
            Self::Delegate(d) => f.debug_tuple("Delegate").field(d).finish(),
        }
    }
}

/// Argument of a declared field.
#[derive(Clone, Debug, PartialEq)]
pub struct ArgumentDeclaration {
    pub(crate) name: ArcStr,
    pub(crate) description: Option<ArcStr>,
    pub(crate) arg_type: Option<TypeRef>,
    pub(crate) type_literal: Option<String>,
    pub(crate) default_value: Option<InputValue>,
}

impl ArgumentDeclaration {
    /// Declares an argument of the given type.
    pub fn new(name: impl Into<ArcStr>, arg_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            arg_type: Some(arg_type),
            type_literal: None,
            default_value: None,
        }
    }

    /// Declares an argument typed by a literal like `[Int!]`.
    ///
    /// The literal is parsed during completion, and overrides any other type.
    pub fn literal(name: impl Into<ArcStr>, literal: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            arg_type: None,
            type_literal: Some(literal.into()),
            default_value: None,
        }
    }

    /// Sets the description of this argument.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the value used when the argument is omitted.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<InputValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Name of this argument.
    pub fn name(&self) -> &ArcStr {
        &self.name
    }
}

/// Explicitly declared field, or input field of an input object.
#[derive(Clone, Debug)]
pub struct FieldDeclaration {
    pub(crate) name: ArcStr,
    pub(crate) description: Option<ArcStr>,
    pub(crate) field_type: Option<TypeRef>,
    pub(crate) type_literal: Option<String>,
    pub(crate) arguments: Vec<ArgumentDeclaration>,
    pub(crate) binding: ResolverBinding,
    pub(crate) deprecation: Option<DeprecationStatus>,
    pub(crate) default_value: Option<InputValue>,
    pub(crate) ignored: bool,
    pub(crate) middleware: Vec<Arc<dyn Middleware>>,
}

impl FieldDeclaration {
    /// Declares a field with the given `name` and nothing else.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            description: None,
            field_type: None,
            type_literal: None,
            arguments: vec![],
            binding: ResolverBinding::Unbound,
            deprecation: None,
            default_value: None,
            ignored: false,
            middleware: vec![],
        }
    }

    /// Name of this field.
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// Sets the result type of this field.
    #[must_use]
    pub fn of_type(mut self, field_type: TypeRef) -> Self {
        self.field_type = Some(field_type);
        self
    }

    /// Sets the result type of this field via a literal like `[Int!]`.
    #[must_use]
    pub fn of_type_literal(mut self, literal: impl Into<String>) -> Self {
        self.type_literal = Some(literal.into());
        self
    }

    /// Sets the description of this field.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds an argument to this field.
    #[must_use]
    pub fn argument(mut self, argument: ArgumentDeclaration) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Binds this field to the provided [`ResolverBinding`].
    #[must_use]
    pub fn binding(mut self, binding: ResolverBinding) -> Self {
        self.binding = binding;
        self
    }

    /// Resolves this field with the provided [`Resolver`].
    #[must_use]
    pub fn resolver(self, resolver: Resolver) -> Self {
        self.binding(ResolverBinding::Function(resolver))
    }

    /// Resolves this field to the same `value` every time.
    #[must_use]
    pub fn constant(self, value: impl Into<Value>) -> Self {
        self.binding(ResolverBinding::Constant(value.into()))
    }

    /// Resolves this field by calling the provided zero-argument function.
    #[must_use]
    pub fn thunk(
        self,
        f: impl Fn() -> crate::FieldResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.binding(ResolverBinding::Thunk(Thunk::new(f)))
    }

    /// Delegates this field to a member of a resolver type.
    #[must_use]
    pub fn delegate(self, resolver_type: impl Into<ArcStr>, member: impl Into<ArcStr>) -> Self {
        self.binding(ResolverBinding::delegate(resolver_type, member))
    }

    /// Passes the parent value to the delegated member as the argument
    /// `param`.
    ///
    /// Has no effect unless this field delegates.
    #[must_use]
    pub fn with_parent(mut self, param: impl Into<ArcStr>) -> Self {
        if let ResolverBinding::Delegate(d) = &mut self.binding {
            d.parent_parameter = Some(param.into());
        }
        self
    }

    /// Marks this field as deprecated with an optional `reason`.
    #[must_use]
    pub fn deprecated(mut self, reason: Option<&str>) -> Self {
        self.deprecation = Some(DeprecationStatus::Deprecated(reason.map(Into::into)));
        self
    }

    /// Sets the default value of an input field.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<InputValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Excludes this field, along with any inferred field of the same name.
    #[must_use]
    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Adds a middleware stage to this field.
    ///
    /// Stages run in the order they are added, outermost first.
    #[must_use]
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Merges a later declaration of the same field into this one.
    ///
    /// Attributes set by `later` win, `ignored` flags are combined, and
    /// middleware lists are concatenated.
    pub(crate) fn merge(&mut self, later: Self) {
        let Self {
            name: _,
            description,
            field_type,
            type_literal,
            arguments,
            binding,
            deprecation,
            default_value,
            ignored,
            middleware,
        } = later;

        if description.is_some() {
            self.description = description;
        }
        if field_type.is_some() || type_literal.is_some() {
            self.field_type = field_type;
            self.type_literal = type_literal;
        }
        if !arguments.is_empty() {
            self.arguments = arguments;
        }
        if binding.is_bound() {
            self.binding = binding;
        }
        if deprecation.is_some() {
            self.deprecation = deprecation;
        }
        if default_value.is_some() {
            self.default_value = default_value;
        }
        self.ignored |= ignored;
        self.middleware.extend(middleware);
    }

    /// Fills attributes unset on this explicit declaration from an inferred
    /// one.
    pub(crate) fn fill_from(&mut self, inferred: Self) {
        if self.description.is_none() {
            self.description = inferred.description;
        }
        if self.default_value.is_none() {
            self.default_value = inferred.default_value;
        }
    }
}

/// Partial description of a named type.
#[derive(Clone, Debug)]
pub struct TypeDeclaration {
    pub(crate) key: TypeKey,
    pub(crate) kind: TypeKind,
    pub(crate) name: NameSource,
    pub(crate) description: Option<ArcStr>,
    pub(crate) fields: Vec<FieldDeclaration>,
    pub(crate) interfaces: Vec<TypeKey>,
    pub(crate) members: Vec<TypeKey>,
    pub(crate) enum_values: Vec<EnumValue>,
    pub(crate) shape: Option<ShapeDescriptor>,
    pub(crate) type_resolver: Option<TypeResolver>,
}

impl TypeDeclaration {
    /// Declares a type of the given `kind`, keyed and named by `name`.
    pub fn new(kind: TypeKind, name: impl Into<ArcStr>) -> Self {
        let name = name.into();
        Self {
            key: TypeKey(name.clone()),
            kind,
            name: NameSource::Literal(name),
            description: None,
            fields: vec![],
            interfaces: vec![],
            members: vec![],
            enum_values: vec![],
            shape: None,
            type_resolver: None,
        }
    }

    /// Declares an object type.
    pub fn object(name: impl Into<ArcStr>) -> Self {
        Self::new(TypeKind::Object, name)
    }

    /// Declares an interface type.
    pub fn interface(name: impl Into<ArcStr>) -> Self {
        Self::new(TypeKind::Interface, name)
    }

    /// Declares an input object type.
    pub fn input_object(name: impl Into<ArcStr>) -> Self {
        Self::new(TypeKind::InputObject, name)
    }

    /// Declares a union type.
    pub fn union(name: impl Into<ArcStr>) -> Self {
        Self::new(TypeKind::Union, name)
    }

    /// Declares an enum type.
    pub fn enumeration(name: impl Into<ArcStr>) -> Self {
        Self::new(TypeKind::Enum, name)
    }

    /// Declares a custom scalar type.
    pub fn scalar(name: impl Into<ArcStr>) -> Self {
        Self::new(TypeKind::Scalar, name)
    }

    /// Replaces the identity token of this declaration.
    ///
    /// The name stays as it is.
    #[must_use]
    pub fn keyed(mut self, key: impl Into<TypeKey>) -> Self {
        self.key = key.into();
        self
    }

    /// Sets a literal final name, independent of the key.
    #[must_use]
    pub fn named(mut self, name: impl Into<ArcStr>) -> Self {
        self.name = NameSource::Literal(name.into());
        self
    }

    /// Derives the final name from the final names of `dependencies`.
    #[must_use]
    pub fn derived_name(
        mut self,
        dependencies: Vec<TypeKey>,
        compose: impl Fn(&[&str]) -> String + Send + Sync + 'static,
    ) -> Self {
        self.name = NameSource::Derived {
            dependencies,
            compose: Arc::new(compose),
        };
        self
    }

    /// Sets the description of this type.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds an explicit field.
    #[must_use]
    pub fn field(mut self, field: FieldDeclaration) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds an interface this type implements.
    #[must_use]
    pub fn implements(mut self, interface: impl Into<TypeKey>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Adds a member of this union.
    #[must_use]
    pub fn member(mut self, member: impl Into<TypeKey>) -> Self {
        self.members.push(member.into());
        self
    }

    /// Adds a value of this enum.
    #[must_use]
    pub fn value(mut self, value: EnumValue) -> Self {
        self.enum_values.push(value);
        self
    }

    /// Sets the shape this type's fields are inferred from.
    #[must_use]
    pub fn shape(mut self, shape: ShapeDescriptor) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Sets how concrete types of an abstract type's values are picked.
    ///
    /// Without one, a `__typename` entry of the value is used.
    #[must_use]
    pub fn resolve_type(
        mut self,
        resolver: impl Fn(&Value) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.type_resolver = Some(TypeResolver::new(resolver));
        self
    }

    /// Identity token of this declaration.
    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    /// Kind of the declared type.
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Where the final name comes from.
    pub fn name_source(&self) -> &NameSource {
        &self.name
    }

    /// Merges a later declaration of the same type into this one.
    ///
    /// Fields merge by name, with attributes of `later` winning. Interfaces,
    /// union members and enum values are unioned. Declarations of different
    /// kinds can't be merged.
    pub(crate) fn merge(&mut self, later: Self) -> Result<(), BuildError> {
        if later.kind != self.kind {
            return Err(BuildError::KindConflict {
                key: self.key.clone(),
                first: self.kind,
                second: later.kind,
            });
        }

        // A literal equal to the key is just the default naming.
        let explicitly_named = match &later.name {
            NameSource::Literal(n) => n.as_str() != later.key.as_str(),
            NameSource::Derived { .. } => true,
        };
        if explicitly_named {
            self.name = later.name;
        }
        if later.description.is_some() {
            self.description = later.description;
        }
        for field in later.fields {
            match self.fields.iter_mut().rev().find(|f| f.name == field.name) {
                Some(existing) => existing.merge(field),
                None => self.fields.push(field),
            }
        }
        for i in later.interfaces {
            if !self.interfaces.contains(&i) {
                self.interfaces.push(i);
            }
        }
        for m in later.members {
            if !self.members.contains(&m) {
                self.members.push(m);
            }
        }
        for v in later.enum_values {
            match self.enum_values.iter_mut().find(|e| e.name == v.name) {
                Some(existing) => *existing = v,
                None => self.enum_values.push(v),
            }
        }
        if later.shape.is_some() {
            self.shape = later.shape;
        }
        if later.type_resolver.is_some() {
            self.type_resolver = later.type_resolver;
        }
        Ok(())
    }
}
