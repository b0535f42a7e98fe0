//! Schema-first input: already parsed schema documents.
//!
//! Parsing the text of a schema is up to the caller. A [`SchemaDocument`]
//! holds its definitions and turns them into the same [`TypeDeclaration`]s
//! code-first declarations are made of, so both kinds of input merge freely.

use arcstr::ArcStr;

use crate::{
    ast::{Directive, InputValue, Type},
    schema::{
        declaration::{ArgumentDeclaration, FieldDeclaration, ResolverBinding, TypeDeclaration, TypeRef},
        meta::{EnumValue, TypeKind},
    },
};

/// Source of declarations for a [`GraphBuilder`](crate::GraphBuilder).
pub trait DocumentSource {
    /// Declarations this source contributes.
    fn declarations(&self) -> Vec<TypeDeclaration>;

    /// Root type names this source declares, if any.
    fn schema_roots(&self) -> SchemaRoots {
        SchemaRoots::default()
    }
}

/// Root operation types named by a `schema { ... }` definition.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SchemaRoots {
    /// Name of the query root type.
    pub query: Option<ArcStr>,
    /// Name of the mutation root type.
    pub mutation: Option<ArcStr>,
}

/// Top-level definition of a schema document.
#[derive(Clone, Debug)]
pub enum Definition {
    /// `schema { query: Q mutation: M }`
    Schema(SchemaRoots),
    /// `type T { ... }` and the other named type definitions.
    Type(TypeDefinition),
    /// `extend type T { ... }` and the other extensions.
    Extension(TypeDefinition),
}

/// Definition of a named type.
#[derive(Clone, Debug)]
pub struct TypeDefinition {
    kind: TypeKind,
    name: ArcStr,
    description: Option<ArcStr>,
    fields: Vec<FieldDefinition>,
    interfaces: Vec<ArcStr>,
    members: Vec<ArcStr>,
    values: Vec<EnumValueDefinition>,
    resolver_type: Option<ArcStr>,
}

impl TypeDefinition {
    /// Defines a type of the given `kind`.
    pub fn new(kind: TypeKind, name: impl Into<ArcStr>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: None,
            fields: vec![],
            interfaces: vec![],
            members: vec![],
            values: vec![],
            resolver_type: None,
        }
    }

    /// Sets the description of this type.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a field, or an input field of an input object.
    #[must_use]
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds an implemented interface.
    #[must_use]
    pub fn implements(mut self, interface: impl Into<ArcStr>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Adds a member of a union.
    #[must_use]
    pub fn member(mut self, member: impl Into<ArcStr>) -> Self {
        self.members.push(member.into());
        self
    }

    /// Adds a value of an enum.
    #[must_use]
    pub fn value(mut self, value: EnumValueDefinition) -> Self {
        self.values.push(value);
        self
    }

    /// Delegates every field of this type to the same-named member of the
    /// given resolver type.
    #[must_use]
    pub fn resolved_by(mut self, resolver_type: impl Into<ArcStr>) -> Self {
        self.resolver_type = Some(resolver_type.into());
        self
    }

    fn to_declaration(&self) -> TypeDeclaration {
        let mut decl = TypeDeclaration::new(self.kind, self.name.clone());
        decl.description = self.description.clone();
        decl.interfaces = self.interfaces.iter().map(|i| i.as_str().into()).collect();
        decl.members = self.members.iter().map(|m| m.as_str().into()).collect();
        decl.enum_values = self.values.iter().map(EnumValueDefinition::to_value).collect();
        decl.fields = self
            .fields
            .iter()
            .map(|f| {
                let field = f.to_declaration();
                match &self.resolver_type {
                    Some(rt) => field.binding(ResolverBinding::delegate(rt.clone(), f.name.clone())),
                    None => field,
                }
            })
            .collect();
        decl
    }
}

/// Definition of a field, e.g. `name(arg: Int = 1): String @deprecated`.
#[derive(Clone, Debug)]
pub struct FieldDefinition {
    name: ArcStr,
    description: Option<ArcStr>,
    field_type: Type,
    arguments: Vec<InputValueDefinition>,
    default_value: Option<InputValue>,
    directives: Vec<Directive>,
}

impl FieldDefinition {
    /// Defines a field of the given type.
    pub fn new(name: impl Into<ArcStr>, field_type: Type) -> Self {
        Self {
            name: name.into(),
            description: None,
            field_type,
            arguments: vec![],
            default_value: None,
            directives: vec![],
        }
    }

    /// Sets the description of this field.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds an argument.
    #[must_use]
    pub fn argument(mut self, argument: InputValueDefinition) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Sets the default value, for input fields.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<InputValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Applies a directive, e.g. `@deprecated(reason: "...")`.
    #[must_use]
    pub fn directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    fn to_declaration(&self) -> FieldDeclaration {
        let mut field = FieldDeclaration::new(self.name.clone()).of_type(TypeRef::from(&self.field_type));
        field.description = self.description.clone();
        field.default_value = self.default_value.clone();
        field.arguments = self
            .arguments
            .iter()
            .map(InputValueDefinition::to_declaration)
            .collect();
        if let Some(reason) = deprecation(&self.directives) {
            field = field.deprecated(reason);
        }
        field
    }
}

/// Definition of an argument, e.g. `first: Int = 10`.
#[derive(Clone, Debug)]
pub struct InputValueDefinition {
    name: ArcStr,
    description: Option<ArcStr>,
    value_type: Type,
    default_value: Option<InputValue>,
}

impl InputValueDefinition {
    /// Defines an argument of the given type.
    pub fn new(name: impl Into<ArcStr>, value_type: Type) -> Self {
        Self {
            name: name.into(),
            description: None,
            value_type,
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

    fn to_declaration(&self) -> ArgumentDeclaration {
        let mut arg = ArgumentDeclaration::new(self.name.clone(), TypeRef::from(&self.value_type));
        arg.description = self.description.clone();
        arg.default_value = self.default_value.clone();
        arg
    }
}

/// Definition of an enum value.
#[derive(Clone, Debug)]
pub struct EnumValueDefinition {
    name: ArcStr,
    description: Option<ArcStr>,
    directives: Vec<Directive>,
}

impl EnumValueDefinition {
    /// Defines an enum value.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            description: None,
            directives: vec![],
        }
    }

    /// Sets the description of this value.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Applies a directive, e.g. `@deprecated`.
    #[must_use]
    pub fn directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    fn to_value(&self) -> EnumValue {
        let mut value = EnumValue::new(self.name.clone());
        value.description = self.description.clone();
        if let Some(reason) = deprecation(&self.directives) {
            value = value.deprecated(reason);
        }
        value
    }
}

/// Returns the reason of a `@deprecated` directive, if one is applied.
fn deprecation(directives: &[Directive]) -> Option<Option<&str>> {
    directives
        .iter()
        .find(|d| d.name == "deprecated")
        .map(|d| d.argument("reason").and_then(InputValue::as_string_value))
}

/// Parsed schema document.
///
/// Extensions are declared the same way as the types they extend, and are
/// merged with them when registered.
#[derive(Clone, Debug, Default)]
pub struct SchemaDocument {
    definitions: Vec<Definition>,
}

impl SchemaDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a definition.
    #[must_use]
    pub fn definition(mut self, definition: Definition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Adds a type definition.
    #[must_use]
    pub fn type_definition(self, definition: TypeDefinition) -> Self {
        self.definition(Definition::Type(definition))
    }

    /// Adds a type extension.
    #[must_use]
    pub fn extension(self, definition: TypeDefinition) -> Self {
        self.definition(Definition::Extension(definition))
    }

    /// Definitions of this document, in order.
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }
}

impl DocumentSource for SchemaDocument {
    fn declarations(&self) -> Vec<TypeDeclaration> {
        self.definitions
            .iter()
            .filter_map(|d| match d {
                Definition::Type(t) | Definition::Extension(t) => Some(t.to_declaration()),
                Definition::Schema(_) => None,
            })
            .collect()
    }

    fn schema_roots(&self) -> SchemaRoots {
        self.definitions
            .iter()
            .fold(SchemaRoots::default(), |mut acc, d| {
                if let Definition::Schema(r) = d {
                    acc.query = r.query.clone().or(acc.query);
                    acc.mutation = r.mutation.clone().or(acc.mutation);
                }
                acc
            })
    }
}
