//! Structural descriptions of the host values that fields are inferred from.

use arcstr::ArcStr;

use crate::{
    ast::InputValue,
    schema::declaration::{FieldDeclaration, TypeKey, TypeRef},
    util::to_camel_case,
    value::Value,
};

/// Type of a shape member, as seen by the host.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MemberType {
    /// Maps to `Boolean!`.
    Bool,
    /// Maps to `Int!`.
    Int,
    /// Maps to `Float!`.
    Float,
    /// Maps to `String!`.
    String,
    /// Single character, maps to `String!`.
    Char,
    /// Identifier, maps to `ID!`.
    Id,
    /// Optional value, strips the non-null wrapper of the inner mapping.
    Option(Box<MemberType>),
    /// Sequence, maps to `[T]!`.
    Vec(Box<MemberType>),
    /// Another declared type, maps to `T!`.
    Named(TypeKey),
    /// Deferred value, maps to whatever the inner type maps to.
    Future(Box<MemberType>),
    /// Dynamically typed value that maps to nothing in particular.
    Dynamic,
}

impl MemberType {
    /// Wraps the `inner` type into an [`MemberType::Option`].
    pub fn option(inner: Self) -> Self {
        Self::Option(Box::new(inner))
    }

    /// Wraps the `inner` type into a [`MemberType::Vec`].
    pub fn vec(inner: Self) -> Self {
        Self::Vec(Box::new(inner))
    }

    /// Wraps the `inner` type into a [`MemberType::Future`].
    pub fn future(inner: Self) -> Self {
        Self::Future(Box::new(inner))
    }

    /// References another declared type.
    pub fn named(key: impl Into<TypeKey>) -> Self {
        Self::Named(key.into())
    }

    /// Maps this host type onto a type reference.
    ///
    /// Returns [`None`] for [`MemberType::Dynamic`] (and anything containing
    /// it), as no mapping is unambiguous there.
    pub fn to_type_ref(&self) -> Option<TypeRef> {
        let scalar = |name: &str| Some(TypeRef::named(name).non_null());
        match self {
            Self::Bool => scalar("Boolean"),
            Self::Int => scalar("Int"),
            Self::Float => scalar("Float"),
            Self::String | Self::Char => scalar("String"),
            Self::Id => scalar("ID"),
            Self::Option(inner) => inner.to_type_ref().map(TypeRef::into_nullable),
            Self::Vec(inner) => Some(TypeRef::list(inner.to_type_ref()?).non_null()),
            Self::Named(key) => Some(TypeRef::Named(key.clone()).non_null()),
            Self::Future(inner) => inner.to_type_ref(),
            Self::Dynamic => None,
        }
    }
}

/// Which directions a member can be accessed in.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MemberAccess {
    /// Readable and writable.
    #[default]
    ReadWrite,
    /// Readable only.
    ReadOnly,
    /// Writable only, never inferred as a field.
    WriteOnly,
}

/// Member of a [`ShapeDescriptor`].
#[derive(Clone, Debug, PartialEq)]
pub struct MemberDescriptor {
    pub(crate) name: ArcStr,
    pub(crate) member_type: MemberType,
    pub(crate) description: Option<ArcStr>,
    pub(crate) ignored: bool,
    pub(crate) default_value: Option<InputValue>,
    pub(crate) access: MemberAccess,
    pub(crate) indexer: bool,
}

impl MemberDescriptor {
    /// Describes a member of the given host type.
    pub fn new(name: impl Into<ArcStr>, member_type: MemberType) -> Self {
        Self {
            name: name.into(),
            member_type,
            description: None,
            ignored: false,
            default_value: None,
            access: MemberAccess::default(),
            indexer: false,
        }
    }

    /// Sets the description of the inferred field.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Excludes this member from inference.
    #[must_use]
    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Sets the default value of the inferred input field.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<InputValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Sets the access directions of this member.
    #[must_use]
    pub fn access(mut self, access: MemberAccess) -> Self {
        self.access = access;
        self
    }

    /// Marks this member as an indexer, which is never inferred as a field.
    #[must_use]
    pub fn indexer(mut self) -> Self {
        self.indexer = true;
        self
    }

    fn is_inferable(&self) -> bool {
        !self.ignored && !self.indexer && self.access != MemberAccess::WriteOnly
    }
}

/// Structural description of the host values backing a type.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeDescriptor {
    /// Named members, exposed under camel-cased names (unless disabled).
    Record(Vec<MemberDescriptor>),
    /// String-keyed entries, exposed under their keys verbatim.
    Mapping(Vec<MemberDescriptor>),
    /// Positional members, exposed under their names and read by position.
    Sequence(Vec<MemberDescriptor>),
}

impl ShapeDescriptor {
    /// Members of this shape, in declaration order.
    pub fn members(&self) -> &[MemberDescriptor] {
        match self {
            Self::Record(m) | Self::Mapping(m) | Self::Sequence(m) => m,
        }
    }

    /// Infers fields out of this shape's members.
    ///
    /// Ignored members, indexers and write-only members are skipped.
    pub(crate) fn infer_fields(&self, auto_camel_case: bool) -> Vec<InferredField> {
        self.members()
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_inferable())
            .map(|(idx, m)| {
                let (field_name, accessor) = match self {
                    Self::Record(_) if auto_camel_case => (
                        ArcStr::from(to_camel_case(&m.name)),
                        MemberAccessor::Key(m.name.clone()),
                    ),
                    Self::Record(_) | Self::Mapping(_) => {
                        (m.name.clone(), MemberAccessor::Key(m.name.clone()))
                    }
                    Self::Sequence(_) => (m.name.clone(), MemberAccessor::Index(idx)),
                };
                let mut declaration = FieldDeclaration::new(field_name);
                declaration.description = m.description.clone();
                declaration.default_value = m.default_value.clone();
                InferredField {
                    declaration,
                    member_type: m.member_type.clone(),
                    accessor,
                }
            })
            .collect()
    }
}

/// Field inferred out of a shape member.
#[derive(Clone, Debug)]
pub(crate) struct InferredField {
    pub(crate) declaration: FieldDeclaration,
    pub(crate) member_type: MemberType,
    pub(crate) accessor: MemberAccessor,
}

/// Way of reading a member out of a parent [`Value`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum MemberAccessor {
    /// Entry of an object value.
    Key(ArcStr),
    /// Element of a list value.
    Index(usize),
}

impl MemberAccessor {
    /// Reads the member, returning `null` if the parent lacks it.
    pub(crate) fn read(&self, parent: &Value) -> Value {
        let member = match self {
            Self::Key(k) => parent.as_object_value().and_then(|o| o.get_field_value(k)),
            Self::Index(i) => parent.as_list_value().and_then(|l| l.get(*i)),
        };
        member.cloned().unwrap_or_default()
    }
}
