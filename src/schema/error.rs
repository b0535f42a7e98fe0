//! Errors rejecting a build of a [`TypeGraph`](crate::TypeGraph).

use std::{fmt, slice};

use arcstr::ArcStr;
use derive_more::with_trait::{Display, Error};
use itertools::Itertools as _;

use crate::{
    ast::Type,
    schema::{declaration::TypeKey, meta::TypeKind},
};

/// Reason a type fails to conform to the interfaces it implements.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum ConformanceViolation {
    /// An interface field has no counterpart on the implementing type.
    #[display("field is missing")]
    MissingField,

    /// Arguments of the implementing field differ from the interface's ones.
    #[display("arguments differ from the interface field")]
    ArgumentMismatch,

    /// Result type of the implementing field isn't a subtype of the
    /// interface's one.
    #[display("type `{found}` is not a subtype of `{expected}`")]
    IncompatibleResultType {
        /// Result type required by the interface.
        expected: Type,
        /// Result type of the implementing field.
        found: Type,
    },

    /// Two implemented interfaces declare incompatible fields of the same
    /// name, so no single field can satisfy both.
    #[display("interfaces declare incompatible fields")]
    ConflictingInterfaces,

    /// An implemented type is not an interface.
    #[display("implemented type is not an interface")]
    NotAnInterface,
}

/// Error rejecting a build, naming the offending types and members.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum BuildError {
    /// Two independent declarations resolve to the same final name.
    #[display(
        "Type name `{name}` is claimed by independent declarations: {}",
        keys.iter().join(", "),
    )]
    DuplicateName {
        /// Final name in conflict.
        name: ArcStr,
        /// Identity tokens of the conflicting declarations.
        keys: Vec<TypeKey>,
    },

    /// The same field name occurs twice in one type.
    #[display("Field `{type_name}.{field_name}` is declared more than once")]
    DuplicateField {
        /// Type declaring the field.
        type_name: ArcStr,
        /// Duplicated field name.
        field_name: ArcStr,
    },

    /// Name dependencies form a cycle, so none of the participants can be
    /// named.
    #[display(
        "Unresolvable name dependency cycle between: {}",
        participants.iter().join(", "),
    )]
    UnresolvableDependencyCycle {
        /// Identity tokens of the types in the cycle, sorted.
        participants: Vec<TypeKey>,
    },

    /// A type (or its field) doesn't conform to the interfaces it implements.
    #[display(
        "Type `{type_name}` fails to conform to {} on field `{field_name}`: {reason}",
        interfaces.iter().map(|i| format!("`{i}`")).join(" and "),
    )]
    InterfaceConformance {
        /// Implementing type.
        type_name: ArcStr,
        /// Field in question.
        field_name: ArcStr,
        /// Interfaces involved.
        interfaces: Vec<ArcStr>,
        /// What exactly is wrong.
        reason: ConformanceViolation,
    },

    /// A field of an object type can't be resolved by anything.
    #[display("Field `{type_name}.{field_name}` has no resolver: {detail}")]
    MissingResolver {
        /// Type declaring the field.
        type_name: ArcStr,
        /// Field lacking a resolver.
        field_name: ArcStr,
        /// Why no binding applies.
        detail: String,
    },

    /// The result type of a field can't be inferred unambiguously.
    #[display(
        "Cannot infer type of field `{type_name}.{field_name}`{}",
        if candidates.is_empty() {
            String::from(": no candidates")
        } else {
            format!(", candidates: {}", candidates.iter().join(", "))
        },
    )]
    AmbiguousTypeInference {
        /// Type declaring the field.
        type_name: ArcStr,
        /// Field in question.
        field_name: ArcStr,
        /// Disagreeing candidate types, empty if there are none.
        candidates: Vec<Type>,
    },

    /// A type reference points to nothing registered.
    #[display("Type `{type_name}` references unknown type `{referenced}`")]
    UnresolvedTypeReference {
        /// Type holding the reference.
        type_name: ArcStr,
        /// Identity token nothing is registered under.
        referenced: TypeKey,
    },

    /// A resolved name isn't a valid GraphQL name, or is reserved.
    #[display("Type `{key}` resolves to invalid name `{name}`")]
    InvalidName {
        /// Identity token of the declaration.
        key: TypeKey,
        /// Name it resolved to.
        name: String,
    },

    /// A literal type override doesn't parse.
    #[display("Invalid type literal `{literal}` on `{type_name}.{member}`")]
    InvalidTypeLiteral {
        /// Type declaring the member.
        type_name: ArcStr,
        /// Field or argument holding the literal.
        member: ArcStr,
        /// The literal itself.
        literal: String,
    },

    /// Declarations merged under one identity disagree about its kind.
    #[display("Type `{key}` is declared both as {first} and {second}")]
    KindConflict {
        /// Identity token of the merged declarations.
        key: TypeKey,
        /// Kind declared first.
        first: TypeKind,
        /// Kind declared later.
        second: TypeKind,
    },

    /// A field or argument uses a type of the wrong kind for its position.
    #[display("`{type_name}.{member}` cannot be of type `{member_type}`: {reason}")]
    InvalidFieldType {
        /// Type declaring the member.
        type_name: ArcStr,
        /// Field or argument in question.
        member: ArcStr,
        /// Offending type.
        member_type: Type,
        /// Why the type doesn't fit.
        reason: &'static str,
    },

    /// A union member is not an object type.
    #[display("Union `{union_name}` cannot include `{member}`: only object types are allowed")]
    InvalidUnionMember {
        /// Union in question.
        union_name: ArcStr,
        /// Offending member.
        member: ArcStr,
    },

    /// A composite or enum type has nothing in it.
    #[display("{kind} `{type_name}` must define one or more members")]
    EmptyType {
        /// Empty type.
        type_name: ArcStr,
        /// Its kind.
        kind: TypeKind,
    },

    /// A root operation type is missing, or isn't an object type.
    #[display("Root type `{name}` is not a declared object type")]
    MissingRootType {
        /// Configured name of the root type.
        name: ArcStr,
    },
}

impl BuildError {
    /// Stable error code of this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateName { .. } | Self::DuplicateField { .. } => "DUPLICATE_NAME",
            Self::UnresolvableDependencyCycle { .. } => "UNRESOLVABLE_DEPENDENCY_CYCLE",
            Self::InterfaceConformance { .. } => "INTERFACE_CONFORMANCE",
            Self::MissingResolver { .. } => "MISSING_RESOLVER",
            Self::AmbiguousTypeInference { .. } => "AMBIGUOUS_TYPE_INFERENCE",
            Self::UnresolvedTypeReference { .. } => "UNRESOLVED_TYPE_REFERENCE",
            Self::InvalidName { .. } => "INVALID_NAME",
            Self::InvalidTypeLiteral { .. } => "INVALID_TYPE_LITERAL",
            Self::KindConflict { .. } => "KIND_CONFLICT",
            Self::InvalidFieldType { .. } => "INVALID_FIELD_TYPE",
            Self::InvalidUnionMember { .. } => "INVALID_UNION_MEMBER",
            Self::EmptyType { .. } => "EMPTY_TYPE",
            Self::MissingRootType { .. } => "MISSING_ROOT_TYPE",
        }
    }

    /// Names (or identity tokens) of the types this error is about.
    pub fn type_names(&self) -> Vec<&str> {
        match self {
            Self::DuplicateName { name, .. } => vec![name.as_str()],
            Self::UnresolvableDependencyCycle { participants } => {
                participants.iter().map(TypeKey::as_str).collect()
            }
            Self::InterfaceConformance {
                type_name,
                interfaces,
                ..
            } => std::iter::once(type_name.as_str())
                .chain(interfaces.iter().map(ArcStr::as_str))
                .collect(),
            Self::DuplicateField { type_name, .. }
            | Self::MissingResolver { type_name, .. }
            | Self::AmbiguousTypeInference { type_name, .. }
            | Self::InvalidTypeLiteral { type_name, .. }
            | Self::InvalidFieldType { type_name, .. }
            | Self::EmptyType { type_name, .. } => vec![type_name.as_str()],
            Self::UnresolvedTypeReference {
                type_name,
                referenced,
            } => vec![type_name.as_str(), referenced.as_str()],
            Self::InvalidName { key, .. } | Self::KindConflict { key, .. } => vec![key.as_str()],
            Self::InvalidUnionMember { union_name, member } => {
                vec![union_name.as_str(), member.as_str()]
            }
            Self::MissingRootType { name } => vec![name.as_str()],
        }
    }
}

/// Non-empty list of [`BuildError`]s a build was rejected with.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuildErrors(Vec<BuildError>);

impl BuildErrors {
    /// Wraps the provided `errors`, returning [`None`] if there are none.
    pub fn new(errors: Vec<BuildError>) -> Option<Self> {
        (!errors.is_empty()).then_some(Self(errors))
    }

    /// Returns all the collected errors.
    pub fn errors(&self) -> &[BuildError] {
        &self.0
    }

    /// Returns the number of collected errors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`, as [`BuildErrors`] can't be empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns an iterator over all the collected errors.
    pub fn iter(&self) -> slice::Iter<'_, BuildError> {
        self.0.iter()
    }

    /// Checks whether an error with the given `code` was collected.
    pub fn contains_code(&self, code: &str) -> bool {
        self.0.iter().any(|e| e.code() == code)
    }

    /// Unwraps into the list of errors.
    pub fn into_inner(self) -> Vec<BuildError> {
        self.0
    }
}

impl fmt::Display for BuildErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type graph build failed with {} error(s)", self.0.len())?;
        for e in &self.0 {
            write!(f, "\n  [{}] {e}", e.code())?;
        }
        Ok(())
    }
}

impl std::error::Error for BuildErrors {}

impl IntoIterator for BuildErrors {
    type Item = BuildError;
    type IntoIter = std::vec::IntoIter<BuildError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a BuildErrors {
    type Item = &'a BuildError;
    type IntoIter = slice::Iter<'a, BuildError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
