//! Frozen type graph.

use arcstr::ArcStr;
use fnv::FnvHashMap;
use indexmap::IndexMap;

use crate::{
    ast::{OperationType, Type},
    schema::meta::{CompletedType, TypeKind},
    value::Value,
};

/// Frozen, immutable graph of completed types.
///
/// Safe to share across threads and to execute against concurrently.
#[derive(Debug)]
pub struct TypeGraph {
    pub(crate) types: IndexMap<ArcStr, CompletedType>,
    pub(crate) query_type_name: ArcStr,
    pub(crate) mutation_type_name: Option<ArcStr>,
    pub(crate) add_typename: bool,
    pub(crate) implementers: FnvHashMap<ArcStr, Vec<ArcStr>>,
}

crate::sa::assert_impl_all!(TypeGraph: Send, Sync);

impl TypeGraph {
    pub(crate) fn new(
        types: IndexMap<ArcStr, CompletedType>,
        query_type_name: ArcStr,
        mutation_type_name: Option<ArcStr>,
        add_typename: bool,
    ) -> Self {
        let mut implementers = FnvHashMap::<ArcStr, Vec<ArcStr>>::default();
        for t in types.values() {
            for i in t.interface_names() {
                implementers.entry(i.clone()).or_default().push(t.name.clone());
            }
        }
        Self {
            types,
            query_type_name,
            mutation_type_name,
            add_typename,
            implementers,
        }
    }

    /// Looks up a type by its final name.
    pub fn type_by_name(&self, name: &str) -> Option<&CompletedType> {
        self.types.get(name)
    }

    /// Iterates over all the types, in completion order.
    pub fn types(&self) -> impl Iterator<Item = &CompletedType> {
        self.types.values()
    }

    /// The type queries are resolved against.
    pub fn query_type(&self) -> &CompletedType {
        // Presence is checked when the graph is completed.
        &self.types[self.query_type_name.as_str()]
    }

    /// The type mutations are resolved against, if any.
    pub fn mutation_type(&self) -> Option<&CompletedType> {
        self.mutation_type_name
            .as_ref()
            .and_then(|n| self.type_by_name(n))
    }

    /// Root type of the given operation.
    pub fn root_type(&self, operation: OperationType) -> Option<&CompletedType> {
        match operation {
            OperationType::Query => Some(self.query_type()),
            OperationType::Mutation => self.mutation_type(),
        }
    }

    /// Checks whether `__typename` may be selected on composite types.
    pub fn typename_enabled(&self) -> bool {
        self.add_typename
    }

    /// Types (objects and interfaces) implementing the given interface
    /// directly.
    pub fn implementers(&self, interface: &str) -> Vec<&CompletedType> {
        self.implementers
            .get(interface)
            .into_iter()
            .flatten()
            .filter_map(|n| self.type_by_name(n))
            .collect()
    }

    /// Object types a value of the given abstract type may actually be.
    ///
    /// Empty for non-abstract types.
    pub fn possible_types(&self, abstract_type: &CompletedType) -> Vec<&CompletedType> {
        match abstract_type.kind() {
            TypeKind::Union => abstract_type
                .possible_type_names()
                .iter()
                .filter_map(|n| self.type_by_name(n))
                .collect(),
            TypeKind::Interface => {
                let mut found = Vec::new();
                let mut pending = vec![abstract_type.name().clone()];
                while let Some(iface) = pending.pop() {
                    for t in self.implementers(&iface) {
                        match t.kind() {
                            TypeKind::Object => {
                                if !found.iter().any(|f: &&CompletedType| f.name == t.name) {
                                    found.push(t);
                                }
                            }
                            _ => pending.push(t.name().clone()),
                        }
                    }
                }
                found
            }
            _ => vec![],
        }
    }

    /// Checks whether `possible_type` is one of the possible types of
    /// `abstract_type`.
    pub fn is_possible_type(&self, abstract_type: &CompletedType, possible_type: &str) -> bool {
        self.possible_types(abstract_type)
            .iter()
            .any(|t| t.name() == possible_type)
    }

    /// Checks whether a value of type `sub_type` may be used where
    /// `super_type` is expected.
    pub fn is_subtype(&self, sub_type: &Type, super_type: &Type) -> bool {
        is_subtype_by(sub_type, super_type, &|sub, sup| self.is_named_subtype(sub, sup))
    }

    /// Checks whether the named type `sub_type_name` is the same as, or
    /// implements, or is a member of `super_type_name`.
    pub fn is_named_subtype(&self, sub_type_name: &str, super_type_name: &str) -> bool {
        if sub_type_name == super_type_name {
            true
        } else if let Some(super_type) = self.type_by_name(super_type_name) {
            super_type.kind().is_abstract() && self.is_possible_type(super_type, sub_type_name)
        } else {
            false
        }
    }

    /// Picks the concrete object type of a `value` of an abstract type.
    ///
    /// The abstract type's resolver is asked first, then the `__typename`
    /// entry of the value. The picked type must be one of the possible ones.
    pub fn resolve_concrete_type(
        &self,
        abstract_type: &CompletedType,
        value: &Value,
    ) -> Option<&CompletedType> {
        let name = match &abstract_type.type_resolver {
            Some(r) => r.resolve(value)?,
            None => value
                .as_object_value()?
                .get_field_value("__typename")?
                .as_string_value()?
                .to_owned(),
        };
        self.is_possible_type(abstract_type, &name)
            .then(|| self.type_by_name(&name))
            .flatten()
    }

    /// Number of type references that point to nothing.
    ///
    /// Always `0` for a graph that has been built successfully.
    pub fn pending_references(&self) -> usize {
        let missing = |name: &str| usize::from(self.type_by_name(name).is_none());
        self.types
            .values()
            .map(|t| {
                let fields = t
                    .fields()
                    .map(|f| {
                        missing(f.field_type().innermost_name())
                            + f.arguments()
                                .map(|a| missing(a.arg_type().innermost_name()))
                                .sum::<usize>()
                    })
                    .sum::<usize>();
                let inputs = t
                    .input_fields()
                    .map(|f| missing(f.arg_type().innermost_name()))
                    .sum::<usize>();
                let others = t
                    .interface_names()
                    .iter()
                    .chain(t.possible_type_names())
                    .map(|n| missing(n))
                    .sum::<usize>();
                fields + inputs + others
            })
            .sum()
    }
}

/// Checks whether `sub_type` may be used where `super_type` is expected,
/// given the relation between named types.
///
/// Non-null types are subtypes of their nullable counterparts, and lists
/// are covariant in their items.
pub(crate) fn is_subtype_by(
    sub_type: &Type,
    super_type: &Type,
    is_named_subtype: &dyn Fn(&str, &str) -> bool,
) -> bool {
    use Type::{List, Named, NonNullList, NonNullNamed};

    if super_type == sub_type {
        return true;
    }

    match (super_type, sub_type) {
        (NonNullNamed(super_name), NonNullNamed(sub_name))
        | (Named(super_name), Named(sub_name))
        | (Named(super_name), NonNullNamed(sub_name)) => is_named_subtype(sub_name, super_name),
        (NonNullList(super_inner), NonNullList(sub_inner))
        | (List(super_inner), List(sub_inner))
        | (List(super_inner), NonNullList(sub_inner)) => {
            is_subtype_by(sub_inner, super_inner, is_named_subtype)
        }
        _ => false,
    }
}
