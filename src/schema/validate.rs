//! Structural checks of types, looked up by kind.

use std::sync::Arc;

use arcstr::ArcStr;
use fnv::FnvHashMap;
use indexmap::IndexMap;
use itertools::Itertools as _;

use crate::{
    ast::{InputValue, Type},
    resolve::{binder::BindingPlan, middleware::Middleware},
    schema::{
        error::{BuildError, ConformanceViolation},
        meta::{CompletedArgument, DeprecationStatus, EnumValue, TypeKind, TypeResolver},
        model::is_subtype_by,
    },
};

/// Type which passed the checks of its kind.
#[derive(Debug)]
pub(crate) struct ValidatedType {
    pub(crate) name: ArcStr,
    pub(crate) kind: TypeKind,
    pub(crate) description: Option<ArcStr>,
    pub(crate) fields: IndexMap<ArcStr, ValidatedField>,
    pub(crate) interfaces: Vec<ArcStr>,
    pub(crate) members: Vec<ArcStr>,
    pub(crate) enum_values: Vec<EnumValue>,
    pub(crate) type_resolver: Option<TypeResolver>,
}

/// Field with a closed type and, for object types, a chosen binding.
pub(crate) struct ValidatedField {
    pub(crate) name: ArcStr,
    pub(crate) description: Option<ArcStr>,
    pub(crate) arguments: IndexMap<ArcStr, CompletedArgument>,
    pub(crate) field_type: Type,
    pub(crate) deprecation: DeprecationStatus,
    pub(crate) default_value: Option<InputValue>,
    pub(crate) plan: Option<BindingPlan>,
    pub(crate) middleware: Vec<Arc<dyn Middleware>>,
}

impl std::fmt::Debug for ValidatedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedField")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("plan", &self.plan)
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

impl ValidatedField {
    fn same_arguments(&self, other: &Self) -> bool {
        self.arguments.len() == other.arguments.len()
            && self.arguments.values().all(|a| {
                other
                    .arguments
                    .get(&a.name)
                    .is_some_and(|o| o.arg_type == a.arg_type)
            })
    }
}

/// What checks of one type may know about the others.
pub(crate) struct ValidationContext<'a> {
    pub(crate) kinds: &'a FnvHashMap<ArcStr, TypeKind>,
    pub(crate) implements: &'a FnvHashMap<ArcStr, Vec<ArcStr>>,
    pub(crate) union_members: &'a FnvHashMap<ArcStr, Vec<ArcStr>>,
    pub(crate) validated: &'a FnvHashMap<ArcStr, ValidatedType>,
    pub(crate) allow_empty_types: bool,
}

impl ValidationContext<'_> {
    fn is_named_subtype(&self, sub: &str, sup: &str) -> bool {
        if sub == sup {
            return true;
        }
        let is_member = self
            .union_members
            .get(sup)
            .is_some_and(|members| members.iter().any(|m| m == sub));
        let mut seen = vec![sub];
        let mut pending = vec![sub];
        while let Some(t) = pending.pop() {
            for i in self.implements.get(t).into_iter().flatten() {
                if i == sup {
                    return true;
                }
                if !seen.contains(&i.as_str()) {
                    seen.push(i.as_str());
                    pending.push(i.as_str());
                }
            }
        }
        is_member
    }

    fn is_subtype(&self, sub: &Type, sup: &Type) -> bool {
        is_subtype_by(sub, sup, &|a, b| self.is_named_subtype(a, b))
    }

    fn kind_of(&self, ty: &Type) -> Option<TypeKind> {
        self.kinds.get(ty.innermost_name()).copied()
    }
}

/// Checks specific to one kind of types.
pub(crate) trait KindRules: Sync {
    /// Whether fields of this kind need a way to produce a value.
    fn requires_resolvers(&self) -> bool {
        false
    }

    /// Runs the checks, collecting every problem found into `errors`.
    fn check(&self, ty: &ValidatedType, cx: &ValidationContext<'_>, errors: &mut Vec<BuildError>);
}

/// Returns the rules for types of the given `kind`.
pub(crate) fn rules_for(kind: TypeKind) -> &'static dyn KindRules {
    match kind {
        TypeKind::Object => &ObjectRules,
        TypeKind::Interface => &InterfaceRules,
        TypeKind::InputObject => &InputObjectRules,
        TypeKind::Union => &UnionRules,
        TypeKind::Enum => &EnumRules,
        TypeKind::Scalar => &ScalarRules,
    }
}

struct ObjectRules;

impl KindRules for ObjectRules {
    fn requires_resolvers(&self) -> bool {
        true
    }

    fn check(&self, ty: &ValidatedType, cx: &ValidationContext<'_>, errors: &mut Vec<BuildError>) {
        check_not_empty(ty, ty.fields.is_empty(), cx, errors);
        check_output_fields(ty, cx, errors);
        check_conformance(ty, cx, errors);
    }
}

struct InterfaceRules;

impl KindRules for InterfaceRules {
    fn check(&self, ty: &ValidatedType, cx: &ValidationContext<'_>, errors: &mut Vec<BuildError>) {
        check_not_empty(ty, ty.fields.is_empty(), cx, errors);
        check_output_fields(ty, cx, errors);
        check_conformance(ty, cx, errors);
    }
}

struct InputObjectRules;

impl KindRules for InputObjectRules {
    fn check(&self, ty: &ValidatedType, cx: &ValidationContext<'_>, errors: &mut Vec<BuildError>) {
        check_not_empty(ty, ty.fields.is_empty(), cx, errors);
        for f in ty.fields.values() {
            if cx.kind_of(&f.field_type).is_some_and(|k| !k.is_input()) {
                errors.push(invalid_type(ty, &f.name, &f.field_type, "not an input type"));
            }
            if !f.arguments.is_empty() {
                errors.push(invalid_type(
                    ty,
                    &f.name,
                    &f.field_type,
                    "input fields cannot have arguments",
                ));
            }
        }
    }
}

struct UnionRules;

impl KindRules for UnionRules {
    fn check(&self, ty: &ValidatedType, cx: &ValidationContext<'_>, errors: &mut Vec<BuildError>) {
        check_not_empty(ty, ty.members.is_empty(), cx, errors);
        for m in &ty.members {
            if cx.kinds.get(m).is_some_and(|k| *k != TypeKind::Object) {
                errors.push(BuildError::InvalidUnionMember {
                    union_name: ty.name.clone(),
                    member: m.clone(),
                });
            }
        }
    }
}

struct EnumRules;

impl KindRules for EnumRules {
    fn check(&self, ty: &ValidatedType, cx: &ValidationContext<'_>, errors: &mut Vec<BuildError>) {
        check_not_empty(ty, ty.enum_values.is_empty(), cx, errors);
    }
}

struct ScalarRules;

impl KindRules for ScalarRules {
    fn check(&self, _: &ValidatedType, _: &ValidationContext<'_>, _: &mut Vec<BuildError>) {}
}

fn check_not_empty(
    ty: &ValidatedType,
    empty: bool,
    cx: &ValidationContext<'_>,
    errors: &mut Vec<BuildError>,
) {
    if empty && !cx.allow_empty_types {
        errors.push(BuildError::EmptyType {
            type_name: ty.name.clone(),
            kind: ty.kind,
        });
    }
}

fn invalid_type(ty: &ValidatedType, member: &ArcStr, t: &Type, reason: &'static str) -> BuildError {
    BuildError::InvalidFieldType {
        type_name: ty.name.clone(),
        member: member.clone(),
        member_type: t.clone(),
        reason,
    }
}

fn check_output_fields(ty: &ValidatedType, cx: &ValidationContext<'_>, errors: &mut Vec<BuildError>) {
    for f in ty.fields.values() {
        if cx.kind_of(&f.field_type).is_some_and(|k| !k.is_output()) {
            errors.push(invalid_type(ty, &f.name, &f.field_type, "not an output type"));
        }
        for a in f.arguments.values() {
            if cx.kind_of(&a.arg_type).is_some_and(|k| !k.is_input()) {
                errors.push(invalid_type(
                    ty,
                    &format!("{}({})", f.name, a.name).into(),
                    &a.arg_type,
                    "not an input type",
                ));
            }
        }
    }
}

/// Checks that `ty` satisfies every field of every interface it implements.
///
/// Interfaces declaring incompatible fields of the same name are reported
/// as a conflict naming both of them, regardless of what `ty` declares.
fn check_conformance(ty: &ValidatedType, cx: &ValidationContext<'_>, errors: &mut Vec<BuildError>) {
    let violation = |field: &ArcStr, interfaces: Vec<ArcStr>, reason| {
        BuildError::InterfaceConformance {
            type_name: ty.name.clone(),
            field_name: field.clone(),
            interfaces,
            reason,
        }
    };

    let mut required = IndexMap::<&ArcStr, Vec<(&ArcStr, &ValidatedField)>>::new();
    for iface_name in &ty.interfaces {
        match cx.kinds.get(iface_name) {
            Some(TypeKind::Interface) => {}
            Some(_) => {
                errors.push(violation(
                    iface_name,
                    vec![iface_name.clone()],
                    ConformanceViolation::NotAnInterface,
                ));
                continue;
            }
            None => continue,
        }
        // Rejected interfaces have their own errors reported.
        let Some(iface) = cx.validated.get(iface_name) else {
            continue;
        };
        for f in iface.fields.values() {
            required.entry(&f.name).or_default().push((iface_name, f));
        }
    }

    for (field_name, declared) in required {
        let conflicts = declared
            .iter()
            .tuple_combinations()
            .filter(|((_, a), (_, b))| {
                !(a.same_arguments(b)
                    && (cx.is_subtype(&a.field_type, &b.field_type)
                        || cx.is_subtype(&b.field_type, &a.field_type)))
            })
            .map(|((i1, _), (i2, _))| vec![(*i1).clone(), (*i2).clone()])
            .collect::<Vec<_>>();
        if !conflicts.is_empty() {
            for interfaces in conflicts {
                errors.push(violation(
                    field_name,
                    interfaces,
                    ConformanceViolation::ConflictingInterfaces,
                ));
            }
            continue;
        }

        let Some(own) = ty.fields.get(field_name) else {
            errors.push(violation(
                field_name,
                declared.iter().map(|(i, _)| (*i).clone()).collect(),
                ConformanceViolation::MissingField,
            ));
            continue;
        };
        for (iface_name, f) in declared {
            if !own.same_arguments(f) {
                errors.push(violation(
                    field_name,
                    vec![iface_name.clone()],
                    ConformanceViolation::ArgumentMismatch,
                ));
            } else if !cx.is_subtype(&own.field_type, &f.field_type) {
                errors.push(violation(
                    field_name,
                    vec![iface_name.clone()],
                    ConformanceViolation::IncompatibleResultType {
                        expected: f.field_type.clone(),
                        found: own.field_type.clone(),
                    },
                ));
            }
        }
    }
}
