//! Completion of registered declarations into a frozen [`TypeGraph`].
//!
//! Every declaration advances through the [`Phase`]s one step at a time:
//!
//! 1. Names are resolved in dependency order, so a derived name is only
//!    composed once the names it depends on are known.
//! 2. Fields are inferred from shapes and merged with explicit ones.
//! 3. Types are validated, interfaces before their implementers.
//! 4. Validated types are frozen, compiling each field's middleware chain.
//!
//! A declaration failing a step is rejected with an error, and everything
//! depending on it is rejected as blocked, without an error of its own.
//! Errors are collected rather than short-circuited, so one build reports
//! every independent problem. Nothing is frozen unless everything validates.

use std::{str::FromStr as _, sync::Arc};

use arcstr::ArcStr;
use fnv::FnvHashMap;
use indexmap::IndexMap;
use itertools::Itertools as _;
use tracing::{trace, warn};

use crate::{
    ast::Type,
    config::BuildOptions,
    resolve::{ResolverType, binder, middleware::{Middleware, Pipeline}},
    schema::{
        declaration::{
            ArgumentDeclaration, FieldDeclaration, NameSource, TypeDeclaration, TypeHandle,
            TypeKey, TypeRef,
        },
        error::{BuildError, BuildErrors},
        meta::{CompletedArgument, CompletedField, CompletedType, TypeKind},
        model::TypeGraph,
        order::dependency_order,
        registry::Registry,
        shape::{MemberAccessor, MemberType},
        validate::{ValidatedField, ValidatedType, ValidationContext, rules_for},
    },
    util::is_valid_name,
};

/// Completion phase of a declaration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    /// Registered, nothing resolved yet.
    Registered,
    /// The final name is known.
    NameResolved,
    /// Explicit and inferred fields are merged.
    ShapeInferred,
    /// Passed the checks of its kind.
    Validated,
    /// Completed into an immutable type.
    Frozen,
    /// Won't complete: either failed on its own ([`None`]), or is blocked by
    /// the failure of the dependency it names.
    Rejected(Option<TypeKey>),
}

impl Phase {
    fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Field after shape inference, before validation.
#[derive(Debug)]
struct PendingField {
    decl: FieldDeclaration,
    member: Option<(MemberAccessor, MemberType)>,
}

#[derive(Debug)]
struct DeclarationState {
    decl: TypeDeclaration,
    phase: Phase,
    name: Option<ArcStr>,
    fields: Vec<PendingField>,
}

/// Why a type reference can't be closed.
enum Unclosed {
    Unknown(TypeKey),
    Blocked(TypeKey),
}

/// Outcome of validating one type.
enum Validation {
    Valid(ValidatedType),
    Invalid(Vec<BuildError>),
    Blocked(TypeKey),
}

/// Completion run over the contents of a [`Registry`].
pub(crate) struct Completion<'b> {
    states: Vec<DeclarationState>,
    keys: FnvHashMap<TypeKey, TypeHandle>,
    literal_names: FnvHashMap<ArcStr, TypeHandle>,
    names: FnvHashMap<ArcStr, TypeHandle>,
    options: &'b BuildOptions,
    resolver_types: &'b FnvHashMap<ArcStr, ResolverType>,
    middleware: &'b [Arc<dyn Middleware>],
    errors: Vec<BuildError>,
}

impl<'b> Completion<'b> {
    pub(crate) fn new(
        registry: Registry,
        options: &'b BuildOptions,
        resolver_types: &'b FnvHashMap<ArcStr, ResolverType>,
        middleware: &'b [Arc<dyn Middleware>],
    ) -> Self {
        let (declarations, keys, literal_names, conflicts) = registry.into_parts();
        let mut completion = Self {
            states: declarations
                .into_iter()
                .map(|decl| DeclarationState {
                    decl,
                    phase: Phase::Registered,
                    name: None,
                    fields: vec![],
                })
                .collect(),
            keys,
            literal_names,
            names: FnvHashMap::default(),
            options,
            resolver_types,
            middleware,
            errors: vec![],
        };
        for e in conflicts {
            completion.record(e);
        }
        completion
    }

    /// Runs all the phases, producing either a frozen graph or every error
    /// met on the way.
    pub(crate) fn run(mut self) -> Result<TypeGraph, BuildErrors> {
        self.resolve_names();
        self.reject_duplicate_names();
        self.infer_shapes();
        let validated = self.validate();
        self.check_roots();

        if let Some(errors) = BuildErrors::new(std::mem::take(&mut self.errors)) {
            return Err(errors);
        }
        Ok(self.freeze(validated))
    }

    fn handles(&self) -> impl Iterator<Item = TypeHandle> + use<> {
        (0..self.states.len()).map(TypeHandle)
    }

    fn state(&self, h: TypeHandle) -> &DeclarationState {
        &self.states[h.index()]
    }

    fn lookup(&self, key: &TypeKey) -> Option<TypeHandle> {
        self.keys
            .get(key)
            .or_else(|| self.literal_names.get(key.as_str()))
            .or_else(|| self.names.get(key.as_str()))
            .copied()
    }

    /// Name of the declaration for error reporting, falling back to its key.
    fn display_name(&self, h: TypeHandle) -> ArcStr {
        let st = self.state(h);
        st.name
            .clone()
            .unwrap_or_else(|| st.decl.key.as_str().into())
    }

    fn record(&mut self, error: BuildError) {
        warn!(code = error.code(), types = ?error.type_names(), "{error}");
        self.errors.push(error);
    }

    fn transition(&mut self, h: TypeHandle, phase: Phase) {
        let st = &mut self.states[h.index()];
        trace!(key = %st.decl.key, from = ?st.phase, to = ?phase, "phase transition");
        st.phase = phase;
    }

    fn reject(&mut self, h: TypeHandle, errors: impl IntoIterator<Item = BuildError>) {
        for e in errors {
            self.record(e);
        }
        self.transition(h, Phase::Rejected(None));
    }

    fn block(&mut self, h: TypeHandle, by: TypeKey) {
        self.transition(h, Phase::Rejected(Some(by)));
    }

    fn resolve_names(&mut self) {
        let mut edges = vec![];
        let mut unknown = vec![];
        for h in self.handles() {
            for dep in self.state(h).decl.name.dependencies() {
                match self.lookup(dep) {
                    Some(d) => edges.push((h, d)),
                    None => unknown.push((h, dep.clone())),
                }
            }
        }
        for (h, referenced) in unknown {
            if !self.state(h).phase.is_rejected() {
                let type_name = self.display_name(h);
                self.reject(
                    h,
                    [BuildError::UnresolvedTypeReference {
                        type_name,
                        referenced,
                    }],
                );
            }
        }

        let order = dependency_order(self.handles(), edges);
        for cycle in order.cycles {
            let participants = cycle
                .iter()
                .map(|h| self.state(*h).decl.key.clone())
                .sorted()
                .collect();
            self.record(BuildError::UnresolvableDependencyCycle { participants });
            for h in cycle {
                self.reject(h, []);
            }
        }

        for h in order.sequence {
            if self.state(h).phase.is_rejected() {
                continue;
            }
            let name = match self.compose_name(h) {
                Ok(n) => n,
                Err(blocker) => {
                    self.block(h, blocker);
                    continue;
                }
            };
            if !is_valid_name(&name) || name.starts_with("__") {
                let key = self.state(h).decl.key.clone();
                self.reject(
                    h,
                    [BuildError::InvalidName {
                        key,
                        name: name.to_string(),
                    }],
                );
                continue;
            }
            self.states[h.index()].name = Some(name);
            self.transition(h, Phase::NameResolved);
        }
    }

    /// Composes the name of a declaration, or returns the dependency
    /// blocking it.
    fn compose_name(&self, h: TypeHandle) -> Result<ArcStr, TypeKey> {
        let (dependencies, compose) = match &self.state(h).decl.name {
            NameSource::Literal(n) => return Ok(n.clone()),
            NameSource::Derived {
                dependencies,
                compose,
            } => (dependencies, compose),
        };
        let names = dependencies
            .iter()
            .map(|dep| {
                self.lookup(dep)
                    .map(|d| self.state(d))
                    .filter(|st| !st.phase.is_rejected())
                    .and_then(|st| st.name.clone())
                    .ok_or_else(|| dep.clone())
            })
            .collect::<Result<Vec<_>, _>>()?;
        let names = names.iter().map(ArcStr::as_str).collect::<Vec<_>>();
        Ok(compose(&names[..]).into())
    }

    fn reject_duplicate_names(&mut self) {
        let mut by_name = IndexMap::<ArcStr, Vec<TypeHandle>>::new();
        for h in self.handles() {
            let st = self.state(h);
            if let (Phase::NameResolved, Some(n)) = (&st.phase, &st.name) {
                by_name.entry(n.clone()).or_default().push(h);
            }
        }
        for (name, handles) in by_name {
            if let [h] = handles[..] {
                self.names.insert(name, h);
                continue;
            }
            let keys = handles
                .iter()
                .map(|h| self.state(*h).decl.key.clone())
                .sorted()
                .collect();
            self.record(BuildError::DuplicateName { name, keys });
            for h in handles {
                self.reject(h, []);
            }
        }
    }

    fn infer_shapes(&mut self) {
        let auto_camel_case = self.options.auto_camel_case;
        for h in self.handles() {
            let st = &mut self.states[h.index()];
            if st.phase != Phase::NameResolved {
                continue;
            }

            let mut fields = st
                .decl
                .fields
                .iter()
                .cloned()
                .map(|decl| PendingField { decl, member: None })
                .collect::<Vec<_>>();
            let explicit = fields.len();
            if let Some(shape) = &st.decl.shape {
                for inferred in shape.infer_fields(auto_camel_case) {
                    let member = Some((inferred.accessor, inferred.member_type));
                    match fields[..explicit]
                        .iter_mut()
                        .find(|f| f.decl.name == inferred.declaration.name)
                    {
                        Some(f) => {
                            f.decl.fill_from(inferred.declaration);
                            f.member = member;
                        }
                        None => fields.push(PendingField {
                            decl: inferred.declaration,
                            member,
                        }),
                    }
                }
            }
            fields.retain(|f| !f.decl.ignored);
            st.fields = fields;

            self.transition(h, Phase::ShapeInferred);
        }
    }

    /// Closes a reference into a [`Type`] using final names.
    fn close(&self, r: &TypeRef) -> Result<Type, Unclosed> {
        Ok(match r {
            TypeRef::Named(key) => {
                let h = self
                    .lookup(key)
                    .ok_or_else(|| Unclosed::Unknown(key.clone()))?;
                let st = self.state(h);
                match (&st.phase, &st.name) {
                    (Phase::Rejected(_), _) | (_, None) => {
                        return Err(Unclosed::Blocked(key.clone()));
                    }
                    (_, Some(n)) => Type::Named(n.clone()),
                }
            }
            TypeRef::List(inner) => Type::List(Box::new(self.close(inner)?)),
            TypeRef::NonNull(inner) => self.close(inner)?.non_null(),
        })
    }

    /// Closes a reference given either as a literal or as a [`TypeRef`].
    fn close_member_type(
        &self,
        type_name: &ArcStr,
        member: &ArcStr,
        literal: Option<&str>,
        r: Option<&TypeRef>,
    ) -> Result<Option<Type>, Result<BuildError, TypeKey>> {
        let r = match (literal, r) {
            (Some(lit), _) => {
                let ty = Type::from_str(lit).map_err(|_| {
                    Ok(BuildError::InvalidTypeLiteral {
                        type_name: type_name.clone(),
                        member: member.clone(),
                        literal: lit.into(),
                    })
                })?;
                TypeRef::from(&ty)
            }
            (None, Some(r)) => r.clone(),
            (None, None) => return Ok(None),
        };
        self.close(&r).map(Some).map_err(|e| match e {
            Unclosed::Unknown(referenced) => Ok(BuildError::UnresolvedTypeReference {
                type_name: type_name.clone(),
                referenced,
            }),
            Unclosed::Blocked(key) => Err(key),
        })
    }

    fn validate_field(
        &self,
        type_name: &ArcStr,
        kind: TypeKind,
        field: &PendingField,
        errors: &mut Vec<BuildError>,
    ) -> Result<Option<ValidatedField>, TypeKey> {
        let decl = &field.decl;
        let plan = if rules_for(kind).requires_resolvers() {
            match binder::plan(
                type_name,
                &decl.name,
                &decl.binding,
                field.member.as_ref().map(|(a, _)| a),
                self.resolver_types,
            ) {
                Ok(p) => Some(p),
                Err(e) => {
                    errors.push(e);
                    None
                }
            }
        } else {
            None
        };

        let explicit = self.close_member_type(
            type_name,
            &decl.name,
            decl.type_literal.as_deref(),
            decl.field_type.as_ref(),
        );
        let field_type = match explicit {
            Ok(Some(t)) => Some(t),
            Ok(None) => {
                // Explicit types win wholesale, otherwise the candidates
                // must agree.
                let candidates = field
                    .member
                    .as_ref()
                    .and_then(|(_, t)| t.to_type_ref())
                    .into_iter()
                    .chain(plan.as_ref().and_then(binder::BindingPlan::output_hint));
                let mut closed = vec![];
                for c in candidates {
                    match self.close_member_type(type_name, &decl.name, None, Some(&c)) {
                        Ok(Some(t)) => {
                            if !closed.contains(&t) {
                                closed.push(t);
                            }
                        }
                        Ok(None) => {}
                        Err(Ok(e)) => errors.push(e),
                        Err(Err(key)) => return Err(key),
                    }
                }
                if closed.len() == 1 {
                    closed.pop()
                } else {
                    errors.push(BuildError::AmbiguousTypeInference {
                        type_name: type_name.clone(),
                        field_name: decl.name.clone(),
                        candidates: closed,
                    });
                    None
                }
            }
            Err(Ok(e)) => {
                errors.push(e);
                None
            }
            Err(Err(key)) => return Err(key),
        };

        let mut arguments = IndexMap::with_capacity(decl.arguments.len());
        for arg in &decl.arguments {
            match self.validate_argument(type_name, decl, arg) {
                Ok(Some(a)) => {
                    if arguments.contains_key(&a.name) {
                        errors.push(BuildError::DuplicateField {
                            type_name: type_name.clone(),
                            field_name: format!("{}({})", decl.name, a.name).into(),
                        });
                    } else {
                        arguments.insert(a.name.clone(), a);
                    }
                }
                Ok(None) => {}
                Err(Ok(e)) => errors.push(e),
                Err(Err(key)) => return Err(key),
            }
        }

        let Some(field_type) = field_type else {
            return Ok(None);
        };
        Ok(Some(ValidatedField {
            name: decl.name.clone(),
            description: decl.description.clone(),
            arguments,
            field_type,
            deprecation: decl.deprecation.clone().unwrap_or_default(),
            default_value: decl.default_value.clone(),
            plan,
            middleware: decl.middleware.clone(),
        }))
    }

    fn validate_argument(
        &self,
        type_name: &ArcStr,
        field: &FieldDeclaration,
        arg: &ArgumentDeclaration,
    ) -> Result<Option<CompletedArgument>, Result<BuildError, TypeKey>> {
        let member = ArcStr::from(format!("{}({})", field.name, arg.name));
        let arg_type = self.close_member_type(
            type_name,
            &member,
            arg.type_literal.as_deref(),
            arg.arg_type.as_ref(),
        )?;
        Ok(arg_type.map(|arg_type| CompletedArgument {
            name: arg.name.clone(),
            description: arg.description.clone(),
            arg_type,
            default_value: arg.default_value.clone(),
        }))
    }

    /// Closes references to interfaces or union members into names.
    fn close_names(
        &self,
        type_name: &ArcStr,
        keys: &[TypeKey],
        errors: &mut Vec<BuildError>,
    ) -> Result<Vec<ArcStr>, TypeKey> {
        let mut names = Vec::with_capacity(keys.len());
        for key in keys {
            match self.close(&TypeRef::Named(key.clone())) {
                Ok(t) => names.push(ArcStr::from(t.innermost_name())),
                Err(Unclosed::Unknown(referenced)) => {
                    errors.push(BuildError::UnresolvedTypeReference {
                        type_name: type_name.clone(),
                        referenced,
                    });
                }
                Err(Unclosed::Blocked(key)) => return Err(key),
            }
        }
        Ok(names)
    }

    fn validate_type(
        &self,
        h: TypeHandle,
        cx: &ValidationContext<'_>,
    ) -> Validation {
        let st = self.state(h);
        let type_name = self.display_name(h);
        let kind = st.decl.kind;
        let mut errors = vec![];

        let mut fields = IndexMap::with_capacity(st.fields.len());
        for f in &st.fields {
            if fields.contains_key(&f.decl.name) {
                errors.push(BuildError::DuplicateField {
                    type_name: type_name.clone(),
                    field_name: f.decl.name.clone(),
                });
                continue;
            }
            match self.validate_field(&type_name, kind, f, &mut errors) {
                Ok(Some(v)) => {
                    fields.insert(v.name.clone(), v);
                }
                Ok(None) => {}
                Err(key) => return Validation::Blocked(key),
            }
        }
        let interfaces = match self.close_names(&type_name, &st.decl.interfaces, &mut errors) {
            Ok(n) => n,
            Err(key) => return Validation::Blocked(key),
        };
        let members = match self.close_names(&type_name, &st.decl.members, &mut errors) {
            Ok(n) => n,
            Err(key) => return Validation::Blocked(key),
        };

        let validated = ValidatedType {
            name: type_name,
            kind,
            description: st.decl.description.clone(),
            fields,
            interfaces,
            members,
            enum_values: st.decl.enum_values.clone(),
            type_resolver: st.decl.type_resolver.clone(),
        };
        rules_for(kind).check(&validated, cx, &mut errors);

        if errors.is_empty() {
            Validation::Valid(validated)
        } else {
            Validation::Invalid(errors)
        }
    }

    /// Validates all the types with inferred shapes, interfaces first.
    fn validate(&mut self) -> FnvHashMap<ArcStr, ValidatedType> {
        let kinds = self
            .names
            .iter()
            .map(|(n, h)| (n.clone(), self.state(*h).decl.kind))
            .collect::<FnvHashMap<_, _>>();
        let mut implements = FnvHashMap::<ArcStr, Vec<ArcStr>>::default();
        let mut union_members = FnvHashMap::<ArcStr, Vec<ArcStr>>::default();
        let mut edges = vec![];
        for h in self.handles() {
            let st = self.state(h);
            if st.phase != Phase::ShapeInferred {
                continue;
            }
            if let (TypeKind::Union, Some(n)) = (st.decl.kind, &st.name) {
                let members = st
                    .decl
                    .members
                    .iter()
                    .filter_map(|m| self.lookup(m).and_then(|m| self.state(m).name.clone()))
                    .collect();
                union_members.insert(n.clone(), members);
            }
            for key in &st.decl.interfaces {
                if let Some(i) = self.lookup(key) {
                    edges.push((h, i));
                    if let (Some(n), Some(i)) = (&st.name, &self.state(i).name) {
                        implements.entry(n.clone()).or_default().push(i.clone());
                    }
                }
            }
        }

        let order = dependency_order(self.handles(), edges);
        for cycle in order.cycles {
            let participants = cycle
                .iter()
                .map(|h| self.state(*h).decl.key.clone())
                .sorted()
                .collect();
            self.record(BuildError::UnresolvableDependencyCycle { participants });
            for h in cycle {
                self.reject(h, []);
            }
        }

        let mut validated = FnvHashMap::default();
        for h in order.sequence {
            if self.state(h).phase != Phase::ShapeInferred {
                continue;
            }
            let cx = ValidationContext {
                kinds: &kinds,
                implements: &implements,
                union_members: &union_members,
                validated: &validated,
                allow_empty_types: self.options.allow_empty_types,
            };
            match self.validate_type(h, &cx) {
                Validation::Valid(v) => {
                    validated.insert(v.name.clone(), v);
                    self.transition(h, Phase::Validated);
                }
                Validation::Invalid(errors) => self.reject(h, errors),
                Validation::Blocked(key) => self.block(h, key),
            }
        }
        validated
    }

    /// Checks the root types are declared objects.
    ///
    /// The mutation root is optional, so it's only checked when declared.
    fn check_roots(&mut self) {
        let query = self.options.query_type.clone();
        if self.kind_of_name(&query) != Some(TypeKind::Object) {
            self.record(BuildError::MissingRootType { name: query });
        }
        if let Some(mutation) = self.options.mutation_type.clone() {
            if self
                .kind_of_name(&mutation)
                .is_some_and(|k| k != TypeKind::Object)
            {
                self.record(BuildError::MissingRootType { name: mutation });
            }
        }
    }

    fn kind_of_name(&self, name: &str) -> Option<TypeKind> {
        self.names.get(name).map(|h| self.state(*h).decl.kind)
    }

    fn freeze(mut self, mut validated: FnvHashMap<ArcStr, ValidatedType>) -> TypeGraph {
        let mut types = IndexMap::with_capacity(validated.len());
        for h in self.handles() {
            if self.state(h).phase != Phase::Validated {
                continue;
            }
            let Some(v) = self.state(h).name.as_ref().and_then(|n| validated.remove(n)) else {
                continue;
            };
            let completed = self.complete(v);
            types.insert(completed.name.clone(), completed);
            self.transition(h, Phase::Frozen);
        }

        let mutation = self
            .options
            .mutation_type
            .clone()
            .filter(|m| types.contains_key(m));
        TypeGraph::new(
            types,
            self.options.query_type.clone(),
            mutation,
            self.options.add_typename,
        )
    }

    fn complete(&self, v: ValidatedType) -> CompletedType {
        let mut fields = IndexMap::new();
        let mut input_fields = IndexMap::new();
        for f in v.fields.into_values() {
            if v.kind == TypeKind::InputObject {
                input_fields.insert(
                    f.name.clone(),
                    CompletedArgument {
                        name: f.name,
                        description: f.description,
                        arg_type: f.field_type,
                        default_value: f.default_value,
                    },
                );
                continue;
            }
            let pipeline = f.plan.map(|plan| {
                let stages = self
                    .middleware
                    .iter()
                    .chain(&f.middleware)
                    .cloned()
                    .collect();
                Pipeline::compile(stages, plan.compile())
            });
            fields.insert(
                f.name.clone(),
                CompletedField {
                    name: f.name,
                    description: f.description,
                    arguments: f.arguments,
                    field_type: f.field_type,
                    deprecation_status: f.deprecation,
                    pipeline,
                },
            );
        }
        CompletedType {
            name: v.name,
            kind: v.kind,
            description: v.description,
            fields,
            input_fields,
            interface_names: v.interfaces,
            possible_types: v.members,
            enum_values: v.enum_values,
            type_resolver: v.type_resolver,
        }
    }
}
