//! Choice of the way each field produces its value.

use arcstr::ArcStr;
use fnv::FnvHashMap;

use crate::{
    resolve::{Resolver, ResolverType, Thunk},
    schema::{
        declaration::{ResolverBinding, TypeRef},
        error::BuildError,
        shape::MemberAccessor,
    },
    value::{DefaultScalarValue, Value},
};

/// Binding chosen for a field.
#[derive(Clone, Debug)]
pub(crate) enum BindingPlan {
    Function(Resolver),
    Thunk(Thunk),
    Delegate {
        resolver: Resolver,
        parent_parameter: Option<ArcStr>,
    },
    Member(MemberAccessor),
    Constant(Value),
}

/// Chooses the binding of the field `field_name` of the type `type_name`.
///
/// Explicit functions win over delegation, delegation wins over a shape
/// member backing the field, and a member wins over a constant.
pub(crate) fn plan(
    type_name: &ArcStr,
    field_name: &ArcStr,
    binding: &ResolverBinding,
    member: Option<&MemberAccessor>,
    resolver_types: &FnvHashMap<ArcStr, ResolverType>,
) -> Result<BindingPlan, BuildError> {
    let missing = |detail: String| BuildError::MissingResolver {
        type_name: type_name.clone(),
        field_name: field_name.clone(),
        detail,
    };

    Ok(match binding {
        ResolverBinding::Function(r) => BindingPlan::Function(r.clone()),
        ResolverBinding::Thunk(t) => BindingPlan::Thunk(t.clone()),
        ResolverBinding::Delegate(d) => {
            let resolver_type = resolver_types.get(&d.resolver_type).ok_or_else(|| {
                missing(format!("resolver type `{}` is not registered", d.resolver_type))
            })?;
            let resolver = resolver_type.member_by_name(&d.member).ok_or_else(|| {
                missing(format!(
                    "resolver type `{}` has no member `{}`",
                    d.resolver_type, d.member,
                ))
            })?;
            BindingPlan::Delegate {
                resolver: resolver.clone(),
                parent_parameter: d.parent_parameter.clone(),
            }
        }
        ResolverBinding::Constant(v) => match member {
            Some(m) => BindingPlan::Member(m.clone()),
            None => BindingPlan::Constant(v.clone()),
        },
        ResolverBinding::Unbound => match member {
            Some(m) => BindingPlan::Member(m.clone()),
            None => {
                return Err(missing(
                    "no resolver is bound and no shape member backs it".into(),
                ));
            }
        },
    })
}

impl BindingPlan {
    /// Type the bound resolver declares to produce, if it's known.
    pub(crate) fn output_hint(&self) -> Option<TypeRef> {
        match self {
            Self::Function(r) | Self::Delegate { resolver: r, .. } => r.output().cloned(),
            Self::Constant(Value::Scalar(s)) => {
                let name = match s {
                    DefaultScalarValue::Int(_) => "Int",
                    DefaultScalarValue::Float(_) => "Float",
                    DefaultScalarValue::String(_) => "String",
                    DefaultScalarValue::Boolean(_) => "Boolean",
                };
                Some(TypeRef::named(name).non_null())
            }
            Self::Thunk(_) | Self::Member(_) | Self::Constant(_) => None,
        }
    }

    /// Compiles this binding into the core [`Resolver`] of a field.
    pub(crate) fn compile(self) -> Resolver {
        match self {
            Self::Function(r) => r,
            Self::Thunk(t) => Resolver::sync(move |_| t.call()),
            Self::Delegate {
                resolver,
                parent_parameter,
            } => Resolver::new(move |mut ctx| {
                if let Some(param) = &parent_parameter {
                    let parent = ctx.parent.to_input_value();
                    ctx.arguments = std::mem::take(&mut ctx.arguments).with(param.clone(), parent);
                }
                resolver.call(ctx)
            }),
            Self::Member(accessor) => Resolver::sync(move |ctx| Ok(accessor.read(ctx.parent()))),
            Self::Constant(v) => Resolver::sync(move |_| Ok(v.clone())),
        }
    }
}
