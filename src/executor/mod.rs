//! Resolution of selections against a frozen [`TypeGraph`].

mod arguments;
mod error;

use std::{
    any::Any,
    pin::pin,
    sync::{Arc, Mutex, PoisonError},
};

use arcstr::ArcStr;
use futures::{
    future::{self, BoxFuture, Either, FutureExt as _},
    stream::{FuturesOrdered, StreamExt as _},
};
use indexmap::IndexMap;
use itertools::Itertools as _;
use serde::{Serialize, ser::SerializeMap as _};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument as _, debug, debug_span, trace_span};

use crate::{
    ast::{FieldSelection, OperationType, Selection, Type, Variables},
    resolve::{FieldContext, RequestContext},
    schema::{
        meta::{CompletedField, CompletedType, TypeKind},
        model::TypeGraph,
    },
    value::{DefaultScalarValue, Object, Value},
};

pub use self::{
    arguments::Arguments,
    error::{ExecutionError, ExecutionErrorKind, FieldError, FieldResult, PathSegment},
};

/// Result of executing a selection: the data resolved, and every error met
/// on the way.
///
/// Serializes into the usual response shape, with the `errors` key omitted
/// when there are none.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionOutput {
    /// Resolved data, or [`None`] if a failure propagated up to the root.
    pub data: Option<Value>,
    /// Errors of the fields that failed, ordered by their path.
    pub errors: Vec<ExecutionError>,
}

impl ExecutionOutput {
    /// Checks whether everything resolved without errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Serialize for ExecutionOutput {
    fn serialize<S: serde::Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        let mut map = ser.serialize_map(Some(1 + usize::from(!self.errors.is_empty())))?;
        map.serialize_entry("data", &self.data)?;
        if !self.errors.is_empty() {
            map.serialize_entry("errors", &self.errors)?;
        }
        map.end()
    }
}

/// Execution of a selection, with every optional input.
///
/// ```rust
/// # use typegraph::{FieldDeclaration, Request, Selection, TypeDeclaration, TypeRef, build_graph};
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let graph = build_graph([TypeDeclaration::object("Query").field(
///     FieldDeclaration::new("a")
///         .of_type(TypeRef::named("String"))
///         .constant("hello"),
/// )])
/// .unwrap();
///
/// let selection = [Selection::field("a")];
/// let output = Request::new(&graph, &selection).execute().await;
///
/// assert_eq!(
///     serde_json::to_value(&output).unwrap(),
///     serde_json::json!({"data": {"a": "hello"}}),
/// );
/// # }
/// ```
pub struct Request<'a> {
    graph: &'a TypeGraph,
    selection: &'a [Selection],
    root_value: Value,
    variables: Variables,
    operation: OperationType,
    data: Option<Arc<dyn Any + Send + Sync>>,
    cancellation: CancellationToken,
}

impl<'a> Request<'a> {
    /// Creates a query request of the `selection` on the `graph`.
    pub fn new(graph: &'a TypeGraph, selection: &'a [Selection]) -> Self {
        Self {
            graph,
            selection,
            root_value: Value::null(),
            variables: Variables::new(),
            operation: OperationType::Query,
            data: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Sets the value root fields are resolved on.
    #[must_use]
    pub fn root_value(mut self, root_value: Value) -> Self {
        self.root_value = root_value;
        self
    }

    /// Sets the variables the selection may reference.
    #[must_use]
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    /// Sets the kind of operation to execute.
    #[must_use]
    pub fn operation(mut self, operation: OperationType) -> Self {
        self.operation = operation;
        self
    }

    /// Attaches request data resolvers may access via
    /// [`FieldContext::data()`].
    #[must_use]
    pub fn data<T: Any + Send + Sync>(mut self, data: T) -> Self {
        self.data = Some(Arc::new(data));
        self
    }

    /// Sets the signal cancelling the whole request.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Executes this request.
    pub async fn execute(self) -> ExecutionOutput {
        let Self {
            graph,
            selection,
            root_value,
            variables,
            operation,
            data,
            cancellation,
        } = self;
        let span = debug_span!("execute", %operation);
        let request = Arc::new(RequestContext {
            operation,
            variables,
            data,
            cancellation,
        });
        let execution = Execution {
            graph,
            request,
            errors: Mutex::default(),
        };
        let root_value = Arc::new(root_value);

        let data = async {
            let Some(root) = graph.root_type(operation) else {
                execution.record(
                    ExecutionErrorKind::FieldNotFound,
                    &[],
                    format!("No root type for {operation} operations").into(),
                );
                return None;
            };
            execution
                .resolve_selection_set(
                    root,
                    root_value,
                    selection.iter().collect(),
                    vec![],
                    operation == OperationType::Mutation,
                )
                .await
        }
        .instrument(span)
        .await;

        let mut errors = execution
            .errors
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        errors.sort_by(|a, b| a.path().cmp(b.path()));
        ExecutionOutput { data, errors }
    }
}

/// Executes a query `selection` on the `root_value` of the `graph`.
///
/// Fields still resolving once `cancellation` is triggered, and the ones not
/// started yet, fail with a [`ExecutionErrorKind::Cancelled`] error.
pub async fn execute(
    graph: &TypeGraph,
    root_value: Value,
    selection: &[Selection],
    variables: &Variables,
    cancellation: &CancellationToken,
) -> ExecutionOutput {
    Request::new(graph, selection)
        .root_value(root_value)
        .variables(variables.clone())
        .cancellation(cancellation.clone())
        .execute()
        .await
}

struct Execution<'a> {
    graph: &'a TypeGraph,
    request: Arc<RequestContext>,
    errors: Mutex<Vec<ExecutionError>>,
}

fn path_with(path: &[PathSegment], segment: impl Into<PathSegment>) -> Vec<PathSegment> {
    let mut path = path.to_vec();
    path.push(segment.into());
    path
}

impl Execution<'_> {
    fn record(&self, kind: ExecutionErrorKind, path: &[PathSegment], error: FieldError) {
        debug!(code = %kind, path = %path.iter().join("."), "{}", error.message());
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ExecutionError::new(kind, path, error));
    }

    /// Records a field failure, returning what takes the field's place.
    fn fail(
        &self,
        kind: ExecutionErrorKind,
        path: &[PathSegment],
        error: FieldError,
        field_type: &Type,
    ) -> Option<Value> {
        self.record(kind, path, error);
        (!field_type.is_non_null()).then(Value::null)
    }

    fn fragment_applies(&self, ty: &CompletedType, condition: Option<&ArcStr>) -> bool {
        let Some(condition) = condition else {
            return true;
        };
        condition == ty.name()
            || self
                .graph
                .type_by_name(condition)
                .is_some_and(|c| c.kind().is_abstract() && self.graph.is_possible_type(c, ty.name()))
    }

    /// Groups the fields selected on `ty` by their response names, in order.
    fn collect_fields<'s>(
        &self,
        ty: &CompletedType,
        selections: Vec<&'s Selection>,
        grouped: &mut IndexMap<&'s ArcStr, Vec<&'s FieldSelection>>,
    ) {
        for s in selections {
            if s.is_excluded(&self.request.variables) {
                continue;
            }
            match s {
                Selection::Field(f) => grouped.entry(f.response_name()).or_default().push(f),
                Selection::InlineFragment(frag) => {
                    if self.fragment_applies(ty, frag.type_condition.as_ref()) {
                        self.collect_fields(ty, frag.selection_set.iter().collect(), grouped);
                    }
                }
            }
        }
    }

    fn resolve_selection_set<'s>(
        &'s self,
        ty: &'s CompletedType,
        parent: Arc<Value>,
        selections: Vec<&'s Selection>,
        path: Vec<PathSegment>,
        serial: bool,
    ) -> BoxFuture<'s, Option<Value>> {
        async move {
            let mut grouped = IndexMap::new();
            self.collect_fields(ty, selections, &mut grouped);

            let mut object = Object::with_capacity(grouped.len());
            let mut propagated = false;
            if serial {
                for (name, fields) in grouped {
                    let value = self
                        .resolve_field(ty, Arc::clone(&parent), fields, path_with(&path, name.as_str()))
                        .await;
                    match value {
                        Some(v) => {
                            object.add_field(name.as_str(), v);
                        }
                        None => propagated = true,
                    }
                }
            } else {
                let names = grouped.keys().copied().collect::<Vec<_>>();
                let values = grouped
                    .into_iter()
                    .map(|(name, fields)| {
                        self.resolve_field(ty, Arc::clone(&parent), fields, path_with(&path, name.as_str()))
                    })
                    .collect::<FuturesOrdered<_>>()
                    .collect::<Vec<_>>()
                    .await;
                for (name, value) in names.into_iter().zip(values) {
                    match value {
                        Some(v) => {
                            object.add_field(name.as_str(), v);
                        }
                        None => propagated = true,
                    }
                }
            }
            (!propagated).then(|| Value::object(object))
        }
        .boxed()
    }

    fn resolve_field<'s>(
        &'s self,
        ty: &'s CompletedType,
        parent: Arc<Value>,
        fields: Vec<&'s FieldSelection>,
        path: Vec<PathSegment>,
    ) -> BoxFuture<'s, Option<Value>> {
        let span = trace_span!("resolve_field", path = %path.iter().join("."));
        async move {
            let Some(selected) = fields.first() else {
                return Some(Value::null());
            };

            if selected.name == "__typename" && self.graph.typename_enabled() {
                return Some(Value::scalar(ty.name().as_str()));
            }
            let Some(field) = ty.field_by_name(&selected.name) else {
                self.record(
                    ExecutionErrorKind::FieldNotFound,
                    &path,
                    format!("Unknown field `{}` on type `{}`", selected.name, ty.name()).into(),
                );
                return Some(Value::null());
            };
            let field_type = field.field_type();

            if self.request.cancellation.is_cancelled() {
                return self.fail(
                    ExecutionErrorKind::Cancelled,
                    &path,
                    "Request cancelled".into(),
                    field_type,
                );
            }

            let arguments = match arguments::bind(
                field,
                &selected.arguments,
                &self.request.variables,
                self.graph,
            ) {
                Ok(args) => args,
                Err(e) => {
                    return self.fail(ExecutionErrorKind::ArgumentBinding, &path, e, field_type);
                }
            };

            let resolved = match self.invoke(ty, field, parent, arguments, &path).await {
                Ok(v) => v,
                Err((kind, e)) => return self.fail(kind, &path, e, field_type),
            };

            let sub_selection = fields
                .iter()
                .flat_map(|f| &f.selection_set)
                .collect::<Vec<_>>();
            self.complete_value(field_type, resolved, sub_selection, path)
                .await
        }
        .instrument(span)
        .boxed()
    }

    /// Runs the pipeline of the `field`, racing it with the cancellation of
    /// the request.
    async fn invoke(
        &self,
        ty: &CompletedType,
        field: &CompletedField,
        parent: Arc<Value>,
        arguments: Arguments,
        path: &[PathSegment],
    ) -> Result<Value, (ExecutionErrorKind, FieldError)> {
        let Some(pipeline) = field.pipeline() else {
            return Err((
                ExecutionErrorKind::ResolverThrew,
                format!("Field `{}` of `{}` has no resolver", field.name(), ty.name()).into(),
            ));
        };
        let ctx = FieldContext {
            request: Arc::clone(&self.request),
            type_name: ty.name().clone(),
            field_name: field.name().clone(),
            parent,
            arguments,
            path: path.into(),
            result: None,
        };

        let invocation = pin!(pipeline.invoke(ctx));
        let cancelled = pin!(self.request.cancellation.cancelled());
        match future::select(invocation, cancelled).await {
            Either::Left((mut ctx, _)) => match ctx.take_result() {
                Some(Ok(v)) => Ok(v),
                Some(Err(e)) => Err((ExecutionErrorKind::ResolverThrew, e)),
                // Short-circuited without producing anything.
                None => Ok(Value::null()),
            },
            Either::Right(((), _)) => Err((ExecutionErrorKind::Cancelled, "Request cancelled".into())),
        }
    }

    /// Completes a resolved `value` of the type `ty`.
    ///
    /// [`None`] means the value is `null` in a non-null position, so the
    /// nearest nullable ancestor has to become `null` instead.
    fn complete_value<'s>(
        &'s self,
        ty: &'s Type,
        value: Value,
        selections: Vec<&'s Selection>,
        path: Vec<PathSegment>,
    ) -> BoxFuture<'s, Option<Value>> {
        async move {
            if value.is_null() {
                if ty.is_non_null() {
                    self.record(
                        ExecutionErrorKind::NonNullViolation,
                        &path,
                        format!("Cannot return null for non-null type `{ty}`").into(),
                    );
                    return None;
                }
                return Some(Value::null());
            }

            match self.complete_inner(ty, value, selections, path).await {
                Some(v) => Some(v),
                None if ty.is_non_null() => None,
                None => Some(Value::null()),
            }
        }
        .boxed()
    }

    async fn complete_inner<'s>(
        &'s self,
        ty: &'s Type,
        value: Value,
        selections: Vec<&'s Selection>,
        path: Vec<PathSegment>,
    ) -> Option<Value> {
        if let Some(item_type) = ty.list_item() {
            let Value::List(items) = value else {
                self.record(
                    ExecutionErrorKind::ResultCoercion,
                    &path,
                    format!("Expected a list of `{item_type}`, found `{value}`").into(),
                );
                return None;
            };
            let completed = items
                .into_iter()
                .enumerate()
                .map(|(i, item)| {
                    self.complete_value(item_type, item, selections.clone(), path_with(&path, i))
                })
                .collect::<FuturesOrdered<_>>()
                .collect::<Vec<_>>()
                .await;
            return completed.into_iter().collect::<Option<Vec<_>>>().map(Value::list);
        }

        let name = ty.innermost_name();
        let Some(meta) = self.graph.type_by_name(name) else {
            self.record(
                ExecutionErrorKind::ResultCoercion,
                &path,
                format!("Unknown type `{name}`").into(),
            );
            return None;
        };
        let coerced = match meta.kind() {
            TypeKind::Scalar => coerce_result(name, value),
            TypeKind::Enum => match value.as_string_value() {
                Some(v) if meta.has_enum_value(v) => Ok(value),
                _ => Err(format!("Invalid value `{value}` for enum `{name}`")),
            },
            TypeKind::Object => {
                return self
                    .resolve_selection_set(meta, Arc::new(value), selections, path, false)
                    .await;
            }
            TypeKind::Interface | TypeKind::Union => {
                let Some(concrete) = self.graph.resolve_concrete_type(meta, &value) else {
                    self.record(
                        ExecutionErrorKind::ResultCoercion,
                        &path,
                        format!("Cannot resolve the concrete type of `{name}` for `{value}`").into(),
                    );
                    return None;
                };
                return self
                    .resolve_selection_set(concrete, Arc::new(value), selections, path, false)
                    .await;
            }
            TypeKind::InputObject => Err(format!("Input object `{name}` is not an output type")),
        };
        match coerced {
            Ok(v) => Some(v),
            Err(e) => {
                self.record(ExecutionErrorKind::ResultCoercion, &path, e.into());
                None
            }
        }
    }
}

/// Checks a resolved leaf `value` against the scalar `name`.
///
/// Custom scalars take any value.
fn coerce_result(name: &str, value: Value) -> Result<Value, String> {
    use DefaultScalarValue as S;

    let mismatch = |v: &Value| format!("Expected `{name}`, found `{v}`");
    let Value::Scalar(s) = &value else {
        return if crate::schema::meta::BUILTIN_SCALARS.contains(&name) {
            Err(mismatch(&value))
        } else {
            Ok(value)
        };
    };
    let coerced = match (name, s) {
        ("Int", S::Int(_))
        | ("Float", S::Float(_))
        | ("String", S::String(_))
        | ("Boolean", S::Boolean(_))
        | ("ID", S::String(_)) => return Ok(value),
        ("Int", S::Float(f))
            if f.fract() == 0.0 && (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(f) =>
        {
            S::Int(*f as i32)
        }
        ("Float", S::Int(i)) => S::Float(f64::from(*i)),
        ("ID", S::Int(i)) => S::String(i.to_string()),
        ("Int" | "Float" | "String" | "Boolean" | "ID", _) => return Err(mismatch(&value)),
        _ => return Ok(value),
    };
    Ok(Value::Scalar(coerced))
}
