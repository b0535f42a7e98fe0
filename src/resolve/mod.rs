//! Resolver bindings and the context they are invoked with.

pub(crate) mod binder;
pub mod middleware;

use std::{any::Any, fmt, future::Future, sync::Arc};

use arcstr::ArcStr;
use fnv::FnvHashMap;
use futures::future::{BoxFuture, FutureExt as _};
use tokio_util::sync::CancellationToken;

use crate::{
    ast::{FromInputValue, OperationType, Variables},
    executor::{Arguments, FieldResult, PathSegment},
    schema::declaration::TypeRef,
    value::Value,
};

/// Data shared by all the fields resolved in one request.
pub(crate) struct RequestContext {
    pub(crate) operation: OperationType,
    pub(crate) variables: Variables,
    pub(crate) data: Option<Arc<dyn Any + Send + Sync>>,
    pub(crate) cancellation: CancellationToken,
}

/// Everything known about a field invocation, passed through middleware to
/// the resolver.
///
/// Cloning is cheap.
#[derive(Clone)]
pub struct FieldContext {
    pub(crate) request: Arc<RequestContext>,
    pub(crate) type_name: ArcStr,
    pub(crate) field_name: ArcStr,
    pub(crate) parent: Arc<Value>,
    pub(crate) arguments: Arguments,
    pub(crate) path: Arc<[PathSegment]>,
    pub(crate) result: Option<FieldResult<Value>>,
}

impl FieldContext {
    /// Name of the object type the field is resolved on.
    pub fn type_name(&self) -> &ArcStr {
        &self.type_name
    }

    /// Name of the field being resolved.
    pub fn field_name(&self) -> &ArcStr {
        &self.field_name
    }

    /// Value of the parent object.
    pub fn parent(&self) -> &Value {
        &self.parent
    }

    /// Bound and coerced arguments of the field.
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Reads and converts a single argument.
    ///
    /// # Errors
    ///
    /// If the argument can't be converted into `T`.
    pub fn argument<T: FromInputValue>(&self, name: &str) -> FieldResult<T> {
        self.arguments.get(name)
    }

    /// Path from the root of the result to this field.
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Kind of the executed operation.
    pub fn operation(&self) -> OperationType {
        self.request.operation
    }

    /// Variables of the executed operation.
    pub fn variables(&self) -> &Variables {
        &self.request.variables
    }

    /// Request-wide data of type `T`, if it was provided.
    pub fn data<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.request.data.as_deref()?.downcast_ref()
    }

    /// Checks whether the request has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.request.cancellation.is_cancelled()
    }

    /// Result produced so far, if any.
    pub fn result(&self) -> Option<&FieldResult<Value>> {
        self.result.as_ref()
    }

    /// Replaces the result.
    ///
    /// A middleware setting it without calling the next stage
    /// short-circuits the resolver.
    pub fn set_result(&mut self, result: FieldResult<Value>) {
        self.result = Some(result);
    }

    /// Takes the result out, leaving none.
    pub fn take_result(&mut self) -> Option<FieldResult<Value>> {
        self.result.take()
    }
}

impl fmt::Debug for FieldContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldContext")
            .field("type_name", &self.type_name)
            .field("field_name", &self.field_name)
            .field("path", &self.path)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

type ResolverFn = dyn Fn(FieldContext) -> BoxFuture<'static, FieldResult<Value>> + Send + Sync;

/// Context-aware function resolving a field.
#[derive(Clone)]
pub struct Resolver {
    func: Arc<ResolverFn>,
    output: Option<TypeRef>,
}

impl Resolver {
    /// Wraps an asynchronous function.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(FieldContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FieldResult<Value>> + Send + 'static,
    {
        Self {
            func: Arc::new(move |ctx| f(ctx).boxed()),
            output: None,
        }
    }

    /// Wraps a synchronous function.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&FieldContext) -> FieldResult<Value> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(move |ctx| futures::future::ready(f(&ctx)).boxed()),
            output: None,
        }
    }

    /// Declares the type this resolver produces.
    ///
    /// Used to infer the type of a field lacking an explicit one.
    #[must_use]
    pub fn returning(mut self, output: TypeRef) -> Self {
        self.output = Some(output);
        self
    }

    /// Type this resolver declared to produce, if any.
    pub fn output(&self) -> Option<&TypeRef> {
        self.output.as_ref()
    }

    pub(crate) fn call(&self, ctx: FieldContext) -> BoxFuture<'static, FieldResult<Value>> {
        (self.func)(ctx)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

/// Zero-argument function resolving a field.
#[derive(Clone)]
pub struct Thunk(Arc<dyn Fn() -> FieldResult<Value> + Send + Sync>);

impl Thunk {
    /// Wraps the provided function.
    pub fn new(f: impl Fn() -> FieldResult<Value> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn call(&self) -> FieldResult<Value> {
        (self.0)()
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Thunk")
    }
}

/// Separately declared set of resolvers, fields may delegate to.
#[derive(Clone, Debug)]
pub struct ResolverType {
    name: ArcStr,
    members: FnvHashMap<ArcStr, Resolver>,
}

impl ResolverType {
    /// Creates an empty resolver type.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            members: FnvHashMap::default(),
        }
    }

    /// Adds a member, replacing any previous one of the same name.
    #[must_use]
    pub fn member(mut self, name: impl Into<ArcStr>, resolver: Resolver) -> Self {
        self.members.insert(name.into(), resolver);
        self
    }

    /// Name of this resolver type.
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    pub(crate) fn member_by_name(&self, name: &str) -> Option<&Resolver> {
        self.members.get(name)
    }

    pub(crate) fn merge(&mut self, other: Self) {
        self.members.extend(other.members);
    }
}
