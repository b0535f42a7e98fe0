//! Middleware wrapping field resolution.
//!
//! Every stage receives the [`FieldContext`] and a [`Next`] continuation. It
//! may act before and after calling [`Next::run()`], or skip it entirely to
//! short-circuit the rest of the chain. The chain of a field is composed
//! once, when the graph freezes, into a single [`Pipeline`].

use std::{fmt, future::Future, panic::AssertUnwindSafe, sync::Arc};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt as _};

use crate::{executor::FieldError, resolve::Resolver};

use super::FieldContext;

/// Stage of a field's resolution chain.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Handles the field, calling `next` to continue the chain.
    async fn call(&self, ctx: FieldContext, next: Next) -> FieldContext;
}

crate::sa::assert_obj_safe!(Middleware);

impl fmt::Debug for dyn Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Middleware")
    }
}

type Continuation = Arc<dyn Fn(FieldContext) -> BoxFuture<'static, FieldContext> + Send + Sync>;

/// Remainder of a resolution chain.
#[derive(Clone)]
pub struct Next(Continuation);

impl Next {
    /// Runs the remainder of the chain.
    pub async fn run(self, ctx: FieldContext) -> FieldContext {
        (self.0)(ctx).await
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Next")
    }
}

/// [`Middleware`] implemented by an asynchronous function.
pub struct FnMiddleware<F>(F);

/// Creates a [`Middleware`] out of an asynchronous function.
pub fn from_fn<F, Fut>(f: F) -> Arc<dyn Middleware>
where
    F: Fn(FieldContext, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FieldContext> + Send + 'static,
{
    Arc::new(FnMiddleware(f))
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(FieldContext, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FieldContext> + Send + 'static,
{
    async fn call(&self, ctx: FieldContext, next: Next) -> FieldContext {
        (self.0)(ctx, next).await
    }
}

/// Composed resolution chain of a field.
#[derive(Clone)]
pub struct Pipeline {
    entry: Continuation,
    stages: usize,
}

impl Pipeline {
    /// Composes `stages` around the `core` resolver.
    ///
    /// The first stage is the outermost one.
    pub(crate) fn compile(stages: Vec<Arc<dyn Middleware>>, core: Resolver) -> Self {
        let count = stages.len();
        let mut entry: Continuation = Arc::new(move |mut ctx: FieldContext| {
            let resolution = core.call(ctx.clone());
            async move {
                ctx.result = Some(resolution.await);
                ctx
            }
            .boxed()
        });
        for stage in stages.into_iter().rev() {
            let next = Next(entry);
            entry = Arc::new(move |ctx| {
                let stage = Arc::clone(&stage);
                let next = next.clone();
                async move { stage.call(ctx, next).await }.boxed()
            });
        }
        Self {
            entry,
            stages: count,
        }
    }

    /// Number of middleware stages around the resolver.
    pub fn stages(&self) -> usize {
        self.stages
    }

    /// Runs the chain.
    ///
    /// A panic anywhere in the chain becomes an error result.
    pub(crate) async fn invoke(&self, ctx: FieldContext) -> FieldContext {
        let fallback = ctx.clone();
        let entry = Arc::clone(&self.entry);
        // Entering the chain lazily, so synchronous resolvers panic inside
        // `catch_unwind()` too.
        let chain = async move { entry(ctx).await };
        match AssertUnwindSafe(chain).catch_unwind().await {
            Ok(ctx) => ctx,
            Err(payload) => {
                let mut ctx = fallback;
                ctx.result = Some(Err(FieldError::from_panic(payload.as_ref())));
                ctx
            }
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}
