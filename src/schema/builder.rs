//! Entry point for assembling a [`TypeGraph`] out of declarations.

use std::sync::{Arc, Mutex, PoisonError};

use arcstr::ArcStr;
use fnv::FnvHashMap;
use tracing::{debug, debug_span, info};

use crate::{
    config::BuildOptions,
    resolve::{ResolverType, middleware::Middleware},
    schema::{
        completion::Completion,
        declaration::{TypeDeclaration, TypeHandle},
        document::DocumentSource,
        error::BuildErrors,
        model::TypeGraph,
        registry::Registry,
    },
};

#[derive(Default)]
struct BuilderState {
    registry: Registry,
    middleware: Vec<Arc<dyn Middleware>>,
    resolver_types: FnvHashMap<ArcStr, ResolverType>,
    query_type: Option<ArcStr>,
    mutation_type: Option<ArcStr>,
}

/// Collects declarations from any number of sources and completes them into
/// a [`TypeGraph`].
///
/// Registration takes `&self` and may happen concurrently from multiple
/// threads; declarations targeting the same type are merged in the order
/// they're registered in.
///
/// ```rust
/// # use typegraph::{FieldDeclaration, GraphBuilder, TypeDeclaration, TypeRef};
/// let builder = GraphBuilder::default();
/// builder.register(
///     TypeDeclaration::object("Query").field(
///         FieldDeclaration::new("a")
///             .of_type(TypeRef::named("String"))
///             .constant("hello"),
///     ),
/// );
///
/// let graph = builder.build().unwrap();
/// assert!(graph.query_type().field_by_name("a").is_some());
/// ```
pub struct GraphBuilder {
    options: BuildOptions,
    state: Mutex<BuilderState>,
}

crate::sa::assert_impl_all!(GraphBuilder: Send, Sync);

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(BuildOptions::default())
    }
}

impl GraphBuilder {
    /// Creates a builder holding the built-in scalars only.
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            state: Mutex::default(),
        }
    }

    /// Options this builder was created with.
    ///
    /// Root type names of registered documents are applied on top of these
    /// when building.
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut BuilderState) -> R) -> R {
        // Registration never leaves the state half-updated.
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Registers a declaration, merging it into a previously registered one
    /// with the same key or literal name.
    pub fn register(&self, declaration: TypeDeclaration) -> TypeHandle {
        self.with_state(|s| s.registry.register(declaration))
    }

    /// Registers every declaration of a schema document.
    ///
    /// Root type names declared by the document override the ones of the
    /// [`BuildOptions`] this builder was created with.
    pub fn register_document(&self, document: &impl DocumentSource) {
        let roots = document.schema_roots();
        let declarations = document.declarations();
        debug!(count = declarations.len(), "registering document");
        self.with_state(|s| {
            if roots.query.is_some() {
                s.query_type = roots.query;
            }
            if roots.mutation.is_some() {
                s.mutation_type = roots.mutation;
            }
            for d in declarations {
                s.registry.register(d);
            }
        });
    }

    /// Adds middleware wrapping the resolution of every object field.
    ///
    /// Global middleware runs in registration order, outside of any per-field
    /// middleware.
    pub fn middleware(&self, middleware: Arc<dyn Middleware>) {
        self.with_state(|s| s.middleware.push(middleware));
    }

    /// Registers a type whose members fields may delegate resolution to.
    ///
    /// Resolver types with the same name are merged.
    pub fn resolver_type(&self, resolver_type: ResolverType) {
        self.with_state(|s| match s.resolver_types.get_mut(resolver_type.name()) {
            Some(existing) => existing.merge(resolver_type),
            None => {
                s.resolver_types
                    .insert(resolver_type.name().clone(), resolver_type);
            }
        });
    }

    /// Completes all the registered declarations into a [`TypeGraph`].
    ///
    /// # Errors
    ///
    /// With every problem found, if any declaration fails to complete. No
    /// graph is produced in that case.
    pub fn build(self) -> Result<TypeGraph, BuildErrors> {
        let _span = debug_span!("build_graph").entered();

        let state = self
            .state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let mut options = self.options;
        if let Some(query) = state.query_type {
            options.query_type = query;
        }
        if let Some(mutation) = state.mutation_type {
            options.mutation_type = Some(mutation);
        }
        let graph = Completion::new(
            state.registry,
            &options,
            &state.resolver_types,
            &state.middleware,
        )
        .run()?;

        info!(types = graph.types().count(), "graph built");
        Ok(graph)
    }
}

/// Builds a [`TypeGraph`] out of `declarations` with the default
/// [`BuildOptions`].
///
/// # Errors
///
/// With every problem found, if any declaration fails to complete.
pub fn build_graph(
    declarations: impl IntoIterator<Item = TypeDeclaration>,
) -> Result<TypeGraph, BuildErrors> {
    let builder = GraphBuilder::default();
    for d in declarations {
        builder.register(d);
    }
    builder.build()
}
