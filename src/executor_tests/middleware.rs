mod ordering {
    use std::sync::{Arc, Mutex};

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::{
        ast::Selection,
        executor::Request,
        resolve::{
            Resolver,
            middleware::{Middleware, from_fn},
        },
        schema::{
            builder::GraphBuilder,
            declaration::{FieldDeclaration, TypeDeclaration},
        },
        value::Value,
    };

    type Log = Arc<Mutex<Vec<String>>>;

    fn stage(log: &Log, name: &'static str) -> Arc<dyn Middleware> {
        let log = Arc::clone(log);
        from_fn(move |ctx, next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("{name}>"));
                let ctx = next.run(ctx).await;
                log.lock().unwrap().push(format!("<{name}"));
                ctx
            }
        })
    }

    #[tokio::test]
    async fn wraps_resolvers_outermost_first() {
        let log = Log::default();
        let core_log = Arc::clone(&log);

        let builder = GraphBuilder::default();
        builder.middleware(stage(&log, "m1"));
        builder.middleware(stage(&log, "m2"));
        builder.register(
            TypeDeclaration::object("Query").field(
                FieldDeclaration::new("a")
                    .of_type_literal("String")
                    .middleware(stage(&log, "m3"))
                    .resolver(Resolver::sync(move |_| {
                        core_log.lock().unwrap().push("core".into());
                        Ok(Value::scalar("hello"))
                    })),
            ),
        );
        let graph = builder.build().unwrap();

        assert_eq!(
            graph
                .query_type()
                .field_by_name("a")
                .and_then(|f| f.pipeline())
                .map(|p| p.stages()),
            Some(3),
        );

        let selection = [Selection::field("a")];
        let output = Request::new(&graph, &selection).execute().await;

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"data": {"a": "hello"}}),
        );
        assert_eq!(
            *log.lock().unwrap(),
            ["m1>", "m2>", "m3>", "core", "<m3", "<m2", "<m1"],
        );
    }

    #[tokio::test]
    async fn appends_field_middleware_of_merged_declarations() {
        let log = Log::default();

        let builder = GraphBuilder::default();
        builder.register(
            TypeDeclaration::object("Query").field(
                FieldDeclaration::new("a")
                    .of_type_literal("String")
                    .middleware(stage(&log, "first"))
                    .constant("a"),
            ),
        );
        builder.register(
            TypeDeclaration::object("Query")
                .field(FieldDeclaration::new("a").middleware(stage(&log, "second"))),
        );
        let graph = builder.build().unwrap();

        let selection = [Selection::field("a")];
        let output = Request::new(&graph, &selection).execute().await;

        assert!(output.is_ok());
        assert_eq!(
            *log.lock().unwrap(),
            ["first>", "second>", "<second", "<first"],
        );
    }
}

mod short_circuiting {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::{
        ast::Selection,
        executor::{FieldError, Request},
        resolve::{
            FieldContext, Resolver,
            middleware::{Middleware, Next, from_fn},
        },
        schema::{
            builder::{GraphBuilder, build_graph},
            declaration::{FieldDeclaration, TypeDeclaration},
        },
        value::Value,
    };

    struct Viewer {
        admin: bool,
    }

    /// Denies fields to non-admin viewers without running their resolvers.
    struct AdminOnly;

    #[crate::async_trait]
    impl Middleware for AdminOnly {
        async fn call(&self, mut ctx: FieldContext, next: Next) -> FieldContext {
            if ctx.data::<Viewer>().is_some_and(|v| v.admin) {
                return next.run(ctx).await;
            }
            let message = format!("`{}` is for admins only", ctx.field_name());
            ctx.set_result(Err(FieldError::new(
                message,
                Value::object([("status", Value::scalar(403))].into_iter().collect()),
            )));
            ctx
        }
    }

    #[tokio::test]
    async fn skips_resolvers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let graph = build_graph([TypeDeclaration::object("Query").field(
            FieldDeclaration::new("secret")
                .of_type_literal("String")
                .middleware(Arc::new(AdminOnly))
                .resolver(Resolver::sync(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::scalar("42"))
                })),
        )])
        .unwrap();
        let selection = [Selection::field("secret")];

        let output = Request::new(&graph, &selection)
            .data(Viewer { admin: false })
            .execute()
            .await;
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({
                "data": {"secret": null},
                "errors": [{
                    "message": "`secret` is for admins only",
                    "path": ["secret"],
                    "code": "RESOLVER_THREW",
                    "extensions": {"status": 403},
                }],
            }),
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let output = Request::new(&graph, &selection)
            .data(Viewer { admin: true })
            .execute()
            .await;
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"data": {"secret": "42"}}),
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resolves_to_null_without_a_result() {
        let builder = GraphBuilder::default();
        builder.middleware(from_fn(|ctx, _| async move { ctx }));
        builder.register(
            TypeDeclaration::object("Query")
                .field(FieldDeclaration::new("a").of_type_literal("String").constant("a")),
        );
        let graph = builder.build().unwrap();
        let selection = [Selection::field("a")];

        let output = Request::new(&graph, &selection).execute().await;

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"data": {"a": null}}),
        );
    }

    #[tokio::test]
    async fn translates_errors() {
        let builder = GraphBuilder::default();
        builder.middleware(from_fn(|ctx, next| async move {
            let mut ctx = next.run(ctx).await;
            if let Some(Err(e)) = ctx.take_result() {
                let fallback = match ctx.field_name().as_str() {
                    "count" => Ok(Value::scalar(0)),
                    _ => Err(format!("{}: {}", ctx.path().len(), e.message()).into()),
                };
                ctx.set_result(fallback);
            }
            ctx
        }));
        builder.register(
            TypeDeclaration::object("Query")
                .field(
                    FieldDeclaration::new("count")
                        .of_type_literal("Int!")
                        .thunk(|| Err("backend is down".into())),
                )
                .field(
                    FieldDeclaration::new("name")
                        .of_type_literal("String")
                        .thunk(|| Err("backend is down".into())),
                ),
        );
        let graph = builder.build().unwrap();
        let selection = [Selection::field("count"), Selection::field("name")];

        let output = Request::new(&graph, &selection).execute().await;

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({
                "data": {"count": 0, "name": null},
                "errors": [{"message": "1: backend is down", "path": ["name"], "code": "RESOLVER_THREW"}],
            }),
        );
    }
}
