mod field_execution {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::{
        ast::Selection,
        executor::Request,
        resolve::Resolver,
        schema::{
            builder::build_graph,
            declaration::{FieldDeclaration, TypeDeclaration, TypeRef},
            model::TypeGraph,
            shape::{MemberDescriptor, MemberType, ShapeDescriptor},
        },
        value::Value,
    };

    fn graph() -> TypeGraph {
        build_graph([
            TypeDeclaration::object("Query")
                .field(
                    FieldDeclaration::new("a")
                        .of_type(TypeRef::named("String"))
                        .constant("hello"),
                )
                .field(
                    FieldDeclaration::new("pic")
                        .of_type_literal("String!")
                        .argument(
                            crate::ArgumentDeclaration::new("size", TypeRef::named("Int"))
                                .default_value(50),
                        )
                        .resolver(Resolver::sync(|ctx| {
                            let size = ctx.argument::<i32>("size")?;
                            Ok(Value::scalar(format!("Pic of size: {size}")))
                        })),
                )
                .field(
                    FieldDeclaration::new("items")
                        .of_type(TypeRef::list(TypeRef::named("Item")))
                        .resolver(Resolver::sync(|_| {
                            Ok(Value::list(
                                [Some("apple"), None, Some("cookie")]
                                    .into_iter()
                                    .map(|name| {
                                        Value::object([("name", Value::from(name))].into_iter().collect())
                                    })
                                    .collect(),
                            ))
                        })),
                )
                .field(
                    FieldDeclaration::new("count")
                        .of_type_literal("Int")
                        .constant("many"),
                ),
            TypeDeclaration::object("Item").shape(ShapeDescriptor::Record(vec![
                MemberDescriptor::new("name", MemberType::String),
            ])),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn resolves_constants() {
        let graph = graph();
        let selection = [Selection::field("a")];

        let output = Request::new(&graph, &selection).execute().await;

        assert!(output.is_ok());
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"data": {"a": "hello"}}),
        );
    }

    #[tokio::test]
    async fn merges_aliases_and_repeated_fields() {
        let graph = graph();
        let selection = [
            Selection::field("pic"),
            Selection::field("pic").alias("big").argument("size", 200),
            Selection::field("a").alias("first"),
            Selection::field("a"),
            Selection::field("a").alias("first"),
        ];

        let output = Request::new(&graph, &selection).execute().await;

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"data": {
                "pic": "Pic of size: 50",
                "big": "Pic of size: 200",
                "first": "hello",
                "a": "hello",
            }}),
        );
    }

    #[tokio::test]
    async fn nulls_list_items_with_failed_non_null_fields() {
        let graph = graph();
        let selection = [Selection::field("items").select(vec![Selection::field("name")])];

        let output = Request::new(&graph, &selection).execute().await;

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({
                "data": {"items": [{"name": "apple"}, null, {"name": "cookie"}]},
                "errors": [{
                    "message": "Cannot return null for non-null type `String!`",
                    "path": ["items", 1, "name"],
                    "code": "NON_NULL_VIOLATION",
                }],
            }),
        );
    }

    #[tokio::test]
    async fn reports_results_not_fitting_their_type() {
        let graph = graph();
        let selection = [Selection::field("count"), Selection::field("a")];

        let output = Request::new(&graph, &selection).execute().await;

        let expected = [("count", Value::null()), ("a", Value::scalar("hello"))]
            .into_iter()
            .collect();
        assert_eq!(output.data, Some(Value::object(expected)));
        assert_eq!(output.errors.len(), 1);
        assert_eq!(output.errors[0].code(), "RESULT_COERCION_ERROR");
    }

    #[tokio::test]
    async fn reports_unknown_fields() {
        let graph = graph();
        let selection = [Selection::field("missing"), Selection::field("a")];

        let output = Request::new(&graph, &selection).execute().await;

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({
                "data": {"missing": null, "a": "hello"},
                "errors": [{
                    "message": "Unknown field `missing` on type `Query`",
                    "path": ["missing"],
                    "code": "FIELD_NOT_FOUND",
                }],
            }),
        );
    }

    #[tokio::test]
    async fn selects_typename() {
        let graph = graph();
        let selection = [
            Selection::field("__typename"),
            Selection::field("items").select(vec![Selection::field("__typename").alias("kind")]),
        ];

        let output = Request::new(&graph, &selection).execute().await;

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"data": {
                "__typename": "Query",
                "items": [{"kind": "Item"}, {"kind": "Item"}, {"kind": "Item"}],
            }}),
        );
    }
}

mod failures {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::{
        ast::Selection,
        executor::Request,
        resolve::Resolver,
        schema::{
            builder::build_graph,
            declaration::{FieldDeclaration, TypeDeclaration, TypeRef},
        },
        types::payload::{Payload, PayloadError},
        value::Value,
    };

    #[tokio::test]
    async fn propagates_non_null_failures_to_the_root() {
        let graph = build_graph([TypeDeclaration::object("Query")
            .field(
                FieldDeclaration::new("a")
                    .of_type(TypeRef::named("String"))
                    .constant("hello"),
            )
            .field(
                FieldDeclaration::new("b")
                    .of_type(TypeRef::named("String").non_null())
                    .resolver(Resolver::sync(|_| Err("boom".into()))),
            )])
        .unwrap();
        let selection = [Selection::field("a"), Selection::field("b")];

        let output = Request::new(&graph, &selection).execute().await;

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({
                "data": null,
                "errors": [{"message": "boom", "path": ["b"], "code": "RESOLVER_THREW"}],
            }),
        );
    }

    #[tokio::test]
    async fn stops_propagation_at_nullable_parents() {
        let graph = build_graph([
            TypeDeclaration::object("Query")
                .field(
                    FieldDeclaration::new("user")
                        .of_type(TypeRef::named("User"))
                        .constant(Value::object(Default::default())),
                )
                .field(FieldDeclaration::new("ok").of_type_literal("Int!").constant(1)),
            TypeDeclaration::object("User").field(
                FieldDeclaration::new("name")
                    .of_type_literal("String!")
                    .resolver(Resolver::sync(|_| Ok(Value::null()))),
            ),
        ])
        .unwrap();
        let selection = [
            Selection::field("user").select(vec![Selection::field("name")]),
            Selection::field("ok"),
        ];

        let output = Request::new(&graph, &selection).execute().await;

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({
                "data": {"user": null, "ok": 1},
                "errors": [{
                    "message": "Cannot return null for non-null type `String!`",
                    "path": ["user", "name"],
                    "code": "NON_NULL_VIOLATION",
                }],
            }),
        );
    }

    #[tokio::test]
    async fn turns_panics_into_errors() {
        let graph = build_graph([TypeDeclaration::object("Query")
            .field(
                FieldDeclaration::new("fragile")
                    .of_type_literal("String")
                    .resolver(Resolver::sync(|_| panic!("kaboom"))),
            )
            .field(FieldDeclaration::new("sturdy").of_type_literal("String").constant("fine"))])
        .unwrap();
        let selection = [Selection::field("fragile"), Selection::field("sturdy")];

        let output = Request::new(&graph, &selection).execute().await;

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({
                "data": {"fragile": null, "sturdy": "fine"},
                "errors": [{"message": "kaboom", "path": ["fragile"], "code": "RESOLVER_THREW"}],
            }),
        );
    }

    #[tokio::test]
    async fn reports_payload_errors_as_extensions() {
        let graph = build_graph([TypeDeclaration::object("Query").field(
            FieldDeclaration::new("register")
                .of_type_literal("String")
                .argument(crate::ArgumentDeclaration::new(
                    "login",
                    TypeRef::named("String").non_null(),
                ))
                .resolver(Resolver::sync(|ctx| {
                    let login = ctx.argument::<String>("login")?;
                    let payload = if login == "admin" {
                        Payload::errors(vec![
                            PayloadError::new("Login is taken").code("LOGIN_TAKEN"),
                        ])?
                    } else {
                        Payload::success(login)
                    };
                    payload.map(|l| Value::scalar(format!("Welcome, {l}"))).into_field_result()
                })),
        )])
        .unwrap();

        let selection = [Selection::field("register").argument("login", "ann")];
        let output = Request::new(&graph, &selection).execute().await;
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"data": {"register": "Welcome, ann"}}),
        );

        let selection = [Selection::field("register").argument("login", "admin")];
        let output = Request::new(&graph, &selection).execute().await;
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({
                "data": {"register": null},
                "errors": [{
                    "message": "Login is taken",
                    "path": ["register"],
                    "code": "RESOLVER_THREW",
                    "extensions": {"errors": [{"message": "Login is taken", "code": "LOGIN_TAKEN"}]},
                }],
            }),
        );
    }
}

mod scheduling {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    use crate::{
        ast::{OperationType, Selection},
        executor::{Request, execute},
        resolve::Resolver,
        schema::{
            builder::build_graph,
            declaration::{FieldDeclaration, TypeDeclaration},
            model::TypeGraph,
        },
        value::Value,
    };

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn delayed(log: &Log, name: &'static str, millis: u64) -> FieldDeclaration {
        let log = Arc::clone(log);
        FieldDeclaration::new(name)
            .of_type_literal("String")
            .resolver(Resolver::new(move |_| {
                let log = Arc::clone(&log);
                async move {
                    tokio::time::sleep(Duration::from_millis(millis)).await;
                    log.lock().unwrap().push(name);
                    Ok(Value::scalar(name))
                }
            }))
    }

    fn graph(log: &Log) -> TypeGraph {
        build_graph([
            TypeDeclaration::object("Query")
                .field(delayed(log, "slow", 50))
                .field(delayed(log, "fast", 0)),
            TypeDeclaration::object("Mutation")
                .field(delayed(log, "slow", 50))
                .field(delayed(log, "fast", 0)),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn resolves_query_fields_concurrently() {
        let log = Log::default();
        let graph = graph(&log);
        let selection = [Selection::field("slow"), Selection::field("fast")];

        let output = Request::new(&graph, &selection).execute().await;

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"data": {"slow": "slow", "fast": "fast"}}),
        );
        assert_eq!(*log.lock().unwrap(), ["fast", "slow"]);
    }

    #[tokio::test]
    async fn resolves_mutation_fields_serially() {
        let log = Log::default();
        let graph = graph(&log);
        let selection = [Selection::field("slow"), Selection::field("fast")];

        let output = Request::new(&graph, &selection)
            .operation(OperationType::Mutation)
            .execute()
            .await;

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"data": {"slow": "slow", "fast": "fast"}}),
        );
        assert_eq!(*log.lock().unwrap(), ["slow", "fast"]);
    }

    #[tokio::test]
    async fn cancels_pending_fields() {
        let graph = build_graph([TypeDeclaration::object("Query")
            .field(
                FieldDeclaration::new("slow")
                    .of_type_literal("String")
                    .resolver(Resolver::new(|_| async {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        Ok(Value::scalar("late"))
                    })),
            )
            .field(FieldDeclaration::new("fast").of_type_literal("String").constant("early"))])
        .unwrap();
        let selection = [Selection::field("slow"), Selection::field("fast")];

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let output = execute(&graph, Value::null(), &selection, &Default::default(), &token).await;

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({
                "data": {"slow": null, "fast": "early"},
                "errors": [{"message": "Request cancelled", "path": ["slow"], "code": "CANCELLED"}],
            }),
        );
    }

    #[tokio::test]
    async fn skips_fields_of_cancelled_requests() {
        let log = Log::default();
        let graph = graph(&log);
        let selection = [Selection::field("fast")];
        let token = CancellationToken::new();
        token.cancel();

        let output = Request::new(&graph, &selection)
            .cancellation(token)
            .execute()
            .await;

        assert_eq!(output.errors[0].code(), "CANCELLED");
        assert!(log.lock().unwrap().is_empty());
    }
}

mod root_values {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::{
        ast::Selection,
        executor::Request,
        resolve::Resolver,
        schema::{
            builder::build_graph,
            declaration::{FieldDeclaration, TypeDeclaration},
            shape::{MemberAccess, MemberDescriptor, MemberType, ShapeDescriptor},
        },
        value::Value,
    };

    #[tokio::test]
    async fn infers_fields_from_shapes() {
        let graph = build_graph([
            TypeDeclaration::object("Query").shape(ShapeDescriptor::Record(vec![
                MemberDescriptor::new("first_name", MemberType::String),
                MemberDescriptor::new("nickname", MemberType::option(MemberType::String)),
                MemberDescriptor::new("tags", MemberType::vec(MemberType::String)),
                MemberDescriptor::new("password", MemberType::String).access(MemberAccess::WriteOnly),
                MemberDescriptor::new("secret", MemberType::String).ignored(),
                MemberDescriptor::new("point", MemberType::named("Point")),
            ])),
            TypeDeclaration::object("Point").shape(ShapeDescriptor::Sequence(vec![
                MemberDescriptor::new("x", MemberType::Float),
                MemberDescriptor::new("y", MemberType::Float),
            ])),
        ])
        .unwrap();

        let query = graph.query_type();
        assert_eq!(
            query
                .fields()
                .map(|f| format!("{}: {}", f.name(), f.field_type()))
                .collect::<Vec<_>>(),
            [
                "firstName: String!",
                "nickname: String",
                "tags: [String!]!",
                "point: Point!",
            ],
        );

        let root: Value = serde_json::from_value(json!({
            "first_name": "Ann",
            "nickname": null,
            "tags": ["admin", "ops"],
            "point": [1.5, -2.0],
            "secret": "hunter2",
        }))
        .unwrap();
        let selection = [
            Selection::field("firstName"),
            Selection::field("nickname"),
            Selection::field("tags"),
            Selection::field("point").select(vec![Selection::field("y"), Selection::field("x")]),
        ];
        let output = Request::new(&graph, &selection)
            .root_value(root)
            .execute()
            .await;

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"data": {
                "firstName": "Ann",
                "nickname": null,
                "tags": ["admin", "ops"],
                "point": {"y": -2.0, "x": 1.5},
            }}),
        );
    }

    #[tokio::test]
    async fn exposes_request_data() {
        struct Viewer(&'static str);

        let graph = build_graph([TypeDeclaration::object("Query").field(
            FieldDeclaration::new("viewer")
                .of_type_literal("String")
                .resolver(Resolver::sync(|ctx| {
                    Ok(ctx.data::<Viewer>().map(|v| Value::scalar(v.0)).unwrap_or_default())
                })),
        )])
        .unwrap();
        let selection = [Selection::field("viewer")];

        let output = Request::new(&graph, &selection)
            .data(Viewer("ann"))
            .execute()
            .await;
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"data": {"viewer": "ann"}}),
        );

        let output = Request::new(&graph, &selection).execute().await;
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"data": {"viewer": null}}),
        );
    }
}
