mod completion {
    use pretty_assertions::assert_eq;

    use crate::{
        config::BuildOptions,
        schema::{
            builder::{GraphBuilder, build_graph},
            declaration::{
                ArgumentDeclaration, FieldDeclaration, TypeDeclaration, TypeKey, TypeRef,
            },
            error::BuildError,
            meta::{EnumValue, TypeKind},
        },
        value::Value,
    };

    fn query() -> TypeDeclaration {
        TypeDeclaration::object("Query").field(
            FieldDeclaration::new("ok")
                .of_type(TypeRef::named("String"))
                .constant("ok"),
        )
    }

    #[test]
    fn leaves_no_pending_references() {
        let graph = build_graph([
            TypeDeclaration::interface("Node")
                .field(FieldDeclaration::new("id").of_type(TypeRef::named("ID").non_null())),
            TypeDeclaration::object("User")
                .implements("Node")
                .field(FieldDeclaration::new("id").of_type_literal("ID!").constant("1"))
                .field(
                    FieldDeclaration::new("friends")
                        .of_type(TypeRef::list(TypeRef::named("User").non_null()))
                        .constant(Value::list(vec![])),
                ),
            TypeDeclaration::object("UserConnection")
                .keyed("connection<User>")
                .derived_name(vec!["User".into()], |n| format!("{}Connection", n[0]))
                .field(
                    FieldDeclaration::new("edges")
                        .of_type_literal("[User!]!")
                        .constant(Value::list(vec![])),
                ),
            TypeDeclaration::union("SearchResult").member("User"),
            TypeDeclaration::enumeration("Role")
                .value(EnumValue::new("ADMIN"))
                .value(EnumValue::new("GUEST")),
            TypeDeclaration::input_object("UserFilter")
                .field(FieldDeclaration::new("role").of_type(TypeRef::named("Role"))),
            TypeDeclaration::object("Query").field(
                FieldDeclaration::new("users")
                    .of_type(TypeRef::named("connection<User>").non_null())
                    .constant(Value::object([("edges", Value::list(vec![]))].into_iter().collect())),
            ),
        ])
        .unwrap();

        assert_eq!(graph.pending_references(), 0);
        assert_eq!(
            graph
                .query_type()
                .field_by_name("users")
                .unwrap()
                .field_type()
                .to_string(),
            "UserConnection!",
        );
        assert_eq!(
            graph.type_by_name("UserConnection").map(|t| t.kind()),
            Some(TypeKind::Object),
        );
        assert_eq!(
            graph
                .type_by_name("UserFilter")
                .and_then(|t| t.input_field_by_name("role"))
                .map(|f| f.arg_type().to_string()),
            Some("Role".into()),
        );
        assert_eq!(
            graph
                .type_by_name("SearchResult")
                .unwrap()
                .possible_type_names()
                .iter()
                .map(|n| n.as_str())
                .collect::<Vec<_>>(),
            ["User"],
        );
    }

    #[test]
    fn reports_derived_name_cycles_once() {
        let errors = build_graph([
            query(),
            TypeDeclaration::object("A")
                .keyed("a")
                .derived_name(vec!["b".into()], |n| format!("{}A", n[0]))
                .field(FieldDeclaration::new("x").of_type_literal("Int").constant(1)),
            TypeDeclaration::object("B")
                .keyed("b")
                .derived_name(vec!["a".into()], |n| format!("{}B", n[0]))
                .field(FieldDeclaration::new("x").of_type_literal("Int").constant(1)),
            TypeDeclaration::object("C")
                .keyed("c")
                .derived_name(vec!["a".into()], |n| format!("{}C", n[0]))
                .field(FieldDeclaration::new("x").of_type_literal("Int").constant(1)),
        ])
        .unwrap_err();

        // `c` is blocked by the cycle, but not a part of it.
        assert_eq!(errors.len(), 1);
        let BuildError::UnresolvableDependencyCycle { participants } = &errors.errors()[0] else {
            panic!("unexpected error: {}", errors.errors()[0]);
        };
        assert_eq!(participants, &[TypeKey::new("a"), TypeKey::new("b")]);
    }

    #[test]
    fn rejects_duplicate_final_names() {
        let errors = build_graph([
            query(),
            TypeDeclaration::object("Thing")
                .field(FieldDeclaration::new("x").of_type_literal("Int").constant(1)),
            TypeDeclaration::object("Other")
                .keyed("other")
                .derived_name(vec![], |_| "Thing".into())
                .field(FieldDeclaration::new("y").of_type_literal("Int").constant(2)),
        ])
        .unwrap_err();

        assert_eq!(errors.len(), 1);
        let BuildError::DuplicateName { name, keys } = &errors.errors()[0] else {
            panic!("unexpected error: {}", errors.errors()[0]);
        };
        assert_eq!(name, "Thing");
        assert_eq!(keys, &[TypeKey::new("Thing"), TypeKey::new("other")]);
    }

    #[test]
    fn rejects_reserved_and_malformed_names() {
        let errors = build_graph([
            query(),
            TypeDeclaration::object("Reserved")
                .keyed("reserved")
                .derived_name(vec![], |_| "__Reserved".into())
                .field(FieldDeclaration::new("x").of_type_literal("Int").constant(1)),
            TypeDeclaration::object("Malformed")
                .keyed("malformed")
                .derived_name(vec![], |_| "List<Int>".into())
                .field(FieldDeclaration::new("x").of_type_literal("Int").constant(1)),
        ])
        .unwrap_err();

        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.code() == "INVALID_NAME"));
    }

    #[test]
    fn collects_every_error() {
        let errors = build_graph([
            TypeDeclaration::object("Query")
                .field(FieldDeclaration::new("unbound").of_type(TypeRef::named("String")))
                .field(
                    FieldDeclaration::new("dangling")
                        .of_type(TypeRef::named("Nowhere"))
                        .constant(1),
                ),
            TypeDeclaration::object("Kind")
                .field(FieldDeclaration::new("x").of_type_literal("Int").constant(1)),
            TypeDeclaration::interface("Kind"),
        ])
        .unwrap_err();

        for code in ["MISSING_RESOLVER", "UNRESOLVED_TYPE_REFERENCE", "KIND_CONFLICT"] {
            assert!(errors.contains_code(code), "no {code} in: {errors}");
        }
    }

    #[test]
    fn rejects_malformed_type_literals() {
        let errors = build_graph([query().field(
            FieldDeclaration::new("bad")
                .of_type_literal("[String")
                .argument(ArgumentDeclaration::literal("limit", "Int!!"))
                .constant("x"),
        )])
        .unwrap_err();

        let literals = errors
            .iter()
            .filter_map(|e| match e {
                BuildError::InvalidTypeLiteral {
                    member, literal, ..
                } => Some(format!("{member}: {literal}")),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(literals, ["bad: [String", "bad(limit): Int!!"]);
    }

    #[test]
    fn rejects_types_in_the_wrong_position() {
        let errors = build_graph([
            query()
                .field(
                    FieldDeclaration::new("filter")
                        .of_type_literal("Filter")
                        .constant(Value::null()),
                )
                .field(
                    FieldDeclaration::new("find")
                        .of_type_literal("String")
                        .argument(ArgumentDeclaration::literal("by", "User"))
                        .constant("x"),
                ),
            TypeDeclaration::input_object("Filter")
                .field(FieldDeclaration::new("owner").of_type_literal("User")),
            TypeDeclaration::object("User")
                .field(FieldDeclaration::new("name").of_type_literal("String").constant("x")),
        ])
        .unwrap_err();

        let mut misplaced = errors
            .iter()
            .filter_map(|e| match e {
                BuildError::InvalidFieldType {
                    type_name,
                    member,
                    reason,
                    ..
                } => Some(format!("{type_name}.{member}: {reason}")),
                _ => None,
            })
            .collect::<Vec<_>>();
        misplaced.sort();
        assert_eq!(
            misplaced,
            [
                "Filter.owner: not an input type",
                "Query.filter: not an output type",
                "Query.find(by): not an input type",
            ],
        );
    }

    #[test]
    fn rejects_empty_types_unless_allowed() {
        let errors = build_graph([query(), TypeDeclaration::object("Empty")]).unwrap_err();
        assert!(errors.contains_code("EMPTY_TYPE"));

        let builder = GraphBuilder::new(BuildOptions {
            allow_empty_types: true,
            ..BuildOptions::default()
        });
        builder.register(query());
        builder.register(TypeDeclaration::object("Empty"));
        let graph = builder.build().unwrap();
        assert_eq!(graph.type_by_name("Empty").unwrap().fields().count(), 0);
    }

    #[test]
    fn rejects_non_object_roots() {
        let errors = build_graph([TypeDeclaration::interface("Query")
            .field(FieldDeclaration::new("x").of_type_literal("Int"))])
        .unwrap_err();

        assert!(errors.contains_code("MISSING_ROOT_TYPE"));
    }
}

mod merging {
    use pretty_assertions::assert_eq;

    use crate::{
        ast::Selection,
        executor::Request,
        resolve::Resolver,
        schema::{
            builder::build_graph,
            declaration::{FieldDeclaration, TypeDeclaration, TypeRef},
            shape::{MemberDescriptor, MemberType, ShapeDescriptor},
        },
        value::Value,
    };

    fn user() -> TypeDeclaration {
        TypeDeclaration::object("User").shape(ShapeDescriptor::Record(vec![
            MemberDescriptor::new("display_name", MemberType::String),
            MemberDescriptor::new("age", MemberType::Int),
        ]))
    }

    #[tokio::test]
    async fn explicit_fields_override_inferred_ones() {
        let graph = build_graph([
            user().field(
                FieldDeclaration::new("displayName")
                    .resolver(Resolver::sync(|_| Ok(Value::scalar("explicit")))),
            ),
            TypeDeclaration::object("Query").field(
                FieldDeclaration::new("user")
                    .of_type(TypeRef::named("User"))
                    .constant(Value::object(
                        [
                            ("display_name", Value::scalar("inferred")),
                            ("age", Value::scalar(42)),
                        ]
                        .into_iter()
                        .collect(),
                    )),
            ),
        ])
        .unwrap();

        let ty = graph.type_by_name("User").unwrap();
        assert_eq!(
            ty.fields().map(|f| f.name().as_str()).collect::<Vec<_>>(),
            ["displayName", "age"],
        );
        assert_eq!(
            ty.field_by_name("displayName").unwrap().field_type().to_string(),
            "String!",
        );

        let selection = [Selection::field("user").select(vec![
            Selection::field("displayName"),
            Selection::field("age"),
        ])];
        let output = Request::new(&graph, &selection).execute().await;

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            serde_json::json!({"data": {"user": {"displayName": "explicit", "age": 42}}}),
        );
    }

    #[test]
    fn ignored_fields_drop_inferred_ones() {
        let graph = build_graph([
            user().field(FieldDeclaration::new("age").ignored()),
            TypeDeclaration::object("Query").field(
                FieldDeclaration::new("user")
                    .of_type(TypeRef::named("User"))
                    .constant(Value::null()),
            ),
        ])
        .unwrap();

        let ty = graph.type_by_name("User").unwrap();
        assert!(ty.field_by_name("age").is_none());
        assert!(ty.field_by_name("displayName").is_some());
    }

    #[test]
    fn conflicting_inferred_types_are_ambiguous() {
        let errors = build_graph([
            user().field(
                FieldDeclaration::new("age").resolver(
                    Resolver::sync(|_| Ok(Value::scalar("forty-two")))
                        .returning(TypeRef::named("String").non_null()),
                ),
            ),
            TypeDeclaration::object("Query").field(
                FieldDeclaration::new("user")
                    .of_type(TypeRef::named("User"))
                    .constant(Value::null()),
            ),
        ])
        .unwrap_err();

        assert!(errors.contains_code("AMBIGUOUS_TYPE_INFERENCE"));
        assert_eq!(errors.errors()[0].type_names(), ["User"]);
    }

    #[test]
    fn merge_order_does_not_matter() {
        let first = || {
            TypeDeclaration::object("Query")
                .description("Entry point")
                .field(FieldDeclaration::new("a").of_type_literal("String").constant("a"))
        };
        let second = || {
            TypeDeclaration::object("Query")
                .field(FieldDeclaration::new("b").of_type_literal("Int!").constant(1))
        };

        let forward = build_graph([first(), second()]).unwrap();
        let backward = build_graph([second(), first()]).unwrap();

        let field_names = |g: &crate::TypeGraph| {
            let mut names = g
                .query_type()
                .fields()
                .map(|f| (f.name().to_string(), f.field_type().to_string()))
                .collect::<Vec<_>>();
            names.sort();
            names
        };
        assert_eq!(field_names(&forward), field_names(&backward));
        assert_eq!(
            forward.query_type().description(),
            backward.query_type().description(),
        );
    }
}

mod documents {
    use pretty_assertions::assert_eq;

    use crate::{
        ast::{Directive, InputValue, Selection},
        executor::Request,
        resolve::{Resolver, ResolverType},
        schema::{
            builder::GraphBuilder,
            declaration::{FieldDeclaration, TypeDeclaration},
            document::{FieldDefinition, SchemaDocument, TypeDefinition},
            meta::TypeKind,
        },
        value::Value,
    };

    #[tokio::test]
    async fn code_first_resolvers_complete_documents() {
        let document = SchemaDocument::new()
            .type_definition(
                TypeDefinition::new(TypeKind::Object, "Query")
                    .field(FieldDefinition::new("hello", "String!".parse().unwrap()))
                    .field(
                        FieldDefinition::new("old", "Int".parse().unwrap()).directive(
                            Directive::new(
                                "deprecated",
                                vec![("reason".into(), InputValue::scalar("use `hello`"))],
                            ),
                        ),
                    ),
            )
            .extension(
                TypeDefinition::new(TypeKind::Object, "Query")
                    .field(FieldDefinition::new("user", "User".parse().unwrap())),
            )
            .type_definition(
                TypeDefinition::new(TypeKind::Object, "User")
                    .field(FieldDefinition::new("name", "String!".parse().unwrap()))
                    .field(FieldDefinition::new("greeting", "String!".parse().unwrap()))
                    .resolved_by("UserResolvers"),
            );

        let builder = GraphBuilder::default();
        builder.register_document(&document);
        builder.resolver_type(
            ResolverType::new("UserResolvers")
                .member(
                    "name",
                    Resolver::sync(|ctx| {
                        Ok(ctx
                            .parent()
                            .as_object_value()
                            .and_then(|o| o.get_field_value("name"))
                            .cloned()
                            .unwrap_or_default())
                    }),
                )
                .member(
                    "greeting",
                    Resolver::sync(|ctx| Ok(Value::scalar(format!("Hi from {}", ctx.type_name())))),
                ),
        );
        builder.register(
            TypeDeclaration::object("Query")
                .field(FieldDeclaration::new("hello").constant("world"))
                .field(FieldDeclaration::new("old").constant(1))
                .field(FieldDeclaration::new("user").constant(Value::object(
                    [("name", Value::scalar("Ann"))].into_iter().collect(),
                ))),
        );
        let graph = builder.build().unwrap();

        assert_eq!(
            graph
                .query_type()
                .field_by_name("old")
                .unwrap()
                .deprecation_status()
                .reason(),
            Some("use `hello`"),
        );

        let selection = [
            Selection::field("hello"),
            Selection::field("user").select(vec![
                Selection::field("name"),
                Selection::field("greeting"),
            ]),
        ];
        let output = Request::new(&graph, &selection).execute().await;

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            serde_json::json!({"data": {
                "hello": "world",
                "user": {"name": "Ann", "greeting": "Hi from User"},
            }}),
        );
    }

    #[test]
    fn unregistered_resolver_types_are_reported() {
        let document = SchemaDocument::new().type_definition(
            TypeDefinition::new(TypeKind::Object, "Query")
                .field(FieldDefinition::new("hello", "String".parse().unwrap()))
                .resolved_by("Missing"),
        );

        let builder = GraphBuilder::default();
        builder.register_document(&document);
        let errors = builder.build().unwrap_err();

        assert!(errors.contains_code("MISSING_RESOLVER"));
    }
}
