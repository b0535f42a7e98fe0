mod conformance {
    use pretty_assertions::assert_eq;

    use crate::schema::{
        builder::build_graph,
        declaration::{ArgumentDeclaration, FieldDeclaration, TypeDeclaration, TypeRef},
        error::{BuildError, ConformanceViolation},
    };

    fn query() -> TypeDeclaration {
        TypeDeclaration::object("Query")
            .field(FieldDeclaration::new("ok").of_type_literal("Int").constant(1))
    }

    #[test]
    fn reports_conflicting_interfaces_together() {
        let errors = build_graph([
            query(),
            TypeDeclaration::interface("A").field(
                FieldDeclaration::new("a")
                    .of_type_literal("String")
                    .argument(ArgumentDeclaration::new("x", TypeRef::named("Int"))),
            ),
            TypeDeclaration::interface("B")
                .field(FieldDeclaration::new("a").of_type_literal("String")),
            TypeDeclaration::object("C")
                .implements("A")
                .implements("B")
                .field(
                    FieldDeclaration::new("a")
                        .of_type_literal("String")
                        .argument(ArgumentDeclaration::new("x", TypeRef::named("Int")))
                        .constant("a"),
                ),
        ])
        .unwrap_err();

        assert_eq!(
            errors.into_inner(),
            [BuildError::InterfaceConformance {
                type_name: "C".into(),
                field_name: "a".into(),
                interfaces: vec!["A".into(), "B".into()],
                reason: ConformanceViolation::ConflictingInterfaces,
            }],
        );
    }

    #[test]
    fn reports_missing_and_incompatible_fields() {
        let errors = build_graph([
            query(),
            TypeDeclaration::interface("Named")
                .field(FieldDeclaration::new("name").of_type_literal("String!"))
                .field(FieldDeclaration::new("id").of_type_literal("ID!")),
            TypeDeclaration::object("Thing")
                .implements("Named")
                .field(FieldDeclaration::new("name").of_type_literal("String").constant("x")),
        ])
        .unwrap_err();

        let reasons = errors
            .iter()
            .filter_map(|e| match e {
                BuildError::InterfaceConformance {
                    field_name, reason, ..
                } => Some((field_name.as_str(), reason.clone())),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(
            reasons,
            [
                (
                    "name",
                    ConformanceViolation::IncompatibleResultType {
                        expected: "String!".parse().unwrap(),
                        found: "String".parse().unwrap(),
                    },
                ),
                ("id", ConformanceViolation::MissingField),
            ],
        );
    }

    #[test]
    fn accepts_covariant_results() {
        let graph = build_graph([
            query().field(
                FieldDeclaration::new("node")
                    .of_type(TypeRef::named("Node"))
                    .constant(crate::Value::null()),
            ),
            TypeDeclaration::interface("Node")
                .field(FieldDeclaration::new("id").of_type_literal("ID!"))
                .field(FieldDeclaration::new("parent").of_type_literal("Node")),
            TypeDeclaration::interface("Resource")
                .implements("Node")
                .field(FieldDeclaration::new("id").of_type_literal("ID!"))
                .field(FieldDeclaration::new("parent").of_type_literal("Resource")),
            TypeDeclaration::object("File")
                .implements("Resource")
                .implements("Node")
                .field(FieldDeclaration::new("id").of_type_literal("ID!").constant("f"))
                .field(
                    FieldDeclaration::new("parent")
                        .of_type_literal("File!")
                        .constant(crate::Value::null()),
                ),
        ])
        .unwrap();

        let node = graph.type_by_name("Node").unwrap();
        assert_eq!(
            graph
                .possible_types(node)
                .iter()
                .map(|t| t.name().as_str())
                .collect::<Vec<_>>(),
            ["File"],
        );
        assert!(graph.is_named_subtype("File", "Node"));
        assert!(!graph.is_named_subtype("Node", "File"));
    }

    fn pet_owner(pet: &str) -> Vec<TypeDeclaration> {
        let animal = |name: &str| {
            TypeDeclaration::object(name)
                .field(FieldDeclaration::new("name").of_type_literal("String").constant("x"))
        };
        vec![
            query(),
            TypeDeclaration::interface("HasPet")
                .field(FieldDeclaration::new("pet").of_type_literal("Pet")),
            TypeDeclaration::object("Owner").implements("HasPet").field(
                FieldDeclaration::new("pet")
                    .of_type_literal(pet)
                    .constant(crate::Value::null()),
            ),
            animal("Dog"),
            animal("Cat"),
            TypeDeclaration::union("Pet").member("Dog"),
        ]
    }

    #[test]
    fn accepts_union_members_as_covariant_results() {
        let union_last = pet_owner("Dog");
        let mut union_first = pet_owner("Dog");
        union_first.rotate_right(1);

        for declarations in [union_last, union_first] {
            let graph = build_graph(declarations).unwrap();

            assert_eq!(
                graph
                    .type_by_name("Owner")
                    .and_then(|t| t.field_by_name("pet"))
                    .map(|f| f.field_type().to_string()),
                Some("Dog".into()),
            );
            assert!(graph.is_named_subtype("Dog", "Pet"));
        }
    }

    #[test]
    fn rejects_non_members_as_union_results() {
        let mut union_first = pet_owner("Cat");
        union_first.rotate_right(1);

        for declarations in [pet_owner("Cat"), union_first] {
            let errors = build_graph(declarations).unwrap_err();

            assert_eq!(
                errors.into_inner(),
                [BuildError::InterfaceConformance {
                    type_name: "Owner".into(),
                    field_name: "pet".into(),
                    interfaces: vec!["HasPet".into()],
                    reason: ConformanceViolation::IncompatibleResultType {
                        expected: "Pet".parse().unwrap(),
                        found: "Cat".parse().unwrap(),
                    },
                }],
            );
        }
    }

    #[test]
    fn rejects_implementing_non_interfaces() {
        let errors = build_graph([
            query(),
            TypeDeclaration::object("Base")
                .field(FieldDeclaration::new("x").of_type_literal("Int").constant(1)),
            TypeDeclaration::object("Derived")
                .implements("Base")
                .field(FieldDeclaration::new("x").of_type_literal("Int").constant(1)),
        ])
        .unwrap_err();

        assert!(errors.iter().any(|e| matches!(
            e,
            BuildError::InterfaceConformance {
                reason: ConformanceViolation::NotAnInterface,
                ..
            },
        )));
    }

    #[test]
    fn rejects_non_object_union_members() {
        let errors = build_graph([
            query(),
            TypeDeclaration::union("Either").member("Int"),
        ])
        .unwrap_err();

        assert!(errors.contains_code("INVALID_UNION_MEMBER"));
    }
}

mod abstract_types {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::{
        ast::Selection,
        executor::Request,
        schema::{
            builder::build_graph,
            declaration::{FieldDeclaration, TypeDeclaration},
            model::TypeGraph,
            shape::{MemberDescriptor, MemberType, ShapeDescriptor},
        },
        value::Value,
    };

    fn pet(name: &str, extra: (&str, Value)) -> Value {
        let typename = if extra.0 == "barks" { "Dog" } else { "Cat" };
        Value::object(
            [
                ("__typename", Value::scalar(typename)),
                ("name", Value::scalar(name)),
                extra,
            ]
            .into_iter()
            .collect(),
        )
    }

    fn graph() -> TypeGraph {
        let animal = |kind: &str, extra: &str| {
            TypeDeclaration::object(kind)
                .implements("Pet")
                .shape(ShapeDescriptor::Record(vec![
                    MemberDescriptor::new("name", MemberType::String),
                    MemberDescriptor::new(extra, MemberType::Bool),
                ]))
        };

        build_graph([
            TypeDeclaration::interface("Pet")
                .field(FieldDeclaration::new("name").of_type_literal("String!")),
            animal("Dog", "barks"),
            animal("Cat", "meows"),
            TypeDeclaration::union("Search")
                .member("Dog")
                .member("Cat")
                .resolve_type(|v| {
                    let obj = v.as_object_value()?;
                    let name = if obj.contains_field("barks") { "Dog" } else { "Cat" };
                    Some(name.into())
                }),
            TypeDeclaration::object("Query")
                .field(
                    FieldDeclaration::new("pets")
                        .of_type_literal("[Pet!]!")
                        .constant(Value::list(vec![
                            pet("Rex", ("barks", Value::scalar(true))),
                            pet("Tom", ("meows", Value::scalar(false))),
                        ])),
                )
                .field(
                    FieldDeclaration::new("search")
                        .of_type_literal("[Search]")
                        .constant(Value::list(vec![
                            Value::object(
                                [("name", Value::scalar("Tom")), ("meows", Value::scalar(true))]
                                    .into_iter()
                                    .collect(),
                            ),
                            Value::scalar("not an object"),
                        ])),
                ),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn resolves_interfaces_by_typename() {
        let graph = graph();
        let selection = [Selection::field("pets").select(vec![
            Selection::field("__typename"),
            Selection::field("name"),
            Selection::inline_fragment(Some("Dog"), vec![Selection::field("barks")]),
            Selection::inline_fragment(Some("Cat"), vec![Selection::field("meows")]),
        ])];

        let output = Request::new(&graph, &selection).execute().await;

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"data": {"pets": [
                {"__typename": "Dog", "name": "Rex", "barks": true},
                {"__typename": "Cat", "name": "Tom", "meows": false},
            ]}}),
        );
    }

    #[tokio::test]
    async fn resolves_unions_with_their_resolvers() {
        let graph = graph();
        let selection = [Selection::field("search").select(vec![
            Selection::inline_fragment(Some("Pet"), vec![Selection::field("name")]),
            Selection::inline_fragment(Some("Dog"), vec![Selection::field("barks")]),
            Selection::inline_fragment(None, vec![Selection::field("__typename")]),
        ])];

        let output = Request::new(&graph, &selection).execute().await;

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({
                "data": {"search": [{"name": "Tom", "__typename": "Cat"}, null]},
                "errors": [{
                    "message": "Cannot resolve the concrete type of `Search` for `\"not an object\"`",
                    "path": ["search", 1],
                    "code": "RESULT_COERCION_ERROR",
                }],
            }),
        );
    }

    #[test]
    fn lists_possible_types() {
        let graph = graph();

        let names = |abstract_name| {
            let ty = graph.type_by_name(abstract_name).unwrap();
            let mut names = graph
                .possible_types(ty)
                .into_iter()
                .map(|t| t.name().to_string())
                .collect::<Vec<_>>();
            names.sort();
            names
        };
        assert_eq!(names("Pet"), ["Cat", "Dog"]);
        assert_eq!(names("Search"), ["Cat", "Dog"]);
        assert!(graph.is_named_subtype("Dog", "Search"));
    }
}
