//! Options controlling how a [`TypeGraph`](crate::TypeGraph) is built.

use arcstr::ArcStr;
use serde::Deserialize;

/// Options of a [`GraphBuilder`](crate::GraphBuilder).
///
/// Can be deserialized from any serde format, with every field optional:
///
/// ```rust
/// # use typegraph::BuildOptions;
/// let options = BuildOptions::from_json(r#"{"auto_camel_case": false}"#).unwrap();
///
/// assert!(!options.auto_camel_case);
/// assert_eq!(options.query_type, "Query");
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BuildOptions {
    /// Name of the type queries are resolved against.
    pub query_type: ArcStr,

    /// Name of the type mutations are resolved against, if it's declared.
    pub mutation_type: Option<ArcStr>,

    /// Whether fields inferred from record members are camel-cased.
    pub auto_camel_case: bool,

    /// Whether `__typename` may be selected on every composite type.
    pub add_typename: bool,

    /// Whether types with no fields (or values, or members) are accepted.
    pub allow_empty_types: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            query_type: arcstr::literal!("Query"),
            mutation_type: Some(arcstr::literal!("Mutation")),
            auto_camel_case: true,
            add_typename: true,
            allow_empty_types: false,
        }
    }
}

impl BuildOptions {
    /// Parses options out of a JSON document.
    ///
    /// # Errors
    ///
    /// If the document is malformed or contains unknown options.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Sets the name of the query root type.
    #[must_use]
    pub fn with_query_type(mut self, name: impl Into<ArcStr>) -> Self {
        self.query_type = name.into();
        self
    }

    /// Sets the name of the mutation root type, or disables mutations.
    #[must_use]
    pub fn with_mutation_type(mut self, name: Option<&str>) -> Self {
        self.mutation_type = name.map(Into::into);
        self
    }
}
