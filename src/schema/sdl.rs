use std::fmt::{self, Write as _};

use itertools::Itertools as _;

use crate::schema::{
    meta::{CompletedArgument, CompletedType, DeprecationStatus, TypeKind},
    model::TypeGraph,
};

impl TypeGraph {
    /// Renders this graph in the schema definition language.
    ///
    /// Built-in scalars are omitted and the other types are sorted by name,
    /// so the output only depends on the graph's contents.
    pub fn to_sdl(&self) -> String {
        let mut out = String::new();
        // Writing into a `String` never fails.
        _ = self.write_sdl(&mut out);
        out
    }

    fn write_sdl(&self, out: &mut String) -> fmt::Result {
        let default_roots =
            self.query_type_name == "Query" && self.mutation_type_name.as_deref().is_none_or(|m| m == "Mutation");
        if !default_roots {
            writeln!(out, "schema {{")?;
            writeln!(out, "  query: {}", self.query_type_name)?;
            if let Some(m) = &self.mutation_type_name {
                writeln!(out, "  mutation: {m}")?;
            }
            writeln!(out, "}}\n")?;
        }

        let types = self
            .types()
            .filter(|t| !t.is_builtin())
            .sorted_by(|a, b| a.name().cmp(b.name()));
        for (i, t) in types.enumerate() {
            if i > 0 {
                out.push('\n');
            }
            write_type(out, t)?;
        }
        Ok(())
    }
}

fn write_description(out: &mut String, indent: &str, description: Option<&str>) -> fmt::Result {
    if let Some(d) = description {
        writeln!(out, "{indent}{}", serde_json::Value::from(d))?;
    }
    Ok(())
}

fn write_deprecation(out: &mut String, status: &DeprecationStatus) -> fmt::Result {
    match status {
        DeprecationStatus::Current => Ok(()),
        DeprecationStatus::Deprecated(None) => write!(out, " @deprecated"),
        DeprecationStatus::Deprecated(Some(reason)) => write!(
            out,
            " @deprecated(reason: {})",
            serde_json::Value::from(reason.as_str()),
        ),
    }
}

fn write_input_value(out: &mut String, arg: &CompletedArgument) -> fmt::Result {
    write!(out, "{}: {}", arg.name(), arg.arg_type())?;
    if let Some(v) = arg.default_value() {
        write!(out, " = {v}")?;
    }
    Ok(())
}

fn write_type(out: &mut String, t: &CompletedType) -> fmt::Result {
    write_description(out, "", t.description().map(|d| d.as_str()))?;
    match t.kind() {
        TypeKind::Scalar => return writeln!(out, "scalar {}", t.name()),
        TypeKind::Union => {
            return writeln!(
                out,
                "union {} = {}",
                t.name(),
                t.possible_type_names().iter().join(" | "),
            );
        }
        TypeKind::Object => write!(out, "type {}", t.name())?,
        TypeKind::Interface => write!(out, "interface {}", t.name())?,
        TypeKind::InputObject => write!(out, "input {}", t.name())?,
        TypeKind::Enum => write!(out, "enum {}", t.name())?,
    }
    if !t.interface_names().is_empty() {
        write!(out, " implements {}", t.interface_names().iter().join(" & "))?;
    }
    writeln!(out, " {{")?;

    for v in t.enum_values() {
        write_description(out, "  ", v.description.as_deref())?;
        write!(out, "  {}", v.name)?;
        write_deprecation(out, &v.deprecation_status)?;
        out.push('\n');
    }
    for f in t.input_fields() {
        write_description(out, "  ", f.description().map(|d| d.as_str()))?;
        out.push_str("  ");
        write_input_value(out, f)?;
        out.push('\n');
    }
    for f in t.fields() {
        write_description(out, "  ", f.description().map(|d| d.as_str()))?;
        write!(out, "  {}", f.name())?;
        let mut args = f.arguments().peekable();
        if args.peek().is_some() {
            out.push('(');
            for (i, a) in args.enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_input_value(out, a)?;
            }
            out.push(')');
        }
        write!(out, ": {}", f.field_type())?;
        write_deprecation(out, f.deprecation_status())?;
        out.push('\n');
    }
    writeln!(out, "}}")
}
