#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

// Used by the assertions sprinkled over the crate, and by implementors of
// `Middleware`.
#[doc(hidden)]
pub use {async_trait::async_trait, futures, static_assertions as sa};

#[doc(inline)]
pub use futures::future::BoxFuture;

pub mod ast;
pub mod config;
pub mod executor;
pub mod resolve;
pub mod schema;
pub mod types;
mod util;
pub mod value;

#[cfg(test)]
mod executor_tests;

pub use crate::util::to_camel_case;

pub use crate::{
    ast::{
        Directive, FieldSelection, FromInputValue, InlineFragment, InputValue, OperationType,
        Selection, Type, Variables,
    },
    config::BuildOptions,
    executor::{
        Arguments, ExecutionError, ExecutionErrorKind, ExecutionOutput, FieldError, FieldResult,
        PathSegment, Request, execute,
    },
    resolve::{
        FieldContext, Resolver, ResolverType, Thunk,
        middleware::{Middleware, Next, Pipeline, from_fn},
    },
    schema::{
        Phase,
        builder::{GraphBuilder, build_graph},
        declaration::{
            ArgumentDeclaration, Delegation, FieldDeclaration, NameComposer, NameSource,
            ResolverBinding, TypeDeclaration, TypeHandle, TypeKey, TypeRef,
        },
        document::{
            Definition, DocumentSource, EnumValueDefinition, FieldDefinition,
            InputValueDefinition, SchemaDocument, SchemaRoots, TypeDefinition,
        },
        error::{BuildError, BuildErrors, ConformanceViolation},
        meta::{
            CompletedArgument, CompletedField, CompletedType, DeprecationStatus, EnumValue,
            TypeKind, TypeResolver,
        },
        model::TypeGraph,
        registry::{Registry, Resolution},
        shape::{MemberAccess, MemberDescriptor, MemberType, ShapeDescriptor},
    },
    types::payload::{Payload, PayloadConstructionError, PayloadError},
    value::{DefaultScalarValue, Object, Value},
};
