//! Helper types for resolvers.

pub mod payload;
