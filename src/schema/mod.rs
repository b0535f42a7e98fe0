//! Declaration, completion and the frozen model of type graphs.

pub mod builder;
pub(crate) mod completion;
pub mod declaration;
pub mod document;
pub mod error;
pub mod meta;
pub mod model;
pub(crate) mod order;
pub mod registry;
mod sdl;
pub mod shape;
pub(crate) mod validate;

pub use self::completion::Phase;
