//! Registry of type declarations, keyed by identity token.

use arcstr::ArcStr;
use fnv::FnvHashMap;
use tracing::trace;

use crate::schema::{
    declaration::{NameSource, TypeDeclaration, TypeHandle, TypeKey},
    error::BuildError,
    meta::{BUILTIN_SCALARS, TypeKind},
};

/// Outcome of looking up a [`TypeKey`] in a [`Registry`].
#[derive(Debug)]
pub enum Resolution<'r> {
    /// Something is declared under the key.
    Declared(TypeHandle, &'r TypeDeclaration),
    /// Nothing is declared under the key (yet).
    Pending,
}

/// Arena of merged declarations.
///
/// Each identity token maps to exactly one declaration. A declaration
/// registered under a key (or a literal name) seen before is merged into the
/// existing one.
#[derive(Debug)]
pub struct Registry {
    declarations: Vec<TypeDeclaration>,
    keys: FnvHashMap<TypeKey, TypeHandle>,
    literal_names: FnvHashMap<ArcStr, TypeHandle>,
    conflicts: Vec<BuildError>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates a registry holding the built-in scalars only.
    pub fn new() -> Self {
        let mut registry = Self {
            declarations: vec![],
            keys: FnvHashMap::default(),
            literal_names: FnvHashMap::default(),
            conflicts: vec![],
        };
        for name in BUILTIN_SCALARS {
            registry.register(TypeDeclaration::scalar(name));
        }
        registry
    }

    /// Registers a declaration, returning the handle it's stored under.
    ///
    /// Merging a declaration of a different kind is recorded as a
    /// [`BuildError::KindConflict`], reported when the graph is built.
    pub fn register(&mut self, declaration: TypeDeclaration) -> TypeHandle {
        let literal = match &declaration.name {
            NameSource::Literal(n) => Some(n.clone()),
            NameSource::Derived { .. } => None,
        };
        let existing = self
            .keys
            .get(&declaration.key)
            .or_else(|| literal.as_ref().and_then(|n| self.literal_names.get(n)))
            .copied();

        match existing {
            Some(handle) => {
                trace!(key = %declaration.key, %handle, "merging declaration");
                let key = declaration.key.clone();
                if let Err(e) = self.declarations[handle.index()].merge(declaration) {
                    self.conflicts.push(e);
                }
                self.keys.entry(key).or_insert(handle);
                if let Some(n) = literal {
                    self.literal_names.entry(n).or_insert(handle);
                }
                handle
            }
            None => {
                let handle = TypeHandle(self.declarations.len());
                trace!(key = %declaration.key, %handle, "registering declaration");
                self.keys.insert(declaration.key.clone(), handle);
                if let Some(n) = literal {
                    self.literal_names.insert(n, handle);
                }
                self.declarations.push(declaration);
                handle
            }
        }
    }

    /// Looks up the declaration registered under `key`.
    pub fn resolve(&self, key: &TypeKey) -> Resolution<'_> {
        match self.lookup(key) {
            Some(h) => Resolution::Declared(h, &self.declarations[h.index()]),
            None => Resolution::Pending,
        }
    }

    /// Looks up the handle registered under `key`.
    ///
    /// Falls back to literal names, so types can be referenced by their
    /// name as well.
    pub fn lookup(&self, key: &TypeKey) -> Option<TypeHandle> {
        self.keys
            .get(key)
            .or_else(|| self.literal_names.get(key.as_str()))
            .copied()
    }

    /// Returns the declaration stored under `handle`.
    pub fn declaration(&self, handle: TypeHandle) -> Option<&TypeDeclaration> {
        self.declarations.get(handle.index())
    }

    /// Iterates over all the declarations, in registration order.
    pub fn declarations(&self) -> impl Iterator<Item = (TypeHandle, &TypeDeclaration)> {
        self.declarations
            .iter()
            .enumerate()
            .map(|(i, d)| (TypeHandle(i), d))
    }

    /// Number of registered declarations, built-in scalars included.
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Always `false`, as built-in scalars are always registered.
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Kind of the declaration registered under `key`, if any.
    pub fn kind_of(&self, key: &TypeKey) -> Option<TypeKind> {
        self.lookup(key).map(|h| self.declarations[h.index()].kind)
    }

    /// Disassembles this registry into its declarations (indexed by
    /// [`TypeHandle`]), the key index, and the merge conflicts met so far.
    pub(crate) fn into_parts(
        self,
    ) -> (
        Vec<TypeDeclaration>,
        FnvHashMap<TypeKey, TypeHandle>,
        FnvHashMap<ArcStr, TypeHandle>,
        Vec<BuildError>,
    ) {
        (
            self.declarations,
            self.keys,
            self.literal_names,
            self.conflicts,
        )
    }
}
