//! Named bundles of definitions.

use std::sync::Arc;

use crate::definition::{root_qualifier, Definition};
use crate::error::{DiError, DiResult};
use crate::internal::Map;
use crate::key::{Qualifier, TypeKey};

/// The template a [`Scope`](crate::Scope) is instantiated from.
///
/// Definitions are indexed by primary key and by every secondary key. Within
/// one scope definition a key belongs to at most one definition.
#[derive(Clone)]
pub struct ScopeDefinition {
    qualifier: Qualifier,
    is_root: bool,
    definitions: Vec<Arc<Definition>>,
    index: Map<TypeKey, Arc<Definition>>,
}

impl ScopeDefinition {
    pub(crate) fn root() -> Self {
        Self {
            is_root: true,
            ..Self::new(root_qualifier())
        }
    }

    pub(crate) fn new(qualifier: Qualifier) -> Self {
        Self {
            qualifier,
            is_root: false,
            definitions: Vec::new(),
            index: Map::default(),
        }
    }

    pub fn qualifier(&self) -> &Qualifier {
        &self.qualifier
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    /// Definitions in insertion order.
    pub fn definitions(&self) -> &[Arc<Definition>] {
        &self.definitions
    }

    pub fn size(&self) -> usize {
        self.definitions.len()
    }

    pub fn get(&self, key: &TypeKey) -> Option<&Arc<Definition>> {
        self.index.get(key)
    }

    /// Adds `definition`, returning the equivalent definition it replaced.
    ///
    /// An equivalent definition is only replaced when the new one allows
    /// overriding. A secondary key already owned by another definition is
    /// always a conflict.
    pub(crate) fn save(&mut self, definition: Arc<Definition>) -> DiResult<Option<Arc<Definition>>> {
        let primary = definition.primary_key();
        let replaced = match self.index.get(&primary) {
            Some(existing) if existing.is_equivalent(&definition) => {
                if !definition.options().allow_override {
                    return Err(self.conflict(primary));
                }
                Some(existing.clone())
            }
            Some(_) => return Err(self.conflict(primary)),
            None => None,
        };

        for key in definition.secondary_keys() {
            if let Some(existing) = self.index.get(&key) {
                let owned_by_replaced = replaced
                    .as_ref()
                    .is_some_and(|old| Arc::ptr_eq(old, existing));
                if !owned_by_replaced {
                    return Err(self.conflict(key));
                }
            }
        }

        if let Some(old) = &replaced {
            self.detach(old);
        }
        self.index.insert(primary, definition.clone());
        for key in definition.secondary_keys() {
            self.index.insert(key, definition.clone());
        }
        self.definitions.push(definition);
        Ok(replaced)
    }

    /// Removes the definition equivalent to `definition`, if any.
    pub(crate) fn remove(&mut self, definition: &Definition) -> Option<Arc<Definition>> {
        let found = self
            .definitions
            .iter()
            .find(|d| d.is_equivalent(definition))
            .cloned()?;
        self.detach(&found);
        Some(found)
    }

    fn detach(&mut self, definition: &Arc<Definition>) {
        self.index.retain(|_, d| !Arc::ptr_eq(d, definition));
        self.definitions.retain(|d| !Arc::ptr_eq(d, definition));
    }

    fn conflict(&self, key: TypeKey) -> DiError {
        DiError::DefinitionOverride {
            key,
            scope: self.qualifier.value().to_string(),
        }
    }
}

impl std::fmt::Debug for ScopeDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeDefinition")
            .field("qualifier", &self.qualifier)
            .field("is_root", &self.is_root)
            .field("definitions", &self.definitions.len())
            .finish()
    }
}
