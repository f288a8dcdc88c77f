//! The scope tree: scope definitions and live scopes.

use std::collections::hash_map::Entry;
use std::sync::{Arc, Weak};

use tracing::debug;

use crate::config::LogLevel;
use crate::container::ContainerInner;
use crate::definition::{Definition, ScopeDefinition, ROOT_SCOPE_ID};
use crate::error::{DiError, DiResult};
use crate::internal::{DisposeBag, Map};
use crate::key::Qualifier;
use crate::module::Module;
use crate::scope::Scope;

/// Scope definitions by name and live scopes by id.
///
/// Lives behind the container's lock; every method here runs with that lock
/// held, so none of them calls user code. Factories displaced by a change are
/// collected in a [`DisposeBag`] and dropped by the caller after unlocking.
pub(crate) struct ScopeRegistry {
    container: Weak<ContainerInner>,
    log_level: LogLevel,
    definitions: Map<String, Arc<ScopeDefinition>>,
    scopes: Map<String, Scope>,
    root: Option<Scope>,
}

impl ScopeRegistry {
    pub(crate) fn new(container: Weak<ContainerInner>, log_level: LogLevel) -> Self {
        let mut registry = Self {
            container,
            log_level,
            definitions: Map::default(),
            scopes: Map::default(),
            root: None,
        };
        registry.create_root_scope_definition();
        registry
    }

    fn create_root_scope_definition(&mut self) {
        self.definitions
            .insert(ROOT_SCOPE_ID.to_string(), Arc::new(ScopeDefinition::root()));
    }

    /// Instantiates the root scope from the root scope definition.
    pub(crate) fn create_root_scope(&mut self) {
        let Some(definition) = self.definitions.get(ROOT_SCOPE_ID).cloned() else {
            return;
        };
        let root = Scope::new(
            Arc::from(ROOT_SCOPE_ID),
            definition.qualifier().clone(),
            true,
            self.log_level,
            self.container.clone(),
        );
        root.populate(definition.definitions());
        self.scopes.insert(ROOT_SCOPE_ID.to_string(), root.clone());
        self.root = Some(root);
    }

    pub(crate) fn root(&self) -> Option<&Scope> {
        self.root.as_ref()
    }

    pub(crate) fn create_scope(&mut self, id: &str, qualifier: &Qualifier) -> DiResult<Scope> {
        if self.scopes.contains_key(id) {
            return Err(DiError::ScopeAlreadyCreated {
                scope_id: id.to_string(),
            });
        }
        let definition = self
            .definitions
            .get(qualifier.value())
            .filter(|d| !d.is_root())
            .cloned()
            .ok_or_else(|| DiError::NoScopeDefFound {
                qualifier: qualifier.value().to_string(),
            })?;
        let root = self.root.clone().ok_or_else(|| DiError::ClosedScope {
            scope_id: ROOT_SCOPE_ID.to_string(),
        })?;

        if self.log_level.is_at(LogLevel::Debug) {
            debug!(scope = id, qualifier = %qualifier, "creating scope");
        }
        let scope = Scope::new(
            Arc::from(id),
            definition.qualifier().clone(),
            false,
            self.log_level,
            self.container.clone(),
        );
        scope.populate(definition.definitions());
        scope.link_root(root);
        self.scopes.insert(id.to_string(), scope.clone());
        Ok(scope)
    }

    pub(crate) fn get_scope(&self, id: &str) -> Option<Scope> {
        self.scopes.get(id).cloned()
    }

    /// Forgets `scope`, unless its id was already reused by another scope.
    pub(crate) fn remove_scope(&mut self, scope: &Scope) {
        if let Entry::Occupied(entry) = self.scopes.entry(scope.id().to_string()) {
            if entry.get().ptr_eq(scope) {
                entry.remove();
            }
        }
    }

    pub(crate) fn scope_definition(&self, name: &str) -> Option<Arc<ScopeDefinition>> {
        self.definitions.get(name).cloned()
    }

    /// Merges every module's definitions, all or nothing.
    ///
    /// Scope definitions are modified as copies and published only once every
    /// definition was accepted. Live scopes then receive a factory per new
    /// definition. Returns the number of definitions loaded.
    pub(crate) fn load(&mut self, modules: &[Module], displaced: &mut DisposeBag) -> DiResult<usize> {
        let mut staged: Map<String, ScopeDefinition> = Map::default();
        let mut added: Vec<Arc<Definition>> = Vec::new();

        // A scope block yields its scope definition even when it is empty.
        for qualifier in modules.iter().flat_map(Module::scopes) {
            let name = qualifier.value();
            if !self.definitions.contains_key(name) && !staged.contains_key(name) {
                staged.insert(name.to_string(), ScopeDefinition::new(qualifier.clone()));
            }
        }

        for definition in modules.iter().flat_map(Module::definitions) {
            let name = definition.scope_qualifier().value().to_string();
            let scope_definition = match staged.entry(name) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let current = self
                        .definitions
                        .get(entry.key())
                        .map(|d| ScopeDefinition::clone(d))
                        .unwrap_or_else(|| ScopeDefinition::new(definition.scope_qualifier().clone()));
                    entry.insert(current)
                }
            };
            let definition = Arc::new(definition.clone());
            scope_definition.save(definition.clone())?;
            added.push(definition);
        }

        for (name, scope_definition) in staged {
            self.definitions.insert(name, Arc::new(scope_definition));
        }
        for scope in self.scopes.values() {
            let name = scope.scope_qualifier().value();
            let matching: Vec<&Arc<Definition>> = added
                .iter()
                .filter(|d| d.scope_qualifier().value() == name)
                .collect();
            if !matching.is_empty() {
                scope.install_factories(matching, displaced);
            }
        }
        Ok(added.len())
    }

    /// Removes every module's definitions and the factories built from them.
    pub(crate) fn unload(&mut self, modules: &[Module], displaced: &mut DisposeBag) -> usize {
        let mut removed_count = 0;
        for definition in modules.iter().flat_map(Module::definitions) {
            let name = definition.scope_qualifier().value();
            let Some(scope_definition) = self.definitions.get_mut(name) else {
                continue;
            };
            let Some(removed) = Arc::make_mut(scope_definition).remove(definition) else {
                continue;
            };
            removed_count += 1;
            for scope in self.scopes.values() {
                if scope.scope_qualifier().value() == name {
                    if let Some(factory) = scope.remove_factory(&removed) {
                        displaced.push(factory);
                    }
                }
            }
        }
        removed_count
    }

    /// Records a declared definition in the root scope definition.
    pub(crate) fn save_root_definition(&mut self, definition: Arc<Definition>) -> DiResult<()> {
        let root = self
            .definitions
            .entry(ROOT_SCOPE_ID.to_string())
            .or_insert_with(|| Arc::new(ScopeDefinition::root()));
        Arc::make_mut(root).save(definition)?;
        Ok(())
    }

    /// Total number of definitions across all scope definitions.
    pub(crate) fn size(&self) -> usize {
        self.definitions.values().map(|d| d.size()).sum()
    }

    /// Empties the registry, handing back the live scopes to close.
    ///
    /// Non-root scopes come newest first, so later scopes close before the
    /// ones they may depend on.
    pub(crate) fn drain(&mut self) -> (Vec<Scope>, Option<Scope>) {
        let root = self.root.take();
        let mut scopes: Vec<Scope> = self
            .scopes
            .drain()
            .map(|(_, scope)| scope)
            .filter(|scope| !scope.is_root())
            .collect();
        scopes.sort_by_key(|scope| std::cmp::Reverse(scope.serial()));
        self.definitions.clear();
        (scopes, root)
    }
}
