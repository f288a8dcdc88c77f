//! Per-scope index of instance factories.

use std::sync::Arc;

use crate::definition::{Caster, Definition};
use crate::internal::{DisposeBag, Map};
use crate::key::{TypeIdentity, TypeKey};
use crate::kind::Kind;
use crate::registry::{AnyArc, InstanceFactory};

/// Factory found for a key, with the cast to apply for secondary keys.
#[derive(Clone)]
pub(crate) struct Lookup {
    pub(crate) factory: Arc<InstanceFactory>,
    pub(crate) cast: Option<Caster>,
}

impl Lookup {
    pub(crate) fn convert(&self, value: AnyArc) -> Option<AnyArc> {
        match &self.cast {
            Some(cast) => cast(&value),
            None => Some(value),
        }
    }
}

/// Maps keys to the factories of one scope.
///
/// `factories` owns one factory per definition, in creation order. `index`
/// holds the primary entry and the secondary aliases of each factory.
pub(crate) struct InstanceRegistry {
    scope_id: Arc<str>,
    eager_enabled: bool,
    index: Map<TypeKey, Lookup>,
    factories: Vec<Arc<InstanceFactory>>,
    eager: Vec<Arc<InstanceFactory>>,
}

impl InstanceRegistry {
    /// `eager_enabled` is set for the root scope only.
    pub(crate) fn new(scope_id: Arc<str>, eager_enabled: bool) -> Self {
        Self {
            scope_id,
            eager_enabled,
            index: Map::default(),
            factories: Vec::new(),
            eager: Vec::new(),
        }
    }

    pub(crate) fn lookup(&self, key: &TypeKey) -> Option<Lookup> {
        self.index.get(key).cloned()
    }

    pub(crate) fn size(&self) -> usize {
        self.factories.len()
    }

    /// Installs one factory per definition.
    ///
    /// A factory already holding one of the new keys is detached and placed in
    /// `displaced` for disposal.
    pub(crate) fn create_factories<'a>(
        &mut self,
        definitions: impl IntoIterator<Item = &'a Arc<Definition>>,
        displaced: &mut DisposeBag,
    ) {
        for definition in definitions {
            let factory = Arc::new(InstanceFactory::new(definition.clone(), self.scope_id.clone()));
            self.install(factory, displaced);
        }
    }

    /// Installs a Single whose value is already built.
    pub(crate) fn declare(&mut self, definition: Arc<Definition>, value: AnyArc, displaced: &mut DisposeBag) {
        let factory = Arc::new(InstanceFactory::with_value(definition, self.scope_id.clone(), value));
        self.install(factory, displaced);
    }

    fn install(&mut self, factory: Arc<InstanceFactory>, displaced: &mut DisposeBag) {
        let definition = factory.definition().clone();
        let keys = std::iter::once(definition.primary_key()).chain(definition.secondary_keys());
        for key in keys {
            if let Some(previous) = self.index.get(&key).map(|l| l.factory.clone()) {
                self.detach(&previous);
                displaced.push(previous);
            }
        }

        self.index.insert(
            definition.primary_key(),
            Lookup {
                factory: factory.clone(),
                cast: None,
            },
        );
        for secondary in definition.secondary() {
            self.index.insert(
                TypeKey::new(secondary.identity(), definition.qualifier().cloned()),
                Lookup {
                    factory: factory.clone(),
                    cast: Some(secondary.caster().clone()),
                },
            );
        }
        if self.eager_enabled && definition.kind() == Kind::Single && definition.options().create_at_start {
            self.eager.push(factory.clone());
        }
        self.factories.push(factory);
    }

    /// Removes the factory built from the definition equivalent to `definition`.
    pub(crate) fn drop_definition(&mut self, definition: &Definition) -> Option<Arc<InstanceFactory>> {
        let factory = self
            .factories
            .iter()
            .find(|f| f.definition().is_equivalent(definition))
            .cloned()?;
        self.detach(&factory);
        Some(factory)
    }

    fn detach(&mut self, factory: &Arc<InstanceFactory>) {
        self.index.retain(|_, l| !Arc::ptr_eq(&l.factory, factory));
        self.factories.retain(|f| !Arc::ptr_eq(f, factory));
        self.eager.retain(|f| !Arc::ptr_eq(f, factory));
    }

    /// Already-built instances whose primary or secondary type is `identity`.
    pub(crate) fn get_all(&self, identity: TypeIdentity) -> Vec<AnyArc> {
        self.factories
            .iter()
            .filter_map(|factory| {
                let definition = factory.definition();
                if definition.primary_type() == identity {
                    factory.cached()
                } else {
                    let cast = definition.caster_for(identity)?;
                    factory.cached().and_then(|value| cast(&value))
                }
            })
            .collect()
    }

    /// First factory with primary type `primary` that also binds `secondary`.
    pub(crate) fn bind(&self, primary: TypeIdentity, secondary: TypeIdentity) -> Option<Lookup> {
        self.factories.iter().find_map(|factory| {
            let definition = factory.definition();
            if definition.primary_type() != primary {
                return None;
            }
            definition.caster_for(secondary).map(|cast| Lookup {
                factory: factory.clone(),
                cast: Some(cast.clone()),
            })
        })
    }

    pub(crate) fn eager_factories(&self) -> Vec<Arc<InstanceFactory>> {
        self.eager.clone()
    }

    /// Detaches every factory for disposal and clears the maps.
    pub(crate) fn close(&mut self, bag: &mut DisposeBag) {
        self.index.clear();
        self.eager.clear();
        bag.extend(self.factories.drain(..));
    }
}
