//! Deferred disposal of instance factories.

use std::sync::Arc;

use crate::registry::InstanceFactory;

/// Factories detached from a registry, waiting to be dropped.
///
/// Registries hand their factories over under a lock; the bag runs the
/// `onClose` hooks once that lock is released, so user code never executes
/// while the scope graph is locked.
#[derive(Default)]
pub(crate) struct DisposeBag {
    factories: Vec<Arc<InstanceFactory>>,
}

impl DisposeBag {
    pub(crate) fn push(&mut self, factory: Arc<InstanceFactory>) {
        self.factories.push(factory);
    }

    pub(crate) fn extend(&mut self, factories: impl IntoIterator<Item = Arc<InstanceFactory>>) {
        self.factories.extend(factories);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Drops every factory in reverse insertion order (LIFO).
    pub(crate) fn run_all_reverse(mut self) {
        while let Some(factory) = self.factories.pop() {
            factory.drop_instance();
        }
    }
}
