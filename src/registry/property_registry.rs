//! Key/value property store.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{DiError, DiResult};
use crate::internal::Map;
use crate::registry::AnyArc;

/// Thread-safe map of named values of any type.
///
/// A lookup with the wrong type behaves like a missing key.
#[derive(Default)]
pub struct PropertyRegistry {
    values: RwLock<Map<String, AnyArc>>,
}

impl PropertyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.values.write().insert(key.into(), Arc::new(value));
    }

    /// Value stored under `key`.
    pub fn get<T: Any + Clone>(&self, key: &str) -> DiResult<T> {
        self.get_opt(key).ok_or_else(|| DiError::MissingProperty {
            key: key.to_string(),
        })
    }

    pub fn get_opt<T: Any + Clone>(&self, key: &str) -> Option<T> {
        self.values
            .read()
            .get(key)
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    pub fn get_or<T: Any + Clone>(&self, key: &str, default: T) -> T {
        self.get_opt(key).unwrap_or(default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    pub fn delete(&self, key: &str) {
        self.values.write().remove(key);
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Stores string properties, converting numeric-looking values.
    ///
    /// Integers become `i64`, other numbers `f64`; anything else is stored as
    /// a `String` with surrounding double quotes removed.
    pub fn save_properties(&self, properties: &HashMap<String, String>) {
        debug!(count = properties.len(), "saving properties");
        let mut values = self.values.write();
        for (key, raw) in properties {
            values.insert(key.clone(), coerce(raw));
        }
    }

    /// Loads every process environment variable as a property.
    pub fn load_environment_properties(&self) {
        let env: HashMap<String, String> = std::env::vars().collect();
        self.save_properties(&env);
    }

    pub fn close(&self) {
        self.values.write().clear();
    }
}

fn coerce(raw: &str) -> AnyArc {
    let trimmed = raw.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return Arc::new(int);
    }
    if is_float(trimmed) {
        if let Ok(float) = trimmed.parse::<f64>() {
            return Arc::new(float);
        }
    }
    Arc::new(quoteless(raw).to_string())
}

// Rejects "inf", "NaN" and friends that `f64::from_str` would accept.
fn is_float(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}

fn quoteless(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(s)
}
