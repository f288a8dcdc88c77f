//! Runtime parameters passed through a resolution.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{DiError, DiResult};
use crate::registry::AnyArc;

/// Ordered tuple of runtime values handed to a builder.
///
/// Builders read values positionally with [`get`](Parameters::get), or by
/// type with [`find`](Parameters::find). Cloning is cheap: values are shared.
///
/// # Examples
///
/// ```rust
/// use ferrous_locator::{parameters_of, DiError};
///
/// let params = parameters_of!(42u16, "eu-west".to_string());
///
/// assert_eq!(params.get::<u16>(0).unwrap(), 42);
/// assert_eq!(params.get::<String>(1).unwrap(), "eu-west");
/// assert!(matches!(
///     params.get::<u16>(2),
///     Err(DiError::MissingParameter { index: 2, supplied: 2, .. })
/// ));
/// ```
#[derive(Clone, Default)]
pub struct Parameters {
    values: SmallVec<[AnyArc; 4]>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value.
    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.values.push(Arc::new(value));
        self
    }

    pub fn push<T: Any + Send + Sync>(&mut self, value: T) {
        self.values.push(Arc::new(value));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`, which must have type `T`.
    pub fn get<T: Any + Clone>(&self, index: usize) -> DiResult<T> {
        self.values
            .get(index)
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
            .ok_or_else(|| self.missing::<T>(index))
    }

    /// Like [`get`](Self::get), without the error.
    pub fn get_or_none<T: Any + Clone>(&self, index: usize) -> Option<T> {
        self.values.get(index).and_then(|v| v.downcast_ref::<T>()).cloned()
    }

    /// First value of type `T`, wherever it sits in the tuple.
    pub fn find<T: Any + Clone>(&self) -> Option<T> {
        self.values.iter().find_map(|v| v.downcast_ref::<T>()).cloned()
    }

    fn missing<T: Any>(&self, index: usize) -> DiError {
        DiError::MissingParameter {
            index,
            type_name: std::any::type_name::<T>(),
            supplied: self.values.len(),
        }
    }
}

impl fmt::Debug for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameters").field("len", &self.values.len()).finish()
    }
}

/// Builds [`Parameters`] from a list of values.
#[macro_export]
macro_rules! parameters_of {
    () => { $crate::Parameters::new() };
    ($($value:expr),+ $(,)?) => {
        $crate::Parameters::new()$(.with($value))+
    };
}

/// LIFO of parameter tuples shared by the frames of one top-level resolution.
///
/// A resolution that carries parameters pushes them for the duration of its
/// builder call; one that carries none leaves the stack alone, so a nested
/// builder reads the tuple of the closest enclosing resolution that had one.
#[derive(Default)]
pub(crate) struct ParameterStack {
    frames: RefCell<SmallVec<[Parameters; 2]>>,
}

impl ParameterStack {
    pub(crate) fn push(&self, parameters: Parameters) -> PushedParameters<'_> {
        self.frames.borrow_mut().push(parameters);
        PushedParameters { stack: self }
    }

    /// Top of the stack, or an empty tuple.
    pub(crate) fn current(&self) -> Parameters {
        self.frames.borrow().last().cloned().unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.frames.borrow().len()
    }
}

/// Pops its frame on drop, on success and failure paths alike.
pub(crate) struct PushedParameters<'a> {
    stack: &'a ParameterStack,
}

impl Drop for PushedParameters<'_> {
    fn drop(&mut self) {
        self.stack.frames.borrow_mut().pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_type_is_missing() {
        let params = Parameters::new().with(1u8);
        assert!(matches!(
            params.get::<u32>(0),
            Err(DiError::MissingParameter { index: 0, supplied: 1, .. })
        ));
        assert_eq!(params.find::<u8>(), Some(1));
    }

    #[test]
    fn stack_pops_on_guard_drop() {
        let stack = ParameterStack::default();
        assert!(stack.current().is_empty());
        {
            let _outer = stack.push(parameters_of!(1i32));
            {
                let _inner = stack.push(parameters_of!(2i32, 3i32));
                assert_eq!(stack.depth(), 2);
                assert_eq!(stack.current().get::<i32>(0).unwrap(), 2);
            }
            assert_eq!(stack.current().get::<i32>(0).unwrap(), 1);
        }
        assert_eq!(stack.depth(), 0);
    }
}
