//! Reentrancy tracking for in-flight resolutions.
//!
//! Every builder invocation pushes a frame onto a thread-local stack. The
//! stack provides the dependency path reported by
//! [`DiError::CircularDependency`](crate::DiError::CircularDependency) and
//! bounds recursion through Factory definitions, which never hold a
//! construction slot and would otherwise recurse until the stack overflows.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};
use crate::key::TypeKey;

pub(crate) const MAX_DEPTH: usize = 256;

thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
}

/// Guard for one frame of the thread-local resolution stack.
pub(crate) struct ResolutionFrame {
    name: &'static str,
}

impl ResolutionFrame {
    /// Pushes `key` onto the current thread's stack.
    ///
    /// Fails once the stack is [`MAX_DEPTH`] frames deep.
    pub(crate) fn enter(key: &TypeKey) -> DiResult<Self> {
        let name = key.display_name();
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.len() >= MAX_DEPTH {
                let mut path: Vec<String> = stack.iter().map(|n| n.to_string()).collect();
                path.push(name.to_string());
                return Err(DiError::CircularDependency {
                    key: key.clone(),
                    path,
                });
            }
            stack.push(name);
            Ok(())
        })?;
        Ok(Self { name })
    }
}

impl Drop for ResolutionFrame {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            debug_assert_eq!(popped, Some(self.name));
        });
    }
}

/// Builds the error for a builder that re-entered its own construction.
///
/// The path starts at the first frame for `key` and ends with `key` again.
pub(crate) fn circular_error(key: &TypeKey) -> DiError {
    let name = key.display_name();
    let mut path: Vec<String> = RESOLUTION_STACK.with(|stack| {
        let stack = stack.borrow();
        let start = stack.iter().position(|n| *n == name).unwrap_or(0);
        stack[start..].iter().map(|n| n.to_string()).collect()
    });
    path.push(name.to_string());
    DiError::CircularDependency {
        key: key.clone(),
        path,
    }
}
