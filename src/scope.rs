//! Enter several scopes as one.
//!
//! [`ScopeStack`] collects guards in the order they were acquired and
//! releases them in reverse, the way nested `with` blocks or nested guards
//! would. It is what [`install_all`](crate::install_all) returns and what
//! [`bind`](crate::bind) uses to build its snapshot.

use std::fmt;

use crate::error::StackConsistencyWarning;
use crate::handler::HandlerGuard;

/// A guard that can be released explicitly and reports failure.
pub trait Release {
    /// Failure reported by an explicit release.
    type Error;

    /// Release the guard.
    fn release(self) -> Result<(), Self::Error>;
}

impl Release for HandlerGuard {
    type Error = StackConsistencyWarning;

    fn release(self) -> Result<(), StackConsistencyWarning> {
        HandlerGuard::release(self)
    }
}

/// Guards released last-in, first-out.
///
/// Dropping the stack releases whatever is left, in reverse order.
///
/// ```rust
/// use eddy::scope::{Release, ScopeStack};
/// use std::sync::{Arc, Mutex};
///
/// struct Named(&'static str, Arc<Mutex<Vec<&'static str>>>);
///
/// impl Release for Named {
///     type Error = ();
///
///     fn release(self) -> Result<(), ()> {
///         self.1.lock().unwrap().push(self.0);
///         Ok(())
///     }
/// }
///
/// let log = Arc::new(Mutex::new(Vec::new()));
/// let mut scope = ScopeStack::new();
/// scope.push(Named("outer", Arc::clone(&log)));
/// scope.push(Named("inner", Arc::clone(&log)));
/// scope.release().unwrap();
///
/// assert_eq!(*log.lock().unwrap(), vec!["inner", "outer"]);
/// ```
pub struct ScopeStack<G: Release> {
    guards: Vec<G>,
}

impl<G: Release> ScopeStack<G> {
    /// An empty stack.
    pub fn new() -> Self {
        ScopeStack { guards: Vec::new() }
    }

    /// Add a guard; it is released before every guard already held.
    pub fn push(&mut self, guard: G) {
        self.guards.push(guard);
    }

    /// Number of guards held.
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// True when no guard is held.
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Release every guard, newest first.
    ///
    /// A failing release does not stop the others; the first failure is
    /// returned.
    pub fn release(mut self) -> Result<(), G::Error> {
        let mut first_error = None;
        while let Some(guard) = self.guards.pop() {
            if let Err(err) = guard.release() {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<G: Release> Default for ScopeStack<G> {
    fn default() -> Self {
        ScopeStack::new()
    }
}

impl<G: Release> Drop for ScopeStack<G> {
    fn drop(&mut self) {
        while let Some(guard) = self.guards.pop() {
            let _ = guard.release();
        }
    }
}

impl<G: Release + fmt::Debug> fmt::Debug for ScopeStack<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeStack")
            .field("guards", &self.guards)
            .finish()
    }
}
