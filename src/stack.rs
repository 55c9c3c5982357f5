//! Context-local handler stacks.
//!
//! Every thread owns a current [`Context`]: the ordered handler entries
//! installed so far plus the resolution pointer of the dispatch chain in
//! flight. Installing a handler changes only the calling context. Another
//! thread, a bound computation, or a bound iterator or future never sees the
//! change.
//!
//! The entry list is shared copy-on-write (`Arc<Vec<_>>`), so taking a
//! snapshot is cheap and mutating one context never aliases another.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::handler::Handler;

thread_local! {
    static CURRENT: RefCell<Context> = RefCell::new(Context::default());
}

/// A handler stack and resolution pointer that can be entered.
///
/// ```rust
/// use eddy::stack::Context;
/// use eddy::{current_stack, install, Effect, EffectClass};
///
/// #[derive(Debug)]
/// struct Ping;
///
/// static PING: EffectClass = EffectClass::new("Ping");
///
/// impl Effect for Ping {
///     type Output = ();
///
///     fn class() -> &'static EffectClass {
///         &PING
///     }
/// }
///
/// let mut context = Context::empty();
/// context.run(|| {
///     let guard = install(|_: eddy::Request<Ping>| Ok(()));
///     std::mem::forget(guard);
/// });
///
/// // The caller's stack is untouched; the context kept the entry.
/// assert!(current_stack().is_empty());
/// assert_eq!(context.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct Context {
    stack: Arc<Vec<Handler>>,
    pointer: Option<usize>,
}

impl Context {
    /// A context with no handlers.
    pub fn empty() -> Self {
        Context::default()
    }

    /// A copy of the calling context's stack, with no chain in flight.
    pub fn current() -> Self {
        Context {
            stack: snapshot(),
            pointer: None,
        }
    }

    /// Entries bottom to top.
    pub fn handlers(&self) -> &[Handler] {
        &self.stack
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// True when no handler is installed.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Run `f` with this context as the thread's current context.
    ///
    /// Whatever `f` leaves in the context is stored back into `self`, and the
    /// outer context is restored on every exit path, unwinding included.
    pub fn run<T>(&mut self, f: impl FnOnce() -> T) -> T {
        let entered = std::mem::take(self);
        let outer = CURRENT.with(|current| current.replace(entered));
        let _restore = Restore {
            slot: self,
            outer: Some(outer),
        };
        f()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("stack", &self.stack)
            .field("pointer", &self.pointer)
            .finish()
    }
}

struct Restore<'a> {
    slot: &'a mut Context,
    outer: Option<Context>,
}

impl Drop for Restore<'_> {
    fn drop(&mut self) {
        if let Some(outer) = self.outer.take() {
            let slot = &mut *self.slot;
            // Thread teardown: nothing left to restore into.
            let _ = CURRENT.try_with(|current| {
                *slot = current.replace(outer);
            });
        }
    }
}

/// The calling context's entries, bottom to top.
///
/// The result is a plain copy. It can be inspected, reordered and passed back
/// to [`bind`](crate::bind) without touching the live stack.
pub fn current_stack() -> Vec<Handler> {
    snapshot().as_ref().clone()
}

/// Spawn a thread whose context starts as a copy of the caller's stack.
///
/// `std::thread::spawn` starts with an empty stack instead.
pub fn spawn<F, T>(f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let mut context = Context::current();
    thread::spawn(move || context.run(f))
}

pub(crate) enum Removal {
    Removed,
    Missing { stack_empty: bool },
}

pub(crate) fn push(handler: Handler) {
    CURRENT.with(|current| {
        let mut current = current.borrow_mut();
        Arc::make_mut(&mut current.stack).push(handler);
    });
}

/// Remove the topmost entry that is `handler`.
pub(crate) fn remove(handler: &Handler) -> Removal {
    CURRENT.with(|current| {
        let mut current = current.borrow_mut();
        if current.stack.is_empty() {
            return Removal::Missing { stack_empty: true };
        }
        match current.stack.iter().rposition(|entry| entry.ptr_eq(handler)) {
            Some(index) => {
                Arc::make_mut(&mut current.stack).remove(index);
                Removal::Removed
            }
            None => Removal::Missing { stack_empty: false },
        }
    })
}

pub(crate) fn snapshot() -> Arc<Vec<Handler>> {
    CURRENT.with(|current| current.borrow().stack.clone())
}

pub(crate) fn pointer() -> Option<usize> {
    CURRENT.with(|current| current.borrow().pointer)
}

pub(crate) fn set_pointer(pointer: Option<usize>) {
    CURRENT.with(|current| current.borrow_mut().pointer = pointer);
}
