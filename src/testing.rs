//! Testing utilities for code that sends effects.
//!
//! Business logic that only sends effects can be tested by installing stub
//! handlers. This module adds a [`Recorder`] that builds such stubs and keeps
//! every effect they receive, and assertion macros for send results.
//!
//! # Examples
//!
//! ## Recording handler
//!
//! ```rust
//! use eddy::testing::Recorder;
//! use eddy::{send, Effect, EffectClass};
//!
//! #[derive(Debug)]
//! struct Log(&'static str);
//!
//! static LOG: EffectClass = EffectClass::new("Log");
//!
//! impl Effect for Log {
//!     type Output = ();
//!
//!     fn class() -> &'static EffectClass {
//!         &LOG
//!     }
//! }
//!
//! let recorder = Recorder::new();
//! let result = recorder.handler(|_: &Log| ()).scope(|| {
//!     send(Log("start"))?;
//!     send(Log("stop"))
//! });
//!
//! assert!(result.is_ok());
//! assert_eq!(recorder.count(), 2);
//! assert_eq!(recorder.descriptions(), vec!["Log(\"start\")", "Log(\"stop\")"]);
//! ```
//!
//! ## Assertion macros
//!
//! ```rust
//! use eddy::{assert_handled, assert_no_handler, safe_send_or, send, Effect, EffectClass};
//!
//! #[derive(Debug)]
//! struct Port;
//!
//! static PORT: EffectClass = EffectClass::new("Port");
//!
//! impl Effect for Port {
//!     type Output = u16;
//!
//!     fn class() -> &'static EffectClass {
//!         &PORT
//!     }
//! }
//!
//! assert_no_handler!(send(Port));
//! assert_handled!(safe_send_or(Port, 8080), 8080);
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::effect::{Effect, EffectRef, Request};
use crate::handler::Handler;

/// Builds stub handlers that remember every effect they answer.
///
/// Clones share the same record, so a clone can be moved into a thread or a
/// bound computation while the test keeps the original.
#[derive(Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<EffectRef>>>,
}

impl Recorder {
    /// A recorder with nothing recorded.
    pub fn new() -> Self {
        Recorder::default()
    }

    /// A typed handler for `E` that records each request, then answers with
    /// `answer`.
    pub fn handler<E, F>(&self, answer: F) -> Handler
    where
        E: Effect,
        F: Fn(&E) -> E::Output + Send + Sync + 'static,
    {
        let seen = Arc::clone(&self.seen);
        Handler::new(move |request: Request<E>| {
            lock(&seen).push(request.effect_ref().clone());
            Ok(answer(&*request))
        })
        .named("recorder")
    }

    /// Every recorded effect, oldest first.
    pub fn seen(&self) -> Vec<EffectRef> {
        lock(&self.seen).clone()
    }

    /// Number of recorded effects.
    pub fn count(&self) -> usize {
        lock(&self.seen).len()
    }

    /// Descriptions of the recorded effects, oldest first.
    pub fn descriptions(&self) -> Vec<String> {
        lock(&self.seen).iter().map(EffectRef::describe).collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        lock(&self.seen).clear();
    }
}

// A handler that panicked mid-test must not hide what was recorded before it.
fn lock(seen: &Mutex<Vec<EffectRef>>) -> MutexGuard<'_, Vec<EffectRef>> {
    seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("seen", &*lock(&self.seen))
            .finish()
    }
}

/// Assert that a send failed because no handler accepted the effect.
///
/// # Example
///
/// ```rust
/// use eddy::{assert_no_handler, send, Effect, EffectClass};
///
/// #[derive(Debug)]
/// struct Clock;
///
/// static CLOCK: EffectClass = EffectClass::new("Clock");
///
/// impl Effect for Clock {
///     type Output = u64;
///
///     fn class() -> &'static EffectClass {
///         &CLOCK
///     }
/// }
///
/// assert_no_handler!(send(Clock));
/// ```
#[macro_export]
macro_rules! assert_no_handler {
    ($result:expr) => {
        match $result {
            Err($crate::Error::NoHandler(_)) => {}
            Err(e) => {
                panic!("Expected NoHandler, got error: {:?}", e);
            }
            Ok(v) => {
                panic!("Expected NoHandler, got answer: {:?}", v);
            }
        }
    };
}

/// Assert that a send was answered with the expected value.
///
/// # Example
///
/// ```rust
/// use eddy::{assert_handled, send, Effect, EffectClass, Handler, Request};
///
/// #[derive(Debug)]
/// struct Clock;
///
/// static CLOCK: EffectClass = EffectClass::new("Clock");
///
/// impl Effect for Clock {
///     type Output = u64;
///
///     fn class() -> &'static EffectClass {
///         &CLOCK
///     }
/// }
///
/// let _clock = Handler::new(|_: Request<Clock>| Ok(1_700_000_000)).install();
/// assert_handled!(send(Clock), 1_700_000_000);
/// ```
#[macro_export]
macro_rules! assert_handled {
    ($result:expr, $expected:expr) => {
        match $result {
            Ok(v) => {
                assert_eq!(v, $expected);
            }
            Err(e) => {
                panic!("Expected answer {:?}, got error: {:?}", $expected, e);
            }
        }
    };
}
