//! # Eddy
//!
//! > *Requests flow down, answers flow back.*
//!
//! Dynamically scoped algebraic effect handlers for Rust.
//!
//! ## Philosophy
//!
//! Business logic should say *what* it needs, not *how* to get it:
//! - **Effects** are plain values describing a request (read a setting, ask a
//!   user, fetch a row).
//! - **Handlers** answer them and are installed by the caller, further up the
//!   stack, for exactly as long as a scope lasts.
//!
//! Swapping a handler changes behavior without touching the code that sends
//! the effect, which makes that code trivial to test.
//!
//! ## Quick Example
//!
//! ```rust
//! use eddy::prelude::*;
//!
//! #[derive(Debug)]
//! struct Ask(String);
//!
//! static ASK: EffectClass = EffectClass::new("Ask");
//!
//! impl Effect for Ask {
//!     type Output = String;
//!
//!     fn class() -> &'static EffectClass {
//!         &ASK
//!     }
//! }
//!
//! fn greet(name: &str) -> eddy::Result<String> {
//!     send(Ask(name.to_string()))
//! }
//!
//! let greeting = Handler::new(|ask: Request<Ask>| Ok(format!("Hello, {}!", ask.0)))
//!     .scope(|| greet("Alice"));
//! assert_eq!(greeting.ok(), Some("Hello, Alice!".to_string()));
//!
//! // Outside the scope nobody answers.
//! assert!(greet("Alice").is_err_and(|e| e.is_no_handler()));
//! ```
//!
//! ## Modules
//!
//! - [`effect`] - effect values, classes and requests
//! - [`handler`] - handler entries and installation guards
//! - [`dispatch`] - `send`, `forward`, `safe_send` and friends
//! - [`stack`] - context-local handler stacks
//! - [`types`] - type matching for parameterized effects
//! - [`bind`](mod@bind) - computations bound to their own handlers
//! - [`scope`] - releasing several guards as one
//! - [`testing`] - recording handlers and assertion macros
//!
//! ## Features
//!
//! - `tracing` - dispatch decisions and stack warnings through `tracing`
//!   instead of stderr.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod bind;
pub mod dispatch;
pub mod effect;
pub mod error;
pub mod handler;
pub mod scope;
pub mod stack;
pub mod testing;
pub mod types;

// Re-exports
pub use bind::{bind, bind_current, Bound, BoundFuture, BoundIter, BoundStream};
pub use dispatch::{
    dispatch, forward, safe_dispatch, safe_send, safe_send_or, send, send_ref, Resolution,
};
pub use effect::{downcast_effect, Answer, AnyEffect, Effect, EffectClass, EffectRef, Request};
pub use error::{ConfigurationError, Error, NoHandlerError, Result, StackConsistencyWarning};
pub use handler::{barrier, install, install_all, Exit, Handler, HandlerGuard};
pub use stack::{current_stack, spawn, Context};

/// Render an effect with its inferred type arguments, e.g. `Box[i32]`.
pub fn describe(effect: &EffectRef) -> String {
    effect.describe()
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bind::{bind, bind_current};
    pub use crate::dispatch::{forward, safe_send, safe_send_or, send};
    pub use crate::effect::{Effect, EffectClass, EffectRef, Request};
    pub use crate::error::{Error, NoHandlerError};
    pub use crate::handler::{barrier, install, Handler};
    pub use crate::types::{FieldType, Reflect, TypeArg};
}
