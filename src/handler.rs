//! Handler entries and their installation guards.
//!
//! A [`Handler`] pairs a callable with the effect classes it accepts. It does
//! nothing until installed; [`Handler::install`] pushes it onto the calling
//! context's stack and returns a [`HandlerGuard`] that removes it again when
//! released or dropped, including during unwinding.
//!
//! # Example
//!
//! ```rust
//! use eddy::{send, Effect, EffectClass, Handler, Request};
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
//! let greeter = Handler::new(|ask: Request<Ask>| Ok(format!("Hello, {}!", ask.0)))
//!     .named("greeter");
//!
//! let guard = greeter.install();
//! assert_eq!(send(Ask("Alice".to_string())).ok(), Some("Hello, Alice!".to_string()));
//! guard.release().ok();
//!
//! assert!(send(Ask("Alice".to_string())).is_err());
//! ```

use std::any::type_name;
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread;

use crate::effect::{downcast_effect, AnyEffect, Answer, Effect, EffectRef, Request};
use crate::error::{ConfigurationError, Error, NoHandlerError, Result, StackConsistencyWarning};
use crate::scope::ScopeStack;
use crate::stack::{self, Removal};
use crate::types::{normalize, short_name, Accept, AcceptSpec};

type Callable = Arc<dyn Fn(EffectRef) -> Result<Answer> + Send + Sync>;
type Receives = Arc<dyn Fn(&dyn AnyEffect) -> bool + Send + Sync>;
type EnterHook = Arc<dyn Fn() + Send + Sync>;
type ExitHook = Arc<dyn for<'a> Fn(Exit<'a>) + Send + Sync>;

/// How the scope of an installed handler ended.
#[derive(Debug, Clone, Copy)]
pub enum Exit<'a> {
    /// The guard was released or dropped normally.
    Normal,
    /// The scope's computation failed with this error.
    Failed(&'a Error),
    /// The thread is unwinding from a panic.
    Panicking,
}

#[derive(Clone)]
struct Entry {
    name: Cow<'static, str>,
    accepts: Vec<AcceptSpec>,
    callable: Callable,
    receives: Option<Receives>,
    on_enter: Option<EnterHook>,
    on_exit: Option<ExitHook>,
}

/// A stack entry: a callable plus the effect classes it accepts.
///
/// Cloning is cheap and keeps identity: clones are the same entry, and a
/// guard removes the topmost occurrence of its entry.
#[derive(Clone)]
pub struct Handler {
    entry: Arc<Entry>,
}

impl Handler {
    /// A typed handler for `E`.
    ///
    /// Accepts `E`'s class, specialized to [`Effect::type_params`] when those
    /// are declared, and only effects that contain an `E`
    /// (see [`downcast_effect`]). The default name is that of the enclosing
    /// function; override it with [`named`](Handler::named).
    pub fn new<E, F>(f: F) -> Self
    where
        E: Effect,
        F: Fn(Request<E>) -> Result<E::Output> + Send + Sync + 'static,
    {
        let callable: Callable =
            Arc::new(move |effect: EffectRef| match Request::<E>::new(effect.clone()) {
                Some(request) => f(request).map(Answer::new),
                None => Err(NoHandlerError::new(effect).into()),
            });

        Handler {
            entry: Arc::new(Entry {
                name: Cow::Owned(default_name::<F>()),
                accepts: vec![AcceptSpec::of::<E>()],
                callable,
                receives: Some(Arc::new(|effect: &dyn AnyEffect| {
                    downcast_effect::<E>(effect).is_some()
                })),
                on_enter: None,
                on_exit: None,
            }),
        }
    }

    /// An erased handler for an acceptance declaration such as a union of
    /// classes, specific type arguments, or [`Accept::any`].
    ///
    /// Fails when the declaration names a non-effect type, gives a class too
    /// many type arguments, or accepts nothing.
    ///
    /// ```rust
    /// use eddy::{Answer, EffectClass, Handler};
    /// use eddy::types::Accept;
    ///
    /// static OPEN: EffectClass = EffectClass::new("Open");
    /// static CLOSE: EffectClass = EffectClass::new("Close");
    ///
    /// let audit = Handler::accepting(Accept::from(&OPEN).or(&CLOSE), |effect| {
    ///     Ok(Answer::new(effect.class().name()))
    /// });
    /// assert_eq!(
    ///     audit.map(|h| format!("{:?}", h.named("audit"))).ok(),
    ///     Some("Handler(audit, Open | Close)".to_string())
    /// );
    ///
    /// assert!(Handler::accepting(Accept::foreign::<i32>(), |_| Ok(Answer::new(()))).is_err());
    /// ```
    pub fn accepting<F>(accept: impl Into<Accept>, f: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(EffectRef) -> Result<Answer> + Send + Sync + 'static,
    {
        let accepts = normalize(&accept.into())?;
        Ok(Handler {
            entry: Arc::new(Entry {
                name: Cow::Owned(default_name::<F>()),
                accepts,
                callable: Arc::new(f),
                receives: None,
                on_enter: None,
                on_exit: None,
            }),
        })
    }

    /// A handler that refuses everything it accepts, hiding every handler
    /// below it for those effects.
    pub fn barrier(accept: impl Into<Accept>) -> Result<Self, ConfigurationError> {
        Handler::accepting(accept, |effect| Err(NoHandlerError::new(effect).into()))
            .map(|handler| handler.named("barrier"))
    }

    /// Set the name used in diagnostics.
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        Arc::make_mut(&mut self.entry).name = name.into();
        self
    }

    /// Run `hook` right after each installation.
    pub fn on_enter(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        Arc::make_mut(&mut self.entry).on_enter = Some(Arc::new(hook));
        self
    }

    /// Run `hook` whenever an installation is removed from the stack.
    ///
    /// Not called when the entry was already gone.
    pub fn on_exit(mut self, hook: impl Fn(Exit<'_>) + Send + Sync + 'static) -> Self {
        Arc::make_mut(&mut self.entry).on_exit = Some(Arc::new(hook));
        self
    }

    /// Name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    /// Normalized acceptance.
    pub fn accepts(&self) -> &[AcceptSpec] {
        &self.entry.accepts
    }

    /// True when both are the same entry.
    pub fn ptr_eq(&self, other: &Handler) -> bool {
        Arc::ptr_eq(&self.entry, &other.entry)
    }

    /// Whether this handler accepts `effect`.
    pub fn matches(&self, effect: &dyn AnyEffect) -> bool {
        if let Some(receives) = &self.entry.receives {
            if !receives(effect) {
                return false;
            }
        }
        self.entry.accepts.iter().any(|spec| spec.matches(effect))
    }

    pub(crate) fn invoke(&self, effect: EffectRef) -> Result<Answer> {
        (self.entry.callable)(effect)
    }

    /// Push onto the calling context's stack, then run `on_enter`.
    pub fn install(&self) -> HandlerGuard {
        stack::push(self.clone());
        if let Some(hook) = &self.entry.on_enter {
            hook();
        }
        HandlerGuard {
            handler: self.clone(),
            released: false,
            _context: PhantomData,
        }
    }

    /// Run `f` with this handler installed.
    ///
    /// `on_exit` sees [`Exit::Failed`] when `f` returns an error.
    pub fn scope<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let guard = self.install();
        let result = f();
        let exit = match &result {
            Ok(_) => Exit::Normal,
            Err(err) => Exit::Failed(err),
        };
        // A missing entry has already been reported.
        let _ = guard.release_with(exit);
        result
    }

    fn exit(&self, exit: Exit<'_>) -> Result<(), StackConsistencyWarning> {
        match stack::remove(self) {
            Removal::Removed => {
                if let Some(hook) = &self.entry.on_exit {
                    hook(exit);
                }
                Ok(())
            }
            Removal::Missing { stack_empty } => {
                let warning = StackConsistencyWarning::new(format!("{:?}", self), stack_empty);
                #[cfg(feature = "tracing")]
                tracing::warn!("{}", warning);
                #[cfg(not(feature = "tracing"))]
                eprintln!("warning: {}", warning);
                Err(warning)
            }
        }
    }
}

fn default_name<F>() -> String {
    short_name(type_name::<F>().trim_end_matches("::{{closure}}"))
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let accepts: Vec<String> = self.entry.accepts.iter().map(ToString::to_string).collect();
        write!(f, "Handler({}, {})", self.entry.name, accepts.join(" | "))
    }
}

/// Keeps a handler installed until released or dropped.
///
/// Must be released on the thread, and inside the context, that installed it.
#[must_use = "the handler is removed as soon as the guard is dropped"]
#[derive(Debug)]
pub struct HandlerGuard {
    handler: Handler,
    released: bool,
    _context: PhantomData<*const ()>,
}

impl HandlerGuard {
    /// The installed handler.
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Remove the handler, reporting whether it was still on the stack.
    pub fn release(self) -> Result<(), StackConsistencyWarning> {
        self.release_with(Exit::Normal)
    }

    /// Remove the handler, passing `exit` to its `on_exit` hook.
    pub fn release_with(mut self, exit: Exit<'_>) -> Result<(), StackConsistencyWarning> {
        self.released = true;
        self.handler.exit(exit)
    }
}

impl Drop for HandlerGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let exit = if thread::panicking() {
            Exit::Panicking
        } else {
            Exit::Normal
        };
        let _ = self.handler.exit(exit);
    }
}

/// Install a typed handler for `E`.
///
/// Shorthand for `Handler::new(f).install()`.
pub fn install<E, F>(f: F) -> HandlerGuard
where
    E: Effect,
    F: Fn(Request<E>) -> Result<E::Output> + Send + Sync + 'static,
{
    Handler::new(f).install()
}

/// Install handlers in order; the last one ends up on top.
///
/// The returned scope removes them in reverse order.
pub fn install_all(handlers: impl IntoIterator<Item = Handler>) -> ScopeStack<HandlerGuard> {
    let mut scope = ScopeStack::new();
    for handler in handlers {
        scope.push(handler.install());
    }
    scope
}

/// Install a barrier for `E`: sends of `E` fail with `NoHandlerError`
/// instead of reaching the handlers below.
pub fn barrier<E: Effect>() -> HandlerGuard {
    Handler::new(|request: Request<E>| {
        Err(NoHandlerError::new(request.effect_ref().clone()).into())
    })
    .named("barrier")
    .install()
}
