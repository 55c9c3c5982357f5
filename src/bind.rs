//! Binding computations to a fixed set of handlers.
//!
//! [`bind`] captures a handler stack once and returns a [`Bound`]
//! computation that always runs against a fresh copy of it, wherever and
//! however often it is called. The caller's own stack is never consulted,
//! unless [`bind_current`] seeds the binding with it, and never modified.
//!
//! Lazily evaluated computations keep their binding too: every step of a
//! [`BoundIter`], and every poll of a [`BoundFuture`] or [`BoundStream`],
//! re-enters the captured stack, so interleaving two bound iterators or
//! moving a bound future between worker threads does not mix their handlers.
//!
//! # Example
//!
//! ```rust
//! use eddy::{bind, send, Effect, EffectClass, Handler, Request};
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
//! let greet = |name: &str| send(Ask(name.to_string()));
//!
//! let polite = bind(greet, [Handler::new(|ask: Request<Ask>| Ok(format!("Hello, {}!", ask.0)))]);
//! let terse = bind(greet, [Handler::new(|ask: Request<Ask>| Ok(format!("Hi {}", ask.0)))]);
//!
//! assert_eq!(polite.apply("Alice").ok(), Some("Hello, Alice!".to_string()));
//! assert_eq!(terse.apply("Alice").ok(), Some("Hi Alice".to_string()));
//! assert!(greet("Alice").is_err());
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{self, Poll};

use futures::Stream;

use crate::handler::{install_all, Handler};
use crate::stack::Context;

/// Bind `computation` to `handlers`, installed in order on an empty stack.
pub fn bind<F>(computation: F, handlers: impl IntoIterator<Item = Handler>) -> Bound<F> {
    Bound::new(computation, Context::empty(), handlers)
}

/// Bind `computation` to the caller's current stack with `handlers` on top.
pub fn bind_current<F>(computation: F, handlers: impl IntoIterator<Item = Handler>) -> Bound<F> {
    Bound::new(computation, Context::current(), handlers)
}

/// A computation with its own handler stack.
pub struct Bound<F> {
    computation: F,
    context: Context,
}

impl<F> Bound<F> {
    fn new(computation: F, mut base: Context, handlers: impl IntoIterator<Item = Handler>) -> Self {
        // Handlers enter and exit once, here; the snapshot keeps the entries.
        let context = base.run(|| {
            let scope = install_all(handlers);
            let snapshot = Context::current();
            drop(scope);
            snapshot
        });

        #[cfg(feature = "tracing")]
        tracing::debug!(handlers = context.len(), "computation bound");

        Bound {
            computation,
            context,
        }
    }

    /// The captured stack.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Run a nullary computation.
    pub fn call<T>(&self) -> T
    where
        F: Fn() -> T,
    {
        self.context.clone().run(|| (self.computation)())
    }

    /// Run a unary computation.
    pub fn apply<A, T>(&self, arg: A) -> T
    where
        F: Fn(A) -> T,
    {
        self.context.clone().run(|| (self.computation)(arg))
    }

    /// Create the iterator the computation returns, bound step by step.
    pub fn iter<I>(&self) -> BoundIter<I::IntoIter>
    where
        F: Fn() -> I,
        I: IntoIterator,
    {
        let mut context = self.context.clone();
        let inner = context.run(|| (self.computation)().into_iter());
        BoundIter { inner, context }
    }

    /// Create the future the computation returns, bound poll by poll.
    ///
    /// ```rust
    /// use eddy::{bind, send, Effect, EffectClass, Handler, Request};
    ///
    /// #[derive(Debug)]
    /// struct Region;
    ///
    /// static REGION: EffectClass = EffectClass::new("Region");
    ///
    /// impl Effect for Region {
    ///     type Output = &'static str;
    ///
    ///     fn class() -> &'static EffectClass {
    ///         &REGION
    ///     }
    /// }
    ///
    /// let bound = bind(
    ///     || async { send(Region) },
    ///     [Handler::new(|_: Request<Region>| Ok("eu-west"))],
    /// );
    ///
    /// # tokio_test::block_on(async {
    /// assert_eq!(bound.future().await.ok(), Some("eu-west"));
    /// # });
    /// ```
    pub fn future<Fut>(&self) -> BoundFuture<Fut>
    where
        F: Fn() -> Fut,
        Fut: Future,
    {
        let mut context = self.context.clone();
        let inner = context.run(|| (self.computation)());
        BoundFuture {
            inner: Box::pin(inner),
            context,
        }
    }

    /// Create the stream the computation returns, bound poll by poll.
    pub fn stream<S>(&self) -> BoundStream<S>
    where
        F: Fn() -> S,
        S: Stream,
    {
        let mut context = self.context.clone();
        let inner = context.run(|| (self.computation)());
        BoundStream {
            inner: Box::pin(inner),
            context,
        }
    }
}

impl<F> fmt::Debug for Bound<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bound")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// An iterator whose every step runs against its own handler stack.
pub struct BoundIter<I> {
    inner: I,
    context: Context,
}

impl<I: Iterator> Iterator for BoundIter<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        let BoundIter { inner, context } = self;
        context.run(|| inner.next())
    }
}

impl<I> fmt::Debug for BoundIter<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundIter")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// A future polled against its own handler stack.
pub struct BoundFuture<Fut> {
    inner: Pin<Box<Fut>>,
    context: Context,
}

impl<Fut: Future> Future for BoundFuture<Fut> {
    type Output = Fut::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> Poll<Fut::Output> {
        let BoundFuture { inner, context } = self.get_mut();
        context.run(|| inner.as_mut().poll(cx))
    }
}

impl<Fut> fmt::Debug for BoundFuture<Fut> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundFuture")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// A stream polled against its own handler stack.
pub struct BoundStream<S> {
    inner: Pin<Box<S>>,
    context: Context,
}

impl<S: Stream> Stream for BoundStream<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> Poll<Option<S::Item>> {
        let BoundStream { inner, context } = self.get_mut();
        context.run(|| inner.as_mut().poll_next(cx))
    }
}

impl<S> fmt::Debug for BoundStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundStream")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
