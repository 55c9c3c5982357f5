//! Sending effects down the handler stack.
//!
//! A send walks the current context's entries from the top down and invokes
//! the first one that accepts the effect. Before each candidate runs, the
//! context's resolution pointer is moved below it, so the pointer always holds
//! the number of entries still eligible for the chain in flight:
//!
//! - [`send`] starts at the top of the stack;
//! - [`forward`] and [`Request::forward`](crate::Request::forward) continue
//!   below the entry that is answering, never reaching it or anything above;
//! - [`safe_send`] turns "nobody handles this request" into `None`.
//!
//! The pointer is restored when the send returns, whatever the outcome.

use std::any::type_name;
use std::sync::Arc;

use crate::effect::{Answer, Effect, EffectRef};
use crate::error::{Error, NoHandlerError, Result};
use crate::stack;

/// Where a send starts looking for a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    /// Start at the top of the stack.
    #[default]
    Final,
    /// Continue below the handler currently answering. With no chain in
    /// flight this is the same as `Final`.
    Forward,
}

struct PointerGuard(Option<usize>);

impl Drop for PointerGuard {
    fn drop(&mut self) {
        stack::set_pointer(self.0);
    }
}

/// Find a handler for `effect` and return its erased answer.
///
/// The handler receives the same [`EffectRef`]; an unmatched send fails with
/// [`Error::NoHandler`] carrying it.
pub fn dispatch(effect: &EffectRef, resolution: Resolution) -> Result<Answer> {
    let entries = stack::snapshot();
    let entry_pointer = stack::pointer();
    let _restore = PointerGuard(entry_pointer);

    let mut remaining = match (resolution, entry_pointer) {
        (Resolution::Forward, Some(pointer)) => pointer.min(entries.len()),
        _ => entries.len(),
    };

    while remaining > 0 {
        remaining -= 1;
        stack::set_pointer(Some(remaining));

        let candidate = &entries[remaining];
        if candidate.matches(effect.get()) {
            #[cfg(feature = "tracing")]
            tracing::trace!(
                effect = %effect.describe(),
                handler = candidate.name(),
                index = remaining,
                "effect handled"
            );
            return candidate.invoke(effect.clone());
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!(effect = %effect.describe(), ?resolution, "no handler");
    Err(NoHandlerError::new(effect.clone()).into())
}

/// Like [`dispatch`], but `Ok(None)` when nothing accepts this very instance.
///
/// A `NoHandlerError` raised for a different effect, e.g. a handler's own
/// unmet dependency, is returned unchanged.
pub fn safe_dispatch(effect: &EffectRef, resolution: Resolution) -> Result<Option<Answer>> {
    match dispatch(effect, resolution) {
        Ok(answer) => Ok(Some(answer)),
        Err(Error::NoHandler(err)) if err.is_for(effect) => Ok(None),
        Err(err) => Err(err),
    }
}

pub(crate) fn dispatch_typed<E: Effect>(
    effect: &EffectRef,
    resolution: Resolution,
) -> Result<E::Output> {
    let answer = dispatch(effect, resolution)?;
    downcast_answer::<E>(effect, answer)
}

pub(crate) fn safe_dispatch_typed<E: Effect>(
    effect: &EffectRef,
    resolution: Resolution,
) -> Result<Option<E::Output>> {
    match safe_dispatch(effect, resolution)? {
        Some(answer) => downcast_answer::<E>(effect, answer).map(Some),
        None => Ok(None),
    }
}

fn downcast_answer<E: Effect>(effect: &EffectRef, answer: Answer) -> Result<E::Output> {
    answer
        .downcast::<E::Output>()
        .map_err(|_| Error::AnswerType {
            effect: effect.describe(),
            expected: type_name::<E::Output>(),
        })
}

/// Send an effect to the closest handler that accepts it.
///
/// ```rust
/// use eddy::{send, Effect, EffectClass, Handler, Request};
///
/// #[derive(Debug)]
/// struct Ask(String);
///
/// static ASK: EffectClass = EffectClass::new("Ask");
///
/// impl Effect for Ask {
///     type Output = String;
///
///     fn class() -> &'static EffectClass {
///         &ASK
///     }
/// }
///
/// let answer = Handler::new(|ask: Request<Ask>| Ok(format!("{}?", ask.0)))
///     .scope(|| send(Ask("why".to_string())));
///
/// assert_eq!(answer.ok(), Some("why?".to_string()));
/// ```
pub fn send<E: Effect>(effect: E) -> Result<E::Output> {
    dispatch_typed::<E>(&EffectRef::new(effect), Resolution::Final)
}

/// Send a fresh effect to the handlers below the one currently answering.
pub fn forward<E: Effect>(effect: E) -> Result<E::Output> {
    dispatch_typed::<E>(&EffectRef::new(effect), Resolution::Forward)
}

/// Send an already shared instance; the handler and any `NoHandlerError`
/// see this very allocation.
pub fn send_ref<E: Effect>(effect: &Arc<E>) -> Result<E::Output> {
    dispatch_typed::<E>(&EffectRef::from_arc(Arc::clone(effect)), Resolution::Final)
}

/// Send an effect, or `Ok(None)` when no handler accepts it.
pub fn safe_send<E: Effect>(effect: E) -> Result<Option<E::Output>> {
    safe_dispatch_typed::<E>(&EffectRef::new(effect), Resolution::Final)
}

/// Send an effect, or `default` when no handler accepts it.
///
/// ```rust
/// use eddy::{safe_send_or, Effect, EffectClass};
///
/// #[derive(Debug)]
/// struct Timeout;
///
/// static TIMEOUT: EffectClass = EffectClass::new("Timeout");
///
/// impl Effect for Timeout {
///     type Output = u64;
///
///     fn class() -> &'static EffectClass {
///         &TIMEOUT
///     }
/// }
///
/// assert_eq!(safe_send_or(Timeout, 30).ok(), Some(30));
/// ```
pub fn safe_send_or<E: Effect>(effect: E, default: E::Output) -> Result<E::Output> {
    Ok(safe_send(effect)?.unwrap_or(default))
}
