//! Error types for effect dispatch.
//!
//! - [`NoHandlerError`] - nothing in the searched part of the stack accepted
//!   an effect. Carries the exact instance, so [`safe_send`](crate::safe_send)
//!   can tell "nobody handles *this* request" from "a handler's own
//!   dependency is missing".
//! - [`ConfigurationError`] - a handler declared something it cannot accept.
//!   Raised when the handler is built, never during dispatch.
//! - [`StackConsistencyWarning`] - a handler was not on the stack when its
//!   guard was released. Logged, never fatal.
//! - [`Error`] - the error type of every fallible operation, including errors
//!   raised by handler code itself.

use std::error::Error as StdError;
use std::fmt;

use crate::effect::EffectRef;

/// Result alias with [`Error`] as the default error.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// No handler accepted an effect.
///
/// # Examples
///
/// ```rust
/// use eddy::{send, Effect, EffectClass, Error};
///
/// #[derive(Debug)]
/// struct Ping;
///
/// static PING: EffectClass = EffectClass::new("Ping");
///
/// impl Effect for Ping {
///     type Output = String;
///
///     fn class() -> &'static EffectClass {
///         &PING
///     }
/// }
///
/// match send(Ping) {
///     Err(Error::NoHandler(err)) => {
///         assert_eq!(err.effect().class().name(), "Ping");
///         assert_eq!(err.to_string(), "no handler for effect: Ping");
///     }
///     other => panic!("Expected NoHandler, got {:?}", other),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct NoHandlerError {
    effect: EffectRef,
}

impl NoHandlerError {
    /// Create the error for `effect`.
    pub fn new(effect: EffectRef) -> Self {
        NoHandlerError { effect }
    }

    /// The unmatched effect instance.
    pub fn effect(&self) -> &EffectRef {
        &self.effect
    }

    /// True when this error was raised for exactly `effect`.
    pub fn is_for(&self, effect: &EffectRef) -> bool {
        self.effect.ptr_eq(effect)
    }
}

impl fmt::Display for NoHandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no handler for effect: {}", self.effect.describe())
    }
}

impl StdError for NoHandlerError {}

/// A handler's acceptance declaration is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A declared member is not an effect class.
    NotAnEffect {
        /// Name of the offending type.
        found: String,
    },
    /// A class was given more type arguments than it declares.
    TooManyTypeArguments {
        /// Class name.
        class: &'static str,
        /// Number of declared type parameters.
        declared: usize,
        /// Number of type arguments given.
        given: usize,
    },
    /// The declaration accepts nothing.
    EmptyAcceptance,
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::NotAnEffect { found } => {
                write!(f, "handler must target effect classes, got non-effect type {}", found)
            }
            ConfigurationError::TooManyTypeArguments {
                class,
                declared,
                given,
            } => write!(
                f,
                "{} declares {} type parameter(s) but {} type argument(s) were given",
                class, declared, given
            ),
            ConfigurationError::EmptyAcceptance => {
                f.write_str("handler must accept at least one effect class")
            }
        }
    }
}

impl StdError for ConfigurationError {}

/// A released handler was not found on the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackConsistencyWarning {
    handler: String,
    stack_was_empty: bool,
}

impl StackConsistencyWarning {
    pub(crate) fn new(handler: String, stack_was_empty: bool) -> Self {
        StackConsistencyWarning {
            handler,
            stack_was_empty,
        }
    }

    /// Rendering of the missing handler.
    pub fn handler(&self) -> &str {
        &self.handler
    }

    /// True when the stack was empty at release time.
    pub fn stack_was_empty(&self) -> bool {
        self.stack_was_empty
    }
}

impl fmt::Display for StackConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stack_was_empty {
            write!(
                f,
                "stack empty on exit, but handler {} was expected",
                self.handler
            )
        } else {
            write!(f, "handler {} not found on stack during exit", self.handler)
        }
    }
}

impl StdError for StackConsistencyWarning {}

/// Errors produced while sending effects.
#[derive(Debug)]
pub enum Error {
    /// No handler accepted the effect.
    NoHandler(NoHandlerError),
    /// A handler was declared with an invalid acceptance.
    Configuration(ConfigurationError),
    /// A handler answered with a value of the wrong type.
    AnswerType {
        /// Description of the effect that was answered.
        effect: String,
        /// Type the sender expected.
        expected: &'static str,
    },
    /// An error raised by handler code, passed through as is.
    Handler(Box<dyn StdError + Send + Sync>),
}

impl Error {
    /// Wrap an error raised by handler logic.
    ///
    /// ```rust
    /// use eddy::Error;
    ///
    /// let err = Error::handler("disk full");
    /// assert_eq!(err.to_string(), "disk full");
    /// ```
    pub fn handler(error: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Error::Handler(error.into())
    }

    /// The `NoHandlerError`, if this is one.
    pub fn no_handler(&self) -> Option<&NoHandlerError> {
        match self {
            Error::NoHandler(err) => Some(err),
            _ => None,
        }
    }

    /// True for [`Error::NoHandler`].
    pub fn is_no_handler(&self) -> bool {
        matches!(self, Error::NoHandler(_))
    }

    /// Downcast a handler-raised error to its concrete type.
    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&T> {
        match self {
            Error::Handler(err) => err.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoHandler(err) => write!(f, "{}", err),
            Error::Configuration(err) => write!(f, "invalid handler configuration: {}", err),
            Error::AnswerType { effect, expected } => write!(
                f,
                "handler for {} answered with a type other than {}",
                effect, expected
            ),
            Error::Handler(err) => write!(f, "{}", err),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::NoHandler(err) => Some(err),
            Error::Configuration(err) => Some(err),
            Error::AnswerType { .. } => None,
            Error::Handler(err) => Some(err.as_ref()),
        }
    }
}

impl From<NoHandlerError> for Error {
    fn from(err: NoHandlerError) -> Self {
        Error::NoHandler(err)
    }
}

impl From<ConfigurationError> for Error {
    fn from(err: ConfigurationError) -> Self {
        Error::Configuration(err)
    }
}
