//! Routing of decoded events to subscribers keyed by kind.
//!
//! A [`Dispatcher`] owns its registrations; there is no process-wide
//! emitter. Catch-all subscribers run before kind-specific ones, each group
//! in registration order. A failing handler is reported back to the caller
//! of [`Dispatcher::publish`] and never stops the remaining handlers.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Kind tags that can be subscribed to.
pub trait Topic: Copy + Eq + fmt::Debug + fmt::Display + FromStr {
    /// Name accepted by [`Subscription::from_str`] for the catch-all channel.
    const CATCH_ALL: &'static str;
}

/// Events that report their own kind for routing.
pub trait Routed {
    /// Tag type used to key subscriptions.
    type Kind: Topic;

    /// Kind of this event.
    fn kind(&self) -> Self::Kind;
}

/// Which events a handler receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription<K> {
    /// Every event regardless of kind.
    Any,
    /// Only events of the given kind.
    Kind(K),
}

impl<K: Topic> From<K> for Subscription<K> {
    fn from(kind: K) -> Self {
        Self::Kind(kind)
    }
}

impl<K: Topic> fmt::Display for Subscription<K> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => formatter.write_str(K::CATCH_ALL),
            Self::Kind(kind) => write!(formatter, "{kind}"),
        }
    }
}

impl<K: Topic> FromStr for Subscription<K> {
    type Err = UnknownTopic;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.eq_ignore_ascii_case(K::CATCH_ALL) || input.eq_ignore_ascii_case("any") {
            return Ok(Self::Any);
        }
        input
            .parse::<K>()
            .map(Self::Kind)
            .map_err(|_| UnknownTopic(input.to_owned()))
    }
}

/// Raised when a subscription name matches no known kind.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown event kind '{0}'")]
pub struct UnknownTopic(pub String);

/// Error type returned by fallible handlers.
pub type HandlerError = Box<dyn StdError + Send + Sync + 'static>;

type Handler<E> = Box<dyn FnMut(&E) -> Result<(), HandlerError> + Send + 'static>;

/// Identifies one registration within its dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

struct Registration<E: Routed> {
    id: SubscriptionId,
    topic: Subscription<E::Kind>,
    handler: Handler<E>,
}

/// Registry of handlers for one event type.
pub struct Dispatcher<E: Routed> {
    registrations: Vec<Registration<E>>,
    next_id: u64,
}

impl<E: Routed> Default for Dispatcher<E> {
    fn default() -> Self {
        Self {
            registrations: Vec::new(),
            next_id: 0,
        }
    }
}

impl<E: Routed> fmt::Debug for Dispatcher<E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Dispatcher")
            .field("subscribers", &self.registrations.len())
            .finish()
    }
}

impl<E: Routed> Dispatcher<E> {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fallible handler.
    pub fn subscribe<F>(&mut self, topic: Subscription<E::Kind>, handler: F) -> SubscriptionId
    where
        F: FnMut(&E) -> Result<(), HandlerError> + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.registrations.push(Registration {
            id,
            topic,
            handler: Box::new(handler),
        });
        id
    }

    /// Registers a handler that cannot fail.
    pub fn on<F>(&mut self, topic: Subscription<E::Kind>, mut handler: F) -> SubscriptionId
    where
        F: FnMut(&E) + Send + 'static,
    {
        self.subscribe(topic, move |event| {
            handler(event);
            Ok(())
        })
    }

    /// Removes a registration. Returns `false` when the id is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|registration| registration.id != id);
        self.registrations.len() != before
    }

    /// Delivers `event` to catch-all handlers, then to handlers of its kind.
    ///
    /// Returns the number of handlers that completed successfully.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] listing every handler that returned an error
    /// or panicked; all other handlers still ran.
    pub fn publish(&mut self, event: &E) -> Result<usize, PublishError> {
        let kind = event.kind();
        let mut delivered = 0;
        let mut failures = Vec::new();

        let catch_all = self
            .registrations
            .iter_mut()
            .filter(|registration| registration.topic == Subscription::Any);
        for registration in catch_all {
            invoke(registration, event, &mut delivered, &mut failures);
        }

        let specific = self
            .registrations
            .iter_mut()
            .filter(|registration| registration.topic == Subscription::Kind(kind));
        for registration in specific {
            invoke(registration, event, &mut delivered, &mut failures);
        }

        if failures.is_empty() {
            return Ok(delivered);
        }

        for failure in &failures {
            warn!(
                target: DISPATCH_TARGET,
                kind = %kind,
                subscription = %failure.subscription,
                error = %failure.reason,
                "event handler failed"
            );
        }
        Err(PublishError {
            kind: kind.to_string(),
            delivered,
            failures,
        })
    }
}

fn invoke<E: Routed>(
    registration: &mut Registration<E>,
    event: &E,
    delivered: &mut usize,
    failures: &mut Vec<HandlerFailure>,
) {
    let handler = &mut registration.handler;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(event)));
    let reason = match outcome {
        Ok(Ok(())) => {
            *delivered += 1;
            return;
        }
        Ok(Err(error)) => FailureReason::Error(error),
        Err(payload) => FailureReason::Panic(panic_message(payload.as_ref())),
    };
    failures.push(HandlerFailure {
        subscription: registration.id,
        reason,
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("handler panicked")
    }
}

/// Handlers that failed while an event was published.
#[derive(Debug, Error)]
#[error("{} handler(s) failed for '{kind}' event", .failures.len())]
pub struct PublishError {
    /// Kind of the event being published.
    pub kind: String,
    /// Handlers that completed successfully.
    pub delivered: usize,
    /// One entry per failing handler, in invocation order.
    pub failures: Vec<HandlerFailure>,
}

/// A single handler failure.
#[derive(Debug)]
pub struct HandlerFailure {
    /// Registration that failed.
    pub subscription: SubscriptionId,
    /// What went wrong.
    pub reason: FailureReason,
}

/// Cause of a handler failure.
#[derive(Debug, Error)]
pub enum FailureReason {
    /// The handler returned an error.
    #[error("{0}")]
    Error(HandlerError),
    /// The handler panicked; the payload message is kept.
    #[error("panicked: {0}")]
    Panic(String),
}
