//! Connection to the device's call-monitor port.
//!
//! [`CallMonitor`] owns one TCP connection at a time. A dedicated reader
//! thread reassembles lines, decodes them and publishes phone events; socket
//! lifecycle changes are published as [`TransportEvent`]s on a second
//! registry. Both registries live behind a mutex shared with the reader, so
//! handlers can be added while connected. Handlers run on the reader thread with the registry
//! locked and must not subscribe or unsubscribe from within a callback.

mod errors;
mod lifecycle;
mod session;
mod transport;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use callmon_config::{
    Config, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_LINE_DELIMITER, MonitorEndpoint,
};
use tracing::{debug, info, warn};

pub use self::errors::MonitorError;
pub use self::lifecycle::{TransportEvent, TransportFault, TransportKind};

use self::session::Session;
use crate::assembler::LineAssembler;
use crate::dispatch::{Dispatcher, HandlerError, Routed, Subscription, SubscriptionId};
use crate::event::{EventKind, PhoneEvent};

const MONITOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::monitor");

type SharedDispatcher<E> = Arc<Mutex<Dispatcher<E>>>;

/// Framing and timing options for a monitor connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Record delimiter; must not be empty.
    pub delimiter: String,
    /// Upper bound for establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Idle period after which a `timeout` notification is published.
    pub idle_timeout: Option<Duration>,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            delimiter: String::from(DEFAULT_LINE_DELIMITER),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            idle_timeout: None,
        }
    }
}

impl From<&Config> for MonitorOptions {
    fn from(config: &Config) -> Self {
        Self {
            delimiter: config.line_delimiter().into_owned(),
            connect_timeout: config.connect_timeout(),
            idle_timeout: config.idle_timeout(),
        }
    }
}

/// Client for the call-monitor service.
pub struct CallMonitor {
    endpoint: MonitorEndpoint,
    options: MonitorOptions,
    phone: SharedDispatcher<PhoneEvent>,
    transport: SharedDispatcher<TransportEvent>,
    session: Option<Session>,
}

impl std::fmt::Debug for CallMonitor {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CallMonitor")
            .field("endpoint", &self.endpoint)
            .field("options", &self.options)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl CallMonitor {
    /// Creates a monitor for `host`, using port 1012 unless `port` is given.
    #[must_use]
    pub fn new(host: impl Into<String>, port: Option<u16>) -> Self {
        Self::with_endpoint(MonitorEndpoint::with_default_port(host, port))
    }

    /// Creates a monitor for an explicit endpoint with default options.
    #[must_use]
    pub fn with_endpoint(endpoint: MonitorEndpoint) -> Self {
        Self {
            endpoint,
            options: MonitorOptions::default(),
            phone: Arc::default(),
            transport: Arc::default(),
            session: None,
        }
    }

    /// Builds a monitor from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Endpoint`] when the configured host cannot be
    /// parsed and [`MonitorError::Configuration`] when the configured
    /// delimiter is empty.
    pub fn from_config(config: &Config) -> Result<Self, MonitorError> {
        Self::with_endpoint(config.endpoint()?).with_options(MonitorOptions::from(config))
    }

    /// Replaces the connection options.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Configuration`] when `options.delimiter` is
    /// empty.
    pub fn with_options(mut self, options: MonitorOptions) -> Result<Self, MonitorError> {
        LineAssembler::new(&options.delimiter)?;
        self.options = options;
        Ok(self)
    }

    /// Endpoint this monitor connects to.
    #[must_use]
    pub const fn endpoint(&self) -> &MonitorEndpoint {
        &self.endpoint
    }

    /// Options in effect for the next connection.
    #[must_use]
    pub const fn options(&self) -> &MonitorOptions {
        &self.options
    }

    /// Registers a fallible phone event handler.
    pub fn subscribe<F>(
        &mut self,
        topic: Subscription<EventKind>,
        handler: F,
    ) -> SubscriptionId
    where
        F: FnMut(&PhoneEvent) -> Result<(), HandlerError> + Send + 'static,
    {
        lock(&self.phone).subscribe(topic, handler)
    }

    /// Registers a phone event handler that cannot fail.
    pub fn on_phone<F>(
        &mut self,
        topic: Subscription<EventKind>,
        handler: F,
    ) -> SubscriptionId
    where
        F: FnMut(&PhoneEvent) + Send + 'static,
    {
        lock(&self.phone).on(topic, handler)
    }

    /// Removes a phone event handler.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        lock(&self.phone).unsubscribe(id)
    }

    /// Registers a fallible transport notification handler.
    pub fn subscribe_transport<F>(
        &mut self,
        topic: Subscription<TransportKind>,
        handler: F,
    ) -> SubscriptionId
    where
        F: FnMut(&TransportEvent) -> Result<(), HandlerError> + Send + 'static,
    {
        lock(&self.transport).subscribe(topic, handler)
    }

    /// Registers a transport notification handler that cannot fail.
    pub fn on_transport<F>(
        &mut self,
        topic: Subscription<TransportKind>,
        handler: F,
    ) -> SubscriptionId
    where
        F: FnMut(&TransportEvent) + Send + 'static,
    {
        lock(&self.transport).on(topic, handler)
    }

    /// Removes a transport notification handler.
    pub fn unsubscribe_transport(&mut self, id: SubscriptionId) -> bool {
        lock(&self.transport).unsubscribe(id)
    }

    /// Returns `true` while the reader thread is running.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| !session.is_finished())
    }

    /// Opens the connection and starts reading.
    ///
    /// Does nothing when already connected. On failure, `error` and `close`
    /// notifications are published before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError`] when the endpoint cannot be resolved or
    /// reached, or the reader cannot be started.
    pub fn connect(&mut self) -> Result<(), MonitorError> {
        if self.is_connected() {
            debug!(target: MONITOR_TARGET, endpoint = %self.endpoint, "already connected");
            return Ok(());
        }
        // A previous session may have ended on its own.
        self.wait()?;

        match self.open() {
            Ok(session) => {
                self.session = Some(session);
                Ok(())
            }
            Err(error) => {
                warn!(
                    target: MONITOR_TARGET,
                    endpoint = %self.endpoint,
                    error = %error,
                    "monitor connection attempt failed"
                );
                notify(&self.transport, &TransportEvent::Error(TransportFault::from(&error)));
                notify(&self.transport, &TransportEvent::Close { had_error: true });
                Err(error)
            }
        }
    }

    fn open(&self) -> Result<Session, MonitorError> {
        let assembler = LineAssembler::new(&self.options.delimiter)?;
        let stream = transport::connect(&self.endpoint, self.options.connect_timeout)?;
        stream
            .set_read_timeout(self.options.idle_timeout.filter(|idle| !idle.is_zero()))
            .map_err(|source| MonitorError::Socket { source })?;

        info!(target: MONITOR_TARGET, endpoint = %self.endpoint, "connected to call monitor");
        // Published before the reader starts so it precedes every record.
        notify(
            &self.transport,
            &TransportEvent::Connect {
                endpoint: self.endpoint.clone(),
            },
        );
        Session::start(
            stream,
            assembler,
            Arc::clone(&self.phone),
            Arc::clone(&self.transport),
        )
    }

    /// Closes the connection and waits for the reader to flush.
    ///
    /// Does nothing when not connected.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::ReaderPanicked`] if the reader thread died.
    pub fn end(&mut self) -> Result<(), MonitorError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        session.shutdown();
        session.join()
    }

    /// Blocks until the device closes the connection.
    ///
    /// Does nothing when not connected.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::ReaderPanicked`] if the reader thread died.
    pub fn wait(&mut self) -> Result<(), MonitorError> {
        self.session.take().map_or(Ok(()), Session::join)
    }
}

impl Drop for CallMonitor {
    fn drop(&mut self) {
        if let Err(error) = self.end() {
            warn!(target: MONITOR_TARGET, error = %error, "monitor reader ended abnormally");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn notify(transport: &Mutex<Dispatcher<TransportEvent>>, event: &TransportEvent) {
    if let Err(error) = lock(transport).publish(event) {
        debug!(
            target: MONITOR_TARGET,
            kind = %event.kind(),
            error = %error,
            "transport notification delivered with handler failures"
        );
    }
}
