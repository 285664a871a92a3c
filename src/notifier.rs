//! Advisory event stream.
//!
//! The supervisor reports everything it does, including every failure, as an
//! [`EventKind`] plus a free-form detail string. Handlers run synchronously in
//! subscription order within the tick that produced the event. They must not
//! block, and a panicking handler is not contained.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Scanning,
    ScanFailed,
    NoNetworks,
    FoundNetwork,
    NoKnownNetworks,
    Connecting,
    ConnectWaiting,
    ConnectFailed,
    Connected,
    Disconnected,
    AccessPointCreating,
    AccessPointCreated,
    AccessPointFailed,
    AccessPointDestroyed,
    HostnameError,
    WpsStart,
    WpsSuccess,
    WpsFailed,
    SmartConfigStart,
    SmartConfigSuccess,
    SmartConfigFailed,
    RadioOff,
    RadioOn,
}

impl EventKind {
    /// Whether this event reports a failure.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            EventKind::ScanFailed
                | EventKind::ConnectFailed
                | EventKind::AccessPointFailed
                | EventKind::HostnameError
                | EventKind::WpsFailed
                | EventKind::SmartConfigFailed
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// An owned event, convenient for collecting or serialising the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub kind: EventKind,
    pub detail: String,
}

impl Event {
    pub fn new(kind: EventKind, detail: &str) -> Self {
        Event {
            kind,
            detail: detail.to_string(),
        }
    }
}

pub type Handler = Box<dyn FnMut(EventKind, &str)>;

#[derive(Default)]
pub struct Notifier {
    handlers: Vec<Handler>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: impl FnMut(EventKind, &str) + 'static) {
        self.handlers.push(Box::new(handler));
    }

    pub fn publish(&mut self, kind: EventKind, detail: &str) {
        tracing::debug!(event = %kind, detail, "wifi event");
        for handler in &mut self.handlers {
            handler(kind, detail);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
