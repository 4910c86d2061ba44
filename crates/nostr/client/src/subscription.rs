//! Subscriptions: a `REQ` on a relay plus the callbacks that receive its
//! frames.
//!
//! A subscription is open from the moment its `REQ` is queued until the
//! caller unsubscribes, its timeout fires, the relay sends `CLOSED`, or the
//! connection tears down. Closing happens once; every later close attempt is
//! a no-op and sends nothing.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use nostrain::{Event, Filter};
use tokio::task::JoinHandle;

use crate::error::ClientError;
use crate::listeners::{Handler, Listeners, lock};
use crate::relay::Shared;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Open,
    Closed,
}

/// Callbacks and settings for a new subscription.
///
/// Callbacks are installed before the `REQ` is sent, so no frame can arrive
/// ahead of them.
#[derive(Clone, Default)]
pub struct SubscribeOptions {
    pub(crate) id: Option<String>,
    pub(crate) timeout: Option<Duration>,
    on_event: Vec<Handler<Event>>,
    on_eose: Vec<Handler<()>>,
    on_error: Vec<Handler<ClientError>>,
    on_timeout: Vec<Handler<()>>,
}

impl SubscribeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `id` instead of a generated subscription id.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Close the subscription after `timeout`, calling the timeout callbacks.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn on_event(mut self, handler: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.on_event.push(Arc::new(handler));
        self
    }

    /// Called once, when the relay has sent every stored event.
    pub fn on_eose(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_eose.push(Arc::new(move |_: &()| handler()));
        self
    }

    /// Called for frames addressed to this subscription that fail to decode
    /// or verify, and once with the reason when the subscription is closed
    /// by the relay or the connection.
    pub fn on_error(mut self, handler: impl Fn(&ClientError) + Send + Sync + 'static) -> Self {
        self.on_error.push(Arc::new(handler));
        self
    }

    pub fn on_timeout(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_timeout.push(Arc::new(move |_: &()| handler()));
        self
    }
}

impl fmt::Debug for SubscribeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscribeOptions")
            .field("id", &self.id)
            .field("timeout", &self.timeout)
            .field("on_event", &self.on_event.len())
            .field("on_eose", &self.on_eose.len())
            .field("on_error", &self.on_error.len())
            .field("on_timeout", &self.on_timeout.len())
            .finish()
    }
}

struct Slot {
    state: SubscriptionState,
    eose_received: bool,
    timer: Option<JoinHandle<()>>,
}

pub(crate) struct SubscriptionInner {
    pub(crate) id: String,
    pub(crate) filters: Vec<Filter>,
    slot: Mutex<Slot>,
    pub(crate) on_event: Listeners<Event>,
    pub(crate) on_eose: Listeners<()>,
    pub(crate) on_error: Listeners<ClientError>,
    pub(crate) on_timeout: Listeners<()>,
}

impl SubscriptionInner {
    pub(crate) fn new(id: String, filters: Vec<Filter>, options: SubscribeOptions) -> Self {
        let inner = Self {
            id,
            filters,
            slot: Mutex::new(Slot {
                state: SubscriptionState::Open,
                eose_received: false,
                timer: None,
            }),
            on_event: Listeners::default(),
            on_eose: Listeners::default(),
            on_error: Listeners::default(),
            on_timeout: Listeners::default(),
        };
        inner.on_event.extend(options.on_event);
        inner.on_eose.extend(options.on_eose);
        inner.on_error.extend(options.on_error);
        inner.on_timeout.extend(options.on_timeout);
        inner
    }

    pub(crate) fn state(&self) -> SubscriptionState {
        lock(&self.slot).state
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state() == SubscriptionState::Open
    }

    pub(crate) fn eose_received(&self) -> bool {
        lock(&self.slot).eose_received
    }

    /// Record end of stored events. True only the first time, while open.
    pub(crate) fn mark_eose(&self) -> bool {
        let mut slot = lock(&self.slot);
        if slot.state == SubscriptionState::Closed || slot.eose_received {
            return false;
        }
        slot.eose_received = true;
        true
    }

    pub(crate) fn set_timer(&self, timer: JoinHandle<()>) {
        let mut slot = lock(&self.slot);
        if slot.state == SubscriptionState::Closed {
            timer.abort();
            return;
        }
        if let Some(previous) = slot.timer.replace(timer) {
            previous.abort();
        }
    }

    /// Transition to closed. Returns false if already closed.
    ///
    /// `reason` goes to the error callbacks before the callback tables are
    /// dropped.
    pub(crate) fn close(&self, reason: Option<&ClientError>) -> bool {
        {
            let mut slot = lock(&self.slot);
            if slot.state == SubscriptionState::Closed {
                return false;
            }
            slot.state = SubscriptionState::Closed;
            if let Some(timer) = slot.timer.take() {
                timer.abort();
            }
        }

        if let Some(reason) = reason {
            self.on_error.emit(reason);
        }
        self.on_event.clear();
        self.on_eose.clear();
        self.on_error.clear();
        self.on_timeout.clear();
        true
    }
}

/// Handle to an open or closed subscription.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
    connection: Weak<Shared>,
}

impl Subscription {
    pub(crate) fn new(inner: Arc<SubscriptionInner>, connection: Weak<Shared>) -> Self {
        Self { inner, connection }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn filters(&self) -> &[Filter] {
        &self.inner.filters
    }

    pub fn state(&self) -> SubscriptionState {
        self.inner.state()
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    pub fn eose_received(&self) -> bool {
        self.inner.eose_received()
    }

    /// Close the subscription, sending `CLOSE` if the connection is still up.
    ///
    /// Returns whether this call closed it; repeated calls do nothing.
    pub fn unsubscribe(&self) -> bool {
        match self.connection.upgrade() {
            Some(connection) => connection.unsubscribe(&self.inner),
            None => self.inner.close(None),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.inner.id)
            .field("filters", &self.inner.filters)
            .field("state", &self.inner.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn close_is_idempotent_and_reports_once() {
        let errors = Arc::new(AtomicUsize::new(0));
        let options = SubscribeOptions::new().on_error({
            let errors = Arc::clone(&errors);
            move |_| {
                errors.fetch_add(1, Ordering::SeqCst);
            }
        });
        let inner = SubscriptionInner::new("sub".to_string(), vec![], options);

        assert!(inner.close(Some(&ClientError::ConnectionClosed)));
        assert!(!inner.close(Some(&ClientError::ConnectionClosed)));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(inner.state(), SubscriptionState::Closed);
        assert_eq!(inner.on_error.len(), 0);
    }

    #[test]
    fn eose_is_recorded_once_and_not_after_close() {
        let inner = SubscriptionInner::new("sub".to_string(), vec![], SubscribeOptions::new());
        assert!(inner.mark_eose());
        assert!(!inner.mark_eose());
        assert!(inner.eose_received());

        let closed = SubscriptionInner::new("sub".to_string(), vec![], SubscribeOptions::new());
        closed.close(None);
        assert!(!closed.mark_eose());
    }

    #[test]
    fn orphaned_handle_still_closes() {
        let inner = Arc::new(SubscriptionInner::new(
            "sub".to_string(),
            vec![Filter::new().kinds([1])],
            SubscribeOptions::new(),
        ));
        let handle = Subscription::new(inner, Weak::new());
        assert_eq!(handle.filters().len(), 1);
        assert!(handle.unsubscribe());
        assert!(!handle.unsubscribe());
        assert!(!handle.is_open());
    }
}
