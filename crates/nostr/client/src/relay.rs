//! Single relay connection management.
//!
//! One reader task decodes inbound frames and dispatches them synchronously
//! to the subscription or publication they name; one writer task drains an
//! outbound queue into the transport. Registries live behind short-lived
//! locks that are never held while a callback runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use nostrain::nip01::KIND_CLIENT_AUTH;
use nostrain::{Event, EventTemplate, Filter, fakejson, finish_event, match_filters, verify_event};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, trace, warn};
use url::Url;
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::error::{ClientError, Result};
use crate::listeners::{Listeners, lock};
use crate::message::{ClientMessage, Correlation, RelayMessage, correlation, parse_relay_value};
use crate::publication::{Publication, PublicationInner, PublicationState, PublishConfirmation};
use crate::subscription::{SubscribeOptions, Subscription, SubscriptionInner};
use crate::transport::{Connector, TransportSink, TransportStream, WebSocketConnector};

/// Connection state.
///
/// `Closed` and `Errored` are terminal: a connection is never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
    Errored,
}

impl ConnectionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Errored)
    }
}

enum Outbound {
    Frame(String),
    Close,
}

#[derive(Default)]
struct ConnectionListeners {
    notice: Listeners<str>,
    auth: Listeners<str>,
    error: Listeners<ClientError>,
    disconnect: Listeners<()>,
}

pub(crate) struct Shared {
    url: Url,
    config: RelayConfig,
    connector: Arc<dyn Connector>,
    state: Mutex<ConnectionState>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Outbound>>>,
    subscriptions: Mutex<HashMap<String, Arc<SubscriptionInner>>>,
    publications: Mutex<HashMap<String, Arc<PublicationInner>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    listeners: ConnectionListeners,
}

/// Relay connection.
///
/// Cloning yields another handle to the same connection.
#[derive(Clone)]
pub struct RelayConnection {
    shared: Arc<Shared>,
}

impl RelayConnection {
    /// Create a new relay connection with default config.
    pub fn new(url: &str) -> Result<Self> {
        Self::with_config(url, RelayConfig::default())
    }

    /// Create a new relay connection with custom config.
    pub fn with_config(url: &str, config: RelayConfig) -> Result<Self> {
        Self::with_connector(url, config, Arc::new(WebSocketConnector))
    }

    /// Create a relay connection over a custom transport.
    pub fn with_connector(url: &str, config: RelayConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        let parsed_url = Url::parse(url)?;
        if parsed_url.scheme() != "ws" && parsed_url.scheme() != "wss" {
            return Err(ClientError::InvalidUrl(format!(
                "URL must use ws:// or wss:// scheme, got: {}",
                parsed_url.scheme()
            )));
        }

        Ok(Self {
            shared: Arc::new(Shared {
                url: parsed_url,
                config,
                connector,
                state: Mutex::new(ConnectionState::Disconnected),
                outbound: Mutex::new(None),
                subscriptions: Mutex::new(HashMap::new()),
                publications: Mutex::new(HashMap::new()),
                reader: Mutex::new(None),
                writer: Mutex::new(None),
                listeners: ConnectionListeners::default(),
            }),
        })
    }

    /// Relay URL as string.
    pub fn url(&self) -> &str {
        self.shared.url.as_str()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.shared.config
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Connect to relay and start the background reader and writer.
    ///
    /// Only a fresh connection may connect.
    pub async fn connect(&self) -> Result<()> {
        let shared = &self.shared;
        {
            let mut state = lock(&shared.state);
            if *state != ConnectionState::Disconnected {
                return Err(ClientError::Protocol(format!(
                    "cannot connect a connection in state {:?}",
                    *state
                )));
            }
            *state = ConnectionState::Connecting;
        }
        debug!(relay = %shared.url, "connecting");

        let connect_result = timeout(shared.config.connect_timeout, shared.connector.connect(&shared.url))
            .await
            .map_err(|_| {
                ClientError::Timeout(format!(
                    "connection timeout after {:?}",
                    shared.config.connect_timeout
                ))
            })
            .and_then(|result| result);

        let (mut sink, stream) = match connect_result {
            Ok(halves) => halves,
            Err(error) => {
                warn!(relay = %shared.url, %error, "connection failed");
                shared.teardown(ConnectionState::Errored, &error);
                return Err(error);
            }
        };

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let opened = {
            let mut state = lock(&shared.state);
            if *state == ConnectionState::Connecting {
                *lock(&shared.outbound) = Some(outbound_tx);
                *state = ConnectionState::Connected;
                true
            } else {
                false
            }
        };
        if !opened {
            // Closed while the handshake was in flight.
            let _ = sink.close().await;
            return Err(ClientError::ConnectionClosed);
        }

        let weak = Arc::downgrade(shared);
        let writer = tokio::spawn(write_loop(weak.clone(), sink, outbound_rx));
        let reader = tokio::spawn(read_loop(weak, stream));
        *lock(&shared.writer) = Some(writer);
        *lock(&shared.reader) = Some(reader);

        debug!(relay = %shared.url, "connected");
        Ok(())
    }

    /// Close the connection.
    ///
    /// Open subscriptions and pending publications fail with
    /// [`ClientError::ConnectionClosed`]. Frames already queued are flushed
    /// before the transport closes.
    pub async fn close(&self) {
        let shared = &self.shared;
        let sender = lock(&shared.outbound).take();
        if let Some(sender) = sender {
            let _ = sender.send(Outbound::Close);
        }
        shared.teardown(ConnectionState::Closed, &ClientError::ConnectionClosed);

        let reader = lock(&shared.reader).take();
        if let Some(reader) = reader {
            reader.abort();
        }
        let writer = lock(&shared.writer).take();
        if let Some(writer) = writer
            && timeout(shared.config.connect_timeout, writer).await.is_err()
        {
            warn!(relay = %shared.url, "writer did not finish closing in time");
        }
    }

    /// Open a subscription.
    ///
    /// Callbacks in `options` are installed before `REQ` is sent. Fails with
    /// a protocol error when not connected or when the requested id is
    /// already open on this connection.
    pub fn subscribe(&self, filters: Vec<Filter>, options: SubscribeOptions) -> Result<Subscription> {
        let shared = &self.shared;
        shared.ensure_connected()?;

        let id = options
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let deadline = options.timeout;
        let inner = Arc::new(SubscriptionInner::new(id.clone(), filters.clone(), options));

        {
            let mut subscriptions = lock(&shared.subscriptions);
            if subscriptions.contains_key(&id) {
                return Err(ClientError::Protocol(format!(
                    "subscription {id} is already open"
                )));
            }
            subscriptions.insert(id.clone(), Arc::clone(&inner));
        }

        let request = ClientMessage::Req {
            subscription_id: id.clone(),
            filters,
        };
        if let Err(error) = shared.send(&request) {
            shared.remove_subscription(&inner);
            inner.close(None);
            return Err(error);
        }

        if let Some(after) = deadline {
            let connection = Arc::downgrade(shared);
            let target = Arc::downgrade(&inner);
            let timer = tokio::spawn(async move {
                sleep(after).await;
                if let (Some(connection), Some(subscription)) = (connection.upgrade(), target.upgrade()) {
                    connection.expire_subscription(&subscription);
                }
            });
            inner.set_timer(timer);
        }

        debug!(relay = %shared.url, subscription = %id, "subscribed");
        Ok(Subscription::new(inner, Arc::downgrade(shared)))
    }

    /// Close the subscription with `subscription_id`. Returns false when no
    /// such subscription is open.
    pub fn unsubscribe(&self, subscription_id: &str) -> bool {
        match self.shared.subscription(subscription_id) {
            Some(subscription) => self.shared.unsubscribe(&subscription),
            None => false,
        }
    }

    /// Collect stored events until end-of-stored-events.
    ///
    /// With a timeout, whatever arrived before the deadline is returned.
    pub async fn list(&self, filters: Vec<Filter>, timeout: Option<Duration>) -> Result<Vec<Event>> {
        let (completion, receiver) = Completion::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let drain = {
            let events = Arc::clone(&events);
            let completion = Arc::clone(&completion);
            Arc::new(move || completion.complete(Ok(std::mem::take(&mut *lock(&events)))))
        };

        let mut options = SubscribeOptions::new()
            .on_event(move |event| lock(&events).push(event.clone()))
            .on_eose({
                let drain = Arc::clone(&drain);
                move || drain()
            })
            .on_timeout(move || drain())
            .on_error(completion.fail_on_terminal());
        if let Some(timeout) = timeout {
            options = options.timeout(timeout);
        }

        let subscription = CloseOnDrop(self.subscribe(filters, options)?);
        let result = receiver.await.unwrap_or(Err(ClientError::ConnectionClosed));
        drop(subscription);
        result
    }

    /// The first stored event matching `filter`, or `None` if the relay has
    /// none (or none arrives before the deadline).
    pub async fn get(&self, filter: Filter, timeout: Option<Duration>) -> Result<Option<Event>> {
        let (completion, receiver) = Completion::new();

        let mut options = SubscribeOptions::new()
            .on_event({
                let completion = Arc::clone(&completion);
                move |event| completion.complete(Ok(Some(event.clone())))
            })
            .on_eose({
                let completion = Arc::clone(&completion);
                move || completion.complete(Ok(None))
            })
            .on_timeout({
                let completion = Arc::clone(&completion);
                move || completion.complete(Ok(None))
            })
            .on_error(completion.fail_on_terminal());
        if let Some(timeout) = timeout {
            options = options.timeout(timeout);
        }

        let subscription = CloseOnDrop(self.subscribe(vec![filter], options)?);
        let result = receiver.await.unwrap_or(Err(ClientError::ConnectionClosed));
        drop(subscription);
        result
    }

    /// Send `event` and register for its `OK`.
    pub fn send_event(&self, event: &Event, timeout: Option<Duration>) -> Result<Publication> {
        self.shared
            .register_publication(event.id.clone(), ClientMessage::Event(event.clone()), timeout)
    }

    /// Publish `event` and wait for the relay's answer, bounded by the
    /// configured publish timeout.
    pub async fn publish(&self, event: &Event) -> Result<PublishConfirmation> {
        self.send_event(event, self.shared.config.publish_timeout)?
            .wait()
            .await
    }

    /// Answer an `AUTH` challenge with a signed kind-22242 event and wait for
    /// the relay's `OK`.
    pub async fn authenticate(
        &self,
        challenge: &str,
        secret_key: &[u8; 32],
        timeout: Option<Duration>,
    ) -> Result<PublishConfirmation> {
        let template = EventTemplate {
            created_at: unix_now(),
            kind: KIND_CLIENT_AUTH,
            tags: vec![
                vec!["relay".to_string(), self.url().to_string()],
                vec!["challenge".to_string(), challenge.to_string()],
            ],
            content: String::new(),
        };
        let event = finish_event(&template, secret_key)?;
        debug!(relay = %self.shared.url, event_id = %event.id, "authenticating");

        self.shared
            .register_publication(event.id.clone(), ClientMessage::Auth(event), timeout)?
            .wait()
            .await
    }

    pub fn on_notice(&self, handler: impl Fn(&str) + Send + Sync + 'static) {
        self.shared.listeners.notice.add(Arc::new(handler));
    }

    /// Called with each `AUTH` challenge the relay sends.
    pub fn on_auth(&self, handler: impl Fn(&str) + Send + Sync + 'static) {
        self.shared.listeners.auth.add(Arc::new(handler));
    }

    /// Called on transport failure and for malformed frames that cannot be
    /// attributed to a subscription or publication.
    pub fn on_error(&self, handler: impl Fn(&ClientError) + Send + Sync + 'static) {
        self.shared.listeners.error.add(Arc::new(handler));
    }

    /// Called once when an open connection goes down, for whatever reason.
    pub fn on_disconnect(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.shared
            .listeners
            .disconnect
            .add(Arc::new(move |_: &()| handler()));
    }
}

impl std::fmt::Debug for RelayConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConnection")
            .field("url", &self.shared.url.as_str())
            .field("state", &self.shared.state())
            .finish()
    }
}

impl Shared {
    fn state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.state() == ConnectionState::Connected {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    fn send(&self, message: &ClientMessage) -> Result<()> {
        let text = message.to_json()?;
        let outbound = lock(&self.outbound);
        let sender = outbound.as_ref().ok_or(ClientError::NotConnected)?;
        sender
            .send(Outbound::Frame(text))
            .map_err(|_| ClientError::ConnectionClosed)
    }

    fn subscription(&self, id: &str) -> Option<Arc<SubscriptionInner>> {
        lock(&self.subscriptions).get(id).cloned()
    }

    fn has_subscription(&self, id: &str) -> bool {
        lock(&self.subscriptions).contains_key(id)
    }

    fn publication(&self, event_id: &str) -> Option<Arc<PublicationInner>> {
        lock(&self.publications).get(event_id).cloned()
    }

    fn remove_subscription(&self, subscription: &Arc<SubscriptionInner>) {
        let mut subscriptions = lock(&self.subscriptions);
        if subscriptions
            .get(&subscription.id)
            .is_some_and(|current| Arc::ptr_eq(current, subscription))
        {
            subscriptions.remove(&subscription.id);
        }
    }

    fn remove_publication(&self, publication: &Arc<PublicationInner>) {
        let mut publications = lock(&self.publications);
        if publications
            .get(&publication.event_id)
            .is_some_and(|current| Arc::ptr_eq(current, publication))
        {
            publications.remove(&publication.event_id);
        }
    }

    /// Close a subscription at the caller's request, sending `CLOSE` if the
    /// connection is still up. Only the first call has any effect.
    pub(crate) fn unsubscribe(&self, subscription: &Arc<SubscriptionInner>) -> bool {
        if !subscription.close(None) {
            return false;
        }
        self.remove_subscription(subscription);

        if self.state() == ConnectionState::Connected
            && let Err(error) = self.send(&ClientMessage::Close(subscription.id.clone()))
        {
            debug!(relay = %self.url, subscription = %subscription.id, %error, "failed to send CLOSE");
        }
        debug!(relay = %self.url, subscription = %subscription.id, "unsubscribed");
        true
    }

    fn expire_subscription(&self, subscription: &Arc<SubscriptionInner>) {
        if !subscription.is_open() {
            return;
        }
        debug!(relay = %self.url, subscription = %subscription.id, "subscription timed out");
        subscription.on_timeout.emit(&());
        self.unsubscribe(subscription);
    }

    fn register_publication(
        self: &Arc<Self>,
        event_id: String,
        frame: ClientMessage,
        deadline: Option<Duration>,
    ) -> Result<Publication> {
        self.ensure_connected()?;

        let (inner, receiver) = PublicationInner::new(event_id.clone());
        let inner = Arc::new(inner);
        {
            let mut publications = lock(&self.publications);
            if publications.contains_key(&event_id) {
                return Err(ClientError::Protocol(format!(
                    "event {event_id} is already awaiting OK"
                )));
            }
            publications.insert(event_id.clone(), Arc::clone(&inner));
        }

        if let Err(error) = self.send(&frame) {
            self.finish_publication(&inner, PublicationState::Errored, Err(error.clone()));
            return Err(error);
        }

        if let Some(after) = deadline {
            let connection = Arc::downgrade(self);
            let target = Arc::downgrade(&inner);
            let timer = tokio::spawn(async move {
                sleep(after).await;
                if let (Some(connection), Some(publication)) = (connection.upgrade(), target.upgrade()) {
                    let error = ClientError::Timeout(format!(
                        "no OK for event {} after {after:?}",
                        publication.event_id
                    ));
                    if connection.finish_publication(&publication, PublicationState::TimedOut, Err(error)) {
                        debug!(relay = %connection.url, event_id = %publication.event_id, "publication timed out");
                    }
                }
            });
            inner.set_timer(timer);
        }

        trace!(relay = %self.url, event_id = %event_id, "publication pending");
        Ok(Publication::new(inner, receiver, Arc::downgrade(self)))
    }

    fn finish_publication(
        &self,
        publication: &Arc<PublicationInner>,
        state: PublicationState,
        outcome: Result<PublishConfirmation>,
    ) -> bool {
        let settled = publication.settle(state, outcome);
        if settled {
            self.remove_publication(publication);
        }
        settled
    }

    pub(crate) fn abandon_publication(&self, publication: &Arc<PublicationInner>) {
        if self.finish_publication(
            publication,
            PublicationState::Abandoned,
            Err(ClientError::ConnectionClosed),
        ) {
            trace!(relay = %self.url, event_id = %publication.event_id, "publication abandoned");
        }
    }

    /// Move to a terminal state and fail everything still pending, once.
    fn teardown(&self, next: ConnectionState, reason: &ClientError) {
        let previous = {
            let mut state = lock(&self.state);
            if state.is_terminal() {
                return;
            }
            std::mem::replace(&mut *state, next)
        };
        debug!(relay = %self.url, ?previous, ?next, %reason, "connection down");

        *lock(&self.outbound) = None;

        let subscriptions: Vec<_> = lock(&self.subscriptions).drain().map(|(_, s)| s).collect();
        for subscription in subscriptions {
            subscription.close(Some(reason));
        }

        let publications: Vec<_> = lock(&self.publications).drain().map(|(_, p)| p).collect();
        for publication in publications {
            publication.settle(PublicationState::Errored, Err(reason.clone()));
        }

        if next == ConnectionState::Errored {
            self.listeners.error.emit(reason);
        }
        if previous == ConnectionState::Connected {
            self.listeners.disconnect.emit(&());
        }
    }

    fn handle_text(&self, text: &str) {
        if let Some(id) = fakejson::get_subscription_id(text)
            && !id.contains('\\')
            && !self.has_subscription(id)
        {
            trace!(relay = %self.url, subscription = %id, "dropping EVENT for unknown subscription");
            return;
        }

        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(error) => {
                let error = ClientError::InvalidFrame(format!("invalid JSON relay message: {error}"));
                warn!(relay = %self.url, %error, "malformed relay message");
                self.listeners.error.emit(&error);
                return;
            }
        };

        match parse_relay_value(&value) {
            Ok(Some(message)) => self.dispatch(message),
            Ok(None) => trace!(relay = %self.url, "ignoring unknown relay message"),
            Err(error) => self.route_invalid(correlation(&value), &error),
        }
    }

    fn route_invalid(&self, correlation: Option<Correlation>, error: &ClientError) {
        match correlation {
            Some(Correlation::Subscription(id)) => match self.subscription(&id) {
                Some(subscription) => {
                    debug!(relay = %self.url, subscription = %id, %error, "malformed frame");
                    subscription.on_error.emit(error);
                }
                None => trace!(relay = %self.url, subscription = %id, "dropping frame for unknown subscription"),
            },
            Some(Correlation::Publication(event_id)) => match self.publication(&event_id) {
                Some(publication) => {
                    debug!(relay = %self.url, event_id = %event_id, %error, "malformed OK");
                    self.finish_publication(&publication, PublicationState::Errored, Err(error.clone()));
                }
                None => trace!(relay = %self.url, event_id = %event_id, "dropping OK for unknown event"),
            },
            None => {
                warn!(relay = %self.url, %error, "malformed relay message");
                self.listeners.error.emit(error);
            }
        }
    }

    fn dispatch(&self, message: RelayMessage) {
        match message {
            RelayMessage::Event(subscription_id, event) => self.deliver_event(&subscription_id, &event),
            RelayMessage::Eose(subscription_id) => match self.subscription(&subscription_id) {
                Some(subscription) => {
                    if subscription.mark_eose() {
                        trace!(relay = %self.url, subscription = %subscription_id, "end of stored events");
                        subscription.on_eose.emit(&());
                    }
                }
                None => trace!(relay = %self.url, subscription = %subscription_id, "dropping EOSE for unknown subscription"),
            },
            RelayMessage::Closed(subscription_id, reason) => match self.subscription(&subscription_id) {
                Some(subscription) => {
                    debug!(relay = %self.url, subscription = %subscription_id, %reason, "subscription closed by relay");
                    if subscription.close(Some(&ClientError::Closed(reason))) {
                        self.remove_subscription(&subscription);
                    }
                }
                None => trace!(relay = %self.url, subscription = %subscription_id, "dropping CLOSED for unknown subscription"),
            },
            RelayMessage::Ok(event_id, accepted, message) => match self.publication(&event_id) {
                Some(publication) => {
                    let confirmation = PublishConfirmation {
                        relay_url: self.url.to_string(),
                        event_id,
                        accepted,
                        message,
                    };
                    self.finish_publication(&publication, PublicationState::Settled, Ok(confirmation));
                }
                None => trace!(relay = %self.url, event_id = %event_id, "dropping OK for unknown event"),
            },
            RelayMessage::Notice(message) => {
                debug!(relay = %self.url, %message, "relay notice");
                self.listeners.notice.emit(message.as_str());
            }
            RelayMessage::Auth(challenge) => {
                debug!(relay = %self.url, "auth challenge");
                self.listeners.auth.emit(challenge.as_str());
            }
        }
    }

    fn deliver_event(&self, subscription_id: &str, event: &Event) {
        let Some(subscription) = self.subscription(subscription_id) else {
            trace!(relay = %self.url, subscription = %subscription_id, "dropping EVENT for unknown subscription");
            return;
        };

        if self.config.verify_events && !verify_event(event) {
            let error = ClientError::InvalidFrame(format!("event {} failed verification", event.id));
            debug!(relay = %self.url, subscription = %subscription_id, %error, "rejecting event");
            subscription.on_error.emit(&error);
            return;
        }
        if self.config.match_filters && !match_filters(&subscription.filters, event) {
            trace!(relay = %self.url, subscription = %subscription_id, event_id = %event.id, "event outside filters");
            return;
        }

        subscription.on_event.emit(event);
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(reader) = lock(&self.reader).take() {
            reader.abort();
        }
    }
}

async fn read_loop(connection: Weak<Shared>, mut stream: Box<dyn TransportStream>) {
    loop {
        let frame = stream.next().await;
        let Some(shared) = connection.upgrade() else {
            break;
        };
        match frame {
            Some(Ok(text)) => shared.handle_text(&text),
            Some(Err(error)) => {
                warn!(relay = %shared.url, %error, "transport read failed");
                shared.teardown(ConnectionState::Errored, &error);
                break;
            }
            None => {
                debug!(relay = %shared.url, "relay closed the connection");
                shared.teardown(ConnectionState::Closed, &ClientError::ConnectionClosed);
                break;
            }
        }
    }
}

async fn write_loop(
    connection: Weak<Shared>,
    mut sink: Box<dyn TransportSink>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Frame(text) => {
                if let Err(error) = sink.send(text).await {
                    if let Some(shared) = connection.upgrade() {
                        warn!(relay = %shared.url, %error, "transport write failed");
                        shared.teardown(ConnectionState::Errored, &error);
                    }
                    return;
                }
            }
            Outbound::Close => break,
        }
    }

    if let Err(error) = sink.close().await {
        debug!(%error, "transport close failed");
    }
}

/// Resolves a query exactly once from whichever callback fires first.
struct Completion<T> {
    sender: Mutex<Option<oneshot::Sender<Result<T>>>>,
}

impl<T: Send + 'static> Completion<T> {
    fn new() -> (Arc<Self>, oneshot::Receiver<Result<T>>) {
        let (sender, receiver) = oneshot::channel();
        let completion = Arc::new(Self {
            sender: Mutex::new(Some(sender)),
        });
        (completion, receiver)
    }

    fn complete(&self, result: Result<T>) {
        if let Some(sender) = lock(&self.sender).take() {
            let _ = sender.send(result);
        }
    }

    /// An error callback that fails the query once nothing more can arrive.
    /// Individual bad frames are skipped.
    fn fail_on_terminal(self: &Arc<Self>) -> impl Fn(&ClientError) + Send + Sync + 'static {
        let completion = Arc::clone(self);
        move |error: &ClientError| {
            if error.is_terminal() {
                completion.complete(Err(error.clone()));
            }
        }
    }
}

/// Unsubscribes when a query finishes or its future is dropped.
struct CloseOnDrop(Subscription);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.unsubscribe();
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_websocket_urls() {
        let error = RelayConnection::new("https://relay.example.com").unwrap_err();
        assert!(matches!(error, ClientError::InvalidUrl(_)));
        assert!(error.to_string().contains("ws:// or wss://"));

        assert!(matches!(
            RelayConnection::new("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn fresh_connection_is_disconnected() {
        let relay = RelayConnection::new("wss://relay.example.com").unwrap();
        assert_eq!(relay.state(), ConnectionState::Disconnected);
        assert_eq!(relay.url(), "wss://relay.example.com/");
        assert!(relay.config().verify_events);
    }

    #[test]
    fn operations_require_a_connection() {
        let relay = RelayConnection::new("wss://relay.example.com").unwrap();
        let error = relay
            .subscribe(vec![Filter::new().kinds([1])], SubscribeOptions::new())
            .unwrap_err();
        assert_eq!(error, ClientError::NotConnected);
        assert!(error.is_protocol_error());
        assert!(!relay.unsubscribe("missing"));
    }

    #[test]
    fn terminal_states() {
        assert!(ConnectionState::Closed.is_terminal());
        assert!(ConnectionState::Errored.is_terminal());
        assert!(!ConnectionState::Connected.is_terminal());
        assert!(!ConnectionState::Disconnected.is_terminal());
    }
}
