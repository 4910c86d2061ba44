//! Publications: an `EVENT` (or `AUTH`) frame waiting for the relay's `OK`.
//!
//! A publication settles exactly once: on its `OK`, on timeout, on a
//! malformed `OK`, on connection teardown, or when the caller drops the
//! handle. Whatever arrives after that is ignored.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{ClientError, Result};
use crate::listeners::lock;
use crate::relay::Shared;

/// Relay acknowledgement of a published event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfirmation {
    pub relay_url: String,
    pub event_id: String,
    pub accepted: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationState {
    Pending,
    /// The relay answered, accepting or rejecting the event.
    Settled,
    TimedOut,
    Errored,
    /// The caller dropped the handle before an answer arrived.
    Abandoned,
}

type Responder = oneshot::Sender<Result<PublishConfirmation>>;

struct Slot {
    state: PublicationState,
    responder: Option<Responder>,
    timer: Option<JoinHandle<()>>,
}

pub(crate) struct PublicationInner {
    pub(crate) event_id: String,
    slot: Mutex<Slot>,
}

impl PublicationInner {
    pub(crate) fn new(event_id: String) -> (Self, oneshot::Receiver<Result<PublishConfirmation>>) {
        let (responder, receiver) = oneshot::channel();
        let inner = Self {
            event_id,
            slot: Mutex::new(Slot {
                state: PublicationState::Pending,
                responder: Some(responder),
                timer: None,
            }),
        };
        (inner, receiver)
    }

    pub(crate) fn state(&self) -> PublicationState {
        lock(&self.slot).state
    }

    pub(crate) fn set_timer(&self, timer: JoinHandle<()>) {
        let mut slot = lock(&self.slot);
        if slot.state == PublicationState::Pending {
            slot.timer = Some(timer);
        } else {
            timer.abort();
        }
    }

    /// Settle into `state` with `outcome`. Returns false if already settled.
    pub(crate) fn settle(&self, state: PublicationState, outcome: Result<PublishConfirmation>) -> bool {
        let mut slot = lock(&self.slot);
        if slot.state != PublicationState::Pending {
            return false;
        }
        slot.state = state;
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
        if let Some(responder) = slot.responder.take() {
            // The receiver is gone only if the handle was dropped.
            let _ = responder.send(outcome);
        }
        true
    }
}

/// Handle to a pending publication. Await [`Publication::wait`] for the
/// relay's answer; dropping the handle abandons the publication.
pub struct Publication {
    inner: Arc<PublicationInner>,
    receiver: Option<oneshot::Receiver<Result<PublishConfirmation>>>,
    connection: Weak<Shared>,
}

impl Publication {
    pub(crate) fn new(
        inner: Arc<PublicationInner>,
        receiver: oneshot::Receiver<Result<PublishConfirmation>>,
        connection: Weak<Shared>,
    ) -> Self {
        Self {
            inner,
            receiver: Some(receiver),
            connection,
        }
    }

    pub fn event_id(&self) -> &str {
        &self.inner.event_id
    }

    pub fn state(&self) -> PublicationState {
        self.inner.state()
    }

    /// Wait for the relay's `OK`. A rejection is still `Ok`, with
    /// `accepted == false`.
    pub async fn wait(mut self) -> Result<PublishConfirmation> {
        let Some(receiver) = self.receiver.take() else {
            return Err(ClientError::ConnectionClosed);
        };
        receiver.await.unwrap_or(Err(ClientError::ConnectionClosed))
    }
}

impl Drop for Publication {
    fn drop(&mut self) {
        if self.inner.state() != PublicationState::Pending {
            return;
        }
        match self.connection.upgrade() {
            Some(connection) => connection.abandon_publication(&self.inner),
            None => {
                self.inner
                    .settle(PublicationState::Abandoned, Err(ClientError::ConnectionClosed));
            }
        }
    }
}

impl fmt::Debug for Publication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publication")
            .field("event_id", &self.inner.event_id)
            .field("state", &self.inner.state())
            .finish()
    }
}
