//! The per-connection message handler.
//!
//! One [`MessageHandler`] exists per client connection. The connection
//! loop feeds it decoded [`Request`]s one at a time. For each request the
//! handler:
//!
//! 1. validates it,
//! 2. finds or creates the session it names (host) or finds it (guest),
//! 3. checks the presented key against the stored one,
//! 4. subscribes the connection to the session's topic for its role,
//! 5. pushes exactly one [`Response`] to the outbound channel.
//!
//! `handle` returns whether the connection may stay open. That boolean is
//! the only thing that escapes; every failure is turned into a response.
//!
//! # Channels
//!
//! ```text
//!                     ┌──────────────────┐
//!  Request ─────────→ │  MessageHandler  │ ──→ outbound: mpsc<Response>  (shared, never closed here)
//!                     │                  │
//!  PubSub ──publish─→ │  subscription tx │ ──→ subscription rx           (created here, closed by close())
//!                     └──────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use pairlink_protocol::{Event, MessageKind, Request, Response};
use pairlink_pubsub::PubSub;
use pairlink_session::{HexValidator, Session, SessionValidator, Store};
use tokio::sync::mpsc;

use crate::{ConfigurationError, RequestError, Role};

/// Default capacity of the subscription channel: one event in flight,
/// the closest a Tokio channel gets to unbuffered.
pub const DEFAULT_SUBSCRIPTION_CAPACITY: usize = 1;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects the collaborators a [`MessageHandler`] needs.
///
/// The sender, store and hub are all required; [`build`](Self::build)
/// reports whichever is missing as a [`ConfigurationError`].
pub struct MessageHandlerBuilder<S, V = HexValidator> {
    sender: Option<mpsc::Sender<Response>>,
    store: Option<Arc<S>>,
    pubsub: Option<Arc<PubSub<Event>>>,
    validator: Arc<V>,
    subscription_capacity: usize,
}

impl<S: Store> MessageHandlerBuilder<S, HexValidator> {
    /// Creates a builder with the default validator and capacity.
    pub fn new() -> Self {
        Self {
            sender: None,
            store: None,
            pubsub: None,
            validator: Arc::new(HexValidator::default()),
            subscription_capacity: DEFAULT_SUBSCRIPTION_CAPACITY,
        }
    }
}

impl<S: Store> Default for MessageHandlerBuilder<S, HexValidator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Store, V: SessionValidator> MessageHandlerBuilder<S, V> {
    /// Sets the channel responses are pushed to.
    pub fn sender(mut self, sender: mpsc::Sender<Response>) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Sets the session store.
    pub fn store(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the topic hub.
    pub fn pubsub(mut self, pubsub: Arc<PubSub<Event>>) -> Self {
        self.pubsub = Some(pubsub);
        self
    }

    /// Replaces the session id/key validator.
    pub fn validator<W: SessionValidator>(
        self,
        validator: Arc<W>,
    ) -> MessageHandlerBuilder<S, W> {
        MessageHandlerBuilder {
            sender: self.sender,
            store: self.store,
            pubsub: self.pubsub,
            validator,
            subscription_capacity: self.subscription_capacity,
        }
    }

    /// Sets how many published events may queue for this connection.
    pub fn subscription_capacity(mut self, capacity: usize) -> Self {
        self.subscription_capacity = capacity;
        self
    }

    /// Builds the handler and allocates its subscription channel.
    ///
    /// No I/O happens here.
    ///
    /// # Errors
    /// - [`ConfigurationError::MissingSender`], [`MissingStore`](ConfigurationError::MissingStore),
    ///   [`MissingPubSub`](ConfigurationError::MissingPubSub): a required part wasn't set
    /// - [`ConfigurationError::SenderClosed`]: the outbound receiver is gone
    /// - [`ConfigurationError::ZeroCapacity`]: subscription capacity of 0
    pub fn build(self) -> Result<MessageHandler<S, V>, ConfigurationError> {
        let sender = self.sender.ok_or(ConfigurationError::MissingSender)?;
        let store = self.store.ok_or(ConfigurationError::MissingStore)?;
        let pubsub = self.pubsub.ok_or(ConfigurationError::MissingPubSub)?;

        if sender.is_closed() {
            return Err(ConfigurationError::SenderClosed);
        }
        if self.subscription_capacity == 0 {
            return Err(ConfigurationError::ZeroCapacity(
                "subscription capacity",
            ));
        }

        let (sub_tx, sub_rx) = mpsc::channel(self.subscription_capacity);

        Ok(MessageHandler {
            session: None,
            sender,
            subscription: Some(sub_tx),
            events: Some(sub_rx),
            store,
            pubsub,
            validator: self.validator,
        })
    }
}

// ---------------------------------------------------------------------------
// MessageHandler
// ---------------------------------------------------------------------------

/// Drives the host/join protocol for a single connection.
///
/// `handle` takes `&mut self`, so requests on one connection are processed
/// strictly one after another and their responses leave in the same order.
/// The handler holds no locks of its own; the store and hub are shared
/// with every other connection and synchronize internally.
///
/// Call [`close`](Self::close) when the connection ends. Dropping the
/// handler closes it too.
pub struct MessageHandler<S: Store, V: SessionValidator = HexValidator> {
    /// The session this connection is bound to, once host/join succeeded.
    session: Option<Session>,

    /// Where responses go. Shared with the transport; never closed here.
    sender: mpsc::Sender<Response>,

    /// Our end of the subscription channel. `None` once closed.
    subscription: Option<mpsc::Sender<Event>>,

    /// The receiving end, until the transport takes it.
    events: Option<mpsc::Receiver<Event>>,

    store: Arc<S>,
    pubsub: Arc<PubSub<Event>>,
    validator: Arc<V>,
}

impl<S: Store> MessageHandler<S, HexValidator> {
    /// Starts building a handler.
    pub fn builder() -> MessageHandlerBuilder<S, HexValidator> {
        MessageHandlerBuilder::new()
    }
}

impl<S: Store, V: SessionValidator> MessageHandler<S, V> {
    /// Handles one request.
    ///
    /// Exactly one response is pushed to the outbound channel before this
    /// returns; the push waits if the channel is full. Returns `false` when
    /// that response was fatal (or couldn't be delivered at all), meaning
    /// the connection must be closed.
    pub async fn handle(&mut self, request: Request) -> bool {
        let Request { id, message, data } = request;

        let result = if id < 1 {
            Err(RequestError::InvalidRequestId)
        } else {
            match message {
                MessageKind::HostSession => self.handle_host_session(&data).await,
                MessageKind::JoinSession => self.handle_join_session(&data).await,
                MessageKind::Unsupported(tag) => {
                    tracing::debug!(request_id = id, %tag, "unsupported message");
                    Err(RequestError::UnsupportedMessage)
                }
            }
        };

        let response = match result {
            Ok(()) => Response::ok(id),
            Err(err) => err.into_response(id),
        };
        let keep_open = !response.fatal;

        if self.sender.send(response).await.is_err() {
            tracing::warn!(request_id = id, "outbound channel closed, response dropped");
            return false;
        }
        keep_open
    }

    /// Unsubscribes from every topic, then closes the subscription channel.
    ///
    /// Safe to call more than once and without any prior host/join; only
    /// the first call does anything.
    pub fn close(&mut self) {
        // Unsubscribe before dropping our sender so the hub stops
        // targeting the channel before it closes.
        let Some(subscription) = self.subscription.take() else {
            return;
        };
        let topics = self.pubsub.unsubscribe_all(&subscription);
        drop(subscription);

        tracing::debug!(
            topics,
            session_id = self.session.as_ref().map(|s| s.id.as_str()),
            "message handler closed"
        );
    }

    /// Takes the receiving end of the subscription channel.
    ///
    /// Events published on this connection's topics arrive here. Returns
    /// `None` after the first call.
    pub fn take_subscription(&mut self) -> Option<mpsc::Receiver<Event>> {
        self.events.take()
    }

    /// The session this connection is bound to, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Returns `true` once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.subscription.is_none()
    }

    async fn handle_host_session(
        &mut self,
        data: &HashMap<String, String>,
    ) -> Result<(), RequestError> {
        self.ensure_open()?;
        let (session_id, session_key) = session_params(data);

        let session = match self.find_session(session_id, session_key).await? {
            Some(session) => session,
            None => self.create_session(session_id, session_key).await?,
        };

        self.bind(session, Role::Host)
    }

    /// Persists a new session for a host.
    ///
    /// Another host may have created the same id between our lookup and
    /// this write. The store only writes if the id is still free; if it
    /// isn't, the session that won is looked up again and its key checked
    /// like any existing session's.
    async fn create_session(
        &self,
        session_id: &str,
        session_key: &str,
    ) -> Result<Session, RequestError> {
        let session = Session::new(session_id, session_key);
        let created = self
            .store
            .set_if_absent(&session.store_key(), &session)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, session_id, "failed to persist session");
                RequestError::Internal
            })?;

        if created {
            tracing::info!(session_id, "session created");
            return Ok(session);
        }

        tracing::debug!(session_id, "session created concurrently, re-reading");
        self.find_session(session_id, session_key)
            .await?
            .ok_or(RequestError::Internal)
    }

    async fn handle_join_session(
        &mut self,
        data: &HashMap<String, String>,
    ) -> Result<(), RequestError> {
        self.ensure_open()?;
        let (session_id, session_key) = session_params(data);

        let Some(session) = self.find_session(session_id, session_key).await? else {
            return Err(RequestError::NoSuchSession(session_id.to_string()));
        };

        self.bind(session, Role::Guest)
    }

    /// Validates the id and key, then looks the session up.
    ///
    /// `Ok(None)` means no session exists yet, which is not an error.
    async fn find_session(
        &self,
        session_id: &str,
        session_key: &str,
    ) -> Result<Option<Session>, RequestError> {
        if !self.validator.is_valid_id(session_id) {
            return Err(RequestError::InvalidSessionId);
        }
        if !self.validator.is_valid_key(session_key) {
            return Err(RequestError::InvalidSessionKey);
        }

        let stored: Option<Session> = self
            .store
            .get(&Session::store_key_for(session_id))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, session_id, "failed to load session");
                RequestError::Internal
            })?;

        match stored {
            None => Ok(None),
            Some(session) if !session.key_matches(session_key) => {
                tracing::debug!(session_id, "incorrect session key");
                Err(RequestError::IncorrectSessionKey)
            }
            Some(session) => Ok(Some(session)),
        }
    }

    /// Binds this connection to `session` and subscribes to `role`'s topic.
    ///
    /// Binding to a different session than the current one drops every
    /// subscription of the old session first, so a connection never
    /// listens to two sessions at once.
    fn bind(&mut self, session: Session, role: Role) -> Result<(), RequestError> {
        let Some(subscription) = self.subscription.as_ref() else {
            return Err(RequestError::Internal);
        };

        if let Some(current) = &self.session {
            if current.id != session.id {
                let dropped = self.pubsub.unsubscribe_all(subscription);
                tracing::info!(
                    from = %current.id,
                    to = %session.id,
                    dropped,
                    "rebinding to a different session"
                );
            }
        }

        let topic = role.topic(&session.id);
        self.pubsub.subscribe(&topic, subscription);
        tracing::info!(session_id = %session.id, %role, %topic, "session bound");

        self.session = Some(session);
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), RequestError> {
        if self.is_closed() {
            tracing::warn!("request on a closed message handler");
            return Err(RequestError::Internal);
        }
        Ok(())
    }
}

impl<S: Store, V: SessionValidator> Drop for MessageHandler<S, V> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Pulls `id` and `key` out of request data. Missing fields read as empty
/// strings, which no validator should accept.
fn session_params(data: &HashMap<String, String>) -> (&str, &str) {
    (field(data, "id"), field(data, "key"))
}

fn field<'a>(data: &'a HashMap<String, String>, name: &str) -> &'a str {
    data.get(name).map(String::as_str).unwrap_or_default()
}

// =========================================================================
// Tests
// =========================================================================
