//! Per-connection driver: read requests, write responses and events.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. The task is split in two:
//!
//! ```text
//!            recv ──→ decode ──→ MessageHandler::handle ──→ outbound tx
//!  reader:                                                      │
//!                                                               ▼
//!  writer:   outbound rx ─┐
//!                         ├──→ encode_text ──→ send_text
//!            events rx ───┘
//! ```
//!
//! The reader stops on a fatal response, a close or an error. Until the
//! connection has bound a session it also stops on the idle timeout; a
//! bound host or guest may sit silently waiting for events for as long as
//! the socket stays up.
//!
//! On exit the reader closes the handler, which drops the last outbound
//! sender, so the writer drains whatever is queued (the fatal response
//! included) and exits on its own. Only then is the socket closed.

use std::sync::Arc;

use pairlink_protocol::{Codec, Event, JsonCodec, Request, Response};
use pairlink_session::{SessionValidator, Store};
use pairlink_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::server::ServerState;
use crate::{MessageHandler, MessageHandlerBuilder, RelayError};

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, V>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, V>>,
) -> Result<(), RelayError>
where
    S: Store,
    V: SessionValidator,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::info!(%conn_id, "connection opened");

    let (outbound_tx, outbound_rx) = mpsc::channel(state.config.outbound_capacity);
    let mut handler = MessageHandlerBuilder::new()
        .sender(outbound_tx)
        .store(Arc::clone(&state.store))
        .pubsub(Arc::clone(&state.pubsub))
        .validator(Arc::clone(&state.validator))
        .subscription_capacity(state.config.subscription_capacity)
        .build()?;
    let events = handler.take_subscription();

    let writer = tokio::spawn(write_loop(
        Arc::clone(&conn),
        state.codec,
        outbound_rx,
        events,
    ));

    let result = read_loop(&conn, &state, &mut handler).await;

    // Dropping the handler drops the last outbound sender; the writer
    // sees the channel close once it has flushed everything queued.
    handler.close();
    drop(handler);

    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(%conn_id, error = %e, "writer stopped early"),
        Err(e) => tracing::error!(%conn_id, error = %e, "writer task failed"),
    }

    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
    tracing::info!(%conn_id, "connection closed");

    result
}

/// Feeds decoded requests to `handler` until the connection should end.
async fn read_loop<S, V>(
    conn: &WebSocketConnection,
    state: &ServerState<S, V>,
    handler: &mut MessageHandler<S, V>,
) -> Result<(), RelayError>
where
    S: Store,
    V: SessionValidator,
{
    let conn_id = conn.id();
    let idle_timeout = state.config.idle_timeout();

    loop {
        let received = if handler.session().is_some() {
            Ok(conn.recv().await)
        } else {
            tokio::time::timeout(idle_timeout, conn.recv()).await
        };

        let data = match received {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::debug!(%conn_id, "peer closed the connection");
                return Ok(());
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                tracing::info!(%conn_id, "connection timed out before binding a session");
                return Ok(());
            }
        };

        let request: Request = match state.codec.decode(&data) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode request");
                continue;
            }
        };

        tracing::debug!(
            %conn_id,
            request_id = request.id,
            message = %request.message,
            "request received"
        );

        if !handler.handle(request).await {
            tracing::debug!(%conn_id, "closing after fatal response");
            return Ok(());
        }
    }
}

/// Writes responses and subscription events to the socket as text frames.
///
/// Returns once the outbound channel is closed and drained. Events stop
/// being forwarded when the subscription channel closes, but that alone
/// doesn't end the loop.
async fn write_loop(
    conn: Arc<WebSocketConnection>,
    codec: JsonCodec,
    mut responses: mpsc::Receiver<Response>,
    mut events: Option<mpsc::Receiver<Event>>,
) -> Result<(), RelayError> {
    loop {
        let text = tokio::select! {
            response = responses.recv() => match response {
                Some(response) => codec.encode_text(&response)?,
                None => break,
            },
            Some(event) = next_event(&mut events) => codec.encode_text(&event)?,
        };
        conn.send_text(text).await?;
    }
    Ok(())
}

/// Next subscription event. Pends forever once there is no channel.
async fn next_event(events: &mut Option<mpsc::Receiver<Event>>) -> Option<Event> {
    let Some(rx) = events else {
        return std::future::pending().await;
    };
    let event = rx.recv().await;
    if event.is_none() {
        *events = None;
    }
    event
}
