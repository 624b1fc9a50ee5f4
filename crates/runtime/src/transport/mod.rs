//! Transport abstraction and inbound frame routing.
//!
//! A [`Transport`] owns the channel to the in-app agent. It sends
//! [`Envelope`]s and resolves each send with the raw text of the reply that
//! carries the same `messageId`. Frames with no pending request go to the
//! event callbacks registered through [`Transport::set_event_callback`].
//!
//! [`FrameRouter`] holds the routing logic so every transport (and every test
//! double) classifies frames the same way.

mod websocket;

#[cfg(test)]
mod tests;

use std::future::Future;
use std::pin::Pin;

use tether_protocol::{Envelope, MessageId, peek_message_id};

pub use websocket::WebSocketTransport;

use crate::error::{Error, Result};
use crate::events::{EventCallbacks, EventHandler};
use crate::in_flight::{InFlightRegistry, InFlightRequest, PendingReply};

/// Boxing alias: object-safe async methods without `async_trait`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Persistent bidirectional channel to the in-app synchronization agent.
pub trait Transport: Send + Sync {
	/// Opens the channel.
	fn open(&self) -> BoxFuture<'_, Result<()>>;

	/// Closes the channel. Fails if it is not open.
	fn close(&self) -> BoxFuture<'_, Result<()>>;

	fn is_open(&self) -> bool;

	/// Allocates a fresh correlation id for actions without a fixed one.
	fn next_message_id(&self) -> MessageId;

	/// Sends `message` and awaits the raw reply with the same `messageId`.
	fn send(&self, message: Envelope) -> BoxFuture<'_, Result<String>>;

	/// Routes unsolicited frames carrying `id` to `handler`.
	fn set_event_callback(&self, id: MessageId, handler: EventHandler);

	/// Fails every pending send with [`Error::AppCrashed`].
	fn reject_all(&self, details: &str);

	/// Drops all in-flight bookkeeping.
	fn reset_in_flight(&self);

	/// Snapshot of the requests still awaiting a reply.
	fn in_flight(&self) -> Vec<InFlightRequest>;

	/// Frees what is left of a channel the peer ended without [`close`](Self::close).
	///
	/// No-op while the channel is open or after it was closed.
	fn release(&self) {}
}

/// Classifies inbound frames as replies or events.
#[derive(Clone, Default)]
pub struct FrameRouter {
	in_flight: InFlightRegistry,
	events: EventCallbacks,
}

/// Where a routed frame ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
	Reply,
	Event,
	Dropped,
}

impl FrameRouter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn in_flight(&self) -> &InFlightRegistry {
		&self.in_flight
	}

	pub fn events(&self) -> &EventCallbacks {
		&self.events
	}

	/// Records `message` as in flight and returns the future for its reply.
	pub fn register(&self, message: &Envelope) -> Result<PendingReply> {
		let id = message.message_id.ok_or_else(|| {
			Error::ProtocolError(format!("outbound `{}` message has no messageId", message.kind))
		})?;
		self.in_flight.register(InFlightRequest {
			id,
			kind: message.kind.clone(),
			params: message.params.clone(),
		})
	}

	/// Routes one raw inbound frame.
	///
	/// A pending request with the frame's id takes precedence over an event
	/// callback for the same id.
	pub fn route(&self, raw: String) -> Routed {
		let Some(id) = peek_message_id(&raw) else {
			tracing::warn!(frame = %raw, "Dropping frame without messageId");
			return Routed::Dropped;
		};

		if self.in_flight.contains(id) {
			tracing::debug!(id, "Routing reply");
			if self.in_flight.resolve(id, raw) {
				return Routed::Reply;
			}
			// Lost a race with cancellation; nothing else wants this frame.
			return Routed::Dropped;
		}

		if self.events.dispatch(id, raw.clone()) {
			tracing::debug!(id, "Routed event");
			return Routed::Event;
		}

		tracing::warn!(id, frame = %raw, "Unexpected message");
		Routed::Dropped
	}
}
