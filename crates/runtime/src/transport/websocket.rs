//! WebSocket transport to the synchronization server.
//!
//! `open()` connects and splits the socket into a writer task fed by an
//! unbounded channel and a reader task that hands every text frame to the
//! [`FrameRouter`]. When the socket ends for any reason the reader drops all
//! in-flight requests, so callers awaiting a reply see
//! [`Error::ChannelClosed`] instead of hanging.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tether_protocol::{Envelope, MessageId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::{BoxFuture, FrameRouter, Transport};
use crate::error::{Error, Result};
use crate::events::EventHandler;
use crate::in_flight::{InFlightRequest, PendingReply};

/// How long `close()` waits for the server to acknowledge the close frame.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Live socket state, present between `open()` and `close()`.
struct Link {
	outbound_tx: mpsc::UnboundedSender<WsMessage>,
	open: Arc<AtomicBool>,
	reader: JoinHandle<()>,
	writer: JoinHandle<()>,
}

/// [`Transport`] over a single WebSocket connection.
pub struct WebSocketTransport {
	url: String,
	router: FrameRouter,
	last_id: AtomicI64,
	link: Mutex<Option<Link>>,
}

impl WebSocketTransport {
	/// Creates an unopened transport for `url` (`ws://` or `wss://`).
	pub fn new(url: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			router: FrameRouter::new(),
			last_id: AtomicI64::new(0),
			link: Mutex::new(None),
		}
	}

	async fn open_internal(&self) -> Result<()> {
		if self.is_open() {
			return Ok(());
		}

		tracing::debug!(url = %self.url, "Opening websocket");
		let (stream, _) = connect_async(self.url.as_str())
			.await
			.map_err(|e| Error::ConnectionFailed {
				url: self.url.clone(),
				reason: e.to_string(),
			})?;

		let (mut sink, mut source) = stream.split();
		let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<WsMessage>();
		let open = Arc::new(AtomicBool::new(true));

		let writer = tokio::spawn(async move {
			while let Some(message) = outbound_rx.recv().await {
				let closing = matches!(message, WsMessage::Close(_));
				if let Err(e) = sink.send(message).await {
					tracing::error!("Websocket write error: {}", e);
					break;
				}
				if closing {
					break;
				}
			}
		});

		let router = self.router.clone();
		let reader_open = Arc::clone(&open);
		let reader = tokio::spawn(async move {
			while let Some(frame) = source.next().await {
				match frame {
					Ok(WsMessage::Text(text)) => {
						tracing::trace!(frame = %text, "Websocket receive");
						router.route(text);
					}
					Ok(WsMessage::Binary(bytes)) => match String::from_utf8(bytes) {
						Ok(text) => {
							router.route(text);
						}
						Err(e) => tracing::warn!("Dropping non-UTF-8 binary frame: {}", e),
					},
					Ok(WsMessage::Close(frame)) => {
						tracing::debug!(?frame, "Websocket closed by peer");
						break;
					}
					Ok(_) => {}
					Err(e) => {
						tracing::error!("Websocket read error: {}", e);
						break;
					}
				}
			}

			reader_open.store(false, Ordering::SeqCst);
			let dropped = router.in_flight().reset();
			if dropped > 0 {
				tracing::debug!(dropped, "Websocket ended with requests in flight");
			}
		});

		*self.link.lock() = Some(Link {
			outbound_tx,
			open,
			reader,
			writer,
		});
		Ok(())
	}

	async fn close_internal(&self) -> Result<()> {
		let Some(link) = self.link.lock().take() else {
			return Err(Error::NotConnected {
				kind: "close".to_string(),
			});
		};

		tracing::debug!(url = %self.url, "Closing websocket");
		let Link {
			outbound_tx,
			open,
			mut reader,
			writer,
		} = link;

		let _ = outbound_tx.send(WsMessage::Close(None));
		drop(outbound_tx);
		let _ = writer.await;

		if tokio::time::timeout(CLOSE_TIMEOUT, &mut reader).await.is_err() {
			tracing::warn!("Websocket close not acknowledged, aborting reader");
			reader.abort();
			self.router.in_flight().reset();
		}
		open.store(false, Ordering::SeqCst);
		Ok(())
	}

	fn outbound(&self, kind: &str) -> Result<(mpsc::UnboundedSender<WsMessage>, Arc<AtomicBool>)> {
		match self.link.lock().as_ref() {
			Some(link) if link.open.load(Ordering::SeqCst) => {
				Ok((link.outbound_tx.clone(), Arc::clone(&link.open)))
			}
			_ => Err(Error::NotConnected {
				kind: kind.to_string(),
			}),
		}
	}

	async fn send_internal(&self, message: Envelope) -> Result<String> {
		let (outbound_tx, open) = self.outbound(&message.kind)?;
		let reply = register_on_link(&self.router, &open, &message)?;

		let text = message.to_text()?;
		tracing::trace!(frame = %text, "Websocket send");

		if outbound_tx.send(WsMessage::Text(text)).is_err() {
			tracing::error!("Failed to queue message: outbound channel closed");
			return Err(Error::ChannelClosed);
		}

		reply.await
	}
}

impl Transport for WebSocketTransport {
	fn open(&self) -> BoxFuture<'_, Result<()>> {
		Box::pin(self.open_internal())
	}

	fn close(&self) -> BoxFuture<'_, Result<()>> {
		Box::pin(self.close_internal())
	}

	fn is_open(&self) -> bool {
		self.link
			.lock()
			.as_ref()
			.is_some_and(|link| link.open.load(Ordering::SeqCst))
	}

	fn next_message_id(&self) -> MessageId {
		self.last_id.fetch_add(1, Ordering::SeqCst)
	}

	fn send(&self, message: Envelope) -> BoxFuture<'_, Result<String>> {
		Box::pin(self.send_internal(message))
	}

	fn set_event_callback(&self, id: MessageId, handler: EventHandler) {
		self.router.events().set(id, handler);
	}

	fn reject_all(&self, details: &str) {
		let rejected = self.router.in_flight().reject_all(details);
		tracing::debug!(rejected, "Rejected in-flight requests");
	}

	fn reset_in_flight(&self) {
		self.router.in_flight().reset();
	}

	fn in_flight(&self) -> Vec<InFlightRequest> {
		self.router.in_flight().snapshot()
	}

	fn release(&self) {
		let mut slot = self.link.lock();
		if !slot.as_ref().is_some_and(|link| !link.open.load(Ordering::SeqCst)) {
			return;
		}
		if let Some(link) = slot.take() {
			tracing::debug!(url = %self.url, "Releasing ended websocket");
			link.reader.abort();
			link.writer.abort();
		}
	}
}

/// Registers `message` on a link the reader may be tearing down.
///
/// The reader clears `open` before it resets the registry, so an entry
/// inserted after that reset is caught by the check below and withdrawn
/// when `reply` drops.
pub(super) fn register_on_link(router: &FrameRouter, open: &AtomicBool, message: &Envelope) -> Result<PendingReply> {
	let reply = router.register(message)?;
	if !open.load(Ordering::SeqCst) {
		return Err(Error::ChannelClosed);
	}
	Ok(reply)
}

impl Drop for WebSocketTransport {
	fn drop(&mut self) {
		if let Some(link) = self.link.get_mut().take() {
			link.reader.abort();
			link.writer.abort();
		}
	}
}
