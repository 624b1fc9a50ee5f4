//! Registry of requests awaiting their correlated reply.
//!
//! Each entry pairs the request's bookkeeping ([`InFlightRequest`]) with the
//! oneshot handle that completes the caller's future. Replies, crash
//! interception, and teardown all go through this one map, so every way a
//! pending request can end is an explicit operation here.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use parking_lot::Mutex;
use serde_json::Value;
use tether_protocol::MessageId;
use tokio::sync::oneshot;

use crate::error::{Error, Result};

/// A sent message awaiting its reply, as exposed for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct InFlightRequest {
	pub id: MessageId,
	pub kind: String,
	pub params: Value,
}

struct Pending {
	token: u64,
	request: InFlightRequest,
	tx: oneshot::Sender<Result<String>>,
}

type Entries = Arc<Mutex<BTreeMap<MessageId, Pending>>>;

/// Shared `MessageId → completion handle` map.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct InFlightRegistry {
	entries: Entries,
	next_token: Arc<AtomicU64>,
}

impl InFlightRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records a request and returns the future that resolves with its raw reply.
	///
	/// Fails with [`Error::DuplicateMessageId`] while another request with the
	/// same id is pending. Dropping the returned future removes the entry.
	pub fn register(&self, request: InFlightRequest) -> Result<PendingReply> {
		let id = request.id;
		let token = self.next_token.fetch_add(1, Ordering::Relaxed);
		let (tx, rx) = oneshot::channel();

		let mut entries = self.entries.lock();
		if entries.contains_key(&id) {
			return Err(Error::DuplicateMessageId(id));
		}
		entries.insert(id, Pending { token, request, tx });
		drop(entries);

		Ok(PendingReply {
			rx,
			guard: CancelGuard {
				id,
				token,
				entries: Arc::clone(&self.entries),
				completed: false,
			},
		})
	}

	/// Completes the request with `id` using the raw reply text.
	///
	/// Returns `false` if no such request is pending.
	pub fn resolve(&self, id: MessageId, raw: String) -> bool {
		let Some(pending) = self.entries.lock().remove(&id) else {
			return false;
		};
		// Receiver may already be gone (caller cancelled); the reply is still consumed.
		let _ = pending.tx.send(Ok(raw));
		true
	}

	/// Fails every pending request with [`Error::AppCrashed`] and empties the registry.
	///
	/// Returns the number of requests rejected.
	pub fn reject_all(&self, details: &str) -> usize {
		let drained = std::mem::take(&mut *self.entries.lock());
		let count = drained.len();
		for (_, pending) in drained {
			let _ = pending.tx.send(Err(Error::AppCrashed {
				details: details.to_string(),
			}));
		}
		count
	}

	/// Forgets every pending request. Awaiting callers observe [`Error::ChannelClosed`].
	pub fn reset(&self) -> usize {
		let drained = std::mem::take(&mut *self.entries.lock());
		drained.len()
	}

	/// Returns the pending requests ordered by id.
	pub fn snapshot(&self) -> Vec<InFlightRequest> {
		self.entries.lock().values().map(|p| p.request.clone()).collect()
	}

	pub fn contains(&self, id: MessageId) -> bool {
		self.entries.lock().contains_key(&id)
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}
}

/// RAII guard removing the registry entry when a reply future is dropped early.
struct CancelGuard {
	id: MessageId,
	token: u64,
	entries: Entries,
	completed: bool,
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if self.completed {
			return;
		}

		let mut entries = self.entries.lock();
		// Only remove our own registration; the id may have been reused after a reset.
		if entries.get(&self.id).is_some_and(|p| p.token == self.token) {
			entries.remove(&self.id);
			tracing::debug!(id = self.id, "CancelGuard: removed orphaned request");
		}
	}
}

/// Future returned by [`InFlightRegistry::register`].
pub struct PendingReply {
	rx: oneshot::Receiver<Result<String>>,
	guard: CancelGuard,
}

impl Future for PendingReply {
	type Output = Result<String>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => {
				self.guard.completed = true;
				Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
			}
			Poll::Pending => Poll::Pending,
		}
	}
}
