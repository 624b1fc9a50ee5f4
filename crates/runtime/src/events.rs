//! Callbacks for frames that arrive outside the request/response flow.

use std::sync::Arc;

use dashmap::DashMap;
use tether_protocol::MessageId;

/// Handler receiving the raw text of an unsolicited frame.
pub type EventHandler = Arc<dyn Fn(String) + Send + Sync>;

/// `MessageId → handler` map for event-kind messages (crash and hang notices).
#[derive(Clone, Default)]
pub struct EventCallbacks {
	handlers: Arc<DashMap<MessageId, EventHandler>>,
}

impl EventCallbacks {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `handler` for `id`, replacing any previous handler.
	pub fn set(&self, id: MessageId, handler: EventHandler) {
		if self.handlers.insert(id, handler).is_some() {
			tracing::debug!(id, "Replaced event callback");
		}
	}

	/// Invokes the handler registered for `id`. Returns `false` if there is none.
	pub fn dispatch(&self, id: MessageId, raw: String) -> bool {
		// Clone out so the shard lock is released before the handler runs.
		let Some(handler) = self.handlers.get(&id).map(|h| Arc::clone(h.value())) else {
			return false;
		};
		handler(raw);
		true
	}

	pub fn contains(&self, id: MessageId) -> bool {
		self.handlers.contains_key(&id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use parking_lot::Mutex;

	#[test]
	fn test_dispatch_calls_registered_handler() {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let seen_clone = Arc::clone(&seen);

		let callbacks = EventCallbacks::new();
		callbacks.set(-10001, Arc::new(move |raw| seen_clone.lock().push(raw)));

		assert!(callbacks.dispatch(-10001, "hang".into()));
		assert!(!callbacks.dispatch(-10000, "crash".into()));
		assert_eq!(*seen.lock(), vec!["hang".to_string()]);
	}

	#[test]
	fn test_handler_may_reregister_itself() {
		let callbacks = EventCallbacks::new();
		let inner = callbacks.clone();
		callbacks.set(
			1,
			Arc::new(move |_| {
				inner.set(1, Arc::new(|_| {}));
			}),
		);

		assert!(callbacks.dispatch(1, String::new()));
		assert!(callbacks.contains(1));
	}
}
