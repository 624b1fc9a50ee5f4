//! Listeners for frames the agent sends on its own: crash and hang notices.

use std::sync::Arc;

use serde_json::Value;
use tether_protocol::Envelope;
use tether_runtime::Transport;

use super::Client;
use crate::actions::{Action, AppNonresponsive, AppWillTerminateWithError};

/// Wires `action`'s correlation id to `callback` on the transport's event path.
///
/// Each frame is parsed and run through the action's reply interpretation;
/// the callback only sees frames that interpret cleanly.
fn register_listener<A, F>(transport: &dyn Transport, action: A, callback: F)
where
	A: Action + 'static,
	F: Fn(A::Output, &Envelope) + Send + Sync + 'static,
{
	let Some(id) = action.fixed_id() else {
		tracing::warn!(kind = action.kind(), "Listener action has no fixed id; ignoring registration");
		return;
	};

	transport.set_event_callback(
		id,
		Arc::new(move |raw: String| {
			let event = match Envelope::parse(&raw) {
				Ok(event) => event,
				Err(e) => {
					tracing::warn!(id, "Malformed event frame: {}", e);
					return;
				}
			};
			match action.handle(event.clone()) {
				Ok(output) => callback(output, &event),
				Err(e) => tracing::warn!(id, kind = action.kind(), "Event rejected: {}", e),
			}
		}),
	);
}

impl Client {
	/// Registers `callback` for unsolicited frames of `action`'s kind.
	///
	/// `action` must be a singleton with a fixed id. Registering the same
	/// kind again replaces the earlier callback.
	pub fn set_action_listener<A, F>(&self, action: A, callback: F)
	where
		A: Action + 'static,
		F: Fn(A::Output, &Envelope) + Send + Sync + 'static,
	{
		register_listener(self.transport.as_ref(), action, callback);
	}

	/// Forwards app-hang notices to `callback` with the notice's params.
	///
	/// Non-fatal: pending invocations keep waiting.
	pub fn set_nonresponsiveness_listener<F>(&self, callback: F)
	where
		F: Fn(Value) + Send + Sync + 'static,
	{
		self.set_action_listener(AppNonresponsive, move |_thread_dump, event| {
			callback(event.params.clone());
		});
	}

	/// Returns the captured crash details, clearing them.
	///
	/// A crash is handed out once; later calls return [`None`] until the
	/// agent reports another one.
	pub fn get_pending_crash_and_reset(&self) -> Option<String> {
		self.state.lock().pending_crash.take()
	}

	/// Records crash notices and fails every pending request with their details.
	pub(super) fn install_crash_listener(&self) {
		let state = Arc::clone(&self.state);
		// Weak: the transport owns this callback.
		let transport = Arc::downgrade(&self.transport);

		register_listener(self.transport.as_ref(), AppWillTerminateWithError, move |details, _| {
			tracing::error!(%details, "App is terminating with an error");

			let previous = state.lock().pending_crash.replace(details.clone());
			if previous.is_some() {
				tracing::warn!("Overwriting an unread crash report");
			}

			if let Some(transport) = transport.upgrade() {
				transport.reject_all(&details);
			}
		});
	}
}
