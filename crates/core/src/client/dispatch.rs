//! Action dispatch and test-step execution for [`Client`].

use serde_json::Value;
use tether_protocol::Envelope;
use tether_runtime::{Error, Result, Transport};

use super::Client;
use crate::actions::{Action, Invocation, Invoke};

/// Backtrace frames from these modules are noise to someone debugging a test.
const INTERNAL_FRAME_MARKERS: &[&str] = &["tether::client", "tether_runtime::"];

/// Sends `action` over `transport` and interprets the correlated reply.
pub(crate) async fn dispatch<A: Action + ?Sized>(transport: &dyn Transport, action: &A) -> Result<A::Output> {
	let id = action.fixed_id().unwrap_or_else(|| transport.next_message_id());
	let message = Envelope::new(action.kind(), action.params()?, id);

	tracing::debug!(id, kind = action.kind(), "Sending action");
	let raw = transport.send(message).await?;

	let reply = Envelope::parse(&raw)?;
	tracing::debug!(id, kind = %reply.kind, "Received reply");
	action.handle(reply)
}

impl Client {
	/// Sends `action` and returns its interpreted reply.
	pub async fn send_action<A: Action>(&self, action: A) -> Result<A::Output> {
		dispatch(self.transport.as_ref(), &action).await
	}

	/// Runs one test step in the app and returns the `invokeResult` params.
	///
	/// `invocation` may be a ready JSON value or [`Invocation::deferred`]
	/// producer, which is run first. While the step is pending the status
	/// watchdog polls the app if configured; it is disarmed however this call
	/// ends, including when the future is dropped.
	///
	/// The client has one watchdog. When calls overlap, the most recently
	/// started one owns it and it polls until that call ends; earlier calls
	/// finishing do not cancel it.
	///
	/// On failure the run is marked unsuccessful and the error is returned
	/// with this crate's backtrace frames removed from its details. An app
	/// crash during the step fails it with [`Error::AppCrashed`].
	///
	/// Calling this before [`wait_until_ready`](Self::wait_until_ready) has
	/// succeeded is a caller error; it is not checked.
	pub async fn execute(&self, invocation: impl Into<Invocation>) -> Result<Value> {
		match self.execute_inner(invocation.into()).await {
			Ok(result) => Ok(result),
			Err(e) => {
				self.state.lock().last_run_successful = false;
				Err(sanitize(e))
			}
		}
	}

	async fn execute_inner(&self, invocation: Invocation) -> Result<Value> {
		let invocation = invocation.resolve()?;
		let _armed = self.arm_watchdog();
		self.send_action(Invoke::new(invocation)).await
	}
}

/// Strips this crate's frames from app-reported error details.
pub(crate) fn sanitize(err: Error) -> Error {
	err.map_details(strip_internal_frames)
}

fn strip_internal_frames(details: &str) -> String {
	let mut kept = Vec::new();
	let mut skipping_location = false;

	for line in details.lines() {
		let trimmed = line.trim_start();
		if skipping_location && trimmed.starts_with("at ") {
			continue;
		}
		skipping_location = false;

		if is_frame(trimmed) && INTERNAL_FRAME_MARKERS.iter().any(|m| trimmed.contains(m)) {
			// Drop the `at file:line` location that follows a numbered frame too.
			skipping_location = true;
			continue;
		}
		kept.push(line);
	}

	kept.join("\n")
}

/// Numbered backtrace frame (`12: path::fn`) or location line (`at ...`).
fn is_frame(trimmed: &str) -> bool {
	if trimmed.starts_with("at ") {
		return true;
	}
	trimmed
		.split_once(": ")
		.is_some_and(|(n, _)| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_strip_internal_frames() {
		let details = "Cannot find UI element.\n\
			   0: app::matchers::find\n\
			   1: tether::client::dispatch::dispatch\n\
			             at ./crates/core/src/client/dispatch.rs:20:5\n\
			   2: tether_runtime::in_flight::PendingReply::poll\n\
			   3: my_tests::login::taps_button\n\
			             at ./tests/login.rs:12:9";

		let cleaned = strip_internal_frames(details);

		assert!(cleaned.starts_with("Cannot find UI element."));
		assert!(cleaned.contains("app::matchers::find"));
		assert!(cleaned.contains("my_tests::login::taps_button"));
		assert!(cleaned.contains("./tests/login.rs:12:9"));
		assert!(!cleaned.contains("tether::client"));
		assert!(!cleaned.contains("tether_runtime::"));
		assert!(!cleaned.contains("dispatch.rs"));
	}

	#[test]
	fn test_message_mentioning_module_is_kept() {
		let details = "tether::client rejected the matcher";
		assert_eq!(strip_internal_frames(details), details);
	}

	#[test]
	fn test_sanitize_preserves_variant() {
		let err = sanitize(Error::TestFailed("boom\n  4: tether::client::x".into()));
		assert!(matches!(err, Error::TestFailed(ref d) if d == "boom"));

		let err = sanitize(Error::ChannelClosed);
		assert!(matches!(err, Error::ChannelClosed));
	}
}
