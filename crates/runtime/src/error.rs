//! Error types for the tether runtime.

use tether_protocol::MessageId;
use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the transport, the correlation layer, and reply interpretation.
#[derive(Debug, Error)]
pub enum Error {
	/// Client configuration rejected before any I/O happened.
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),

	/// Invalid argument provided to a client method or invocation builder.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// Failed to open the channel to the synchronization server.
	#[error("Failed to connect to {url}: {reason}")]
	ConnectionFailed { url: String, reason: String },

	/// Operation attempted on a channel that was never opened or is already closed.
	#[error("Can't send a `{kind}` message on a closed channel; call open() first")]
	NotConnected { kind: String },

	/// Transport-level failure after the channel was established.
	#[error("Transport error: {0}")]
	TransportError(String),

	/// The channel went away while a reply was still pending.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	/// A request with the same correlation id is still awaiting its reply.
	#[error("Message id {0} is already in flight")]
	DuplicateMessageId(MessageId),

	/// The reply type did not match what the action expects.
	#[error("Was expecting '{expected}', got {received}")]
	UnexpectedResponse { expected: String, received: String },

	/// The app reported a failed expectation or action.
	#[error("Test failed: {0}")]
	TestFailed(String),

	/// The app agent reported an internal error while handling a message.
	#[error("App error: {0}")]
	AppError(String),

	/// The app crashed; every pending request is failed with its details.
	#[error("The app has crashed: {details}")]
	AppCrashed { details: String },

	/// Malformed or unroutable frame.
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// WebSocket protocol error.
	#[error("WebSocket error: {0}")]
	WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl Error {
	/// Returns true if this error was produced by crash interception.
	pub fn is_app_crash(&self) -> bool {
		matches!(self, Error::AppCrashed { .. })
	}

	/// Returns true if the channel was torn down under a pending request.
	pub fn is_channel_closed(&self) -> bool {
		matches!(self, Error::ChannelClosed | Error::NotConnected { .. })
	}

	/// Returns the app-reported detail text, if this error carries one.
	pub fn details(&self) -> Option<&str> {
		match self {
			Error::TestFailed(d) | Error::AppError(d) => Some(d),
			Error::AppCrashed { details } => Some(details),
			_ => None,
		}
	}

	/// Rebuilds an app-reported error around new detail text, keeping its variant.
	///
	/// Errors without app-reported details are returned unchanged.
	pub fn map_details(self, f: impl FnOnce(&str) -> String) -> Self {
		match self {
			Error::TestFailed(d) => Error::TestFailed(f(&d)),
			Error::AppError(d) => Error::AppError(f(&d)),
			Error::AppCrashed { details } => Error::AppCrashed { details: f(&details) },
			other => other,
		}
	}
}
