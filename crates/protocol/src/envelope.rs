//! Framed message envelope and correlation ids.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Correlation token pairing an outbound message with its reply.
///
/// Ids handed out by a transport counter start at zero and grow. Singleton
/// actions use the negative values in [`ids`] instead.
pub type MessageId = i64;

/// Reserved message ids for singleton actions.
pub mod ids {
	use super::MessageId;

	/// Shared by the ready handshake and a React Native reload, both answered by `ready`.
	pub const READY: MessageId = -1000;
	/// App crash notice pushed by the agent right before the process dies.
	pub const APP_WILL_TERMINATE: MessageId = -10000;
	/// Main-thread hang notice.
	pub const APP_NONRESPONSIVE: MessageId = -10001;
}

/// A single protocol frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
	/// Message kind (e.g. `"invoke"`, `"cleanupDone"`).
	#[serde(rename = "type")]
	pub kind: String,
	/// Kind-specific parameters. Absent params deserialize as an empty object.
	#[serde(default = "empty_params")]
	pub params: Value,
	/// Correlation id. Frames from older agents may omit it.
	#[serde(rename = "messageId", default, skip_serializing_if = "Option::is_none")]
	pub message_id: Option<MessageId>,
}

fn empty_params() -> Value {
	Value::Object(Default::default())
}

impl Envelope {
	/// Builds an outbound frame.
	pub fn new(kind: impl Into<String>, params: Value, message_id: MessageId) -> Self {
		Self {
			kind: kind.into(),
			params,
			message_id: Some(message_id),
		}
	}

	/// Parses a raw text frame.
	pub fn parse(raw: &str) -> serde_json::Result<Self> {
		serde_json::from_str(raw)
	}

	/// Serializes to the text form sent on the wire.
	pub fn to_text(&self) -> serde_json::Result<String> {
		serde_json::to_string(self)
	}
}

/// Reads only the correlation id out of a raw frame.
///
/// Used by transports to route a frame without committing to its shape.
pub fn peek_message_id(raw: &str) -> Option<MessageId> {
	#[derive(Deserialize)]
	struct Peek {
		#[serde(rename = "messageId")]
		message_id: Option<MessageId>,
	}

	serde_json::from_str::<Peek>(raw).ok().and_then(|p| p.message_id)
}
