//! The action catalogue.
//!
//! Each protocol message kind is its own type implementing [`Action`]: it
//! knows its wire `type`, how to build its params, whether it uses a fixed
//! correlation id, and how to interpret the agent's reply. The set is closed;
//! callers pick an action by constructing it.

mod invoke;
mod notices;

use serde::Serialize;
use serde_json::Value;
use tether_protocol::{Envelope, MessageId, Orientation, RecordingOptions, RecordingState, SyncSettings, TESTER_ROLE, ids};
use tether_runtime::{Error, Result};

pub use invoke::{Invocation, Invoke};
pub use notices::{AppNonresponsive, AppWillTerminateWithError};

/// One protocol message kind and its reply interpretation.
pub trait Action: Send + Sync {
	/// Interpreted reply.
	type Output: Send;

	/// Wire `type` of the outbound message (or of the event, for notices).
	fn kind(&self) -> &'static str;

	fn params(&self) -> Result<Value> {
		Ok(Value::Object(Default::default()))
	}

	/// Correlation id shared by every instance of this kind, if any.
	///
	/// Actions returning [`None`] get a fresh id from the transport per send.
	fn fixed_id(&self) -> Option<MessageId> {
		None
	}

	/// Interprets the parsed reply.
	fn handle(&self, reply: Envelope) -> Result<Self::Output>;
}

/// Fails with [`Error::UnexpectedResponse`] unless `reply` has type `expected`.
pub(crate) fn expect_reply(reply: &Envelope, expected: &str) -> Result<()> {
	if reply.kind == expected {
		return Ok(());
	}
	Err(Error::UnexpectedResponse {
		expected: expected.to_string(),
		received: reply_text(reply),
	})
}

pub(crate) fn reply_text(reply: &Envelope) -> String {
	serde_json::to_string(reply).unwrap_or_else(|_| format!("{reply:?}"))
}

/// Reads `params[key]` as text, rendering non-string values as JSON.
pub(crate) fn param_text(reply: &Envelope, key: &str) -> String {
	match reply.params.get(key) {
		Some(Value::String(s)) => s.clone(),
		Some(Value::Null) | None => String::new(),
		Some(other) => other.to_string(),
	}
}

fn to_params<T: Serialize>(params: &T) -> Result<Value> {
	serde_json::to_value(params).map_err(Into::into)
}

/// Declares a parameterless action acknowledged by a single reply type.
macro_rules! ack_action {
	($(#[$meta:meta])* $name:ident, $kind:literal => $done:literal $(, id = $id:expr)?) => {
		$(#[$meta])*
		#[derive(Debug, Clone, Copy, Default)]
		pub struct $name;

		impl Action for $name {
			type Output = ();

			fn kind(&self) -> &'static str {
				$kind
			}

			$(
				fn fixed_id(&self) -> Option<MessageId> {
					Some($id)
				}
			)?

			fn handle(&self, reply: Envelope) -> Result<()> {
				expect_reply(&reply, $done)
			}
		}
	};
}

ack_action!(
	/// Waits until the agent reports the app idle and ready for the first action.
	Ready, "isReady" => "ready", id = ids::READY
);
ack_action!(
	/// Reloads the React Native bundle; answered by `ready` once the reload settles.
	ReloadReactNative, "reactNativeReload" => "ready", id = ids::READY
);
ack_action!(WaitForBackground, "waitForBackground" => "waitForBackgroundDone");
ack_action!(WaitForActive, "waitForActive" => "waitForActiveDone");
ack_action!(Shake, "shakeDevice" => "shakeDeviceDone");

/// Session handshake sent right after the channel opens.
#[derive(Debug, Clone)]
pub struct Login {
	pub session_id: String,
}

impl Login {
	pub fn new(session_id: impl Into<String>) -> Self {
		Self {
			session_id: session_id.into(),
		}
	}
}

impl Action for Login {
	type Output = ();

	fn kind(&self) -> &'static str {
		"login"
	}

	fn params(&self) -> Result<Value> {
		Ok(serde_json::json!({
			"sessionId": self.session_id,
			"role": TESTER_ROLE,
		}))
	}

	fn handle(&self, reply: Envelope) -> Result<()> {
		expect_reply(&reply, "loginSuccess")
	}
}

#[derive(Debug, Clone, Copy)]
pub struct SetOrientation {
	pub orientation: Orientation,
}

impl Action for SetOrientation {
	type Output = ();

	fn kind(&self) -> &'static str {
		"setOrientation"
	}

	fn params(&self) -> Result<Value> {
		Ok(serde_json::json!({ "orientation": self.orientation }))
	}

	fn handle(&self, reply: Envelope) -> Result<()> {
		expect_reply(&reply, "setOrientationDone")
	}
}

/// End-of-session teardown request.
///
/// `stop_runner` carries whether the run succeeded, so the agent can tell a
/// clean finish from a failed test when it tears itself down.
#[derive(Debug, Clone, Copy)]
pub struct Cleanup {
	pub stop_runner: bool,
}

impl Action for Cleanup {
	type Output = ();

	fn kind(&self) -> &'static str {
		"cleanup"
	}

	fn params(&self) -> Result<Value> {
		Ok(serde_json::json!({ "stopRunner": self.stop_runner }))
	}

	fn handle(&self, reply: Envelope) -> Result<()> {
		expect_reply(&reply, "cleanupDone")
	}
}

#[derive(Debug, Clone, Default)]
pub struct SetSyncSettings {
	pub settings: SyncSettings,
}

impl Action for SetSyncSettings {
	type Output = ();

	fn kind(&self) -> &'static str {
		"setSyncSettings"
	}

	fn params(&self) -> Result<Value> {
		to_params(&self.settings)
	}

	fn handle(&self, reply: Envelope) -> Result<()> {
		expect_reply(&reply, "setSyncSettingsDone")
	}
}

/// Asks the agent what is keeping the app busy.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentStatus;

impl CurrentStatus {
	pub const KIND: &'static str = "currentStatus";
}

impl Action for CurrentStatus {
	type Output = Value;

	fn kind(&self) -> &'static str {
		Self::KIND
	}

	fn handle(&self, reply: Envelope) -> Result<Value> {
		expect_reply(&reply, "currentStatusResult")?;
		let status = reply.params.get("status").cloned().unwrap_or(reply.params);
		tracing::info!(%status, "App status");
		Ok(status)
	}
}

/// Starts (`Some`) or stops (`None`) an Instruments recording.
#[derive(Debug, Clone, Default)]
pub struct SetRecordingState {
	pub recording: Option<RecordingOptions>,
}

impl Action for SetRecordingState {
	type Output = ();

	fn kind(&self) -> &'static str {
		"setRecordingState"
	}

	fn params(&self) -> Result<Value> {
		to_params(&RecordingState::from(self.recording.clone()))
	}

	fn handle(&self, reply: Envelope) -> Result<()> {
		expect_reply(&reply, "setRecordingStateDone")
	}
}

/// Delivers a URL, notification, or similar payload into the running app.
#[derive(Debug, Clone)]
pub struct DeliverPayload {
	pub payload: Value,
}

impl Action for DeliverPayload {
	type Output = ();

	fn kind(&self) -> &'static str {
		"deliverPayload"
	}

	fn params(&self) -> Result<Value> {
		Ok(self.payload.clone())
	}

	fn handle(&self, reply: Envelope) -> Result<()> {
		expect_reply(&reply, "deliverPayloadDone")
	}
}
