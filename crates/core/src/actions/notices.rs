//! Event-only actions pushed by the agent without a request.

use tether_protocol::{Envelope, MessageId, ids};
use tether_runtime::Result;

use super::{Action, expect_reply, param_text};

/// Crash notice sent by the agent right before the app process dies.
///
/// Interprets to the crash's error details.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppWillTerminateWithError;

impl Action for AppWillTerminateWithError {
	type Output = String;

	fn kind(&self) -> &'static str {
		"AppWillTerminateWithError"
	}

	fn fixed_id(&self) -> Option<MessageId> {
		Some(ids::APP_WILL_TERMINATE)
	}

	fn handle(&self, reply: Envelope) -> Result<String> {
		expect_reply(&reply, self.kind())?;
		Ok(param_text(&reply, "errorDetails"))
	}
}

/// Main-thread hang notice. Interprets to the reported thread dump.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppNonresponsive;

impl Action for AppNonresponsive {
	type Output = String;

	fn kind(&self) -> &'static str {
		"AppNonresponsiveDetected"
	}

	fn fixed_id(&self) -> Option<MessageId> {
		Some(ids::APP_NONRESPONSIVE)
	}

	fn handle(&self, reply: Envelope) -> Result<String> {
		expect_reply(&reply, self.kind())?;
		Ok(param_text(&reply, "threadDump"))
	}
}
