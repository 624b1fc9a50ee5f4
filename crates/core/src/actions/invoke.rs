//! The `invoke` action and its input normalization.

use std::fmt;

use serde_json::Value;
use tether_protocol::Envelope;
use tether_runtime::{Error, Result};

use super::{Action, param_text, reply_text};

/// A test-step invocation, either ready or produced on demand.
///
/// Deferred producers run immediately before dispatch, so builder errors
/// surface from [`Client::execute`](crate::Client::execute) like any other
/// failure of the step.
pub enum Invocation {
	Ready(Value),
	Deferred(Box<dyn FnOnce() -> Result<Value> + Send>),
}

impl Invocation {
	pub fn deferred<F>(producer: F) -> Self
	where
		F: FnOnce() -> Result<Value> + Send + 'static,
	{
		Self::Deferred(Box::new(producer))
	}

	/// Normalizes to the invocation value.
	pub fn resolve(self) -> Result<Value> {
		match self {
			Self::Ready(value) => Ok(value),
			Self::Deferred(producer) => producer(),
		}
	}
}

impl From<Value> for Invocation {
	fn from(value: Value) -> Self {
		Self::Ready(value)
	}
}

impl fmt::Debug for Invocation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
			Self::Deferred(_) => f.write_str("Deferred(..)"),
		}
	}
}

/// Runs one test step inside the app.
#[derive(Debug, Clone)]
pub struct Invoke {
	pub invocation: Value,
}

impl Invoke {
	pub fn new(invocation: Value) -> Self {
		Self { invocation }
	}
}

impl Action for Invoke {
	type Output = Value;

	fn kind(&self) -> &'static str {
		"invoke"
	}

	fn params(&self) -> Result<Value> {
		Ok(self.invocation.clone())
	}

	fn handle(&self, reply: Envelope) -> Result<Value> {
		match reply.kind.as_str() {
			"invokeResult" => Ok(reply.params),
			"testFailed" => Err(Error::TestFailed(param_text(&reply, "details"))),
			"error" => Err(Error::AppError(param_text(&reply, "error"))),
			_ => Err(Error::UnexpectedResponse {
				expected: "invokeResult".to_string(),
				received: reply_text(&reply),
			}),
		}
	}
}
