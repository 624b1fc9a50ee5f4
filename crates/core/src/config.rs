//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_runtime::{Error, Result};

/// Everything a [`Client`](crate::Client) needs to reach the app.
///
/// Deserializes from the harness configuration (camelCase keys):
///
/// ```json
/// { "server": "ws://localhost:8099", "sessionId": "a1b2", "debugSynchronization": 3000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
	/// WebSocket URL of the synchronization server.
	pub server: String,
	/// Session shared with the app side; sent in the login handshake.
	pub session_id: String,
	/// Status-poll interval in milliseconds while an invocation is pending.
	/// Zero or absent disables the watchdog.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub debug_synchronization: Option<u64>,
}

impl ClientConfig {
	pub fn new(server: impl Into<String>, session_id: impl Into<String>) -> Self {
		Self {
			server: server.into(),
			session_id: session_id.into(),
			debug_synchronization: None,
		}
	}

	/// Enables the slow-invocation watchdog with the given poll interval.
	pub fn with_debug_synchronization(mut self, interval: Duration) -> Self {
		self.debug_synchronization = Some(interval.as_millis().try_into().unwrap_or(u64::MAX));
		self
	}

	/// Poll interval for the watchdog, or [`None`] when it is disabled.
	pub fn slow_invocation_interval(&self) -> Option<Duration> {
		self.debug_synchronization
			.filter(|ms| *ms > 0)
			.map(Duration::from_millis)
	}

	/// Parses and validates a JSON configuration document.
	pub fn from_json_str(json: &str) -> Result<Self> {
		let config: Self = serde_json::from_str(json)?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		if self.server.trim().is_empty() {
			return Err(Error::InvalidConfig("server URL is empty".to_string()));
		}
		if !(self.server.starts_with("ws://") || self.server.starts_with("wss://")) {
			return Err(Error::InvalidConfig(format!(
				"server URL must use ws:// or wss://, got '{}'",
				self.server
			)));
		}
		if self.session_id.trim().is_empty() {
			return Err(Error::InvalidConfig("session id is empty".to_string()));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn config_from_json() {
		let config = ClientConfig::from_json_str(
			r#"{"server": "ws://localhost:8099", "sessionId": "abc", "debugSynchronization": 250}"#,
		)
		.unwrap();

		assert_eq!(config.session_id, "abc");
		assert_eq!(config.slow_invocation_interval(), Some(Duration::from_millis(250)));
	}

	#[test]
	fn zero_or_absent_interval_disables_watchdog() {
		let config = ClientConfig::new("ws://localhost:8099", "abc");
		assert_eq!(config.slow_invocation_interval(), None);

		let config = ClientConfig {
			debug_synchronization: Some(0),
			..config
		};
		assert_eq!(config.slow_invocation_interval(), None);
	}

	#[test]
	fn builder_sets_interval() {
		let config = ClientConfig::new("ws://localhost:8099", "abc").with_debug_synchronization(Duration::from_secs(2));
		assert_eq!(config.debug_synchronization, Some(2000));
	}

	#[test]
	fn validation_rejects_bad_values() {
		assert!(matches!(
			ClientConfig::new("", "abc").validate(),
			Err(Error::InvalidConfig(_))
		));
		assert!(matches!(
			ClientConfig::new("http://localhost", "abc").validate(),
			Err(Error::InvalidConfig(_))
		));
		assert!(matches!(
			ClientConfig::from_json_str(r#"{"server": "ws://localhost:8099", "sessionId": " "}"#),
			Err(Error::InvalidConfig(_))
		));
	}
}
