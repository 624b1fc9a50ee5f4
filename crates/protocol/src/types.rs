//! Parameter types carried by outbound actions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role announced in the login handshake.
pub const TESTER_ROLE: &str = "tester";

/// Device orientation for `setOrientation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
	Portrait,
	Landscape,
}

/// Options for starting an Instruments recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingOptions {
	/// Path on the host where the trace is written.
	pub recording_path: String,
	/// Sampling interval in milliseconds, agent default when [`None`].
	#[serde(skip_serializing_if = "Option::is_none")]
	pub sampling_interval: Option<u64>,
}

/// Wire params for `setRecordingState`.
///
/// Stopping a recording sends explicit nulls rather than omitting the keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingState {
	pub recording_path: Option<String>,
	pub sampling_interval: Option<u64>,
}

impl From<Option<RecordingOptions>> for RecordingState {
	fn from(options: Option<RecordingOptions>) -> Self {
		match options {
			Some(o) => Self {
				recording_path: Some(o.recording_path),
				sampling_interval: o.sampling_interval,
			},
			None => Self {
				recording_path: None,
				sampling_interval: None,
			},
		}
	}
}

/// Synchronization settings for `setSyncSettings`.
///
/// Well-known keys are typed; anything else the agent understands passes
/// through `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
	/// URL regexes whose network activity the agent ignores while idling.
	#[serde(rename = "blacklistURLs", skip_serializing_if = "Option::is_none")]
	pub blacklist_urls: Option<Vec<String>>,
	/// Whether the agent waits for main-queue idleness at all.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub enabled: Option<bool>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_stop_recording_sends_nulls() {
		let state = RecordingState::from(None);
		assert_eq!(
			serde_json::to_value(state).unwrap(),
			json!({"recordingPath": null, "samplingInterval": null})
		);
	}

	#[test]
	fn test_sync_settings_pass_through_unknown_keys() {
		let settings: SyncSettings =
			serde_json::from_value(json!({"blacklistURLs": [".*127.0.0.1.*"], "waitForDebugger": 500})).unwrap();

		assert_eq!(settings.blacklist_urls.as_deref(), Some(&[".*127.0.0.1.*".to_string()][..]));
		let back = serde_json::to_value(&settings).unwrap();
		assert_eq!(back["waitForDebugger"], 500);
		assert!(back.get("enabled").is_none());
	}

	#[test]
	fn test_orientation_serializes_lowercase() {
		assert_eq!(serde_json::to_value(Orientation::Landscape).unwrap(), json!("landscape"));
	}
}
