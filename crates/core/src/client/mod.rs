//! [`Client`] orchestrating the conversation with the in-app agent.
//!
//! The client owns the session state (connected flag, pending crash, run
//! outcome, watchdog) and drives everything else through a
//! [`Transport`]. Replies come back through the transport's correlation
//! registry; crash and hang notices come through its event callbacks.

mod diagnostics;
mod dispatch;
mod events;
mod teardown;
mod watchdog;


use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use parking_lot::Mutex;
use serde_json::Value;
use tether_protocol::{Orientation, RecordingOptions, SyncSettings};
use tether_runtime::{Result, Transport, WebSocketTransport};

use crate::actions::{
	CurrentStatus, DeliverPayload, Login, Ready, ReloadReactNative, SetOrientation, SetRecordingState,
	SetSyncSettings, Shake, WaitForActive, WaitForBackground,
};
use crate::config::ClientConfig;
use watchdog::Watchdog;

/// Mutable session state, touched only through [`Client`] methods.
#[derive(Debug)]
pub(crate) struct ClientState {
	/// Set by a successful ready handshake, cleared by cleanup.
	pub(crate) connected: bool,
	/// Crash details captured from the agent, held until read.
	pub(crate) pending_crash: Option<String>,
	/// Cleared by any failed invocation; chooses the cleanup variant.
	pub(crate) last_run_successful: bool,
}

impl Default for ClientState {
	fn default() -> Self {
		Self {
			connected: false,
			pending_crash: None,
			last_run_successful: true,
		}
	}
}

/// Test-runner side of the app synchronization channel.
///
/// Typical session:
///
/// ```ignore
/// let client = Client::new(ClientConfig::new("ws://localhost:8099", session_id))?;
/// client.connect().await?;
/// client.wait_until_ready().await?;
/// client.execute(json!({ "target": ..., "method": "tap" })).await?;
/// client.cleanup().await?;
/// ```
pub struct Client {
	config: ClientConfig,
	transport: Arc<dyn Transport>,
	state: Arc<Mutex<ClientState>>,
	watchdog: Mutex<Option<Watchdog>>,
	watchdog_generation: AtomicU64,
}

impl Client {
	/// Creates a client talking WebSocket to `config.server`.
	///
	/// Nothing is opened until [`connect`](Self::connect).
	pub fn new(config: ClientConfig) -> Result<Self> {
		config.validate()?;
		let transport: Arc<dyn Transport> = Arc::new(WebSocketTransport::new(config.server.clone()));
		Ok(Self::with_transport(config, transport))
	}

	/// Creates a client over a caller-supplied transport.
	pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
		let client = Self {
			config,
			transport,
			state: Arc::new(Mutex::new(ClientState::default())),
			watchdog: Mutex::new(None),
			watchdog_generation: AtomicU64::new(0),
		};
		client.install_crash_listener();
		client
	}

	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// True between a successful [`wait_until_ready`](Self::wait_until_ready) and [`cleanup`](Self::cleanup).
	pub fn is_connected(&self) -> bool {
		self.state.lock().connected
	}

	/// False once any invocation in this session has failed.
	pub fn last_run_successful(&self) -> bool {
		self.state.lock().last_run_successful
	}

	/// Opens the channel and logs in with the configured session id.
	pub async fn connect(&self) -> Result<()> {
		self.transport.open().await?;
		self.send_action(Login::new(self.config.session_id.clone())).await?;
		tracing::debug!(session_id = %self.config.session_id, "Logged in");
		Ok(())
	}

	/// Waits for the app to report ready, then marks the client connected.
	///
	/// Must follow [`connect`](Self::connect).
	pub async fn wait_until_ready(&self) -> Result<()> {
		self.send_action(Ready).await?;
		self.state.lock().connected = true;
		Ok(())
	}

	pub async fn reload_react_native(&self) -> Result<()> {
		self.send_action(ReloadReactNative).await
	}

	pub async fn wait_for_background(&self) -> Result<()> {
		self.send_action(WaitForBackground).await
	}

	pub async fn wait_for_active(&self) -> Result<()> {
		self.send_action(WaitForActive).await
	}

	/// Asks the app what it is busy with. The status is also logged at info level.
	pub async fn current_status(&self) -> Result<Value> {
		self.send_action(CurrentStatus).await
	}

	pub async fn set_sync_settings(&self, settings: SyncSettings) -> Result<()> {
		self.send_action(SetSyncSettings { settings }).await
	}

	pub async fn shake(&self) -> Result<()> {
		self.send_action(Shake).await
	}

	pub async fn set_orientation(&self, orientation: Orientation) -> Result<()> {
		self.send_action(SetOrientation { orientation }).await
	}

	pub async fn start_instruments_recording(&self, options: RecordingOptions) -> Result<()> {
		self.send_action(SetRecordingState {
			recording: Some(options),
		})
		.await
	}

	pub async fn stop_instruments_recording(&self) -> Result<()> {
		self.send_action(SetRecordingState { recording: None }).await
	}

	/// Delivers a payload (URL, user notification, user activity) into the app.
	pub async fn deliver_payload(&self, payload: Value) -> Result<()> {
		self.send_action(DeliverPayload { payload }).await
	}
}

impl std::fmt::Debug for Client {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Client")
			.field("server", &self.config.server)
			.field("state", &*self.state.lock())
			.field("watchdog_armed", &self.watchdog.lock().is_some())
			.finish()
	}
}
