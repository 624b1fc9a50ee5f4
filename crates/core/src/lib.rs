//! tether: test-runner client for app synchronization
//!
//! A test runner uses [`Client`] to drive an app under test through the
//! synchronization agent embedded in it. The client logs in over a
//! persistent WebSocket, waits for the app to go idle, sends test steps, and
//! tears the session down, while watching for crash and hang notices the app
//! pushes on its own.
//!
//! # Examples
//!
//! ```ignore
//! use serde_json::json;
//! use tether::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> tether::Result<()> {
//!     let config = ClientConfig::new("ws://localhost:8099", "a1b2c3")
//!         .with_debug_synchronization(std::time::Duration::from_secs(3));
//!     let client = Client::new(config)?;
//!
//!     client.connect().await?;
//!     client.wait_until_ready().await?;
//!
//!     let outcome = client
//!         .execute(json!({"target": {"type": "Invocation"}, "method": "tap", "args": []}))
//!         .await;
//!     if let Some(crash) = client.get_pending_crash_and_reset() {
//!         eprintln!("app crashed: {crash}");
//!     }
//!
//!     client.cleanup().await?;
//!     outcome.map(drop)
//! }
//! ```

pub mod actions;
pub mod client;
pub mod config;
pub mod logging;

pub use actions::{Action, Invocation};
pub use client::Client;
pub use config::ClientConfig;
pub use logging::init_logging;
pub use tether_protocol::{Envelope, MessageId, Orientation, RecordingOptions, SyncSettings};
pub use tether_runtime::{Error, InFlightRequest, Result, Transport, WebSocketTransport};
