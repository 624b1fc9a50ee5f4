//! tether runtime - transport, correlation, and errors
//!
//! This crate provides the plumbing between the test runner and the in-app
//! synchronization agent:
//!
//! - **Transport**: the [`Transport`] trait and its WebSocket implementation
//! - **Correlation**: [`InFlightRegistry`], pairing each sent message with
//!   the reply carrying the same `messageId`
//! - **Events**: [`EventCallbacks`] for frames that arrive without a request
//! - **Errors**: the [`Error`] taxonomy shared by every layer above
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │    tether    │  Client orchestrator, action catalogue
//! └──────┬───────┘
//!        │ dyn Transport
//! ┌──────▼───────┐
//! │tether-runtime│  This crate
//! │  ┌────────┐  │
//! │  │ Router │  │  reply vs. event classification
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │   WS   │  │  tokio-tungstenite reader/writer tasks
//! │  └────────┘  │
//! └──────────────┘
//! ```

pub mod error;
pub mod events;
pub mod in_flight;
pub mod transport;

pub use error::{Error, Result};
pub use events::{EventCallbacks, EventHandler};
pub use in_flight::{InFlightRegistry, InFlightRequest, PendingReply};
pub use transport::{BoxFuture, FrameRouter, Routed, Transport, WebSocketTransport};
