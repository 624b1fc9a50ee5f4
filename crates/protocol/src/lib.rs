//! Wire types for the tether app-synchronization protocol.
//!
//! The test runner and the in-app synchronization agent exchange JSON text
//! frames over a WebSocket. Every frame is an [`Envelope`]:
//!
//! ```text
//! { "type": "<kind>", "params": { ... }, "messageId": <integer> }
//! ```
//!
//! A reply carries the `messageId` of the request it answers. Frames sent by
//! the app without a matching request (crash and hang notices) reuse a small
//! set of reserved negative ids, see [`ids`].
//!
//! Types in this crate are pure data. Reply interpretation lives with the
//! action catalogue in the `tether` crate.

pub mod envelope;
pub mod types;

pub use envelope::*;
pub use types::*;
