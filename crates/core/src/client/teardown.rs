//! Session teardown for [`Client`].

use tether_runtime::Result;

use super::Client;
use crate::actions::Cleanup;

impl Client {
	/// Tears the session down, whatever state it is in.
	///
	/// 1. Cancels the watchdog.
	/// 2. If the app is connected and has not crashed, sends `cleanup`
	///    (carrying whether the run succeeded) while the channel is open,
	///    then marks the client disconnected regardless of the reply.
	/// 3. Closes the channel if it is still open, otherwise releases what
	///    is left of a channel the app side ended.
	///
	/// A crashed app never gets a `cleanup` request: its pending requests
	/// were already failed and it will not answer. A failed `cleanup`
	/// exchange is returned only after the channel has been closed.
	pub async fn cleanup(&self) -> Result<()> {
		self.disarm_watchdog();

		let (connected, crashed, successful) = {
			let state = self.state.lock();
			(
				state.connected,
				state.pending_crash.is_some(),
				state.last_run_successful,
			)
		};

		let mut cleanup_result = Ok(());
		if connected && !crashed {
			if self.transport.is_open() {
				cleanup_result = self.send_action(Cleanup { stop_runner: successful }).await;
				if let Err(e) = &cleanup_result {
					tracing::warn!("Cleanup request failed: {}", e);
				}
			}
			self.state.lock().connected = false;
		} else if crashed {
			tracing::debug!("Skipping cleanup request, app crashed");
		}

		if self.transport.is_open() {
			self.transport.close().await?;
		} else {
			self.transport.release();
		}

		cleanup_result
	}
}
