//! Slow-invocation watchdog.
//!
//! While an invocation is pending, a background task polls the app's status
//! every interval so a stuck app shows up in the logs. It is a liveness
//! probe, never a timeout: the invocation itself is left alone.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tether_runtime::Transport;
use tokio::task::JoinHandle;

use super::Client;
use super::dispatch::dispatch;
use crate::actions::CurrentStatus;

/// Handle to a running status-poll task. Dropping it cancels the task.
pub(crate) struct Watchdog {
	handle: JoinHandle<()>,
	/// Identifies the arming that started this task.
	generation: u64,
}

impl Watchdog {
	pub(crate) fn spawn(transport: Arc<dyn Transport>, interval: Duration, generation: u64) -> Self {
		let handle = tokio::spawn(async move {
			loop {
				tokio::time::sleep(interval).await;

				if !transport.is_open() {
					tracing::debug!("Channel closed, watchdog stops polling");
					break;
				}

				// Status queries are always safe to interleave with a pending invocation.
				if let Err(e) = dispatch(transport.as_ref(), &CurrentStatus).await {
					tracing::warn!("Status poll failed: {}", e);
				}
			}
		});
		Self { handle, generation }
	}

	#[cfg(test)]
	pub(crate) fn is_finished(&self) -> bool {
		self.handle.is_finished()
	}
}

impl Drop for Watchdog {
	fn drop(&mut self) {
		self.handle.abort();
	}
}

/// Disarms the watchdog it armed when the arming invocation ends.
///
/// A newer arming that replaced it is left running.
pub(crate) struct ArmedWatchdog<'a> {
	client: &'a Client,
	generation: u64,
}

impl Drop for ArmedWatchdog<'_> {
	fn drop(&mut self) {
		let mut slot = self.client.watchdog.lock();
		if slot.as_ref().is_some_and(|w| w.generation == self.generation) {
			*slot = None;
			tracing::trace!(generation = self.generation, "Watchdog disarmed");
		}
	}
}

impl Client {
	/// Starts the watchdog if an interval is configured.
	///
	/// The returned guard disarms it on drop.
	pub(crate) fn arm_watchdog(&self) -> Option<ArmedWatchdog<'_>> {
		let interval = self.config.slow_invocation_interval()?;
		let generation = self.watchdog_generation.fetch_add(1, Ordering::Relaxed);
		let watchdog = Watchdog::spawn(Arc::clone(&self.transport), interval, generation);
		// Replacing an older handle drops, and so cancels, it.
		*self.watchdog.lock() = Some(watchdog);
		Some(ArmedWatchdog {
			client: self,
			generation,
		})
	}

	/// Cancels whichever watchdog is armed.
	pub(crate) fn disarm_watchdog(&self) {
		if self.watchdog.lock().take().is_some() {
			tracing::trace!("Watchdog disarmed");
		}
	}
}
