//! Pending-request diagnostics for [`Client`].

use std::fmt::Write;

use super::Client;
use crate::actions::CurrentStatus;

impl Client {
	/// Logs the requests the app never answered, then forgets them.
	///
	/// Meant to run once when a test times out. Status polls from the
	/// watchdog are left out of the report. Returns the report, or [`None`]
	/// (leaving the in-flight set untouched) when nothing else is pending.
	///
	/// Clearing the bookkeeping also releases anyone still awaiting those
	/// replies with [`Error::ChannelClosed`](tether_runtime::Error::ChannelClosed).
	pub fn dump_pending_requests(&self, test_name: Option<&str>) -> Option<String> {
		let pending: Vec<_> = self
			.transport
			.in_flight()
			.into_iter()
			.filter(|request| request.kind != CurrentStatus::KIND)
			.collect();

		if pending.is_empty() {
			return None;
		}

		let mut dump = String::from("The app has not responded to the network requests below:");
		for request in &pending {
			let _ = write!(dump, "\n  (id = {}) {}: {}", request.id, request.kind, request.params);
		}

		let notice = match test_name {
			Some(name) => format!("That might be the reason why the test \"{name}\" has timed out."),
			None => "Unresponded network requests might result in timeout errors in tests.".to_string(),
		};
		let _ = write!(dump, "\n\n{notice}\n");

		tracing::warn!(event = "PENDING_REQUESTS", "{}", dump);
		self.transport.reset_in_flight();

		Some(dump)
	}
}
