use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs a compact stderr subscriber for test-runner processes.
///
/// `RUST_LOG` overrides the verbosity-derived filter. Calling this more than
/// once is harmless; only the first subscriber is installed.
pub fn init_logging(verbosity: u8) {
	// 0 = warnings only (pending-request dumps, unexpected frames)
	// 1 (-v) = info for tether (app status polls), warn for the transport
	// 2+ (-vv) = debug/trace for everything, including raw frames
	let filter = match verbosity {
		0 => "warn",
		1 => "info,tether_runtime=warn",
		_ => "trace",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	let _ = tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.try_init();
}
