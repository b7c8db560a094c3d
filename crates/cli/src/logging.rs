use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Default filter for a `-v` count. `RUST_LOG` replaces it entirely.
pub fn default_filter(verbosity: u8) -> &'static str {
	// 0: warnings, including console errors from the page and unmatched mocks
	// 1 (-v): scenario progress
	// 2+ (-vv): driver traffic and per-step detail
	match verbosity {
		0 => "warn",
		1 => "info,smoke_runtime=warn",
		_ => "debug",
	}
}

pub fn init_logging(verbosity: u8) {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(verbosity > 1)
		.with_level(true)
		.compact()
		.init();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn filters_parse() {
		for verbosity in 0..4 {
			assert!(EnvFilter::try_new(default_filter(verbosity)).is_ok(), "{verbosity}");
		}
		assert_eq!(default_filter(7), "debug");
	}
}
