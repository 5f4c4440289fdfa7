//! Command-line/environment configuration, merged the way the original collector does: an
//! environment variable overrides whatever the CLI flag produced (including an explicit flag),
//! while the flag alone still supplies the default.

// std
use std::env;
// crates.io
use clap::Parser;
// self
use crate::_prelude::*;

const DEFAULT_REPORT_INTERVAL_SECS: u64 = 10;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
const DEFAULT_STORE_INTERVAL_SECS: u64 = 300;
const DEFAULT_RATE_LIMIT: usize = 5;

/// CLI flags shared by both binaries.
#[derive(Debug, Parser)]
pub struct BaseArgs {
	/// Logging level (trace, debug, info, warn, error).
	#[arg(long = "log_level", default_value = "info")]
	pub log_level: String,
	/// Server address, `host:port`.
	#[arg(short = 'a', long, default_value = "localhost:8080")]
	pub address: String,
	/// HMAC signing key; signing is disabled when empty.
	#[arg(short = 'k', long, default_value = "")]
	pub hash_key: String,
}

/// Fully resolved agent configuration (flags merged with environment overrides).
#[derive(Clone, Debug)]
pub struct AgentConfig {
	/// Logging level.
	pub log_level: String,
	/// Server address the agent reports to.
	pub address: String,
	/// HMAC signing key; signing is disabled when empty.
	pub hash_key: String,
	/// How often accumulated samples are dispatched to the server.
	pub report_interval: Duration,
	/// How often runtime/host stats are sampled.
	pub poll_interval: Duration,
	/// Number of concurrent dispatcher workers.
	pub rate_limit: usize,
}

/// CLI flags specific to the agent binary.
#[derive(Debug, Parser)]
pub struct AgentArgs {
	#[command(flatten)]
	pub base: BaseArgs,
	/// Seconds between sample dispatch cycles.
	#[arg(short = 'r', long, default_value_t = DEFAULT_REPORT_INTERVAL_SECS)]
	pub report_interval: u64,
	/// Seconds between stat sampling cycles.
	#[arg(short = 'p', long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
	pub poll_interval: u64,
	/// Dispatcher worker pool size.
	#[arg(short = 'l', long, default_value_t = DEFAULT_RATE_LIMIT)]
	pub rate_limit: usize,
}
impl AgentConfig {
	/// Parse CLI flags then apply environment overrides, matching the Go agent's precedence.
	pub fn load() -> Self {
		let args = AgentArgs::parse();
		let log_level = env_override("LOG_LEVEL").unwrap_or(args.base.log_level);
		let address = env_override("ADDRESS").unwrap_or(args.base.address);
		let hash_key = env_override("KEY").unwrap_or(args.base.hash_key);
		let report_interval =
			env_override_parsed("REPORT_INTERVAL").unwrap_or(args.report_interval);
		let poll_interval = env_override_parsed("POLL_INTERVAL").unwrap_or(args.poll_interval);
		let rate_limit = env_override_parsed("RATE_LIMIT").unwrap_or(args.rate_limit);
		let rate_limit = if rate_limit == 0 {
			tracing::warn!("rate_limit of 0 would deadlock the dispatcher, forcing 1");

			1
		} else {
			rate_limit
		};

		let config = Self {
			log_level,
			address,
			hash_key,
			report_interval: Duration::from_secs(report_interval),
			poll_interval: Duration::from_secs(poll_interval),
			rate_limit,
		};

		tracing::info!(?config, "resolved agent configuration");

		config
	}
}

/// Fully resolved server configuration (flags merged with environment overrides).
#[derive(Clone, Debug)]
pub struct ServerConfig {
	/// Logging level.
	pub log_level: String,
	/// Address the server binds to.
	pub address: String,
	/// HMAC signing key; signature checking is disabled when empty.
	pub hash_key: String,
	/// Path the file backend persists to.
	pub file_storage_path: String,
	/// Postgres DSN; when set the DB backend is attempted first.
	pub dsn: String,
	/// Periodic flush interval; zero means flush synchronously on every mutation.
	pub store_interval: Duration,
	/// Whether to restore prior state from the backend at startup.
	pub restore: bool,
}

/// CLI flags specific to the server binary.
#[derive(Debug, Parser)]
pub struct ServerArgs {
	#[command(flatten)]
	pub base: BaseArgs,
	/// File backend path.
	#[arg(short = 'f', long = "file_storage_path", default_value = "storage.db")]
	pub file_storage_path: String,
	/// Restore prior state at startup.
	#[arg(short = 'r', long, default_value_t = true)]
	pub restore: bool,
	/// Postgres DSN.
	#[arg(short = 'd', long = "dsn", default_value = "")]
	pub dsn: String,
	/// Periodic flush interval in seconds.
	#[arg(short = 'i', long, default_value_t = DEFAULT_STORE_INTERVAL_SECS)]
	pub store_interval: u64,
}
impl ServerConfig {
	/// Parse CLI flags then apply environment overrides, matching the Go server's precedence.
	pub fn load() -> Self {
		let args = ServerArgs::parse();
		let log_level = env_override("LOG_LEVEL").unwrap_or(args.base.log_level);
		let address = env_override("ADDRESS").unwrap_or(args.base.address);
		let hash_key = env_override("KEY").unwrap_or(args.base.hash_key);
		let file_storage_path =
			env_override("FILE_STORAGE_PATH").unwrap_or(args.file_storage_path);
		let dsn = env_override("DATABASE_DSN").unwrap_or(args.dsn);
		let store_interval = env_override_parsed("STORE_INTERVAL").unwrap_or(args.store_interval);
		let restore = env_override_parsed("RESTORE").unwrap_or(args.restore);

		let config = Self {
			log_level,
			address,
			hash_key,
			file_storage_path,
			dsn,
			store_interval: Duration::from_secs(store_interval),
			restore,
		};

		tracing::info!(?config, "resolved server configuration");

		config
	}

	/// Whether HMAC signing/verification is enabled.
	pub fn has_hash_key(&self) -> bool {
		!self.hash_key.is_empty()
	}
}

fn env_override(name: &str) -> Option<String> {
	env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_override_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
	env_override(name).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn env_override_ignores_empty_values() {
		// SAFETY: test-only, single-threaded access to this well-known key.
		unsafe {
			env::set_var("COLLECTOR_TEST_EMPTY", "");
		}

		assert_eq!(env_override("COLLECTOR_TEST_EMPTY"), None);

		unsafe {
			env::remove_var("COLLECTOR_TEST_EMPTY");
		}
	}

	#[test]
	fn env_override_parsed_rejects_garbage() {
		// SAFETY: test-only, single-threaded access to this well-known key.
		unsafe {
			env::set_var("COLLECTOR_TEST_INT", "not-a-number");
		}

		assert_eq!(env_override_parsed::<u64>("COLLECTOR_TEST_INT"), None);

		unsafe {
			env::remove_var("COLLECTOR_TEST_INT");
		}
	}
}
