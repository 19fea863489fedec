mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Cache, Config, Endpoint, Retry, Service, Sqlite, Storage, SyncOptions};

use std::{fs, path::Path};

/// Upper bound for `sync.retry` backoff values: 30 days.
pub const MAX_BACKOFF_MS: u64 = 30 * 24 * 60 * 60 * 1_000;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.log_level", &cfg.service.log_level),
		("storage.sqlite.path", &cfg.storage.sqlite.path),
		("sync.tag", &cfg.sync.tag),
		("cache.name", &cfg.cache.name),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.storage.sqlite.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.sqlite.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if !(cfg.endpoint.origin.starts_with("http://") || cfg.endpoint.origin.starts_with("https://"))
	{
		return Err(Error::Validation {
			message: "endpoint.origin must start with http:// or https://.".to_string(),
		});
	}

	for (label, path) in [
		("endpoint.submission_path", &cfg.endpoint.submission_path),
		("endpoint.heartbeat_path", &cfg.endpoint.heartbeat_path),
	] {
		if !path.starts_with('/') {
			return Err(Error::Validation { message: format!("{label} must start with '/'.") });
		}
	}

	if cfg.endpoint.timeout_ms == Some(0) {
		return Err(Error::Validation {
			message: "endpoint.timeout_ms must be greater than zero when set.".to_string(),
		});
	}

	for (key, value) in &cfg.endpoint.default_headers {
		if !value.is_string() {
			return Err(Error::Validation {
				message: format!("endpoint.default_headers.{key} must be a string."),
			});
		}
	}

	if cfg.sync.fallback_interval_ms == 0 {
		return Err(Error::Validation {
			message: "sync.fallback_interval_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.sync.connectivity_poll_ms == 0 {
		return Err(Error::Validation {
			message: "sync.connectivity_poll_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.sync.retry.max_attempts == Some(0) {
		return Err(Error::Validation {
			message: "sync.retry.max_attempts must be greater than zero when set.".to_string(),
		});
	}
	if cfg.sync.retry.max_backoff_ms < cfg.sync.retry.base_backoff_ms {
		return Err(Error::Validation {
			message: "sync.retry.max_backoff_ms must be at least sync.retry.base_backoff_ms."
				.to_string(),
		});
	}

	if cfg.sync.retry.max_backoff_ms > MAX_BACKOFF_MS {
		return Err(Error::Validation {
			message: format!("sync.retry.max_backoff_ms must be at most {MAX_BACKOFF_MS}."),
		});
	}

	for path in &cfg.cache.precache {
		if !path.starts_with('/') {
			return Err(Error::Validation {
				message: format!("cache.precache entry {path:?} must start with '/'."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let origin = cfg.endpoint.origin.trim().trim_end_matches('/').to_string();

	cfg.endpoint.origin = origin;
	cfg.endpoint.cookies.retain(|cookie| !cookie.trim().is_empty());
	cfg.sync.tag = cfg.sync.tag.trim().to_string();
}
