use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub endpoint: Endpoint,
	#[serde(default)]
	pub sync: SyncOptions,
	#[serde(default)]
	pub cache: Cache,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	pub sqlite: Sqlite,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Sqlite {
	/// Database file backing the outbox. Page and worker contexts must point at the same file.
	pub path: String,
	#[serde(default = "default_pool_max_conns")]
	pub pool_max_conns: u32,
	#[serde(default = "default_busy_timeout_ms")]
	pub busy_timeout_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Endpoint {
	/// Scheme, host and optional port, e.g. "https://app.example.com".
	pub origin: String,
	#[serde(default = "default_submission_path")]
	pub submission_path: String,
	#[serde(default = "default_heartbeat_path")]
	pub heartbeat_path: String,
	/// Optional. Requests wait on the socket's own timeout when unset.
	pub timeout_ms: Option<u64>,
	/// Cookies sent with every request to the origin, e.g. "sessionid=abc".
	#[serde(default)]
	pub cookies: Vec<String>,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
	pub tag: String,
	/// Whether the local wake-on-connectivity facility is offered to the registrar.
	pub background_sync: bool,
	pub fallback_interval_ms: u64,
	pub connectivity_poll_ms: u64,
	pub retry: Retry,
}
impl Default for SyncOptions {
	fn default() -> Self {
		Self {
			tag: "tether-sync-outbox".to_string(),
			background_sync: true,
			fallback_interval_ms: 60_000,
			connectivity_poll_ms: 15_000,
			retry: Retry::default(),
		}
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Retry {
	/// Optional. Entries rejected this many times stay queued but are no longer attempted.
	pub max_attempts: Option<u32>,
	pub base_backoff_ms: u64,
	pub max_backoff_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Cache {
	/// Cache name and version. Rows stored under any other name are purged on activation.
	pub name: String,
	pub precache: Vec<String>,
}
impl Default for Cache {
	fn default() -> Self {
		Self { name: "tether-static-v1".to_string(), precache: vec!["/".to_string()] }
	}
}

fn default_pool_max_conns() -> u32 {
	4
}

fn default_busy_timeout_ms() -> u64 {
	5_000
}

fn default_submission_path() -> String {
	"/api/offline-sync/".to_string()
}

fn default_heartbeat_path() -> String {
	"/api/offline-sync/heartbeat".to_string()
}
