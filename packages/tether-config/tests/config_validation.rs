use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use tether_config::Config;

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let mut table = root.as_table_mut().expect("Template config must be a table.");

	for part in section.split('.') {
		table = table
			.get_mut(part)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Template config must include [{section}]."));
	}

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("tether_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_payload(payload: String) -> tether_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = tether_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse test config.")
}

#[test]
fn sample_config_loads_and_normalizes_origin() {
	let cfg = load_payload(SAMPLE_CONFIG_TEMPLATE_TOML.to_string())
		.expect("Expected sample config to load.");

	assert_eq!(cfg.endpoint.origin, "http://127.0.0.1:8000");
	assert_eq!(cfg.endpoint.submission_path, "/api/offline-sync/");
	assert_eq!(cfg.sync.tag, "tether-sync-outbox");
	assert_eq!(cfg.cache.precache.len(), 3);
	assert!(cfg.sync.retry.max_attempts.is_none());
}

#[test]
fn omitted_sections_fall_back_to_defaults() {
	let payload = r#"
[service]
http_bind = "127.0.0.1:8787"
log_level = "debug"

[storage.sqlite]
path = "outbox.db"

[endpoint]
origin = "https://app.example.com"
"#;
	let cfg = load_payload(payload.to_string()).expect("Expected minimal config to load.");

	assert_eq!(cfg.storage.sqlite.pool_max_conns, 4);
	assert_eq!(cfg.endpoint.heartbeat_path, "/api/offline-sync/heartbeat");
	assert_eq!(cfg.endpoint.timeout_ms, None);
	assert_eq!(cfg.sync.fallback_interval_ms, 60_000);
	assert!(cfg.sync.background_sync);
	assert_eq!(cfg.cache.name, "tether-static-v1");
}

#[test]
fn blank_cookies_are_dropped() {
	let payload = sample_toml_with(
		"endpoint",
		"cookies",
		Value::Array(vec![Value::String("  ".to_string()), Value::String("a=b".to_string())]),
	);
	let cfg = load_payload(payload).expect("Expected config to load.");

	assert_eq!(cfg.endpoint.cookies, vec!["a=b".to_string()]);
}

#[test]
fn origin_requires_http_scheme() {
	let payload =
		sample_toml_with("endpoint", "origin", Value::String("ftp://example.com".to_string()));
	let err = load_payload(payload).expect_err("Expected origin validation error.");

	assert!(
		err.to_string().contains("endpoint.origin must start with http:// or https://."),
		"Unexpected error: {err}"
	);
}

#[test]
fn submission_path_must_be_absolute() {
	let payload = sample_toml_with(
		"endpoint",
		"submission_path",
		Value::String("api/offline-sync/".to_string()),
	);
	let err = load_payload(payload).expect_err("Expected submission path validation error.");

	assert!(
		err.to_string().contains("endpoint.submission_path must start with '/'."),
		"Unexpected error: {err}"
	);
}

#[test]
fn sync_tag_must_be_non_empty() {
	let payload = sample_toml_with("sync", "tag", Value::String("   ".to_string()));
	let err = load_payload(payload).expect_err("Expected tag validation error.");

	assert!(err.to_string().contains("sync.tag must be non-empty."), "Unexpected error: {err}");
}

#[test]
fn fallback_interval_must_be_positive() {
	let mut cfg = base_config();

	cfg.sync.fallback_interval_ms = 0;

	let err = tether_config::validate(&cfg).expect_err("Expected interval validation error.");

	assert!(
		err.to_string().contains("sync.fallback_interval_ms must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn retry_bounds_are_checked() {
	let mut cfg = base_config();

	cfg.sync.retry.max_attempts = Some(0);

	let err = tether_config::validate(&cfg).expect_err("Expected max_attempts validation error.");

	assert!(
		err.to_string().contains("sync.retry.max_attempts must be greater than zero when set."),
		"Unexpected error: {err}"
	);

	cfg.sync.retry.max_attempts = Some(5);
	cfg.sync.retry.base_backoff_ms = 1_000;
	cfg.sync.retry.max_backoff_ms = 500;

	let err = tether_config::validate(&cfg).expect_err("Expected backoff validation error.");

	assert!(
		err.to_string().contains("sync.retry.max_backoff_ms must be at least"),
		"Unexpected error: {err}"
	);

	cfg.sync.retry.max_backoff_ms = 30_000;

	assert!(tether_config::validate(&cfg).is_ok());
}

#[test]
fn backoff_values_are_capped() {
	let mut cfg = base_config();

	cfg.sync.retry.base_backoff_ms = 1_000_000_000_000_000;
	cfg.sync.retry.max_backoff_ms = 1_000_000_000_000_000;

	let err = tether_config::validate(&cfg).expect_err("Expected backoff cap validation error.");

	assert!(
		err.to_string().contains("sync.retry.max_backoff_ms must be at most"),
		"Unexpected error: {err}"
	);

	cfg.sync.retry.base_backoff_ms = tether_config::MAX_BACKOFF_MS;
	cfg.sync.retry.max_backoff_ms = tether_config::MAX_BACKOFF_MS;

	assert!(tether_config::validate(&cfg).is_ok());
}

#[test]
fn precache_paths_must_be_absolute() {
	let mut cfg = base_config();

	cfg.cache.precache.push("static/app.js".to_string());

	let err = tether_config::validate(&cfg).expect_err("Expected precache validation error.");

	assert!(err.to_string().contains("cache.precache entry"), "Unexpected error: {err}");
}

#[test]
fn default_header_values_must_be_strings() {
	let mut cfg = base_config();

	cfg.endpoint.default_headers.insert("X-Retry".to_string(), serde_json::json!(3));

	let err = tether_config::validate(&cfg).expect_err("Expected header validation error.");

	assert!(
		err.to_string().contains("endpoint.default_headers.X-Retry must be a string."),
		"Unexpected error: {err}"
	);
}

#[test]
fn missing_file_reports_path() {
	let path = env::temp_dir().join("tether_config_missing_file.toml");
	let err = tether_config::load(&path).expect_err("Expected read error.");

	assert!(err.to_string().contains("Failed to read config file"), "Unexpected error: {err}");
}
