mod error;

pub use error::{Error, Result};

use std::{
	collections::{HashMap, VecDeque},
	future::IntoFuture,
	net::TcpListener as StdTcpListener,
	sync::{
		Arc, Mutex,
		atomic::{AtomicU16, AtomicUsize, Ordering},
	},
};

use axum::{
	Json, Router,
	body::Bytes,
	extract::State,
	http::{HeaderMap, Method, StatusCode, Uri, header},
	response::{IntoResponse, Response},
	routing,
};
use serde_json::{Map, Value};
use tempfile::TempDir;
use tokio::{net::TcpListener, sync::oneshot};

pub const SUBMISSION_PATH: &str = "/api/offline-sync/";
pub const HEARTBEAT_PATH: &str = "/api/offline-sync/heartbeat";

/// SQLite store in a private temporary directory, removed on drop.
pub struct TestStore {
	_dir: TempDir,
	cfg: tether_config::Sqlite,
}
impl TestStore {
	pub fn new() -> Result<Self> {
		let dir = tempfile::tempdir()?;
		let path = dir.path().join("outbox.db");
		let cfg = tether_config::Sqlite {
			path: path.to_string_lossy().into_owned(),
			pool_max_conns: 4,
			busy_timeout_ms: 5_000,
		};

		Ok(Self { _dir: dir, cfg })
	}

	pub fn config(&self) -> &tether_config::Sqlite {
		&self.cfg
	}
}

#[derive(Default)]
struct MockState {
	received: Mutex<Vec<Value>>,
	cookies: Mutex<Vec<Option<String>>>,
	scripted: Mutex<VecDeque<u16>>,
	default_status: AtomicU16,
	heartbeats: AtomicUsize,
	asset_hits: AtomicUsize,
	assets: Mutex<HashMap<String, (String, Vec<u8>)>>,
}

/// HTTP origin double serving the submission, heartbeat and static asset routes.
pub struct MockOrigin {
	base_url: String,
	state: Arc<MockState>,
	shutdown: Option<oneshot::Sender<()>>,
}
impl MockOrigin {
	pub async fn start() -> Result<Self> {
		let state = Arc::new(MockState::default());

		state.default_status.store(200, Ordering::SeqCst);

		let app = Router::new()
			.route(SUBMISSION_PATH, routing::post(submit_handler))
			.route(HEARTBEAT_PATH, routing::get(heartbeat_handler))
			.fallback(asset_handler)
			.with_state(state.clone());
		let listener = TcpListener::bind("127.0.0.1:0").await?;
		let addr = listener.local_addr()?;
		let (tx, rx) = oneshot::channel();
		let server = axum::serve(listener, app).with_graceful_shutdown(async move {
			let _ = rx.await;
		});

		tokio::spawn(async move {
			let _ = server.into_future().await;
		});

		Ok(Self { base_url: format!("http://{addr}"), state, shutdown: Some(tx) })
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	/// Endpoint settings pointing at this origin with the default paths.
	pub fn endpoint_config(&self) -> tether_config::Endpoint {
		endpoint_config(&self.base_url)
	}

	/// Status returned once no scripted status remains.
	pub fn set_default_status(&self, status: u16) {
		self.state.default_status.store(status, Ordering::SeqCst);
	}

	/// Statuses returned by the next submissions, in order.
	pub fn push_statuses(&self, statuses: impl IntoIterator<Item = u16>) {
		lock(&self.state.scripted).extend(statuses);
	}

	/// Serves `body` for GETs of `path`. A path with a query string only matches that exact query.
	pub fn add_asset(&self, path: &str, content_type: &str, body: impl Into<Vec<u8>>) {
		lock(&self.state.assets).insert(path.to_string(), (content_type.to_string(), body.into()));
	}

	pub fn received(&self) -> Vec<Value> {
		lock(&self.state.received).clone()
	}

	pub fn received_cookies(&self) -> Vec<Option<String>> {
		lock(&self.state.cookies).clone()
	}

	pub fn heartbeat_count(&self) -> usize {
		self.state.heartbeats.load(Ordering::SeqCst)
	}

	pub fn asset_hits(&self) -> usize {
		self.state.asset_hits.load(Ordering::SeqCst)
	}

	pub fn shutdown(mut self) {
		if let Some(tx) = self.shutdown.take() {
			let _ = tx.send(());
		}
	}
}
impl Drop for MockOrigin {
	fn drop(&mut self) {
		if let Some(tx) = self.shutdown.take() {
			let _ = tx.send(());
		}
	}
}

pub fn endpoint_config(origin: &str) -> tether_config::Endpoint {
	tether_config::Endpoint {
		origin: origin.to_string(),
		submission_path: SUBMISSION_PATH.to_string(),
		heartbeat_path: HEARTBEAT_PATH.to_string(),
		timeout_ms: Some(5_000),
		cookies: Vec::new(),
		default_headers: Map::new(),
	}
}

/// Origin URL on a port nothing listens on, so every request fails to connect.
pub fn unreachable_origin() -> Result<String> {
	let listener = StdTcpListener::bind("127.0.0.1:0")?;
	let addr = listener.local_addr()?;

	drop(listener);

	Ok(format!("http://{addr}"))
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|err| err.into_inner())
}

async fn submit_handler(
	State(state): State<Arc<MockState>>,
	headers: HeaderMap,
	Json(payload): Json<Value>,
) -> StatusCode {
	let cookie =
		headers.get(header::COOKIE).and_then(|value| value.to_str().ok()).map(str::to_string);

	lock(&state.received).push(payload);
	lock(&state.cookies).push(cookie);

	let status = lock(&state.scripted)
		.pop_front()
		.unwrap_or_else(|| state.default_status.load(Ordering::SeqCst));

	StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn heartbeat_handler(State(state): State<Arc<MockState>>) -> StatusCode {
	state.heartbeats.fetch_add(1, Ordering::SeqCst);

	StatusCode::NO_CONTENT
}

async fn asset_handler(State(state): State<Arc<MockState>>, method: Method, uri: Uri) -> Response {
	if method != Method::GET {
		return StatusCode::METHOD_NOT_ALLOWED.into_response();
	}

	state.asset_hits.fetch_add(1, Ordering::SeqCst);

	let key = uri.path_and_query().map_or_else(|| uri.path(), |target| target.as_str());
	let asset = lock(&state.assets).get(key).cloned();

	match asset {
		Some((content_type, body)) =>
			(StatusCode::OK, [(header::CONTENT_TYPE, content_type)], Bytes::from(body))
				.into_response(),
		None => StatusCode::NOT_FOUND.into_response(),
	}
}
