use axum::{
	Json, Router,
	body::Bytes,
	extract::State,
	http::{HeaderValue, Method, StatusCode, Uri, header},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, cache::FetchOutcome, state::AppState};
use tether_service::SubmitResponse;
use tether_storage::outbox;

pub const SOURCE_HEADER: &str = "x-tether-source";

#[derive(Debug, Serialize, Deserialize)]
pub struct PendingEntry {
	pub outbox_id: i64,
	pub attempts: i64,
	pub last_error: Option<String>,
	/// Unix milliseconds.
	pub created_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PendingResponse {
	pub entries: Vec<PendingEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SyncResponse {
	pub registered: bool,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/outbox/submit", post(submit))
		.route("/v1/outbox/pending", get(pending))
		.route("/v1/outbox/sync", post(sync))
		.fallback(intercept)
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn submit(
	State(state): State<AppState>,
	Json(payload): Json<Value>,
) -> Result<Json<SubmitResponse>, ApiError> {
	let response = state.service.submit(&payload).await?;

	Ok(Json(response))
}

async fn pending(State(state): State<AppState>) -> Result<Json<PendingResponse>, ApiError> {
	let entries = outbox::list_all(&state.service.db)
		.await
		.map_err(tether_service::Error::from)?
		.into_iter()
		.map(|entry| PendingEntry {
			outbox_id: entry.outbox_id,
			attempts: entry.attempts,
			last_error: entry.last_error,
			created_at: entry.created_at.unix_timestamp() * 1_000
				+ i64::from(entry.created_at.millisecond()),
		})
		.collect();

	Ok(Json(PendingResponse { entries }))
}

async fn sync(State(state): State<AppState>) -> Json<SyncResponse> {
	let registered = state.service.registrar.register().await;

	Json(SyncResponse { registered })
}

async fn intercept(
	State(state): State<AppState>,
	method: Method,
	uri: Uri,
) -> Result<Response, ApiError> {
	if method != Method::GET {
		return Err(json_error(
			StatusCode::METHOD_NOT_ALLOWED,
			"method_not_allowed",
			format!("{method} {} is not handled by the worker.", uri.path()),
		));
	}

	let target = uri.path_and_query().map_or_else(|| uri.path(), |target| target.as_str());
	let outcome = state.cache.handle_fetch(target).await?;
	let source = match &outcome {
		FetchOutcome::Network(_) => "network",
		FetchOutcome::Cached(_) => "cache",
	};
	let status = StatusCode::from_u16(outcome.status()).unwrap_or(StatusCode::BAD_GATEWAY);
	let mut response = (status, Bytes::copy_from_slice(outcome.body())).into_response();
	let headers = response.headers_mut();

	if let Some(content_type) =
		outcome.content_type().and_then(|value| HeaderValue::from_str(value).ok())
	{
		headers.insert(header::CONTENT_TYPE, content_type);
	}

	headers.insert(SOURCE_HEADER, HeaderValue::from_static(source));

	Ok(response)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

impl From<tether_service::Error> for ApiError {
	fn from(err: tether_service::Error) -> Self {
		match err {
			tether_service::Error::Persistence(_) => json_error(
				StatusCode::INTERNAL_SERVER_ERROR,
				"persistence_error",
				"The submission could not be stored.",
			),
			other => json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", other.to_string()),
		}
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::Unavailable { path, .. } => json_error(
				StatusCode::SERVICE_UNAVAILABLE,
				"unavailable",
				format!("{path} is unreachable and has no cached copy."),
			),
			other => {
				tracing::error!(error = %other, "Read interception failed.");

				json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", other.to_string())
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError::new(status, code, message)
}
