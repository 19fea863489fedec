mod error;

pub use error::{Error, Result};

use std::{sync::Arc, time::Duration};

use reqwest::{
	Client, Url,
	cookie::Jar,
	header::{CONTENT_TYPE, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

/// Response captured from a read request, whatever its status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedResponse {
	pub status: u16,
	pub content_type: Option<String>,
	pub body: Vec<u8>,
}
impl FetchedResponse {
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Client bound to one origin. Clones share the connection pool and cookie jar, so the
/// interceptor and the worker send the same credentials.
#[derive(Clone, Debug)]
pub struct Endpoint {
	client: Client,
	origin: String,
	submission_path: String,
	heartbeat_path: String,
}
impl Endpoint {
	pub fn new(cfg: &tether_config::Endpoint) -> Result<Self> {
		let origin = Url::parse(&cfg.origin).map_err(|err| Error::InvalidConfig {
			message: format!("endpoint.origin is not a valid URL: {err}."),
		})?;
		let jar = Arc::new(Jar::default());

		for cookie in &cfg.cookies {
			jar.add_cookie_str(cookie, &origin);
		}

		let mut builder = Client::builder()
			.cookie_provider(jar)
			.default_headers(default_headers(&cfg.default_headers)?);

		if let Some(timeout_ms) = cfg.timeout_ms {
			builder = builder.timeout(Duration::from_millis(timeout_ms));
		}

		let client = builder.build().map_err(|err| Error::InvalidConfig {
			message: format!("Failed to build HTTP client: {err}."),
		})?;

		Ok(Self {
			client,
			origin: cfg.origin.trim_end_matches('/').to_string(),
			submission_path: cfg.submission_path.clone(),
			heartbeat_path: cfg.heartbeat_path.clone(),
		})
	}

	pub fn url_for(&self, path: &str) -> String {
		format!("{}{}", self.origin, path)
	}

	/// POSTs `payload` as JSON to the submission endpoint. Any 2xx confirms delivery.
	pub async fn submit(&self, payload: &Value) -> Result<()> {
		let res = self.client.post(self.url_for(&self.submission_path)).json(payload).send().await?;
		let status = res.status();

		if !status.is_success() {
			return Err(Error::Rejected { status: status.as_u16() });
		}

		Ok(())
	}

	/// GETs the heartbeat endpoint. The body is ignored.
	pub async fn heartbeat(&self) -> Result<()> {
		let res = self.client.get(self.url_for(&self.heartbeat_path)).send().await?;
		let status = res.status();

		if !status.is_success() {
			return Err(Error::Rejected { status: status.as_u16() });
		}

		Ok(())
	}

	/// GETs `path` from the origin. Only a failure to obtain a response is an error.
	pub async fn fetch(&self, path: &str) -> Result<FetchedResponse> {
		let res = self.client.get(self.url_for(path)).send().await?;
		let status = res.status().as_u16();
		let content_type = res
			.headers()
			.get(CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.map(str::to_string);
		let body = res.bytes().await?.to_vec();

		Ok(FetchedResponse { status, content_type, body })
	}
}

pub fn default_headers(headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut map = HeaderMap::new();

	for (key, value) in headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: format!("Default header {key} must be a string."),
			});
		};

		map.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(map)
}
