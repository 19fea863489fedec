use std::sync::Arc;

use crate::{BoxFuture, RegistrationError};

/// Wake-on-connectivity facility. Each registration requests one trigger for `tag`.
pub trait SyncPlatform
where
	Self: Send + Sync,
{
	fn register<'a>(&'a self, tag: &'a str) -> BoxFuture<'a, Result<(), RegistrationError>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
	Registered,
	Unsupported,
}

pub struct SyncRegistrar {
	platform: Option<Arc<dyn SyncPlatform>>,
	tag: String,
}
impl SyncRegistrar {
	pub fn new(platform: Arc<dyn SyncPlatform>, tag: impl Into<String>) -> Self {
		Self { platform: Some(platform), tag: tag.into() }
	}

	/// A registrar for hosts without a wake-on-connectivity facility.
	pub fn unsupported(tag: impl Into<String>) -> Self {
		Self { platform: None, tag: tag.into() }
	}

	pub fn tag(&self) -> &str {
		&self.tag
	}

	pub fn is_supported(&self) -> bool {
		self.platform.is_some()
	}

	pub async fn try_register(&self) -> Result<Registration, RegistrationError> {
		let Some(platform) = self.platform.as_ref() else {
			return Ok(Registration::Unsupported);
		};

		platform.register(&self.tag).await?;

		Ok(Registration::Registered)
	}

	/// Returns true only when the platform accepted the registration. Never fails.
	pub async fn register(&self) -> bool {
		match self.try_register().await {
			Ok(Registration::Registered) => true,
			Ok(Registration::Unsupported) => false,
			Err(err) => {
				tracing::warn!(error = %err, tag = %self.tag, "Background sync registration failed.");

				false
			},
		}
	}
}
