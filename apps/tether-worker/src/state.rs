use std::sync::Arc;

use tether_service::OutboxService;

use crate::cache::ResponseCache;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<OutboxService>,
	pub cache: Arc<ResponseCache>,
}
impl AppState {
	pub fn new(service: Arc<OutboxService>, cache: Arc<ResponseCache>) -> Self {
		Self { service, cache }
	}
}
