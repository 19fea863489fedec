pub mod cache;
pub mod lifecycle;
pub mod routes;
pub mod state;
pub mod worker;

mod error;

pub use error::{Error, Result};

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use tokio::{net::TcpListener, sync::mpsc};
use tracing_subscriber::EnvFilter;

use crate::{
	cache::{ResponseCache, WorkerProbe},
	state::AppState,
	worker::WorkerState,
};
use tether_service::{
	BackoffPolicy, Connectivity, ConnectivityMonitor, FallbackTimer, HeartbeatProbe,
	HttpTransport, LocalSyncManager, OutboxService, SyncRegistrar, Transport,
};
use tether_storage::{db::Db, outbox};

#[derive(Debug, Parser)]
#[command(
	version = tether_cli::VERSION,
	rename_all = "kebab",
	styles = tether_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = tether_config::load(&args.config)?;

	init_tracing(&config)?;

	let http_addr: SocketAddr = config.service.http_bind.parse()?;
	let listener = TcpListener::bind(http_addr).await?;

	tracing::info!(%http_addr, "HTTP server listening.");

	serve(config, listener).await
}

/// Starts the worker and its timers, then serves the gateway on `listener` until it stops.
///
/// The gateway keeps accepting submissions whatever state the worker is in.
pub async fn serve(config: tether_config::Config, listener: TcpListener) -> color_eyre::Result<()> {
	let db = Db::open(&config.storage.sqlite).await?;
	let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.endpoint)?);
	let (wake_tx, wake_rx) = mpsc::unbounded_channel();
	let connectivity = Connectivity::new(true);
	let manager = config
		.sync
		.background_sync
		.then(|| Arc::new(LocalSyncManager::new(connectivity.clone(), wake_tx.clone())));
	let registrar = Arc::new(match manager.clone() {
		Some(manager) => SyncRegistrar::new(manager, config.sync.tag.clone()),
		None => SyncRegistrar::unsupported(config.sync.tag.clone()),
	});
	let cache = Arc::new(ResponseCache::new(
		db.clone(),
		transport.clone(),
		config.cache.name.clone(),
		config.endpoint.heartbeat_path.clone(),
		wake_tx,
	));
	let worker_state = WorkerState {
		db: db.clone(),
		transport: transport.clone(),
		retry: Arc::new(BackoffPolicy::from_config(&config.sync.retry)),
		sync_tag: config.sync.tag.clone(),
		precache: config.cache.precache.clone(),
		cache: cache.clone(),
	};
	let service = Arc::new(OutboxService::new(db.clone(), transport.clone(), registrar.clone()));
	let worker_task = tokio::spawn(worker::run_worker(worker_state, wake_rx));

	tokio::spawn(async move {
		if let Err(err) = worker_task.await {
			tracing::error!(error = %err, "Worker task stopped unexpectedly.");
		}
	});

	let monitor = ConnectivityMonitor::new(
		transport,
		connectivity.clone(),
		manager,
		Duration::from_millis(config.sync.connectivity_poll_ms),
	);
	let probe = Arc::new(WorkerProbe::new(cache.clone()));
	let fallback = FallbackTimer::new(
		registrar.clone(),
		probe.clone(),
		connectivity,
		Duration::from_millis(config.sync.fallback_interval_ms),
	);

	tokio::spawn(monitor.run());
	tokio::spawn(fallback.run());

	let pending = outbox::count(&db).await?;

	if pending > 0 {
		tracing::info!(pending, "Pending outbox entries found at startup.");

		if registrar.is_supported() {
			registrar.register().await;
		} else {
			probe.probe().await;
		}
	}

	let app = routes::router(AppState::new(service, cache));

	axum::serve(listener, app).await?;

	Ok(())
}

fn init_tracing(config: &tether_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	Ok(())
}
