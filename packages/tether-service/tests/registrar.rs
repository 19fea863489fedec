use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use tokio::sync::mpsc;

use tether_service::{
	BoxFuture, Connectivity, ConnectivityMonitor, DeliveryError, FallbackAction, FallbackTimer,
	HeartbeatProbe, LocalSyncManager, Registration, RegistrationError, SyncPlatform,
	SyncRegistrar, Transport, WakeEvent,
};
use tether_transport::FetchedResponse;

const TAG: &str = "tether-sync-outbox";

struct RejectingPlatform;

impl SyncPlatform for RejectingPlatform {
	fn register<'a>(&'a self, _tag: &'a str) -> BoxFuture<'a, Result<(), RegistrationError>> {
		Box::pin(async { Err(RegistrationError::Rejected { message: "Denied.".to_string() }) })
	}
}

struct HeartbeatTransport {
	reachable: bool,
}

impl Transport for HeartbeatTransport {
	fn submit<'a>(&'a self, _payload: &'a serde_json::Value) -> BoxFuture<'a, Result<(), DeliveryError>> {
		Box::pin(async { Ok(()) })
	}

	fn heartbeat<'a>(&'a self) -> BoxFuture<'a, Result<(), DeliveryError>> {
		let reachable = self.reachable;

		Box::pin(async move {
			if reachable {
				Err(DeliveryError::Rejected { status: 404 })
			} else {
				Err(DeliveryError::Transport { message: "Connection refused.".to_string() })
			}
		})
	}

	fn fetch<'a>(&'a self, _path: &'a str) -> BoxFuture<'a, Result<FetchedResponse, DeliveryError>> {
		Box::pin(async { Err(DeliveryError::Transport { message: "Offline.".to_string() }) })
	}
}

#[derive(Default)]
struct CountingProbe {
	calls: AtomicUsize,
}

impl HeartbeatProbe for CountingProbe {
	fn probe<'a>(&'a self) -> BoxFuture<'a, ()> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async {})
	}
}

#[tokio::test]
async fn unsupported_platform_returns_false() {
	let registrar = SyncRegistrar::unsupported(TAG);

	assert!(!registrar.is_supported());
	assert_eq!(registrar.try_register().await, Ok(Registration::Unsupported));
	assert!(!registrar.register().await);
}

#[tokio::test]
async fn rejected_registration_is_swallowed() {
	let registrar = SyncRegistrar::new(Arc::new(RejectingPlatform), TAG);

	assert!(registrar.try_register().await.is_err());
	assert!(!registrar.register().await);
}

#[tokio::test]
async fn local_manager_fires_immediately_when_online() {
	let (tx, mut rx) = mpsc::unbounded_channel();
	let manager = Arc::new(LocalSyncManager::new(Connectivity::new(true), tx));
	let registrar = SyncRegistrar::new(manager.clone(), TAG);

	assert!(registrar.register().await);
	assert_eq!(rx.try_recv(), Ok(WakeEvent::Sync { tag: TAG.to_string() }));
	assert!(manager.pending_tags().is_empty());
}

#[tokio::test]
async fn local_manager_coalesces_until_connectivity_returns() {
	let (tx, mut rx) = mpsc::unbounded_channel();
	let manager = Arc::new(LocalSyncManager::new(Connectivity::new(false), tx));
	let registrar = SyncRegistrar::new(manager.clone(), TAG);

	assert!(registrar.register().await);
	assert!(registrar.register().await);
	assert!(rx.try_recv().is_err());
	assert_eq!(manager.pending_tags(), vec![TAG.to_string()]);
	assert_eq!(manager.set_online(true), Ok(1));
	assert_eq!(rx.try_recv(), Ok(WakeEvent::Sync { tag: TAG.to_string() }));
	assert!(rx.try_recv().is_err());
	assert_eq!(manager.set_online(true), Ok(0));
}

#[tokio::test]
async fn local_manager_rejects_when_worker_is_gone() {
	let (tx, rx) = mpsc::unbounded_channel();
	let manager = Arc::new(LocalSyncManager::new(Connectivity::new(true), tx));

	drop(rx);

	let registrar = SyncRegistrar::new(manager, TAG);

	assert_eq!(registrar.try_register().await, Err(RegistrationError::WorkerUnavailable));
	assert!(!registrar.register().await);
}

#[tokio::test]
async fn monitor_treats_any_response_as_online() {
	let (tx, mut rx) = mpsc::unbounded_channel();
	let connectivity = Connectivity::new(false);
	let manager = Arc::new(LocalSyncManager::new(connectivity.clone(), tx));

	SyncRegistrar::new(manager.clone(), TAG).register().await;

	let monitor = ConnectivityMonitor::new(
		Arc::new(HeartbeatTransport { reachable: true }),
		connectivity.clone(),
		Some(manager),
		Duration::from_secs(60),
	);

	assert!(monitor.check_once().await);
	assert!(connectivity.is_online());
	assert_eq!(rx.try_recv(), Ok(WakeEvent::Sync { tag: TAG.to_string() }));

	let offline = ConnectivityMonitor::new(
		Arc::new(HeartbeatTransport { reachable: false }),
		connectivity.clone(),
		None,
		Duration::from_secs(60),
	);

	assert!(!offline.check_once().await);
	assert!(!connectivity.is_online());
}

#[tokio::test]
async fn fallback_tick_does_nothing_offline() {
	let probe = Arc::new(CountingProbe::default());
	let timer = FallbackTimer::new(
		Arc::new(SyncRegistrar::unsupported(TAG)),
		probe.clone(),
		Connectivity::new(false),
		Duration::from_millis(60_000),
	);

	assert_eq!(timer.tick().await, FallbackAction::Offline);
	assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fallback_tick_probes_without_platform() {
	let probe = Arc::new(CountingProbe::default());
	let timer = FallbackTimer::new(
		Arc::new(SyncRegistrar::unsupported(TAG)),
		probe.clone(),
		Connectivity::new(true),
		Duration::from_millis(60_000),
	);

	assert_eq!(timer.tick().await, FallbackAction::Probed);
	assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fallback_tick_reregisters_with_platform() {
	let (tx, mut rx) = mpsc::unbounded_channel();
	let connectivity = Connectivity::new(true);
	let manager = Arc::new(LocalSyncManager::new(connectivity.clone(), tx));
	let probe = Arc::new(CountingProbe::default());
	let timer = FallbackTimer::new(
		Arc::new(SyncRegistrar::new(manager, TAG)),
		probe.clone(),
		connectivity,
		Duration::from_millis(60_000),
	);

	assert_eq!(timer.tick().await, FallbackAction::Registered(true));
	assert_eq!(rx.try_recv(), Ok(WakeEvent::Sync { tag: TAG.to_string() }));
	assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn fallback_timer_waits_one_interval_before_first_tick() {
	let probe = Arc::new(CountingProbe::default());
	let timer = FallbackTimer::new(
		Arc::new(SyncRegistrar::unsupported(TAG)),
		probe.clone(),
		Connectivity::new(true),
		Duration::from_millis(60_000),
	);
	let handle = tokio::spawn(timer.run());

	tokio::time::sleep(Duration::from_millis(59_000)).await;

	assert_eq!(probe.calls.load(Ordering::SeqCst), 0);

	tokio::time::sleep(Duration::from_millis(62_000)).await;

	assert_eq!(probe.calls.load(Ordering::SeqCst), 2);

	handle.abort();
}
