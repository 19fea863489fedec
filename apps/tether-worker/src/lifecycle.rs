use tether_service::WakeEvent;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
	Installing,
	Idle,
	Draining,
	/// Installation failed. Matching wake events retry it instead of draining.
	Redundant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
	Installed,
	InstallFailed,
	Woken(WakeEvent),
	DrainFinished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
	Install,
	Drain,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
	pub phase: Phase,
	pub command: Option<Command>,
}
impl Transition {
	fn stay(phase: Phase) -> Self {
		Self { phase, command: None }
	}
}

/// Pure lifecycle step. Events that do not apply to the current phase leave it unchanged.
pub fn transition(phase: Phase, event: &LifecycleEvent, sync_tag: &str) -> Transition {
	match (phase, event) {
		(Phase::Installing, LifecycleEvent::Installed) => Transition::stay(Phase::Idle),
		(Phase::Installing, LifecycleEvent::InstallFailed) => Transition::stay(Phase::Redundant),
		(Phase::Idle, LifecycleEvent::Woken(WakeEvent::Sync { tag })) if tag == sync_tag =>
			Transition { phase: Phase::Draining, command: Some(Command::Drain) },
		(Phase::Idle, LifecycleEvent::Woken(WakeEvent::Probe)) =>
			Transition { phase: Phase::Draining, command: Some(Command::Drain) },
		(Phase::Redundant, LifecycleEvent::Woken(WakeEvent::Sync { tag })) if tag == sync_tag =>
			Transition { phase: Phase::Installing, command: Some(Command::Install) },
		(Phase::Redundant, LifecycleEvent::Woken(WakeEvent::Probe)) =>
			Transition { phase: Phase::Installing, command: Some(Command::Install) },
		(Phase::Draining, LifecycleEvent::DrainFinished) => Transition::stay(Phase::Idle),
		(phase, _) => Transition::stay(phase),
	}
}
