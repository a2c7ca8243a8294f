// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Initialization-state tracking.
//!
//! Each tracker races the coordinator's readiness against its own timeout and
//! reports `{client_ready, did_timeout}` transitions:
//!
//! - ready before the timeout: `{true, false}`
//! - timed out: `{false, true}`, then `{true, true}` if readiness later succeeds
//! - settled without success: `{false, false}`
//!
//! A failure of the engine's own readiness is logged and leaves the state
//! where it was.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use loom_flags_adapter_core::{InitializationState, NotReadyReason};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::client::FlagsCoordinator;
use crate::listener::Disposer;

/// Spawns a task that reports initialization transitions to `on_change`.
///
/// Nothing is reported when the client is already ready. Disposing the
/// returned handle cancels the task and suppresses any in-flight report.
pub fn subscribe_to_initialization(
	client: &Arc<FlagsCoordinator>,
	timeout: Option<Duration>,
	on_change: impl Fn(InitializationState) + Send + Sync + 'static,
) -> Disposer {
	if client.is_ready() {
		return Disposer::noop();
	}

	let runtime = match tokio::runtime::Handle::try_current() {
		Ok(runtime) => runtime,
		Err(_) => {
			warn!("No Tokio runtime available, initialization state will not be tracked");
			return Disposer::noop();
		}
	};

	let cancelled = Arc::new(AtomicBool::new(false));
	let report = {
		let cancelled = Arc::clone(&cancelled);
		move |state: InitializationState| {
			if !cancelled.load(Ordering::SeqCst) {
				on_change(state);
			}
		}
	};

	let client = Arc::clone(client);
	let task = runtime.spawn(async move {
		let result = match client.on_ready(timeout).await {
			Ok(result) => result,
			Err(e) => {
				error!(error = %e, "Flags client readiness failed");
				return;
			}
		};

		if result.success {
			info!("Flags client ready");
			report(InitializationState::new(true, false));
			return;
		}

		let did_timeout = result.reason == Some(NotReadyReason::Timeout);
		if did_timeout {
			warn!(message = ?result.message, "Flags client did not become ready before timeout");
		} else {
			info!(reason = ?result.reason, message = ?result.message, "Flags client not ready");
		}
		report(InitializationState::new(false, did_timeout));

		let Some(data_ready) = result.data_ready else {
			return;
		};
		match data_ready.await {
			Ok(late) if late.success => {
				info!("Flags client became ready after timeout");
				report(InitializationState::new(true, did_timeout));
			}
			Ok(late) => {
				debug!(reason = ?late.reason, "Flags client settled without becoming ready");
			}
			Err(e) => {
				error!(error = %e, "Flags client readiness failed after timeout");
			}
		}
	});

	Disposer::new(move || {
		cancelled.store(true, Ordering::SeqCst);
		task.abort();
	})
}

/// Standalone initialization-state query for call sites that do not need a
/// decision.
pub struct InitializationTracker {
	state: watch::Receiver<InitializationState>,
	_subscription: Disposer,
}

impl InitializationTracker {
	pub fn new(client: &Arc<FlagsCoordinator>, timeout: Option<Duration>) -> Self {
		let initial = InitializationState::new(client.is_ready(), false);
		let (tx, rx) = watch::channel(initial);
		let subscription = subscribe_to_initialization(client, timeout, move |state| {
			tx.send_replace(state);
		});
		Self {
			state: rx,
			_subscription: subscription,
		}
	}

	/// Builds a tracker that always reports ready.
	pub(crate) fn ready() -> Self {
		let (_tx, rx) = watch::channel(InitializationState::new(true, false));
		Self {
			state: rx,
			_subscription: Disposer::noop(),
		}
	}

	pub fn state(&self) -> InitializationState {
		*self.state.borrow()
	}

	pub fn client_ready(&self) -> bool {
		self.state().client_ready
	}

	pub fn did_timeout(&self) -> bool {
		self.state().did_timeout
	}

	/// Waits for the next transition. Returns false once no further
	/// transitions can happen.
	pub async fn changed(&mut self) -> bool {
		self.state.changed().await.is_ok()
	}
}
