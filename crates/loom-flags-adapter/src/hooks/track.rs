// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use std::time::Duration;

use loom_flags_adapter_core::{InitializationState, UserOverrides};
use tracing::debug;

use super::HookKind;
use crate::client::FlagsCoordinator;
use crate::engine::EventTags;
use crate::init_state::InitializationTracker;

/// Tracks conversion events from a call site and reports initialization
/// state alongside.
pub struct TrackEventHook {
	client: Arc<FlagsCoordinator>,
	tracker: InitializationTracker,
}

impl TrackEventHook {
	pub(crate) fn mount(client: Arc<FlagsCoordinator>, timeout: Option<Duration>, is_server_side: bool) -> Self {
		let tracker = if is_server_side {
			InitializationTracker::ready()
		} else {
			InitializationTracker::new(&client, timeout)
		};
		Self { client, tracker }
	}

	/// Tracks `event_key` for the effective user.
	pub fn track(&self, event_key: &str, overrides: &UserOverrides, event_tags: Option<&EventTags>) {
		debug!(hook = %HookKind::Track, event_key = %event_key, "Tracking event");
		self.client.track(event_key, overrides, event_tags);
	}

	pub fn state(&self) -> InitializationState {
		self.tracker.state()
	}

	pub fn client_ready(&self) -> bool {
		self.tracker.client_ready()
	}

	pub fn did_timeout(&self) -> bool {
		self.tracker.did_timeout()
	}

	/// Waits for the next initialization transition.
	pub async fn changed(&mut self) -> bool {
		self.tracker.changed().await
	}
}
