// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wires a hook's recompute callback to configuration and user changes.

use std::sync::Arc;

use loom_flags_adapter_core::NotificationType;
use tracing::info;

use crate::client::FlagsCoordinator;
use crate::hooks::HookKind;
use crate::listener::Disposer;

/// Registers `on_update` for engine configuration updates and for user
/// changes on `client`. The returned disposer removes both registrations.
pub fn setup_auto_update_listeners(
	client: &Arc<FlagsCoordinator>,
	kind: HookKind,
	key: &str,
	on_update: Arc<dyn Fn() + Send + Sync>,
) -> Disposer {
	let center = client.notification_center();

	let config_key = key.to_string();
	let config_update = Arc::clone(&on_update);
	let listener_id = center.add_notification_listener(
		NotificationType::ConfigUpdate,
		Arc::new(move |_payload| {
			info!(hook = %kind, key = %config_key, "Configuration updated, re-evaluating");
			config_update();
		}),
	);

	let user_key = key.to_string();
	let mut user_subscription = client.on_user_update(move |user| {
		info!(
			hook = %kind,
			key = %user_key,
			user_id = %user.display_id(),
			"User updated, re-evaluating"
		);
		on_update();
	});

	Disposer::new(move || {
		if listener_id != 0 {
			center.remove_notification_listener(listener_id);
		}
		user_subscription.dispose();
	})
}
