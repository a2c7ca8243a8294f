// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stand-in notification center used when the engine failed to initialize.

use loom_flags_adapter_core::NotificationType;
use tracing::warn;

use crate::engine::{NotificationCenter, NotificationListener};

/// Logs a warning for every call and returns a harmless default, so callers
/// never need to check whether an engine exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableNotificationCenter;

impl NotificationCenter for UnavailableNotificationCenter {
	fn add_notification_listener(&self, kind: NotificationType, _listener: NotificationListener) -> u64 {
		warn!(
			notification_type = %kind,
			"Unable to add notification listener because the flags client failed to initialize"
		);
		0
	}

	fn remove_notification_listener(&self, listener_id: u64) -> bool {
		warn!(
			listener_id,
			"Unable to remove notification listener because the flags client failed to initialize"
		);
		false
	}

	fn clear_notification_listeners(&self, kind: NotificationType) {
		warn!(
			notification_type = %kind,
			"Unable to clear notification listeners because the flags client failed to initialize"
		);
	}

	fn clear_all_notification_listeners(&self) {
		warn!("Unable to clear all notification listeners because the flags client failed to initialize");
	}
}
