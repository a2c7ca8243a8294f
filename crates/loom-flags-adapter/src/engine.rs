// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Capabilities the wrapped flag-evaluation engine must provide.
//!
//! The adapter never evaluates flags itself. Bucketing, datafile handling and
//! network transport all live behind these traits.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use loom_flags_adapter_core::{
	ConfigSnapshot, DecideOption, DecisionContext, DecisionVariables, ForcedDecision,
	NotificationType, OdpEvent, RawDecision, SegmentOption, UserAttributes,
};

use crate::error::EngineError;

/// Tags attached to a tracked conversion event.
pub type EventTags = BTreeMap<String, serde_json::Value>;

/// Callback registered with a [`NotificationCenter`]. Receives the engine's payload.
pub type NotificationListener = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;

/// Handle to a user context owned by the engine.
pub type SharedUserContext = Arc<dyn UserContextHandle>;

/// Settled status of an engine lifecycle call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
	pub success: bool,
	pub reason: Option<String>,
}

impl EngineStatus {
	pub fn ok() -> Self {
		Self {
			success: true,
			reason: None,
		}
	}

	pub fn failed(reason: impl Into<String>) -> Self {
		Self {
			success: false,
			reason: Some(reason.into()),
		}
	}
}

/// Registration point for engine notifications.
///
/// Listener ids are non-zero; `0` means the listener was not registered.
pub trait NotificationCenter: Send + Sync {
	fn add_notification_listener(&self, kind: NotificationType, listener: NotificationListener) -> u64;

	fn remove_notification_listener(&self, listener_id: u64) -> bool;

	fn clear_notification_listeners(&self, kind: NotificationType);

	fn clear_all_notification_listeners(&self);
}

/// An engine-side object binding one user identity to decision calls.
///
/// Forced decisions set on a handle apply to every later `decide` made through
/// the same handle until removed.
#[async_trait]
pub trait UserContextHandle: Send + Sync {
	fn user_id(&self) -> Option<String>;

	fn attributes(&self) -> UserAttributes;

	fn decide(&self, key: &str, options: &[DecideOption]) -> RawDecision;

	fn decide_all(&self, options: &[DecideOption]) -> BTreeMap<String, RawDecision>;

	fn decide_for_keys(&self, keys: &[String], options: &[DecideOption]) -> BTreeMap<String, RawDecision>;

	/// Fetches audience segments for this user. Returns false on failure.
	async fn fetch_qualified_segments(&self, options: &[SegmentOption]) -> bool;

	fn set_forced_decision(&self, context: &DecisionContext, decision: &ForcedDecision) -> bool;

	fn get_forced_decision(&self, context: &DecisionContext) -> Option<ForcedDecision>;

	fn remove_forced_decision(&self, context: &DecisionContext) -> bool;

	fn remove_all_forced_decisions(&self) -> bool;
}

/// The flag-evaluation engine.
#[async_trait]
pub trait FlagsEngine: Send + Sync + 'static {
	/// Creates a context handle. `None` for the user id lets the engine assign
	/// a persistent visitor id when it can.
	fn create_user_context(
		&self,
		user_id: Option<&str>,
		attributes: &UserAttributes,
	) -> Option<SharedUserContext>;

	/// Resolves once the engine has a usable configuration.
	async fn on_ready(&self) -> Result<EngineStatus, EngineError>;

	fn activate(&self, experiment_key: &str, user_id: &str, attributes: &UserAttributes) -> Option<String>;

	fn get_variation(
		&self,
		experiment_key: &str,
		user_id: &str,
		attributes: &UserAttributes,
	) -> Option<String>;

	fn is_feature_enabled(&self, feature_key: &str, user_id: &str, attributes: &UserAttributes) -> bool;

	fn get_feature_variable(
		&self,
		feature_key: &str,
		variable_key: &str,
		user_id: &str,
		attributes: &UserAttributes,
	) -> Option<serde_json::Value>;

	fn get_all_feature_variables(
		&self,
		feature_key: &str,
		user_id: &str,
		attributes: &UserAttributes,
	) -> Option<DecisionVariables>;

	fn get_enabled_features(&self, user_id: &str, attributes: &UserAttributes) -> Vec<String>;

	fn track(
		&self,
		event_key: &str,
		user_id: &str,
		attributes: &UserAttributes,
		event_tags: Option<&EventTags>,
	);

	fn set_forced_variation(&self, experiment_key: &str, user_id: &str, variation_key: Option<&str>) -> bool;

	fn get_forced_variation(&self, experiment_key: &str, user_id: &str) -> Option<String>;

	/// Snapshot of the active configuration, if one is loaded.
	fn config(&self) -> Option<ConfigSnapshot>;

	fn is_odp_integrated(&self) -> bool;

	/// The engine-managed anonymous visitor id, if any.
	fn vuid(&self) -> Option<String>;

	fn send_odp_event(&self, event: OdpEvent);

	async fn close(&self) -> Result<EngineStatus, EngineError>;

	fn notification_center(&self) -> Arc<dyn NotificationCenter>;
}
