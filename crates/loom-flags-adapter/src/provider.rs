// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Binds a coordinator and an ambient user to the hooks created from it.

use std::sync::Arc;
use std::time::Duration;

use loom_flags_adapter_core::{are_users_equal, UserIdentity, UserOverrides};
use tracing::{debug, error, warn};

use crate::client::FlagsCoordinator;
use crate::error::{AdapterError, Result};
use crate::hooks::{DecisionHook, ExperimentHook, FeatureHook, Hook, HookOptions, HookSource, TrackEventHook};
use crate::init_state::InitializationTracker;

/// Options for [`FlagsProvider::mount`].
#[derive(Debug, Clone, Default)]
pub struct ProviderOptions {
	/// The user to set on mount. `None` sets the anonymous user.
	pub user: Option<UserIdentity>,
	/// Default readiness timeout for hooks created from this provider.
	pub timeout: Option<Duration>,
	/// Hooks treat the client as ready and evaluate synchronously.
	pub is_server_side: bool,
}

/// Owns the ambient user for a tree of hooks.
pub struct FlagsProvider {
	client: Option<Arc<FlagsCoordinator>>,
	user: UserIdentity,
	timeout: Option<Duration>,
	is_server_side: bool,
}

impl FlagsProvider {
	/// Mounts the provider and starts setting its user on `client`.
	///
	/// The user is only set when it differs from the coordinator's current
	/// user or when no user has resolved readiness yet.
	pub fn mount(client: Option<Arc<FlagsCoordinator>>, options: ProviderOptions) -> Self {
		let user = options.user.unwrap_or_else(UserIdentity::anonymous);
		let provider = Self {
			client,
			user,
			timeout: options.timeout,
			is_server_side: options.is_server_side,
		};

		match &provider.client {
			None => error!("FlagsProvider must be given a flags coordinator"),
			Some(client) => {
				if !are_users_equal(&provider.user, &client.user()) || client.user_ready_pending() {
					spawn_set_user(client, provider.user.clone());
				}
			}
		}
		provider
	}

	/// Replaces the provider's user. A structurally equal user is ignored.
	pub fn update_user(&mut self, user: UserIdentity) {
		if self.is_server_side {
			return;
		}
		let Some(client) = &self.client else {
			error!("Unable to update user because the provider has no flags coordinator");
			return;
		};
		if are_users_equal(&self.user, &user) {
			debug!(user_id = %user.display_id(), "Provider user unchanged");
			return;
		}
		spawn_set_user(client, user.clone());
		self.user = user;
	}

	pub fn client(&self) -> Option<&Arc<FlagsCoordinator>> {
		self.client.as_ref()
	}

	pub fn user(&self) -> &UserIdentity {
		&self.user
	}

	pub fn is_server_side(&self) -> bool {
		self.is_server_side
	}

	fn require_client(&self) -> Result<Arc<FlagsCoordinator>> {
		self.client.clone().ok_or(AdapterError::MissingClient)
	}

	fn mount_hook<S: HookSource>(
		&self,
		key: &str,
		overrides: UserOverrides,
		mut options: HookOptions,
	) -> Result<Hook<S>> {
		let client = self.require_client()?;
		options.timeout = options.timeout.or(self.timeout);
		Ok(Hook::mount(client, key, overrides, options, self.is_server_side))
	}

	/// Binds a call site to an experiment's variation.
	pub fn use_experiment(
		&self,
		experiment_key: &str,
		overrides: UserOverrides,
		options: HookOptions,
	) -> Result<ExperimentHook> {
		self.mount_hook(experiment_key, overrides, options)
	}

	/// Binds a call site to a feature's enabled state and variables.
	pub fn use_feature(&self, feature_key: &str, overrides: UserOverrides, options: HookOptions) -> Result<FeatureHook> {
		self.mount_hook(feature_key, overrides, options)
	}

	/// Binds a call site to a flag decision.
	pub fn use_decision(&self, flag_key: &str, overrides: UserOverrides, options: HookOptions) -> Result<DecisionHook> {
		self.mount_hook(flag_key, overrides, options)
	}

	pub fn use_track_event(&self) -> Result<TrackEventHook> {
		let client = self.require_client()?;
		Ok(TrackEventHook::mount(client, self.timeout, self.is_server_side))
	}

	pub fn use_initialization_state(&self, timeout: Option<Duration>) -> Result<InitializationTracker> {
		let client = self.require_client()?;
		Ok(InitializationTracker::new(&client, timeout.or(self.timeout)))
	}
}

fn spawn_set_user(client: &Arc<FlagsCoordinator>, user: UserIdentity) {
	let pending = client.set_user(user);
	match tokio::runtime::Handle::try_current() {
		Ok(runtime) => {
			runtime.spawn(pending);
		}
		Err(_) => warn!("No Tokio runtime available, user readiness will not resolve"),
	}
}
