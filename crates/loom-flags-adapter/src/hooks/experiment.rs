// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use loom_flags_adapter_core::UserOverrides;

use super::{Hook, HookKind, HookOptions, HookSource};
use crate::client::FlagsCoordinator;
use crate::listener::Disposer;

/// Activates an experiment and reports the variation key.
#[derive(Debug)]
pub struct ExperimentSource;

impl HookSource for ExperimentSource {
	type Value = Option<String>;

	const KIND: HookKind = HookKind::Experiment;

	fn empty(_key: &str) -> Self::Value {
		None
	}

	fn evaluate(
		client: &FlagsCoordinator,
		key: &str,
		overrides: &UserOverrides,
		_options: &HookOptions,
	) -> Self::Value {
		client.activate(key, overrides)
	}

	/// Forced variations always re-evaluate experiments.
	fn extra_subscription(
		client: &Arc<FlagsCoordinator>,
		_key: &str,
		_overrides: &UserOverrides,
		_options: &HookOptions,
		on_update: Arc<dyn Fn() + Send + Sync>,
	) -> Option<Disposer> {
		Some(client.on_forced_variations_update(move || on_update()))
	}
}

pub type ExperimentHook = Hook<ExperimentSource>;

impl Hook<ExperimentSource> {
	pub fn variation(&self) -> Option<String> {
		self.value()
	}

	/// `(variation, client_ready, did_timeout)`.
	pub fn as_tuple(&self) -> (Option<String>, bool, bool) {
		let state = self.state();
		(state.value, state.client_ready, state.did_timeout)
	}
}
