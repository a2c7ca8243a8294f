// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use loom_flags_adapter_core::{Decision, UserOverrides};

use super::{Hook, HookKind, HookOptions, HookSource};
use crate::client::FlagsCoordinator;
use crate::listener::Disposer;

/// Decides a flag through the coordinator's `decide`.
#[derive(Debug)]
pub struct DecisionSource;

impl HookSource for DecisionSource {
	type Value = Decision;

	const KIND: HookKind = HookKind::Flag;

	fn empty(key: &str) -> Self::Value {
		Decision::empty(key)
	}

	fn evaluate(
		client: &FlagsCoordinator,
		key: &str,
		overrides: &UserOverrides,
		options: &HookOptions,
	) -> Self::Value {
		client.decide(key, &options.decide_options, overrides)
	}

	/// Ambient forced-decision changes only affect hooks that auto-update and
	/// evaluate for the ambient user.
	fn extra_subscription(
		client: &Arc<FlagsCoordinator>,
		key: &str,
		overrides: &UserOverrides,
		options: &HookOptions,
		on_update: Arc<dyn Fn() + Send + Sync>,
	) -> Option<Disposer> {
		if !options.auto_update || !overrides.is_empty() {
			return None;
		}
		Some(client.forced_decisions().subscribe(key, move || on_update()))
	}
}

pub type DecisionHook = Hook<DecisionSource>;

impl Hook<DecisionSource> {
	pub fn decision(&self) -> Decision {
		self.value()
	}

	/// `(decision, client_ready, did_timeout)`.
	pub fn as_tuple(&self) -> (Decision, bool, bool) {
		let state = self.state();
		(state.value, state.client_ready, state.did_timeout)
	}
}
