// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use loom_flags_adapter_core::{DecisionVariables, UserOverrides};

use super::{Hook, HookKind, HookOptions, HookSource};
use crate::client::FlagsCoordinator;

/// Whether a feature is enabled, plus its variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureValue {
	pub enabled: bool,
	pub variables: DecisionVariables,
}

#[derive(Debug)]
pub struct FeatureSource;

impl HookSource for FeatureSource {
	type Value = FeatureValue;

	const KIND: HookKind = HookKind::Feature;

	fn empty(_key: &str) -> Self::Value {
		FeatureValue::default()
	}

	fn evaluate(
		client: &FlagsCoordinator,
		key: &str,
		overrides: &UserOverrides,
		_options: &HookOptions,
	) -> Self::Value {
		FeatureValue {
			enabled: client.is_feature_enabled(key, overrides),
			variables: client.get_feature_variables(key, overrides),
		}
	}
}

pub type FeatureHook = Hook<FeatureSource>;

impl Hook<FeatureSource> {
	pub fn is_enabled(&self) -> bool {
		self.state().value.enabled
	}

	pub fn variables(&self) -> DecisionVariables {
		self.state().value.variables
	}

	/// `(enabled, variables, client_ready, did_timeout)`.
	pub fn as_tuple(&self) -> (bool, DecisionVariables, bool, bool) {
		let state = self.state();
		(
			state.value.enabled,
			state.value.variables,
			state.client_ready,
			state.did_timeout,
		)
	}
}
