// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Decision hooks.
//!
//! A hook binds one call site to a live value derived from the coordinator.
//! All three decision hooks share [`Hook`]; they differ only in the
//! [`HookSource`] that says how to evaluate and what the placeholder is.
//!
//! A hook recomputes when:
//!
//! 1. [`Hook::render`] is called with a different key, override user id, or
//!    structurally different override attributes;
//! 2. the client becomes ready after the hook was created;
//! 3. a subscribed update fires (configuration or user changes with
//!    `auto_update`, forced variations for experiments, forced decisions for
//!    flags with `auto_update` and no overrides).
//!
//! Asynchronous recomputations are published on a watch channel; await
//! [`Hook::changed`] to observe them.

mod decision;
mod experiment;
mod feature;
mod state;
mod track;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use loom_flags_adapter_core::{DecideOption, UserOverrides};

use crate::client::FlagsCoordinator;
use crate::listener::Disposer;

pub use decision::{DecisionHook, DecisionSource};
pub use experiment::{ExperimentHook, ExperimentSource};
pub use feature::{FeatureHook, FeatureSource, FeatureValue};
pub use state::{Hook, HookState};
pub use track::TrackEventHook;

/// Which hook produced a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
	Experiment,
	Feature,
	Flag,
	Track,
}

impl fmt::Display for HookKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Experiment => "experiment",
			Self::Feature => "feature",
			Self::Flag => "flag",
			Self::Track => "track",
		};
		f.write_str(s)
	}
}

/// Per-hook options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookOptions {
	/// Re-evaluate on configuration and user updates.
	pub auto_update: bool,
	/// Readiness timeout. Falls back to the provider's timeout, then to the
	/// coordinator's default.
	pub timeout: Option<Duration>,
	/// Forwarded to `decide` by flag hooks.
	pub decide_options: Vec<DecideOption>,
}

impl HookOptions {
	pub fn auto_update() -> Self {
		Self {
			auto_update: true,
			..Self::default()
		}
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);
		self
	}

	pub fn with_decide_options(mut self, options: Vec<DecideOption>) -> Self {
		self.decide_options = options;
		self
	}
}

/// How a hook derives its value.
pub trait HookSource: Send + Sync + 'static {
	type Value: Clone + fmt::Debug + Send + Sync + 'static;

	const KIND: HookKind;

	/// The value reported before the first evaluation.
	fn empty(key: &str) -> Self::Value;

	fn evaluate(
		client: &FlagsCoordinator,
		key: &str,
		overrides: &UserOverrides,
		options: &HookOptions,
	) -> Self::Value;

	/// Source-specific subscriptions armed next to the auto-update ones.
	fn extra_subscription(
		_client: &Arc<FlagsCoordinator>,
		_key: &str,
		_overrides: &UserOverrides,
		_options: &HookOptions,
		_on_update: Arc<dyn Fn() + Send + Sync>,
	) -> Option<Disposer> {
		None
	}
}
