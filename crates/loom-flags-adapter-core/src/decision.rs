// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Decision shapes.
//!
//! The engine hands back a [`RawDecision`]; the adapter normalizes it into a
//! [`Decision`] that also records the identity the decision was computed for.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::user::UserIdentity;

/// Variables resolved for a flag, keyed by variable key.
pub type DecisionVariables = BTreeMap<String, serde_json::Value>;

/// Reason attached to the placeholder decision a hook returns before the
/// client has produced a real one.
pub const NOT_READY_REASON: &str = "Flags SDK not configured properly yet.";

/// Options forwarded to the engine's `decide` family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecideOption {
	DisableDecisionEvent,
	EnabledFlagsOnly,
	IgnoreUserProfileService,
	IncludeReasons,
	ExcludeVariables,
}

/// A decision exactly as the engine's context handle returns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDecision {
	pub flag_key: String,
	pub enabled: bool,
	pub rule_key: Option<String>,
	pub variation_key: Option<String>,
	#[serde(default)]
	pub variables: DecisionVariables,
	#[serde(default)]
	pub reasons: Vec<String>,
}

/// A normalized decision.
///
/// `user_context` is the identity that was actually used, which may be an
/// override rather than the adapter's ambient user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
	pub enabled: bool,
	pub flag_key: String,
	pub rule_key: Option<String>,
	pub variation_key: Option<String>,
	pub variables: DecisionVariables,
	pub reasons: Vec<String>,
	pub user_context: UserIdentity,
}

impl Decision {
	/// Normalizes an engine decision, stamping the identity it was computed for.
	pub fn from_raw(raw: RawDecision, user: &UserIdentity) -> Self {
		Self {
			enabled: raw.enabled,
			flag_key: raw.flag_key,
			rule_key: raw.rule_key,
			variation_key: raw.variation_key,
			variables: raw.variables,
			reasons: raw.reasons,
			user_context: user.clone(),
		}
	}

	/// A synthetic decision for error paths, carrying a single reason.
	pub fn failed(flag_key: impl Into<String>, message: impl Into<String>, user: &UserIdentity) -> Self {
		Self {
			enabled: false,
			flag_key: flag_key.into(),
			rule_key: None,
			variation_key: None,
			variables: DecisionVariables::new(),
			reasons: vec![message.into()],
			user_context: user.clone(),
		}
	}

	/// The placeholder returned before the first evaluation.
	pub fn empty(flag_key: impl Into<String>) -> Self {
		Self::failed(flag_key, NOT_READY_REASON, &UserIdentity::anonymous())
	}
}

/// Normalizes a keyed batch of engine decisions.
pub fn adapt_decisions(
	raw: impl IntoIterator<Item = (String, RawDecision)>,
	user: &UserIdentity,
) -> BTreeMap<String, Decision> {
	raw
		.into_iter()
		.map(|(key, decision)| (key, Decision::from_raw(decision, user)))
		.collect()
}
