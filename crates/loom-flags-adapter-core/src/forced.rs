// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Forced decisions.
//!
//! A forced decision pins a flag (optionally a single rule of the flag) to a
//! variation for one user context. [`ForcedDecisionOverlay`] is the in-memory
//! store a context handle keeps them in.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Addresses a forced decision: a flag, optionally narrowed to one rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecisionContext {
	pub flag_key: String,
	#[serde(default)]
	pub rule_key: Option<String>,
}

impl DecisionContext {
	pub fn flag(flag_key: impl Into<String>) -> Self {
		Self {
			flag_key: flag_key.into(),
			rule_key: None,
		}
	}

	pub fn rule(flag_key: impl Into<String>, rule_key: impl Into<String>) -> Self {
		Self {
			flag_key: flag_key.into(),
			rule_key: Some(rule_key.into()),
		}
	}
}

/// The variation a forced decision resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcedDecision {
	pub variation_key: String,
}

impl ForcedDecision {
	pub fn new(variation_key: impl Into<String>) -> Self {
		Self {
			variation_key: variation_key.into(),
		}
	}
}

/// Forced decisions held by a single user context.
#[derive(Debug, Clone, Default)]
pub struct ForcedDecisionOverlay {
	entries: HashMap<DecisionContext, ForcedDecision>,
}

impl ForcedDecisionOverlay {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets or replaces the forced decision for `context`.
	pub fn set(&mut self, context: DecisionContext, decision: ForcedDecision) -> bool {
		if context.flag_key.is_empty() {
			return false;
		}
		self.entries.insert(context, decision);
		true
	}

	pub fn get(&self, context: &DecisionContext) -> Option<&ForcedDecision> {
		self.entries.get(context)
	}

	/// Removes the forced decision for `context`. Returns false if none was set.
	pub fn remove(&mut self, context: &DecisionContext) -> bool {
		self.entries.remove(context).is_some()
	}

	pub fn remove_all(&mut self) -> bool {
		self.entries.clear();
		true
	}

	/// Resolves the forced variation for a flag evaluated under `rule_key`.
	///
	/// A rule-scoped entry wins over a flag-scoped one.
	pub fn resolve(&self, flag_key: &str, rule_key: Option<&str>) -> Option<&ForcedDecision> {
		if let Some(rule_key) = rule_key {
			let scoped = DecisionContext::rule(flag_key, rule_key);
			if let Some(decision) = self.entries.get(&scoped) {
				return Some(decision);
			}
		}
		self.entries.get(&DecisionContext::flag(flag_key))
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
