// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User identity and the structural equality rules that gate recomputation.
//!
//! Two identities are equal when their ids match and their attribute maps hold
//! the same keys mapped to the same values. A missing attribute map is treated
//! the same as an empty one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Attribute map attached to a user. Values are opaque JSON values.
pub type UserAttributes = BTreeMap<String, serde_json::Value>;

/// The identity decisions are evaluated for.
///
/// `id == None` denotes the anonymous user. The engine may later resolve an
/// anonymous user to a persistent visitor id, which is written back into `id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
	pub id: Option<String>,
	#[serde(default)]
	pub attributes: UserAttributes,
}

impl UserIdentity {
	/// The anonymous default identity.
	pub fn anonymous() -> Self {
		Self::default()
	}

	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: Some(id.into()),
			attributes: UserAttributes::new(),
		}
	}

	/// Builds an identity from possibly-missing parts, normalizing to the
	/// anonymous defaults.
	pub fn from_parts(id: Option<String>, attributes: Option<UserAttributes>) -> Self {
		Self {
			id: id.filter(|id| !id.is_empty()),
			attributes: attributes.unwrap_or_default(),
		}
	}

	pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
		self.attributes.insert(key.into(), value);
		self
	}

	pub fn with_attributes(mut self, attributes: UserAttributes) -> Self {
		self.attributes = attributes;
		self
	}

	pub fn is_anonymous(&self) -> bool {
		self.id.is_none()
	}

	/// Returns the id used for log fields.
	pub fn display_id(&self) -> &str {
		self.id.as_deref().unwrap_or("<anonymous>")
	}
}

/// Per-call identity overrides. `None` fields fall back to the ambient user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserOverrides {
	pub user_id: Option<String>,
	pub attributes: Option<UserAttributes>,
}

impl UserOverrides {
	pub fn none() -> Self {
		Self::default()
	}

	pub fn user(user_id: impl Into<String>) -> Self {
		Self {
			user_id: Some(user_id.into()),
			attributes: None,
		}
	}

	pub fn with_attributes(mut self, attributes: UserAttributes) -> Self {
		self.attributes = Some(attributes);
		self
	}

	/// True when neither an id nor any attributes are overridden. An empty
	/// attribute map overrides nothing, matching [`are_attributes_equal`].
	pub fn is_empty(&self) -> bool {
		self.user_id.is_none() && self.attributes.as_ref().map_or(true, |a| a.is_empty())
	}

	/// Applies the overrides on top of `ambient`.
	pub fn resolve(&self, ambient: &UserIdentity) -> UserIdentity {
		UserIdentity {
			id: self.user_id.clone().or_else(|| ambient.id.clone()),
			attributes: self
				.attributes
				.clone()
				.unwrap_or_else(|| ambient.attributes.clone()),
		}
	}
}

/// Returns true when both users have the same id and structurally equal attributes.
pub fn are_users_equal(a: &UserIdentity, b: &UserIdentity) -> bool {
	a.id == b.id && are_attributes_equal(Some(&a.attributes), Some(&b.attributes))
}

/// Compares two optional attribute maps by keys and values.
///
/// `None` and an empty map are equivalent.
pub fn are_attributes_equal(a: Option<&UserAttributes>, b: Option<&UserAttributes>) -> bool {
	let a_len = a.map_or(0, |m| m.len());
	let b_len = b.map_or(0, |m| m.len());
	if a_len != b_len {
		return false;
	}
	match (a, b) {
		(Some(a), Some(b)) => a.iter().all(|(key, value)| b.get(key) == Some(value)),
		// Lengths already matched, so the present side is empty.
		_ => true,
	}
}


#[cfg(test)]
mod proptests {
	use super::*;
	use proptest::prelude::*;

	fn arb_attributes() -> impl Strategy<Value = UserAttributes> {
		prop::collection::btree_map(
			"[a-z]{1,8}",
			prop_oneof![
				any::<bool>().prop_map(serde_json::Value::from),
				any::<i64>().prop_map(serde_json::Value::from),
				"[a-z]{0,8}".prop_map(serde_json::Value::from),
			],
			0..6,
		)
	}

	proptest! {
		#[test]
		fn attribute_equality_is_reflexive(a in arb_attributes()) {
			let copy = a.clone();
			prop_assert!(are_attributes_equal(Some(&a), Some(&copy)));
		}

		#[test]
		fn attribute_equality_is_symmetric(a in arb_attributes(), b in arb_attributes()) {
			prop_assert_eq!(
				are_attributes_equal(Some(&a), Some(&b)),
				are_attributes_equal(Some(&b), Some(&a))
			);
		}

		#[test]
		fn attribute_equality_matches_map_equality(a in arb_attributes(), b in arb_attributes()) {
			prop_assert_eq!(are_attributes_equal(Some(&a), Some(&b)), a == b);
		}

		#[test]
		fn user_equality_requires_same_id(
			id_a in prop::option::of("[a-z]{1,6}"),
			id_b in prop::option::of("[a-z]{1,6}"),
			attributes in arb_attributes(),
		) {
			let a = UserIdentity { id: id_a.clone(), attributes: attributes.clone() };
			let b = UserIdentity { id: id_b.clone(), attributes };
			prop_assert_eq!(are_users_equal(&a, &b), id_a == id_b);
		}
	}
}
