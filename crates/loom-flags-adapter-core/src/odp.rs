// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audience segmentation (ODP) request types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Options for a qualified-segments fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SegmentOption {
	IgnoreCache,
	ResetCache,
}

/// An event forwarded to the segmentation platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OdpEvent {
	pub action: String,
	#[serde(rename = "type")]
	pub event_type: Option<String>,
	#[serde(default)]
	pub identifiers: BTreeMap<String, String>,
	#[serde(default)]
	pub data: BTreeMap<String, serde_json::Value>,
}

impl OdpEvent {
	pub fn new(action: impl Into<String>) -> Self {
		Self {
			action: action.into(),
			..Default::default()
		}
	}

	pub fn with_type(mut self, event_type: impl Into<String>) -> Self {
		self.event_type = Some(event_type.into());
		self
	}

	pub fn with_identifier(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.identifiers.insert(key.into(), value.into());
		self
	}

	pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
		self.data.insert(key.into(), value);
		self
	}

	/// An action must contain at least one non-whitespace character.
	pub fn has_valid_action(&self) -> bool {
		!self.action.trim().is_empty()
	}
}
