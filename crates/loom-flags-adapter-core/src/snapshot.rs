// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read-only view of the engine's active configuration.
//!
//! Only the parts the adapter needs are modelled: which features exist and
//! which variables each feature declares.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
	Boolean,
	String,
	Integer,
	Double,
	Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableConfig {
	pub key: String,
	#[serde(rename = "type")]
	pub variable_type: VariableType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureConfig {
	pub key: String,
	#[serde(default)]
	pub variables_map: BTreeMap<String, VariableConfig>,
}

impl FeatureConfig {
	pub fn new(key: impl Into<String>) -> Self {
		Self {
			key: key.into(),
			variables_map: BTreeMap::new(),
		}
	}

	pub fn with_variable(mut self, key: impl Into<String>, variable_type: VariableType) -> Self {
		let key = key.into();
		self.variables_map.insert(
			key.clone(),
			VariableConfig {
				key,
				variable_type,
			},
		);
		self
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
	#[serde(default)]
	pub features_map: BTreeMap<String, FeatureConfig>,
}

impl ConfigSnapshot {
	pub fn with_feature(mut self, feature: FeatureConfig) -> Self {
		self.features_map.insert(feature.key.clone(), feature);
		self
	}

	pub fn feature(&self, key: &str) -> Option<&FeatureConfig> {
		self.features_map.get(key)
	}
}
