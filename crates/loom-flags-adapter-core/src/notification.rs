// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use serde::{Deserialize, Serialize};

/// Engine notification channels a listener can register against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
	Activate,
	Decision,
	LogEvent,
	/// The engine installed a new configuration (datafile).
	ConfigUpdate,
	Track,
}

impl fmt::Display for NotificationType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Activate => "ACTIVATE",
			Self::Decision => "DECISION",
			Self::LogEvent => "LOG_EVENT",
			Self::ConfigUpdate => "CONFIG_UPDATE",
			Self::Track => "TRACK",
		};
		f.write_str(s)
	}
}
