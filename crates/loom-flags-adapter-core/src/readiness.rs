// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Readiness results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why the adapter is not ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotReadyReason {
	Timeout,
	NoClient,
	UserNotReady,
}

impl fmt::Display for NotReadyReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Timeout => "TIMEOUT",
			Self::NoClient => "NO_CLIENT",
			Self::UserNotReady => "USER_NOT_READY",
		};
		f.write_str(s)
	}
}

/// Settled value of the combined engine + user readiness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyOutcome {
	pub success: bool,
	pub reason: Option<NotReadyReason>,
	pub message: Option<String>,
}

impl ReadyOutcome {
	pub fn ready() -> Self {
		Self {
			success: true,
			reason: None,
			message: Some("Client and user are both ready.".to_string()),
		}
	}

	pub fn no_client() -> Self {
		Self {
			success: false,
			reason: Some(NotReadyReason::NoClient),
			message: Some("Flags client failed to initialize.".to_string()),
		}
	}

	pub fn user_not_ready() -> Self {
		Self {
			success: false,
			reason: Some(NotReadyReason::UserNotReady),
			message: Some("Client or user did not become ready.".to_string()),
		}
	}

	pub fn timeout() -> Self {
		Self {
			success: false,
			reason: Some(NotReadyReason::Timeout),
			message: Some("Failed to become ready before timeout".to_string()),
		}
	}
}

/// The two readiness prerequisites, each settled independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadinessState {
	pub client_ready: bool,
	pub user_ready: bool,
}

impl ReadinessState {
	pub fn new(client_ready: bool, user_ready: bool) -> Self {
		Self {
			client_ready,
			user_ready,
		}
	}

	pub fn is_ready(&self) -> bool {
		self.client_ready && self.user_ready
	}

	/// Folds both prerequisites into a single outcome.
	pub fn outcome(&self) -> ReadyOutcome {
		if self.is_ready() {
			ReadyOutcome::ready()
		} else {
			ReadyOutcome::user_not_ready()
		}
	}
}

/// Per call site view of client initialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializationState {
	pub client_ready: bool,
	pub did_timeout: bool,
}

impl InitializationState {
	pub fn new(client_ready: bool, did_timeout: bool) -> Self {
		Self {
			client_ready,
			did_timeout,
		}
	}
}
