// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the flags adapter.
//!
//! Most of the adapter's public surface never fails: missing engines and unset
//! users degrade to logged defaults. These errors cover the remaining cases.

use thiserror::Error;

/// Result type alias for the flags adapter.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Errors surfaced by the flags adapter.
///
/// `Clone` so the error can travel through the shared readiness future.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
	/// A hook or provider was used without a coordinator.
	#[error("No flags coordinator available. Hooks must be created from a provider that holds a client")]
	MissingClient,

	/// The engine's readiness future failed.
	#[error("Engine readiness failed: {0}")]
	EngineRejected(String),

	/// The engine failed to close.
	#[error("Engine close failed: {0}")]
	CloseFailed(String),
}

/// Errors reported by an engine implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
	#[error("Engine failed to become ready: {0}")]
	Ready(String),

	#[error("Engine failed to close: {0}")]
	Close(String),
}

impl From<EngineError> for AdapterError {
	fn from(err: EngineError) -> Self {
		match err {
			EngineError::Ready(message) => AdapterError::EngineRejected(message),
			EngineError::Close(message) => AdapterError::CloseFailed(message),
		}
	}
}
