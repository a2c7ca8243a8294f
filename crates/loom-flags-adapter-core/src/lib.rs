// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Loom feature flags readiness adapter.
//!
//! This crate holds the runtime-free half of the adapter: user identities and
//! their equality rules, the normalized [`Decision`] shape, forced decisions,
//! readiness outcomes, and the configuration snapshot the engine exposes. It is
//! used by `loom-flags-adapter` and by engine implementations that plug into it.
//!
//! # Example
//!
//! ```
//! use loom_flags_adapter_core::{are_users_equal, Decision, RawDecision, UserIdentity};
//!
//! let user = UserIdentity::new("user123").with_attribute("plan", serde_json::json!("pro"));
//! let same = UserIdentity::new("user123").with_attribute("plan", serde_json::json!("pro"));
//! assert!(are_users_equal(&user, &same));
//!
//! let raw = RawDecision {
//!     flag_key: "checkout.new_flow".to_string(),
//!     enabled: true,
//!     variation_key: Some("treatment".to_string()),
//!     ..Default::default()
//! };
//! let decision = Decision::from_raw(raw, &user);
//! assert_eq!(decision.user_context, user);
//! ```

pub mod decision;
pub mod forced;
pub mod notification;
pub mod odp;
pub mod readiness;
pub mod snapshot;
pub mod user;

pub use decision::{
	adapt_decisions, DecideOption, Decision, DecisionVariables, RawDecision, NOT_READY_REASON,
};
pub use forced::{DecisionContext, ForcedDecision, ForcedDecisionOverlay};
pub use notification::NotificationType;
pub use odp::{OdpEvent, SegmentOption};
pub use readiness::{InitializationState, NotReadyReason, ReadinessState, ReadyOutcome};
pub use snapshot::{ConfigSnapshot, FeatureConfig, VariableConfig, VariableType};
pub use user::{are_attributes_equal, are_users_equal, UserAttributes, UserIdentity, UserOverrides};
