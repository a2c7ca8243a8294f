// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Readiness and decision adapter for Loom feature flags.
//!
//! This crate wraps a flag-evaluation engine and gives call sites a race-free
//! view of it: one coordinator composes engine readiness with user readiness,
//! and hooks recompute their decisions exactly when their inputs change.
//!
//! # Features
//!
//! - **Combined Readiness**: engine and user readiness folded into one shared future
//! - **Total API**: a missing engine or user degrades to logged safe defaults
//! - **Decision Hooks**: experiment, feature and flag hooks with equality-gated recompute
//! - **Auto Update**: opt-in re-evaluation on configuration and user changes
//! - **Forced Decisions**: per-coordinator registry notifying hooks of overrides
//!
//! # Example
//!
//! ```ignore
//! use loom_flags_adapter::{FlagsCoordinator, FlagsProvider, HookOptions, ProviderOptions};
//! use loom_flags_adapter::{UserIdentity, UserOverrides};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Wrap an engine implementation
//!     let client = FlagsCoordinator::builder()
//!         .engine(engine)
//!         .sdk_key("loom_sdk_client_prod_xxx")
//!         .build();
//!
//!     // Mount a provider for the current user
//!     let provider = FlagsProvider::mount(
//!         Some(client.clone()),
//!         ProviderOptions {
//!             user: Some(UserIdentity::new("user123")),
//!             ..Default::default()
//!         },
//!     );
//!
//!     // Bind a call site to a flag
//!     let mut hook = provider.use_decision("checkout.new_flow", UserOverrides::none(), HookOptions::auto_update())?;
//!     let state = hook.changed().await;
//!     println!("enabled: {}", state.value.enabled);
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

mod auto_update;
mod client;
mod engine;
mod error;
mod hooks;
mod init_state;
mod listener;
mod notification;
mod provider;
mod registry;

pub use auto_update::setup_auto_update_listeners;
pub use client::{
	ClientConfig, DataReady, FlagsCoordinator, FlagsCoordinatorBuilder, OnReadyResult, CLIENT_NOT_INITIALIZED,
	DEFAULT_READY_TIMEOUT,
};
pub use engine::{
	EngineStatus, EventTags, FlagsEngine, NotificationCenter, NotificationListener, SharedUserContext,
	UserContextHandle,
};
pub use error::{AdapterError, EngineError, Result};
pub use hooks::{
	DecisionHook, DecisionSource, ExperimentHook, ExperimentSource, FeatureHook, FeatureSource, FeatureValue, Hook,
	HookKind, HookOptions, HookSource, HookState, TrackEventHook,
};
pub use init_state::{subscribe_to_initialization, InitializationTracker};
pub use listener::{Disposer, Listener};
pub use notification::UnavailableNotificationCenter;
pub use provider::{FlagsProvider, ProviderOptions};
pub use registry::ForcedDecisionRegistry;

// Re-export core types for convenience
pub use loom_flags_adapter_core::{
	adapt_decisions, are_attributes_equal, are_users_equal, ConfigSnapshot, DecideOption, Decision,
	DecisionContext, DecisionVariables, FeatureConfig, ForcedDecision, ForcedDecisionOverlay,
	InitializationState, NotReadyReason, NotificationType, OdpEvent, RawDecision, ReadinessState, ReadyOutcome,
	SegmentOption, UserAttributes, UserIdentity, UserOverrides, VariableConfig, VariableType, NOT_READY_REASON,
};
