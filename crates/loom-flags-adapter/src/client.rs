// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The readiness coordinator.
//!
//! [`FlagsCoordinator`] owns the engine handle, the ambient user, and the user
//! context built for that user. It composes two independent readiness signals
//! (engine configuration and user identity) into one shared future, and it is
//! the single gateway for every decision, tracking and forced-decision call.
//!
//! Every evaluation method is total: with no engine it logs a warning and
//! returns a safe default, and with no user id it logs at info level and
//! returns a safe default.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use loom_flags_adapter_core::{
	adapt_decisions, are_users_equal, DecideOption, Decision, DecisionContext, DecisionVariables,
	ForcedDecision, NotReadyReason, OdpEvent, ReadinessState, ReadyOutcome, SegmentOption,
	UserAttributes, UserIdentity, UserOverrides,
};
use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::engine::{EngineStatus, EventTags, FlagsEngine, NotificationCenter, SharedUserContext};
use crate::error::{AdapterError, Result};
use crate::listener::{Disposer, ListenerList};
use crate::notification::UnavailableNotificationCenter;
use crate::registry::ForcedDecisionRegistry;

/// Default time `on_ready` waits before reporting a timeout.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Reason reported by `close` when there is no engine to close.
pub const CLIENT_NOT_INITIALIZED: &str = "Flags client is not initialized.";

/// Configuration for the coordinator.
#[derive(Debug, Clone)]
pub struct ClientConfig {
	/// Timeout used by `on_ready` when the caller does not pass one.
	pub ready_timeout: Duration,
	/// When true, qualified-segment fetches are skipped and count as successful.
	pub odp_disabled: bool,
	/// SDK key the engine was created with, if any.
	pub sdk_key: Option<String>,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			ready_timeout: DEFAULT_READY_TIMEOUT,
			odp_disabled: false,
			sdk_key: None,
		}
	}
}

/// Builder for constructing a FlagsCoordinator.
pub struct FlagsCoordinatorBuilder {
	engine: Option<Arc<dyn FlagsEngine>>,
	config: ClientConfig,
}

impl FlagsCoordinatorBuilder {
	/// Creates a new builder with default settings and no engine.
	pub fn new() -> Self {
		Self {
			engine: None,
			config: ClientConfig::default(),
		}
	}

	/// Sets the engine to wrap.
	pub fn engine(mut self, engine: Arc<dyn FlagsEngine>) -> Self {
		self.engine = Some(engine);
		self
	}

	/// Sets the engine from the result of a fallible construction.
	///
	/// `None` puts the coordinator in the failed-client state: every call
	/// degrades to a logged default.
	pub fn maybe_engine(mut self, engine: Option<Arc<dyn FlagsEngine>>) -> Self {
		self.engine = engine;
		self
	}

	/// Replaces the whole configuration.
	pub fn config(mut self, config: ClientConfig) -> Self {
		self.config = config;
		self
	}

	/// Sets the default `on_ready` timeout.
	pub fn ready_timeout(mut self, timeout: Duration) -> Self {
		self.config.ready_timeout = timeout;
		self
	}

	/// Explicitly disables qualified-segment fetching.
	pub fn odp_disabled(mut self, disabled: bool) -> Self {
		self.config.odp_disabled = disabled;
		self
	}

	/// Records the SDK key the engine was created with.
	pub fn sdk_key(mut self, key: impl Into<String>) -> Self {
		self.config.sdk_key = Some(key.into());
		self
	}

	/// Builds the coordinator.
	///
	/// Never fails. When called inside a Tokio runtime the combined readiness
	/// future is driven by a background task, so readiness flags settle even
	/// if nobody awaits [`FlagsCoordinator::on_ready`].
	pub fn build(self) -> Arc<FlagsCoordinator> {
		let (user_ready_tx, user_ready_rx) = oneshot::channel();
		let readiness = Arc::new(ReadinessFlags::default());

		if self.engine.is_none() {
			warn!("Unable to resolve datafile and user information because the flags client failed to initialize");
		}

		let ready = combined_readiness(self.engine.clone(), user_ready_rx, Arc::clone(&readiness));

		if self.engine.is_some() {
			match tokio::runtime::Handle::try_current() {
				Ok(handle) => {
					handle.spawn(ready.clone().map(|_| ()));
				}
				Err(_) => {
					debug!("No Tokio runtime at build time, readiness settles when on_ready is awaited");
				}
			}
		}

		Arc::new(FlagsCoordinator {
			engine: self.engine,
			config: self.config,
			user: RwLock::new(UserIdentity::anonymous()),
			user_context: RwLock::new(None),
			user_generation: AtomicU64::new(0),
			user_ready_tx: Mutex::new(Some(user_ready_tx)),
			readiness,
			ready,
			user_update_listeners: ListenerList::new(),
			forced_variation_listeners: ListenerList::new(),
			forced_decision_flag_keys: Mutex::new(HashSet::new()),
			forced_decisions: ForcedDecisionRegistry::new(),
		})
	}
}

impl Default for FlagsCoordinatorBuilder {
	fn default() -> Self {
		Self::new()
	}
}

type ReadyFuture = Shared<BoxFuture<'static, Result<ReadyOutcome>>>;

/// The still-pending combined readiness, handed out by a timed-out `on_ready`
/// so callers can observe a late success.
#[derive(Clone)]
pub struct DataReady(ReadyFuture);

impl Future for DataReady {
	type Output = Result<ReadyOutcome>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.0).poll(cx)
	}
}

impl fmt::Debug for DataReady {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DataReady")
			.field("settled", &self.0.peek().is_some())
			.finish()
	}
}

/// Result of [`FlagsCoordinator::on_ready`].
#[derive(Debug, Clone)]
pub struct OnReadyResult {
	pub success: bool,
	pub reason: Option<NotReadyReason>,
	pub message: Option<String>,
	/// Present on timeout: resolves when the combined readiness settles.
	pub data_ready: Option<DataReady>,
}

impl From<ReadyOutcome> for OnReadyResult {
	fn from(outcome: ReadyOutcome) -> Self {
		Self {
			success: outcome.success,
			reason: outcome.reason,
			message: outcome.message,
			data_ready: None,
		}
	}
}

#[derive(Debug, Default)]
struct ReadinessFlags {
	client_ready: AtomicBool,
	user_ready: AtomicBool,
	fulfilled: AtomicBool,
}

/// A context handle plus the identity it was built from.
struct ContextSlot {
	handle: SharedUserContext,
	identity: UserIdentity,
}

fn combined_readiness(
	engine: Option<Arc<dyn FlagsEngine>>,
	user_ready_rx: oneshot::Receiver<bool>,
	readiness: Arc<ReadinessFlags>,
) -> ReadyFuture {
	match engine {
		Some(engine) => settle_readiness(engine, user_ready_rx, readiness).boxed().shared(),
		None => futures::future::ready(Ok(ReadyOutcome::no_client()))
			.boxed()
			.shared(),
	}
}

async fn settle_readiness(
	engine: Arc<dyn FlagsEngine>,
	user_ready_rx: oneshot::Receiver<bool>,
	readiness: Arc<ReadinessFlags>,
) -> Result<ReadyOutcome> {
	// A dropped sender means the coordinator went away before any user was set.
	let user = async { Ok::<bool, AdapterError>(user_ready_rx.await.unwrap_or(false)) };
	let client = async { engine.on_ready().await.map_err(AdapterError::from) };
	let (user_ready, client_status) = futures::future::try_join(user, client).await?;

	let state = ReadinessState::new(client_status.success, user_ready);
	readiness.client_ready.store(state.client_ready, Ordering::SeqCst);
	readiness.user_ready.store(state.user_ready, Ordering::SeqCst);
	readiness.fulfilled.store(true, Ordering::SeqCst);

	if state.is_ready() {
		info!("Flags client and user are both ready");
	} else {
		warn!(
			client_ready = state.client_ready,
			user_ready = state.user_ready,
			engine_reason = ?client_status.reason,
			"Flags client or user did not become ready"
		);
	}
	Ok(state.outcome())
}

/// Single authoritative source of engine readiness and the current user.
pub struct FlagsCoordinator {
	engine: Option<Arc<dyn FlagsEngine>>,
	config: ClientConfig,
	user: RwLock<UserIdentity>,
	user_context: RwLock<Option<ContextSlot>>,
	user_generation: AtomicU64,
	user_ready_tx: Mutex<Option<oneshot::Sender<bool>>>,
	readiness: Arc<ReadinessFlags>,
	ready: ReadyFuture,
	user_update_listeners: ListenerList<UserIdentity>,
	forced_variation_listeners: ListenerList<()>,
	forced_decision_flag_keys: Mutex<HashSet<String>>,
	forced_decisions: ForcedDecisionRegistry,
}

impl FlagsCoordinator {
	/// Creates a new builder for constructing a FlagsCoordinator.
	pub fn builder() -> FlagsCoordinatorBuilder {
		FlagsCoordinatorBuilder::new()
	}

	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	pub fn has_engine(&self) -> bool {
		self.engine.is_some()
	}

	pub fn is_using_sdk_key(&self) -> bool {
		self.config.sdk_key.is_some()
	}

	/// The current ambient user.
	pub fn user(&self) -> UserIdentity {
		self.user.read().clone()
	}

	/// The registry hooks subscribe to for forced-decision changes.
	pub fn forced_decisions(&self) -> &ForcedDecisionRegistry {
		&self.forced_decisions
	}

	// ---------------------------------------------------------------------
	// Readiness
	// ---------------------------------------------------------------------

	/// Replaces the ambient user.
	///
	/// The ambient user is written and, for identified users, the context is
	/// created before this returns, so synchronous evaluation works right away
	/// even if the returned future is spawned. Anonymous users wait for the
	/// engine first so an engine-assigned visitor id can be captured. Either
	/// way, segments are fetched next and the first completed call resolves
	/// user readiness with that result. Every call notifies user-update
	/// listeners when its future completes.
	pub fn set_user(self: &Arc<Self>, user: UserIdentity) -> impl Future<Output = ()> + Send + 'static {
		let user = UserIdentity::from_parts(user.id, Some(user.attributes));
		let generation = self.user_generation.fetch_add(1, Ordering::SeqCst) + 1;
		*self.user.write() = user.clone();
		debug!(user_id = %user.display_id(), generation, "Setting user");

		if !user.is_anonymous() {
			self.set_current_user_context(&user);
		}

		let this = Arc::clone(self);
		async move {
			this.await_engine_ready().await;

			if user.is_anonymous() {
				if this.is_current_generation(generation) {
					this.set_current_user_context(&user);
					let resolved_id = this
						.user_context
						.read()
						.as_ref()
						.and_then(|slot| slot.handle.user_id());
					this.user.write().id = resolved_id;
				} else {
					debug!(generation, "Skipping stale anonymous user update");
				}
			}

			let segments_fetched = this.fetch_qualified_segments(&[]).await;
			let resolver = this.user_ready_tx.lock().take();
			if let Some(resolver) = resolver {
				if resolver.send(segments_fetched).is_err() {
					debug!("User readiness receiver already dropped");
				}
			}

			let current = this.user();
			this.user_update_listeners.emit(&current);
		}
	}

	/// Waits for the combined readiness or `timeout`, whichever comes first.
	///
	/// A timeout is not an error: it resolves with [`NotReadyReason::Timeout`]
	/// and carries [`OnReadyResult::data_ready`] for observing a late success.
	/// Only a failure of the engine's own readiness surfaces as `Err`.
	pub async fn on_ready(&self, timeout: Option<Duration>) -> Result<OnReadyResult> {
		let timeout = timeout.unwrap_or(self.config.ready_timeout);
		match tokio::time::timeout(timeout, self.ready.clone()).await {
			Ok(outcome) => outcome.map(OnReadyResult::from),
			Err(_) => {
				let mut result = OnReadyResult::from(ReadyOutcome::timeout());
				result.data_ready = Some(DataReady(self.ready.clone()));
				Ok(result)
			}
		}
	}

	/// True once the engine and the user are both ready.
	pub fn is_ready(&self) -> bool {
		self.readiness.client_ready.load(Ordering::SeqCst)
			&& self.readiness.user_ready.load(Ordering::SeqCst)
	}

	/// True until the first `set_user` has resolved user readiness.
	pub(crate) fn user_ready_pending(&self) -> bool {
		self.user_ready_tx.lock().is_some()
	}

	/// True once the combined readiness has settled, successfully or not.
	pub fn get_is_ready_promise_fulfilled(&self) -> bool {
		self.readiness.fulfilled.load(Ordering::SeqCst)
	}

	/// Fetches audience segments for the ambient user context.
	///
	/// Returns false when there is no user context, and true without fetching
	/// when segmentation is disabled or the engine has no integration.
	pub async fn fetch_qualified_segments(&self, options: &[SegmentOption]) -> bool {
		let Some(handle) = self.ambient_context() else {
			return false;
		};
		let integrated = self
			.engine
			.as_ref()
			.is_some_and(|engine| engine.is_odp_integrated());
		if self.config.odp_disabled || !integrated {
			return true;
		}
		handle.fetch_qualified_segments(options).await
	}

	/// Registers a listener called after every completed `set_user`.
	pub fn on_user_update(&self, handler: impl Fn(&UserIdentity) + Send + Sync + 'static) -> Disposer {
		self.user_update_listeners.add(Arc::new(handler))
	}

	/// Registers a listener called after a successful `set_forced_variation`.
	pub fn on_forced_variations_update(&self, handler: impl Fn() + Send + Sync + 'static) -> Disposer {
		self
			.forced_variation_listeners
			.add(Arc::new(move |_: &()| handler()))
	}

	async fn await_engine_ready(&self) {
		if let Some(engine) = &self.engine {
			if let Err(e) = engine.on_ready().await {
				warn!(error = %e, "Engine readiness failed while setting user");
			}
		}
	}

	fn is_current_generation(&self, generation: u64) -> bool {
		self.user_generation.load(Ordering::SeqCst) == generation
	}

	/// Builds a new context only when `user` differs from the identity the
	/// current context was built from.
	fn set_current_user_context(&self, user: &UserIdentity) {
		let Some(engine) = &self.engine else {
			warn!(
				user_id = %user.display_id(),
				"Unable to create user context because the flags client failed to initialize"
			);
			return;
		};

		let mut slot = self.user_context.write();
		if slot
			.as_ref()
			.is_some_and(|current| are_users_equal(&current.identity, user))
		{
			return;
		}

		*slot = engine
			.create_user_context(user.id.as_deref(), &user.attributes)
			.map(|handle| ContextSlot {
				handle,
				identity: user.clone(),
			});
		if slot.is_none() {
			warn!(user_id = %user.display_id(), "Engine declined to create a user context");
		}
	}

	fn ambient_context(&self) -> Option<SharedUserContext> {
		self
			.user_context
			.read()
			.as_ref()
			.map(|slot| Arc::clone(&slot.handle))
	}

	// ---------------------------------------------------------------------
	// Evaluation
	// ---------------------------------------------------------------------

	fn effective_user(&self, overrides: &UserOverrides) -> UserIdentity {
		overrides.resolve(&self.user.read())
	}

	/// Resolves the engine and a non-null effective user id, logging when
	/// either is missing.
	fn prepare(
		&self,
		action: &str,
		key: &str,
		overrides: &UserOverrides,
	) -> Option<(&Arc<dyn FlagsEngine>, String, UserAttributes)> {
		let Some(engine) = self.engine.as_ref() else {
			warn!(key = %key, "Unable to {action} because the flags client failed to initialize");
			return None;
		};
		let user = self.effective_user(overrides);
		let Some(user_id) = user.id else {
			info!(key = %key, "Unable to {action} because the user id is not set");
			return None;
		};
		Some((engine, user_id, user.attributes))
	}

	/// Activates an experiment and returns the variation key.
	pub fn activate(&self, experiment_key: &str, overrides: &UserOverrides) -> Option<String> {
		let (engine, user_id, attributes) = self.prepare("activate experiment", experiment_key, overrides)?;
		engine.activate(experiment_key, &user_id, &attributes)
	}

	/// Returns the variation key without sending an impression.
	pub fn get_variation(&self, experiment_key: &str, overrides: &UserOverrides) -> Option<String> {
		let (engine, user_id, attributes) = self.prepare("get variation", experiment_key, overrides)?;
		engine.get_variation(experiment_key, &user_id, &attributes)
	}

	pub fn is_feature_enabled(&self, feature_key: &str, overrides: &UserOverrides) -> bool {
		self
			.prepare("evaluate feature", feature_key, overrides)
			.is_some_and(|(engine, user_id, attributes)| {
				engine.is_feature_enabled(feature_key, &user_id, &attributes)
			})
	}

	pub fn get_feature_variable(
		&self,
		feature_key: &str,
		variable_key: &str,
		overrides: &UserOverrides,
	) -> Option<serde_json::Value> {
		let (engine, user_id, attributes) = self.prepare("get feature variable", feature_key, overrides)?;
		engine.get_feature_variable(feature_key, variable_key, &user_id, &attributes)
	}

	pub fn get_feature_variable_boolean(
		&self,
		feature_key: &str,
		variable_key: &str,
		overrides: &UserOverrides,
	) -> Option<bool> {
		let value = self.get_feature_variable(feature_key, variable_key, overrides)?;
		typed_variable(feature_key, variable_key, &value, "boolean", value.as_bool())
	}

	pub fn get_feature_variable_string(
		&self,
		feature_key: &str,
		variable_key: &str,
		overrides: &UserOverrides,
	) -> Option<String> {
		let value = self.get_feature_variable(feature_key, variable_key, overrides)?;
		let typed = value.as_str().map(str::to_string);
		typed_variable(feature_key, variable_key, &value, "string", typed)
	}

	pub fn get_feature_variable_integer(
		&self,
		feature_key: &str,
		variable_key: &str,
		overrides: &UserOverrides,
	) -> Option<i64> {
		let value = self.get_feature_variable(feature_key, variable_key, overrides)?;
		typed_variable(feature_key, variable_key, &value, "integer", value.as_i64())
	}

	pub fn get_feature_variable_double(
		&self,
		feature_key: &str,
		variable_key: &str,
		overrides: &UserOverrides,
	) -> Option<f64> {
		let value = self.get_feature_variable(feature_key, variable_key, overrides)?;
		typed_variable(feature_key, variable_key, &value, "double", value.as_f64())
	}

	/// JSON variables accept any value shape.
	pub fn get_feature_variable_json(
		&self,
		feature_key: &str,
		variable_key: &str,
		overrides: &UserOverrides,
	) -> Option<serde_json::Value> {
		self.get_feature_variable(feature_key, variable_key, overrides)
	}

	pub fn get_all_feature_variables(&self, feature_key: &str, overrides: &UserOverrides) -> DecisionVariables {
		self
			.prepare("get all feature variables", feature_key, overrides)
			.and_then(|(engine, user_id, attributes)| {
				engine.get_all_feature_variables(feature_key, &user_id, &attributes)
			})
			.unwrap_or_default()
	}

	/// Resolves every variable the feature declares in the active configuration.
	pub fn get_feature_variables(&self, feature_key: &str, overrides: &UserOverrides) -> DecisionVariables {
		let Some((engine, user_id, attributes)) =
			self.prepare("get feature variables", feature_key, overrides)
		else {
			return DecisionVariables::new();
		};
		let Some(config) = engine.config() else {
			return DecisionVariables::new();
		};
		let Some(feature) = config.feature(feature_key) else {
			return DecisionVariables::new();
		};

		feature
			.variables_map
			.values()
			.map(|variable| {
				let value = engine
					.get_feature_variable(feature_key, &variable.key, &user_id, &attributes)
					.unwrap_or(serde_json::Value::Null);
				(variable.key.clone(), value)
			})
			.collect()
	}

	pub fn get_enabled_features(&self, overrides: &UserOverrides) -> Vec<String> {
		self
			.prepare("get enabled features", "", overrides)
			.map(|(engine, user_id, attributes)| engine.get_enabled_features(&user_id, &attributes))
			.unwrap_or_default()
	}

	/// Tracks a conversion event.
	pub fn track(&self, event_key: &str, overrides: &UserOverrides, event_tags: Option<&EventTags>) {
		if let Some((engine, user_id, attributes)) = self.prepare("track event", event_key, overrides) {
			engine.track(event_key, &user_id, &attributes, event_tags);
		}
	}

	/// Forces a variation for an experiment. `None` clears the forced variation.
	pub fn set_forced_variation(
		&self,
		experiment_key: &str,
		override_user_id: Option<&str>,
		variation_key: Option<&str>,
	) -> bool {
		let overrides = UserOverrides {
			user_id: override_user_id.map(str::to_string),
			attributes: None,
		};
		let Some((engine, user_id, _)) = self.prepare("set forced variation", experiment_key, &overrides)
		else {
			return false;
		};
		let updated = engine.set_forced_variation(experiment_key, &user_id, variation_key);
		if updated {
			self.forced_variation_listeners.emit(&());
		}
		updated
	}

	pub fn get_forced_variation(&self, experiment_key: &str, override_user_id: Option<&str>) -> Option<String> {
		let overrides = UserOverrides {
			user_id: override_user_id.map(str::to_string),
			attributes: None,
		};
		let (engine, user_id, _) = self.prepare("get forced variation", experiment_key, &overrides)?;
		engine.get_forced_variation(experiment_key, &user_id)
	}

	/// Returns a context bound to `user`.
	///
	/// The ambient context is reused when it matches. A differing identity gets
	/// a fresh context scoped to this call; it is never stored.
	fn user_context_for(&self, user: &UserIdentity) -> Option<SharedUserContext> {
		let engine = self.engine.as_ref()?;
		let user_id = user.id.as_deref()?;

		if let Some(slot) = self.user_context.read().as_ref() {
			let bound = UserIdentity {
				id: slot.handle.user_id(),
				attributes: slot.handle.attributes(),
			};
			if are_users_equal(user, &bound) {
				return Some(Arc::clone(&slot.handle));
			}
			return engine.create_user_context(Some(user_id), &user.attributes);
		}

		if are_users_equal(user, &self.user.read()) {
			self.set_current_user_context(user);
			return self.ambient_context();
		}
		engine.create_user_context(Some(user_id), &user.attributes)
	}

	/// Decides a flag for the effective user.
	pub fn decide(&self, key: &str, options: &[DecideOption], overrides: &UserOverrides) -> Decision {
		let user = self.effective_user(overrides);
		if self.engine.is_none() {
			warn!(flag_key = %key, "Unable to evaluate flag because the flags client failed to initialize");
			return Decision::failed(
				key,
				format!("Unable to evaluate flag {key} because the flags client failed to initialize."),
				&user,
			);
		}

		if user.id.is_none() {
			info!(flag_key = %key, "Unable to evaluate flag because the user id is not set");
			return Decision::failed(
				key,
				format!("Unable to evaluate flag {key} because the user id is not set."),
				&user,
			);
		}

		match self.user_context_for(&user) {
			Some(context) => Decision::from_raw(context.decide(key, options), &user),
			None => Decision::failed(
				key,
				format!("Not evaluating flag {key} because the user id or attributes are not valid"),
				&user,
			),
		}
	}

	/// Decides the given flags for the effective user.
	pub fn decide_for_keys(
		&self,
		keys: &[String],
		options: &[DecideOption],
		overrides: &UserOverrides,
	) -> BTreeMap<String, Decision> {
		let Some((context, user)) = self.batch_context("evaluate flags", overrides) else {
			return BTreeMap::new();
		};
		adapt_decisions(context.decide_for_keys(keys, options), &user)
	}

	/// Decides every flag for the effective user.
	pub fn decide_all(&self, options: &[DecideOption], overrides: &UserOverrides) -> BTreeMap<String, Decision> {
		let Some((context, user)) = self.batch_context("evaluate all flags", overrides) else {
			return BTreeMap::new();
		};
		adapt_decisions(context.decide_all(options), &user)
	}

	fn batch_context(&self, action: &str, overrides: &UserOverrides) -> Option<(SharedUserContext, UserIdentity)> {
		if self.engine.is_none() {
			warn!("Unable to {action} because the flags client failed to initialize");
			return None;
		}
		let user = self.effective_user(overrides);
		if user.id.is_none() {
			info!("Unable to {action} because the user id is not set");
			return None;
		}
		let context = self.user_context_for(&user)?;
		Some((context, user))
	}

	// ---------------------------------------------------------------------
	// Forced decisions
	// ---------------------------------------------------------------------

	/// Sets a forced decision on the ambient context and notifies subscribers
	/// of the flag.
	pub fn set_forced_decision(&self, context: &DecisionContext, decision: &ForcedDecision) -> bool {
		let Some(handle) = self.ambient_context() else {
			info!(
				flag_key = %context.flag_key,
				"Unable to set a forced decision because the user context has not been set yet"
			);
			return false;
		};
		let updated = handle.set_forced_decision(context, decision);
		if updated {
			self
				.forced_decision_flag_keys
				.lock()
				.insert(context.flag_key.clone());
			self.forced_decisions.notify(&context.flag_key);
		}
		updated
	}

	pub fn get_forced_decision(&self, context: &DecisionContext) -> Option<ForcedDecision> {
		let Some(handle) = self.ambient_context() else {
			info!(
				flag_key = %context.flag_key,
				"Unable to get a forced decision because the user context has not been set yet"
			);
			return None;
		};
		handle.get_forced_decision(context)
	}

	pub fn remove_forced_decision(&self, context: &DecisionContext) -> bool {
		let Some(handle) = self.ambient_context() else {
			info!(
				flag_key = %context.flag_key,
				"Unable to remove a forced decision because the user context has not been set yet"
			);
			return false;
		};
		let removed = handle.remove_forced_decision(context);
		// The flag key stays tracked: other rules of the same flag may still be forced.
		if removed {
			self.forced_decisions.notify(&context.flag_key);
		}
		removed
	}

	/// Removes every forced decision and notifies each flag that had one.
	pub fn remove_all_forced_decisions(&self) -> bool {
		let Some(handle) = self.ambient_context() else {
			info!("Unable to remove all forced decisions because the user context has not been set yet");
			return false;
		};
		let removed = handle.remove_all_forced_decisions();
		if removed {
			let keys: Vec<String> = self.forced_decision_flag_keys.lock().drain().collect();
			for key in keys {
				self.forced_decisions.notify(&key);
			}
		}
		removed
	}

	// ---------------------------------------------------------------------
	// Engine passthroughs
	// ---------------------------------------------------------------------

	/// The ambient user context, if the client and user are both set.
	pub fn get_user_context(&self) -> Option<SharedUserContext> {
		if self.engine.is_none() {
			warn!("Unable to get user context because the flags client failed to initialize");
			return None;
		}
		let context = self.ambient_context();
		if context.is_none() {
			warn!("Unable to get user context because the user was not set");
		}
		context
	}

	pub fn get_vuid(&self) -> Option<String> {
		let Some(engine) = &self.engine else {
			warn!("Unable to get vuid because the flags client failed to initialize");
			return None;
		};
		engine.vuid()
	}

	/// Forwards an event to the segmentation platform. Blank actions are rejected.
	pub fn send_odp_event(&self, event: OdpEvent) {
		if !event.has_valid_action() {
			error!("ODP action is not valid (cannot be empty)");
			return;
		}
		match &self.engine {
			Some(engine) => engine.send_odp_event(event),
			None => warn!(
				action = %event.action,
				"Unable to send ODP event because the flags client failed to initialize"
			),
		}
	}

	/// Closes the engine. Succeeds without an engine so downstream cleanup runs.
	pub async fn close(&self) -> Result<EngineStatus> {
		let Some(engine) = &self.engine else {
			return Ok(EngineStatus {
				success: true,
				reason: Some(CLIENT_NOT_INITIALIZED.to_string()),
			});
		};
		let status = engine.close().await?;
		info!(success = status.success, "Flags client closed");
		Ok(status)
	}

	/// The engine's notification center, or a logging stand-in without an engine.
	pub fn notification_center(&self) -> Arc<dyn NotificationCenter> {
		match &self.engine {
			Some(engine) => engine.notification_center(),
			None => Arc::new(UnavailableNotificationCenter),
		}
	}

	#[cfg(test)]
	pub(crate) fn user_update_listener_count(&self) -> usize {
		self.user_update_listeners.len()
	}

	#[cfg(test)]
	pub(crate) fn forced_variation_listener_count(&self) -> usize {
		self.forced_variation_listeners.len()
	}
}

impl fmt::Debug for FlagsCoordinator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FlagsCoordinator")
			.field("has_engine", &self.engine.is_some())
			.field("config", &self.config)
			.field("user", &*self.user.read())
			.field("ready", &self.is_ready())
			.finish()
	}
}

fn typed_variable<T>(
	feature_key: &str,
	variable_key: &str,
	value: &serde_json::Value,
	expected: &str,
	typed: Option<T>,
) -> Option<T> {
	if typed.is_none() && !value.is_null() {
		warn!(
			feature_key = %feature_key,
			variable_key = %variable_key,
			expected = expected,
			actual = ?value,
			"Feature variable has a different type, returning none"
		);
	}
	typed
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_client_config_defaults() {
		let config = ClientConfig::default();
		assert_eq!(config.ready_timeout, Duration::from_millis(5000));
		assert!(!config.odp_disabled);
		assert!(config.sdk_key.is_none());
	}

	#[test]
	fn test_builder_sets_config() {
		let coordinator = FlagsCoordinator::builder()
			.sdk_key("sdk_abc")
			.ready_timeout(Duration::from_millis(250))
			.odp_disabled(true)
			.build();

		assert!(coordinator.is_using_sdk_key());
		assert_eq!(coordinator.config().ready_timeout, Duration::from_millis(250));
		assert!(coordinator.config().odp_disabled);
		assert!(!coordinator.has_engine());
	}

	#[tokio::test]
	async fn test_no_engine_on_ready_resolves_immediately() {
		let coordinator = FlagsCoordinator::builder().build();
		let result = coordinator.on_ready(Some(Duration::from_secs(60))).await.unwrap();

		assert!(!result.success);
		assert_eq!(result.reason, Some(NotReadyReason::NoClient));
		assert!(result.data_ready.is_none());
		assert!(!coordinator.is_ready());
	}

	#[test]
	fn test_no_engine_close_succeeds() {
		let coordinator = FlagsCoordinator::builder().build();
		let status = tokio_test::block_on(coordinator.close()).unwrap();

		assert!(status.success);
		assert_eq!(status.reason.as_deref(), Some(CLIENT_NOT_INITIALIZED));
	}

	#[tokio::test]
	async fn test_no_engine_set_user_still_notifies() {
		let coordinator = FlagsCoordinator::builder().build();
		let seen = Arc::new(Mutex::new(Vec::new()));
		let s = Arc::clone(&seen);
		let _sub = coordinator.on_user_update(move |user| s.lock().push(user.clone()));

		coordinator.set_user(UserIdentity::new("u1")).await;

		assert_eq!(coordinator.user().id.as_deref(), Some("u1"));
		assert_eq!(seen.lock().len(), 1);
		assert!(coordinator.get_user_context().is_none());
		assert!(!coordinator.fetch_qualified_segments(&[]).await);
	}

	#[test]
	fn test_user_update_disposer_unregisters() {
		let coordinator = FlagsCoordinator::builder().build();
		let mut sub = coordinator.on_user_update(|_| {});
		assert_eq!(coordinator.user_update_listener_count(), 1);
		sub.dispose();
		assert_eq!(coordinator.user_update_listener_count(), 0);
	}

	#[test]
	fn test_typed_variable_mismatch_is_none() {
		let value = serde_json::json!("not a number");
		assert_eq!(typed_variable("f", "v", &value, "integer", value.as_i64()), None);
		let value = serde_json::json!(5);
		assert_eq!(typed_variable("f", "v", &value, "integer", value.as_i64()), Some(5));
	}
}
