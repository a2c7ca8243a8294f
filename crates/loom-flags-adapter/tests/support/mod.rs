// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared fixtures: a scriptable in-memory engine and a log-capturing layer.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use loom_flags_adapter::{
	ConfigSnapshot, DecideOption, DecisionContext, DecisionVariables, EngineError, EngineStatus, EventTags,
	FlagsEngine, ForcedDecision, ForcedDecisionOverlay, NotificationCenter, NotificationListener,
	NotificationType, OdpEvent, RawDecision, SegmentOption, SharedUserContext, UserAttributes,
	UserContextHandle,
};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

type EngineReady = Shared<BoxFuture<'static, Result<EngineStatus, EngineError>>>;

/// Engine state shared with the context handles it creates.
#[derive(Default)]
pub struct EngineScript {
	/// `(experiment, user)` -> variation.
	pub activations: HashMap<(String, String), String>,
	/// `(feature, user)` -> enabled.
	pub features: HashMap<(String, String), bool>,
	/// `(feature, variable)` -> value.
	pub variables: HashMap<(String, String), serde_json::Value>,
	/// flag -> raw decision returned by every context.
	pub decisions: BTreeMap<String, RawDecision>,
	/// `(experiment, user)` -> forced variation.
	pub forced_variations: HashMap<(String, String), String>,
	pub config: Option<ConfigSnapshot>,
	pub vuid: Option<String>,
}

pub struct FakeEngine {
	pub script: Arc<Mutex<EngineScript>>,
	pub calls: Arc<Mutex<Vec<String>>>,
	pub odp_events: Mutex<Vec<OdpEvent>>,
	pub contexts_created: AtomicU64,
	pub odp_integrated: AtomicBool,
	pub segments_result: Arc<AtomicBool>,
	pub center: Arc<FakeNotificationCenter>,
	center_override: Mutex<Option<Arc<dyn NotificationCenter>>>,
	ready_tx: Mutex<Option<oneshot::Sender<Result<EngineStatus, EngineError>>>>,
	ready: EngineReady,
}

impl FakeEngine {
	/// An engine whose readiness is pending until [`FakeEngine::resolve_ready`].
	pub fn pending() -> Arc<Self> {
		let (tx, rx) = oneshot::channel();
		let ready = rx
			.map(|result| result.unwrap_or_else(|_| Err(EngineError::Ready("engine dropped".to_string()))))
			.boxed()
			.shared();
		Arc::new(Self {
			script: Arc::new(Mutex::new(EngineScript::default())),
			calls: Arc::new(Mutex::new(Vec::new())),
			odp_events: Mutex::new(Vec::new()),
			contexts_created: AtomicU64::new(0),
			odp_integrated: AtomicBool::new(false),
			segments_result: Arc::new(AtomicBool::new(true)),
			center: Arc::new(FakeNotificationCenter::default()),
			center_override: Mutex::new(None),
			ready_tx: Mutex::new(Some(tx)),
			ready,
		})
	}

	/// An engine that is ready immediately.
	pub fn ready() -> Arc<Self> {
		let engine = Self::pending();
		engine.resolve_ready(Ok(EngineStatus::ok()));
		engine
	}

	pub fn resolve_ready(&self, result: Result<EngineStatus, EngineError>) {
		if let Some(tx) = self.ready_tx.lock().take() {
			let _ = tx.send(result);
		}
	}

	/// Replaces the notification center handed to the coordinator.
	pub fn set_notification_center(&self, center: Arc<dyn NotificationCenter>) {
		*self.center_override.lock() = Some(center);
	}

	pub fn calls_named(&self, name: &str) -> usize {
		self.calls
			.lock()
			.iter()
			.filter(|call| call.split(':').next() == Some(name))
			.count()
	}

	fn record(&self, call: String) {
		self.calls.lock().push(call);
	}
}

#[async_trait]
impl FlagsEngine for FakeEngine {
	fn create_user_context(&self, user_id: Option<&str>, attributes: &UserAttributes) -> Option<SharedUserContext> {
		let user_id = match user_id {
			Some(id) => Some(id.to_string()),
			None => self.script.lock().vuid.clone(),
		};
		self.contexts_created.fetch_add(1, Ordering::SeqCst);
		self.record(format!("create_user_context:{}", user_id.as_deref().unwrap_or("")));
		Some(Arc::new(FakeUserContext {
			user_id,
			attributes: attributes.clone(),
			script: Arc::clone(&self.script),
			calls: Arc::clone(&self.calls),
			segments_result: Arc::clone(&self.segments_result),
			overlay: Mutex::new(ForcedDecisionOverlay::new()),
		}))
	}

	async fn on_ready(&self) -> Result<EngineStatus, EngineError> {
		self.ready.clone().await
	}

	fn activate(&self, experiment_key: &str, user_id: &str, _attributes: &UserAttributes) -> Option<String> {
		self.record(format!("activate:{experiment_key}:{user_id}"));
		let script = self.script.lock();
		script
			.forced_variations
			.get(&(experiment_key.to_string(), user_id.to_string()))
			.or_else(|| script.activations.get(&(experiment_key.to_string(), user_id.to_string())))
			.cloned()
	}

	fn get_variation(&self, experiment_key: &str, user_id: &str, _attributes: &UserAttributes) -> Option<String> {
		self.record(format!("get_variation:{experiment_key}:{user_id}"));
		self.script
			.lock()
			.activations
			.get(&(experiment_key.to_string(), user_id.to_string()))
			.cloned()
	}

	fn is_feature_enabled(&self, feature_key: &str, user_id: &str, _attributes: &UserAttributes) -> bool {
		self.record(format!("is_feature_enabled:{feature_key}:{user_id}"));
		self.script
			.lock()
			.features
			.get(&(feature_key.to_string(), user_id.to_string()))
			.copied()
			.unwrap_or(false)
	}

	fn get_feature_variable(
		&self,
		feature_key: &str,
		variable_key: &str,
		user_id: &str,
		_attributes: &UserAttributes,
	) -> Option<serde_json::Value> {
		self.record(format!("get_feature_variable:{feature_key}:{user_id}"));
		self.script
			.lock()
			.variables
			.get(&(feature_key.to_string(), variable_key.to_string()))
			.cloned()
	}

	fn get_all_feature_variables(
		&self,
		feature_key: &str,
		user_id: &str,
		_attributes: &UserAttributes,
	) -> Option<DecisionVariables> {
		self.record(format!("get_all_feature_variables:{feature_key}:{user_id}"));
		let variables: DecisionVariables = self
			.script
			.lock()
			.variables
			.iter()
			.filter(|((feature, _), _)| feature == feature_key)
			.map(|((_, variable), value)| (variable.clone(), value.clone()))
			.collect();
		Some(variables)
	}

	fn get_enabled_features(&self, user_id: &str, _attributes: &UserAttributes) -> Vec<String> {
		self.record(format!("get_enabled_features:{user_id}"));
		let mut enabled: Vec<String> = self
			.script
			.lock()
			.features
			.iter()
			.filter(|((_, user), enabled)| user == user_id && **enabled)
			.map(|((feature, _), _)| feature.clone())
			.collect();
		enabled.sort();
		enabled
	}

	fn track(&self, event_key: &str, user_id: &str, _attributes: &UserAttributes, _event_tags: Option<&EventTags>) {
		self.record(format!("track:{event_key}:{user_id}"));
	}

	fn set_forced_variation(&self, experiment_key: &str, user_id: &str, variation_key: Option<&str>) -> bool {
		self.record(format!("set_forced_variation:{experiment_key}:{user_id}"));
		let key = (experiment_key.to_string(), user_id.to_string());
		let mut script = self.script.lock();
		match variation_key {
			Some(variation) => {
				script.forced_variations.insert(key, variation.to_string());
			}
			None => {
				script.forced_variations.remove(&key);
			}
		}
		true
	}

	fn get_forced_variation(&self, experiment_key: &str, user_id: &str) -> Option<String> {
		self.script
			.lock()
			.forced_variations
			.get(&(experiment_key.to_string(), user_id.to_string()))
			.cloned()
	}

	fn config(&self) -> Option<ConfigSnapshot> {
		self.script.lock().config.clone()
	}

	fn is_odp_integrated(&self) -> bool {
		self.odp_integrated.load(Ordering::SeqCst)
	}

	fn vuid(&self) -> Option<String> {
		self.script.lock().vuid.clone()
	}

	fn send_odp_event(&self, event: OdpEvent) {
		self.record(format!("send_odp_event:{}", event.action));
		self.odp_events.lock().push(event);
	}

	async fn close(&self) -> Result<EngineStatus, EngineError> {
		self.record("close".to_string());
		Ok(EngineStatus::ok())
	}

	fn notification_center(&self) -> Arc<dyn NotificationCenter> {
		match self.center_override.lock().as_ref() {
			Some(center) => Arc::clone(center),
			None => Arc::clone(&self.center) as Arc<dyn NotificationCenter>,
		}
	}
}

pub struct FakeUserContext {
	user_id: Option<String>,
	attributes: UserAttributes,
	script: Arc<Mutex<EngineScript>>,
	calls: Arc<Mutex<Vec<String>>>,
	segments_result: Arc<AtomicBool>,
	overlay: Mutex<ForcedDecisionOverlay>,
}

impl FakeUserContext {
	fn apply_overlay(&self, mut raw: RawDecision) -> RawDecision {
		let overlay = self.overlay.lock();
		if let Some(forced) = overlay.resolve(&raw.flag_key, raw.rule_key.as_deref()) {
			raw.variation_key = Some(forced.variation_key.clone());
			raw.enabled = true;
		}
		raw
	}

	fn raw_decision(&self, key: &str) -> RawDecision {
		self.script.lock().decisions.get(key).cloned().unwrap_or_else(|| RawDecision {
			flag_key: key.to_string(),
			..Default::default()
		})
	}
}

#[async_trait]
impl UserContextHandle for FakeUserContext {
	fn user_id(&self) -> Option<String> {
		self.user_id.clone()
	}

	fn attributes(&self) -> UserAttributes {
		self.attributes.clone()
	}

	fn decide(&self, key: &str, _options: &[DecideOption]) -> RawDecision {
		self.calls
			.lock()
			.push(format!("decide:{key}:{}", self.user_id.as_deref().unwrap_or("")));
		self.apply_overlay(self.raw_decision(key))
	}

	fn decide_all(&self, _options: &[DecideOption]) -> BTreeMap<String, RawDecision> {
		let keys: Vec<String> = self.script.lock().decisions.keys().cloned().collect();
		keys.into_iter()
			.map(|key| {
				let decision = self.apply_overlay(self.raw_decision(&key));
				(key, decision)
			})
			.collect()
	}

	fn decide_for_keys(&self, keys: &[String], _options: &[DecideOption]) -> BTreeMap<String, RawDecision> {
		keys.iter()
			.map(|key| (key.clone(), self.apply_overlay(self.raw_decision(key))))
			.collect()
	}

	async fn fetch_qualified_segments(&self, _options: &[SegmentOption]) -> bool {
		self.calls.lock().push("fetch_qualified_segments".to_string());
		self.segments_result.load(Ordering::SeqCst)
	}

	fn set_forced_decision(&self, context: &DecisionContext, decision: &ForcedDecision) -> bool {
		self.overlay.lock().set(context.clone(), decision.clone())
	}

	fn get_forced_decision(&self, context: &DecisionContext) -> Option<ForcedDecision> {
		self.overlay.lock().get(context).cloned()
	}

	fn remove_forced_decision(&self, context: &DecisionContext) -> bool {
		self.overlay.lock().remove(context)
	}

	fn remove_all_forced_decisions(&self) -> bool {
		self.overlay.lock().remove_all()
	}
}

/// Notification center that records registrations and can fire them.
pub struct FakeNotificationCenter {
	next_id: AtomicU64,
	listeners: Mutex<Vec<(u64, NotificationType, NotificationListener)>>,
	pub added: AtomicU64,
}

impl Default for FakeNotificationCenter {
	fn default() -> Self {
		Self {
			next_id: AtomicU64::new(1),
			listeners: Mutex::new(Vec::new()),
			added: AtomicU64::new(0),
		}
	}
}

impl FakeNotificationCenter {
	pub fn fire(&self, kind: NotificationType) {
		let listeners: Vec<NotificationListener> = self
			.listeners
			.lock()
			.iter()
			.filter(|(_, listener_kind, _)| *listener_kind == kind)
			.map(|(_, _, listener)| Arc::clone(listener))
			.collect();
		for listener in listeners {
			listener(&serde_json::Value::Null);
		}
	}

	pub fn active(&self) -> usize {
		self.listeners.lock().len()
	}

	pub fn added(&self) -> u64 {
		self.added.load(Ordering::SeqCst)
	}
}

impl NotificationCenter for FakeNotificationCenter {
	fn add_notification_listener(&self, kind: NotificationType, listener: NotificationListener) -> u64 {
		let id = self.next_id.fetch_add(1, Ordering::SeqCst);
		self.added.fetch_add(1, Ordering::SeqCst);
		self.listeners.lock().push((id, kind, listener));
		id
	}

	fn remove_notification_listener(&self, listener_id: u64) -> bool {
		let mut listeners = self.listeners.lock();
		let before = listeners.len();
		listeners.retain(|(id, _, _)| *id != listener_id);
		listeners.len() != before
	}

	fn clear_notification_listeners(&self, kind: NotificationType) {
		self.listeners.lock().retain(|(_, listener_kind, _)| *listener_kind != kind);
	}

	fn clear_all_notification_listeners(&self) {
		self.listeners.lock().clear();
	}
}

/// A captured log event.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
	pub level: Level,
	pub message: String,
}

/// Layer that stores every event it sees.
#[derive(Clone, Default)]
pub struct CaptureLayer {
	events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CaptureLayer {
	pub fn count(&self, level: Level) -> usize {
		self.events.lock().iter().filter(|event| event.level == level).count()
	}

	pub fn count_containing(&self, level: Level, needle: &str) -> usize {
		self.events
			.lock()
			.iter()
			.filter(|event| event.level == level && event.message.contains(needle))
			.count()
	}

	pub fn clear(&self) {
		self.events.lock().clear();
	}
}

impl<S> Layer<S> for CaptureLayer
where
	S: Subscriber + for<'a> LookupSpan<'a>,
{
	fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
		let mut visitor = MessageVisitor::default();
		event.record(&mut visitor);
		self.events.lock().push(CapturedEvent {
			level: *event.metadata().level(),
			message: visitor.message,
		});
	}
}

#[derive(Default)]
struct MessageVisitor {
	message: String,
}

impl Visit for MessageVisitor {
	fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
		if field.name() == "message" {
			self.message = format!("{value:?}");
		}
	}
}

/// Installs a capturing subscriber for the current thread.
pub fn capture_logs() -> (CaptureLayer, tracing::subscriber::DefaultGuard) {
	let layer = CaptureLayer::default();
	let subscriber = tracing_subscriber::registry().with(layer.clone());
	let guard = tracing::subscriber::set_default(subscriber);
	(layer, guard)
}

/// Raw decision helper.
pub fn raw_decision(flag_key: &str, rule_key: &str, variation_key: &str) -> RawDecision {
	RawDecision {
		flag_key: flag_key.to_string(),
		enabled: true,
		rule_key: Some(rule_key.to_string()),
		variation_key: Some(variation_key.to_string()),
		..Default::default()
	}
}
