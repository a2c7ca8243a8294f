// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use loom_flags_adapter_core::{are_attributes_equal, InitializationState, UserOverrides};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use super::{HookOptions, HookSource};
use crate::auto_update::setup_auto_update_listeners;
use crate::client::FlagsCoordinator;
use crate::init_state::subscribe_to_initialization;
use crate::listener::Disposer;

/// What a hook currently reports.
#[derive(Debug, Clone, PartialEq)]
pub struct HookState<V> {
	pub value: V,
	pub client_ready: bool,
	pub did_timeout: bool,
}

struct HookInputs {
	key: String,
	overrides: UserOverrides,
	/// Bumped only when override attributes change structurally.
	attributes_witness: u64,
}

#[derive(Debug, Clone, PartialEq)]
struct SubscriptionDeps {
	key: String,
	override_user_id: Option<String>,
	attributes_witness: u64,
	ready_fulfilled: bool,
}

#[derive(Default)]
struct HookSubscriptions {
	deps: Option<SubscriptionDeps>,
	auto_update: Option<Disposer>,
	extra: Option<Disposer>,
	initialization: Option<Disposer>,
}

struct HookShared<S: HookSource> {
	client: Arc<FlagsCoordinator>,
	options: HookOptions,
	inputs: Mutex<HookInputs>,
	state: watch::Sender<HookState<S::Value>>,
	subscriptions: Mutex<HookSubscriptions>,
	cancelled: AtomicBool,
	_source: PhantomData<S>,
}

impl<S: HookSource> HookShared<S> {
	fn current_inputs(&self) -> (String, UserOverrides) {
		let inputs = self.inputs.lock();
		(inputs.key.clone(), inputs.overrides.clone())
	}

	fn evaluate(&self) -> S::Value {
		let (key, overrides) = self.current_inputs();
		S::evaluate(&self.client, &key, &overrides, &self.options)
	}

	/// Recomputes the value and publishes it.
	fn refresh(&self) {
		if self.cancelled.load(Ordering::SeqCst) {
			return;
		}
		let value = self.evaluate();
		self.state.send_modify(|state| state.value = value);
	}

	fn apply_initialization(&self, init: InitializationState) {
		if self.cancelled.load(Ordering::SeqCst) {
			return;
		}
		let value = self.evaluate();
		self.state.send_replace(HookState {
			value,
			client_ready: init.client_ready,
			did_timeout: init.did_timeout,
		});
	}
}

/// Tears down and re-arms update subscriptions when their dependencies
/// changed since the last call.
fn sync_subscriptions<S: HookSource>(shared: &Arc<HookShared<S>>) {
	if shared.cancelled.load(Ordering::SeqCst) {
		return;
	}

	let deps = {
		let inputs = shared.inputs.lock();
		SubscriptionDeps {
			key: inputs.key.clone(),
			override_user_id: inputs.overrides.user_id.clone(),
			attributes_witness: inputs.attributes_witness,
			ready_fulfilled: shared.client.get_is_ready_promise_fulfilled(),
		}
	};

	let (stale_auto_update, stale_extra) = {
		let mut subscriptions = shared.subscriptions.lock();
		if subscriptions.deps.as_ref() == Some(&deps) {
			return;
		}
		subscriptions.deps = Some(deps.clone());
		(subscriptions.auto_update.take(), subscriptions.extra.take())
	};
	drop(stale_auto_update);
	drop(stale_extra);

	let (key, overrides) = shared.current_inputs();
	let on_update = update_callback(shared);

	let auto_update = (deps.ready_fulfilled && shared.options.auto_update).then(|| {
		setup_auto_update_listeners(&shared.client, S::KIND, &key, Arc::clone(&on_update))
	});
	let extra = S::extra_subscription(&shared.client, &key, &overrides, &shared.options, on_update);

	debug!(
		hook = %S::KIND,
		key = %key,
		auto_update = auto_update.is_some(),
		extra = extra.is_some(),
		"Hook subscriptions armed"
	);

	let mut subscriptions = shared.subscriptions.lock();
	subscriptions.auto_update = auto_update;
	subscriptions.extra = extra;
}

fn update_callback<S: HookSource>(shared: &Arc<HookShared<S>>) -> Arc<dyn Fn() + Send + Sync> {
	let weak: Weak<HookShared<S>> = Arc::downgrade(shared);
	Arc::new(move || {
		if let Some(shared) = weak.upgrade() {
			shared.refresh();
		}
	})
}

/// A live value bound to one call site.
pub struct Hook<S: HookSource> {
	shared: Arc<HookShared<S>>,
	updates: watch::Receiver<HookState<S::Value>>,
}

impl<S: HookSource> Hook<S> {
	pub(crate) fn mount(
		client: Arc<FlagsCoordinator>,
		key: &str,
		overrides: UserOverrides,
		options: HookOptions,
		is_server_side: bool,
	) -> Self {
		let client_ready = is_server_side || client.is_ready();
		let value = if client_ready {
			S::evaluate(&client, key, &overrides, &options)
		} else {
			S::empty(key)
		};
		let (state, updates) = watch::channel(HookState {
			value,
			client_ready,
			did_timeout: false,
		});

		let shared = Arc::new(HookShared {
			client,
			options,
			inputs: Mutex::new(HookInputs {
				key: key.to_string(),
				overrides,
				attributes_witness: 0,
			}),
			state,
			subscriptions: Mutex::new(HookSubscriptions::default()),
			cancelled: AtomicBool::new(false),
			_source: PhantomData::<S>,
		});

		if !client_ready {
			let weak = Arc::downgrade(&shared);
			let initialization = subscribe_to_initialization(
				&shared.client,
				shared.options.timeout,
				move |init| {
					if let Some(shared) = weak.upgrade() {
						shared.apply_initialization(init);
						sync_subscriptions(&shared);
					}
				},
			);
			shared.subscriptions.lock().initialization = Some(initialization);
		} else if !shared.client.get_is_ready_promise_fulfilled() {
			// Server-side hooks already show a value; only auto-update waits on readiness.
			let weak = Arc::downgrade(&shared);
			let initialization = subscribe_to_initialization(&shared.client, shared.options.timeout, move |_| {
				if let Some(shared) = weak.upgrade() {
					sync_subscriptions(&shared);
				}
			});
			shared.subscriptions.lock().initialization = Some(initialization);
		}

		sync_subscriptions(&shared);
		Self { shared, updates }
	}

	/// Re-renders the hook with the current inputs.
	///
	/// Recomputes synchronously when the key, the override user id, or the
	/// override attributes (compared by contents) changed. Subscriptions are
	/// re-checked on every render. Returns the state the call site should
	/// display.
	pub fn render(&mut self, key: &str, overrides: UserOverrides) -> HookState<S::Value> {
		let changed = {
			let mut inputs = self.shared.inputs.lock();
			let attributes_equal =
				are_attributes_equal(inputs.overrides.attributes.as_ref(), overrides.attributes.as_ref());
			if !attributes_equal {
				inputs.attributes_witness += 1;
			}
			let changed = inputs.key != key || inputs.overrides.user_id != overrides.user_id || !attributes_equal;
			if changed {
				inputs.key = key.to_string();
				inputs.overrides = overrides;
			}
			changed
		};

		if changed {
			debug!(hook = %S::KIND, key = %key, "Hook inputs changed, re-evaluating");
			self.shared.refresh();
		}
		sync_subscriptions(&self.shared);
		self.state()
	}

	pub fn state(&self) -> HookState<S::Value> {
		self.shared.state.borrow().clone()
	}

	pub fn value(&self) -> S::Value {
		self.shared.state.borrow().value.clone()
	}

	pub fn client_ready(&self) -> bool {
		self.shared.state.borrow().client_ready
	}

	pub fn did_timeout(&self) -> bool {
		self.shared.state.borrow().did_timeout
	}

	/// Waits until the hook publishes a new state.
	pub async fn changed(&mut self) -> HookState<S::Value> {
		// The sender lives as long as the hook, so this only waits.
		let _ = self.updates.changed().await;
		self.updates.borrow_and_update().clone()
	}
}

impl<S: HookSource> Drop for Hook<S> {
	fn drop(&mut self) {
		self.shared.cancelled.store(true, Ordering::SeqCst);
		let subscriptions = std::mem::take(&mut *self.shared.subscriptions.lock());
		drop(subscriptions);
	}
}

impl<S: HookSource> fmt::Debug for Hook<S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Hook")
			.field("kind", &S::KIND)
			.field("state", &*self.shared.state.borrow())
			.finish()
	}
}
