// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Publish/subscribe keyed by flag key, used to tell hooks that a forced
//! decision for a flag changed.
//!
//! Each [`crate::FlagsCoordinator`] owns one registry, so independent
//! coordinators in one process never see each other's notifications.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::listener::{Disposer, ListenerList};

#[derive(Clone, Default)]
pub struct ForcedDecisionRegistry {
	channels: Arc<Mutex<HashMap<String, ListenerList<()>>>>,
}

impl ForcedDecisionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `callback` for `key`. Callbacks for the same key fire in
	/// registration order.
	/// The channel for `key` is dropped once its last subscription is disposed.
	pub fn subscribe(&self, key: &str, callback: impl Fn() + Send + Sync + 'static) -> Disposer {
		let mut subscription = self
			.channels
			.lock()
			.entry(key.to_string())
			.or_insert_with(ListenerList::new)
			.add(Arc::new(move |_: &()| callback()));

		let channels = Arc::clone(&self.channels);
		let key = key.to_string();
		Disposer::new(move || {
			subscription.dispose();
			let mut channels = channels.lock();
			if channels.get(&key).is_some_and(|list| list.len() == 0) {
				channels.remove(&key);
			}
		})
	}

	/// Invokes every callback registered under exactly `key`.
	pub fn notify(&self, key: &str) {
		let list = self.channels.lock().get(key).cloned();
		if let Some(list) = list {
			debug!(flag_key = %key, subscribers = list.len(), "Forced decision changed");
			list.emit(&());
		}
	}

	/// Number of live subscriptions for `key`.
	pub fn subscriber_count(&self, key: &str) -> usize {
		self.channels.lock().get(key).map_or(0, |list| list.len())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[test]
	fn notify_only_reaches_matching_key() {
		let registry = ForcedDecisionRegistry::new();
		let hits_a = Arc::new(AtomicUsize::new(0));
		let hits_b = Arc::new(AtomicUsize::new(0));

		let a = Arc::clone(&hits_a);
		let _sub_a = registry.subscribe("flag_a", move || {
			a.fetch_add(1, Ordering::SeqCst);
		});
		let b = Arc::clone(&hits_b);
		let _sub_b = registry.subscribe("flag_b", move || {
			b.fetch_add(1, Ordering::SeqCst);
		});

		registry.notify("flag_a");
		registry.notify("flag_a");
		registry.notify("unknown");

		assert_eq!(hits_a.load(Ordering::SeqCst), 2);
		assert_eq!(hits_b.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn same_key_fires_in_registration_order() {
		let registry = ForcedDecisionRegistry::new();
		let order = Arc::new(Mutex::new(Vec::new()));

		let subs: Vec<Disposer> = (0..3)
			.map(|i| {
				let order = Arc::clone(&order);
				registry.subscribe("flag", move || order.lock().push(i))
			})
			.collect();

		registry.notify("flag");
		assert_eq!(*order.lock(), vec![0, 1, 2]);
		drop(subs);
	}

	#[test]
	fn disposed_subscription_is_not_called() {
		let registry = ForcedDecisionRegistry::new();
		let hits = Arc::new(AtomicUsize::new(0));
		let h = Arc::clone(&hits);
		let mut sub = registry.subscribe("flag", move || {
			h.fetch_add(1, Ordering::SeqCst);
		});
		assert_eq!(registry.subscriber_count("flag"), 1);

		sub.dispose();
		registry.notify("flag");

		assert_eq!(hits.load(Ordering::SeqCst), 0);
		assert_eq!(registry.subscriber_count("flag"), 0);
	}

	#[test]
	fn last_disposal_drops_the_channel() {
		let registry = ForcedDecisionRegistry::new();
		let first = registry.subscribe("flag", || {});
		let second = registry.subscribe("flag", || {});
		let _other = registry.subscribe("other", || {});

		drop(first);
		assert!(registry.channels.lock().contains_key("flag"));

		drop(second);
		assert!(!registry.channels.lock().contains_key("flag"));
		assert_eq!(registry.channels.lock().len(), 1);

		let _again = registry.subscribe("flag", || {});
		assert_eq!(registry.subscriber_count("flag"), 1);
	}

	#[test]
	fn registries_are_independent() {
		let first = ForcedDecisionRegistry::new();
		let second = ForcedDecisionRegistry::new();
		let hits = Arc::new(AtomicUsize::new(0));
		let h = Arc::clone(&hits);
		let _sub = first.subscribe("flag", move || {
			h.fetch_add(1, Ordering::SeqCst);
		});

		second.notify("flag");
		assert_eq!(hits.load(Ordering::SeqCst), 0);
	}

	mod proptests {
		use super::*;
		use proptest::prelude::*;

		proptest! {
			#[test]
			fn subscriber_count_tracks_live_disposers(keep in prop::collection::vec(any::<bool>(), 0..16)) {
				let registry = ForcedDecisionRegistry::new();
				let mut subs: Vec<Disposer> = keep.iter().map(|_| registry.subscribe("flag", || {})).collect();
				for (sub, keep) in subs.iter_mut().zip(&keep) {
					if !keep {
						sub.dispose();
					}
				}

				let live = keep.iter().filter(|k| **k).count();
				prop_assert_eq!(registry.subscriber_count("flag"), live);
				drop(subs);
				prop_assert_eq!(registry.subscriber_count("flag"), 0);
			}
		}
	}
}
