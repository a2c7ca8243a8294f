// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Listener lists and the [`Disposer`] handle every subscription returns.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Callback stored in a [`ListenerList`].
pub type Listener<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// Undoes a subscription.
///
/// Dropping a `Disposer` unsubscribes. Calling [`Disposer::dispose`] more than
/// once is a no-op.
#[must_use = "dropping a Disposer unsubscribes immediately"]
pub struct Disposer {
	teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl Disposer {
	pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
		Self {
			teardown: Some(Box::new(teardown)),
		}
	}

	/// A disposer with nothing to undo.
	pub fn noop() -> Self {
		Self { teardown: None }
	}

	pub fn dispose(&mut self) {
		if let Some(teardown) = self.teardown.take() {
			teardown();
		}
	}

	pub fn is_disposed(&self) -> bool {
		self.teardown.is_none()
	}
}

impl Drop for Disposer {
	fn drop(&mut self) {
		self.dispose();
	}
}

impl fmt::Debug for Disposer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Disposer")
			.field("disposed", &self.is_disposed())
			.finish()
	}
}

struct ListenerEntries<A> {
	next_id: u64,
	entries: Vec<(u64, Listener<A>)>,
}

/// Ordered list of callbacks. Listeners fire in registration order.
pub(crate) struct ListenerList<A> {
	inner: Arc<Mutex<ListenerEntries<A>>>,
}

impl<A: 'static> ListenerList<A> {
	pub(crate) fn new() -> Self {
		Self {
			inner: Arc::new(Mutex::new(ListenerEntries {
				next_id: 1,
				entries: Vec::new(),
			})),
		}
	}

	pub(crate) fn add(&self, listener: Listener<A>) -> Disposer {
		let id = {
			let mut inner = self.inner.lock();
			let id = inner.next_id;
			inner.next_id += 1;
			inner.entries.push((id, listener));
			id
		};

		let weak = Arc::downgrade(&self.inner);
		Disposer::new(move || {
			if let Some(inner) = weak.upgrade() {
				inner.lock().entries.retain(|(entry_id, _)| *entry_id != id);
			}
		})
	}

	/// Invokes every listener. The list is snapshotted first so listeners may
	/// subscribe or unsubscribe while being notified.
	pub(crate) fn emit(&self, arg: &A) {
		let snapshot: Vec<Listener<A>> = self
			.inner
			.lock()
			.entries
			.iter()
			.map(|(_, listener)| Arc::clone(listener))
			.collect();
		for listener in snapshot {
			listener(arg);
		}
	}

	pub(crate) fn len(&self) -> usize {
		self.inner.lock().entries.len()
	}
}

impl<A> Clone for ListenerList<A> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}
