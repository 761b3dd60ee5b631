//! Change notifications emitted by a `View`
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{FlowId, View};

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

/// A subscriber callback. It sees the view after the change was applied and
/// returns `false` once it wants no further events, which disconnects it.
pub type Handler = Box<dyn FnMut(&View, &SignalEvent) -> bool + Send + Sync>;

/// The four kinds of change a view reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignalKind {
  /// a flow entered the visible set
  Added,
  /// a visible flow changed and stayed visible
  Updated,
  /// a flow left the visible set
  Removed,
  /// the visible set was rebuilt
  Refreshed,
}

/// One change notification.
///
/// `index` is the presented position of the flow: after the change for
/// `Added` and `Updated`, before it for `Removed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalEvent {
  /// a flow entered the visible set
  Added {
    /// flow id
    flow: FlowId,
    /// position it now occupies
    index: usize,
  },
  /// a visible flow changed and stayed visible
  Updated {
    /// flow id
    flow: FlowId,
    /// position it now occupies
    index: usize,
  },
  /// a flow left the visible set
  Removed {
    /// flow id
    flow: FlowId,
    /// position it occupied
    index: usize,
  },
  /// the visible set was rebuilt
  Refreshed,
}

impl SignalEvent {
  /// Which signal carries this event.
  pub fn kind(&self) -> SignalKind {
    match self {
      SignalEvent::Added { .. } => SignalKind::Added,
      SignalEvent::Updated { .. } => SignalKind::Updated,
      SignalEvent::Removed { .. } => SignalKind::Removed,
      SignalEvent::Refreshed => SignalKind::Refreshed,
    }
  }
  /// The flow the event is about, if any.
  pub fn flow(&self) -> Option<FlowId> {
    match self {
      SignalEvent::Added { flow, .. }
      | SignalEvent::Updated { flow, .. }
      | SignalEvent::Removed { flow, .. } => Some(*flow),
      SignalEvent::Refreshed => None,
    }
  }
}

/// Handle returned by `connect`, used to disconnect later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A list of subscribers for one kind of event.
///
/// Handlers run synchronously, in registration order, inside the view call
/// that caused the event.
#[derive(Default)]
pub struct Signal {
  handlers: Vec<(SubscriptionId, Handler)>,
}

impl Signal {
  /// Register `handler`.
  pub fn connect<F>(&mut self, mut handler: F) -> SubscriptionId
  where
    F: FnMut(&View, &SignalEvent) + Send + Sync + 'static,
  {
    self.connect_handler(Box::new(move |view: &View, event: &SignalEvent| {
      handler(view, event);
      true
    }))
  }
  /// Register `handler` for as long as `target` is alive.
  ///
  /// The signal holds only a weak reference; after the last `Arc` to
  /// `target` is dropped the handler is disconnected on the next event.
  pub fn connect_weak<T, F>(&mut self, target: &Arc<T>, mut handler: F) -> SubscriptionId
  where
    T: Send + Sync + 'static,
    F: FnMut(&T, &View, &SignalEvent) + Send + Sync + 'static,
  {
    let target = Arc::downgrade(target);
    self.connect_handler(Box::new(move |view: &View, event: &SignalEvent| {
      match target.upgrade() {
        Some(strong) => {
          handler(&*strong, view, event);
          true
        }
        None => false,
      }
    }))
  }
  /// Register a raw handler that decides itself when to disconnect.
  pub fn connect_handler(&mut self, handler: Handler) -> SubscriptionId {
    let id = SubscriptionId(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed));
    self.handlers.push((id, handler));
    id
  }
  /// Remove a handler. Returns whether it was connected here.
  pub fn disconnect(&mut self, id: SubscriptionId) -> bool {
    let before = self.handlers.len();
    self.handlers.retain(|(sid, _)| *sid != id);
    self.handlers.len() != before
  }
  /// Number of connected handlers.
  pub fn len(&self) -> usize {
    self.handlers.len()
  }
  /// Whether nothing is connected.
  pub fn is_empty(&self) -> bool {
    self.handlers.is_empty()
  }
}

impl fmt::Debug for Signal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Signal")
      .field("handlers", &self.handlers.len())
      .finish()
  }
}

/// The signal bus of a view, one channel per event kind.
#[derive(Debug, Default)]
pub struct Signals {
  /// flow entered the visible set
  pub added: Signal,
  /// visible flow changed
  pub updated: Signal,
  /// flow left the visible set
  pub removed: Signal,
  /// visible set rebuilt
  pub refreshed: Signal,
}

impl Signals {
  /// The channel for `kind`.
  pub fn get(&self, kind: SignalKind) -> &Signal {
    match kind {
      SignalKind::Added => &self.added,
      SignalKind::Updated => &self.updated,
      SignalKind::Removed => &self.removed,
      SignalKind::Refreshed => &self.refreshed,
    }
  }
  /// Mutable access to the channel for `kind`.
  pub fn get_mut(&mut self, kind: SignalKind) -> &mut Signal {
    match kind {
      SignalKind::Added => &mut self.added,
      SignalKind::Updated => &mut self.updated,
      SignalKind::Removed => &mut self.removed,
      SignalKind::Refreshed => &mut self.refreshed,
    }
  }
  /// Connect a clone of `handler` to every channel.
  pub fn connect_all<F>(&mut self, handler: F) -> [SubscriptionId; 4]
  where
    F: FnMut(&View, &SignalEvent) + Clone + Send + Sync + 'static,
  {
    [
      self.added.connect(handler.clone()),
      self.updated.connect(handler.clone()),
      self.removed.connect(handler.clone()),
      self.refreshed.connect(handler),
    ]
  }
  /// Connect a clone of `handler` to every channel for as long as `target`
  /// is alive.
  pub fn connect_all_weak<T, F>(&mut self, target: &Arc<T>, handler: F) -> [SubscriptionId; 4]
  where
    T: Send + Sync + 'static,
    F: FnMut(&T, &View, &SignalEvent) + Clone + Send + Sync + 'static,
  {
    [
      self.added.connect_weak(target, handler.clone()),
      self.updated.connect_weak(target, handler.clone()),
      self.removed.connect_weak(target, handler.clone()),
      self.refreshed.connect_weak(target, handler),
    ]
  }
  /// Disconnect `id` from whichever channel holds it.
  pub fn disconnect(&mut self, id: SubscriptionId) -> bool {
    self.added.disconnect(id)
      || self.updated.disconnect(id)
      || self.removed.disconnect(id)
      || self.refreshed.disconnect(id)
  }

  pub(crate) fn take(&mut self, kind: SignalKind) -> Vec<(SubscriptionId, Handler)> {
    std::mem::take(&mut self.get_mut(kind).handlers)
  }

  // Handlers cannot reach the bus while it dispatches, so the taken list is
  // put back as is.
  pub(crate) fn restore(&mut self, kind: SignalKind, handlers: Vec<(SubscriptionId, Handler)>) {
    self.get_mut(kind).handlers = handlers;
  }
}

// Handlers that return false are dropped from the list.
pub(crate) fn dispatch(view: &View, handlers: &mut Vec<(SubscriptionId, Handler)>, event: &SignalEvent) {
  handlers.retain_mut(|(id, handler)| {
    let keep = handler(view, event);
    if !keep {
      tracing::trace!(subscription = ?id, "handler disconnected itself");
    }
    keep
  });
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn connect_and_disconnect() {
    let mut signals = Signals::default();
    let ids = signals.connect_all(|_: &View, _: &SignalEvent| {});
    assert_eq!(signals.added.len(), 1);
    assert_eq!(signals.refreshed.len(), 1);
    assert!(signals.disconnect(ids[1]));
    assert!(!signals.disconnect(ids[1]));
    assert!(signals.updated.is_empty());
    assert_eq!(signals.get(SignalKind::Removed).len(), 1);
  }

  #[test]
  fn weak_handlers_follow_their_target() {
    let mut view = View::new();
    let target = Arc::new(AtomicU64::new(0));
    view
      .signals_mut()
      .refreshed
      .connect_weak(&target, |count: &AtomicU64, _: &View, _: &SignalEvent| {
        count.fetch_add(1, Ordering::Relaxed);
      });
    view.set_reversed(true);
    assert_eq!(target.load(Ordering::Relaxed), 1);
    assert_eq!(view.signals().refreshed.len(), 1);

    drop(target);
    assert_eq!(view.signals().refreshed.len(), 1);
    view.set_reversed(false);
    assert!(view.signals().refreshed.is_empty());
  }

  #[test]
  fn handlers_can_disconnect_themselves() {
    let mut view = View::new();
    let mut remaining = 2;
    view
      .signals_mut()
      .refreshed
      .connect_handler(Box::new(move |_: &View, _: &SignalEvent| {
        remaining -= 1;
        remaining > 0
      }));
    view.set_reversed(true);
    assert_eq!(view.signals().refreshed.len(), 1);
    view.set_reversed(false);
    assert!(view.signals().refreshed.is_empty());
  }

  #[test]
  fn event_kinds() {
    let id = FlowId::new();
    let event = SignalEvent::Removed { flow: id, index: 3 };
    assert_eq!(event.kind(), SignalKind::Removed);
    assert_eq!(event.flow(), Some(id));
    assert_eq!(SignalEvent::Refreshed.flow(), None);
  }
}
