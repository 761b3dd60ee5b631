//! A cursor that follows one flow through a `View`
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::errors::{Error, Result};
use crate::signal::{SignalEvent, SubscriptionId};
use crate::{FlowId, View};

#[derive(Debug, Default, Clone, Copy)]
struct FocusState {
  index: Option<usize>,
  flow: Option<FlowId>,
}

impl FocusState {
  fn resolve(&mut self, view: &View) {
    if let Some(index) = self.flow.and_then(|id| view.index_of(&id)) {
      self.index = Some(index);
      return;
    }
    if view.is_empty() {
      *self = FocusState::default();
      return;
    }
    // the flow that took the old place, or the last one
    let index = self.index.unwrap_or(0).min(view.len() - 1);
    self.index = Some(index);
    self.flow = view.iter().nth(index).map(|f| f.id());
  }
}

/// The selected flow of a [`View`], tracked by identity.
///
/// A focus subscribes to every signal of the view it was created on and
/// re-resolves itself each time, so it always names a visible flow while the
/// view is non-empty. When its flow leaves the view the focus moves to
/// whichever flow now occupies the old index.
///
/// The subscriptions only hold a weak reference to the focus; dropping it
/// disconnects them on the view's next event of each kind. `detach` removes
/// them right away.
///
/// ```
/// use flowview::{Flow, Focus, Request, View};
///
/// let mut view = View::new();
/// let focus = Focus::new(&mut view);
/// assert_eq!(focus.index(), None);
///
/// let flow = Flow::new(Request::default());
/// let id = flow.id();
/// view.add(flow);
/// assert_eq!(focus.flow(), Some(id));
/// ```
#[derive(Debug)]
pub struct Focus {
  view: u64,
  state: Arc<RwLock<FocusState>>,
  subscriptions: [SubscriptionId; 4],
}

impl Focus {
  /// Bind a focus to `view`, selecting its first flow if there is one.
  pub fn new(view: &mut View) -> Self {
    let mut state = FocusState::default();
    state.resolve(view);
    let state = Arc::new(RwLock::new(state));
    let subscriptions = view.signals_mut().connect_all_weak(
      &state,
      |state: &RwLock<FocusState>, view: &View, event: &SignalEvent| {
        let mut state = state.write().unwrap_or_else(PoisonError::into_inner);
        state.resolve(view);
        tracing::trace!(?event, index = ?state.index, "focus resolved");
      },
    );
    Focus {
      view: view.id(),
      state,
      subscriptions,
    }
  }

  /// Presented index of the focused flow.
  pub fn index(&self) -> Option<usize> {
    self.read().index
  }

  /// The focused flow.
  pub fn flow(&self) -> Option<FlowId> {
    self.read().flow
  }

  /// Focus the visible flow `id`.
  ///
  /// Fails with `InvalidFocus` when it is not visible; the focus is left
  /// as it was.
  pub fn set_flow(&self, view: &View, id: FlowId) -> Result<()> {
    self.bound_to(view)?;
    let index = view.index_of(&id).ok_or(Error::InvalidFocus(id))?;
    let mut state = self.write();
    state.flow = Some(id);
    state.index = Some(index);
    Ok(())
  }

  /// Focus the flow at `index`; negative indices count from the end.
  pub fn set_index(&self, view: &View, index: isize) -> Result<()> {
    self.bound_to(view)?;
    let id = view.get(index)?.id();
    self.set_flow(view, id)
  }

  /// Stop following `view`.
  pub fn detach(self, view: &mut View) -> Result<()> {
    self.bound_to(view)?;
    for id in self.subscriptions {
      view.signals_mut().disconnect(id);
    }
    Ok(())
  }

  fn bound_to(&self, view: &View) -> Result<()> {
    if view.id() == self.view {
      Ok(())
    } else {
      Err(Error::ForeignView)
    }
  }

  fn read(&self) -> RwLockReadGuard<'_, FocusState> {
    self.state.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> RwLockWriteGuard<'_, FocusState> {
    self.state.write().unwrap_or_else(PoisonError::into_inner)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{Flow, Request};

  fn flow(start: f64) -> Flow {
    Flow::new(Request::default().with_timestamp_start(start))
  }

  #[test]
  fn starts_on_first_flow() {
    let mut view = View::new();
    view.add(flow(1.0));
    let focus = Focus::new(&mut view);
    assert_eq!(focus.index(), Some(0));
    assert_eq!(focus.flow(), Some(view.get(0).unwrap().id()));
  }

  #[test]
  fn foreign_view_is_rejected() {
    let mut view = View::new();
    let mut other = View::new();
    let a = flow(1.0);
    let id = a.id();
    other.add(a);
    let focus = Focus::new(&mut view);
    assert!(matches!(focus.set_flow(&other, id), Err(Error::ForeignView)));
    assert!(matches!(focus.set_flow(&view, id), Err(Error::InvalidFocus(_))));
    assert!(focus.detach(&mut other).is_err());
  }

  #[test]
  fn dropped_focus_disconnects() {
    let mut view = View::new();
    for _ in 0..1000 {
      drop(Focus::new(&mut view));
    }
    assert_eq!(view.signals().added.len(), 1000);
    view.add(flow(1.0));
    assert!(view.signals().added.is_empty());
    view.set_reversed(true);
    assert!(view.signals().refreshed.is_empty());

    let kept = Focus::new(&mut view);
    view.add(flow(2.0));
    assert_eq!(view.signals().added.len(), 1);
    // presented back to front, the newer flow comes first
    assert_eq!(kept.index(), Some(1));
  }

  #[test]
  fn detach_disconnects() {
    let mut view = View::new();
    let focus = Focus::new(&mut view);
    assert_eq!(view.signals().added.len(), 1);
    focus.detach(&mut view).unwrap();
    assert!(view.signals().added.is_empty());
    assert!(view.signals().refreshed.is_empty());
  }
}
