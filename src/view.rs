//! The ordered, filtered projection of tracked flows
use std::cmp::Ordering;
use std::fmt;
use std::iter::FusedIterator;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};

use crate::errors::{Error, Result};
use crate::filter::{Filter, Matcher};
use crate::options::Options;
use crate::order::{OrderKey, SortKey};
use crate::settings::{Settings, SettingsStore};
use crate::signal::{self, SignalEvent, Signals};
use crate::store::FlowStore;
use crate::{Flow, FlowId};

static NEXT_VIEW: AtomicU64 = AtomicU64::new(1);

/// A view behind a lock: one writer at a time, any number of readers.
pub type SharedView = Arc<RwLock<View>>;

#[derive(Debug, Clone)]
struct Entry {
  key: SortKey,
  seq: u64,
  id: FlowId,
}

impl Entry {
  fn cmp_to(&self, key: &SortKey, seq: u64) -> Ordering {
    self.key.cmp(key).then(self.seq.cmp(&seq))
  }
}

#[derive(Clone, Default)]
struct Membership {
  filter: Option<Arc<dyn Matcher>>,
  marked_only: bool,
}

impl Membership {
  fn admits(&self, flow: &Flow) -> bool {
    (!self.marked_only || flow.marked)
      && self.filter.as_ref().map_or(true, |f| f.matches(flow))
  }
}

/// The live, filtered and sorted projection of the flows a proxy captured.
///
/// Every flow handed to the view is kept in its [`FlowStore`]; the flows that
/// pass the active filter are also kept in visible order. Each mutating call
/// emits at most one signal on the [`Signals`] bus.
///
/// # Example
///
/// ```
/// use flowview::{Filter, Flow, Request, View};
///
/// let mut view = View::new();
/// for (method, start) in [("GET", 1.0), ("PUT", 3.0), ("GET", 2.0)] {
///   let request: Request = Request::builder().method(method).body(()).unwrap().into();
///   view.request(Flow::new(request.with_timestamp_start(start)));
/// }
/// let starts: Vec<f64> = view.iter().map(|f| f.request.timestamp_start()).collect();
/// assert_eq!(starts, [1.0, 2.0, 3.0]);
///
/// view.set_filter(Filter::parse("~m get").unwrap());
/// assert_eq!(view.len(), 2);
/// assert_eq!(view.store().len(), 3);
/// ```
pub struct View {
  id: u64,
  store: FlowStore,
  // ascending by (key, seq); reversal only changes how it is read
  visible: Vec<Entry>,
  membership: Membership,
  order: OrderKey,
  reversed: bool,
  settings: SettingsStore,
  signals: Signals,
}

impl Default for View {
  fn default() -> Self {
    Self::new()
  }
}

impl View {
  /// An empty view ordered by time, showing everything.
  pub fn new() -> Self {
    View {
      id: NEXT_VIEW.fetch_add(1, AtomicOrdering::Relaxed),
      store: FlowStore::new(),
      visible: Vec::new(),
      membership: Membership::default(),
      order: OrderKey::default(),
      reversed: false,
      settings: SettingsStore::new(),
      signals: Signals::default(),
    }
  }
  /// Wrap the view for sharing between the traffic and presentation paths.
  pub fn into_shared(self) -> SharedView {
    Arc::new(RwLock::new(self))
  }
  pub(crate) fn id(&self) -> u64 {
    self.id
  }
}

// Mutation
impl View {
  /// Track `flow`, showing it if it passes the filter.
  ///
  /// A flow whose id is already tracked is ignored.
  pub fn add(&mut self, flow: Flow) {
    let id = flow.id();
    if self.store.contains(&id) {
      tracing::trace!(flow = %id, "add: already tracked");
      return;
    }
    let key = self
      .membership
      .admits(&flow)
      .then(|| self.order.key(&flow));
    let seq = self.store.insert(flow, key.clone());
    match key {
      Some(key) => {
        let index = self.file(key, seq, id);
        tracing::debug!(flow = %id, index, "flow added");
        self.emit(SignalEvent::Added { flow: id, index });
      }
      None => tracing::debug!(flow = %id, "flow stored, filtered out"),
    }
  }

  /// A new flow has begun. Announcing the same flow twice is harmless.
  pub fn request(&mut self, flow: Flow) {
    self.add(flow);
  }

  /// Replace the tracked state of `flow` and re-evaluate its membership and
  /// position.
  ///
  /// Emits `updated`, `removed` or `added` depending on where the flow was
  /// and where it belongs now; emits nothing for a flow this view does not
  /// track or one that stays hidden.
  pub fn update(&mut self, flow: Flow) {
    let id = flow.id();
    match self.store.slot_mut(&id) {
      Some(slot) => slot.flow = flow,
      None => {
        tracing::trace!(flow = %id, "update: not tracked");
        return;
      }
    }
    self.refile(id);
  }

  /// Mutate a tracked flow in place, then re-evaluate it as [`View::update`]
  /// does. Returns whether the flow was tracked.
  pub fn update_with<F>(&mut self, id: &FlowId, mutate: F) -> bool
  where
    F: FnOnce(&mut Flow),
  {
    match self.store.slot_mut(id) {
      Some(slot) => mutate(&mut slot.flow),
      None => {
        tracing::trace!(flow = %id, "update: not tracked");
        return false;
      }
    }
    self.refile(*id);
    true
  }

  /// Stop tracking a flow and drop its settings, handing the flow back.
  pub fn remove(&mut self, id: &FlowId) -> Option<Flow> {
    let Some(slot) = self.store.remove(id) else {
      tracing::trace!(flow = %id, "remove: not tracked");
      return None;
    };
    self.settings.remove(id);
    if let Some(key) = slot.visible {
      let index = self.unfile(&key, slot.seq);
      tracing::debug!(flow = %id, index, "flow removed");
      self.emit(SignalEvent::Removed { flow: *id, index });
    }
    Some(slot.flow)
  }

  /// Forget every flow and all settings, handing the flows back.
  pub fn clear(&mut self) -> Vec<Flow> {
    self.visible.clear();
    self.settings.clear();
    let flows = self.store.clear();
    tracing::debug!(flows = flows.len(), "view cleared");
    self.emit(SignalEvent::Refreshed);
    flows
  }

  /// Show only flows that match `filter`.
  pub fn set_filter<M>(&mut self, filter: M)
  where
    M: Matcher + 'static,
  {
    self.membership.filter = Some(Arc::new(filter));
    self.refresh();
  }

  /// Show every flow again.
  pub fn clear_filter(&mut self) {
    self.membership.filter = None;
    self.refresh();
  }

  /// Order by the strategy called `name`.
  ///
  /// Unknown names are rejected and leave the view untouched.
  pub fn set_order(&mut self, name: &str) -> Result<()> {
    let order = name.parse::<OrderKey>().inspect_err(|err| {
      tracing::warn!("{}", err);
    })?;
    self.set_order_key(order);
    Ok(())
  }

  /// Order by `order`.
  pub fn set_order_key(&mut self, order: OrderKey) {
    self.order = order;
    self.refresh();
  }

  /// Present the order back to front. No re-sorting takes place.
  pub fn set_reversed(&mut self, reversed: bool) {
    self.reversed = reversed;
    tracing::debug!(reversed, "view direction");
    self.emit(SignalEvent::Refreshed);
  }

  /// Switch between showing only marked flows and the plain filter.
  ///
  /// Marked-only mode is combined with whatever filter is set, including
  /// filters set while it is on. It is only entered when a visible flow is
  /// marked. Returns whether the mode is on afterwards.
  pub fn toggle_marked(&mut self) -> bool {
    if self.membership.marked_only {
      self.membership.marked_only = false;
    } else if self.iter().any(|f| f.marked) {
      self.membership.marked_only = true;
    } else {
      tracing::debug!("toggle_marked: no marked flow visible");
      return false;
    }
    self.refresh();
    self.membership.marked_only
  }

  /// Apply the view options at once.
  ///
  /// The filter and order are validated before anything changes; on
  /// success the view is rebuilt and `refreshed` emitted once.
  pub fn configure(&mut self, options: &Options) -> Result<()> {
    let filter = match options.filter.as_deref().map(str::trim) {
      None | Some("") => None,
      Some(expr) => Some(Filter::parse(expr).inspect_err(|err| {
        tracing::warn!("{}", err);
      })?),
    };
    let order = options.order.parse::<OrderKey>().inspect_err(|err| {
      tracing::warn!("{}", err);
    })?;
    self.membership.filter = filter.map(|f| Arc::new(f) as Arc<dyn Matcher>);
    self.order = order;
    self.reversed = options.order_reversed;
    self.refresh();
    Ok(())
  }

  fn refresh(&mut self) {
    self.rebuild();
    tracing::debug!(
      visible = self.visible.len(),
      tracked = self.store.len(),
      order = %self.order,
      "view rebuilt"
    );
    self.emit(SignalEvent::Refreshed);
  }

  fn rebuild(&mut self) {
    let membership = &self.membership;
    let order = self.order;
    self.visible.clear();
    for slot in self.store.slots_mut() {
      slot.visible = membership
        .admits(&slot.flow)
        .then(|| order.key(&slot.flow));
      if let Some(key) = &slot.visible {
        self.visible.push(Entry {
          key: key.clone(),
          seq: slot.seq,
          id: slot.flow.id(),
        });
      }
    }
    self
      .visible
      .sort_unstable_by(|a, b| a.cmp_to(&b.key, b.seq));
  }

  fn refile(&mut self, id: FlowId) {
    let Some(slot) = self.store.slot(&id) else {
      return;
    };
    let seq = slot.seq;
    let was = slot.visible.clone();
    let now = self
      .membership
      .admits(&slot.flow)
      .then(|| self.order.key(&slot.flow));
    let old_index = was.map(|key| self.unfile(&key, seq));
    if let Some(slot) = self.store.slot_mut(&id) {
      slot.visible = now.clone();
    }
    let event = match (old_index, now) {
      (Some(_), Some(key)) => SignalEvent::Updated {
        flow: id,
        index: self.file(key, seq, id),
      },
      (Some(index), None) => SignalEvent::Removed { flow: id, index },
      (None, Some(key)) => SignalEvent::Added {
        flow: id,
        index: self.file(key, seq, id),
      },
      (None, None) => {
        tracing::trace!(flow = %id, "update: stays hidden");
        return;
      }
    };
    tracing::debug!(flow = %id, ?event, "flow updated");
    self.emit(event);
  }

  // Insert into the visible order, returning the presented index.
  fn file(&mut self, key: SortKey, seq: u64, id: FlowId) -> usize {
    let pos = self.lower_bound(&key, seq);
    self.visible.insert(pos, Entry { key, seq, id });
    self.present(pos)
  }

  // Remove from the visible order, returning the presented index it had.
  fn unfile(&mut self, key: &SortKey, seq: u64) -> usize {
    let pos = self.lower_bound(key, seq);
    let index = self.present(pos);
    self.visible.remove(pos);
    index
  }

  fn emit(&mut self, event: SignalEvent) {
    let kind = event.kind();
    let mut handlers = self.signals.take(kind);
    signal::dispatch(self, &mut handlers, &event);
    self.signals.restore(kind, handlers);
  }
}

// Sequence access
impl View {
  /// Number of visible flows.
  pub fn len(&self) -> usize {
    self.visible.len()
  }
  /// Whether no flow is visible.
  pub fn is_empty(&self) -> bool {
    self.visible.is_empty()
  }
  /// The visible flow at `index`; negative indices count from the end.
  pub fn get(&self, index: isize) -> Result<&Flow> {
    let len = self.visible.len();
    let out_of_range = Error::IndexOutOfRange { index, len };
    let position = if index < 0 {
      len.checked_sub(index.unsigned_abs())
    } else {
      Some(index as usize).filter(|i| *i < len)
    };
    position
      .and_then(|i| self.flow_at(i))
      .ok_or(out_of_range)
  }
  /// Whether `id` is currently visible.
  pub fn contains(&self, id: &FlowId) -> bool {
    self
      .store
      .slot(id)
      .is_some_and(|slot| slot.visible.is_some())
  }
  /// Presented index of a visible flow.
  pub fn index_of(&self, id: &FlowId) -> Option<usize> {
    let slot = self.store.slot(id)?;
    let key = slot.visible.as_ref()?;
    Some(self.present(self.lower_bound(key, slot.seq)))
  }
  /// Visible flows in presented order.
  pub fn iter(&self) -> Iter<'_> {
    Iter {
      view: self,
      front: 0,
      back: self.visible.len(),
    }
  }
  /// Where `flow` would be inserted in the presented order, which is where
  /// `add` files it: after the flows it ties with that entered the view
  /// earlier. Presented back to front, those flows follow it instead. The
  /// view is not modified.
  pub fn bisect(&self, flow: &Flow) -> usize {
    let key = self.order.key(flow);
    let seq = self.store.slot(&flow.id()).map_or(u64::MAX, |s| s.seq);
    if self.reversed {
      self.visible.len() - self.lower_bound(&key, seq)
    } else {
      self
        .visible
        .partition_point(|e| e.cmp_to(&key, seq) != Ordering::Greater)
    }
  }

  fn lower_bound(&self, key: &SortKey, seq: u64) -> usize {
    self
      .visible
      .partition_point(|e| e.cmp_to(key, seq) == Ordering::Less)
  }

  fn present(&self, pos: usize) -> usize {
    if self.reversed {
      self.visible.len() - 1 - pos
    } else {
      pos
    }
  }

  fn flow_at(&self, index: usize) -> Option<&Flow> {
    let pos = if self.reversed {
      self.visible.len().checked_sub(index + 1)?
    } else {
      index
    };
    self.store.get(&self.visible.get(pos)?.id)
  }
}

// Accessors
impl View {
  /// Every tracked flow, visible or not.
  pub fn store(&self) -> &FlowStore {
    &self.store
  }
  /// The per-flow annotations.
  pub fn settings(&self) -> &SettingsStore {
    &self.settings
  }
  /// Annotations of a tracked flow, created empty on first access.
  ///
  /// Fails with `SettingsNotFound` for flows the view does not track.
  pub fn settings_mut(&mut self, id: &FlowId) -> Result<&mut Settings> {
    if !self.store.contains(id) {
      return Err(Error::SettingsNotFound(*id));
    }
    Ok(self.settings.get_or_create(*id))
  }
  /// The signal bus.
  pub fn signals(&self) -> &Signals {
    &self.signals
  }
  /// The signal bus, for connecting subscribers.
  pub fn signals_mut(&mut self) -> &mut Signals {
    &mut self.signals
  }
  /// The active order.
  pub fn order(&self) -> OrderKey {
    self.order
  }
  /// Whether the order is presented back to front.
  pub fn reversed(&self) -> bool {
    self.reversed
  }
  /// Whether only marked flows are shown.
  pub fn marked_only(&self) -> bool {
    self.membership.marked_only
  }
  /// Whether a filter is set.
  pub fn has_filter(&self) -> bool {
    self.membership.filter.is_some()
  }
}

impl fmt::Debug for View {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("View")
      .field("visible", &self.visible.len())
      .field("tracked", &self.store.len())
      .field("order", &self.order)
      .field("reversed", &self.reversed)
      .field("filtered", &self.membership.filter.is_some())
      .field("marked_only", &self.membership.marked_only)
      .finish()
  }
}

/// Iterator over the visible flows of a [`View`].
#[derive(Debug, Clone)]
pub struct Iter<'a> {
  view: &'a View,
  front: usize,
  back: usize,
}

impl<'a> Iterator for Iter<'a> {
  type Item = &'a Flow;

  fn next(&mut self) -> Option<Self::Item> {
    if self.front >= self.back {
      return None;
    }
    self.front += 1;
    self.view.flow_at(self.front - 1)
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    let n = self.back - self.front;
    (n, Some(n))
  }
}

impl DoubleEndedIterator for Iter<'_> {
  fn next_back(&mut self) -> Option<Self::Item> {
    if self.front >= self.back {
      return None;
    }
    self.back -= 1;
    self.view.flow_at(self.back)
  }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a View {
  type Item = &'a Flow;
  type IntoIter = Iter<'a>;

  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Request;

  fn flow(start: f64) -> Flow {
    Flow::new(Request::default().with_timestamp_start(start))
  }

  fn starts(view: &View) -> Vec<f64> {
    view.iter().map(|f| f.request.timestamp_start()).collect()
  }

  #[test]
  fn equal_keys_keep_arrival_order() {
    let mut view = View::new();
    let flows: Vec<Flow> = (0..4).map(|_| flow(1.0)).collect();
    let ids: Vec<FlowId> = flows.iter().map(Flow::id).collect();
    for f in flows {
      view.add(f);
    }
    let seen: Vec<FlowId> = view.iter().map(Flow::id).collect();
    assert_eq!(seen, ids);
    // an update that keeps the key keeps the slot
    assert!(view.update_with(&ids[1], |f| f.marked = true));
    assert_eq!(view.index_of(&ids[1]), Some(1));
  }

  #[test]
  fn update_moves_flow() {
    let mut view = View::new();
    let a = flow(1.0);
    let id = a.id();
    view.add(a);
    view.add(flow(2.0));
    view.add(flow(3.0));
    view.update_with(&id, |f| *f.request.timestamp_start_mut() = 10.0);
    assert_eq!(starts(&view), [2.0, 3.0, 10.0]);
    assert_eq!(view.index_of(&id), Some(2));
  }

  #[test]
  fn reversed_iteration_both_ends() {
    let mut view = View::new();
    for start in [2.0, 1.0, 3.0] {
      view.add(flow(start));
    }
    view.set_reversed(true);
    assert_eq!(starts(&view), [3.0, 2.0, 1.0]);
    let back: Vec<f64> = view
      .iter()
      .rev()
      .map(|f| f.request.timestamp_start())
      .collect();
    assert_eq!(back, [1.0, 2.0, 3.0]);
    assert_eq!(view.iter().len(), 3);
  }

  #[test]
  fn bisect_unknown_flow() {
    let mut view = View::new();
    for start in [1.0, 2.0, 2.0, 3.0] {
      view.add(flow(start));
    }
    assert_eq!(view.bisect(&flow(2.0)), 3);
    assert_eq!(view.bisect(&flow(0.5)), 0);
    view.set_reversed(true);
    assert_eq!(view.bisect(&flow(2.0)), 1);
    assert_eq!(view.bisect(&flow(0.5)), 4);
    assert_eq!(view.len(), 4);
  }

  #[test]
  fn index_bounds() {
    let mut view = View::new();
    assert!(matches!(
      view.get(0),
      Err(Error::IndexOutOfRange { index: 0, len: 0 })
    ));
    view.add(flow(1.0));
    view.add(flow(2.0));
    assert_eq!(view.get(-1).unwrap().request.timestamp_start(), 2.0);
    assert_eq!(view.get(-2).unwrap().request.timestamp_start(), 1.0);
    assert!(view.get(-3).is_err());
    assert!(view.get(2).is_err());
  }
}
