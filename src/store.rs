use std::collections::HashMap;

use crate::order::SortKey;
use crate::{Flow, FlowId};

/// A stored flow plus the bookkeeping the view needs to find it again.
#[derive(Debug)]
pub(crate) struct Slot {
  pub(crate) flow: Flow,
  /// insertion sequence, breaks ties between equal sort keys
  pub(crate) seq: u64,
  /// the sort key it is filed under while visible
  pub(crate) visible: Option<SortKey>,
}

/// Every flow the view tracks, regardless of filter.
#[derive(Debug, Default)]
pub struct FlowStore {
  slots: HashMap<FlowId, Slot>,
  next_seq: u64,
}

impl FlowStore {
  /// An empty store.
  pub fn new() -> Self {
    Self::default()
  }
  /// Number of tracked flows.
  pub fn len(&self) -> usize {
    self.slots.len()
  }
  /// Whether no flow is tracked.
  pub fn is_empty(&self) -> bool {
    self.slots.is_empty()
  }
  /// Whether `id` is tracked.
  pub fn contains(&self, id: &FlowId) -> bool {
    self.slots.contains_key(id)
  }
  /// The tracked flow with this id.
  pub fn get(&self, id: &FlowId) -> Option<&Flow> {
    self.slots.get(id).map(|s| &s.flow)
  }
  /// All tracked flows, in no particular order.
  pub fn iter(&self) -> impl Iterator<Item = &Flow> {
    self.slots.values().map(|s| &s.flow)
  }

  /// Track `flow`, returning its insertion sequence. An id that is already
  /// tracked keeps its slot.
  pub(crate) fn insert(&mut self, flow: Flow, visible: Option<SortKey>) -> u64 {
    let seq = self.next_seq;
    self.next_seq += 1;
    self
      .slots
      .entry(flow.id())
      .or_insert_with(|| Slot {
        flow,
        seq,
        visible,
      })
      .seq
  }
  pub(crate) fn slot(&self, id: &FlowId) -> Option<&Slot> {
    self.slots.get(id)
  }
  pub(crate) fn slot_mut(&mut self, id: &FlowId) -> Option<&mut Slot> {
    self.slots.get_mut(id)
  }
  pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = &mut Slot> {
    self.slots.values_mut()
  }
  pub(crate) fn remove(&mut self, id: &FlowId) -> Option<Slot> {
    self.slots.remove(id)
  }
  pub(crate) fn clear(&mut self) -> Vec<Flow> {
    self.slots.drain().map(|(_, s)| s.flow).collect()
  }
}
