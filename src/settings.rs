use std::collections::{BTreeMap, HashMap};

use crate::errors::{Error, Result};
use crate::FlowId;

/// Free-form annotations attached to one flow (bookmarks, comments, ...).
pub type Settings = BTreeMap<String, String>;

/// Per-flow annotation side table.
///
/// Entries are created on first write and dropped when their flow leaves
/// the view's store. Reads never create entries.
#[derive(Debug, Default, Clone)]
pub struct SettingsStore {
  entries: HashMap<FlowId, Settings>,
}

impl SettingsStore {
  /// An empty store.
  pub fn new() -> Self {
    Self::default()
  }
  /// Annotations of `id`, failing with `SettingsNotFound` if none were ever
  /// written.
  pub fn get(&self, id: &FlowId) -> Result<&Settings> {
    self.entries.get(id).ok_or(Error::SettingsNotFound(*id))
  }
  /// Mutable annotations of an already registered flow.
  pub fn get_mut(&mut self, id: &FlowId) -> Result<&mut Settings> {
    self.entries.get_mut(id).ok_or(Error::SettingsNotFound(*id))
  }
  /// Annotations of `id`, created empty on first access.
  pub fn get_or_create(&mut self, id: FlowId) -> &mut Settings {
    self.entries.entry(id).or_default()
  }
  /// Whether `id` has an entry.
  pub fn contains(&self, id: &FlowId) -> bool {
    self.entries.contains_key(id)
  }
  /// Registered flow ids.
  pub fn keys(&self) -> impl Iterator<Item = &FlowId> {
    self.entries.keys()
  }
  /// Registered flow ids with their annotations.
  pub fn iter(&self) -> impl Iterator<Item = (&FlowId, &Settings)> {
    self.entries.iter()
  }
  /// Number of registered flows.
  pub fn len(&self) -> usize {
    self.entries.len()
  }
  /// Whether nothing is registered.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
  /// Drop the entry of `id`.
  pub fn remove(&mut self, id: &FlowId) -> Option<Settings> {
    self.entries.remove(id)
  }
  /// Drop every entry.
  pub fn clear(&mut self) {
    self.entries.clear();
  }
}

impl<'a> IntoIterator for &'a SettingsStore {
  type Item = &'a FlowId;
  type IntoIter = std::collections::hash_map::Keys<'a, FlowId, Settings>;

  fn into_iter(self) -> Self::IntoIter {
    self.entries.keys()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn untouched_is_distinct_from_empty() {
    let mut store = SettingsStore::new();
    let id = FlowId::new();
    assert!(matches!(store.get(&id), Err(Error::SettingsNotFound(missing)) if missing == id));
    assert!(store.get_mut(&id).is_err());
    assert!(store.is_empty());

    store.get_or_create(id);
    assert!(store.get(&id).unwrap().is_empty());
    assert_eq!(store.len(), 1);

    store.get_mut(&id).unwrap().insert("comment".into(), "slow".into());
    assert_eq!(store.get(&id).unwrap()["comment"], "slow");
    assert_eq!((&store).into_iter().count(), 1);
    assert!(store.remove(&id).is_some());
    assert!(!store.contains(&id));
  }
}
