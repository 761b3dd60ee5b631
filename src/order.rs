use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, Result};
use crate::Flow;

/// A named strategy that orders flows in a `View`.
///
/// - `time` orders by request start time (the default).
/// - `method` orders by request method name.
/// - `url` orders by the absolute request url.
/// - `size` orders by request plus response body size.
/// - `status` orders by response status, flows without one first.
///
/// Equal keys keep the order in which flows entered the view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OrderKey {
  /// Request start time
  #[default]
  Time,
  /// Request method
  Method,
  /// Request url
  Url,
  /// Request + response body size
  Size,
  /// Response status code
  Status,
}

impl OrderKey {
  /// Every strategy, in the order they are offered to users.
  pub const ALL: [OrderKey; 5] = [
    OrderKey::Time,
    OrderKey::Method,
    OrderKey::Url,
    OrderKey::Size,
    OrderKey::Status,
  ];

  /// The configuration name of this strategy.
  pub fn name(&self) -> &'static str {
    match self {
      OrderKey::Time => "time",
      OrderKey::Method => "method",
      OrderKey::Url => "url",
      OrderKey::Size => "size",
      OrderKey::Status => "status",
    }
  }

  /// Compute the sort key of `flow` under this strategy.
  pub fn key(&self, flow: &Flow) -> SortKey {
    match self {
      OrderKey::Time => SortKey::Float(flow.request.timestamp_start()),
      OrderKey::Method => SortKey::Text(flow.request.method().as_str().to_string()),
      OrderKey::Url => SortKey::Text(flow.request.pretty_url()),
      OrderKey::Size => SortKey::Int(flow.size() as u64),
      OrderKey::Status => SortKey::Int(
        flow
          .response
          .as_ref()
          .map_or(0, |r| r.status_code().as_u16() as u64),
      ),
    }
  }
}

impl FromStr for OrderKey {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    OrderKey::ALL
      .into_iter()
      .find(|k| k.name() == s)
      .ok_or_else(|| Error::UnknownOrder(s.to_string()))
  }
}

impl fmt::Display for OrderKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// A totally ordered key produced by an `OrderKey`.
///
/// Floats compare with `f64::total_cmp`. Keys of different kinds never meet
/// inside one view, they fall back to comparing the kind.
#[derive(Clone, Debug)]
pub enum SortKey {
  /// integer key
  Int(u64),
  /// floating point key
  Float(f64),
  /// text key
  Text(String),
}

impl SortKey {
  fn rank(&self) -> u8 {
    match self {
      SortKey::Int(_) => 0,
      SortKey::Float(_) => 1,
      SortKey::Text(_) => 2,
    }
  }
}

impl Ord for SortKey {
  fn cmp(&self, other: &Self) -> Ordering {
    match (self, other) {
      (SortKey::Int(a), SortKey::Int(b)) => a.cmp(b),
      (SortKey::Float(a), SortKey::Float(b)) => a.total_cmp(b),
      (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
      _ => self.rank().cmp(&other.rank()),
    }
  }
}

impl PartialOrd for SortKey {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl PartialEq for SortKey {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for SortKey {}
