use http::header::AUTHORIZATION;
use http::HeaderValue;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::errors::Result;
use crate::filter::{Filter, Matcher};
use crate::options::Options;
use crate::Flow;

/// Replays the last `Authorization` header seen for a host on later requests
/// to the same host that lack one.
///
/// Only requests matching the configured filter take part; without a filter
/// the addon does nothing.
#[derive(Debug, Default)]
pub struct StickyAuth {
  filter: Option<Filter>,
  hosts: RwLock<HashMap<String, HeaderValue>>,
}

impl StickyAuth {
  /// An inert addon.
  pub fn new() -> Self {
    Self::default()
  }

  /// Pick up the `stickyauth` filter from `options`.
  ///
  /// A rejected expression leaves the previous filter in place.
  pub fn configure(&mut self, options: &Options) -> Result<()> {
    self.filter = match options.stickyauth.as_deref() {
      None => None,
      Some(expr) => Some(Filter::parse(expr).inspect_err(|err| {
        tracing::warn!("stickyauth: {}", err);
      })?),
    };
    Ok(())
  }

  /// Handle a new request: remember its credentials, or lend it the ones
  /// remembered for its host.
  pub fn request(&self, flow: &mut Flow) {
    let Some(filter) = &self.filter else {
      return;
    };
    if !filter.matches(flow) {
      return;
    }
    let Some(host) = flow.request.host().map(str::to_owned) else {
      return;
    };
    let headers = flow.request.headers_mut();
    match headers.get(AUTHORIZATION) {
      Some(value) => {
        tracing::debug!(%host, "stickyauth: captured authorization");
        self
          .hosts
          .write()
          .unwrap_or_else(PoisonError::into_inner)
          .insert(host, value.clone());
      }
      None => {
        let hosts = self.hosts.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = hosts.get(&host) {
          tracing::debug!(%host, "stickyauth: replayed authorization");
          headers.insert(AUTHORIZATION, value.clone());
        }
      }
    }
  }

  /// Whether credentials are remembered for `host`.
  pub fn contains_host(&self, host: &str) -> bool {
    self
      .hosts
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .contains_key(host)
  }

  /// The remembered header for `host`.
  pub fn header_for(&self, host: &str) -> Option<HeaderValue> {
    self
      .hosts
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(host)
      .cloned()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Request;

  #[test]
  fn inert_without_filter() {
    let auth = StickyAuth::new();
    let request: Request = Request::builder()
      .uri("http://example.com/")
      .header("authorization", "secret")
      .body(())
      .unwrap()
      .into();
    let mut flow = Flow::new(request);
    auth.request(&mut flow);
    assert!(!auth.contains_host("example.com"));
  }

  #[test]
  fn bad_filter_keeps_previous() {
    let mut auth = StickyAuth::new();
    auth
      .configure(&Options::default().with_stickyauth(".*"))
      .unwrap();
    assert!(auth
      .configure(&Options::default().with_stickyauth("~~"))
      .is_err());
    assert!(auth.filter.is_some());
    auth.configure(&Options::default()).unwrap();
    assert!(auth.filter.is_none());
  }
}
