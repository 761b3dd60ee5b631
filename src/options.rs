//! Configuration of the view and its addons

/// Options consumed by `View::configure` and `StickyAuth::configure`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct Options {
  /// Filter expression limiting the visible flows; `None` shows everything
  pub filter: Option<String>,
  /// Name of the flow order: time, method, url, size or status
  pub order: String,
  /// Present the order back to front
  pub order_reversed: bool,
  /// Filter selecting requests whose Authorization header is replayed
  pub stickyauth: Option<String>,
}

impl Default for Options {
  fn default() -> Self {
    Self {
      filter: None,
      order: "time".to_string(),
      order_reversed: false,
      stickyauth: None,
    }
  }
}

impl Options {
  /// Set the view filter expression.
  pub fn with_filter<S: Into<String>>(mut self, filter: S) -> Self {
    self.filter = Some(filter.into());
    self
  }
  /// Set the flow order by name.
  pub fn with_order<S: Into<String>>(mut self, order: S) -> Self {
    self.order = order.into();
    self
  }
  /// Present the order back to front.
  pub fn with_order_reversed(mut self, reversed: bool) -> Self {
    self.order_reversed = reversed;
    self
  }
  /// Enable sticky authentication for requests matching `filter`.
  pub fn with_stickyauth<S: Into<String>>(mut self, filter: S) -> Self {
    self.stickyauth = Some(filter.into());
    self
  }
}
