//! view error
use crate::flow::FlowId;
use thiserror::Error as ThisError;
/// A `Result` alias where the `Err` case is `flowview::Error`.
pub type Result<T> = std::result::Result<T, Error>;
/// The Errors that may occur when driving a `View`.
#[derive(ThisError, Debug)]
pub enum Error {
  /// The filter expression did not compile
  #[error("invalid interception filter: {expr:?}: {reason}")]
  InvalidFilter {
    /// offending expression
    expr: String,
    /// why it was rejected
    reason: String,
  },
  /// The order name is not one of the known strategies
  #[error("unknown flow order: {0:?}")]
  UnknownOrder(String),
  /// Index outside `[-len, len)`
  #[error("index {index} out of range for view of length {len}")]
  IndexOutOfRange {
    /// requested index
    index: isize,
    /// view length at the time of the request
    len: usize,
  },
  /// No settings are registered for this flow
  #[error("no settings for flow {0}")]
  SettingsNotFound(FlowId),
  /// The flow is not in the visible set
  #[error("flow {0} is not visible in the view")]
  InvalidFocus(FlowId),
  /// A focus was used with a view it is not bound to
  #[error("focus is bound to another view")]
  ForeignView,
}

pub(crate) fn invalid_filter(expr: &str, reason: impl Into<String>) -> Error {
  Error::InvalidFilter {
    expr: expr.to_string(),
    reason: reason.into(),
  }
}
