use std::fmt;

use crate::{Request, Response};

/// Stable identity of a flow, unique for the lifetime of the process.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlowId(uuid::Uuid);

impl FlowId {
  /// A fresh random id.
  pub fn new() -> Self {
    FlowId(uuid::Uuid::new_v4())
  }
  /// The underlying uuid.
  pub fn as_uuid(&self) -> &uuid::Uuid {
    &self.0
  }
}

impl Default for FlowId {
  fn default() -> Self {
    Self::new()
  }
}

impl From<uuid::Uuid> for FlowId {
  fn from(value: uuid::Uuid) -> Self {
    FlowId(value)
  }
}

impl fmt::Display for FlowId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&self.0, f)
  }
}

/// One request/response exchange observed by the proxy.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Flow {
  id: FlowId,
  /// request
  pub request: Request,
  /// response, once the server answered
  pub response: Option<Response>,
  /// connection or protocol error
  pub error: Option<String>,
  /// user mark used by bulk operations
  pub marked: bool,
}

impl Flow {
  /// A new flow for `request` with a fresh identity.
  pub fn new(request: Request) -> Self {
    Flow {
      id: FlowId::new(),
      request,
      response: None,
      error: None,
      marked: false,
    }
  }
  /// Attach a response.
  pub fn with_response(mut self, response: Response) -> Self {
    self.response = Some(response);
    self
  }
  /// The flow identity.
  #[inline]
  pub fn id(&self) -> FlowId {
    self.id
  }
  /// Combined request and response body size.
  pub fn size(&self) -> usize {
    self.request.content_len() + self.response.as_ref().map_or(0, |r| r.content_len())
  }
}

impl From<Request> for Flow {
  fn from(value: Request) -> Self {
    Flow::new(value)
  }
}
