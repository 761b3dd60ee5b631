use http::Response as HttpResponse;
use http::{HeaderMap, HeaderValue, StatusCode, Version};

use crate::body::Body;

/// The response half of a captured flow.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Response {
  #[cfg_attr(feature = "serde", serde(with = "http_serde::version"))]
  version: Version,
  #[cfg_attr(feature = "serde", serde(with = "http_serde::status_code"))]
  status_code: StatusCode,
  #[cfg_attr(feature = "serde", serde(with = "http_serde::header_map"))]
  headers: HeaderMap<HeaderValue>,
  body: Option<Body>,
  timestamp_start: f64,
  timestamp_end: Option<f64>,
}

impl PartialEq for Response {
  fn eq(&self, other: &Self) -> bool {
    self.version == other.version
      && self.status_code == other.status_code
      && self.headers == other.headers
      && self.body == other.body
  }
}

impl Default for Response {
  fn default() -> Self {
    Response {
      version: Version::HTTP_11,
      status_code: StatusCode::OK,
      headers: HeaderMap::new(),
      body: None,
      timestamp_start: 0.0,
      timestamp_end: None,
    }
  }
}

impl<T> From<HttpResponse<T>> for Response
where
  T: Into<Body>,
{
  fn from(value: HttpResponse<T>) -> Self {
    let (parts, body) = value.into_parts();
    let body = body.into();
    Self {
      version: parts.version,
      status_code: parts.status,
      headers: parts.headers,
      body: if body.is_empty() { None } else { Some(body) },
      ..Response::default()
    }
  }
}

impl Response {
  /// An HTTP response builder
  ///
  /// This type can be used to construct an instance of `Response` through a
  /// builder-like pattern.
  pub fn builder() -> http::response::Builder {
    http::response::Builder::new()
  }
  /// Get the `StatusCode` of this `Response`.
  #[inline]
  pub fn status_code(&self) -> StatusCode {
    self.status_code
  }
  /// Mutable access to the status code.
  #[inline]
  pub fn status_code_mut(&mut self) -> &mut StatusCode {
    &mut self.status_code
  }
  /// Get the HTTP `Version` of this `Response`.
  #[inline]
  pub fn version(&self) -> Version {
    self.version
  }
  /// Get the `Headers` of this `Response`.
  #[inline]
  pub fn headers(&self) -> &HeaderMap {
    &self.headers
  }
  /// Get a mutable reference to the `Headers` of this `Response`.
  #[inline]
  pub fn headers_mut(&mut self) -> &mut HeaderMap {
    &mut self.headers
  }
  /// The captured body, if any.
  pub fn body(&self) -> Option<&Body> {
    self.body.as_ref()
  }
  /// Mutable access to the captured body.
  pub fn body_mut(&mut self) -> &mut Option<Body> {
    &mut self.body
  }
  /// Seconds since the epoch at which the first response byte arrived.
  #[inline]
  pub fn timestamp_start(&self) -> f64 {
    self.timestamp_start
  }
  /// Mutable access to the start timestamp.
  #[inline]
  pub fn timestamp_start_mut(&mut self) -> &mut f64 {
    &mut self.timestamp_start
  }
  /// Seconds since the epoch at which the response was complete.
  #[inline]
  pub fn timestamp_end(&self) -> Option<f64> {
    self.timestamp_end
  }
  /// Mutable access to the end timestamp.
  #[inline]
  pub fn timestamp_end_mut(&mut self) -> &mut Option<f64> {
    &mut self.timestamp_end
  }
  /// Get the content-length of the response, if it is known.
  ///
  /// This is the header value, the captured body may differ from it.
  pub fn content_length(&self) -> Option<u64> {
    self
      .headers
      .get(http::header::CONTENT_LENGTH)
      .and_then(|x| x.to_str().ok()?.parse().ok())
  }
  /// Body length in bytes, as captured.
  pub fn content_len(&self) -> usize {
    self.body.as_ref().map_or(0, |b| b.len())
  }
  /// Get the response text.
  ///
  /// The body is gzip-decoded with the `gzip` feature and charset-decoded
  /// with the `charset` feature; otherwise it is read as lossy UTF-8.
  pub fn text(&self) -> String {
    self
      .body
      .as_ref()
      .map(|b| b.text(&self.headers))
      .unwrap_or_default()
  }
}
