use http::Request as HttpRequest;
use http::{HeaderMap, HeaderValue, Method, Version};

use crate::body::Body;

/// The request half of a captured flow.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Request {
  #[cfg_attr(feature = "serde", serde(with = "http_serde::uri"))]
  uri: http::Uri,
  #[cfg_attr(feature = "serde", serde(with = "http_serde::version"))]
  version: Version,
  #[cfg_attr(feature = "serde", serde(with = "http_serde::method"))]
  method: Method,
  #[cfg_attr(feature = "serde", serde(with = "http_serde::header_map"))]
  headers: HeaderMap<HeaderValue>,
  body: Option<Body>,
  timestamp_start: f64,
  timestamp_end: Option<f64>,
}

impl Default for Request {
  fn default() -> Self {
    Request {
      uri: http::Uri::default(),
      version: Version::HTTP_11,
      method: Method::GET,
      headers: HeaderMap::new(),
      body: None,
      timestamp_start: 0.0,
      timestamp_end: None,
    }
  }
}

impl<T> From<HttpRequest<T>> for Request
where
  T: Into<Body>,
{
  fn from(value: HttpRequest<T>) -> Self {
    let (parts, body) = value.into_parts();
    let body = body.into();
    Self {
      uri: parts.uri,
      version: parts.version,
      method: parts.method,
      headers: parts.headers,
      body: if body.is_empty() { None } else { Some(body) },
      ..Request::default()
    }
  }
}

impl Request {
  /// Creates a new builder-style object to manufacture a `Request`
  ///
  /// # Examples
  ///
  /// ```
  /// let request: flowview::Request = flowview::Request::builder()
  ///     .method("PUT")
  ///     .uri("http://example.com/upload")
  ///     .body(())
  ///     .unwrap()
  ///     .into();
  /// assert_eq!(request.method(), http::Method::PUT);
  /// ```
  pub fn builder() -> http::request::Builder {
    http::request::Builder::new()
  }
  /// Set the start timestamp, in seconds.
  pub fn with_timestamp_start(mut self, timestamp: f64) -> Self {
    self.timestamp_start = timestamp;
    self
  }
}

impl Request {
  /// The HTTP method.
  #[inline]
  pub fn method(&self) -> &Method {
    &self.method
  }
  /// Mutable access to the HTTP method.
  #[inline]
  pub fn method_mut(&mut self) -> &mut Method {
    &mut self.method
  }
  /// The request target.
  #[inline]
  pub fn uri(&self) -> &http::Uri {
    &self.uri
  }
  /// Mutable access to the request target.
  #[inline]
  pub fn uri_mut(&mut self) -> &mut http::Uri {
    &mut self.uri
  }
  /// The request headers.
  #[inline]
  pub fn headers(&self) -> &HeaderMap {
    &self.headers
  }
  /// Mutable access to the request headers.
  #[inline]
  pub fn headers_mut(&mut self) -> &mut HeaderMap {
    &mut self.headers
  }
  /// The captured body, if any.
  #[inline]
  pub fn body(&self) -> Option<&Body> {
    self.body.as_ref()
  }
  /// Mutable access to the captured body.
  #[inline]
  pub fn body_mut(&mut self) -> &mut Option<Body> {
    &mut self.body
  }
  /// The HTTP version.
  #[inline]
  pub fn version(&self) -> Version {
    self.version
  }
  /// Mutable access to the HTTP version.
  #[inline]
  pub fn version_mut(&mut self) -> &mut Version {
    &mut self.version
  }
  /// Seconds since the epoch at which the request began.
  #[inline]
  pub fn timestamp_start(&self) -> f64 {
    self.timestamp_start
  }
  /// Mutable access to the start timestamp.
  #[inline]
  pub fn timestamp_start_mut(&mut self) -> &mut f64 {
    &mut self.timestamp_start
  }
  /// Seconds since the epoch at which the request was fully read.
  #[inline]
  pub fn timestamp_end(&self) -> Option<f64> {
    self.timestamp_end
  }
  /// Mutable access to the end timestamp.
  #[inline]
  pub fn timestamp_end_mut(&mut self) -> &mut Option<f64> {
    &mut self.timestamp_end
  }
  /// Target host: the uri authority, or the `Host` header for origin-form
  /// requests.
  pub fn host(&self) -> Option<&str> {
    self.uri.host().or_else(|| {
      self
        .headers
        .get(http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(|h| h.rsplit_once(':').map_or(h, |(host, _port)| host))
    })
  }
  /// Absolute url for display and matching.
  pub fn pretty_url(&self) -> String {
    if self.uri.host().is_some() {
      return self.uri.to_string();
    }
    let path = self
      .uri
      .path_and_query()
      .map(|p| p.as_str())
      .unwrap_or("/");
    match self.host() {
      Some(host) => format!("http://{}{}", host, path),
      None => path.to_string(),
    }
  }
  /// Body length in bytes, as captured.
  pub fn content_len(&self) -> usize {
    self.body.as_ref().map_or(0, |b| b.len())
  }
  /// Decoded body text, empty when there is no body.
  pub fn text(&self) -> String {
    self
      .body
      .as_ref()
      .map(|b| b.text(&self.headers))
      .unwrap_or_default()
  }
}
