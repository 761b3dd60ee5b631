use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;

use bytes::Bytes;
#[cfg(feature = "charset")]
use encoding_rs::{Encoding, UTF_8};
#[cfg(feature = "gzip")]
use flate2::read::MultiGzDecoder;
use http::HeaderMap;
#[cfg(feature = "charset")]
use mime::Mime;
#[cfg(feature = "gzip")]
use std::io::Read;

/// The captured bytes of a request or response body, as seen on the wire.
#[derive(Clone, Default, PartialEq)]
pub struct Body {
  inner: Bytes,
}

impl Deref for Body {
  type Target = Bytes;

  fn deref(&self) -> &Self::Target {
    &self.inner
  }
}

impl From<Bytes> for Body {
  #[inline]
  fn from(b: Bytes) -> Body {
    Body { inner: b }
  }
}

impl From<String> for Body {
  #[inline]
  fn from(s: String) -> Body {
    s.into_bytes().into()
  }
}

impl From<&'static str> for Body {
  #[inline]
  fn from(s: &'static str) -> Body {
    Body {
      inner: Bytes::from_static(s.as_bytes()),
    }
  }
}

impl From<&'static [u8]> for Body {
  #[inline]
  fn from(s: &'static [u8]) -> Body {
    Body {
      inner: Bytes::from_static(s),
    }
  }
}

impl From<Vec<u8>> for Body {
  #[inline]
  fn from(v: Vec<u8>) -> Body {
    Body { inner: v.into() }
  }
}

impl From<()> for Body {
  #[inline]
  fn from(_: ()) -> Body {
    Body::default()
  }
}

impl Body {
  /// Raw body with `Content-Encoding` removed.
  ///
  /// Only `gzip` is understood, and only with the `gzip` feature. Anything
  /// that cannot be decoded is returned untouched.
  pub fn decoded(&self, headers: &HeaderMap) -> Cow<'_, [u8]> {
    #[cfg(feature = "gzip")]
    if let Some(ce) = headers.get(http::header::CONTENT_ENCODING) {
      if ce == "gzip" {
        let mut gzip_body = Vec::new();
        let mut d = MultiGzDecoder::new(&self.inner[..]);
        match d.read_to_end(&mut gzip_body) {
          Ok(_) => return Cow::Owned(gzip_body),
          Err(err) => tracing::trace!("gzip body left encoded: {}", err),
        }
      }
    }
    #[cfg(not(feature = "gzip"))]
    let _ = headers;
    Cow::Borrowed(&self.inner[..])
  }

  /// Decoded body as text.
  ///
  /// The charset comes from the `Content-Type` header when the `charset`
  /// feature is enabled; otherwise the bytes are read as lossy UTF-8.
  pub fn text(&self, headers: &HeaderMap) -> String {
    let body = self.decoded(headers);
    #[cfg(feature = "charset")]
    {
      let header_encoding = headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<Mime>().ok())
        .and_then(|mime| mime.get_param("charset").map(|charset| charset.to_string()));
      if let Some(label) = header_encoding {
        let encoding = Encoding::for_label(label.as_bytes()).unwrap_or(UTF_8);
        let (text, _, _) = encoding.decode(&body);
        return text.into_owned();
      }
    }
    String::from_utf8_lossy(&body).into_owned()
  }
}

impl fmt::Debug for Body {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match std::str::from_utf8(&self.inner) {
      Ok(s) => fmt::Debug::fmt(s, f),
      Err(_err) => fmt::Debug::fmt(&self.inner, f),
    }
  }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Body {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_bytes(&self.inner)
  }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Body {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: serde::Deserializer<'de>,
  {
    let s = Vec::<u8>::deserialize(deserializer)?;
    Ok(Body::from(s))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn text_without_encoding_is_lossy_utf8() {
    let body = Body::from(vec![b'h', b'i', 0xff]);
    assert_eq!(body.text(&HeaderMap::new()), "hi\u{fffd}");
  }

  #[cfg(feature = "gzip")]
  #[test]
  fn gzip_bodies_are_decoded() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"compressed payload").unwrap();
    let body = Body::from(encoder.finish().unwrap());
    let mut headers = HeaderMap::new();
    headers.insert(
      http::header::CONTENT_ENCODING,
      http::HeaderValue::from_static("gzip"),
    );
    assert_eq!(body.text(&headers), "compressed payload");
  }

  #[cfg(feature = "charset")]
  #[test]
  fn charset_from_content_type() {
    let body = Body::from(vec![0xe9]);
    let mut headers = HeaderMap::new();
    headers.insert(
      http::header::CONTENT_TYPE,
      http::HeaderValue::from_static("text/plain; charset=latin1"),
    );
    assert_eq!(body.text(&headers), "é");
  }
}
