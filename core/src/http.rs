//! Request and response descriptors shared by every executor.
//!
//! # Design
//! `HttpRequest` is validated when it is built and never changes afterwards:
//! its fields are private and the builder methods consume `self`. Executors
//! only ever see it through `&HttpRequest`.
//!
//! `HttpResponse` carries its body as a lazily read [`Body`]. Nothing is read
//! from the network until the caller drains it, and the draining methods take
//! `self` so a body is consumed at most once.

use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{BodyError, ConstructionError};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
    Patch,
}

impl HttpMethod {
    /// The upper-case name used on the request line.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Connect => "CONNECT",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ConstructionError;

    /// Method names are case-sensitive on the wire, so `get` is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "HEAD" => Ok(HttpMethod::Head),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "CONNECT" => Ok(HttpMethod::Connect),
            "OPTIONS" => Ok(HttpMethod::Options),
            "TRACE" => Ok(HttpMethod::Trace),
            "PATCH" => Ok(HttpMethod::Patch),
            other => Err(ConstructionError::InvalidMethod(other.to_string())),
        }
    }
}

impl From<HttpMethod> for http::Method {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Head => http::Method::HEAD,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Delete => http::Method::DELETE,
            HttpMethod::Connect => http::Method::CONNECT,
            HttpMethod::Options => http::Method::OPTIONS,
            HttpMethod::Trace => http::Method::TRACE,
            HttpMethod::Patch => http::Method::PATCH,
        }
    }
}

impl TryFrom<&http::Method> for HttpMethod {
    type Error = ConstructionError;

    fn try_from(m: &http::Method) -> Result<Self, Self::Error> {
        m.as_str().parse()
    }
}

/// An outbound HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    method: HttpMethod,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Build a request with no headers and no body.
    ///
    /// `url` must be absolute (`scheme://host/...`); anything else fails
    /// before an executor is ever involved.
    pub fn new(method: HttpMethod, url: &str) -> Result<Self, ConstructionError> {
        let parsed = Url::parse(url).map_err(|source| ConstructionError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ConstructionError::RelativeUrl(url.to_string()));
        }
        Ok(Self {
            method,
            url: parsed,
            headers: HeaderMap::new(),
            body: None,
        })
    }

    /// Shorthand for `HttpRequest::new(HttpMethod::Get, url)`.
    pub fn get(url: &str) -> Result<Self, ConstructionError> {
        Self::new(HttpMethod::Get, url)
    }

    /// Parse the method from its wire name, then build the request.
    pub fn parse(method: &str, url: &str) -> Result<Self, ConstructionError> {
        Self::new(method.parse()?, url)
    }

    /// Append a header value. Repeated names keep every value in order.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ConstructionError> {
        let (name, value) = parse_header(name, value)?;
        self.headers.append(name, value);
        Ok(self)
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of the header `name` (case-insensitive), if it is valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Every value of the header `name`, in insertion order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ConstructionError> {
    let parsed_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ConstructionError::InvalidHeaderName(name.to_string()))?;
    let parsed_value = HeaderValue::from_str(value)
        .map_err(|_| ConstructionError::InvalidHeaderValue(value.to_string()))?;
    Ok((parsed_name, parsed_value))
}

/// A single-pass response body.
pub struct Body {
    reader: Box<dyn Read + Send>,
}

impl Body {
    pub fn empty() -> Self {
        Self::from_bytes(Vec::new())
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::from_reader(io::Cursor::new(bytes.into()))
    }

    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self {
            reader: Box::new(reader),
        }
    }

    /// Drain the remaining bytes.
    pub fn into_bytes(mut self) -> Result<Vec<u8>, BodyError> {
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Drain the remaining bytes as UTF-8 text.
    pub fn into_string(mut self) -> Result<String, BodyError> {
        let mut buf = String::new();
        self.reader.read_to_string(&mut buf)?;
        Ok(buf)
    }

    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, BodyError> {
        let bytes = self.into_bytes()?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body").finish_non_exhaustive()
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Body::from_bytes(s.as_bytes())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::from_bytes(s)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::from_bytes(bytes)
    }
}

/// An HTTP response whose body has not been read yet.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Body,
}

impl HttpResponse {
    /// A response with the canonical reason phrase for `status` and no headers.
    pub fn new(status: u16, body: impl Into<Body>) -> Self {
        Self {
            status,
            status_text: reason_phrase(status).to_string(),
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<Body>) -> Self {
        Self::new(200, body)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ConstructionError> {
        let (name, value) = parse_header(name, value)?;
        self.headers.append(name, value);
        Ok(self)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Consume the response and drain its body as text.
    pub fn text(self) -> Result<String, BodyError> {
        self.body.into_string()
    }

    pub fn bytes(self) -> Result<Vec<u8>, BodyError> {
        self.body.into_bytes()
    }

    pub fn json<T: DeserializeOwned>(self) -> Result<T, BodyError> {
        self.body.into_json()
    }
}

/// Canonical reason phrase, or an empty string for unregistered codes.
pub fn reason_phrase(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}
