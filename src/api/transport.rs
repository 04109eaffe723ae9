// HTTP plumbing. Components describe requests as plain values and hand them
// to a `Transport`; the reqwest-backed implementation adds TLS, the standard
// headers and gzip decoding, nothing else. One attempt per call.

use crate::error::{AurError, Result};
use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use std::borrow::Cow;
use std::io::Read;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// An outgoing request as built by the API components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        HttpRequest {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        HttpRequest {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// First value of a header, matched case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// A fully read response. `body` is always decompressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// The service signals a successful form submission with a 302.
    pub fn is_redirect(&self) -> bool {
        self.status == 302
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Sends one request and returns the complete response.
pub trait Transport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Transport over a blocking reqwest client. Redirects are not followed:
/// the 302 itself is the success signal for logins and uploads.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Result<Self> {
        Self::with_timeout(user_agent, None)
    }

    /// Build a transport whose calls are bounded by `timeout`. `None` means
    /// calls may take as long as the server does; reqwest's own 30 second
    /// default is switched off.
    pub fn with_timeout(user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()?;
        Ok(HttpTransport {
            client,
            user_agent: user_agent.to_string(),
        })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut req = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url).body(body),
        };
        req = req
            .header("user-agent", &self.user_agent)
            .header("accept-encoding", "gzip");
        for (name, value) in &headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let res = req.send()?;
        let status = res.status().as_u16();
        let headers: Vec<(String, String)> = res
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let raw = res.bytes()?;
        let body = decode_body(&headers, &raw)?;
        debug!(?method, %url, status, bytes = body.len(), "request complete");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Undo `content-encoding: gzip`; any other body is passed through as is.
pub fn decode_body(headers: &[(String, String)], raw: &[u8]) -> Result<Vec<u8>> {
    let gzipped = find_header(headers, "content-encoding")
        .is_some_and(|enc| enc.trim().eq_ignore_ascii_case("gzip"));
    if !gzipped {
        return Ok(raw.to_vec());
    }
    let mut out = Vec::new();
    GzDecoder::new(raw)
        .read_to_end(&mut out)
        .map_err(|e| AurError::Network(format!("failed to decompress response: {e}")))?;
    Ok(out)
}
