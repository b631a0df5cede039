//! HTTP exchange observation
//!
//! An [`HttpObserver`] is handed to the transport at construction and sees
//! every attempt it makes: once before the request goes out and once after a
//! response (or a failure) comes back. Records own cheap `Bytes` clones of the
//! bodies, so observing never consumes what the transport itself reads.

use bytes::Bytes;

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Header never copied into a record.
pub const REDACTED_HEADER: &str = "Authorization";

/// Snapshot of an outgoing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    /// 1-based attempt number within one logical request
    pub attempt: u32,
    pub method: HttpMethod,
    pub url: String,
    /// Sorted by name, `Authorization` removed
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl RequestRecord {
    pub fn capture(request: &HttpRequest, attempt: u32) -> Self {
        Self {
            attempt,
            method: request.method,
            url: request.url.clone(),
            headers: sanitize_headers(request.headers.iter()),
            body: request.body.clone(),
        }
    }

    /// Body rendered for humans; pretty-printed when sent as JSON
    pub fn render_body(&self) -> String {
        match &self.body {
            Some(body) => format_body(body, is_json(&self.headers)),
            None => String::new(),
        }
    }

    /// Headers rendered one `Name: value` per line
    pub fn render_headers(&self) -> String {
        render_headers(&self.headers)
    }
}

/// Snapshot of a received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub attempt: u32,
    pub status: u16,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ResponseRecord {
    pub fn capture(response: &HttpResponse, url: &str, attempt: u32) -> Self {
        Self {
            attempt,
            status: response.status,
            url: url.to_string(),
            headers: sanitize_headers(response.headers.iter()),
            body: response.body.clone(),
        }
    }

    pub fn render_body(&self) -> String {
        format_body(&self.body, is_json(&self.headers))
    }

    pub fn render_headers(&self) -> String {
        render_headers(&self.headers)
    }
}

/// Receives a record for every attempt the transport makes.
pub trait HttpObserver: Send + Sync {
    fn on_request(&self, record: &RequestRecord);

    fn on_response(&self, record: &ResponseRecord);

    /// An attempt ended without a response
    fn on_failure(&self, attempt: u32, url: &str, error: &str) {
        let _ = (attempt, url, error);
    }
}

/// Copy headers minus `Authorization`, sorted so records are deterministic.
pub fn sanitize_headers<'a, I>(headers: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut out: Vec<(String, String)> = headers
        .into_iter()
        .filter(|(k, _)| !k.eq_ignore_ascii_case(REDACTED_HEADER))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    out.sort();
    out
}

/// Pretty-print JSON bodies; anything else (or broken JSON) is passed through.
pub fn format_body(body: &[u8], is_json: bool) -> String {
    if is_json {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
            if let Ok(pretty) = serde_json::to_string_pretty(&value) {
                return pretty;
            }
        }
    }
    String::from_utf8_lossy(body).into_owned()
}

fn is_json(headers: &[(String, String)]) -> bool {
    headers.iter().any(|(k, v)| {
        k.eq_ignore_ascii_case("Content-Type") && v.starts_with("application/json")
    })
}

fn render_headers(headers: &[(String, String)]) -> String {
    headers
        .iter()
        .map(|(k, v)| format!("{}: {}\n", k, v))
        .collect()
}
