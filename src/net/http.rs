//! Blocking HTTP client wrapper.
//!
//! `get`/`post` return the response body as a string; TLS endpoints use
//! the ESP-IDF certificate bundle.  Includes the Telegram notification
//! helper the original deployment used for boot messages.
//!
//! Host builds record every request so tests can assert on the traffic
//! without a network.

use log::{info, warn};

use crate::error::NetError;

/// Upper bound on a buffered response body.
const MAX_RESPONSE_BYTES: usize = 4096;

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub body: String,
}

pub struct HttpClient {
    #[cfg(not(target_os = "espidf"))]
    requests: Vec<RecordedRequest>,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            requests: Vec::new(),
        }
    }

    /// Perform a GET and return the response body.
    pub fn get(&mut self, url: &str) -> Result<String, NetError> {
        self.request("GET", url, "")
    }

    /// Perform a POST with a JSON body and return the response body.
    pub fn post(&mut self, url: &str, body: &str) -> Result<String, NetError> {
        self.request("POST", url, body)
    }

    /// Send a message through the Telegram bot API.
    pub fn send_telegram_message(
        &mut self,
        token: &str,
        chat_id: &str,
        text: &str,
    ) -> Result<(), NetError> {
        let url = format!("https://api.telegram.org/bot{token}/sendMessage");
        let body = format!("{{\"chat_id\":\"{chat_id}\",\"text\":\"{text}\"}}");
        self.post(&url, &body).map(|_| ())
    }

    /// Requests recorded by the simulation backend (host builds only).
    #[cfg(not(target_os = "espidf"))]
    pub fn recorded(&self) -> &[RecordedRequest] {
        &self.requests
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn request(&mut self, method: &'static str, url: &str, body: &str) -> Result<String, NetError> {
        use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
        use esp_idf_svc::http::Method;

        let mut conn = EspHttpConnection::new(&Configuration {
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        })
        .map_err(|_| NetError::HttpRequestFailed)?;

        let (http_method, headers): (Method, &[(&str, &str)]) = match method {
            "POST" => (Method::Post, &[("content-type", "application/json")]),
            _ => (Method::Get, &[]),
        };

        conn.initiate_request(http_method, url, headers)
            .map_err(|_| NetError::HttpRequestFailed)?;
        let mut remaining = body.as_bytes();
        while !remaining.is_empty() {
            let written = conn
                .write(remaining)
                .map_err(|_| NetError::HttpRequestFailed)?;
            remaining = &remaining[written..];
        }
        conn.initiate_response().map_err(|_| NetError::HttpRequestFailed)?;

        let status = conn.status();
        let mut response = Vec::new();
        let mut chunk = [0u8; 256];
        loop {
            let n = conn.read(&mut chunk).map_err(|_| NetError::HttpRequestFailed)?;
            if n == 0 {
                break;
            }
            if response.len() + n > MAX_RESPONSE_BYTES {
                warn!("http: response truncated at {MAX_RESPONSE_BYTES} bytes");
                response.extend_from_slice(&chunk[..MAX_RESPONSE_BYTES - response.len()]);
                break;
            }
            response.extend_from_slice(&chunk[..n]);
        }

        info!("http: {method} {url} -> {status} ({} bytes)", response.len());
        Ok(String::from_utf8_lossy(&response).into_owned())
    }

    #[cfg(not(target_os = "espidf"))]
    fn request(&mut self, method: &'static str, url: &str, body: &str) -> Result<String, NetError> {
        info!("http(sim): {method} {url}");
        self.requests.push(RecordedRequest {
            method,
            url: url.to_owned(),
            body: body.to_owned(),
        });
        Ok(format!("{{\"simulated\":true,\"url\":\"{url}\"}}"))
    }
}
