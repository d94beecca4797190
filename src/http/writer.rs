use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::headers::HeaderMap;
use crate::http::request::Method;
use crate::http::response::{Response, StatusCode};

const HTTP_VERSION: &str = "HTTP/1.1";

/// Serializes a response.
///
/// `Content-Length` (from the body) and `Content-Type: text/html` are always
/// written first; caller headers replace them by name and are otherwise
/// appended in the caller's order.
pub fn encode_response(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Vec<u8> {
    let mut all = HeaderMap::new();
    all.insert("Content-Length", body.len().to_string());
    all.insert("Content-Type", "text/html");
    all.extend_from(headers);

    let status_line = format!(
        "{} {} {}",
        HTTP_VERSION,
        status.as_u16(),
        status.reason_phrase()
    );
    encode_message(&status_line, &all, body)
}

/// Serializes a request.
///
/// `Host`, `Content-Length` and `Connection: close` are injected and can be
/// overridden by `headers` the same way as for responses.
pub fn encode_request(
    method: &Method,
    path: &str,
    host: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Vec<u8> {
    let mut all = HeaderMap::new();
    all.insert("Host", host);
    all.insert("Content-Length", body.len().to_string());
    all.insert("Connection", "close");
    all.extend_from(headers);

    let path = if path.is_empty() { "/" } else { path };
    let request_line = format!("{} {} {}", method, path, HTTP_VERSION);
    encode_message(&request_line, &all, body)
}

fn encode_message(start_line: &str, headers: &HeaderMap, body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(start_line.len() + 128 + body.len());

    buf.extend_from_slice(start_line.as_bytes());
    buf.extend_from_slice(b"\r\n");

    for (k, v) in headers.iter() {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf.extend_from_slice(body);
    buf
}

impl Response {
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(encode_response(self.status, &self.headers, &self.body))
    }
}

/// Writes a serialized response, tracking how much has gone out.
pub struct ResponseWriter {
    buffer: Bytes,
    written: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self::from_bytes(response.to_bytes())
    }

    /// Wraps an already serialized response, e.g. a canned page.
    pub fn from_bytes(buffer: Bytes) -> Self {
        Self { buffer, written: 0 }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        stream.flush().await?;
        Ok(())
    }
}
