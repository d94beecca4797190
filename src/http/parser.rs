use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::headers::HeaderMap;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, StatusCode};

const DELIMITER: &[u8] = b"\r\n\r\n";
const READ_CHUNK: usize = 4096;

/// Upper bound on the bytes buffered while looking for the end of the head.
pub const MAX_HEAD_BYTES: usize = 64 * 1024;

#[derive(Debug)]
pub enum DecodeError {
    /// The stream closed before a full message was framed.
    EndOfStream,
    /// No header delimiter within `MAX_HEAD_BYTES`.
    HeadTooLarge,
    /// The head was framed but its start line could not be understood.
    Malformed(&'static str),
    Io(std::io::Error),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::EndOfStream => write!(f, "stream closed before message was complete"),
            DecodeError::HeadTooLarge => {
                write!(f, "message head exceeds {} bytes", MAX_HEAD_BYTES)
            }
            DecodeError::Malformed(reason) => write!(f, "malformed message: {}", reason),
            DecodeError::Io(e) => write!(f, "i/o error while reading message: {}", e),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(e: std::io::Error) -> Self {
        DecodeError::Io(e)
    }
}

/// A framed HTTP message before it is interpreted as a request or response.
#[derive(Debug, Clone)]
pub struct Message {
    /// The first line of the head, without its line ending.
    pub start_line: String,
    pub headers: HeaderMap,
    /// Exactly `Content-Length` bytes.
    pub body: Vec<u8>,
}

impl Message {
    /// Interprets the start line as `method SP path SP version`.
    pub fn into_request(self) -> Result<Request, DecodeError> {
        let tokens: Vec<&str> = self.start_line.split_whitespace().collect();
        let &[method, path, version] = tokens.as_slice() else {
            return Err(DecodeError::Malformed("request line must have three fields"));
        };

        Ok(Request {
            method: Method::from_token(method),
            path: path.to_string(),
            version: version.to_string(),
            headers: self.headers,
            body: self.body,
        })
    }

    /// Interprets the start line as `version SP code SP reason`.
    pub fn into_response(self) -> Result<Response, DecodeError> {
        let mut parts = self.start_line.splitn(3, ' ');
        let _version = parts
            .next()
            .filter(|v| !v.is_empty())
            .ok_or(DecodeError::Malformed("empty status line"))?;
        let code = parts
            .next()
            .and_then(|c| c.trim().parse::<u16>().ok())
            .ok_or(DecodeError::Malformed("status code is not a number"))?;

        Ok(Response {
            status: StatusCode::from_u16(code),
            headers: self.headers,
            body: self.body,
        })
    }
}

pub fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(DELIMITER.len()).position(|w| w == DELIMITER)
}

/// Splits a head (without the trailing blank line) into its start line and
/// headers. Header lines are split on the first `": "`, names lower-cased;
/// lines without that separator are skipped.
pub fn parse_head(head: &[u8]) -> Result<(String, HeaderMap), DecodeError> {
    let text = std::str::from_utf8(head).map_err(|_| DecodeError::Malformed("head is not utf-8"))?;

    let mut lines = text.split("\r\n");
    let start_line = lines.next().unwrap_or_default().to_string();

    let mut headers = HeaderMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(": ") {
            headers.insert(name.to_ascii_lowercase(), value);
        }
    }

    Ok((start_line, headers))
}

/// Reads one message from `reader`.
///
/// Reads are accumulated until the blank line ending the head shows up, then
/// until `Content-Length` body bytes are buffered. Anything received past the
/// declared length is dropped with the buffer.
pub async fn read_message<R>(reader: &mut R) -> Result<Message, DecodeError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(READ_CHUNK);
    let mut scanned = 0;

    let head_end = loop {
        if let Some(pos) = find_headers_end(&buffer[scanned..]) {
            break scanned + pos;
        }
        // The delimiter may straddle two reads
        scanned = buffer.len().saturating_sub(DELIMITER.len() - 1);

        if buffer.len() > MAX_HEAD_BYTES {
            return Err(DecodeError::HeadTooLarge);
        }

        let n = reader.read_buf(&mut buffer).await?;
        if n == 0 {
            return Err(DecodeError::EndOfStream);
        }
    };

    let head = buffer.split_to(head_end);
    buffer.advance(DELIMITER.len());

    let (start_line, headers) = parse_head(&head)?;
    let content_length = headers.content_length();

    while buffer.len() < content_length {
        let n = reader.read_buf(&mut buffer).await?;
        if n == 0 {
            return Err(DecodeError::EndOfStream);
        }
    }
    buffer.truncate(content_length);

    Ok(Message {
        start_line,
        headers,
        body: buffer.to_vec(),
    })
}

pub async fn read_request<R>(reader: &mut R) -> Result<Request, DecodeError>
where
    R: AsyncRead + Unpin,
{
    read_message(reader).await?.into_request()
}

pub async fn read_response<R>(reader: &mut R) -> Result<Response, DecodeError>
where
    R: AsyncRead + Unpin,
{
    read_message(reader).await?.into_response()
}
