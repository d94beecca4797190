//! Canned responses and 200 page assembly.

use std::path::Path;

use bytes::Bytes;

use crate::http::mime::content_type_for;
use crate::http::response::{Response, ResponseBuilder, StatusCode};

pub const NOT_FOUND_BODY: &[u8] = b"<h1>404 Not Found</h1>";
pub const METHOD_NOT_ALLOWED_BODY: &[u8] = b"<h1>405 Method Not Allowed</h1>";
pub const TOO_MANY_REQUESTS_BODY: &[u8] = b"<h1>429 Too Many Requests</h1>";

/// Error pages, serialized once and shared by every connection.
#[derive(Debug, Clone)]
pub struct CannedPages {
    pub not_found: Bytes,
    pub method_not_allowed: Bytes,
    pub too_many_requests: Bytes,
}

impl CannedPages {
    pub fn new() -> Self {
        let not_found = ResponseBuilder::new(StatusCode::NOT_FOUND)
            .body(NOT_FOUND_BODY)
            .build();
        let method_not_allowed = ResponseBuilder::new(StatusCode::METHOD_NOT_ALLOWED)
            .body(METHOD_NOT_ALLOWED_BODY)
            .build();
        let too_many_requests = ResponseBuilder::new(StatusCode::TOO_MANY_REQUESTS)
            .header("Connection", "close")
            .body(TOO_MANY_REQUESTS_BODY)
            .build();

        Self {
            not_found: not_found.to_bytes(),
            method_not_allowed: method_not_allowed.to_bytes(),
            too_many_requests: too_many_requests.to_bytes(),
        }
    }
}

impl Default for CannedPages {
    fn default() -> Self {
        Self::new()
    }
}

/// 200 response carrying a file's bytes.
pub fn file_page(path: &Path, contents: Vec<u8>) -> Response {
    ResponseBuilder::new(StatusCode::OK)
        .header("Content-Type", content_type_for(path))
        .body(contents)
        .build()
}

/// 200 response carrying a rendered directory listing.
pub fn listing_page(html: String) -> Response {
    Response::ok(html)
}
