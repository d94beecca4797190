//! HTTP/1.1 framing and the per-connection state machine.
//!
//! # Architecture
//!
//! - **`headers`**: Ordered, case-insensitive header map
//! - **`parser`**: Frames messages out of a byte stream (head, then `Content-Length` body)
//! - **`writer`**: Serializes requests and responses and writes them out
//! - **`request`** / **`response`**: Typed views of a framed message
//! - **`pages`**: Canned error pages and 200 page assembly
//! - **`mime`**: Content type by file extension
//! - **`connection`**: The dispatcher driving one accepted stream
//!
//! # Connection State Machine
//!
//! One request per connection; every path ends in `Closed`, which drops the
//! stream.
//!
//! ```text
//!        ┌─────────────┐  denied
//!        │  RateCheck  │ ─────────────► Writing(429) ─ shutdown(write) ─┐
//!        └──────┬──────┘                                                │
//!               │ admitted (optional SimulatedWork)                     │
//!               ▼                                                       │
//!        ┌─────────────┐  EOF / malformed                               │
//!        │  Receiving  │ ──────────────────────────────────────────────►│
//!        └──────┬──────┘  not GET ──► Writing(405) ───────────────────► │
//!               │ GET                                                   │
//!               ▼                                                       │
//!        ┌─────────────┐  not found ─► Writing(404) ──────────────────► │
//!        │  Resolving  │                                                │
//!        └──────┬──────┘                                                ▼
//!               ├─ ServingDirectory ─► Writing(200 listing) ───────► Closed
//!               └─ ServingFile ──────► Writing(200 file) ──────────► Closed
//! ```

pub mod connection;
pub mod headers;
pub mod mime;
pub mod pages;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;

pub use headers::HeaderMap;
