use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::files::listing::render_listing;
use crate::files::{read_file, NotFoundReason, Resolution};
use crate::http::pages::{file_page, listing_page};
use crate::http::parser::{read_request, DecodeError};
use crate::http::request::{Method, Request};
use crate::http::writer::ResponseWriter;
use crate::server::state::ServerState;

/// How long a rejected connection keeps draining the peer's request after
/// the write half is shut down, so the close does not reset the 429.
const LINGER: Duration = Duration::from_millis(10);

pub enum ConnectionState {
    RateCheck,
    SimulatedWork(Duration),
    Receiving,
    Resolving(Request),
    ServingDirectory(PathBuf),
    ServingFile(PathBuf),
    Writing(ResponseWriter, AfterWrite),
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterWrite {
    Close,
    /// Shut down the write half and drain before closing.
    ShutdownWrite,
}

/// Ways a single step can end the normal flow of a connection.
#[derive(Debug)]
pub enum DispatchError {
    /// The peer closed before a full request was framed.
    FramingIncomplete,
    MalformedRequest(&'static str),
    UnsupportedMethod(Method),
    NotFound(NotFoundReason),
    RateLimited,
    Unhandled(anyhow::Error),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::FramingIncomplete => write!(f, "request framing incomplete"),
            DispatchError::MalformedRequest(reason) => write!(f, "malformed request: {}", reason),
            DispatchError::UnsupportedMethod(m) => write!(f, "unsupported method {}", m),
            DispatchError::NotFound(reason) => write!(f, "not found: {}", reason),
            DispatchError::RateLimited => write!(f, "rate limited"),
            DispatchError::Unhandled(e) => write!(f, "unhandled failure: {:#}", e),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<DecodeError> for DispatchError {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::EndOfStream => DispatchError::FramingIncomplete,
            DecodeError::HeadTooLarge => DispatchError::MalformedRequest("request head too large"),
            DecodeError::Malformed(reason) => DispatchError::MalformedRequest(reason),
            DecodeError::Io(e) => DispatchError::Unhandled(e.into()),
        }
    }
}

/// Drives one accepted stream from admission to close.
///
/// The stream is owned by the connection and dropped when `run` returns, on
/// every path.
pub struct Connection<S> {
    stream: S,
    peer: IpAddr,
    shared: Arc<ServerState>,
    state: ConnectionState,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: IpAddr, shared: Arc<ServerState>) -> Self {
        Self {
            stream,
            peer,
            shared,
            state: ConnectionState::RateCheck,
        }
    }

    /// Runs the state machine to completion. An error means an unexpected
    /// failure; the connection is closed either way.
    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            let current = std::mem::replace(&mut self.state, ConnectionState::Closed);

            if let ConnectionState::Closed = current {
                break;
            }

            self.state = match self.step(current).await {
                Ok(next) => next,
                Err(e) => self.on_error(e)?,
            };
        }

        Ok(())
    }

    async fn step(&mut self, state: ConnectionState) -> Result<ConnectionState, DispatchError> {
        let shared = Arc::clone(&self.shared);

        match state {
            ConnectionState::RateCheck => {
                if !shared.admission.try_admit(self.peer).await {
                    return Err(DispatchError::RateLimited);
                }
                Ok(match shared.work {
                    Some(work) => ConnectionState::SimulatedWork(work.pick()),
                    None => ConnectionState::Receiving,
                })
            }

            ConnectionState::SimulatedWork(pause) => {
                tokio::time::sleep(pause).await;
                Ok(ConnectionState::Receiving)
            }

            ConnectionState::Receiving => {
                let request = read_request(&mut self.stream).await?;
                tracing::debug!(
                    peer = %self.peer,
                    method = %request.method,
                    path = %request.path,
                    "Request received"
                );

                if request.method != Method::GET {
                    return Err(DispatchError::UnsupportedMethod(request.method));
                }
                Ok(ConnectionState::Resolving(request))
            }

            ConnectionState::Resolving(request) => match shared.root.resolve(&request.path).await {
                Resolution::Directory(dir) => Ok(ConnectionState::ServingDirectory(dir)),
                Resolution::File(file) => Ok(ConnectionState::ServingFile(file)),
                Resolution::NotFound(reason) => Err(DispatchError::NotFound(reason)),
            },

            ConnectionState::ServingDirectory(dir) => {
                // Counted before rendering so the listing shows this visit
                shared.counter.hit(&dir).await;
                let html = render_listing(&shared.root, &dir, &shared.counter)
                    .await
                    .map_err(|e| DispatchError::Unhandled(e.into()))?;

                let writer = ResponseWriter::new(&listing_page(html));
                Ok(ConnectionState::Writing(writer, AfterWrite::Close))
            }

            ConnectionState::ServingFile(file) => {
                let contents = read_file(&file)
                    .await
                    .map_err(|e| DispatchError::Unhandled(e.into()))?;
                shared.counter.hit(&file).await;

                tracing::debug!(
                    peer = %self.peer,
                    file = %file.display(),
                    bytes = contents.len(),
                    "Serving file"
                );
                let writer = ResponseWriter::new(&file_page(&file, contents));
                Ok(ConnectionState::Writing(writer, AfterWrite::Close))
            }

            ConnectionState::Writing(mut writer, after) => {
                writer
                    .write_to_stream(&mut self.stream)
                    .await
                    .map_err(DispatchError::Unhandled)?;

                if after == AfterWrite::ShutdownWrite {
                    self.stream
                        .shutdown()
                        .await
                        .map_err(|e| DispatchError::Unhandled(e.into()))?;
                    self.linger().await;
                }
                Ok(ConnectionState::Closed)
            }

            ConnectionState::Closed => Ok(ConnectionState::Closed),
        }
    }

    /// Maps a failed step to the connection's terminal outcome.
    fn on_error(&self, error: DispatchError) -> anyhow::Result<ConnectionState> {
        let pages = &self.shared.pages;

        match error {
            DispatchError::RateLimited => {
                tracing::info!(peer = %self.peer, "Too many requests, rejecting");
                let writer = ResponseWriter::from_bytes(pages.too_many_requests.clone());
                Ok(ConnectionState::Writing(writer, AfterWrite::ShutdownWrite))
            }
            DispatchError::UnsupportedMethod(method) => {
                tracing::debug!(peer = %self.peer, %method, "Method not allowed");
                let writer = ResponseWriter::from_bytes(pages.method_not_allowed.clone());
                Ok(ConnectionState::Writing(writer, AfterWrite::Close))
            }
            DispatchError::NotFound(reason) => {
                tracing::debug!(peer = %self.peer, %reason, "Not found");
                let writer = ResponseWriter::from_bytes(pages.not_found.clone());
                Ok(ConnectionState::Writing(writer, AfterWrite::Close))
            }
            e @ (DispatchError::FramingIncomplete | DispatchError::MalformedRequest(_)) => {
                tracing::debug!(peer = %self.peer, error = %e, "Closing without response");
                Ok(ConnectionState::Closed)
            }
            DispatchError::Unhandled(e) => Err(e),
        }
    }

    async fn linger(&mut self) {
        let mut sink = [0u8; 1024];
        let stream = &mut self.stream;

        let _ = tokio::time::timeout(LINGER, async {
            loop {
                match stream.read(&mut sink).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        })
        .await;
    }
}
