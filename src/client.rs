//! Minimal HTTP client speaking the same framing as the server.
//!
//! One request per connection: the request carries `Connection: close` and
//! the response is framed by its `Content-Length`. With HTTPS enabled the
//! connection is wrapped in TLS before the request is written.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore, ServerName};

use crate::http::headers::HeaderMap;
use crate::http::parser::{read_response, DecodeError};
use crate::http::request::Method;
use crate::http::response::Response;
use crate::http::writer::encode_request;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub enum ClientError {
    /// Only GET, POST, PUT and DELETE are sent.
    UnsupportedMethod(Method),
    /// The URL could not be turned into host, port and path.
    InvalidUrl(String),
    ConnectTimeout,
    Connect(std::io::Error),
    /// The host is not a valid TLS server name, or the handshake failed.
    Tls(String),
    Io(std::io::Error),
    Decode(DecodeError),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::UnsupportedMethod(m) => {
                write!(f, "method must be GET, POST, PUT, or DELETE (got {})", m)
            }
            ClientError::InvalidUrl(reason) => write!(f, "invalid url: {}", reason),
            ClientError::ConnectTimeout => write!(f, "connection timed out"),
            ClientError::Connect(e) => write!(f, "failed to connect: {}", e),
            ClientError::Tls(reason) => write!(f, "tls error: {}", reason),
            ClientError::Io(e) => write!(f, "i/o error: {}", e),
            ClientError::Decode(e) => write!(f, "bad response: {}", e),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Connect(e) | ClientError::Io(e) => Some(e),
            ClientError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    host: String,
    port: u16,
    https: bool,
    connect_timeout: Duration,
}

/// Client TLS settings trusting the bundled Mozilla roots, built on first use.
fn tls_config() -> Arc<ClientConfig> {
    static CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();

    let config = CONFIG.get_or_init(|| {
        let mut roots = RootCertStore::empty();
        roots.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
            OwnedTrustAnchor::from_subject_spki_name_constraints(ta.subject, ta.spki, ta.name_constraints)
        }));

        Arc::new(
            ClientConfig::builder()
                .with_safe_defaults()
                .with_root_certificates(roots)
                .with_no_client_auth(),
        )
    });
    Arc::clone(config)
}

impl HttpClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            https: false,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Splits an `http://` or `https://` URL into a client and the request
    /// target (path plus query, percent-encoded).
    pub fn for_url(raw: &str) -> Result<(Self, String), ClientError> {
        let url = url::Url::parse(raw).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;

        let https = match url.scheme() {
            "http" => false,
            "https" => true,
            other => {
                return Err(ClientError::InvalidUrl(format!("unsupported scheme {}", other)));
            }
        };
        let host = url
            .host_str()
            .ok_or_else(|| ClientError::InvalidUrl("missing host".to_string()))?;
        let port = url
            .port_or_known_default()
            .unwrap_or(if https { 443 } else { 80 });

        let mut target = url.path().to_string();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }

        Ok((Self::new(host, port).with_https(https), target))
    }

    pub fn with_https(mut self, https: bool) -> Self {
        self.https = https;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_https(&self) -> bool {
        self.https
    }

    pub async fn get(&self, path: &str) -> Result<Response, ClientError> {
        self.request(Method::GET, path, &HeaderMap::new(), &[]).await
    }

    /// Sends one request on a fresh connection and reads the response.
    ///
    /// The method is checked before anything touches the network.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<Response, ClientError> {
        if !method.is_client_sendable() {
            return Err(ClientError::UnsupportedMethod(method));
        }

        let addr = format!("{}:{}", self.host, self.port);
        let stream = timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| ClientError::ConnectTimeout)?
            .map_err(ClientError::Connect)?;

        let request = encode_request(&method, path, &self.host, headers, body);

        if self.https {
            let server_name = ServerName::try_from(self.host.as_str())
                .map_err(|e| ClientError::Tls(format!("{}: {}", self.host, e)))?;
            let tls = TlsConnector::from(tls_config())
                .connect(server_name, stream)
                .await
                .map_err(|e| ClientError::Tls(e.to_string()))?;
            tracing::trace!(host = %self.host, "TLS handshake complete");
            self.exchange(tls, &request, &method, path).await
        } else {
            self.exchange(stream, &request, &method, path).await
        }
    }

    async fn exchange<S>(
        &self,
        mut stream: S,
        request: &[u8],
        method: &Method,
        path: &str,
    ) -> Result<Response, ClientError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        stream.write_all(request).await.map_err(ClientError::Io)?;
        stream.flush().await.map_err(ClientError::Io)?;

        tracing::trace!(%method, path, host = %self.host, "Request sent");

        read_response(&mut stream).await.map_err(ClientError::Decode)
    }
}
