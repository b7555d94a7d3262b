//! HTTP(S) [`NotificationSink`].

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Request, StatusCode, Uri};
use http_body_util::Full;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

use stackbeat_core::settings::CLIENT_TIMEOUT;
use stackbeat_core::{DeliveryError, DeliveryFuture, NotificationSink};

/// Content type of every heartbeat body.
pub const CONTENT_TYPE: &str = "text/plain";

const USER_AGENT: &str = concat!("stackbeat/", env!("CARGO_PKG_VERSION"));

/// Posts heartbeats over HTTP/1.1, with TLS for `https` URLs.
#[derive(Clone)]
pub struct HttpSink {
    tls: Arc<rustls::ClientConfig>,
    timeout: Duration,
}

impl HttpSink {
    /// Sink trusting the Mozilla root store, with the default timeout.
    pub fn new() -> Result<Self, rustls::Error> {
        Ok(Self::with_tls(crate::tls::client_config()?))
    }

    /// Sink using a caller-provided TLS configuration.
    pub fn with_tls(tls: Arc<rustls::ClientConfig>) -> Self {
        Self {
            tls,
            timeout: CLIENT_TIMEOUT,
        }
    }

    /// Override the per-ping timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn send(&self, url: &str, body: String) -> Result<(), DeliveryError> {
        let target = Target::parse(url)?;

        let status = tokio::time::timeout(self.timeout, self.exchange(&target, body))
            .await
            .map_err(|_| DeliveryError::Timeout(self.timeout))??;

        if status.is_success() {
            debug!(%url, %status, "heartbeat accepted");
            Ok(())
        } else {
            Err(DeliveryError::Status(status.as_u16()))
        }
    }

    async fn exchange(&self, target: &Target, body: String) -> Result<StatusCode, DeliveryError> {
        let req = Request::builder()
            .method(http::Method::POST)
            .uri(target.path.as_str())
            .header(http::header::HOST, target.authority.as_str())
            .header(http::header::CONTENT_TYPE, CONTENT_TYPE)
            .header(http::header::USER_AGENT, USER_AGENT)
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| DeliveryError::Http(e.to_string()))?;

        let addr = format!("{}:{}", target.host, target.port);
        let stream = TcpStream::connect((target.host.as_str(), target.port))
            .await
            .map_err(move |e| DeliveryError::Connect {
                addr,
                reason: e.to_string(),
            })?;
        let _ = stream.set_nodelay(true);

        if !target.https {
            return send_request(stream, req).await;
        }

        let server_name = rustls::pki_types::ServerName::try_from(target.host.as_str())
            .map_err(|e| DeliveryError::InvalidUrl {
                url: target.authority.clone(),
                reason: format!("invalid tls server name: {e}"),
            })?
            .to_owned();

        let tls_stream = TlsConnector::from(Arc::clone(&self.tls))
            .connect(server_name, stream)
            .await
            .map_err(|e| DeliveryError::Tls {
                host: target.host.clone(),
                reason: e.to_string(),
            })?;

        send_request(tls_stream, req).await
    }
}

impl NotificationSink for HttpSink {
    fn post<'a>(&'a self, url: &'a str, body: String) -> DeliveryFuture<'a> {
        Box::pin(self.send(url, body))
    }
}

/// Run one request over an established stream.
async fn send_request<S>(io: S, req: Request<Full<Bytes>>) -> Result<StatusCode, DeliveryError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(io))
        .await
        .map_err(|e| DeliveryError::Http(format!("handshake: {e}")))?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "heartbeat connection closed with error");
        }
    });

    let resp = sender
        .send_request(req)
        .await
        .map_err(|e| DeliveryError::Http(e.to_string()))?;
    Ok(resp.status())
}

/// Where a ping goes.
#[derive(Debug, PartialEq, Eq)]
struct Target {
    https: bool,
    host: String,
    port: u16,
    /// Value of the Host header.
    authority: String,
    /// Origin-form request target.
    path: String,
}

impl Target {
    fn parse(url: &str) -> Result<Self, DeliveryError> {
        let invalid = |reason: &str| DeliveryError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let uri: Uri = url.trim().parse().map_err(|e: http::uri::InvalidUri| invalid(&e.to_string()))?;
        let https = match uri.scheme_str() {
            Some("https") => true,
            Some("http") => false,
            Some(_) => return Err(invalid("unsupported scheme")),
            None => return Err(invalid("missing scheme")),
        };
        let authority = uri.authority().ok_or_else(|| invalid("missing host"))?;
        let host = authority
            .host()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        Ok(Self {
            https,
            port: authority.port_u16().unwrap_or(if https { 443 } else { 80 }),
            host,
            authority: authority.as_str().to_string(),
            path: uri
                .path_and_query()
                .map(|p| p.as_str().to_string())
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| "/".to_string()),
        })
    }
}
