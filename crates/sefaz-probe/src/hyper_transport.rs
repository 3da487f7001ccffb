//! HTTP/1.1 transport built on hyper, with rustls for `https://` endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

use crate::transport::{Transport, TransportError, TransportRequest, TransportResponse};

const USER_AGENT: &str = concat!("sefaz-probe/", env!("CARGO_PKG_VERSION"));

/// Parsed pieces of an endpoint URL.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    https: bool,
    host: String,
    port: u16,
    authority: String,
    path: String,
}

impl Target {
    fn parse(url: &str) -> Result<Self, TransportError> {
        let invalid = || TransportError::InvalidUrl(url.to_string());
        let uri: http::Uri = url.parse().map_err(|_| invalid())?;
        let https = match uri.scheme_str() {
            Some("https") => true,
            Some("http") => false,
            _ => return Err(invalid()),
        };
        let host = uri.host().filter(|h| !h.is_empty()).ok_or_else(invalid)?;
        let authority = uri.authority().map(|a| a.as_str()).ok_or_else(invalid)?;
        Ok(Self {
            https,
            host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            port: uri.port_u16().unwrap_or(if https { 443 } else { 80 }),
            authority: authority.to_string(),
            path: uri
                .path_and_query()
                .map(|p| p.as_str().to_string())
                .unwrap_or_else(|| "/".to_string()),
        })
    }
}

/// Production transport: one fresh connection per request.
#[derive(Clone)]
pub struct HyperTransport {
    tls: Arc<rustls::ClientConfig>,
}

impl HyperTransport {
    /// Create a transport trusting the Mozilla root certificate store.
    pub fn new() -> Result<Self, TransportError> {
        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = rustls::ClientConfig::builder_with_provider(
            rustls::crypto::ring::default_provider().into(),
        )
        .with_safe_default_protocol_versions()
        .map_err(|e| TransportError::Tls(format!("protocol version error: {e}")))?
        .with_root_certificates(root_store)
        .with_no_client_auth();

        Ok(Self::with_tls_config(Arc::new(config)))
    }

    pub fn with_tls_config(tls: Arc<rustls::ClientConfig>) -> Self {
        Self { tls }
    }

    async fn connect(&self, target: &Target) -> Result<TcpStream, TransportError> {
        TcpStream::connect((target.host.as_str(), target.port))
            .await
            .map_err(|e| TransportError::Connect(format!("{}:{}: {e}", target.host, target.port)))
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn post(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        let target = Target::parse(&request.url)?;
        let stream = self.connect(&target).await?;

        let req = http::Request::builder()
            .method(http::Method::POST)
            .uri(target.path.as_str())
            .header(http::header::HOST, target.authority.as_str())
            .header(http::header::CONTENT_TYPE, request.content_type)
            .header(http::header::USER_AGENT, USER_AGENT)
            .header("SOAPAction", request.action)
            .body(Full::new(request.body.clone()))
            .map_err(|e| TransportError::Http(e.to_string()))?;

        if target.https {
            let server_name = rustls::pki_types::ServerName::try_from(target.host.clone())
                .map_err(|e| TransportError::Tls(format!("invalid server name {:?}: {e}", target.host)))?;
            let tls_stream = tokio_rustls::TlsConnector::from(Arc::clone(&self.tls))
                .connect(server_name, stream)
                .await
                .map_err(|e| TransportError::Tls(e.to_string()))?;
            exchange(tls_stream, req, &request.url).await
        } else {
            exchange(stream, req, &request.url).await
        }
    }

    async fn reachable(&self, url: &str) -> Result<(), TransportError> {
        let target = Target::parse(url)?;
        self.connect(&target).await?;
        debug!(%url, "endpoint reachable");
        Ok(())
    }
}

/// Run one HTTP/1.1 request over an established stream and collect the body.
async fn exchange<S>(
    stream: S,
    req: http::Request<Full<Bytes>>,
    url: &str,
) -> Result<TransportResponse, TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let io = TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| TransportError::Http(format!("handshake: {e}")))?;

    // Drive the connection in the background; it ends once `sender` is dropped.
    let conn_url = url.to_string();
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, url = %conn_url, "status connection closed with error");
        }
    });

    let resp = sender
        .send_request(req)
        .await
        .map_err(|e| TransportError::Http(e.to_string()))?;
    let status = resp.status().as_u16();
    let body = resp
        .into_body()
        .collect()
        .await
        .map_err(|e| TransportError::Http(format!("reading body: {e}")))?
        .to_bytes();

    debug!(%url, status, bytes = body.len(), "status reply received");
    Ok(TransportResponse { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_https_target_with_default_port() {
        let target =
            Target::parse("https://nfe.sefaz.sp.gov.br/ws/NFeStatusServico4.asmx").unwrap();
        assert!(target.https);
        assert_eq!(target.host, "nfe.sefaz.sp.gov.br");
        assert_eq!(target.port, 443);
        assert_eq!(target.path, "/ws/NFeStatusServico4.asmx");
    }

    #[test]
    fn parse_http_target_with_explicit_port() {
        let target = Target::parse("http://127.0.0.1:8081/status?wsdl").unwrap();
        assert!(!target.https);
        assert_eq!(target.port, 8081);
        assert_eq!(target.authority, "127.0.0.1:8081");
        assert_eq!(target.path, "/status?wsdl");
    }

    #[test]
    fn parse_rejects_other_schemes() {
        assert!(matches!(
            Target::parse("ftp://example.com/x"),
            Err(TransportError::InvalidUrl(_))
        ));
        assert!(Target::parse("not a url").is_err());
    }

    #[test]
    fn default_transport_builds() {
        assert!(HyperTransport::new().is_ok());
    }

    #[tokio::test]
    async fn reachable_fails_on_closed_port() {
        let transport = HyperTransport::new().unwrap();
        let result = transport.reachable("http://127.0.0.1:1/").await;
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }
}
