//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::header::HOST;
use hyper::{Request, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{aws_lc_rs, verify_tls13_signature, CryptoProvider};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use tls13_zone::config::{AdmissionConfig, ServerConfiguration};
use tls13_zone::http::{ConnectionAcceptor, ProtocolInjector, StaticResponder};
use tls13_zone::net::connection::{ConnectionTracker, PreNegotiated};
use tls13_zone::net::listener::{Accept, AcceptError};
use tls13_zone::net::{build_server_config, TlsListener};

pub const HOSTNAME: &str = "localhost";

/// A freshly generated self-signed certificate and key.
pub struct Identity {
    pub cert_pem: String,
    pub key_pem: String,
    pub cert_der: CertificateDer<'static>,
}

pub fn identity(hostname: &str) -> Identity {
    let generated = rcgen::generate_simple_self_signed(vec![hostname.to_string()]).unwrap();
    Identity {
        cert_pem: generated.cert.pem(),
        key_pem: generated.key_pair.serialize_pem(),
        cert_der: generated.cert.der().clone(),
    }
}

/// Write `contents` to a unique file under the system temp dir.
pub fn temp_file(name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let path = std::env::temp_dir().join(format!(
        "tls13-zone-it-{}-{}-{}",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed),
        name
    ));
    std::fs::write(&path, contents).unwrap();
    path
}

/// A server running on an ephemeral loopback port.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub tracker: ConnectionTracker,
    pub handle: JoinHandle<Infallible>,
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn start_server(configuration: &ServerConfiguration, admission: AdmissionConfig) -> RunningServer {
    let tls = build_server_config(configuration).unwrap();
    let listener = TlsListener::bind("127.0.0.1:0".parse().unwrap(), tls, None)
        .await
        .unwrap();
    let addr = listener.local_addr();

    let injector = ProtocolInjector::new(StaticResponder::new(configuration.payload().clone()));
    let acceptor = ConnectionAcceptor::new(listener, injector, &admission);
    let tracker = acceptor.tracker();
    let handle = tokio::spawn(acceptor.run());

    RunningServer { addr, tracker, handle }
}

fn provider() -> Arc<CryptoProvider> {
    Arc::new(aws_lc_rs::default_provider())
}

/// TLS 1.3 client trusting only `root`, offering `alpn` in order.
pub fn client_config(root: &CertificateDer<'static>, alpn: &[&str]) -> Arc<ClientConfig> {
    let mut roots = RootCertStore::empty();
    roots.add(root.clone()).unwrap();

    let mut config = ClientConfig::builder_with_provider(provider())
        .with_protocol_versions(&[&rustls::version::TLS13])
        .unwrap()
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = alpn.iter().map(|p| p.as_bytes().to_vec()).collect();
    Arc::new(config)
}

/// TLS 1.3 client that accepts any certificate (signatures still checked).
pub fn insecure_client_config(alpn: &[&str]) -> Arc<ClientConfig> {
    let mut config = ClientConfig::builder_with_provider(provider())
        .with_protocol_versions(&[&rustls::version::TLS13])
        .unwrap()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AnyCertificate(provider())))
        .with_no_client_auth();
    config.alpn_protocols = alpn.iter().map(|p| p.as_bytes().to_vec()).collect();
    Arc::new(config)
}

#[derive(Debug)]
struct AnyCertificate(Arc<CryptoProvider>);

impl ServerCertVerifier for AnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Err(rustls::Error::General("TLS 1.2 is not offered".into()))
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

pub async fn connect(addr: SocketAddr, config: Arc<ClientConfig>) -> TlsStream<TcpStream> {
    let tcp = TcpStream::connect(addr).await.unwrap();
    TlsConnector::from(config)
        .connect(ServerName::try_from(HOSTNAME).unwrap(), tcp)
        .await
        .unwrap()
}

pub fn negotiated_alpn(tls: &TlsStream<TcpStream>) -> Option<Vec<u8>> {
    tls.get_ref().1.alpn_protocol().map(<[u8]>::to_vec)
}

/// Send `requests` GETs over one HTTP/2 connection and collect each body.
pub async fn get_h2<IO>(io: IO, requests: usize) -> Vec<(StatusCode, Bytes)>
where
    IO: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http2::handshake(TokioExecutor::new(), TokioIo::new(io))
        .await
        .unwrap();
    tokio::spawn(conn);

    let mut results = Vec::with_capacity(requests);
    for i in 0..requests {
        let request = Request::get(format!("https://{HOSTNAME}/path/{i}"))
            .body(Empty::<Bytes>::new())
            .unwrap();
        let response = sender.send_request(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        results.push((status, body));
    }
    results
}

/// Send `requests` GETs over one HTTP/1.1 keep-alive connection.
pub async fn get_http1<IO>(io: IO, requests: usize) -> Vec<(StatusCode, Bytes)>
where
    IO: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(io))
        .await
        .unwrap();
    tokio::spawn(conn);

    let mut results = Vec::with_capacity(requests);
    for i in 0..requests {
        let request = Request::get(format!("/path/{i}"))
            .header(HOST, HOSTNAME)
            .body(Empty::<Bytes>::new())
            .unwrap();
        let response = sender.send_request(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        results.push((status, body));
    }
    results
}

type Scripted = Result<(PreNegotiated<DuplexStream>, SocketAddr), AcceptError>;

/// Listener driven by the test: each message sent is one accept() outcome.
/// Once every sender is dropped, accept() fails with `Closed` forever.
pub struct ScriptedListener {
    rx: mpsc::Receiver<Scripted>,
    calls: Arc<AtomicUsize>,
}

impl Accept for ScriptedListener {
    type Conn = PreNegotiated<DuplexStream>;

    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<(Self::Conn, SocketAddr), AcceptError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        async move { self.rx.recv().await.unwrap_or(Err(AcceptError::Closed)) }
    }
}

pub fn scripted_listener() -> (mpsc::Sender<Scripted>, ScriptedListener, Arc<AtomicUsize>) {
    let (tx, rx) = mpsc::channel(64);
    let calls = Arc::new(AtomicUsize::new(0));
    let listener = ScriptedListener {
        rx,
        calls: Arc::clone(&calls),
    };
    (tx, listener, calls)
}

pub fn test_peer() -> SocketAddr {
    "192.0.2.10:40000".parse().unwrap()
}

/// Poll `condition` every 10ms for up to five seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    condition()
}
