//! Gateway - the listener that accepts incoming connections.
//!
//! Binds a TCP socket (plain or TLS-only, depending on configuration) and
//! spawns the per-connection reader/writer tasks for each accepted client.

use crate::client::Client;
use crate::config::TlsConfig;
use crate::events::ClientEvent;
use crate::network::connection;
use rustls_pemfile::{certs, pkcs8_private_keys};
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_rustls::rustls;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::TlsAcceptor;
use tracing::{error, info, warn};

/// Listener setup errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),
    #[error("no certificates found in {0}")]
    NoCertificate(String),
    #[error("no private key found in {0}")]
    NoPrivateKey(String),
}

/// The Gateway accepts incoming connections and spawns handlers.
pub struct Gateway {
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
    hostname: Arc<str>,
    events: mpsc::UnboundedSender<ClientEvent>,
    next_id: u64,
}

impl Gateway {
    /// Bind to the configured address, TLS-only when `tls` is given.
    pub async fn bind(
        hostname: Arc<str>,
        address: SocketAddr,
        tls: Option<&TlsConfig>,
        events: mpsc::UnboundedSender<ClientEvent>,
    ) -> Result<Self, GatewayError> {
        let tls = match tls {
            Some(config) => Some(load_tls_acceptor(config).await?),
            None => None,
        };
        let listener = TcpListener::bind(address).await?;
        info!(%address, tls = tls.is_some(), "listening");
        Ok(Self {
            listener,
            tls,
            hostname,
            events,
            next_id: 0,
        })
    }

    /// Accept connections forever.
    pub async fn run(mut self) -> Result<(), GatewayError> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!(%addr, "connection accepted");
                    self.next_id += 1;
                    let id = self.next_id;
                    let hostname = Arc::clone(&self.hostname);
                    let events = self.events.clone();
                    let tls = self.tls.clone();
                    tokio::spawn(async move {
                        match tls {
                            Some(acceptor) => match acceptor.accept(stream).await {
                                Ok(stream) => serve(id, hostname, stream, addr, events).await,
                                Err(err) => {
                                    warn!(%addr, error = %err, "tls handshake failed");
                                }
                            },
                            None => serve(id, hostname, stream, addr, events).await,
                        }
                    });
                }
                Err(err) => {
                    error!(error = %err, "failed to accept connection");
                }
            }
        }
    }
}

async fn serve<S>(
    id: u64,
    hostname: Arc<str>,
    stream: S,
    addr: SocketAddr,
    events: mpsc::UnboundedSender<ClientEvent>,
) where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (read, write) = tokio::io::split(stream);
    let writer = connection::spawn_writer(write);
    let client = Client::new(
        id,
        hostname,
        addr.to_string(),
        writer,
        tokio_util::sync::CancellationToken::new(),
    );
    connection::run_reader(client, read, &events).await;
    info!(%addr, "connection closed");
}

async fn load_tls_acceptor(config: &TlsConfig) -> Result<TlsAcceptor, GatewayError> {
    let cert_data = tokio::fs::read(&config.cert_path).await?;
    let cert_chain: Vec<CertificateDer<'static>> = certs(&mut Cursor::new(&cert_data))
        .filter_map(|r| r.ok())
        .collect();
    if cert_chain.is_empty() {
        return Err(GatewayError::NoCertificate(
            config.cert_path.display().to_string(),
        ));
    }

    let key_data = tokio::fs::read(&config.key_path).await?;
    let key = pkcs8_private_keys(&mut Cursor::new(&key_data))
        .filter_map(|r| r.ok())
        .map(PrivateKeyDer::Pkcs8)
        .next()
        .ok_or_else(|| GatewayError::NoPrivateKey(config.key_path.display().to_string()))?;

    let tls_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(cert_chain, key)?;
    Ok(TlsAcceptor::from(Arc::new(tls_config)))
}
