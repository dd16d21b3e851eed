use std::{collections::VecDeque, sync::Arc};

use {
    async_trait::async_trait,
    fez_channels::{Error, Result, Signal, Transport},
    futures::{FutureExt, SinkExt, StreamExt},
    tokio::{
        io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf},
        net::TcpStream,
    },
    tokio_rustls::TlsConnector,
    tokio_util::codec::{FramedRead, FramedWrite},
    tracing::{debug, info, trace, warn},
};

use crate::{IrcCodec, IrcConfig, Message, protocol::Protocol};

/// Any byte stream the transport can run over.
pub trait IoStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> IoStream for T {}

pub type BoxedStream = Box<dyn IoStream>;

/// An IRC client connection implementing [`Transport`].
///
/// Reads go through a framed line decoder, so dropping a pending `recv`
/// loses nothing. Replies the protocol needs on its own (the SASL exchange)
/// are queued and written before the next read or write.
pub struct IrcTransport<S> {
    reader: FramedRead<ReadHalf<S>, IrcCodec>,
    writer: FramedWrite<WriteHalf<S>, IrcCodec>,
    protocol: Protocol,
    pending: VecDeque<Signal>,
    outbox: VecDeque<Message>,
    closed: Option<String>,
}

impl IrcTransport<BoxedStream> {
    /// Open a TCP (optionally TLS) connection and start registration.
    pub async fn connect(config: &IrcConfig) -> Result<Self> {
        info!(host = %config.host, port = config.port, tls = config.tls, "connecting");
        let tcp = tokio::time::timeout(
            config.connect_timeout,
            TcpStream::connect((config.host.as_str(), config.port)),
        )
        .await
        .map_err(|_| Error::timeout(format!("connecting to {}:{}", config.host, config.port)))??;

        let stream: BoxedStream = if config.tls {
            let server_name = rustls::pki_types::ServerName::try_from(config.host.clone())
                .map_err(|e| Error::external("invalid TLS server name", e))?;
            let connector = TlsConnector::from(Arc::new(build_tls_config()));
            let tls = tokio::time::timeout(
                config.connect_timeout,
                connector.connect(server_name, tcp),
            )
            .await
            .map_err(|_| Error::timeout(format!("TLS handshake with {}", config.host)))??;
            Box::new(tls)
        } else {
            Box::new(tcp)
        };

        Self::register(stream, config).await
    }
}

impl<S: AsyncRead + AsyncWrite + Send> IrcTransport<S> {
    /// Wrap an open stream and send the registration lines.
    pub async fn register(stream: S, config: &IrcConfig) -> Result<Self> {
        let (read, write) = tokio::io::split(stream);
        let protocol = Protocol::new(config);
        let mut transport = Self {
            reader: FramedRead::new(read, IrcCodec),
            writer: FramedWrite::new(write, IrcCodec),
            outbox: protocol.registration().into(),
            protocol,
            pending: VecDeque::new(),
            closed: None,
        };
        transport.flush_outbox().await?;
        debug!(nick = %config.username, sasl = config.sasl, "registration sent");
        Ok(transport)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.is_some()
    }

    async fn write(&mut self, msg: Message) -> Result<()> {
        if self.closed.is_some() {
            return Err(Error::Closed);
        }
        self.flush_outbox().await?;
        self.write_now(msg).await
    }

    async fn write_now(&mut self, msg: Message) -> Result<()> {
        trace!(command = %msg.command, "send");
        self.writer.send(msg).await
    }

    async fn flush_outbox(&mut self) -> Result<()> {
        while let Some(msg) = self.outbox.pop_front() {
            self.write_now(msg).await?;
        }
        Ok(())
    }

    /// Feed one decoder result through the protocol.
    fn accept(&mut self, next: Option<Result<String>>) {
        let line = match next {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                warn!(error = %e, "read failed");
                self.close(e.to_string());
                return;
            },
            None => {
                self.close("connection closed by server".into());
                return;
            },
        };
        let msg = match Message::parse(&line) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(error = %e, "unparseable line skipped");
                return;
            },
        };
        let inbound = self.protocol.on_message(&msg);
        self.outbox.extend(inbound.replies);
        match inbound.signal {
            Some(Signal::Disconnect { reason }) => self.close(reason),
            Some(signal) => self.pending.push_back(signal),
            None => {},
        }
    }

    fn close(&mut self, reason: String) {
        if self.closed.is_none() {
            info!(%reason, "connection closed");
            self.pending.push_back(Signal::Disconnect {
                reason: reason.clone(),
            });
            self.closed = Some(reason);
        }
    }
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Send> Transport for IrcTransport<S> {
    async fn recv(&mut self) -> Result<Signal> {
        loop {
            if let Some(signal) = self.pending.pop_front() {
                return Ok(signal);
            }
            if let Some(reason) = &self.closed {
                return Ok(Signal::Disconnect {
                    reason: reason.clone(),
                });
            }
            self.flush_outbox().await?;
            let next = self.reader.next().await;
            self.accept(next);
        }
    }

    fn try_recv(&mut self) -> Result<Option<Signal>> {
        loop {
            if let Some(signal) = self.pending.pop_front() {
                return Ok(Some(signal));
            }
            if self.closed.is_some() {
                return Ok(None);
            }
            match self.reader.next().now_or_never() {
                Some(next) => self.accept(next),
                None => return Ok(None),
            }
        }
    }

    async fn send(&mut self, target: &str, text: &str) -> Result<()> {
        self.write(Message::privmsg(target, text)).await
    }

    async fn join(&mut self, channel: &str) -> Result<()> {
        info!(%channel, "joining");
        self.write(Message::join(channel)).await
    }

    async fn change_nick(&mut self, nick: &str) -> Result<()> {
        info!(%nick, "changing nickname");
        self.write(Message::nick(nick)).await
    }

    async fn pong(&mut self, token: &str) -> Result<()> {
        self.write(Message::pong(token)).await
    }

    async fn disconnect(&mut self, reason: &str) -> Result<()> {
        if self.closed.is_some() {
            return Ok(());
        }
        let result = self.write(Message::quit(reason)).await;
        self.closed = Some(reason.to_string());
        if let Err(e) = self.writer.get_mut().shutdown().await {
            debug!(error = %e, "shutdown after QUIT failed");
        }
        result
    }
}

/// Client TLS config trusting the platform's root certificates.
fn build_tls_config() -> rustls::ClientConfig {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let mut root_store = rustls::RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for e in &native.errors {
        warn!(error = %e, "could not load a native certificate");
    }
    let (added, ignored) = root_store.add_parsable_certificates(native.certs);
    debug!(added, ignored, "loaded native root certificates");

    rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}
