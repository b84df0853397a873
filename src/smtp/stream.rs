use std::io::{self, Read, Write};
use std::net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use native_tls::{HandshakeError, Protocol, TlsConnector, TlsStream};

use super::error::ProbeError;
use super::options::ProbeOptions;
use super::reply::{ReplyReader, SmtpReply, TimedRead};
use super::session::Stage;

/// The session's byte pipe. It starts as plain TCP and is swapped for TLS in
/// place after a successful `STARTTLS`.
#[derive(Debug)]
enum Transport {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    Closed,
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(stream) => stream.read(buf),
            Self::Tls(stream) => stream.read(buf),
            Self::Closed => Err(closed()),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(stream) => stream.write(buf),
            Self::Tls(stream) => stream.write(buf),
            Self::Closed => Err(closed()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(stream) => stream.flush(),
            Self::Tls(stream) => stream.flush(),
            Self::Closed => Err(closed()),
        }
    }
}

impl TimedRead for Transport {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Self::Plain(stream) => stream.set_read_timeout(timeout),
            Self::Tls(stream) => stream.get_ref().set_read_timeout(timeout),
            Self::Closed => Err(closed()),
        }
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "transport closed")
}

#[derive(Debug)]
pub struct SmtpStream {
    transport: Transport,
    reader: ReplyReader,
    /// Bound for the connect phase and for each whole reply.
    timeout: Duration,
}

impl SmtpStream {
    /// Connects to the first reachable address of `host:port`. Name
    /// resolution and every connect attempt share one `timeout`.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, ProbeError> {
        Self::connect_until(host, port, timeout, Instant::now() + timeout)
    }

    fn connect_until(
        host: &str,
        port: u16,
        timeout: Duration,
        deadline: Instant,
    ) -> Result<Self, ProbeError> {
        let addrs = resolve_host(host, port, deadline)?;

        let mut last_err = None;
        for addr in addrs {
            let Some(left) = remaining(deadline) else {
                return Err(ProbeError::Timeout {
                    stage: Stage::Connect,
                });
            };
            match TcpStream::connect_timeout(&addr, left) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(timeout))
                        .and_then(|()| stream.set_write_timeout(Some(timeout)))
                        .map_err(|err| ProbeError::connect(host, err))?;
                    tracing::debug!(host, %addr, "connected");
                    return Ok(Self {
                        transport: Transport::Plain(stream),
                        reader: ReplyReader::new(),
                        timeout,
                    });
                }
                Err(err) => {
                    tracing::debug!(host, %addr, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }
        Err(match last_err {
            Some(err) => ProbeError::connect(host, err),
            None => ProbeError::NoAddress {
                host: host.to_string(),
            },
        })
    }

    /// Replaces the plain transport with a TLS one over the same socket.
    /// Anything buffered from the cleartext phase is discarded.
    pub fn upgrade_tls(&mut self, domain: &str, connector: &TlsConnector) -> Result<(), ProbeError> {
        let plain = match std::mem::replace(&mut self.transport, Transport::Closed) {
            Transport::Plain(stream) => stream,
            tls @ Transport::Tls(_) => {
                self.transport = tls;
                return Ok(());
            }
            Transport::Closed => {
                return Err(ProbeError::io(Stage::TlsHandshake, closed()));
            }
        };
        self.reader.reset();
        plain
            .set_read_timeout(Some(self.timeout))
            .map_err(|err| ProbeError::io(Stage::TlsHandshake, err))?;
        let tls = complete_handshake(connector, domain, plain)?;
        self.transport = Transport::Tls(Box::new(tls));
        Ok(())
    }

    pub fn send_line(&mut self, line: &str) -> io::Result<()> {
        let mut data = Vec::with_capacity(line.len() + 2);
        data.extend_from_slice(line.as_bytes());
        data.extend_from_slice(b"\r\n");
        self.transport.write_all(&data)?;
        self.transport.flush()
    }

    pub fn read_reply(&mut self) -> io::Result<SmtpReply> {
        let deadline = Instant::now() + self.timeout;
        self.reader.read_reply_until(&mut self.transport, deadline)
    }
}

fn remaining(deadline: Instant) -> Option<Duration> {
    deadline
        .checked_duration_since(Instant::now())
        .filter(|left| !left.is_zero())
}

/// Resolves `host` on a helper thread so a stuck system resolver cannot
/// outlive `deadline`. IP literals skip the lookup.
fn resolve_host(host: &str, port: u16, deadline: Instant) -> Result<Vec<SocketAddr>, ProbeError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![SocketAddr::new(ip, port)]);
    }
    let timed_out = || ProbeError::Timeout {
        stage: Stage::Connect,
    };
    let left = remaining(deadline).ok_or_else(timed_out)?;

    let (tx, rx) = mpsc::channel();
    let name = host.to_string();
    thread::spawn(move || {
        let resolved = (name.as_str(), port)
            .to_socket_addrs()
            .map(|addrs| addrs.collect::<Vec<_>>());
        let _ = tx.send(resolved);
    });

    match rx.recv_timeout(left) {
        Ok(resolved) => resolved.map_err(|err| ProbeError::connect(host, err)),
        Err(RecvTimeoutError::Timeout) => Err(timed_out()),
        Err(RecvTimeoutError::Disconnected) => Err(ProbeError::NoAddress {
            host: host.to_string(),
        }),
    }
}

/// Connector for the in-place upgrade, limited to TLS 1.2 and newer.
pub fn tls_connector(options: &ProbeOptions) -> Result<TlsConnector, ProbeError> {
    TlsConnector::builder()
        .min_protocol_version(Some(Protocol::Tlsv12))
        .danger_accept_invalid_certs(options.accept_invalid_certs)
        .danger_accept_invalid_hostnames(options.accept_invalid_certs)
        .build()
        .map_err(|source| ProbeError::TlsInit { source })
}

fn complete_handshake(
    connector: &TlsConnector,
    domain: &str,
    stream: TcpStream,
) -> Result<TlsStream<TcpStream>, ProbeError> {
    match connector.connect(domain, stream) {
        Ok(tls) => Ok(tls),
        Err(HandshakeError::Failure(source)) => Err(ProbeError::Tls { source }),
        // blocking sockets only report WouldBlock when the read timeout fires
        Err(HandshakeError::WouldBlock(_)) => Err(ProbeError::TlsStalled),
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;

    #[test]
    fn ip_literal_skips_lookup() {
        let addrs = resolve_host("127.0.0.1", 2525, Instant::now() + Duration::from_secs(1))
            .expect("literal");
        assert_eq!(addrs, vec!["127.0.0.1:2525".parse::<SocketAddr>().unwrap()]);
    }

    #[test]
    fn host_name_resolves_within_deadline() {
        let addrs = resolve_host("localhost", 25, Instant::now() + Duration::from_secs(5))
            .expect("localhost resolves");
        assert!(!addrs.is_empty());
        assert!(addrs.iter().all(|addr| addr.port() == 25));
    }

    #[test]
    fn expired_deadline_stops_before_connecting() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();

        let err = SmtpStream::connect_until(
            "127.0.0.1",
            port,
            Duration::from_secs(1),
            Instant::now(),
        )
        .expect_err("deadline already passed");
        assert!(matches!(err, ProbeError::Timeout { stage: Stage::Connect }));
    }

    #[test]
    fn expired_deadline_bounds_name_resolution() {
        let err = resolve_host("localhost", 25, Instant::now()).expect_err("no time left");
        assert!(matches!(err, ProbeError::Timeout { stage: Stage::Connect }));
    }
}
