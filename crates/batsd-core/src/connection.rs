//! Blocking client side of the daemon's line protocol.
//!
//! One command goes out, one `\n`-terminated reply comes back. There are no
//! request ids, so a [`Connection`] must only ever be driven by one caller at
//! a time; it is deliberately `!Sync`.

use crate::config::ConnectionConfig;
use crate::datatype::{Counter, Gauge, Timer};
use crate::error::{BatsdError, Result};
use crate::key::Kind;
use crate::models::Values;
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::io::{self, BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Disconnected,
    Connected,
}

#[derive(Debug)]
pub struct Connection {
    config: ConnectionConfig,
    stream: RefCell<Option<BufReader<TcpStream>>>,
}

impl Connection {
    /// Creates the connection and connects right away.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let conn = Self {
            config,
            stream: RefCell::new(None),
        };
        conn.connect()?;
        Ok(conn)
    }

    pub fn open<H: Into<String>>(host: H, port: u16) -> Result<Self> {
        Self::new(ConnectionConfig::new(host, port))
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    pub fn state(&self) -> State {
        if self.stream.borrow().is_some() {
            State::Connected
        } else {
            State::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == State::Connected
    }

    /// Opens a fresh socket, replacing any existing one.
    pub fn connect(&self) -> Result<()> {
        let addr = self.config.addr();
        let stream = open_stream(&self.config).map_err(|source| BatsdError::Connect {
            addr: addr.clone(),
            source,
        })?;
        if let Some(old) = self.stream.replace(Some(BufReader::new(stream))) {
            let _ = old.get_ref().shutdown(Shutdown::Both);
            debug!(%addr, "replaced existing socket");
        }
        info!(%addr, "connected");
        Ok(())
    }

    /// Drops the socket without telling the daemon.
    pub fn disconnect(&self) {
        if let Some(reader) = self.stream.take() {
            let _ = reader.get_ref().shutdown(Shutdown::Both);
            info!(addr = %self.config.addr(), "disconnected");
        }
    }

    /// Sends `command` and returns the reply line without its newline.
    pub fn exchange_raw(&self, command: &str) -> Result<String> {
        let bytes = self.exchange(command)?;
        String::from_utf8(bytes)
            .map_err(|err| BatsdError::Protocol(format!("reply is not UTF-8: {err}")))
    }

    /// Sends `command` and decodes the reply line as JSON.
    pub fn exchange_json<T: DeserializeOwned>(&self, command: &str) -> Result<T> {
        let bytes = self.exchange(command)?;
        serde_json::from_slice(&bytes).map_err(|source| BatsdError::Decode {
            body: String::from_utf8_lossy(&bytes).into_owned(),
            source,
        })
    }

    /// Any reply other than the exact bytes `PONG` is `false`, not an error.
    pub fn ping(&self) -> Result<bool> {
        Ok(self.exchange("ping")? == b"PONG")
    }

    /// Fully-qualified keys the daemon currently knows about.
    pub fn available(&self) -> Result<Vec<String>> {
        self.exchange_json("available")
    }

    /// Raw `values` query for a fully-qualified key. `start` and `end` are
    /// Unix timestamps.
    pub fn values(&self, name: &str, start: i64, end: i64) -> Result<Values> {
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(BatsdError::InvalidKey(name.to_string()));
        }
        let reply: serde_json::Value =
            self.exchange_json(&format!("values {name} {start} {end}"))?;
        Values::from_json(reply, name)
    }

    pub fn counters(&self) -> Result<Vec<Counter<'_>>> {
        Ok(self.catalog()?.counters)
    }

    pub fn gauges(&self) -> Result<Vec<Gauge<'_>>> {
        Ok(self.catalog()?.gauges)
    }

    pub fn timers(&self) -> Result<Vec<Timer<'_>>> {
        Ok(self.catalog()?.timers)
    }

    /// Splits one `available` reply into typed handles.
    pub fn catalog(&self) -> Result<Catalog<'_>> {
        let mut catalog = Catalog::default();
        for key in self.available()? {
            let Some((kind, name)) = Kind::split_key(&key) else {
                catalog.unknown.push(key);
                continue;
            };
            match kind {
                Kind::Counter => catalog.counters.push(self.counter(name)),
                Kind::Gauge => catalog.gauges.push(self.gauge(name)),
                Kind::Timer => catalog.timers.push(self.timer(name)),
            }
        }
        Ok(catalog)
    }

    pub fn counter<N: Into<String>>(&self, name: N) -> Counter<'_> {
        Counter::new(self, name)
    }

    pub fn gauge<N: Into<String>>(&self, name: N) -> Gauge<'_> {
        Gauge::new(self, name)
    }

    pub fn timer<N: Into<String>>(&self, name: N) -> Timer<'_> {
        Timer::new(self, name)
    }

    /// Says goodbye and closes the socket. The reply, if any, is not read.
    pub fn quit(&self) -> Result<()> {
        let sent = {
            let mut guard = self.stream.borrow_mut();
            let reader = guard.as_mut().ok_or(BatsdError::NotConnected)?;
            send_command(reader.get_mut(), "quit", self.config.timeout)
        };
        self.disconnect();
        sent
    }

    fn exchange(&self, command: &str) -> Result<Vec<u8>> {
        let mut guard = self.stream.borrow_mut();
        let reader = guard.as_mut().ok_or(BatsdError::NotConnected)?;
        let result = round_trip(reader, command, self.config.timeout);
        match result {
            Ok(reply) => {
                debug!(command, bytes = reply.len(), "exchange complete");
                Ok(reply)
            }
            Err(err) if err.breaks_stream() => {
                warn!(command, error = %err, "dropping socket after failed exchange");
                *guard = None;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

/// Keys from one `available` call, grouped by namespace.
#[derive(Debug, Default)]
pub struct Catalog<'c> {
    pub counters: Vec<Counter<'c>>,
    pub gauges: Vec<Gauge<'c>>,
    pub timers: Vec<Timer<'c>>,
    /// Keys outside the three known namespaces.
    pub unknown: Vec<String>,
}

fn open_stream(config: &ConnectionConfig) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in (config.host.as_str(), config.port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, config.timeout) {
            Ok(stream) => {
                stream.set_read_timeout(Some(config.timeout))?;
                stream.set_write_timeout(Some(config.timeout))?;
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(err) => {
                debug!(%addr, error = %err, "connect attempt failed");
                last_err = Some(err);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(ErrorKind::AddrNotAvailable, "host resolved to no addresses")
    }))
}

fn round_trip<S: Read + Write>(
    reader: &mut BufReader<S>,
    command: &str,
    timeout: Duration,
) -> Result<Vec<u8>> {
    send_command(reader.get_mut(), command, timeout)?;
    read_frame(reader, timeout)
}

fn send_command<W: Write>(writer: &mut W, command: &str, timeout: Duration) -> Result<()> {
    let mut frame = Vec::with_capacity(command.len() + 1);
    frame.extend_from_slice(command.as_bytes());
    frame.push(b'\n');
    writer
        .write_all(&frame)
        .and_then(|_| writer.flush())
        .map_err(|err| io_failure(err, timeout))
}

/// Reads up to and excluding the next `\n`. Bytes after it stay buffered.
fn read_frame<R: BufRead>(reader: &mut R, timeout: Duration) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader
        .read_until(b'\n', &mut buf)
        .map_err(|err| io_failure(err, timeout))?;
    if buf.last() == Some(&b'\n') {
        buf.pop();
        Ok(buf)
    } else {
        Err(BatsdError::Protocol(format!(
            "peer closed the stream after {} bytes without a newline",
            buf.len()
        )))
    }
}

fn io_failure(err: io::Error, timeout: Duration) -> BatsdError {
    match err.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => BatsdError::Timeout(timeout),
        _ => BatsdError::Io(err),
    }
}
