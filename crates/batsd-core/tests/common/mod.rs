#![allow(dead_code)]

use batsd_core::ConnectionConfig;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// What the mock daemon does after reading one command line.
pub enum Reply {
    Line(&'static str),
    /// Arbitrary bytes followed by a newline.
    Bytes(&'static [u8]),
    /// Writes the bytes without a newline, then closes the socket.
    Partial(&'static str),
    /// Never answers; waits for the client to go away.
    Hang,
}

/// Scripted daemon on an ephemeral port. Each session is one accepted
/// connection; commands are recorded in the order they arrive.
pub struct MockDaemon {
    port: u16,
    handle: JoinHandle<Vec<String>>,
}

impl MockDaemon {
    pub fn start(sessions: Vec<Vec<Reply>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for script in sessions {
                let (stream, _) = listener.accept().unwrap();
                serve(stream, script, &mut seen);
            }
            seen
        });
        Self { port, handle }
    }

    pub fn config(&self) -> ConnectionConfig {
        ConnectionConfig::new("127.0.0.1", self.port).with_timeout(Duration::from_millis(500))
    }

    /// Waits for every session to end. Drop or disconnect the client first.
    pub fn finish(self) -> Vec<String> {
        self.handle.join().unwrap()
    }
}

fn serve(stream: TcpStream, script: Vec<Reply>, seen: &mut Vec<String>) {
    let mut writer = stream.try_clone().unwrap();
    let mut reader = BufReader::new(stream);
    for reply in script {
        let Some(line) = read_command(&mut reader) else {
            return;
        };
        seen.push(line);
        match reply {
            Reply::Line(text) => {
                writer.write_all(text.as_bytes()).unwrap();
                writer.write_all(b"\n").unwrap();
            }
            Reply::Bytes(bytes) => {
                writer.write_all(bytes).unwrap();
                writer.write_all(b"\n").unwrap();
            }
            Reply::Partial(text) => {
                writer.write_all(text.as_bytes()).unwrap();
                return;
            }
            Reply::Hang => break,
        }
    }
    while let Some(line) = read_command(&mut reader) {
        seen.push(line);
    }
}

fn read_command<R: BufRead>(reader: &mut R) -> Option<String> {
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end_matches('\n').to_string()),
    }
}

/// A port nothing is listening on.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
