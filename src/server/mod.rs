// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! The resolution service over TCP.
//!
//! Clients send requests as JSON objects, one per line, and receive one
//! JSON object per line in response, in order. A question is
//!
//! ```text
//! {"name": "www.example.com.", "type": 1}
//! ```
//!
//! and is answered with
//!
//! ```text
//! {"answer": ["www.example.com.\t3600\tIN\tA\t192.0.2.1"], "ns": [], "extra": []}
//! ```
//!
//! (`ns` and `extra` are always empty.) Health probes are
//! `{"health": "liveness"}` and `{"health": "readiness"}`; both are
//! answered with `{"status": "ok"}`, the latter only if the database
//! answers. Failures are reported as
//! `{"error": {"code": ..., "message": ...}}`, where the code is one of
//! `INVALID_ARGUMENT`, `NOT_FOUND`, `DEADLINE_EXCEEDED`, and
//! `INTERNAL`. Internal errors are logged; their details are not sent
//! to the client.
//!
//! Each connection is served by a task on a [`WorkerPool`]. Requests
//! are bounded in size, each one is answered under its own deadline,
//! and connections that stay idle too long are closed.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::deadline::Deadline;
use crate::error::Error;
use crate::name::Name;
use crate::store::{Question, Store};

mod protocol;
mod workers;

use protocol::{ErrorCode, Probe, Request, Response};
pub use workers::{ConnectionGuard, Error as WorkerError, WorkerPool};

/// The maximum length of a request line, not counting the line ending.
const MAX_REQUEST_LEN: usize = 4096;

/// How long the accept loop sleeps when no connection is pending. This
/// bounds how long it takes the loop to notice shutdown.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Tunables of a [`Server`].
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// The deadline for answering each request.
    pub request_timeout: Duration,

    /// How long a connection may go without sending a request.
    pub idle_timeout: Duration,
}

/// A resolution server backed by a [`Store`]. See the [module-level
/// documentation](self).
pub struct Server {
    store: Store,
    config: ServerConfig,
}

impl Server {
    pub fn new(store: Store, config: ServerConfig) -> Self {
        Self { store, config }
    }

    /// Starts accepting connections on `listener`. The accept loop runs
    /// on a thread of `pool`, and connections are served by tasks of
    /// `pool`; shutting down the pool stops the server.
    pub fn start(self: &Arc<Self>, listener: TcpListener, pool: &Arc<WorkerPool>) -> Result<(), WorkerError> {
        listener.set_nonblocking(true)?;
        let server = self.clone();
        let pool_clone = pool.clone();
        pool.start_oneshot("listener".to_owned(), move || {
            server.run_listener(&pool_clone, &listener);
        })
    }

    /// The accept loop.
    fn run_listener(self: &Arc<Self>, pool: &Arc<WorkerPool>, listener: &TcpListener) {
        match listener.local_addr() {
            Ok(addr) => info!("Listening on {}.", addr),
            Err(e) => warn!("Listening on an unknown address: {}", e),
        }

        while !pool.is_shutting_down() {
            match listener.accept() {
                Ok((stream, peer)) => {
                    debug!("Accepted a connection from {}.", peer);
                    let server = self.clone();
                    let pool_clone = pool.clone();
                    let task = move || {
                        if let Err(e) = server.handle_connection(&pool_clone, stream) {
                            error!("I/O error on the connection from {}: {}", peer, e);
                        }
                    };
                    match pool.submit_or_spawn(task) {
                        Ok(()) => (),
                        // Let the connection close.
                        Err(WorkerError::ShuttingDown) => return,
                        Err(WorkerError::Io(e)) => {
                            error!("Failed to start a thread for {}: {}", peer, e);
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL_INTERVAL),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => (),
                Err(e) => {
                    // Typically running out of file descriptors, which
                    // may resolve itself as connections close.
                    error!("Failed to accept a connection: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }
    }

    /// Serves a connection until the client closes it, goes idle, sends
    /// an overlong request, or the pool shuts down.
    fn handle_connection(&self, pool: &Arc<WorkerPool>, stream: TcpStream) -> io::Result<()> {
        // The socket may inherit nonblocking status from the listener.
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(self.config.idle_timeout))?;
        let _guard = match pool.track(&stream) {
            Ok(guard) => guard,
            Err(WorkerError::ShuttingDown) => return Ok(()),
            Err(WorkerError::Io(e)) => return Err(e),
        };

        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = stream;
        let mut line = Vec::new();
        loop {
            line.clear();
            let limit = MAX_REQUEST_LEN as u64 + 2;
            match reader.by_ref().take(limit).read_until(b'\n', &mut line) {
                Ok(0) => return Ok(()),
                Ok(_) => (),
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                    debug!("Closing an idle connection.");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }

            let complete = line.ends_with(b"\n");
            let request = strip_line_ending(&line);
            if request.len() > MAX_REQUEST_LEN {
                let response = Response::error(ErrorCode::InvalidArgument, "request too long");
                return write_response(&mut writer, &response);
            }
            if !request.iter().all(u8::is_ascii_whitespace) {
                write_response(&mut writer, &self.handle_request(request))?;
            }

            // A final request without a line ending is still answered.
            if !complete || pool.is_shutting_down() {
                return Ok(());
            }
        }
    }

    /// Answers a single request.
    fn handle_request(&self, request: &[u8]) -> Response {
        let request: Request = match serde_json::from_slice(request) {
            Ok(request) => request,
            Err(e) => {
                return Response::error(ErrorCode::InvalidArgument, format!("malformed request: {e}"))
            }
        };

        let deadline = Deadline::after(self.config.request_timeout);
        match request {
            Request::Resolve { name, qtype } => {
                let name: Name = match name.parse() {
                    Ok(name) => name,
                    Err(e) => {
                        return Response::error(ErrorCode::InvalidArgument, format!("invalid name: {e}"))
                    }
                };
                let question = Question {
                    name,
                    qtype: qtype.into(),
                };
                match self.store.resolve(&question, &deadline) {
                    Ok(answer) => Response::answer(answer),
                    Err(e) => error_response(e),
                }
            }
            Request::Health {
                health: Probe::Liveness,
            } => Response::ok(),
            Request::Health {
                health: Probe::Readiness,
            } => match self.store.ping(&deadline) {
                Ok(()) => Response::ok(),
                Err(e) => error_response(e),
            },
        }
    }
}

/// Converts a store error into a response, logging it if it indicates
/// a fault.
fn error_response(error: Error) -> Response {
    match error {
        Error::NotFound => Response::error(ErrorCode::NotFound, "no records found"),
        Error::Cancelled => Response::error(ErrorCode::DeadlineExceeded, "deadline exceeded"),
        Error::Validation(_) => Response::error(ErrorCode::InvalidArgument, error.to_string()),
        Error::ConstraintViolation(_) | Error::Server(_) => {
            error!("Failed to answer a request: {}", error);
            Response::error(ErrorCode::Internal, "internal error")
        }
    }
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn write_response(writer: &mut TcpStream, response: &Response) -> io::Result<()> {
    let mut buf = serde_json::to_vec(response)?;
    buf.push(b'\n');
    writer.write_all(&buf)
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};

    use tempfile::TempDir;

    use super::*;
    use crate::normalize::RecordParams;

    fn make_server(request_timeout: Duration) -> (TempDir, Server) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("records.sqlite3"), Duration::from_secs(5));
        store.migrate(&Deadline::none()).unwrap();
        let config = ServerConfig {
            request_timeout,
            idle_timeout: Duration::from_secs(5),
        };
        (dir, Server::new(store, config))
    }

    fn add_record(server: &Server, presentation: &str) {
        let params = RecordParams {
            zone: "example.com.".into(),
            presentation: presentation.into(),
            comment: String::new(),
        };
        server.store.create(&params, &Deadline::none()).unwrap();
    }

    fn error_code(response: Response) -> ErrorCode {
        match response {
            Response::Error { error } => error.code,
            other => panic!("expected an error, got {other:?}"),
        }
    }

    #[test]
    fn answers_questions() {
        let (_dir, server) = make_server(Duration::from_secs(5));
        add_record(&server, "www 300 IN A 192.0.2.1");
        assert_eq!(
            server.handle_request(br#"{"name": "WWW.example.com.", "type": 1}"#),
            Response::answer(vec!["WWW.example.com.\t300\tIN\tA\t192.0.2.1".into()]),
        );
    }

    #[test]
    fn reports_missing_answers() {
        let (_dir, server) = make_server(Duration::from_secs(5));
        add_record(&server, "www 300 IN A 192.0.2.1");
        let response = server.handle_request(br#"{"name": "www.example.com.", "type": 28}"#);
        assert_eq!(error_code(response), ErrorCode::NotFound);
    }

    #[test]
    fn rejects_bad_requests() {
        let (_dir, server) = make_server(Duration::from_secs(5));
        for request in [
            &b"not json"[..],
            br#"{"name": "www.example.com."}"#,
            br#"{"name": "www.example.com", "type": 1}"#,
        ] {
            assert_eq!(error_code(server.handle_request(request)), ErrorCode::InvalidArgument);
        }
    }

    #[test]
    fn answers_health_probes() {
        let (_dir, server) = make_server(Duration::from_secs(5));
        assert_eq!(server.handle_request(br#"{"health": "liveness"}"#), Response::ok());
        assert_eq!(server.handle_request(br#"{"health": "readiness"}"#), Response::ok());
    }

    #[test]
    fn expired_requests_exceed_their_deadline() {
        let (_dir, server) = make_server(Duration::ZERO);
        let response = server.handle_request(br#"{"name": "www.example.com.", "type": 1}"#);
        assert_eq!(error_code(response), ErrorCode::DeadlineExceeded);
    }

    #[test]
    fn serves_over_tcp() {
        let (_dir, server) = make_server(Duration::from_secs(5));
        add_record(&server, "www 300 IN A 192.0.2.1");
        let server = Arc::new(server);
        let pool = WorkerPool::start("test", 1).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        server.start(listener, &pool).unwrap();

        let mut client = TcpStream::connect(addr).unwrap();
        client
            .write_all(b"{\"name\": \"www.example.com.\", \"type\": 1}\n\n{\"health\": \"liveness\"}\n")
            .unwrap();
        let mut reader = BufReader::new(client.try_clone().unwrap());
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(
            line,
            "{\"answer\":[\"www.example.com.\\t300\\tIN\\tA\\t192.0.2.1\"],\"ns\":[],\"extra\":[]}\n",
        );
        line.clear();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "{\"status\":\"ok\"}\n");
        drop(reader);
        drop(client);

        pool.shut_down();
        pool.await_shutdown();
    }
}
