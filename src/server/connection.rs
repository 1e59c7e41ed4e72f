//! Per-connection FSM: `READING -> PROCESSING -> REPLYING -> READING ...
//! CLOSED`, adapted from a binary RESP buffer to LF-delimited text lines.

use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{info, warn};

use crate::hit::HitHandler;
use crate::metrics::MetricsSink;
use crate::protocol::{parse_line, Reply, Request, RequestError};

const READ_CHUNK: usize = 4096;

pub struct ConnectionHandler {
    stream: TcpStream,
    peer: String,
    buffer: BytesMut,
    max_line_bytes: usize,
    hit_handler: Arc<HitHandler>,
    metrics: Arc<dyn MetricsSink>,
}

/// Why the connection loop stopped.
enum Outcome {
    PeerClosed,
    LineTooLong,
    WriteFailed,
    ReadFailed,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        peer: String,
        max_line_bytes: usize,
        hit_handler: Arc<HitHandler>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        ConnectionHandler {
            stream,
            peer,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            max_line_bytes,
            hit_handler,
            metrics,
        }
    }

    /// Run the FSM to completion. Requests are processed one at a time, in
    /// receive order; a reply is written before the next request on the
    /// same connection is dispatched. No pipelining.
    pub async fn run(mut self) {
        info!(peer = %self.peer, "client connected");

        let outcome = self.read_loop().await;

        match outcome {
            Outcome::PeerClosed => info!(peer = %self.peer, "client disconnected"),
            Outcome::LineTooLong => {
                self.metrics.increment("error.line-too-long");
                warn!(peer = %self.peer, "line exceeded max length, closing connection");
            }
            Outcome::WriteFailed => warn!(peer = %self.peer, "failed to write reply, closing connection"),
            Outcome::ReadFailed => warn!(peer = %self.peer, "error reading from client, closing connection"),
        }
    }

    async fn read_loop(&mut self) -> Outcome {
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            // READING: pull bytes off the socket until we have a full line.
            while !self.buffer.contains(&b'\n') {
                if self.buffer.len() > self.max_line_bytes {
                    return Outcome::LineTooLong;
                }
                match self.stream.read(&mut chunk).await {
                    Ok(0) => return Outcome::PeerClosed,
                    Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                    Err(_) => return Outcome::ReadFailed,
                }
            }

            if self.buffer.len() > self.max_line_bytes {
                return Outcome::LineTooLong;
            }

            // PROCESSING: pull exactly one line out of the buffer.
            let newline_at = self.buffer.iter().position(|&b| b == b'\n').unwrap();
            let line_bytes = self.buffer.split_to(newline_at + 1);
            let line = String::from_utf8_lossy(&line_bytes[..newline_at]);
            let line = line.trim_end_matches('\r');

            let reply = self.dispatch(line).await;

            // REPLYING: one line back, then return to READING.
            if self.stream.write_all(reply.encode().as_bytes()).await.is_err() {
                return Outcome::WriteFailed;
            }
        }
    }

    async fn dispatch(&self, line: &str) -> Reply {
        match parse_line(line) {
            Ok(Request::Hit { operation }) => self.hit_handler.handle(&operation).await,
            Err(e) => {
                self.metrics.increment(&format!("error.{}", e.kind()));
                reply_for_error(&e)
            }
        }
    }
}

fn reply_for_error(e: &RequestError) -> Reply {
    Reply::err(e.kind(), e.message())
}

trait BytesMutExt {
    fn contains(&self, byte: &u8) -> bool;
}

impl BytesMutExt for BytesMut {
    fn contains(&self, byte: &u8) -> bool {
        memchr::memchr(*byte, self).is_some()
    }
}
