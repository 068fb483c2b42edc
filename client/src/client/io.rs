//! I/O layer for the admin protocol.
//!
//! [`AsyncClient`] works with AsyncRead/AsyncWrite halves and handles the
//! byte-level exchange: serializing request messages and incrementally
//! decoding the unframed JSON reply stream.

use super::error::ClientError;
use super::query::{Reply, Request};
use log::trace;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Read buffer growth per attempt. The daemon caps replies around 15 KiB,
/// so a handful of reads covers even the large ones.
const READ_CHUNK: usize = 4096;

/// A request/reply exchange over a pair of stream halves.
///
/// The protocol has no request identifiers; the reply on the wire is paired
/// with the outstanding request purely by ordering, so there must never be
/// more than one request in flight. Taking `&mut self` on every exchange
/// enforces that for a single client.
#[derive(Debug)]
pub struct AsyncClient<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    reader: R,
    writer: W,
    /// Bytes received but not yet consumed by a decoded reply.
    pending: Vec<u8>,
}

impl<R, W> AsyncClient<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap a pair of stream halves.
    pub fn new(reader: R, writer: W) -> Self {
        AsyncClient {
            reader,
            writer,
            pending: Vec::new(),
        }
    }

    /// Serialize and send one request message.
    pub async fn send(&mut self, request: &Request) -> Result<(), ClientError> {
        let message = serde_json::to_vec(&request.to_message()).map_err(ClientError::Codec)?;
        self.writer.write_all(&message).await?;
        self.writer.flush().await?;
        trace!("Sent {} request ({} bytes)", request.name(), message.len());
        Ok(())
    }

    /// Read exactly one reply envelope off the stream.
    ///
    /// The stream is unframed JSON, so the envelope is decoded incrementally:
    /// bytes past the end of the first complete value are retained for the
    /// next reply.
    pub async fn read_reply(&mut self) -> Result<Reply, ClientError> {
        loop {
            if !self.pending.is_empty() {
                let (decoded, consumed) = {
                    let mut stream =
                        serde_json::Deserializer::from_slice(&self.pending).into_iter::<Reply>();
                    let decoded = stream.next();
                    (decoded, stream.byte_offset())
                };
                match decoded {
                    Some(Ok(reply)) => {
                        self.pending.drain(..consumed);
                        trace!("Decoded reply with status {:?}", reply.status);
                        return Ok(reply);
                    }
                    // Incomplete value, read more bytes.
                    Some(Err(e)) if e.is_eof() => {}
                    Some(Err(e)) => return Err(ClientError::Codec(e)),
                    None => {}
                }
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                return Err(ClientError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "daemon closed the connection mid-reply",
                )));
            }
            self.pending.extend_from_slice(&chunk[..n]);
        }
    }

    /// One full request/reply exchange.
    pub async fn call(&mut self, request: &Request) -> Result<Reply, ClientError> {
        self.send(request).await?;
        self.read_reply().await
    }
}
