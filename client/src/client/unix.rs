//! Unix socket transport for the admin client.

use super::error::ClientError;
use super::io::AsyncClient;
use super::DIAL_TIMEOUT;
use std::io;
use std::path::Path;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;

/// An admin client over a unix stream socket.
///
/// This is a convenience type alias for [`AsyncClient`] with Tokio's unix stream halves.
pub type UnixClient = AsyncClient<OwnedReadHalf, OwnedWriteHalf>;

/// Dial the daemon's admin socket.
pub(super) async fn connect(path: &Path) -> Result<UnixClient, ClientError> {
    match tokio::time::timeout(DIAL_TIMEOUT, UnixStream::connect(path)).await {
        Ok(Ok(stream)) => {
            let (reader, writer) = stream.into_split();
            Ok(AsyncClient::new(reader, writer))
        }
        Ok(Err(e)) => Err(ClientError::Io(e)),
        Err(_) => Err(ClientError::Io(io::Error::new(
            io::ErrorKind::TimedOut,
            "connection attempt timed out",
        ))),
    }
}
