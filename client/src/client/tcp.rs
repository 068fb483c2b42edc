//! TCP transport for the admin client.

use super::error::ClientError;
use super::io::AsyncClient;
use super::DIAL_TIMEOUT;
use std::io;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// An admin client over a TCP stream.
///
/// This is a convenience type alias for [`AsyncClient`] with Tokio's TCP stream halves.
pub type TcpClient = AsyncClient<OwnedReadHalf, OwnedWriteHalf>;

/// Dial the daemon's TCP admin listener.
pub(super) async fn connect(addr: &str) -> Result<TcpClient, ClientError> {
    match tokio::time::timeout(DIAL_TIMEOUT, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => {
            // Queries are tiny, don't batch them up.
            stream.set_nodelay(true)?;
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
