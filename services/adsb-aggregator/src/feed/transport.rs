//! TCP transport to the upstream receiver

use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use crate::error::TransportError;

/// Read buffer size per socket read
const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Open a TCP connection, failing after `timeout`
pub async fn connect(addr: &str, timeout: Duration) -> Result<TcpStream, TransportError> {
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => {
            // Beast frames are small and latency matters more than throughput
            let _ = stream.set_nodelay(true);
            Ok(stream)
        }
        Ok(Err(source)) => Err(TransportError::Connect {
            addr: addr.to_string(),
            source,
        }),
        Err(_) => Err(TransportError::ConnectTimeout {
            addr: addr.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// One read from the receiver
#[derive(Debug)]
pub enum ReadEvent<'a> {
    Data(&'a [u8]),
    Closed,
}

/// Owned connection with its read buffer
pub struct ReceiverConnection {
    stream: TcpStream,
    buffer: Vec<u8>,
}

impl ReceiverConnection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            buffer: vec![0; READ_BUFFER_SIZE],
        }
    }

    /// Wait for the next chunk. Cancel safe.
    pub async fn read(&mut self) -> Result<ReadEvent<'_>, TransportError> {
        let n = self
            .stream
            .read(&mut self.buffer)
            .await
            .map_err(TransportError::Read)?;
        if n == 0 {
            return Ok(ReadEvent::Closed);
        }
        Ok(ReadEvent::Data(&self.buffer[..n]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_refused_is_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = connect(&addr, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }), "{:?}", err);
    }

    #[tokio::test]
    async fn test_read_data_then_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(&[0x1A, 0x32]).await.unwrap();
        });

        let stream = connect(&addr, Duration::from_secs(1)).await.unwrap();
        let mut conn = ReceiverConnection::new(stream);
        server.await.unwrap();

        let mut received = Vec::new();
        loop {
            match conn.read().await.unwrap() {
                ReadEvent::Data(bytes) => received.extend_from_slice(bytes),
                ReadEvent::Closed => break,
            }
        }
        assert_eq!(received, vec![0x1A, 0x32]);
    }
}
