//! A TCP client that talks to the broker under test one framed message at a time.
//!
//! Reads are bounded by short deadlines: once the 4-byte size prefix has arrived, the
//! payload is drained until it is complete or the deadline passes. Whatever arrived by
//! then is handed to the assertions, which report a short frame against the field that
//! ran out of bytes.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use bytes::{Bytes, BytesMut};
use kgrade_protocol::{FieldTreePrinter, InspectableHexDump, Request, RequestBody};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::{timeout, Instant};
use tracing::{debug, info, info_span};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connect_retries: u32,
    pub retry_interval: Duration,
    pub write_timeout: Duration,
    /// Applies after the size prefix has been read.
    pub read_timeout: Duration,
    /// Upper bound for [`Client::receive_raw`].
    pub max_raw_read_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_retries: 10,
            retry_interval: Duration::from_secs(1),
            write_timeout: Duration::from_millis(100),
            read_timeout: Duration::from_millis(100),
            max_raw_read_bytes: 1024 * 1024,
        }
    }
}

/// One frame read from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Everything received, size prefix included.
    pub raw_bytes: Bytes,
    /// Bytes after the size prefix. Empty when fewer than 4 bytes arrived.
    pub payload: Bytes,
}

impl Response {
    pub fn from_raw(raw_bytes: Bytes) -> Self {
        let payload = if raw_bytes.len() >= 4 {
            raw_bytes.slice(4..)
        } else {
            Bytes::new()
        };
        Self { raw_bytes, payload }
    }
}

#[derive(Debug)]
pub struct Client {
    stream: TcpStream,
    config: ClientConfig,
}

impl Client {
    pub async fn connect<A: ToSocketAddrs + std::fmt::Display>(addr: A) -> Result<Self> {
        Self::connect_with_config(addr, ClientConfig::default()).await
    }

    /// Retries up to `config.connect_retries` times, `config.retry_interval` apart.
    pub async fn connect_with_config<A: ToSocketAddrs + std::fmt::Display>(
        addr: A,
        config: ClientConfig,
    ) -> Result<Self> {
        let mut attempt = 0;
        loop {
            match TcpStream::connect(&addr).await {
                Ok(stream) => {
                    debug!("Connected to broker at {}", addr);
                    return Ok(Self { stream, config });
                }
                Err(e) if attempt < config.connect_retries => {
                    attempt += 1;
                    debug!("Failed to connect to broker at {} ({}), retrying in {:?}", addr, e, config.retry_interval);
                    tokio::time::sleep(config.retry_interval).await;
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to connect to broker at {} after {} retries", addr, attempt)
                    })
                }
            }
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Writes a complete frame, size prefix included.
    pub async fn send(&mut self, message: &[u8]) -> Result<()> {
        match timeout(self.config.write_timeout, self.stream.write_all(message)).await {
            Ok(result) => result.context("Failed to write request"),
            Err(_) => bail!("write operation timed out"),
        }
    }

    /// Reads one size-prefixed frame.
    pub async fn receive(&mut self) -> Result<Response> {
        let mut size_bytes = [0u8; 4];
        self.stream
            .read_exact(&mut size_bytes)
            .await
            .context("Failed to read message size")?;
        let size = i32::from_be_bytes(size_bytes);
        if size < 0 {
            bail!("Expected message size to be non-negative, got {}", size);
        }

        let mut raw = BytesMut::with_capacity(4 + size as usize);
        raw.extend_from_slice(&size_bytes);
        let mut remaining = size as usize;
        let deadline = Instant::now() + self.config.read_timeout;
        let mut chunk = vec![0u8; remaining.min(64 * 1024).max(1)];

        while remaining > 0 {
            let want = remaining.min(chunk.len());
            match tokio::time::timeout_at(deadline, self.stream.read(&mut chunk[..want])).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => {
                    raw.extend_from_slice(&chunk[..n]);
                    remaining -= n;
                }
                Ok(Err(e)) => return Err(e).context("Failed to read response"),
                Err(_) => {
                    debug!("Read deadline reached with {} of {} payload bytes", size as usize - remaining, size);
                    break;
                }
            }
        }

        Ok(Response::from_raw(raw.freeze()))
    }

    /// Drains whatever arrives before the read deadline, without framing.
    pub async fn receive_raw(&mut self) -> Result<Response> {
        let mut raw = BytesMut::new();
        let mut chunk = vec![0u8; 64 * 1024];
        let deadline = Instant::now() + self.config.read_timeout;

        while raw.len() < self.config.max_raw_read_bytes {
            let want = (self.config.max_raw_read_bytes - raw.len()).min(chunk.len());
            match tokio::time::timeout_at(deadline, self.stream.read(&mut chunk[..want])).await {
                Ok(Ok(0)) | Err(_) => break,
                Ok(Ok(n)) => raw.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => return Err(e).context("Failed to read response"),
            }
        }

        Ok(Response::from_raw(raw.freeze()))
    }

    /// Encodes and sends `request` without waiting for the response.
    pub async fn send_request<B: RequestBody>(&mut self, request: &Request<B>) -> Result<()> {
        let encoded = request.encode();
        info!(
            "Sending \"{}\" (version: {}) request (Correlation id: {})",
            B::API_KEY.name(),
            request.header.api_version,
            request.header.correlation_id
        );
        {
            let _span = info_span!("Encoder").entered();
            FieldTreePrinter::new(&encoded.fields).log_for_debug();
        }
        debug!(
            "Sending bytes:\n{}",
            InspectableHexDump::new(&encoded.message).formatted_string_with_heading()
        );
        self.send(&encoded.message).await
    }

    /// Reads the frame answering a request of type `B`.
    pub async fn receive_response<B: RequestBody>(&mut self) -> Result<Response> {
        let response = self
            .receive()
            .await
            .map_err(|e| anyhow!("Failed to receive {} response: {:#}", B::API_KEY.name(), e))?;
        debug!(
            "Received bytes:\n{}",
            InspectableHexDump::new(&response.raw_bytes).formatted_string_with_heading()
        );
        Ok(response)
    }

    pub async fn send_and_receive<B: RequestBody>(&mut self, request: &Request<B>) -> Result<Response> {
        self.send_request(request).await?;
        self.receive_response::<B>().await
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.shutdown().await.context("Failed to close connection")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgrade_protocol::ApiVersionsRequestBuilder;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    fn fast_config() -> ClientConfig {
        ClientConfig {
            connect_retries: 2,
            retry_interval: Duration::from_millis(10),
            ..Default::default()
        }
    }

    /// Accepts one connection, reads one request frame and answers with `reply`.
    async fn start_test_server(reply: Vec<u8>) -> Result<(SocketAddr, tokio::task::JoinHandle<Vec<u8>>)> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut size = [0u8; 4];
            socket.read_exact(&mut size).await.unwrap();
            let mut request = vec![0u8; i32::from_be_bytes(size) as usize];
            socket.read_exact(&mut request).await.unwrap();
            socket.write_all(&reply).await.unwrap();
            // Hold the connection open past the client's read deadline.
            tokio::time::sleep(Duration::from_millis(300)).await;
            request
        });
        Ok((addr, handle))
    }

    #[tokio::test]
    async fn test_send_and_receive_complete_frame() -> Result<()> {
        let reply = vec![0, 0, 0, 6, 0, 0, 0, 7, 0, 0];
        let (addr, server) = start_test_server(reply.clone()).await?;

        let mut client = Client::connect_with_config(addr, fast_config()).await?;
        let request = ApiVersionsRequestBuilder::new().correlation_id(7).build();
        let response = client.send_and_receive(&request).await?;

        assert_eq!(&response.raw_bytes[..], &reply[..]);
        assert_eq!(&response.payload[..], &reply[4..]);

        let received = server.await?;
        assert_eq!(&received[..], &request.encode().message[4..]);
        Ok(())
    }

    #[tokio::test]
    async fn test_partial_payload_is_returned_after_deadline() -> Result<()> {
        // Announces 10 bytes, sends 2.
        let (addr, _server) = start_test_server(vec![0, 0, 0, 10, 0xaa, 0xbb]).await?;

        let mut client = Client::connect_with_config(addr, fast_config()).await?;
        client.send(&[0, 0, 0, 1, 0]).await?;
        let response = client.receive().await?;
        assert_eq!(&response.payload[..], &[0xaa, 0xbb]);
        Ok(())
    }

    #[tokio::test]
    async fn test_receive_raw_reads_unframed_bytes() -> Result<()> {
        let (addr, _server) = start_test_server(vec![1, 2]).await?;

        let mut client = Client::connect_with_config(addr, fast_config()).await?;
        client.send(&[0, 0, 0, 1, 0]).await?;
        let response = client.receive_raw().await?;
        assert_eq!(&response.raw_bytes[..], &[1, 2]);
        assert!(response.payload.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_connect_gives_up_after_retries() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let err = Client::connect_with_config(addr, fast_config()).await.unwrap_err();
        assert!(err.to_string().contains("after 2 retries"));
        Ok(())
    }
}
