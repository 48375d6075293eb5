//! Buffered message stream.
use bytes::{Buf, BytesMut};
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::{
    Result,
    common::verbose,
    net::Socket,
    postgres::{BackendMessage, FrontendMessage, codec},
};

const DEFAULT_BUF_CAPACITY: usize = 8 * 1024;

/// Socket with read and write buffer, speaking postgres messages.
///
/// Writes are buffered until [`flush`][PgStream::flush]. Bytes not yet written stay in the write
/// buffer when the flush future is dropped, and are written by the next flush.
#[derive(Debug)]
pub(crate) struct PgStream {
    socket: Socket,
    read_buf: BytesMut,
    write_buf: BytesMut,
}

impl PgStream {
    pub fn new(socket: Socket) -> Self {
        Self {
            socket,
            read_buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
            write_buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
        }
    }

    /// Buffer a message.
    pub fn send(&mut self, message: &FrontendMessage) {
        verbose!("(F) {message:?}");
        message.write(&mut self.write_buf);
    }

    /// Write all buffered messages.
    pub async fn flush(&mut self) -> io::Result<()> {
        while self.write_buf.has_remaining() {
            self.socket.write_all_buf(&mut self.write_buf).await?;
        }
        self.socket.flush().await
    }

    /// Receive one backend message.
    ///
    /// Pending writes are flushed before waiting for the socket.
    pub async fn recv(&mut self) -> Result<BackendMessage> {
        loop {
            if let Some(message) = codec::decode_backend(&mut self.read_buf)? {
                verbose!("(B) {message:?}");
                return Ok(message);
            }

            if self.write_buf.has_remaining() {
                self.flush().await?;
            }

            self.read_more().await?;
        }
    }

    /// Receive the single byte `SSLRequest` response.
    #[cfg(feature = "tls")]
    pub async fn recv_ssl(&mut self) -> Result<crate::postgres::backend::SslResponse> {
        loop {
            if let Some(response) = codec::decode_ssl_response(&mut self.read_buf)? {
                verbose!("(B) {response:?}");
                return Ok(response);
            }
            self.read_more().await?;
        }
    }

    async fn read_more(&mut self) -> io::Result<()> {
        if self.socket.read_buf(&mut self.read_buf).await? == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        Ok(())
    }

    /// Returns `true` if there are bytes read but not yet decoded.
    ///
    /// Server must not send anything after `SSLRequest` response before the TLS handshake.
    #[cfg(feature = "tls")]
    pub fn has_unread(&self) -> bool {
        self.read_buf.has_remaining()
    }

    #[cfg(feature = "tls")]
    pub async fn upgrade_tls(self, domain: &str) -> Result<PgStream, native_tls::Error> {
        let Self { socket, read_buf, write_buf } = self;
        let socket = socket.upgrade_tls(domain).await?;
        Ok(Self { socket, read_buf, write_buf })
    }

    pub fn is_tls(&self) -> bool {
        self.socket.is_tls()
    }

    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.flush().await?;
        self.socket.shutdown().await
    }
}
