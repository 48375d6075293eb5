use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::{
    io::{AsyncRead, AsyncWrite, ReadBuf},
    net::TcpStream,
};

/// Stream that can be used as postgres transport.
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin { }

impl<S> AsyncStream for S where S: AsyncRead + AsyncWrite + Send + Unpin { }

/// Either tcp, unix domain socket, tls or any other stream.
pub enum Socket {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(tokio::net::UnixStream),
    #[cfg(feature = "tls")]
    Tls(Box<tokio_native_tls::TlsStream<Socket>>),
    Boxed(Box<dyn AsyncStream>),
}

impl Socket {
    pub async fn connect_tcp(host: &str, port: u16) -> io::Result<Socket> {
        let socket = TcpStream::connect((host, port)).await?;
        socket.set_nodelay(true)?;
        Ok(Socket::Tcp(socket))
    }

    #[cfg(unix)]
    pub async fn connect_socket(path: &str) -> io::Result<Socket> {
        tokio::net::UnixStream::connect(path).await.map(Socket::Unix)
    }

    #[cfg(not(unix))]
    pub async fn connect_socket(_: &str) -> io::Result<Socket> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "unix socket is not supported"))
    }

    pub fn boxed(stream: impl AsyncStream + 'static) -> Socket {
        Socket::Boxed(Box::new(stream))
    }

    /// Wrap the socket with client TLS.
    #[cfg(feature = "tls")]
    pub async fn upgrade_tls(self, domain: &str) -> Result<Socket, native_tls::Error> {
        let connector = native_tls::TlsConnector::new()?;
        let connector = tokio_native_tls::TlsConnector::from(connector);
        let stream = connector.connect(domain, self).await?;
        Ok(Socket::Tls(Box::new(stream)))
    }

    pub fn is_tls(&self) -> bool {
        match self {
            #[cfg(feature = "tls")]
            Socket::Tls(_) => true,
            _ => false,
        }
    }
}

macro_rules! delegate {
    ($me:ident, $s:ident => $body:expr) => {
        match $me.get_mut() {
            Socket::Tcp($s) => $body,
            #[cfg(unix)]
            Socket::Unix($s) => $body,
            #[cfg(feature = "tls")]
            Socket::Tls($s) => $body,
            Socket::Boxed($s) => $body,
        }
    };
}

impl AsyncRead for Socket {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        delegate!(self, s => Pin::new(s).poll_read(cx, buf))
    }
}

impl AsyncWrite for Socket {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        delegate!(self, s => Pin::new(s).poll_write(cx, buf))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        delegate!(self, s => Pin::new(s).poll_flush(cx))
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        delegate!(self, s => Pin::new(s).poll_shutdown(cx))
    }
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Socket::Tcp(s) => f.debug_tuple("Tcp").field(s).finish(),
            #[cfg(unix)]
            Socket::Unix(s) => f.debug_tuple("Unix").field(s).finish(),
            #[cfg(feature = "tls")]
            Socket::Tls(_) => f.write_str("Tls"),
            Socket::Boxed(_) => f.write_str("Boxed"),
        }
    }
}
