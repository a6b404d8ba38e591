use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use tracing::{debug, trace};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};

/// Smallest read timeout handed to the OS; a zero timeout is rejected by std sockets.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// A duplex byte channel to a motor controller.
///
/// Implementations must be safe to move to another thread, since the
/// keep-alive task and foreground calls share one stream behind a mutex.
pub trait ByteStream: Send {
    /// Write every byte of `data`, blocking until done.
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Read whatever input is available into `buf`, waiting at most `timeout`.
    ///
    /// Returns `Ok(0)` when nothing arrived within the timeout. A stream
    /// closed by the remote end reports [`TransportError::Closed`].
    fn read_available(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the stream. Calling this more than once is a no-op.
    fn close(&mut self) -> Result<()>;

    /// Whether the stream is still open.
    fn is_open(&self) -> bool;
}

impl<T: ByteStream + ?Sized> ByteStream for Box<T> {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        (**self).write_all(data)
    }

    fn read_available(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        (**self).read_available(buf, timeout)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

/// A connected std socket stream carrying serial traffic.
///
/// On Unix this can wrap a Unix domain socket; TCP works everywhere.
pub struct IoStream {
    inner: IoStreamInner,
    read_timeout: Option<Duration>,
    open: bool,
}

enum IoStreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl IoStream {
    /// Connect to a parsed endpoint.
    pub fn connect(endpoint: &Endpoint) -> Result<Self> {
        match endpoint {
            Endpoint::Tcp(addr) => Self::connect_tcp(addr),
            #[cfg(unix)]
            Endpoint::Unix(path) => Self::connect_unix(path),
        }
    }

    /// Connect to a TCP serial bridge such as ser2net.
    pub fn connect_tcp(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).map_err(|source| TransportError::Connect {
            endpoint: addr.to_string(),
            source,
        })?;
        stream.set_nodelay(true)?;
        debug!(%addr, "connected tcp stream");
        Ok(Self::from_tcp(stream))
    }

    /// Connect to a Unix domain socket bridge.
    #[cfg(unix)]
    pub fn connect_unix(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = std::os::unix::net::UnixStream::connect(path).map_err(|source| {
            TransportError::Connect {
                endpoint: path.display().to_string(),
                source,
            }
        })?;
        debug!(?path, "connected unix stream");
        Ok(Self::from_unix(stream))
    }

    /// Wrap an already connected TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: IoStreamInner::Tcp(stream),
            read_timeout: None,
            open: true,
        }
    }

    /// Wrap an already connected Unix domain socket stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: IoStreamInner::Unix(stream),
            read_timeout: None,
            open: true,
        }
    }

    fn apply_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        let timeout = timeout.max(MIN_READ_TIMEOUT);
        if self.read_timeout == Some(timeout) {
            return Ok(());
        }
        match &self.inner {
            IoStreamInner::Tcp(stream) => stream.set_read_timeout(Some(timeout))?,
            #[cfg(unix)]
            IoStreamInner::Unix(stream) => stream.set_read_timeout(Some(timeout))?,
        }
        self.read_timeout = Some(timeout);
        Ok(())
    }

    fn io(&mut self) -> &mut dyn ReadWrite {
        match &mut self.inner {
            IoStreamInner::Tcp(stream) => stream,
            #[cfg(unix)]
            IoStreamInner::Unix(stream) => stream,
        }
    }
}

trait ReadWrite: Read + Write {}

impl<T: Read + Write> ReadWrite for T {}

impl ByteStream for IoStream {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        trace!(len = data.len(), "writing bytes");

        let io = self.io();
        let mut offset = 0usize;
        while offset < data.len() {
            match io.write(&data[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match io.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn read_available(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        self.apply_read_timeout(timeout)?;

        loop {
            match self.io().read(buf) {
                Ok(0) => {
                    self.open = false;
                    return Err(TransportError::Closed);
                }
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    return Ok(0);
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        let result = match &self.inner {
            IoStreamInner::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            IoStreamInner::Unix(stream) => stream.shutdown(Shutdown::Both),
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

impl std::fmt::Debug for IoStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            IoStreamInner::Tcp(_) => "tcp",
            #[cfg(unix)]
            IoStreamInner::Unix(_) => "unix",
        };
        f.debug_struct("IoStream")
            .field("type", &kind)
            .field("open", &self.open)
            .finish()
    }
}
