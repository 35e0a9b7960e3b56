//! Cross-thread wakeup for the worker's driver poll.
//!
//! The worker parks inside the driver's wait call. Handles and submitters
//! need to unpark it from other threads, so the wait set always includes
//! the read end of a loopback UDP pair; waking is one datagram on the
//! write end. When the pair cannot be created the engine still works, its
//! command latency just degrades to the poll ceiling.

use std::io;
use std::net::UdpSocket;

/// Write end of the wakeup pair. Cheap to clone and safe to use from any
/// thread.
#[derive(Debug)]
pub(crate) struct PollWaker {
    tx: UdpSocket,
}

/// Read end of the wakeup pair, owned by the worker.
#[derive(Debug)]
pub(crate) struct WakeReceiver {
    rx: UdpSocket,
}

/// Create a connected loopback pair.
pub(crate) fn wake_pair() -> io::Result<(PollWaker, WakeReceiver)> {
    let rx = UdpSocket::bind("127.0.0.1:0")?;
    rx.set_nonblocking(true)?;
    let tx = UdpSocket::bind("127.0.0.1:0")?;
    tx.connect(rx.local_addr()?)?;
    tx.set_nonblocking(true)?;
    Ok((PollWaker { tx }, WakeReceiver { rx }))
}

impl PollWaker {
    /// Unblock the worker's poll. Best effort; a full socket buffer means
    /// a wakeup is already pending.
    pub(crate) fn wake(&self) {
        let _ = self.tx.send(&[1]);
    }
}

impl WakeReceiver {
    /// Swallow all pending wakeup datagrams.
    pub(crate) fn drain(&self) {
        let mut buf = [0u8; 16];
        while self.rx.recv(&mut buf).is_ok() {}
    }

    /// The raw socket to include in the driver's wait set.
    #[cfg(unix)]
    pub(crate) fn socket(&self) -> curl::multi::Socket {
        use std::os::unix::io::AsRawFd;
        self.rx.as_raw_fd()
    }

    #[cfg(windows)]
    pub(crate) fn socket(&self) -> curl::multi::Socket {
        use std::os::windows::io::AsRawSocket;
        self.rx.as_raw_socket() as curl::multi::Socket
    }
}
