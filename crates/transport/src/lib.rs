#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `transport` moves whole UCRP frames over a blocking, ordered byte
//! stream. Sending writes one encoded frame and flushes; receiving
//! loops until a complete header and payload have arrived. Each frame
//! is self-delimiting through its declared length, so the stream never
//! needs resynchronization; an oversized declared length is treated
//! as fatal instead.
//!
//! Connection setup resolves the service name through the host's
//! service database (falling back to a numeric port), then walks the
//! resolved addresses, IPv4 and IPv6 alike, until one accepts.
//!
//! The socket discipline of the client is split ownership: the
//! receiver side only reads, the transmitter side only writes. Nothing
//! in this crate enforces that; it merely works with `Read`/`Write`
//! halves so callers can hold them on different threads.

use std::ffi::CString;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use protocol::{Message, ProtocolError, SERVICE};
use thiserror::Error;

/// Errors produced while moving frames or establishing connections.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer closed the connection at a frame boundary.
    #[error("connection closed by peer")]
    Closed,

    /// The peer violated the framing rules; the stream cannot recover.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    /// The socket failed mid-operation.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The service name is neither numeric nor in the service database.
    #[error("unknown service {service:?}")]
    UnknownService {
        /// The service name that failed to resolve.
        service: String,
    },

    /// No resolved address accepted a connection.
    #[error("unable to connect to {host}:{port}: {source}")]
    Unreachable {
        /// Host the caller asked for.
        host: String,
        /// Resolved port number.
        port: u16,
        /// Error from the last address tried.
        source: io::Error,
    },
}

impl TransportError {
    /// Whether this error is the peer's clean close.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Sends one frame, looping on short writes, then flushes.
pub fn send_message<W: Write>(writer: &mut W, msg: &Message) -> Result<(), TransportError> {
    writer.write_all(&msg.encode())?;
    writer.flush()?;
    Ok(())
}

/// Receives exactly one frame.
///
/// # Errors
///
/// [`TransportError::Closed`] when the peer shut down between frames;
/// [`TransportError::Protocol`] when the header declares an impossible
/// payload; [`TransportError::Io`] for every other failure, including
/// a close in the middle of a frame.
pub fn recv_message<R: Read>(reader: &mut R) -> Result<Message, TransportError> {
    match Message::decode(reader) {
        Ok(Some(msg)) => Ok(msg),
        Ok(None) => Err(TransportError::Closed),
        Err(err) => {
            if err.kind() == io::ErrorKind::InvalidData {
                if let Some(proto) = err
                    .get_ref()
                    .and_then(|inner| inner.downcast_ref::<ProtocolError>())
                {
                    return Err(TransportError::Protocol(proto.clone()));
                }
            }
            Err(TransportError::Io(err))
        }
    }
}

/// Connects to a UCRP server.
///
/// `host` defaults to `localhost`, `service` to [`SERVICE`]. The
/// service is resolved through the service database unless it parses
/// as a port number. Every address the resolver returns is tried in
/// order; the first that accepts wins.
pub fn connect(host: Option<&str>, service: Option<&str>) -> Result<TcpStream, TransportError> {
    let host = host.unwrap_or("localhost");
    let service = service.unwrap_or(SERVICE);
    let port = resolve_service(service)?;

    let mut last = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect(addr) {
            Ok(stream) => return Ok(stream),
            Err(err) => last = Some(err),
        }
    }

    Err(TransportError::Unreachable {
        host: host.to_owned(),
        port,
        source: last.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "no addresses resolved")
        }),
    })
}

/// Resolves a service name to a TCP port.
///
/// Numeric strings short-circuit; everything else goes through
/// `getservbyname(3)`.
pub fn resolve_service(service: &str) -> Result<u16, TransportError> {
    if let Ok(port) = service.parse::<u16>() {
        return Ok(port);
    }
    lookup_service(service).ok_or_else(|| TransportError::UnknownService {
        service: service.to_owned(),
    })
}

fn lookup_service(service: &str) -> Option<u16> {
    let name = CString::new(service).ok()?;
    let proto = CString::new("tcp").ok()?;
    // SAFETY: both pointers reference NUL-terminated buffers that
    // outlive the call; the returned entry is only dereferenced after
    // the null check and not retained past it.
    unsafe {
        let entry = libc::getservbyname(name.as_ptr(), proto.as_ptr());
        if entry.is_null() {
            return None;
        }
        Some(u16::from_be((*entry).s_port as u16))
    }
}
