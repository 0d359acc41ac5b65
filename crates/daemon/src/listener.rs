//! Listening sockets and the accept loop.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, TcpListener};
use std::thread;

use crate::session::Session;

/// Binds the service on IPv4 and IPv6 and serves accepted clients,
/// one worker thread each. Returns only on a setup failure.
pub(crate) fn serve(service: Option<&str>) -> Result<(), transport::TransportError> {
    let port = transport::resolve_service(service.unwrap_or(protocol::SERVICE))?;

    let mut listeners = Vec::new();
    match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)) {
        Ok(listener) => {
            logging::log_notice!("ipv4 ready on port {port}");
            listeners.push(listener);
        }
        Err(err) => logging::log_warning!("ipv4 bind failed: {err}"),
    }
    // A dual-stack host may have claimed both families with the
    // first bind; a failure here is only interesting if v4 failed too.
    match TcpListener::bind((Ipv6Addr::UNSPECIFIED, port)) {
        Ok(listener) => {
            logging::log_notice!("ipv6 ready on port {port}");
            listeners.push(listener);
        }
        Err(err) => logging::log_warning!("ipv6 bind failed: {err}"),
    }

    if listeners.is_empty() {
        return Err(transport::TransportError::Io(io::Error::new(
            io::ErrorKind::AddrInUse,
            "no listening socket could be established",
        )));
    }

    let workers: Vec<_> = listeners
        .into_iter()
        .map(|listener| thread::spawn(move || accept_loop(&listener)))
        .collect();
    for worker in workers {
        let _ = worker.join();
    }
    Ok(())
}

fn accept_loop(listener: &TcpListener) {
    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                logging::log_notice!("connection from {peer}");
                thread::spawn(move || {
                    let peer = peer.to_string();
                    if let Err(err) = Session::new(stream).serve() {
                        if err.is_closed() {
                            logging::log_notice!("{peer}: client closed the connection");
                        } else {
                            logging::log_warning!("{peer}: session failed: {err}");
                        }
                    }
                });
            }
            Err(err) => {
                logging::log_warning!("accept failed: {err}");
            }
        }
    }
}
