//! The accept loop: binds the listening socket, and for each accepted
//! connection acquires an admission permit and spawns a worker task.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use smol::future;
use smol::net::{TcpListener, TcpStream};
use socket2::{Domain, Socket, Type};

use crate::admission::AdmissionGate;
use crate::cache::LruCache;
use crate::init::shutdown::GracefulShutdown;
use crate::limits::MAX_CLIENTS;
use crate::worker;

pub async fn serve(port: u16, shutdown: &GracefulShutdown) -> Result<()> {
    let bind_addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let listener = bind_listener(bind_addr)?;
    log::info!("Proxy server listening on port {port}...");

    let cache = Arc::new(LruCache::new());
    let gate = AdmissionGate::new(MAX_CLIENTS);

    loop {
        let Some((stream, peer)) = accept_or_shutdown(&listener, shutdown).await? else {
            break;
        };
        log::info!("Client connected: {peer}");

        let cache = cache.clone();
        let gate = gate.clone();
        let shutdown = shutdown.clone();
        smol::spawn(async move {
            let _inflight = shutdown.inflight_guard();
            let _permit = gate.acquire().await;
            worker::handle_connection(stream, cache).await;
        })
        .detach();
    }

    shutdown.wait_inflight_zero().await;
    Ok(())
}

/// Build the listening socket with `SO_REUSEADDR` and a backlog sized to
/// `MAX_CLIENTS`, then hand it to smol's reactor.
fn bind_listener(addr: SocketAddr) -> Result<TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(MAX_CLIENTS as i32)?;
    socket.set_nonblocking(true)?;
    let std_listener: std::net::TcpListener = socket.into();
    Ok(TcpListener::try_from(std_listener)?)
}

async fn accept_or_shutdown(
    listener: &TcpListener,
    shutdown: &GracefulShutdown,
) -> std::io::Result<Option<(TcpStream, SocketAddr)>> {
    let accept_fut = async { listener.accept().await.map(Some) };
    let shutdown_fut = async {
        shutdown.wait_shutting_down().await;
        Ok(None)
    };
    future::or(accept_fut, shutdown_fut).await
}
