//! Listener binding and server task supervision.
//!
//! # Design Decisions
//! - Fail fast: a bind error is returned before anything is served
//! - Each server runs in its own task, held as a [`ServerHandle`] and
//!   joined at shutdown rather than detached
//! - Connections are children of the server task: aborting the server drops
//!   every connection still open, including requests mid-flight

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::Router;
use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::Instant;
use tower::ServiceExt;

use crate::lifecycle::coordinator::{LifecycleError, ShutdownError};
use crate::observability::logging::Logger;

/// Bind a TCP listener for the named server.
pub async fn bind(name: &'static str, address: &str, logger: &Logger) -> Result<TcpListener, LifecycleError> {
    let bind_error = |source| LifecycleError::Bind {
        name,
        address: address.to_string(),
        source,
    };

    let listener = TcpListener::bind(address).await.map_err(bind_error)?;
    let local_addr = listener.local_addr().map_err(bind_error)?;

    logger.in_scope(|| tracing::info!(server = name, address = %local_addr, "Listener bound"));
    Ok(listener)
}

/// A running server task.
#[derive(Debug)]
pub struct ServerHandle {
    name: &'static str,
    addr: SocketAddr,
    task: JoinHandle<io::Result<()>>,
}

impl ServerHandle {
    /// Serve `router` on `listener` until `shutdown` resolves, then drain.
    pub fn spawn<F>(
        name: &'static str,
        listener: TcpListener,
        router: Router,
        shutdown: F,
        logger: &Logger,
    ) -> io::Result<Self>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        logger.in_scope(|| tracing::info!(server = name, address = %addr, "Server starting"));

        let task = tokio::spawn(serve(name, listener, router, shutdown, logger.clone()));
        Ok(Self { name, addr, task })
    }

    /// Wrap an already running task.
    #[cfg(test)]
    pub(crate) fn from_task(
        name: &'static str,
        addr: SocketAddr,
        task: JoinHandle<io::Result<()>>,
    ) -> Self {
        Self { name, addr, task }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the task to end on its own (serve error, panic, or shutdown).
    pub async fn exited(&mut self) -> Result<io::Result<()>, JoinError> {
        (&mut self.task).await
    }

    /// Abort the task and wait until its listener and connections are gone.
    pub async fn terminate(self) {
        self.task.abort();
        let _ = self.task.await;
    }

    /// Wait for the drain to finish, terminating the server at `deadline`.
    pub async fn join_until(mut self, deadline: Instant) -> Result<(), ShutdownError> {
        let name = self.name;
        match tokio::time::timeout_at(deadline, &mut self.task).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(source))) => Err(ShutdownError::Serve { name, source }),
            Ok(Err(source)) => Err(ShutdownError::Join { name, source }),
            Err(_) => {
                self.terminate().await;
                Err(ShutdownError::DeadlineExceeded { name })
            }
        }
    }
}

/// Accept loop. Stops accepting when `shutdown` resolves, then lets open
/// connections finish their current request.
async fn serve<F>(
    name: &'static str,
    listener: TcpListener,
    router: Router,
    shutdown: F,
    logger: Logger,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (drain, draining) = watch::channel(false);
    let mut connections = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        let (stream, remote) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) if is_connection_error(&e) => continue,
                Err(e) => {
                    logger.in_scope(|| tracing::error!(server = name, error = %e, "Accept failed"));
                    return Err(e);
                }
            },
            () = &mut shutdown => break,
        };

        while connections.try_join_next().is_some() {}
        connections.spawn(serve_connection(
            stream,
            remote,
            router.clone(),
            draining.clone(),
            logger.clone(),
        ));
    }

    drop(listener);
    let _ = drain.send(true);
    while connections.join_next().await.is_some() {}
    Ok(())
}

async fn serve_connection(
    stream: TcpStream,
    remote: SocketAddr,
    router: Router,
    mut draining: watch::Receiver<bool>,
    logger: Logger,
) {
    let service = hyper::service::service_fn(move |mut req: Request<Incoming>| {
        req.extensions_mut().insert(ConnectInfo(remote));
        router.clone().oneshot(req)
    });

    let builder = Builder::new(TokioExecutor::new());
    let conn = builder.serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let result = tokio::select! {
        res = conn.as_mut() => res,
        _ = draining.changed() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(e) = result {
        logger.in_scope(|| tracing::debug!(remote = %remote, error = %e, "Connection closed with error"));
    }
}

/// Errors that end one connection attempt but leave the listener usable.
fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
    )
}
