//! OS signal handling.
//!
//! SIGINT (Ctrl+C) everywhere; SIGTERM as well on Unix so supervisors that
//! stop with TERM get the same graceful path.

use std::io;

/// Wait until the process is asked to stop.
pub async fn shutdown_signal() -> io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
