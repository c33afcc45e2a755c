//! OS signal handling.
//!
//! SIGTERM and SIGINT both start a graceful shutdown. On non-Unix
//! platforms only Ctrl-C is available.

/// Resolve on the first termination signal.
#[cfg(unix)]
pub async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("SIGTERM received"),
        _ = sigint.recv() => tracing::info!("SIGINT received"),
    }
    Ok(())
}

/// Resolve on the first termination signal.
#[cfg(not(unix))]
pub async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl-C received");
    Ok(())
}
