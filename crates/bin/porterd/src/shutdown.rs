//! Shutdown signal handling.

/// Wait until the process receives a shutdown signal (SIGINT or SIGTERM,
/// with Ctrl-C as fallback).
///
/// # Errors
///
/// Fails when a signal handler cannot be installed.
#[cfg(unix)]
pub async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
        _ = tokio::signal::ctrl_c() => {}
    }
    Ok(())
}

/// Wait until the process receives Ctrl-C.
///
/// # Errors
///
/// Fails when the Ctrl-C handler cannot be installed.
#[cfg(not(unix))]
pub async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
