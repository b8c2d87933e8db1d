use tally_common::Signal;
use tokio::sync::broadcast::{self, error::RecvError};

/// Resolves once a shutdown is requested.
///
/// A closed channel means no shutdown can ever arrive, so this then pends
/// forever instead of resolving.
pub(crate) async fn shutdown_requested(signals: &mut broadcast::Receiver<Signal>) {
    match signals.recv().await {
        Ok(Signal::Shutdown) | Err(RecvError::Lagged(_)) => {}
        Err(RecvError::Closed) => std::future::pending().await,
    }
}
