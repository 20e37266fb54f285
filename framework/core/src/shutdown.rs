use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::{Receiver, Sender};

/// Broadcasts the shutdown signal to every listener created from this handle.
///
/// The signal is latched: a listener created after [ShutdownHandle::shutdown] was called will
/// still observe the shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Sender<()>,
    fired: Arc<AtomicBool>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: tokio::sync::broadcast::channel(1).0,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn shutdown(&self) {
        self.fired.store(true, Ordering::SeqCst);
        if let Err(e) = self.sender.send(()) {
            // Fails when nobody is listening yet, which is fine because the flag is latched.
            log::debug!("No active listeners for shutdown signal: {e:?}");
        }
    }

    pub fn new_listener(&self) -> DelegatedShutdownListener {
        DelegatedShutdownListener {
            receiver: self.sender.subscribe(),
            fired: self.fired.clone(),
        }
    }
}

#[derive(Debug)]
pub struct DelegatedShutdownListener {
    receiver: Receiver<()>,
    fired: Arc<AtomicBool>,
}

impl Clone for DelegatedShutdownListener {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.resubscribe(),
            fired: self.fired.clone(),
        }
    }
}

impl DelegatedShutdownListener {
    /// Point in time check whether the shutdown signal has been received. Once this returns true
    /// the caller should stop its work so that the scenario can wind down.
    pub fn should_shutdown(&mut self) -> bool {
        if self.fired.load(Ordering::SeqCst) {
            return true;
        }

        matches!(
            self.receiver.try_recv(),
            Ok(()) | Err(TryRecvError::Closed)
        )
    }

    /// Wait until the shutdown signal is received. Safe to race against another future so that
    /// the signal can cancel in-flight work.
    pub async fn wait_for_shutdown(&mut self) {
        if self.fired.load(Ordering::SeqCst) {
            return;
        }

        // An Err means the sender was dropped, treat that as shutdown too.
        let _ = self.receiver.recv().await;
    }
}

#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct ShutdownSignalError {
    msg: String,
}

impl Default for ShutdownSignalError {
    fn default() -> Self {
        Self {
            msg: "Execution cancelled by shutdown signal".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listener_observes_shutdown() {
        let handle = ShutdownHandle::new();
        let mut listener = handle.new_listener();

        assert!(!listener.should_shutdown());
        handle.shutdown();
        assert!(listener.should_shutdown());
    }

    #[tokio::test]
    async fn late_listener_observes_latched_shutdown() {
        let handle = ShutdownHandle::new();
        handle.shutdown();

        let mut listener = handle.new_listener();
        assert!(listener.should_shutdown());

        // Must return immediately rather than wait for a signal that was already sent.
        listener.wait_for_shutdown().await;
    }
}
