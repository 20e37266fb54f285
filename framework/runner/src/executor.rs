use std::future::Future;

use render_tunnel_core::prelude::{ShutdownHandle, ShutdownSignalError};

/// Bridges the synchronous hook functions and the async browser client.
#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
    shutdown_handle: ShutdownHandle,
}

impl Executor {
    pub(crate) fn new(runtime: tokio::runtime::Runtime, shutdown_handle: ShutdownHandle) -> Self {
        Self {
            runtime,
            shutdown_handle,
        }
    }

    /// Run async code in place, blocking until it completes.
    ///
    /// The future is raced against the scenario shutdown signal and cancelled if the runner is
    /// shutting down. Submitting a future which does not support cancellation may prevent the
    /// runner from shutting down.
    pub fn execute_in_place<T>(
        &self,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        let mut shutdown_listener = self.shutdown_handle.new_listener();
        self.runtime.block_on(async move {
            tokio::select! {
                result = fut => result,
                _ = shutdown_listener.wait_for_shutdown() => {
                    Err(anyhow::anyhow!(ShutdownSignalError::default()))
                },
            }
        })
    }

    /// Run async code in place without racing the shutdown signal.
    ///
    /// When a timed run ends or Ctrl-C was pressed, the shutdown signal is already latched by
    /// the time teardown hooks run, so [Executor::execute_in_place] would cancel their work
    /// immediately. Resource release such as closing the browser must still complete, so
    /// teardown code uses this entry point instead.
    pub fn execute_in_place_unchecked<T>(
        &self,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        self.runtime.block_on(fut)
    }

    /// Submit async code to run in the background.
    ///
    /// The future is not cancelled on shutdown and the runner does not wait for it. In agent
    /// hooks prefer [Executor::execute_in_place] so the work completes before the hook returns.
    pub fn spawn(&self, fut: impl Future<Output = ()> + Send + 'static) {
        self.runtime.spawn(fut);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executes_future_in_place() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let executor = Executor::new(runtime, ShutdownHandle::new());

        let value = executor
            .execute_in_place(async { Ok::<_, anyhow::Error>(42) })
            .unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn shutdown_cancels_in_flight_future() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let handle = ShutdownHandle::new();
        let executor = Executor::new(runtime, handle.clone());

        handle.shutdown();

        let result = executor.execute_in_place(async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok::<_, anyhow::Error>(())
        });

        let err = result.unwrap_err();
        assert!(err.is::<ShutdownSignalError>());
    }

    #[test]
    fn unchecked_execution_completes_after_shutdown() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let handle = ShutdownHandle::new();
        let executor = Executor::new(runtime, handle.clone());

        handle.shutdown();

        let value = executor
            .execute_in_place_unchecked(async {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Ok::<_, anyhow::Error>(42)
            })
            .unwrap();
        assert_eq!(value, 42);
    }
}
